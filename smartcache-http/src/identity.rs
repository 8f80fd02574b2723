//! Who is asking: the identity prefix of every cache key.
//!
//! Responses are never shared across clients. The key starts with the first
//! available of:
//!
//! 1. the session id ([`SessionId`] request extension)
//! 2. the authenticated user joined with the client address
//!    ([`AuthenticatedUser`])
//! 3. the client address alone
//!
//! followed by the `User-Agent` header. The client address comes from
//! [`RemoteAddr`] or, when the server was started with
//! `into_make_service_with_connect_info`, axum's `ConnectInfo<SocketAddr>`.

use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use http::header::USER_AGENT;
use http::request::Parts;

/// Session identifier established by an upstream session layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(pub String);

/// Name of the authenticated principal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AuthenticatedUser(pub String);

/// Client socket address recorded by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RemoteAddr(pub SocketAddr);

/// Builds the identity prefix for a request.
pub fn user_key(parts: &Parts) -> String {
    let mut key = match parts.extensions.get::<SessionId>() {
        Some(SessionId(session)) if !session.is_empty() => session.clone(),
        _ => {
            let ip = client_ip(parts);
            match parts.extensions.get::<AuthenticatedUser>() {
                Some(AuthenticatedUser(user)) if !user.is_empty() => format!("{user}_{ip}"),
                _ => ip,
            }
        }
    };
    key.push(smartcache_core::SEPARATOR);
    if let Some(agent) = parts.headers.get(USER_AGENT) {
        key.push_str(&String::from_utf8_lossy(agent.as_bytes()));
    }
    key
}

fn client_ip(parts: &Parts) -> String {
    parts
        .extensions
        .get::<RemoteAddr>()
        .map(|RemoteAddr(addr)| *addr)
        .or_else(|| {
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| *addr)
        })
        .map(|addr| addr.ip().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Request;

    fn parts(configure: impl FnOnce(&mut Parts)) -> Parts {
        let (mut parts, _) = Request::get("/")
            .header(USER_AGENT, "curl/8")
            .body(())
            .unwrap()
            .into_parts();
        configure(&mut parts);
        parts
    }

    #[test]
    fn session_wins_over_user_and_address() {
        let parts = parts(|p| {
            p.extensions.insert(SessionId("s-1".into()));
            p.extensions.insert(AuthenticatedUser("alice".into()));
            p.extensions.insert(RemoteAddr(([10, 0, 0, 1], 4000).into()));
        });
        assert_eq!(user_key(&parts), "s-1|curl/8");
    }

    #[test]
    fn user_is_joined_with_address() {
        let parts = parts(|p| {
            p.extensions.insert(AuthenticatedUser("alice".into()));
            p.extensions.insert(RemoteAddr(([10, 0, 0, 1], 4000).into()));
        });
        assert_eq!(user_key(&parts), "alice_10.0.0.1|curl/8");
    }

    #[test]
    fn connect_info_is_used_as_address() {
        let parts = parts(|p| {
            p.extensions
                .insert(ConnectInfo(SocketAddr::from(([192, 168, 1, 7], 80))));
        });
        assert_eq!(user_key(&parts), "192.168.1.7|curl/8");
    }

    #[test]
    fn anonymous_request_without_address() {
        let (parts, _) = Request::get("/").body(()).unwrap().into_parts();
        assert_eq!(user_key(&parts), "|");
    }
}
