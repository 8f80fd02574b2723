//! Request fingerprints.
//!
//! A fingerprint is the `|`-joined request identity that gets hashed into a
//! [`CacheKey`](smartcache_core::CacheKey):
//!
//! ```text
//! identity|User-Agent|METHOD|scheme|host|path[|name:value,...]*|?query[|body]
//! ```
//!
//! The body segment is present for POST, PUT and PATCH only. Header segments
//! are sorted by name so header order never changes the key.

use http::request::Parts;
use http::{Method, Request, header::HOST};
use http_body::Body as HttpBody;
use smartcache_core::{EngineConfig, Fingerprint, PolicyResolver, RoutePolicy};
use tracing::debug;

use crate::body::BufferedBody;
use crate::identity::user_key;

/// Whether requests with `method` carry their body into the fingerprint.
pub fn keys_body(method: &Method) -> bool {
    method == Method::POST || method == Method::PUT || method == Method::PATCH
}

/// Builds fingerprints according to the engine configuration.
#[derive(Debug, Clone)]
pub struct KeyGenerator {
    resolver: PolicyResolver,
}

impl KeyGenerator {
    /// Creates a generator applying `resolver`'s configuration.
    pub fn new(resolver: PolicyResolver) -> Self {
        KeyGenerator { resolver }
    }

    fn config(&self) -> &EngineConfig {
        self.resolver.config()
    }

    /// Fingerprints a request head, with the already buffered body if any.
    pub fn fingerprint_parts(
        &self,
        parts: &Parts,
        route: &RoutePolicy,
        body: Option<&[u8]>,
    ) -> Fingerprint {
        let case_sensitive = self.resolver.query_case_sensitive(route);
        let fold = |value: &str| {
            if case_sensitive {
                value.to_owned()
            } else {
                value.to_lowercase()
            }
        };

        let mut fingerprint = Fingerprint::new(user_key(parts));
        fingerprint.push(&parts.method.as_str().to_ascii_uppercase());
        fingerprint.push(&parts.uri.scheme_str().unwrap_or("http").to_lowercase());
        fingerprint.push(&host(parts).to_lowercase());
        fingerprint.push(&parts.uri.path().to_lowercase());

        if self.config().include_headers {
            let mut names: Vec<_> = parts
                .headers
                .keys()
                .filter(|name| !self.config().is_excluded_header(name.as_str()))
                .collect();
            names.sort_by(|a, b| a.as_str().cmp(b.as_str()));
            for name in names {
                let values = parts
                    .headers
                    .get_all(name)
                    .iter()
                    .map(|value| String::from_utf8_lossy(value.as_bytes()))
                    .collect::<Vec<_>>()
                    .join(",");
                fingerprint.push(&fold(&format!("{}:{}", name.as_str(), values)));
            }
        }

        let query = parts
            .uri
            .query()
            .map(|query| format!("?{query}"))
            .unwrap_or_default();
        fingerprint.push(&fold(&query));

        if keys_body(&parts.method) {
            fingerprint.push(&String::from_utf8_lossy(body.unwrap_or_default()));
        }
        fingerprint
    }

    /// Fingerprints a request, buffering its body when the method needs it.
    ///
    /// The request is always handed back with a body that yields exactly what
    /// the client sent, trailers included. When the body can't be read the
    /// fingerprint is `None` and the request carries the read prefix followed
    /// by the error.
    pub async fn fingerprint<B>(
        &self,
        request: Request<BufferedBody<B>>,
        route: &RoutePolicy,
    ) -> (Request<BufferedBody<B>>, Option<Fingerprint>)
    where
        B: HttpBody,
    {
        let (parts, body) = request.into_parts();
        if !keys_body(&parts.method) {
            let fingerprint = self.fingerprint_parts(&parts, route, None);
            return (Request::from_parts(parts, body), Some(fingerprint));
        }

        match body.collect_with_trailers().await {
            Ok((bytes, trailers)) => {
                let fingerprint = self.fingerprint_parts(&parts, route, Some(&bytes));
                let body = BufferedBody::buffered(bytes, trailers);
                (Request::from_parts(parts, body), Some(fingerprint))
            }
            Err(partial) => {
                debug!(method = %parts.method, uri = %parts.uri, "request body unreadable, not keyed");
                (Request::from_parts(parts, partial), None)
            }
        }
    }
}

fn host(parts: &Parts) -> String {
    parts
        .uri
        .authority()
        .map(|authority| authority.as_str().to_owned())
        .or_else(|| {
            parts
                .headers
                .get(HOST)
                .map(|host| String::from_utf8_lossy(host.as_bytes()).into_owned())
        })
        .unwrap_or_default()
}
