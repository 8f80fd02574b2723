use std::convert::Infallible;
use std::sync::Arc;

use bytes::Bytes;
use futures::stream;
use http::{HeaderMap, HeaderValue, Request};
use http_body::Frame;
use http_body_util::{BodyExt, Full, StreamBody};
use pretty_assertions::assert_eq;
use smartcache_core::{EngineConfig, Fingerprint, PolicyResolver, RoutePolicy};
use smartcache_http::{BufferedBody, KeyGenerator, RemoteAddr, SessionId};

fn generator(config: EngineConfig) -> KeyGenerator {
    KeyGenerator::new(PolicyResolver::new(Arc::new(config)))
}

fn request(builder: http::request::Builder, body: &'static str) -> Request<BufferedBody<Full<Bytes>>> {
    builder
        .body(BufferedBody::Passthrough(Full::new(Bytes::from(body))))
        .unwrap()
}

async fn fingerprint(generator: &KeyGenerator, request: Request<BufferedBody<Full<Bytes>>>) -> Fingerprint {
    let (_, fingerprint) = generator.fingerprint(request, &RoutePolicy::default()).await;
    fingerprint.unwrap()
}

#[tokio::test]
async fn test_get_fingerprint_layout() {
    let generator = generator(EngineConfig::default());
    let mut request = request(
        Request::get("https://API.example.com/Items?Page=2")
            .header("user-agent", "Agent/1")
            .header("accept", "Application/JSON"),
        "",
    );
    request
        .extensions_mut()
        .insert(RemoteAddr(([10, 0, 0, 9], 5000).into()));

    let fingerprint = fingerprint(&generator, request).await;

    assert_eq!(
        fingerprint.as_str(),
        "10.0.0.9|Agent/1|GET|https|api.example.com|/items|accept:application/json|user-agent:agent/1|?page=2"
    );
}

#[tokio::test]
async fn test_header_order_does_not_change_key() {
    let generator = generator(EngineConfig::default());
    let first = request(Request::get("/items").header("a", "1").header("b", "2"), "");
    let second = request(Request::get("/items").header("b", "2").header("a", "1"), "");

    assert_eq!(
        fingerprint(&generator, first).await.to_key(),
        fingerprint(&generator, second).await.to_key()
    );
}

#[tokio::test]
async fn test_excluded_headers_are_left_out() {
    let generator = generator(EngineConfig::builder().exclude_header("X-Request-Id").build());
    let first = request(Request::get("/items").header("x-request-id", "1"), "");
    let second = request(Request::get("/items").header("x-request-id", "2"), "");

    assert_eq!(
        fingerprint(&generator, first).await,
        fingerprint(&generator, second).await
    );
}

#[tokio::test]
async fn test_headers_can_be_disabled() {
    let generator = generator(EngineConfig::builder().include_headers(false).build());
    let request = request(Request::get("http://host/p?q=1").header("accept", "x"), "");

    assert_eq!(fingerprint(&generator, request).await.as_str(), "||GET|http|host|/p|?q=1");
}

#[tokio::test]
async fn test_query_case_follows_route_policy() {
    let generator = generator(EngineConfig::builder().include_headers(false).build());

    let insensitive = fingerprint(&generator, request(Request::get("/p?Q=A"), "")).await;
    assert!(insensitive.as_str().ends_with("|?q=a"));

    let (_, sensitive) = generator
        .fingerprint(
            request(Request::get("/p?Q=A"), ""),
            &RoutePolicy::default().case_sensitive_query(),
        )
        .await;
    assert!(sensitive.unwrap().as_str().ends_with("|?Q=A"));
}

/// POST bodies are part of the key, and the handler still gets them.
#[tokio::test]
async fn test_post_body_changes_key_and_is_handed_back() {
    let generator = generator(EngineConfig::default());

    let (first, first_print) = generator
        .fingerprint(request(Request::post("/items"), r#"{"a":1}"#), &RoutePolicy::default())
        .await;
    let (_, second_print) = generator
        .fingerprint(request(Request::post("/items"), r#"{"a":2}"#), &RoutePolicy::default())
        .await;

    let first_print = first_print.unwrap();
    assert!(first_print.as_str().ends_with(r#"|{"a":1}"#));
    assert_ne!(first_print.to_key(), second_print.unwrap().to_key());

    let body = BodyExt::collect(first.into_body()).await.unwrap().to_bytes();
    assert_eq!(body, Bytes::from(r#"{"a":1}"#));
}

#[tokio::test]
async fn test_session_identity_separates_clients() {
    let generator = generator(EngineConfig::default());
    let mut alice = request(Request::get("/items"), "");
    alice.extensions_mut().insert(SessionId("alice".into()));
    let mut bob = request(Request::get("/items"), "");
    bob.extensions_mut().insert(SessionId("bob".into()));

    assert_ne!(
        fingerprint(&generator, alice).await.to_key(),
        fingerprint(&generator, bob).await.to_key()
    );
}

#[tokio::test]
async fn test_single_differing_part_changes_key() {
    let generator = generator(EngineConfig::default());
    let base = "http://example.com/items?page=1";
    let variants = [
        "https://example.com/items?page=1",
        "http://example.org/items?page=1",
        "http://example.com/orders?page=1",
        "http://example.com/items?page=2",
    ];

    let base_key = fingerprint(&generator, request(Request::get(base), "")).await.to_key();
    assert_eq!(
        fingerprint(&generator, request(Request::get(base), "")).await.to_key(),
        base_key
    );
    for uri in variants {
        let key = fingerprint(&generator, request(Request::get(uri), "")).await.to_key();
        assert_ne!(key, base_key, "{uri} should not share a key with {base}");
    }
}

#[tokio::test]
async fn test_post_trailers_are_handed_back() {
    let generator = generator(EngineConfig::default());
    let mut trailers = HeaderMap::new();
    trailers.insert("x-checksum", HeaderValue::from_static("abc"));
    let frames = stream::iter(vec![
        Ok::<_, Infallible>(Frame::data(Bytes::from("payload"))),
        Ok::<_, Infallible>(Frame::trailers(trailers.clone())),
    ]);
    let request = Request::post("/items")
        .body(BufferedBody::Passthrough(StreamBody::new(frames)))
        .unwrap();

    let (request, fingerprint) = generator.fingerprint(request, &RoutePolicy::default()).await;
    assert!(fingerprint.unwrap().as_str().ends_with("|payload"));

    let collected = BodyExt::collect(request.into_body()).await.unwrap();
    assert_eq!(collected.trailers(), Some(&trailers));
    assert_eq!(collected.to_bytes(), Bytes::from("payload"));
}
