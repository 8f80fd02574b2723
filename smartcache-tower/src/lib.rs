//! Tower middleware for the SmartCache response-caching engine.
//!
//! [`SmartCache`] is a Tower [`Layer`](tower::Layer). For every request it:
//!
//! 1. looks for a [`RouteDescriptor`](smartcache_core::RouteDescriptor) in the
//!    request extensions (or the one given to the builder) and asks the
//!    [`PolicyResolver`](smartcache_core::PolicyResolver) whether the request
//!    may be cached; if not, the request passes through untouched
//! 2. fingerprints the request and looks the key up in the store; a hit is
//!    replayed with an `X-SmartApiResponseCache: HIT` header and the upstream
//!    is never called
//! 3. on a miss, calls the upstream and, for 2xx responses with a cacheable
//!    content type, stores the body once it has been fully sent to the client
//!
//! Store failures never change what the client receives.
//!
//! # Quick start
//!
//! ```
//! use std::convert::Infallible;
//! use std::time::Duration;
//! use bytes::Bytes;
//! use http::{Method, Request, Response};
//! use http_body_util::Full;
//! use smartcache_core::{EngineConfig, RouteDescriptor, RoutePolicy};
//! use smartcache_http::BufferedBody;
//! use smartcache_tower::SmartCache;
//! use tower::{ServiceBuilder, service_fn};
//!
//! let layer = SmartCache::builder()
//!     .in_memory(10_000)
//!     .config(EngineConfig::builder().default_ttl(Duration::from_secs(30)).build())
//!     .route(RouteDescriptor::new([Method::GET], RoutePolicy::default()))
//!     .build();
//!
//! let service = ServiceBuilder::new()
//!     .layer(layer)
//!     .service(service_fn(|_req: Request<BufferedBody<Full<Bytes>>>| async {
//!         Ok::<_, Infallible>(Response::new(Full::new(Bytes::from("hello"))))
//!     }));
//! # drop(service);
//! ```
//!
//! # Feature flags
//!
//! - `metrics`: record hit, miss, pass-through and store error counters and
//!   the upstream duration histogram with the `metrics` crate

#![warn(missing_docs)]

/// Per-request state machine.
pub mod future;
/// Tower layer and builder.
pub mod layer;
pub mod metrics;
/// The Tower service performing caching.
pub mod service;

pub use ::http::{Method, StatusCode};
pub use future::CacheFuture;
pub use layer::{NotSet, SmartCache, SmartCacheBuilder};
pub use service::CacheService;
pub use smartcache_http::{CACHE_HIT_HEADER, ResponseBody};
