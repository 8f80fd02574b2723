#![warn(missing_docs)]
//! # smartcache-core
//!
//! Core types for the SmartCache response-caching engine.
//!
//! This crate is **protocol-light**: it knows about HTTP methods and status
//! codes, but nothing about bodies, services or routers. The HTTP adapters
//! live in `smartcache-http`, the storage engine in `smartcache-moka` and the
//! request orchestration in `smartcache-tower`.
//!
//! ## What lives here
//!
//! - [`Fingerprint`] and [`CacheKey`]: the composed request identity and its
//!   SHA-256 digest
//! - [`CachedResponse`] and [`CacheEntry`]: what gets stored, and when it expires
//! - [`EngineConfig`]: process-wide settings, built once at startup
//! - [`RoutePolicy`], [`RouteDescriptor`] and [`PolicyResolver`]: the layered
//!   cacheability decision (global default, per-route override, explicit opt-out)
//! - [`ResponseStore`]: the storage contract
//! - [`format`]: value serialization used by stores
//!
//! ## Policy layering
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use http::Method;
//! use smartcache_core::{EngineConfig, PolicyResolver, RouteDescriptor, RoutePolicy};
//!
//! let config = EngineConfig::builder()
//!     .enabled_by_default(false)
//!     .default_ttl(Duration::from_secs(5))
//!     .build();
//! let resolver = PolicyResolver::new(Arc::new(config));
//!
//! let route = RouteDescriptor::new(
//!     [Method::GET],
//!     RoutePolicy::default().force_enabled().ttl(Duration::from_secs(10)),
//! );
//!
//! assert!(resolver.should_cache(&route, &Method::GET));
//! assert_eq!(resolver.resolve_ttl(route.policy()), Duration::from_secs(10));
//! ```

pub mod config;
pub mod entry;
pub mod error;
pub mod format;
pub mod key;
pub mod policy;
pub mod store;

pub use config::{DEFAULT_CONTENT_TYPES, EngineConfig, EngineConfigBuilder};
pub use entry::{CacheEntry, CachedResponse};
pub use error::{PolicyError, StoreError};
pub use format::{BincodeFormat, Format, FormatError, JsonFormat};
pub use key::{CacheKey, Fingerprint, SEPARATOR};
pub use policy::{PolicyResolver, RouteConfig, RouteDescriptor, RoutePolicy};
pub use store::{ResponseStore, StoreResult};

/// Raw byte data type used for serialized cache values.
/// Using `Bytes` provides efficient zero-copy cloning via reference counting.
pub type Raw = bytes::Bytes;
