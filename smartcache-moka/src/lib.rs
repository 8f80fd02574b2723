//! # smartcache-moka
//!
//! Concurrent in-memory [`ResponseStore`](smartcache_core::ResponseStore) for
//! SmartCache, built on [Moka](https://docs.rs/moka).
//!
//! ```
//! use std::time::Duration;
//! use bytes::Bytes;
//! use smartcache_core::{CacheKey, CachedResponse, ResponseStore};
//! use smartcache_moka::MokaStore;
//!
//! let store = MokaStore::builder().max_entries(1_000).build();
//! let key = CacheKey::digest(b"GET|/items");
//!
//! store
//!     .put(&key, CachedResponse::new(200, "application/json", Bytes::from("[]")), Duration::from_secs(5))
//!     .unwrap();
//! assert!(store.get(&key).unwrap().is_some());
//! ```
#![warn(missing_docs)]

mod builder;
pub mod metrics;
mod store;

pub use builder::{ByteCapacity, EntryCapacity, MokaStoreBuilder, NoCapacity};
pub use moka::policy::EvictionPolicy;
pub use store::MokaStore;
