//! Storage contract for cached responses.

use std::sync::Arc;
use std::time::Duration;

use crate::{CacheEntry, CacheKey, CachedResponse, StoreError};

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// TTL-indexed key to response map.
///
/// # Contract
///
/// - [`get`](Self::get) returns `Ok(None)` for absent **and** expired keys.
///   Repeated reads without an intervening `put` return the same result.
/// - [`put`](Self::put) inserts or replaces. The new entry becomes visible
///   atomically; a concurrent `get` sees either the old entry or the new one.
///   Expiry is `insertion + ttl` and is never extended by reads.
/// - Neither operation panics on well-formed input. Serialization failures on
///   `put` are returned as [`StoreError::Write`], undecodable entries on `get`
///   as [`StoreError::Read`].
///
/// Operations are synchronous: the capture path commits from inside
/// `poll_frame`, where awaiting is not possible.
pub trait ResponseStore: Send + Sync {
    /// Reads a live entry.
    fn get(&self, key: &CacheKey) -> StoreResult<Option<CacheEntry<CachedResponse>>>;

    /// Inserts or replaces the entry for `key`, expiring `ttl` from now.
    fn put(&self, key: &CacheKey, response: CachedResponse, ttl: Duration) -> StoreResult<()>;

    /// Removes an entry, returning whether one was present.
    fn remove(&self, key: &CacheKey) -> StoreResult<bool>;

    /// Name used in log records.
    fn label(&self) -> &str {
        "store"
    }
}

impl<S> ResponseStore for Arc<S>
where
    S: ResponseStore + ?Sized,
{
    fn get(&self, key: &CacheKey) -> StoreResult<Option<CacheEntry<CachedResponse>>> {
        (**self).get(key)
    }

    fn put(&self, key: &CacheKey, response: CachedResponse, ttl: Duration) -> StoreResult<()> {
        (**self).put(key, response, ttl)
    }

    fn remove(&self, key: &CacheKey) -> StoreResult<bool> {
        (**self).remove(key)
    }

    fn label(&self) -> &str {
        (**self).label()
    }
}

impl ResponseStore for Box<dyn ResponseStore> {
    fn get(&self, key: &CacheKey) -> StoreResult<Option<CacheEntry<CachedResponse>>> {
        (**self).get(key)
    }

    fn put(&self, key: &CacheKey, response: CachedResponse, ttl: Duration) -> StoreResult<()> {
        (**self).put(key, response, ttl)
    }

    fn remove(&self, key: &CacheKey) -> StoreResult<bool> {
        (**self).remove(key)
    }

    fn label(&self) -> &str {
        (**self).label()
    }
}
