//! Moka-backed [`ResponseStore`].

use std::fmt;
use std::time::Duration;

use moka::sync::Cache;
use smartcache_core::{
    CacheEntry, CacheKey, CachedResponse, Format, JsonFormat, Raw, ResponseStore, StoreError,
    StoreResult,
};
use smol_str::SmolStr;
use tracing::debug;

use crate::builder::{MokaStoreBuilder, NoCapacity};
use crate::metrics;

/// In-memory response store powered by Moka.
///
/// Entries are kept serialized with `F` and expire at their own
/// `inserted_at + ttl`; reads never extend them. Expired entries may linger in
/// Moka until its housekeeping runs, so [`get`](ResponseStore::get) checks
/// expiry itself.
///
/// Data is neither persisted nor shared across processes.
#[derive(Clone)]
pub struct MokaStore<F = JsonFormat>
where
    F: Format,
{
    cache: Cache<CacheKey, CacheEntry<Raw>>,
    format: F,
    label: SmolStr,
}

impl MokaStore<JsonFormat> {
    /// Creates a builder; capacity must be configured before building.
    pub fn builder() -> MokaStoreBuilder<NoCapacity, JsonFormat> {
        MokaStoreBuilder::new()
    }
}

impl<F: Format> MokaStore<F> {
    pub(crate) fn new(cache: Cache<CacheKey, CacheEntry<Raw>>, format: F, label: SmolStr) -> Self {
        MokaStore {
            cache,
            format,
            label,
        }
    }

    /// The underlying Moka cache.
    pub fn cache(&self) -> &Cache<CacheKey, CacheEntry<Raw>> {
        &self.cache
    }

    /// Inserts an already serialized entry, bypassing the value format.
    pub fn put_raw(&self, key: CacheKey, entry: CacheEntry<Raw>) {
        self.cache.insert(key, entry);
        self.record_capacity();
    }

    fn record_capacity(&self) {
        metrics::record_capacity(
            &self.label,
            self.cache.entry_count(),
            self.cache.weighted_size(),
        );
    }
}

impl<F: Format> ResponseStore for MokaStore<F> {
    fn get(&self, key: &CacheKey) -> StoreResult<Option<CacheEntry<CachedResponse>>> {
        let Some(entry) = self.cache.get(key) else {
            return Ok(None);
        };
        if entry.is_expired() {
            debug!(store = %self.label, %key, "entry expired");
            self.cache.invalidate(key);
            return Ok(None);
        }
        let response = self.format.decode(entry.data()).map_err(StoreError::Read)?;
        Ok(Some(entry.map(|_| response)))
    }

    fn put(&self, key: &CacheKey, response: CachedResponse, ttl: Duration) -> StoreResult<()> {
        let raw = self.format.encode(&response).map_err(StoreError::Write)?;
        self.put_raw(key.clone(), CacheEntry::new(raw, ttl));
        Ok(())
    }

    fn remove(&self, key: &CacheKey) -> StoreResult<bool> {
        let removed = self.cache.remove(key).is_some();
        self.record_capacity();
        Ok(removed)
    }

    fn label(&self) -> &str {
        &self.label
    }
}

impl<F: Format> fmt::Debug for MokaStore<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MokaStore")
            .field("label", &self.label)
            .field("cache", &self.cache)
            .field("format", &self.format)
            .finish()
    }
}
