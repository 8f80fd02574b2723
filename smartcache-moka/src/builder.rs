//! Builder for configuring [`MokaStore`].

use std::time::{Duration, Instant};

use chrono::Utc;
use moka::Expiry;
use moka::policy::EvictionPolicy;
use moka::sync::{Cache, CacheBuilder};
use smartcache_core::{CacheEntry, CacheKey, Format, JsonFormat, Raw};
use smol_str::SmolStr;

use crate::store::MokaStore;

/// Expires entries at their own [`CacheEntry::expires_at`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct Expiration;

impl Expiry<CacheKey, CacheEntry<Raw>> for Expiration {
    fn expire_after_create(
        &self,
        _key: &CacheKey,
        value: &CacheEntry<Raw>,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(Self::remaining(value))
    }

    fn expire_after_update(
        &self,
        _key: &CacheKey,
        value: &CacheEntry<Raw>,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        // The replacing entry brings its own expiry; moka's default would keep
        // the old one.
        Some(Self::remaining(value))
    }
}

impl Expiration {
    fn remaining(value: &CacheEntry<Raw>) -> Duration {
        let millis = (value.expires_at() - Utc::now()).num_milliseconds();
        if millis <= 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(millis as u64)
        }
    }
}

/// Approximate per-entry bookkeeping besides key and value bytes.
const ENTRY_OVERHEAD: usize = 64;

fn weigh(key: &CacheKey, value: &CacheEntry<Raw>) -> u32 {
    let size = key.as_str().len() + value.memory_size() + ENTRY_OVERHEAD;
    u32::try_from(size).unwrap_or(u32::MAX)
}

/// Marker type: capacity has not been configured yet.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCapacity;

/// Marker type: the store holds at most `n` entries.
#[derive(Debug, Clone, Copy)]
pub struct EntryCapacity(pub(crate) u64);

/// Marker type: the store holds at most `n` bytes (approximate).
#[derive(Debug, Clone, Copy)]
pub struct ByteCapacity(pub(crate) u64);

/// Builder for a [`MokaStore`].
///
/// Capacity must be set with exactly one of
/// [`max_entries`](Self::max_entries) or [`max_bytes`](Self::max_bytes)
/// before `build()` becomes available.
///
/// ```
/// use smartcache_core::BincodeFormat;
/// use smartcache_moka::MokaStore;
///
/// let store = MokaStore::builder()
///     .label("api")
///     .max_entries(10_000)
///     .value_format(BincodeFormat)
///     .build();
/// ```
pub struct MokaStoreBuilder<Cap, F = JsonFormat>
where
    F: Format,
{
    capacity: Cap,
    format: F,
    label: SmolStr,
    eviction_policy: Option<EvictionPolicy>,
}

impl Default for MokaStoreBuilder<NoCapacity, JsonFormat> {
    fn default() -> Self {
        Self::new()
    }
}

impl MokaStoreBuilder<NoCapacity, JsonFormat> {
    /// Creates a builder with JSON values and no capacity set.
    pub fn new() -> Self {
        Self {
            capacity: NoCapacity,
            format: JsonFormat,
            label: SmolStr::new_static("moka"),
            eviction_policy: None,
        }
    }
}

impl<F: Format> MokaStoreBuilder<NoCapacity, F> {
    /// Limits the store by entry count.
    pub fn max_entries(self, entries: u64) -> MokaStoreBuilder<EntryCapacity, F> {
        MokaStoreBuilder {
            capacity: EntryCapacity(entries),
            format: self.format,
            label: self.label,
            eviction_policy: self.eviction_policy,
        }
    }

    /// Limits the store by approximate memory use.
    pub fn max_bytes(self, bytes: u64) -> MokaStoreBuilder<ByteCapacity, F> {
        MokaStoreBuilder {
            capacity: ByteCapacity(bytes),
            format: self.format,
            label: self.label,
            eviction_policy: self.eviction_policy,
        }
    }
}

impl<Cap, F: Format> MokaStoreBuilder<Cap, F> {
    /// Sets the name used in logs and metrics. Defaults to `"moka"`.
    pub fn label(mut self, label: impl Into<SmolStr>) -> Self {
        self.label = label.into();
        self
    }

    /// Overrides the eviction policy.
    ///
    /// Defaults to TinyLFU for entry capacity and LRU for byte capacity, where
    /// TinyLFU admission could reject entries that eviction would make room for.
    pub fn eviction_policy(mut self, policy: EvictionPolicy) -> Self {
        self.eviction_policy = Some(policy);
        self
    }

    /// Sets the value format. Defaults to [`JsonFormat`].
    pub fn value_format<NewF: Format>(self, format: NewF) -> MokaStoreBuilder<Cap, NewF> {
        MokaStoreBuilder {
            capacity: self.capacity,
            format,
            label: self.label,
            eviction_policy: self.eviction_policy,
        }
    }
}

impl<F: Format> MokaStoreBuilder<EntryCapacity, F> {
    /// Builds a store bounded by entry count.
    pub fn build(self) -> MokaStore<F> {
        let policy = self.eviction_policy.unwrap_or_else(EvictionPolicy::tiny_lfu);
        let cache: Cache<CacheKey, CacheEntry<Raw>> = CacheBuilder::new(self.capacity.0)
            .eviction_policy(policy)
            .expire_after(Expiration)
            .build();
        MokaStore::new(cache, self.format, self.label)
    }
}

impl<F: Format> MokaStoreBuilder<ByteCapacity, F> {
    /// Builds a store bounded by approximate memory use.
    pub fn build(self) -> MokaStore<F> {
        let policy = self.eviction_policy.unwrap_or_else(EvictionPolicy::lru);
        let cache: Cache<CacheKey, CacheEntry<Raw>> = CacheBuilder::new(self.capacity.0)
            .weigher(weigh)
            .eviction_policy(policy)
            .expire_after(Expiration)
            .build();
        MokaStore::new(cache, self.format, self.label)
    }
}
