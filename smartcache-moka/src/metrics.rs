//! Moka store capacity metrics.
//!
//! Enable the `metrics` feature to record:
//!
//! - `smartcache_moka_entries`: current number of entries (gauge)
//! - `smartcache_moka_size_bytes`: current weighted size in bytes (gauge)
//!
//! Both carry a `store` label with the store's name.

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
lazy_static! {
    /// Metric name for the entry count gauge.
    pub static ref MOKA_ENTRIES: &'static str = {
        metrics::describe_gauge!(
            "smartcache_moka_entries",
            "Current number of entries in the Moka response store."
        );
        "smartcache_moka_entries"
    };

    /// Metric name for the weighted size gauge.
    pub static ref MOKA_SIZE_BYTES: &'static str = {
        metrics::describe_gauge!(
            "smartcache_moka_size_bytes",
            "Current weighted size of the Moka response store in bytes."
        );
        "smartcache_moka_size_bytes"
    };
}

/// Records the entry count and weighted size of a store.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_capacity(store: &str, entries: u64, size_bytes: u64) {
    metrics::gauge!(*MOKA_ENTRIES, "store" => store.to_string()).set(entries as f64);
    metrics::gauge!(*MOKA_SIZE_BYTES, "store" => store.to_string()).set(size_bytes as f64);
}

/// No-op when the `metrics` feature is disabled.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_capacity(_store: &str, _entries: u64, _size_bytes: u64) {}
