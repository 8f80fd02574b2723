//! Metrics declaration and recording.
//!
//! With the `metrics` feature enabled the orchestrator records:
//!
//! - `smartcache_hit_total`: responses served from the store
//! - `smartcache_miss_total`: cacheable requests sent upstream
//! - `smartcache_passthrough_total`: requests not eligible for caching
//! - `smartcache_store_error_total`: failed store reads and writes
//! - `smartcache_upstream_duration_seconds`: time until the upstream produced a response head
//!
//! Without the feature every function is a no-op.

use std::time::Duration;

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
lazy_static! {
    /// Track number of cache hit events.
    pub static ref CACHE_HIT_COUNTER: &'static str = {
        metrics::describe_counter!(
            "smartcache_hit_total",
            "Total number of responses served from the cache."
        );
        "smartcache_hit_total"
    };
    /// Track number of cache miss events.
    pub static ref CACHE_MISS_COUNTER: &'static str = {
        metrics::describe_counter!(
            "smartcache_miss_total",
            "Total number of cacheable requests sent upstream."
        );
        "smartcache_miss_total"
    };
    /// Track number of requests that bypassed the cache.
    pub static ref CACHE_PASSTHROUGH_COUNTER: &'static str = {
        metrics::describe_counter!(
            "smartcache_passthrough_total",
            "Total number of requests not eligible for caching."
        );
        "smartcache_passthrough_total"
    };
    /// Track number of store read and write failures.
    pub static ref CACHE_STORE_ERROR_COUNTER: &'static str = {
        metrics::describe_counter!(
            "smartcache_store_error_total",
            "Total number of failed store operations."
        );
        "smartcache_store_error_total"
    };
    /// Histogram of upstream handling time.
    pub static ref CACHE_UPSTREAM_DURATION: &'static str = {
        metrics::describe_histogram!(
            "smartcache_upstream_duration_seconds",
            metrics::Unit::Seconds,
            "Duration of upstream requests in seconds."
        );
        "smartcache_upstream_duration_seconds"
    };
}

/// Records a response served from `store`.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_hit(store: &str) {
    metrics::counter!(*CACHE_HIT_COUNTER, "store" => store.to_string()).increment(1);
}

/// Records a cacheable request that missed `store`.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_miss(store: &str) {
    metrics::counter!(*CACHE_MISS_COUNTER, "store" => store.to_string()).increment(1);
}

/// Records a request that bypassed the cache.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_passthrough() {
    metrics::counter!(*CACHE_PASSTHROUGH_COUNTER).increment(1);
}

/// Records a failed `operation` ("read" or "write") on `store`.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_store_error(store: &str, operation: &'static str) {
    metrics::counter!(
        *CACHE_STORE_ERROR_COUNTER,
        "store" => store.to_string(),
        "operation" => operation
    )
    .increment(1);
}

/// Records how long the upstream took to answer.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_upstream_duration(duration: Duration) {
    metrics::histogram!(*CACHE_UPSTREAM_DURATION).record(duration.as_secs_f64());
}

#[cfg(not(feature = "metrics"))]
#[inline]
#[allow(missing_docs)]
pub fn record_hit(_store: &str) {}

#[cfg(not(feature = "metrics"))]
#[inline]
#[allow(missing_docs)]
pub fn record_miss(_store: &str) {}

#[cfg(not(feature = "metrics"))]
#[inline]
#[allow(missing_docs)]
pub fn record_passthrough() {}

#[cfg(not(feature = "metrics"))]
#[inline]
#[allow(missing_docs)]
pub fn record_store_error(_store: &str, _operation: &'static str) {}

#[cfg(not(feature = "metrics"))]
#[inline]
#[allow(missing_docs)]
pub fn record_upstream_duration(_duration: Duration) {}
