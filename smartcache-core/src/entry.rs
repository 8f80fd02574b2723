//! Stored responses and their expiration metadata.
//!
//! - [`CachedResponse`] - the replayable snapshot of a downstream response
//! - [`CacheEntry`] - any payload wrapped with insertion and expiry timestamps
//!
//! Stores keep `CacheEntry<Raw>` (the serialized snapshot) and hand back
//! `CacheEntry<CachedResponse>` after decoding.
//!
//! ```
//! use std::time::Duration;
//! use bytes::Bytes;
//! use smartcache_core::{CacheEntry, CachedResponse};
//!
//! let response = CachedResponse::new(200, "application/json", Bytes::from_static(b"[]"));
//! let entry = CacheEntry::new(response, Duration::from_secs(60));
//!
//! assert!(!entry.is_expired());
//! assert_eq!(entry.data().status, 200);
//! ```

use std::collections::BTreeMap;
use std::mem::size_of;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Raw;

/// Replayable snapshot of a response produced by the downstream handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResponse {
    /// HTTP status code.
    pub status: u16,
    /// Content type as reported by the handler. Empty when the handler set none.
    pub content_type: String,
    /// Response headers, name to ordered values.
    pub headers: BTreeMap<String, Vec<String>>,
    /// Complete response body.
    pub body: Bytes,
}

impl CachedResponse {
    /// Creates a snapshot with no headers besides the content type.
    pub fn new(status: u16, content_type: impl Into<String>, body: Bytes) -> Self {
        CachedResponse {
            status,
            content_type: content_type.into(),
            headers: BTreeMap::new(),
            body,
        }
    }

    /// Adds a header value, keeping earlier values for the same name.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .entry(name.into())
            .or_default()
            .push(value.into());
        self
    }

    /// 204 and 205 responses never carry a body or a content type.
    pub fn is_bodiless(&self) -> bool {
        matches!(self.status, 204 | 205)
    }
}

/// A payload with insertion time and absolute expiry.
///
/// Expiry is fixed at creation (`inserted_at + ttl`); reading an entry never
/// extends it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry<T> {
    data: T,
    inserted_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    /// Stamps `data` with the current time and an expiry `ttl` from now.
    pub fn new(data: T, ttl: Duration) -> Self {
        let inserted_at = Utc::now();
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        let expires_at = inserted_at
            .checked_add_signed(ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        CacheEntry {
            data,
            inserted_at,
            expires_at,
        }
    }

    /// Rebuilds an entry from previously recorded timestamps.
    pub fn from_parts(data: T, inserted_at: DateTime<Utc>, expires_at: DateTime<Utc>) -> Self {
        CacheEntry {
            data,
            inserted_at,
            expires_at,
        }
    }

    /// Returns a reference to the payload.
    #[inline]
    pub fn data(&self) -> &T {
        &self.data
    }

    /// When the entry was created.
    #[inline]
    pub fn inserted_at(&self) -> DateTime<Utc> {
        self.inserted_at
    }

    /// When the entry stops being served.
    #[inline]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// True once `now` has reached the expiry time.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// True once the expiry time has passed.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Time left before expiry, `None` if already expired.
    pub fn ttl(&self) -> Option<Duration> {
        (self.expires_at - Utc::now()).to_std().ok().filter(|ttl| !ttl.is_zero())
    }

    /// Consumes the entry and returns the payload.
    pub fn into_inner(self) -> T {
        self.data
    }

    /// Replaces the payload, keeping the timestamps.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> CacheEntry<U> {
        CacheEntry {
            data: f(self.data),
            inserted_at: self.inserted_at,
            expires_at: self.expires_at,
        }
    }
}

impl CacheEntry<Raw> {
    /// Estimated memory usage of a serialized entry in bytes.
    pub fn memory_size(&self) -> usize {
        size_of::<Self>() + self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_is_insertion_plus_ttl() {
        let entry = CacheEntry::new((), Duration::from_secs(10));
        let ttl = entry.expires_at() - entry.inserted_at();
        assert_eq!(ttl.num_seconds(), 10);
        assert!(!entry.is_expired_at(entry.expires_at() - chrono::Duration::milliseconds(1)));
        assert!(entry.is_expired_at(entry.expires_at() + chrono::Duration::milliseconds(1)));
    }

    #[test]
    fn zero_ttl_is_expired_immediately() {
        let entry = CacheEntry::new((), Duration::ZERO);
        assert!(entry.is_expired());
        assert_eq!(entry.ttl(), None);
    }

    #[test]
    fn huge_ttl_saturates() {
        let entry = CacheEntry::new((), Duration::MAX);
        assert!(!entry.is_expired());
    }

    #[test]
    fn header_values_keep_order() {
        let response = CachedResponse::new(200, "text/plain", Bytes::new())
            .with_header("vary", "accept")
            .with_header("vary", "origin");
        assert_eq!(response.headers["vary"], vec!["accept", "origin"]);
    }
}
