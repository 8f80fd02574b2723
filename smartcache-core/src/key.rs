//! Request fingerprints and cache keys.
//!
//! A [`Fingerprint`] is the human-readable, pre-hash description of a request's
//! cache identity. Segments are joined with `|`:
//!
//! ```text
//! identity|METHOD|scheme|host|path|header:value...|?query[|body]
//! ```
//!
//! The `|` join is deliberately not escaped. A segment containing `|` can in
//! theory collide with a different split of the same characters; this is the
//! accepted reference behaviour and keeps keys compatible across deployments.
//!
//! A [`CacheKey`] is the SHA-256 digest of a fingerprint, base64 encoded. It is
//! the only thing stores ever see.
//!
//! ```
//! use smartcache_core::Fingerprint;
//!
//! let mut fingerprint = Fingerprint::new("127.0.0.1|curl/8.0");
//! fingerprint.push("GET");
//! fingerprint.push("/items");
//! assert_eq!(fingerprint.as_str(), "127.0.0.1|curl/8.0|GET|/items");
//!
//! let key = fingerprint.to_key();
//! assert_eq!(key.as_str().len(), 44);
//! assert_eq!(key, fingerprint.to_key());
//! ```

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sha2::{Digest, Sha256};
use smol_str::SmolStr;

/// Separator between fingerprint segments.
pub const SEPARATOR: char = '|';

/// Pre-hash composed description of a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fingerprint {
    composed: String,
}

impl Fingerprint {
    /// Starts a fingerprint with the request identity segment.
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            composed: identity.into(),
        }
    }

    /// Appends `|segment`.
    pub fn push(&mut self, segment: &str) {
        self.composed.push(SEPARATOR);
        self.composed.push_str(segment);
    }

    /// Returns the composed fingerprint.
    pub fn as_str(&self) -> &str {
        &self.composed
    }

    /// Hashes the fingerprint into a fixed-length [`CacheKey`].
    pub fn to_key(&self) -> CacheKey {
        CacheKey::digest(self.composed.as_bytes())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.composed)
    }
}

/// Opaque store index derived from a [`Fingerprint`].
///
/// Cloning is cheap: the 44-character digest lives in a reference-counted
/// [`SmolStr`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    inner: SmolStr,
}

impl CacheKey {
    /// SHA-256 over `data`, encoded with standard base64.
    pub fn digest(data: &[u8]) -> Self {
        let hash = Sha256::digest(data);
        CacheKey {
            inner: SmolStr::new(STANDARD.encode(hash)),
        }
    }

    /// Returns the encoded digest.
    pub fn as_str(&self) -> &str {
        &self.inner
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_matches_known_sha256() {
        // sha256("") = e3b0c442...
        let key = CacheKey::digest(b"");
        assert_eq!(key.as_str(), "47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU=");
    }

    #[test]
    fn different_fingerprints_different_keys() {
        let mut a = Fingerprint::new("id");
        a.push("GET");
        let mut b = Fingerprint::new("id");
        b.push("POST");
        assert_ne!(a.to_key(), b.to_key());
    }

    #[test]
    fn separator_is_not_escaped() {
        let mut split = Fingerprint::new("a");
        split.push("b");
        let joined = Fingerprint::new("a|b");
        assert_eq!(split.to_key(), joined.to_key());
    }
}
