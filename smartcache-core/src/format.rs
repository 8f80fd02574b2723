//! Serialization formats for stored responses.
//!
//! Stores keep entries as raw bytes so that every read sees either a complete
//! snapshot or a decode error, never a half-built value.
//!
//! - [`JsonFormat`] (default): readable, matches what most HTTP caches store
//! - [`BincodeFormat`]: compact binary encoding

use bytes::Bytes;
use thiserror::Error;

use crate::{CachedResponse, Raw};

/// Error produced while encoding or decoding a stored response.
#[derive(Error, Debug)]
pub enum FormatError {
    /// The response could not be serialized.
    #[error(transparent)]
    Serialize(Box<dyn std::error::Error + Send + Sync>),

    /// Stored bytes could not be turned back into a response.
    #[error(transparent)]
    Deserialize(Box<dyn std::error::Error + Send + Sync>),
}

/// Value format used by a store.
pub trait Format: Send + Sync + std::fmt::Debug {
    /// Serializes a response snapshot.
    fn encode(&self, response: &CachedResponse) -> Result<Raw, FormatError>;

    /// Deserializes a response snapshot.
    fn decode(&self, data: &[u8]) -> Result<CachedResponse, FormatError>;
}

/// JSON format (default)
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormat;

impl Format for JsonFormat {
    fn encode(&self, response: &CachedResponse) -> Result<Raw, FormatError> {
        serde_json::to_vec(response)
            .map(Bytes::from)
            .map_err(|error| FormatError::Serialize(Box::new(error)))
    }

    fn decode(&self, data: &[u8]) -> Result<CachedResponse, FormatError> {
        serde_json::from_slice(data).map_err(|error| FormatError::Deserialize(Box::new(error)))
    }
}

/// Bincode format
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeFormat;

impl Format for BincodeFormat {
    fn encode(&self, response: &CachedResponse) -> Result<Raw, FormatError> {
        bincode::serde::encode_to_vec(response, bincode::config::standard())
            .map(Bytes::from)
            .map_err(|error| FormatError::Serialize(Box::new(error)))
    }

    fn decode(&self, data: &[u8]) -> Result<CachedResponse, FormatError> {
        bincode::serde::decode_from_slice(data, bincode::config::standard())
            .map(|(response, _)| response)
            .map_err(|error| FormatError::Deserialize(Box::new(error)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CachedResponse {
        CachedResponse::new(201, "application/json", Bytes::from_static(b"{\"a\":1}"))
            .with_header("x-request-id", "abc")
    }

    #[test]
    fn json_keeps_every_field() {
        let raw = JsonFormat.encode(&sample()).unwrap();
        assert_eq!(JsonFormat.decode(&raw).unwrap(), sample());
    }

    #[test]
    fn bincode_keeps_every_field() {
        let raw = BincodeFormat.encode(&sample()).unwrap();
        assert_eq!(BincodeFormat.decode(&raw).unwrap(), sample());
    }

    #[test]
    fn corrupt_bytes_fail_to_decode() {
        let error = JsonFormat.decode(b"{not json").unwrap_err();
        assert!(matches!(error, FormatError::Deserialize(_)));
    }
}
