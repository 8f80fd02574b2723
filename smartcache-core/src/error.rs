//! Error types for store and policy operations.
//!
//! None of these errors ever reach the HTTP client: the orchestrator treats a
//! read failure as a miss, logs write failures, and treats a malformed route
//! policy as "not cacheable".

use thiserror::Error;

use crate::format::FormatError;

/// Error returned by [`ResponseStore`](crate::ResponseStore) operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A stored entry exists but could not be decoded.
    #[error("failed to read cached entry: {0}")]
    Read(#[source] FormatError),

    /// The response could not be serialized into an entry.
    #[error("failed to write cache entry: {0}")]
    Write(#[source] FormatError),

    /// Internal store error, state or capacity failure.
    #[error(transparent)]
    Internal(Box<dyn std::error::Error + Send + Sync>),
}

/// Malformed route configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyError {
    /// A route lists a method name that is not a valid HTTP method token.
    #[error("invalid HTTP method `{0}` in route policy")]
    InvalidMethod(String),

    /// A route declares no methods at all.
    #[error("route policy declares no HTTP methods")]
    NoMethods,
}
