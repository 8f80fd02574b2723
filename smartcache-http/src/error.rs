use thiserror::Error;

/// A stored entry that can't be turned back into a response.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReplayError {
    /// The stored status is outside 100..=999.
    #[error("stored status code {0} is not valid")]
    InvalidStatus(u16),
    /// The stored content type has characters a header can't carry.
    #[error("stored content type {0:?} is not a valid header value")]
    InvalidContentType(String),
}
