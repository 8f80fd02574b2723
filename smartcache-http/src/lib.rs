//! # smartcache-http
//!
//! HTTP adapters for the SmartCache engine.
//!
//! - [`KeyGenerator`] turns a request into a [`Fingerprint`](smartcache_core::Fingerprint),
//!   buffering the body of POST, PUT and PATCH requests without taking it away
//!   from the handler ([`BufferedBody`])
//! - [`identity`] decides whose response this is
//! - [`CaptureBody`] tees a response body into the store
//! - [`response`] snapshots response heads and replays stored entries
//!
//! The service that wires these together lives in `smartcache-tower`.

#![warn(missing_docs)]

pub mod body;
pub mod capture;
mod error;
pub mod fingerprint;
pub mod identity;
pub mod response;

pub use body::{BufferedBody, PartialBufferedBody};
pub use capture::{CaptureBody, CaptureOutcome, CommitFn};
pub use error::ReplayError;
pub use fingerprint::{KeyGenerator, keys_body};
pub use identity::{AuthenticatedUser, RemoteAddr, SessionId};
pub use response::{
    CACHE_HIT_HEADER, CACHE_HIT_VALUE, ResponseBody, cached_head, content_type, replay,
};
