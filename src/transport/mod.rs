//! Transport gateway for flushed batches.
//!
//! A [`Transport`] receives a target URL and an already-serialized JSON body
//! and makes one best-effort delivery attempt. The adapter spawns each send
//! and never waits on it; the returned result is only used for logging.
//!
//! ## Built-in Transports
//!
//! - [`HttpTransport`]: credentialed POST with a bounded timeout
//! - [`LogTransport`]: writes the payload to the log instead of sending it
//!
//! ## Custom Transports
//!
//! ```rust,ignore
//! use advred_analytics::{Transport, TransportError};
//! use async_trait::async_trait;
//!
//! struct Discard;
//!
//! #[async_trait]
//! impl Transport for Discard {
//!     fn name(&self) -> &str {
//!         "discard"
//!     }
//!
//!     async fn send(&self, _url: &str, _body: String) -> Result<(), TransportError> {
//!         Ok(())
//!     }
//! }
//! ```

pub mod http;
pub mod log;

use async_trait::async_trait;
use thiserror::Error;

pub use self::http::HttpTransport;
pub use self::log::LogTransport;

/// Errors a delivery attempt can end with.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The request did not complete within the client timeout
    #[error("request timed out after {0}ms")]
    Timeout(u64),

    /// Connection or protocol failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The collector answered with a non-success status
    #[error("collector rejected batch with status {0}")]
    Rejected(u16),
}

/// A best-effort sink for serialized batches.
///
/// Implementations must be `Send + Sync`: sends run on spawned tasks.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Short name used in log fields (e.g. "http", "log")
    fn name(&self) -> &str;

    /// Attempt one delivery of `body` to `url`.
    async fn send(&self, url: &str, body: String) -> Result<(), TransportError>;
}
