//! HTTP transport - credentialed JSON POST to the collector.
//!
//! # Example
//!
//! ```rust,ignore
//! use advred_analytics::transport::HttpTransport;
//! use std::time::Duration;
//!
//! let transport = HttpTransport::new()?.with_timeout(Duration::from_secs(5));
//! ```

use super::{Transport, TransportError};
use crate::DEFAULT_SEND_TIMEOUT;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Sends batches as `application/json` POST requests.
///
/// The client keeps a cookie store so that credentials set by the collector
/// accompany later batches. There is exactly one attempt per batch.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    /// HTTP client (reused for connection pooling and cookies)
    client: Client,

    /// Per-request timeout
    timeout: Duration,
}

impl HttpTransport {
    /// Create a transport with the default 10 second timeout.
    pub fn new() -> Result<Self, TransportError> {
        let client = Client::builder().cookie_store(true).build()?;
        Ok(Self {
            client,
            timeout: DEFAULT_SEND_TIMEOUT,
        })
    }

    /// Set custom timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn name(&self) -> &str {
        "http"
    }

    async fn send(&self, url: &str, body: String) -> Result<(), TransportError> {
        debug!(url = %url, bytes = body.len(), "Posting analytics batch");

        let response = self
            .client
            .post(url)
            .timeout(self.timeout)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout(self.timeout.as_millis() as u64)
                } else {
                    TransportError::Http(e)
                }
            })?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(TransportError::Rejected(status.as_u16()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeout() {
        let transport = HttpTransport::new().unwrap();
        assert_eq!(transport.timeout(), Duration::from_secs(10));
        assert_eq!(transport.name(), "http");
    }

    #[test]
    fn test_custom_timeout() {
        let transport = HttpTransport::new()
            .unwrap()
            .with_timeout(Duration::from_millis(1500));
        assert_eq!(transport.timeout(), Duration::from_millis(1500));
    }

    #[tokio::test]
    async fn test_unreachable_collector_is_an_error() {
        let transport = HttpTransport::new()
            .unwrap()
            .with_timeout(Duration::from_millis(500));

        let result = transport
            .send("http://127.0.0.1:9/endpoint", "{}".to_string())
            .await;
        assert!(result.is_err());
    }
}
