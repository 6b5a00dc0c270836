//! Log transport - dry-run sink that writes batches to the log.
//!
//! Useful when wiring up a new page or replaying captured events without
//! touching the collector.

use super::{Transport, TransportError};
use async_trait::async_trait;
use tracing::info;

/// A transport that logs each batch instead of sending it.
#[derive(Debug, Clone)]
pub struct LogTransport {
    /// Prefix for log messages
    prefix: String,
}

impl LogTransport {
    pub fn new() -> Self {
        Self {
            prefix: "dry-run".to_string(),
        }
    }

    /// Create a LogTransport with a custom prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Default for LogTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for LogTransport {
    fn name(&self) -> &str {
        "log"
    }

    async fn send(&self, url: &str, body: String) -> Result<(), TransportError> {
        info!(
            prefix = %self.prefix,
            url = %url,
            body = %body,
            "[{}] Batch for {}",
            self.prefix,
            url
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_transport_always_succeeds() {
        let transport = LogTransport::with_prefix("audit");
        assert_eq!(transport.prefix, "audit");
        assert!(transport
            .send("https://collector.test", "{\"events\":[]}".to_string())
            .await
            .is_ok());
    }
}
