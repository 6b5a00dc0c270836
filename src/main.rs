//! AdvRed Replay - feed recorded auction events through the adapter.
//!
//! Reads newline-delimited JSON envelopes (`{"eventType": ..., "args": ...}`)
//! from stdin and pushes them through the adapter registry, exactly as a host
//! page would. On EOF or SIGINT/SIGTERM the adapter is disabled (flushing what
//! is left) and pending sends get a bounded grace period.
//!
//! ## Configuration
//!
//! Environment variables:
//! - `ADVRED_CONFIG`: Path to the TOML config (default: "config/advred.toml")
//! - `RUST_LOG`: Logging level (default: "info")

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use advred_analytics::config::AnalyticsConfig;
use advred_analytics::page::StaticPageUrl;
use advred_analytics::shutdown::ShutdownSignal;
use advred_analytics::transport::{HttpTransport, LogTransport, Transport};
use advred_analytics::{AdapterRegistry, AdvRedAnalytics, TrackedEvent, ADAPTER_CODE};

/// Build the transport selected by configuration.
fn build_transport(config: &AnalyticsConfig) -> Result<Arc<dyn Transport>, Box<dyn std::error::Error>> {
    if config.transport.dry_run {
        info!("Dry run: batches will be logged, not sent");
        return Ok(Arc::new(LogTransport::new()));
    }

    let transport = HttpTransport::new()?.with_timeout(config.transport.timeout());
    Ok(Arc::new(transport))
}

/// Read envelopes from stdin until EOF. Returns (lines read, lines rejected).
async fn replay_stdin(registry: &AdapterRegistry) -> std::io::Result<(u64, u64)> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut read: u64 = 0;
    let mut rejected: u64 = 0;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        read += 1;

        match serde_json::from_str::<TrackedEvent>(line) {
            Ok(event) => {
                debug!(event_type = %event.event_type, "Replaying event");
                registry.emit(&event);
            }
            Err(e) => {
                rejected += 1;
                warn!(line = read, error = %e, "Skipping malformed event line");
            }
        }
    }

    Ok((read, rejected))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    dotenvy::dotenv().ok();

    run().await
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = match AnalyticsConfig::load() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return Err(e.into());
        }
    };

    let adapter = AdvRedAnalytics::new(
        build_transport(&config)?,
        Arc::new(StaticPageUrl::from(config.page.url.clone())),
    );

    let mut registry = AdapterRegistry::new();
    registry.register(Arc::new(adapter.clone()));
    registry.enable(config.adapter_config())?;

    info!(
        code = %ADAPTER_CODE,
        session = ?adapter.session_id(),
        "AdvRed replay started, reading events from stdin"
    );

    // Setup graceful shutdown
    let shutdown = ShutdownSignal::new();

    tokio::select! {
        result = replay_stdin(&registry) => {
            match result {
                Ok((read, rejected)) => info!(read = read, rejected = rejected, "Reached end of input"),
                Err(e) => error!(error = %e, "Failed reading stdin"),
            }
        }
        _ = shutdown.wait() => {}
    }

    registry.disable_all();

    if tokio::time::timeout(shutdown.timeout(), adapter.settle())
        .await
        .is_err()
    {
        warn!(
            timeout_secs = shutdown.timeout().as_secs(),
            "Pending analytics sends did not finish before shutdown"
        );
    }

    info!("AdvRed replay finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dry_run_selects_log_transport() {
        let config = AnalyticsConfig::parse(
            r#"
            [transport]
            dry_run = true
        "#,
        )
        .unwrap();
        assert_eq!(build_transport(&config).unwrap().name(), "log");
    }

    #[test]
    fn test_live_config_selects_http_transport() {
        let config = AnalyticsConfig::parse("").unwrap();
        assert!(!config.transport.dry_run);
        assert_eq!(build_transport(&config).unwrap().name(), "http");
    }

    #[test]
    fn test_config_error_converts_to_boxed_error() {
        let err = AnalyticsConfig::parse("[options]\nurl = \"ftp://x\"").unwrap_err();
        let boxed: Box<dyn std::error::Error> = err.into();
        assert!(!boxed.to_string().is_empty());
    }
}
