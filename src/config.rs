//! Configuration for the AdvRed adapter.
//!
//! Two layers:
//!
//! - [`AdapterConfig`] is what a host passes on activation
//!   (`{ provider, options: { publisher_id, url } }`).
//! - [`AnalyticsConfig`] is the TOML file read by the replay binary, with
//!   environment variable substitution.
//!
//! # Example
//!
//! ```toml
//! [options]
//! publisher_id = "${ADVRED_PUBLISHER_ID}"
//! flush_interval_ms = 1000
//!
//! [transport]
//! timeout_ms = 10000
//!
//! [page]
//! url = "https://www.example.com/"
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{ADAPTER_CODE, DEFAULT_EVENT_URL, DEFAULT_FLUSH_INTERVAL, DEFAULT_SEND_TIMEOUT};

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Activation config handed over by the host.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AdapterConfig {
    /// Adapter code the host used to select this adapter
    #[serde(default = "default_provider")]
    pub provider: String,

    #[serde(default)]
    pub options: AnalyticsOptions,
}

impl AdapterConfig {
    pub fn new(options: AnalyticsOptions) -> Self {
        Self {
            provider: default_provider(),
            options,
        }
    }
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self::new(AnalyticsOptions::default())
    }
}

fn default_provider() -> String {
    ADAPTER_CODE.to_string()
}

/// Per-activation options.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct AnalyticsOptions {
    /// Publisher identifier copied into every payload (not enforced)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher_id: Option<String>,

    /// Collector endpoint override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Periodic flush interval override, in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flush_interval_ms: Option<u64>,
}

impl AnalyticsOptions {
    pub fn with_publisher_id(publisher_id: impl Into<String>) -> Self {
        Self {
            publisher_id: Some(publisher_id.into()),
            ..Self::default()
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval_ms = Some(u64::try_from(interval.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// The collector URL: the override when set and non-empty, else the default.
    pub fn endpoint_url(&self) -> &str {
        match self.url.as_deref() {
            Some(url) if !url.is_empty() => url,
            _ => DEFAULT_EVENT_URL,
        }
    }

    /// The flush interval; zero or unset falls back to the default.
    pub fn flush_interval(&self) -> Duration {
        match self.flush_interval_ms {
            Some(ms) if ms > 0 => Duration::from_millis(ms),
            _ => DEFAULT_FLUSH_INTERVAL,
        }
    }
}

/// Root of the TOML file read by the replay binary.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AnalyticsConfig {
    #[serde(default)]
    pub options: AnalyticsOptions,

    #[serde(default)]
    pub transport: TransportConfig,

    #[serde(default)]
    pub page: PageConfig,
}

/// Transport configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TransportConfig {
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Log batches instead of sending them
    #[serde(default)]
    pub dry_run: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            dry_run: false,
        }
    }
}

impl TransportConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_timeout_ms() -> u64 {
    DEFAULT_SEND_TIMEOUT.as_millis() as u64
}

/// Page configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct PageConfig {
    #[serde(default)]
    pub url: Option<String>,
}

impl AnalyticsConfig {
    /// Load configuration from the default path or ADVRED_CONFIG env var.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            env::var("ADVRED_CONFIG").unwrap_or_else(|_| "config/advred.toml".to_string());

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            info!(
                path = %path.display(),
                "Config file not found, using defaults"
            );
            return Ok(Self::default());
        }

        info!(path = %path.display(), "Loading configuration");

        let content = fs::read_to_string(path)?;
        let config = Self::parse(&content)?;

        info!(
            endpoint = %config.options.endpoint_url(),
            dry_run = config.transport.dry_run,
            "Configuration loaded"
        );

        Ok(config)
    }

    /// Parse and validate TOML text after env var substitution.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let content = substitute_env_vars(content);

        debug!("Parsing TOML configuration");
        let config: AnalyticsConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Host-side activation config built from the `[options]` section.
    pub fn adapter_config(&self) -> AdapterConfig {
        AdapterConfig::new(self.options.clone())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(url) = &self.options.url {
            if url.contains("${") {
                warn!(url = %url, "Endpoint URL contains unsubstituted environment variable");
            }

            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ConfigError::ValidationError(format!(
                    "endpoint url '{}' must start with http:// or https://",
                    url
                )));
            }
        }

        if self.options.flush_interval_ms == Some(0) {
            return Err(ConfigError::ValidationError(
                "flush_interval_ms must be greater than zero".to_string(),
            ));
        }

        if self.transport.timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "transport timeout_ms must be greater than zero".to_string(),
            ));
        }

        match &self.options.publisher_id {
            None => warn!("No publisher_id configured; payloads will omit publisherId"),
            Some(id) if id.contains("${") => {
                warn!(publisher_id = %id, "publisher_id contains unsubstituted environment variable")
            }
            Some(_) => {}
        }

        Ok(())
    }
}

static ENV_VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("env var pattern is a valid regex")
});

/// Substitute environment variables in the format ${VAR_NAME}
fn substitute_env_vars(content: &str) -> String {
    ENV_VAR_PATTERN
        .replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            match env::var(var_name) {
                Ok(value) => value,
                Err(_) => {
                    debug!(var = %var_name, "Environment variable not set, keeping placeholder");
                    caps[0].to_string()
                }
            }
        })
        .to_string()
}
