//! Host-side adapter registry.
//!
//! The host keeps analytics adapters by code, enables them with an
//! [`AdapterConfig`] and fans every lifecycle event out to the enabled ones.
//! Adapters plug in through the [`AnalyticsAdapter`] capability trait; there
//! is no base adapter to extend.
//!
//! ```text
//! host event ──► AdapterRegistry::emit ──► enabled adapters ──► track(kind, args)
//! ```

use crate::adapter::AdvRedAnalytics;
use crate::config::AdapterConfig;
use crate::event::TrackedEvent;
use crate::ADAPTER_CODE;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors returned by registry operations.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    #[error("no analytics adapter registered under code '{0}'")]
    UnknownAdapter(String),
}

/// Capability an analytics adapter exposes to the host.
pub trait AnalyticsAdapter: Send + Sync {
    /// Registry code (e.g. "advRed")
    fn code(&self) -> &str;

    fn enable_analytics(&self, config: AdapterConfig);

    fn disable_analytics(&self);

    /// Receive one lifecycle event. Must not fail or block the host.
    fn track(&self, event_type: &str, args: &Value);
}

impl AnalyticsAdapter for AdvRedAnalytics {
    fn code(&self) -> &str {
        ADAPTER_CODE
    }

    fn enable_analytics(&self, config: AdapterConfig) {
        AdvRedAnalytics::enable_analytics(self, config)
    }

    fn disable_analytics(&self) {
        AdvRedAnalytics::disable_analytics(self)
    }

    fn track(&self, event_type: &str, args: &Value) {
        AdvRedAnalytics::track(self, event_type, args)
    }
}

/// Registry of analytics adapters keyed by code.
pub struct AdapterRegistry {
    adapters: HashMap<String, Arc<dyn AnalyticsAdapter>>,
    enabled: BTreeSet<String>,
}

impl AdapterRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            adapters: HashMap::new(),
            enabled: BTreeSet::new(),
        }
    }

    /// Register an adapter under its own code, replacing any previous one.
    pub fn register(&mut self, adapter: Arc<dyn AnalyticsAdapter>) {
        let code = adapter.code().to_string();
        debug!(code = %code, "Registering analytics adapter");

        if self.adapters.insert(code.clone(), adapter).is_some() {
            warn!(code = %code, "Analytics adapter replaced");
            self.enabled.remove(&code);
        }
    }

    /// Get an adapter by code
    pub fn get(&self, code: &str) -> Option<Arc<dyn AnalyticsAdapter>> {
        self.adapters.get(code).cloned()
    }

    /// List all registered adapter codes
    pub fn list(&self) -> Vec<&str> {
        self.adapters.keys().map(|s| s.as_str()).collect()
    }

    pub fn is_enabled(&self, code: &str) -> bool {
        self.enabled.contains(code)
    }

    /// Enable the adapter named by `config.provider`.
    pub fn enable(&mut self, config: AdapterConfig) -> Result<(), RegistryError> {
        let code = config.provider.clone();
        let adapter = self
            .get(&code)
            .ok_or_else(|| RegistryError::UnknownAdapter(code.clone()))?;

        adapter.enable_analytics(config);
        self.enabled.insert(code.clone());
        info!(code = %code, "Analytics adapter enabled");
        Ok(())
    }

    /// Disable an adapter; a no-op if it was not enabled.
    pub fn disable(&mut self, code: &str) -> Result<(), RegistryError> {
        let adapter = self
            .get(code)
            .ok_or_else(|| RegistryError::UnknownAdapter(code.to_string()))?;

        if self.enabled.remove(code) {
            adapter.disable_analytics();
            info!(code = %code, "Analytics adapter disabled");
        }
        Ok(())
    }

    /// Disable every enabled adapter.
    pub fn disable_all(&mut self) {
        for code in std::mem::take(&mut self.enabled) {
            if let Some(adapter) = self.adapters.get(&code) {
                adapter.disable_analytics();
                info!(code = %code, "Analytics adapter disabled");
            }
        }
    }

    /// Push a host event to every enabled adapter.
    ///
    /// Returns how many adapters received it.
    pub fn emit(&self, event: &TrackedEvent) -> usize {
        let mut delivered = 0;
        for code in &self.enabled {
            if let Some(adapter) = self.adapters.get(code) {
                adapter.track(&event.event_type, &event.args);
                delivered += 1;
            }
        }

        if delivered == 0 {
            debug!(event_type = %event.event_type, "No enabled analytics adapters");
        }
        delivered
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;

    #[derive(Default)]
    struct TestAdapter {
        calls: Mutex<Vec<String>>,
    }

    impl AnalyticsAdapter for TestAdapter {
        fn code(&self) -> &str {
            "test"
        }

        fn enable_analytics(&self, config: AdapterConfig) {
            self.calls.lock().push(format!("enable:{}", config.provider));
        }

        fn disable_analytics(&self) {
            self.calls.lock().push("disable".to_string());
        }

        fn track(&self, event_type: &str, _args: &Value) {
            self.calls.lock().push(format!("track:{event_type}"));
        }
    }

    fn test_config() -> AdapterConfig {
        AdapterConfig {
            provider: "test".to_string(),
            ..AdapterConfig::default()
        }
    }

    #[test]
    fn test_registry() {
        let mut registry = AdapterRegistry::new();
        registry.register(Arc::new(TestAdapter::default()));

        assert!(registry.get("test").is_some());
        assert!(registry.get("nonexistent").is_none());
        assert_eq!(registry.list(), vec!["test"]);
    }

    #[test]
    fn test_emit_reaches_only_enabled_adapters() {
        let adapter = Arc::new(TestAdapter::default());
        let mut registry = AdapterRegistry::new();
        registry.register(adapter.clone());

        let event = TrackedEvent::new("bidWon", json!({}));
        assert_eq!(registry.emit(&event), 0);

        registry.enable(test_config()).unwrap();
        assert_eq!(registry.emit(&event), 1);

        registry.disable("test").unwrap();
        assert_eq!(registry.emit(&event), 0);

        assert_eq!(
            *adapter.calls.lock(),
            vec!["enable:test", "track:bidWon", "disable"]
        );
    }

    #[test]
    fn test_unknown_adapter() {
        let mut registry = AdapterRegistry::new();
        assert_eq!(
            registry.enable(AdapterConfig::default()),
            Err(RegistryError::UnknownAdapter("advRed".to_string()))
        );
        assert!(registry.disable("missing").is_err());
    }

    #[test]
    fn test_disable_twice_calls_adapter_once() {
        let adapter = Arc::new(TestAdapter::default());
        let mut registry = AdapterRegistry::new();
        registry.register(adapter.clone());
        registry.enable(test_config()).unwrap();

        registry.disable("test").unwrap();
        registry.disable("test").unwrap();
        registry.disable_all();

        let disables = adapter.calls.lock().iter().filter(|c| *c == "disable").count();
        assert_eq!(disables, 1);
    }

    #[test]
    fn test_advred_registers_under_its_code() {
        let adapter = AdvRedAnalytics::new(
            Arc::new(crate::transport::LogTransport::new()),
            Arc::new(crate::page::StaticPageUrl::unknown()),
        );
        let mut registry = AdapterRegistry::new();
        registry.register(Arc::new(adapter));
        assert_eq!(registry.list(), vec![ADAPTER_CODE]);
    }
}
