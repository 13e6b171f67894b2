//! Configuration builder

use crate::types::{Config, Environment};
use std::time::Duration;

/// Builder for constructing configuration programmatically
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new configuration builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the deployment environment
    pub fn environment(mut self, environment: Environment) -> Self {
        self.config.server.environment = environment;
        self
    }

    /// Force stack traces in error responses on or off
    pub fn include_stacktrace(mut self, enabled: bool) -> Self {
        self.config.server.include_stacktrace_in_error_responses = Some(enabled);
        self
    }

    /// Force introspection on or off
    pub fn introspection(mut self, enabled: bool) -> Self {
        self.config.server.introspection = Some(enabled);
        self
    }

    /// Force termination signal handling on or off
    pub fn handle_signals(mut self, enabled: bool) -> Self {
        self.config.server.handle_signals = Some(enabled);
        self
    }

    /// Set the reporting credential
    pub fn reporting_key(mut self, key: impl Into<String>) -> Self {
        self.config.reporting.key = Some(key.into());
        self
    }

    /// Set the graph reference
    pub fn graph_ref(mut self, graph_ref: impl Into<String>) -> Self {
        self.config.reporting.graph_ref = Some(graph_ref.into());
        self
    }

    /// Enable or disable schema reporting
    pub fn schema_reporting(mut self, enabled: bool) -> Self {
        self.config.reporting.schema_reporting = enabled;
        self
    }

    /// Set the usage report interval
    pub fn report_interval(mut self, interval: Duration) -> Self {
        self.config.reporting.report_interval = interval;
        self
    }

    /// Set the default cache-control max-age in seconds
    pub fn default_max_age(mut self, seconds: u32) -> Self {
        self.config.cache_control.default_max_age = seconds;
        self
    }

    /// Disable the document cache
    pub fn without_document_cache(mut self) -> Self {
        self.config.document_cache.enabled = false;
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> meridian_core::Result<Config> {
        crate::validator::validate_config(&self.config)?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new()
            .environment(Environment::Production)
            .reporting_key("service:abc")
            .graph_ref("my-graph@current")
            .default_max_age(30)
            .build()
            .unwrap();

        assert_eq!(config.server.environment, Environment::Production);
        assert_eq!(config.reporting.key.as_deref(), Some("service:abc"));
        assert_eq!(config.cache_control.default_max_age, 30);
    }

    #[test]
    fn test_builder_validates() {
        let result = ConfigBuilder::new().graph_ref("not a ref").build();
        assert!(result.is_err());
    }
}
