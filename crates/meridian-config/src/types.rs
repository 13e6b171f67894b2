//! Configuration types

use meridian_core::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Server behaviour
    #[serde(default)]
    pub server: ServerConfig,

    /// Usage and schema reporting
    #[serde(default)]
    pub reporting: ReportingConfig,

    /// Default cache-control policy
    #[serde(default)]
    pub cache_control: CacheControlConfig,

    /// Parsed document cache
    #[serde(default)]
    pub document_cache: DocumentCacheConfig,

    /// Observability
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Deployment environment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development
    #[default]
    Development,
    /// Production deployment
    Production,
    /// Test suite
    Test,
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Production => write!(f, "production"),
            Environment::Test => write!(f, "test"),
        }
    }
}

impl FromStr for Environment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            "test" => Ok(Environment::Test),
            other => Err(Error::Config(format!("Unknown environment: {other}"))),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    /// Deployment environment
    #[serde(default)]
    pub environment: Environment,

    /// Include `extensions.stacktrace` in error responses (default: development only)
    #[serde(default)]
    pub include_stacktrace_in_error_responses: Option<bool>,

    /// Allow introspection queries (default: everywhere but production)
    #[serde(default)]
    pub introspection: Option<bool>,

    /// Stop the server on SIGINT/SIGTERM (default: everywhere but test)
    #[serde(default)]
    pub handle_signals: Option<bool>,
}

impl ServerConfig {
    /// Effective stack trace setting
    pub fn include_stacktrace(&self) -> bool {
        self.include_stacktrace_in_error_responses
            .unwrap_or(self.environment == Environment::Development)
    }

    /// Effective introspection setting
    pub fn introspection_enabled(&self) -> bool {
        self.introspection
            .unwrap_or(self.environment != Environment::Production)
    }

    /// Effective signal handling setting
    pub fn handle_signals_enabled(&self) -> bool {
        self.handle_signals
            .unwrap_or(self.environment != Environment::Test)
    }
}

/// Reporting configuration
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportingConfig {
    /// Reporting credential
    #[serde(default)]
    pub key: Option<String>,

    /// Graph reference (`graph-id@variant`)
    #[serde(default)]
    pub graph_ref: Option<String>,

    /// Report the schema on start and on change
    #[serde(default)]
    pub schema_reporting: bool,

    /// Usage report flush interval
    #[serde(default = "default_report_interval", with = "humantime_serde")]
    pub report_interval: Duration,
}

impl fmt::Debug for ReportingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReportingConfig")
            .field("key", &self.key.as_ref().map(|_| "<redacted>"))
            .field("graph_ref", &self.graph_ref)
            .field("schema_reporting", &self.schema_reporting)
            .field("report_interval", &self.report_interval)
            .finish()
    }
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            key: None,
            graph_ref: None,
            schema_reporting: false,
            report_interval: default_report_interval(),
        }
    }
}

/// Cache-control configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheControlConfig {
    /// Default max-age in seconds for cacheable responses
    #[serde(default)]
    pub default_max_age: u32,

    /// Emit `cache-control` response headers
    #[serde(default = "default_true")]
    pub calculate_http_headers: bool,
}

impl Default for CacheControlConfig {
    fn default() -> Self {
        Self {
            default_max_age: 0,
            calculate_http_headers: true,
        }
    }
}

/// Document cache configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentCacheConfig {
    /// Enable the cache
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Maximum cached documents
    #[serde(default = "default_max_entries")]
    pub max_entries: u64,
}

impl DocumentCacheConfig {
    /// Capacity to build a cache with, if enabled
    pub fn capacity(&self) -> Option<u64> {
        self.enabled.then_some(self.max_entries)
    }
}

impl Default for DocumentCacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: default_max_entries(),
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ObservabilityConfig {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable text
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

fn default_report_interval() -> Duration {
    Duration::from_secs(10)
}

fn default_true() -> bool {
    true
}

fn default_max_entries() -> u64 {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_defaults() {
        let dev = ServerConfig::default();
        assert!(dev.include_stacktrace());
        assert!(dev.introspection_enabled());
        assert!(dev.handle_signals_enabled());

        let prod = ServerConfig {
            environment: Environment::Production,
            ..ServerConfig::default()
        };
        assert!(!prod.include_stacktrace());
        assert!(!prod.introspection_enabled());
        assert!(prod.handle_signals_enabled());

        let test = ServerConfig {
            environment: Environment::Test,
            ..ServerConfig::default()
        };
        assert!(!test.handle_signals_enabled());
        assert!(test.introspection_enabled());
    }

    #[test]
    fn test_explicit_settings_win() {
        let config = ServerConfig {
            environment: Environment::Test,
            handle_signals: Some(true),
            include_stacktrace_in_error_responses: Some(true),
            introspection: Some(false),
        };
        assert!(config.handle_signals_enabled());
        assert!(config.include_stacktrace());
        assert!(!config.introspection_enabled());
    }

    #[test]
    fn test_reporting_key_redacted_in_debug() {
        let reporting = ReportingConfig {
            key: Some("service:secret-key".to_string()),
            ..ReportingConfig::default()
        };
        let debug = format!("{reporting:?}");
        assert!(!debug.contains("secret-key"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_environment_from_str() {
        assert_eq!("PROD".parse::<Environment>().unwrap(), Environment::Production);
        assert_eq!("test".parse::<Environment>().unwrap(), Environment::Test);
        assert!("staging".parse::<Environment>().is_err());
    }

    #[test]
    fn test_document_cache_capacity() {
        assert_eq!(DocumentCacheConfig::default().capacity(), Some(1000));
        let disabled = DocumentCacheConfig {
            enabled: false,
            ..DocumentCacheConfig::default()
        };
        assert_eq!(disabled.capacity(), None);
    }
}
