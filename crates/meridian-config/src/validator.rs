//! Configuration validation

use crate::Config;
use meridian_core::{Error, Result};
use regex::Regex;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_reporting(config)?;
    validate_document_cache(config)?;
    validate_logging(config)?;

    Ok(())
}

fn validate_reporting(config: &Config) -> Result<()> {
    let reporting = &config.reporting;

    if matches!(reporting.key.as_deref(), Some(key) if key.trim().is_empty()) {
        return Err(Error::Config("reporting key cannot be empty".to_string()));
    }

    if let Some(graph_ref) = &reporting.graph_ref {
        let re = Regex::new(r"^[A-Za-z0-9_-]+(@[A-Za-z0-9_.-]+)?$")
            .map_err(|e| Error::Config(format!("Invalid regex: {e}")))?;
        if !re.is_match(graph_ref) {
            return Err(Error::Config(format!(
                "Invalid graph_ref '{graph_ref}' (expected 'graph-id' or 'graph-id@variant')"
            )));
        }
    }

    if reporting.report_interval.is_zero() {
        return Err(Error::Config("report_interval must be > 0".to_string()));
    }

    if reporting.schema_reporting && reporting.key.is_none() {
        tracing::warn!("schema_reporting is enabled but no reporting key is configured");
    }

    Ok(())
}

fn validate_document_cache(config: &Config) -> Result<()> {
    if config.document_cache.enabled && config.document_cache.max_entries == 0 {
        return Err(Error::Config(
            "document_cache.max_entries must be > 0 when the cache is enabled".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(config: &Config) -> Result<()> {
    let level = config.observability.logging.level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        return Err(Error::Config(format!(
            "Invalid log level: {} (must be one of {})",
            config.observability.logging.level,
            LOG_LEVELS.join(", ")
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_valid_default_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_graph_ref_shapes() {
        let mut config = Config::default();

        for valid in ["my-graph", "my-graph@current", "graph_1@v1.2"] {
            config.reporting.graph_ref = Some(valid.to_string());
            assert!(validate_config(&config).is_ok(), "{valid} should be valid");
        }

        for invalid in ["", "my graph", "a@b@c", "@variant"] {
            config.reporting.graph_ref = Some(invalid.to_string());
            assert!(validate_config(&config).is_err(), "{invalid} should be invalid");
        }
    }

    #[test]
    fn test_empty_key() {
        let mut config = Config::default();
        config.reporting.key = Some("  ".to_string());
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_zero_report_interval() {
        let mut config = Config::default();
        config.reporting.report_interval = Duration::ZERO;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_zero_cache_entries() {
        let mut config = Config::default();
        config.document_cache.max_entries = 0;
        assert!(validate_config(&config).is_err());

        config.document_cache.enabled = false;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_unknown_log_level() {
        let mut config = Config::default();
        config.observability.logging.level = "loud".to_string();
        assert!(validate_config(&config).is_err());
    }
}
