//! Configuration loading

use crate::types::Environment;
use crate::{Config, ConfigFormat};
use meridian_core::{Error, Result};
use regex::Regex;
use std::env;
use std::fs;
use std::path::Path;

/// Load configuration from a file
pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();

    let content = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read config file: {e}")))?;

    let format = ConfigFormat::from_path(path)?;

    load_from_str(&content, format)
}

/// Expand environment variables in configuration string
/// Supports syntax: ${VAR} and ${VAR:-default}
fn expand_env_vars(content: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(:-([^}]*))?\}")
        .map_err(|e| Error::Config(format!("Invalid regex: {e}")))?;

    let mut result = String::new();
    let mut last_match = 0;

    for cap in re.captures_iter(content) {
        let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
            continue;
        };
        let var_name = var_name.as_str();
        let default_value = cap.get(3).map(|m| m.as_str());

        let value = match (env::var(var_name), default_value) {
            (Ok(val), _) => val,
            (Err(_), Some(default)) => default.to_string(),
            (Err(_), None) => {
                return Err(Error::Config(format!(
                    "Environment variable '{var_name}' not set and no default provided"
                )));
            }
        };

        result.push_str(&content[last_match..full_match.start()]);
        result.push_str(&value);
        last_match = full_match.end();
    }

    result.push_str(&content[last_match..]);

    Ok(result)
}

/// Load configuration from a string
pub fn load_from_str(content: &str, format: ConfigFormat) -> Result<Config> {
    let expanded_content = expand_env_vars(content)?;

    let config = match format {
        ConfigFormat::Yaml => serde_yaml::from_str(&expanded_content)
            .map_err(|e| Error::Config(format!("Failed to parse YAML: {e}")))?,
        ConfigFormat::Toml => toml::from_str(&expanded_content)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {e}")))?,
        ConfigFormat::Json => serde_json::from_str(&expanded_content)
            .map_err(|e| Error::Config(format!("Failed to parse JSON: {e}")))?,
    };

    Ok(config)
}

/// Load, optionally override from `MERIDIAN_*` variables, and validate
pub fn load_config<P: AsRef<Path>>(path: P, env_overrides: bool) -> Result<Config> {
    let mut config = load_from_file(path)?;

    if env_overrides {
        apply_env_overrides(&mut config)?;
    }

    crate::validator::validate_config(&config)?;

    Ok(config)
}

/// Apply `MERIDIAN_*` overrides from the process environment
pub fn apply_env_overrides(config: &mut Config) -> Result<()> {
    apply_overrides_from(config, |name| env::var(name).ok())
}

pub(crate) fn apply_overrides_from<F>(config: &mut Config, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(environment) = lookup("MERIDIAN_ENV") {
        config.server.environment = environment.parse::<Environment>()?;
    }

    if let Some(key) = lookup("MERIDIAN_KEY") {
        config.reporting.key = Some(key).filter(|k| !k.is_empty());
    }

    if let Some(graph_ref) = lookup("MERIDIAN_GRAPH_REF") {
        config.reporting.graph_ref = Some(graph_ref).filter(|g| !g.is_empty());
    }

    if let Some(value) = lookup("MERIDIAN_SCHEMA_REPORTING") {
        config.reporting.schema_reporting = parse_bool("MERIDIAN_SCHEMA_REPORTING", &value)?;
    }

    if let Some(value) = lookup("MERIDIAN_HANDLE_SIGNALS") {
        config.server.handle_signals = Some(parse_bool("MERIDIAN_HANDLE_SIGNALS", &value)?);
    }

    tracing::debug!(environment = %config.server.environment, "Applied environment overrides");

    Ok(())
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(Error::Config(format!(
            "{name} must be 'true' or 'false', got '{other}'"
        ))),
    }
}
