//! Plugin error types

use http::{HeaderName, HeaderValue, StatusCode};
use std::fmt;

/// Plugin error type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PluginError {
    /// Initialization failed
    #[error("Initialization failed: {0}")]
    InitError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Runtime error
    #[error("{0}")]
    RuntimeError(String),

    /// Transport policy rejection, answered with `status` and `headers`
    #[error("{message}")]
    Http {
        /// Response status
        status: StatusCode,
        /// Required response headers
        headers: Vec<(HeaderName, HeaderValue)>,
        /// Error message
        message: String,
    },
}

/// Result type for plugin operations
pub type Result<T> = std::result::Result<T, PluginError>;

impl PluginError {
    /// Create a new initialization error
    pub fn init(msg: impl fmt::Display) -> Self {
        Self::InitError(msg.to_string())
    }

    /// Create a new configuration error
    pub fn config(msg: impl fmt::Display) -> Self {
        Self::ConfigError(msg.to_string())
    }

    /// Create a new runtime error
    pub fn runtime(msg: impl fmt::Display) -> Self {
        Self::RuntimeError(msg.to_string())
    }

    /// Create a new transport policy error
    pub fn http(
        status: StatusCode,
        headers: Vec<(HeaderName, HeaderValue)>,
        msg: impl fmt::Display,
    ) -> Self {
        Self::Http {
            status,
            headers,
            message: msg.to_string(),
        }
    }

    /// Convert into the server error type, attributing it to `plugin`
    pub fn into_error(self, plugin: &str) -> meridian_core::Error {
        match self {
            PluginError::Http {
                status,
                headers,
                message,
            } => meridian_core::Error::Http {
                status,
                headers,
                message,
            },
            other => meridian_core::Error::plugin(plugin, other.to_string()),
        }
    }
}
