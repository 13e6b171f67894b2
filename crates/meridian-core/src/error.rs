//! Error types for the Meridian server

use http::{HeaderName, HeaderValue, StatusCode};

/// Result type alias using [`Error`]
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Message returned to operation callers after a failed startup.
///
/// The underlying startup error can carry credentials, file paths or internal
/// configuration, so it only ever goes to the server logs.
pub const STARTUP_FAILED_MESSAGE: &str =
    "This data graph is missing a valid configuration. More details may be available in the server logs.";

/// Main error type for the Meridian server
///
/// Errors are `Clone` so a captured startup or shutdown failure can be
/// replayed to every caller that observes it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Configuration error (raised while constructing a server)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Plugin error
    #[error("Plugin error in '{plugin}': {message}")]
    Plugin {
        /// Plugin name
        plugin: String,
        /// Error message
        message: String,
    },

    /// Illegal lifecycle transition (programming error, not retryable)
    #[error("Lifecycle error: {0}")]
    Lifecycle(String),

    /// Operation attempted before the server was started
    #[error("The server must be started before executing operations; call `start()` and await it first")]
    NotStarted,

    /// Operation attempted after a failed startup
    #[error("{}", STARTUP_FAILED_MESSAGE)]
    StartupFailed,

    /// Operation attempted while disposal hooks are running
    #[error("Cannot execute GraphQL operations while the server is stopping")]
    Stopping,

    /// Operation attempted after the server stopped
    #[error("Cannot execute GraphQL operations after the server has stopped")]
    Stopped,

    /// More than one plugin renders a landing page
    #[error("Only one plugin can render a landing page, but found: {}", .0.join(", "))]
    MultipleLandingPages(Vec<String>),

    /// Schema provider cannot deliver schema updates
    #[error("Incompatible schema provider: {0}")]
    IncompatibleSchemaProvider(String),

    /// Schema error
    #[error("Schema error: {0}")]
    Schema(String),

    /// Transport policy error carrying an HTTP status and required headers
    #[error("{message}")]
    Http {
        /// Status the transport should answer with
        status: StatusCode,
        /// Headers the transport must set on the response
        headers: Vec<(HeaderName, HeaderValue)>,
        /// Error message
        message: String,
    },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(String),

    /// Internal error (should not happen in production)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a plugin error
    pub fn plugin(plugin: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Plugin {
            plugin: plugin.into(),
            message: message.into(),
        }
    }

    /// Create a lifecycle error
    pub fn lifecycle(message: impl Into<String>) -> Self {
        Error::Lifecycle(message.into())
    }

    /// Create a transport policy error
    pub fn http(
        status: StatusCode,
        headers: Vec<(HeaderName, HeaderValue)>,
        message: impl Into<String>,
    ) -> Self {
        Error::Http {
            status,
            headers,
            message: message.into(),
        }
    }

    /// Convert error to HTTP status code
    pub fn to_status_code(&self) -> StatusCode {
        match self {
            Error::Http { status, .. } => *status,
            Error::NotStarted | Error::Stopping | Error::Stopped | Error::StartupFailed => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Error::Serialization(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// GraphQL `extensions.code` reported for this error
    pub fn extension_code(&self) -> &'static str {
        match self {
            Error::Http { status, .. } if status.is_client_error() => "BAD_REQUEST",
            Error::Serialization(_) => "BAD_REQUEST",
            _ => "INTERNAL_SERVER_ERROR",
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(Error::Stopped.to_status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            Error::plugin("usage", "boom").to_status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );

        let err = Error::http(
            StatusCode::METHOD_NOT_ALLOWED,
            vec![(http::header::ALLOW, HeaderValue::from_static("POST"))],
            "GET supports only query operations",
        );
        assert_eq!(err.to_status_code(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(err.extension_code(), "BAD_REQUEST");
    }

    #[test]
    fn test_plugin_error() {
        let err = Error::plugin("schema-reporting", "invalid key");
        assert!(matches!(err, Error::Plugin { .. }));
        assert!(err.to_string().contains("schema-reporting"));
        assert!(err.to_string().contains("invalid key"));
    }

    #[test]
    fn test_startup_failed_is_redacted() {
        let err = Error::StartupFailed;
        assert_eq!(err.to_string(), STARTUP_FAILED_MESSAGE);
    }

    #[test]
    fn test_multiple_landing_pages_lists_plugins() {
        let err = Error::MultipleLandingPages(vec!["a".into(), "b".into()]);
        assert!(err.to_string().starts_with("Only one plugin can render a landing page"));
        assert!(err.to_string().contains("a, b"));
    }

    #[test]
    fn test_errors_replay_identically() {
        let err = Error::plugin("stopper", "no way 1");
        let replay = err.clone();
        assert_eq!(err, replay);
        assert_eq!(err.to_string(), replay.to_string());
    }
}
