//! Error types for the synthetic metric generator

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the metric generator
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Prometheus client error
    #[error("Prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Config file could not be read or parsed
    #[error("Failed to load config file {path}: {reason}")]
    ConfigLoad { path: String, reason: String },

    /// Invalid resolved configuration
    #[error("Configuration error: {0}")]
    Config(String),

    // =========================================================================
    // Registry Errors
    // =========================================================================
    /// A metric with the same name is already registered
    #[error("Duplicate metric registration: {name}")]
    DuplicateRegistration { name: String },

    // =========================================================================
    // Runtime Errors
    // =========================================================================
    /// Downstream collector endpoint unreachable
    #[error("Collector connection error: {0}")]
    CollectorConnection(#[source] reqwest::Error),

    /// HTTP server failed to drain within the grace period
    #[error("Shutdown failed: {0}")]
    Shutdown(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether the error must abort the process before serving traffic
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Error::ConfigLoad { .. } | Error::CollectorConnection(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degraded_errors_are_not_fatal() {
        let err = Error::ConfigLoad {
            path: "config.yaml".to_string(),
            reason: "not found".to_string(),
        };
        assert!(!err.is_fatal());
        assert!(Error::DuplicateRegistration {
            name: "test_counter0".to_string()
        }
        .is_fatal());
        assert!(Error::Shutdown("timed out".to_string()).is_fatal());
    }

    #[test]
    fn test_error_display() {
        let err = Error::DuplicateRegistration {
            name: "test_gauge3".to_string(),
        };
        assert_eq!(err.to_string(), "Duplicate metric registration: test_gauge3");
    }
}
