//! Error Handling Infrastructure
//!
//! This module defines all error types used throughout the Fortress SDK.
//! Every fallible operation returns [`Result`]; there are no success-flag
//! response objects. Errors map to stable error codes for JSON output.
//!
//! # Error Categories
//! - `Configuration`: missing org id / api key or an unusable client setting
//! - `Validation`: request rejected by the control plane (HTTP 400) or locally
//! - `Internal`: control-plane failure (HTTP 500 or any unexpected status)
//! - `Timeout`: a control-plane request exceeded the configured deadline
//! - `Decryption`: malformed connection-detail ciphertext, bad key, MAC mismatch
//! - `InvalidConnectionDetails`: decrypted payload lacks a required field
//! - `Connection`: the downstream database refused the connection
//! - `QueryFailed`: a statement failed on a live connection

use thiserror::Error;

/// Main error type for Fortress SDK operations
#[derive(Error, Debug)]
pub enum FortressError {
    /// Client could not be configured (fatal, no network call attempted)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Request rejected as malformed, by the control plane or locally
    #[error("Validation error: {0}")]
    Validation(String),

    /// Control-plane side failure
    #[error("Internal error: {0}")]
    Internal(String),

    /// Control-plane request exceeded its deadline
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Connection-detail ciphertext could not be decrypted
    /// The message never contains key material.
    #[error("Decryption error: {0}")]
    Decryption(String),

    /// Decrypted connection details are incomplete
    #[error("Invalid connection details: {0}")]
    InvalidConnectionDetails(String),

    /// Downstream database refused the connection
    #[error("Connection error: {0}")]
    Connection(String),

    /// Statement execution failed on an established connection
    #[error("Query execution failed: {0}")]
    QueryFailed(String),
}

impl FortressError {
    /// Convert error to error code string for JSON output
    ///
    /// Error codes are stable and suitable for programmatic handling.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Timeout(_) => "TIMEOUT",
            Self::Decryption(_) => "DECRYPTION_ERROR",
            Self::InvalidConnectionDetails(_) => "INVALID_CONNECTION_DETAILS",
            Self::Connection(_) => "CONNECTION_ERROR",
            Self::QueryFailed(_) => "QUERY_FAILED",
        }
    }

    /// Whether a caller-driven retry (with backoff) may succeed
    ///
    /// The SDK itself never retries.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Internal(_) | Self::Timeout(_))
    }

    /// Get human-readable error message (no sensitive data)
    #[must_use]
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a timeout error
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout(message.into())
    }

    /// Create a decryption error
    pub fn decryption(message: impl Into<String>) -> Self {
        Self::Decryption(message.into())
    }

    /// Create an invalid connection details error
    pub fn invalid_connection_details(message: impl Into<String>) -> Self {
        Self::InvalidConnectionDetails(message.into())
    }

    /// Create a connection error
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a query failed error
    pub fn query_failed(message: impl Into<String>) -> Self {
        Self::QueryFailed(message.into())
    }
}

/// Result type alias for Fortress SDK operations
pub type Result<T> = std::result::Result<T, FortressError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(FortressError::configuration("test").error_code(), "CONFIGURATION_ERROR");
        assert_eq!(FortressError::validation("test").error_code(), "VALIDATION_ERROR");
        assert_eq!(FortressError::internal("test").error_code(), "INTERNAL_ERROR");
        assert_eq!(FortressError::timeout("test").error_code(), "TIMEOUT");
        assert_eq!(FortressError::decryption("test").error_code(), "DECRYPTION_ERROR");
        assert_eq!(
            FortressError::invalid_connection_details("test").error_code(),
            "INVALID_CONNECTION_DETAILS"
        );
        assert_eq!(FortressError::connection("test").error_code(), "CONNECTION_ERROR");
        assert_eq!(FortressError::query_failed("test").error_code(), "QUERY_FAILED");
    }

    #[test]
    fn test_error_messages() {
        let err = FortressError::validation("alias already taken");
        assert!(err.message().contains("alias already taken"));

        let err = FortressError::decryption("invalid MAC");
        assert_eq!(err.message(), "Decryption error: invalid MAC");
    }

    #[test]
    fn test_retryable_errors() {
        assert!(FortressError::internal("boom").is_retryable());
        assert!(FortressError::timeout("slow").is_retryable());

        assert!(!FortressError::validation("bad").is_retryable());
        assert!(!FortressError::configuration("bad").is_retryable());
        assert!(!FortressError::decryption("bad").is_retryable());
        assert!(!FortressError::connection("refused").is_retryable());
    }

    #[test]
    fn test_error_constructors() {
        let err = FortressError::configuration("test");
        assert!(matches!(err, FortressError::Configuration(_)));

        let err = FortressError::invalid_connection_details("test");
        assert!(matches!(err, FortressError::InvalidConnectionDetails(_)));

        let err = FortressError::query_failed("test");
        assert!(matches!(err, FortressError::QueryFailed(_)));
    }
}
