//! Error Handling Module
//!
//! Error types for the broker core: the `BrokerError` enum covers every
//! failure an adapter, the registry, the rehoster or the scheduler can
//! produce, and `FailureKind` is the coarse classification persisted on a
//! failed task record.

use serde::{Deserialize, Serialize};

/// Broker error type
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    /// Malformed or missing endpoint/credential; never retried
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// No enabled, credentialed provider matches the requested modality/model
    #[error("No provider available: {0}")]
    NoProviderAvailable(String),

    /// Provider returned a non-success response for a dispatch or poll
    #[error("Provider '{provider}' rejected the request ({status}): {message}")]
    ProviderRejected {
        provider: String,
        status: u16,
        message: String,
    },

    /// A bounded outbound call exceeded its deadline
    #[error("Provider '{provider}' timed out: {message}")]
    ProviderTimeout { provider: String, message: String },

    /// Transport-level HTTP failure (connection refused, TLS, etc.)
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Provider response could not be parsed into the expected wire type
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Task store rejected or failed a read/write
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Task inputs failed validation before dispatch
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Operation not supported by the targeted adapter
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),
}

impl BrokerError {
    /// Create a provider rejection from an HTTP status and response body
    pub fn provider_rejected(
        provider: impl Into<String>,
        status: u16,
        message: impl Into<String>,
    ) -> Self {
        Self::ProviderRejected {
            provider: provider.into(),
            status: status.into(),
            message: message.into(),
        }
    }

    /// Create a provider timeout error
    pub fn provider_timeout(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ProviderTimeout {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Map a `reqwest` transport error, distinguishing timeouts from other
    /// connection failures
    pub fn from_transport(provider: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::provider_timeout(provider, err.to_string())
        } else {
            Self::HttpError(err.to_string())
        }
    }

    /// HTTP status code associated with this error, when one exists
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::ProviderRejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Coarse category used for logging and metrics labels
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigurationError(_) => ErrorCategory::Configuration,
            Self::NoProviderAvailable(_) => ErrorCategory::Configuration,
            Self::ProviderRejected { .. } => ErrorCategory::Provider,
            Self::ProviderTimeout { .. } => ErrorCategory::Network,
            Self::HttpError(_) => ErrorCategory::Network,
            Self::ParseError(_) => ErrorCategory::Parsing,
            Self::StorageError(_) => ErrorCategory::Storage,
            Self::InvalidInput(_) => ErrorCategory::Validation,
            Self::UnsupportedOperation(_) => ErrorCategory::Validation,
        }
    }

    /// Classification persisted on the task record when this error ends a
    /// dispatch attempt
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::ConfigurationError(_) => FailureKind::Configuration,
            Self::NoProviderAvailable(_) => FailureKind::NoProviderAvailable,
            Self::ProviderRejected { .. } => FailureKind::ProviderRejected,
            Self::ProviderTimeout { .. } => FailureKind::ProviderTimeout,
            _ => FailureKind::Internal,
        }
    }
}

/// Error category (coarse-grained)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Provider,
    Network,
    Parsing,
    Storage,
    Validation,
}

/// Failure classification stored on a `Failed` task.
///
/// `NoProviderAvailable` and `Configuration` indicate an operator problem,
/// the provider kinds a (possibly transient) upstream problem. The broker
/// never resubmits either way; a new task must be created to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Configuration,
    NoProviderAvailable,
    ProviderRejected,
    ProviderTimeout,
    Internal,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Configuration => write!(f, "configuration"),
            FailureKind::NoProviderAvailable => write!(f, "no_provider_available"),
            FailureKind::ProviderRejected => write!(f, "provider_rejected"),
            FailureKind::ProviderTimeout => write!(f, "provider_timeout"),
            FailureKind::Internal => write!(f, "internal"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_kind_mapping() {
        let e = BrokerError::NoProviderAvailable("video".into());
        assert_eq!(e.failure_kind(), FailureKind::NoProviderAvailable);

        let e = BrokerError::provider_rejected("apix", 500, "boom");
        assert_eq!(e.failure_kind(), FailureKind::ProviderRejected);
        assert_eq!(e.status_code(), Some(500));

        let e = BrokerError::provider_timeout("apix", "deadline exceeded");
        assert_eq!(e.failure_kind(), FailureKind::ProviderTimeout);
        assert_eq!(e.category(), ErrorCategory::Network);
    }

    #[test]
    fn test_configuration_errors_are_operator_facing() {
        let e = BrokerError::ConfigurationError("endpoint is not a valid URL".into());
        assert_eq!(e.category(), ErrorCategory::Configuration);
        assert_eq!(e.failure_kind(), FailureKind::Configuration);
    }
}
