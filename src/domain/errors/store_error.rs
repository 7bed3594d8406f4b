//! Object store error types.

use thiserror::Error;

/// Failures reported by an object store backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum StoreError {
    #[error("network error talking to object store: {message}")]
    Network { message: String },

    #[error("object store rejected {operation} ({status}): {message}")]
    Backend {
        operation: &'static str,
        status: u16,
        message: String,
    },

    #[error("object store io error: {message}")]
    Io { message: String },

    #[error("object store timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("invalid object store url {url:?}: {message}")]
    InvalidUrl { url: String, message: String },
}

impl StoreError {
    /// Creates network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Creates backend rejection error.
    #[must_use]
    pub fn backend(operation: &'static str, status: u16, message: impl Into<String>) -> Self {
        Self::Backend {
            operation,
            status,
            message: message.into(),
        }
    }

    /// Creates io error.
    #[must_use]
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates invalid base URL error.
    #[must_use]
    pub fn invalid_url(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Returns whether the error came from the transport rather than the backend.
    #[must_use]
    pub const fn is_network_error(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Timeout { .. })
    }
}
