//! Image transform error types.

use thiserror::Error;

/// Reasons the avatar editor could not produce a canonical image.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum TransformError {
    #[error("invalid transform parameters: {reason}")]
    InvalidParameters { reason: String },

    #[error("failed to decode source image: {message}")]
    Decode { message: String },

    #[error("failed to encode avatar: {message}")]
    Encode { message: String },

    #[error("encoded avatar is {size} bytes, limit is {max}")]
    TooLarge { size: usize, max: usize },

    #[error("transform task failed: {message}")]
    Task { message: String },
}

impl TransformError {
    /// Creates invalid parameters error.
    #[must_use]
    pub fn invalid_parameters(reason: impl Into<String>) -> Self {
        Self::InvalidParameters {
            reason: reason.into(),
        }
    }

    /// Creates decode error.
    #[must_use]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Creates encode error.
    #[must_use]
    pub fn encode(message: impl Into<String>) -> Self {
        Self::Encode {
            message: message.into(),
        }
    }
}
