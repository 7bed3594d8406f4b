//! Errors surfaced to avatar write actions.

use thiserror::Error;

use super::{StoreError, TransformError};

/// Failure of a change or remove avatar action.
///
/// Read-path failures never produce this type; they resolve to "no avatar".
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AvatarError {
    /// The source photo could not be turned into a canonical image.
    #[error("transform failed: {0}")]
    TransformFailed(#[from] TransformError),

    /// The object store rejected a save or remove.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl AvatarError {
    /// Message suitable for showing to the user who triggered the action.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::TransformFailed(TransformError::InvalidParameters { reason }) => {
                format!("Adjust the crop and try again ({reason}).")
            }
            Self::TransformFailed(_) => {
                "That image could not be read. Try a PNG, JPEG or WebP photo.".to_string()
            }
            Self::Store(e) if e.is_network_error() => {
                "Could not reach storage. Check your connection and try again.".to_string()
            }
            Self::Store(_) => "Saving the avatar failed. Please try again.".to_string(),
        }
    }
}
