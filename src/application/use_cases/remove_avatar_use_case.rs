//! Remove avatar use case implementation.

use tracing::info;

use crate::application::services::{AvatarStore, VersionBroadcaster};
use crate::domain::entities::{SubjectId, VersionToken};
use crate::domain::errors::AvatarError;

/// Deletes a subject's avatar and announces the change.
#[derive(Clone)]
pub struct RemoveAvatarUseCase {
    store: AvatarStore,
    broadcaster: VersionBroadcaster,
}

impl RemoveAvatarUseCase {
    /// Creates new remove avatar use case.
    #[must_use]
    pub const fn new(store: AvatarStore, broadcaster: VersionBroadcaster) -> Self {
        Self { store, broadcaster }
    }

    /// Removes the avatar, then bumps the version.
    ///
    /// # Errors
    /// Returns `AvatarError::Store` if the delete fails; the version is left untouched.
    pub async fn execute(&self, subject: &SubjectId) -> Result<VersionToken, AvatarError> {
        self.store.remove(subject).await?;
        let version = self.broadcaster.bump();
        info!(subject = %subject, version = %version, "Avatar removal announced");
        Ok(version)
    }
}
