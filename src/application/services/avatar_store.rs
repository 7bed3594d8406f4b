//! Avatar write path.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::entities::{AvatarNaming, CanonicalImageBlob, StoredObjectName, SubjectId};
use crate::domain::errors::StoreError;
use crate::domain::ports::ObjectStorePort;

/// Persists canonical avatars, keeping at most one canonical object per subject.
///
/// Knows nothing about caching: callers bump the version broadcaster after a
/// successful `save` or `remove`.
#[derive(Clone)]
pub struct AvatarStore {
    store: Arc<dyn ObjectStorePort>,
    naming: AvatarNaming,
}

impl AvatarStore {
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStorePort>, naming: AvatarNaming) -> Self {
        Self { store, naming }
    }

    #[must_use]
    pub const fn naming(&self) -> &AvatarNaming {
        &self.naming
    }

    /// Replaces the subject's avatar with `blob`.
    ///
    /// Every recognised name is deleted before the canonical one is written,
    /// so a failed write leaves the subject with no avatar rather than two.
    ///
    /// # Errors
    /// Returns the backend's `StoreError` from the delete or the write. A
    /// failed delete aborts before anything is written.
    pub async fn save(
        &self,
        subject: &SubjectId,
        blob: &CanonicalImageBlob,
    ) -> Result<StoredObjectName, StoreError> {
        let names = self.naming.candidates(subject);
        debug!(subject = %subject, names = names.len(), "Clearing previous avatar objects");

        self.store.delete(&names).await.map_err(|e| {
            warn!(subject = %subject, error = %e, "Failed to clear previous avatar");
            e
        })?;

        let canonical = self.naming.canonical(subject);
        self.store
            .put(&canonical, blob.bytes().clone(), blob.content_type())
            .await
            .map_err(|e| {
                warn!(subject = %subject, name = %canonical, error = %e, "Failed to write avatar");
                e
            })?;

        info!(subject = %subject, name = %canonical, bytes = blob.len(), "Avatar saved");
        Ok(canonical)
    }

    /// Deletes every recognised avatar object for the subject.
    ///
    /// Removing a subject without an avatar succeeds.
    ///
    /// # Errors
    /// Returns the backend's `StoreError`.
    pub async fn remove(&self, subject: &SubjectId) -> Result<(), StoreError> {
        let names = self.naming.candidates(subject);
        self.store.delete(&names).await.map_err(|e| {
            warn!(subject = %subject, error = %e, "Failed to remove avatar");
            e
        })?;
        info!(subject = %subject, "Avatar removed");
        Ok(())
    }
}
