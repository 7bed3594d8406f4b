//! Change avatar use case implementation.

use bytes::Bytes;
use tracing::{debug, info, warn};

use crate::application::services::{AvatarStore, ImageTransformer, VersionBroadcaster};
use crate::domain::entities::{StoredObjectName, SubjectId, TransformParams, VersionToken};
use crate::domain::errors::AvatarError;

/// Photo and editor parameters submitted by the "change avatar" action.
#[derive(Debug, Clone)]
pub struct ChangeAvatarRequest {
    pub subject: SubjectId,
    pub source: Bytes,
    pub params: TransformParams,
}

impl ChangeAvatarRequest {
    #[must_use]
    pub fn new(subject: SubjectId, source: impl Into<Bytes>, params: TransformParams) -> Self {
        Self {
            subject,
            source: source.into(),
            params,
        }
    }
}

/// Outcome of a successful avatar change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeAvatarResponse {
    /// Object the avatar was written to.
    pub name: StoredObjectName,
    /// Epoch announced to every view.
    pub version: VersionToken,
}

/// Transforms, stores and announces a new avatar.
#[derive(Clone)]
pub struct ChangeAvatarUseCase {
    transformer: ImageTransformer,
    store: AvatarStore,
    broadcaster: VersionBroadcaster,
}

impl ChangeAvatarUseCase {
    /// Creates new change avatar use case.
    #[must_use]
    pub const fn new(
        transformer: ImageTransformer,
        store: AvatarStore,
        broadcaster: VersionBroadcaster,
    ) -> Self {
        Self {
            transformer,
            store,
            broadcaster,
        }
    }

    /// Executes the change. The version is bumped only after the save succeeded.
    ///
    /// # Errors
    /// Returns `AvatarError::TransformFailed` if the photo cannot be rendered and
    /// `AvatarError::Store` if persisting it fails.
    pub async fn execute(
        &self,
        request: ChangeAvatarRequest,
    ) -> Result<ChangeAvatarResponse, AvatarError> {
        debug!(subject = %request.subject, bytes = request.source.len(), "Changing avatar");

        let blob = self
            .transformer
            .transform(request.source, request.params)
            .await
            .map_err(|e| {
                warn!(subject = %request.subject, error = %e, "Avatar transform failed");
                e
            })?;

        let name = self.store.save(&request.subject, &blob).await?;
        let version = self.broadcaster.bump();

        info!(subject = %request.subject, version = %version, "Avatar changed");
        Ok(ChangeAvatarResponse { name, version })
    }
}
