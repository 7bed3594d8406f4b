//! Domain entity definitions.

mod avatar;
mod subject;
mod transform;
mod version;

pub use avatar::{
    AvatarNaming, CANONICAL_CONTENT_TYPE, CANONICAL_EXTENSION, CacheEntry, CacheKey,
    CanonicalImageBlob, DEFAULT_LEGACY_EXTENSIONS, StoredObjectName,
};
pub use subject::{InvalidSubjectId, Profile, SubjectId};
pub use transform::{MAX_SCALE, MIN_SCALE, TransformParams};
pub use version::VersionToken;
