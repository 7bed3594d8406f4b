//! Domain layer with core avatar entities and port definitions.

/// Entity definitions.
pub mod entities;
/// Error types.
pub mod errors;
/// Port definitions.
pub mod ports;

pub use entities::{CacheEntry, CacheKey, Profile, SubjectId, VersionToken};
pub use errors::{AvatarError, StoreError, TransformError};
pub use ports::ObjectStorePort;
