//! Avatar subsystem services.

pub mod avatar_store;
pub mod image_transformer;
pub mod initials;
pub mod resolution_cache;
pub mod url_params;
pub mod version_broadcaster;

pub use avatar_store::AvatarStore;
pub use image_transformer::{
    CropGeometry, ImageTransformer, ImageTransformerConfig, QuarterTurnCrop,
};
pub use initials::{initials, initials_color};
pub use resolution_cache::{
    CacheStats, Lookup, PendingResolution, ResolutionCache, ResolutionCacheConfig,
};
pub use version_broadcaster::{Subscription, VersionBroadcaster};
