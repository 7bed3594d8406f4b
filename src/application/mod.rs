//! Application layer with avatar services and use cases.

/// Avatar services: transform, store, broadcast, resolve.
pub mod services;
/// Use case implementations.
pub mod use_cases;

pub use services::{
    AvatarStore, ImageTransformer, ResolutionCache, VersionBroadcaster, initials,
};
pub use use_cases::{ChangeAvatarRequest, ChangeAvatarUseCase, RemoveAvatarUseCase};
