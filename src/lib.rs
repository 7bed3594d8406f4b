//! Academy avatars - transform, storage and cache invalidation for profile pictures.
//!
//! This crate turns editor input into canonical avatar images, stores them
//! under a stable per-subject name, and keeps every mounted view coherent
//! through a shared version token that busts both the in-process resolution
//! cache and downstream HTTP caches.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Application layer containing services and use cases.
pub mod application;
/// Domain layer containing entities, errors, and port definitions.
pub mod domain;
/// Infrastructure layer containing object store adapters and configuration.
pub mod infrastructure;
/// Presentation layer containing avatar views.
pub mod presentation;

/// Current version of the application.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name.
pub const NAME: &str = "academy-avatar";
