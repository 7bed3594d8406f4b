//! Presentation layer with headless avatar views.

/// Mounted avatar views.
pub mod avatar_view;

pub use avatar_view::{AvatarRender, AvatarView};
