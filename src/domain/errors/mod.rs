//! Domain error types.

mod avatar_error;
mod store_error;
mod transform_error;

pub use avatar_error::AvatarError;
pub use store_error::StoreError;
pub use transform_error::TransformError;
