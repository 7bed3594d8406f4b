//! Use case implementations.

mod change_avatar_use_case;
mod remove_avatar_use_case;

pub use change_avatar_use_case::{ChangeAvatarRequest, ChangeAvatarResponse, ChangeAvatarUseCase};
pub use remove_avatar_use_case::RemoveAvatarUseCase;
