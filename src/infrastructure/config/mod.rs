//! Application configuration.

pub mod app_config;
pub mod args;
pub mod storage;

pub use app_config::{AppConfig, AvatarConfig, LogLevel, StoreBackend, StoreConfig};
pub use args::{CliArgs, Command, TransformArgs};
pub use storage::{ConfigError, ConfigManager};
