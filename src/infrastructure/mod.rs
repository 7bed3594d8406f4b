//! Infrastructure layer with external service adapters.

/// Application configuration.
pub mod config;
/// Object store adapters.
pub mod object_store;

pub use config::{AppConfig, CliArgs, ConfigError, ConfigManager, LogLevel, StoreBackend};
pub use object_store::{FsObjectStore, HttpObjectStore};
