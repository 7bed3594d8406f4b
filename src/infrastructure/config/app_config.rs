//! Application configuration.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::application::services::image_transformer::{
    DEFAULT_MAX_OUTPUT_BYTES, DEFAULT_OUTPUT_SIZE,
};
use crate::application::services::resolution_cache::DEFAULT_CACHE_CAPACITY;
use crate::application::services::{ImageTransformerConfig, ResolutionCacheConfig};
use crate::domain::entities::{AvatarNaming, DEFAULT_LEGACY_EXTENSIONS};

const APP_NAME: &str = "academy-avatar";
const APP_QUALIFIER: &str = "com";
const APP_ORGANIZATION: &str = "academy";

/// Log level configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trace => write!(f, "trace"),
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Which object store adapter to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Local directory.
    #[default]
    Fs,
    /// HTTP object store.
    Http,
}

/// Application configuration.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Log file path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Object store configuration.
    #[serde(default)]
    pub store: StoreConfig,

    /// Transform and resolution tuning.
    #[serde(default)]
    pub avatar: AvatarConfig,
}

/// Object store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Adapter holding avatar objects.
    #[serde(default)]
    pub backend: StoreBackend,

    /// Directory for the filesystem backend. Defaults to the data directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,

    /// Endpoint of the HTTP backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Base URL objects are publicly served from.
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,

    /// Bearer token for the HTTP backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Prefix prepended to every object name, e.g. `avatars/`.
    #[serde(default)]
    pub key_prefix: String,

    /// HTTP request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Fs,
            root: None,
            base_url: None,
            public_base_url: default_public_base_url(),
            api_key: None,
            key_prefix: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Transform and resolution tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvatarConfig {
    /// Edge length of stored avatars in pixels.
    #[serde(default = "default_output_size")]
    pub output_size: u32,

    /// Largest encoded avatar accepted, in bytes.
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,

    /// Older extensions still recognised when resolving.
    #[serde(default = "default_legacy_extensions")]
    pub legacy_extensions: Vec<String>,

    /// Timeout of a single existence probe, in milliseconds.
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,

    /// Maximum number of resolved entries kept in memory.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// Append the version token to resolved URLs.
    #[serde(default = "default_true")]
    pub cache_bust: bool,
}

impl Default for AvatarConfig {
    fn default() -> Self {
        Self {
            output_size: default_output_size(),
            max_output_bytes: default_max_output_bytes(),
            legacy_extensions: default_legacy_extensions(),
            probe_timeout_ms: default_probe_timeout_ms(),
            cache_capacity: default_cache_capacity(),
            cache_bust: true,
        }
    }
}

fn default_public_base_url() -> String {
    "http://localhost:8080/avatars".to_string()
}

const fn default_timeout_secs() -> u64 {
    30
}

const fn default_output_size() -> u32 {
    DEFAULT_OUTPUT_SIZE
}

const fn default_max_output_bytes() -> usize {
    DEFAULT_MAX_OUTPUT_BYTES
}

fn default_legacy_extensions() -> Vec<String> {
    DEFAULT_LEGACY_EXTENSIONS
        .iter()
        .map(ToString::to_string)
        .collect()
}

const fn default_probe_timeout_ms() -> u64 {
    1500
}

const fn default_cache_capacity() -> usize {
    DEFAULT_CACHE_CAPACITY
}

const fn default_true() -> bool {
    true
}

use super::args::CliArgs;

impl AppConfig {
    /// Merges CLI arguments into the configuration.
    pub fn merge_with_args(&mut self, args: &CliArgs) {
        if let Some(log_path) = &args.log_path {
            self.log_path = Some(log_path.clone());
        }
        if let Some(log_level) = args.log_level {
            self.log_level = log_level;
        }
        if let Some(backend) = args.backend {
            self.store.backend = backend;
        }
        if let Some(root) = &args.store_root {
            self.store.root = Some(root.clone());
        }
        if let Some(base_url) = &args.base_url {
            self.store.base_url = Some(base_url.clone());
        }
        if let Some(public_base_url) = &args.public_base_url {
            self.store.public_base_url.clone_from(public_base_url);
        }
        if let Some(api_key) = &args.api_key {
            self.store.api_key = Some(api_key.clone());
        }
        if let Some(cache_bust) = args.cache_bust {
            self.avatar.cache_bust = cache_bust;
        }
    }

    /// Returns default config directory.
    #[must_use]
    pub fn default_config_dir() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Returns default directory for the filesystem backend.
    #[must_use]
    pub fn default_store_root() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.data_dir().join("objects"))
    }

    /// Returns effective log path. Logging goes to stderr when unset.
    #[must_use]
    pub fn effective_log_path(&self) -> Option<PathBuf> {
        self.log_path.clone()
    }

    /// Returns effective filesystem backend root.
    #[must_use]
    pub fn effective_store_root(&self) -> Option<PathBuf> {
        self.store.root.clone().or_else(Self::default_store_root)
    }

    #[must_use]
    pub fn transformer_config(&self) -> ImageTransformerConfig {
        ImageTransformerConfig {
            output_size: self.avatar.output_size,
            max_output_bytes: self.avatar.max_output_bytes,
        }
    }

    #[must_use]
    pub fn cache_config(&self) -> ResolutionCacheConfig {
        ResolutionCacheConfig {
            capacity: self.avatar.cache_capacity,
            probe_timeout: Duration::from_millis(self.avatar.probe_timeout_ms),
            cache_bust: self.avatar.cache_bust,
        }
    }

    #[must_use]
    pub fn naming(&self) -> AvatarNaming {
        AvatarNaming::new(self.store.key_prefix.clone(), &self.avatar.legacy_extensions)
    }

    #[must_use]
    pub const fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store.timeout_secs)
    }
}
