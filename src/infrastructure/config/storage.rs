//! Locating and bootstrapping `config.toml`.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use super::app_config::AppConfig;

const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no platform configuration directory is available")]
    NoPlatformDir,
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write default config to {}: {source}", path.display())]
    WriteDefault {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode default config: {0}")]
    Encode(#[from] toml::ser::Error),
}

/// Finds the config file and seeds it with defaults on first run.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    default_path: PathBuf,
}

impl ConfigManager {
    /// Uses `config.toml` in the platform config directory.
    ///
    /// # Errors
    /// Returns `ConfigError::NoPlatformDir` when no home directory can be found.
    pub fn new() -> Result<Self, ConfigError> {
        AppConfig::default_config_dir()
            .map(Self::with_dir)
            .ok_or(ConfigError::NoPlatformDir)
    }

    #[must_use]
    pub fn with_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            default_path: dir.as_ref().join(CONFIG_FILE),
        }
    }

    /// File read when no override is given.
    #[must_use]
    pub fn default_path(&self) -> &Path {
        &self.default_path
    }

    /// Loads `path_override`, or the default file.
    ///
    /// A missing file is created with defaults. A file that does not parse is
    /// left as is and defaults are used.
    ///
    /// # Errors
    /// Returns `ConfigError` when the file cannot be read or the default cannot be written.
    pub fn load_config(&self, path_override: Option<&Path>) -> Result<AppConfig, ConfigError> {
        let path = path_override.unwrap_or(&self.default_path);

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %path.display(), "Writing default avatar config");
                let config = AppConfig::default();
                seed(path, &config)?;
                return Ok(config);
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        match toml::from_str(&content) {
            Ok(config) => Ok(config),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unparsable config, using defaults");
                Ok(AppConfig::default())
            }
        }
    }
}

/// Writes `config` to `path` through a temp file in the same directory.
fn seed(path: &Path, config: &AppConfig) -> Result<(), ConfigError> {
    let encoded = toml::to_string_pretty(config)?;
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let failed = |source: std::io::Error| ConfigError::WriteDefault {
        path: path.to_path_buf(),
        source,
    };

    fs::create_dir_all(dir).map_err(failed)?;
    let mut staged = tempfile::NamedTempFile::new_in(dir).map_err(failed)?;
    staged.write_all(encoded.as_bytes()).map_err(failed)?;
    staged.persist(path).map_err(|e| failed(e.error))?;

    debug!(path = %path.display(), "Seeded config file");
    Ok(())
}
