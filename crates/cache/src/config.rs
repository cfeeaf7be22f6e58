//! Cache configuration.
//!
//! The cache can be switched off entirely and its directory relocated.
//! Configuration can come from a config file section (via serde), from
//! environment variables, or be built programmatically.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding the cache directory
pub const CACHE_DIR_ENV: &str = "EARMARK_CACHE_DIR";
/// Environment variable enabling or disabling the cache
pub const CACHE_ENABLED_ENV: &str = "EARMARK_CACHE_ENABLED";

/// Configuration for the document blob cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Whether fetched documents are cached at all
    pub enabled: bool,
    /// Directory path for the disk cache
    pub dir: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { enabled: true, dir: Self::default_cache_dir() }
    }
}

impl CacheConfig {
    /// Enables or disables caching.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Sets the disk cache directory.
    pub fn with_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.dir = path.as_ref().to_path_buf();
        self
    }

    /// Returns the default cache directory for the current platform.
    ///
    /// - macOS: ~/Library/Caches/earmark/documents
    /// - Linux: ~/.cache/earmark/documents
    /// - Windows: %LOCALAPPDATA%\earmark\documents
    pub fn default_cache_dir() -> PathBuf {
        match dirs::cache_dir() {
            Some(cache_dir) => cache_dir.join("earmark").join("documents"),
            None => PathBuf::from("cache/documents"),
        }
    }

    /// Loads configuration from environment variables on top of the defaults.
    ///
    /// Environment variables:
    /// - `EARMARK_CACHE_DIR`: disk cache directory path
    /// - `EARMARK_CACHE_ENABLED`: `true`/`false` (also `1`/`0`, `yes`/`no`, `on`/`off`)
    ///
    /// # Errors
    /// Returns an error if any environment variable contains an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Overrides fields that are set in the environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(val) = std::env::var(CACHE_DIR_ENV) {
            self.dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var(CACHE_ENABLED_ENV) {
            self.enabled = parse_bool(&val)
                .ok_or_else(|| ConfigError::InvalidValue(CACHE_ENABLED_ENV.to_string()))?;
        }

        Ok(())
    }
}

/// Parses the boolean spellings accepted in environment variables.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Errors that can occur while reading cache configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Invalid value for a configuration parameter
    #[error("invalid value for configuration key: {0}")]
    InvalidValue(String),
}
