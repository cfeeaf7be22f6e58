//! Application configuration.
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! environment variables. The CLI applies explicit flags on top.

use content_tree::{ContentProvider, HttpContentSource, LocalContentTree};
use earmark_cache::CacheConfig;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use storage::Storage;
use viewer_core::DEFAULT_MAX_AUTO_RETRIES;

pub const CONTENT_ROOT_ENV: &str = "EARMARK_CONTENT_ROOT";
pub const CONTENT_MIRROR_ENV: &str = "EARMARK_CONTENT_MIRROR";
pub const ORIGIN_URL_ENV: &str = "EARMARK_ORIGIN_URL";
pub const MIRROR_URL_ENV: &str = "EARMARK_MIRROR_URL";
pub const DATA_DIR_ENV: &str = "EARMARK_DATA_DIR";
pub const MAX_RETRIES_ENV: &str = "EARMARK_MAX_RETRIES";

const DEFAULT_CONTENT_ROOT: &str = "public/content";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for configuration key: {0}")]
    InvalidValue(String),
    #[error("invalid URL for {key}: {value}")]
    InvalidUrl { key: &'static str, value: String },
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write config {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error(transparent)]
    Cache(#[from] earmark_cache::ConfigError),
}

/// Where content comes from and where local state lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Root of the local content tree
    pub content_root: PathBuf,
    /// Second copy of the tree used as the alternate delivery route
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_mirror: Option<PathBuf>,
    /// HTTP origin; takes precedence over `content_root` when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_url: Option<String>,
    /// Alternate HTTP origin
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mirror_url: Option<String>,
    /// Directory holding the reading history
    pub data_dir: PathBuf,
    /// Automatic retries before a load fails for good
    pub max_auto_retries: u32,
    pub cache: CacheConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            content_root: PathBuf::from(DEFAULT_CONTENT_ROOT),
            content_mirror: None,
            origin_url: None,
            mirror_url: None,
            data_dir: Self::default_data_dir(),
            max_auto_retries: DEFAULT_MAX_AUTO_RETRIES,
            cache: CacheConfig::default(),
        }
    }
}

impl AppConfig {
    /// Platform data directory, or `./data` when none can be resolved.
    pub fn default_data_dir() -> PathBuf {
        match Storage::from_default_project() {
            Ok(storage) => storage.root().to_path_buf(),
            Err(_) => dirs::data_local_dir()
                .map(|dir| dir.join("earmark"))
                .unwrap_or_else(|| PathBuf::from("data")),
        }
    }

    /// Defaults, then `file` if given, then the environment.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match file {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        Ok(config)
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Parses a TOML file. Missing keys keep their defaults and unknown keys
    /// are ignored.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        let config = toml::from_str(&text)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;
        tracing::debug!(path = %path.display(), "configuration file loaded");
        Ok(config)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let text = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|source| ConfigError::Write { path: path.to_path_buf(), source })?;
        }
        std::fs::write(path, text)
            .map_err(|source| ConfigError::Write { path: path.to_path_buf(), source })
    }

    /// Overrides fields that are set in the environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(val) = std::env::var(CONTENT_ROOT_ENV) {
            self.content_root = PathBuf::from(val);
        }
        if let Ok(val) = std::env::var(CONTENT_MIRROR_ENV) {
            self.content_mirror = Some(PathBuf::from(val));
        }
        if let Ok(val) = std::env::var(ORIGIN_URL_ENV) {
            parse_url(ORIGIN_URL_ENV, &val)?;
            self.origin_url = Some(val);
        }
        if let Ok(val) = std::env::var(MIRROR_URL_ENV) {
            parse_url(MIRROR_URL_ENV, &val)?;
            self.mirror_url = Some(val);
        }
        if let Ok(val) = std::env::var(DATA_DIR_ENV) {
            self.data_dir = PathBuf::from(val);
        }
        if let Ok(val) = std::env::var(MAX_RETRIES_ENV) {
            self.max_auto_retries = val
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(MAX_RETRIES_ENV.to_string()))?;
        }

        self.cache.apply_env()?;
        Ok(())
    }

    /// Builds the provider this configuration points at: the HTTP origin when
    /// one is set, the local tree otherwise.
    pub fn content_provider(&self) -> Result<Arc<dyn ContentProvider>, ConfigError> {
        if let Some(origin) = &self.origin_url {
            let mut source = HttpContentSource::new(parse_url("origin_url", origin)?);
            if let Some(mirror) = &self.mirror_url {
                source = source.with_mirror(parse_url("mirror_url", mirror)?);
            }
            tracing::debug!(origin = %origin, "using HTTP content origin");
            return Ok(Arc::new(source));
        }

        let mut tree = LocalContentTree::new(&self.content_root);
        if let Some(mirror) = &self.content_mirror {
            tree = tree.with_mirror(mirror);
        }
        tracing::debug!(root = %self.content_root.display(), "using local content tree");
        Ok(Arc::new(tree))
    }

    pub fn storage(&self) -> Storage {
        Storage::with_root(&self.data_dir)
    }
}

fn parse_url(key: &'static str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|_| ConfigError::InvalidUrl { key, value: value.to_string() })
}
