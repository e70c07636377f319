//! Configuration file handling for `config.ini`.
//!
//! Missing files and missing keys fall back to defaults; present values are
//! validated and rejected with the section and key that failed.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

use crate::inference::DEFAULT_MODELS_BASE_URL;
use crate::pipeline::DEFAULT_WEIGHTS_MEMORY_BYTES;
use crate::provider::{AsyncReqwestClient, ProviderError, DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_USER_AGENT};
use crate::tile::{TilePlanner, DEFAULT_MAX_TILE_COUNT, DEFAULT_SEARCH_START_ZOOM};
use crate::worker::{DEFAULT_CALL_TIMEOUT_SECS, DEFAULT_CHANNEL_CAPACITY};

/// Default log file name.
pub const DEFAULT_LOG_FILE: &str = "geoai.log";

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Failed to read or parse the config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// Failed to write the config file
    #[error("Failed to write config file: {0}")]
    WriteError(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    /// Failed to create the config directory
    #[error("Failed to create config directory: {0}")]
    DirectoryError(std::io::Error),
}

/// `[tiles]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileSettings {
    pub max_tile_count: usize,
    pub search_start_zoom: u8,
}

/// `[http]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpSettings {
    pub timeout_secs: u64,
    pub user_agent: String,
}

/// `[cache]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    pub weights_directory: PathBuf,
    /// Memory layer of the weight cache, in bytes
    pub memory_size: u64,
}

/// `[worker]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSettings {
    pub call_timeout_secs: u64,
    pub channel_capacity: usize,
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    pub directory: PathBuf,
    pub file: String,
}

/// `[models]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSettings {
    /// Host the built-in task catalogue resolves weight URLs against
    pub base_url: String,
}

/// Complete runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeoAiConfig {
    pub tiles: TileSettings,
    pub http: HttpSettings,
    pub cache: CacheSettings,
    pub worker: WorkerSettings,
    pub logging: LoggingSettings,
    pub models: ModelSettings,
}

impl Default for GeoAiConfig {
    fn default() -> Self {
        let base = dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("geoai");
        Self {
            tiles: TileSettings {
                max_tile_count: DEFAULT_MAX_TILE_COUNT,
                search_start_zoom: DEFAULT_SEARCH_START_ZOOM,
            },
            http: HttpSettings {
                timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
                user_agent: DEFAULT_USER_AGENT.to_string(),
            },
            cache: CacheSettings {
                weights_directory: base.join("models"),
                memory_size: DEFAULT_WEIGHTS_MEMORY_BYTES,
            },
            worker: WorkerSettings {
                call_timeout_secs: DEFAULT_CALL_TIMEOUT_SECS,
                channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            },
            logging: LoggingSettings {
                directory: base.join("logs"),
                file: DEFAULT_LOG_FILE.to_string(),
            },
            models: ModelSettings {
                base_url: DEFAULT_MODELS_BASE_URL.to_string(),
            },
        }
    }
}

/// Default config file location: `<config dir>/geoai/config.ini`.
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("geoai")
        .join("config.ini")
}

impl GeoAiConfig {
    /// Loads from the default path, or defaults if it does not exist.
    pub fn load() -> Result<Self, ConfigFileError> {
        Self::load_from(&config_file_path())
    }

    /// Loads from `path`, or defaults if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let ini = Ini::load_from_file(path)?;
        super::parser::parse_ini(&ini)
    }

    /// Writes the configuration to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigFileError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigFileError::DirectoryError)?;
        }
        let content = super::writer::to_config_string(self);
        std::fs::write(path, content).map_err(|e| ConfigFileError::WriteError(e.to_string()))
    }

    /// Tile planner honouring the `[tiles]` limits.
    pub fn tile_planner(&self) -> TilePlanner {
        TilePlanner::new(self.tiles.max_tile_count, self.tiles.search_start_zoom)
    }

    /// HTTP client honouring the `[http]` settings.
    pub fn http_client(&self) -> Result<AsyncReqwestClient, ProviderError> {
        AsyncReqwestClient::with_options(self.http.timeout_secs, &self.http.user_agent)
    }

    /// Per-call timeout for worker requests.
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.worker.call_timeout_secs)
    }
}
