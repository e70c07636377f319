//! Runtime configuration loaded from `config.ini`.

mod file;
mod parser;
mod size;
mod writer;

pub use file::{
    config_file_path, CacheSettings, ConfigFileError, GeoAiConfig, HttpSettings, LoggingSettings,
    ModelSettings, TileSettings, WorkerSettings, DEFAULT_LOG_FILE,
};
pub use size::{format_size, parse_size, SizeParseError};
