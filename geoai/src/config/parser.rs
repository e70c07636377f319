//! INI parsing: `Ini` → [`GeoAiConfig`].
//!
//! The single place where INI key names map to settings fields.

use std::path::PathBuf;
use std::str::FromStr;

use ini::Ini;

use super::file::{ConfigFileError, GeoAiConfig};
use super::size::parse_size;
use crate::tile::MAX_SEARCH_START_ZOOM;

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Parses a positive integer value.
fn parse_positive<T>(section: &str, key: &str, value: &str) -> Result<T, ConfigFileError>
where
    T: FromStr + PartialOrd + Default,
{
    let parsed: T = value
        .trim()
        .parse()
        .map_err(|_| invalid(section, key, value, "must be a positive integer"))?;
    if parsed <= T::default() {
        return Err(invalid(section, key, value, "must be a positive integer"));
    }
    Ok(parsed)
}

/// Parses an INI document, starting from defaults and overlaying any values
/// found.
pub(super) fn parse_ini(ini: &Ini) -> Result<GeoAiConfig, ConfigFileError> {
    let mut config = GeoAiConfig::default();

    if let Some(section) = ini.section(Some("tiles")) {
        if let Some(v) = section.get("max_tile_count") {
            config.tiles.max_tile_count = parse_positive("tiles", "max_tile_count", v)?;
        }
        if let Some(v) = section.get("search_start_zoom") {
            let zoom: u8 = v.trim().parse().map_err(|_| {
                invalid("tiles", "search_start_zoom", v, "must be an integer zoom level")
            })?;
            if zoom > MAX_SEARCH_START_ZOOM {
                return Err(invalid(
                    "tiles",
                    "search_start_zoom",
                    v,
                    &format!("must be at most {}", MAX_SEARCH_START_ZOOM),
                ));
            }
            config.tiles.search_start_zoom = zoom;
        }
    }

    if let Some(section) = ini.section(Some("http")) {
        if let Some(v) = section.get("timeout_secs") {
            config.http.timeout_secs = parse_positive("http", "timeout_secs", v)?;
        }
        if let Some(v) = section.get("user_agent") {
            let v = v.trim();
            if !v.is_empty() {
                config.http.user_agent = v.to_string();
            }
        }
    }

    if let Some(section) = ini.section(Some("cache")) {
        if let Some(v) = section.get("weights_directory") {
            let v = v.trim();
            if !v.is_empty() {
                config.cache.weights_directory = expand_tilde(v);
            }
        }
        if let Some(v) = section.get("memory_size") {
            config.cache.memory_size = parse_size(v).map_err(|_| {
                invalid(
                    "cache",
                    "memory_size",
                    v,
                    "expected format like '512MB', '2GB', or '1024KB'",
                )
            })?;
        }
    }

    if let Some(section) = ini.section(Some("worker")) {
        if let Some(v) = section.get("call_timeout_secs") {
            config.worker.call_timeout_secs = parse_positive("worker", "call_timeout_secs", v)?;
        }
        if let Some(v) = section.get("channel_capacity") {
            config.worker.channel_capacity = parse_positive("worker", "channel_capacity", v)?;
        }
    }

    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("directory") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.directory = expand_tilde(v);
            }
        }
        if let Some(v) = section.get("file") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.file = v.to_string();
            }
        }
    }

    if let Some(section) = ini.section(Some("models")) {
        if let Some(v) = section.get("base_url") {
            let v = v.trim();
            if !(v.starts_with("https://") || v.starts_with("http://")) {
                return Err(invalid("models", "base_url", v, "must be an http(s) URL"));
            }
            config.models.base_url = v.trim_end_matches('/').to_string();
        }
    }

    Ok(config)
}

/// Expands a leading `~/` to the home directory.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
