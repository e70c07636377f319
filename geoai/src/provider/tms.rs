//! Generic XYZ/TMS tile server provider.
//!
//! # URL Pattern
//!
//! `{baseUrl}/{z}/{x}/{y}.{extension}` with an optional `?apikey={key}`.

use crate::coord::TileCoord;
use crate::provider::{MapSourceParams, Provider, ProviderError};

const MIN_ZOOM: u8 = 0;
const MAX_ZOOM: u8 = 22;

/// Provider for any server following the XYZ path convention.
#[derive(Debug, Clone)]
pub struct TmsProvider {
    base_url: String,
    extension: String,
    api_key: Option<String>,
}

impl TmsProvider {
    /// Creates a new XYZ provider.
    ///
    /// # Arguments
    ///
    /// * `base_url` - URL prefix before `/{z}/{x}/{y}`
    /// * `extension` - Tile file extension, e.g. `png` or `jpg`
    /// * `api_key` - Optional key appended as the `apikey` query parameter
    pub fn new(
        base_url: &str,
        extension: &str,
        api_key: Option<String>,
    ) -> Result<Self, ProviderError> {
        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(ProviderError::InvalidConfig(
                "tms baseUrl is empty".to_string(),
            ));
        }
        let extension = extension.trim().trim_start_matches('.');
        if extension.is_empty() {
            return Err(ProviderError::InvalidConfig(
                "tms extension is empty".to_string(),
            ));
        }

        Ok(Self {
            base_url: base_url.to_string(),
            extension: extension.to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }
}

impl Provider for TmsProvider {
    fn name(&self) -> &str {
        "tms"
    }

    fn tile_url(&self, tile: &TileCoord, _params: &MapSourceParams) -> String {
        let path = format!(
            "{}/{}/{}/{}.{}",
            self.base_url, tile.zoom, tile.x, tile.y, self.extension
        );
        match &self.api_key {
            Some(key) => format!("{}?apikey={}", path, key),
            None => path,
        }
    }

    fn min_zoom(&self) -> u8 {
        MIN_ZOOM
    }

    fn max_zoom(&self) -> u8 {
        MAX_ZOOM
    }
}
