//! Mapbox raster tiles provider.
//!
//! Renders a Mapbox style as raster tiles through the Static Tiles API.
//!
//! # URL Pattern
//!
//! `https://api.mapbox.com/styles/v1/{owner}/{style}/tiles/256/{z}/{x}/{y}?access_token={token}`
//!
//! The style may be given as `mapbox://styles/{owner}/{style}` or as the bare
//! `{owner}/{style}` path.
//!
//! # Coordinate System
//!
//! Uses standard Web Mercator XYZ tile coordinates:
//! - X: Column (0 to 2^zoom - 1, west to east)
//! - Y: Row (0 to 2^zoom - 1, north to south)
//! - Z: Zoom level (0 to 22)

use crate::coord::TileCoord;
use crate::provider::{MapSourceParams, Provider, ProviderError};

/// Base URL for the Mapbox Static Tiles API.
const MAPBOX_STYLES_URL: &str = "https://api.mapbox.com/styles/v1";

/// Prefix of Mapbox style URIs.
const STYLE_URI_PREFIX: &str = "mapbox://styles/";

/// Minimum zoom level supported by Mapbox.
const MIN_ZOOM: u8 = 0;

/// Maximum zoom level for satellite styles.
const MAX_ZOOM: u8 = 22;

/// Mapbox style tiles provider.
#[derive(Debug, Clone)]
pub struct MapboxProvider {
    access_token: String,
    style_path: String,
}

impl MapboxProvider {
    /// Creates a new Mapbox provider.
    ///
    /// # Arguments
    ///
    /// * `access_token` - Mapbox access token
    /// * `style` - Style URI (`mapbox://styles/mapbox/satellite-v9`) or path
    pub fn new(access_token: &str, style: &str) -> Result<Self, ProviderError> {
        if access_token.trim().is_empty() {
            return Err(ProviderError::InvalidConfig(
                "mapbox apiKey is empty".to_string(),
            ));
        }

        let style_path = style
            .trim()
            .strip_prefix(STYLE_URI_PREFIX)
            .unwrap_or(style.trim())
            .trim_matches('/')
            .to_string();
        if style_path.split('/').filter(|s| !s.is_empty()).count() != 2 {
            return Err(ProviderError::InvalidConfig(format!(
                "mapbox style '{}' is not of the form owner/style",
                style
            )));
        }

        Ok(Self {
            access_token: access_token.to_string(),
            style_path,
        })
    }
}

impl Provider for MapboxProvider {
    fn name(&self) -> &str {
        "mapbox"
    }

    fn tile_url(&self, tile: &TileCoord, _params: &MapSourceParams) -> String {
        format!(
            "{}/{}/tiles/{}/{}/{}/{}?access_token={}",
            MAPBOX_STYLES_URL,
            self.style_path,
            self.tile_size(),
            tile.zoom,
            tile.x,
            tile.y,
            self.access_token
        )
    }

    fn min_zoom(&self) -> u8 {
        MIN_ZOOM
    }

    fn max_zoom(&self) -> u8 {
        MAX_ZOOM
    }

    fn attribution(&self) -> Option<&str> {
        Some("© Mapbox © OpenStreetMap")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_from_style_uri() {
        let provider = MapboxProvider::new("token", "mapbox://styles/mapbox/satellite-v9").unwrap();
        let url = provider.tile_url(&TileCoord::new(200, 100, 10), &MapSourceParams::default());
        assert_eq!(
            url,
            "https://api.mapbox.com/styles/v1/mapbox/satellite-v9/tiles/256/10/200/100?access_token=token"
        );
    }

    #[test]
    fn test_url_from_style_path() {
        let provider = MapboxProvider::new("token", "acme/custom").unwrap();
        let url = provider.tile_url(&TileCoord::new(1, 2, 3), &MapSourceParams::default());
        assert!(url.starts_with("https://api.mapbox.com/styles/v1/acme/custom/tiles/256/3/1/2"));
    }

    #[test]
    fn test_rejects_malformed_style() {
        assert!(MapboxProvider::new("token", "satellite").is_err());
        assert!(MapboxProvider::new("", "mapbox/satellite-v9").is_err());
    }

    #[test]
    fn test_zoom_range() {
        let provider = MapboxProvider::new("token", "mapbox/satellite-v9").unwrap();
        assert!(provider.supports_zoom(22));
        assert!(!provider.supports_zoom(23));
    }
}
