//! Esri ArcGIS tiled map service provider.
//!
//! Addresses any ArcGIS REST `MapServer` tile cache, World Imagery being the
//! usual choice.
//!
//! # URL Pattern
//!
//! `{serviceUrl}/{serviceName}/MapServer/tile/{z}/{y}/{x}`
//!
//! - Note the row-before-column order
//! - No authentication required for the public World Imagery tier
//!
//! # Terms of Use
//!
//! The World Imagery basemap is provided by Esri and is subject to their
//! terms of use. See: <https://www.esri.com/en-us/legal/terms/full-master-agreement>

use crate::coord::TileCoord;
use crate::provider::{MapSourceParams, Provider, ProviderError};

/// Default ArcGIS Online services root.
pub const DEFAULT_SERVICE_URL: &str = "https://server.arcgisonline.com/ArcGIS/rest/services";

/// Default imagery service.
pub const DEFAULT_SERVICE_NAME: &str = "World_Imagery";

/// Minimum zoom level supported by ArcGIS World Imagery.
const MIN_ZOOM: u8 = 0;

/// Maximum zoom level supported by ArcGIS World Imagery.
/// ArcGIS provides imagery up to zoom level 19 in most areas.
const MAX_ZOOM: u8 = 19;

/// ArcGIS tiled map service provider.
#[derive(Debug, Clone)]
pub struct EsriProvider {
    service_url: String,
    service_name: String,
    tile_size: u32,
    attribution: String,
}

impl EsriProvider {
    /// Creates a new ArcGIS provider.
    ///
    /// # Arguments
    ///
    /// * `service_url` - Services root, e.g. [`DEFAULT_SERVICE_URL`]
    /// * `service_name` - Map service name, e.g. [`DEFAULT_SERVICE_NAME`]
    /// * `tile_size` - Tile edge length in pixels (256 or 512)
    /// * `attribution` - Attribution string to attach to results
    pub fn new(
        service_url: &str,
        service_name: &str,
        tile_size: u32,
        attribution: &str,
    ) -> Result<Self, ProviderError> {
        if service_url.trim().is_empty() || service_name.trim().is_empty() {
            return Err(ProviderError::InvalidConfig(
                "esri serviceUrl and serviceName must be set".to_string(),
            ));
        }
        if tile_size == 0 {
            return Err(ProviderError::InvalidConfig(
                "esri tileSize must be positive".to_string(),
            ));
        }

        Ok(Self {
            service_url: service_url.trim().trim_end_matches('/').to_string(),
            service_name: service_name.trim().trim_matches('/').to_string(),
            tile_size,
            attribution: attribution.to_string(),
        })
    }

    /// Public World Imagery with 256 px tiles.
    pub fn world_imagery() -> Self {
        Self {
            service_url: DEFAULT_SERVICE_URL.to_string(),
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            tile_size: 256,
            attribution: "Esri, Maxar, Earthstar Geographics".to_string(),
        }
    }
}

impl Provider for EsriProvider {
    fn name(&self) -> &str {
        "esri"
    }

    fn tile_url(&self, tile: &TileCoord, _params: &MapSourceParams) -> String {
        format!(
            "{}/{}/MapServer/tile/{}/{}/{}",
            self.service_url, self.service_name, tile.zoom, tile.y, tile.x
        )
    }

    fn min_zoom(&self) -> u8 {
        MIN_ZOOM
    }

    fn max_zoom(&self) -> u8 {
        MAX_ZOOM
    }

    fn tile_size(&self) -> u32 {
        self.tile_size
    }

    fn attribution(&self) -> Option<&str> {
        if self.attribution.is_empty() {
            None
        } else {
            Some(&self.attribution)
        }
    }
}
