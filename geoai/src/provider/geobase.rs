//! Geobase cloud-optimised GeoTIFF provider.
//!
//! Serves tiles rendered on the fly from a COG through the project's
//! titiler endpoint.
//!
//! # URL Pattern
//!
//! `https://{projectRef}.geobase.app/titiler/v1/cog/tiles/WebMercatorQuad/{z}/{x}/{y}?url={cog}&apikey={key}`
//!
//! Optional `bidx` (one per band) and `expression` query parameters select
//! bands or band math for multi-band imagery.
//!
//! Because a COG is rendered per request, large high-zoom grids are costly.
//! Without an explicit zoom, this provider searches downward for the highest
//! zoom whose tile range fits a 2×2 footprint.

use reqwest::Url;

use crate::coord::TileCoord;
use crate::provider::{MapSourceParams, Provider, ProviderError, ZoomStrategy};

/// Minimum zoom level served by titiler.
const MIN_ZOOM: u8 = 0;

/// Maximum zoom level served by titiler.
const MAX_ZOOM: u8 = 22;

/// Geobase COG imagery provider.
#[derive(Debug, Clone)]
pub struct GeobaseProvider {
    tiles_base: String,
    api_key: String,
    cog_imagery: String,
}

impl GeobaseProvider {
    /// Creates a new provider for a Geobase project.
    ///
    /// # Arguments
    ///
    /// * `project_ref` - Project reference (the subdomain)
    /// * `api_key` - Project API key
    /// * `cog_imagery` - URL of the cloud-optimised GeoTIFF
    pub fn new(project_ref: &str, api_key: &str, cog_imagery: &str) -> Result<Self, ProviderError> {
        if project_ref.trim().is_empty() {
            return Err(ProviderError::InvalidConfig(
                "geobase projectRef is empty".to_string(),
            ));
        }
        if api_key.trim().is_empty() {
            return Err(ProviderError::InvalidConfig(
                "geobase apikey is empty".to_string(),
            ));
        }
        if cog_imagery.trim().is_empty() {
            return Err(ProviderError::InvalidConfig(
                "geobase cogImagery is empty".to_string(),
            ));
        }

        Ok(Self {
            tiles_base: format!(
                "https://{}.geobase.app/titiler/v1/cog/tiles/WebMercatorQuad",
                project_ref.trim()
            ),
            api_key: api_key.to_string(),
            cog_imagery: cog_imagery.to_string(),
        })
    }
}

impl Provider for GeobaseProvider {
    fn name(&self) -> &str {
        "geobase"
    }

    fn tile_url(&self, tile: &TileCoord, params: &MapSourceParams) -> String {
        let base = format!("{}/{}/{}/{}", self.tiles_base, tile.zoom, tile.x, tile.y);

        // The base is built from a validated project ref, so parsing only
        // fails on a malformed subdomain; fall back to the unencoded form.
        let Ok(mut url) = Url::parse(&base) else {
            return format!("{}?url={}&apikey={}", base, self.cog_imagery, self.api_key);
        };

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("url", &self.cog_imagery);
            if let Some(bands) = &params.bands {
                for band in bands {
                    query.append_pair("bidx", &band.to_string());
                }
            }
            if let Some(expression) = &params.expression {
                query.append_pair("expression", expression);
            }
            query.append_pair("apikey", &self.api_key);
        }

        url.into()
    }

    fn min_zoom(&self) -> u8 {
        MIN_ZOOM
    }

    fn max_zoom(&self) -> u8 {
        MAX_ZOOM
    }

    fn zoom_strategy(&self) -> ZoomStrategy {
        ZoomStrategy::FitFootprint
    }
}
