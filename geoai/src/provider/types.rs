//! Provider types and traits

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::coord::TileCoord;

/// Errors that can occur during provider operations.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// HTTP request failed
    HttpError(String),
    /// Zoom level not supported by this provider
    UnsupportedZoom(u8),
    /// Invalid response data from provider
    InvalidResponse(String),
    /// Provider configuration is incomplete or malformed
    InvalidConfig(String),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::HttpError(msg) => write!(f, "HTTP error: {}", msg),
            ProviderError::UnsupportedZoom(zoom) => {
                write!(f, "Zoom level {} not supported by provider", zoom)
            }
            ProviderError::InvalidResponse(msg) => write!(f, "Invalid response: {}", msg),
            ProviderError::InvalidConfig(msg) => write!(f, "Invalid provider config: {}", msg),
        }
    }
}

impl std::error::Error for ProviderError {}

/// How a provider picks the zoom level when the caller does not force one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomStrategy {
    /// Use the configured default zoom.
    Fixed,
    /// Search downward from a high zoom until the area fits a 2×2 tile
    /// footprint, trading resolution for a small mosaic.
    FitFootprint,
}

/// Per-request imagery options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapSourceParams {
    /// Forces the tile zoom level
    #[serde(default)]
    pub zoom_level: Option<u8>,
    /// Band indexes for multi-band COG sources
    #[serde(default)]
    pub bands: Option<Vec<u32>>,
    /// Band-math expression for COG sources
    #[serde(default)]
    pub expression: Option<String>,
    /// Pad the tile grid to a square
    #[serde(default)]
    pub square: Option<bool>,
}

/// Trait for tiled imagery providers.
///
/// A provider only knows how to address its tiles; fetching goes through an
/// [`AsyncHttpClient`](super::AsyncHttpClient) so tiles from every provider
/// share one client and one failure policy.
pub trait Provider: Send + Sync {
    /// Returns the provider's name for logging and identification.
    fn name(&self) -> &str;

    /// Builds the URL for a tile.
    fn tile_url(&self, tile: &TileCoord, params: &MapSourceParams) -> String;

    /// Returns the minimum supported zoom level.
    fn min_zoom(&self) -> u8;

    /// Returns the maximum supported zoom level.
    fn max_zoom(&self) -> u8;

    /// Tile edge length in pixels.
    fn tile_size(&self) -> u32 {
        256
    }

    /// Zoom selection when the request does not specify one.
    fn zoom_strategy(&self) -> ZoomStrategy {
        ZoomStrategy::Fixed
    }

    /// Attribution text to attach to results.
    fn attribution(&self) -> Option<&str> {
        None
    }

    /// Checks if this provider supports the given zoom level.
    fn supports_zoom(&self, zoom: u8) -> bool {
        zoom >= self.min_zoom() && zoom <= self.max_zoom()
    }
}
