//! Mosaic acquisition types.

use thiserror::Error;

use crate::coord::TileCoord;
use crate::provider::ProviderError;
use crate::raster::{GeoRawImage, RasterError};

/// Errors raised while fetching or stitching a tile grid.
///
/// Any single failed tile fails the whole acquisition.
#[derive(Debug, Error)]
pub enum MosaicError {
    /// A tile request failed.
    #[error("failed to fetch tile {tile}: {source}")]
    TileFetch {
        tile: TileCoord,
        #[source]
        source: ProviderError,
    },

    /// A tile body could not be decoded as an image.
    #[error("failed to decode tile {tile}: {message}")]
    Decode { tile: TileCoord, message: String },

    /// Tiles disagree on size or channel count and cannot be stitched.
    #[error(
        "tile {tile} is {actual_width}×{actual_height}×{actual_channels}, \
         expected {width}×{height}×{channels}"
    )]
    InconsistentTiles {
        tile: TileCoord,
        width: u32,
        height: u32,
        channels: u8,
        actual_width: u32,
        actual_height: u32,
        actual_channels: u8,
    },

    /// Building the output raster failed.
    #[error(transparent)]
    Raster(#[from] RasterError),

    /// A fetch task panicked or was aborted.
    #[error("tile fetch task failed: {0}")]
    Task(String),
}

/// Result of acquiring a tile grid.
#[derive(Debug, Clone, PartialEq)]
pub enum Acquisition {
    /// All tiles stitched into one raster with corner-derived bounds.
    Mosaic(GeoRawImage),
    /// One raster per tile, row-major, each with its exact tile bounds.
    Tiles(Vec<Vec<GeoRawImage>>),
}

impl Acquisition {
    /// The stitched raster, if this is a mosaic.
    pub fn into_mosaic(self) -> Option<GeoRawImage> {
        match self {
            Acquisition::Mosaic(image) => Some(image),
            Acquisition::Tiles(_) => None,
        }
    }

    /// The per-tile rasters, if the grid was not stitched.
    pub fn into_tiles(self) -> Option<Vec<Vec<GeoRawImage>>> {
        match self {
            Acquisition::Mosaic(_) => None,
            Acquisition::Tiles(tiles) => Some(tiles),
        }
    }
}
