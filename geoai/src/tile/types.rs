//! Tile grid types.

use thiserror::Error;

use crate::coord::{CoordError, TileCoord};
use crate::geojson::Feature;

/// Errors raised while planning a tile grid.
///
/// Planning happens before any network access, so these errors guarantee
/// nothing has been fetched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TilePlanError {
    /// The area needs more tiles than the configured cap allows.
    #[error("maximum tile count exceeded: {count} tiles requested, limit is {max}")]
    MaximumTileCountExceeded { count: usize, max: usize },

    /// The provider does not serve this zoom level.
    #[error("zoom level {zoom} outside {provider} range {min}..={max}")]
    UnsupportedZoom {
        zoom: u8,
        provider: String,
        min: u8,
        max: u8,
    },

    /// A bounding box corner could not be mapped to a tile.
    #[error(transparent)]
    Coordinate(#[from] CoordError),
}

/// One tile of a planned grid.
#[derive(Debug, Clone, PartialEq)]
pub struct TileDescriptor {
    coord: TileCoord,
    source_url: String,
    bounds: Feature,
}

impl TileDescriptor {
    /// Creates a descriptor; the bounds feature is derived from the tile.
    pub fn new(coord: TileCoord, source_url: String) -> Self {
        Self {
            bounds: Feature::from_bbox(&coord.bounds()),
            coord,
            source_url,
        }
    }

    pub fn coord(&self) -> TileCoord {
        self.coord
    }

    pub fn x(&self) -> u32 {
        self.coord.x
    }

    pub fn y(&self) -> u32 {
        self.coord.y
    }

    pub fn zoom(&self) -> u8 {
        self.coord.zoom
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    /// Tile extent as a GeoJSON polygon feature.
    pub fn bounds_geojson(&self) -> &Feature {
        &self.bounds
    }
}

/// Inclusive tile index range at one zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRange {
    pub min_x: u32,
    pub max_x: u32,
    pub min_y: u32,
    pub max_y: u32,
    pub zoom: u8,
}

impl TileRange {
    pub fn cols(&self) -> usize {
        (self.max_x - self.min_x) as usize + 1
    }

    pub fn rows(&self) -> usize {
        (self.max_y - self.min_y) as usize + 1
    }

    pub fn tile_count(&self) -> usize {
        self.rows() * self.cols()
    }
}

/// Row-major grid of tiles; row 0 is the northernmost, column 0 the
/// westernmost. Every row has the same length.
#[derive(Debug, Clone, PartialEq)]
pub struct TileGrid {
    rows: Vec<Vec<TileDescriptor>>,
    zoom: u8,
}

impl TileGrid {
    /// Builds a grid from rows of equal, non-zero length.
    ///
    /// Returns `None` when the rows are empty or ragged.
    pub fn from_rows(rows: Vec<Vec<TileDescriptor>>, zoom: u8) -> Option<Self> {
        let cols = rows.first()?.len();
        if cols == 0 || rows.iter().any(|row| row.len() != cols) {
            return None;
        }
        Some(Self { rows, zoom })
    }

    /// Rows built from an inclusive [`TileRange`], which are never empty
    /// or ragged.
    pub(super) fn from_range_rows(rows: Vec<Vec<TileDescriptor>>, zoom: u8) -> Self {
        Self { rows, zoom }
    }

    pub fn rows(&self) -> &[Vec<TileDescriptor>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn col_count(&self) -> usize {
        self.rows[0].len()
    }

    pub fn len(&self) -> usize {
        self.row_count() * self.col_count()
    }

    /// Always false; a grid holds at least one tile.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    pub fn is_square(&self) -> bool {
        self.row_count() == self.col_count()
    }

    /// Tiles in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = &TileDescriptor> {
        self.rows.iter().flatten()
    }

    /// Top-left, top-right, bottom-left and bottom-right tiles.
    pub fn corners(&self) -> [&TileDescriptor; 4] {
        let last_row = &self.rows[self.rows.len() - 1];
        let last_col = self.col_count() - 1;
        [
            &self.rows[0][0],
            &self.rows[0][last_col],
            &last_row[0],
            &last_row[last_col],
        ]
    }
}
