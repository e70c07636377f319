//! Tile grid planning.
//!
//! Maps a geographic bounding box to the grid of provider tiles covering
//! it. Planning is pure: no network access happens here, and the tile cap is
//! enforced before any URL is built.

use tracing::debug;

use crate::coord::{self, GeoBoundingBox, TileCoord};
use crate::provider::{MapSourceParams, Provider, ZoomStrategy};

use super::types::{TileDescriptor, TileGrid, TilePlanError, TileRange};

/// Default cap on the number of tiles in one grid.
pub const DEFAULT_MAX_TILE_COUNT: usize = 100;

/// Highest zoom the footprint search may start from.
pub const MAX_SEARCH_START_ZOOM: u8 = 22;

/// Zoom the footprint search starts from.
pub const DEFAULT_SEARCH_START_ZOOM: u8 = MAX_SEARCH_START_ZOOM;

/// Largest tile span per axis accepted by the footprint search.
const FOOTPRINT_SPAN: usize = 2;

/// Plans tile grids for a provider.
#[derive(Debug, Clone, Copy)]
pub struct TilePlanner {
    max_tile_count: usize,
    search_start_zoom: u8,
}

impl Default for TilePlanner {
    fn default() -> Self {
        Self {
            max_tile_count: DEFAULT_MAX_TILE_COUNT,
            search_start_zoom: DEFAULT_SEARCH_START_ZOOM,
        }
    }
}

impl TilePlanner {
    pub fn new(max_tile_count: usize, search_start_zoom: u8) -> Self {
        Self {
            max_tile_count,
            search_start_zoom,
        }
    }

    pub fn max_tile_count(&self) -> usize {
        self.max_tile_count
    }

    /// Tile index range covering `bbox` at `zoom`.
    ///
    /// The north-west corner gives the minimum indices and the south-east
    /// corner the maximum.
    pub fn tile_range(bbox: &GeoBoundingBox, zoom: u8) -> Result<TileRange, TilePlanError> {
        let top_left = coord::to_tile_coords(bbox.north, bbox.west, zoom)?;
        let bottom_right = coord::to_tile_coords(bbox.south, bbox.east, zoom)?;

        Ok(TileRange {
            min_x: top_left.x.min(bottom_right.x),
            max_x: top_left.x.max(bottom_right.x),
            min_y: top_left.y.min(bottom_right.y),
            max_y: top_left.y.max(bottom_right.y),
            zoom,
        })
    }

    /// Pads the shorter axis so rows equal columns.
    ///
    /// The difference is split across both ends, the odd tile going to the
    /// trailing end. Padding that would run off the world edge is shifted
    /// back inside it.
    pub fn square_range(range: TileRange) -> TileRange {
        let rows = range.rows();
        let cols = range.cols();
        if rows == cols {
            return range;
        }

        let limit = coord::tiles_per_axis(range.zoom);
        let pad = |min: u32, span: usize, target: usize| -> (u32, u32) {
            let diff = (target - span) as i64;
            let leading = diff / 2;
            let mut start = min as i64 - leading;
            let target = target as i64;
            if start + target > limit as i64 {
                start = limit as i64 - target;
            }
            let start = start.max(0);
            let end = (start + target - 1).min(limit as i64 - 1);
            (start as u32, end as u32)
        };

        let mut squared = range;
        if rows < cols {
            let (min_y, max_y) = pad(range.min_y, rows, cols);
            squared.min_y = min_y;
            squared.max_y = max_y;
        } else {
            let (min_x, max_x) = pad(range.min_x, cols, rows);
            squared.min_x = min_x;
            squared.max_x = max_x;
        }
        squared
    }

    /// Highest zoom at which `bbox` fits in a 2×2 tile footprint.
    ///
    /// Searches downward from the start zoom (clamped to the provider's
    /// maximum), decrementing while both axes span more than two tiles.
    pub fn fit_footprint_zoom(
        &self,
        provider: &dyn Provider,
        bbox: &GeoBoundingBox,
    ) -> Result<u8, TilePlanError> {
        let floor = provider.min_zoom();
        let mut zoom = self.search_start_zoom.min(provider.max_zoom());

        while zoom > floor {
            let range = Self::tile_range(bbox, zoom)?;
            if range.rows() <= FOOTPRINT_SPAN || range.cols() <= FOOTPRINT_SPAN {
                break;
            }
            zoom -= 1;
        }

        debug!(zoom = zoom, provider = provider.name(), "Footprint zoom selected");
        Ok(zoom)
    }

    /// Resolves the zoom for a request: the explicit level when given,
    /// otherwise the provider's strategy.
    pub fn select_zoom(
        &self,
        provider: &dyn Provider,
        bbox: &GeoBoundingBox,
        requested: Option<u8>,
        default_zoom: u8,
    ) -> Result<u8, TilePlanError> {
        if let Some(zoom) = requested {
            return Ok(zoom);
        }
        match provider.zoom_strategy() {
            ZoomStrategy::FitFootprint => self.fit_footprint_zoom(provider, bbox),
            ZoomStrategy::Fixed => Ok(default_zoom.clamp(provider.min_zoom(), provider.max_zoom())),
        }
    }

    /// Plans the grid covering `bbox` at `zoom`.
    ///
    /// # Errors
    ///
    /// - [`TilePlanError::UnsupportedZoom`] if the provider does not serve `zoom`
    /// - [`TilePlanError::MaximumTileCountExceeded`] if the grid is larger
    ///   than the cap; raised before any URL is built
    pub fn plan(
        &self,
        provider: &dyn Provider,
        bbox: &GeoBoundingBox,
        zoom: u8,
        params: &MapSourceParams,
    ) -> Result<TileGrid, TilePlanError> {
        if !provider.supports_zoom(zoom) {
            return Err(TilePlanError::UnsupportedZoom {
                zoom,
                provider: provider.name().to_string(),
                min: provider.min_zoom(),
                max: provider.max_zoom(),
            });
        }

        let mut range = Self::tile_range(bbox, zoom)?;
        if params.square.unwrap_or(false) {
            range = Self::square_range(range);
        }

        let count = range.tile_count();
        if count > self.max_tile_count {
            return Err(TilePlanError::MaximumTileCountExceeded {
                count,
                max: self.max_tile_count,
            });
        }

        let rows: Vec<Vec<TileDescriptor>> = (range.min_y..=range.max_y)
            .map(|y| {
                (range.min_x..=range.max_x)
                    .map(|x| {
                        let coord = TileCoord::new(x, y, zoom);
                        TileDescriptor::new(coord, provider.tile_url(&coord, params))
                    })
                    .collect()
            })
            .collect();

        debug!(
            zoom = zoom,
            rows = range.rows(),
            cols = range.cols(),
            provider = provider.name(),
            "Tile grid planned"
        );

        Ok(TileGrid::from_range_rows(rows, zoom))
    }
}
