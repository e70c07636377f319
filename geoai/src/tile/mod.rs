//! Tile grid planning
//!
//! Turns a bounding box and zoom into a [`TileGrid`] of provider tiles,
//! enforcing the tile cap before any URL is constructed.

mod planner;
mod types;

pub use planner::{
    TilePlanner, DEFAULT_MAX_TILE_COUNT, DEFAULT_SEARCH_START_ZOOM, MAX_SEARCH_START_ZOOM,
};
pub use types::{TileDescriptor, TileGrid, TilePlanError, TileRange};
