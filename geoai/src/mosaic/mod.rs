//! Mosaic acquisition
//!
//! Fetches a planned [`TileGrid`](crate::tile::TileGrid) concurrently and
//! either stitches it into one [`GeoRawImage`](crate::raster::GeoRawImage)
//! or returns the per-tile rasters.

mod acquirer;
mod types;

pub use acquirer::MosaicAcquirer;
pub use types::{Acquisition, MosaicError};
