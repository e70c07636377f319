//! Coordinate conversion module
//!
//! Provides conversions between geographic coordinates (latitude/longitude)
//! and Web Mercator XYZ tile coordinates used by every imagery provider.

mod types;

pub use types::{
    CoordError, GeoBoundingBox, TileCoord, MAX_LAT, MAX_LON, MAX_ZOOM, MIN_LAT, MIN_LON, MIN_ZOOM,
};

use std::f64::consts::PI;

/// Number of tiles along one axis at the given zoom level.
#[inline]
pub fn tiles_per_axis(zoom: u8) -> u32 {
    1u32 << zoom
}

/// Converts geographic coordinates to tile coordinates.
///
/// # Arguments
///
/// * `lat` - Latitude in degrees (-85.05112878 to 85.05112878)
/// * `lon` - Longitude in degrees (-180.0 to 180.0)
/// * `zoom` - Zoom level (0 to 24)
///
/// Points on the east or south edge of the world are clamped into the last
/// tile rather than producing an index one past the grid.
#[inline]
pub fn to_tile_coords(lat: f64, lon: f64, zoom: u8) -> Result<TileCoord, CoordError> {
    if !(MIN_LAT..=MAX_LAT).contains(&lat) {
        return Err(CoordError::InvalidLatitude(lat));
    }
    if !(MIN_LON..=MAX_LON).contains(&lon) {
        return Err(CoordError::InvalidLongitude(lon));
    }
    if zoom > MAX_ZOOM {
        return Err(CoordError::InvalidZoom(zoom));
    }

    let n = 2.0_f64.powi(zoom as i32);
    let max_index = tiles_per_axis(zoom) - 1;

    let x = ((lon + 180.0) / 360.0 * n).floor() as u32;

    // Web Mercator latitude projection
    let lat_rad = lat * PI / 180.0;
    let y = ((1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n).floor() as u32;

    Ok(TileCoord {
        x: x.min(max_index),
        y: y.min(max_index),
        zoom,
    })
}

/// Converts tile coordinates back to geographic coordinates.
///
/// Returns the `(lat, lon)` of the tile's northwest corner.
#[inline]
pub fn tile_to_lat_lon(tile: &TileCoord) -> (f64, f64) {
    corner_to_lat_lon(tile.x, tile.y, tile.zoom)
}

/// Geographic extent of a tile.
pub fn tile_bounds(tile: &TileCoord) -> GeoBoundingBox {
    let (north, west) = corner_to_lat_lon(tile.x, tile.y, tile.zoom);
    let (south, east) = corner_to_lat_lon(tile.x + 1, tile.y + 1, tile.zoom);
    GeoBoundingBox {
        west,
        south,
        east,
        north,
    }
}

fn corner_to_lat_lon(x: u32, y: u32, zoom: u8) -> (f64, f64) {
    let n = 2.0_f64.powi(zoom as i32);

    let lon = x as f64 / n * 360.0 - 180.0;

    // Inverse Web Mercator
    let y = y as f64 / n;
    let lat_rad = (PI * (1.0 - 2.0 * y)).sinh().atan();
    let lat = lat_rad * 180.0 / PI;

    (lat, lon)
}
