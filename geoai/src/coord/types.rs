//! Coordinate types and constants

use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum latitude representable in Web Mercator.
pub const MAX_LAT: f64 = 85.05112878;

/// Minimum latitude representable in Web Mercator.
pub const MIN_LAT: f64 = -85.05112878;

/// Minimum longitude.
pub const MIN_LON: f64 = -180.0;

/// Maximum longitude.
pub const MAX_LON: f64 = 180.0;

/// Minimum zoom level.
pub const MIN_ZOOM: u8 = 0;

/// Maximum zoom level accepted by the tile math.
///
/// Imagery providers rarely go beyond 22; the extra headroom lets the
/// descending zoom search start above any provider's native maximum.
pub const MAX_ZOOM: u8 = 24;

/// Errors raised by coordinate conversion.
#[derive(Debug, Clone, PartialEq)]
pub enum CoordError {
    /// Latitude outside the Web Mercator range
    InvalidLatitude(f64),
    /// Longitude outside [-180, 180]
    InvalidLongitude(f64),
    /// Zoom level above [`MAX_ZOOM`]
    InvalidZoom(u8),
    /// Bounding box with `west >= east` or `south >= north`
    InvalidBounds {
        west: f64,
        south: f64,
        east: f64,
        north: f64,
    },
}

impl fmt::Display for CoordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordError::InvalidLatitude(lat) => {
                write!(
                    f,
                    "Invalid latitude: {} (must be between {} and {})",
                    lat, MIN_LAT, MAX_LAT
                )
            }
            CoordError::InvalidLongitude(lon) => {
                write!(
                    f,
                    "Invalid longitude: {} (must be between {} and {})",
                    lon, MIN_LON, MAX_LON
                )
            }
            CoordError::InvalidZoom(zoom) => {
                write!(
                    f,
                    "Invalid zoom level: {} (must be between {} and {})",
                    zoom, MIN_ZOOM, MAX_ZOOM
                )
            }
            CoordError::InvalidBounds {
                west,
                south,
                east,
                north,
            } => write!(
                f,
                "Invalid bounds: west={} south={} east={} north={} (need west < east and south < north)",
                west, south, east, north
            ),
        }
    }
}

impl std::error::Error for CoordError {}

/// Geographic bounding box in EPSG:4326 degrees.
///
/// `north` always corresponds to raster row 0. Boxes crossing the
/// antimeridian are not representable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl GeoBoundingBox {
    /// Creates a bounding box, rejecting degenerate or inverted extents.
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Result<Self, CoordError> {
        let valid = west.is_finite()
            && south.is_finite()
            && east.is_finite()
            && north.is_finite()
            && west < east
            && south < north;
        if !valid {
            return Err(CoordError::InvalidBounds {
                west,
                south,
                east,
                north,
            });
        }
        Ok(Self {
            west,
            south,
            east,
            north,
        })
    }

    /// Smallest box containing every `(lng, lat)` point.
    ///
    /// Returns `None` for an empty iterator or when the points do not span
    /// a non-zero area.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let mut west = f64::INFINITY;
        let mut south = f64::INFINITY;
        let mut east = f64::NEG_INFINITY;
        let mut north = f64::NEG_INFINITY;

        for (lng, lat) in points {
            west = west.min(lng);
            east = east.max(lng);
            south = south.min(lat);
            north = north.max(lat);
        }

        Self::new(west, south, east, north).ok()
    }

    /// Longitudinal extent in degrees.
    #[inline]
    pub fn width(&self) -> f64 {
        self.east - self.west
    }

    /// Latitudinal extent in degrees.
    #[inline]
    pub fn height(&self) -> f64 {
        self.north - self.south
    }

    /// Whether `other` lies entirely inside this box (edges inclusive).
    pub fn contains(&self, other: &GeoBoundingBox) -> bool {
        other.west >= self.west
            && other.east <= self.east
            && other.south >= self.south
            && other.north <= self.north
    }

    /// Corner points as `[lng, lat]` pairs in counter-clockwise order,
    /// closed by repeating the first corner.
    pub fn ring(&self) -> Vec<[f64; 2]> {
        vec![
            [self.west, self.south],
            [self.east, self.south],
            [self.east, self.north],
            [self.west, self.north],
            [self.west, self.south],
        ]
    }
}

/// A Web Mercator XYZ tile index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    /// Column, west to east
    pub x: u32,
    /// Row, north to south
    pub y: u32,
    /// Zoom level
    pub zoom: u8,
}

impl TileCoord {
    /// Creates a tile coordinate without validation.
    pub fn new(x: u32, y: u32, zoom: u8) -> Self {
        Self { x, y, zoom }
    }

    /// Geographic extent covered by this tile.
    pub fn bounds(&self) -> GeoBoundingBox {
        super::tile_bounds(self)
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}
