//! Binary mask vectorisation by Moore-neighbour boundary tracing.

use tracing::trace;

use super::GeometryError;
use crate::geojson::{Feature, Geometry, Position};
use crate::raster::GeoRawImage;

/// Neighbour offsets, clockwise on screen from east.
const DIRECTIONS: [(i64, i64); 8] = [
    (1, 0),   // E
    (1, 1),   // SE
    (0, 1),   // S
    (-1, 1),  // SW
    (-1, 0),  // W
    (-1, -1), // NW
    (0, -1),  // N
    (1, -1),  // NE
];

/// A `{0, 1}` mask at model resolution, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryMask {
    width: usize,
    height: usize,
    data: Vec<bool>,
}

impl BinaryMask {
    /// Thresholds a probability buffer: values `>= threshold` are foreground.
    pub fn from_probabilities(
        probabilities: &[f32],
        width: usize,
        height: usize,
        threshold: f32,
    ) -> Result<Self, GeometryError> {
        let expected = width * height;
        if width == 0 || height == 0 || probabilities.len() != expected {
            return Err(GeometryError::MaskSize {
                width,
                height,
                actual: probabilities.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data: probabilities.iter().map(|&p| p >= threshold).collect(),
        })
    }

    /// Builds a mask from a per-pixel predicate.
    pub fn from_fn(width: usize, height: usize, f: impl Fn(usize, usize) -> bool) -> Self {
        let data = (0..height)
            .flat_map(|y| (0..width).map(move |x| (x, y)))
            .map(|(x, y)| f(x, y))
            .collect();
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Foreground test; out-of-range positions are background.
    pub fn get(&self, x: i64, y: i64) -> bool {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return false;
        }
        self.data[y as usize * self.width + x as usize]
    }

    /// Number of foreground pixels.
    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&v| v).count()
    }

    pub fn is_empty(&self) -> bool {
        !self.data.iter().any(|&v| v)
    }

    /// A foreground pixel with at least one background or out-of-range
    /// neighbour among its eight.
    pub fn is_boundary(&self, x: i64, y: i64) -> bool {
        self.get(x, y)
            && DIRECTIONS
                .iter()
                .any(|(dx, dy)| !self.get(x + dx, y + dy))
    }

    /// First boundary pixel in row-major order.
    fn first_boundary(&self) -> Option<(i64, i64)> {
        (0..self.height as i64)
            .flat_map(|y| (0..self.width as i64).map(move |x| (x, y)))
            .find(|&(x, y)| self.is_boundary(x, y))
    }

    /// Traces the outer boundary of the first region in mask pixels.
    ///
    /// Starts at the first boundary pixel and follows boundary neighbours,
    /// scanning clockwise from two steps counter-clockwise of the previous
    /// heading. Stops on returning to the start, or early with an open
    /// trace when no continuation exists. The result is not closed.
    pub fn trace_boundary(&self) -> Vec<(i64, i64)> {
        let Some(start) = self.first_boundary() else {
            return Vec::new();
        };

        let max_steps = 4 * self.width * self.height + 8;
        let mut path = vec![start];
        let mut current = start;
        let mut heading = 0usize;

        for _ in 0..max_steps {
            let next = (0..8).map(|i| (heading + 6 + i) % 8).find_map(|dir| {
                let (dx, dy) = DIRECTIONS[dir];
                let candidate = (current.0 + dx, current.1 + dy);
                self.is_boundary(candidate.0, candidate.1)
                    .then_some((dir, candidate))
            });

            let Some((dir, candidate)) = next else {
                trace!(points = path.len(), "Boundary trace ended without closing");
                break;
            };
            if candidate == start {
                break;
            }
            path.push(candidate);
            current = candidate;
            heading = dir;
        }

        path
    }
}

/// Vectorises a mask into a world-space polygon.
///
/// Mask pixels are scaled onto the raster's pixel grid before georeferencing,
/// so a model-resolution mask maps onto a larger mosaic. An empty mask gives
/// a feature with no geometry.
pub fn mask_to_polygon(mask: &BinaryMask, image: &GeoRawImage) -> Feature {
    let path = mask.trace_boundary();
    if path.is_empty() {
        return Feature::empty();
    }

    let sx = image.width() as f64 / mask.width() as f64;
    let sy = image.height() as f64 / mask.height() as f64;

    let mut ring: Vec<Position> = path
        .iter()
        .map(|&(x, y)| {
            let (lng, lat) = image.pixel_to_world(x as f64 * sx, y as f64 * sy);
            [lng, lat]
        })
        .collect();
    ring.push(ring[0]);

    Feature::new(Geometry::Polygon(vec![ring]))
}
