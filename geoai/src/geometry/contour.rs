//! Iso-contour extraction by marching squares.
//!
//! Rings come out with the above-level region on their left in world space
//! (north up), so outer boundaries wind counter-clockwise and holes
//! clockwise. The sign of the shoelace area classifies them.

use std::collections::HashMap;

use super::polygon::{self, Point};
use super::GeometryError;
use crate::geojson::{Geometry, Ring};
use crate::raster::GeoRawImage;

const TL: u8 = 8;
const TR: u8 = 4;
const BR: u8 = 2;
const BL: u8 = 1;

/// Cell edges.
const TOP: u8 = 0;
const RIGHT: u8 = 1;
const BOTTOM: u8 = 2;
const LEFT: u8 = 3;

/// Segments per cell case as `(edge, edge, reference corner)`.
///
/// The reference corner is one the segment separates from the rest; its
/// state decides the segment's direction. Saddles (5, 10) keep the two
/// above-level corners apart.
fn case_segments(case: u8) -> &'static [(u8, u8, u8)] {
    match case {
        1 | 14 => &[(BOTTOM, LEFT, BL)],
        2 | 13 => &[(RIGHT, BOTTOM, BR)],
        4 | 11 => &[(TOP, RIGHT, TR)],
        8 | 7 => &[(TOP, LEFT, TL)],
        3 | 12 => &[(LEFT, RIGHT, BL)],
        6 | 9 => &[(TOP, BOTTOM, TR)],
        5 => &[(TOP, RIGHT, TR), (BOTTOM, LEFT, BL)],
        10 => &[(TOP, LEFT, TL), (RIGHT, BOTTOM, BR)],
        _ => &[],
    }
}

/// Value grid padded by one cell of below-level values so every contour
/// closes.
struct PaddedGrid<'a> {
    values: &'a [f32],
    width: usize,
    height: usize,
    border: f32,
}

impl PaddedGrid<'_> {
    fn padded_width(&self) -> usize {
        self.width + 2
    }

    fn padded_height(&self) -> usize {
        self.height + 2
    }

    fn value(&self, gx: usize, gy: usize) -> f32 {
        if gx == 0 || gy == 0 || gx > self.width || gy > self.height {
            self.border
        } else {
            self.values[(gy - 1) * self.width + (gx - 1)]
        }
    }
}

/// Extracts closed rings at `level` from a row-major grid.
///
/// Ring coordinates are in grid pixels with pixel centres at `+0.5`, y
/// down. Values `>= level` are inside.
pub fn contour_rings(
    values: &[f32],
    width: usize,
    height: usize,
    level: f32,
) -> Result<Vec<Vec<Point>>, GeometryError> {
    if width == 0 || height == 0 || values.len() != width * height {
        return Err(GeometryError::MaskSize {
            width,
            height,
            actual: values.len(),
        });
    }

    let grid = PaddedGrid {
        values,
        width,
        height,
        border: level - 1.0,
    };
    let pw = grid.padded_width();
    let above = |gx: usize, gy: usize| grid.value(gx, gy) >= level;

    // start edge -> (end edge, start point)
    let mut links: HashMap<usize, (usize, Point)> = HashMap::new();

    for cy in 0..grid.padded_height() - 1 {
        for cx in 0..pw - 1 {
            let corners = [
                (TL, cx, cy),
                (TR, cx + 1, cy),
                (BR, cx + 1, cy + 1),
                (BL, cx, cy + 1),
            ];
            let case = corners
                .iter()
                .filter(|(_, x, y)| above(*x, *y))
                .fold(0u8, |acc, (bit, _, _)| acc | bit);

            for &(edge_a, edge_b, reference) in case_segments(case) {
                let (rx, ry) = corner_position(reference, cx, cy);
                let r = [rx as f64, ry as f64];
                let mut a = (edge_id(edge_a, cx, cy, pw), edge_point(&grid, edge_a, cx, cy, level));
                let mut b = (edge_id(edge_b, cx, cy, pw), edge_point(&grid, edge_b, cx, cy, level));

                // Above-level corner stays left of travel when drawn north up.
                let c = cross(a.1, b.1, r);
                if (above(rx, ry) && c > 0.0) || (!above(rx, ry) && c < 0.0) {
                    std::mem::swap(&mut a, &mut b);
                }
                links.insert(a.0, (b.0, a.1));
            }
        }
    }

    Ok(link_rings(links))
}

/// Follows edge links into closed rings, shifted from padded grid to pixel
/// space.
fn link_rings(mut links: HashMap<usize, (usize, Point)>) -> Vec<Vec<Point>> {
    let mut rings = Vec::new();
    let mut starts: Vec<usize> = links.keys().copied().collect();
    starts.sort_unstable();

    for start in starts {
        let mut ring = Vec::new();
        let mut edge = start;
        let closed = loop {
            let Some((next, point)) = links.remove(&edge) else {
                break false;
            };
            ring.push([point[0] - 0.5, point[1] - 0.5]);
            if next == start {
                break true;
            }
            edge = next;
        };
        if closed && ring.len() >= 3 {
            ring.push(ring[0]);
            rings.push(ring);
        }
    }
    rings
}

fn corner_position(corner: u8, cx: usize, cy: usize) -> (usize, usize) {
    match corner {
        TL => (cx, cy),
        TR => (cx + 1, cy),
        BR => (cx + 1, cy + 1),
        _ => (cx, cy + 1),
    }
}

/// Shared id for an edge: horizontal edges even, vertical edges odd.
fn edge_id(edge: u8, cx: usize, cy: usize, pw: usize) -> usize {
    let horizontal = |x: usize, y: usize| (y * pw + x) * 2;
    let vertical = |x: usize, y: usize| (y * pw + x) * 2 + 1;
    match edge {
        TOP => horizontal(cx, cy),
        BOTTOM => horizontal(cx, cy + 1),
        LEFT => vertical(cx, cy),
        _ => vertical(cx + 1, cy),
    }
}

/// Level crossing on an edge, linearly interpolated.
fn edge_point(grid: &PaddedGrid<'_>, edge: u8, cx: usize, cy: usize, level: f32) -> Point {
    let ((x0, y0), (x1, y1)) = match edge {
        TOP => ((cx, cy), (cx + 1, cy)),
        RIGHT => ((cx + 1, cy), (cx + 1, cy + 1)),
        BOTTOM => ((cx, cy + 1), (cx + 1, cy + 1)),
        _ => ((cx, cy), (cx, cy + 1)),
    };
    let v0 = grid.value(x0, y0) as f64;
    let v1 = grid.value(x1, y1) as f64;
    let t = if (v1 - v0).abs() < f64::EPSILON {
        0.5
    } else {
        ((level as f64 - v0) / (v1 - v0)).clamp(0.0, 1.0)
    };
    [
        x0 as f64 + t * (x1 as f64 - x0 as f64),
        y0 as f64 + t * (y1 as f64 - y0 as f64),
    ]
}

#[inline]
fn cross(o: Point, a: Point, b: Point) -> f64 {
    (a[0] - o[0]) * (b[1] - o[1]) - (a[1] - o[1]) * (b[0] - o[0])
}

/// Contours `values` at `level` and georeferences them as a multipolygon.
///
/// The grid is stretched over the raster, so a model-resolution grid maps
/// onto a larger mosaic. Positive-area rings become polygons; each negative
/// ring becomes a hole of the smallest polygon containing it. Returns
/// `None` when nothing reaches the level.
pub fn contours_to_multipolygon(
    values: &[f32],
    width: usize,
    height: usize,
    level: f32,
    image: &GeoRawImage,
) -> Result<Option<Geometry>, GeometryError> {
    let sx = image.width() as f64 / width as f64;
    let sy = image.height() as f64 / height as f64;

    let world_rings: Vec<Ring> = contour_rings(values, width, height, level)?
        .into_iter()
        .map(|ring| {
            ring.into_iter()
                .map(|[x, y]| {
                    let (lng, lat) = image.pixel_to_world(x * sx, y * sy);
                    [lng, lat]
                })
                .collect()
        })
        .collect();

    Ok(group_rings(world_rings))
}

/// Groups world-space rings into polygons with holes by winding.
pub fn group_rings(rings: Vec<Ring>) -> Option<Geometry> {
    let mut outers: Vec<(f64, Vec<Ring>)> = Vec::new();
    let mut holes: Vec<Ring> = Vec::new();

    for ring in rings {
        let area = polygon::signed_area(&ring);
        if area > 0.0 {
            outers.push((area, vec![ring]));
        } else if area < 0.0 {
            holes.push(ring);
        }
    }

    for hole in holes {
        let probe = hole[0];
        let container = outers
            .iter()
            .enumerate()
            .filter(|(_, (_, rings))| polygon::point_in_ring(probe, &rings[0]))
            .min_by(|(_, (a, _)), (_, (b, _))| a.total_cmp(b))
            .map(|(i, _)| i);
        if let Some(i) = container {
            outers[i].1.push(hole);
        }
    }

    if outers.is_empty() {
        return None;
    }
    Some(Geometry::MultiPolygon(
        outers.into_iter().map(|(_, rings)| rings).collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::GeoBoundingBox;
    use crate::raster::Crs;

    fn grid(width: usize, height: usize, f: impl Fn(usize, usize) -> bool) -> Vec<f32> {
        (0..height)
            .flat_map(|y| (0..width).map(move |x| (x, y)))
            .map(|(x, y)| if f(x, y) { 1.0 } else { 0.0 })
            .collect()
    }

    fn image(size: u32) -> GeoRawImage {
        let bounds = GeoBoundingBox::new(0.0, 0.0, 1.0, 1.0).unwrap();
        GeoRawImage::new(
            vec![0; (size * size) as usize],
            size,
            size,
            1,
            bounds,
            Crs::Epsg4326,
        )
        .unwrap()
    }

    #[test]
    fn test_single_pixel_diamond() {
        let values = grid(3, 3, |x, y| x == 1 && y == 1);
        let rings = contour_rings(&values, 3, 3, 0.5).unwrap();
        assert_eq!(rings.len(), 1);
        let ring = &rings[0];
        assert_eq!(ring.len(), 5);
        assert_eq!(ring.first(), ring.last());
        // half-way crossings around the pixel centre (1.5, 1.5)
        assert!((polygon::area(ring) - 0.5).abs() < 1e-9);
        assert!(ring.iter().all(|p| (p[0] - 1.5).abs() <= 0.5 && (p[1] - 1.5).abs() <= 0.5));
    }

    #[test]
    fn test_empty_grid_has_no_rings() {
        let values = vec![0.0; 16];
        assert!(contour_rings(&values, 4, 4, 0.5).unwrap().is_empty());
        assert!(contours_to_multipolygon(&values, 4, 4, 0.5, &image(4))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_full_grid_closes_at_border() {
        let values = vec![1.0; 9];
        let rings = contour_rings(&values, 3, 3, 0.5).unwrap();
        assert_eq!(rings.len(), 1);
    }

    #[test]
    fn test_outer_ring_is_ccw_in_world() {
        let values = grid(6, 6, |x, y| (1..5).contains(&x) && (1..5).contains(&y));
        let geometry = contours_to_multipolygon(&values, 6, 6, 0.5, &image(6))
            .unwrap()
            .unwrap();
        let Geometry::MultiPolygon(polygons) = geometry else {
            panic!("expected multipolygon");
        };
        assert_eq!(polygons.len(), 1);
        assert_eq!(polygons[0].len(), 1);
        assert!(polygon::signed_area(&polygons[0][0]) > 0.0);
    }

    #[test]
    fn test_hole_assigned_to_enclosing_ring() {
        // 7x7 ring of foreground with a background centre
        let values = grid(9, 9, |x, y| {
            (1..8).contains(&x) && (1..8).contains(&y) && !((3..6).contains(&x) && (3..6).contains(&y))
        });
        let geometry = contours_to_multipolygon(&values, 9, 9, 0.5, &image(9))
            .unwrap()
            .unwrap();
        let Geometry::MultiPolygon(polygons) = geometry else {
            panic!("expected multipolygon");
        };
        assert_eq!(polygons.len(), 1);
        assert_eq!(polygons[0].len(), 2);
        assert!(polygon::signed_area(&polygons[0][0]) > 0.0);
        assert!(polygon::signed_area(&polygons[0][1]) < 0.0);
    }

    #[test]
    fn test_separate_regions_become_separate_polygons() {
        let values = grid(10, 4, |x, y| (1..3).contains(&y) && ((1..3).contains(&x) || (6..9).contains(&x)));
        let geometry = contours_to_multipolygon(&values, 10, 4, 0.5, &image(10))
            .unwrap()
            .unwrap();
        let Geometry::MultiPolygon(polygons) = geometry else {
            panic!("expected multipolygon");
        };
        assert_eq!(polygons.len(), 2);
    }

    #[test]
    fn test_saddle_keeps_diagonal_pixels_apart() {
        let values = grid(2, 2, |x, y| x == y);
        let rings = contour_rings(&values, 2, 2, 0.5).unwrap();
        assert_eq!(rings.len(), 2);
    }

    #[test]
    fn test_size_mismatch_rejected() {
        assert!(contour_rings(&[1.0; 5], 2, 2, 0.5).is_err());
    }
}
