//! Planar polygon primitives: area, convex clipping and IoU.

/// A planar `[x, y]` point.
pub type Point = [f64; 2];

/// Below this, areas and edge lengths count as zero.
pub const EPSILON: f64 = 1e-12;

/// Drops a closing vertex that repeats the first one.
fn open_ring(points: &[Point]) -> &[Point] {
    match (points.first(), points.last()) {
        (Some(first), Some(last)) if points.len() > 1 && first == last => {
            &points[..points.len() - 1]
        }
        _ => points,
    }
}

/// `(a - o) × (b - o)`.
#[inline]
fn cross(o: Point, a: Point, b: Point) -> f64 {
    (a[0] - o[0]) * (b[1] - o[1]) - (a[1] - o[1]) * (b[0] - o[0])
}

/// Shoelace signed area; positive for counter-clockwise rings in a y-up
/// frame. Accepts open or closed rings.
pub fn signed_area(points: &[Point]) -> f64 {
    let points = open_ring(points);
    if points.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..points.len() {
        let [x1, y1] = points[i];
        let [x2, y2] = points[(i + 1) % points.len()];
        sum += x1 * y2 - x2 * y1;
    }
    sum / 2.0
}

/// Unsigned polygon area.
pub fn area(points: &[Point]) -> f64 {
    signed_area(points).abs()
}

/// Intersection of segment `p1→p2` with the infinite line through `a→b`.
///
/// `None` when the two are parallel.
fn line_intersection(p1: Point, p2: Point, a: Point, b: Point) -> Option<Point> {
    let d = [p2[0] - p1[0], p2[1] - p1[1]];
    let e = [b[0] - a[0], b[1] - a[1]];
    let denom = d[0] * e[1] - d[1] * e[0];
    if denom.abs() < EPSILON {
        return None;
    }
    let t = ((a[0] - p1[0]) * e[1] - (a[1] - p1[1]) * e[0]) / denom;
    Some([p1[0] + t * d[0], p1[1] + t * d[1]])
}

/// Sutherland–Hodgman clipping of `subject` against the convex `clip`.
///
/// The clip polygon may wind either way. Zero-length clip edges are
/// skipped. Returns an open ring, empty when nothing remains.
pub fn clip_polygon(subject: &[Point], clip: &[Point]) -> Vec<Point> {
    let subject = open_ring(subject);
    let mut clip = open_ring(clip).to_vec();
    if subject.len() < 3 || clip.len() < 3 {
        return Vec::new();
    }
    if signed_area(&clip) < 0.0 {
        clip.reverse();
    }

    let mut output = subject.to_vec();
    for i in 0..clip.len() {
        let a = clip[i];
        let b = clip[(i + 1) % clip.len()];
        if (b[0] - a[0]).hypot(b[1] - a[1]) < EPSILON {
            continue;
        }

        let input = std::mem::take(&mut output);
        let Some(&last) = input.last() else {
            break;
        };

        let inside = |p: Point| cross(a, b, p) >= -EPSILON;
        let mut prev = last;
        for &current in &input {
            match (inside(prev), inside(current)) {
                (true, true) => output.push(current),
                (true, false) => output.extend(line_intersection(prev, current, a, b)),
                (false, true) => {
                    output.extend(line_intersection(prev, current, a, b));
                    output.push(current);
                }
                (false, false) => {}
            }
            prev = current;
        }
    }
    output
}

/// Intersection-over-union of two convex polygons, in `[0, 1]`.
///
/// Degenerate input yields `0.0` rather than an error.
pub fn polygon_iou(a: &[Point], b: &[Point]) -> f64 {
    let area_a = area(a);
    let area_b = area(b);
    if area_a < EPSILON || area_b < EPSILON {
        return 0.0;
    }

    let intersection = area(&clip_polygon(a, b));
    let union = area_a + area_b - intersection;
    if union < EPSILON {
        return 0.0;
    }
    (intersection / union).clamp(0.0, 1.0)
}

/// Even-odd point-in-polygon test.
pub fn point_in_ring(point: Point, ring: &[Point]) -> bool {
    let ring = open_ring(ring);
    let [px, py] = point;
    let mut inside = false;
    let mut j = ring.len().wrapping_sub(1);
    for i in 0..ring.len() {
        let [xi, yi] = ring[i];
        let [xj, yj] = ring[j];
        if (yi > py) != (yj > py) && px < (xj - xi) * (py - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}
