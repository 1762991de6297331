//! Geometric predicates used by hit-testing and the edit overlays.

use crate::types::Point;

// ─── Bounding Box ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub minx: f64,
    pub miny: f64,
    pub maxx: f64,
    pub maxy: f64,
}

impl BBox {
    pub fn empty() -> Self {
        Self {
            minx: f64::INFINITY,
            miny: f64::INFINITY,
            maxx: f64::NEG_INFINITY,
            maxy: f64::NEG_INFINITY,
        }
    }

    /// Box of the given centre and size.
    pub fn from_center(center: Point, width: f64, height: f64) -> Self {
        Self {
            minx: center.x - width / 2.0,
            miny: center.y - height / 2.0,
            maxx: center.x + width / 2.0,
            maxy: center.y + height / 2.0,
        }
    }

    pub fn from_points(points: &[Point]) -> Option<Self> {
        polygon_bounding_box(points)
    }

    pub fn expand_point(&mut self, x: f64, y: f64) {
        self.minx = self.minx.min(x);
        self.miny = self.miny.min(y);
        self.maxx = self.maxx.max(x);
        self.maxy = self.maxy.max(y);
    }

    pub fn is_empty(&self) -> bool {
        self.minx > self.maxx || self.miny > self.maxy
    }

    pub fn width(&self) -> f64 {
        self.maxx - self.minx
    }

    pub fn height(&self) -> f64 {
        self.maxy - self.miny
    }

    pub fn center(&self) -> Point {
        Point::new((self.minx + self.maxx) / 2.0, (self.miny + self.maxy) / 2.0)
    }

    /// Inclusive containment, with the box grown by `padding` on every side.
    pub fn contains(&self, p: Point, padding: f64) -> bool {
        p.x >= self.minx - padding
            && p.x <= self.maxx + padding
            && p.y >= self.miny - padding
            && p.y <= self.maxy + padding
    }
}

/// Min/max reduction over `points`. `None` for an empty slice.
pub fn polygon_bounding_box(points: &[Point]) -> Option<BBox> {
    if points.is_empty() {
        return None;
    }
    let mut bbox = BBox::empty();
    for p in points {
        bbox.expand_point(p.x, p.y);
    }
    Some(bbox)
}

// ─── Predicates ──────────────────────────────────────────────────────

/// Ray-casting parity test. A duplicated closing vertex is tolerated, and
/// fewer than three vertices is never inside.
///
/// Points on the left/bottom edges of an axis-aligned ring count as inside,
/// points on the right/top edges as outside.
pub fn point_in_polygon(point: Point, vertices: &[Point]) -> bool {
    let ring = match vertices {
        [first, .., last] if vertices.len() > 3 && first == last => &vertices[..vertices.len() - 1],
        _ => vertices,
    };
    if ring.len() < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let (xi, yi) = (ring[i].x, ring[i].y);
        let (xj, yj) = (ring[j].x, ring[j].y);
        if (yi > point.y) != (yj > point.y) {
            let mut dy = yj - yi;
            if dy == 0.0 {
                dy = f64::EPSILON;
            }
            let x_cross = (xj - xi) * (point.y - yi) / dy + xi;
            if point.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Distance from `p` to the finite segment `a`-`b`.
pub fn point_to_segment_distance(p: Point, a: Point, b: Point) -> f64 {
    let c = b.x - a.x;
    let d = b.y - a.y;
    let len_sq = c * c + d * d;
    if len_sq == 0.0 {
        return p.distance(a);
    }
    let t = (((p.x - a.x) * c + (p.y - a.y) * d) / len_sq).clamp(0.0, 1.0);
    p.distance(Point::new(a.x + t * c, a.y + t * d))
}

/// Rotate `p` counter-clockwise about `origin` by `degrees`.
pub fn rotate_point(p: Point, origin: Point, degrees: f64) -> Point {
    let (sin, cos) = degrees.to_radians().sin_cos();
    let dx = p.x - origin.x;
    let dy = p.y - origin.y;
    Point::new(origin.x + dx * cos - dy * sin, origin.y + dx * sin + dy * cos)
}

/// Wrap an angle in degrees into `(-180, 180]`.
pub fn normalize_angle_delta(degrees: f64) -> f64 {
    let mut a = degrees % 360.0;
    if a <= -180.0 {
        a += 360.0;
    } else if a > 180.0 {
        a -= 360.0;
    }
    a
}

/// Wrap an angle in degrees into `[0, 360)`.
pub fn normalize_angle(degrees: f64) -> f64 {
    let a = degrees.rem_euclid(360.0);
    if a >= 360.0 {
        0.0
    } else {
        a
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn unit_square() -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, 1.0),
        ]
    }

    #[test]
    fn test_point_in_unit_square() {
        let sq = unit_square();
        assert!(point_in_polygon(Point::new(0.5, 0.5), &sq));
        assert!(!point_in_polygon(Point::new(1.5, 0.5), &sq));
        assert!(!point_in_polygon(Point::new(0.5, -0.1), &sq));
    }

    #[test]
    fn test_point_on_edges() {
        let sq = unit_square();
        assert!(point_in_polygon(Point::new(0.0, 0.5), &sq));
        assert!(point_in_polygon(Point::new(0.5, 0.0), &sq));
        assert!(!point_in_polygon(Point::new(1.0, 0.5), &sq));
        assert!(!point_in_polygon(Point::new(0.5, 1.0), &sq));
    }

    #[test]
    fn test_closed_ring_and_degenerate_input() {
        let mut closed = unit_square();
        closed.push(Point::new(0.0, 0.0));
        assert!(point_in_polygon(Point::new(0.5, 0.5), &closed));
        assert!(!point_in_polygon(Point::new(0.5, 0.5), &closed[..2]));
        assert!(!point_in_polygon(Point::new(0.0, 0.0), &[]));
    }

    #[test]
    fn test_concave_polygon() {
        // U shape opening upward
        let u = vec![
            Point::new(0.0, 0.0),
            Point::new(3.0, 0.0),
            Point::new(3.0, 3.0),
            Point::new(2.0, 3.0),
            Point::new(2.0, 1.0),
            Point::new(1.0, 1.0),
            Point::new(1.0, 3.0),
            Point::new(0.0, 3.0),
        ];
        assert!(point_in_polygon(Point::new(0.5, 2.0), &u));
        assert!(!point_in_polygon(Point::new(1.5, 2.0), &u));
        assert!(point_in_polygon(Point::new(1.5, 0.5), &u));
    }

    #[test]
    fn test_point_to_segment_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(10.0, 0.0);
        assert_abs_diff_eq!(point_to_segment_distance(Point::new(5.0, 3.0), a, b), 3.0);
        assert_abs_diff_eq!(point_to_segment_distance(Point::new(-3.0, 4.0), a, b), 5.0);
        assert_abs_diff_eq!(point_to_segment_distance(Point::new(13.0, 4.0), a, b), 5.0);
        assert_abs_diff_eq!(point_to_segment_distance(Point::new(3.0, 4.0), a, a), 5.0);
    }

    #[test]
    fn test_polygon_bounding_box() {
        assert!(polygon_bounding_box(&[]).is_none());
        let bbox = polygon_bounding_box(&[Point::new(1.0, -2.0), Point::new(-3.0, 4.0)]).unwrap();
        assert_eq!(bbox.minx, -3.0);
        assert_eq!(bbox.maxy, 4.0);
        assert_eq!(bbox.center(), Point::new(-1.0, 1.0));
        assert!(bbox.contains(Point::new(1.5, 0.0), 0.5));
        assert!(!bbox.contains(Point::new(1.6, 0.0), 0.5));
    }

    #[test]
    fn test_rotation_helpers() {
        let p = rotate_point(Point::new(1.0, 0.0), Point::new(0.0, 0.0), 90.0);
        assert_abs_diff_eq!(p.x, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(p.y, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(normalize_angle_delta(350.0), -10.0);
        assert_abs_diff_eq!(normalize_angle_delta(-190.0), 170.0);
        assert_abs_diff_eq!(normalize_angle_delta(180.0), 180.0);
        assert_abs_diff_eq!(normalize_angle(-90.0), 270.0);
        assert_abs_diff_eq!(normalize_angle(720.0), 0.0);
    }
}
