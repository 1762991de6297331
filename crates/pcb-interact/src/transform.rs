use serde::{Deserialize, Serialize};

use crate::types::Point;

/// 2-D affine matrix in SVG order:
/// `x' = a*x + c*y + e`, `y' = b*x + d*y + f`.
///
/// The viewer's real-world-to-screen transform is one of these; pixels grow
/// downward so `d` is normally negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Default for Matrix {
    fn default() -> Self {
        Self::identity()
    }
}

impl Matrix {
    pub const fn identity() -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            e: 0.0,
            f: 0.0,
        }
    }

    pub const fn translate(tx: f64, ty: f64) -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            e: tx,
            f: ty,
        }
    }

    pub const fn scale(sx: f64, sy: f64) -> Self {
        Self {
            a: sx,
            b: 0.0,
            c: 0.0,
            d: sy,
            e: 0.0,
            f: 0.0,
        }
    }

    /// Counter-clockwise rotation about the origin.
    pub fn rotate_degrees(degrees: f64) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Self {
            a: cos,
            b: sin,
            c: -sin,
            d: cos,
            e: 0.0,
            f: 0.0,
        }
    }

    /// `self` applied after `other`, i.e. `self * other`.
    pub fn compose(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.c * other.b,
            b: self.b * other.a + self.d * other.b,
            c: self.a * other.c + self.c * other.d,
            d: self.b * other.c + self.d * other.d,
            e: self.a * other.e + self.c * other.f + self.e,
            f: self.b * other.e + self.d * other.f + self.f,
        }
    }

    pub fn apply(&self, p: Point) -> Point {
        Point::new(
            self.a * p.x + self.c * p.y + self.e,
            self.b * p.x + self.d * p.y + self.f,
        )
    }

    /// Apply only the linear part (no translation), for deltas.
    pub fn apply_vector(&self, v: Point) -> Point {
        Point::new(self.a * v.x + self.c * v.y, self.b * v.x + self.d * v.y)
    }

    pub fn determinant(&self) -> f64 {
        self.a * self.d - self.b * self.c
    }

    /// `None` when the matrix is singular.
    pub fn inverse(&self) -> Option<Matrix> {
        let det = self.determinant();
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        Some(Matrix {
            a: self.d / det,
            b: -self.b / det,
            c: -self.c / det,
            d: self.a / det,
            e: (self.c * self.f - self.d * self.e) / det,
            f: (self.b * self.e - self.a * self.f) / det,
        })
    }

    /// Length of the transformed x unit vector.
    pub fn scale_x(&self) -> f64 {
        self.a.hypot(self.b)
    }

    /// Pixels per real-world unit along x, used to size highlight boxes.
    pub fn linear_scale(&self) -> f64 {
        self.a.abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_inverse_round_trip() {
        let m = Matrix::translate(400.0, 300.0).compose(&Matrix::scale(20.0, -20.0));
        let p = Point::new(3.5, -1.25);
        let screen = m.apply(p);
        assert_abs_diff_eq!(screen.x, 470.0);
        assert_abs_diff_eq!(screen.y, 325.0);
        let back = m.inverse().unwrap().apply(screen);
        assert_abs_diff_eq!(back.x, p.x, epsilon = 1e-12);
        assert_abs_diff_eq!(back.y, p.y, epsilon = 1e-12);
    }

    #[test]
    fn test_singular_has_no_inverse() {
        assert!(Matrix::scale(0.0, 1.0).inverse().is_none());
    }

    #[test]
    fn test_scale_factors() {
        let m = Matrix::scale(-4.0, 2.0);
        assert_abs_diff_eq!(m.scale_x(), 4.0);
        assert_abs_diff_eq!(m.linear_scale(), 4.0);
        let r = Matrix::rotate_degrees(90.0).compose(&Matrix::scale(3.0, 3.0));
        assert_abs_diff_eq!(r.scale_x(), 3.0, epsilon = 1e-12);
    }
}
