//! Three-component points used by every mesh type.
//!
//! Planar meshes keep the third coordinate constant (normally `0.0`),
//! spherical meshes use all three coordinates with the sphere centred at the
//! origin, and general 2-manifold meshes embed arbitrary surfaces in 3D.
//!
//! `Point` doubles as a vector type: differences of points, cross and dot
//! products are all expressed on the same struct, which keeps the predicate
//! code compact.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Div, Index, Mul, Neg, Sub};

/// A point (or free vector) with three `f64` coordinates.
///
/// # Examples
///
/// ```rust
/// use fmesh::geometry::point::Point;
///
/// let a = Point::new([1.0, 2.0, 0.0]);
/// let b = Point::new2(4.0, 6.0);
/// assert_eq!((b - a).norm(), 5.0);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    coords: [f64; 3],
}

impl Point {
    /// The origin.
    pub const ORIGIN: Self = Self {
        coords: [0.0, 0.0, 0.0],
    };

    /// Unit vector along the third axis; the "up" direction of planar meshes.
    pub const UNIT_Z: Self = Self {
        coords: [0.0, 0.0, 1.0],
    };

    /// Creates a point from its three coordinates.
    #[inline]
    #[must_use]
    pub const fn new(coords: [f64; 3]) -> Self {
        Self { coords }
    }

    /// Creates a planar point with the third coordinate set to zero.
    #[inline]
    #[must_use]
    pub const fn new2(x: f64, y: f64) -> Self {
        Self {
            coords: [x, y, 0.0],
        }
    }

    /// Returns the coordinates as an array.
    #[inline]
    #[must_use]
    pub const fn coords(&self) -> [f64; 3] {
        self.coords
    }

    /// First coordinate.
    #[inline]
    #[must_use]
    pub const fn x(&self) -> f64 {
        self.coords[0]
    }

    /// Second coordinate.
    #[inline]
    #[must_use]
    pub const fn y(&self) -> f64 {
        self.coords[1]
    }

    /// Third coordinate.
    #[inline]
    #[must_use]
    pub const fn z(&self) -> f64 {
        self.coords[2]
    }

    /// Dot product.
    #[inline]
    #[must_use]
    pub fn dot(&self, other: &Self) -> f64 {
        self.coords[0] * other.coords[0]
            + self.coords[1] * other.coords[1]
            + self.coords[2] * other.coords[2]
    }

    /// Cross product.
    #[inline]
    #[must_use]
    pub fn cross(&self, other: &Self) -> Self {
        let [a0, a1, a2] = self.coords;
        let [b0, b1, b2] = other.coords;
        Self::new([a1 * b2 - a2 * b1, a2 * b0 - a0 * b2, a0 * b1 - a1 * b0])
    }

    /// Squared Euclidean norm.
    #[inline]
    #[must_use]
    pub fn norm_squared(&self) -> f64 {
        self.dot(self)
    }

    /// Euclidean norm.
    #[inline]
    #[must_use]
    pub fn norm(&self) -> f64 {
        self.norm_squared().sqrt()
    }

    /// Euclidean distance to another point.
    #[inline]
    #[must_use]
    pub fn distance(&self, other: &Self) -> f64 {
        (*self - *other).norm()
    }

    /// Returns the vector scaled to unit length, or `None` for a zero vector.
    #[must_use]
    pub fn normalized(&self) -> Option<Self> {
        let n = self.norm();
        if n > 0.0 && n.is_finite() {
            Some(*self / n)
        } else {
            None
        }
    }

    /// Midpoint between two points.
    #[inline]
    #[must_use]
    pub fn midpoint(&self, other: &Self) -> Self {
        (*self + *other) * 0.5
    }

    /// Largest absolute coordinate value.
    #[must_use]
    pub fn max_abs_coordinate(&self) -> f64 {
        self.coords.iter().fold(0.0_f64, |m, c| m.max(c.abs()))
    }

    /// Returns `true` if every coordinate is finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.coords.iter().all(|c| c.is_finite())
    }

    /// Barycentric combination `b0*a + b1*b + b2*c`.
    #[must_use]
    pub fn combine(weights: [f64; 3], points: [&Self; 3]) -> Self {
        *points[0] * weights[0] + *points[1] * weights[1] + *points[2] * weights[2]
    }
}

impl From<[f64; 3]> for Point {
    fn from(coords: [f64; 3]) -> Self {
        Self::new(coords)
    }
}

impl From<[f64; 2]> for Point {
    fn from(coords: [f64; 2]) -> Self {
        Self::new2(coords[0], coords[1])
    }
}

impl From<Point> for [f64; 3] {
    fn from(point: Point) -> Self {
        point.coords
    }
}

impl Index<usize> for Point {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.coords[index]
    }
}

impl Add for Point {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new([
            self.coords[0] + rhs.coords[0],
            self.coords[1] + rhs.coords[1],
            self.coords[2] + rhs.coords[2],
        ])
    }
}

impl Sub for Point {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new([
            self.coords[0] - rhs.coords[0],
            self.coords[1] - rhs.coords[1],
            self.coords[2] - rhs.coords[2],
        ])
    }
}

impl Mul<f64> for Point {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        Self::new([
            self.coords[0] * rhs,
            self.coords[1] * rhs,
            self.coords[2] * rhs,
        ])
    }
}

impl Div<f64> for Point {
    type Output = Self;

    fn div(self, rhs: f64) -> Self {
        Self::new([
            self.coords[0] / rhs,
            self.coords[1] / rhs,
            self.coords[2] / rhs,
        ])
    }
}

impl Neg for Point {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new([-self.coords[0], -self.coords[1], -self.coords[2]])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_cross_product_right_handed() {
        let x = Point::new([1.0, 0.0, 0.0]);
        let y = Point::new([0.0, 1.0, 0.0]);
        assert_eq!(x.cross(&y), Point::UNIT_Z);
        assert_eq!(y.cross(&x), -Point::UNIT_Z);
    }

    #[test]
    fn test_norm_and_distance() {
        let a = Point::new([1.0, 2.0, 2.0]);
        assert_relative_eq!(a.norm(), 3.0);
        assert_relative_eq!(a.distance(&Point::ORIGIN), 3.0);
        assert_relative_eq!(a.normalized().unwrap().norm(), 1.0);
        assert!(Point::ORIGIN.normalized().is_none());
    }

    #[test]
    fn test_combine_is_affine() {
        let a = Point::new2(0.0, 0.0);
        let b = Point::new2(2.0, 0.0);
        let c = Point::new2(0.0, 2.0);
        let centroid = Point::combine([1.0 / 3.0; 3], [&a, &b, &c]);
        assert_relative_eq!(centroid.x(), 2.0 / 3.0);
        assert_relative_eq!(centroid.y(), 2.0 / 3.0);
    }

    #[test]
    fn test_serde_roundtrip() {
        let p = Point::new([0.5, -1.25, 3.0]);
        let json = serde_json::to_string(&p).unwrap();
        let back: Point = serde_json::from_str(&json).unwrap();
        assert_eq!(p, back);
    }
}
