//! Geometric kernel abstraction.
//!
//! The [`Kernel`] trait is the only way the topology algorithms ask geometric
//! questions. Keeping every predicate behind it lets the mesh stay purely
//! combinatorial and lets callers trade speed for robustness by choosing
//! between [`FastKernel`] and [`RobustKernel`].

use std::fmt::Debug;

use crate::geometry::point::Point;
use crate::geometry::predicates::{
    Frame, InCircle, Orientation, barycentric, incircle_determinant, orientation_determinant,
};
use crate::geometry::robust_predicates::{
    RobustPredicateConfig, robust_incircle, robust_orientation,
};

/// Default tolerance on barycentric coordinates for containment tests.
pub const DEFAULT_BARYCENTRIC_TOLERANCE: f64 = 1e-10;

/// Geometric kernel trait defining predicates for triangulation algorithms.
///
/// # Examples
///
/// ```
/// use fmesh::geometry::kernel::{FastKernel, Kernel};
/// use fmesh::geometry::point::Point;
/// use fmesh::geometry::predicates::{Frame, InCircle, Orientation};
///
/// let kernel = FastKernel::new();
/// let frame = Frame::plane();
/// let a = Point::new2(0.0, 0.0);
/// let b = Point::new2(1.0, 0.0);
/// let c = Point::new2(0.5, 1.0);
///
/// assert_eq!(kernel.orientation(&frame, &a, &b, &c), Orientation::POSITIVE);
/// assert_eq!(
///     kernel.in_circle(&frame, &a, &b, &c, &Point::new2(0.5, 0.3)),
///     InCircle::INSIDE
/// );
/// ```
pub trait Kernel: Clone + Debug {
    /// Orientation of `(a, b, c)` in the given frame.
    fn orientation(&self, frame: &Frame, a: &Point, b: &Point, c: &Point) -> Orientation;

    /// Position of `d` relative to the circumcircle of the positively oriented
    /// triangle `(a, b, c)`.
    fn in_circle(&self, frame: &Frame, a: &Point, b: &Point, c: &Point, d: &Point) -> InCircle;

    /// Tolerance applied to barycentric coordinates in containment tests.
    fn barycentric_tolerance(&self) -> f64;

    /// Barycentric coordinates of `p` in `triangle`, or `None` if the triangle
    /// is degenerate.
    fn barycentric(&self, frame: &Frame, triangle: [&Point; 3], p: &Point) -> Option<[f64; 3]> {
        barycentric(frame, triangle, p)
    }

    /// Returns `true` if `p` lies in the closed triangle, within tolerance.
    fn contains(&self, frame: &Frame, triangle: [&Point; 3], p: &Point) -> bool {
        let eps = self.barycentric_tolerance();
        self.barycentric(frame, triangle, p)
            .is_some_and(|w| w.iter().all(|&wi| wi >= -eps))
    }
}

/// Fast floating-point kernel.
///
/// Compares raw determinants against a fixed absolute tolerance. Suitable for
/// well-conditioned input of roughly unit scale; for anything else use
/// [`RobustKernel`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FastKernel {
    tolerance: f64,
    barycentric_tolerance: f64,
}

impl Default for FastKernel {
    fn default() -> Self {
        Self::new()
    }
}

impl FastKernel {
    /// Create a new fast kernel with an absolute tolerance of `1e-12`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            tolerance: 1e-12,
            barycentric_tolerance: DEFAULT_BARYCENTRIC_TOLERANCE,
        }
    }

    /// Create a fast kernel with a custom absolute determinant tolerance.
    #[must_use]
    pub const fn with_tolerance(tolerance: f64) -> Self {
        Self {
            tolerance,
            barycentric_tolerance: DEFAULT_BARYCENTRIC_TOLERANCE,
        }
    }
}

impl Kernel for FastKernel {
    fn orientation(&self, frame: &Frame, a: &Point, b: &Point, c: &Point) -> Orientation {
        Orientation::from_determinant(orientation_determinant(frame, a, b, c), self.tolerance)
    }

    fn in_circle(&self, frame: &Frame, a: &Point, b: &Point, c: &Point, d: &Point) -> InCircle {
        match Orientation::from_determinant(
            incircle_determinant(frame, a, b, c, d),
            self.tolerance,
        ) {
            Orientation::POSITIVE => InCircle::INSIDE,
            Orientation::NEGATIVE => InCircle::OUTSIDE,
            Orientation::DEGENERATE => InCircle::BOUNDARY,
        }
    }

    fn barycentric_tolerance(&self) -> f64 {
        self.barycentric_tolerance
    }
}

/// Robust kernel with scale-aware adaptive tolerances.
///
/// Delegates to [`robust_orientation`] and [`robust_incircle`], which bound
/// each determinant's magnitude and classify relative to it, so results do
/// not depend on the coordinate scale of the input.
///
/// # Examples
///
/// ```
/// use fmesh::geometry::kernel::{Kernel, RobustKernel};
/// use fmesh::geometry::point::Point;
/// use fmesh::geometry::predicates::{Frame, Orientation};
///
/// let kernel = RobustKernel::new();
/// let frame = Frame::plane();
/// let o = kernel.orientation(
///     &frame,
///     &Point::new2(6.0e6, 6.0e6),
///     &Point::new2(6.0e6 + 0.5, 6.0e6),
///     &Point::new2(6.0e6, 6.0e6 + 0.5),
/// );
/// assert_eq!(o, Orientation::POSITIVE);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RobustKernel {
    config: RobustPredicateConfig,
    barycentric_tolerance: f64,
}

impl Default for RobustKernel {
    fn default() -> Self {
        Self::with_config(RobustPredicateConfig::default())
    }
}

impl RobustKernel {
    /// Create a robust kernel with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a robust kernel with a custom predicate configuration.
    #[must_use]
    pub const fn with_config(config: RobustPredicateConfig) -> Self {
        Self {
            config,
            barycentric_tolerance: DEFAULT_BARYCENTRIC_TOLERANCE,
        }
    }

    /// Replaces the barycentric containment tolerance.
    #[must_use]
    pub const fn with_barycentric_tolerance(mut self, tolerance: f64) -> Self {
        self.barycentric_tolerance = tolerance;
        self
    }

    /// Create a robust kernel with the given relative predicate tolerance.
    #[must_use]
    pub fn with_relative_tolerance(relative_tolerance: f64) -> Self {
        Self::with_config(RobustPredicateConfig::with_relative_tolerance(
            relative_tolerance,
        ))
    }

    /// The predicate configuration in use.
    #[must_use]
    pub const fn config(&self) -> &RobustPredicateConfig {
        &self.config
    }
}

impl Kernel for RobustKernel {
    fn orientation(&self, frame: &Frame, a: &Point, b: &Point, c: &Point) -> Orientation {
        robust_orientation(frame, a, b, c, &self.config)
    }

    fn in_circle(&self, frame: &Frame, a: &Point, b: &Point, c: &Point, d: &Point) -> InCircle {
        robust_incircle(frame, a, b, c, d, &self.config)
    }

    fn barycentric_tolerance(&self) -> f64 {
        self.barycentric_tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_triangle() -> [Point; 3] {
        [
            Point::new2(0.0, 0.0),
            Point::new2(1.0, 0.0),
            Point::new2(0.0, 1.0),
        ]
    }

    #[test]
    fn test_kernels_agree_on_unit_triangle() {
        let [a, b, c] = unit_triangle();
        let frame = Frame::plane();
        let fast = FastKernel::new();
        let robust = RobustKernel::new();
        assert_eq!(
            fast.orientation(&frame, &a, &b, &c),
            robust.orientation(&frame, &a, &b, &c)
        );
        let d = Point::new2(0.4, 0.4);
        assert_eq!(fast.in_circle(&frame, &a, &b, &c, &d), InCircle::INSIDE);
        assert_eq!(robust.in_circle(&frame, &a, &b, &c, &d), InCircle::INSIDE);
    }

    #[test]
    fn test_fast_kernel_fails_at_tiny_scale_robust_does_not() {
        let frame = Frame::plane();
        let s = 1e-8;
        let a = Point::new2(0.0, 0.0);
        let b = Point::new2(s, 0.0);
        let c = Point::new2(0.0, s);
        // Determinant 1e-16 is below the fixed tolerance.
        assert_eq!(
            FastKernel::new().orientation(&frame, &a, &b, &c),
            Orientation::DEGENERATE
        );
        assert_eq!(
            RobustKernel::new().orientation(&frame, &a, &b, &c),
            Orientation::POSITIVE
        );
    }

    #[test]
    fn test_contains_uses_barycentric_tolerance() {
        let [a, b, c] = unit_triangle();
        let frame = Frame::plane();
        let kernel = RobustKernel::new();
        assert!(kernel.contains(&frame, [&a, &b, &c], &Point::new2(0.5, 0.5)));
        assert!(kernel.contains(&frame, [&a, &b, &c], &Point::new2(0.0, 0.0)));
        assert!(!kernel.contains(&frame, [&a, &b, &c], &Point::new2(0.6, 0.6)));
    }
}
