//! Geometric predicates with adaptive, scale-aware tolerances.
//!
//! The plain determinants in [`crate::geometry::predicates`] are compared
//! against a fixed epsilon, which is meaningless once coordinates leave the
//! unit range (a mesh of the Earth in kilometres and a mesh of a unit square
//! need epsilons twelve orders of magnitude apart). The predicates here build
//! the determinant as a `nalgebra` matrix, bound its magnitude by the product
//! of its row norms, and classify the determinant relative to that bound.
//!
//! When the first evaluation lands inside the tolerance band, the matrix is
//! rebuilt around a translated and rescaled copy of the input and evaluated a
//! second time; only if both evaluations agree on a sign is it reported,
//! otherwise the configuration is reported as degenerate.

use nalgebra as na;

use crate::geometry::mesh_type::MeshType;
use crate::geometry::point::Point;
use crate::geometry::predicates::{Frame, InCircle, Orientation};

/// Configuration for robust geometric predicates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RobustPredicateConfig {
    /// Absolute tolerance floor for degenerate case detection
    pub base_tolerance: f64,
    /// Relative tolerance factor (multiplied by the determinant's magnitude bound)
    pub relative_tolerance_factor: f64,
    /// Re-evaluate near-degenerate cases on conditioned (centred, rescaled) input
    pub condition_on_ambiguity: bool,
}

impl Default for RobustPredicateConfig {
    fn default() -> Self {
        Self {
            base_tolerance: 1e-300,
            relative_tolerance_factor: 1e-12,
            condition_on_ambiguity: true,
        }
    }
}

impl RobustPredicateConfig {
    /// Configuration with the given relative tolerance.
    #[must_use]
    pub fn with_relative_tolerance(relative_tolerance_factor: f64) -> Self {
        Self {
            relative_tolerance_factor,
            ..Self::default()
        }
    }
}

/// Robust orientation of `(a, b, c)` in a frame.
///
/// # Examples
///
/// ```rust
/// use fmesh::geometry::point::Point;
/// use fmesh::geometry::predicates::{Frame, Orientation};
/// use fmesh::geometry::robust_predicates::{robust_orientation, RobustPredicateConfig};
///
/// let config = RobustPredicateConfig::default();
/// let o = robust_orientation(
///     &Frame::plane(),
///     &Point::new2(1e6, 1e6),
///     &Point::new2(1e6 + 1.0, 1e6),
///     &Point::new2(1e6, 1e6 + 1.0),
///     &config,
/// );
/// assert_eq!(o, Orientation::POSITIVE);
/// ```
#[must_use]
pub fn robust_orientation(
    frame: &Frame,
    a: &Point,
    b: &Point,
    c: &Point,
    config: &RobustPredicateConfig,
) -> Orientation {
    let first = classify(&build_orientation_matrix(frame, a, b, c), config);
    if first != Orientation::DEGENERATE || !config.condition_on_ambiguity {
        return first;
    }

    let (shift, scale) = conditioning(&[a, b, c]);
    if frame.mesh_type() == MeshType::Sphere {
        // Translation would move the sphere's centre; only rescale.
        let [ca, cb, cc] = [a, b, c].map(|p| *p / scale);
        return classify(&build_orientation_matrix(frame, &ca, &cb, &cc), config);
    }
    let [ca, cb, cc] = [a, b, c].map(|p| (*p - shift) / scale);
    classify(&build_orientation_matrix(frame, &ca, &cb, &cc), config)
}

/// Robust in-circle test of `d` against the positively oriented triangle `(a, b, c)`.
///
/// Returns [`InCircle::BOUNDARY`] when `d` is cocircular within tolerance.
#[must_use]
pub fn robust_incircle(
    frame: &Frame,
    a: &Point,
    b: &Point,
    c: &Point,
    d: &Point,
    config: &RobustPredicateConfig,
) -> InCircle {
    let to_incircle = |o: Orientation| match o {
        Orientation::POSITIVE => InCircle::INSIDE,
        Orientation::NEGATIVE => InCircle::OUTSIDE,
        Orientation::DEGENERATE => InCircle::BOUNDARY,
    };

    let first = classify(&build_incircle_matrix(frame, a, b, c, d), config);
    if first != Orientation::DEGENERATE || !config.condition_on_ambiguity {
        return to_incircle(first);
    }

    let (shift, scale) = conditioning(&[a, b, c, d]);
    let shift = if frame.mesh_type() == MeshType::Sphere {
        Point::ORIGIN
    } else {
        shift
    };
    let [ca, cb, cc, cd] = [a, b, c, d].map(|p| (*p - shift) / scale);
    to_incircle(classify(
        &build_incircle_matrix(frame, &ca, &cb, &cc, &cd),
        config,
    ))
}

/// Orientation matrix whose determinant has the sign of the frame orientation.
#[rustfmt::skip]
fn build_orientation_matrix(frame: &Frame, a: &Point, b: &Point, c: &Point) -> na::Matrix3<f64> {
    match frame.mesh_type() {
        MeshType::Plane => na::Matrix3::new(
            b.x() - a.x(), b.y() - a.y(), 0.0,
            c.x() - a.x(), c.y() - a.y(), 0.0,
            0.0, 0.0, 1.0,
        ),
        MeshType::Sphere => na::Matrix3::new(
            a.x(), a.y(), a.z(),
            b.x(), b.y(), b.z(),
            c.x(), c.y(), c.z(),
        ),
        MeshType::GeneralManifold => {
            let ab = *b - *a;
            let ac = *c - *a;
            let n = frame.up();
            na::Matrix3::new(
                ab.x(), ab.y(), ab.z(),
                ac.x(), ac.y(), ac.z(),
                n.x(), n.y(), n.z(),
            )
        }
    }
}

/// In-circle matrix whose determinant is positive when `d` is inside.
fn build_incircle_matrix(
    frame: &Frame,
    a: &Point,
    b: &Point,
    c: &Point,
    d: &Point,
) -> na::Matrix3<f64> {
    if frame.mesh_type() == MeshType::Sphere {
        let rows = [*a - *d, *b - *d, *c - *d];
        // det[a-d; b-d; c-d] is minus the height of d above the plane (a, b, c).
        let m = na::Matrix3::from_fn(|i, j| rows[i][j]);
        return -m;
    }
    let [pa, pb, pc, pd] = [a, b, c, d].map(|p| frame.project(p));
    let row = |p: [f64; 2]| {
        let dx = p[0] - pd[0];
        let dy = p[1] - pd[1];
        [dx, dy, dx.mul_add(dx, dy * dy)]
    };
    let rows = [row(pa), row(pb), row(pc)];
    na::Matrix3::from_fn(|i, j| rows[i][j])
}

/// Hadamard bound on `|det(m)|`: the product of the row norms.
fn magnitude_bound(m: &na::Matrix3<f64>) -> f64 {
    (0..3).map(|i| m.row(i).norm()).product()
}

fn classify(m: &na::Matrix3<f64>, config: &RobustPredicateConfig) -> Orientation {
    let det = m.determinant();
    let tolerance = config
        .relative_tolerance_factor
        .mul_add(magnitude_bound(m), config.base_tolerance);
    Orientation::from_determinant(det, tolerance)
}

/// Centroid and scale used to condition an ambiguous evaluation.
fn conditioning(points: &[&Point]) -> (Point, f64) {
    let n = points.len() as f64;
    let centroid = points.iter().fold(Point::ORIGIN, |acc, p| acc + **p) / n;
    let scale = points
        .iter()
        .map(|p| (**p - centroid).max_abs_coordinate())
        .fold(0.0_f64, f64::max);
    let scale = if scale > 0.0 && scale.is_finite() {
        scale
    } else {
        1.0
    };
    (centroid, scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_robust_orientation_scale_invariant() {
        let config = RobustPredicateConfig::default();
        for scale in [1e-6, 1.0, 1e6] {
            let a = Point::new2(0.0, 0.0);
            let b = Point::new2(scale, 0.0);
            let c = Point::new2(0.0, scale);
            assert_eq!(
                robust_orientation(&Frame::plane(), &a, &b, &c, &config),
                Orientation::POSITIVE
            );
            assert_eq!(
                robust_orientation(&Frame::plane(), &a, &c, &b, &config),
                Orientation::NEGATIVE
            );
        }
    }

    #[test]
    fn test_robust_orientation_nearly_collinear_is_degenerate() {
        let config = RobustPredicateConfig::default();
        let a = Point::new2(0.0, 0.0);
        let b = Point::new2(1.0, 1.0);
        let c = Point::new2(2.0, 2.0 + 1e-15);
        assert_eq!(
            robust_orientation(&Frame::plane(), &a, &b, &c, &config),
            Orientation::DEGENERATE
        );
    }

    #[test]
    fn test_robust_incircle_cocircular_is_boundary() {
        let config = RobustPredicateConfig::default();
        let a = Point::new2(1.0, 0.0);
        let b = Point::new2(0.0, 1.0);
        let c = Point::new2(-1.0, 0.0);
        let d = Point::new2(0.0, -1.0);
        assert_eq!(
            robust_incircle(&Frame::plane(), &a, &b, &c, &d, &config),
            InCircle::BOUNDARY
        );
        assert_eq!(
            robust_incircle(&Frame::plane(), &a, &b, &c, &Point::new2(0.1, 0.1), &config),
            InCircle::INSIDE
        );
        assert_eq!(
            robust_incircle(&Frame::plane(), &a, &b, &c, &Point::new2(3.0, 3.0), &config),
            InCircle::OUTSIDE
        );
    }

    #[test]
    fn test_robust_incircle_sphere() {
        let config = RobustPredicateConfig::default();
        let a = Point::new([1.0, 0.0, 0.0]);
        let b = Point::new([0.0, 1.0, 0.0]);
        let c = Point::new([0.0, 0.0, 1.0]);
        let s = 1.0 / 3.0_f64.sqrt();
        assert_eq!(
            robust_incircle(&Frame::sphere(), &a, &b, &c, &Point::new([s, s, s]), &config),
            InCircle::INSIDE
        );
        assert_eq!(
            robust_incircle(&Frame::sphere(), &a, &b, &c, &Point::new([-1.0, 0.0, 0.0]), &config),
            InCircle::OUTSIDE
        );
    }

    #[test]
    fn test_robust_orientation_sphere_and_manifold() {
        let config = RobustPredicateConfig::default();
        let a = Point::new([1.0, 0.0, 0.0]);
        let b = Point::new([0.0, 1.0, 0.0]);
        let c = Point::new([0.0, 0.0, 1.0]);
        assert_eq!(
            robust_orientation(&Frame::sphere(), &a, &b, &c, &config),
            Orientation::POSITIVE
        );
        let up = Point::new([1.0, 1.0, 1.0]);
        assert_eq!(
            robust_orientation(&Frame::manifold(up), &a, &b, &c, &config),
            Orientation::POSITIVE
        );
        assert_eq!(
            robust_orientation(&Frame::manifold(-up), &a, &b, &c, &config),
            Orientation::NEGATIVE
        );
    }
}
