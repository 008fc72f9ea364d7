//! Shape quality measures for triangles.
//!
//! Refinement drives these measures: a triangle is "bad" when its smallest
//! angle falls below the requested bound or one of its edges exceeds the
//! local length bound. The same measures are exported for callers that want
//! to report mesh quality.
//!
//! # Quality Metrics
//!
//! - **Minimum angle**: smallest interior angle, in radians. Equilateral
//!   triangles reach the maximum of `π/3`.
//! - **Radius ratio**: circumradius divided by inradius. The optimum is `2`
//!   (equilateral); slivers diverge.
//!
//! Angles and lengths are measured on the straight (chordal) triangle for every
//! mesh type, which for spherical meshes converges to the spherical measures as
//! triangles shrink.

use thiserror::Error;

use crate::geometry::point::Point;
use crate::geometry::predicates::{circumradius, triangle_normal};

/// Errors that can occur during quality metric computation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QualityError {
    /// Triangle is degenerate (zero or near-zero area)
    #[error("Degenerate triangle with area ≈ {area:e}")]
    DegenerateTriangle {
        /// Computed area
        area: f64,
    },
    /// A coordinate is not finite
    #[error("Non-finite coordinate in triangle")]
    NonFinite,
}

/// Lengths of the three edges; entry `i` is the edge opposite vertex `i`.
#[must_use]
pub fn edge_lengths(triangle: [&Point; 3]) -> [f64; 3] {
    let [a, b, c] = triangle;
    [b.distance(c), c.distance(a), a.distance(b)]
}

/// Length of the longest edge.
#[must_use]
pub fn max_edge_length(triangle: [&Point; 3]) -> f64 {
    edge_lengths(triangle).into_iter().fold(0.0, f64::max)
}

/// Area of the (straight) triangle.
#[must_use]
pub fn area(triangle: [&Point; 3]) -> f64 {
    let [a, b, c] = triangle;
    0.5 * triangle_normal(a, b, c).norm()
}

/// Interior angles in radians; entry `i` is the angle at vertex `i`.
///
/// # Errors
///
/// Returns [`QualityError::NonFinite`] for non-finite input and
/// [`QualityError::DegenerateTriangle`] when an edge has zero length.
pub fn angles(triangle: [&Point; 3]) -> Result<[f64; 3], QualityError> {
    if triangle.iter().any(|p| !p.is_finite()) {
        return Err(QualityError::NonFinite);
    }
    let mut out = [0.0; 3];
    for (i, angle) in out.iter_mut().enumerate() {
        let apex = triangle[i];
        let u = *triangle[(i + 1) % 3] - *apex;
        let v = *triangle[(i + 2) % 3] - *apex;
        if u.norm_squared() == 0.0 || v.norm_squared() == 0.0 {
            return Err(QualityError::DegenerateTriangle {
                area: area(triangle),
            });
        }
        *angle = u.cross(&v).norm().atan2(u.dot(&v));
    }
    Ok(out)
}

/// Smallest interior angle in radians, and the vertex index it sits at.
///
/// # Errors
///
/// See [`angles`].
///
/// # Examples
///
/// ```
/// use fmesh::geometry::point::Point;
/// use fmesh::geometry::quality::min_angle;
///
/// let a = Point::new2(0.0, 0.0);
/// let b = Point::new2(1.0, 0.0);
/// let c = Point::new2(0.0, 1.0);
/// let (angle, at) = min_angle([&a, &b, &c]).unwrap();
/// assert!((angle.to_degrees() - 45.0).abs() < 1e-9);
/// assert!(at == 1 || at == 2);
/// ```
pub fn min_angle(triangle: [&Point; 3]) -> Result<(f64, usize), QualityError> {
    let a = angles(triangle)?;
    let mut best = 0;
    for i in 1..3 {
        if a[i] < a[best] {
            best = i;
        }
    }
    Ok((a[best], best))
}

/// Radius ratio (circumradius / inradius).
///
/// # Errors
///
/// Returns [`QualityError::DegenerateTriangle`] for zero-area triangles.
pub fn radius_ratio(triangle: [&Point; 3]) -> Result<f64, QualityError> {
    if triangle.iter().any(|p| !p.is_finite()) {
        return Err(QualityError::NonFinite);
    }
    let [a, b, c] = triangle;
    let area = area(triangle);
    let perimeter: f64 = edge_lengths(triangle).iter().sum();
    let r = circumradius(a, b, c).ok_or(QualityError::DegenerateTriangle { area })?;
    if area <= f64::MIN_POSITIVE || perimeter <= 0.0 {
        return Err(QualityError::DegenerateTriangle { area });
    }
    let inradius = 2.0 * area / perimeter;
    Ok(r / inradius)
}
