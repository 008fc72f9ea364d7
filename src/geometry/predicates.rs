//! Geometric predicates for planar, spherical and manifold triangles.
//!
//! Every predicate in this module is a pure function of coordinates and a
//! [`Frame`]; none of them touches the topology store. The raw determinant
//! functions return signed values; classification against a tolerance is the
//! job of a [`Kernel`](crate::geometry::kernel::Kernel).
//!
//! # Orientation convention
//!
//! A triangle `(a, b, c)` is positively oriented when it is counter-clockwise
//! seen from the frame's "up" side:
//!
//! * planes look down the negative third axis,
//! * spheres are seen from outside (the origin is below every triangle),
//! * manifold triangles are seen from the side of a reference normal.
//!
//! All three cases reduce to the sign of `((b - a) × (c - a)) · up`, which for
//! spheres is the triple product `a · (b × c)` independently of the choice of
//! `up` on the triangle.

use nalgebra::{Matrix3, Vector3};
use std::fmt;

use crate::geometry::mesh_type::MeshType;
use crate::geometry::point::Point;

/// Position of a point relative to a circumcircle (or spherical circumcap).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InCircle {
    /// The point is outside the circumcircle
    OUTSIDE,
    /// The point is on the circumcircle (within numerical tolerance)
    BOUNDARY,
    /// The point is inside the circumcircle
    INSIDE,
}

impl fmt::Display for InCircle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OUTSIDE => write!(f, "OUTSIDE"),
            Self::BOUNDARY => write!(f, "BOUNDARY"),
            Self::INSIDE => write!(f, "INSIDE"),
        }
    }
}

/// Orientation of an ordered point triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Clockwise: the third point is right of the directed line through the first two
    NEGATIVE,
    /// Collinear within tolerance
    DEGENERATE,
    /// Counter-clockwise: the third point is left of the directed line
    POSITIVE,
}

impl Orientation {
    /// Classifies a signed determinant against a non-negative tolerance.
    #[inline]
    #[must_use]
    pub fn from_determinant(det: f64, tolerance: f64) -> Self {
        if det > tolerance {
            Self::POSITIVE
        } else if det < -tolerance {
            Self::NEGATIVE
        } else {
            Self::DEGENERATE
        }
    }

    /// Returns the orientation of the reversed triple.
    #[must_use]
    pub const fn reversed(self) -> Self {
        match self {
            Self::NEGATIVE => Self::POSITIVE,
            Self::DEGENERATE => Self::DEGENERATE,
            Self::POSITIVE => Self::NEGATIVE,
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NEGATIVE => write!(f, "NEGATIVE"),
            Self::DEGENERATE => write!(f, "DEGENERATE"),
            Self::POSITIVE => write!(f, "POSITIVE"),
        }
    }
}

// =============================================================================
// FRAMES
// =============================================================================

/// Local geometric frame in which predicates are evaluated.
///
/// The frame pairs the mesh type with an "up" direction. For planes the up
/// direction is the third axis; for spheres it is unused (the origin is the
/// reference); for manifolds it is the normal of the triangle (or pair of
/// triangles) the predicate is evaluated on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    mesh_type: MeshType,
    up: Point,
}

impl Frame {
    /// Frame for planar meshes.
    #[must_use]
    pub const fn plane() -> Self {
        Self {
            mesh_type: MeshType::Plane,
            up: Point::UNIT_Z,
        }
    }

    /// Frame for spherical meshes centred at the origin.
    #[must_use]
    pub const fn sphere() -> Self {
        Self {
            mesh_type: MeshType::Sphere,
            up: Point::UNIT_Z,
        }
    }

    /// Frame for manifold meshes with the given reference normal.
    ///
    /// A zero normal falls back to the third axis.
    #[must_use]
    pub fn manifold(normal: Point) -> Self {
        Self {
            mesh_type: MeshType::GeneralManifold,
            up: normal.normalized().unwrap_or(Point::UNIT_Z),
        }
    }

    /// Builds the frame appropriate for evaluating predicates on triangle `(a, b, c)`.
    #[must_use]
    pub fn for_triangle(mesh_type: MeshType, a: &Point, b: &Point, c: &Point) -> Self {
        match mesh_type {
            MeshType::Plane => Self::plane(),
            MeshType::Sphere => Self::sphere(),
            MeshType::GeneralManifold => Self::manifold(triangle_normal(a, b, c)),
        }
    }

    /// The mesh type this frame evaluates for.
    #[must_use]
    pub const fn mesh_type(&self) -> MeshType {
        self.mesh_type
    }

    /// The reference "up" direction.
    #[must_use]
    pub const fn up(&self) -> Point {
        self.up
    }

    /// Orthonormal tangent basis `(e1, e2)` with `e1 × e2 = up`.
    #[must_use]
    pub fn tangent_basis(&self) -> (Point, Point) {
        if self.mesh_type == MeshType::Plane {
            return (Point::new([1.0, 0.0, 0.0]), Point::new([0.0, 1.0, 0.0]));
        }
        let n = self.up;
        let helper = if n.x().abs() <= n.y().abs() && n.x().abs() <= n.z().abs() {
            Point::new([1.0, 0.0, 0.0])
        } else if n.y().abs() <= n.z().abs() {
            Point::new([0.0, 1.0, 0.0])
        } else {
            Point::new([0.0, 0.0, 1.0])
        };
        let e2 = n.cross(&helper).normalized().unwrap_or(Point::new([0.0, 1.0, 0.0]));
        let e1 = e2.cross(&n);
        (e1, e2)
    }

    /// Projects a point to tangent-plane coordinates.
    #[must_use]
    pub fn project(&self, p: &Point) -> [f64; 2] {
        if self.mesh_type == MeshType::Plane {
            return [p.x(), p.y()];
        }
        let (e1, e2) = self.tangent_basis();
        [p.dot(&e1), p.dot(&e2)]
    }
}

/// Unnormalized normal `(b - a) × (c - a)` of a triangle.
#[inline]
#[must_use]
pub fn triangle_normal(a: &Point, b: &Point, c: &Point) -> Point {
    (*b - *a).cross(&(*c - *a))
}

// =============================================================================
// RAW DETERMINANTS
// =============================================================================

/// Planar orientation determinant of `(a, b, c)` using the first two coordinates.
///
/// Positive when `c` is left of the directed line `a → b`.
#[inline]
#[must_use]
pub fn orient2d(a: [f64; 2], b: [f64; 2], c: [f64; 2]) -> f64 {
    (b[0] - a[0]) * (c[1] - a[1]) - (b[1] - a[1]) * (c[0] - a[0])
}

/// Planar in-circle determinant.
///
/// Positive when `d` is inside the circumcircle of the counter-clockwise
/// triangle `(a, b, c)`.
#[must_use]
pub fn incircle2d(a: [f64; 2], b: [f64; 2], c: [f64; 2], d: [f64; 2]) -> f64 {
    let adx = a[0] - d[0];
    let ady = a[1] - d[1];
    let bdx = b[0] - d[0];
    let bdy = b[1] - d[1];
    let cdx = c[0] - d[0];
    let cdy = c[1] - d[1];

    let alift = adx * adx + ady * ady;
    let blift = bdx * bdx + bdy * bdy;
    let clift = cdx * cdx + cdy * cdy;

    alift * (bdx * cdy - cdx * bdy) + blift * (cdx * ady - adx * cdy)
        + clift * (adx * bdy - bdx * ady)
}

/// Three-dimensional orientation determinant `((b - a) × (c - a)) · (d - a)`.
#[inline]
#[must_use]
pub fn orient3d(a: &Point, b: &Point, c: &Point, d: &Point) -> f64 {
    triangle_normal(a, b, c).dot(&(*d - *a))
}

/// Signed orientation determinant of `(a, b, c)` in a frame.
///
/// For spheres this is the triple product `a · (b × c)`; for planes and
/// manifolds it is the normal of the triple projected on the frame's up
/// direction.
#[must_use]
pub fn orientation_determinant(frame: &Frame, a: &Point, b: &Point, c: &Point) -> f64 {
    match frame.mesh_type() {
        MeshType::Plane => orient2d([a.x(), a.y()], [b.x(), b.y()], [c.x(), c.y()]),
        MeshType::Sphere => a.dot(&b.cross(c)),
        MeshType::GeneralManifold => triangle_normal(a, b, c).dot(&frame.up()),
    }
}

/// Signed in-circle determinant of `d` against triangle `(a, b, c)` in a frame.
///
/// Positive means inside for a positively oriented triangle. On the sphere the
/// circumcircle bounds the cap containing the triangle, and the determinant is
/// the height of `d` above the plane through `a`, `b`, `c`.
#[must_use]
pub fn incircle_determinant(frame: &Frame, a: &Point, b: &Point, c: &Point, d: &Point) -> f64 {
    match frame.mesh_type() {
        MeshType::Sphere => orient3d(a, b, c, d),
        MeshType::Plane | MeshType::GeneralManifold => incircle2d(
            frame.project(a),
            frame.project(b),
            frame.project(c),
            frame.project(d),
        ),
    }
}

// =============================================================================
// CONSTRUCTIONS
// =============================================================================

/// Circumcenter of triangle `(a, b, c)`.
///
/// * Planes and manifolds: the circumcenter in the triangle's own plane.
/// * Spheres: the spherical circumcenter, i.e. the centre of the triangle's
///   circumcap projected onto the sphere of the triangle's mean radius.
///
/// Returns `None` for degenerate (collinear) triangles.
///
/// # Examples
///
/// ```rust
/// use fmesh::geometry::point::Point;
/// use fmesh::geometry::predicates::{circumcenter, Frame};
///
/// let c = circumcenter(
///     &Frame::plane(),
///     &Point::new2(0.0, 0.0),
///     &Point::new2(2.0, 0.0),
///     &Point::new2(0.0, 2.0),
/// )
/// .unwrap();
/// assert!((c.x() - 1.0).abs() < 1e-12 && (c.y() - 1.0).abs() < 1e-12);
/// ```
#[must_use]
pub fn circumcenter(frame: &Frame, a: &Point, b: &Point, c: &Point) -> Option<Point> {
    let n = triangle_normal(a, b, c);
    let n2 = n.norm_squared();
    if n2 <= f64::MIN_POSITIVE || !n2.is_finite() {
        return None;
    }

    if frame.mesh_type() == MeshType::Sphere {
        let radius = (a.norm() + b.norm() + c.norm()) / 3.0;
        // Orient the cap centre to the side of the triangle.
        let dir = if n.dot(a) >= 0.0 { n } else { -n };
        return dir.normalized().map(|d| d * radius);
    }

    // Standard 3D circumcenter in the plane of the triangle.
    let ab = *b - *a;
    let ac = *c - *a;
    let offset = (n.cross(&ab) * ac.norm_squared() + ac.cross(&n) * ab.norm_squared()) / (2.0 * n2);
    Some(*a + offset)
}

/// Circumradius (chord radius for spheres) of triangle `(a, b, c)`.
#[must_use]
pub fn circumradius(a: &Point, b: &Point, c: &Point) -> Option<f64> {
    let ab = b.distance(a);
    let bc = c.distance(b);
    let ca = a.distance(c);
    let twice_area = triangle_normal(a, b, c).norm();
    if twice_area <= f64::MIN_POSITIVE {
        return None;
    }
    Some(ab * bc * ca / (2.0 * twice_area))
}

/// Barycentric coordinates of `p` with respect to triangle `(a, b, c)`.
///
/// * Planes: linear solve in the first two coordinates.
/// * Manifolds: `p` is projected orthogonally onto the triangle's plane and
///   solved in a tangent basis of that plane.
/// * Spheres: ratios of signed spherical triangle areas `(p,b,c)`, `(a,p,c)`,
///   `(a,b,p)` after radial projection onto the unit sphere.
///
/// The result sums to one. Returns `None` for degenerate triangles.
///
/// # Examples
///
/// ```rust
/// use fmesh::geometry::point::Point;
/// use fmesh::geometry::predicates::{barycentric, Frame};
///
/// let b = barycentric(
///     &Frame::plane(),
///     [&Point::new2(0.0, 0.0), &Point::new2(1.0, 0.0), &Point::new2(0.0, 1.0)],
///     &Point::new2(0.25, 0.25),
/// )
/// .unwrap();
/// assert!((b[0] - 0.5).abs() < 1e-12);
/// assert!((b[1] - 0.25).abs() < 1e-12);
/// assert!((b[2] - 0.25).abs() < 1e-12);
/// ```
#[must_use]
pub fn barycentric(frame: &Frame, triangle: [&Point; 3], p: &Point) -> Option<[f64; 3]> {
    match frame.mesh_type() {
        MeshType::Plane => barycentric_planar(&Frame::plane(), triangle, p),
        MeshType::GeneralManifold => {
            let [a, b, c] = triangle;
            let local = Frame::manifold(triangle_normal(a, b, c));
            barycentric_planar(&local, triangle, p)
        }
        MeshType::Sphere => barycentric_spherical(triangle, p),
    }
}

fn barycentric_planar(frame: &Frame, triangle: [&Point; 3], p: &Point) -> Option<[f64; 3]> {
    let [a, b, c] = triangle.map(|v| frame.project(v));
    let q = frame.project(p);
    let m = Matrix3::new(a[0], b[0], c[0], a[1], b[1], c[1], 1.0, 1.0, 1.0);
    let rhs = Vector3::new(q[0], q[1], 1.0);
    let solution = m.lu().solve(&rhs)?;
    let out = [solution[0], solution[1], solution[2]];
    out.iter().all(|w| w.is_finite()).then_some(out)
}

/// Signed area of the spherical triangle with unit-vector corners.
fn signed_spherical_area(a: &Point, b: &Point, c: &Point) -> f64 {
    let triple = a.dot(&b.cross(c));
    let denominator = 1.0 + a.dot(b) + b.dot(c) + c.dot(a);
    2.0 * triple.atan2(denominator)
}

fn barycentric_spherical(triangle: [&Point; 3], p: &Point) -> Option<[f64; 3]> {
    let [a, b, c] = triangle;
    let a = a.normalized()?;
    let b = b.normalized()?;
    let c = c.normalized()?;
    let p = p.normalized()?;
    let w = [
        signed_spherical_area(&p, &b, &c),
        signed_spherical_area(&a, &p, &c),
        signed_spherical_area(&a, &b, &p),
    ];
    let total: f64 = w.iter().sum();
    if total.abs() <= f64::EPSILON * 16.0 || !total.is_finite() {
        return None;
    }
    Some(w.map(|x| x / total))
}

// =============================================================================
// BOUNDING BOXES
// =============================================================================

/// Axis-aligned box over a selected subset of the three coordinates.
///
/// Coordinates that were not selected are unbounded, so containment and
/// overlap tests only consider the selected dimensions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Lower corner
    pub min: [f64; 3],
    /// Upper corner
    pub max: [f64; 3],
}

impl BoundingBox {
    /// The box containing everything.
    pub const UNBOUNDED: Self = Self {
        min: [f64::NEG_INFINITY; 3],
        max: [f64::INFINITY; 3],
    };

    /// The empty box (identity for [`BoundingBox::union`]).
    pub const EMPTY: Self = Self {
        min: [f64::INFINITY; 3],
        max: [f64::NEG_INFINITY; 3],
    };

    /// Bounding box of a set of points over the selected dimensions.
    #[must_use]
    pub fn of_points(points: &[&Point], dims: &[usize]) -> Self {
        let mut bbox = Self::UNBOUNDED;
        for &d in dims {
            bbox.min[d] = f64::INFINITY;
            bbox.max[d] = f64::NEG_INFINITY;
            for p in points {
                bbox.min[d] = bbox.min[d].min(p[d]);
                bbox.max[d] = bbox.max[d].max(p[d]);
            }
        }
        bbox
    }

    /// Grows the bounded dimensions by `margin` on every side.
    #[must_use]
    pub fn expanded(mut self, margin: f64) -> Self {
        for d in 0..3 {
            if self.min[d].is_finite() {
                self.min[d] -= margin;
            }
            if self.max[d].is_finite() {
                self.max[d] += margin;
            }
        }
        self
    }

    /// Smallest box containing both boxes.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        let mut out = *self;
        for d in 0..3 {
            out.min[d] = out.min[d].min(other.min[d]);
            out.max[d] = out.max[d].max(other.max[d]);
        }
        out
    }

    /// Returns `true` if the point lies in the box (boundary inclusive).
    #[must_use]
    pub fn contains(&self, p: &Point) -> bool {
        (0..3).all(|d| self.min[d] <= p[d] && p[d] <= self.max[d])
    }

    /// Centre of the box along one dimension (zero when unbounded).
    #[must_use]
    pub fn center(&self, dim: usize) -> f64 {
        let c = 0.5 * (self.min[dim] + self.max[dim]);
        if c.is_finite() { c } else { 0.0 }
    }

    /// Extent of the box along one dimension (zero when unbounded or empty).
    #[must_use]
    pub fn extent(&self, dim: usize) -> f64 {
        let e = self.max[dim] - self.min[dim];
        if e.is_finite() && e > 0.0 { e } else { 0.0 }
    }
}

/// Bounding box of triangle `(a, b, c)` over the selected dimensions.
#[must_use]
pub fn bounding_box(triangle: [&Point; 3], dims: &[usize]) -> BoundingBox {
    BoundingBox::of_points(&triangle, dims)
}
