//! Classification of an input point set into plane, sphere or general manifold.
//!
//! The mesh type is chosen once, from the input coordinates, and then fixed
//! for the lifetime of a mesh. It selects which orientation, in-circle,
//! circumcenter and barycentric formulas the geometric kernel uses.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::geometry::point::Point;

/// The geometric setting of a mesh.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MeshType {
    /// All points share the same third coordinate.
    #[default]
    Plane,
    /// All points lie on a sphere centred at the origin.
    Sphere,
    /// Points on an arbitrary 2-manifold embedded in 3D.
    GeneralManifold,
}

impl fmt::Display for MeshType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plane => write!(f, "plane"),
            Self::Sphere => write!(f, "sphere"),
            Self::GeneralManifold => write!(f, "manifold"),
        }
    }
}

impl MeshType {
    /// Classifies a point set.
    ///
    /// * `Plane` if the spread of the third coordinate is at most
    ///   `flatness_tolerance` times the input scale (or absolutely, for inputs
    ///   of scale below one).
    /// * `Sphere` if every radius differs from the mean radius by at most
    ///   `sphere_tolerance` relative to the mean radius.
    /// * `GeneralManifold` otherwise.
    ///
    /// An empty input is classified as `Plane`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use fmesh::geometry::mesh_type::MeshType;
    /// use fmesh::geometry::point::Point;
    ///
    /// let flat = [Point::new2(0.0, 0.0), Point::new2(1.0, 0.0), Point::new2(0.0, 1.0)];
    /// assert_eq!(MeshType::classify(&flat, 1e-10, 1e-7), MeshType::Plane);
    ///
    /// let round = [
    ///     Point::new([1.0, 0.0, 0.0]),
    ///     Point::new([0.0, 1.0, 0.0]),
    ///     Point::new([0.0, 0.0, 1.0]),
    /// ];
    /// assert_eq!(MeshType::classify(&round, 1e-10, 1e-7), MeshType::Sphere);
    /// ```
    #[must_use]
    pub fn classify(points: &[Point], flatness_tolerance: f64, sphere_tolerance: f64) -> Self {
        if points.is_empty() {
            return Self::Plane;
        }

        let scale = points
            .iter()
            .fold(1.0_f64, |m, p| m.max(p.max_abs_coordinate()));
        let (z_min, z_max) = points
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
                (lo.min(p.z()), hi.max(p.z()))
            });
        if z_max - z_min <= flatness_tolerance * scale {
            return Self::Plane;
        }

        let mean_radius = points.iter().map(Point::norm).sum::<f64>() / points.len() as f64;
        if mean_radius > 0.0
            && points
                .iter()
                .all(|p| (p.norm() - mean_radius).abs() <= sphere_tolerance * mean_radius)
        {
            return Self::Sphere;
        }

        Self::GeneralManifold
    }

    /// Mean distance from the origin, the radius used for spherical meshes.
    #[must_use]
    pub fn mean_radius(points: &[Point]) -> f64 {
        if points.is_empty() {
            return 0.0;
        }
        points.iter().map(Point::norm).sum::<f64>() / points.len() as f64
    }
}
