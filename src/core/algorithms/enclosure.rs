//! Enclosing triangulation bootstrap.
//!
//! Before any input point is inserted, the store receives a triangulation
//! that covers every later insertion. Vertices already stored but not yet
//! triangulated keep their ids; the enclosure vertices are appended after
//! them.
//!
//!
//! - **Plane**: a regular polygon with `sides` vertices whose inscribed
//!   circle has radius `(1 + margin)` times the half-diagonal of the input's
//!   bounding box, centred on the box. It is triangulated as a fan from its
//!   first vertex; all polygon vertices are cocircular, so the fan is already
//!   Delaunay.
//! - **Sphere**: an octahedron inscribed in the sphere of the input's mean
//!   radius. It has no boundary.
//! - **General manifolds** have no canonical enclosure and must be imported.

use std::f64::consts::PI;

use thiserror::Error;

use crate::core::config::EnclosureConfig;
use crate::core::triangulation_data_structure::{Tds, VertexId};
use crate::geometry::mesh_type::MeshType;
use crate::geometry::point::Point;

/// Errors while building the enclosing triangulation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnclosureError {
    /// The store already holds triangles.
    #[error("Enclosure requires a store without triangles, found {triangles}")]
    NonEmpty {
        /// Number of live triangles present.
        triangles: usize,
    },
    /// No enclosure exists for this mesh type.
    #[error("No enclosing triangulation for {mesh_type} meshes; import a starting triangulation")]
    UnsupportedMeshType {
        /// The mesh type.
        mesh_type: MeshType,
    },
    /// The polygon needs at least three sides.
    #[error("Enclosing polygon needs at least 3 sides, got {sides}")]
    TooFewSides {
        /// Requested side count.
        sides: usize,
    },
    /// An input coordinate is not finite.
    #[error("Input point {index} has a non-finite coordinate")]
    NonFinitePoint {
        /// Index of the offending input point.
        index: usize,
    },
}

/// Builds the enclosing triangulation for `points` into `tds`, which must
/// hold no triangles, and returns the enclosure vertices in ring order.
///
/// # Errors
///
/// See [`EnclosureError`].
///
/// # Examples
///
/// ```rust
/// use fmesh::core::algorithms::enclosure::build_enclosure;
/// use fmesh::core::config::EnclosureConfig;
/// use fmesh::core::triangulation_data_structure::Tds;
/// use fmesh::geometry::mesh_type::MeshType;
/// use fmesh::geometry::point::Point;
///
/// let input = [Point::new2(0.0, 0.0), Point::new2(1.0, 1.0)];
/// let mut tds = Tds::new(true, true);
/// let ring = build_enclosure(&mut tds, MeshType::Plane, &input, &EnclosureConfig::default()).unwrap();
/// assert_eq!(ring.len(), 8);
/// assert_eq!(tds.triangle_count(), 6);
/// ```
pub fn build_enclosure(
    tds: &mut Tds,
    mesh_type: MeshType,
    points: &[Point],
    config: &EnclosureConfig,
) -> Result<Vec<VertexId>, EnclosureError> {
    if tds.triangle_count() > 0 {
        return Err(EnclosureError::NonEmpty {
            triangles: tds.triangle_count(),
        });
    }
    if let Some(index) = points.iter().position(|p| !p.is_finite()) {
        return Err(EnclosureError::NonFinitePoint { index });
    }
    let ring = match mesh_type {
        MeshType::Plane => polygon(tds, points, config)?,
        MeshType::Sphere => octahedron(tds, points),
        MeshType::GeneralManifold => {
            return Err(EnclosureError::UnsupportedMeshType { mesh_type });
        }
    };
    tracing::debug!(
        vertices = ring.len(),
        triangles = tds.triangle_count(),
        mesh_type = %mesh_type,
        "[insert] built enclosing triangulation"
    );
    Ok(ring)
}

fn polygon(
    tds: &mut Tds,
    points: &[Point],
    config: &EnclosureConfig,
) -> Result<Vec<VertexId>, EnclosureError> {
    let n = config.sides;
    if n < 3 {
        return Err(EnclosureError::TooFewSides { sides: n });
    }

    let (mut min, mut max) = ([f64::INFINITY; 2], [f64::NEG_INFINITY; 2]);
    for p in points {
        for d in 0..2 {
            min[d] = min[d].min(p[d]);
            max[d] = max[d].max(p[d]);
        }
    }
    let (center, half_diagonal) = if points.is_empty() {
        ([0.0, 0.0], 1.0)
    } else {
        let center = [0.5 * (min[0] + max[0]), 0.5 * (min[1] + max[1])];
        let half = 0.5 * (max[0] - min[0]).hypot(max[1] - min[1]);
        let fallback = center[0].abs().max(center[1].abs()).max(1.0);
        (center, if half > 0.0 { half } else { fallback })
    };

    let inner = half_diagonal * (1.0 + config.margin.max(0.0));
    let radius = inner / (PI / n as f64).cos();
    let ring: Vec<VertexId> = (0..n)
        .map(|k| {
            let angle = PI * (2 * k + 1) as f64 / n as f64;
            tds.append_vertex(Point::new2(
                radius.mul_add(angle.cos(), center[0]),
                radius.mul_add(angle.sin(), center[1]),
            ))
        })
        .collect();

    let fan: Vec<_> = (1..n - 1)
        .map(|i| tds.append_triangle([ring[0], ring[i], ring[i + 1]]))
        .collect();
    // Consecutive fan triangles share the diagonal ring[0]-ring[i+1], which is
    // edge 1 of the earlier and edge 2 of the later triangle.
    for w in fan.windows(2) {
        tds.link(w[0], 1, w[1], 2);
    }
    Ok(ring)
}

fn octahedron(tds: &mut Tds, points: &[Point]) -> Vec<VertexId> {
    let radius = match MeshType::mean_radius(points) {
        r if r > 0.0 && r.is_finite() => r,
        _ => 1.0,
    };
    let ring: Vec<VertexId> = [
        [1.0, 0.0, 0.0],
        [0.0, 1.0, 0.0],
        [-1.0, 0.0, 0.0],
        [0.0, -1.0, 0.0],
        [0.0, 0.0, 1.0],
        [0.0, 0.0, -1.0],
    ]
    .into_iter()
    .map(|c| tds.append_vertex(Point::new(c) * radius))
    .collect();

    // Four faces around the north pole, then four around the south pole, all
    // counter-clockwise seen from outside.
    let mut faces = Vec::with_capacity(8);
    for k in 0..4 {
        faces.push([ring[k], ring[(k + 1) % 4], ring[4]]);
    }
    for k in 0..4 {
        faces.push([ring[(k + 1) % 4], ring[k], ring[5]]);
    }
    let ids: Vec<_> = faces.iter().map(|&f| tds.append_triangle(f)).collect();
    for k in 0..4 {
        let north = ids[k];
        let south = ids[4 + k];
        // North face [r_k, r_k+1, N]: edge 2 is the equator edge, edge 0 faces the next face.
        tds.link(north, 2, south, 2);
        tds.link(north, 0, ids[(k + 1) % 4], 1);
        // South face [r_k+1, r_k, S]: edge 1 faces the next face.
        tds.link(south, 1, ids[4 + (k + 1) % 4], 0);
    }
    ring
}
