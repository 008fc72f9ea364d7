//! Walk-based point location.
//!
//! Starting from a hint dart (or the first live triangle), the walk
//! repeatedly tests the query point against the edges of the current triangle
//! and crosses an edge the point lies strictly beyond. It stops when no edge
//! separates the point from the triangle, or when the point is beyond a
//! boundary edge.
//!
//! The edges of each triangle are tested starting after the edge the walk
//! entered through, and among separating edges one with a neighbor is
//! preferred, so the walk also finds its way around concave boundaries in
//! common cases. A step bound of `triangle_count + 1` turns round-off cycles
//! into a reported failure.
//!
//! # References
//!
//! - O. Devillers, S. Pion, and M. Teillaud, "Walking in a Triangulation",
//!   International Journal of Foundations of Computer Science, 2001.

use crate::core::dart::Dart;
use crate::core::triangulation_data_structure::{Tds, TriangleId, VertexId, ccw};
use crate::geometry::kernel::Kernel;
use crate::geometry::mesh_type::MeshType;
use crate::geometry::point::Point;
use crate::geometry::predicates::{Frame, Orientation};

/// Result of a point location query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocateResult {
    /// Point is strictly inside the dart's triangle.
    Inside(Dart),
    /// Point is on the dart's edge (between its endpoints).
    OnEdge(Dart),
    /// Point coincides with a vertex of the dart's triangle.
    OnVertex {
        /// A dart of a triangle containing the vertex.
        dart: Dart,
        /// The coinciding vertex.
        vertex: VertexId,
    },
    /// Point is outside the triangulated region; the dart is the boundary edge
    /// where the walk left the mesh.
    Outside(Dart),
}

impl LocateResult {
    /// The dart of the containing triangle, or `None` when outside.
    #[must_use]
    pub const fn dart(&self) -> Option<Dart> {
        match self {
            Self::Inside(d) | Self::OnEdge(d) | Self::OnVertex { dart: d, .. } => Some(*d),
            Self::Outside(_) => None,
        }
    }

    /// Whether the point was found in the mesh.
    #[must_use]
    pub const fn is_found(&self) -> bool {
        !matches!(self, Self::Outside(_))
    }
}

/// Error during point location.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocateError {
    /// Triangulation has no triangles
    #[error("Cannot locate in empty triangulation")]
    EmptyTriangulation,

    /// Starting dart does not name a live triangle
    #[error("Invalid starting dart: {dart}")]
    InvalidStart {
        /// The invalid dart
        dart: Dart,
    },

    /// Step bound reached (cycle caused by numerical round-off)
    #[error("Walk did not terminate after {steps} steps - possible numerical degeneracy")]
    StepLimitExceeded {
        /// Number of steps taken
        steps: usize,
    },
}

/// Predicate frame for a triangle of a mesh of the given type.
#[must_use]
pub fn triangle_frame(tds: &Tds, mesh_type: MeshType, t: TriangleId) -> Frame {
    let [a, b, c] = tds.triangle_points(t);
    Frame::for_triangle(mesh_type, a, b, c)
}

/// Orientation of `p` against each edge of `t`; entry `i` is the edge opposite
/// vertex `i`, positive when `p` is on the triangle's side.
pub(crate) fn edge_orientations<K: Kernel>(
    tds: &Tds,
    kernel: &K,
    mesh_type: MeshType,
    t: TriangleId,
    p: &Point,
) -> [Orientation; 3] {
    let frame = triangle_frame(tds, mesh_type, t);
    let tri = tds.triangle(t);
    [0, 1, 2].map(|e| {
        let (a, b) = tri.edge(e);
        kernel.orientation(&frame, tds.point(a), tds.point(b), p)
    })
}

/// Locate a point by walking from a hint.
///
/// An invalid or missing hint starts the walk at the first live triangle.
///
/// # Errors
///
/// Returns [`LocateError::EmptyTriangulation`] for a mesh without triangles
/// and [`LocateError::StepLimitExceeded`] when the walk does not terminate.
///
/// # Examples
///
/// ```rust
/// use fmesh::core::locate::{LocateResult, locate};
/// use fmesh::core::triangulation_data_structure::Tds;
/// use fmesh::geometry::kernel::RobustKernel;
/// use fmesh::geometry::mesh_type::MeshType;
/// use fmesh::geometry::point::Point;
///
/// let points = vec![
///     Point::new2(0.0, 0.0),
///     Point::new2(1.0, 0.0),
///     Point::new2(1.0, 1.0),
///     Point::new2(0.0, 1.0),
/// ];
/// let tds = Tds::from_triangles(points, &[[0, 1, 2], [0, 2, 3]], true, true).unwrap();
/// let kernel = RobustKernel::new();
///
/// let hit = locate(&tds, &kernel, MeshType::Plane, &Point::new2(0.2, 0.7), None).unwrap();
/// assert!(matches!(hit, LocateResult::Inside(_)));
///
/// let miss = locate(&tds, &kernel, MeshType::Plane, &Point::new2(1000.0, 1000.0), None).unwrap();
/// assert!(matches!(miss, LocateResult::Outside(_)));
/// ```
pub fn locate<K: Kernel>(
    tds: &Tds,
    kernel: &K,
    mesh_type: MeshType,
    point: &Point,
    hint: Option<Dart>,
) -> Result<LocateResult, LocateError> {
    let start = match hint {
        Some(d) if d.is_valid(tds) => d,
        _ => Dart::of_triangle(
            tds.triangle_ids()
                .next()
                .ok_or(LocateError::EmptyTriangulation)?,
        ),
    };
    locate_from(tds, kernel, mesh_type, point, start)
}

/// Locate a point by walking from a specific dart.
///
/// # Errors
///
/// Returns [`LocateError::InvalidStart`] when `start` is not live, and
/// [`LocateError::StepLimitExceeded`] when the walk does not terminate.
pub fn locate_from<K: Kernel>(
    tds: &Tds,
    kernel: &K,
    mesh_type: MeshType,
    point: &Point,
    start: Dart,
) -> Result<LocateResult, LocateError> {
    if !start.is_valid(tds) {
        return Err(LocateError::InvalidStart { dart: start });
    }

    let max_steps = tds.triangle_count() + 1;
    let mut current = start.triangle_id();
    let mut entry: Option<usize> = None;

    for _ in 0..max_steps {
        let orientations = edge_orientations(tds, kernel, mesh_type, current, point);
        let first = entry.map_or(0, |e| ccw(e, 1));
        let order = [first, ccw(first, 1), ccw(first, 2)];

        let mut exit_boundary = None;
        let mut next = None;
        for e in order {
            if orientations[e] != Orientation::NEGATIVE {
                continue;
            }
            match tds.adjacent(current, e) {
                Some(step) => {
                    next = Some(step);
                    break;
                }
                None => {
                    exit_boundary.get_or_insert(e);
                }
            }
        }

        if let Some((t2, e2)) = next {
            current = t2;
            entry = Some(e2);
            continue;
        }
        if let Some(e) = exit_boundary {
            return Ok(LocateResult::Outside(Dart::new(current, e, true)));
        }
        return Ok(classify(tds, current, &orientations));
    }

    Err(LocateError::StepLimitExceeded { steps: max_steps })
}

/// Classifies a point known to be in the closed triangle `t`.
fn classify(tds: &Tds, t: TriangleId, orientations: &[Orientation; 3]) -> LocateResult {
    let zeros: Vec<usize> = (0..3)
        .filter(|&e| orientations[e] == Orientation::DEGENERATE)
        .collect();
    match zeros.as_slice() {
        [e] => LocateResult::OnEdge(Dart::new(t, *e, true)),
        [e1, e2] => {
            // The vertex shared by both edges is the one opposite neither.
            let i = 3 - e1 - e2;
            LocateResult::OnVertex {
                dart: Dart::new(t, ccw(i, 2), true),
                vertex: tds.triangle(t).vertex(i),
            }
        }
        _ => LocateResult::Inside(Dart::of_triangle(t)),
    }
}

/// Locate by testing every live triangle's barycentric coordinates.
///
/// Linear time; used as a last resort for disconnected meshes when no
/// [`TriangleLocator`](crate::core::triangle_locator::TriangleLocator) is
/// available.
#[must_use]
pub fn locate_exhaustive<K: Kernel>(
    tds: &Tds,
    kernel: &K,
    mesh_type: MeshType,
    point: &Point,
) -> Option<TriangleId> {
    tds.triangle_ids().find(|&t| {
        let frame = triangle_frame(tds, mesh_type, t);
        kernel.contains(&frame, tds.triangle_points(t), point)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::kernel::{FastKernel, RobustKernel};

    fn grid(n: usize) -> Tds {
        let mut points = Vec::new();
        for j in 0..=n {
            for i in 0..=n {
                points.push(Point::new2(i as f64, j as f64));
            }
        }
        let idx = |i: usize, j: usize| j * (n + 1) + i;
        let mut triangles = Vec::new();
        for j in 0..n {
            for i in 0..n {
                triangles.push([idx(i, j), idx(i + 1, j), idx(i + 1, j + 1)]);
                triangles.push([idx(i, j), idx(i + 1, j + 1), idx(i, j + 1)]);
            }
        }
        Tds::from_triangles(points, &triangles, true, true).unwrap()
    }

    // =============================================================================
    // WALK TESTS
    // =============================================================================

    #[test]
    fn test_locate_across_grid() {
        let tds = grid(6);
        let kernel = RobustKernel::new();
        let p = Point::new2(5.3, 4.6);
        let result = locate(&tds, &kernel, MeshType::Plane, &p, None).unwrap();
        let LocateResult::Inside(dart) = result else {
            panic!("expected inside, got {result:?}");
        };
        let frame = Frame::plane();
        assert!(kernel.contains(&frame, tds.triangle_points(dart.triangle_id()), &p));
    }

    #[test]
    fn test_locate_on_edge_and_vertex() {
        let tds = grid(3);
        let kernel = FastKernel::new();
        let on_edge = locate(&tds, &kernel, MeshType::Plane, &Point::new2(1.5, 1.0), None).unwrap();
        let LocateResult::OnEdge(d) = on_edge else {
            panic!("expected on-edge, got {on_edge:?}");
        };
        let (a, b) = d.edge_vertices(&tds);
        assert_eq!(tds.point(a).y(), 1.0);
        assert_eq!(tds.point(b).y(), 1.0);

        let on_vertex = locate(&tds, &kernel, MeshType::Plane, &Point::new2(2.0, 1.0), None).unwrap();
        let LocateResult::OnVertex { vertex, dart } = on_vertex else {
            panic!("expected on-vertex, got {on_vertex:?}");
        };
        assert_eq!(*tds.point(vertex), Point::new2(2.0, 1.0));
        assert_eq!(dart.origin(&tds), vertex);
    }

    #[test]
    fn test_locate_outside_returns_boundary_dart() {
        let tds = grid(2);
        let kernel = RobustKernel::new();
        let result = locate(&tds, &kernel, MeshType::Plane, &Point::new2(1000.0, 1000.0), None).unwrap();
        let LocateResult::Outside(d) = result else {
            panic!("expected outside");
        };
        assert!(d.is_boundary(&tds));
        assert!(result.dart().is_none());
    }

    #[test]
    fn test_locate_uses_hint_and_rejects_dead_start() {
        let mut tds = grid(2);
        let kernel = RobustKernel::new();
        let hint = Dart::of_triangle(TriangleId(7));
        let result = locate(&tds, &kernel, MeshType::Plane, &Point::new2(1.2, 1.8), Some(hint)).unwrap();
        assert_eq!(result.dart().map(|d| d.triangle_id()), Some(TriangleId(7)));

        tds.kill_triangle(TriangleId(7));
        assert_eq!(
            locate_from(&tds, &kernel, MeshType::Plane, &Point::new2(0.1, 0.1), hint),
            Err(LocateError::InvalidStart { dart: hint })
        );
        // The lenient entry point falls back to the first live triangle.
        assert!(locate(&tds, &kernel, MeshType::Plane, &Point::new2(0.1, 0.05), Some(hint))
            .unwrap()
            .is_found());
    }

    #[test]
    fn test_locate_empty() {
        let tds = Tds::new(true, true);
        assert_eq!(
            locate(&tds, &RobustKernel::new(), MeshType::Plane, &Point::ORIGIN, None),
            Err(LocateError::EmptyTriangulation)
        );
    }

    #[test]
    fn test_locate_exhaustive_matches_walk() {
        let tds = grid(4);
        let kernel = RobustKernel::new();
        let p = Point::new2(2.25, 3.5);
        let walked = locate(&tds, &kernel, MeshType::Plane, &p, None).unwrap().dart().unwrap();
        assert_eq!(
            locate_exhaustive(&tds, &kernel, MeshType::Plane, &p),
            Some(walked.triangle_id())
        );
    }
}
