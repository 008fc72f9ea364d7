//! Edge flips and flip-based Delaunay repair.
//!
//! A flip replaces the two triangles sharing an edge by the two triangles
//! sharing the other diagonal of their quadrilateral:
//!
//! ```text
//!         c                    c
//!        /|\                  / \
//!       / | \                / U'\
//!      a  |  d      ==>     a-----d
//!       \ | /                \ T'/
//!        \|/                  \ /
//!         b                    b
//! ```
//!
//! With `t = [a, b, c]` and its neighbor `u = [d, c, b]` across `bc`, the flip
//! rewrites `t` as `T' = [a, b, d]` and `u` as `U' = [d, c, a]`, keeping both
//! triangle ids.
//!
//! [`repair_delaunay`] drives flips from an explicit FIFO worklist of edges.
//! Constrained edges, boundary edges and non-convex quadrilaterals are never
//! flipped, and a flip budget turns a round-off cycle into
//! [`DelaunayRepairError::NonConvergent`].
//!
//! # References
//! - C. L. Lawson, "Software for C1 Surface Interpolation", 1977.
//! - L. Guibas and J. Stolfi, "Primitives for the Manipulation of General
//!   Subdivisions and the Computation of Voronoi Diagrams", 1985.

use std::collections::VecDeque;
use std::fmt;

use thiserror::Error;

use crate::core::collections::{FastHashMap, fast_hash_map_with_capacity};
use crate::core::edge::EdgeKey;
use crate::core::triangulation_data_structure::{
    Tds, TdsValidationError, TriangleId, VertexId, ccw,
};
use crate::geometry::kernel::Kernel;
use crate::geometry::mesh_type::MeshType;
use crate::geometry::point::Point;
use crate::geometry::predicates::{Frame, InCircle, Orientation, triangle_normal};

/// Errors from a single edge flip.
///
/// # Examples
///
/// ```rust
/// use fmesh::core::algorithms::flips::FlipError;
/// use fmesh::core::triangulation_data_structure::TriangleId;
///
/// let err = FlipError::BoundaryEdge { triangle: TriangleId(3), edge: 1 };
/// assert!(err.to_string().contains("boundary"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum FlipError {
    /// The triangle is not live.
    #[error("Triangle {triangle} is not live")]
    DeadTriangle {
        /// Triangle id.
        triangle: TriangleId,
    },
    /// The edge has no neighbor.
    #[error("Edge {edge} of {triangle} is on the boundary (no neighbor)")]
    BoundaryEdge {
        /// Triangle id.
        triangle: TriangleId,
        /// Local edge index.
        edge: usize,
    },
    /// The edge is constrained.
    #[error("Edge {v0}-{v1} is constrained")]
    ConstrainedEdge {
        /// First endpoint.
        v0: VertexId,
        /// Second endpoint.
        v1: VertexId,
    },
    /// The two triangles do not form a strictly convex quadrilateral.
    #[error("Quadrilateral around edge {edge} of {triangle} is not strictly convex")]
    NonConvex {
        /// Triangle id.
        triangle: TriangleId,
        /// Local edge index.
        edge: usize,
    },
    /// The two triangles share more than one edge or are inconsistently oriented.
    #[error("Triangles around edge {edge} of {triangle} do not form a quadrilateral")]
    DegenerateQuad {
        /// Triangle id.
        triangle: TriangleId,
        /// Local edge index.
        edge: usize,
    },
}

/// Statistics from a Delaunay repair pass.
///
/// ```rust
/// use fmesh::core::algorithms::flips::DelaunayRepairStats;
///
/// let stats = DelaunayRepairStats::default();
/// assert_eq!(stats.flips_performed, 0);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DelaunayRepairStats {
    /// Number of queued edges checked.
    pub edges_checked: usize,
    /// Number of flips performed.
    pub flips_performed: usize,
    /// Maximum queue length observed.
    pub max_queue_len: usize,
}

impl DelaunayRepairStats {
    /// Adds the counters of another pass.
    pub fn accumulate(&mut self, other: &Self) {
        self.edges_checked += other.edges_checked;
        self.flips_performed += other.flips_performed;
        self.max_queue_len = self.max_queue_len.max(other.max_queue_len);
    }
}

impl fmt::Display for DelaunayRepairStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "checked {} edges, flips={}, max_queue={}",
            self.edges_checked, self.flips_performed, self.max_queue_len
        )
    }
}

/// Errors that can occur during flip-based Delaunay repair.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum DelaunayRepairError {
    /// Repair did not converge within the flip budget.
    #[error("Delaunay repair failed to converge after {max_flips} flips ({stats})")]
    NonConvergent {
        /// Maximum flips allowed.
        max_flips: usize,
        /// Counters at the point of failure.
        stats: DelaunayRepairStats,
    },
    /// Underlying flip error.
    #[error(transparent)]
    Flip(#[from] FlipError),
}

/// Result of a successful flip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlipInfo {
    /// The two rewritten triangles, `[T', U']`.
    pub triangles: [TriangleId; 2],
    /// The diagonal that was removed.
    pub removed_edge: EdgeKey,
    /// The diagonal that was inserted.
    pub inserted_edge: EdgeKey,
}

/// Flip budget derived from the mesh size.
#[must_use]
pub const fn default_max_flips(triangle_count: usize) -> usize {
    16 * triangle_count + 1024
}

#[inline]
fn repair_trace_enabled() -> bool {
    std::env::var_os("FMESH_REPAIR_TRACE").is_some()
}

// =============================================================================
// QUADRILATERALS
// =============================================================================

/// The quadrilateral around edge `e` of `t`, in the layout of the module docs.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Quad {
    pub(crate) t: TriangleId,
    pub(crate) e: usize,
    pub(crate) u: TriangleId,
    pub(crate) j: usize,
    pub(crate) a: VertexId,
    pub(crate) b: VertexId,
    pub(crate) c: VertexId,
    pub(crate) d: VertexId,
}

impl Quad {
    pub(crate) fn around(tds: &Tds, t: TriangleId, e: usize) -> Result<Self, FlipError> {
        if !tds.is_live(t) {
            return Err(FlipError::DeadTriangle { triangle: t });
        }
        let (u, j) = tds
            .adjacent(t, e)
            .ok_or(FlipError::BoundaryEdge { triangle: t, edge: e })?;
        let tri = tds.triangle(t);
        let (a, b, c) = (tri.vertex(e), tri.vertex(ccw(e, 1)), tri.vertex(ccw(e, 2)));
        let other = tds.triangle(u);
        let d = other.vertex(j);
        let degenerate = FlipError::DegenerateQuad { triangle: t, edge: e };
        if u == t || tri.contains_vertex(d) {
            return Err(degenerate);
        }
        if other.vertex(ccw(j, 1)) != c || other.vertex(ccw(j, 2)) != b {
            return Err(degenerate);
        }
        let outer = [
            tri.neighbor(ccw(e, 1)),
            tri.neighbor(ccw(e, 2)),
            other.neighbor(ccw(j, 1)),
            other.neighbor(ccw(j, 2)),
        ];
        if outer.iter().flatten().any(|&n| n == t || n == u) {
            return Err(degenerate);
        }
        Ok(Self {
            t,
            e,
            u,
            j,
            a,
            b,
            c,
            d,
        })
    }

    pub(crate) fn points<'a>(&self, tds: &'a Tds) -> [&'a Point; 4] {
        [self.a, self.b, self.c, self.d].map(|v| tds.point(v))
    }
}

/// Predicate frame for a pair of adjacent triangles.
pub(crate) fn quad_frame(mesh_type: MeshType, a: &Point, b: &Point, c: &Point, d: &Point) -> Frame {
    match mesh_type {
        MeshType::Plane => Frame::plane(),
        MeshType::Sphere => Frame::sphere(),
        MeshType::GeneralManifold => {
            Frame::manifold(triangle_normal(a, b, c) + triangle_normal(d, c, b))
        }
    }
}

pub(crate) fn is_convex<K: Kernel>(tds: &Tds, kernel: &K, mesh_type: MeshType, q: &Quad) -> bool {
    let [a, b, c, d] = q.points(tds);
    let frame = quad_frame(mesh_type, a, b, c, d);
    kernel.orientation(&frame, a, b, d) == Orientation::POSITIVE
        && kernel.orientation(&frame, d, c, a) == Orientation::POSITIVE
}

fn violates_delaunay<K: Kernel>(tds: &Tds, kernel: &K, mesh_type: MeshType, q: &Quad) -> bool {
    let [a, b, c, d] = q.points(tds);
    let frame = quad_frame(mesh_type, a, b, c, d);
    kernel.in_circle(&frame, a, b, c, d) == InCircle::INSIDE
}

/// Rewrites the two triangles of `q` without any geometric check.
pub(crate) fn apply_flip(tds: &mut Tds, q: &Quad) -> FlipInfo {
    let Quad {
        t,
        e,
        u,
        j,
        a,
        b,
        c,
        d,
    } = *q;
    let n_ca = tds.adjacent(t, ccw(e, 1));
    let n_ab = tds.adjacent(t, ccw(e, 2));
    let n_bd = tds.adjacent(u, ccw(j, 1));
    let n_dc = tds.adjacent(u, ccw(j, 2));

    tds.replace_triangle(t, [a, b, d]);
    tds.replace_triangle(u, [d, c, a]);
    tds.link_optional(t, 0, n_bd);
    tds.link(t, 1, u, 1);
    tds.link_optional(t, 2, n_ab);
    tds.link_optional(u, 0, n_ca);
    tds.link_optional(u, 2, n_dc);

    FlipInfo {
        triangles: [t, u],
        removed_edge: EdgeKey::new(b, c),
        inserted_edge: EdgeKey::new(a, d),
    }
}

// =============================================================================
// SINGLE FLIPS
// =============================================================================

/// Flips edge `e` of `t` if it is unconstrained and its quadrilateral is
/// strictly convex.
///
/// # Errors
///
/// Returns a [`FlipError`] naming the reason the flip is not admissible.
///
/// # Examples
///
/// ```rust
/// use fmesh::core::algorithms::flips::flip_edge;
/// use fmesh::core::edge::EdgeKey;
/// use fmesh::core::triangulation_data_structure::{Tds, TriangleId, VertexId};
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
/// let mut tds = Tds::from_triangles(points, &[[0, 1, 2], [0, 2, 3]], true, true).unwrap();
/// // Edge 1 of t0 is the diagonal 2-0.
/// let info = flip_edge(&mut tds, &RobustKernel::new(), MeshType::Plane, TriangleId(0), 1).unwrap();
/// assert_eq!(info.inserted_edge, EdgeKey::new(VertexId(1), VertexId(3)));
/// assert!(tds.is_valid().is_ok());
/// ```
pub fn flip_edge<K: Kernel>(
    tds: &mut Tds,
    kernel: &K,
    mesh_type: MeshType,
    t: TriangleId,
    e: usize,
) -> Result<FlipInfo, FlipError> {
    let q = Quad::around(tds, t, e)?;
    if tds.is_constrained(q.b, q.c) {
        return Err(FlipError::ConstrainedEdge { v0: q.b, v1: q.c });
    }
    if !is_convex(tds, kernel, mesh_type, &q) {
        return Err(FlipError::NonConvex { triangle: t, edge: e });
    }
    Ok(apply_flip(tds, &q))
}

/// Whether edge `e` of `t` satisfies the local Delaunay condition.
///
/// Boundary, constrained and degenerate edges are locally Delaunay by
/// definition.
#[must_use]
pub fn is_locally_delaunay<K: Kernel>(
    tds: &Tds,
    kernel: &K,
    mesh_type: MeshType,
    t: TriangleId,
    e: usize,
) -> bool {
    if tds.is_constrained_edge(t, e) {
        return true;
    }
    Quad::around(tds, t, e).map_or(true, |q| !violates_delaunay(tds, kernel, mesh_type, &q))
}

// =============================================================================
// REPAIR
// =============================================================================

/// FIFO of edges with one triangle hint each.
///
/// An edge queued twice keeps a single slot with the latest hint; a popped
/// hint that no longer holds the edge means the edge was flipped away.
struct RepairQueue {
    queue: VecDeque<EdgeKey>,
    hints: FastHashMap<EdgeKey, TriangleId>,
}

impl RepairQueue {
    fn new(capacity: usize) -> Self {
        Self {
            queue: VecDeque::with_capacity(capacity),
            hints: fast_hash_map_with_capacity(capacity),
        }
    }

    fn push(&mut self, tds: &Tds, t: TriangleId, e: usize, stats: &mut DelaunayRepairStats) {
        let key = tds.triangle(t).edge_key(e);
        if self.hints.insert(key, t).is_none() {
            self.queue.push_back(key);
            stats.max_queue_len = stats.max_queue_len.max(self.queue.len());
        }
    }

    fn pop(&mut self, tds: &Tds) -> Option<(TriangleId, usize)> {
        loop {
            let key = self.queue.pop_front()?;
            let Some(t) = self.hints.remove(&key) else {
                continue;
            };
            if !tds.is_live(t) {
                continue;
            }
            if let Some(e) = tds.triangle(t).edge_index(key.v0(), key.v1()) {
                return Some((t, e));
            }
        }
    }
}

/// Restores the Delaunay property by flipping from the given seed edges.
///
/// Each popped edge that violates the in-circle test, is unconstrained and
/// has a strictly convex quadrilateral is flipped; the four outer edges of the
/// new pair are queued. Dead seeds are ignored.
///
/// # Errors
///
/// Returns [`DelaunayRepairError::NonConvergent`] when more than `max_flips`
/// flips would be needed (default: [`default_max_flips`]). The mesh is left
/// structurally valid.
pub fn repair_delaunay<K: Kernel>(
    tds: &mut Tds,
    kernel: &K,
    mesh_type: MeshType,
    seeds: impl IntoIterator<Item = (TriangleId, usize)>,
    max_flips: Option<usize>,
) -> Result<DelaunayRepairStats, DelaunayRepairError> {
    let max_flips = max_flips.unwrap_or_else(|| default_max_flips(tds.triangle_count()));
    let mut stats = DelaunayRepairStats::default();
    let mut queue = RepairQueue::new(16);
    for (t, e) in seeds {
        if tds.is_live(t) {
            queue.push(tds, t, e, &mut stats);
        }
    }
    let trace = repair_trace_enabled();
    if trace {
        tracing::debug!(
            "[repair] triangles={} max_flips={} seeds={}",
            tds.triangle_count(),
            max_flips,
            queue.queue.len(),
        );
    }

    while let Some((t, e)) = queue.pop(tds) {
        stats.edges_checked += 1;
        if tds.is_constrained_edge(t, e) {
            continue;
        }
        let q = match Quad::around(tds, t, e) {
            Ok(q) => q,
            Err(err) => {
                if trace && !matches!(err, FlipError::BoundaryEdge { .. }) {
                    tracing::debug!("[repair] skip edge {t}:{e} reason={err}");
                }
                continue;
            }
        };
        if !violates_delaunay(tds, kernel, mesh_type, &q) {
            continue;
        }
        if !is_convex(tds, kernel, mesh_type, &q) {
            if trace {
                tracing::debug!(
                    "[repair] skip non-convex flip {t}:{e} quad=({}, {}, {}, {})",
                    q.a,
                    q.b,
                    q.c,
                    q.d
                );
            }
            continue;
        }
        if stats.flips_performed >= max_flips {
            tracing::debug!("[repair] flip budget exhausted: {stats}");
            return Err(DelaunayRepairError::NonConvergent { max_flips, stats });
        }

        let info = apply_flip(tds, &q);
        stats.flips_performed += 1;
        if trace {
            tracing::debug!(
                "[repair] flip {:?} -> {:?} in {} {}",
                info.removed_edge.endpoints(),
                info.inserted_edge.endpoints(),
                info.triangles[0],
                info.triangles[1],
            );
        }
        for tri in info.triangles {
            queue.push(tds, tri, 0, &mut stats);
            queue.push(tds, tri, 2, &mut stats);
        }
    }

    if trace {
        tracing::debug!("[repair] done: {stats}");
    }
    Ok(stats)
}

/// Runs [`repair_delaunay`] seeded with every edge of the mesh.
///
/// # Errors
///
/// See [`repair_delaunay`].
pub fn repair_delaunay_global<K: Kernel>(
    tds: &mut Tds,
    kernel: &K,
    mesh_type: MeshType,
    max_flips: Option<usize>,
) -> Result<DelaunayRepairStats, DelaunayRepairError> {
    let seeds: Vec<(TriangleId, usize)> = tds
        .triangle_ids()
        .flat_map(|t| (0..3).map(move |e| (t, e)))
        .collect();
    repair_delaunay(tds, kernel, mesh_type, seeds, max_flips)
}

/// Checks the local Delaunay condition on every unconstrained interior edge.
///
/// For a triangulation of a connected region this is equivalent to the
/// empty-circumcircle property with respect to all vertices.
///
/// # Errors
///
/// Returns [`TdsValidationError::DelaunayViolation`] naming a triangle and the
/// neighbor vertex inside its circumcircle.
pub fn verify_delaunay<K: Kernel>(
    tds: &Tds,
    kernel: &K,
    mesh_type: MeshType,
) -> Result<(), TdsValidationError> {
    for t in tds.triangle_ids() {
        for e in 0..3 {
            if tds.is_constrained_edge(t, e) {
                continue;
            }
            let Ok(q) = Quad::around(tds, t, e) else {
                continue;
            };
            if violates_delaunay(tds, kernel, mesh_type, &q) {
                return Err(TdsValidationError::DelaunayViolation {
                    triangle: t,
                    vertex: q.d,
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::triangulation_data_structure::{ConstraintKind, ConstraintTag};
    use crate::geometry::kernel::RobustKernel;

    /// Two triangles over a thin rhombus whose diagonal 0-2 is the long one.
    fn rhombus() -> Tds {
        let points = vec![
            Point::new2(0.0, 0.0),
            Point::new2(2.0, -0.3),
            Point::new2(4.0, 0.0),
            Point::new2(2.0, 0.3),
        ];
        Tds::from_triangles(points, &[[0, 1, 2], [0, 2, 3]], true, true).unwrap()
    }

    fn diagonal(tds: &Tds) -> (TriangleId, usize) {
        let t = TriangleId(0);
        (0..3)
            .find(|&e| tds.adjacent(t, e).is_some())
            .map(|e| (t, e))
            .unwrap()
    }

    // =============================================================================
    // SINGLE FLIP TESTS
    // =============================================================================

    #[test]
    fn test_flip_edge_rewires_neighbors() {
        let mut tds = rhombus();
        let (t, e) = diagonal(&tds);
        let info = flip_edge(&mut tds, &RobustKernel::new(), MeshType::Plane, t, e).unwrap();
        assert_eq!(info.removed_edge, EdgeKey::new(VertexId(0), VertexId(2)));
        assert_eq!(info.inserted_edge, EdgeKey::new(VertexId(1), VertexId(3)));
        assert!(tds.is_valid().is_ok());
        assert!(tds.find_edge(VertexId(1), VertexId(3)).is_some());
        assert!(tds.find_edge(VertexId(0), VertexId(2)).is_none());
        for t in tds.triangle_ids() {
            let [a, b, c] = tds.triangle_points(t);
            assert!(crate::geometry::predicates::orientation_determinant(&Frame::plane(), a, b, c) > 0.0);
        }
    }

    #[test]
    fn test_flip_boundary_and_constrained_edges_rejected() {
        let mut tds = rhombus();
        let kernel = RobustKernel::new();
        let t = TriangleId(0);
        let boundary = (0..3).find(|&e| tds.adjacent(t, e).is_none()).unwrap();
        assert!(matches!(
            flip_edge(&mut tds, &kernel, MeshType::Plane, t, boundary),
            Err(FlipError::BoundaryEdge { .. })
        ));

        tds.set_constraint(ConstraintTag {
            kind: ConstraintKind::Interior,
            group: 0,
            from: VertexId(0),
            to: VertexId(2),
        });
        let (t, e) = diagonal(&tds);
        assert!(matches!(
            flip_edge(&mut tds, &kernel, MeshType::Plane, t, e),
            Err(FlipError::ConstrainedEdge { .. })
        ));
        assert!(is_locally_delaunay(&tds, &kernel, MeshType::Plane, t, e));
    }

    #[test]
    fn test_flip_non_convex_rejected() {
        // Vertex 3 sits inside the triangle 0-1-2's side so the quad is a dart shape.
        let points = vec![
            Point::new2(0.0, 0.0),
            Point::new2(4.0, 0.0),
            Point::new2(2.0, 4.0),
            Point::new2(2.0, 1.0),
        ];
        let mut tds = Tds::from_triangles(points, &[[0, 1, 3], [1, 2, 3]], true, true).unwrap();
        let t = TriangleId(0);
        let e = (0..3).find(|&e| tds.adjacent(t, e).is_some()).unwrap();
        assert!(matches!(
            flip_edge(&mut tds, &RobustKernel::new(), MeshType::Plane, t, e),
            Err(FlipError::NonConvex { .. })
        ));
    }

    // =============================================================================
    // REPAIR TESTS
    // =============================================================================

    #[test]
    fn test_repair_flips_long_diagonal() {
        let mut tds = rhombus();
        let kernel = RobustKernel::new();
        assert!(verify_delaunay(&tds, &kernel, MeshType::Plane).is_err());

        let stats = repair_delaunay_global(&mut tds, &kernel, MeshType::Plane, None).unwrap();
        assert_eq!(stats.flips_performed, 1);
        assert!(stats.edges_checked >= 1);
        assert!(verify_delaunay(&tds, &kernel, MeshType::Plane).is_ok());
        assert!(tds.is_valid().is_ok());
    }

    #[test]
    fn test_repair_respects_budget() {
        let mut tds = rhombus();
        let err = repair_delaunay_global(&mut tds, &RobustKernel::new(), MeshType::Plane, Some(0))
            .unwrap_err();
        assert!(matches!(err, DelaunayRepairError::NonConvergent { max_flips: 0, .. }));
        assert!(tds.is_valid().is_ok());
    }

    #[test]
    fn test_repair_fan_converges_to_delaunay() {
        // A fan from the end of an ellipse's major axis is not Delaunay.
        let n = 12;
        let mut points = Vec::new();
        for i in 0..n {
            let angle = std::f64::consts::TAU * i as f64 / n as f64;
            points.push(Point::new2(2.0 * angle.cos(), angle.sin()));
        }
        let triangles: Vec<[usize; 3]> = (1..n - 1).map(|i| [0, i, i + 1]).collect();
        let mut tds = Tds::from_triangles(points, &triangles, true, true).unwrap();
        let kernel = RobustKernel::new();

        let stats = repair_delaunay_global(&mut tds, &kernel, MeshType::Plane, None).unwrap();
        assert!(stats.flips_performed > 0);
        assert!(verify_delaunay(&tds, &kernel, MeshType::Plane).is_ok());
        assert!(tds.is_valid().is_ok());
        assert_eq!(tds.triangle_count(), n - 2);
    }

    #[test]
    fn test_repair_without_back_edges() {
        let points = vec![
            Point::new2(0.0, 0.0),
            Point::new2(2.0, -0.3),
            Point::new2(4.0, 0.0),
            Point::new2(2.0, 0.3),
        ];
        let mut tds = Tds::from_triangles(points, &[[0, 1, 2], [0, 2, 3]], false, false).unwrap();
        let kernel = RobustKernel::new();
        repair_delaunay_global(&mut tds, &kernel, MeshType::Plane, None).unwrap();
        assert!(verify_delaunay(&tds, &kernel, MeshType::Plane).is_ok());
        assert!(tds.validate_neighbors().is_ok());
    }

    #[test]
    fn test_stats_accumulate() {
        let mut a = DelaunayRepairStats {
            edges_checked: 3,
            flips_performed: 1,
            max_queue_len: 4,
        };
        a.accumulate(&DelaunayRepairStats {
            edges_checked: 2,
            flips_performed: 2,
            max_queue_len: 7,
        });
        assert_eq!(a.edges_checked, 5);
        assert_eq!(a.flips_performed, 3);
        assert_eq!(a.max_queue_len, 7);
    }
}
