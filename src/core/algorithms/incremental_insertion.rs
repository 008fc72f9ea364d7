//! Incremental Delaunay insertion by local splitting and flip repair.
//!
//! Inserting a point:
//! 1. Locate the triangle containing the point (walk from a hint dart)
//! 2. Split it 1→3, or split the edge the point lies on 2→4 (1→2 on a
//!    boundary edge; a constrained edge becomes two constrained sub-edges)
//! 3. Queue the edges opposite the new vertex
//! 4. Restore the Delaunay property with [`repair_delaunay`]
//!
//! The new vertex is only appended once the location has been accepted, so a
//! rejected point leaves the mesh untouched.

use crate::core::algorithms::flips::{DelaunayRepairError, DelaunayRepairStats, repair_delaunay};
use crate::core::collections::TriangleCandidateBuffer;
use crate::core::dart::Dart;
use crate::core::locate::{LocateError, LocateResult, locate};
use crate::core::triangulation_data_structure::{Tds, TriangleId, VertexId, ccw};
use crate::geometry::kernel::Kernel;
use crate::geometry::mesh_type::MeshType;
use crate::geometry::point::Point;

/// Error during incremental insertion.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InsertionError {
    /// The point coincides with an existing vertex.
    #[error("Point duplicates existing vertex {existing}")]
    DuplicatePoint {
        /// The coinciding vertex.
        existing: VertexId,
    },

    /// The point is outside the triangulated region.
    #[error("Point is outside the triangulated region")]
    PointNotLocatable,

    /// The point has a non-finite coordinate.
    #[error("Point has a non-finite coordinate")]
    NonFinitePoint,

    /// Point location failed
    #[error("Location error: {0}")]
    Location(#[from] LocateError),

    /// Flip repair did not converge; the vertex is inserted and the mesh is
    /// structurally valid but may not be Delaunay.
    #[error("Repair error: {0}")]
    Repair(#[from] DelaunayRepairError),
}

/// How a point entered the mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertionKind {
    /// Strictly inside a triangle (1→3 split).
    Interior,
    /// On an interior edge (2→4 split).
    Edge {
        /// Whether the split edge was constrained.
        constrained: bool,
    },
    /// On a boundary edge (1→2 split).
    BoundaryEdge {
        /// Whether the split edge was constrained.
        constrained: bool,
    },
}

/// Result of a successful insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertionOutcome {
    /// The new vertex.
    pub vertex: VertexId,
    /// How the point was inserted.
    pub kind: InsertionKind,
    /// Flip repair counters.
    pub repair: DelaunayRepairStats,
    /// A counter-clockwise dart leaving the new vertex, usable as the next hint.
    pub hint: Dart,
}

/// Tunables for insertion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InsertOptions {
    /// Absolute distance under which a point duplicates a nearby vertex.
    pub duplicate_distance: f64,
    /// Flip budget for the repair pass.
    pub max_flips: Option<usize>,
}

impl Default for InsertOptions {
    fn default() -> Self {
        Self {
            duplicate_distance: 0.0,
            max_flips: None,
        }
    }
}

// =============================================================================
// TOPOLOGICAL SPLITS
// =============================================================================

/// Splits triangle `t = [a, b, c]` into `[p, b, c]` (reusing `t`), `[a, p, c]`
/// and `[a, b, p]`.
pub(crate) fn split_triangle(tds: &mut Tds, t: TriangleId, p: VertexId) -> [TriangleId; 3] {
    let [a, b, c] = tds.triangle(t).vertices();
    let outer = [tds.adjacent(t, 0), tds.adjacent(t, 1), tds.adjacent(t, 2)];

    tds.replace_triangle(t, [p, b, c]);
    let t1 = tds.append_triangle([a, p, c]);
    let t2 = tds.append_triangle([a, b, p]);

    tds.link_optional(t, 0, outer[0]);
    tds.link_optional(t1, 1, outer[1]);
    tds.link_optional(t2, 2, outer[2]);
    tds.link(t, 1, t1, 0);
    tds.link(t, 2, t2, 0);
    tds.link(t1, 2, t2, 1);
    [t, t1, t2]
}

/// Splits edge `e = bc` of `t = [a, b, c]` at `p`.
///
/// With a neighbor `u = [d, c, b]` the result is `[a, b, p]` (reusing `t`),
/// `[a, p, c]`, `[d, p, b]` (reusing `u`) and `[d, c, p]`; on a boundary edge
/// only the first two. A constraint on `bc` is split into `bp` and `pc`.
///
/// # Panics
///
/// Panics if the neighbor across `e` is inconsistently oriented.
pub(crate) fn split_edge(
    tds: &mut Tds,
    t: TriangleId,
    e: usize,
    p: VertexId,
) -> TriangleCandidateBuffer {
    let tri = tds.triangle(t);
    let (a, b, c) = (tri.vertex(e), tri.vertex(ccw(e, 1)), tri.vertex(ccw(e, 2)));
    let n_ca = tds.adjacent(t, ccw(e, 1));
    let n_ab = tds.adjacent(t, ccw(e, 2));
    let across = tds.adjacent(t, e).map(|(u, j)| {
        let other = tds.triangle(u);
        assert!(
            other.vertex(ccw(j, 1)) == c && other.vertex(ccw(j, 2)) == b,
            "{u} is not oriented consistently with {t}"
        );
        (
            u,
            other.vertex(j),
            tds.adjacent(u, ccw(j, 1)),
            tds.adjacent(u, ccw(j, 2)),
        )
    });

    if tds.is_constrained(b, c) {
        tds.split_constraint(b, c, p);
    }

    let mut created = TriangleCandidateBuffer::new();
    tds.replace_triangle(t, [a, b, p]);
    let t2 = tds.append_triangle([a, p, c]);
    tds.link_optional(t, 2, n_ab);
    tds.link_optional(t2, 1, n_ca);
    tds.link(t, 1, t2, 2);
    created.push(t);
    created.push(t2);

    match across {
        Some((u, d, n_bd, n_dc)) => {
            tds.replace_triangle(u, [d, p, b]);
            let u2 = tds.append_triangle([d, c, p]);
            tds.link_optional(u, 1, n_bd);
            tds.link_optional(u2, 2, n_dc);
            tds.link(u, 2, u2, 1);
            tds.link(t, 0, u, 0);
            tds.link(t2, 0, u2, 0);
            created.push(u);
            created.push(u2);
        }
        None => {
            tds.set_neighbor(t, 0, None, None);
            tds.set_neighbor(t2, 0, None, None);
        }
    }
    created
}

// =============================================================================
// INSERTION
// =============================================================================

/// Inserts a point, walking from `hint` to locate it.
///
/// # Errors
///
/// - [`InsertionError::DuplicatePoint`] when the point coincides with a vertex
///   or lies within `options.duplicate_distance` of a corner of its triangle.
/// - [`InsertionError::PointNotLocatable`] when the point is outside the mesh.
/// - [`InsertionError::Location`] when the walk fails.
/// - [`InsertionError::Repair`] when flip repair does not converge.
///
/// Only the last leaves the vertex inserted.
///
/// # Examples
///
/// ```rust
/// use fmesh::core::algorithms::incremental_insertion::{InsertOptions, insert_point};
/// use fmesh::core::triangulation_data_structure::Tds;
/// use fmesh::geometry::kernel::RobustKernel;
/// use fmesh::geometry::mesh_type::MeshType;
/// use fmesh::geometry::point::Point;
///
/// let points = vec![
///     Point::new2(-10.0, -10.0),
///     Point::new2(10.0, -10.0),
///     Point::new2(0.0, 10.0),
/// ];
/// let mut tds = Tds::from_triangles(points, &[[0, 1, 2]], true, true).unwrap();
/// let kernel = RobustKernel::new();
/// let outcome = insert_point(
///     &mut tds,
///     &kernel,
///     MeshType::Plane,
///     Point::new2(0.0, 0.0),
///     None,
///     InsertOptions::default(),
/// )
/// .unwrap();
/// assert_eq!(outcome.vertex.0, 3);
/// assert_eq!(tds.triangle_count(), 3);
/// ```
pub fn insert_point<K: Kernel>(
    tds: &mut Tds,
    kernel: &K,
    mesh_type: MeshType,
    point: Point,
    hint: Option<Dart>,
    options: InsertOptions,
) -> Result<InsertionOutcome, InsertionError> {
    if !point.is_finite() {
        return Err(InsertionError::NonFinitePoint);
    }
    let located = locate(tds, kernel, mesh_type, &point, hint)?;
    insert_located(tds, kernel, mesh_type, point, located, options)
}

/// Inserts a point whose location is already known.
///
/// # Errors
///
/// See [`insert_point`].
pub fn insert_located<K: Kernel>(
    tds: &mut Tds,
    kernel: &K,
    mesh_type: MeshType,
    point: Point,
    located: LocateResult,
    options: InsertOptions,
) -> Result<InsertionOutcome, InsertionError> {
    link_located(tds, kernel, mesh_type, Stored::New(point), located, options)
}

/// Links vertex `v`, already stored but used by no triangle, into the mesh at
/// its location. Lets callers fix vertex ids before triangulating.
///
/// # Errors
///
/// See [`insert_point`]. On a duplicate `v` stays unused.
///
/// # Panics
///
/// Panics if `v` is out of range.
pub fn insert_stored_vertex<K: Kernel>(
    tds: &mut Tds,
    kernel: &K,
    mesh_type: MeshType,
    v: VertexId,
    located: LocateResult,
    options: InsertOptions,
) -> Result<InsertionOutcome, InsertionError> {
    link_located(tds, kernel, mesh_type, Stored::Existing(v), located, options)
}

#[derive(Clone, Copy)]
enum Stored {
    New(Point),
    Existing(VertexId),
}

fn link_located<K: Kernel>(
    tds: &mut Tds,
    kernel: &K,
    mesh_type: MeshType,
    stored: Stored,
    located: LocateResult,
    options: InsertOptions,
) -> Result<InsertionOutcome, InsertionError> {
    let point = match stored {
        Stored::New(point) => point,
        Stored::Existing(v) => *tds.point(v),
    };
    let dart = match located {
        LocateResult::Outside(_) => return Err(InsertionError::PointNotLocatable),
        LocateResult::OnVertex { vertex, .. } => {
            return Err(InsertionError::DuplicatePoint { existing: vertex });
        }
        LocateResult::Inside(d) | LocateResult::OnEdge(d) => d,
    };
    let t = dart.triangle_id();
    if let Some(existing) = tds
        .triangle(t)
        .vertices()
        .into_iter()
        .find(|&v| tds.point(v).distance(&point) <= options.duplicate_distance)
    {
        return Err(InsertionError::DuplicatePoint { existing });
    }

    let p = match stored {
        Stored::New(point) => tds.append_vertex(point),
        Stored::Existing(v) => v,
    };
    let (kind, created) = if let LocateResult::OnEdge(d) = located {
        split_edge_kind(tds, t, d.edge(), p)
    } else {
        (
            InsertionKind::Interior,
            split_triangle(tds, t, p).into_iter().collect(),
        )
    };
    tracing::trace!("[insert] {p} as {kind:?} into {t}");
    finish(tds, kernel, mesh_type, p, kind, &created, options)
}

/// Inserts `point` by splitting edge `e` of `t`, regardless of where the
/// point lies relative to the edge.
///
/// Used for segment midpoints, which on a sphere lie above the chord.
///
/// # Errors
///
/// Returns [`InsertionError::Repair`] when flip repair does not converge.
pub fn insert_on_edge<K: Kernel>(
    tds: &mut Tds,
    kernel: &K,
    mesh_type: MeshType,
    point: Point,
    t: TriangleId,
    e: usize,
    options: InsertOptions,
) -> Result<InsertionOutcome, InsertionError> {
    if !point.is_finite() {
        return Err(InsertionError::NonFinitePoint);
    }
    let p = tds.append_vertex(point);
    let (kind, created) = split_edge_kind(tds, t, e, p);
    tracing::trace!("[insert] {p} as {kind:?} on {t}:{e}");
    finish(tds, kernel, mesh_type, p, kind, &created, options)
}

fn split_edge_kind(
    tds: &mut Tds,
    t: TriangleId,
    e: usize,
    p: VertexId,
) -> (InsertionKind, TriangleCandidateBuffer) {
    let constrained = tds.is_constrained_edge(t, e);
    let kind = if tds.triangle(t).neighbor(e).is_some() {
        InsertionKind::Edge { constrained }
    } else {
        InsertionKind::BoundaryEdge { constrained }
    };
    (kind, split_edge(tds, t, e, p))
}

fn finish<K: Kernel>(
    tds: &mut Tds,
    kernel: &K,
    mesh_type: MeshType,
    p: VertexId,
    kind: InsertionKind,
    created: &[TriangleId],
    options: InsertOptions,
) -> Result<InsertionOutcome, InsertionError> {
    let seeds: Vec<(TriangleId, usize)> = created
        .iter()
        .filter_map(|&t| tds.triangle(t).index_of(p).map(|i| (t, i)))
        .collect();
    let repair = repair_delaunay(tds, kernel, mesh_type, seeds, options.max_flips)?;

    // Flips around p keep p in every triangle they rewrite.
    let star = tds
        .vertex_triangle(p)
        .filter(|&t| tds.is_live(t))
        .or_else(|| created.first().copied());
    let hint = star
        .and_then(|t| Dart::leaving(tds, t, p))
        .unwrap_or_else(|| Dart::of_triangle(created[0]));

    Ok(InsertionOutcome {
        vertex: p,
        kind,
        repair,
        hint,
    })
}
