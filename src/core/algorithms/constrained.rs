//! Constrained edge insertion.
//!
//! A segment `(from, to)` between two mesh vertices is made an edge of the
//! triangulation in three steps:
//!
//! 1. **Trace**: walk from `from` towards `to` through the triangles the
//!    segment crosses, collecting the crossed edges. A vertex lying on the
//!    segment ends the current piece, so the segment is snapped into
//!    sub-segments through every such vertex. Crossing a constrained edge is
//!    an error and nothing is modified.
//! 2. **Recover**: flip crossed edges whose quadrilateral is convex; a new
//!    diagonal that still crosses the piece is queued again. In exact
//!    arithmetic this terminates with the piece present (Sloan, 1993).
//! 3. **Restore**: tag the piece and run flip repair seeded with the new
//!    diagonals. The tag keeps the piece from being flipped away.
//!
//! # References
//! - S. W. Sloan, "A fast algorithm for generating constrained Delaunay
//!   triangulations", Computers & Structures, 1993.

use std::collections::VecDeque;

use thiserror::Error;

use crate::core::algorithms::flips::{
    DelaunayRepairError, DelaunayRepairStats, Quad, apply_flip, is_convex, repair_delaunay,
};
use crate::core::edge::EdgeKey;
use crate::core::locate::triangle_frame;
use crate::core::triangulation_data_structure::{
    ConstraintKind, ConstraintTag, Tds, TriangleId, VertexId, ccw,
};
use crate::geometry::kernel::Kernel;
use crate::geometry::mesh_type::MeshType;
use crate::geometry::point::Point;
use crate::geometry::predicates::Orientation;

/// A constraint segment between two vertices with an opaque group id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Segment {
    /// First endpoint.
    pub from: VertexId,
    /// Second endpoint.
    pub to: VertexId,
    /// Group id passed through to segment export.
    pub group: i32,
}

impl Segment {
    /// Creates a segment.
    #[must_use]
    pub const fn new(from: VertexId, to: VertexId, group: i32) -> Self {
        Self { from, to, group }
    }

    /// Builds segments from index pairs and a parallel group array.
    ///
    /// Missing group entries default to `0`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use fmesh::core::algorithms::constrained::Segment;
    ///
    /// let segments = Segment::from_arrays(&[[0, 1], [1, 2]], &[5]);
    /// assert_eq!(segments[0].group, 5);
    /// assert_eq!(segments[1].group, 0);
    /// ```
    #[must_use]
    pub fn from_arrays(pairs: &[[usize; 2]], groups: &[i32]) -> Vec<Self> {
        pairs
            .iter()
            .enumerate()
            .map(|(i, &[a, b])| {
                Self::new(VertexId(a), VertexId(b), groups.get(i).copied().unwrap_or(0))
            })
            .collect()
    }

    /// Tag for this segment with the given kind.
    #[must_use]
    pub const fn tag(&self, kind: ConstraintKind) -> ConstraintTag {
        ConstraintTag {
            kind,
            group: self.group,
            from: self.from,
            to: self.to,
        }
    }
}

impl From<(usize, usize, i32)> for Segment {
    fn from((a, b, group): (usize, usize, i32)) -> Self {
        Self::new(VertexId(a), VertexId(b), group)
    }
}

/// Errors while inserting a constraint segment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ConstraintError {
    /// Both endpoints are the same vertex.
    #[error("Degenerate constraint: both endpoints are {vertex}")]
    DegenerateConstraint {
        /// The repeated endpoint.
        vertex: VertexId,
    },
    /// The segment crosses an existing constrained edge.
    ///
    /// Raised whatever the two group ids are, equal groups included: no
    /// vertex is ever created at a crossing point. Segments that merely
    /// share an endpoint or run through a vertex are not crossings.
    #[error("Constraint {from}-{to} crosses constrained edge {:?}", existing.endpoints())]
    CrossesConstraint {
        /// First endpoint.
        from: VertexId,
        /// Second endpoint.
        to: VertexId,
        /// The crossed constrained edge.
        existing: EdgeKey,
    },
    /// An endpoint id is out of range.
    #[error("Constraint vertex {vertex} out of range ({vertex_count} vertices)")]
    VertexOutOfRange {
        /// The offending id.
        vertex: VertexId,
        /// Number of vertices.
        vertex_count: usize,
    },
    /// An endpoint is not a corner of any live triangle.
    #[error("Constraint vertex {vertex} is not part of the triangulation")]
    VertexNotInMesh {
        /// The offending id.
        vertex: VertexId,
    },
    /// The segment leaves the triangulated region.
    #[error("Constraint {from}-{to} leaves the triangulated region")]
    OutsideMesh {
        /// First endpoint.
        from: VertexId,
        /// Second endpoint.
        to: VertexId,
    },
    /// Edge recovery did not terminate (numerical degeneracy).
    #[error("Recovering constraint {from}-{to} did not converge")]
    NonConvergent {
        /// First endpoint.
        from: VertexId,
        /// Second endpoint.
        to: VertexId,
    },
    /// Flip repair after recovery failed.
    #[error("Repair error: {0}")]
    Repair(#[from] DelaunayRepairError),
}

/// Result of inserting one segment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SegmentOutcome {
    /// Number of sub-segments the segment was snapped into.
    pub pieces: usize,
    /// Whether every piece was already an edge.
    pub already_present: bool,
    /// Flips performed to recover the segment.
    pub recovery_flips: usize,
    /// Flip repair counters.
    pub repair: DelaunayRepairStats,
}

/// Summary of a batch of segment insertions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstraintReport {
    /// Segments inserted, including those already present.
    pub inserted: usize,
    /// Segments whose pieces were all existing edges.
    pub already_present: usize,
    /// Extra pieces created by vertices lying on segments.
    pub snapped: usize,
    /// Flips performed to recover segments.
    pub recovery_flips: usize,
    /// Accumulated repair counters.
    pub repair: DelaunayRepairStats,
    /// Rejected segments by input index; they were skipped.
    pub errors: Vec<(usize, ConstraintError)>,
}

/// One straight piece of a segment between two vertices on it.
#[derive(Debug, Clone)]
struct Piece {
    from: VertexId,
    to: VertexId,
    crossed: Vec<EdgeKey>,
}

fn is_ahead(origin: &Point, q: &Point, target: &Point) -> bool {
    (*q - *origin).dot(&(*target - *origin)) > 0.0
}

// =============================================================================
// TRACING
// =============================================================================

fn trace_segment<K: Kernel>(
    tds: &Tds,
    kernel: &K,
    mesh_type: MeshType,
    from: VertexId,
    to: VertexId,
) -> Result<Vec<Piece>, ConstraintError> {
    let mut pieces = Vec::new();
    let mut current = from;
    let max_steps = tds.triangle_count() + tds.vertex_count() + 1;
    let mut steps = 0;
    while current != to {
        let piece = trace_piece(tds, kernel, mesh_type, current, to, &mut steps, max_steps)
            .map_err(|err| match err {
                ConstraintError::OutsideMesh { .. } => ConstraintError::OutsideMesh { from, to },
                ConstraintError::NonConvergent { .. } => ConstraintError::NonConvergent { from, to },
                other => other,
            })?;
        if let Some(&existing) = piece.crossed.iter().find(|k| tds.is_constrained(k.v0(), k.v1())) {
            return Err(ConstraintError::CrossesConstraint { from, to, existing });
        }
        current = piece.to;
        pieces.push(piece);
    }
    Ok(pieces)
}

/// Traces from `current` until `to` or the first vertex on the segment.
fn trace_piece<K: Kernel>(
    tds: &Tds,
    kernel: &K,
    mesh_type: MeshType,
    current: VertexId,
    to: VertexId,
    steps: &mut usize,
    max_steps: usize,
) -> Result<Piece, ConstraintError> {
    let direct = |end| Piece {
        from: current,
        to: end,
        crossed: Vec::new(),
    };
    if tds.find_edge(current, to).is_some() {
        return Ok(direct(to));
    }
    let star = tds.vertex_star(current);
    if star.is_empty() {
        return Err(ConstraintError::VertexNotInMesh { vertex: current });
    }

    let (pc, pe) = (tds.point(current), tds.point(to));
    for &t in &star {
        let tri = tds.triangle(t);
        let Some(i) = tri.index_of(current) else {
            continue;
        };
        let (b, c) = (tri.vertex(ccw(i, 1)), tri.vertex(ccw(i, 2)));
        let (pb, pcc) = (tds.point(b), tds.point(c));
        let frame = triangle_frame(tds, mesh_type, t);
        let ob = kernel.orientation(&frame, pc, pb, pe);
        let oc = kernel.orientation(&frame, pc, pcc, pe);
        if ob == Orientation::DEGENERATE && is_ahead(pc, pb, pe) {
            return Ok(direct(b));
        }
        if oc == Orientation::DEGENERATE && is_ahead(pc, pcc, pe) {
            return Ok(direct(c));
        }
        if ob == Orientation::POSITIVE && oc == Orientation::NEGATIVE {
            return walk_crossing(tds, kernel, mesh_type, current, to, (t, i), (b, c), steps, max_steps);
        }
    }
    Err(ConstraintError::OutsideMesh { from: current, to })
}

/// Walks through the triangles crossed by `current → to`, starting with edge
/// `start` whose endpoints are `(right, left)` of the directed segment.
#[allow(clippy::too_many_arguments)]
fn walk_crossing<K: Kernel>(
    tds: &Tds,
    kernel: &K,
    mesh_type: MeshType,
    current: VertexId,
    to: VertexId,
    start: (TriangleId, usize),
    (mut right, mut left): (VertexId, VertexId),
    steps: &mut usize,
    max_steps: usize,
) -> Result<Piece, ConstraintError> {
    let (pc, pe) = (tds.point(current), tds.point(to));
    let mut crossed = vec![EdgeKey::new(right, left)];
    let (mut t, mut e) = start;
    loop {
        *steps += 1;
        if *steps > max_steps {
            return Err(ConstraintError::NonConvergent { from: current, to });
        }
        let (u, j) = tds
            .adjacent(t, e)
            .ok_or(ConstraintError::OutsideMesh { from: current, to })?;
        let w = tds.triangle(u).vertex(j);
        if w == to {
            return Ok(Piece {
                from: current,
                to,
                crossed,
            });
        }
        let frame = triangle_frame(tds, mesh_type, u);
        match kernel.orientation(&frame, pc, pe, tds.point(w)) {
            Orientation::DEGENERATE => {
                return Ok(Piece {
                    from: current,
                    to: w,
                    crossed,
                });
            }
            Orientation::POSITIVE => left = w,
            Orientation::NEGATIVE => right = w,
        }
        let Some(next) = tds.triangle(u).edge_index(right, left) else {
            return Err(ConstraintError::NonConvergent { from: current, to });
        };
        crossed.push(EdgeKey::new(right, left));
        t = u;
        e = next;
    }
}

// =============================================================================
// RECOVERY
// =============================================================================

fn crosses_piece<K: Kernel>(
    tds: &Tds,
    kernel: &K,
    mesh_type: MeshType,
    hint: TriangleId,
    piece: (VertexId, VertexId),
    edge: EdgeKey,
) -> bool {
    let frame = triangle_frame(tds, mesh_type, hint);
    let (s, t) = (tds.point(piece.0), tds.point(piece.1));
    let o1 = kernel.orientation(&frame, s, t, tds.point(edge.v0()));
    let o2 = kernel.orientation(&frame, s, t, tds.point(edge.v1()));
    matches!(
        (o1, o2),
        (Orientation::POSITIVE, Orientation::NEGATIVE) | (Orientation::NEGATIVE, Orientation::POSITIVE)
    )
}

fn recover_piece<K: Kernel>(
    tds: &mut Tds,
    kernel: &K,
    mesh_type: MeshType,
    piece: Piece,
    tag: ConstraintTag,
    max_flips: Option<usize>,
    outcome: &mut SegmentOutcome,
) -> Result<(), ConstraintError> {
    let Piece { from, to, crossed } = piece;
    let sub = tag.with_endpoints(from, to);
    if crossed.is_empty() {
        tds.set_constraint(sub);
        return Ok(());
    }

    let n = crossed.len();
    let limit = 16 * n * n + 64;
    let mut queue: VecDeque<EdgeKey> = crossed.into();
    let mut new_edges = Vec::new();
    let mut iterations = 0;
    while let Some(key) = queue.pop_front() {
        iterations += 1;
        if iterations > limit {
            return Err(ConstraintError::NonConvergent { from, to });
        }
        let Some((t, e)) = tds.find_edge(key.v0(), key.v1()) else {
            continue;
        };
        let Ok(q) = Quad::around(tds, t, e) else {
            return Err(ConstraintError::NonConvergent { from, to });
        };
        if !is_convex(tds, kernel, mesh_type, &q) {
            queue.push_back(key);
            continue;
        }
        let info = apply_flip(tds, &q);
        outcome.recovery_flips += 1;
        if crosses_piece(tds, kernel, mesh_type, info.triangles[0], (from, to), info.inserted_edge) {
            queue.push_back(info.inserted_edge);
        } else {
            new_edges.push(info.inserted_edge);
        }
    }
    if tds.find_edge(from, to).is_none() {
        return Err(ConstraintError::NonConvergent { from, to });
    }
    tds.set_constraint(sub);

    let seeds: Vec<(TriangleId, usize)> = new_edges
        .iter()
        .filter_map(|k| tds.find_edge(k.v0(), k.v1()))
        .collect();
    let stats = repair_delaunay(tds, kernel, mesh_type, seeds, max_flips)?;
    outcome.repair.accumulate(&stats);
    Ok(())
}

// =============================================================================
// PUBLIC API
// =============================================================================

/// Inserts one constraint segment, tagging every piece it snaps into.
///
/// # Errors
///
/// Returns a [`ConstraintError`]; for every error except
/// [`ConstraintError::NonConvergent`] and [`ConstraintError::Repair`] the mesh
/// is unmodified.
///
/// # Examples
///
/// ```rust
/// use fmesh::core::algorithms::constrained::{Segment, insert_segment};
/// use fmesh::core::triangulation_data_structure::{ConstraintKind, Tds, VertexId};
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
/// let segment = Segment::new(VertexId(1), VertexId(3), 4);
/// let outcome = insert_segment(
///     &mut tds,
///     &RobustKernel::new(),
///     MeshType::Plane,
///     segment,
///     ConstraintKind::Interior,
///     None,
/// )
/// .unwrap();
/// assert_eq!(outcome.recovery_flips, 1);
/// assert!(tds.is_constrained(VertexId(1), VertexId(3)));
/// ```
pub fn insert_segment<K: Kernel>(
    tds: &mut Tds,
    kernel: &K,
    mesh_type: MeshType,
    segment: Segment,
    kind: ConstraintKind,
    max_flips: Option<usize>,
) -> Result<SegmentOutcome, ConstraintError> {
    let Segment { from, to, .. } = segment;
    let vertex_count = tds.vertex_count();
    for vertex in [from, to] {
        if vertex.0 >= vertex_count {
            return Err(ConstraintError::VertexOutOfRange {
                vertex,
                vertex_count,
            });
        }
    }
    if from == to {
        return Err(ConstraintError::DegenerateConstraint { vertex: from });
    }

    let pieces = trace_segment(tds, kernel, mesh_type, from, to)?;
    let mut outcome = SegmentOutcome {
        pieces: pieces.len(),
        already_present: pieces.iter().all(|p| p.crossed.is_empty()),
        ..SegmentOutcome::default()
    };
    let tag = segment.tag(kind);
    for piece in pieces {
        recover_piece(tds, kernel, mesh_type, piece, tag, max_flips, &mut outcome)?;
    }
    tracing::trace!(
        "[cdt] {from}-{to} group={} pieces={} flips={}",
        segment.group,
        outcome.pieces,
        outcome.recovery_flips
    );
    Ok(outcome)
}

/// Inserts a batch of segments, skipping and reporting the rejected ones.
pub fn insert_segments<K: Kernel>(
    tds: &mut Tds,
    kernel: &K,
    mesh_type: MeshType,
    segments: &[Segment],
    kind: ConstraintKind,
    max_flips: Option<usize>,
) -> ConstraintReport {
    let mut report = ConstraintReport::default();
    for (i, &segment) in segments.iter().enumerate() {
        match insert_segment(tds, kernel, mesh_type, segment, kind, max_flips) {
            Ok(outcome) => {
                report.inserted += 1;
                report.already_present += usize::from(outcome.already_present);
                report.snapped += outcome.pieces.saturating_sub(1);
                report.recovery_flips += outcome.recovery_flips;
                report.repair.accumulate(&outcome.repair);
            }
            Err(err) => {
                tracing::warn!("[cdt] skipping segment {i} ({}-{}): {err}", segment.from, segment.to);
                report.errors.push((i, err));
            }
        }
    }
    tracing::debug!(
        kind = %kind,
        inserted = report.inserted,
        already_present = report.already_present,
        snapped = report.snapped,
        flips = report.recovery_flips,
        rejected = report.errors.len(),
        "[cdt] inserted constraint segments"
    );
    report
}
