//! Removal of triangles outside the boundary polygons.
//!
//! Pruning floods the adjacency graph from triangles known to be exterior
//! and removes everything it reaches. The flood never crosses an edge tagged
//! [`ConstraintKind::Boundary`], so the boundary constraints must form closed
//! polygons: an open chain lets the flood leak into the interior and the
//! result is unspecified.

use std::collections::VecDeque;

use thiserror::Error;

use crate::core::collections::FastHashSet;
use crate::core::edge::EdgeKey;
use crate::core::triangulation_data_structure::{ConstraintKind, Tds, TriangleId, VertexId};

/// Errors while pruning the exterior.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PruneError {
    /// No boundary constraint exists, so every triangle would be removed.
    #[error("No boundary constraints: pruning would remove every triangle")]
    NoBoundaryConstraints,
    /// No triangle is known to be exterior.
    #[error("No exterior seed triangle: no enclosure vertex and no open boundary edge")]
    NoExteriorSeed,
}

/// Summary of a pruning pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneReport {
    /// Triangles removed.
    pub removed: usize,
    /// Triangles remaining.
    pub remaining: usize,
    /// Interior constraints dropped because their edge was removed.
    pub dropped_constraints: usize,
}

/// Removes every triangle reachable from the exterior without crossing a
/// boundary constraint.
///
/// Seeds are the triangles incident to `exterior_vertices` (normally the
/// enclosure ring) together with triangles having an open edge that is not a
/// boundary constraint. Interior constraints whose edge disappears are
/// dropped; vertices keep their ids even when no triangle uses them anymore.
///
/// # Errors
///
/// Returns [`PruneError::NoBoundaryConstraints`] when nothing bounds the
/// flood, and [`PruneError::NoExteriorSeed`] when no seed exists. The mesh
/// is unchanged in both cases.
pub fn prune_exterior(
    tds: &mut Tds,
    exterior_vertices: &[VertexId],
) -> Result<PruneReport, PruneError> {
    if !tds.constraints().any(|c| c.kind == ConstraintKind::Boundary) {
        return Err(PruneError::NoBoundaryConstraints);
    }
    let is_boundary = |tds: &Tds, t: TriangleId, e: usize| {
        let (a, b) = tds.triangle(t).edge(e);
        tds.constraint(a, b)
            .is_some_and(|c| c.kind == ConstraintKind::Boundary)
    };

    let exterior: FastHashSet<VertexId> = exterior_vertices.iter().copied().collect();
    let mut seeds: Vec<TriangleId> = tds
        .triangle_ids()
        .filter(|&t| {
            let tri = tds.triangle(t);
            tri.vertices().iter().any(|v| exterior.contains(v))
                || (0..3).any(|e| tri.neighbor(e).is_none() && !is_boundary(tds, t, e))
        })
        .collect();
    if seeds.is_empty() {
        return Err(PruneError::NoExteriorSeed);
    }
    seeds.sort_unstable();

    let mut reached = vec![false; tds.triangle_capacity()];
    let mut queue: VecDeque<TriangleId> = VecDeque::with_capacity(seeds.len());
    for t in seeds {
        reached[t.0] = true;
        queue.push_back(t);
    }
    let mut doomed = Vec::new();
    while let Some(t) = queue.pop_front() {
        doomed.push(t);
        for e in 0..3 {
            if is_boundary(tds, t, e) {
                continue;
            }
            let Some((n, _)) = tds.adjacent(t, e) else {
                continue;
            };
            if !reached[n.0] {
                reached[n.0] = true;
                queue.push_back(n);
            }
        }
    }

    for &t in &doomed {
        tds.kill_triangle(t);
    }
    tds.rebuild_vertex_triangles();

    let present: FastHashSet<EdgeKey> = tds
        .triangle_ids()
        .flat_map(|t| (0..3).map(move |e| (t, e)))
        .map(|(t, e)| tds.triangle(t).edge_key(e))
        .collect();
    let stale: Vec<EdgeKey> = tds
        .constraints()
        .map(|c| c.key())
        .filter(|k| !present.contains(k))
        .collect();
    for key in &stale {
        tds.remove_constraint(key.v0(), key.v1());
    }

    let report = PruneReport {
        removed: doomed.len(),
        remaining: tds.triangle_count(),
        dropped_constraints: stale.len(),
    };
    if report.remaining == 0 {
        tracing::warn!("[prune] removed every triangle; boundary polygons are probably not closed");
    }
    tracing::debug!(
        removed = report.removed,
        remaining = report.remaining,
        dropped_constraints = report.dropped_constraints,
        "[prune] removed exterior triangles"
    );
    Ok(report)
}
