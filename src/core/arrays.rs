//! Plain-array import and export.
//!
//! A mesh leaves the crate as index arrays, the form expected by
//! finite-element assembly code:
//!
//! - `vertices`: one `[x, y, z]` per vertex, in vertex id order
//! - `triangles`: three vertex indices per live triangle, counter-clockwise
//! - `neighbors`: entry `e` of triangle `t` is the triangle across the edge
//!   opposite vertex `e`, or `None` on the boundary
//! - optionally the back-edge of every neighbor link and one incident
//!   triangle per vertex
//!
//! Triangle indices are compacted (pruned triangles removed); vertex indices
//! are the mesh's vertex ids, so vertices no triangle uses are kept.
//! Constrained edges travel separately as [`SegmentArrays`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::algorithms::constrained::Segment;
use crate::core::triangulation_data_structure::{
    ConstraintKind, Tds, TdsImportError, TdsValidationError, TriangleId, VertexId,
};
use crate::geometry::point::Point;

/// Errors while importing mesh arrays.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ArraysError {
    /// The neighbor array does not have one entry per triangle.
    #[error("Neighbor array has {neighbors} rows for {triangles} triangles")]
    LengthMismatch {
        /// Rows in the neighbor array.
        neighbors: usize,
        /// Rows in the triangle array.
        triangles: usize,
    },
    /// A vertex coordinate is not finite.
    #[error("Vertex {index} has a non-finite coordinate")]
    NonFiniteVertex {
        /// Offending vertex index.
        index: usize,
    },
    /// A neighbor index is out of range.
    #[error("Triangle {triangle} links to out-of-range neighbor {neighbor}")]
    NeighborOutOfRange {
        /// Offending triangle.
        triangle: usize,
        /// The neighbor index.
        neighbor: usize,
    },
    /// A neighbor does not share the linked edge.
    #[error("Triangle {triangle} edge {edge} is not shared with its listed neighbor")]
    NeighborMismatch {
        /// Offending triangle.
        triangle: usize,
        /// Local edge.
        edge: usize,
    },
    /// The incidence array does not have one entry per vertex.
    #[error("Incidence array has {entries} entries for {vertices} vertices")]
    IncidenceLengthMismatch {
        /// Entries in the incidence array.
        entries: usize,
        /// Rows in the vertex array.
        vertices: usize,
    },
    /// An incidence entry names an out-of-range triangle.
    #[error("Vertex {vertex} lists out-of-range triangle {triangle}")]
    IncidenceOutOfRange {
        /// Offending vertex.
        vertex: usize,
        /// The triangle index.
        triangle: usize,
    },
    /// Triangle list rejected.
    #[error("Triangle import failed: {0}")]
    Import(#[from] TdsImportError),
    /// Neighbor links are inconsistent.
    #[error("Neighbor links are inconsistent: {0}")]
    Validation(#[from] TdsValidationError),
}

/// Index-array form of a mesh.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshArrays {
    /// Vertex coordinates.
    pub vertices: Vec<[f64; 3]>,
    /// Vertex indices per triangle.
    pub triangles: Vec<[usize; 3]>,
    /// Neighbor triangle per local edge.
    pub neighbors: Vec<[Option<usize>; 3]>,
    /// Local edge index of each link in the neighbor, if tracked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub neighbor_edges: Option<Vec<[Option<u8>; 3]>>,
    /// One incident triangle per vertex, if tracked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertex_triangle: Option<Vec<Option<usize>>>,
}

impl MeshArrays {
    /// Exports the live part of `tds`.
    #[must_use]
    pub fn from_tds(tds: &Tds) -> Self {
        let live: Vec<TriangleId> = tds.triangle_ids().collect();
        let mut compact = vec![None; tds.triangle_capacity()];
        for (i, t) in live.iter().enumerate() {
            compact[t.0] = Some(i);
        }
        let triangles = live
            .iter()
            .map(|&t| tds.triangle(t).vertices().map(|v| v.0))
            .collect();
        let neighbors = live
            .iter()
            .map(|&t| {
                tds.triangle(t)
                    .neighbors()
                    .map(|n| n.and_then(|n| compact[n.0]))
            })
            .collect();
        let neighbor_edges = tds.tracks_neighbor_edges().then(|| {
            live.iter()
                .map(|&t| {
                    let tri = tds.triangle(t);
                    [0, 1, 2].map(|e| tri.neighbor_edge(e))
                })
                .collect()
        });
        let vertex_triangle = tds.vertex_triangles().map(|vt| {
            vt.iter()
                .map(|t| t.and_then(|t| compact[t.0]))
                .collect()
        });
        Self {
            vertices: tds.points().iter().map(|&p| p.into()).collect(),
            triangles,
            neighbors,
            neighbor_edges,
            vertex_triangle,
        }
    }

    /// Rebuilds a store from the arrays.
    ///
    /// An empty `neighbors` array means "derive links from shared edges";
    /// otherwise the given links are installed and checked. Triangles must
    /// already be consistently oriented.
    ///
    /// # Errors
    ///
    /// See [`ArraysError`].
    pub fn to_tds(
        &self,
        track_neighbor_edges: bool,
        track_vertex_triangles: bool,
    ) -> Result<Tds, ArraysError> {
        if !self.neighbors.is_empty() && self.neighbors.len() != self.triangles.len() {
            return Err(ArraysError::LengthMismatch {
                neighbors: self.neighbors.len(),
                triangles: self.triangles.len(),
            });
        }
        let mut tds = Tds::new(track_neighbor_edges, track_vertex_triangles);
        for (index, &coords) in self.vertices.iter().enumerate() {
            let p = Point::new(coords);
            if !p.is_finite() {
                return Err(ArraysError::NonFiniteVertex { index });
            }
            tds.append_vertex(p);
        }
        let vertex_count = tds.vertex_count();
        for (triangle, tri) in self.triangles.iter().enumerate() {
            if let Some(&vertex) = tri.iter().find(|&&v| v >= vertex_count) {
                return Err(TdsImportError::VertexOutOfRange {
                    triangle,
                    vertex,
                    vertex_count,
                }
                .into());
            }
            if tri[0] == tri[1] || tri[1] == tri[2] || tri[0] == tri[2] {
                return Err(TdsImportError::RepeatedVertex { triangle }.into());
            }
            tds.append_triangle(tri.map(VertexId));
        }

        if self.neighbors.is_empty() {
            tds.assign_neighbors()?;
            self.install_incidence(&mut tds)?;
            return Ok(tds);
        }
        for (triangle, row) in self.neighbors.iter().enumerate() {
            let t = TriangleId(triangle);
            for (edge, &neighbor) in row.iter().enumerate() {
                let Some(neighbor) = neighbor else {
                    continue;
                };
                if neighbor >= self.triangles.len() {
                    return Err(ArraysError::NeighborOutOfRange { triangle, neighbor });
                }
                let (a, b) = tds.triangle(t).edge(edge);
                let u = TriangleId(neighbor);
                let back = tds
                    .triangle(u)
                    .edge_index(a, b)
                    .ok_or(ArraysError::NeighborMismatch { triangle, edge })?;
                tds.set_neighbor(t, edge, Some(u), Some(back));
            }
        }
        tds.validate_neighbors()?;
        self.install_incidence(&mut tds)?;
        Ok(tds)
    }

    /// Installs the exported incidence table, if any, so that a re-export
    /// reproduces it; otherwise keeps the table derived from the triangles.
    fn install_incidence(&self, tds: &mut Tds) -> Result<(), ArraysError> {
        let Some(incidence) = &self.vertex_triangle else {
            return Ok(());
        };
        if !tds.tracks_vertex_triangles() {
            return Ok(());
        }
        if incidence.len() != self.vertices.len() {
            return Err(ArraysError::IncidenceLengthMismatch {
                entries: incidence.len(),
                vertices: self.vertices.len(),
            });
        }
        for (vertex, &entry) in incidence.iter().enumerate() {
            if let Some(triangle) = entry {
                if triangle >= self.triangles.len() {
                    return Err(ArraysError::IncidenceOutOfRange { vertex, triangle });
                }
            }
            tds.set_vertex_triangle(VertexId(vertex), entry.map(TriangleId));
        }
        tds.validate_vertex_triangles()?;
        Ok(())
    }
}

/// Constrained edges split by kind, as `(from, to, group)` triples.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentArrays {
    /// Boundary segments.
    pub boundary: Vec<(usize, usize, i32)>,
    /// Interior segments.
    pub interior: Vec<(usize, usize, i32)>,
}

impl SegmentArrays {
    /// Collects the constrained edges of `tds`, oriented as inserted and
    /// sorted by group, then endpoints.
    #[must_use]
    pub fn from_tds(tds: &Tds) -> Self {
        let mut out = Self::default();
        for tag in tds.constraints() {
            let row = (tag.from.0, tag.to.0, tag.group);
            match tag.kind {
                ConstraintKind::Boundary => out.boundary.push(row),
                ConstraintKind::Interior => out.interior.push(row),
            }
        }
        let key = |&(a, b, g): &(usize, usize, i32)| (g, a, b);
        out.boundary.sort_unstable_by_key(key);
        out.interior.sort_unstable_by_key(key);
        out
    }

    /// The segments of one kind, ready for re-insertion.
    #[must_use]
    pub fn segments(&self, kind: ConstraintKind) -> Vec<Segment> {
        let rows = match kind {
            ConstraintKind::Boundary => &self.boundary,
            ConstraintKind::Interior => &self.interior,
        };
        rows.iter().copied().map(Segment::from).collect()
    }

    /// Total number of segments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.boundary.len() + self.interior.len()
    }

    /// Whether there are no segments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::triangulation_data_structure::ConstraintTag;

    fn square() -> Tds {
        let points = vec![
            Point::new2(0.0, 0.0),
            Point::new2(1.0, 0.0),
            Point::new2(1.0, 1.0),
            Point::new2(0.0, 1.0),
        ];
        Tds::from_triangles(points, &[[0, 1, 2], [0, 2, 3]], true, true).unwrap()
    }

    #[test]
    fn test_export_square() {
        let arrays = MeshArrays::from_tds(&square());
        assert_eq!(arrays.vertices.len(), 4);
        assert_eq!(arrays.triangles, vec![[0, 1, 2], [0, 2, 3]]);
        assert_eq!(arrays.neighbors[0], [None, Some(1), None]);
        assert_eq!(arrays.neighbors[1], [None, None, Some(0)]);
        assert_eq!(arrays.neighbor_edges.as_ref().unwrap()[0], [None, Some(2), None]);
        assert_eq!(arrays.vertex_triangle.as_ref().unwrap().len(), 4);
    }

    #[test]
    fn test_export_compacts_dead_triangles() {
        let mut tds = square();
        tds.kill_triangle(TriangleId(0));
        tds.rebuild_vertex_triangles();
        let arrays = MeshArrays::from_tds(&tds);
        assert_eq!(arrays.triangles, vec![[0, 2, 3]]);
        assert_eq!(arrays.neighbors, vec![[None, None, None]]);
        assert_eq!(arrays.vertex_triangle.unwrap()[1], None);
    }

    #[test]
    fn test_import_round_trip() {
        let arrays = MeshArrays::from_tds(&square());
        let tds = arrays.to_tds(true, true).unwrap();
        assert!(tds.is_valid().is_ok());
        assert_eq!(MeshArrays::from_tds(&tds), arrays);

        let derived = MeshArrays {
            neighbors: Vec::new(),
            ..arrays.clone()
        };
        assert_eq!(MeshArrays::from_tds(&derived.to_tds(true, true).unwrap()), arrays);
    }

    #[test]
    fn test_import_keeps_exported_incidence() {
        let mut arrays = MeshArrays::from_tds(&square());
        // Vertices 0 and 2 are in both triangles; pick the other one.
        let incidence = arrays.vertex_triangle.as_mut().unwrap();
        for v in [0, 2] {
            incidence[v] = incidence[v].map(|t| 1 - t);
        }
        let tds = arrays.to_tds(true, true).unwrap();
        assert!(tds.is_valid().is_ok());
        assert_eq!(MeshArrays::from_tds(&tds), arrays);

        let mut bad = arrays.clone();
        bad.vertex_triangle.as_mut().unwrap()[3] = Some(4);
        assert_eq!(
            bad.to_tds(true, true).unwrap_err(),
            ArraysError::IncidenceOutOfRange {
                vertex: 3,
                triangle: 4
            }
        );

        let mut bad = arrays.clone();
        bad.vertex_triangle.as_mut().unwrap()[1] = Some(1);
        assert!(matches!(
            bad.to_tds(true, true).unwrap_err(),
            ArraysError::Validation(TdsValidationError::VertexIncidence { .. })
        ));

        let mut bad = arrays;
        bad.vertex_triangle.as_mut().unwrap().pop();
        assert!(matches!(
            bad.to_tds(true, true).unwrap_err(),
            ArraysError::IncidenceLengthMismatch { entries: 3, vertices: 4 }
        ));
    }

    #[test]
    fn test_import_rejects_bad_arrays() {
        let mut arrays = MeshArrays::from_tds(&square());
        arrays.neighbors[0][1] = Some(7);
        assert_eq!(
            arrays.to_tds(true, true).unwrap_err(),
            ArraysError::NeighborOutOfRange {
                triangle: 0,
                neighbor: 7
            }
        );

        let mut arrays = MeshArrays::from_tds(&square());
        arrays.neighbors[0][0] = Some(1);
        assert_eq!(
            arrays.to_tds(true, true).unwrap_err(),
            ArraysError::NeighborMismatch { triangle: 0, edge: 0 }
        );

        let mut arrays = MeshArrays::from_tds(&square());
        arrays.triangles[1] = [0, 9, 3];
        assert!(matches!(
            arrays.to_tds(true, true).unwrap_err(),
            ArraysError::Import(TdsImportError::VertexOutOfRange { vertex: 9, .. })
        ));

        let mut arrays = MeshArrays::from_tds(&square());
        arrays.neighbors.pop();
        assert!(matches!(
            arrays.to_tds(true, true).unwrap_err(),
            ArraysError::LengthMismatch { .. }
        ));
    }

    #[test]
    fn test_segment_export_is_sorted_and_split_by_kind() {
        let mut tds = square();
        for (from, to, group, kind) in [
            (2, 3, 1, ConstraintKind::Boundary),
            (1, 0, 1, ConstraintKind::Boundary),
            (0, 2, 0, ConstraintKind::Interior),
            (3, 0, 0, ConstraintKind::Boundary),
        ] {
            tds.set_constraint(ConstraintTag {
                kind,
                group,
                from: VertexId(from),
                to: VertexId(to),
            });
        }
        let segments = SegmentArrays::from_tds(&tds);
        assert_eq!(segments.boundary, vec![(3, 0, 0), (1, 0, 1), (2, 3, 1)]);
        assert_eq!(segments.interior, vec![(0, 2, 0)]);
        assert_eq!(segments.len(), 4);
        assert_eq!(segments.segments(ConstraintKind::Interior)[0], Segment::new(VertexId(0), VertexId(2), 0));
    }
}
