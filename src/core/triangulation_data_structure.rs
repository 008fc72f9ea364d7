//! Triangle-adjacency topology store.
//!
//! The `Tds` (triangulation data structure) owns the vertex-coordinate table,
//! the triangle table with neighbor links, the optional back-edge and
//! vertex-incidence tables, and the set of constrained edges. It is purely
//! combinatorial apart from storing coordinates: every geometric decision is
//! made by the algorithms through a [`Kernel`](crate::geometry::kernel::Kernel).
//!
//! # Conventions
//!
//! - Vertex ids and triangle ids are dense indices into growable tables. Ids
//!   are never reused.
//! - Triangle vertices are stored counter-clockwise with respect to the mesh's
//!   "up" side.
//! - `neighbors[i]` is the triangle across the edge opposite vertex `i`, i.e.
//!   the edge `(v[i+1], v[i+2])` (indices mod 3). `None` marks a boundary edge.
//! - When back-edges are tracked, `neighbor_edges[i]` is the local index of the
//!   same edge inside `neighbors[i]`.
//! - Triangles are never edited for their vertex set in place by callers;
//!   [`Tds::replace_triangle`] rewrites a triangle under the same id and resets
//!   its links, after which the caller must re-link.
//! - Exterior pruning marks triangles dead instead of removing them; dead
//!   triangles keep their id, have no live neighbors pointing at them, and are
//!   skipped by every iterator. Export compacts them away.
//!
//! # Topological Invariants
//!
//! | Invariant | Checked by |
//! |---|---|
//! | Mutual neighbor links with matching shared edge | [`Tds::validate_neighbors`] |
//! | Back-edge indices point at the shared edge | [`Tds::validate_neighbors`] |
//! | Vertex incidence entries reference live triangles containing the vertex | [`Tds::validate_vertex_triangles`] |
//! | Every constrained edge is an edge of some live triangle | [`Tds::validate_constraints`] |
//!
//! Indexing with an out-of-range id is a programming error and panics.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use thiserror::Error;

use crate::core::collections::{
    FastHashMap, FastHashSet, TriangleIdSet, VertexStarBuffer, fast_hash_map_with_capacity,
};
use crate::core::edge::EdgeKey;
use crate::geometry::kernel::Kernel;
use crate::geometry::mesh_type::MeshType;
use crate::geometry::point::Point;
use crate::geometry::predicates::{BoundingBox, Frame, Orientation, bounding_box};

// =============================================================================
// IDS
// =============================================================================

/// Dense vertex identifier.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct VertexId(pub usize);

/// Dense triangle identifier.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct TriangleId(pub usize);

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl fmt::Display for TriangleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// Local index `i + k` modulo 3.
#[inline]
#[must_use]
pub const fn ccw(i: usize, k: usize) -> usize {
    (i + k) % 3
}

// =============================================================================
// TRIANGLES
// =============================================================================

/// One triangle of the mesh.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Triangle {
    vertices: [VertexId; 3],
    neighbors: [Option<TriangleId>; 3],
    neighbor_edges: [Option<u8>; 3],
    live: bool,
}

impl Triangle {
    fn new(vertices: [VertexId; 3]) -> Self {
        Self {
            vertices,
            neighbors: [None; 3],
            neighbor_edges: [None; 3],
            live: true,
        }
    }

    /// The three vertices in counter-clockwise order.
    #[inline]
    #[must_use]
    pub const fn vertices(&self) -> [VertexId; 3] {
        self.vertices
    }

    /// Vertex at local index `i`.
    #[inline]
    #[must_use]
    pub const fn vertex(&self, i: usize) -> VertexId {
        self.vertices[i]
    }

    /// Neighbor links, one per opposite edge.
    #[inline]
    #[must_use]
    pub const fn neighbors(&self) -> [Option<TriangleId>; 3] {
        self.neighbors
    }

    /// Neighbor across the edge opposite vertex `i`.
    #[inline]
    #[must_use]
    pub const fn neighbor(&self, i: usize) -> Option<TriangleId> {
        self.neighbors[i]
    }

    /// Recorded back-edge across edge `i`, if tracked.
    #[inline]
    #[must_use]
    pub const fn neighbor_edge(&self, i: usize) -> Option<u8> {
        self.neighbor_edges[i]
    }

    /// Whether the triangle is part of the mesh (not pruned).
    #[inline]
    #[must_use]
    pub const fn is_live(&self) -> bool {
        self.live
    }

    /// Endpoints of the edge opposite vertex `i`, in counter-clockwise order.
    #[inline]
    #[must_use]
    pub const fn edge(&self, i: usize) -> (VertexId, VertexId) {
        (self.vertices[ccw(i, 1)], self.vertices[ccw(i, 2)])
    }

    /// Canonical key of the edge opposite vertex `i`.
    #[inline]
    #[must_use]
    pub fn edge_key(&self, i: usize) -> EdgeKey {
        let (a, b) = self.edge(i);
        EdgeKey::new(a, b)
    }

    /// Local index of vertex `v`.
    #[must_use]
    pub fn index_of(&self, v: VertexId) -> Option<usize> {
        self.vertices.iter().position(|&w| w == v)
    }

    /// Local index of the edge with endpoints `{a, b}` (either order).
    #[must_use]
    pub fn edge_index(&self, a: VertexId, b: VertexId) -> Option<usize> {
        let ia = self.index_of(a)?;
        let ib = self.index_of(b)?;
        if ia == ib {
            return None;
        }
        Some(3 - ia - ib)
    }

    /// Returns `true` if `v` is a corner of this triangle.
    #[must_use]
    pub fn contains_vertex(&self, v: VertexId) -> bool {
        self.vertices.contains(&v)
    }
}

// =============================================================================
// CONSTRAINTS
// =============================================================================

/// Role of a constrained edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstraintKind {
    /// Part of a closed boundary polygon; pruning never crosses it.
    Boundary,
    /// Interior feature line.
    Interior,
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boundary => write!(f, "boundary"),
            Self::Interior => write!(f, "interior"),
        }
    }
}

/// Tag stored on a constrained edge.
///
/// `from` and `to` record the orientation in which the segment was given so
/// that exported segments come back in the caller's orientation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConstraintTag {
    /// Boundary or interior.
    pub kind: ConstraintKind,
    /// Opaque group id passed through to segment export.
    pub group: i32,
    /// First endpoint as given.
    pub from: VertexId,
    /// Second endpoint as given.
    pub to: VertexId,
}

impl ConstraintTag {
    /// Canonical key of the tagged edge.
    #[must_use]
    pub fn key(&self) -> EdgeKey {
        EdgeKey::new(self.from, self.to)
    }

    /// The same tag restricted to the sub-segment `from → to`.
    #[must_use]
    pub const fn with_endpoints(self, from: VertexId, to: VertexId) -> Self {
        Self {
            kind: self.kind,
            group: self.group,
            from,
            to,
        }
    }
}

// =============================================================================
// ERRORS
// =============================================================================

/// Errors reported by the validation methods of [`Tds`].
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TdsValidationError {
    /// Neighbor relationships are invalid.
    #[error("Invalid neighbor relationships: {message}")]
    InvalidNeighbors {
        /// Description of the failure.
        message: String,
    },
    /// Two triangles are linked but do not share the linked edge.
    #[error("Triangles {t1} and {t2} are linked but do not share edge {edge:?}")]
    NotNeighbors {
        /// First triangle.
        t1: TriangleId,
        /// Second triangle.
        t2: TriangleId,
        /// The edge `t1` claims to share.
        edge: EdgeKey,
    },
    /// A live triangle references a dead one.
    #[error("Live triangle {triangle} references dead triangle {dead}")]
    DeadReference {
        /// The live triangle.
        triangle: TriangleId,
        /// The dead triangle.
        dead: TriangleId,
    },
    /// A triangle is not positively oriented.
    #[error("Triangle {triangle} is not positively oriented ({orientation})")]
    Orientation {
        /// The offending triangle.
        triangle: TriangleId,
        /// The orientation found.
        orientation: String,
    },
    /// The vertex-incidence table is inconsistent.
    #[error("Vertex incidence for {vertex} is inconsistent: {message}")]
    VertexIncidence {
        /// The vertex.
        vertex: VertexId,
        /// Description of the failure.
        message: String,
    },
    /// A constrained edge is not present in the triangulation.
    #[error("Constrained edge {v0}-{v1} is not an edge of any live triangle")]
    MissingConstraint {
        /// First endpoint.
        v0: VertexId,
        /// Second endpoint.
        v1: VertexId,
    },
    /// The Delaunay property is violated outside constraints.
    #[error("Vertex {vertex} lies inside the circumcircle of triangle {triangle}")]
    DelaunayViolation {
        /// Triangle whose circumcircle is violated.
        triangle: TriangleId,
        /// Offending vertex.
        vertex: VertexId,
    },
}

/// Errors raised while importing a triangle list.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TdsImportError {
    /// A triangle references a vertex that does not exist.
    #[error("Triangle {triangle} references vertex {vertex} but only {vertex_count} vertices exist")]
    VertexOutOfRange {
        /// Offending triangle index in the input.
        triangle: usize,
        /// Referenced vertex.
        vertex: usize,
        /// Number of vertices.
        vertex_count: usize,
    },
    /// A triangle repeats a vertex.
    #[error("Triangle {triangle} repeats a vertex")]
    RepeatedVertex {
        /// Offending triangle index in the input.
        triangle: usize,
    },
    /// An edge is shared by more than two triangles.
    #[error("Edge {edge:?} is shared by more than two triangles")]
    NonManifoldEdge {
        /// The edge.
        edge: EdgeKey,
    },
    /// Triangles cannot be oriented consistently (non-orientable input).
    #[error("Triangles cannot be oriented consistently around edge {edge:?}")]
    NonOrientable {
        /// An edge where orientations conflict.
        edge: EdgeKey,
    },
}

// =============================================================================
// TDS
// =============================================================================

/// The topology store.
#[derive(Clone, Debug)]
pub struct Tds {
    points: Vec<Point>,
    triangles: Vec<Triangle>,
    vertex_triangles: Option<Vec<Option<TriangleId>>>,
    track_neighbor_edges: bool,
    constraints: FastHashMap<EdgeKey, ConstraintTag>,
    live_triangles: usize,
}

impl Default for Tds {
    fn default() -> Self {
        Self::new(true, true)
    }
}

impl Tds {
    /// Creates an empty store.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use fmesh::core::triangulation_data_structure::Tds;
    /// use fmesh::geometry::point::Point;
    ///
    /// let mut tds = Tds::new(true, true);
    /// let a = tds.append_vertex(Point::new2(0.0, 0.0));
    /// let b = tds.append_vertex(Point::new2(1.0, 0.0));
    /// let c = tds.append_vertex(Point::new2(0.0, 1.0));
    /// let t = tds.append_triangle([a, b, c]);
    /// assert_eq!(tds.triangle_count(), 1);
    /// assert_eq!(tds.triangle(t).neighbors(), [None; 3]);
    /// assert_eq!(tds.vertex_triangle(b), Some(t));
    /// ```
    #[must_use]
    pub fn new(track_neighbor_edges: bool, track_vertex_triangles: bool) -> Self {
        Self {
            points: Vec::new(),
            triangles: Vec::new(),
            vertex_triangles: track_vertex_triangles.then(Vec::new),
            track_neighbor_edges,
            constraints: FastHashMap::default(),
            live_triangles: 0,
        }
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Number of vertices.
    #[inline]
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.points.len()
    }

    /// Number of live triangles.
    #[inline]
    #[must_use]
    pub const fn triangle_count(&self) -> usize {
        self.live_triangles
    }

    /// Size of the triangle table, dead triangles included.
    #[inline]
    #[must_use]
    pub fn triangle_capacity(&self) -> usize {
        self.triangles.len()
    }

    /// Whether back-edges are tracked.
    #[inline]
    #[must_use]
    pub const fn tracks_neighbor_edges(&self) -> bool {
        self.track_neighbor_edges
    }

    /// Whether the vertex-incidence table is tracked.
    #[inline]
    #[must_use]
    pub const fn tracks_vertex_triangles(&self) -> bool {
        self.vertex_triangles.is_some()
    }

    /// Coordinates of a vertex.
    ///
    /// # Panics
    ///
    /// Panics if `v` is out of range.
    #[inline]
    #[must_use]
    pub fn point(&self, v: VertexId) -> &Point {
        &self.points[v.0]
    }

    /// All vertex coordinates.
    #[inline]
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// A triangle by id.
    ///
    /// # Panics
    ///
    /// Panics if `t` is out of range.
    #[inline]
    #[must_use]
    pub fn triangle(&self, t: TriangleId) -> &Triangle {
        &self.triangles[t.0]
    }

    /// Whether `t` indexes a live triangle.
    #[inline]
    #[must_use]
    pub fn is_live(&self, t: TriangleId) -> bool {
        self.triangles.get(t.0).is_some_and(Triangle::is_live)
    }

    /// Iterates over live triangle ids in increasing order.
    pub fn triangle_ids(&self) -> impl Iterator<Item = TriangleId> + '_ {
        self.triangles
            .iter()
            .enumerate()
            .filter(|(_, t)| t.live)
            .map(|(i, _)| TriangleId(i))
    }

    /// Iterates over vertex ids.
    pub fn vertex_ids(&self) -> impl Iterator<Item = VertexId> + use<> {
        (0..self.points.len()).map(VertexId)
    }

    /// Coordinates of the three corners of a triangle.
    #[must_use]
    pub fn triangle_points(&self, t: TriangleId) -> [&Point; 3] {
        self.triangle(t).vertices.map(|v| self.point(v))
    }

    /// Bounding box of a triangle over the selected dimensions.
    #[must_use]
    pub fn triangle_bounding_box(&self, t: TriangleId, dims: &[usize]) -> BoundingBox {
        bounding_box(self.triangle_points(t), dims)
    }

    /// One triangle incident to `v`, when the incidence table is tracked.
    #[must_use]
    pub fn vertex_triangle(&self, v: VertexId) -> Option<TriangleId> {
        assert!(v.0 < self.points.len(), "vertex {v} out of range");
        self.vertex_triangles.as_ref().and_then(|vt| vt[v.0])
    }

    /// The whole vertex-incidence table, when tracked.
    #[must_use]
    pub fn vertex_triangles(&self) -> Option<&[Option<TriangleId>]> {
        self.vertex_triangles.as_deref()
    }

    /// The neighbor across edge `e` of `t` and the local index of the shared
    /// edge inside it.
    ///
    /// Uses the back-edge table when tracked; otherwise searches the
    /// neighbor's three edges for the shared vertex pair.
    ///
    /// # Panics
    ///
    /// Panics if the neighbor does not contain the shared edge, which means
    /// the topology is corrupt.
    #[must_use]
    pub fn adjacent(&self, t: TriangleId, e: usize) -> Option<(TriangleId, usize)> {
        let tri = self.triangle(t);
        let t2 = tri.neighbors[e]?;
        if let Some(e2) = tri.neighbor_edges[e] {
            return Some((t2, usize::from(e2)));
        }
        let (a, b) = tri.edge(e);
        let e2 = self
            .triangle(t2)
            .edge_index(a, b)
            .unwrap_or_else(|| panic!("{t2} is linked to {t} but lacks edge {a}-{b}"));
        Some((t2, e2))
    }

    /// Triangles around `v` in counter-clockwise order.
    ///
    /// For a boundary vertex the sequence starts at the clockwise-most
    /// triangle. Requires the incidence table, or falls back to a scan.
    #[must_use]
    pub fn vertex_star(&self, v: VertexId) -> VertexStarBuffer {
        let mut star = VertexStarBuffer::new();
        let start = match self.vertex_triangle(v) {
            Some(t) if self.is_live(t) && self.triangle(t).contains_vertex(v) => t,
            _ => match self
                .triangle_ids()
                .find(|&t| self.triangle(t).contains_vertex(v))
            {
                Some(t) => t,
                None => return star,
            },
        };

        // Walk clockwise to the first triangle, or all the way round.
        let limit = self.triangles.len();
        let mut first = start;
        for _ in 0..limit {
            let i = self.triangle(first).index_of(v).unwrap_or(0);
            match self.triangle(first).neighbor(ccw(i, 2)) {
                Some(prev) if prev == start => {
                    first = start;
                    break;
                }
                Some(prev) => first = prev,
                None => break,
            }
        }

        let mut current = first;
        for _ in 0..limit {
            star.push(current);
            let i = self.triangle(current).index_of(v).unwrap_or(0);
            match self.triangle(current).neighbor(ccw(i, 1)) {
                Some(next) if next != first => current = next,
                _ => break,
            }
        }
        star
    }

    /// A live triangle having `{a, b}` as an edge, and the edge's local index.
    #[must_use]
    pub fn find_edge(&self, a: VertexId, b: VertexId) -> Option<(TriangleId, usize)> {
        if a == b {
            return None;
        }
        if self.tracks_vertex_triangles() {
            return self
                .vertex_star(a)
                .into_iter()
                .find_map(|t| self.triangle(t).edge_index(a, b).map(|e| (t, e)));
        }
        self.triangle_ids()
            .find_map(|t| self.triangle(t).edge_index(a, b).map(|e| (t, e)))
    }

    // -------------------------------------------------------------------------
    // Constraints
    // -------------------------------------------------------------------------

    /// The constraint tag on edge `{a, b}`, if any.
    #[must_use]
    pub fn constraint(&self, a: VertexId, b: VertexId) -> Option<&ConstraintTag> {
        self.constraints.get(&EdgeKey::new(a, b))
    }

    /// Whether edge `{a, b}` is constrained.
    #[must_use]
    pub fn is_constrained(&self, a: VertexId, b: VertexId) -> bool {
        self.constraints.contains_key(&EdgeKey::new(a, b))
    }

    /// Whether edge `e` of triangle `t` is constrained.
    #[must_use]
    pub fn is_constrained_edge(&self, t: TriangleId, e: usize) -> bool {
        self.constraints.contains_key(&self.triangle(t).edge_key(e))
    }

    /// Tags an edge; returns the previous tag.
    pub fn set_constraint(&mut self, tag: ConstraintTag) -> Option<ConstraintTag> {
        self.constraints.insert(tag.key(), tag)
    }

    /// Removes the tag of edge `{a, b}`.
    pub fn remove_constraint(&mut self, a: VertexId, b: VertexId) -> Option<ConstraintTag> {
        self.constraints.remove(&EdgeKey::new(a, b))
    }

    /// Replaces the constraint on `{a, b}` by the two sub-segments through `m`.
    pub fn split_constraint(&mut self, a: VertexId, b: VertexId, m: VertexId) {
        if let Some(tag) = self.remove_constraint(a, b) {
            let (from, to) = (tag.from, tag.to);
            self.set_constraint(tag.with_endpoints(from, m));
            self.set_constraint(tag.with_endpoints(m, to));
        }
    }

    /// Iterates over all constraint tags (unordered).
    pub fn constraints(&self) -> impl Iterator<Item = &ConstraintTag> + '_ {
        self.constraints.values()
    }

    /// Number of constrained edges.
    #[must_use]
    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    // -------------------------------------------------------------------------
    // Edits
    // -------------------------------------------------------------------------

    /// Appends a vertex and returns its id.
    pub fn append_vertex(&mut self, p: Point) -> VertexId {
        self.points.push(p);
        if let Some(vt) = &mut self.vertex_triangles {
            vt.push(None);
        }
        VertexId(self.points.len() - 1)
    }

    /// Appends a triangle with unlinked neighbors and returns its id.
    ///
    /// # Panics
    ///
    /// Panics if a vertex id is out of range or repeated.
    pub fn append_triangle(&mut self, vertices: [VertexId; 3]) -> TriangleId {
        self.check_vertices(vertices);
        let t = TriangleId(self.triangles.len());
        self.triangles.push(Triangle::new(vertices));
        self.live_triangles += 1;
        self.note_incidence(t, vertices);
        t
    }

    /// Rewrites triangle `t` with new vertices, keeping its id and resetting
    /// its own neighbor links. Neighbors' links to `t` are left untouched.
    ///
    /// # Panics
    ///
    /// Panics if `t` is out of range or dead, or a vertex id is invalid.
    pub fn replace_triangle(&mut self, t: TriangleId, vertices: [VertexId; 3]) {
        self.check_vertices(vertices);
        let tri = &mut self.triangles[t.0];
        assert!(tri.live, "cannot replace dead triangle {t}");
        tri.vertices = vertices;
        tri.neighbors = [None; 3];
        tri.neighbor_edges = [None; 3];
        self.note_incidence(t, vertices);
    }

    /// Sets one side of a neighbor link.
    ///
    /// `back_edge` is recorded only when back-edges are tracked.
    pub fn set_neighbor(
        &mut self,
        t: TriangleId,
        e: usize,
        neighbor: Option<TriangleId>,
        back_edge: Option<usize>,
    ) {
        let track = self.track_neighbor_edges;
        let tri = &mut self.triangles[t.0];
        tri.neighbors[e] = neighbor;
        tri.neighbor_edges[e] = if track && neighbor.is_some() {
            back_edge.map(|b| b as u8)
        } else {
            None
        };
    }

    /// Links edge `e1` of `t1` and edge `e2` of `t2` in both directions.
    ///
    /// # Panics
    ///
    /// Panics (in debug builds) if the two edges do not share endpoints.
    pub fn link(&mut self, t1: TriangleId, e1: usize, t2: TriangleId, e2: usize) {
        debug_assert_eq!(
            self.triangle(t1).edge_key(e1),
            self.triangle(t2).edge_key(e2),
            "linking {t1}:{e1} to {t2}:{e2} with different edges"
        );
        self.set_neighbor(t1, e1, Some(t2), Some(e2));
        self.set_neighbor(t2, e2, Some(t1), Some(e1));
    }

    /// Links edge `e` of `t` to an optional `(neighbor, edge)` pair, or marks it
    /// as boundary.
    pub fn link_optional(&mut self, t: TriangleId, e: usize, other: Option<(TriangleId, usize)>) {
        match other {
            Some((t2, e2)) => self.link(t, e, t2, e2),
            None => self.set_neighbor(t, e, None, None),
        }
    }

    /// Marks a triangle dead and detaches it from its live neighbors.
    pub fn kill_triangle(&mut self, t: TriangleId) {
        if !self.triangles[t.0].live {
            return;
        }
        for e in 0..3 {
            if let Some((t2, e2)) = self.adjacent(t, e) {
                self.set_neighbor(t2, e2, None, None);
            }
        }
        let tri = &mut self.triangles[t.0];
        tri.live = false;
        tri.neighbors = [None; 3];
        tri.neighbor_edges = [None; 3];
        self.live_triangles -= 1;
    }

    /// Overwrites the incidence entry of `v`; a no-op when incidence is not
    /// tracked. [`Tds::validate_vertex_triangles`] checks the result.
    ///
    /// # Panics
    ///
    /// Panics if `v` is out of range.
    pub fn set_vertex_triangle(&mut self, v: VertexId, t: Option<TriangleId>) {
        if let Some(vt) = &mut self.vertex_triangles {
            vt[v.0] = t;
        }
    }

    /// Recomputes the vertex-incidence table from the live triangles.
    pub fn rebuild_vertex_triangles(&mut self) {
        let Some(vt) = &mut self.vertex_triangles else {
            return;
        };
        vt.iter_mut().for_each(|e| *e = None);
        for (i, tri) in self.triangles.iter().enumerate() {
            if tri.live {
                for v in tri.vertices {
                    vt[v.0] = Some(TriangleId(i));
                }
            }
        }
    }

    fn check_vertices(&self, vertices: [VertexId; 3]) {
        for v in vertices {
            assert!(
                v.0 < self.points.len(),
                "vertex {v} out of range ({} vertices)",
                self.points.len()
            );
        }
        assert!(
            vertices[0] != vertices[1] && vertices[1] != vertices[2] && vertices[0] != vertices[2],
            "triangle {vertices:?} repeats a vertex"
        );
    }

    fn note_incidence(&mut self, t: TriangleId, vertices: [VertexId; 3]) {
        if let Some(vt) = &mut self.vertex_triangles {
            for v in vertices {
                vt[v.0] = Some(t);
            }
        }
    }

    // -------------------------------------------------------------------------
    // Import
    // -------------------------------------------------------------------------

    /// Builds a store from coordinates and a triangle list.
    ///
    /// Triangles are first made consistently oriented (each shared edge runs in
    /// opposite directions in its two triangles), then neighbor links are
    /// rebuilt from shared edges. Whether the common orientation is the
    /// positive one is decided by the caller, which may call
    /// [`Tds::reverse_all`].
    ///
    /// # Errors
    ///
    /// Returns [`TdsImportError`] for out-of-range or repeated vertices,
    /// non-manifold edges, or non-orientable input.
    pub fn from_triangles(
        points: Vec<Point>,
        triangles: &[[usize; 3]],
        track_neighbor_edges: bool,
        track_vertex_triangles: bool,
    ) -> Result<Self, TdsImportError> {
        let mut tds = Self::new(track_neighbor_edges, track_vertex_triangles);
        for p in points {
            tds.append_vertex(p);
        }
        let n = tds.vertex_count();
        for (i, tri) in triangles.iter().enumerate() {
            if let Some(&v) = tri.iter().find(|&&v| v >= n) {
                return Err(TdsImportError::VertexOutOfRange {
                    triangle: i,
                    vertex: v,
                    vertex_count: n,
                });
            }
            if tri[0] == tri[1] || tri[1] == tri[2] || tri[0] == tri[2] {
                return Err(TdsImportError::RepeatedVertex { triangle: i });
            }
            tds.append_triangle(tri.map(VertexId));
        }
        tds.orient_consistently()?;
        tds.assign_neighbors()?;
        Ok(tds)
    }

    /// Reverses the orientation of every live triangle.
    pub fn reverse_all(&mut self) {
        for tri in &mut self.triangles {
            if tri.live {
                tri.vertices.swap(1, 2);
                tri.neighbors.swap(1, 2);
                tri.neighbor_edges = [None; 3];
            }
        }
        if self.track_neighbor_edges {
            self.refresh_neighbor_edges();
        }
    }

    fn edge_incidence(&self) -> Result<FastHashMap<EdgeKey, Vec<(TriangleId, usize)>>, TdsImportError> {
        let mut edges: FastHashMap<EdgeKey, Vec<(TriangleId, usize)>> =
            fast_hash_map_with_capacity(self.triangles.len() * 2);
        for t in self.triangle_ids() {
            for e in 0..3 {
                let key = self.triangle(t).edge_key(e);
                let list = edges.entry(key).or_default();
                list.push((t, e));
                if list.len() > 2 {
                    return Err(TdsImportError::NonManifoldEdge { edge: key });
                }
            }
        }
        Ok(edges)
    }

    /// Flips triangles so that every shared edge is traversed in opposite
    /// directions by its two triangles. Each connected component keeps the
    /// orientation of its lowest-numbered triangle.
    fn orient_consistently(&mut self) -> Result<(), TdsImportError> {
        let edges = self.edge_incidence()?;
        let mut visited = TriangleIdSet::default();
        let ids: Vec<TriangleId> = self.triangle_ids().collect();
        for seed in ids {
            if !visited.insert(seed) {
                continue;
            }
            let mut queue = VecDeque::from([seed]);
            while let Some(t) = queue.pop_front() {
                for e in 0..3 {
                    let (a, b) = self.triangle(t).edge(e);
                    let key = EdgeKey::new(a, b);
                    let Some(other) = edges[&key].iter().find(|(u, _)| *u != t).copied() else {
                        continue;
                    };
                    let (u, _) = other;
                    let same_direction = {
                        let tri_u = self.triangle(u);
                        let ia = tri_u.index_of(a);
                        let ib = tri_u.index_of(b);
                        matches!((ia, ib), (Some(ia), Some(ib)) if ccw(ia, 1) == ib)
                    };
                    if visited.insert(u) {
                        if same_direction {
                            self.triangles[u.0].vertices.swap(1, 2);
                        }
                        queue.push_back(u);
                    } else if same_direction {
                        return Err(TdsImportError::NonOrientable { edge: key });
                    }
                }
            }
        }
        Ok(())
    }

    /// Rebuilds all neighbor links of live triangles from shared edges.
    ///
    /// # Errors
    ///
    /// Returns [`TdsImportError::NonManifoldEdge`] if an edge has more than two
    /// incident triangles.
    pub fn assign_neighbors(&mut self) -> Result<(), TdsImportError> {
        let edges = self.edge_incidence()?;
        for tri in &mut self.triangles {
            tri.neighbors = [None; 3];
            tri.neighbor_edges = [None; 3];
        }
        for list in edges.values() {
            if let [(t1, e1), (t2, e2)] = list.as_slice() {
                self.triangles[t1.0].neighbors[*e1] = Some(*t2);
                self.triangles[t2.0].neighbors[*e2] = Some(*t1);
            }
        }
        if self.track_neighbor_edges {
            self.refresh_neighbor_edges();
        }
        self.rebuild_vertex_triangles();
        Ok(())
    }

    fn refresh_neighbor_edges(&mut self) {
        for i in 0..self.triangles.len() {
            if !self.triangles[i].live {
                continue;
            }
            for e in 0..3 {
                let back = self.triangles[i].neighbors[e].and_then(|t2| {
                    let (a, b) = self.triangles[i].edge(e);
                    self.triangle(t2).edge_index(a, b).map(|x| x as u8)
                });
                self.triangles[i].neighbor_edges[e] = back;
            }
        }
    }

    // -------------------------------------------------------------------------
    // Validation
    // -------------------------------------------------------------------------

    /// Validates neighbor links: mutual, sharing the linked edge, live, and
    /// with correct back-edges.
    ///
    /// # Errors
    ///
    /// Returns the first violation found.
    pub fn validate_neighbors(&self) -> Result<(), TdsValidationError> {
        for t in self.triangle_ids() {
            let tri = self.triangle(t);
            for e in 0..3 {
                let Some(t2) = tri.neighbors[e] else {
                    continue;
                };
                if t2.0 >= self.triangles.len() {
                    return Err(TdsValidationError::InvalidNeighbors {
                        message: format!("{t} links to out-of-range {t2}"),
                    });
                }
                let other = self.triangle(t2);
                if !other.live {
                    return Err(TdsValidationError::DeadReference {
                        triangle: t,
                        dead: t2,
                    });
                }
                let (a, b) = tri.edge(e);
                let Some(e2) = other.edge_index(a, b) else {
                    return Err(TdsValidationError::NotNeighbors {
                        t1: t,
                        t2,
                        edge: EdgeKey::new(a, b),
                    });
                };
                if other.neighbors[e2] != Some(t) {
                    return Err(TdsValidationError::InvalidNeighbors {
                        message: format!("neighbor relationship not mutual: {t} → {t2}"),
                    });
                }
                if self.track_neighbor_edges && tri.neighbor_edges[e] != Some(e2 as u8) {
                    return Err(TdsValidationError::InvalidNeighbors {
                        message: format!(
                            "back-edge of {t}:{e} is {:?}, expected {e2}",
                            tri.neighbor_edges[e]
                        ),
                    });
                }
            }
        }
        Ok(())
    }

    /// Validates the vertex-incidence table, if tracked.
    ///
    /// # Errors
    ///
    /// Returns the first vertex whose entry is stale or missing.
    pub fn validate_vertex_triangles(&self) -> Result<(), TdsValidationError> {
        let Some(vt) = &self.vertex_triangles else {
            return Ok(());
        };
        let mut used = vec![false; self.points.len()];
        for t in self.triangle_ids() {
            for v in self.triangle(t).vertices {
                used[v.0] = true;
            }
        }
        for (i, entry) in vt.iter().enumerate() {
            let v = VertexId(i);
            match entry {
                Some(t) if self.is_live(*t) && self.triangle(*t).contains_vertex(v) => {}
                Some(t) => {
                    return Err(TdsValidationError::VertexIncidence {
                        vertex: v,
                        message: format!("points at {t}, which is dead or does not contain it"),
                    });
                }
                None if used[i] => {
                    return Err(TdsValidationError::VertexIncidence {
                        vertex: v,
                        message: "used by a triangle but has no incidence entry".to_string(),
                    });
                }
                None => {}
            }
        }
        Ok(())
    }

    /// Validates that every constrained edge is present.
    ///
    /// # Errors
    ///
    /// Returns the first missing constrained edge.
    pub fn validate_constraints(&self) -> Result<(), TdsValidationError> {
        let present: FastHashSet<EdgeKey> = self
            .triangle_ids()
            .flat_map(|t| (0..3).map(move |e| self.triangle(t).edge_key(e)))
            .collect();
        let mut keys: Vec<&EdgeKey> = self.constraints.keys().collect();
        keys.sort_unstable();
        for key in keys {
            if !present.contains(key) {
                return Err(TdsValidationError::MissingConstraint {
                    v0: key.v0(),
                    v1: key.v1(),
                });
            }
        }
        Ok(())
    }

    /// Validates that no live triangle is negatively oriented under `kernel`.
    ///
    /// # Errors
    ///
    /// Returns [`TdsValidationError::Orientation`] for the first clockwise
    /// triangle.
    pub fn validate_orientation<K: Kernel>(
        &self,
        kernel: &K,
        mesh_type: MeshType,
    ) -> Result<(), TdsValidationError> {
        for t in self.triangle_ids() {
            let [a, b, c] = self.triangle_points(t);
            let frame = Frame::for_triangle(mesh_type, a, b, c);
            let orientation = kernel.orientation(&frame, a, b, c);
            if orientation == Orientation::NEGATIVE {
                return Err(TdsValidationError::Orientation {
                    triangle: t,
                    orientation: orientation.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Runs all combinatorial validations.
    ///
    /// # Errors
    ///
    /// Returns the first violation found.
    pub fn is_valid(&self) -> Result<(), TdsValidationError> {
        self.validate_neighbors()?;
        self.validate_vertex_triangles()?;
        self.validate_constraints()
    }
}
