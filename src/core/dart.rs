//! Dart navigation over the topology store.
//!
//! A [`Dart`] is a copyable cursor naming a triangle, one of its three local
//! edges, and a direction along that edge. It carries no reference to the
//! mesh; every operation takes the [`Tds`] it navigates, so darts stay valid
//! across mutations exactly as long as their triangle id indexes a live
//! triangle.
//!
//! For a triangle `[v0, v1, v2]` and edge index `e`, a counter-clockwise dart
//! runs from `v[e+1]` to `v[e+2]`, keeping the triangle on its left. The
//! clockwise dart on the same edge runs the other way.
//!
//! ```text
//!              v2
//!             /  \
//!     e = 1  /    \  e = 0
//!    (v2→v0)/      \(v1→v2)
//!          v0------v1
//!            e = 2 (v0→v1)
//! ```

use std::fmt;

use crate::core::triangulation_data_structure::{Tds, TriangleId, VertexId, ccw};

/// A cursor over (triangle, local edge, direction).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Dart {
    triangle: TriangleId,
    edge: u8,
    ccw: bool,
}

impl fmt::Display for Dart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dir = if self.ccw { "+" } else { "-" };
        write!(f, "{}:{}{}", self.triangle, self.edge, dir)
    }
}

impl Dart {
    /// Creates a dart.
    ///
    /// # Panics
    ///
    /// Panics if `edge > 2`.
    #[must_use]
    pub fn new(triangle: TriangleId, edge: usize, ccw: bool) -> Self {
        assert!(edge < 3, "local edge index {edge} out of range");
        Self {
            triangle,
            edge: edge as u8,
            ccw,
        }
    }

    /// Counter-clockwise dart on edge 0 of `triangle`.
    #[must_use]
    pub fn of_triangle(triangle: TriangleId) -> Self {
        Self::new(triangle, 0, true)
    }

    /// The counter-clockwise dart of `tds` leaving vertex `v` inside triangle `t`.
    ///
    /// Returns `None` if `t` does not contain `v`.
    #[must_use]
    pub fn leaving(tds: &Tds, t: TriangleId, v: VertexId) -> Option<Self> {
        let i = tds.triangle(t).index_of(v)?;
        // The ccw dart on edge e starts at v[e+1]; solve e + 1 == i.
        Some(Self::new(t, ccw(i, 2), true))
    }

    /// Triangle id.
    #[inline]
    #[must_use]
    pub const fn triangle_id(&self) -> TriangleId {
        self.triangle
    }

    /// Local edge index.
    #[inline]
    #[must_use]
    pub const fn edge(&self) -> usize {
        self.edge as usize
    }

    /// Whether the dart runs counter-clockwise around its triangle.
    #[inline]
    #[must_use]
    pub const fn is_ccw(&self) -> bool {
        self.ccw
    }

    /// Origin and destination vertices.
    #[must_use]
    pub fn edge_vertices(&self, tds: &Tds) -> (VertexId, VertexId) {
        let (a, b) = tds.triangle(self.triangle).edge(self.edge());
        if self.ccw { (a, b) } else { (b, a) }
    }

    /// Origin vertex.
    #[must_use]
    pub fn origin(&self, tds: &Tds) -> VertexId {
        self.edge_vertices(tds).0
    }

    /// Destination vertex.
    #[must_use]
    pub fn destination(&self, tds: &Tds) -> VertexId {
        self.edge_vertices(tds).1
    }

    /// The vertex of the triangle not on this dart's edge.
    #[must_use]
    pub fn opposite_vertex(&self, tds: &Tds) -> VertexId {
        tds.triangle(self.triangle).vertex(self.edge())
    }

    /// Next edge of the same triangle, in the dart's own direction of travel.
    ///
    /// The destination of `self` is the origin of the result.
    #[must_use]
    pub fn rotate_same_triangle(&self) -> Self {
        let step = if self.ccw { 1 } else { 2 };
        Self {
            triangle: self.triangle,
            edge: ccw(self.edge(), step) as u8,
            ccw: self.ccw,
        }
    }

    /// Same edge, opposite direction.
    #[must_use]
    pub const fn flip_vertex(&self) -> Self {
        Self {
            triangle: self.triangle,
            edge: self.edge,
            ccw: !self.ccw,
        }
    }

    /// The dart on the other side of the edge, running in the same direction
    /// (and therefore with the opposite orientation relative to its triangle).
    ///
    /// Returns `None` at a boundary edge.
    #[must_use]
    pub fn cross_edge(&self, tds: &Tds) -> Option<Self> {
        let (t2, e2) = tds.adjacent(self.triangle, self.edge())?;
        Some(Self {
            triangle: t2,
            edge: e2 as u8,
            ccw: !self.ccw,
        })
    }

    /// Rotates counter-clockwise around this dart's origin, yielding the next
    /// counter-clockwise dart leaving the same vertex.
    ///
    /// Returns `None` when the rotation hits a boundary edge.
    #[must_use]
    pub fn next_around_origin(&self, tds: &Tds) -> Option<Self> {
        debug_assert!(self.ccw, "rotation is defined for counter-clockwise darts");
        // The third edge of the triangle ends at the origin; crossing it lands
        // on the neighbor's edge that leaves the origin.
        let back = self.rotate_same_triangle().rotate_same_triangle();
        back.cross_edge(tds).map(|d| d.flip_vertex())
    }

    /// Whether the dart names a live triangle.
    #[must_use]
    pub fn is_valid(&self, tds: &Tds) -> bool {
        tds.is_live(self.triangle)
    }

    /// Whether the dart's edge is a boundary edge.
    #[must_use]
    pub fn is_boundary(&self, tds: &Tds) -> bool {
        tds.triangle(self.triangle).neighbor(self.edge()).is_none()
    }

    /// Whether the dart's edge is constrained.
    #[must_use]
    pub fn is_constrained(&self, tds: &Tds) -> bool {
        tds.is_constrained_edge(self.triangle, self.edge())
    }
}
