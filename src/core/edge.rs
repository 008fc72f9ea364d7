//! Canonical edge identifiers.
//!
//! Edges are not stored explicitly; they are inferred from triangles. An
//! `EdgeKey` identifies an edge purely by its two endpoint [`VertexId`]s,
//! canonicalized so that `(a, b)` and `(b, a)` map to the same key. Because
//! vertex ids are dense integers assigned in insertion order, `EdgeKey`
//! ordering is deterministic across runs and round-trips.

use crate::core::triangulation_data_structure::VertexId;

/// Canonical identifier for an (undirected) edge.
///
/// # Examples
///
/// ```rust
/// use fmesh::core::edge::EdgeKey;
/// use fmesh::core::triangulation_data_structure::VertexId;
///
/// let e1 = EdgeKey::new(VertexId(7), VertexId(2));
/// let e2 = EdgeKey::new(VertexId(2), VertexId(7));
/// assert_eq!(e1, e2);
/// assert_eq!(e1.endpoints(), (VertexId(2), VertexId(7)));
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeKey {
    v0: VertexId,
    v1: VertexId,
}

impl EdgeKey {
    /// Creates a new canonical edge key with `v0 <= v1`.
    #[must_use]
    pub fn new(a: VertexId, b: VertexId) -> Self {
        if a <= b {
            Self { v0: a, v1: b }
        } else {
            Self { v0: b, v1: a }
        }
    }

    /// Returns the smaller endpoint.
    #[inline]
    #[must_use]
    pub const fn v0(self) -> VertexId {
        self.v0
    }

    /// Returns the larger endpoint.
    #[inline]
    #[must_use]
    pub const fn v1(self) -> VertexId {
        self.v1
    }

    /// Returns the two endpoints as a tuple.
    #[inline]
    #[must_use]
    pub const fn endpoints(self) -> (VertexId, VertexId) {
        (self.v0, self.v1)
    }

    /// Returns `true` if `v` is one of the endpoints.
    #[inline]
    #[must_use]
    pub fn contains(self, v: VertexId) -> bool {
        self.v0 == v || self.v1 == v
    }

    /// The endpoint that is not `v`, if `v` is an endpoint.
    #[must_use]
    pub fn other(self, v: VertexId) -> Option<VertexId> {
        if self.v0 == v {
            Some(self.v1)
        } else if self.v1 == v {
            Some(self.v0)
        } else {
            None
        }
    }
}

impl From<(VertexId, VertexId)> for EdgeKey {
    #[inline]
    fn from((a, b): (VertexId, VertexId)) -> Self {
        Self::new(a, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_key_is_canonical() {
        let e1 = EdgeKey::new(VertexId(4), VertexId(1));
        let e2: EdgeKey = (VertexId(1), VertexId(4)).into();
        assert_eq!(e1, e2);
        assert!(e1.v0() <= e1.v1());
    }

    #[test]
    fn edge_key_other_endpoint() {
        let e = EdgeKey::new(VertexId(3), VertexId(9));
        assert!(e.contains(VertexId(9)));
        assert_eq!(e.other(VertexId(9)), Some(VertexId(3)));
        assert_eq!(e.other(VertexId(5)), None);
    }
}
