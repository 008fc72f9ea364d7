//! Hash-map, hash-set and small-buffer aliases used throughout the mesh code.
//!
//! All internal maps are keyed by dense integer ids or vertex pairs that the
//! crate produces itself, so a fast non-cryptographic hasher is appropriate.
//! Local traversals (vertex stars, flip worklists of a single insertion,
//! candidate lists) are usually tiny and live in stack-allocated buffers.

use rustc_hash::{FxBuildHasher, FxHashMap, FxHashSet, FxHasher};
use smallvec::SmallVec;

use crate::core::triangulation_data_structure::{TriangleId, VertexId};

// =============================================================================
// CORE OPTIMIZED TYPES
// =============================================================================

/// Optimized `HashMap` using `FastHasher` (`rustc_hash::FxHasher`).
///
/// # Security Warning
///
/// ⚠️ **Not DoS-resistant**: Do not use with attacker-controlled keys.
///
/// # Examples
///
/// ```rust
/// use fmesh::core::collections::FastHashMap;
///
/// let mut map: FastHashMap<u64, usize> = FastHashMap::default();
/// map.insert(123, 456);
/// ```
pub type FastHashMap<K, V> = FxHashMap<K, V>;

/// Optimized `HashSet` using `FastHasher`.
pub type FastHashSet<T> = FxHashSet<T>;

/// Fast non-cryptographic hasher alias for internal collections.
pub type FastHasher = FxHasher;

/// Build hasher that instantiates [`FastHasher`].
pub type FastBuildHasher = FxBuildHasher;

/// Re-export the Entry enum for `FastHashMap`.
pub use std::collections::hash_map::Entry;

/// Small-optimized Vec: inline storage for up to `N` elements, heap beyond.
///
/// # Examples
///
/// ```rust
/// use fmesh::core::collections::SmallBuffer;
///
/// let mut buffer: SmallBuffer<i32, 8> = SmallBuffer::new();
/// for i in 0..5 {
///     buffer.push(i);
/// }
/// assert!(!buffer.spilled());
/// ```
pub type SmallBuffer<T, const N: usize> = SmallVec<[T; N]>;

// =============================================================================
// SEMANTIC SIZE CONSTANTS AND TYPE ALIASES
// =============================================================================

/// Typical vertex degree in a Delaunay triangulation is six; leave headroom.
pub const VERTEX_STAR_BUFFER_SIZE: usize = 16;

/// Inline capacity for triangle candidate lists produced by one query.
pub const CANDIDATE_BUFFER_SIZE: usize = 8;

/// Triangles incident to one vertex, in rotation order.
pub type VertexStarBuffer = SmallBuffer<TriangleId, VERTEX_STAR_BUFFER_SIZE>;

/// Candidate triangles from a spatial query.
pub type TriangleCandidateBuffer = SmallBuffer<TriangleId, CANDIDATE_BUFFER_SIZE>;

/// Vertex ids collected during a local traversal.
pub type VertexIdBuffer = SmallBuffer<VertexId, VERTEX_STAR_BUFFER_SIZE>;

/// Set of triangle ids.
pub type TriangleIdSet = FastHashSet<TriangleId>;

// =============================================================================
// UTILITY FUNCTIONS
// =============================================================================

/// Creates a `FastHashMap` with pre-allocated capacity.
#[inline]
#[must_use]
pub fn fast_hash_map_with_capacity<K, V>(capacity: usize) -> FastHashMap<K, V> {
    FastHashMap::with_capacity_and_hasher(capacity, FastBuildHasher::default())
}

/// Creates a `FastHashSet` with pre-allocated capacity.
#[inline]
#[must_use]
pub fn fast_hash_set_with_capacity<T>(capacity: usize) -> FastHashSet<T> {
    FastHashSet::with_capacity_and_hasher(capacity, FastBuildHasher::default())
}
