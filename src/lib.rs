//! # fmesh
//!
//! This is a library for building constrained and refined Delaunay triangulations on planes,
//! spheres and general 2-manifolds, for use as finite-element discretizations.
//!
//! # Features
//!
//! - Incremental Delaunay triangulation over an enclosing polygon (planes) or octahedron (spheres)
//! - Constraint segments with boundary and interior kinds and opaque group ids
//! - Removal of the triangles outside closed boundary polygons
//! - Quality refinement with a minimum angle and global or per-vertex maximum edge lengths
//! - Point location by walking, or through a bounding-box index for repeated queries
//! - Import and export of vertex, triangle and neighbor arrays, serializable with [serde](https://serde.rs)
//!
//! # Basic Usage
//!
//! ```rust
//! use fmesh::prelude::*;
//!
//! let points = [
//!     Point::new2(0.0, 0.0),
//!     Point::new2(2.0, 0.0),
//!     Point::new2(2.0, 1.0),
//!     Point::new2(0.0, 1.0),
//!     Point::new2(1.0, 0.5),
//! ];
//! let mesh = Mesh::new(&points, MeshConfig::default()).unwrap();
//!
//! assert_eq!(mesh.mesh_type(), MeshType::Plane);
//! // Input point `i` is vertex `i`; the 8 enclosure vertices follow.
//! assert_eq!(mesh.vertex_count(), 13);
//! assert_eq!(mesh.point(VertexId(4)), &points[4]);
//! assert!(mesh.validate_delaunay().is_ok());
//! ```
//!
//! # Constrained Meshes
//!
//! Boundary segments close polygons; pruning removes everything outside them, and refinement
//! then improves triangle quality without crossing any segment:
//!
//! ```rust
//! use fmesh::prelude::*;
//!
//! let square = [
//!     Point::new2(0.0, 0.0),
//!     Point::new2(1.0, 0.0),
//!     Point::new2(1.0, 1.0),
//!     Point::new2(0.0, 1.0),
//! ];
//! let boundary: Vec<Segment> = (0..4).map(|i| Segment::from((i, (i + 1) % 4, 0))).collect();
//!
//! let (mut mesh, _) = Mesh::build_constrained(&square, &boundary, &[], MeshConfig::default()).unwrap();
//! mesh.prune_exterior().unwrap();
//!
//! let params = RefinementParametersBuilder::default()
//!     .min_angle_degrees(25.0)
//!     .max_edge(0.3)
//!     .build()
//!     .unwrap();
//! let report = mesh.refine(&params).unwrap();
//! assert!(report.inserted() > 0);
//! assert!(mesh.segments().boundary.len() >= 4);
//! // Input ids are kept, so the first boundary piece starts at vertex 0.
//! assert_eq!(mesh.segments().boundary[0].0, 0);
//! ```
//!
//! # Numerical Robustness
//!
//! Orientation and in-circle tests go through a [`Kernel`](geometry::kernel::Kernel). The default
//! [`RobustKernel`](geometry::kernel::RobustKernel) classifies determinants with a tolerance
//! relative to the input scale; [`FastKernel`](geometry::kernel::FastKernel) evaluates them
//! directly. Points within a relative duplicate distance of an existing vertex are not inserted.
//!
//! ## Limitations
//!
//! 1. **General manifolds** - No enclosing triangulation exists for general 2-manifolds, so such
//!    meshes must start from an imported triangle list ([`Mesh::from_triangles`](core::mesh::Mesh::from_triangles)).
//!
//! 2. **Open boundary chains** - Pruning floods from the exterior and stops only at boundary
//!    segments. A boundary that does not close lets the flood reach the interior.
//!
//! 3. **Small input angles** - Refinement is known to terminate for minimum angles up to about
//!    20.7 degrees when segments meet at 60 degrees or more. Triangles whose small angle lies
//!    between two segments are exempt from the angle criterion, and resource ceilings bound the
//!    remaining cases.

// Forbid unsafe code throughout the entire crate
#![forbid(unsafe_code)]

#[macro_use]
extern crate derive_builder;

/// The `core` module contains the topology store, navigation, location and the meshing algorithms.
///
/// It includes the [`Tds`](core::triangulation_data_structure::Tds) triangle store, the
/// [`Dart`](core::dart::Dart) navigation handle and the [`Mesh`](core::mesh::Mesh) façade.
pub mod core {
    /// Meshing algorithms operating on the topology store
    pub mod algorithms {
        /// Constraint segment insertion
        pub mod constrained;
        /// Enclosing triangulations for planar and spherical input
        pub mod enclosure;
        /// Edge flips and Delaunay repair
        pub mod flips;
        /// Incremental point insertion
        pub mod incremental_insertion;
        /// Removal of exterior triangles
        pub mod prune;
        /// Quality refinement
        pub mod refinement;
    }
    /// Import and export of index arrays
    pub mod arrays;
    /// High-performance collection types optimized for computational geometry
    pub mod collections;
    /// Explicit configuration for construction and refinement
    pub mod config;
    /// Oriented (triangle, edge) handles
    pub mod dart;
    /// Canonical undirected edge keys
    pub mod edge;
    /// Point location by walking
    pub mod locate;
    pub mod mesh;
    /// Bounding-box index for repeated point location
    pub mod triangle_locator;
    pub mod triangulation_data_structure;
    // Note: collections module not re-exported here to avoid namespace pollution
    pub use dart::*;
    pub use mesh::*;
    pub use triangulation_data_structure::*;
}

/// Contains geometric types including the `Point` struct and geometry predicates.
///
/// Predicates evaluate in a [`Frame`](geometry::predicates::Frame) that fixes how a triangle is
/// seen: from above for planes, from outside for spheres, and along the triangle normal for
/// general manifolds.
pub mod geometry {
    /// Predicate kernels
    pub mod kernel;
    /// Plane, sphere and general manifold classification
    pub mod mesh_type;
    pub mod point;
    pub mod predicates;
    /// Angle, edge-length and radius-ratio measures of triangles
    pub mod quality;
    /// Enhanced predicates with improved numerical robustness
    pub mod robust_predicates;
    pub use kernel::*;
    pub use mesh_type::*;
    pub use point::*;
    pub use predicates::*;
}

/// A prelude module that re-exports commonly used types.
/// This makes it easier to import the most commonly used items from the crate.
pub mod prelude {
    // Re-export from core
    pub use crate::core::{
        algorithms::{
            constrained::{ConstraintError, ConstraintReport, Segment},
            prune::{PruneError, PruneReport},
            refinement::{RefinementError, RefinementReport},
        },
        arrays::{ArraysError, MeshArrays, SegmentArrays},
        config::{
            EnclosureConfig, MeshConfig, MeshConfigBuilder, RefinementParameters,
            RefinementParametersBuilder, Tolerances,
        },
        dart::Dart,
        edge::EdgeKey,
        mesh::*,
        triangle_locator::TriangleLocator,
        triangulation_data_structure::{
            ConstraintKind, ConstraintTag, Tds, TdsValidationError, Triangle, TriangleId, VertexId,
        },
    };

    // Re-export commonly used collection types from core::collections
    pub use crate::core::collections::{
        FastHashMap, FastHashSet, SmallBuffer, fast_hash_map_with_capacity,
        fast_hash_set_with_capacity,
    };

    // Re-export from geometry
    pub use crate::geometry::{
        kernel::*, mesh_type::MeshType, point::Point, predicates::*, quality::*,
    };
}

/// The function `is_normal` checks that structs implement `auto` traits.
/// Traits are checked at compile time, so this function is only used for
/// testing.
#[must_use]
pub const fn is_normal<T: Sized + Send + Sync + Unpin>() -> bool {
    true
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::{
        core::{mesh::Mesh, triangulation_data_structure::Tds},
        geometry::{kernel::RobustKernel, point::Point},
        is_normal,
    };

    // =============================================================================
    // TYPE SAFETY TESTS
    // =============================================================================

    #[test]
    fn normal_types() {
        assert!(is_normal::<Point>());
        assert!(is_normal::<Tds>());
        assert!(is_normal::<RobustKernel>());
        assert!(is_normal::<Mesh>());
    }

    #[test]
    fn test_prelude_collections_exports() {
        use crate::prelude::*;

        let mut map: FastHashMap<u64, usize> = FastHashMap::default();
        map.insert(123, 456);
        assert_eq!(map.get(&123), Some(&456));

        let mut set: FastHashSet<u64> = FastHashSet::default();
        set.insert(789);
        assert!(set.contains(&789));

        let mut buffer: SmallBuffer<i32, 8> = SmallBuffer::new();
        buffer.push(42);
        assert_eq!(buffer.len(), 1);

        let map_with_cap = fast_hash_map_with_capacity::<u64, usize>(100);
        assert!(map_with_cap.capacity() >= 100);

        let set_with_cap = fast_hash_set_with_capacity::<u64>(50);
        assert!(set_with_cap.capacity() >= 50);
    }

    #[test]
    fn test_prelude_quality_exports() {
        use crate::prelude::*;

        let points = [
            Point::new2(0.0, 0.0),
            Point::new2(1.0, 0.0),
            Point::new2(0.0, 1.0),
        ];
        let mesh = Mesh::new(&points, MeshConfig::default()).unwrap();
        let t = mesh.tds().triangle_ids().next().unwrap();

        let ratio = radius_ratio(mesh.tds().triangle_points(t)).unwrap();
        assert!(ratio > 0.0);
        let (smallest, _) = min_angle(mesh.tds().triangle_points(t)).unwrap();
        assert!(smallest > 0.0);
    }
}
