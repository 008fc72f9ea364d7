//! Property-based tests for mesh invariants.
//!
//! ## Invariants Tested
//!
//! - **Structural validity** - neighbor links are mutual and triangles positively oriented
//! - **Delaunay property** - every unconstrained edge is locally Delaunay
//! - **Euler characteristic** - `F = 2V - h - 2` over the enclosing polygon
//! - **Location** - every inserted vertex is found, by walking and by the locator
//! - **Boundary recovery** - a random convex boundary is present after insertion
//! - **Array round trip** - exported arrays re-import to the same arrays

use fmesh::core::mesh::{Mesh, PointOutcome};
use fmesh::prelude::*;
use proptest::prelude::*;

// =============================================================================
// TEST CONFIGURATION
// =============================================================================

/// Strategy for generating finite f64 coordinates in a reasonable range
fn finite_coordinate() -> impl Strategy<Value = f64> {
    (-100.0..100.0).prop_filter("must be finite", |x: &f64| x.is_finite())
}

/// Strategy for generating planar points
fn point_2d() -> impl Strategy<Value = Point> {
    (finite_coordinate(), finite_coordinate()).prop_map(|(x, y)| Point::new2(x, y))
}

/// Strategy for generating a small point set (3-40 points)
fn small_point_set() -> impl Strategy<Value = Vec<Point>> {
    prop::collection::vec(point_2d(), 3..=40)
}

/// Strategy for a convex polygon: sorted angles on a circle
fn convex_polygon() -> impl Strategy<Value = Vec<Point>> {
    prop::collection::vec(0.0..std::f64::consts::TAU, 3..=12).prop_map(|mut angles| {
        angles.sort_by(f64::total_cmp);
        angles.dedup_by(|a, b| (*a - *b).abs() < 0.05);
        angles
            .into_iter()
            .map(|a| Point::new2(10.0 * a.cos(), 10.0 * a.sin()))
            .collect()
    })
}

fn inserted(outcomes: &[PointOutcome]) -> usize {
    outcomes
        .iter()
        .filter(|o| matches!(o, PointOutcome::Inserted(_)))
        .count()
}

// =============================================================================
// CONSTRUCTION PROPERTIES
// =============================================================================

proptest! {
    #[test]
    fn prop_mesh_is_valid_and_delaunay(points in small_point_set()) {
        let mut mesh = Mesh::with_enclosure(&points, MeshConfig::default()).unwrap();
        let outcomes = mesh.insert_points(&points).unwrap();

        prop_assert!(mesh.is_valid().is_ok(), "invalid mesh: {:?}", mesh.is_valid().err());
        prop_assert!(
            mesh.validate_delaunay().is_ok(),
            "not Delaunay: {:?}",
            mesh.validate_delaunay().err()
        );
        prop_assert_eq!(mesh.vertex_count(), 8 + inserted(&outcomes));
        prop_assert_eq!(mesh.triangle_count(), 2 * mesh.vertex_count() - 8 - 2);
    }

    #[test]
    fn prop_every_vertex_is_located(points in small_point_set()) {
        let mesh = Mesh::new(&points, MeshConfig::default()).unwrap();
        let locator = mesh.triangle_locator();
        for (i, v) in mesh.tds().vertex_ids().enumerate() {
            let p = *mesh.point(v);
            if i < points.len() {
                prop_assert_eq!(p, points[i]);
            }
            // Duplicates keep their id but no triangle.
            if mesh.tds().vertex_triangle(v).is_none() {
                continue;
            }
            let dart = mesh.locate(&p, None);
            prop_assert!(dart.is_some());
            let t = dart.unwrap().triangle_id();
            prop_assert!(mesh.tds().triangle(t).contains_vertex(v));
            prop_assert!(locator.locate(&p).is_some());
        }
    }

    #[test]
    fn prop_duplicates_are_absorbed(points in small_point_set()) {
        let mut mesh = Mesh::with_enclosure(&points, MeshConfig::default()).unwrap();
        let first = mesh.insert_points(&points).unwrap();
        let triangles = mesh.triangle_count();
        let second = mesh.insert_points(&points).unwrap();

        prop_assert_eq!(inserted(&second), 0);
        prop_assert_eq!(mesh.triangle_count(), triangles);
        for (a, b) in first.iter().zip(&second) {
            prop_assert_eq!(a.vertex(), b.vertex());
        }
    }
}

// =============================================================================
// CONSTRAINT AND EXPORT PROPERTIES
// =============================================================================

proptest! {
    #[test]
    fn prop_convex_boundary_is_recovered(
        polygon in convex_polygon(),
        interior in prop::collection::vec((-5.0..5.0f64, -5.0..5.0f64), 0..20),
    ) {
        prop_assume!(polygon.len() >= 3);
        let n = polygon.len();
        let mut points = polygon.clone();
        points.extend(interior.into_iter().map(|(x, y)| Point::new2(x, y)));
        let boundary: Vec<Segment> =
            (0..n).map(|i| Segment::from((i, (i + 1) % n, 0))).collect();

        let (mut mesh, report) =
            Mesh::build_constrained(&points, &boundary, &[], MeshConfig::default()).unwrap();
        prop_assert!(report.boundary.errors.is_empty());
        for s in &boundary {
            let a = report.points[s.from.0].vertex().unwrap();
            let b = report.points[s.to.0].vertex().unwrap();
            prop_assert!(mesh.tds().is_constrained(a, b));
        }

        mesh.prune_exterior().unwrap();
        prop_assert!(mesh.is_valid().is_ok());
        prop_assert!(mesh.validate_delaunay().is_ok());
        prop_assert!(mesh.triangle_count() >= n - 2);
    }

    #[test]
    fn prop_arrays_round_trip(points in small_point_set()) {
        let mesh = Mesh::new(&points, MeshConfig::default()).unwrap();
        let arrays = mesh.to_arrays();
        let copy = Mesh::from_arrays(&arrays, MeshConfig::default()).unwrap();
        prop_assert_eq!(copy.to_arrays(), arrays);
        prop_assert!(copy.validate_delaunay().is_ok());
    }
}
