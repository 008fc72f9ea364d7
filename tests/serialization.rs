//! Serialization of exported meshes and re-import of the arrays.

use fmesh::core::arrays::ArraysError;
use fmesh::core::mesh::{Mesh, MeshError};
use fmesh::prelude::*;

fn pruned_square_with_interior() -> Mesh {
    let points = vec![
        Point::new2(0.0, 0.0),
        Point::new2(1.0, 0.0),
        Point::new2(1.0, 1.0),
        Point::new2(0.0, 1.0),
        Point::new2(0.25, 0.5),
        Point::new2(0.75, 0.5),
        Point::new2(0.5, 0.2),
    ];
    let boundary: Vec<Segment> = (0..4).map(|i| Segment::from((i, (i + 1) % 4, 1))).collect();
    let interior = [Segment::from((4, 5, 2))];
    let (mut mesh, _) =
        Mesh::build_constrained(&points, &boundary, &interior, MeshConfig::default()).unwrap();
    mesh.prune_exterior().unwrap();
    mesh
}

#[test]
fn test_arrays_json_round_trip() {
    let mesh = pruned_square_with_interior();
    let arrays = mesh.to_arrays();
    assert_eq!(arrays.triangles.len(), mesh.triangle_count());
    assert_eq!(arrays.vertices.len(), mesh.vertex_count());

    let json = serde_json::to_string(&arrays).unwrap();
    let back: MeshArrays = serde_json::from_str(&json).unwrap();
    assert_eq!(back, arrays);

    let segments = mesh.segments();
    let json = serde_json::to_string(&segments).unwrap();
    let segments_back: SegmentArrays = serde_json::from_str(&json).unwrap();
    assert_eq!(segments_back, segments);
    assert_eq!(segments_back.boundary.len(), 4);
    assert_eq!(segments_back.interior, vec![(4, 5, 2)]);
    assert_eq!(segments_back.boundary[0], (0, 1, 1));
    assert_eq!(back.vertices[6], [0.5, 0.2, 0.0]);
}

#[test]
fn test_reimported_mesh_matches() {
    let mesh = pruned_square_with_interior();
    let arrays = mesh.to_arrays();
    let mut copy = Mesh::from_arrays(&arrays, MeshConfig::default()).unwrap();

    assert_eq!(copy.triangle_count(), mesh.triangle_count());
    assert!(copy.is_valid().is_ok());
    assert_eq!(copy.to_arrays(), arrays);

    // Constraints travel separately and can be re-applied.
    let segments = mesh.segments();
    let report = copy.insert_boundary(&segments.segments(ConstraintKind::Boundary));
    assert_eq!(report.already_present, 4);
    let report = copy.insert_interior(&segments.segments(ConstraintKind::Interior));
    assert_eq!(report.already_present, 1);
    assert_eq!(copy.segments(), segments);

    let q = Point::new2(0.6, 0.7);
    let a = mesh.locate(&q, None).unwrap();
    let b = copy.locate(&q, None).unwrap();
    let sorted = |m: &Mesh, d: Dart| {
        let mut v = m.tds().triangle(d.triangle_id()).vertices();
        v.sort_unstable();
        v
    };
    assert_eq!(sorted(&mesh, a), sorted(&copy, b));
}

#[test]
fn test_links_are_derived_when_missing() {
    let mesh = pruned_square_with_interior();
    let mut arrays = mesh.to_arrays();
    arrays.neighbors.clear();
    arrays.neighbor_edges = None;
    arrays.vertex_triangle = None;

    let copy = Mesh::from_arrays(&arrays, MeshConfig::default()).unwrap();
    assert_eq!(copy.to_arrays().neighbors, mesh.to_arrays().neighbors);
}

#[test]
fn test_corrupt_arrays_are_rejected() {
    let mesh = pruned_square_with_interior();
    let mut arrays = mesh.to_arrays();
    arrays.neighbors.pop();
    assert!(matches!(
        Mesh::from_arrays(&arrays, MeshConfig::default()),
        Err(MeshError::Arrays(ArraysError::LengthMismatch { .. }))
    ));

    let mut arrays = mesh.to_arrays();
    arrays.vertices[9][0] = f64::INFINITY;
    assert!(matches!(
        Mesh::from_arrays(&arrays, MeshConfig::default()),
        Err(MeshError::Arrays(ArraysError::NonFiniteVertex { index: 9 }))
    ));
}

#[test]
fn test_segment_serde() {
    let segment = Segment::from((3, 4, -1));
    let json = serde_json::to_string(&segment).unwrap();
    let back: Segment = serde_json::from_str(&json).unwrap();
    assert_eq!(back, segment);
}
