//! Integration tests for quality refinement of pruned meshes.

use approx::assert_relative_eq;
use fmesh::core::mesh::{Mesh, MeshError};
use fmesh::prelude::*;

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

fn closed_loop(n: usize) -> Vec<Segment> {
    (0..n).map(|i| Segment::from((i, (i + 1) % n, 0))).collect()
}

fn pruned(points: &[Point]) -> Mesh {
    init_tracing();
    let (mut mesh, report) =
        Mesh::build_constrained(points, &closed_loop(points.len()), &[], MeshConfig::default())
            .unwrap();
    assert!(report.boundary.errors.is_empty());
    mesh.prune_exterior().unwrap();
    mesh
}

fn unit_square() -> Vec<Point> {
    vec![
        Point::new2(0.0, 0.0),
        Point::new2(1.0, 0.0),
        Point::new2(1.0, 1.0),
        Point::new2(0.0, 1.0),
    ]
}

fn assert_quality(mesh: &Mesh, min_angle_degrees: f64, max_edge: f64) {
    for t in mesh.tds().triangle_ids() {
        let tri = mesh.tds().triangle_points(t);
        let (angle, _) = min_angle(tri).unwrap();
        assert!(
            angle.to_degrees() >= min_angle_degrees - 1e-6,
            "triangle {t:?} has angle {}",
            angle.to_degrees()
        );
        assert!(max_edge_length(tri) <= max_edge * (1.0 + 1e-9));
    }
}

/// Every boundary vertex has exactly two boundary segments.
fn assert_boundary_closed(mesh: &Mesh) {
    let mut degree = vec![0_usize; mesh.vertex_count()];
    for &(a, b, _) in &mesh.segments().boundary {
        degree[a] += 1;
        degree[b] += 1;
    }
    assert!(degree.iter().all(|&d| d == 0 || d == 2));
}

#[test]
fn test_square_meets_angle_and_size() {
    let mut mesh = pruned(&unit_square());
    let params = RefinementParametersBuilder::default()
        .min_angle_degrees(25.0)
        .max_edge(0.3)
        .build()
        .unwrap();
    let report = mesh.refine(&params).unwrap();

    assert!(report.inserted() > 0);
    assert_eq!(report.remaining_bad, 0);
    assert_quality(&mesh, 25.0, 0.3);
    assert_boundary_closed(&mesh);
    assert!(mesh.is_valid().is_ok());
    assert!(mesh.validate_delaunay().is_ok());

    // Total area is preserved.
    let total: f64 = mesh
        .tds()
        .triangle_ids()
        .map(|t| area(mesh.tds().triangle_points(t)))
        .sum();
    assert_relative_eq!(total, 1.0, epsilon = 1e-9);
}

#[test]
fn test_refinement_is_idempotent() {
    let mut mesh = pruned(&[
        Point::new2(0.0, 0.0),
        Point::new2(3.0, 0.0),
        Point::new2(3.0, 0.4),
        Point::new2(1.0, 2.0),
        Point::new2(0.0, 1.0),
    ]);
    let params = RefinementParametersBuilder::default()
        .min_angle_degrees(20.0)
        .off_center(true)
        .build()
        .unwrap();
    mesh.refine(&params).unwrap();
    let triangles = mesh.triangle_count();
    let again = mesh.refine(&params).unwrap();
    assert_eq!(again.inserted(), 0);
    assert_eq!(mesh.triangle_count(), triangles);
}

#[test]
fn test_interior_segment_survives_refinement() {
    let points = vec![
        Point::new2(0.0, 0.0),
        Point::new2(2.0, 0.0),
        Point::new2(2.0, 2.0),
        Point::new2(0.0, 2.0),
        Point::new2(0.5, 0.5),
        Point::new2(1.5, 1.5),
    ];
    let interior = [Segment::from((4, 5, 9))];
    let (mut mesh, _) =
        Mesh::build_constrained(&points, &closed_loop(4), &interior, MeshConfig::default())
            .unwrap();
    mesh.prune_exterior().unwrap();
    let params = RefinementParametersBuilder::default()
        .max_edge(0.25)
        .build()
        .unwrap();
    mesh.refine(&params).unwrap();

    let interior = mesh.segments().interior;
    assert!(interior.len() > 1);
    assert!(interior.iter().all(|&(_, _, g)| g == 9));
    let length: f64 = interior
        .iter()
        .map(|&(a, b, _)| mesh.point(VertexId(a)).distance(mesh.point(VertexId(b))))
        .sum();
    assert_relative_eq!(length, 2.0_f64.sqrt(), epsilon = 1e-9);
    assert_boundary_closed(&mesh);
    assert_quality(&mesh, 21.0, 0.25);
}

#[test]
fn test_per_vertex_bounds_grade_the_mesh() {
    let mut mesh = pruned(&[
        Point::new2(0.0, 0.0),
        Point::new2(4.0, 0.0),
        Point::new2(4.0, 1.0),
        Point::new2(0.0, 1.0),
    ]);
    let mut bounds = vec![0.0; mesh.vertex_count()];
    // Input corners are vertices 0..4.
    bounds[..4].copy_from_slice(&[0.1, 1.0, 1.0, 0.1]);
    let params = RefinementParametersBuilder::default()
        .per_vertex_max_edge(bounds)
        .build()
        .unwrap();
    mesh.refine(&params).unwrap();

    let (mut left, mut right) = (0, 0);
    for t in mesh.tds().triangle_ids() {
        let [a, b, c] = mesh.tds().triangle_points(t);
        let x = (a.x() + b.x() + c.x()) / 3.0;
        if x < 1.0 {
            left += 1;
        } else if x > 3.0 {
            right += 1;
        }
    }
    assert!(left > right);
    assert_eq!(mesh.vertex_bounds().len(), mesh.vertex_count());
}

#[test]
fn test_ceiling_leaves_valid_mesh() {
    let mut mesh = pruned(&unit_square());
    let params = RefinementParametersBuilder::default()
        .max_edge(0.01)
        .max_steiner_points(10_usize)
        .build()
        .unwrap();
    let err = mesh.refine(&params).unwrap_err();
    let MeshError::Refinement(RefinementError::CeilingReached { report }) = err else {
        panic!("expected ceiling, got {err:?}");
    };
    assert_eq!(report.inserted(), 10);
    assert!(mesh.is_valid().is_ok());
    assert!(mesh.validate_delaunay().is_ok());
}

#[test]
fn test_invalid_parameters_are_rejected() {
    assert!(
        RefinementParametersBuilder::default()
            .min_angle_degrees(61.0)
            .build()
            .is_err()
    );
    let mut mesh = pruned(&unit_square());
    let params = RefinementParameters {
        min_angle_degrees: f64::NAN,
        ..RefinementParameters::default()
    };
    assert!(matches!(
        mesh.refine(&params),
        Err(MeshError::Refinement(RefinementError::InvalidParameters { .. }))
    ));
}

#[test]
fn test_sphere_refinement_stays_on_sphere() {
    let points: Vec<Point> = (0..20)
        .map(|i| {
            let z = 1.0 - (2.0 * f64::from(i) + 1.0) / 20.0;
            let r = (1.0 - z * z).sqrt();
            let phi = 2.4 * f64::from(i);
            Point::new([r * phi.cos(), r * phi.sin(), z])
        })
        .collect();
    init_tracing();
    let mut mesh = Mesh::new(&points, MeshConfig::default()).unwrap();
    let before = mesh.vertex_count();
    let params = RefinementParametersBuilder::default()
        .max_edge(0.5)
        .build()
        .unwrap();
    mesh.refine(&params).unwrap();

    assert!(mesh.vertex_count() > before);
    for v in mesh.tds().vertex_ids() {
        assert_relative_eq!(mesh.point(v).norm(), 1.0, epsilon = 1e-9);
    }
    assert!(mesh.is_valid().is_ok());
}
