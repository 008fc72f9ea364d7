//! The mesh: topology store, predicates and configuration in one value.
//!
//! [`Mesh`] owns a [`Tds`] and drives every algorithm of the crate on it:
//!
//! - construction over an enclosing triangulation ([`Mesh::new`],
//!   [`Mesh::with_enclosure`]) or from an existing triangle list
//!   ([`Mesh::from_triangles`], [`Mesh::from_arrays`])
//! - stable vertex ids: input point `i` of [`Mesh::new`] and
//!   [`Mesh::build_constrained`] is vertex `i`; enclosure vertices and
//!   refinement vertices follow the input
//! - point insertion with a remembered walk hint
//! - constraint segments, exterior pruning and quality refinement
//! - point location, array export and validation
//!
//! After every public mutation the mesh is a valid (constrained) Delaunay
//! triangulation, unless an error says otherwise.
//!
//! # Examples
//!
//! ```rust
//! use fmesh::prelude::*;
//!
//! let points = [
//!     Point::new2(0.0, 0.0),
//!     Point::new2(1.0, 0.0),
//!     Point::new2(1.0, 1.0),
//!     Point::new2(0.0, 1.0),
//! ];
//! let boundary: Vec<Segment> = (0..4).map(|i| Segment::from((i, (i + 1) % 4, 0))).collect();
//! let (mut mesh, report) =
//!     Mesh::build_constrained(&points, &boundary, &[], MeshConfig::default()).unwrap();
//! assert!(report.boundary.errors.is_empty());
//!
//! mesh.prune_exterior().unwrap();
//! assert_eq!(mesh.triangle_count(), 2);
//!
//! let params = RefinementParametersBuilder::default().max_edge(0.4).build().unwrap();
//! mesh.refine(&params).unwrap();
//! assert!(mesh.is_valid().is_ok());
//! assert!(mesh.locate(&Point::new2(1000.0, 1000.0), None).is_none());
//! ```

use thiserror::Error;

use crate::core::algorithms::constrained::{ConstraintReport, Segment, insert_segments};
use crate::core::algorithms::enclosure::{EnclosureError, build_enclosure};
use crate::core::algorithms::flips::verify_delaunay;
use crate::core::algorithms::incremental_insertion::{
    InsertOptions, InsertionError, insert_located, insert_stored_vertex,
};
use crate::core::algorithms::prune::{PruneError, PruneReport, prune_exterior};
use crate::core::algorithms::refinement::{RefinementError, RefinementReport, refine};
use crate::core::arrays::{ArraysError, MeshArrays, SegmentArrays};
use crate::core::config::{MeshConfig, RefinementParameters};
use crate::core::dart::Dart;
use crate::core::locate::{LocateError, LocateResult, locate, locate_exhaustive, locate_from};
use crate::core::triangle_locator::TriangleLocator;
use crate::core::triangulation_data_structure::{
    ConstraintKind, Tds, TdsImportError, TdsValidationError, VertexId,
};
use crate::geometry::kernel::{Kernel, RobustKernel};
use crate::geometry::mesh_type::MeshType;
use crate::geometry::point::Point;
use crate::geometry::predicates::{Frame, Orientation};

/// Errors raised by [`Mesh`] operations.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum MeshError {
    /// The enclosing triangulation could not be built.
    #[error("Enclosure error: {0}")]
    Enclosure(#[from] EnclosureError),
    /// A triangle list was rejected.
    #[error("Import error: {0}")]
    Import(#[from] TdsImportError),
    /// Mesh arrays were rejected.
    #[error("Array import error: {0}")]
    Arrays(#[from] ArraysError),
    /// A point could not be inserted.
    #[error("Insertion error: {0}")]
    Insertion(#[from] InsertionError),
    /// Point location failed.
    #[error("Location error: {0}")]
    Location(#[from] LocateError),
    /// Exterior pruning failed.
    #[error("Prune error: {0}")]
    Prune(#[from] PruneError),
    /// Refinement failed or stopped at a ceiling.
    #[error("Refinement error: {0}")]
    Refinement(#[from] RefinementError),
    /// The mesh failed validation.
    #[error("Validation error: {0}")]
    Validation(#[from] TdsValidationError),
}

/// What happened to one input point of a bulk insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointOutcome {
    /// Inserted as a new vertex.
    Inserted(VertexId),
    /// Coincides with an existing vertex, which stands in for it.
    Duplicate(VertexId),
    /// Outside the triangulated region; not inserted.
    NotLocatable,
}

impl PointOutcome {
    /// The vertex representing the input point, if any.
    #[must_use]
    pub const fn vertex(&self) -> Option<VertexId> {
        match self {
            Self::Inserted(v) | Self::Duplicate(v) => Some(*v),
            Self::NotLocatable => None,
        }
    }
}

/// Result of [`Mesh::build_constrained`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Outcome per input point, in input order.
    pub points: Vec<PointOutcome>,
    /// Boundary segment insertion.
    pub boundary: ConstraintReport,
    /// Interior segment insertion.
    pub interior: ConstraintReport,
}

/// A triangle mesh over a plane, a sphere or a general 2-manifold.
#[derive(Clone, Debug)]
pub struct Mesh<K: Kernel = RobustKernel> {
    tds: Tds,
    kernel: K,
    mesh_type: MeshType,
    config: MeshConfig,
    enclosure: Vec<VertexId>,
    hint: Option<Dart>,
    duplicate_distance: f64,
    vertex_bounds: Vec<f64>,
}

fn default_kernel(config: &MeshConfig) -> RobustKernel {
    RobustKernel::with_relative_tolerance(config.tolerances.predicate)
}

/// Folds the recoverable insertion errors into a [`PointOutcome`].
fn counted(result: Result<VertexId, MeshError>, point: &Point) -> Result<PointOutcome, MeshError> {
    match result {
        Ok(v) => Ok(PointOutcome::Inserted(v)),
        Err(MeshError::Insertion(InsertionError::DuplicatePoint { existing })) => {
            Ok(PointOutcome::Duplicate(existing))
        }
        Err(MeshError::Insertion(InsertionError::PointNotLocatable)) => {
            tracing::warn!("[insert] point {point:?} is outside the mesh");
            Ok(PointOutcome::NotLocatable)
        }
        Err(err) => Err(err),
    }
}

fn coordinate_scale(points: &[Point]) -> f64 {
    points
        .iter()
        .map(Point::max_abs_coordinate)
        .fold(0.0, f64::max)
}

impl Mesh<RobustKernel> {
    /// Builds the Delaunay triangulation of `points` over an enclosing
    /// triangulation.
    ///
    /// Input point `i` becomes vertex `i`. A duplicate keeps its id but is
    /// used by no triangle.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::Enclosure`] for manifold input or non-finite
    /// coordinates, and insertion errors other than duplicates.
    pub fn new(points: &[Point], config: MeshConfig) -> Result<Self, MeshError> {
        Self::with_kernel(default_kernel(&config), points, config)
    }

    /// An enclosing triangulation large enough for `extent`, with no input
    /// point inserted yet. The enclosure takes the first vertex ids; points
    /// inserted later are numbered after it.
    ///
    /// # Errors
    ///
    /// See [`build_enclosure`].
    pub fn with_enclosure(extent: &[Point], config: MeshConfig) -> Result<Self, MeshError> {
        Self::enclosure_with_kernel(default_kernel(&config), extent, config)
    }

    /// Builds a constrained mesh: segment endpoints first, then the
    /// segments, then the remaining points.
    ///
    /// Segment endpoints are indices into `points`, and input point `i` is
    /// vertex `i` of the result, so exported segments use the caller's
    /// indices. Inserting constraints before the other points makes later
    /// points on a segment split it instead of blocking it.
    ///
    /// # Errors
    ///
    /// As for [`Mesh::new`]. Rejected segments are reported in the
    /// [`BuildReport`] and skipped.
    pub fn build_constrained(
        points: &[Point],
        boundary: &[Segment],
        interior: &[Segment],
        config: MeshConfig,
    ) -> Result<(Self, BuildReport), MeshError> {
        let mut mesh = Self::seeded(default_kernel(&config), points, config)?;
        let report = mesh.link_constrained(points.len(), boundary, interior)?;
        Ok((mesh, report))
    }

    /// Imports a triangle list.
    ///
    /// Triangles are oriented consistently and, for planar and spherical
    /// meshes, positively; neighbor links are derived from shared edges.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::Import`] for invalid or non-manifold input and
    /// [`MeshError::Validation`] when components disagree in orientation.
    pub fn from_triangles(
        points: Vec<Point>,
        triangles: &[[usize; 3]],
        config: MeshConfig,
    ) -> Result<Self, MeshError> {
        let tds = Tds::from_triangles(
            points,
            triangles,
            config.track_neighbor_edges,
            config.track_vertex_triangles,
        )?;
        Self::from_tds(default_kernel(&config), tds, config, true)
    }

    /// Imports exported arrays; the inverse of [`Mesh::to_arrays`].
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::Arrays`] for inconsistent arrays.
    pub fn from_arrays(arrays: &MeshArrays, config: MeshConfig) -> Result<Self, MeshError> {
        let tds = arrays.to_tds(config.track_neighbor_edges, config.track_vertex_triangles)?;
        Self::from_tds(default_kernel(&config), tds, config, false)
    }
}

impl<K: Kernel> Mesh<K> {
    /// [`Mesh::new`] with an explicit kernel.
    ///
    /// # Errors
    ///
    /// See [`Mesh::new`].
    pub fn with_kernel(kernel: K, points: &[Point], config: MeshConfig) -> Result<Self, MeshError> {
        let mut mesh = Self::seeded(kernel, points, config)?;
        let outcomes = (0..points.len())
            .map(|i| mesh.link_counted(VertexId(i)))
            .collect::<Result<Vec<_>, _>>()?;
        mesh.log_outcomes(&outcomes);
        Ok(mesh)
    }

    /// [`Mesh::with_enclosure`] with an explicit kernel.
    ///
    /// # Errors
    ///
    /// See [`build_enclosure`].
    pub fn enclosure_with_kernel(
        kernel: K,
        extent: &[Point],
        config: MeshConfig,
    ) -> Result<Self, MeshError> {
        let tds = Tds::new(config.track_neighbor_edges, config.track_vertex_triangles);
        Self::enclose(kernel, tds, extent, config)
    }

    /// Stores `points` at ids `0..points.len()` without triangulating them,
    /// then builds the enclosure after them.
    fn seeded(kernel: K, points: &[Point], config: MeshConfig) -> Result<Self, MeshError> {
        let mut tds = Tds::new(config.track_neighbor_edges, config.track_vertex_triangles);
        for &p in points {
            tds.append_vertex(p);
        }
        Self::enclose(kernel, tds, points, config)
    }

    fn enclose(kernel: K, mut tds: Tds, extent: &[Point], config: MeshConfig) -> Result<Self, MeshError> {
        let mesh_type = config
            .mesh_type
            .unwrap_or_else(|| config.tolerances.classify(extent));
        let enclosure = build_enclosure(&mut tds, mesh_type, extent, &config.enclosure)?;
        let duplicate_distance = config.tolerances.duplicate * coordinate_scale(extent);
        Ok(Self {
            tds,
            kernel,
            mesh_type,
            config,
            enclosure,
            hint: None,
            duplicate_distance,
            vertex_bounds: Vec::new(),
        })
    }

    /// Wraps an imported store, fixing a global orientation when asked.
    fn from_tds(kernel: K, mut tds: Tds, config: MeshConfig, orient: bool) -> Result<Self, MeshError> {
        let mesh_type = config
            .mesh_type
            .unwrap_or_else(|| config.tolerances.classify(tds.points()));
        if orient && mesh_type != MeshType::GeneralManifold {
            let frame = match mesh_type {
                MeshType::Sphere => Frame::sphere(),
                _ => Frame::plane(),
            };
            let negative = tds
                .triangle_ids()
                .filter(|&t| {
                    let [a, b, c] = tds.triangle_points(t);
                    kernel.orientation(&frame, a, b, c) == Orientation::NEGATIVE
                })
                .count();
            if 2 * negative > tds.triangle_count() {
                tds.reverse_all();
            }
        }
        tds.validate_orientation(&kernel, mesh_type)?;
        let duplicate_distance = config.tolerances.duplicate * coordinate_scale(tds.points());
        tracing::debug!(
            vertices = tds.vertex_count(),
            triangles = tds.triangle_count(),
            mesh_type = %mesh_type,
            "[insert] imported triangulation"
        );
        Ok(Self {
            tds,
            kernel,
            mesh_type,
            config,
            enclosure: Vec::new(),
            hint: None,
            duplicate_distance,
            vertex_bounds: Vec::new(),
        })
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    /// The topology store.
    #[must_use]
    pub const fn tds(&self) -> &Tds {
        &self.tds
    }

    /// The predicate kernel.
    #[must_use]
    pub const fn kernel(&self) -> &K {
        &self.kernel
    }

    /// Plane, sphere or general manifold.
    #[must_use]
    pub const fn mesh_type(&self) -> MeshType {
        self.mesh_type
    }

    /// The configuration the mesh was built with.
    #[must_use]
    pub const fn config(&self) -> &MeshConfig {
        &self.config
    }

    /// Vertices of the enclosing triangulation (empty for imported meshes).
    #[must_use]
    pub fn enclosure_vertices(&self) -> &[VertexId] {
        &self.enclosure
    }

    /// Number of vertices, including unused ones.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.tds.vertex_count()
    }

    /// Number of live triangles.
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.tds.triangle_count()
    }

    /// Coordinates of `v`.
    #[must_use]
    pub fn point(&self, v: VertexId) -> &Point {
        self.tds.point(v)
    }

    /// Per-vertex maximum edge lengths from the last refinement.
    #[must_use]
    pub fn vertex_bounds(&self) -> &[f64] {
        &self.vertex_bounds
    }

    // -------------------------------------------------------------------------
    // Location
    // -------------------------------------------------------------------------

    /// Full location result, falling back to a scan when the walk leaves
    /// the mesh (non-convex or disconnected regions).
    fn locate_result(&self, point: &Point, hint: Option<Dart>) -> Result<LocateResult, LocateError> {
        let walked = match locate(&self.tds, &self.kernel, self.mesh_type, point, hint) {
            Ok(result) if result.is_found() => return Ok(result),
            other => other,
        };
        match locate_exhaustive(&self.tds, &self.kernel, self.mesh_type, point) {
            Some(t) => locate_from(&self.tds, &self.kernel, self.mesh_type, point, Dart::of_triangle(t)),
            None => walked,
        }
    }

    /// A dart of a triangle containing `point`, or `None` outside the mesh.
    ///
    /// Pass the previous result as `hint` for spatially coherent queries.
    #[must_use]
    pub fn locate(&self, point: &Point, hint: Option<Dart>) -> Option<Dart> {
        self.locate_result(point, hint)
            .ok()
            .and_then(|result| result.dart())
    }

    /// Bounding-box index over the current triangles, on the coordinates
    /// natural for the mesh type.
    #[must_use]
    pub fn triangle_locator(&self) -> TriangleLocator<'_, K> {
        let dims: &[usize] = match self.mesh_type {
            MeshType::Plane => &[0, 1],
            MeshType::Sphere | MeshType::GeneralManifold => &[0, 1, 2],
        };
        TriangleLocator::new(&self.tds, self.kernel.clone(), self.mesh_type, dims)
    }

    // -------------------------------------------------------------------------
    // Insertion
    // -------------------------------------------------------------------------

    fn insert_options(&self) -> InsertOptions {
        InsertOptions {
            duplicate_distance: self.duplicate_distance,
            max_flips: self.config.max_flips,
        }
    }

    /// Inserts one point and restores the Delaunay property.
    ///
    /// # Errors
    ///
    /// Returns [`InsertionError::DuplicatePoint`] (wrapped) for a point on an
    /// existing vertex and [`InsertionError::PointNotLocatable`] outside the
    /// mesh; the mesh is unchanged in both cases.
    pub fn insert(&mut self, point: Point) -> Result<VertexId, MeshError> {
        if !point.is_finite() {
            return Err(InsertionError::NonFinitePoint.into());
        }
        let located = self.locate_result(&point, self.hint)?;
        let options = self.insert_options();
        let outcome = insert_located(
            &mut self.tds,
            &self.kernel,
            self.mesh_type,
            point,
            located,
            options,
        )?;
        self.hint = Some(outcome.hint);
        Ok(outcome.vertex)
    }

    /// Links stored vertex `v` into the triangulation.
    fn link_stored(&mut self, v: VertexId) -> Result<VertexId, MeshError> {
        let point = *self.tds.point(v);
        let located = self.locate_result(&point, self.hint)?;
        let options = self.insert_options();
        let outcome = insert_stored_vertex(
            &mut self.tds,
            &self.kernel,
            self.mesh_type,
            v,
            located,
            options,
        )?;
        self.hint = Some(outcome.hint);
        Ok(outcome.vertex)
    }

    /// Inserts points in order, mapping each to its vertex.
    ///
    /// # Errors
    ///
    /// Fails on the first error other than a duplicate or unlocatable point.
    pub fn insert_points(&mut self, points: &[Point]) -> Result<Vec<PointOutcome>, MeshError> {
        let outcomes = points
            .iter()
            .map(|&p| {
                let result = self.insert(p);
                counted(result, &p)
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.log_outcomes(&outcomes);
        Ok(outcomes)
    }

    fn link_counted(&mut self, v: VertexId) -> Result<PointOutcome, MeshError> {
        let point = *self.tds.point(v);
        let result = self.link_stored(v);
        counted(result, &point)
    }

    fn log_outcomes(&self, outcomes: &[PointOutcome]) {
        let inserted = outcomes
            .iter()
            .filter(|o| matches!(o, PointOutcome::Inserted(_)))
            .count();
        tracing::debug!(
            points = outcomes.len(),
            inserted,
            vertices = self.tds.vertex_count(),
            triangles = self.tds.triangle_count(),
            "[insert] inserted points"
        );
    }

    /// Links the stored input vertices: segment endpoints, then the
    /// segments, then the rest.
    fn link_constrained(
        &mut self,
        n: usize,
        boundary: &[Segment],
        interior: &[Segment],
    ) -> Result<BuildReport, MeshError> {
        let mut outcomes = vec![PointOutcome::NotLocatable; n];
        let mut endpoints: Vec<usize> = boundary
            .iter()
            .chain(interior)
            .flat_map(|s| [s.from.0, s.to.0])
            .filter(|&i| i < n)
            .collect();
        endpoints.sort_unstable();
        endpoints.dedup();
        let mut is_endpoint = vec![false; n];
        for &i in &endpoints {
            is_endpoint[i] = true;
            outcomes[i] = self.link_counted(VertexId(i))?;
        }

        // Duplicated endpoints stand for the vertex they coincide with.
        let map = |segments: &[Segment]| -> Vec<Segment> {
            segments
                .iter()
                .map(|s| {
                    let vertex = |i: VertexId| {
                        outcomes
                            .get(i.0)
                            .and_then(PointOutcome::vertex)
                            .unwrap_or(VertexId(usize::MAX))
                    };
                    Segment::new(vertex(s.from), vertex(s.to), s.group)
                })
                .collect()
        };
        let (boundary, interior) = (map(boundary), map(interior));
        let boundary = self.insert_segments(&boundary, ConstraintKind::Boundary);
        let interior = self.insert_segments(&interior, ConstraintKind::Interior);

        for i in 0..n {
            if !is_endpoint[i] {
                outcomes[i] = self.link_counted(VertexId(i))?;
            }
        }
        self.log_outcomes(&outcomes);
        Ok(BuildReport {
            points: outcomes,
            boundary,
            interior,
        })
    }

    // -------------------------------------------------------------------------
    // Constraints, pruning, refinement
    // -------------------------------------------------------------------------

    /// Inserts constraint segments between existing vertices.
    ///
    /// Rejected segments are listed in the report and skipped.
    pub fn insert_segments(&mut self, segments: &[Segment], kind: ConstraintKind) -> ConstraintReport {
        insert_segments(
            &mut self.tds,
            &self.kernel,
            self.mesh_type,
            segments,
            kind,
            self.config.max_flips,
        )
    }

    /// Inserts boundary segments; see [`Mesh::insert_segments`].
    pub fn insert_boundary(&mut self, segments: &[Segment]) -> ConstraintReport {
        self.insert_segments(segments, ConstraintKind::Boundary)
    }

    /// Inserts interior segments; see [`Mesh::insert_segments`].
    pub fn insert_interior(&mut self, segments: &[Segment]) -> ConstraintReport {
        self.insert_segments(segments, ConstraintKind::Interior)
    }

    /// Removes the triangles outside the closed boundary polygons.
    ///
    /// # Errors
    ///
    /// See [`prune_exterior`].
    pub fn prune_exterior(&mut self) -> Result<PruneReport, MeshError> {
        let report = prune_exterior(&mut self.tds, &self.enclosure)?;
        self.hint = None;
        Ok(report)
    }

    /// Refines the mesh to the quality criteria of `params`.
    ///
    /// Per-vertex bounds not given in `params` keep the values interpolated
    /// by earlier refinements.
    ///
    /// # Errors
    ///
    /// See [`refine`]. On [`RefinementError::CeilingReached`] the mesh is
    /// valid but incomplete.
    pub fn refine(&mut self, params: &RefinementParameters) -> Result<RefinementReport, MeshError> {
        let mut bounds = params.per_vertex_max_edge.clone();
        if bounds.len() < self.vertex_bounds.len() {
            bounds.extend_from_slice(&self.vertex_bounds[bounds.len()..]);
        }
        let result = refine(
            &mut self.tds,
            &self.kernel,
            self.mesh_type,
            params,
            &self.enclosure,
            &mut bounds,
        );
        self.vertex_bounds = bounds;
        self.hint = None;
        Ok(result?)
    }

    // -------------------------------------------------------------------------
    // Export and validation
    // -------------------------------------------------------------------------

    /// Index arrays of the mesh.
    #[must_use]
    pub fn to_arrays(&self) -> MeshArrays {
        MeshArrays::from_tds(&self.tds)
    }

    /// Constrained edges split into boundary and interior lists.
    #[must_use]
    pub fn segments(&self) -> SegmentArrays {
        SegmentArrays::from_tds(&self.tds)
    }

    /// Checks the local Delaunay property of every unconstrained edge.
    ///
    /// # Errors
    ///
    /// Returns the first [`TdsValidationError::DelaunayViolation`].
    pub fn validate_delaunay(&self) -> Result<(), TdsValidationError> {
        verify_delaunay(&self.tds, &self.kernel, self.mesh_type)
    }

    /// Structural validation: neighbor links, incidence table, constraints
    /// and orientation.
    ///
    /// # Errors
    ///
    /// Returns the first violation found.
    pub fn is_valid(&self) -> Result<(), TdsValidationError> {
        self.tds.is_valid()?;
        self.tds.validate_orientation(&self.kernel, self.mesh_type)
    }
}
