//! Quality refinement by Steiner point insertion.
//!
//! Ruppert-style refinement of a constrained Delaunay triangulation:
//!
//! 1. A constrained segment is *encroached* when a vertex lies strictly inside
//!    its diametral circle; encroached segments are split at their midpoint.
//! 2. A triangle is *bad* when its smallest angle is below the bound or an
//!    edge is longer than its size bound. A bad triangle gets a Steiner point
//!    at its circumcenter (or off-center). A candidate that would encroach a
//!    segment bounding its insertion cavity is discarded and the segment is
//!    split instead.
//! 3. Every insertion goes through [`insert_located`]/[`insert_on_edge`], so
//!    the mesh is a valid constrained Delaunay triangulation between steps.
//!
//! Segment splits take priority over triangle splits. Termination is only
//! guaranteed for angle bounds up to about 20.7°; the Steiner point and
//! triangle ceilings bound the work otherwise.
//!
//! Small angles enclosed by two constrained edges are input features and are
//! never treated as bad.
//!
//! # References
//! - J. Ruppert, "A Delaunay refinement algorithm for quality 2-dimensional
//!   mesh generation", Journal of Algorithms, 1995.
//! - A. Üngör, "Off-centers: A new type of Steiner points for computing
//!   size-optimal quality-guaranteed Delaunay triangulations", LATIN 2004.

use std::collections::VecDeque;
use std::fmt;

use thiserror::Error;

use crate::core::algorithms::flips::DelaunayRepairStats;
use crate::core::algorithms::incremental_insertion::{
    InsertOptions, InsertionError, InsertionOutcome, insert_located, insert_on_edge,
};
use crate::core::collections::{FastHashSet, SmallBuffer};
use crate::core::config::RefinementParameters;
use crate::core::dart::Dart;
use crate::core::edge::EdgeKey;
use crate::core::locate::{LocateError, LocateResult, locate_from, triangle_frame};
use crate::core::triangulation_data_structure::{Tds, TriangleId, VertexId, ccw};
use crate::geometry::kernel::Kernel;
use crate::geometry::mesh_type::MeshType;
use crate::geometry::point::Point;
use crate::geometry::predicates::{InCircle, circumcenter};
use crate::geometry::quality::{edge_lengths, max_edge_length, min_angle};

/// Segments shorter than this fraction of the coordinate scale are not split.
const MIN_SEGMENT_FRACTION: f64 = 1e-9;

/// Errors during refinement.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum RefinementError {
    /// The refinement parameters are invalid; the mesh is unchanged.
    #[error("Invalid refinement parameters: {message}")]
    InvalidParameters {
        /// Description of the invalid parameter.
        message: String,
    },
    /// A resource ceiling stopped refinement. The mesh is valid but may still
    /// contain bad triangles.
    #[error("Refinement ceiling reached after {report}")]
    CeilingReached {
        /// Work done before stopping.
        report: RefinementReport,
    },
    /// Inserting a Steiner point failed.
    #[error("Steiner point insertion failed: {0}")]
    Insertion(#[from] InsertionError),
    /// Locating a Steiner point failed.
    #[error("Steiner point location failed: {0}")]
    Location(#[from] LocateError),
}

/// Counters of a refinement run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefinementReport {
    /// Circumcenters and off-centers inserted.
    pub steiner_points: usize,
    /// Segment midpoints inserted.
    pub segment_splits: usize,
    /// Bad triangles or segments that could not be improved.
    pub skipped: usize,
    /// Bad triangles left when the run ended.
    pub remaining_bad: usize,
    /// Accumulated flip repair counters.
    pub repair: DelaunayRepairStats,
}

impl RefinementReport {
    /// Total number of vertices added.
    #[must_use]
    pub const fn inserted(&self) -> usize {
        self.steiner_points + self.segment_splits
    }
}

impl fmt::Display for RefinementReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} Steiner points, {} segment splits, {} skipped, {} bad triangles left",
            self.steiner_points, self.segment_splits, self.skipped, self.remaining_bad
        )
    }
}

struct Refiner<'a, K: Kernel> {
    tds: &'a mut Tds,
    kernel: &'a K,
    mesh_type: MeshType,
    params: &'a RefinementParameters,
    bounds: &'a mut Vec<f64>,
    protected: FastHashSet<VertexId>,
    min_angle: f64,
    off_center_beta: Option<f64>,
    min_segment_length: f64,
    /// Segments to check; `true` forces the split.
    segments: VecDeque<(EdgeKey, bool)>,
    triangles: VecDeque<TriangleId>,
    report: RefinementReport,
}

impl<K: Kernel> Refiner<'_, K> {
    fn run(mut self) -> Result<RefinementReport, RefinementError> {
        let mut keys: Vec<EdgeKey> = self.tds.constraints().map(|c| c.key()).collect();
        keys.sort_unstable();
        self.segments.extend(keys.into_iter().map(|k| (k, false)));
        self.triangles.extend(self.tds.triangle_ids());

        loop {
            if let Some((key, force)) = self.segments.pop_front() {
                if force || self.is_encroached(key) {
                    self.split_segment(key)?;
                }
                continue;
            }
            let Some(t) = self.triangles.pop_front() else {
                break;
            };
            if self.is_bad(t) {
                self.split_triangle(t)?;
            }
        }
        self.report.remaining_bad = self.count_bad();
        Ok(self.report)
    }

    // -------------------------------------------------------------------------
    // Criteria
    // -------------------------------------------------------------------------

    fn vertex_bound(&self, v: VertexId) -> Option<f64> {
        self.bounds
            .get(v.0)
            .copied()
            .filter(|b| *b > 0.0 && b.is_finite())
    }

    /// Mean of the positive vertex bounds, else the default bound.
    fn triangle_bound(&self, t: TriangleId) -> Option<f64> {
        let (sum, count) = self
            .tds
            .triangle(t)
            .vertices()
            .iter()
            .filter_map(|&v| self.vertex_bound(v))
            .fold((0.0, 0_usize), |(s, n), b| (s + b, n + 1));
        if count > 0 {
            Some(sum / count as f64)
        } else {
            self.params.max_edge()
        }
    }

    fn is_bad(&self, t: TriangleId) -> bool {
        if !self.tds.is_live(t) {
            return false;
        }
        let tri = self.tds.triangle(t);
        if tri.vertices().iter().any(|v| self.protected.contains(v)) {
            return false;
        }
        let points = self.tds.triangle_points(t);
        if self
            .triangle_bound(t)
            .is_some_and(|bound| max_edge_length(points) > bound)
        {
            return true;
        }
        if self.min_angle <= 0.0 {
            return false;
        }
        let Ok((angle, at)) = min_angle(points) else {
            return false;
        };
        angle < self.min_angle
            && !(self.tds.is_constrained_edge(t, ccw(at, 1))
                && self.tds.is_constrained_edge(t, ccw(at, 2)))
    }

    fn count_bad(&self) -> usize {
        self.tds.triangle_ids().filter(|&t| self.is_bad(t)).count()
    }

    fn encroaches(&self, p: &Point, key: EdgeKey) -> bool {
        let a = *self.tds.point(key.v0()) - *p;
        let b = *self.tds.point(key.v1()) - *p;
        a.dot(&b) < 0.0
    }

    /// Whether a vertex opposite the constrained edge `key` encroaches it.
    fn is_encroached(&self, key: EdgeKey) -> bool {
        let Some((t, e)) = self.tds.find_edge(key.v0(), key.v1()) else {
            return false;
        };
        if !self.tds.is_constrained_edge(t, e) {
            return false;
        }
        let mut opposite: SmallBuffer<VertexId, 2> = SmallBuffer::new();
        opposite.push(self.tds.triangle(t).vertex(e));
        if let Some((u, j)) = self.tds.adjacent(t, e) {
            opposite.push(self.tds.triangle(u).vertex(j));
        }
        opposite
            .into_iter()
            .filter(|v| !self.protected.contains(v))
            .any(|v| self.encroaches(self.tds.point(v), key))
    }

    fn is_splittable(&self, key: EdgeKey) -> bool {
        self.tds.point(key.v0()).distance(self.tds.point(key.v1())) >= self.min_segment_length
    }

    // -------------------------------------------------------------------------
    // Steiner points
    // -------------------------------------------------------------------------

    /// Moves `p` onto the surface for spherical meshes.
    fn on_surface(&self, p: Point, radius: f64) -> Point {
        if self.mesh_type == MeshType::Sphere {
            p.normalized().map_or(p, |u| u * radius)
        } else {
            p
        }
    }

    fn steiner_point(&self, t: TriangleId) -> Option<Point> {
        let points = self.tds.triangle_points(t);
        let [a, b, c] = points;
        let frame = triangle_frame(self.tds, self.mesh_type, t);
        let center = circumcenter(&frame, a, b, c)?;
        let Some(beta) = self.off_center_beta else {
            return Some(center);
        };

        // Off-center: on the bisector of the shortest edge, at the centre of
        // the circle through that edge whose radius-edge ratio is `beta`.
        let lengths = edge_lengths(points);
        let shortest = (0..3)
            .min_by(|&i, &j| lengths[i].total_cmp(&lengths[j]))
            .unwrap_or(0);
        let (p, q) = (points[ccw(shortest, 1)], points[ccw(shortest, 2)]);
        let mid = p.midpoint(q);
        let half = 0.5 * lengths[shortest];
        let radius = beta * lengths[shortest];
        let offset = radius.mul_add(radius, -(half * half)).max(0.0).sqrt();
        let towards = center - mid;
        let distance = towards.norm();
        if offset >= distance {
            return Some(center);
        }
        let surface_radius = (a.norm() + b.norm() + c.norm()) / 3.0;
        Some(self.on_surface(mid + towards * (offset / distance), surface_radius))
    }

    /// Triangles whose circumcircle contains `p`, grown from `t` without
    /// crossing constrained edges, and the constrained edges bounding them.
    fn cavity(&self, t: TriangleId, p: &Point) -> (Vec<TriangleId>, Vec<EdgeKey>) {
        let mut seen: FastHashSet<TriangleId> = FastHashSet::default();
        seen.insert(t);
        let mut stack = vec![t];
        let (mut cavity, mut walls) = (Vec::new(), Vec::new());
        while let Some(u) = stack.pop() {
            cavity.push(u);
            for e in 0..3 {
                if self.tds.is_constrained_edge(u, e) {
                    walls.push(self.tds.triangle(u).edge_key(e));
                    continue;
                }
                let Some((n, _)) = self.tds.adjacent(u, e) else {
                    continue;
                };
                if seen.contains(&n) {
                    continue;
                }
                let [a, b, c] = self.tds.triangle_points(n);
                let frame = triangle_frame(self.tds, self.mesh_type, n);
                if self.kernel.in_circle(&frame, a, b, c, p) == InCircle::INSIDE {
                    seen.insert(n);
                    stack.push(n);
                }
            }
        }
        (cavity, walls)
    }

    fn interpolated_bound(&self, vertices: &[VertexId], weights: &[f64]) -> f64 {
        let (sum, total) = vertices
            .iter()
            .zip(weights)
            .filter_map(|(&v, &w)| self.vertex_bound(v).map(|b| (b, w.max(0.0))))
            .fold((0.0, 0.0), |(s, tw), (b, w)| (w.mul_add(b, s), tw + w));
        if total > 0.0 { sum / total } else { 0.0 }
    }

    // -------------------------------------------------------------------------
    // Insertion
    // -------------------------------------------------------------------------

    fn check_ceiling(&self) -> Result<(), RefinementError> {
        if self.report.inserted() >= self.params.max_steiner_points
            || self.tds.triangle_count() >= self.params.max_triangles
        {
            let mut report = self.report;
            report.remaining_bad = self.count_bad();
            tracing::warn!(
                inserted = report.inserted(),
                triangles = self.tds.triangle_count(),
                remaining_bad = report.remaining_bad,
                "[refine] ceiling reached; stopping with an incomplete mesh"
            );
            return Err(RefinementError::CeilingReached { report });
        }
        Ok(())
    }

    fn after_insert(&mut self, outcome: &InsertionOutcome, bound: f64) {
        let v = outcome.vertex;
        self.bounds.resize(v.0, 0.0);
        self.bounds.push(bound);
        self.report.repair.accumulate(&outcome.repair);
        let star = self.tds.vertex_star(v);
        for &t in &star {
            self.triangles.push_back(t);
            for e in 0..3 {
                if self.tds.is_constrained_edge(t, e) {
                    self.segments.push_back((self.tds.triangle(t).edge_key(e), false));
                }
            }
        }
    }

    fn split_segment(&mut self, key: EdgeKey) -> Result<(), RefinementError> {
        let Some((t, e)) = self.tds.find_edge(key.v0(), key.v1()) else {
            return Ok(());
        };
        if !self.tds.is_constrained_edge(t, e) {
            return Ok(());
        }
        if !self.is_splittable(key) {
            self.report.skipped += 1;
            return Ok(());
        }
        self.check_ceiling()?;

        let (a, b) = (self.tds.point(key.v0()), self.tds.point(key.v1()));
        let mid = self.on_surface(a.midpoint(b), 0.5 * (a.norm() + b.norm()));
        let bound = self.interpolated_bound(&[key.v0(), key.v1()], &[0.5, 0.5]);
        let outcome = insert_on_edge(
            self.tds,
            self.kernel,
            self.mesh_type,
            mid,
            t,
            e,
            InsertOptions::default(),
        )?;
        tracing::trace!(
            "[refine] split segment {}-{} at {}",
            key.v0(),
            key.v1(),
            outcome.vertex
        );
        self.report.segment_splits += 1;
        self.after_insert(&outcome, bound);
        Ok(())
    }

    /// Queues forced splits of `keys` and retries `t` after them. If none of
    /// the segments is long enough to split, `t` is skipped instead, so the
    /// queue always shrinks or the mesh grows.
    fn defer_to_segments(&mut self, t: TriangleId, keys: &[EdgeKey]) {
        if !keys.iter().any(|&k| self.is_splittable(k)) {
            self.report.skipped += 1;
            return;
        }
        self.segments.extend(keys.iter().map(|&k| (k, true)));
        self.triangles.push_back(t);
    }

    fn split_triangle(&mut self, t: TriangleId) -> Result<(), RefinementError> {
        let Some(p) = self.steiner_point(t).filter(Point::is_finite) else {
            self.report.skipped += 1;
            return Ok(());
        };

        let (cavity, walls) = self.cavity(t, &p);
        let encroached: Vec<EdgeKey> = walls
            .into_iter()
            .filter(|&k| self.encroaches(&p, k))
            .collect();
        if !encroached.is_empty() {
            self.defer_to_segments(t, &encroached);
            return Ok(());
        }

        let host = cavity.iter().copied().find(|&u| {
            let frame = triangle_frame(self.tds, self.mesh_type, u);
            self.kernel.contains(&frame, self.tds.triangle_points(u), &p)
        });
        let Some(host) = host else {
            self.report.skipped += 1;
            return Ok(());
        };
        let located = locate_from(
            self.tds,
            self.kernel,
            self.mesh_type,
            &p,
            Dart::of_triangle(host),
        )?;
        match located {
            LocateResult::OnEdge(d) if d.is_constrained(self.tds) => {
                let (a, b) = d.edge_vertices(self.tds);
                self.defer_to_segments(t, &[EdgeKey::new(a, b)]);
                return Ok(());
            }
            LocateResult::Inside(_) | LocateResult::OnEdge(_) => {}
            LocateResult::OnVertex { .. } | LocateResult::Outside(_) => {
                self.report.skipped += 1;
                return Ok(());
            }
        }

        let frame = triangle_frame(self.tds, self.mesh_type, host);
        let weights = self
            .kernel
            .barycentric(&frame, self.tds.triangle_points(host), &p)
            .unwrap_or([1.0 / 3.0; 3]);
        let bound = self.interpolated_bound(&self.tds.triangle(host).vertices(), &weights);

        self.check_ceiling()?;
        match insert_located(
            self.tds,
            self.kernel,
            self.mesh_type,
            p,
            located,
            InsertOptions::default(),
        ) {
            Ok(outcome) => {
                tracing::trace!("[refine] Steiner point {} for {t}", outcome.vertex);
                self.report.steiner_points += 1;
                self.after_insert(&outcome, bound);
                Ok(())
            }
            Err(InsertionError::DuplicatePoint { .. }) => {
                self.report.skipped += 1;
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }
}

/// Refines `tds` until no triangle violates the quality criteria.
///
/// `protected` vertices (normally the enclosure ring of an unpruned mesh) make
/// their incident triangles exempt and never encroach segments.
/// `vertex_bounds` holds one maximum edge length per vertex (`<= 0` = unset);
/// it is resized to the vertex count and extended with an interpolated bound
/// for every inserted vertex.
///
/// # Errors
///
/// Returns [`RefinementError::InvalidParameters`] before touching the mesh,
/// [`RefinementError::CeilingReached`] when a resource ceiling stops the run
/// (the mesh stays valid), and insertion or location errors otherwise.
///
/// # Examples
///
/// ```rust
/// use fmesh::core::algorithms::refinement::refine;
/// use fmesh::core::config::RefinementParametersBuilder;
/// use fmesh::core::triangulation_data_structure::Tds;
/// use fmesh::geometry::kernel::RobustKernel;
/// use fmesh::geometry::mesh_type::MeshType;
/// use fmesh::geometry::point::Point;
///
/// let points = vec![
///     Point::new2(0.0, 0.0),
///     Point::new2(1.0, 0.0),
///     Point::new2(1.0, 1.0),
///     Point::new2(0.0, 1.0),
/// ];
/// let mut tds = Tds::from_triangles(points, &[[0, 1, 2], [0, 2, 3]], true, true).unwrap();
/// let params = RefinementParametersBuilder::default()
///     .max_edge(0.5)
///     .build()
///     .unwrap();
/// let mut bounds = Vec::new();
/// let report = refine(&mut tds, &RobustKernel::new(), MeshType::Plane, &params, &[], &mut bounds).unwrap();
/// assert!(report.inserted() > 0);
/// assert_eq!(bounds.len(), tds.vertex_count());
/// ```
pub fn refine<K: Kernel>(
    tds: &mut Tds,
    kernel: &K,
    mesh_type: MeshType,
    params: &RefinementParameters,
    protected: &[VertexId],
    vertex_bounds: &mut Vec<f64>,
) -> Result<RefinementReport, RefinementError> {
    params
        .check()
        .map_err(|message| RefinementError::InvalidParameters { message })?;
    vertex_bounds.resize(tds.vertex_count(), 0.0);

    let scale = tds
        .points()
        .iter()
        .map(Point::max_abs_coordinate)
        .fold(0.0, f64::max)
        .max(f64::MIN_POSITIVE);
    let min_angle = params.min_angle_radians();
    let off_center_beta = (params.off_center && min_angle > 0.0).then(|| 0.5 / min_angle.sin());
    tracing::debug!(
        min_angle_degrees = params.min_angle_degrees,
        max_edge = ?params.max_edge(),
        off_center = params.off_center,
        triangles = tds.triangle_count(),
        "[refine] starting"
    );

    let refiner = Refiner {
        tds,
        kernel,
        mesh_type,
        params,
        bounds: vertex_bounds,
        protected: protected.iter().copied().collect(),
        min_angle,
        off_center_beta,
        min_segment_length: scale * MIN_SEGMENT_FRACTION,
        segments: VecDeque::new(),
        triangles: VecDeque::new(),
        report: RefinementReport::default(),
    };
    let report = refiner.run()?;
    tracing::debug!(%report, "[refine] finished");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::algorithms::constrained::{Segment, insert_segments};
    use crate::core::algorithms::enclosure::build_enclosure;
    use crate::core::algorithms::flips::verify_delaunay;
    use crate::core::algorithms::incremental_insertion::insert_point;
    use crate::core::algorithms::prune::prune_exterior;
    use crate::core::config::{EnclosureConfig, RefinementParametersBuilder};
    use crate::core::triangulation_data_structure::{ConstraintKind, ccw};
    use crate::geometry::kernel::RobustKernel;

    /// Unit square bounded by boundary constraints, exterior pruned.
    fn square() -> (Tds, Vec<VertexId>) {
        let corners = [
            Point::new2(0.0, 0.0),
            Point::new2(1.0, 0.0),
            Point::new2(1.0, 1.0),
            Point::new2(0.0, 1.0),
        ];
        let kernel = RobustKernel::new();
        let mut tds = Tds::new(true, true);
        let ring =
            build_enclosure(&mut tds, MeshType::Plane, &corners, &EnclosureConfig::default()).unwrap();
        let ids: Vec<VertexId> = corners
            .iter()
            .map(|&p| {
                insert_point(&mut tds, &kernel, MeshType::Plane, p, None, InsertOptions::default())
                    .unwrap()
                    .vertex
            })
            .collect();
        let segments: Vec<Segment> = (0..4).map(|i| Segment::new(ids[i], ids[(i + 1) % 4], 0)).collect();
        insert_segments(&mut tds, &kernel, MeshType::Plane, &segments, ConstraintKind::Boundary, None);
        prune_exterior(&mut tds, &ring).unwrap();
        (tds, ids)
    }

    fn refiner<'a>(
        tds: &'a mut Tds,
        kernel: &'a RobustKernel,
        params: &'a RefinementParameters,
        bounds: &'a mut Vec<f64>,
        min_segment_length: f64,
    ) -> Refiner<'a, RobustKernel> {
        Refiner {
            tds,
            kernel,
            mesh_type: MeshType::Plane,
            params,
            bounds,
            protected: FastHashSet::default(),
            min_angle: params.min_angle_radians(),
            off_center_beta: None,
            min_segment_length,
            segments: VecDeque::new(),
            triangles: VecDeque::new(),
            report: RefinementReport::default(),
        }
    }

    fn run(tds: &mut Tds, params: &RefinementParameters, bounds: &mut Vec<f64>) -> Result<RefinementReport, RefinementError> {
        refine(tds, &RobustKernel::new(), MeshType::Plane, params, &[], bounds)
    }

    // =============================================================================
    // CONVERGENCE TESTS
    // =============================================================================

    #[test]
    fn test_refine_square_meets_criteria() {
        let (mut tds, _) = square();
        let params = RefinementParametersBuilder::default()
            .min_angle_degrees(25.0)
            .max_edge(0.3)
            .build()
            .unwrap();
        let mut bounds = Vec::new();
        let report = run(&mut tds, &params, &mut bounds).unwrap();
        assert!(report.inserted() > 0);
        assert!(tds.is_valid().is_ok());
        assert!(verify_delaunay(&tds, &RobustKernel::new(), MeshType::Plane).is_ok());

        let bound = 25f64.to_radians() - 1e-9;
        for t in tds.triangle_ids() {
            let points = tds.triangle_points(t);
            assert!(max_edge_length(points) <= 0.3 + 1e-12);
            let (angle, _) = min_angle(points).unwrap();
            let on_segment = (0..3).any(|e| tds.is_constrained_edge(t, e));
            assert!(angle >= bound || on_segment, "{t} has angle {}", angle.to_degrees());
        }
        // Every vertex stays in the square.
        for t in tds.triangle_ids() {
            for p in tds.triangle_points(t) {
                assert!((-1e-12..=1.0 + 1e-12).contains(&p.x()));
                assert!((-1e-12..=1.0 + 1e-12).contains(&p.y()));
            }
        }
    }

    #[test]
    fn test_refine_is_idempotent() {
        let (mut tds, _) = square();
        let params = RefinementParametersBuilder::default()
            .min_angle_degrees(20.0)
            .max_edge(0.4)
            .off_center(true)
            .build()
            .unwrap();
        let mut bounds = Vec::new();
        run(&mut tds, &params, &mut bounds).unwrap();
        let vertices = tds.vertex_count();
        let again = run(&mut tds, &params, &mut bounds).unwrap();
        assert_eq!(again.inserted(), 0);
        assert_eq!(tds.vertex_count(), vertices);
    }

    #[test]
    fn test_per_vertex_bounds_are_interpolated() {
        let (mut tds, ids) = square();
        let mut bounds = vec![0.0; tds.vertex_count()];
        for (k, v) in ids.iter().enumerate() {
            bounds[v.0] = if k % 2 == 0 { 0.25 } else { 0.5 };
        }
        let params = RefinementParametersBuilder::default()
            .min_angle_degrees(0.0)
            .build()
            .unwrap();
        let before = tds.vertex_count();
        let report = run(&mut tds, &params, &mut bounds).unwrap();
        assert!(report.inserted() > 0);
        assert_eq!(bounds.len(), tds.vertex_count());
        for &b in &bounds[before..] {
            assert!((0.25 - 1e-12..=0.5 + 1e-12).contains(&b), "bound {b}");
        }
    }

    // =============================================================================
    // CEILING AND PARAMETER TESTS
    // =============================================================================

    #[test]
    fn test_ceiling_returns_report_and_valid_mesh() {
        let (mut tds, _) = square();
        let params = RefinementParametersBuilder::default()
            .max_edge(0.05)
            .max_steiner_points(3_usize)
            .build()
            .unwrap();
        let mut bounds = Vec::new();
        let err = run(&mut tds, &params, &mut bounds).unwrap_err();
        let RefinementError::CeilingReached { report } = err else {
            panic!("expected ceiling, got {err:?}");
        };
        assert_eq!(report.inserted(), 3);
        assert!(report.remaining_bad > 0);
        assert!(tds.is_valid().is_ok());
    }

    #[test]
    fn test_unsplittable_segment_skips_triangle() {
        let (mut tds, ids) = square();
        let t = tds.triangle_ids().next().unwrap();
        let key = EdgeKey::new(ids[0], ids[1]);
        let (kernel, params) = (RobustKernel::new(), RefinementParameters::default());

        let mut bounds = Vec::new();
        let mut short = refiner(&mut tds, &kernel, &params, &mut bounds, 2.0);
        short.defer_to_segments(t, &[key]);
        assert_eq!(short.report.skipped, 1);
        assert!(short.segments.is_empty() && short.triangles.is_empty());

        let mut bounds = Vec::new();
        let mut long = refiner(&mut tds, &kernel, &params, &mut bounds, 0.5);
        long.defer_to_segments(t, &[key]);
        assert_eq!(long.report.skipped, 0);
        assert_eq!(long.segments.front(), Some(&(key, true)));
        assert_eq!(long.triangles.front(), Some(&t));
    }

    #[test]
    fn test_invalid_parameters_leave_mesh_untouched() {
        let (mut tds, _) = square();
        let params = RefinementParameters {
            min_angle_degrees: 75.0,
            ..RefinementParameters::default()
        };
        let before = tds.vertex_count();
        let err = run(&mut tds, &params, &mut Vec::new()).unwrap_err();
        assert!(matches!(err, RefinementError::InvalidParameters { .. }));
        assert_eq!(tds.vertex_count(), before);
    }

    #[test]
    fn test_small_input_angle_between_segments_is_exempt() {
        let points = vec![
            Point::new2(0.0, 0.0),
            Point::new2(10.0, 0.0),
            Point::new2(10.0, 1.0),
        ];
        let mut tds = Tds::from_triangles(points, &[[0, 1, 2]], true, true).unwrap();
        let kernel = RobustKernel::new();
        let segments = [Segment::new(VertexId(0), VertexId(1), 0), Segment::new(VertexId(2), VertexId(0), 0)];
        insert_segments(&mut tds, &kernel, MeshType::Plane, &segments, ConstraintKind::Boundary, None);
        let t = tds.triangle_ids().next().unwrap();
        let (_, at) = min_angle(tds.triangle_points(t)).unwrap();
        assert_eq!(tds.triangle(t).vertex(at), VertexId(0));
        assert!(tds.is_constrained_edge(t, ccw(at, 1)) && tds.is_constrained_edge(t, ccw(at, 2)));

        let report = run(&mut tds, &RefinementParameters::default(), &mut Vec::new()).unwrap();
        assert_eq!(report.inserted(), 0);
        assert_eq!(report.remaining_bad, 0);
    }
}
