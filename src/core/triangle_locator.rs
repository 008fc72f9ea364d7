//! Bounding-box index for triangle location.
//!
//! [`TriangleLocator`] borrows a topology store, computes one bounding box per
//! live triangle over a chosen subset of the coordinates, and arranges the
//! boxes in a static median-split tree. A query descends only into nodes whose
//! box contains the point and yields candidate triangles lazily; each
//! candidate is verified with barycentric coordinates, so the answer does not
//! depend on mesh connectivity.
//!
//! The locator holds a shared borrow of the store, which makes it impossible
//! to mutate the mesh while a locator built from it is alive.
//!
//! On spherical meshes a point of the curved triangle can lie outside the box
//! of the flat triangle through its corners. Each box is therefore grown by
//! the height of the spherical cap over the triangle's circumcircle.

use crate::core::collections::SmallBuffer;
use crate::core::locate::triangle_frame;
use crate::core::triangulation_data_structure::{Tds, TriangleId};
use crate::geometry::kernel::{Kernel, RobustKernel};
use crate::geometry::mesh_type::MeshType;
use crate::geometry::point::Point;
use crate::geometry::predicates::{BoundingBox, circumradius};

/// Number of triangles stored in a leaf before splitting.
const LEAF_SIZE: usize = 4;

/// Inline depth of the traversal stack.
const STACK_BUFFER_SIZE: usize = 32;

/// Relative slack added to every box so points on a shared edge fall into
/// both neighbors' boxes despite round-off.
const BOX_SLACK: f64 = 1e-9;

#[derive(Clone, Debug)]
enum NodeKind {
    Leaf { start: usize, end: usize },
    Branch { left: usize, right: usize },
}

#[derive(Clone, Debug)]
struct Node {
    bbox: BoundingBox,
    kind: NodeKind,
}

/// Spatial index over the live triangles of a [`Tds`].
///
/// # Examples
///
/// ```rust
/// use fmesh::core::triangle_locator::TriangleLocator;
/// use fmesh::core::triangulation_data_structure::{Tds, TriangleId};
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
/// let tds = Tds::from_triangles(points, &[[0, 1, 2], [0, 2, 3]], true, true).unwrap();
/// let locator = TriangleLocator::new(&tds, RobustKernel::new(), MeshType::Plane, &[0, 1]);
///
/// assert_eq!(locator.locate(&Point::new2(0.8, 0.1)), Some(TriangleId(0)));
/// assert_eq!(locator.locate(&Point::new2(1000.0, 1000.0)), None);
/// ```
#[derive(Clone, Debug)]
pub struct TriangleLocator<'a, K: Kernel = RobustKernel> {
    tds: &'a Tds,
    kernel: K,
    mesh_type: MeshType,
    dims: SmallBuffer<usize, 3>,
    items: Vec<(TriangleId, BoundingBox)>,
    nodes: Vec<Node>,
}

impl<'a, K: Kernel> TriangleLocator<'a, K> {
    /// Builds the index over the live triangles of `tds`, bounding the
    /// coordinates listed in `dims`.
    ///
    /// # Panics
    ///
    /// Panics if a dimension index is greater than 2.
    #[must_use]
    pub fn new(tds: &'a Tds, kernel: K, mesh_type: MeshType, dims: &[usize]) -> Self {
        assert!(dims.iter().all(|&d| d < 3), "dimension index out of range: {dims:?}");
        let radius = match mesh_type {
            MeshType::Sphere => MeshType::mean_radius(tds.points()),
            _ => 0.0,
        };

        let mut items: Vec<(TriangleId, BoundingBox)> = tds
            .triangle_ids()
            .map(|t| {
                let bbox = tds.triangle_bounding_box(t, dims);
                let scale = dims
                    .iter()
                    .map(|&d| bbox.extent(d).max(bbox.min[d].abs()).max(bbox.max[d].abs()))
                    .fold(0.0, f64::max);
                let mut margin = BOX_SLACK * scale.max(1.0);
                if mesh_type == MeshType::Sphere {
                    let [a, b, c] = tds.triangle_points(t);
                    margin += cap_height(radius, circumradius(a, b, c));
                }
                (t, bbox.expanded(margin))
            })
            .collect();

        let mut nodes = Vec::with_capacity(2 * items.len() / LEAF_SIZE + 1);
        if !items.is_empty() {
            let len = items.len();
            build(&mut nodes, &mut items, 0, len, dims);
        }

        tracing::debug!(
            triangles = items.len(),
            nodes = nodes.len(),
            mesh_type = %mesh_type,
            "[locator] built bounding-box index"
        );

        Self {
            tds,
            kernel,
            mesh_type,
            dims: dims.iter().copied().collect(),
            items,
            nodes,
        }
    }

    /// The indexed store.
    #[must_use]
    pub const fn tds(&self) -> &'a Tds {
        self.tds
    }

    /// The coordinates the index bounds.
    #[must_use]
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Number of indexed triangles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the index is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Triangles whose box contains `point`, in deterministic tree order.
    ///
    /// The sequence is produced lazily; candidates are not verified.
    #[must_use]
    pub fn candidates(&self, point: &Point) -> Candidates<'_> {
        let mut stack = SmallBuffer::new();
        if !self.nodes.is_empty() {
            stack.push(0);
        }
        Candidates {
            nodes: &self.nodes,
            items: &self.items,
            point: *point,
            stack,
            leaf: 0..0,
        }
    }

    /// The first candidate triangle whose closed interior contains `point`
    /// within the kernel's barycentric tolerance.
    #[must_use]
    pub fn locate(&self, point: &Point) -> Option<TriangleId> {
        self.candidates(point).find(|&t| {
            let frame = triangle_frame(self.tds, self.mesh_type, t);
            self.kernel
                .contains(&frame, self.tds.triangle_points(t), point)
        })
    }
}

/// Radial distance between a flat triangle with circumradius `r` and the
/// sphere of radius `radius` through its corners.
fn cap_height(radius: f64, r: Option<f64>) -> f64 {
    match r {
        Some(r) if r < radius => radius - (radius * radius - r * r).sqrt(),
        _ => radius,
    }
}

/// Builds the subtree over `items[start..end]` and returns its node index.
fn build(
    nodes: &mut Vec<Node>,
    items: &mut [(TriangleId, BoundingBox)],
    start: usize,
    end: usize,
    dims: &[usize],
) -> usize {
    let bbox = items[start..end]
        .iter()
        .fold(BoundingBox::EMPTY, |acc, (_, b)| acc.union(b));
    let index = nodes.len();
    if end - start <= LEAF_SIZE || dims.is_empty() {
        nodes.push(Node {
            bbox,
            kind: NodeKind::Leaf { start, end },
        });
        return index;
    }

    // Split on the widest dimension at the median box centre.
    let axis = dims
        .iter()
        .copied()
        .max_by(|&a, &b| bbox.extent(a).total_cmp(&bbox.extent(b)))
        .unwrap_or(0);
    let mid = start + (end - start) / 2;
    items[start..end].select_nth_unstable_by(mid - start, |(ta, a), (tb, b)| {
        a.center(axis)
            .total_cmp(&b.center(axis))
            .then_with(|| ta.cmp(tb))
    });

    nodes.push(Node {
        bbox,
        kind: NodeKind::Leaf { start, end },
    });
    let left = build(nodes, items, start, mid, dims);
    let right = build(nodes, items, mid, end, dims);
    nodes[index].kind = NodeKind::Branch { left, right };
    index
}

/// Lazy candidate sequence returned by [`TriangleLocator::candidates`].
#[derive(Debug)]
pub struct Candidates<'l> {
    nodes: &'l [Node],
    items: &'l [(TriangleId, BoundingBox)],
    point: Point,
    stack: SmallBuffer<usize, STACK_BUFFER_SIZE>,
    leaf: std::ops::Range<usize>,
}

impl Iterator for Candidates<'_> {
    type Item = TriangleId;

    fn next(&mut self) -> Option<TriangleId> {
        loop {
            for i in self.leaf.by_ref() {
                let (t, bbox) = &self.items[i];
                if bbox.contains(&self.point) {
                    return Some(*t);
                }
            }
            let node = &self.nodes[self.stack.pop()?];
            if !node.bbox.contains(&self.point) {
                continue;
            }
            match node.kind {
                NodeKind::Leaf { start, end } => self.leaf = start..end,
                NodeKind::Branch { left, right } => {
                    self.stack.push(right);
                    self.stack.push(left);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::kernel::FastKernel;

    fn grid(n: usize, offset: f64) -> (Vec<Point>, Vec<[usize; 3]>) {
        let mut points = Vec::new();
        for j in 0..=n {
            for i in 0..=n {
                points.push(Point::new2(offset + i as f64, j as f64));
            }
        }
        let mut triangles = Vec::new();
        let w = n + 1;
        for j in 0..n {
            for i in 0..n {
                let a = j * w + i;
                triangles.push([a, a + 1, a + w + 1]);
                triangles.push([a, a + w + 1, a + w]);
            }
        }
        (points, triangles)
    }

    // =============================================================================
    // PLANAR LOCATION
    // =============================================================================

    #[test]
    fn test_locator_finds_every_centroid() {
        let (points, triangles) = grid(6, 0.0);
        let tds = Tds::from_triangles(points, &triangles, true, true).unwrap();
        let locator = TriangleLocator::new(&tds, RobustKernel::new(), MeshType::Plane, &[0, 1]);
        assert_eq!(locator.len(), 72);
        for t in tds.triangle_ids() {
            let [a, b, c] = tds.triangle_points(t);
            let centroid = Point::combine([1.0 / 3.0; 3], [a, b, c]);
            assert_eq!(locator.locate(&centroid), Some(t));
        }
    }

    #[test]
    fn test_locator_finds_every_vertex() {
        let (points, triangles) = grid(5, 0.0);
        let tds = Tds::from_triangles(points, &triangles, false, false).unwrap();
        let locator = TriangleLocator::new(&tds, FastKernel::new(), MeshType::Plane, &[0, 1]);
        for v in tds.vertex_ids() {
            let t = locator.locate(tds.point(v)).unwrap();
            assert!(tds.triangle(t).contains_vertex(v));
        }
    }

    #[test]
    fn test_locator_outside_is_none() {
        let (points, triangles) = grid(3, 0.0);
        let tds = Tds::from_triangles(points, &triangles, true, true).unwrap();
        let locator = TriangleLocator::new(&tds, RobustKernel::new(), MeshType::Plane, &[0, 1]);
        assert_eq!(locator.locate(&Point::new2(1000.0, 1000.0)), None);
        assert_eq!(locator.locate(&Point::new2(-0.5, 1.5)), None);
        assert_eq!(locator.candidates(&Point::new2(1000.0, 1000.0)).count(), 0);
    }

    #[test]
    fn test_locator_handles_disconnected_components() {
        let (mut points, mut triangles) = grid(2, 0.0);
        let (more_points, more_triangles) = grid(2, 10.0);
        let shift = points.len();
        points.extend(more_points);
        triangles.extend(more_triangles.iter().map(|t| t.map(|v| v + shift)));
        let tds = Tds::from_triangles(points, &triangles, true, true).unwrap();
        let locator = TriangleLocator::new(&tds, RobustKernel::new(), MeshType::Plane, &[0, 1]);

        let t = locator.locate(&Point::new2(11.3, 0.2)).unwrap();
        assert!(t.0 >= 8);
        assert_eq!(locator.locate(&Point::new2(5.0, 1.0)), None);
    }

    #[test]
    fn test_candidates_are_deterministic() {
        let (points, triangles) = grid(4, 0.0);
        let tds = Tds::from_triangles(points, &triangles, true, true).unwrap();
        let locator = TriangleLocator::new(&tds, RobustKernel::new(), MeshType::Plane, &[0, 1]);
        let p = Point::new2(2.0, 2.0);
        let first: Vec<_> = locator.candidates(&p).collect();
        let second: Vec<_> = locator.candidates(&p).collect();
        assert_eq!(first, second);
        assert!(first.len() >= 6);
    }

    #[test]
    fn test_empty_locator() {
        let tds = Tds::new(true, true);
        let locator = TriangleLocator::new(&tds, RobustKernel::new(), MeshType::Plane, &[0, 1]);
        assert!(locator.is_empty());
        assert_eq!(locator.locate(&Point::ORIGIN), None);
    }

    // =============================================================================
    // SPHERICAL LOCATION
    // =============================================================================

    #[test]
    fn test_locator_on_octahedron_sphere() {
        let points = vec![
            Point::new([1.0, 0.0, 0.0]),
            Point::new([0.0, 1.0, 0.0]),
            Point::new([-1.0, 0.0, 0.0]),
            Point::new([0.0, -1.0, 0.0]),
            Point::new([0.0, 0.0, 1.0]),
            Point::new([0.0, 0.0, -1.0]),
        ];
        let triangles = [
            [0, 1, 4],
            [1, 2, 4],
            [2, 3, 4],
            [3, 0, 4],
            [1, 0, 5],
            [2, 1, 5],
            [3, 2, 5],
            [0, 3, 5],
        ];
        let tds = Tds::from_triangles(points, &triangles, true, true).unwrap();
        let locator =
            TriangleLocator::new(&tds, RobustKernel::new(), MeshType::Sphere, &[0, 1, 2]);

        // The centre of the first octant bulges well past the flat face.
        let p = Point::new([1.0, 1.0, 1.0]).normalized().unwrap();
        let t = locator.locate(&p).unwrap();
        let tri = tds.triangle(t);
        for v in [0, 1, 4] {
            assert!(tri.contains_vertex(crate::core::triangulation_data_structure::VertexId(v)));
        }
    }

    #[test]
    fn test_cap_height() {
        assert_eq!(cap_height(1.0, Some(0.0)), 0.0);
        assert!((cap_height(1.0, Some(0.6)) - 0.2).abs() < 1e-12);
        assert_eq!(cap_height(1.0, None), 1.0);
    }
}
