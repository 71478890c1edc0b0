//! BVH Common

use lsis_core::geometry::*;
use lsis_core::gpu::GpuBvhNode;
use lsis_core::mesh::*;
use lsis_core::pbrt::*;
use lsis_core::stats::*;
use lsis_core::{stat_counter, stat_inc, stat_memory_counter, stat_register_fns};

stat_memory_counter!("Memory/BVH tree", TREE_BYTES, bvh_stats_tree_bytes);
stat_counter!("BVH/Interior nodes", INTERIOR_NODES, bvh_stats_interior_nodes);
stat_counter!("BVH/Leaf nodes", LEAF_NODES, bvh_stats_leaf_nodes);
stat_counter!("BVH/Degenerate splits", DEGENERATE_SPLITS, bvh_stats_degenerate_splits);

stat_register_fns!(
    bvh_stats_tree_bytes,
    bvh_stats_interior_nodes,
    bvh_stats_leaf_nodes,
    bvh_stats_degenerate_splits,
);

/// Splitting method to use to subdivide primitives.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum SplitMethod {
    /// Binned Surface Area Heuristic.
    #[default]
    SAH,

    /// Linear Bounding Volume Hierarchy. Primitives are sorted along a Morton
    /// curve and split where the highest differing code bit changes.
    LBVH,
}

impl From<&str> for SplitMethod {
    /// Parse a split method name, falling back to SAH.
    ///
    /// * `name` - "sah" or "lbvh".
    fn from(name: &str) -> Self {
        match name {
            "sah" => SplitMethod::SAH,
            "lbvh" => SplitMethod::LBVH,
            sm => {
                warn!("BVH split method '{}' unknown.  Using 'sah'.", sm);
                SplitMethod::SAH
            }
        }
    }
}

/// BVH node. Interior nodes store child indices; leaves have `left == -1`
/// and store the primitive index in `right`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct BVHNode {
    /// Index of the left child or -1 for leaves.
    pub left: i32,

    /// Index of the right child or the primitive index for leaves.
    pub right: i32,
}

impl BVHNode {
    /// Creates a leaf node.
    ///
    /// * `primitive` - Index of the primitive.
    pub fn new_leaf_node(primitive: u32) -> Self {
        stat_inc!(LEAF_NODES, 1);
        Self {
            left: -1,
            right: primitive as i32,
        }
    }

    /// Creates an interior node.
    ///
    /// * `left`  - Index of the left child.
    /// * `right` - Index of the right child.
    pub fn new_interior_node(left: usize, right: usize) -> Self {
        stat_inc!(INTERIOR_NODES, 1);
        Self {
            left: left as i32,
            right: right as i32,
        }
    }

    /// Returns true for leaf nodes.
    pub fn is_leaf(&self) -> bool {
        self.left < 0
    }

    /// Returns the primitive index of a leaf.
    pub fn primitive(&self) -> Option<usize> {
        self.is_leaf().then_some(self.right as usize)
    }

    /// Returns the child indices of an interior node.
    pub fn children(&self) -> Option<(usize, usize)> {
        (!self.is_leaf()).then_some((self.left as usize, self.right as usize))
    }
}

impl From<&BVHNode> for GpuBvhNode {
    fn from(n: &BVHNode) -> Self {
        Self {
            left: n.left,
            right: n.right,
        }
    }
}

/// SAH bucket information.
#[derive(Copy, Clone, Debug)]
pub struct BucketInfo {
    /// Count of primitives.
    pub count: usize,

    /// Bounding box for the bucket.
    pub bounds: Bounds3f,
}

impl Default for BucketInfo {
    /// Returns the "default value" for `BucketInfo`.
    fn default() -> Self {
        Self {
            count: 0,
            bounds: Bounds3f::EMPTY,
        }
    }
}

/// Per primitive build inputs shared by both builders, indexed by primitive.
#[derive(Clone, Debug, Default)]
pub struct BVHPrimitiveInfo {
    /// Exact bounds of each triangle.
    pub bounds: Vec<Bounds3f>,

    /// Centroid of each triangle.
    pub centroids: Vec<Point3f>,
}

impl BVHPrimitiveInfo {
    /// Computes triangle bounds with bounding box midpoints as centroids.
    ///
    /// * `vertices` - Vertex buffer.
    /// * `faces`    - Triangles.
    pub fn with_box_centroids(vertices: &[Vertex], faces: &[Face]) -> Self {
        let bounds: Vec<Bounds3f> = faces.iter().map(|f| f.bounds(vertices)).collect();
        let centroids = bounds.iter().map(|b| b.centroid()).collect();
        Self { bounds, centroids }
    }

    /// Returns the number of primitives.
    pub fn len(&self) -> usize {
        self.bounds.len()
    }

    /// Returns true if there are no primitives.
    pub fn is_empty(&self) -> bool {
        self.bounds.is_empty()
    }

    /// Returns the bounds of all centroids.
    pub fn centroid_bounds(&self) -> Bounds3f {
        Bounds3f::from_points(self.centroids.iter())
    }
}

/// Records the size of a finished tree.
///
/// * `n_nodes` - Number of nodes.
pub(crate) fn report_tree_bytes(n_nodes: usize) {
    let bytes = n_nodes * (std::mem::size_of::<BVHNode>() + std::mem::size_of::<Bounds3f>());
    stat_inc!(TREE_BYTES, bytes as u64);
}

/// Counts a split that fell back to the middle of the range.
pub(crate) fn report_degenerate_split() {
    stat_inc!(DEGENERATE_SPLITS, 1);
}

/// Returns the number of nodes of a binary tree with one primitive per
/// leaf.
///
/// * `n_primitives` - Number of primitives.
pub fn node_count(n_primitives: usize) -> usize {
    if n_primitives == 0 {
        0
    } else {
        2 * n_primitives - 1
    }
}

/// Binning along the widest axis of a centroid bound. Bin `i` covers the
/// `i`-th of `n_bins` equal slabs.
#[derive(Copy, Clone, Debug)]
pub struct Binning {
    /// Axis of the slabs.
    pub axis: Axis,

    /// Number of bins.
    pub n_bins: usize,

    /// Minimum of the centroid bound along `axis`.
    k0: Float,

    /// `n_bins (1 - ε) / extent`.
    k1: Float,
}

impl Binning {
    /// Creates a binning over `centroid_bounds`. Returns `None` if the
    /// extent along the widest axis is zero.
    ///
    /// * `centroid_bounds` - Bound of the centroids to bin.
    /// * `n_bins`          - Number of bins.
    pub fn new(centroid_bounds: &Bounds3f, n_bins: usize) -> Option<Self> {
        let axis = centroid_bounds.maximum_extent();
        let extent = centroid_bounds.p_max[axis] - centroid_bounds.p_min[axis];
        let k1 = n_bins as Float * (1.0 - 1e-6) / extent;
        if extent > 0.0 && k1.is_finite() {
            Some(Self {
                axis,
                n_bins,
                k0: centroid_bounds.p_min[axis],
                k1,
            })
        } else {
            None
        }
    }

    /// Returns the bin containing a centroid.
    ///
    /// * `c` - Centroid inside the bound the binning was created from.
    #[inline]
    pub fn bin(&self, c: &Point3f) -> usize {
        let b = (self.k1 * (c[self.axis] - self.k0)) as usize;
        min(b, self.n_bins - 1)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_method_from_str() {
        assert_eq!(SplitMethod::from("sah"), SplitMethod::SAH);
        assert_eq!(SplitMethod::from("lbvh"), SplitMethod::LBVH);
        assert_eq!(SplitMethod::from("middle"), SplitMethod::SAH);
    }

    #[test]
    fn leaf_and_interior_nodes() {
        let leaf = BVHNode::new_leaf_node(7);
        assert!(leaf.is_leaf());
        assert_eq!(leaf.primitive(), Some(7));
        assert_eq!(leaf.children(), None);

        let interior = BVHNode::new_interior_node(1, 2);
        assert!(!interior.is_leaf());
        assert_eq!(interior.children(), Some((1, 2)));
        assert_eq!(GpuBvhNode::from(&leaf), GpuBvhNode { left: -1, right: 7 });
    }

    #[test]
    fn binning_covers_range() {
        let cb = Bounds3f::new(Point3f::new(0.0, 0.0, 0.0), Point3f::new(16.0, 1.0, 1.0));
        let b = Binning::new(&cb, 16).unwrap();
        assert_eq!(b.axis, Axis::X);
        assert_eq!(b.bin(&Point3f::new(0.0, 0.0, 0.0)), 0);
        assert_eq!(b.bin(&Point3f::new(1.5, 0.0, 0.0)), 1);
        assert_eq!(b.bin(&Point3f::new(16.0, 0.0, 0.0)), 15);
    }

    #[test]
    fn binning_rejects_flat_bounds() {
        let p = Point3f::new(1.0, 2.0, 3.0);
        assert!(Binning::new(&Bounds3f::from(p), 16).is_none());
    }

    #[test]
    fn node_counts() {
        assert_eq!(node_count(0), 0);
        assert_eq!(node_count(1), 1);
        assert_eq!(node_count(8), 15);
    }
}
