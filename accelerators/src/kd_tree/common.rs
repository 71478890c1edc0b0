//! KD Tree Common

use lsis_core::geometry::*;
use lsis_core::pbrt::*;
use lsis_core::stats::*;
use lsis_core::{stat_memory_counter, stat_ratio, stat_register_fns};
use ordered_float::OrderedFloat;
use std::fmt::Debug;

stat_memory_counter!("Memory/KD tree", TREE_BYTES, kd_tree_stats_tree_bytes);
stat_ratio!(
    "KD tree/Nodes visited per query",
    VISITED_NODES,
    QUERIES,
    kd_tree_stats_visited_per_query
);

stat_register_fns!(kd_tree_stats_tree_bytes, kd_tree_stats_visited_per_query);

/// A key that can be stored in a `KdTree`.
pub trait KdKey: Copy + Debug {
    /// Number of coordinate axes.
    const DIMENSIONS: usize;

    /// Returns the coordinate along an axis.
    ///
    /// * `axis` - Axis index in `[0, DIMENSIONS)`.
    fn axis_value(&self, axis: usize) -> Float;

    /// Returns the squared euclidean distance to another key.
    ///
    /// * `other` - The other key.
    fn sqr_distance(&self, other: &Self) -> Float {
        (0..Self::DIMENSIONS)
            .map(|axis| {
                let d = self.axis_value(axis) - other.axis_value(axis);
                d * d
            })
            .sum()
    }
}

impl KdKey for Point3f {
    const DIMENSIONS: usize = 3;

    fn axis_value(&self, axis: usize) -> Float {
        self[axis]
    }
}

impl<const N: usize> KdKey for [Float; N] {
    const DIMENSIONS: usize = N;

    fn axis_value(&self, axis: usize) -> Float {
        self[axis]
    }
}

/// A key/value pair placed in the tree.
#[derive(Clone, Debug)]
pub struct KdNode<K, V> {
    /// The key.
    pub key: K,

    /// The value.
    pub val: V,

    /// Axis the node splits its subtree on.
    pub axis: usize,
}

/// Result of a nearest neighbor query.
#[derive(Clone, Debug, PartialEq)]
pub struct KdNeighbor<K, V> {
    /// 1-based node index.
    pub index: usize,

    /// Key of the node.
    pub key: K,

    /// Value of the node.
    pub val: V,

    /// Distance from the query key.
    pub distance: Float,
}

/// Candidate kept in the bounded max-heap of a k-nearest query.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct Candidate {
    /// Squared distance to the query.
    pub sqr_distance: OrderedFloat<Float>,

    /// 1-based node index.
    pub index: usize,
}

/// Returns the size of the left subtree of a complete binary tree with `n`
/// nodes, so that the tree fills an implicit heap array without holes.
///
/// * `n` - Number of nodes; at least 1.
pub fn balanced_left_size(n: usize) -> usize {
    debug_assert!(n > 0);
    if n == 1 {
        return 0;
    }

    // Nodes above the last level are M - 1; R nodes sit on the last level.
    let m = 1_usize << n.log2int();
    let r = n - (m - 1);
    let upper = (m - 2) / 2;
    if r < m / 2 {
        upper + r
    } else {
        upper + m / 2
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn left_sizes_form_complete_trees() {
        let expected = [(1, 0), (2, 1), (3, 1), (4, 2), (5, 3), (6, 3), (7, 3), (8, 4), (12, 7), (15, 7)];
        for (n, left) in expected {
            assert_eq!(balanced_left_size(n), left, "n = {n}");
        }
    }

    #[test]
    fn array_keys() {
        let a = [0.0, 3.0];
        let b = [4.0, 0.0];
        assert_eq!(<[Float; 2] as KdKey>::DIMENSIONS, 2);
        assert_eq!(a.sqr_distance(&b), 25.0);
        assert_eq!(Point3f::new(1.0, 2.0, 3.0).axis_value(2), 3.0);
    }
}
