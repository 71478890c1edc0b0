//! KD Tree
//!
//! A balanced k-d tree over generic keys stored as an implicit heap: node
//! `i` (1-based) has children `2i` and `2i + 1`. Subtree sizes are chosen so
//! the array has no holes.

use crate::morton::*;
use lsis_core::geometry::*;
use lsis_core::pbrt::*;
use lsis_core::stat_inc;
use order_stat::kth_by;
use ordered_float::OrderedFloat;
use std::collections::{BinaryHeap, HashSet};

mod common;

use common::*;
pub use common::{balanced_left_size, KdKey, KdNeighbor, KdNode};

/// Balanced k-d tree mapping keys to values.
#[derive(Clone, Debug)]
pub struct KdTree<K, V> {
    /// Entries inserted since the last build.
    pending: Vec<(K, V)>,

    /// Heap ordered nodes; node `i` is stored at `nodes[i - 1]`.
    nodes: Vec<KdNode<K, V>>,

    /// Whether `nodes` reflects every inserted entry.
    built: bool,
}

impl<K: KdKey, V: Clone> Default for KdTree<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: KdKey, V: Clone> KdTree<K, V> {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self {
            pending: vec![],
            nodes: vec![],
            built: false,
        }
    }

    /// Add an entry. Inserting into a built tree invalidates the build; the
    /// existing entries are kept for the next one.
    ///
    /// * `key` - The key.
    /// * `val` - The value.
    pub fn insert(&mut self, key: K, val: V) {
        if self.built {
            self.pending.extend(self.nodes.drain(..).map(|n| (n.key, n.val)));
            self.built = false;
        }
        self.pending.push((key, val));
    }

    /// Reserve space for `n` more entries.
    ///
    /// * `n` - Number of entries.
    pub fn reserve(&mut self, n: usize) {
        self.pending.reserve(n);
    }

    /// Returns the number of entries.
    pub fn size(&self) -> usize {
        self.pending.len() + self.nodes.len()
    }

    /// Returns true once `build` or `build_z_order` ran after the last insert.
    pub fn is_built(&self) -> bool {
        self.built
    }

    /// Build the tree by splitting each subtree at the median of the axis
    /// with the largest spread.
    pub fn build(&mut self) {
        if self.built {
            return;
        }

        common::register_stats();

        let mut items = std::mem::take(&mut self.pending);
        let n = items.len();
        let mut slots: Vec<Option<KdNode<K, V>>> = vec![None; n];
        Self::build_recurse(&mut items, 1, &mut slots);

        self.nodes = slots.into_iter().flatten().collect();
        assert_eq!(self.nodes.len(), n, "k-d tree heap has holes");
        self.built = true;

        stat_inc!(TREE_BYTES, (n * std::mem::size_of::<KdNode<K, V>>()) as u64);
        debug!("KD tree built with {} nodes", n);
    }

    /// Build the tree after ordering the entries along a Z-order curve over
    /// their first three axes. Subtrees still split at axis medians, so the
    /// resulting tree matches `build()`: the Morton order only changes the
    /// permutation the median selection starts from, and with it which of
    /// several entries sharing a split coordinate lands where.
    pub fn build_z_order(&mut self) {
        if self.built {
            return;
        }

        let dims = min(K::DIMENSIONS, 3);
        let mut lo = [INFINITY; 3];
        let mut hi = [-INFINITY; 3];
        for (key, _) in self.pending.iter() {
            for a in 0..dims {
                lo[a] = min(lo[a], key.axis_value(a));
                hi[a] = max(hi[a], key.axis_value(a));
            }
        }

        let unit = |key: &K| {
            let mut v = Vector3f::zero();
            for a in 0..dims {
                let extent = hi[a] - lo[a];
                let o = if extent > 0.0 { (key.axis_value(a) - lo[a]) / extent } else { 0.0 };
                v[Axis::from(a)] = o;
            }
            v
        };
        self.pending.sort_by_cached_key(|(key, _)| MortonCode::from_unit_point(&unit(key)));

        self.build();
    }

    /// Place the median of `items` at heap index `index` and recurse.
    ///
    /// * `items` - Entries of the subtree.
    /// * `index` - 1-based heap index of the subtree root.
    /// * `slots` - Output heap.
    fn build_recurse(items: &mut [(K, V)], index: usize, slots: &mut [Option<KdNode<K, V>>]) {
        if items.is_empty() {
            return;
        }

        let axis = optimal_axis(items);
        let median = balanced_left_size(items.len());
        kth_by(items, median, |a, b| {
            OrderedFloat(a.0.axis_value(axis)).cmp(&OrderedFloat(b.0.axis_value(axis)))
        });

        let (key, val) = &items[median];
        slots[index - 1] = Some(KdNode {
            key: *key,
            val: val.clone(),
            axis,
        });

        let (left, rest) = items.split_at_mut(median);
        Self::build_recurse(left, 2 * index, slots);
        Self::build_recurse(&mut rest[1..], 2 * index + 1, slots);
    }

    /// Returns the node at a 1-based index.
    ///
    /// * `index` - 1-based node index.
    fn node(&self, index: usize) -> Option<&KdNode<K, V>> {
        index.checked_sub(1).and_then(|i| self.nodes.get(i))
    }

    /// Depth first branch and bound search for the closest accepted node.
    ///
    /// * `key`    - Query key.
    /// * `index`  - Current 1-based node index.
    /// * `accept` - Filters candidate nodes by index.
    /// * `best`   - Best squared distance and node index so far.
    fn nearest_recurse<F>(&self, key: &K, index: usize, accept: &F, best: &mut (Float, usize))
    where
        F: Fn(usize) -> bool,
    {
        stat_inc!(VISITED_NODES, 1);
        let node = &self.nodes[index - 1];
        let d = key.sqr_distance(&node.key);
        if accept(index) && (d < best.0 || (best.1 == 0 && d <= best.0)) {
            *best = (d, index);
        }

        let diff = key.axis_value(node.axis) - node.key.axis_value(node.axis);
        let (near, far) = if diff <= 0.0 {
            (2 * index, 2 * index + 1)
        } else {
            (2 * index + 1, 2 * index)
        };

        if near <= self.nodes.len() {
            self.nearest_recurse(key, near, accept, best);
        }
        if far <= self.nodes.len() && diff * diff <= best.0 {
            self.nearest_recurse(key, far, accept, best);
        }
    }

    /// Runs a nearest query with a node filter.
    ///
    /// * `key`      - Query key.
    /// * `max_dist` - Maximum distance.
    /// * `accept`   - Filters candidate nodes by index.
    fn nearest_filtered<F>(&self, key: &K, max_dist: Float, accept: F) -> Option<KdNeighbor<K, V>>
    where
        F: Fn(usize) -> bool,
    {
        if self.nodes.is_empty() {
            return None;
        }

        stat_inc!(QUERIES, 1);
        let mut best = (max_dist * max_dist, 0);
        self.nearest_recurse(key, 1, &accept, &mut best);
        self.neighbor(best.1, best.0)
    }

    /// Wraps a node into a query result.
    ///
    /// * `index`        - 1-based node index; 0 for none.
    /// * `sqr_distance` - Squared distance to the query.
    fn neighbor(&self, index: usize, sqr_distance: Float) -> Option<KdNeighbor<K, V>> {
        self.node(index).map(|n| KdNeighbor {
            index,
            key: n.key,
            val: n.val.clone(),
            distance: sqr_distance.sqrt(),
        })
    }

    /// Returns the closest node within `max_dist` of `key`.
    ///
    /// * `key`      - Query key.
    /// * `max_dist` - Maximum distance; `INFINITY` for no limit.
    pub fn nearest(&self, key: &K, max_dist: Float) -> Option<KdNeighbor<K, V>> {
        self.nearest_filtered(key, max_dist, |_| true)
    }

    /// Returns the closest node to the node at `index`, excluding itself.
    ///
    /// * `index`    - 1-based node index.
    /// * `max_dist` - Maximum distance.
    pub fn nearest_to_node(&self, index: usize, max_dist: Float) -> Option<KdNeighbor<K, V>> {
        let key = self.node(index)?.key;
        self.nearest_except_self(&key, max_dist, index)
    }

    /// Returns the closest node other than `self_index`.
    ///
    /// * `key`        - Query key.
    /// * `max_dist`   - Maximum distance.
    /// * `self_index` - 1-based index of the node to skip.
    pub fn nearest_except_self(&self, key: &K, max_dist: Float, self_index: usize) -> Option<KdNeighbor<K, V>> {
        self.nearest_filtered(key, max_dist, |i| i != self_index)
    }

    /// Returns the closest node whose index is not in `except`.
    ///
    /// * `key`      - Query key.
    /// * `max_dist` - Maximum distance.
    /// * `except`   - 1-based indices of nodes to skip.
    pub fn nearest_except(&self, key: &K, max_dist: Float, except: &HashSet<usize>) -> Option<KdNeighbor<K, V>> {
        self.nearest_filtered(key, max_dist, |i| !except.contains(&i))
    }

    /// Returns up to `n` closest nodes within `max_dist`, closest first.
    ///
    /// * `key`      - Query key.
    /// * `n`        - Maximum number of results.
    /// * `max_dist` - Maximum distance.
    pub fn n_nearest(&self, key: &K, n: usize, max_dist: Float) -> Vec<KdNeighbor<K, V>> {
        if n == 0 || self.nodes.is_empty() {
            return vec![];
        }

        stat_inc!(QUERIES, 1);
        let mut heap = BinaryHeap::with_capacity(n + 1);
        self.n_nearest_recurse(key, 1, n, max_dist * max_dist, &mut heap);

        heap.into_sorted_vec()
            .into_iter()
            .filter_map(|c| self.neighbor(c.index, c.sqr_distance.0))
            .collect()
    }

    /// Recursive part of `n_nearest`.
    ///
    /// * `key`     - Query key.
    /// * `index`   - Current 1-based node index.
    /// * `n`       - Maximum number of results.
    /// * `max_sqr` - Squared maximum distance.
    /// * `heap`    - Max-heap of the best candidates so far.
    fn n_nearest_recurse(
        &self,
        key: &K,
        index: usize,
        n: usize,
        max_sqr: Float,
        heap: &mut BinaryHeap<Candidate>,
    ) {
        let radius = |heap: &BinaryHeap<Candidate>| match heap.peek() {
            Some(top) if heap.len() == n => top.sqr_distance.0,
            _ => max_sqr,
        };

        stat_inc!(VISITED_NODES, 1);
        let node = &self.nodes[index - 1];
        let d = key.sqr_distance(&node.key);
        if d <= radius(heap) {
            heap.push(Candidate {
                sqr_distance: OrderedFloat(d),
                index,
            });
            if heap.len() > n {
                heap.pop();
            }
        }

        let diff = key.axis_value(node.axis) - node.key.axis_value(node.axis);
        let (near, far) = if diff <= 0.0 {
            (2 * index, 2 * index + 1)
        } else {
            (2 * index + 1, 2 * index)
        };

        if near <= self.nodes.len() {
            self.n_nearest_recurse(key, near, n, max_sqr, heap);
        }
        if far <= self.nodes.len() && diff * diff <= radius(heap) {
            self.n_nearest_recurse(key, far, n, max_sqr, heap);
        }
    }

    /// Returns the 1-based index of the node holding exactly `key` and `val`.
    ///
    /// * `key` - The key.
    /// * `val` - The value.
    pub fn find(&self, key: &K, val: &V) -> Option<usize>
    where
        K: PartialEq,
        V: PartialEq,
    {
        if self.nodes.is_empty() {
            return None;
        }
        self.find_recurse(key, val, 1)
    }

    /// Recursive part of `find`.
    ///
    /// * `key`   - The key.
    /// * `val`   - The value.
    /// * `index` - Current 1-based node index.
    fn find_recurse(&self, key: &K, val: &V, index: usize) -> Option<usize>
    where
        K: PartialEq,
        V: PartialEq,
    {
        let node = &self.nodes[index - 1];
        if node.key == *key && node.val == *val {
            return Some(index);
        }

        // Keys equal to the split value may sit on either side.
        let diff = key.axis_value(node.axis) - node.key.axis_value(node.axis);
        let mut found = None;
        if diff <= 0.0 && 2 * index <= self.nodes.len() {
            found = self.find_recurse(key, val, 2 * index);
        }
        if found.is_none() && diff >= 0.0 && 2 * index + 1 <= self.nodes.len() {
            found = self.find_recurse(key, val, 2 * index + 1);
        }
        found
    }

    /// Replace the value of a node and return the old one.
    ///
    /// * `index` - 1-based node index.
    /// * `val`   - New value.
    pub fn exchange_val(&mut self, index: usize, val: V) -> Option<V> {
        let i = index.checked_sub(1)?;
        self.nodes.get_mut(i).map(|n| std::mem::replace(&mut n.val, val))
    }

    /// Returns the built nodes with their 1-based indices.
    pub fn nodes(&self) -> impl Iterator<Item = (usize, &K, &V)> {
        self.nodes.iter().enumerate().map(|(i, n)| (i + 1, &n.key, &n.val))
    }
}

/// Returns the axis along which the keys spread the most.
///
/// * `items` - Entries to inspect; not empty.
fn optimal_axis<K: KdKey, V>(items: &[(K, V)]) -> usize {
    let mut best_axis = 0;
    let mut best_spread = -INFINITY;
    for axis in 0..K::DIMENSIONS {
        let (lo, hi) = items.iter().fold((INFINITY, -INFINITY), |(lo, hi), (k, _)| {
            let v = k.axis_value(axis);
            (min(lo, v), max(hi, v))
        });
        if hi - lo > best_spread {
            best_spread = hi - lo;
            best_axis = axis;
        }
    }
    best_axis
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::*;
    use lsis_core::rng::RNG;

    fn random_tree(n: usize, seed: u64, z_order: bool) -> (KdTree<Point3f, usize>, Vec<Point3f>) {
        let mut rng = RNG::new(seed);
        let scene = Bounds3f::new(Point3f::zero(), Point3f::new(100.0, 100.0, 100.0));
        let points: Vec<Point3f> = (0..n).map(|_| rng.uniform_point(&scene)).collect();

        let mut tree = KdTree::new();
        tree.reserve(n);
        for (i, p) in points.iter().enumerate() {
            tree.insert(*p, i);
        }
        if z_order {
            tree.build_z_order();
        } else {
            tree.build();
        }
        (tree, points)
    }

    fn brute_force(points: &[Point3f], q: &Point3f) -> Float {
        points
            .iter()
            .map(|p| p.sqr_distance(q))
            .fold(INFINITY, |a, b| min(a, b))
            .sqrt()
    }

    /// Every subtree respects the split of its root.
    fn check_partitions<K: KdKey, V: Clone>(tree: &KdTree<K, V>) {
        let n = tree.nodes.len();
        for i in 1..=n {
            let node = &tree.nodes[i - 1];
            let split = node.key.axis_value(node.axis);
            let mut stack = vec![(2 * i, true), (2 * i + 1, false)];
            while let Some((j, left)) = stack.pop() {
                if j > n {
                    continue;
                }
                let v = tree.nodes[j - 1].key.axis_value(node.axis);
                if left {
                    assert!(v <= split);
                } else {
                    assert!(v >= split);
                }
                stack.push((2 * j, left));
                stack.push((2 * j + 1, left));
            }
        }
    }

    #[test]
    fn empty_tree() {
        let mut tree: KdTree<Point3f, u32> = KdTree::new();
        tree.build();
        assert!(tree.is_built());
        assert_eq!(tree.size(), 0);
        assert!(tree.nearest(&Point3f::zero(), INFINITY).is_none());
        assert!(tree.n_nearest(&Point3f::zero(), 3, INFINITY).is_empty());
    }

    #[test]
    fn heap_has_every_entry() {
        for n in [1, 2, 3, 7, 8, 100] {
            let (tree, _) = random_tree(n, n as u64, false);
            assert_eq!(tree.size(), n);
            let mut vals: Vec<usize> = tree.nodes().map(|(_, _, v)| *v).collect();
            vals.sort_unstable();
            assert_eq!(vals, (0..n).collect::<Vec<usize>>());
            check_partitions(&tree);
        }
    }

    #[test]
    fn z_order_build_matches_median_build() {
        let (median, _) = random_tree(257, 31, false);
        let (z_order, _) = random_tree(257, 31, true);
        let a: Vec<(usize, Point3f, usize)> = median.nodes().map(|(i, k, v)| (i, *k, *v)).collect();
        let b: Vec<(usize, Point3f, usize)> = z_order.nodes().map(|(i, k, v)| (i, *k, *v)).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn nearest_matches_brute_force() {
        for z_order in [false, true] {
            let (tree, points) = random_tree(500, 17, z_order);
            check_partitions(&tree);

            let mut rng = RNG::new(99);
            let scene = Bounds3f::new(Point3f::new(-10.0, -10.0, -10.0), Point3f::new(110.0, 110.0, 110.0));
            for _ in 0..1000 {
                let q = rng.uniform_point(&scene);
                let found = tree.nearest(&q, INFINITY).unwrap();
                assert!(approx_eq!(Float, found.distance, brute_force(&points, &q), epsilon = 1e-3));
                assert_eq!(found.key, points[found.val]);
            }
        }
    }

    #[test]
    fn n_nearest_matches_brute_force() {
        let (tree, points) = random_tree(300, 23, false);
        let mut rng = RNG::new(5);
        let scene = Bounds3f::new(Point3f::zero(), Point3f::new(100.0, 100.0, 100.0));
        for _ in 0..100 {
            let q = rng.uniform_point(&scene);
            let found = tree.n_nearest(&q, 8, INFINITY);
            assert_eq!(found.len(), 8);

            let mut expected: Vec<Float> = points.iter().map(|p| p.sqr_distance(&q).sqrt()).collect();
            expected.sort_by(|a, b| a.total_cmp(b));
            for (f, e) in found.iter().zip(expected.iter()) {
                assert!(approx_eq!(Float, f.distance, *e, epsilon = 1e-3));
            }
        }
    }

    #[test]
    fn max_dist_limits_results() {
        let mut tree: KdTree<[Float; 2], char> = KdTree::new();
        tree.insert([0.0, 0.0], 'a');
        tree.insert([10.0, 0.0], 'b');
        tree.build();

        assert!(tree.nearest(&[5.0, 4.0], 5.0).is_none());
        assert_eq!(tree.nearest(&[4.0, 0.0], 5.0).unwrap().val, 'a');
        assert_eq!(tree.n_nearest(&[4.0, 0.0], 5, 7.0).len(), 2);
        assert_eq!(tree.n_nearest(&[4.0, 0.0], 5, 5.0).len(), 1);
    }

    #[test]
    fn exclusions() {
        let mut tree: KdTree<[Float; 1], usize> = KdTree::new();
        for (i, x) in [0.0, 1.0, 3.0, 6.0].iter().enumerate() {
            tree.insert([*x], i);
        }
        tree.build();

        let a = tree.find(&[0.0], &0).unwrap();
        let b = tree.find(&[1.0], &1).unwrap();
        assert_eq!(tree.nearest(&[0.0], INFINITY).unwrap().index, a);
        assert_eq!(tree.nearest_except_self(&[0.0], INFINITY, a).unwrap().val, 1);
        assert_eq!(tree.nearest_to_node(a, INFINITY).unwrap().val, 1);

        let except: HashSet<usize> = [a, b].into_iter().collect();
        assert_eq!(tree.nearest_except(&[0.0], INFINITY, &except).unwrap().val, 2);
    }

    #[test]
    fn find_and_exchange() {
        let (mut tree, points) = random_tree(64, 3, false);
        for (i, p) in points.iter().enumerate() {
            let index = tree.find(p, &i).unwrap();
            assert_eq!(tree.exchange_val(index, i + 1000), Some(i));
        }
        assert!(tree.nodes().all(|(_, _, v)| *v >= 1000));
        assert_eq!(tree.find(&Point3f::new(-1.0, -1.0, -1.0), &0), None);
        assert_eq!(tree.exchange_val(0, 0), None);
        assert_eq!(tree.exchange_val(65, 0), None);
    }

    #[test]
    fn insert_after_build_keeps_entries() {
        let (mut tree, _) = random_tree(10, 8, false);
        tree.insert(Point3f::new(50.0, 50.0, 50.0), 10);
        assert!(!tree.is_built());
        assert_eq!(tree.size(), 11);
        assert!(tree.nearest(&Point3f::zero(), INFINITY).is_none());

        tree.build();
        assert_eq!(tree.size(), 11);
        assert_eq!(tree.nearest(&Point3f::new(50.0, 50.0, 50.0), 0.5).unwrap().val, 10);
    }

    #[test]
    fn duplicate_keys() {
        let mut tree: KdTree<[Float; 2], i32> = KdTree::new();
        for i in 0..9 {
            tree.insert([1.0, 1.0], i);
        }
        tree.build();
        check_partitions(&tree);
        for i in 0..9 {
            assert!(tree.find(&[1.0, 1.0], &i).is_some());
        }
        assert_eq!(tree.n_nearest(&[1.0, 1.0], 4, 0.0).len(), 4);
    }
}
