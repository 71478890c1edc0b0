//! Binned Surface Area Heuristic Algorithm
//!
//! Breadth first: nodes are numbered in the order their parent is split, so
//! both children of a node are adjacent and every leaf holds one primitive.

use super::common::*;
use lsis_core::geometry::*;
use lsis_core::pbrt::*;
use std::collections::VecDeque;

/// Number of SAH bins.
pub const N_BUCKETS: usize = 16;

/// A node waiting to be split.
struct WorkItem {
    /// Node index to fill.
    index: usize,

    /// First primitive slot (inclusive).
    start: usize,

    /// Last primitive slot (exclusive).
    end: usize,

    /// Bound of the centroids in `[start, end)`.
    centroid_bounds: Bounds3f,
}

/// Builds a BVH over the primitives and returns the node and bounds arrays,
/// both of size `2N - 1`.
///
/// * `info` - Primitive bounds and centroids.
pub fn build(info: &BVHPrimitiveInfo) -> (Vec<BVHNode>, Vec<Bounds3f>) {
    let n_primitives = info.len();
    if n_primitives == 0 {
        return (vec![], vec![]);
    }

    let total_nodes = node_count(n_primitives);
    let mut nodes = vec![BVHNode::default(); total_nodes];
    let mut bounds = vec![Bounds3f::EMPTY; total_nodes];
    let mut ids: Vec<u32> = (0..n_primitives as u32).collect();
    let mut next_index = 1;

    let mut queue = VecDeque::new();
    queue.push_back(WorkItem {
        index: 0,
        start: 0,
        end: n_primitives,
        centroid_bounds: info.centroid_bounds(),
    });

    while let Some(item) = queue.pop_front() {
        let n = item.end - item.start;
        assert!(n > 0, "empty range reached the SAH builder");

        if n == 1 {
            let id = ids[item.start];
            nodes[item.index] = BVHNode::new_leaf_node(id);
            bounds[item.index] = info.bounds[id as usize];
            continue;
        }

        let node_bounds = ids[item.start..item.end]
            .iter()
            .fold(Bounds3f::EMPTY, |b, &id| b.union(&info.bounds[id as usize]));

        let (mid, left_cb, right_cb) = match Binning::new(&item.centroid_bounds, N_BUCKETS) {
            Some(binning) => split_sah(info, &mut ids, item.start, item.end, &binning),
            None => None,
        }
        .unwrap_or_else(|| split_middle(info, &ids, item.start, item.end));

        let left = next_index;
        let right = next_index + 1;
        next_index += 2;

        nodes[item.index] = BVHNode::new_interior_node(left, right);
        bounds[item.index] = node_bounds;

        queue.push_back(WorkItem {
            index: left,
            start: item.start,
            end: mid,
            centroid_bounds: left_cb,
        });
        queue.push_back(WorkItem {
            index: right,
            start: mid,
            end: item.end,
            centroid_bounds: right_cb,
        });
    }

    debug_assert_eq!(next_index, total_nodes);
    (nodes, bounds)
}

/// Bins the range, picks the cheapest split plane and partitions `ids`
/// around it. Returns the split position and the centroid bounds of both
/// halves, or `None` if no plane separates the range.
///
/// * `info`    - Primitive bounds and centroids.
/// * `ids`     - Primitive order; `[start, end)` is reordered.
/// * `start`   - First slot (inclusive).
/// * `end`     - Last slot (exclusive).
/// * `binning` - Binning of the range's centroid bound.
fn split_sah(
    info: &BVHPrimitiveInfo,
    ids: &mut [u32],
    start: usize,
    end: usize,
    binning: &Binning,
) -> Option<(usize, Bounds3f, Bounds3f)> {
    let mut buckets = [BucketInfo::default(); N_BUCKETS];
    for &id in ids[start..end].iter() {
        let c = &info.centroids[id as usize];
        let b = binning.bin(c);
        buckets[b].count += 1;
        buckets[b].bounds = buckets[b].bounds.union(&info.bounds[id as usize]);
    }

    let split = find_optimal_split(&buckets)?;
    let (mid, left_cb, right_cb) = reorder_ids(info, ids, start, end, split, binning);

    assert!(
        mid > start && mid < end,
        "SAH split {mid} does not divide range [{start}, {end})"
    );
    Some((mid, left_cb, right_cb))
}

/// Returns the bucket after which splitting minimizes
/// `A_l N_l + A_r N_r`, skipping splits with an empty side.
///
/// * `buckets` - Binned primitive counts and bounds.
fn find_optimal_split(buckets: &[BucketInfo; N_BUCKETS]) -> Option<usize> {
    // Sweep from the left and right accumulating area and count.
    let mut area_left = [0.0 as Float; N_BUCKETS];
    let mut count_left = [0_usize; N_BUCKETS];
    let mut b = Bounds3f::EMPTY;
    let mut n = 0;
    for i in 0..N_BUCKETS {
        b = b.union(&buckets[i].bounds);
        n += buckets[i].count;
        area_left[i] = b.surface_area();
        count_left[i] = n;
    }

    let mut area_right = [0.0 as Float; N_BUCKETS];
    let mut count_right = [0_usize; N_BUCKETS];
    let mut b = Bounds3f::EMPTY;
    let mut n = 0;
    for i in (0..N_BUCKETS).rev() {
        b = b.union(&buckets[i].bounds);
        n += buckets[i].count;
        area_right[i] = b.surface_area();
        count_right[i] = n;
    }

    let mut best: Option<(usize, Float)> = None;
    for i in 0..N_BUCKETS - 1 {
        if count_left[i] == 0 || count_right[i + 1] == 0 {
            continue;
        }
        let cost = area_left[i] * count_left[i] as Float + area_right[i + 1] * count_right[i + 1] as Float;
        if best.map_or(true, |(_, best_cost)| cost < best_cost) {
            best = Some((i, cost));
        }
    }

    best.map(|(i, _)| i)
}

/// Two pointer partition of `ids[start..end]` so that primitives in bins
/// `<= split` come first. Centroid bounds of both halves are accumulated in
/// the same pass.
///
/// * `info`    - Primitive bounds and centroids.
/// * `ids`     - Primitive order.
/// * `start`   - First slot (inclusive).
/// * `end`     - Last slot (exclusive).
/// * `split`   - Last bin of the left half.
/// * `binning` - Binning used to compute bins.
fn reorder_ids(
    info: &BVHPrimitiveInfo,
    ids: &mut [u32],
    start: usize,
    end: usize,
    split: usize,
    binning: &Binning,
) -> (usize, Bounds3f, Bounds3f) {
    let centroid = |id: u32| info.centroids[id as usize];
    let goes_left = |c: &Point3f| binning.bin(c) <= split;

    let mut left = start;
    let mut right = end - 1;
    let mut left_cb = Bounds3f::EMPTY;
    let mut right_cb = Bounds3f::EMPTY;

    while left < right {
        let c = centroid(ids[left]);
        if goes_left(&c) {
            left_cb = left_cb.union(&c);
            left += 1;
            continue;
        }

        // Find a primitive on the right that belongs on the left.
        while left < right {
            let c = centroid(ids[right]);
            if goes_left(&c) {
                ids.swap(left, right);
                break;
            }
            right_cb = right_cb.union(&c);
            right -= 1;
        }
    }

    assert_eq!(left, right);
    let c = centroid(ids[left]);
    let mid = if goes_left(&c) {
        left_cb = left_cb.union(&c);
        left + 1
    } else {
        right_cb = right_cb.union(&c);
        left
    };

    debug_assert!(ids[start..mid].iter().all(|&id| goes_left(&centroid(id))));
    debug_assert!(ids[mid..end].iter().all(|&id| !goes_left(&centroid(id))));
    (mid, left_cb, right_cb)
}

/// Splits a range whose centroids cannot be separated at its middle.
///
/// * `info`  - Primitive bounds and centroids.
/// * `ids`   - Primitive order.
/// * `start` - First slot (inclusive).
/// * `end`   - Last slot (exclusive).
fn split_middle(info: &BVHPrimitiveInfo, ids: &[u32], start: usize, end: usize) -> (usize, Bounds3f, Bounds3f) {
    debug!("SAH: degenerate centroid bounds for {} primitives, splitting at the middle", end - start);
    report_degenerate_split();

    let mid = (start + end) / 2;
    let cb = |range: &[u32]| Bounds3f::from_points(range.iter().map(|&id| &info.centroids[id as usize]));
    (mid, cb(&ids[start..mid]), cb(&ids[mid..end]))
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn info_from_boxes(boxes: &[Bounds3f]) -> BVHPrimitiveInfo {
        BVHPrimitiveInfo {
            bounds: boxes.to_vec(),
            centroids: boxes.iter().map(|b| b.centroid()).collect(),
        }
    }

    fn unit_box_at(x: Float) -> Bounds3f {
        Bounds3f::new(Point3f::new(x, 0.0, 0.0), Point3f::new(x + 1.0, 1.0, 1.0))
    }

    #[test]
    fn empty_input() {
        let (nodes, bounds) = build(&BVHPrimitiveInfo::default());
        assert!(nodes.is_empty());
        assert!(bounds.is_empty());
    }

    #[test]
    fn single_primitive_is_root_leaf() {
        let b = unit_box_at(3.0);
        let (nodes, bounds) = build(&info_from_boxes(&[b]));
        assert_eq!(nodes, vec![BVHNode { left: -1, right: 0 }]);
        assert_eq!(bounds, vec![b]);
    }

    #[test]
    fn breadth_first_layout() {
        let boxes: Vec<Bounds3f> = (0..4).map(|i| unit_box_at(10.0 * i as Float)).collect();
        let (nodes, bounds) = build(&info_from_boxes(&boxes));
        assert_eq!(nodes.len(), 7);
        assert_eq!(nodes[0], BVHNode { left: 1, right: 2 });
        assert_eq!(nodes[1], BVHNode { left: 3, right: 4 });
        assert_eq!(nodes[2], BVHNode { left: 5, right: 6 });
        for (i, n) in nodes[3..].iter().enumerate() {
            assert_eq!(*n, BVHNode { left: -1, right: i as i32 });
        }
        assert_eq!(bounds[0], boxes.iter().fold(Bounds3f::EMPTY, |b, x| b.union(x)));
    }

    #[test]
    fn coincident_centroids_still_split() {
        let b = unit_box_at(0.0);
        let (nodes, bounds) = build(&info_from_boxes(&[b; 5]));
        assert_eq!(nodes.len(), 9);
        assert_eq!(nodes.iter().filter(|n| n.is_leaf()).count(), 5);
        assert!(bounds.iter().all(|x| *x == b));
    }

    #[test]
    fn optimal_split_skips_empty_sides() {
        let mut buckets = [BucketInfo::default(); N_BUCKETS];
        buckets[0] = BucketInfo {
            count: 3,
            bounds: unit_box_at(0.0),
        };
        buckets[15] = BucketInfo {
            count: 1,
            bounds: unit_box_at(15.0),
        };
        let split = find_optimal_split(&buckets).unwrap();
        // Every split between the two occupied bins has the same cost; the
        // first wins.
        assert_eq!(split, 0);

        let mut one = [BucketInfo::default(); N_BUCKETS];
        one[4] = buckets[0];
        assert_eq!(find_optimal_split(&one), None);
    }

    #[test]
    fn reorder_partitions_by_bin() {
        let boxes: Vec<Bounds3f> = [9.0, 1.0, 8.0, 0.0, 7.0, 2.0]
            .iter()
            .map(|&x| unit_box_at(x))
            .collect();
        let info = info_from_boxes(&boxes);
        let binning = Binning::new(&info.centroid_bounds(), N_BUCKETS).unwrap();
        let mut ids: Vec<u32> = (0..6).collect();
        let split = binning.bin(&Point3f::new(4.0, 0.5, 0.5));

        let (mid, left_cb, right_cb) = reorder_ids(&info, &mut ids, 0, 6, split, &binning);
        assert_eq!(mid, 3);
        let mut left: Vec<u32> = ids[..3].to_vec();
        left.sort_unstable();
        assert_eq!(left, vec![1, 3, 5]);
        assert_eq!(left_cb.p_min.x, 0.5);
        assert_eq!(left_cb.p_max.x, 2.5);
        assert_eq!(right_cb.p_min.x, 7.5);
        assert_eq!(right_cb.p_max.x, 9.5);
    }
}
