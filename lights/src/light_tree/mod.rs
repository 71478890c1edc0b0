//! Light Tree
//!
//! Binned top-down builder over light boxes, emission cones and energy. Node
//! numbering is breadth first like the SAH BVH: both children of a node are
//! adjacent and every leaf holds one light.

use lsis_accelerators::Binning;
use lsis_core::compute::*;
use lsis_core::error::BuildTransferError;
use lsis_core::geometry::*;
use lsis_core::gpu::GpuLightTreeNode;
use lsis_core::light::Light;
use lsis_core::pbrt::*;
use std::collections::VecDeque;

mod common;

pub use common::*;

/// Per light build inputs, indexed by light.
struct LightBuildInfo {
    /// Box, cone and energy of each light.
    bounds: Vec<LightBounds>,

    /// Centre of each light box.
    centers: Vec<Point3f>,
}

impl LightBuildInfo {
    fn new(lights: &[Light]) -> Self {
        let bounds: Vec<LightBounds> = lights.iter().map(LightBounds::from_light).collect();
        let centers = bounds.iter().map(|b| b.bounds.centroid()).collect();
        Self { bounds, centers }
    }

    fn center_bounds(&self, ids: &[u32]) -> Bounds3f {
        ids.iter()
            .fold(Bounds3f::EMPTY, |b, &id| b.union(&self.centers[id as usize]))
    }
}

/// A node waiting to be split.
struct WorkItem {
    /// Node index to fill.
    index: usize,

    /// First light slot (inclusive).
    start: usize,

    /// Last light slot (exclusive).
    end: usize,

    /// Bound of the light centres in `[start, end)`.
    center_bounds: Bounds3f,
}

/// Light tree over a set of lights with one light per leaf.
#[derive(Clone, Debug, Default)]
pub struct LightTree {
    /// Build parameters.
    pub options: LightTreeOptions,

    /// The list of nodes; the root is at index 0.
    nodes: Vec<LightTreeNode>,
}

impl LightTree {
    /// Build a light tree.
    ///
    /// * `lights`  - The lights.
    /// * `options` - Build parameters.
    pub fn new(lights: &[Light], options: LightTreeOptions) -> Self {
        common::register_stats();

        let mut options = options;
        if options.bins < 2 {
            warn!("Light tree needs at least 2 bins, got {}.  Using 2.", options.bins);
            options.bins = 2;
        }

        let nodes = build(lights, &options);
        common::report_tree_bytes(nodes.len());

        if nodes.is_empty() {
            info!("Light tree is empty");
        } else {
            info!(
                "Light tree created with {} nodes for {} lights ({:.2} kB)",
                nodes.len(),
                lights.len(),
                (nodes.len() * std::mem::size_of::<GpuLightTreeNode>()) as f32 / 1024.0
            );
        }

        Self { options, nodes }
    }

    /// Returns the number of nodes.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the tree has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the nodes; the root is at index 0.
    pub fn nodes(&self) -> &[LightTreeNode] {
        &self.nodes
    }

    /// Returns the nodes in device layout.
    pub fn gpu_nodes(&self) -> Vec<GpuLightTreeNode> {
        self.nodes.iter().map(GpuLightTreeNode::from).collect()
    }

    /// Copy the node array to the device.
    ///
    /// * `ctx` - The compute context.
    pub fn upload(&self, ctx: &mut ComputeContext) -> Result<TypedBuffer<GpuLightTreeNode>, BuildTransferError> {
        ctx.upload("Light tree nodes", &self.gpu_nodes())
    }
}

/// Builds the node array of size `2N - 1`.
///
/// * `lights`  - The lights.
/// * `options` - Build parameters with at least 2 bins.
fn build(lights: &[Light], options: &LightTreeOptions) -> Vec<LightTreeNode> {
    let n_lights = lights.len();
    if n_lights == 0 {
        return vec![];
    }

    let info = LightBuildInfo::new(lights);
    let total_nodes = 2 * n_lights - 1;
    let mut nodes = vec![LightTreeNode::default(); total_nodes];
    let mut ids: Vec<u32> = (0..n_lights as u32).collect();
    let mut next_index = 1;

    let mut queue = VecDeque::new();
    queue.push_back(WorkItem {
        index: 0,
        start: 0,
        end: n_lights,
        center_bounds: info.center_bounds(&ids),
    });

    while let Some(item) = queue.pop_front() {
        let n = item.end - item.start;
        assert!(n > 0, "empty range reached the light tree builder");

        if n == 1 {
            let id = ids[item.start];
            nodes[item.index] = LightTreeNode::new_leaf_node(id, &info.bounds[id as usize]);
            continue;
        }

        let left = next_index;
        let right = next_index + 1;
        next_index += 2;

        if n == 2 {
            let (a, b) = (ids[item.start], ids[item.start + 1]);
            let la = &info.bounds[a as usize];
            let lb = &info.bounds[b as usize];
            nodes[item.index] = LightTreeNode::new_interior_node(left, right, &la.union(lb));
            nodes[left] = LightTreeNode::new_leaf_node(a, la);
            nodes[right] = LightTreeNode::new_leaf_node(b, lb);
            continue;
        }

        let split = Binning::new(&item.center_bounds, options.bins)
            .and_then(|binning| split_binned(&info, &mut ids, &item, &binning, options));

        let (mid, node_bounds) = match split {
            Some(s) => s,
            None => {
                debug!(
                    "Light tree range [{}, {}) has no usable split; splitting in the middle",
                    item.start, item.end
                );
                common::report_degenerate_split();
                let node_bounds = ids[item.start..item.end]
                    .iter()
                    .fold(LightBounds::default(), |acc, &id| acc.union(&info.bounds[id as usize]));
                ((item.start + item.end) / 2, node_bounds)
            }
        };

        assert!(
            mid > item.start && mid < item.end,
            "light tree split {mid} does not divide range [{}, {})",
            item.start,
            item.end
        );

        nodes[item.index] = LightTreeNode::new_interior_node(left, right, &node_bounds);

        // `itertools::partition` gives no hook into the swap loop, so child
        // centre bounds take a second pass over each half.
        queue.push_back(WorkItem {
            index: left,
            start: item.start,
            end: mid,
            center_bounds: info.center_bounds(&ids[item.start..mid]),
        });
        queue.push_back(WorkItem {
            index: right,
            start: mid,
            end: item.end,
            center_bounds: info.center_bounds(&ids[mid..item.end]),
        });
    }

    debug_assert_eq!(next_index, total_nodes);
    nodes
}

/// Bins the range, picks the cheapest split and partitions `ids` around it.
/// Returns the split position and the bin-accumulated bounds of the whole
/// range, or `None` if every split leaves one side empty.
///
/// * `info`    - Per light build inputs.
/// * `ids`     - Light order; the item's range is reordered.
/// * `item`    - The range to split.
/// * `binning` - Binning of the range's centre bound.
/// * `options` - Build parameters.
fn split_binned(
    info: &LightBuildInfo,
    ids: &mut [u32],
    item: &WorkItem,
    binning: &Binning,
    options: &LightTreeOptions,
) -> Option<(usize, LightBounds)> {
    let mut bins = vec![LightBounds::default(); binning.n_bins];
    for &id in ids[item.start..item.end].iter() {
        let b = binning.bin(&info.centers[id as usize]);
        bins[b] = bins[b].union(&info.bounds[id as usize]);
    }

    let node_bounds = bins.iter().fold(LightBounds::default(), |acc, b| acc.union(b));
    let split = find_optimal_split(&bins, &node_bounds, options.traversal_cost)?;

    let range = &mut ids[item.start..item.end];
    let n_left = itertools::partition(range.iter_mut(), |id| binning.bin(&info.centers[*id as usize]) <= split);
    debug_assert!(range[..n_left]
        .iter()
        .all(|&id| binning.bin(&info.centers[id as usize]) <= split));

    Some((item.start + n_left, node_bounds))
}

/// Returns the bin after which splitting minimizes
/// `K_r (E_l M_A,l M_Ω,l + E_r M_A,r M_Ω,r) / (M_A M_Ω)`, skipping splits
/// with an empty side.
///
/// * `bins`           - Per bin light bounds.
/// * `node_bounds`    - Bounds of the whole range.
/// * `traversal_cost` - `K_r`.
fn find_optimal_split(bins: &[LightBounds], node_bounds: &LightBounds, traversal_cost: Float) -> Option<usize> {
    let n_bins = bins.len();

    let mut left = vec![LightBounds::default(); n_bins];
    let mut acc = LightBounds::default();
    for (i, b) in bins.iter().enumerate() {
        acc = acc.union(b);
        left[i] = acc;
    }

    let mut right = vec![LightBounds::default(); n_bins];
    let mut acc = LightBounds::default();
    for (i, b) in bins.iter().enumerate().rev() {
        acc = acc.union(b);
        right[i] = acc;
    }

    let mut norm = node_bounds.bounds.surface_area() * node_bounds.cone.measure();
    if !(norm > 0.0 && norm.is_finite()) {
        norm = 1.0;
    }

    let mut best: Option<(usize, Float)> = None;
    for i in 0..n_bins - 1 {
        if left[i].count == 0 || right[i + 1].count == 0 {
            continue;
        }
        let cost = traversal_cost * (left[i].importance() + right[i + 1].importance()) / norm;
        if best.map_or(true, |(_, best_cost)| cost < best_cost) {
            best = Some((i, cost));
        }
    }

    best.map(|(i, _)| i)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
