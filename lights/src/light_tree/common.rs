//! Light Tree Common

use lsis_core::geometry::*;
use lsis_core::gpu::GpuLightTreeNode;
use lsis_core::light::Light;
use lsis_core::pbrt::*;
use lsis_core::stats::*;
use lsis_core::{stat_counter, stat_inc, stat_memory_counter, stat_register_fns};

stat_memory_counter!("Memory/Light tree", TREE_BYTES, light_tree_stats_tree_bytes);
stat_counter!("Light tree/Interior nodes", INTERIOR_NODES, light_tree_stats_interior_nodes);
stat_counter!("Light tree/Leaf nodes", LEAF_NODES, light_tree_stats_leaf_nodes);
stat_counter!("Light tree/Degenerate splits", DEGENERATE_SPLITS, light_tree_stats_degenerate_splits);

stat_register_fns!(
    light_tree_stats_tree_bytes,
    light_tree_stats_interior_nodes,
    light_tree_stats_leaf_nodes,
    light_tree_stats_degenerate_splits,
);

/// Light tree construction parameters.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LightTreeOptions {
    /// Number of bins along the split axis.
    pub bins: usize,

    /// Relative cost of descending one level; scales every split cost.
    pub traversal_cost: Float,
}

impl Default for LightTreeOptions {
    fn default() -> Self {
        Self {
            bins: 16,
            traversal_cost: 1.0,
        }
    }
}

/// Spatial, directional and energy bounds of a set of lights.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LightBounds {
    /// Union of the light boxes.
    pub bounds: Bounds3f,

    /// Union of the emission cones.
    pub cone: BoundingCone,

    /// Total energy.
    pub energy: Float,

    /// Number of lights.
    pub count: usize,
}

impl Default for LightBounds {
    fn default() -> Self {
        Self {
            bounds: Bounds3f::EMPTY,
            cone: BoundingCone::EMPTY,
            energy: 0.0,
            count: 0,
        }
    }
}

impl LightBounds {
    /// Bounds of a single light.
    ///
    /// * `light` - The light.
    pub fn from_light(light: &Light) -> Self {
        Self {
            bounds: light.bounds(),
            cone: light.cone(),
            energy: light.power(),
            count: 1,
        }
    }

    /// Returns the orientation weighted importance `E · M_A · M_Ω`.
    pub fn importance(&self) -> Float {
        self.energy * self.bounds.surface_area() * self.cone.measure()
    }
}

impl Union<LightBounds> for LightBounds {
    fn union(&self, other: &LightBounds) -> Self {
        Self {
            bounds: self.bounds.union(&other.bounds),
            cone: self.cone.union(&other.cone),
            energy: self.energy + other.energy,
            count: self.count + other.count,
        }
    }
}

/// Light tree node. Leaves have `left == -1` and store the light index in
/// `right`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LightTreeNode {
    /// Bounds of the lights below the node.
    pub bounds: Bounds3f,

    /// Emission cone of the lights below the node.
    pub cone: BoundingCone,

    /// Total energy of the lights below the node.
    pub energy: Float,

    /// Index of the left child or -1 for leaves.
    pub left: i32,

    /// Index of the right child or the light index for leaves.
    pub right: i32,
}

impl Default for LightTreeNode {
    fn default() -> Self {
        Self {
            bounds: Bounds3f::EMPTY,
            cone: BoundingCone::EMPTY,
            energy: 0.0,
            left: -1,
            right: -1,
        }
    }
}

impl LightTreeNode {
    /// Creates a leaf for a single light.
    ///
    /// * `light`  - Index of the light.
    /// * `bounds` - Bounds of the light.
    pub fn new_leaf_node(light: u32, bounds: &LightBounds) -> Self {
        stat_inc!(LEAF_NODES, 1);
        Self {
            bounds: bounds.bounds,
            cone: bounds.cone,
            energy: bounds.energy,
            left: -1,
            right: light as i32,
        }
    }

    /// Creates an interior node.
    ///
    /// * `left`   - Index of the left child.
    /// * `right`  - Index of the right child.
    /// * `bounds` - Bounds of all lights below the node.
    pub fn new_interior_node(left: usize, right: usize, bounds: &LightBounds) -> Self {
        stat_inc!(INTERIOR_NODES, 1);
        Self {
            bounds: bounds.bounds,
            cone: bounds.cone,
            energy: bounds.energy,
            left: left as i32,
            right: right as i32,
        }
    }

    /// Returns true for leaf nodes.
    pub fn is_leaf(&self) -> bool {
        self.left < 0
    }

    /// Returns the light index of a leaf.
    pub fn light(&self) -> Option<usize> {
        self.is_leaf().then_some(self.right as usize)
    }

    /// Returns the child indices of an interior node.
    pub fn children(&self) -> Option<(usize, usize)> {
        (!self.is_leaf()).then_some((self.left as usize, self.right as usize))
    }
}

impl From<&LightTreeNode> for GpuLightTreeNode {
    fn from(n: &LightTreeNode) -> Self {
        Self {
            pmin: n.bounds.p_min.to_array4(),
            pmax: n.bounds.p_max.to_array4(),
            axis: n.cone.axis.to_array4(0.0),
            theta_o: n.cone.theta_o,
            theta_e: n.cone.theta_e,
            energy: n.energy,
            node_type: if n.is_leaf() { 0 } else { 1 },
            left: n.left,
            right: n.right,
            pad: [0; 2],
        }
    }
}

/// Records the size of a finished tree.
///
/// * `n_nodes` - Number of nodes.
pub(crate) fn report_tree_bytes(n_nodes: usize) {
    stat_inc!(TREE_BYTES, (n_nodes * std::mem::size_of::<LightTreeNode>()) as u64);
}

/// Counts a split that fell back to the middle of the range.
pub(crate) fn report_degenerate_split() {
    stat_inc!(DEGENERATE_SPLITS, 1);
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
