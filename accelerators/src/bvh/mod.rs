//! Bounding Volume Hierarchy.

use crate::morton::MortonSort;
use lsis_core::compute::*;
use lsis_core::error::BuildTransferError;
use lsis_core::geometry::*;
use lsis_core::gpu::*;
use lsis_core::mesh::*;

mod common;
mod lbvh;
mod sah;

pub use common::*;
pub use lbvh::find_split;
pub use sah::N_BUCKETS;

/// Bounding Volume Hierarchy over triangles with one triangle per leaf.
#[derive(Clone, Debug, Default)]
pub struct BVH {
    /// Splitting method used to build the tree.
    pub split_method: SplitMethod,

    /// The list of nodes; the root is at index 0.
    pub nodes: Vec<BVHNode>,

    /// Bounds of each node.
    pub bounds: Vec<Bounds3f>,
}

impl BVH {
    /// Build a BVH over a triangle mesh.
    ///
    /// * `vertices`     - Vertex buffer.
    /// * `faces`        - Triangles.
    /// * `split_method` - The splitting method.
    pub fn new(vertices: &[Vertex], faces: &[Face], split_method: SplitMethod) -> Self {
        common::register_stats();

        let (nodes, bounds) = match split_method {
            SplitMethod::SAH => sah::build(&BVHPrimitiveInfo::with_box_centroids(vertices, faces)),
            SplitMethod::LBVH => lbvh::build(vertices, faces, MortonSort::Radix),
        };

        debug_assert_eq!(nodes.len(), node_count(faces.len()));
        debug_assert_eq!(nodes.len(), bounds.len());
        common::report_tree_bytes(nodes.len());

        if nodes.is_empty() {
            info!("BVH ({:?}) is empty", split_method);
        } else {
            info!(
                "BVH ({:?}) created with {} nodes for {} primitives ({:.2} kB)",
                split_method,
                nodes.len(),
                faces.len(),
                (nodes.len() * (std::mem::size_of::<GpuBvhNode>() + std::mem::size_of::<GpuAabb>())) as f32
                    / 1024.0
            );
        }

        Self {
            split_method,
            nodes,
            bounds,
        }
    }

    /// Build a BVH over a mesh.
    ///
    /// * `mesh`         - The mesh.
    /// * `split_method` - The splitting method.
    pub fn from_mesh(mesh: &MeshData, split_method: SplitMethod) -> Self {
        Self::new(&mesh.vertices, &mesh.faces, split_method)
    }

    /// Returns the number of nodes.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the tree has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the root node.
    pub fn root(&self) -> Option<&BVHNode> {
        self.nodes.first()
    }

    /// Returns the bounds of the whole tree; empty bounds for an empty tree.
    pub fn world_bound(&self) -> Bounds3f {
        self.bounds.first().copied().unwrap_or(Bounds3f::EMPTY)
    }

    /// Returns the nodes in device layout.
    pub fn gpu_nodes(&self) -> Vec<GpuBvhNode> {
        self.nodes.iter().map(GpuBvhNode::from).collect()
    }

    /// Returns the node bounds in device layout.
    pub fn gpu_bounds(&self) -> Vec<GpuAabb> {
        self.bounds.iter().map(GpuAabb::from).collect()
    }

    /// Copy the node and bounds arrays to the device.
    ///
    /// * `ctx` - The compute context.
    pub fn upload(
        &self,
        ctx: &mut ComputeContext,
    ) -> Result<(TypedBuffer<GpuBvhNode>, TypedBuffer<GpuAabb>), BuildTransferError> {
        let nodes = ctx.upload("BVH nodes", &self.gpu_nodes())?;
        let bounds = ctx.upload("BVH bounds", &self.gpu_bounds())?;
        Ok((nodes, bounds))
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
