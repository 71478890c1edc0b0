//! Light Structures

#[macro_use]
extern crate log;

mod light_tree;
mod power;

// Re-export.
pub use light_tree::*;
pub use power::*;

use lsis_core::compute::*;
use lsis_core::error::BuildTransferError;
use lsis_core::gpu::GpuLightTreeNode;
use lsis_core::light::Light;
use lsis_core::pbrt::Float;

/// Light sampling structure to build.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum LightStructureKind {
    /// Power sampled light list.
    Array,

    /// Light tree.
    #[default]
    Tree,
}

impl From<&str> for LightStructureKind {
    /// Parse a light structure name, falling back to a tree.
    ///
    /// * `name` - "array" or "tree".
    fn from(name: &str) -> Self {
        match name {
            "array" => LightStructureKind::Array,
            "tree" => LightStructureKind::Tree,
            ls => {
                warn!("Light structure '{}' unknown.  Using 'tree'.", ls);
                LightStructureKind::Tree
            }
        }
    }
}

/// A built light sampling structure.
#[derive(Clone, Debug)]
pub enum LightStructure {
    Array(LightArray),
    Tree(LightTree),
}

/// Device buffers of an uploaded light structure.
#[derive(Debug)]
pub enum LightBuffer {
    /// Power CDF.
    Array(TypedBuffer<Float>),

    /// Light tree nodes.
    Tree(TypedBuffer<GpuLightTreeNode>),
}

impl LightStructure {
    /// Build a light structure.
    ///
    /// * `kind`    - Structure to build.
    /// * `lights`  - The lights.
    /// * `options` - Light tree parameters; ignored for arrays.
    pub fn build(kind: LightStructureKind, lights: &[Light], options: LightTreeOptions) -> Self {
        match kind {
            LightStructureKind::Array => LightStructure::Array(LightArray::new(lights)),
            LightStructureKind::Tree => LightStructure::Tree(LightTree::new(lights, options)),
        }
    }

    /// Returns the structure kind.
    pub fn kind(&self) -> LightStructureKind {
        match self {
            LightStructure::Array(_) => LightStructureKind::Array,
            LightStructure::Tree(_) => LightStructureKind::Tree,
        }
    }

    /// Returns the number of tree nodes; arrays have none.
    pub fn num_nodes(&self) -> usize {
        match self {
            LightStructure::Array(_) => 0,
            LightStructure::Tree(tree) => tree.num_nodes(),
        }
    }

    /// Copy the structure to the device.
    ///
    /// * `ctx` - The compute context.
    pub fn upload(&self, ctx: &mut ComputeContext) -> Result<LightBuffer, BuildTransferError> {
        match self {
            LightStructure::Array(array) => array.upload(ctx).map(LightBuffer::Array),
            LightStructure::Tree(tree) => tree.upload(ctx).map(LightBuffer::Tree),
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use lsis_core::geometry::*;

    fn lights() -> Vec<Light> {
        (0..4)
            .map(|i| {
                Light::point(
                    Point3f::new(i as Float, 0.0, 0.0),
                    Vector3f::new(0.0, 1.0, 0.0),
                    [1.0, 1.0, 1.0],
                )
            })
            .collect()
    }

    #[test]
    fn kind_from_str() {
        assert_eq!(LightStructureKind::from("array"), LightStructureKind::Array);
        assert_eq!(LightStructureKind::from("tree"), LightStructureKind::Tree);
        assert_eq!(LightStructureKind::from("bvh"), LightStructureKind::Tree);
    }

    #[test]
    fn build_and_upload_tree() {
        let s = LightStructure::build(LightStructureKind::Tree, &lights(), LightTreeOptions::default());
        assert_eq!(s.kind(), LightStructureKind::Tree);
        assert_eq!(s.num_nodes(), 7);

        let mut ctx = ComputeContext::host();
        match s.upload(&mut ctx).unwrap() {
            LightBuffer::Tree(buf) => assert_eq!(buf.len(), 7),
            other => panic!("unexpected buffer {other:?}"),
        }
    }

    #[test]
    fn build_and_upload_array() {
        let s = LightStructure::build(LightStructureKind::Array, &lights(), LightTreeOptions::default());
        assert_eq!(s.kind(), LightStructureKind::Array);
        assert_eq!(s.num_nodes(), 0);

        let mut ctx = ComputeContext::host();
        match s.upload(&mut ctx).unwrap() {
            LightBuffer::Array(buf) => assert_eq!(buf.len(), 5),
            other => panic!("unexpected buffer {other:?}"),
        }
    }
}
