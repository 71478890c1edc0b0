//! Device buffer layouts.
//!
//! Every structure here is `#[repr(C)]` and `Pod` so that node arrays can be
//! handed to the compute queue as raw bytes without conversion.

use crate::geometry::*;
use bytemuck::{Pod, Zeroable};

/// BVH node as laid out on the device. A leaf has `left == -1` and stores
/// the primitive index in `right`.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct GpuBvhNode {
    pub left: i32,
    pub right: i32,
}

/// Axis aligned box with 16 byte aligned corners.
#[repr(C, align(16))]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct GpuAabb {
    pub min: [f32; 4],
    pub max: [f32; 4],
}

impl From<&Bounds3f> for GpuAabb {
    fn from(b: &Bounds3f) -> Self {
        Self {
            min: b.p_min.to_array4(),
            max: b.p_max.to_array4(),
        }
    }
}

/// Light tree node as laid out on the device.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct GpuLightTreeNode {
    pub pmin: [f32; 4],
    pub pmax: [f32; 4],
    pub axis: [f32; 4],
    pub theta_o: f32,
    pub theta_e: f32,
    pub energy: f32,
    /// 0 = leaf, 1 = internal.
    pub node_type: i32,
    pub left: i32,
    pub right: i32,
    pub pad: [i32; 2],
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{align_of, size_of};

    #[test]
    fn strides_match_device_layout() {
        assert_eq!(size_of::<GpuBvhNode>(), 8);
        assert_eq!(size_of::<GpuAabb>(), 32);
        assert_eq!(size_of::<GpuLightTreeNode>(), 80);
        assert_eq!(align_of::<GpuAabb>(), 16);
    }

    #[test]
    fn aabb_from_bounds() {
        let b = Bounds3f::new(Point3f::new(0.0, 1.0, 2.0), Point3f::new(3.0, 4.0, 5.0));
        let g = GpuAabb::from(&b);
        assert_eq!(g.min, [0.0, 1.0, 2.0, 1.0]);
        assert_eq!(g.max, [3.0, 4.0, 5.0, 1.0]);

        let bytes: &[u8] = bytemuck::bytes_of(&g);
        assert_eq!(bytes.len(), 32);
    }
}
