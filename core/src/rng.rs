//! Random Number Generator.
//!
//! A PCG32 generator used for procedural scenes and deterministic tests.

use crate::geometry::*;
use crate::pbrt::*;

/// 32-bit precision value for 1 - epsilon.
pub const ONE_MINUS_EPSILON: Float = hexf32!("0x1.fffffep-1"); // 0.99999994

const PCG32_DEFAULT_STATE: u64 = 0x853c49e6748fea9b;
const PCG32_DEFAULT_STREAM: u64 = 0xda3e39cb94b95bdb;
const PCG32_MULT: u64 = 0x5851f42d4c957f2d;

/// Implements the pseudo-random number generator.
#[derive(Clone)]
pub struct RNG {
    state: u64,
    inc: u64,
}

impl Default for RNG {
    /// Return a new instance of `RNG` with default state and stream.
    fn default() -> Self {
        Self {
            state: PCG32_DEFAULT_STATE,
            inc: PCG32_DEFAULT_STREAM,
        }
    }
}

impl RNG {
    /// Create a new `RNG` by seeding it with the given starting sequence.
    ///
    /// * `sequence_index` - The starting sequence to seed with.
    pub fn new(sequence_index: u64) -> Self {
        let mut ret = Self { state: 0, inc: (sequence_index << 1) | 1 };
        let _ = ret.uniform_u32();
        ret.state = ret.state.wrapping_add(PCG32_DEFAULT_STATE);
        let _ = ret.uniform_u32();
        ret
    }

    /// Returns a uniformly distributed u32 value.
    #[inline(always)]
    pub fn uniform_u32(&mut self) -> u32 {
        let old_state = self.state;
        self.state = old_state.wrapping_mul(PCG32_MULT).wrapping_add(self.inc);

        let xor_shifted = (((old_state >> 18) ^ old_state) >> 27) as u32;
        let rot = (old_state >> 59) as u32;
        xor_shifted.rotate_right(rot)
    }

    /// Returns a uniformly distributed value in `[0, bound)`.
    ///
    /// * `bound` - Exclusive upper bound; must be positive.
    pub fn bounded_uniform_u32(&mut self, bound: u32) -> u32 {
        debug_assert!(bound > 0);
        let threshold = bound.wrapping_neg() % bound;
        loop {
            let r = self.uniform_u32();
            if r >= threshold {
                return r % bound;
            }
        }
    }

    /// Returns a uniformly distributed value over the half open interval [0.0, 1.0).
    pub fn uniform_float(&mut self) -> Float {
        min(self.uniform_u32() as Float * hexf32!("0x1.0p-32"), ONE_MINUS_EPSILON)
    }

    /// Returns a uniformly distributed value in `[low, high)`.
    ///
    /// * `low`  - Lower bound.
    /// * `high` - Upper bound.
    pub fn uniform_range(&mut self, low: Float, high: Float) -> Float {
        lerp(self.uniform_float(), low, high)
    }

    /// Returns a uniformly distributed point inside a bounding box.
    ///
    /// * `bounds` - The box.
    pub fn uniform_point(&mut self, bounds: &Bounds3f) -> Point3f {
        Point3f::new(
            self.uniform_range(bounds.p_min.x, bounds.p_max.x),
            self.uniform_range(bounds.p_min.y, bounds.p_max.y),
            self.uniform_range(bounds.p_min.z, bounds.p_max.z),
        )
    }

    /// Returns a uniformly distributed unit direction.
    pub fn uniform_direction(&mut self) -> Vector3f {
        let z = 1.0 - 2.0 * self.uniform_float();
        let r = max(0.0, 1.0 - z * z).sqrt();
        let phi = TWO_PI * self.uniform_float();
        Vector3f::new(r * phi.cos(), r * phi.sin(), z)
    }

    /// Randomly permute a slice.
    ///
    /// * `v` - The slice to shuffle.
    pub fn shuffle<T>(&mut self, v: &mut [T]) {
        let n = v.len();
        for i in 0..n {
            let other = i + self.bounded_uniform_u32((n - i) as u32) as usize;
            v.swap(i, other);
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
