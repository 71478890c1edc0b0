//! Morton Codes
//!
//! 63-bit codes interleaving 21 bits per axis: bit `3i` holds bit `i` of x,
//! `3i + 1` of y and `3i + 2` of z.

use lsis_core::geometry::*;
use lsis_core::pbrt::*;
use rayon::prelude::*;

/// Number of bits per axis.
pub const MORTON_BITS: u32 = 21;

/// Largest per-axis coordinate value.
pub const MORTON_MAX: u64 = 0x1f_ffff;

/// Spread the lower 21 bits of `x` so there are two zero bits between each.
///
/// * `x` - Value to spread. Bits above 21 are ignored.
#[inline]
pub fn split_by_3(x: u64) -> u64 {
    let mut x = x & MORTON_MAX;
    x = (x | x << 32) & 0x001f_0000_0000_ffff;
    x = (x | x << 16) & 0x001f_0000_ff00_00ff;
    x = (x | x << 8) & 0x100f_00f0_0f00_f00f;
    x = (x | x << 4) & 0x10c3_0c30_c30c_30c3;
    x = (x | x << 2) & 0x1249_2492_4924_9249;
    x
}

/// Inverse of `split_by_3`: gather every third bit into the lower 21 bits.
///
/// * `x` - Spread value.
#[inline]
pub fn compact_by_3(x: u64) -> u64 {
    let mut x = x & 0x1249_2492_4924_9249;
    x = (x ^ (x >> 2)) & 0x10c3_0c30_c30c_30c3;
    x = (x ^ (x >> 4)) & 0x100f_00f0_0f00_f00f;
    x = (x ^ (x >> 8)) & 0x001f_0000_ff00_00ff;
    x = (x ^ (x >> 16)) & 0x001f_0000_0000_ffff;
    x = (x ^ (x >> 32)) & MORTON_MAX;
    x
}

/// Interleave three 21-bit coordinates into a Morton code.
///
/// * `x` - X-coordinate.
/// * `y` - Y-coordinate.
/// * `z` - Z-coordinate.
#[inline]
pub fn encode_morton_3(x: u32, y: u32, z: u32) -> u64 {
    split_by_3(x as u64) | (split_by_3(y as u64) << 1) | (split_by_3(z as u64) << 2)
}

/// Split a Morton code into its three coordinates.
///
/// * `code` - The Morton code.
#[inline]
pub fn decode_morton_3(code: u64) -> (u32, u32, u32) {
    (
        compact_by_3(code) as u32,
        compact_by_3(code >> 1) as u32,
        compact_by_3(code >> 2) as u32,
    )
}

/// Morton code helpers for floating point positions.
pub struct MortonCode;

impl MortonCode {
    /// Quantize a point in the unit cube and return its Morton code.
    /// Coordinates outside `[0, 1]` are clamped; only rounding error is
    /// expected there.
    ///
    /// * `p` - Point with coordinates in `[0, 1]`.
    pub fn from_unit_point(p: &Vector3f) -> u64 {
        debug_assert!(
            (0..3).all(|i| (-1e-4..=1.0 + 1e-4).contains(&p[i])),
            "point {:?} is outside the unit cube",
            p
        );

        let scale = MORTON_MAX as Float;
        let q = |v: Float| (clamp(v, 0.0, 1.0) * scale) as u32;
        encode_morton_3(q(p.x), q(p.y), q(p.z))
    }
}

/// A primitive index paired with its Morton code.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct MortonPrimitive {
    /// Primitive index.
    pub index: u32,

    /// Morton code of the primitive centroid.
    pub code: u64,
}

impl MortonPrimitive {
    /// Create a new `MortonPrimitive`.
    ///
    /// * `index` - Primitive index.
    /// * `code`  - Morton code.
    pub fn new(index: u32, code: u64) -> Self {
        Self { index, code }
    }
}

/// How Morton primitives are sorted.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum MortonSort {
    /// Stable least significant digit radix sort.
    #[default]
    Radix,

    /// Parallel comparison sort on `(code, index)`.
    Comparison,
}

impl MortonSort {
    /// Sort primitives by Morton code. Both methods order equal codes by
    /// primitive index when the input is in index order.
    ///
    /// * `v` - Primitives to sort.
    pub fn sort(self, v: &mut Vec<MortonPrimitive>) {
        match self {
            MortonSort::Radix => radix_sort(v),
            MortonSort::Comparison => v.par_sort_unstable_by_key(|p| (p.code, p.index)),
        }
    }
}

/// Sort by Morton code with 8 passes of 8-bit digits. The sort is stable.
///
/// * `v` - Primitives to sort.
pub fn radix_sort(v: &mut Vec<MortonPrimitive>) {
    const BITS_PER_PASS: u32 = 8;
    const N_BITS: u32 = 64;
    const N_PASSES: u32 = N_BITS / BITS_PER_PASS;
    const N_BUCKETS: usize = 1 << BITS_PER_PASS;
    const BIT_MASK: u64 = (1 << BITS_PER_PASS) - 1;

    let mut temp = vec![MortonPrimitive::default(); v.len()];

    for pass in 0..N_PASSES {
        let low_bit = pass * BITS_PER_PASS;
        let digit = |p: &MortonPrimitive| ((p.code >> low_bit) & BIT_MASK) as usize;

        // Count number of zero bits in array for current radix sort bit.
        let mut bucket_count = [0_usize; N_BUCKETS];
        for p in v.iter() {
            bucket_count[digit(p)] += 1;
        }

        // Compute starting index in output array for each bucket.
        let mut out_index = [0_usize; N_BUCKETS];
        for i in 1..N_BUCKETS {
            out_index[i] = out_index[i - 1] + bucket_count[i - 1];
        }

        // Store sorted values in output array.
        for p in v.iter() {
            let b = digit(p);
            temp[out_index[b]] = *p;
            out_index[b] += 1;
        }

        std::mem::swap(v, &mut temp);
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use lsis_core::rng::RNG;
    use proptest::prelude::*;

    #[test]
    fn split_by_3_spreads_bits() {
        assert_eq!(split_by_3(0b1), 0b1);
        assert_eq!(split_by_3(0b11), 0b1001);
        assert_eq!(split_by_3(0b101), 0b1_000_001);
        assert_eq!(split_by_3(MORTON_MAX), 0x1249_2492_4924_9249);
        assert_eq!(split_by_3(1 << 21), 0);
    }

    #[test]
    fn encode_interleaves_axes() {
        assert_eq!(encode_morton_3(1, 0, 0), 0b001);
        assert_eq!(encode_morton_3(0, 1, 0), 0b010);
        assert_eq!(encode_morton_3(0, 0, 1), 0b100);
        assert_eq!(encode_morton_3(3, 0, 0), 0b001_001);
        assert_eq!(
            encode_morton_3(MORTON_MAX as u32, MORTON_MAX as u32, MORTON_MAX as u32),
            (1 << 63) - 1
        );
    }

    #[test]
    fn unit_point_corners() {
        assert_eq!(MortonCode::from_unit_point(&Vector3f::zero()), 0);
        assert_eq!(
            MortonCode::from_unit_point(&Vector3f::new(1.0, 1.0, 1.0)),
            (1 << 63) - 1
        );
    }

    #[test]
    fn radix_sort_is_stable_and_matches_comparison_sort() {
        let mut rng = RNG::new(5);
        let prims: Vec<MortonPrimitive> = (0..2000)
            .map(|i| {
                // Few distinct codes so there are many ties.
                let c = rng.bounded_uniform_u32(64) as u64;
                MortonPrimitive::new(i, c << (rng.bounded_uniform_u32(8) * 8))
            })
            .collect();

        let mut radix = prims.clone();
        MortonSort::Radix.sort(&mut radix);
        let mut comparison = prims.clone();
        MortonSort::Comparison.sort(&mut comparison);

        assert_eq!(radix, comparison);
        assert!(radix.windows(2).all(|w| w[0].code <= w[1].code));
        assert!(radix
            .windows(2)
            .all(|w| w[0].code != w[1].code || w[0].index < w[1].index));
    }

    proptest! {
        #[test]
        fn decode_inverts_encode(x in 0..=0x1f_ffffu32, y in 0..=0x1f_ffffu32, z in 0..=0x1f_ffffu32) {
            prop_assert_eq!(decode_morton_3(encode_morton_3(x, y, z)), (x, y, z));
        }

        #[test]
        fn code_increases_along_each_axis(
            x in 0..0x1f_ffffu32,
            y in 0..0x1f_ffffu32,
            z in 0..0x1f_ffffu32,
        ) {
            let c = encode_morton_3(x, y, z);
            prop_assert!(encode_morton_3(x + 1, y, z) > c);
            prop_assert!(encode_morton_3(x, y + 1, z) > c);
            prop_assert!(encode_morton_3(x, y, z + 1) > c);
        }
    }
}
