//! Integer base 2 logarithm

/// Floor of the base 2 logarithm of a non-zero integer; used to size
/// implicit heap levels.
pub trait Log2Int {
    /// Returns `floor(log2(self))`.
    fn log2int(self) -> u32;
}

impl Log2Int for u32 {
    #[inline(always)]
    fn log2int(self) -> u32 {
        debug_assert!(self > 0);
        u32::BITS - 1 - self.leading_zeros()
    }
}

impl Log2Int for u64 {
    #[inline(always)]
    fn log2int(self) -> u32 {
        debug_assert!(self > 0);
        u64::BITS - 1 - self.leading_zeros()
    }
}

impl Log2Int for usize {
    #[inline(always)]
    fn log2int(self) -> u32 {
        debug_assert!(self > 0);
        usize::BITS - 1 - self.leading_zeros()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floor_of_log2() {
        assert_eq!(1_usize.log2int(), 0);
        assert_eq!(7_usize.log2int(), 2);
        assert_eq!(8_usize.log2int(), 3);
        assert_eq!(1023_u32.log2int(), 9);
        assert_eq!((1_u64 << 40).log2int(), 40);
    }
}
