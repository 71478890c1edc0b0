//! Errors

use thiserror::Error;

/// Failures reported by the compute queue while creating or writing device
/// buffers. Builders never fail; only transfers do.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildTransferError {
    /// The device ran out of memory for the buffer.
    #[error("out of device resources allocating {bytes} bytes")]
    OutOfResources { bytes: usize },

    /// The requested buffer size is invalid.
    #[error("invalid buffer size {bytes}")]
    InvalidBufferSize { bytes: usize },

    /// Any other device error.
    #[error("device error")]
    Device { code: i32 },
}

impl BuildTransferError {
    /// Returns the numeric device error code.
    pub fn code(&self) -> i32 {
        match self {
            Self::OutOfResources { .. } => -5,
            Self::InvalidBufferSize { .. } => -61,
            Self::Device { code } => *code,
        }
    }
}
