//! Scalar helpers shared by all builders

mod axis;
mod common;
mod log2int;

// Re-export
pub use axis::*;
pub use common::*;
pub use log2int::*;
