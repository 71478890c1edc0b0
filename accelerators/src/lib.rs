//! Acceleration structures built on the host: bounding volume hierarchies
//! over triangles and a generic k-d tree.

#[macro_use]
extern crate log;

mod bvh;
mod kd_tree;
pub mod morton;

// Re-export
pub use bvh::*;
pub use kd_tree::*;
