//! Geometry

mod bounds3;
mod cone;
mod point3;
mod vector3;

// Re-export
pub use bounds3::*;
pub use cone::*;
pub use point3::*;
pub use vector3::*;

/// Union of a geometric object with another.
pub trait Union<T> {
    /// Return the smallest object that contains both `self` and `other`.
    ///
    /// * `other` - The other object.
    fn union(&self, other: &T) -> Self;
}
