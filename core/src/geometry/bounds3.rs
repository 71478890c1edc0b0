//! 3D Axis Aligned Bounding Boxes.

use crate::geometry::*;
use crate::pbrt::*;
use num_traits::Num;
use std::ops::Index;

/// 3D Axis Aligned Bounding Box.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Bounds3<T> {
    /// Minimum bounds.
    pub p_min: Point3<T>,

    /// Maximum bounds.
    pub p_max: Point3<T>,
}

/// 3-D bounding box containing `Float` points.
pub type Bounds3f = Bounds3<Float>;

impl Bounds3f {
    /// 3-D bounding box where minimum and maximum bounds are +∞ and -∞. This
    /// is the identity for `union` so we can easily grow the bounding box
    /// from nothing iteratively.
    pub const EMPTY: Self = Self {
        p_min: Point3f::INFINITY,
        p_max: Point3f::NEG_INFINITY,
    };

    /// Returns the bounding box of a set of points.
    ///
    /// * `points` - The points.
    pub fn from_points<'a, I>(points: I) -> Self
    where
        I: IntoIterator<Item = &'a Point3f>,
    {
        points.into_iter().fold(Self::EMPTY, |b, p| b.union(p))
    }

    /// Returns the surface area of the six faces of the box. An empty box has
    /// zero area.
    pub fn surface_area(&self) -> Float {
        if self.is_empty() {
            0.0
        } else {
            let d = self.diagonal();
            2.0 * (d.x * d.y + d.x * d.z + d.y * d.z)
        }
    }

    /// Returns the point halfway between the minimum and maximum corners.
    pub fn centroid(&self) -> Point3f {
        self.p_min.midpoint(&self.p_max)
    }

    /// Returns the continuous position of a point relative to the corners of
    /// the box, where a point at the minimum corner has offset `(0, 0, 0)`
    /// and a point at the maximum corner has offset `(1, 1, 1)`. Axes with
    /// zero extent are not rescaled.
    ///
    /// * `p` - The point.
    pub fn offset(&self, p: &Point3f) -> Vector3f {
        let mut o = *p - self.p_min;
        for axis in Axis::ALL {
            let extent = self.p_max[axis] - self.p_min[axis];
            if extent > 0.0 {
                o[axis] /= extent;
            }
        }
        o
    }
}

impl<T: Num + PartialOrd + Copy> Bounds3<T> {
    /// Creates a new 3D bounding box from 2 points. The minimum and maximum
    /// bounds are used for each coordinate axis.
    ///
    /// * `p1` - First point.
    /// * `p2` - Second point.
    pub fn new(p1: Point3<T>, p2: Point3<T>) -> Self {
        Self {
            p_min: p1.min(&p2),
            p_max: p1.max(&p2),
        }
    }

    /// Returns true if the bounding box describes an empty box where any of
    /// the components of p_max are less than p_min.
    pub fn is_empty(&self) -> bool {
        self.p_max.x < self.p_min.x || self.p_max.y < self.p_min.y || self.p_max.z < self.p_min.z
    }

    /// Returns the vector along the box diagonal from the minimum point to
    /// the maximum point.
    pub fn diagonal(&self) -> Vector3<T> {
        self.p_max - self.p_min
    }

    /// Returns the axis with the largest extent. Ties go to the later axis
    /// unless X strictly beats Y.
    pub fn maximum_extent(&self) -> Axis {
        let d = self.diagonal();
        if d.x > d.y {
            if d.x > d.z {
                Axis::X
            } else {
                Axis::Z
            }
        } else if d.y > d.z {
            Axis::Y
        } else {
            Axis::Z
        }
    }

    /// Returns true if a point is inside the bounding box.
    ///
    /// * `p` - The point.
    pub fn contains(&self, p: &Point3<T>) -> bool {
        p.x >= self.p_min.x
            && p.x <= self.p_max.x
            && p.y >= self.p_min.y
            && p.y <= self.p_max.y
            && p.z >= self.p_min.z
            && p.z <= self.p_max.z
    }

    /// Returns true if another bounding box lies entirely inside this one.
    /// An empty box is contained by every box.
    ///
    /// * `other` - The other bounding box.
    pub fn contains_bounds(&self, other: &Self) -> bool {
        other.is_empty() || (self.contains(&other.p_min) && self.contains(&other.p_max))
    }
}

impl<T: Num + PartialOrd + Copy> Union<Point3<T>> for Bounds3<T> {
    /// Return a bounding box containing the bounding box and a point.
    ///
    /// * `p` - The point.
    fn union(&self, p: &Point3<T>) -> Self {
        Self {
            p_min: self.p_min.min(p),
            p_max: self.p_max.max(p),
        }
    }
}

impl<T: Num + PartialOrd + Copy> Union<Bounds3<T>> for Bounds3<T> {
    /// Return a bounding box containing both bounding boxes.
    ///
    /// * `other` - The other bounding box.
    fn union(&self, other: &Bounds3<T>) -> Self {
        Self {
            p_min: self.p_min.min(&other.p_min),
            p_max: self.p_max.max(&other.p_max),
        }
    }
}

impl<T: Num + PartialOrd + Copy> From<Point3<T>> for Bounds3<T> {
    /// Use a 3D point as minimum and maximum 3D bounds.
    ///
    /// * `p` - 3D point.
    fn from(p: Point3<T>) -> Self {
        Self { p_min: p, p_max: p }
    }
}

impl<T> Index<u8> for Bounds3<T> {
    type Output = Point3<T>;

    /// Index the minimum and maximum bounds.
    ///
    /// * `i` - 0 = minimum, 1 = maximum.
    fn index(&self, i: u8) -> &Self::Output {
        match i {
            0 => &self.p_min,
            1 => &self.p_max,
            _ => panic!("invalid index {i} into bounds"),
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::*;
    use proptest::prelude::*;

    #[test]
    fn empty_is_union_identity() {
        let b = Bounds3f::new(Point3f::new(-1.0, 0.0, 2.0), Point3f::new(3.0, 1.0, 4.0));
        assert!(Bounds3f::EMPTY.is_empty());
        assert_eq!(Bounds3f::EMPTY.union(&b), b);
        assert_eq!(b.union(&Bounds3f::EMPTY), b);
        assert_eq!(Bounds3f::EMPTY.surface_area(), 0.0);
    }

    #[test]
    fn surface_area_of_unit_cube() {
        let b = Bounds3f::new(Point3f::zero(), Point3f::new(1.0, 1.0, 1.0));
        assert!(approx_eq!(Float, b.surface_area(), 6.0, epsilon = 1e-6));
        assert_eq!(b.centroid(), Point3f::new(0.5, 0.5, 0.5));
    }

    #[test]
    fn point_box_has_zero_area() {
        let b = Bounds3f::from(Point3f::new(1.0, 2.0, 3.0));
        assert!(!b.is_empty());
        assert_eq!(b.surface_area(), 0.0);
        assert!(b.contains(&Point3f::new(1.0, 2.0, 3.0)));
    }

    #[test]
    fn maximum_extent_tie_breaks() {
        let cube = Bounds3f::new(Point3f::zero(), Point3f::new(1.0, 1.0, 1.0));
        assert_eq!(cube.maximum_extent(), Axis::Z);

        let xy = Bounds3f::new(Point3f::zero(), Point3f::new(2.0, 2.0, 1.0));
        assert_eq!(xy.maximum_extent(), Axis::Y);

        let x = Bounds3f::new(Point3f::zero(), Point3f::new(3.0, 2.0, 1.0));
        assert_eq!(x.maximum_extent(), Axis::X);
    }

    #[test]
    fn offset_ignores_flat_axes() {
        let b = Bounds3f::new(Point3f::zero(), Point3f::new(2.0, 0.0, 4.0));
        let o = b.offset(&Point3f::new(1.0, 0.0, 1.0));
        assert_eq!(o, Vector3f::new(0.5, 0.0, 0.25));
    }

    fn bounds_strategy() -> impl Strategy<Value = Bounds3f> {
        (prop::array::uniform6(-100.0..100.0f32)).prop_map(|v| {
            Bounds3f::new(Point3f::new(v[0], v[1], v[2]), Point3f::new(v[3], v[4], v[5]))
        })
    }

    proptest! {
        #[test]
        fn union_contains_both(
            x0 in -100.0..100.0f32, y0 in -100.0..100.0f32, z0 in -100.0..100.0f32,
            x1 in -100.0..100.0f32, y1 in -100.0..100.0f32, z1 in -100.0..100.0f32,
            px in -100.0..100.0f32, py in -100.0..100.0f32, pz in -100.0..100.0f32,
        ) {
            let a = Bounds3f::new(Point3f::new(x0, y0, z0), Point3f::new(x1, y1, z1));
            let p = Point3f::new(px, py, pz);
            let b = a.union(&p);
            prop_assert!(b.contains_bounds(&a));
            prop_assert!(b.contains(&p));
            prop_assert!(b.surface_area() >= a.surface_area());
        }

        #[test]
        fn union_is_commutative_and_associative(
            a in bounds_strategy(),
            b in bounds_strategy(),
            c in bounds_strategy(),
        ) {
            prop_assert_eq!(a.union(&b), b.union(&a));
            prop_assert_eq!(a.union(&b).union(&c), a.union(&b.union(&c)));
            prop_assert_eq!(a.union(&Bounds3f::EMPTY), a);
            prop_assert_eq!(Bounds3f::EMPTY.union(&a), a);
        }
    }
}
