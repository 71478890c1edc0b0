//! Bounding cones of emission directions.

use crate::geometry::*;
use crate::pbrt::*;

/// Bounds a set of emitting surfaces by a cone of normals around `axis`
/// with half-angle `theta_o`, plus an emission spread `theta_e` beyond it.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BoundingCone {
    /// Unit axis of the cone.
    pub axis: Vector3f,

    /// Half-angle of the cone of normals in `[0, π]`.
    pub theta_o: Float,

    /// Additional emission spread in `[0, π/2]`.
    pub theta_e: Float,
}

impl Default for BoundingCone {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl BoundingCone {
    /// A cone bounding nothing. This is the identity for `union`.
    pub const EMPTY: Self = Self {
        axis: Vector3f { x: 0.0, y: 0.0, z: 0.0 },
        theta_o: -INFINITY,
        theta_e: 0.0,
    };

    /// Create a new bounding cone.
    ///
    /// * `axis`    - Direction of the cone; normalized here.
    /// * `theta_o` - Half-angle of the cone of normals.
    /// * `theta_e` - Emission spread. Emitters are one sided, so spreads
    ///               beyond `π/2` are clamped to `π/2`.
    pub fn new(axis: Vector3f, theta_o: Float, theta_e: Float) -> Self {
        debug_assert!(!axis.has_nans());
        Self {
            axis: axis.normalize(),
            theta_o: clamp(theta_o, 0.0, PI),
            theta_e: clamp(theta_e, 0.0, PI_OVER_TWO),
        }
    }

    /// Returns true for the identity cone.
    pub fn is_empty(&self) -> bool {
        self.theta_o < 0.0
    }

    /// Returns the orientation measure used by the light tree cost:
    ///
    /// `2π(1 − cos θo) + π/2 (2 θw sin θo − cos(θo − 2 θw) − 2 θo sin θo + cos θo)`
    ///
    /// where `θw = min(θo + θe, π)`. An empty cone measures zero.
    pub fn measure(&self) -> Float {
        if self.is_empty() {
            return 0.0;
        }

        let theta_o = self.theta_o;
        let theta_w = min(theta_o + self.theta_e, PI);
        let (sin_o, cos_o) = theta_o.sin_cos();
        TWO_PI * (1.0 - cos_o)
            + PI_OVER_TWO
                * (2.0 * theta_w * sin_o - (theta_o - 2.0 * theta_w).cos() - 2.0 * theta_o * sin_o
                    + cos_o)
    }
}

impl Union<BoundingCone> for BoundingCone {
    /// Returns a cone that bounds the normals of both cones. The resulting
    /// emission spread is the larger of the two.
    ///
    /// * `other` - The other cone.
    fn union(&self, other: &BoundingCone) -> Self {
        if other.is_empty() {
            return *self;
        }
        if self.is_empty() {
            return *other;
        }

        // Make `a` the wider cone.
        let (a, b) = if other.theta_o > self.theta_o {
            (other, self)
        } else {
            (self, other)
        };

        let theta_d = clamp(a.axis.dot(&b.axis), -1.0, 1.0).acos();
        let theta_e = max(a.theta_e, b.theta_e);

        if min(theta_d + b.theta_o, PI) <= a.theta_o {
            return Self {
                axis: a.axis,
                theta_o: a.theta_o,
                theta_e,
            };
        }

        let theta_o = (a.theta_o + theta_d + b.theta_o) * 0.5;
        if theta_o >= PI {
            return Self {
                axis: a.axis,
                theta_o: PI,
                theta_e,
            };
        }

        let theta_r = theta_o - a.theta_o;
        let k = a.axis.cross(&b.axis);
        let k = if k.length_squared() > 0.0 {
            k.normalize()
        } else {
            // Antiparallel axes; any perpendicular works.
            a.axis.any_perpendicular()
        };

        Self {
            axis: a.axis.rotate(theta_r, &k).normalize(),
            theta_o,
            theta_e,
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

    fn up() -> Vector3f {
        Vector3f::new(0.0, 0.0, 1.0)
    }

    #[test]
    fn union_with_empty_is_identity() {
        let c = BoundingCone::new(up(), 0.3, 0.5);
        assert_eq!(c.union(&BoundingCone::EMPTY), c);
        assert_eq!(BoundingCone::EMPTY.union(&c), c);
        assert!(BoundingCone::EMPTY.union(&BoundingCone::EMPTY).is_empty());
    }

    #[test]
    fn union_with_self_is_unchanged() {
        let c = BoundingCone::new(Vector3f::new(1.0, 1.0, 0.0), 0.4, 0.2);
        let u = c.union(&c);
        assert!(approx_eq!(Float, u.theta_o, c.theta_o, epsilon = 1e-3));
        assert!(approx_eq!(Float, u.theta_e, c.theta_e, epsilon = 1e-6));
        assert!(approx_eq!(Float, u.axis.dot(&c.axis), 1.0, epsilon = 1e-4));
    }

    #[test]
    fn opposite_cones_cover_sphere() {
        let a = BoundingCone::new(up(), 0.0, PI_OVER_TWO);
        let b = BoundingCone::new(-up(), 0.0, PI_OVER_TWO);
        let u = a.union(&b);
        assert!(approx_eq!(Float, u.theta_o, PI_OVER_TWO, epsilon = 1e-5));
        assert!(approx_eq!(Float, u.axis.dot(&up()), 0.0, epsilon = 1e-5));
        assert!(approx_eq!(Float, u.axis.length(), 1.0, epsilon = 1e-5));
    }

    #[test]
    fn orthogonal_cones_bisect() {
        let a = BoundingCone::new(Vector3f::new(1.0, 0.0, 0.0), 0.0, 0.0);
        let b = BoundingCone::new(Vector3f::new(0.0, 1.0, 0.0), 0.0, 0.0);
        let u = a.union(&b);
        let s = (0.5 as Float).sqrt();
        assert!(approx_eq!(Float, u.theta_o, PI * 0.25, epsilon = 1e-5));
        assert!(approx_eq!(Float, u.axis.x, s, epsilon = 1e-5));
        assert!(approx_eq!(Float, u.axis.y, s, epsilon = 1e-5));
    }

    #[test]
    fn wide_cone_absorbs_narrow_one() {
        let a = BoundingCone::new(up(), 1.0, 0.1);
        let b = BoundingCone::new(Vector3f::new(0.1, 0.0, 1.0), 0.2, 0.7);
        let u = a.union(&b);
        assert_eq!(u.axis, a.axis);
        assert_eq!(u.theta_o, 1.0);
        assert_eq!(u.theta_e, 0.7);
    }

    #[test]
    fn measure_of_hemisphere_emitter() {
        // θo = 0, θe = π/2 gives the cosine-weighted hemisphere measure π.
        let c = BoundingCone::new(up(), 0.0, PI_OVER_TWO);
        assert!(approx_eq!(Float, c.measure(), PI, epsilon = 1e-5));
        assert_eq!(BoundingCone::EMPTY.measure(), 0.0);
    }

    #[test]
    fn new_clamps_angles() {
        let c = BoundingCone::new(Vector3f::new(0.0, 0.0, 2.0), 4.0, PI);
        assert_eq!(c.axis, up());
        assert_eq!(c.theta_o, PI);
        assert_eq!(c.theta_e, PI_OVER_TWO);

        let c = BoundingCone::new(up(), -1.0, -1.0);
        assert_eq!((c.theta_o, c.theta_e), (0.0, 0.0));
    }

    #[test]
    fn measure_grows_with_theta_o() {
        let steps = 400;
        for i in 0..=20 {
            let theta_e = PI_OVER_TWO * i as Float / 20.0;
            let mut prev = 0.0;
            for j in 0..=steps {
                let c = BoundingCone::new(up(), PI * j as Float / steps as Float, theta_e);
                let m = c.measure();
                assert!(m >= prev - 1e-4, "measure fell to {m} from {prev} at θo = {}", c.theta_o);
                prev = m;
            }
        }
    }

    proptest! {
        #[test]
        fn measure_is_monotonic_in_theta_o(
            theta_o in 0.0..PI,
            delta in 0.0..0.5f32,
            theta_e in 0.0..PI_OVER_TWO,
        ) {
            let a = BoundingCone::new(up(), theta_o, theta_e);
            let b = BoundingCone::new(up(), theta_o + delta, theta_e);
            prop_assert!(b.measure() >= a.measure() - 1e-4);
        }

        #[test]
        fn union_bounds_both_axes(
            ax in -1.0..1.0f32, ay in -1.0..1.0f32, az in -1.0..1.0f32,
            bx in -1.0..1.0f32, by in -1.0..1.0f32, bz in -1.0..1.0f32,
            ta in 0.0..PI, tb in 0.0..PI,
            ea in 0.0..PI_OVER_TWO, eb in 0.0..PI_OVER_TWO,
        ) {
            let va = Vector3f::new(ax, ay, az);
            let vb = Vector3f::new(bx, by, bz);
            prop_assume!(va.length() > 0.1 && vb.length() > 0.1);

            let a = BoundingCone::new(va, ta, ea);
            let b = BoundingCone::new(vb, tb, eb);
            let u = a.union(&b);

            prop_assert!(u.theta_o >= 0.0 && u.theta_o <= PI);
            prop_assert!(u.theta_o + 1e-3 >= max(a.theta_o, b.theta_o));
            prop_assert_eq!(u.theta_e, max(ea, eb));
            prop_assert!(approx_eq!(Float, u.axis.length(), 1.0, epsilon = 1e-4));

            // Each input axis lies within the union cone.
            for c in [a, b] {
                let angle = clamp(u.axis.dot(&c.axis), -1.0, 1.0).acos();
                prop_assert!(angle <= u.theta_o + 2e-3);
            }
        }
    }
}
