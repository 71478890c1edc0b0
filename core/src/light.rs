//! Light Sources

use crate::geometry::*;
use crate::pbrt::*;

/// A point or area light. Area lights are parallelograms spanned by
/// `tangent` and `bitangent` from `position`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Light {
    /// Position of the light (corner for area lights).
    pub position: Point3f,

    /// Main emission direction.
    pub direction: Vector3f,

    /// First edge of the emitting surface; zero for point lights.
    pub tangent: Vector3f,

    /// Second edge of the emitting surface; zero for point lights.
    pub bitangent: Vector3f,

    /// RGB emitted power.
    pub intensity: [Float; 3],

    /// Emission half-angle about the direction, in `[0, π/2]`.
    pub half_angle: Float,
}

impl Light {
    /// Create a point light that emits into the hemisphere around
    /// `direction`.
    ///
    /// * `position`  - Position.
    /// * `direction` - Emission direction.
    /// * `intensity` - RGB power.
    pub fn point(position: Point3f, direction: Vector3f, intensity: [Float; 3]) -> Self {
        Self {
            position,
            direction: direction.normalize(),
            tangent: Vector3f::zero(),
            bitangent: Vector3f::zero(),
            intensity,
            half_angle: PI_OVER_TWO,
        }
    }

    /// Create a one sided parallelogram light.
    ///
    /// * `position`  - Corner of the parallelogram.
    /// * `direction` - Emission direction, usually the surface normal.
    /// * `intensity` - RGB power.
    /// * `tangent`   - First edge.
    /// * `bitangent` - Second edge.
    pub fn area(
        position: Point3f,
        direction: Vector3f,
        intensity: [Float; 3],
        tangent: Vector3f,
        bitangent: Vector3f,
    ) -> Self {
        Self {
            position,
            direction: direction.normalize(),
            tangent,
            bitangent,
            intensity,
            half_angle: PI_OVER_TWO,
        }
    }

    /// Returns the scalar energy used for importance: the sum of the RGB
    /// components.
    pub fn power(&self) -> Float {
        self.intensity[0] + self.intensity[1] + self.intensity[2]
    }

    /// Returns the bounds of the position and the two edge endpoints.
    pub fn bounds(&self) -> Bounds3f {
        Bounds3f::from(self.position)
            .union(&(self.position + self.tangent))
            .union(&(self.position + self.bitangent))
    }

    /// Returns the emission cone: the direction with a zero normal spread
    /// and the light's half-angle as emission spread.
    pub fn cone(&self) -> BoundingCone {
        BoundingCone::new(self.direction, 0.0, self.half_angle)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_light_has_point_bounds() {
        let l = Light::point(Point3f::new(1.0, 2.0, 3.0), Vector3f::new(0.0, -2.0, 0.0), [1.0, 2.0, 3.0]);
        let b = l.bounds();
        assert_eq!(b.p_min, b.p_max);
        assert_eq!(b.centroid(), l.position);
        assert_eq!(l.power(), 6.0);
        assert_eq!(l.cone().axis, Vector3f::new(0.0, -1.0, 0.0));
        assert_eq!(l.cone().theta_o, 0.0);
        assert_eq!(l.cone().theta_e, PI_OVER_TWO);
    }

    #[test]
    fn area_light_bounds_cover_edges() {
        let t = Vector3f::new(2.0, 0.0, 0.0);
        let b = Vector3f::new(0.0, 0.0, 4.0);
        let l = Light::area(Point3f::zero(), t.cross(&b), [1.0, 1.0, 1.0], t, b);
        let b = l.bounds();
        assert_eq!(b.p_min, Point3f::zero());
        assert_eq!(b.p_max, Point3f::new(2.0, 0.0, 4.0));
        assert_eq!(b.centroid(), Point3f::new(1.0, 0.0, 2.0));
        assert_eq!(l.direction, Vector3f::new(0.0, -1.0, 0.0));
    }
}
