//! Procedural scenes

use lsis_core::geometry::*;
use lsis_core::light::Light;
use lsis_core::mesh::MeshData;
use lsis_core::pbrt::*;
use lsis_core::rng::RNG;

/// Half extent of the random scene.
const SCENE_EXTENT: Float = 10.0;

/// Generate a named scene.
///
/// * `name`      - "cube", "random" or "grid".
/// * `triangles` - Approximate triangle count for random and grid scenes.
/// * `seed`      - Random seed.
pub fn generate_mesh(name: &str, triangles: usize, seed: u64) -> Result<MeshData, String> {
    match name {
        "cube" => Ok(MeshData::create_cube(Point3f::zero(), 2.0)),
        "random" => Ok(random_triangles(triangles, seed)),
        "grid" => Ok(grid(triangles)),
        _ => Err(format!("Unknown scene '{name}'.")),
    }
}

/// Small triangles scattered through a cube.
fn random_triangles(n: usize, seed: u64) -> MeshData {
    let mut rng = RNG::new(seed);
    let scene = Bounds3f::new(
        Point3f::new(-SCENE_EXTENT, -SCENE_EXTENT, -SCENE_EXTENT),
        Point3f::new(SCENE_EXTENT, SCENE_EXTENT, SCENE_EXTENT),
    );

    let mut positions = Vec::with_capacity(3 * n);
    for _ in 0..n {
        let p = rng.uniform_point(&scene);
        let size = rng.uniform_range(0.05, 0.5);
        positions.push(p);
        positions.push(p + rng.uniform_direction() * size);
        positions.push(p + rng.uniform_direction() * size);
    }
    let indices: Vec<u32> = (0..positions.len() as u32).collect();
    MeshData::from_indices(&positions, &indices)
}

/// A square floor of quads in the XZ plane.
fn grid(triangles: usize) -> MeshData {
    let cells = max(((triangles / 2) as Float).sqrt() as usize, 1);
    let size = 2.0 * SCENE_EXTENT / cells as Float;
    let edge0 = Vector3f::new(size, 0.0, 0.0);
    let edge1 = Vector3f::new(0.0, 0.0, size);

    let mut mesh = MeshData::default();
    for i in 0..cells {
        for j in 0..cells {
            let corner = Point3f::new(
                -SCENE_EXTENT + i as Float * size,
                0.0,
                -SCENE_EXTENT + j as Float * size,
            );
            mesh.append(&MeshData::create_rect(corner, edge0, edge1));
        }
    }
    mesh
}

/// Generate lights inside the given bounds. Every fourth light is a small
/// area light.
///
/// * `n`      - Number of lights.
/// * `bounds` - Region to place lights in.
/// * `seed`   - Random seed.
pub fn generate_lights(n: usize, bounds: &Bounds3f, seed: u64) -> Vec<Light> {
    let mut rng = RNG::new(seed.wrapping_add(1));
    (0..n)
        .map(|i| {
            let p = rng.uniform_point(bounds);
            let d = rng.uniform_direction();
            let intensity = [rng.uniform_float(), rng.uniform_float(), rng.uniform_float()];
            if i % 4 == 0 {
                let t = d.any_perpendicular();
                let b = d.cross(&t);
                Light::area(p, d, intensity, t * 0.25, b * 0.25)
            } else {
                Light::point(p, d, intensity)
            }
        })
        .collect()
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenes() {
        let cube = generate_mesh("cube", 0, 0).unwrap();
        assert_eq!(cube.faces.len(), 12);

        let random = generate_mesh("random", 100, 7).unwrap();
        assert_eq!(random.faces.len(), 100);
        assert!(random.is_valid());

        let grid = generate_mesh("grid", 200, 0).unwrap();
        assert_eq!(grid.faces.len(), 200);
        assert!(grid.is_valid());

        assert!(generate_mesh("teapot", 10, 0).is_err());
    }

    #[test]
    fn lights_stay_in_bounds() {
        let b = Bounds3f::new(Point3f::new(-1.0, -1.0, -1.0), Point3f::new(1.0, 1.0, 1.0));
        let lights = generate_lights(32, &b, 3);
        assert_eq!(lights.len(), 32);
        assert!(lights.iter().all(|l| b.contains(&l.position)));
    }
}
