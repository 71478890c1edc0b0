//! Triangle Meshes

use crate::geometry::*;
use crate::pbrt::*;

/// A mesh vertex.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Vertex {
    /// Object space position.
    pub position: Point3f,

    /// Shading normal.
    pub normal: Vector3f,

    /// Texture coordinates.
    pub uv: [Float; 2],
}

impl Vertex {
    /// Create a new vertex.
    ///
    /// * `position` - Position.
    /// * `normal`   - Shading normal.
    /// * `uv`       - Texture coordinates.
    pub fn new(position: Point3f, normal: Vector3f, uv: [Float; 2]) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }
}

/// A triangle referencing three vertices by index.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Face {
    /// Vertex indices.
    pub v: [u32; 3],

    /// Material index.
    pub material: u32,
}

impl Face {
    /// Create a new face with the default material.
    ///
    /// * `v0` - First vertex index.
    /// * `v1` - Second vertex index.
    /// * `v2` - Third vertex index.
    pub fn new(v0: u32, v1: u32, v2: u32) -> Self {
        Self {
            v: [v0, v1, v2],
            material: 0,
        }
    }

    /// Returns the three vertex positions of the face.
    ///
    /// * `vertices` - Vertex buffer the face indexes into.
    pub fn positions(&self, vertices: &[Vertex]) -> [Point3f; 3] {
        [
            vertices[self.v[0] as usize].position,
            vertices[self.v[1] as usize].position,
            vertices[self.v[2] as usize].position,
        ]
    }

    /// Returns the exact axis aligned bounds of the face.
    ///
    /// * `vertices` - Vertex buffer the face indexes into.
    pub fn bounds(&self, vertices: &[Vertex]) -> Bounds3f {
        Bounds3f::from_points(self.positions(vertices).iter())
    }

    /// Returns the average of the three vertex positions.
    ///
    /// * `vertices` - Vertex buffer the face indexes into.
    pub fn centroid(&self, vertices: &[Vertex]) -> Point3f {
        let [p0, p1, p2] = self.positions(vertices);
        (p0 + p1 + p2) * (1.0 / 3.0)
    }

    /// Returns the area of the face.
    ///
    /// * `vertices` - Vertex buffer the face indexes into.
    pub fn area(&self, vertices: &[Vertex]) -> Float {
        let [p0, p1, p2] = self.positions(vertices);
        0.5 * (p1 - p0).cross(&(p2 - p0)).length()
    }
}

/// Host side mesh data.
#[derive(Clone, Debug, Default)]
pub struct MeshData {
    /// Vertices.
    pub vertices: Vec<Vertex>,

    /// Triangles.
    pub faces: Vec<Face>,
}

impl MeshData {
    /// Create a mesh from positions and flat triangle indices. Normals are
    /// left zero and texture coordinates are derived from the position.
    ///
    /// * `positions` - Vertex positions.
    /// * `indices`   - Three vertex indices per triangle.
    pub fn from_indices(positions: &[Point3f], indices: &[u32]) -> Self {
        assert!(indices.len() % 3 == 0, "triangle index count {} is not a multiple of 3", indices.len());

        let vertices = positions
            .iter()
            .map(|p| Vertex::new(*p, Vector3f::zero(), [p.x, p.y]))
            .collect();
        let faces = indices.chunks_exact(3).map(|t| Face::new(t[0], t[1], t[2])).collect();
        Self { vertices, faces }
    }

    /// Create an axis aligned cube centered at `center` with 8 vertices and
    /// 12 triangles.
    ///
    /// * `center` - Center of the cube.
    /// * `size`   - Edge length.
    pub fn create_cube(center: Point3f, size: Float) -> Self {
        let hs = size * 0.5;
        let corners = [
            (-hs, -hs, -hs),
            (-hs, -hs, hs),
            (-hs, hs, -hs),
            (-hs, hs, hs),
            (hs, -hs, -hs),
            (hs, -hs, hs),
            (hs, hs, -hs),
            (hs, hs, hs),
        ];
        let vertices = corners
            .iter()
            .map(|&(x, y, z)| {
                let offset = Vector3f::new(x, y, z);
                Vertex::new(center + offset, offset.normalize(), [0.5 + x / size, 0.5 + y / size])
            })
            .collect();

        let faces = [
            [4, 2, 0],
            [2, 7, 3],
            [6, 5, 7],
            [1, 7, 5],
            [0, 3, 1],
            [4, 1, 5],
            [4, 6, 2],
            [2, 6, 7],
            [6, 4, 5],
            [1, 3, 7],
            [0, 2, 3],
            [4, 0, 1],
        ]
        .iter()
        .map(|f| Face::new(f[0], f[1], f[2]))
        .collect();

        Self { vertices, faces }
    }

    /// Create a rectangle spanned by two edge vectors from a corner, as two
    /// triangles.
    ///
    /// * `corner` - First corner.
    /// * `edge0`  - First edge vector.
    /// * `edge1`  - Second edge vector.
    pub fn create_rect(corner: Point3f, edge0: Vector3f, edge1: Vector3f) -> Self {
        let normal = edge0.cross(&edge1).normalize();
        let vertices = vec![
            Vertex::new(corner, normal, [0.0, 0.0]),
            Vertex::new(corner + edge0, normal, [1.0, 0.0]),
            Vertex::new(corner + edge0 + edge1, normal, [1.0, 1.0]),
            Vertex::new(corner + edge1, normal, [0.0, 1.0]),
        ];
        let faces = vec![Face::new(0, 1, 2), Face::new(0, 2, 3)];
        Self { vertices, faces }
    }

    /// Append another mesh, rebasing its vertex indices.
    ///
    /// * `other` - The mesh to append.
    pub fn append(&mut self, other: &MeshData) {
        let base = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&other.vertices);
        self.faces.extend(other.faces.iter().map(|f| Face {
            v: [f.v[0] + base, f.v[1] + base, f.v[2] + base],
            material: f.material,
        }));
    }

    /// Returns the bounds of all vertices.
    pub fn bounds(&self) -> Bounds3f {
        Bounds3f::from_points(self.vertices.iter().map(|v| &v.position))
    }

    /// Returns true if every face references valid vertices.
    pub fn is_valid(&self) -> bool {
        let n = self.vertices.len() as u32;
        self.faces.iter().all(|f| f.v.iter().all(|&i| i < n))
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
