//! Linear Bounding Volume Hierarchy
//!
//! Primitives are sorted by the Morton code of their centroid and the
//! hierarchy is generated from the sorted codes, splitting each range where
//! its highest differing bit changes. Nodes are numbered depth first: the
//! left child of node `i` is `i + 1` and the right child follows the whole
//! left subtree.

use super::common::*;
use crate::morton::*;
use lsis_core::geometry::*;
use lsis_core::mesh::*;
use rayon::prelude::*;

/// Builds a BVH over the triangles and returns the node and bounds arrays,
/// both of size `2N - 1`.
///
/// * `vertices` - Vertex buffer.
/// * `faces`    - Triangles.
/// * `sort`     - Sort used to order the Morton codes.
pub fn build(vertices: &[Vertex], faces: &[Face], sort: MortonSort) -> (Vec<BVHNode>, Vec<Bounds3f>) {
    let n_primitives = faces.len();
    if n_primitives == 0 {
        return (vec![], vec![]);
    }

    // Triangle bounds and vertex average centroids.
    let info = BVHPrimitiveInfo {
        bounds: faces.par_iter().map(|f| f.bounds(vertices)).collect(),
        centroids: faces.par_iter().map(|f| f.centroid(vertices)).collect(),
    };
    let scene_bounds = info
        .bounds
        .iter()
        .fold(Bounds3f::EMPTY, |b, x| b.union(x));

    let mut morton_prims: Vec<MortonPrimitive> = info
        .centroids
        .par_iter()
        .enumerate()
        .map(|(i, c)| MortonPrimitive::new(i as u32, MortonCode::from_unit_point(&scene_bounds.offset(c))))
        .collect();
    sort.sort(&mut morton_prims);

    let nodes = generate_hierarchy(&morton_prims);
    let bounds = refit(&nodes, &info.bounds);
    (nodes, bounds)
}

/// Range of sorted primitives assigned to a node.
struct Range {
    /// Node index.
    index: usize,

    /// First sorted primitive (inclusive).
    first: usize,

    /// Last sorted primitive (inclusive).
    last: usize,
}

/// Generates the node array from sorted Morton codes.
///
/// * `morton_prims` - Primitives sorted by Morton code.
fn generate_hierarchy(morton_prims: &[MortonPrimitive]) -> Vec<BVHNode> {
    let mut nodes = vec![BVHNode::default(); node_count(morton_prims.len())];

    let mut stack = vec![Range {
        index: 0,
        first: 0,
        last: morton_prims.len() - 1,
    }];

    while let Some(r) = stack.pop() {
        if r.first == r.last {
            nodes[r.index] = BVHNode::new_leaf_node(morton_prims[r.first].index);
            continue;
        }

        let split = find_split(morton_prims, r.first, r.last);
        let n_left = split - r.first + 1;
        let left = r.index + 1;
        let right = r.index + 2 * n_left;
        nodes[r.index] = BVHNode::new_interior_node(left, right);

        stack.push(Range {
            index: right,
            first: split + 1,
            last: r.last,
        });
        stack.push(Range {
            index: left,
            first: r.first,
            last: split,
        });
    }

    nodes
}

/// Returns the last primitive of the left half of `[first, last]`: the
/// position where the highest bit differing between the first and last
/// codes flips. Ranges of identical codes split in the middle.
///
/// * `morton_prims` - Primitives sorted by Morton code.
/// * `first`        - First primitive (inclusive).
/// * `last`         - Last primitive (inclusive); greater than `first`.
pub fn find_split(morton_prims: &[MortonPrimitive], first: usize, last: usize) -> usize {
    debug_assert!(first < last);

    let first_code = morton_prims[first].code;
    let last_code = morton_prims[last].code;
    if first_code == last_code {
        report_degenerate_split();
        return (first + last) >> 1;
    }

    // Number of leading bits shared by every code in the range.
    let common_prefix = (first_code ^ last_code).leading_zeros();

    // Binary search for the last code that shares more than the common
    // prefix with the first one.
    let mut split = first;
    let mut step = last - first;
    loop {
        step = (step + 1) >> 1;
        let new_split = split + step;
        if new_split < last {
            let split_prefix = (first_code ^ morton_prims[new_split].code).leading_zeros();
            if split_prefix > common_prefix {
                split = new_split;
            }
        }
        if step <= 1 {
            break;
        }
    }

    split
}

/// Computes node bounds bottom up. Children always follow their parent so a
/// reverse sweep visits them first.
///
/// * `nodes`     - Node array.
/// * `primitive` - Primitive bounds.
fn refit(nodes: &[BVHNode], primitive: &[Bounds3f]) -> Vec<Bounds3f> {
    let mut bounds = vec![Bounds3f::EMPTY; nodes.len()];
    for (i, node) in nodes.iter().enumerate().rev() {
        bounds[i] = match node.children() {
            Some((l, r)) => {
                debug_assert!(l > i && r > i);
                bounds[l].union(&bounds[r])
            }
            None => primitive[node.right as usize],
        };
    }
    bounds
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn prims(codes: &[u64]) -> Vec<MortonPrimitive> {
        codes
            .iter()
            .enumerate()
            .map(|(i, &c)| MortonPrimitive::new(i as u32, c))
            .collect()
    }

    #[test]
    fn split_at_highest_differing_bit() {
        let p = prims(&[0b0001, 0b0010, 0b0100, 0b0101, 0b1000]);
        // Bit 3 differs first: [0, 3] vs [4].
        assert_eq!(find_split(&p, 0, 4), 3);
        // Within [0, 3] bit 2 splits [0, 1] vs [2, 3].
        assert_eq!(find_split(&p, 0, 3), 1);
        assert_eq!(find_split(&p, 2, 3), 2);
    }

    #[test]
    fn identical_codes_split_in_the_middle() {
        let p = prims(&[7; 6]);
        assert_eq!(find_split(&p, 0, 5), 2);
        assert_eq!(find_split(&p, 1, 2), 1);
    }

    #[test]
    fn depth_first_layout() {
        let p = prims(&[0b00, 0b01, 0b10, 0b11]);
        let nodes = generate_hierarchy(&p);
        assert_eq!(
            nodes,
            vec![
                BVHNode { left: 1, right: 4 },
                BVHNode { left: 2, right: 3 },
                BVHNode { left: -1, right: 0 },
                BVHNode { left: -1, right: 1 },
                BVHNode { left: 5, right: 6 },
                BVHNode { left: -1, right: 2 },
                BVHNode { left: -1, right: 3 },
            ]
        );
    }

    #[test]
    fn refit_unions_children() {
        let p = prims(&[0, 1, 2]);
        let nodes = generate_hierarchy(&p);
        let boxes: Vec<Bounds3f> = (0..3)
            .map(|i| {
                let x = i as f32;
                Bounds3f::new(Point3f::new(x, 0.0, 0.0), Point3f::new(x + 0.5, 1.0, 1.0))
            })
            .collect();
        let bounds = refit(&nodes, &boxes);
        assert_eq!(bounds[0].p_min, Point3f::new(0.0, 0.0, 0.0));
        assert_eq!(bounds[0].p_max, Point3f::new(2.5, 1.0, 1.0));
    }
}
