//! Plain-old-data BVH layout for batch consumers (compute kernels, files).
//!
//! Node order is build order. Leaves address the primitive array as reordered
//! by [`LinearBvh::permute`]. `primitive_count == 0` marks an interior node.

use super::{LinearBvh, LinearNode};
use bytemuck::{Pod, Zeroable};

/// One node, 48 bytes, `#[repr(C)]`.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct PackedNode {
    pub min: [f32; 3],
    pub left: u32,
    pub max: [f32; 3],
    pub right: u32,
    pub first_primitive: u32,
    pub primitive_count: u32,
    _pad: [u32; 2],
}

impl PackedNode {
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.primitive_count > 0
    }
}

impl From<&LinearNode> for PackedNode {
    fn from(node: &LinearNode) -> Self {
        debug_assert!(node.right <= u32::MAX as usize);
        debug_assert!(node.first_primitive + node.primitive_count <= u32::MAX as usize);

        Self {
            min: node.bbox.min().to_array(),
            left: node.left as u32,
            max: node.bbox.max().to_array(),
            right: node.right as u32,
            first_primitive: node.first_primitive as u32,
            primitive_count: node.primitive_count as u32,
            _pad: [0; 2],
        }
    }
}

/// A [`LinearBvh`] flattened into [`PackedNode`]s.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PackedBvh {
    pub nodes: Vec<PackedNode>,
}

impl PackedBvh {
    pub fn new(bvh: &LinearBvh) -> Self {
        Self {
            nodes: bvh.nodes.iter().map(PackedNode::from).collect(),
        }
    }

    /// Raw node bytes, ready for upload or writing.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.nodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bvh::Hierarchy;
    use crate::Sphere;
    use lumen_math::Vec3;

    #[test]
    fn test_packed_node_size() {
        assert_eq!(std::mem::size_of::<PackedNode>(), 48);
    }

    #[test]
    fn test_packed_layout_matches_linear() {
        let spheres: Vec<Sphere> = (0..50)
            .map(|i| Sphere::new(Vec3::new((i % 7) as f32, (i / 7) as f32, 0.0), 0.3))
            .collect();
        let bvh = LinearBvh::build(&spheres, 2);
        let packed = PackedBvh::new(&bvh);

        assert_eq!(packed.nodes.len(), bvh.nodes.len());
        assert_eq!(packed.as_bytes().len(), 48 * bvh.nodes.len());

        for (linear, node) in bvh.nodes.iter().zip(&packed.nodes) {
            assert_eq!(node.is_leaf(), linear.is_leaf());
            assert_eq!(node.min, linear.bbox.min().to_array());
            assert_eq!(node.max, linear.bbox.max().to_array());
            if node.is_leaf() {
                assert_eq!(node.first_primitive as usize, linear.first_primitive);
                assert_eq!(node.primitive_count as usize, linear.primitive_count);
            } else {
                assert_eq!(node.left as usize, linear.left);
                assert_eq!(node.right as usize, linear.right);
            }
        }
    }
}
