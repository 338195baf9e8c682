//! Linked BVH split at the spatial midpoint.
//!
//! Cheap to build and easy to inspect. Used as a reference for the SAH
//! builder and for scenes where build time matters more than query time.

use super::{push_near_last, union_bounds, BvhStats, ClosestHit, Hierarchy, TraversalStack};
use crate::hittable::{Bounded, Hittable, MIN_HIT_DISTANCE};
use lumen_math::{Aabb, Interval, Ray, Vec3};
use std::time::Instant;

/// BVH node - either a branch with two children or a leaf with primitives.
#[derive(Debug, Clone, PartialEq)]
pub enum BvhNode {
    /// Internal node with two children.
    Branch {
        left: Box<BvhNode>,
        right: Box<BvhNode>,
        bbox: Aabb,
    },
    /// Leaf node with indices into the primitive slice.
    Leaf { primitives: Vec<usize>, bbox: Aabb },
    /// No primitives at all.
    Empty,
}

impl BvhNode {
    /// Bounding box of this subtree.
    pub fn bbox(&self) -> Aabb {
        match self {
            BvhNode::Empty => Aabb::EMPTY,
            BvhNode::Leaf { bbox, .. } => *bbox,
            BvhNode::Branch { bbox, .. } => *bbox,
        }
    }

    /// Recursive construction over `indices`.
    ///
    /// Primitives whose centroid lies below the midpoint of the node box on its
    /// longest axis go left. If that leaves one side empty the index range is
    /// halved instead, which bounds the depth at `log2(n)`.
    fn build_node(
        boxes: &[Aabb],
        centroids: &[Vec3],
        indices: Vec<usize>,
        max_leaf_size: usize,
    ) -> Self {
        let bbox = union_bounds(boxes, &indices);

        // Create leaf for small sets
        if indices.len() <= max_leaf_size {
            return BvhNode::Leaf {
                primitives: indices,
                bbox,
            };
        }

        let axis = bbox.max_extent_axis();
        let midpoint = bbox.centroid()[axis];

        let (mut left, mut right): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .copied()
            .partition(|&i| centroids[i][axis] < midpoint);

        if left.is_empty() || right.is_empty() {
            let mid = indices.len() / 2;
            left = indices[..mid].to_vec();
            right = indices[mid..].to_vec();
        }

        let left = Self::build_node(boxes, centroids, left, max_leaf_size);
        let right = Self::build_node(boxes, centroids, right, max_leaf_size);

        BvhNode::Branch {
            left: Box::new(left),
            right: Box::new(right),
            bbox,
        }
    }

    fn collect_stats(&self, depth: usize, stats: &mut BvhStats) {
        match self {
            BvhNode::Empty => {}
            BvhNode::Leaf { primitives, .. } => {
                stats.node_count += 1;
                stats.leaf_count += 1;
                stats.primitive_count += primitives.len();
                stats.max_depth = stats.max_depth.max(depth);
            }
            BvhNode::Branch { left, right, .. } => {
                stats.node_count += 1;
                stats.max_depth = stats.max_depth.max(depth);
                left.collect_stats(depth + 1, stats);
                right.collect_stats(depth + 1, stats);
            }
        }
    }
}

impl Hierarchy for BvhNode {
    fn build<P: Bounded>(primitives: &[P], max_leaf_size: usize) -> Self {
        if primitives.is_empty() {
            return BvhNode::Empty;
        }

        let start = Instant::now();
        let boxes: Vec<Aabb> = primitives.iter().map(|p| p.bounding_box()).collect();
        let centroids: Vec<Vec3> = primitives.iter().map(|p| p.centroid()).collect();
        let indices: Vec<usize> = (0..primitives.len()).collect();

        let root = Self::build_node(&boxes, &centroids, indices, max_leaf_size.max(1));

        let stats = root.stats();
        log::debug!(
            "Midpoint BVH: {} primitives, {} nodes, {} leaves, depth {} in {:.2?}",
            stats.primitive_count,
            stats.node_count,
            stats.leaf_count,
            stats.max_depth,
            start.elapsed()
        );
        root
    }

    fn bounds(&self) -> Aabb {
        self.bbox()
    }

    fn intersect<P: Hittable>(
        &self,
        primitives: &[P],
        ray: &Ray,
        max_distance: f32,
    ) -> Option<ClosestHit> {
        let mut closest = max_distance;
        let mut nearest = None;

        let enter = |node: &BvhNode, closest: f32| {
            node.bbox()
                .hit(ray, Interval::new(0.0, closest))
                .filter(|&t| t < closest)
        };

        let mut stack: TraversalStack<&BvhNode> = TraversalStack::new();
        if let Some(t) = enter(self, closest) {
            stack.push((self, t));
        }

        while let Some((node, entry)) = stack.pop() {
            // A nearer hit may have been found since this node was pushed
            if entry >= closest {
                continue;
            }

            match node {
                BvhNode::Empty => {}
                BvhNode::Leaf { primitives: leaf, .. } => {
                    for &index in leaf {
                        let range = Interval::new(MIN_HIT_DISTANCE, closest);
                        if let Some(hit) = primitives[index].hit(ray, range) {
                            closest = hit.t;
                            nearest = Some(ClosestHit {
                                primitive: index,
                                hit,
                            });
                        }
                    }
                }
                BvhNode::Branch { left, right, .. } => {
                    let left_entry = enter(left, closest).map(|t| (left.as_ref(), t));
                    let right_entry = enter(right, closest).map(|t| (right.as_ref(), t));
                    push_near_last(&mut stack, left_entry, right_entry);
                }
            }
        }

        nearest
    }

    fn stats(&self) -> BvhStats {
        let mut stats = BvhStats::default();
        self.collect_stats(0, &mut stats);
        stats
    }
}
