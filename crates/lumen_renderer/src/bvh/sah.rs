//! Flat BVH built with a binned surface area heuristic (SAH).
//!
//! Nodes are stored in pre-order: a node is followed by its entire left
//! subtree, then its right subtree. Leaves reference a contiguous run of
//! [`LinearBvh::primitive_indices`], the permutation from leaf order back to
//! the caller's primitive order.

use super::{push_near_last, union_bounds, BvhStats, ClosestHit, Hierarchy, TraversalStack};
use crate::hittable::{Bounded, Hittable, MIN_HIT_DISTANCE};
use lumen_math::{Aabb, Interval, Ray, Vec3};
use std::time::Instant;

/// Number of centroid buckets evaluated per split.
pub const SAH_BUCKETS: usize = 12;

/// Cost of visiting a node, relative to one primitive test.
const TRAVERSAL_COST: f32 = 0.1;

/// Centroid spreads below this cannot be split meaningfully.
const MIN_CENTROID_EXTENT: f32 = 1e-6;

/// One node of a [`LinearBvh`].
///
/// `primitive_count == 0` marks an interior node; `left`/`right` are then
/// indices into the node array. Leaves use `first_primitive`/`primitive_count`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearNode {
    pub bbox: Aabb,
    pub left: usize,
    pub right: usize,
    pub first_primitive: usize,
    pub primitive_count: usize,
}

impl LinearNode {
    fn leaf(bbox: Aabb, first_primitive: usize, primitive_count: usize) -> Self {
        Self {
            bbox,
            left: 0,
            right: 0,
            first_primitive,
            primitive_count,
        }
    }

    fn interior(bbox: Aabb) -> Self {
        Self {
            bbox,
            left: 0,
            right: 0,
            first_primitive: 0,
            primitive_count: 0,
        }
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.primitive_count > 0
    }
}

/// Flat SAH hierarchy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearBvh {
    pub nodes: Vec<LinearNode>,
    pub primitive_indices: Vec<usize>,
}

#[derive(Debug, Clone, Copy)]
struct SahBucket {
    count: usize,
    bounds: Aabb,
}

impl Default for SahBucket {
    fn default() -> Self {
        Self {
            count: 0,
            bounds: Aabb::EMPTY,
        }
    }
}

fn merge_buckets(buckets: &[SahBucket]) -> SahBucket {
    buckets.iter().fold(SahBucket::default(), |acc, b| SahBucket {
        count: acc.count + b.count,
        bounds: Aabb::surrounding(&acc.bounds, &b.bounds),
    })
}

#[derive(Debug, Clone, Copy)]
enum Side {
    Left,
    Right,
}

/// A range of `primitive_indices` waiting for a node.
struct BuildTask {
    start: usize,
    end: usize,
    parent: Option<(usize, Side)>,
}

impl LinearBvh {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Reorder per-primitive data into leaf order.
    ///
    /// Element `k` of the result belongs to `primitive_indices[k]`, so leaf
    /// ranges index straight into the returned vector.
    pub fn permute<T: Clone>(&self, items: &[T]) -> Vec<T> {
        self.primitive_indices
            .iter()
            .map(|&i| items[i].clone())
            .collect()
    }

    fn build_nodes(
        boxes: &[Aabb],
        centroids: &[Vec3],
        indices: &mut [usize],
        max_leaf_size: usize,
    ) -> Vec<LinearNode> {
        let mut nodes = Vec::with_capacity(2 * indices.len());
        let mut tasks = vec![BuildTask {
            start: 0,
            end: indices.len(),
            parent: None,
        }];

        while let Some(task) = tasks.pop() {
            let node_index = nodes.len();
            let range = &mut indices[task.start..task.end];
            let bbox = union_bounds(boxes, range);

            let node = match find_split(boxes, centroids, range, &bbox, max_leaf_size) {
                Some(mid) => {
                    let mid = task.start + mid;
                    // Right first so the left subtree is emitted next.
                    tasks.push(BuildTask {
                        start: mid,
                        end: task.end,
                        parent: Some((node_index, Side::Right)),
                    });
                    tasks.push(BuildTask {
                        start: task.start,
                        end: mid,
                        parent: Some((node_index, Side::Left)),
                    });
                    LinearNode::interior(bbox)
                }
                None => LinearNode::leaf(bbox, task.start, task.end - task.start),
            };
            nodes.push(node);

            match task.parent {
                Some((parent, Side::Left)) => nodes[parent].left = node_index,
                Some((parent, Side::Right)) => nodes[parent].right = node_index,
                None => {}
            }
        }

        nodes
    }
}

/// Choose where to split `range`, reordering it in place.
///
/// Returns the size of the left part, or `None` when the range should become
/// a leaf.
fn find_split(
    boxes: &[Aabb],
    centroids: &[Vec3],
    range: &mut [usize],
    bbox: &Aabb,
    max_leaf_size: usize,
) -> Option<usize> {
    let count = range.len();
    if count <= max_leaf_size {
        return None;
    }

    let centroid_bounds = range
        .iter()
        .fold(Aabb::EMPTY, |acc, &i| acc.include_point(centroids[i]));
    let axis = centroid_bounds.max_extent_axis();
    if centroid_bounds.axis_interval(axis).size() < MIN_CENTROID_EXTENT {
        return None;
    }

    let bucket_of = |i: usize| {
        let b = (SAH_BUCKETS as f32 * centroid_bounds.offset(centroids[i], axis)) as usize;
        b.min(SAH_BUCKETS - 1)
    };

    let mut buckets = [SahBucket::default(); SAH_BUCKETS];
    for &i in range.iter() {
        let bucket = &mut buckets[bucket_of(i)];
        bucket.count += 1;
        bucket.bounds = Aabb::surrounding(&bucket.bounds, &boxes[i]);
    }

    let total_area = match bbox.surface_area() {
        area if area > 0.0 => area,
        _ => 1.0,
    };

    let mut best_cost = f32::INFINITY;
    let mut best_split = 0;
    for split in 0..SAH_BUCKETS - 1 {
        let left = merge_buckets(&buckets[..=split]);
        let right = merge_buckets(&buckets[split + 1..]);
        let cost = TRAVERSAL_COST
            + (left.count as f32 * left.bounds.surface_area()
                + right.count as f32 * right.bounds.surface_area())
                / total_area;
        if cost < best_cost {
            best_cost = cost;
            best_split = split;
        }
    }

    if best_cost >= count as f32 {
        return None;
    }

    let mid = partition(range, |i| bucket_of(i) <= best_split);
    if mid == 0 || mid == count {
        Some(count / 2)
    } else {
        Some(mid)
    }
}

/// Move every element matching `pred` to the front; returns how many matched.
fn partition(data: &mut [usize], pred: impl Fn(usize) -> bool) -> usize {
    let mut first_false = 0;
    for j in 0..data.len() {
        if pred(data[j]) {
            data.swap(first_false, j);
            first_false += 1;
        }
    }
    first_false
}

impl Hierarchy for LinearBvh {
    fn build<P: Bounded>(primitives: &[P], max_leaf_size: usize) -> Self {
        if primitives.is_empty() {
            return Self::default();
        }

        let start = Instant::now();

        // Compute bounds and centroids once
        let boxes: Vec<Aabb> = primitives.iter().map(|p| p.bounding_box()).collect();
        let centroids: Vec<Vec3> = primitives.iter().map(|p| p.centroid()).collect();
        let mut primitive_indices: Vec<usize> = (0..primitives.len()).collect();

        let nodes = Self::build_nodes(
            &boxes,
            &centroids,
            &mut primitive_indices,
            max_leaf_size.max(1),
        );

        let bvh = Self {
            nodes,
            primitive_indices,
        };

        let stats = bvh.stats();
        log::debug!(
            "SAH BVH: {} primitives, {} nodes, {} leaves, depth {} in {:.2?}",
            stats.primitive_count,
            stats.node_count,
            stats.leaf_count,
            stats.max_depth,
            start.elapsed()
        );
        bvh
    }

    fn bounds(&self) -> Aabb {
        self.nodes.first().map_or(Aabb::EMPTY, |root| root.bbox)
    }

    fn intersect<P: Hittable>(
        &self,
        primitives: &[P],
        ray: &Ray,
        max_distance: f32,
    ) -> Option<ClosestHit> {
        if self.nodes.is_empty() {
            return None;
        }

        let mut closest = max_distance;
        let mut nearest = None;

        let enter = |index: usize, closest: f32| {
            self.nodes[index]
                .bbox
                .hit(ray, Interval::new(0.0, closest))
                .filter(|&t| t < closest)
                .map(|t| (index, t))
        };

        let mut stack: TraversalStack<usize> = TraversalStack::new();
        if let Some(root) = enter(0, closest) {
            stack.push(root);
        }

        while let Some((index, entry)) = stack.pop() {
            if entry >= closest {
                continue;
            }

            let node = &self.nodes[index];
            if node.is_leaf() {
                let leaf = &self.primitive_indices
                    [node.first_primitive..node.first_primitive + node.primitive_count];
                for &primitive in leaf {
                    let range = Interval::new(MIN_HIT_DISTANCE, closest);
                    if let Some(hit) = primitives[primitive].hit(ray, range) {
                        closest = hit.t;
                        nearest = Some(ClosestHit { primitive, hit });
                    }
                }
            } else {
                push_near_last(
                    &mut stack,
                    enter(node.left, closest),
                    enter(node.right, closest),
                );
            }
        }

        nearest
    }

    fn stats(&self) -> BvhStats {
        let mut stats = BvhStats {
            node_count: self.nodes.len(),
            ..Default::default()
        };
        if self.nodes.is_empty() {
            return stats;
        }

        let mut pending = vec![(0usize, 0usize)];
        while let Some((index, depth)) = pending.pop() {
            let node = &self.nodes[index];
            stats.max_depth = stats.max_depth.max(depth);
            if node.is_leaf() {
                stats.leaf_count += 1;
                stats.primitive_count += node.primitive_count;
            } else {
                pending.push((node.left, depth + 1));
                pending.push((node.right, depth + 1));
            }
        }
        stats
    }
}
