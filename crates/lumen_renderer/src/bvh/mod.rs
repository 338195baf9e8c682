//! Bounding Volume Hierarchy (BVH) acceleration structures.
//!
//! Two builders share the [`Hierarchy`] interface:
//! - [`BvhNode`]: linked tree split at the spatial midpoint of each node
//! - [`LinearBvh`]: flat array built with a binned surface area heuristic
//!
//! Both are immutable once built and answer nearest-hit queries through an
//! explicit traversal stack, so any number of threads can query concurrently.

mod layout;
mod median;
mod sah;


pub use layout::{PackedBvh, PackedNode};
pub use median::BvhNode;
pub use sah::{LinearBvh, LinearNode, SAH_BUCKETS};

use crate::hittable::{Bounded, Hittable, PrimitiveHit};
use lumen_math::{Aabb, Ray};
use smallvec::SmallVec;

/// Default maximum primitives per leaf node.
pub const DEFAULT_MAX_LEAF_SIZE: usize = 4;

/// Inline capacity of the traversal stack before it spills to the heap.
pub const TRAVERSAL_STACK_CAPACITY: usize = 64;

/// Pending nodes and the distance at which the ray enters them.
pub(crate) type TraversalStack<T> = SmallVec<[(T, f32); TRAVERSAL_STACK_CAPACITY]>;

/// Nearest intersection found by a hierarchy query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosestHit {
    /// Index into the primitive slice the hierarchy was built over
    pub primitive: usize,
    pub hit: PrimitiveHit,
}

/// Shape summary of a built hierarchy, used for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BvhStats {
    pub node_count: usize,
    pub leaf_count: usize,
    pub max_depth: usize,
    pub primitive_count: usize,
}

/// A spatial index over a primitive slice.
///
/// The hierarchy stores only indices; callers pass the same slice to
/// [`Hierarchy::intersect`] that they passed to [`Hierarchy::build`].
pub trait Hierarchy: Send + Sync {
    /// Build over `primitives`. An empty slice yields an empty hierarchy.
    /// `max_leaf_size` below 1 is treated as 1.
    fn build<P: Bounded>(primitives: &[P], max_leaf_size: usize) -> Self
    where
        Self: Sized;

    /// Union of all primitive boxes. [`Aabb::EMPTY`] when empty.
    fn bounds(&self) -> Aabb;

    /// Nearest hit farther than [`crate::MIN_HIT_DISTANCE`] and closer than `max_distance`.
    fn intersect<P: Hittable>(
        &self,
        primitives: &[P],
        ray: &Ray,
        max_distance: f32,
    ) -> Option<ClosestHit>;

    fn stats(&self) -> BvhStats;
}

/// Push two optional children so the nearer one is popped first.
///
/// Equal entry distances keep `first` on top.
#[inline]
pub(crate) fn push_near_last<T>(
    stack: &mut TraversalStack<T>,
    first: Option<(T, f32)>,
    second: Option<(T, f32)>,
) {
    match (first, second) {
        (Some(a), Some(b)) => {
            if a.1 <= b.1 {
                stack.push(b);
                stack.push(a);
            } else {
                stack.push(a);
                stack.push(b);
            }
        }
        (Some(only), None) | (None, Some(only)) => stack.push(only),
        (None, None) => {}
    }
}

/// Union of the boxes selected by `indices`.
pub(crate) fn union_bounds(boxes: &[Aabb], indices: &[usize]) -> Aabb {
    indices
        .iter()
        .fold(Aabb::EMPTY, |acc, &i| Aabb::surrounding(&acc, &boxes[i]))
}
