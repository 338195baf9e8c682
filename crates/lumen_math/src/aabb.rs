use crate::{Interval, Ray, Vec3};

/// Direction components smaller than this are treated as parallel to a slab.
pub const PARALLEL_EPSILON: f32 = 1e-8;

/// Axis-Aligned Bounding Box for spatial acceleration structures (BVH).
///
/// An AABB is defined by three intervals (one per axis) that bound a 3D volume.
/// [`Aabb::EMPTY`] uses `+inf/-inf` sentinels and is the identity element of
/// [`Aabb::surrounding`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    pub x: Interval,
    pub y: Interval,
    pub z: Interval,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Aabb {
    /// Create an AABB from two corner points (in any order).
    pub fn from_points(a: Vec3, b: Vec3) -> Self {
        let lo = a.min(b);
        let hi = a.max(b);
        Self {
            x: Interval::new(lo.x, hi.x),
            y: Interval::new(lo.y, hi.y),
            z: Interval::new(lo.z, hi.z),
        }
    }

    /// Degenerate box around a single point.
    pub fn from_point(p: Vec3) -> Self {
        Self::from_points(p, p)
    }

    /// Create an AABB that surrounds two other AABBs.
    pub fn surrounding(box0: &Aabb, box1: &Aabb) -> Self {
        Self {
            x: Interval::surrounding(&box0.x, &box1.x),
            y: Interval::surrounding(&box0.y, &box1.y),
            z: Interval::surrounding(&box0.z, &box1.z),
        }
    }

    /// Grow the box to include a point.
    pub fn include_point(&self, p: Vec3) -> Self {
        Self::surrounding(self, &Self::from_point(p))
    }

    /// Get the interval for a specific axis (0=X, 1=Y, 2=Z).
    pub fn axis_interval(&self, n: usize) -> Interval {
        match n {
            0 => self.x,
            1 => self.y,
            _ => self.z,
        }
    }

    /// Minimum corner.
    pub fn min(&self) -> Vec3 {
        Vec3::new(self.x.min, self.y.min, self.z.min)
    }

    /// Maximum corner.
    pub fn max(&self) -> Vec3 {
        Vec3::new(self.x.max, self.y.max, self.z.max)
    }

    /// Per-axis size. Negative (or -inf) components for an empty box.
    pub fn extent(&self) -> Vec3 {
        self.max() - self.min()
    }

    /// True if the box contains nothing on at least one axis.
    pub fn is_empty(&self) -> bool {
        self.x.is_empty() || self.y.is_empty() || self.z.is_empty()
    }

    /// True if `other` lies entirely inside (or on the boundary of) this box.
    pub fn contains_box(&self, other: &Aabb) -> bool {
        (0..3).all(|axis| {
            let outer = self.axis_interval(axis);
            let inner = other.axis_interval(axis);
            outer.min <= inner.min && inner.max <= outer.max
        })
    }

    /// Surface area used by the SAH cost model.
    ///
    /// A box with any negative extent (including [`Aabb::EMPTY`]) has zero area.
    pub fn surface_area(&self) -> f32 {
        let d = self.extent();
        if d.x < 0.0 || d.y < 0.0 || d.z < 0.0 {
            return 0.0;
        }
        2.0 * (d.x * d.y + d.y * d.z + d.z * d.x)
    }

    /// Index (0=X, 1=Y, 2=Z) of the axis with the largest extent.
    ///
    /// Ties resolve to X, then Y only if strictly greater than X, then Z only
    /// if strictly greater than the current choice.
    pub fn max_extent_axis(&self) -> usize {
        let d = self.extent();
        let mut axis = 0;
        if d.y > d.x {
            axis = 1;
        }
        if d.z > d[axis] {
            axis = 2;
        }
        axis
    }

    /// Normalized position of `p` along `axis`: 0 at the min face, 1 at the max face.
    pub fn offset(&self, p: Vec3, axis: usize) -> f32 {
        let slab = self.axis_interval(axis);
        let size = slab.size();
        if size > 0.0 {
            (p[axis] - slab.min) / size
        } else {
            0.0
        }
    }

    /// Returns the center point of the bounding box.
    pub fn centroid(&self) -> Vec3 {
        (self.min() + self.max()) * 0.5
    }

    /// Slab test. Returns the entry distance of `r` into the box within `ray_t`.
    ///
    /// A ray starting inside the box reports `ray_t.min` (0 for the usual
    /// `[0, t_max]` query). Axes where the direction is (nearly) zero are handled
    /// explicitly: the ray misses iff its origin lies outside that slab.
    pub fn hit(&self, r: &Ray, ray_t: Interval) -> Option<f32> {
        let mut t = ray_t;

        for axis in 0..3 {
            let slab = self.axis_interval(axis);
            let origin = r.origin[axis];
            let dir = r.direction[axis];

            if dir.abs() < PARALLEL_EPSILON {
                if origin < slab.min || origin > slab.max {
                    return None;
                }
                continue;
            }

            let inv = 1.0 / dir;
            let mut t0 = (slab.min - origin) * inv;
            let mut t1 = (slab.max - origin) * inv;
            if inv < 0.0 {
                std::mem::swap(&mut t0, &mut t1);
            }

            t.min = t0.max(t.min);
            t.max = t1.min(t.max);
            if t.max < t.min {
                return None;
            }
        }

        Some(t.min)
    }

    pub const EMPTY: Aabb = Aabb {
        x: Interval::EMPTY,
        y: Interval::EMPTY,
        z: Interval::EMPTY,
    };
}
