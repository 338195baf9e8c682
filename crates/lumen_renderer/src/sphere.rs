//! Sphere primitive for ray tracing.

use crate::hittable::{Bounded, Hittable, PrimitiveHit};
use lumen_math::{Aabb, Interval, Ray, Vec3};

/// A sphere primitive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f32,
}

impl Sphere {
    /// Create a new sphere. Negative radii are clamped to zero.
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self {
            center,
            radius: radius.max(0.0),
        }
    }

    /// Outward unit normal at a point on the surface.
    pub fn outward_normal(&self, p: Vec3) -> Vec3 {
        (p - self.center).normalize_or_zero()
    }

    /// Nearest root of the ray-sphere quadratic strictly inside `ray_t`.
    ///
    /// The smaller root is preferred; the larger is used when the smaller one
    /// falls outside the interval (for example, when the ray starts inside).
    /// A zero-radius sphere has no surface and is never hit.
    pub fn intersect(&self, ray: &Ray, ray_t: Interval) -> Option<PrimitiveHit> {
        if self.radius <= 0.0 {
            return None;
        }

        let oc = self.center - ray.origin;
        let a = ray.direction.length_squared();
        let h = ray.direction.dot(oc);
        let c = oc.length_squared() - self.radius * self.radius;

        let discriminant = h * h - a * c;
        if discriminant < 0.0 || a == 0.0 {
            return None;
        }

        let sqrtd = discriminant.sqrt();

        // Find the nearest root in the acceptable range
        let mut root = (h - sqrtd) / a;
        if !ray_t.surrounds(root) {
            root = (h + sqrtd) / a;
            if !ray_t.surrounds(root) {
                return None;
            }
        }

        Some(PrimitiveHit {
            t: root,
            u: 0.0,
            v: 0.0,
        })
    }
}

impl Bounded for Sphere {
    fn bounding_box(&self) -> Aabb {
        let rvec = Vec3::splat(self.radius);
        Aabb::from_points(self.center - rvec, self.center + rvec)
    }

    fn centroid(&self) -> Vec3 {
        self.center
    }
}

impl Hittable for Sphere {
    #[inline]
    fn hit(&self, ray: &Ray, ray_t: Interval) -> Option<PrimitiveHit> {
        self.intersect(ray, ray_t)
    }
}
