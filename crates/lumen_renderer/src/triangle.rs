//! Triangle primitive for ray tracing.
//!
//! Uses the Möller-Trumbore algorithm for ray-triangle intersection.

use crate::hittable::{Bounded, Hittable, PrimitiveHit};
use lumen_math::{Aabb, Interval, Ray, Vec3};

/// Determinant and minimum-distance threshold for Möller-Trumbore.
pub const TRIANGLE_EPSILON: f32 = 1e-7;

/// A triangle primitive, optionally with per-vertex normals for smooth shading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub v0: Vec3,
    pub v1: Vec3,
    pub v2: Vec3,
    /// Unit vertex normals, in vertex order
    pub normals: Option<[Vec3; 3]>,
}

impl Triangle {
    /// Create a flat-shaded triangle from three vertices.
    pub fn new(v0: Vec3, v1: Vec3, v2: Vec3) -> Self {
        Self {
            v0,
            v1,
            v2,
            normals: None,
        }
    }

    /// Create a triangle with per-vertex normals (for smooth shading).
    pub fn with_normals(v0: Vec3, v1: Vec3, v2: Vec3, normals: [Vec3; 3]) -> Self {
        Self {
            v0,
            v1,
            v2,
            normals: Some(normals.map(Vec3::normalize_or_zero)),
        }
    }

    /// Unit normal of the triangle's plane, following the winding order.
    /// Zero for degenerate triangles.
    pub fn face_normal(&self) -> Vec3 {
        (self.v1 - self.v0).cross(self.v2 - self.v0).normalize_or_zero()
    }

    /// Normal interpolated from the vertex normals at barycentric `(u, v)`.
    ///
    /// Falls back to the face normal for flat triangles or when the
    /// interpolated vector collapses.
    pub fn shading_normal(&self, u: f32, v: f32) -> Vec3 {
        match self.normals {
            Some([n0, n1, n2]) => {
                let n = (1.0 - u - v) * n0 + u * n1 + v * n2;
                let n = n.normalize_or_zero();
                if n == Vec3::ZERO {
                    self.face_normal()
                } else {
                    n
                }
            }
            None => self.face_normal(),
        }
    }

    /// Normalized first edge.
    pub fn tangent(&self) -> Vec3 {
        (self.v1 - self.v0).normalize_or_zero()
    }

    pub fn is_finite(&self) -> bool {
        self.v0.is_finite() && self.v1.is_finite() && self.v2.is_finite()
    }

    /// Möller-Trumbore ray-triangle intersection.
    ///
    /// Returns `(t, u, v)` for any hit farther than [`TRIANGLE_EPSILON`].
    pub fn intersect(&self, ray: &Ray) -> Option<PrimitiveHit> {
        let edge1 = self.v1 - self.v0;
        let edge2 = self.v2 - self.v0;

        let h = ray.direction.cross(edge2);
        let det = edge1.dot(h);

        // Ray is parallel to triangle
        if det.abs() < TRIANGLE_EPSILON {
            return None;
        }

        let inv_det = 1.0 / det;
        let s = ray.origin - self.v0;
        let u = inv_det * s.dot(h);
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(edge1);
        let v = inv_det * ray.direction.dot(q);
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = inv_det * edge2.dot(q);
        if t <= TRIANGLE_EPSILON {
            return None;
        }

        Some(PrimitiveHit { t, u, v })
    }
}

impl Bounded for Triangle {
    fn bounding_box(&self) -> Aabb {
        Aabb::from_points(self.v0.min(self.v1).min(self.v2), self.v0.max(self.v1).max(self.v2))
    }
}

impl Hittable for Triangle {
    #[inline]
    fn hit(&self, ray: &Ray, ray_t: Interval) -> Option<PrimitiveHit> {
        self.intersect(ray).filter(|hit| ray_t.surrounds(hit.t))
    }
}
