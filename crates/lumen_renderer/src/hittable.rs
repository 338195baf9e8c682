//! Primitive traits, the scene primitive enum and HitRecord.

use crate::bsdf::TangentFrame;
use crate::{Material, Sphere, Triangle};
use lumen_math::{Aabb, Interval, Ray, Vec3};

/// Hits closer than this to the ray origin are ignored.
pub const MIN_HIT_DISTANCE: f32 = 1e-4;

/// Raw intersection produced by a primitive test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrimitiveHit {
    /// Distance along the ray, in units of its direction
    pub t: f32,
    /// Barycentric coordinates for triangles; zero for spheres
    pub u: f32,
    pub v: f32,
}

/// Anything a BVH can be built over.
pub trait Bounded {
    /// Get the axis-aligned bounding box of this object.
    fn bounding_box(&self) -> Aabb;

    /// Point used to bin the object during construction.
    fn centroid(&self) -> Vec3 {
        self.bounding_box().centroid()
    }
}

/// Trait for objects that can be hit by rays.
pub trait Hittable: Bounded + Send + Sync {
    /// Nearest intersection strictly inside `ray_t`, if any.
    fn hit(&self, ray: &Ray, ray_t: Interval) -> Option<PrimitiveHit>;
}

/// Scene geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Primitive {
    Triangle(Triangle),
    Sphere(Sphere),
}

impl Primitive {
    /// Outward geometric normal at `p`.
    pub fn geometric_normal(&self, p: Vec3) -> Vec3 {
        match self {
            Primitive::Triangle(tri) => tri.face_normal(),
            Primitive::Sphere(sphere) => sphere.outward_normal(p),
        }
    }

    /// Outward shading normal (interpolated for smooth triangles).
    pub fn shading_normal(&self, p: Vec3, hit: &PrimitiveHit) -> Vec3 {
        match self {
            Primitive::Triangle(tri) => tri.shading_normal(hit.u, hit.v),
            Primitive::Sphere(sphere) => sphere.outward_normal(p),
        }
    }

    /// Surface tangent used to orient anisotropic highlights.
    pub fn tangent(&self) -> Vec3 {
        match self {
            Primitive::Triangle(tri) => tri.tangent(),
            Primitive::Sphere(_) => Vec3::X,
        }
    }

    /// True if every coordinate is finite.
    pub fn is_finite(&self) -> bool {
        match self {
            Primitive::Triangle(tri) => tri.is_finite(),
            Primitive::Sphere(sphere) => sphere.center.is_finite() && sphere.radius.is_finite(),
        }
    }
}

impl From<Triangle> for Primitive {
    fn from(tri: Triangle) -> Self {
        Primitive::Triangle(tri)
    }
}

impl From<Sphere> for Primitive {
    fn from(sphere: Sphere) -> Self {
        Primitive::Sphere(sphere)
    }
}

impl Bounded for Primitive {
    fn bounding_box(&self) -> Aabb {
        match self {
            Primitive::Triangle(tri) => tri.bounding_box(),
            Primitive::Sphere(sphere) => sphere.bounding_box(),
        }
    }
}

impl Hittable for Primitive {
    #[inline]
    fn hit(&self, ray: &Ray, ray_t: Interval) -> Option<PrimitiveHit> {
        match self {
            Primitive::Triangle(tri) => tri.hit(ray, ray_t),
            Primitive::Sphere(sphere) => sphere.hit(ray, ray_t),
        }
    }
}

/// Record of a ray-scene intersection.
#[derive(Debug, Clone, Copy)]
pub struct HitRecord {
    /// Index of the primitive in the scene's primitive list
    pub primitive: usize,
    /// Parameter t where the intersection occurs
    pub t: f32,
    pub u: f32,
    pub v: f32,
    /// Point of intersection
    pub p: Vec3,
    /// Shading normal, always facing the incoming ray
    pub normal: Vec3,
    /// Geometric normal, always facing the incoming ray
    pub geometric_normal: Vec3,
    /// Whether the ray hit the front face (outside) of the surface
    pub front_face: bool,
    pub tangent: Vec3,
    pub bitangent: Vec3,
    pub material: Material,
}

impl HitRecord {
    /// Assemble a record for `hit` on `primitive` along `ray`.
    pub fn new(
        ray: &Ray,
        index: usize,
        primitive: &Primitive,
        hit: PrimitiveHit,
        material: Material,
    ) -> Self {
        let p = ray.at(hit.t);
        let mut rec = Self {
            primitive: index,
            t: hit.t,
            u: hit.u,
            v: hit.v,
            p,
            normal: Vec3::ZERO,
            geometric_normal: Vec3::ZERO,
            front_face: false,
            tangent: Vec3::ZERO,
            bitangent: Vec3::ZERO,
            material,
        };
        rec.set_face_normal(
            ray,
            primitive.geometric_normal(p),
            primitive.shading_normal(p, &hit),
        );

        let frame = TangentFrame::new(rec.normal, primitive.tangent());
        rec.tangent = frame.t;
        rec.bitangent = frame.b;
        rec
    }

    /// Set the face normals based on ray direction and outward normals.
    ///
    /// The geometric normal decides which side was hit; both normals are then
    /// flipped to point against the ray.
    pub fn set_face_normal(&mut self, ray: &Ray, outward_geometric: Vec3, outward_shading: Vec3) {
        self.front_face = ray.direction.dot(outward_geometric) < 0.0;

        let (geometric, shading) = if self.front_face {
            (outward_geometric, outward_shading)
        } else {
            (-outward_geometric, -outward_shading)
        };
        self.geometric_normal = geometric;
        self.normal = shading;
    }

    /// Orthonormal shading frame at the hit point.
    pub fn frame(&self) -> TangentFrame {
        TangentFrame {
            t: self.tangent,
            b: self.bitangent,
            n: self.normal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_record_front_face() {
        let tri = Primitive::Triangle(Triangle::new(
            Vec3::new(-1.0, -1.0, 0.0),
            Vec3::new(1.0, -1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ));
        // Counter-clockwise in XY: outward normal is +Z.
        let ray = Ray::new(Vec3::new(0.0, 0.0, 2.0), -Vec3::Z);
        let hit = tri.hit(&ray, Interval::new(MIN_HIT_DISTANCE, f32::INFINITY)).unwrap();
        let rec = HitRecord::new(&ray, 0, &tri, hit, Material::default());

        assert!(rec.front_face);
        assert_eq!(rec.normal, Vec3::Z);
        assert!((rec.p - Vec3::ZERO).length() < 1e-6);
    }

    #[test]
    fn test_hit_record_back_face_flips_normals() {
        let sphere = Primitive::Sphere(Sphere::new(Vec3::ZERO, 1.0));
        // From the center outward: the inside of the sphere is hit.
        let ray = Ray::new(Vec3::ZERO, Vec3::Y);
        let hit = sphere.hit(&ray, Interval::new(MIN_HIT_DISTANCE, f32::INFINITY)).unwrap();
        let rec = HitRecord::new(&ray, 3, &sphere, hit, Material::default());

        assert_eq!(rec.primitive, 3);
        assert!(!rec.front_face);
        assert!((rec.normal - -Vec3::Y).length() < 1e-6);
        assert!(rec.normal.dot(ray.direction) < 0.0);
        assert!(rec.geometric_normal.dot(ray.direction) < 0.0);
    }

    #[test]
    fn test_hit_record_frame_is_orthonormal() {
        let sphere = Primitive::Sphere(Sphere::new(Vec3::new(0.0, 0.0, -3.0), 1.0));
        let ray = Ray::new(Vec3::new(0.3, 0.2, 0.0), -Vec3::Z);
        let hit = sphere.hit(&ray, Interval::new(MIN_HIT_DISTANCE, f32::INFINITY)).unwrap();
        let frame = HitRecord::new(&ray, 0, &sphere, hit, Material::default()).frame();

        assert!(frame.t.dot(frame.n).abs() < 1e-5);
        assert!(frame.b.dot(frame.n).abs() < 1e-5);
        assert!(frame.t.dot(frame.b).abs() < 1e-5);
        assert!((frame.t.length() - 1.0).abs() < 1e-5);
        assert!((frame.b.length() - 1.0).abs() < 1e-5);
    }
}
