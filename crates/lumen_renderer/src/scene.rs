//! Scene assembly and nearest-hit queries.
//!
//! [`SceneBuilder`] collects materials and geometry, validating as it goes.
//! [`SceneBuilder::build`] builds the hierarchy once; the resulting [`Scene`]
//! is immutable and shared by reference between render threads.

use crate::bvh::{Hierarchy, LinearBvh, PackedBvh};
use crate::hittable::{Bounded, HitRecord, Primitive};
use crate::material::{Material, MaterialError, MaterialId};
use crate::{Sphere, Triangle};
use lumen_math::{Aabb, Quat, Ray, Vec3};
use std::f32::consts::PI;
use std::time::Instant;
use thiserror::Error;

/// Errors raised while assembling a scene.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SceneError {
    #[error("material rejected: {0}")]
    InvalidMaterial(#[from] MaterialError),

    #[error("unknown material id {0}")]
    UnknownMaterial(usize),

    #[error("primitive has non-finite coordinates")]
    NonFiniteGeometry,

    #[error("sphere tessellation needs at least 3 segments and 2 rings, got {segments}x{rings}")]
    InvalidTessellation { segments: u32, rings: u32 },
}

/// Result type for scene assembly.
pub type SceneResult<T> = Result<T, SceneError>;

/// Anything the integrator can shoot rays at.
pub trait World: Send + Sync {
    /// Nearest surface hit closer than `max_distance`.
    fn intersect(&self, ray: &Ray, max_distance: f32) -> Option<HitRecord>;
}

/// Collects materials and primitives before the hierarchy is built.
#[derive(Debug, Clone)]
pub struct SceneBuilder {
    materials: Vec<Material>,
    primitives: Vec<Primitive>,
    primitive_materials: Vec<MaterialId>,
    max_leaf_size: usize,
}

impl Default for SceneBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneBuilder {
    pub fn new() -> Self {
        Self {
            materials: Vec::new(),
            primitives: Vec::new(),
            primitive_materials: Vec::new(),
            max_leaf_size: crate::bvh::DEFAULT_MAX_LEAF_SIZE,
        }
    }

    /// Set the maximum number of primitives per BVH leaf.
    pub fn with_max_leaf_size(mut self, max_leaf_size: usize) -> Self {
        self.max_leaf_size = max_leaf_size;
        self
    }

    /// Register a material. Rejects out-of-range parameters.
    pub fn add_material(&mut self, material: Material) -> SceneResult<MaterialId> {
        material.validate()?;
        self.materials.push(material);
        Ok(MaterialId(self.materials.len() - 1))
    }

    /// Add any primitive. Returns its index in the scene.
    pub fn add_primitive(
        &mut self,
        primitive: impl Into<Primitive>,
        material: MaterialId,
    ) -> SceneResult<usize> {
        let primitive = primitive.into();
        if material.0 >= self.materials.len() {
            return Err(SceneError::UnknownMaterial(material.0));
        }
        if !primitive.is_finite() {
            return Err(SceneError::NonFiniteGeometry);
        }

        self.primitives.push(primitive);
        self.primitive_materials.push(material);
        Ok(self.primitives.len() - 1)
    }

    pub fn add_triangle(
        &mut self,
        v0: Vec3,
        v1: Vec3,
        v2: Vec3,
        material: MaterialId,
    ) -> SceneResult<usize> {
        self.add_primitive(Triangle::new(v0, v1, v2), material)
    }

    /// Triangle shaded with interpolated vertex normals.
    pub fn add_smooth_triangle(
        &mut self,
        vertices: [Vec3; 3],
        normals: [Vec3; 3],
        material: MaterialId,
    ) -> SceneResult<usize> {
        let [v0, v1, v2] = vertices;
        self.add_primitive(Triangle::with_normals(v0, v1, v2, normals), material)
    }

    pub fn add_sphere(&mut self, center: Vec3, radius: f32, material: MaterialId) -> SceneResult<usize> {
        self.add_primitive(Sphere::new(center, radius), material)
    }

    /// Parallelogram spanned by `u` and `v` from `corner`, as two triangles.
    ///
    /// The front face looks along `u × v`.
    pub fn add_quad(
        &mut self,
        corner: Vec3,
        u: Vec3,
        v: Vec3,
        material: MaterialId,
    ) -> SceneResult<()> {
        self.add_triangle(corner, corner + u, corner + u + v, material)?;
        self.add_triangle(corner, corner + u + v, corner + v, material)?;
        Ok(())
    }

    /// Square of side `size` centered at `center`.
    ///
    /// Unrotated, the plane lies in XZ and faces +Y; `rotation` orients it.
    pub fn add_plane(
        &mut self,
        center: Vec3,
        size: f32,
        rotation: Quat,
        material: MaterialId,
    ) -> SceneResult<()> {
        // X × -Z = +Y
        let u = rotation * Vec3::X * size;
        let v = rotation * Vec3::NEG_Z * size;
        self.add_quad(center - 0.5 * (u + v), u, v, material)
    }

    /// Tessellated sphere with smooth per-vertex normals.
    ///
    /// `segments` slices around the Y axis, `rings` stacks from pole to pole.
    pub fn add_uv_sphere(
        &mut self,
        center: Vec3,
        radius: f32,
        segments: u32,
        rings: u32,
        material: MaterialId,
    ) -> SceneResult<()> {
        if segments < 3 || rings < 2 {
            return Err(SceneError::InvalidTessellation { segments, rings });
        }

        let point = |i: u32, j: u32| {
            let theta = i as f32 / segments as f32 * 2.0 * PI;
            let phi = j as f32 / rings as f32 * PI;
            let normal = Vec3::new(phi.sin() * theta.cos(), phi.cos(), phi.sin() * theta.sin());
            (center + radius * normal, normal)
        };

        for j in 0..rings {
            for i in 0..segments {
                let (p00, n00) = point(i, j);
                let (p10, n10) = point(i + 1, j);
                let (p01, n01) = point(i, j + 1);
                let (p11, n11) = point(i + 1, j + 1);

                // Skip the zero-area triangle each pole quad collapses into.
                if j + 1 < rings {
                    self.add_smooth_triangle([p00, p11, p01], [n00, n11, n01], material)?;
                }
                if j > 0 {
                    self.add_smooth_triangle([p00, p10, p11], [n00, n10, n11], material)?;
                }
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    /// Build the hierarchy and freeze the scene.
    pub fn build<H: Hierarchy>(self) -> Scene<H> {
        let start = Instant::now();
        let bvh = H::build(&self.primitives, self.max_leaf_size);
        let stats = bvh.stats();

        log::info!(
            "Built scene: {} primitives, {} materials, {} BVH nodes ({} leaves, depth {}) in {:.2?}",
            self.primitives.len(),
            self.materials.len(),
            stats.node_count,
            stats.leaf_count,
            stats.max_depth,
            start.elapsed()
        );

        Scene {
            materials: self.materials,
            primitives: self.primitives,
            primitive_materials: self.primitive_materials,
            bvh,
        }
    }
}

/// Immutable, query-ready scene.
#[derive(Debug, Clone)]
pub struct Scene<H: Hierarchy = LinearBvh> {
    materials: Vec<Material>,
    primitives: Vec<Primitive>,
    primitive_materials: Vec<MaterialId>,
    bvh: H,
}

impl<H: Hierarchy> Scene<H> {
    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn bvh(&self) -> &H {
        &self.bvh
    }

    pub fn bounds(&self) -> Aabb {
        self.bvh.bounds()
    }

    /// Material attached to a primitive.
    pub fn material_of(&self, primitive: usize) -> &Material {
        &self.materials[self.primitive_materials[primitive].0]
    }
}

/// Scene data laid out for batch consumers: nodes plus primitives and
/// material ids in leaf order.
#[derive(Debug, Clone)]
pub struct PackedScene {
    pub bvh: PackedBvh,
    pub primitives: Vec<Primitive>,
    pub materials: Vec<MaterialId>,
}

impl Scene<LinearBvh> {
    pub fn pack(&self) -> PackedScene {
        PackedScene {
            bvh: PackedBvh::new(&self.bvh),
            primitives: self.bvh.permute(&self.primitives),
            materials: self.bvh.permute(&self.primitive_materials),
        }
    }
}

impl<H: Hierarchy> World for Scene<H> {
    fn intersect(&self, ray: &Ray, max_distance: f32) -> Option<HitRecord> {
        let closest = self.bvh.intersect(&self.primitives, ray, max_distance)?;
        let primitive = &self.primitives[closest.primitive];
        Some(HitRecord::new(
            ray,
            closest.primitive,
            primitive,
            closest.hit,
            *self.material_of(closest.primitive),
        ))
    }
}

impl<H: Hierarchy> Scene<H> {
    /// Union of primitive bounds, computed without the hierarchy.
    pub fn primitive_bounds(&self) -> Aabb {
        self.primitives
            .iter()
            .fold(Aabb::EMPTY, |acc, p| Aabb::surrounding(&acc, &p.bounding_box()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bvh::BvhNode;
    use crate::Color;

    fn white(builder: &mut SceneBuilder) -> MaterialId {
        builder.add_material(Material::diffuse(Color::splat(0.73))).unwrap()
    }

    #[test]
    fn test_rejects_invalid_material() {
        let mut builder = SceneBuilder::new();
        let err = builder.add_material(Material::glass(-1.0)).unwrap_err();
        assert_eq!(err, SceneError::InvalidMaterial(MaterialError::InvalidIor(-1.0)));
    }

    #[test]
    fn test_rejects_unknown_material_and_bad_geometry() {
        let mut builder = SceneBuilder::new();
        let mat = white(&mut builder);

        assert_eq!(
            builder.add_sphere(Vec3::ZERO, 1.0, MaterialId(5)),
            Err(SceneError::UnknownMaterial(5))
        );
        assert_eq!(
            builder.add_sphere(Vec3::new(f32::NAN, 0.0, 0.0), 1.0, mat),
            Err(SceneError::NonFiniteGeometry)
        );
        assert!(builder.is_empty());
    }

    #[test]
    fn test_quad_and_plane_face_direction() {
        let mut builder = SceneBuilder::new();
        let mat = white(&mut builder);
        builder.add_quad(Vec3::ZERO, Vec3::X, Vec3::Y, mat).unwrap();
        builder
            .add_plane(Vec3::new(0.0, -1.0, 0.0), 2.0, Quat::IDENTITY, mat)
            .unwrap();
        assert_eq!(builder.len(), 4);

        let scene: Scene = builder.build();
        for p in scene.primitives().iter().take(2) {
            assert_eq!(p.geometric_normal(Vec3::ZERO), Vec3::Z);
        }
        for p in scene.primitives().iter().skip(2) {
            assert!((p.geometric_normal(Vec3::ZERO) - Vec3::Y).length() < 1e-6);
        }

        // Floor plane spans [-1, 1] in X and Z
        let floor = scene.primitives()[2..]
            .iter()
            .fold(Aabb::EMPTY, |acc, p| Aabb::surrounding(&acc, &p.bounding_box()));
        assert!((floor.min() - Vec3::new(-1.0, -1.0, -1.0)).length() < 1e-5);
        assert!((floor.max() - Vec3::new(1.0, -1.0, 1.0)).length() < 1e-5);
    }

    #[test]
    fn test_rotated_plane_normal() {
        let mut builder = SceneBuilder::new();
        let mat = white(&mut builder);
        // Ceiling: flipped to face down
        let rotation = Quat::from_rotation_x(PI);
        builder.add_plane(Vec3::new(0.0, 1.0, 0.0), 2.0, rotation, mat).unwrap();

        let scene: Scene = builder.build();
        for p in scene.primitives() {
            assert!((p.geometric_normal(Vec3::ZERO) - -Vec3::Y).length() < 1e-5);
        }
    }

    #[test]
    fn test_uv_sphere() {
        let mut builder = SceneBuilder::new();
        let mat = white(&mut builder);
        assert_eq!(
            builder.add_uv_sphere(Vec3::ZERO, 1.0, 2, 8, mat),
            Err(SceneError::InvalidTessellation {
                segments: 2,
                rings: 8
            })
        );

        builder.add_uv_sphere(Vec3::new(0.0, 0.0, -5.0), 1.0, 16, 8, mat).unwrap();
        // Two triangles per quad, minus one at each pole
        assert_eq!(builder.len(), 16 * 8 * 2 - 2 * 16);

        let scene: Scene = builder.build();
        // Off-axis so the ray does not pass exactly through a shared vertex
        let ray = Ray::new(Vec3::new(0.05, 0.03, 0.0), -Vec3::Z);
        let hit = scene.intersect(&ray, f32::INFINITY).unwrap();

        // Faceted surface lies just inside the true sphere
        assert!(hit.t > 3.99 && hit.t < 4.1, "t = {}", hit.t);
        assert!(hit.front_face);
        assert!(hit.normal.dot(ray.direction) < 0.0);

        // Smooth normals point roughly back at the camera
        assert!(hit.normal.z > 0.9);
    }

    #[test]
    fn test_scene_query_returns_material() {
        let mut builder = SceneBuilder::new();
        let red = builder.add_material(Material::diffuse(Color::new(0.65, 0.05, 0.05))).unwrap();
        let light = builder.add_material(Material::emissive(Color::ONE, 5.0)).unwrap();
        builder.add_sphere(Vec3::new(0.0, 0.0, -2.0), 0.5, red).unwrap();
        builder.add_sphere(Vec3::new(0.0, 0.0, -5.0), 0.5, light).unwrap();

        let scene: Scene<BvhNode> = builder.build();
        let ray = Ray::new(Vec3::ZERO, -Vec3::Z);

        let hit = scene.intersect(&ray, f32::INFINITY).unwrap();
        assert_eq!(hit.primitive, 0);
        assert_eq!(hit.material.base_color, Color::new(0.65, 0.05, 0.05));
        assert!((hit.t - 1.5).abs() < 1e-5);

        // Starting past the first sphere finds the light
        let ray = Ray::new(Vec3::new(0.0, 0.0, -3.0), -Vec3::Z);
        let hit = scene.intersect(&ray, f32::INFINITY).unwrap();
        assert!(hit.material.is_emissive());

        assert!(scene.intersect(&ray, 1.0).is_none());
    }

    #[test]
    fn test_pack_reorders_per_primitive_data() {
        let mut builder = SceneBuilder::new().with_max_leaf_size(1);
        let a = white(&mut builder);
        let b = builder.add_material(Material::mirror()).unwrap();
        for i in 0..10 {
            let mat = if i % 2 == 0 { a } else { b };
            builder.add_sphere(Vec3::new(i as f32 * 2.0, 0.0, 0.0), 0.5, mat).unwrap();
        }

        let scene: Scene = builder.build();
        let packed = scene.pack();
        assert_eq!(packed.primitives.len(), 10);

        for (slot, &source) in scene.bvh().primitive_indices.iter().enumerate() {
            assert_eq!(packed.primitives[slot], scene.primitives()[source]);
            let expected = if source % 2 == 0 { a } else { b };
            assert_eq!(packed.materials[slot], expected);
        }
        assert_eq!(scene.bounds(), scene.primitive_bounds());
    }
}
