//! Lumen renderer - CPU path tracing over a bounding volume hierarchy.
//!
//! Scenes are assembled with [`SceneBuilder`], which validates materials and
//! geometry and builds the acceleration structure once. The resulting
//! [`Scene`] is immutable and answers nearest-hit queries from any thread.
//! [`render`] traces it with a [`PathIntegrator`] across rayon workers.

mod bucket;
pub mod bsdf;
pub mod bvh;
mod camera;
mod hittable;
mod integrator;
mod material;
mod renderer;
pub mod sampling;
mod scene;
mod sphere;
mod triangle;

pub use bucket::{generate_buckets, render_bucket, Batch, Bucket, BucketResult, TileContext, DEFAULT_BUCKET_SIZE};
pub use bvh::{BvhNode, BvhStats, ClosestHit, Hierarchy, LinearBvh, PackedBvh, PackedNode};
pub use camera::Camera;
pub use hittable::{Bounded, HitRecord, Hittable, Primitive, PrimitiveHit, MIN_HIT_DISTANCE};
pub use integrator::{transmittance, IntegratorConfig, PathIntegrator, RAY_OFFSET};
pub use material::{Color, Material, MaterialError, MaterialId};
pub use renderer::{
    color_to_rgba, linear_to_gamma, render, Accumulator, ConfigError, ImageBuffer, RadianceSink,
    RenderConfig,
};
pub use sampling::{gen_f32, path_rng, PathRng};
pub use scene::{PackedScene, Scene, SceneBuilder, SceneError, SceneResult, World};
pub use sphere::Sphere;
pub use triangle::{Triangle, TRIANGLE_EPSILON};

/// Re-export Vec3 and common math types from lumen_math
pub use lumen_math::{Aabb, Interval, Quat, Ray, Vec2, Vec3};
