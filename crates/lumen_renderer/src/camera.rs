//! Pinhole camera for primary ray generation.

use crate::sampling::gen_f32;
use lumen_math::{Ray, Vec2, Vec3};
use rand::RngCore;

/// Camera for generating rays into the scene.
#[derive(Debug, Clone)]
pub struct Camera {
    // Image settings
    pub image_width: u32,
    pub image_height: u32,

    // Camera positioning
    look_from: Vec3,
    look_at: Vec3,
    vup: Vec3,

    vfov: f32, // Vertical field of view in degrees

    // Cached computed values (set by initialize())
    viewport_upper_left: Vec3,
    pixel_delta_u: Vec3,
    pixel_delta_v: Vec3,
    u: Vec3,
    v: Vec3,
    w: Vec3,
}

impl Camera {
    /// Create a new camera with default settings.
    pub fn new() -> Self {
        Self {
            image_width: 800,
            image_height: 450,
            look_from: Vec3::new(0.0, 0.0, 0.0),
            look_at: Vec3::new(0.0, 0.0, -1.0),
            vup: Vec3::new(0.0, 1.0, 0.0),
            vfov: 90.0,
            viewport_upper_left: Vec3::ZERO,
            pixel_delta_u: Vec3::ZERO,
            pixel_delta_v: Vec3::ZERO,
            u: Vec3::X,
            v: Vec3::Y,
            w: Vec3::Z,
        }
    }

    /// Set image resolution.
    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.image_width = width;
        self.image_height = height;
        self
    }

    /// Set camera position.
    pub fn with_position(mut self, look_from: Vec3, look_at: Vec3, vup: Vec3) -> Self {
        self.look_from = look_from;
        self.look_at = look_at;
        self.vup = vup;
        self
    }

    /// Place the camera at `origin` looking along `forward`.
    pub fn with_direction(self, origin: Vec3, forward: Vec3, vup: Vec3) -> Self {
        self.with_position(origin, origin + forward, vup)
    }

    /// Set the vertical field of view in degrees.
    pub fn with_vfov(mut self, vfov: f32) -> Self {
        self.vfov = vfov;
        self
    }

    /// Initialize the camera (must be called before generating rays).
    pub fn initialize(&mut self) {
        let width = self.image_width.max(1) as f32;
        let height = self.image_height.max(1) as f32;

        // Viewport one unit in front of the eye
        let theta = self.vfov.to_radians();
        let viewport_height = 2.0 * (theta / 2.0).tan();
        let viewport_width = viewport_height * (width / height);

        // Camera basis; fall back to world axes if `vup` is parallel to the view
        self.w = (self.look_from - self.look_at).normalize_or_zero();
        if self.w == Vec3::ZERO {
            self.w = Vec3::Z;
        }
        self.u = self.vup.cross(self.w).normalize_or_zero();
        if self.u == Vec3::ZERO {
            self.u = self.w.any_orthonormal_vector();
        }
        self.v = self.w.cross(self.u);

        // Image x runs along u, image y down along -v
        let viewport_u = viewport_width * self.u;
        let viewport_v = -viewport_height * self.v;

        self.pixel_delta_u = viewport_u / width;
        self.pixel_delta_v = viewport_v / height;

        self.viewport_upper_left = self.look_from - self.w - viewport_u / 2.0 - viewport_v / 2.0;
    }

    /// Ray through pixel `(x, y)` at sub-pixel position `jitter` in `[0, 1)^2`.
    ///
    /// `(0.5, 0.5)` is the pixel center. The direction is normalized.
    pub fn ray_for(&self, x: u32, y: u32, jitter: Vec2) -> Ray {
        let pixel_sample = self.viewport_upper_left
            + (x as f32 + jitter.x) * self.pixel_delta_u
            + (y as f32 + jitter.y) * self.pixel_delta_v;

        Ray::new(self.look_from, (pixel_sample - self.look_from).normalize())
    }

    /// Generate a ray for pixel (x, y) with random sampling.
    pub fn get_ray(&self, x: u32, y: u32, rng: &mut dyn RngCore) -> Ray {
        let jitter = Vec2::new(gen_f32(rng), gen_f32(rng));
        self.ray_for(x, y, jitter)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampling::path_rng;

    #[test]
    fn test_camera_initialize() {
        let mut camera = Camera::new()
            .with_resolution(800, 600)
            .with_position(
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(0.0, 0.0, -1.0),
                Vec3::new(0.0, 1.0, 0.0),
            )
            .with_vfov(90.0);

        camera.initialize();

        assert_eq!(camera.look_from, Vec3::ZERO);
        assert!((camera.w - Vec3::Z).length() < 0.001);
        assert!((camera.u - Vec3::X).length() < 0.001);
    }

    #[test]
    fn test_center_ray_looks_forward() {
        let mut camera = Camera::new()
            .with_resolution(100, 100)
            .with_direction(Vec3::new(1.0, 2.0, 3.0), Vec3::new(0.0, -0.1, 1.0), Vec3::Y)
            .with_vfov(70.0);
        camera.initialize();

        // Pixel 50 starts exactly at the image center
        let ray = camera.ray_for(50, 50, Vec2::ZERO);
        assert_eq!(ray.origin, Vec3::new(1.0, 2.0, 3.0));
        assert!((ray.direction - Vec3::new(0.0, -0.1, 1.0).normalize()).length() < 1e-4);
    }

    #[test]
    fn test_image_orientation() {
        let mut camera = Camera::new()
            .with_resolution(64, 32)
            .with_position(Vec3::ZERO, -Vec3::Z, Vec3::Y)
            .with_vfov(90.0);
        camera.initialize();

        // Top-left pixel looks up and to the left, bottom-right down and right.
        let top_left = camera.ray_for(0, 0, Vec2::splat(0.5));
        assert!(top_left.direction.x < 0.0 && top_left.direction.y > 0.0);
        let bottom_right = camera.ray_for(63, 31, Vec2::splat(0.5));
        assert!(bottom_right.direction.x > 0.0 && bottom_right.direction.y < 0.0);

        // 90 degree vertical fov: the top edge is at 45 degrees
        let top_edge = camera.ray_for(32, 0, Vec2::new(0.0, 0.0));
        assert!((top_edge.direction.y / -top_edge.direction.z - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_get_ray_stays_in_pixel() {
        // 90 degree square viewport spans [-1, 1] at z = -1; pixel (3, 4) of 10
        let mut camera = Camera::new().with_resolution(10, 10);
        camera.initialize();

        let mut rng = path_rng(1, 3, 4, 0);
        for _ in 0..100 {
            let ray = camera.get_ray(3, 4, &mut rng);
            assert!((ray.direction.length() - 1.0).abs() < 1e-5);

            let on_plane = ray.direction / -ray.direction.z;
            assert!(on_plane.x >= -0.4 - 1e-5 && on_plane.x <= -0.2 + 1e-5);
            assert!(on_plane.y >= 0.0 - 1e-5 && on_plane.y <= 0.2 + 1e-5);
        }
    }

    #[test]
    fn test_degenerate_up_vector() {
        let mut camera = Camera::new().with_position(Vec3::ZERO, Vec3::Y, Vec3::Y);
        camera.initialize();
        let ray = camera.ray_for(400, 225, Vec2::ZERO);
        assert!(ray.direction.is_finite());
        assert!(ray.direction.y > 0.99);
    }
}
