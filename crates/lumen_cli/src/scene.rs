//! Built-in demo scene: a Cornell box with a glass, a mirror and a brushed
//! metal sphere.

use lumen_math::{Quat, Vec3};
use lumen_renderer::{Camera, Color, Material, SceneBuilder, SceneResult};
use std::f32::consts::PI;

/// Half the box edge length.
const HALF: f32 = 1.0;

fn wall(color: Color) -> Material {
    Material::diffuse(color)
        .with_roughness(0.8)
        .with_metallic(0.1)
}

/// Populate `builder` with the Cornell box.
pub fn cornell_box(builder: &mut SceneBuilder) -> SceneResult<()> {
    let red = builder.add_material(wall(Color::new(0.65, 0.05, 0.05)))?;
    let blue = builder.add_material(wall(Color::new(0.05, 0.05, 0.65)))?;
    let white = builder.add_material(wall(Color::new(0.73, 0.73, 0.73)))?;
    let light = builder.add_material(Material::emissive(Color::ONE, 5.0))?;
    let glass = builder.add_material(Material::glass(1.5).with_roughness(0.0))?;
    let mirror = builder.add_material(Material::metal(Color::splat(0.9), 0.0))?;
    let brushed = builder.add_material(
        Material::metal(Color::new(0.8, 0.6, 0.2), 0.2).with_anisotropic(0.8),
    )?;

    let s = HALF;
    let (x, y, z) = (Vec3::X * 2.0 * s, Vec3::Y * 2.0 * s, Vec3::Z * 2.0 * s);
    let low = Vec3::splat(-s);

    // Walls face into the box
    builder.add_quad(low, y, z, red)?; // left, x = -s
    builder.add_quad(low + x, z, y, blue)?; // right, x = +s
    builder.add_quad(low + y, x, z, white)?; // ceiling
    builder.add_quad(low, z, x, white)?; // floor
    builder.add_quad(low + z, y, x, white)?; // back
    builder.add_quad(low, x, y, white)?; // front, behind the camera

    // Light hangs just under the ceiling, facing down, flush with the back wall
    builder.add_plane(
        Vec3::new(0.0, s - 0.001, 0.5),
        1.0,
        Quat::from_rotation_x(PI),
        light,
    )?;

    builder.add_sphere(Vec3::new(0.4, -0.4, 0.6), 0.3, glass)?;
    builder.add_sphere(Vec3::new(-0.4, -0.4, 0.6), 0.3, mirror)?;
    builder.add_uv_sphere(Vec3::new(0.0, -0.75, 0.15), 0.25, 48, 24, brushed)?;

    Ok(())
}

/// Camera just inside the front wall, tilted slightly down.
pub fn cornell_camera() -> Camera {
    Camera::new()
        .with_direction(
            Vec3::new(0.0, 0.0, -0.999),
            Vec3::new(0.0, -0.1, 1.0).normalize(),
            Vec3::Y,
        )
        .with_vfov(70.0)
}
