//! Unidirectional path tracing.
//!
//! Lights are not sampled explicitly: a path only collects radiance when it
//! happens to land on an emissive surface, and terminates there. The
//! background is black.

use crate::bsdf;
use crate::material::{Color, Material};
use crate::sampling::gen_f32;
use crate::scene::World;
use lumen_math::Ray;
use rand::RngCore;

/// Distance a continuation ray is pushed off the surface it leaves.
pub const RAY_OFFSET: f32 = 1e-4;

/// Survival probabilities below this end the path outright.
const MIN_SURVIVAL: f32 = 1e-4;

/// Floor applied to the medium color before taking its logarithm.
const MIN_MEDIUM_COLOR: f32 = 1e-5;

/// Path termination settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntegratorConfig {
    /// Hard cap on surface interactions per path
    pub max_bounces: u32,
    pub russian_roulette: bool,
    /// Roulette is played on bounces strictly after this one
    pub roulette_start_bounce: u32,
}

impl Default for IntegratorConfig {
    fn default() -> Self {
        Self {
            max_bounces: 32,
            russian_roulette: true,
            roulette_start_bounce: 4,
        }
    }
}

/// Estimates the radiance arriving along a camera ray.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathIntegrator {
    config: IntegratorConfig,
}

impl PathIntegrator {
    pub fn new(config: IntegratorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &IntegratorConfig {
        &self.config
    }

    /// One radiance sample along `ray`.
    ///
    /// The result is non-negative and finite. All randomness comes from `rng`,
    /// so the same generator state always yields the same sample.
    pub fn trace(&self, world: &dyn World, ray: &Ray, rng: &mut dyn RngCore) -> Color {
        let mut radiance = Color::ZERO;
        let mut throughput = Color::ONE;
        let mut ray = *ray;
        // Material of the medium the path is currently travelling through
        let mut medium: Option<Material> = None;

        for bounce in 0..self.config.max_bounces {
            let Some(hit) = world.intersect(&ray, f32::INFINITY) else {
                break;
            };

            if let Some(inside) = &medium {
                throughput *= transmittance(inside.base_color, hit.t);
            }

            if hit.material.is_emissive() {
                radiance += throughput * hit.material.emitted();
                break;
            }

            if self.config.russian_roulette && bounce > self.config.roulette_start_bounce {
                let survival = throughput.max_element();
                if gen_f32(rng) > survival || survival < MIN_SURVIVAL {
                    break;
                }
                throughput /= survival;
            }

            let sample = bsdf::scatter(ray.direction, &hit, rng);
            if sample.is_black() {
                break;
            }
            throughput *= sample.color;

            medium = next_medium(medium, &hit.material, sample.refracted);

            // Push off the side of the surface the new direction leaves from
            let offset = if sample.direction.dot(hit.normal) < 0.0 {
                -hit.normal
            } else {
                hit.normal
            };
            ray = Ray::new(hit.p + offset * RAY_OFFSET, sample.direction);
        }

        radiance
    }
}

/// Medium the path travels through after scattering off `surface`.
///
/// Refraction toggles between outside and inside `surface`. A reflection off
/// glass from inside keeps the path in that glass. Opaque surfaces end any medium.
fn next_medium(medium: Option<Material>, surface: &Material, refracted: bool) -> Option<Material> {
    if !surface.is_transmissive() {
        return None;
    }
    match (medium, refracted) {
        (Some(_), true) => None,
        (None, true) => Some(*surface),
        (Some(_), false) => Some(*surface),
        (None, false) => None,
    }
}

/// Beer-Lambert attenuation over `distance` inside a medium tinted `color`.
///
/// The tint doubles as the absorption coefficient: `exp(-distance * -ln(color))`.
#[inline]
pub fn transmittance(color: Color, distance: f32) -> Color {
    let color = color.max(Color::splat(MIN_MEDIUM_COLOR));
    let absorb = |c: f32| (c.ln() * distance).exp();
    Color::new(absorb(color.x), absorb(color.y), absorb(color.z))
}
