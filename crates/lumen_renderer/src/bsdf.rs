//! Scattering for the principled [`Material`](crate::Material).
//!
//! Three lobes, picked stochastically per interaction:
//! - dielectric: Fresnel-weighted choice between mirror reflection and refraction
//! - metal: anisotropic GGX, sampled from the distribution of visible normals
//! - diffuse: cosine-weighted Lambertian
//!
//! Sample colors are throughput multipliers; pdfs cancel against the lobes
//! they were drawn from.

use crate::hittable::HitRecord;
use crate::material::Color;
use crate::sampling::{gen_f32, random_unit_vector};
use lumen_math::Vec3;
use rand::RngCore;
use std::f32::consts::PI;

/// A throughput multiplier with every channel below this is treated as black.
pub const BLACK_THRESHOLD: f32 = 1e-4;

/// Reflectance at normal incidence for non-metals.
const DIELECTRIC_F0: f32 = 0.04;

/// Lower bound on GGX roughness, keeps the stretched lobe well defined.
const MIN_ALPHA: f32 = 1e-4;

/// Result of sampling a material.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BsdfSample {
    pub color: Color,
    pub direction: Vec3,
    /// True when the ray crossed the surface
    pub refracted: bool,
}

impl BsdfSample {
    #[inline]
    pub fn is_black(&self) -> bool {
        is_black(self.color)
    }
}

#[inline]
pub fn is_black(color: Color) -> bool {
    color.max_element() < BLACK_THRESHOLD
}

/// Orthonormal basis around a shading normal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TangentFrame {
    pub t: Vec3,
    pub b: Vec3,
    pub n: Vec3,
}

impl TangentFrame {
    /// Build a frame from a unit normal and a (possibly unnormalized) tangent hint.
    ///
    /// The tangent is Gram-Schmidt orthogonalized against the normal. A missing
    /// or nearly parallel hint falls back to a fixed world axis.
    pub fn new(normal: Vec3, tangent: Vec3) -> Self {
        let hint = tangent.normalize_or_zero();
        let t = if tangent.length_squared() < 1e-4 || normal.dot(hint).abs() > 0.999 {
            let other = if normal.x.abs() > 0.9 { Vec3::Y } else { Vec3::X };
            (other - normal * other.dot(normal)).normalize_or_zero()
        } else {
            (hint - normal * hint.dot(normal)).normalize_or_zero()
        };

        Self {
            t,
            b: normal.cross(t),
            n: normal,
        }
    }

    /// World-space vector into (tangent, bitangent, normal) coordinates.
    #[inline]
    pub fn to_local(&self, v: Vec3) -> Vec3 {
        Vec3::new(v.dot(self.t), v.dot(self.b), v.dot(self.n))
    }

    #[inline]
    pub fn to_world(&self, v: Vec3) -> Vec3 {
        self.t * v.x + self.b * v.y + self.n * v.z
    }
}

/// Sample a scattered direction for a ray travelling along `incoming`.
pub fn scatter(incoming: Vec3, hit: &HitRecord, rng: &mut dyn RngCore) -> BsdfSample {
    if hit.material.is_transmissive() {
        scatter_dielectric(incoming, hit, rng)
    } else {
        scatter_opaque(incoming, hit, rng)
    }
}

/// Glass-like lobe: reflect or refract, both spectrally white.
///
/// Absorption inside the medium is applied by the integrator, not here.
fn scatter_dielectric(incoming: Vec3, hit: &HitRecord, rng: &mut dyn RngCore) -> BsdfSample {
    let mat = &hit.material;
    let eta = if hit.front_face { 1.0 / mat.ior } else { mat.ior };

    let unit_direction = incoming.normalize_or_zero();
    let normal = hit.normal;
    let cos_theta = (-unit_direction).dot(normal).min(1.0);
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();

    // Check for total internal reflection
    let cannot_refract = eta * sin_theta > 1.0;
    let reflect_probability = if cannot_refract {
        1.0
    } else {
        // Leaving the medium, Fresnel uses the angle on the transmitted side.
        let cos_fresnel = if hit.front_face {
            cos_theta
        } else {
            (1.0 - eta * eta * (1.0 - cos_theta * cos_theta)).max(0.0).sqrt()
        };
        reflectance(cos_fresnel, mat.ior)
    };

    if gen_f32(rng) < reflect_probability {
        return BsdfSample {
            color: Color::ONE,
            direction: reflect(unit_direction, normal),
            refracted: false,
        };
    }

    let refracted = refract(unit_direction, normal, eta);
    let direction = if mat.roughness > 0.0 {
        let jittered = (refracted + random_unit_vector(rng) * mat.roughness).normalize_or_zero();
        if jittered == Vec3::ZERO {
            refracted
        } else {
            jittered
        }
    } else {
        refracted
    };

    BsdfSample {
        color: Color::ONE,
        direction,
        refracted: true,
    }
}

/// Metal or diffuse, chosen with probability `metallic`.
fn scatter_opaque(incoming: Vec3, hit: &HitRecord, rng: &mut dyn RngCore) -> BsdfSample {
    let mat = &hit.material;
    let f0 = lerp3(Color::splat(DIELECTRIC_F0), mat.base_color, mat.metallic);

    if gen_f32(rng) < mat.metallic {
        let alpha = mat.roughness * mat.roughness;
        let aspect = (1.0 - 0.9 * mat.anisotropic).sqrt();
        let alpha_x = (alpha / aspect).max(MIN_ALPHA);
        let alpha_y = (alpha * aspect).max(MIN_ALPHA);

        let frame = hit.frame();
        let wo = -incoming.normalize_or_zero();
        let wm = sample_ggx(wo, &frame, alpha_x, alpha_y, rng);
        let direction = reflect(-wo, wm);

        // Microfacets can bounce the ray under the macro surface.
        let color = if direction.dot(frame.n) <= 0.0 {
            Color::ZERO
        } else {
            f0
        };

        return BsdfSample {
            color,
            direction,
            refracted: false,
        };
    }

    BsdfSample {
        color: mat.base_color,
        direction: sample_lambert(hit.normal, rng),
        refracted: false,
    }
}

/// Cosine-weighted direction around `n`.
fn sample_lambert(n: Vec3, rng: &mut dyn RngCore) -> Vec3 {
    let direction = n + random_unit_vector(rng);

    // Catch degenerate scatter direction
    if direction.length_squared() < 1e-8 {
        n
    } else {
        direction.normalize()
    }
}

/// Sample an anisotropic GGX microfacet normal visible from `wo`.
///
/// `alpha_x` stretches along the frame tangent, `alpha_y` along the bitangent.
pub fn sample_ggx(
    wo: Vec3,
    frame: &TangentFrame,
    alpha_x: f32,
    alpha_y: f32,
    rng: &mut dyn RngCore,
) -> Vec3 {
    // Stretch the view direction into the hemisphere configuration
    let v = frame.to_local(wo).normalize_or_zero();
    let v_stretched = Vec3::new(v.x * alpha_x, v.y * alpha_y, v.z).normalize_or_zero();

    let t1 = if v_stretched.z < 0.9999 {
        Vec3::Z.cross(v_stretched).normalize_or_zero()
    } else {
        Vec3::X
    };
    let t2 = v_stretched.cross(t1);

    // Uniform point on the projected disk
    let r = gen_f32(rng).sqrt();
    let phi = 2.0 * PI * gen_f32(rng);
    let x = r * phi.cos();
    let y = r * phi.sin();
    let z = (1.0 - x * x - y * y).max(0.0).sqrt();

    let h_stretched = t1 * x + t2 * y + v_stretched * z;
    let wm_local = Vec3::new(
        h_stretched.x * alpha_x,
        h_stretched.y * alpha_y,
        h_stretched.z.max(0.0),
    )
    .normalize_or_zero();

    frame.to_world(wm_local)
}

// =============================================================================
// Helper functions
// =============================================================================

/// Linear interpolation for colors.
#[inline]
fn lerp3(a: Color, b: Color, t: f32) -> Color {
    a + t * (b - a)
}

/// Schlick weight for Fresnel.
#[inline]
fn schlick_weight(cos_theta: f32) -> f32 {
    let x = (1.0 - cos_theta).clamp(0.0, 1.0);
    let x2 = x * x;
    x2 * x2 * x // (1 - cos_theta)^5
}

/// Schlick's approximation for dielectric reflectance.
#[inline]
fn reflectance(cosine: f32, ior: f32) -> f32 {
    let r0 = ((1.0 - ior) / (1.0 + ior)).powi(2);
    r0 + (1.0 - r0) * schlick_weight(cosine)
}

/// Reflect a vector about a normal.
#[inline]
pub fn reflect(v: Vec3, n: Vec3) -> Vec3 {
    v - 2.0 * v.dot(n) * n
}

/// Refract a unit vector through a surface with relative index `etai_over_etat`.
#[inline]
pub fn refract(uv: Vec3, n: Vec3, etai_over_etat: f32) -> Vec3 {
    let cos_theta = (-uv).dot(n).min(1.0);
    let r_out_perp = etai_over_etat * (uv + cos_theta * n);
    let r_out_parallel = -(1.0 - r_out_perp.length_squared()).abs().sqrt() * n;
    r_out_perp + r_out_parallel
}
