//! Principled surface description shared by every primitive.
//!
//! A single parameter set covers diffuse, metallic, glass and emissive
//! surfaces. Scattering lives in [`crate::bsdf`]; this module only holds the
//! parameters, presets and validation.

use lumen_math::Vec3;
use thiserror::Error;

/// Color type alias (linear RGB, typically 0-1 per channel).
pub type Color = Vec3;

/// Index of a material registered with a [`crate::SceneBuilder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialId(pub usize);

/// Rejected material parameters.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MaterialError {
    #[error("{field} must be within [0, 1], got {value}")]
    OutOfUnitRange { field: &'static str, value: f32 },

    #[error("index of refraction must be positive, got {0}")]
    InvalidIor(f32),

    #[error("emission strength must be non-negative, got {0}")]
    NegativeEmission(f32),

    #[error("{0} has a non-finite or negative component")]
    InvalidColor(&'static str),
}

/// Surface material.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    /// Albedo for dielectrics, reflectance for metals, absorption tint for glass
    pub base_color: Color,

    /// 0 = dielectric, 1 = metal
    pub metallic: f32,

    /// 0 = mirror-smooth, 1 = fully rough
    pub roughness: f32,

    /// Any value above zero makes the surface refractive
    pub transmission: f32,

    /// Index of refraction used by transmissive surfaces
    pub ior: f32,

    /// Stretches the specular lobe along the surface tangent
    pub anisotropic: f32,

    /// Clearcoat layer weight
    pub clearcoat: f32,

    pub clearcoat_roughness: f32,

    pub emission_color: Color,

    /// Radiance multiplier; above zero marks the surface as a light
    pub emission_strength: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            base_color: Color::new(0.8, 0.8, 0.8),
            metallic: 0.0,
            roughness: 0.5,
            transmission: 0.0,
            ior: 1.5,
            anisotropic: 0.0,
            clearcoat: 0.0,
            clearcoat_roughness: 0.03,
            emission_color: Color::ONE,
            emission_strength: 0.0,
        }
    }
}

impl Material {
    /// Create a material with default parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rough, non-metallic surface.
    pub fn diffuse(color: Color) -> Self {
        Self {
            base_color: color,
            roughness: 1.0,
            ..Default::default()
        }
    }

    /// Fully metallic surface.
    pub fn metal(color: Color, roughness: f32) -> Self {
        Self {
            base_color: color,
            metallic: 1.0,
            roughness: roughness.clamp(0.0, 1.0),
            ..Default::default()
        }
    }

    /// Perfect mirror.
    pub fn mirror() -> Self {
        Self::metal(Color::ONE, 0.0)
    }

    /// Clear glass with the given index of refraction.
    pub fn glass(ior: f32) -> Self {
        Self {
            base_color: Color::ONE,
            roughness: 0.0,
            transmission: 1.0,
            ior,
            ..Default::default()
        }
    }

    /// Area light.
    pub fn emissive(color: Color, strength: f32) -> Self {
        Self {
            base_color: Color::ZERO,
            roughness: 1.0,
            emission_color: color,
            emission_strength: strength,
            ..Default::default()
        }
    }

    /// Builder method to set base color.
    pub fn with_base_color(mut self, color: Color) -> Self {
        self.base_color = color;
        self
    }

    /// Builder method to set metallic.
    pub fn with_metallic(mut self, metallic: f32) -> Self {
        self.metallic = metallic.clamp(0.0, 1.0);
        self
    }

    /// Builder method to set roughness.
    pub fn with_roughness(mut self, roughness: f32) -> Self {
        self.roughness = roughness.clamp(0.0, 1.0);
        self
    }

    /// Builder method to set anisotropy.
    pub fn with_anisotropic(mut self, anisotropic: f32) -> Self {
        self.anisotropic = anisotropic.clamp(0.0, 1.0);
        self
    }

    /// Builder method to set transmission and IOR together.
    pub fn with_transmission(mut self, transmission: f32, ior: f32) -> Self {
        self.transmission = transmission.clamp(0.0, 1.0);
        self.ior = ior;
        self
    }

    /// Builder method to set the clearcoat layer.
    pub fn with_clearcoat(mut self, clearcoat: f32, roughness: f32) -> Self {
        self.clearcoat = clearcoat.clamp(0.0, 1.0);
        self.clearcoat_roughness = roughness.clamp(0.0, 1.0);
        self
    }

    /// Builder method to set emission.
    pub fn with_emission(mut self, color: Color, strength: f32) -> Self {
        self.emission_color = color;
        self.emission_strength = strength;
        self
    }

    #[inline]
    pub fn is_emissive(&self) -> bool {
        self.emission_strength > 0.0
    }

    #[inline]
    pub fn is_transmissive(&self) -> bool {
        self.transmission > 0.0
    }

    /// Radiance leaving an emissive surface.
    #[inline]
    pub fn emitted(&self) -> Color {
        self.emission_color * self.emission_strength
    }

    /// Check that every parameter lies in its documented range.
    pub fn validate(&self) -> Result<(), MaterialError> {
        check_color("base_color", self.base_color)?;
        check_color("emission_color", self.emission_color)?;

        let unit = [
            ("metallic", self.metallic),
            ("roughness", self.roughness),
            ("transmission", self.transmission),
            ("anisotropic", self.anisotropic),
            ("clearcoat", self.clearcoat),
            ("clearcoat_roughness", self.clearcoat_roughness),
        ];
        for (field, value) in unit {
            if !(0.0..=1.0).contains(&value) {
                return Err(MaterialError::OutOfUnitRange { field, value });
            }
        }

        if !(self.ior.is_finite() && self.ior > 0.0) {
            return Err(MaterialError::InvalidIor(self.ior));
        }
        if !(self.emission_strength.is_finite() && self.emission_strength >= 0.0) {
            return Err(MaterialError::NegativeEmission(self.emission_strength));
        }
        Ok(())
    }
}

fn check_color(field: &'static str, color: Color) -> Result<(), MaterialError> {
    if color.is_finite() && color.min_element() >= 0.0 {
        Ok(())
    } else {
        Err(MaterialError::InvalidColor(field))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_material_default() {
        let mat = Material::new();
        assert_eq!(mat.metallic, 0.0);
        assert_eq!(mat.roughness, 0.5);
        assert!(!mat.is_emissive());
        assert!(!mat.is_transmissive());
        assert!(mat.validate().is_ok());
    }

    #[test]
    fn test_presets_validate() {
        let presets = [
            Material::diffuse(Color::new(0.65, 0.05, 0.05)),
            Material::metal(Color::new(0.8, 0.6, 0.2), 0.2).with_anisotropic(0.8),
            Material::mirror(),
            Material::glass(1.5),
            Material::emissive(Color::ONE, 5.0),
        ];
        for mat in presets {
            assert!(mat.validate().is_ok(), "{mat:?}");
        }
    }

    #[test]
    fn test_emissive() {
        let light = Material::emissive(Color::new(1.0, 0.5, 0.25), 4.0);
        assert!(light.is_emissive());
        assert_eq!(light.emitted(), Color::new(4.0, 2.0, 1.0));
    }

    #[test]
    fn test_builders_clamp() {
        let mat = Material::new().with_metallic(2.0).with_roughness(-1.0);
        assert_eq!(mat.metallic, 1.0);
        assert_eq!(mat.roughness, 0.0);
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let mut mat = Material::new();
        mat.metallic = 1.5;
        assert_eq!(
            mat.validate(),
            Err(MaterialError::OutOfUnitRange {
                field: "metallic",
                value: 1.5
            })
        );

        let bad_ior = Material::glass(0.0);
        assert_eq!(bad_ior.validate(), Err(MaterialError::InvalidIor(0.0)));

        let bad_light = Material::emissive(Color::ONE, -1.0);
        assert_eq!(bad_light.validate(), Err(MaterialError::NegativeEmission(-1.0)));

        let nan_color = Material::diffuse(Color::new(f32::NAN, 0.0, 0.0));
        assert_eq!(nan_color.validate(), Err(MaterialError::InvalidColor("base_color")));
    }
}
