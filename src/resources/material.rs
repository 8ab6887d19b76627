//! Surface materials: scalar factors, alpha policy and texture bindings.

use glam::{Vec3, Vec4};

use crate::resources::TextureHandle;

/// How a material's alpha channel is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlphaMode {
    /// Alpha is ignored; the surface is fully opaque.
    #[default]
    Opaque,
    /// Pixels with sampled alpha below the cutoff are discarded.
    Mask,
    /// The surface is alpha-blended in the forward pass and excluded from
    /// the G-buffer and shadow depth passes.
    Blend,
}

/// A PBR-ish material record. Read-only during rendering.
#[derive(Debug, Clone)]
pub struct Material {
    pub base_color: Vec4,
    pub metallic_factor: f32,
    pub roughness_factor: f32,
    pub emissive_factor: Vec3,

    pub alpha_mode: AlphaMode,
    pub alpha_cutoff: f32,
    pub two_sided: bool,

    pub albedo_texture: Option<TextureHandle>,
    pub metallic_roughness_texture: Option<TextureHandle>,
    pub emissive_texture: Option<TextureHandle>,
    pub normal_texture: Option<TextureHandle>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            base_color: Vec4::ONE,
            metallic_factor: 0.0,
            roughness_factor: 1.0,
            emissive_factor: Vec3::ZERO,
            alpha_mode: AlphaMode::Opaque,
            alpha_cutoff: 0.5,
            two_sided: false,
            albedo_texture: None,
            metallic_roughness_texture: None,
            emissive_texture: None,
            normal_texture: None,
        }
    }
}

impl Material {
    /// The alpha cutoff the shaders receive: masked materials use their
    /// configured cutoff, everything else discards nothing.
    #[inline]
    #[must_use]
    pub fn effective_alpha_cutoff(&self) -> f32 {
        match self.alpha_mode {
            AlphaMode::Mask => self.alpha_cutoff,
            AlphaMode::Opaque | AlphaMode::Blend => 0.0,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_blended(&self) -> bool {
        self.alpha_mode == AlphaMode::Blend
    }
}

/// CPU reference for the alpha-mask discard the G-buffer shader performs:
/// returns `true` when a fragment with `sampled_alpha` survives.
#[inline]
#[must_use]
pub fn alpha_test(sampled_alpha: f32, mode: AlphaMode, cutoff: f32) -> bool {
    match mode {
        AlphaMode::Mask => sampled_alpha >= cutoff,
        AlphaMode::Opaque | AlphaMode::Blend => true,
    }
}
