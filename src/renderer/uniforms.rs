//! Shared GPU uniform layouts.
//!
//! Pass-specific uniform structs live with their passes; the structs here
//! are shared by several pipelines and must match the WGSL declarations in
//! `src/shaders/`. All are `#[repr(C)]` with explicit padding to satisfy
//! WGSL uniform alignment.

use glam::{Mat4, Vec4};

/// Per-frame globals, bind group 0 of every pipeline.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FrameUniforms {
    pub view_projection: Mat4,
    pub inv_view_projection: Mat4,
    /// Camera eye in xyz, near plane in w.
    pub camera_position: Vec4,
    /// Scene ambient in rgb, far plane in w.
    pub ambient_light: Vec4,
    /// Viewport width, height, 1/width, 1/height.
    pub viewport: Vec4,
}

impl Default for FrameUniforms {
    fn default() -> Self {
        Self {
            view_projection: Mat4::IDENTITY,
            inv_view_projection: Mat4::IDENTITY,
            camera_position: Vec4::new(0.0, 0.0, 0.0, 0.1),
            ambient_light: Vec4::new(0.0, 0.0, 0.0, 1000.0),
            viewport: Vec4::ONE,
        }
    }
}

/// Per-draw object data, bind group 1 of the geometry pipelines, bound at a
/// dynamic offset into one shared buffer.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ObjectUniforms {
    pub model: Mat4,
    pub base_color: Vec4,
    /// metallic, roughness, alpha cutoff, unused.
    pub factors: Vec4,
    /// Emissive rgb, unused w.
    pub emissive: Vec4,
}

/// Maximum lights evaluated by the forward pipeline in a single draw
/// (probe baking and the transparent blend pass).
pub const MAX_FORWARD_LIGHTS: usize = 8;

/// One light as seen by the forward shader.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuForwardLight {
    /// Position xyz; w = kind (0 point, 1 spot, 2 directional).
    pub position: Vec4,
    /// Direction xyz; w = falloff range.
    pub direction: Vec4,
    /// Color premultiplied by intensity; w = cos(cone angle) for spots.
    pub color: Vec4,
    /// Spot exponent in x.
    pub params: Vec4,
}

/// Light array for the forward pipeline, bind group 3.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ForwardLightUniforms {
    /// Ambient rgb; w = number of active lights.
    pub ambient: Vec4,
    pub lights: [GpuForwardLight; MAX_FORWARD_LIGHTS],
}

impl Default for ForwardLightUniforms {
    fn default() -> Self {
        Self {
            ambient: Vec4::ZERO,
            lights: [GpuForwardLight::default(); MAX_FORWARD_LIGHTS],
        }
    }
}
