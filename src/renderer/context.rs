//! Per-frame render context and the pass abstraction.
//!
//! A [`FrameContext`] value is threaded explicitly through every pass; it
//! owns nothing long-lived itself but borrows the renderer's caches, so
//! there is no hidden global state anywhere in the pipeline.

use glam::{Mat4, Vec3, Vec4};
use smallvec::SmallVec;

use crate::renderer::probes::ProbeVolume;
use crate::renderer::settings::RendererSettings;
use crate::renderer::stores::{DynamicUniformBuffer, GeometryStore, TextureStore};
use crate::renderer::targets::TargetCache;
use crate::renderer::uniforms::{FrameUniforms, ObjectUniforms};
use crate::renderer::visibility::DrawRecord;
use crate::renderer::{pipeline, MAX_SHADOW_CASTERS};
use crate::scene::{Camera, LightHandle, Scene};

/// Camera state extracted for rendering, decoupled from the scene camera so
/// bake cameras can reuse every pass unchanged.
#[derive(Debug, Clone, Copy)]
pub struct RenderCamera {
    pub position: Vec3,
    pub view_projection: Mat4,
    pub inv_view_projection: Mat4,
    pub near: f32,
    pub far: f32,
}

impl RenderCamera {
    #[must_use]
    pub fn from_camera(camera: &Camera) -> Self {
        let view_projection = camera.view_projection_matrix();
        Self {
            position: camera.eye(),
            view_projection,
            inv_view_projection: view_projection.inverse(),
            near: camera.near,
            far: camera.far,
        }
    }

    #[must_use]
    pub fn from_matrix(view_projection: Mat4, position: Vec3, near: f32, far: f32) -> Self {
        Self {
            position,
            view_projection,
            inv_view_projection: view_projection.inverse(),
            near,
            far,
        }
    }
}

/// A shadow-casting light selected for this frame, with the exact
/// view-projection its depth target was rendered from.
#[derive(Debug, Clone, Copy)]
pub struct ShadowCaster {
    pub light: LightHandle,
    pub view_projection: Mat4,
    pub bias: f32,
    pub map_size: u32,
}

/// Resources shared by all geometry-rasterizing pipelines: frame globals
/// (group 0), the per-draw object buffer (group 1) and the material texture
/// layout (group 2).
pub struct SharedResources {
    pub frame_layout: wgpu::BindGroupLayout,
    pub frame_buffer: wgpu::Buffer,
    pub frame_bind_group: wgpu::BindGroup,
    pub material_layout: wgpu::BindGroupLayout,
    pub objects: DynamicUniformBuffer<ObjectUniforms>,
}

impl SharedResources {
    #[must_use]
    pub fn new(device: &wgpu::Device) -> Self {
        let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Frame BindGroup Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let frame_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Frame Uniforms"),
            size: std::mem::size_of::<FrameUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Frame BindGroup"),
            layout: &frame_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_buffer.as_entire_binding(),
            }],
        });

        let material_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Material BindGroup Layout"),
            entries: &[
                pipeline::texture_entry(0, wgpu::TextureSampleType::Float { filterable: true }),
                pipeline::texture_entry(1, wgpu::TextureSampleType::Float { filterable: true }),
                pipeline::texture_entry(2, wgpu::TextureSampleType::Float { filterable: true }),
                pipeline::texture_entry(3, wgpu::TextureSampleType::Float { filterable: true }),
                pipeline::sampler_entry(4, wgpu::SamplerBindingType::Filtering),
            ],
        });

        let objects = DynamicUniformBuffer::new(
            device,
            "Object Uniforms",
            wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
        );

        Self {
            frame_layout,
            frame_buffer,
            frame_bind_group,
            material_layout,
            objects,
        }
    }

    /// Uploads this frame's globals.
    pub fn write_frame_uniforms(
        &self,
        queue: &wgpu::Queue,
        camera: &RenderCamera,
        ambient: Vec3,
        size: (u32, u32),
    ) {
        let uniforms = FrameUniforms {
            view_projection: camera.view_projection,
            inv_view_projection: camera.inv_view_projection,
            camera_position: camera.position.extend(camera.near),
            ambient_light: ambient.extend(camera.far),
            viewport: Vec4::new(
                size.0 as f32,
                size.1 as f32,
                1.0 / size.0.max(1) as f32,
                1.0 / size.1.max(1) as f32,
            ),
        };
        queue.write_buffer(&self.frame_buffer, 0, bytemuck::bytes_of(&uniforms));
    }
}

/// Everything a pass needs for one frame.
pub struct FrameContext<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    pub scene: &'a Scene,
    pub camera: RenderCamera,
    pub settings: &'a RendererSettings,

    pub targets: &'a mut TargetCache,
    pub geometries: &'a mut GeometryStore,
    pub textures: &'a mut TextureStore,
    pub shared: &'a mut SharedResources,
    pub probes: &'a ProbeVolume,

    /// Frustum-culled, distance-sorted draw records; index `i` addresses the
    /// object uniform at `shared.objects.offset(i)`.
    pub records: &'a [DrawRecord],
    /// Published by the shadow pass prepare for the lighting pass.
    pub shadow_casters: SmallVec<[ShadowCaster; MAX_SHADOW_CASTERS]>,

    /// Where the tonemap pass writes the finished frame.
    pub output: &'a wgpu::TextureView,
    pub size: (u32, u32),
    pub output_format: wgpu::TextureFormat,
}

/// One pipeline stage.
///
/// `prepare` allocates targets, uploads uniforms and builds bind groups;
/// `run` only records GPU commands. The renderer invokes all prepares in
/// pass order, then all runs into a single encoder, so a pass may rely on
/// every upstream target existing by the time it records.
pub trait RenderNode {
    fn name(&self) -> &'static str;

    fn prepare(&mut self, _ctx: &mut FrameContext<'_>) {}

    fn run(&self, ctx: &FrameContext<'_>, encoder: &mut wgpu::CommandEncoder);
}
