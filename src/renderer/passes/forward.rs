//! Forward shading pass.
//!
//! Two duties share one shader and light array:
//! - the blend pass: alpha-blended materials composited back-to-front on
//!   top of the HDR result, depth-tested against the G-buffer depth;
//! - probe baking: opaque scene rendering into cube-face targets via
//!   [`ForwardPass::encode_scene`], driven by the renderer's bake loop.

use glam::Vec4;

use crate::renderer::context::{FrameContext, RenderNode};
use crate::renderer::pipeline::{self, DrawPipelineDesc};
use crate::renderer::stores::{DynamicUniformBuffer, GeometryStore, TextureStore};
use crate::renderer::targets::TargetPurpose;
use crate::renderer::uniforms::{
    ForwardLightUniforms, GpuForwardLight, ObjectUniforms, MAX_FORWARD_LIGHTS,
};
use crate::renderer::visibility::DrawRecord;
use crate::renderer::{DEPTH_FORMAT, HDR_FORMAT};
use crate::scene::{LightKind, Scene};

/// Builds the fixed-size light array the forward shader consumes. Lights
/// beyond the array capacity are dropped in entity order.
#[must_use]
pub fn build_light_array(scene: &Scene) -> ForwardLightUniforms {
    let mut uniforms = ForwardLightUniforms::default();
    let mut count = 0usize;

    for (_, light) in scene.active_lights() {
        if count == MAX_FORWARD_LIGHTS {
            log::warn!(
                "forward pass light array full ({MAX_FORWARD_LIGHTS}), dropping remaining lights"
            );
            break;
        }
        let kind = match light.kind {
            LightKind::Point { .. } => 0.0,
            LightKind::Spot { .. } => 1.0,
            LightKind::Directional { .. } => 2.0,
        };
        let (range, cos_cutoff, exponent) = match light.kind {
            LightKind::Point { range } => (range, -1.0, 0.0),
            LightKind::Spot {
                range,
                cone_angle,
                exponent,
            } => (range, cone_angle.cos(), exponent),
            LightKind::Directional { .. } => (0.0, -1.0, 0.0),
        };
        uniforms.lights[count] = GpuForwardLight {
            position: light.position().extend(kind),
            direction: light.direction().extend(range),
            color: (light.color * light.intensity).extend(cos_cutoff),
            params: Vec4::new(exponent, 0.0, 0.0, 0.0),
        };
        count += 1;
    }

    uniforms.ambient = scene.ambient_light.extend(count as f32);
    uniforms
}

pub struct ForwardPass {
    shader: wgpu::ShaderModule,
    blend_pipeline: Option<wgpu::RenderPipeline>,
    blend_pipeline_two_sided: Option<wgpu::RenderPipeline>,
    bake_pipeline: Option<wgpu::RenderPipeline>,

    lights_layout: wgpu::BindGroupLayout,
    lights_buffer: wgpu::Buffer,
    lights_bind_group: wgpu::BindGroup,

    blend_draws: Vec<(usize, bool)>,
}

impl ForwardPass {
    #[must_use]
    pub fn new(device: &wgpu::Device) -> Self {
        let shader = pipeline::create_shader(
            device,
            "Forward Shader",
            include_str!("../../shaders/forward.wgsl"),
        );

        let lights_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Forward Lights Layout"),
            entries: &[pipeline::uniform_entry(0, wgpu::ShaderStages::FRAGMENT)],
        });
        let lights_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Forward Lights"),
            size: std::mem::size_of::<ForwardLightUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let lights_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Forward Lights BindGroup"),
            layout: &lights_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: lights_buffer.as_entire_binding(),
            }],
        });

        Self {
            shader,
            blend_pipeline: None,
            blend_pipeline_two_sided: None,
            bake_pipeline: None,
            lights_layout,
            lights_buffer,
            lights_bind_group,
            blend_draws: Vec::new(),
        }
    }

    /// Uploads the current scene lights for the forward shader.
    pub fn write_lights(&self, queue: &wgpu::Queue, scene: &Scene) {
        let uniforms = build_light_array(scene);
        queue.write_buffer(&self.lights_buffer, 0, bytemuck::bytes_of(&uniforms));
    }

    pub(crate) fn ensure_pipelines(
        &mut self,
        device: &wgpu::Device,
        frame_layout: &wgpu::BindGroupLayout,
        objects_layout: &wgpu::BindGroupLayout,
        material_layout: &wgpu::BindGroupLayout,
    ) {
        if self.blend_pipeline.is_some() {
            return;
        }
        let layouts = [
            frame_layout,
            objects_layout,
            material_layout,
            &self.lights_layout,
        ];

        let blend_target = [Some(wgpu::ColorTargetState {
            format: HDR_FORMAT,
            blend: Some(wgpu::BlendState::ALPHA_BLENDING),
            write_mask: wgpu::ColorWrites::ALL,
        })];
        for (cull_mode, slot) in [
            (Some(wgpu::Face::Back), &mut self.blend_pipeline),
            (None, &mut self.blend_pipeline_two_sided),
        ] {
            *slot = Some(pipeline::create_draw_pipeline(
                device,
                &DrawPipelineDesc {
                    label: "Forward Blend Pipeline",
                    shader: &self.shader,
                    layouts: &layouts,
                    color_targets: &blend_target,
                    depth_format: DEPTH_FORMAT,
                    depth_write: false,
                    cull_mode,
                },
            ));
        }

        let bake_target = [Some(wgpu::ColorTargetState {
            format: HDR_FORMAT,
            blend: None,
            write_mask: wgpu::ColorWrites::ALL,
        })];
        self.bake_pipeline = Some(pipeline::create_draw_pipeline(
            device,
            &DrawPipelineDesc {
                label: "Forward Bake Pipeline",
                shader: &self.shader,
                layouts: &layouts,
                color_targets: &bake_target,
                depth_format: DEPTH_FORMAT,
                depth_write: true,
                cull_mode: Some(wgpu::Face::Back),
            },
        ));
    }

    /// Rasterizes `records` with the bake pipeline into the given color and
    /// depth views. Used by probe baking; blended materials are skipped.
    pub fn encode_scene(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        color_view: &wgpu::TextureView,
        depth_view: &wgpu::TextureView,
        clear_color: wgpu::Color,
        frame_bind_group: &wgpu::BindGroup,
        objects: &DynamicUniformBuffer<ObjectUniforms>,
        geometries: &GeometryStore,
        textures: &TextureStore,
        records: &[DrawRecord],
        scene: &Scene,
    ) {
        let Some(bake_pipeline) = &self.bake_pipeline else {
            return;
        };

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Probe Face Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear_color),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            ..Default::default()
        });

        pass.set_pipeline(bake_pipeline);
        pass.set_bind_group(0, frame_bind_group, &[]);
        pass.set_bind_group(3, &self.lights_bind_group, &[]);

        for (index, record) in records.iter().enumerate() {
            let Some(material) = scene.materials.get(record.material) else {
                continue;
            };
            if material.is_blended() {
                continue;
            }
            let Some(material_bg) = textures.cached_material_bind_group(record.material) else {
                continue;
            };
            pass.set_bind_group(1, objects.bind_group(), &[objects.offset(index)]);
            pass.set_bind_group(2, material_bg, &[]);
            geometries.draw(&mut pass, record.geometry);
        }
    }
}

impl RenderNode for ForwardPass {
    fn name(&self) -> &'static str {
        "Forward Blend Pass"
    }

    fn prepare(&mut self, ctx: &mut FrameContext<'_>) {
        self.ensure_pipelines(
            ctx.device,
            &ctx.shared.frame_layout,
            ctx.shared.objects.layout(),
            &ctx.shared.material_layout,
        );
        self.write_lights(ctx.queue, ctx.scene);

        // Blended records composite back-to-front: walk the
        // distance-sorted list in reverse
        self.blend_draws.clear();
        for (index, record) in ctx.records.iter().enumerate().rev() {
            let Some(material) = ctx.scene.materials.get(record.material) else {
                continue;
            };
            if !material.is_blended() {
                continue;
            }
            ctx.geometries.prepare(ctx.device, ctx.scene, record.geometry);
            for handle in [
                material.albedo_texture,
                material.metallic_roughness_texture,
                material.emissive_texture,
                material.normal_texture,
            ] {
                ctx.textures.prepare(ctx.device, ctx.queue, ctx.scene, handle);
            }
            ctx.textures.material_bind_group(
                ctx.device,
                &ctx.shared.material_layout,
                ctx.scene,
                record.material,
            );
            self.blend_draws.push((index, material.two_sided));
        }
    }

    fn run(&self, ctx: &FrameContext<'_>, encoder: &mut wgpu::CommandEncoder) {
        if self.blend_draws.is_empty() {
            return;
        }
        let (Some(back_cull), Some(two_sided)) =
            (&self.blend_pipeline, &self.blend_pipeline_two_sided)
        else {
            return;
        };
        let (Some(hdr), Some(depth)) = (
            ctx.targets.view(TargetPurpose::Hdr),
            ctx.targets.view(TargetPurpose::GBufferDepth),
        ) else {
            return;
        };

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Forward Blend Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: hdr,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: depth,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            ..Default::default()
        });

        pass.set_bind_group(0, &ctx.shared.frame_bind_group, &[]);
        pass.set_bind_group(3, &self.lights_bind_group, &[]);

        for &(index, is_two_sided) in &self.blend_draws {
            let record = &ctx.records[index];
            let Some(material_bg) = ctx.textures.cached_material_bind_group(record.material)
            else {
                continue;
            };
            pass.set_pipeline(if is_two_sided { two_sided } else { back_cull });
            pass.set_bind_group(1, ctx.shared.objects.bind_group(), &[ctx.shared.objects.offset(index)]);
            pass.set_bind_group(2, material_bg, &[]);
            ctx.geometries.draw(&mut pass, record.geometry);
        }
    }
}
