//! Decal composite pass.
//!
//! Copies the G-buffer color attachments and depth into secondary targets,
//! projects each decal volume onto the copied base color (world position
//! reconstructed from the copied depth, clipped to the decal's unit box),
//! then copies the modified base color back over the G-buffer.

use glam::{Mat4, Vec4};

use crate::renderer::context::{FrameContext, RenderNode};
use crate::renderer::pipeline;
use crate::renderer::stores::DynamicUniformBuffer;
use crate::renderer::targets::{TargetDesc, TargetPurpose};
use crate::renderer::{
    DEPTH_FORMAT, GBUFFER_ALBEDO_FORMAT, GBUFFER_EXTRA_FORMAT, GBUFFER_NORMAL_FORMAT,
};

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct DecalUniforms {
    inv_model: Mat4,
    /// World-space projection axis of the decal (its local -Z).
    orientation: Vec4,
    /// Decal opacity in w.
    color: Vec4,
}

pub struct DecalPass {
    shader: wgpu::ShaderModule,
    pipeline: Option<wgpu::RenderPipeline>,
    input_layout: wgpu::BindGroupLayout,
    uniforms: DynamicUniformBuffer<DecalUniforms>,
    input_bind_groups: Vec<wgpu::BindGroup>,
    decal_count: usize,
}

impl DecalPass {
    #[must_use]
    pub fn new(device: &wgpu::Device) -> Self {
        let shader = pipeline::create_shader(
            device,
            "Decal Shader",
            include_str!("../../shaders/decal.wgsl"),
        );
        let input_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Decal Input Layout"),
            entries: &[
                pipeline::texture_entry(0, wgpu::TextureSampleType::Depth),
                pipeline::texture_entry(1, wgpu::TextureSampleType::Float { filterable: true }),
                pipeline::texture_entry(2, wgpu::TextureSampleType::Float { filterable: true }),
                pipeline::sampler_entry(3, wgpu::SamplerBindingType::Filtering),
            ],
        });
        let uniforms =
            DynamicUniformBuffer::new(device, "Decal Uniforms", wgpu::ShaderStages::FRAGMENT);

        Self {
            shader,
            pipeline: None,
            input_layout,
            uniforms,
            input_bind_groups: Vec::new(),
            decal_count: 0,
        }
    }

    fn ensure_pipeline(&mut self, ctx: &FrameContext<'_>) {
        if self.pipeline.is_some() {
            return;
        }
        self.pipeline = Some(pipeline::create_fullscreen_pipeline(
            ctx.device,
            "Decal Pipeline",
            &self.shader,
            &[
                &ctx.shared.frame_layout,
                &self.input_layout,
                self.uniforms.layout(),
            ],
            GBUFFER_ALBEDO_FORMAT,
            Some(wgpu::BlendState::ALPHA_BLENDING),
        ));
    }
}

impl RenderNode for DecalPass {
    fn name(&self) -> &'static str {
        "Decal Pass"
    }

    fn prepare(&mut self, ctx: &mut FrameContext<'_>) {
        self.decal_count = 0;
        if !ctx.settings.decals_enabled {
            return;
        }

        let decals: Vec<_> = ctx.scene.active_decals().collect();
        if decals.is_empty() {
            return;
        }
        self.ensure_pipeline(ctx);

        let (width, height) = ctx.size;
        let usage = wgpu::TextureUsages::RENDER_ATTACHMENT
            | wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_SRC
            | wgpu::TextureUsages::COPY_DST;
        for (purpose, format, label) in [
            (TargetPurpose::GBufferAlbedoCopy, GBUFFER_ALBEDO_FORMAT, "GBuffer Albedo Copy"),
            (TargetPurpose::GBufferNormalCopy, GBUFFER_NORMAL_FORMAT, "GBuffer Normal Copy"),
            (TargetPurpose::GBufferExtraCopy, GBUFFER_EXTRA_FORMAT, "GBuffer Extra Copy"),
            (TargetPurpose::GBufferDepthCopy, DEPTH_FORMAT, "GBuffer Depth Copy"),
        ] {
            ctx.targets.get_or_create(
                ctx.device,
                purpose,
                &TargetDesc {
                    width,
                    height,
                    format,
                    usage,
                    label,
                },
            );
        }

        let mut uniforms = Vec::with_capacity(decals.len());
        let mut textures = Vec::with_capacity(decals.len());
        for decal in &decals {
            let model = decal.model_matrix();
            let orientation = -model.z_axis.truncate().normalize_or_zero();
            uniforms.push(DecalUniforms {
                inv_model: model.inverse(),
                orientation: orientation.extend(0.0),
                color: Vec4::new(1.0, 1.0, 1.0, decal.alpha),
            });
            ctx.textures
                .prepare(ctx.device, ctx.queue, ctx.scene, decal.albedo_texture);
            textures.push(decal.albedo_texture);
        }
        self.uniforms.write(ctx.device, ctx.queue, &uniforms);

        let (Some(depth_copy), Some(normal_copy)) = (
            ctx.targets.view(TargetPurpose::GBufferDepthCopy),
            ctx.targets.view(TargetPurpose::GBufferNormalCopy),
        ) else {
            return;
        };

        self.input_bind_groups.clear();
        for handle in textures {
            self.input_bind_groups
                .push(ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("Decal Input BindGroup"),
                    layout: &self.input_layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: wgpu::BindingResource::TextureView(depth_copy),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::TextureView(normal_copy),
                        },
                        wgpu::BindGroupEntry {
                            binding: 2,
                            resource: wgpu::BindingResource::TextureView(
                                ctx.textures.view_or_white(handle),
                            ),
                        },
                        wgpu::BindGroupEntry {
                            binding: 3,
                            resource: wgpu::BindingResource::Sampler(&ctx.textures.linear_sampler),
                        },
                    ],
                }));
        }
        self.decal_count = decals.len();
    }

    fn run(&self, ctx: &FrameContext<'_>, encoder: &mut wgpu::CommandEncoder) {
        if self.decal_count == 0 {
            return;
        }
        let Some(pipeline) = &self.pipeline else {
            return;
        };

        let pairs = [
            (TargetPurpose::GBufferAlbedo, TargetPurpose::GBufferAlbedoCopy),
            (TargetPurpose::GBufferNormal, TargetPurpose::GBufferNormalCopy),
            (TargetPurpose::GBufferExtra, TargetPurpose::GBufferExtraCopy),
            (TargetPurpose::GBufferDepth, TargetPurpose::GBufferDepthCopy),
        ];

        // Snapshot the G-buffer
        for (src, dst) in pairs {
            let (Some(src), Some(dst)) = (ctx.targets.texture(src), ctx.targets.texture(dst))
            else {
                return;
            };
            copy_full(encoder, src, dst);
        }

        // Blend decals onto the copied base color
        {
            let Some(albedo_copy) = ctx.targets.view(TargetPurpose::GBufferAlbedoCopy) else {
                return;
            };
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Decal Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: albedo_copy,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                ..Default::default()
            });

            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &ctx.shared.frame_bind_group, &[]);
            for i in 0..self.decal_count {
                pass.set_bind_group(1, &self.input_bind_groups[i], &[]);
                pass.set_bind_group(2, self.uniforms.bind_group(), &[self.uniforms.offset(i)]);
                pass.draw(0..3, 0..1);
            }
        }

        // Write the decaled base color back over the live G-buffer
        if let (Some(src), Some(dst)) = (
            ctx.targets.texture(TargetPurpose::GBufferAlbedoCopy),
            ctx.targets.texture(TargetPurpose::GBufferAlbedo),
        ) {
            copy_full(encoder, src, dst);
        }
    }
}

fn copy_full(encoder: &mut wgpu::CommandEncoder, src: &wgpu::Texture, dst: &wgpu::Texture) {
    encoder.copy_texture_to_texture(
        wgpu::TexelCopyTextureInfo {
            texture: src,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyTextureInfo {
            texture: dst,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::Extent3d {
            width: src.width(),
            height: src.height(),
            depth_or_array_layers: 1,
        },
    );
}
