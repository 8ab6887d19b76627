//! G-buffer rasterization pass.
//!
//! Rasterizes every opaque/masked draw record into three color attachments
//! plus depth:
//!
//! | Attachment | Format      | Contents                          |
//! |------------|-------------|-----------------------------------|
//! | 0          | Rgba8Unorm  | base color                        |
//! | 1          | Rgba16Float | encoded world normal + roughness  |
//! | 2          | Rgba16Float | metallic + emissive               |
//! | depth      | Depth32Float| scene depth                       |
//!
//! Attachment 0 is cleared to the scene background color, so background
//! texels survive into the light accumulation pass unchanged. Alpha-blend
//! materials are excluded; they render in the forward blend pass.

use crate::renderer::context::{FrameContext, RenderNode};
use crate::renderer::pipeline::{self, DrawPipelineDesc};
use crate::renderer::targets::{TargetDesc, TargetPurpose};
use crate::renderer::{
    DEPTH_FORMAT, GBUFFER_ALBEDO_FORMAT, GBUFFER_EXTRA_FORMAT, GBUFFER_NORMAL_FORMAT,
};
use crate::resources::MaterialHandle;

struct GBufferDraw {
    record_index: usize,
    material: MaterialHandle,
    two_sided: bool,
}

pub struct GBufferPass {
    shader: wgpu::ShaderModule,
    pipeline_back_cull: Option<wgpu::RenderPipeline>,
    pipeline_two_sided: Option<wgpu::RenderPipeline>,
    draws: Vec<GBufferDraw>,
}

impl GBufferPass {
    #[must_use]
    pub fn new(device: &wgpu::Device) -> Self {
        let shader = pipeline::create_shader(
            device,
            "GBuffer Shader",
            include_str!("../../shaders/gbuffer.wgsl"),
        );
        Self {
            shader,
            pipeline_back_cull: None,
            pipeline_two_sided: None,
            draws: Vec::new(),
        }
    }

    fn ensure_pipelines(&mut self, ctx: &FrameContext<'_>) {
        if self.pipeline_back_cull.is_some() {
            return;
        }

        let color_targets = [
            Some(wgpu::ColorTargetState {
                format: GBUFFER_ALBEDO_FORMAT,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            }),
            Some(wgpu::ColorTargetState {
                format: GBUFFER_NORMAL_FORMAT,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            }),
            Some(wgpu::ColorTargetState {
                format: GBUFFER_EXTRA_FORMAT,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            }),
        ];
        let layouts = [
            &ctx.shared.frame_layout,
            ctx.shared.objects.layout(),
            &ctx.shared.material_layout,
        ];

        for (cull_mode, slot) in [
            (Some(wgpu::Face::Back), &mut self.pipeline_back_cull),
            (None, &mut self.pipeline_two_sided),
        ] {
            *slot = Some(pipeline::create_draw_pipeline(
                ctx.device,
                &DrawPipelineDesc {
                    label: "GBuffer Pipeline",
                    shader: &self.shader,
                    layouts: &layouts,
                    color_targets: &color_targets,
                    depth_format: DEPTH_FORMAT,
                    depth_write: true,
                    cull_mode,
                },
            ));
        }
    }

    fn allocate_targets(ctx: &mut FrameContext<'_>) {
        let (width, height) = ctx.size;
        let usage = wgpu::TextureUsages::RENDER_ATTACHMENT
            | wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_SRC
            | wgpu::TextureUsages::COPY_DST;

        for (purpose, format, label) in [
            (TargetPurpose::GBufferAlbedo, GBUFFER_ALBEDO_FORMAT, "GBuffer Albedo"),
            (TargetPurpose::GBufferNormal, GBUFFER_NORMAL_FORMAT, "GBuffer Normal"),
            (TargetPurpose::GBufferExtra, GBUFFER_EXTRA_FORMAT, "GBuffer Extra"),
            (TargetPurpose::GBufferDepth, DEPTH_FORMAT, "GBuffer Depth"),
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
    }
}

impl RenderNode for GBufferPass {
    fn name(&self) -> &'static str {
        "GBuffer Pass"
    }

    fn prepare(&mut self, ctx: &mut FrameContext<'_>) {
        Self::allocate_targets(ctx);
        self.ensure_pipelines(ctx);

        self.draws.clear();
        for (record_index, record) in ctx.records.iter().enumerate() {
            let Some(material) = ctx.scene.materials.get(record.material) else {
                continue;
            };
            if material.is_blended() {
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

            self.draws.push(GBufferDraw {
                record_index,
                material: record.material,
                two_sided: material.two_sided,
            });
        }
    }

    fn run(&self, ctx: &FrameContext<'_>, encoder: &mut wgpu::CommandEncoder) {
        let (Some(albedo), Some(normal), Some(extra), Some(depth)) = (
            ctx.targets.view(TargetPurpose::GBufferAlbedo),
            ctx.targets.view(TargetPurpose::GBufferNormal),
            ctx.targets.view(TargetPurpose::GBufferExtra),
            ctx.targets.view(TargetPurpose::GBufferDepth),
        ) else {
            return;
        };

        let bg = ctx.scene.background_color;
        let clear_background = wgpu::Color {
            r: f64::from(bg.x),
            g: f64::from(bg.y),
            b: f64::from(bg.z),
            a: 1.0,
        };

        let color_attachment = |view, clear| {
            Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })
        };

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("GBuffer Pass"),
            color_attachments: &[
                color_attachment(albedo, clear_background),
                color_attachment(normal, wgpu::Color::BLACK),
                color_attachment(extra, wgpu::Color::BLACK),
            ],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: depth,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            ..Default::default()
        });

        let (Some(back_cull), Some(two_sided)) =
            (&self.pipeline_back_cull, &self.pipeline_two_sided)
        else {
            return;
        };

        pass.set_bind_group(0, &ctx.shared.frame_bind_group, &[]);

        for draw in &self.draws {
            let Some(material_bg) = ctx.textures.cached_material_bind_group(draw.material) else {
                continue;
            };

            pass.set_pipeline(if draw.two_sided { two_sided } else { back_cull });
            pass.set_bind_group(
                1,
                ctx.shared.objects.bind_group(),
                &[ctx.shared.objects.offset(draw.record_index)],
            );
            pass.set_bind_group(2, material_bg, &[]);
            ctx.geometries.draw(&mut pass, ctx.records[draw.record_index].geometry);
        }
    }
}
