//! Shadow map generation.
//!
//! For each selected shadow caster: lazily allocate a depth-only target
//! sized to the light's map size, re-run visibility collection against the
//! light's frustum, and rasterize depth with the light's view-projection.
//! The same matrix is published to the lighting pass for sampling, which
//! keeps shadow projection geometrically consistent with the map contents.
//!
//! Caster selection is an explicit policy: the `max_casters` lights nearest
//! to the camera eye win, with directional lights counted at distance zero
//! (they affect the whole scene). Alpha-blend geometry does not cast
//! shadows.

use glam::{Mat4, Vec3};
use smallvec::SmallVec;

use crate::renderer::context::{FrameContext, RenderNode, ShadowCaster};
use crate::renderer::pipeline::{self, DrawPipelineDesc};
use crate::renderer::stores::DynamicUniformBuffer;
use crate::renderer::targets::{TargetDesc, TargetPurpose};
use crate::renderer::uniforms::ObjectUniforms;
use crate::renderer::visibility::{self, DrawRecord};
use crate::renderer::{DEPTH_FORMAT, MAX_SHADOW_CASTERS};
use crate::scene::{Frustum, Scene};

/// Selects which lights cast shadows this frame: the `max_casters` nearest
/// to `camera_position` among shadow-capable lights (nearest-N policy;
/// directional lights sort at distance zero).
#[must_use]
pub fn select_shadow_casters(
    scene: &Scene,
    camera_position: Vec3,
    max_casters: usize,
) -> SmallVec<[ShadowCaster; MAX_SHADOW_CASTERS]> {
    let mut candidates: Vec<(f32, ShadowCaster)> = scene
        .active_lights()
        .filter(|(_, light)| light.cast_shadows && light.supports_shadows())
        .filter_map(|(handle, light)| {
            let view_projection = light.shadow_view_projection()?;
            let distance = if light.range().is_finite() {
                camera_position.distance(light.position())
            } else {
                0.0
            };
            Some((
                distance,
                ShadowCaster {
                    light: handle,
                    view_projection,
                    bias: light.shadow_bias,
                    map_size: light.shadow_map_size,
                },
            ))
        })
        .collect();

    candidates.sort_by(|a, b| a.0.total_cmp(&b.0));
    candidates
        .into_iter()
        .take(max_casters)
        .map(|(_, caster)| caster)
        .collect()
}

struct ShadowDraw {
    object_index: usize,
    record: DrawRecord,
}

struct CasterBatch {
    caster: ShadowCaster,
    draws: Vec<ShadowDraw>,
}

pub struct ShadowPass {
    shader: wgpu::ShaderModule,
    pipeline: Option<wgpu::RenderPipeline>,
    light_matrices: DynamicUniformBuffer<Mat4>,
    objects: DynamicUniformBuffer<ObjectUniforms>,
    batches: Vec<CasterBatch>,
}

impl ShadowPass {
    #[must_use]
    pub fn new(device: &wgpu::Device) -> Self {
        let shader = pipeline::create_shader(
            device,
            "Shadow Depth Shader",
            include_str!("../../shaders/shadow_depth.wgsl"),
        );
        Self {
            shader,
            pipeline: None,
            light_matrices: DynamicUniformBuffer::new(
                device,
                "Shadow Light Matrices",
                wgpu::ShaderStages::VERTEX,
            ),
            objects: DynamicUniformBuffer::new(
                device,
                "Shadow Object Uniforms",
                wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ),
            batches: Vec::new(),
        }
    }

    fn ensure_pipeline(&mut self, ctx: &FrameContext<'_>) {
        if self.pipeline.is_some() {
            return;
        }
        let layouts = [
            self.light_matrices.layout(),
            self.objects.layout(),
            &ctx.shared.material_layout,
        ];
        // No culling: shadow casters contribute both faces, which also keeps
        // two-sided materials correct without a pipeline variant
        self.pipeline = Some(pipeline::create_draw_pipeline(
            ctx.device,
            &DrawPipelineDesc {
                label: "Shadow Depth Pipeline",
                shader: &self.shader,
                layouts: &layouts,
                color_targets: &[],
                depth_format: DEPTH_FORMAT,
                depth_write: true,
                cull_mode: None,
            },
        ));
    }
}

impl RenderNode for ShadowPass {
    fn name(&self) -> &'static str {
        "Shadow Pass"
    }

    fn prepare(&mut self, ctx: &mut FrameContext<'_>) {
        self.ensure_pipeline(ctx);
        self.batches.clear();

        let mut casters = select_shadow_casters(
            ctx.scene,
            ctx.camera.position,
            ctx.settings.shadow.max_casters,
        );

        let mut matrices = Vec::with_capacity(casters.len());
        let mut object_uniforms: Vec<ObjectUniforms> = Vec::new();

        for caster in &mut casters {
            // Lights without their own map size use the renderer default
            if caster.map_size == 0 {
                caster.map_size = ctx.settings.shadow.map_size;
            }
            ctx.targets.get_or_create(
                ctx.device,
                TargetPurpose::ShadowMap(caster.light),
                &TargetDesc {
                    width: caster.map_size.max(1),
                    height: caster.map_size.max(1),
                    format: DEPTH_FORMAT,
                    usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                        | wgpu::TextureUsages::TEXTURE_BINDING,
                    label: "Shadow Map",
                },
            );
            matrices.push(caster.view_projection);

            // Collect from the light's own frustum, not the main camera's
            let frustum = Frustum::from_matrix(caster.view_projection);
            let eye = ctx
                .scene
                .lights
                .get(caster.light)
                .map_or(Vec3::ZERO, crate::scene::Light::position);
            let records = visibility::collect_culled(ctx.scene, &frustum, eye);

            let mut draws = Vec::with_capacity(records.len());
            for record in records {
                let Some(material) = ctx.scene.materials.get(record.material) else {
                    continue;
                };
                // Blend-mode geometry is treated as transparent to shadows
                if material.is_blended() {
                    continue;
                }

                ctx.geometries.prepare(ctx.device, ctx.scene, record.geometry);
                ctx.textures
                    .prepare(ctx.device, ctx.queue, ctx.scene, material.albedo_texture);
                ctx.textures.material_bind_group(
                    ctx.device,
                    &ctx.shared.material_layout,
                    ctx.scene,
                    record.material,
                );

                object_uniforms.push(ObjectUniforms {
                    model: record.world_matrix,
                    base_color: material.base_color,
                    factors: glam::Vec4::new(
                        material.metallic_factor,
                        material.roughness_factor,
                        material.effective_alpha_cutoff(),
                        0.0,
                    ),
                    emissive: material.emissive_factor.extend(0.0),
                });
                draws.push(ShadowDraw {
                    object_index: object_uniforms.len() - 1,
                    record,
                });
            }

            self.batches.push(CasterBatch {
                caster: *caster,
                draws,
            });
        }

        self.light_matrices.write(ctx.device, ctx.queue, &matrices);
        self.objects.write(ctx.device, ctx.queue, &object_uniforms);
        ctx.shadow_casters = casters;
    }

    fn run(&self, ctx: &FrameContext<'_>, encoder: &mut wgpu::CommandEncoder) {
        let Some(pipeline) = &self.pipeline else {
            return;
        };

        for (caster_index, batch) in self.batches.iter().enumerate() {
            let Some(depth_view) = ctx
                .targets
                .view(TargetPurpose::ShadowMap(batch.caster.light))
            else {
                continue;
            };

            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Shadow Depth Pass"),
                color_attachments: &[],
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

            pass.set_pipeline(pipeline);
            pass.set_bind_group(
                0,
                self.light_matrices.bind_group(),
                &[self.light_matrices.offset(caster_index)],
            );

            for draw in &batch.draws {
                let Some(material_bg) = ctx.textures.cached_material_bind_group(draw.record.material)
                else {
                    continue;
                };
                pass.set_bind_group(1, self.objects.bind_group(), &[self.objects.offset(draw.object_index)]);
                pass.set_bind_group(2, material_bg, &[]);
                ctx.geometries.draw(&mut pass, draw.record.geometry);
            }
        }
    }
}
