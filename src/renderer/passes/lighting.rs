//! Deferred light accumulation.
//!
//! One fullscreen draw per light into the HDR target with additive
//! blending (`src*1 + dst*1`), which keeps lighting commutative across
//! light order. The first draw also injects the ambient, emissive and
//! probe-irradiance terms; later draws add direct lighting only, so the
//! ambient term is counted exactly once no matter how many lights the
//! scene has. With zero lights a single ambient-only draw still runs.
//!
//! The free functions at the bottom are the CPU reference for the shader
//! math (attenuation, spot falloff, shadow comparison, full accumulation);
//! the property tests run against them.

use glam::{Mat4, Vec3, Vec4};

use crate::renderer::context::{FrameContext, RenderNode};
use crate::renderer::pipeline;
use crate::renderer::stores::DynamicUniformBuffer;
use crate::renderer::targets::{TargetDesc, TargetPurpose};
use crate::renderer::{DEPTH_FORMAT, HDR_FORMAT};
use crate::scene::{Light, LightKind};

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct LightUniforms {
    shadow_matrix: Mat4,
    /// xyz position, w kind (0 point, 1 spot, 2 directional).
    position: Vec4,
    /// xyz direction, w range.
    direction: Vec4,
    /// rgb premultiplied by intensity, w spot cosine cutoff.
    color: Vec4,
    /// x spot exponent, y shadow bias, z has shadow, w is first light.
    params: Vec4,
}

impl LightUniforms {
    fn ambient_only() -> Self {
        Self {
            shadow_matrix: Mat4::IDENTITY,
            position: Vec4::new(0.0, 0.0, 0.0, 2.0),
            direction: Vec4::new(0.0, -1.0, 0.0, 0.0),
            color: Vec4::ZERO,
            params: Vec4::new(0.0, 0.0, 0.0, 1.0),
        }
    }

    fn from_light(light: &Light, first: bool, shadow: Option<(&Mat4, f32)>) -> Self {
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

        let (shadow_matrix, bias, has_shadow) = match shadow {
            Some((matrix, bias)) => (*matrix, bias, 1.0),
            None => (Mat4::IDENTITY, 0.0, 0.0),
        };

        Self {
            shadow_matrix,
            position: light.position().extend(kind),
            direction: light.direction().extend(range),
            color: (light.color * light.intensity).extend(cos_cutoff),
            params: Vec4::new(exponent, bias, has_shadow, f32::from(u8::from(first))),
        }
    }
}

pub struct LightAccumulationPass {
    shader: wgpu::ShaderModule,
    pipeline: Option<wgpu::RenderPipeline>,

    gbuffer_layout: wgpu::BindGroupLayout,
    shadow_layout: wgpu::BindGroupLayout,
    lights: DynamicUniformBuffer<LightUniforms>,

    dummy_shadow_view: wgpu::TextureView,

    gbuffer_bind_group: Option<wgpu::BindGroup>,
    shadow_bind_groups: Vec<wgpu::BindGroup>,
    light_count: usize,
}

impl LightAccumulationPass {
    #[must_use]
    pub fn new(device: &wgpu::Device) -> Self {
        let shader = pipeline::create_shader(
            device,
            "Lighting Shader",
            include_str!("../../shaders/lighting.wgsl"),
        );

        let gbuffer_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Lighting GBuffer Layout"),
            entries: &[
                pipeline::texture_entry(0, wgpu::TextureSampleType::Float { filterable: true }),
                pipeline::texture_entry(1, wgpu::TextureSampleType::Float { filterable: true }),
                pipeline::texture_entry(2, wgpu::TextureSampleType::Float { filterable: true }),
                pipeline::texture_entry(3, wgpu::TextureSampleType::Depth),
                pipeline::texture_entry(4, wgpu::TextureSampleType::Float { filterable: true }),
                pipeline::texture_entry(5, wgpu::TextureSampleType::Float { filterable: false }),
                pipeline::uniform_entry(6, wgpu::ShaderStages::FRAGMENT),
            ],
        });

        let shadow_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Lighting Shadow Layout"),
            entries: &[
                pipeline::texture_entry(0, wgpu::TextureSampleType::Depth),
                pipeline::sampler_entry(1, wgpu::SamplerBindingType::NonFiltering),
            ],
        });

        let lights =
            DynamicUniformBuffer::new(device, "Light Uniforms", wgpu::ShaderStages::FRAGMENT);

        // Bound for lights without a shadow map; never sampled because the
        // shader checks the has-shadow flag first
        let dummy_shadow = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Dummy Shadow Map"),
            size: wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let dummy_shadow_view = dummy_shadow.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            shader,
            pipeline: None,
            gbuffer_layout,
            shadow_layout,
            lights,
            dummy_shadow_view,
            gbuffer_bind_group: None,
            shadow_bind_groups: Vec::new(),
            light_count: 0,
        }
    }

    fn ensure_pipeline(&mut self, ctx: &FrameContext<'_>) {
        if self.pipeline.is_some() {
            return;
        }
        // Additive blending makes the per-light accumulation
        // order-independent
        let additive = wgpu::BlendState {
            color: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::One,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            },
            alpha: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::One,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            },
        };
        self.pipeline = Some(pipeline::create_fullscreen_pipeline(
            ctx.device,
            "Lighting Pipeline",
            &self.shader,
            &[
                &ctx.shared.frame_layout,
                &self.gbuffer_layout,
                self.lights.layout(),
                &self.shadow_layout,
            ],
            HDR_FORMAT,
            Some(additive),
        ));
    }
}

impl RenderNode for LightAccumulationPass {
    fn name(&self) -> &'static str {
        "Light Accumulation Pass"
    }

    fn prepare(&mut self, ctx: &mut FrameContext<'_>) {
        self.ensure_pipeline(ctx);

        let (width, height) = ctx.size;
        ctx.targets.get_or_create(
            ctx.device,
            TargetPurpose::Hdr,
            &TargetDesc {
                width,
                height,
                format: HDR_FORMAT,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                    | wgpu::TextureUsages::TEXTURE_BINDING,
                label: "HDR Accumulation",
            },
        );

        // Per-light uniforms; a scene without lights still gets the
        // ambient-only draw
        let mut uniforms = Vec::new();
        self.shadow_bind_groups.clear();
        for (handle, light) in ctx.scene.active_lights() {
            let shadow = ctx
                .shadow_casters
                .iter()
                .find(|caster| caster.light == handle)
                .map(|caster| (caster.view_projection, caster.bias));
            uniforms.push(LightUniforms::from_light(
                light,
                uniforms.is_empty(),
                shadow.as_ref().map(|(m, b)| (m, *b)),
            ));

            let shadow_view = shadow
                .and_then(|_| ctx.targets.view(TargetPurpose::ShadowMap(handle)))
                .unwrap_or(&self.dummy_shadow_view);
            self.shadow_bind_groups
                .push(ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("Lighting Shadow BindGroup"),
                    layout: &self.shadow_layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: wgpu::BindingResource::TextureView(shadow_view),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::Sampler(
                                &ctx.textures.nearest_sampler,
                            ),
                        },
                    ],
                }));
        }
        if uniforms.is_empty() {
            uniforms.push(LightUniforms::ambient_only());
            self.shadow_bind_groups
                .push(ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("Lighting Shadow BindGroup"),
                    layout: &self.shadow_layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: wgpu::BindingResource::TextureView(&self.dummy_shadow_view),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::Sampler(
                                &ctx.textures.nearest_sampler,
                            ),
                        },
                    ],
                }));
        }
        self.light_count = uniforms.len();
        self.lights.write(ctx.device, ctx.queue, &uniforms);

        // G-buffer inputs; SSAO falls back to white (fully lit) when off
        let ao_view = if ctx.settings.ssao.enabled {
            ctx.targets
                .view(TargetPurpose::Ao)
                .unwrap_or_else(|| ctx.textures.white_view())
        } else {
            ctx.textures.white_view()
        };

        let (Some(albedo), Some(normal), Some(extra), Some(depth)) = (
            ctx.targets.view(TargetPurpose::GBufferAlbedo),
            ctx.targets.view(TargetPurpose::GBufferNormal),
            ctx.targets.view(TargetPurpose::GBufferExtra),
            ctx.targets.view(TargetPurpose::GBufferDepth),
        ) else {
            self.light_count = 0;
            return;
        };

        self.gbuffer_bind_group = Some(ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Lighting GBuffer BindGroup"),
            layout: &self.gbuffer_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(albedo),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(normal),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(extra),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(depth),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::TextureView(ao_view),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: wgpu::BindingResource::TextureView(ctx.probes.lookup_view()),
                },
                wgpu::BindGroupEntry {
                    binding: 6,
                    resource: ctx.probes.uniform_buffer().as_entire_binding(),
                },
            ],
        }));
    }

    fn run(&self, ctx: &FrameContext<'_>, encoder: &mut wgpu::CommandEncoder) {
        if self.light_count == 0 {
            return;
        }
        let (Some(pipeline), Some(gbuffer_bg), Some(hdr)) = (
            &self.pipeline,
            &self.gbuffer_bind_group,
            ctx.targets.view(TargetPurpose::Hdr),
        ) else {
            return;
        };

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Light Accumulation Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: hdr,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            ..Default::default()
        });

        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &ctx.shared.frame_bind_group, &[]);
        pass.set_bind_group(1, gbuffer_bg, &[]);

        for i in 0..self.light_count {
            pass.set_bind_group(2, self.lights.bind_group(), &[self.lights.offset(i)]);
            pass.set_bind_group(3, &self.shadow_bind_groups[i], &[]);
            pass.draw(0..3, 0..1);
        }
    }
}

// ─── CPU reference for the shader math ───────────────────────────────────────

/// Surface attributes reconstructed from the G-buffer at one pixel.
#[derive(Debug, Clone, Copy)]
pub struct SurfaceSample {
    pub position: Vec3,
    pub normal: Vec3,
    pub albedo: Vec3,
    pub metallic: f32,
    pub roughness: f32,
    pub emissive: Vec3,
    /// Ambient occlusion in [0, 1], 1 = fully lit.
    pub occlusion: f32,
}

/// Squared linear falloff clamped at the light range.
#[must_use]
pub fn distance_attenuation(distance: f32, range: f32) -> f32 {
    let f = (1.0 - distance / range.max(1e-4)).clamp(0.0, 1.0);
    f * f
}

/// Spot cone factor: zero outside the cutoff cone, cosine falloff raised to
/// the spot exponent inside it.
#[must_use]
pub fn spot_falloff(cos_angle: f32, cos_cutoff: f32, exponent: f32) -> f32 {
    if cos_angle <= cos_cutoff {
        return 0.0;
    }
    let falloff = ((cos_angle - cos_cutoff) / (1.0 - cos_cutoff).max(1e-4)).clamp(0.0, 1.0);
    falloff.powf(exponent)
}

/// Shadow map comparison: a fragment strictly deeper than the stored depth
/// plus bias is occluded (0), anything else fully lit (1).
#[must_use]
pub fn shadow_visibility(stored_depth: f32, fragment_depth: f32, bias: f32) -> f32 {
    if fragment_depth - bias > stored_depth {
        0.0
    } else {
        1.0
    }
}

/// Direct contribution of one light to a surface sample, before shadowing.
#[must_use]
pub fn shade_direct(light: &Light, surface: &SurfaceSample, camera_position: Vec3) -> Vec3 {
    let (l, attenuation) = match light.kind {
        LightKind::Directional { .. } => (-light.direction().normalize_or_zero(), 1.0),
        LightKind::Point { range } => {
            let to_light = light.position() - surface.position;
            let distance = to_light.length();
            (
                to_light / distance.max(1e-4),
                distance_attenuation(distance, range),
            )
        }
        LightKind::Spot {
            range,
            cone_angle,
            exponent,
        } => {
            let to_light = light.position() - surface.position;
            let distance = to_light.length();
            let l = to_light / distance.max(1e-4);
            let cos_angle = (-l).dot(light.direction().normalize_or_zero());
            (
                l,
                distance_attenuation(distance, range)
                    * spot_falloff(cos_angle, cone_angle.cos(), exponent),
            )
        }
    };

    let n_dot_l = surface.normal.dot(l).max(0.0);
    let v = (camera_position - surface.position).normalize_or_zero();
    let h = (l + v).normalize_or_zero();
    let spec_power = (10.0 * (1.0 - surface.roughness) + 1.0).exp2();
    let f0 = 0.04 + surface.metallic * 0.96;
    let specular = surface.normal.dot(h).max(0.0).powf(spec_power) * f0;
    let diffuse = surface.albedo * (1.0 - surface.metallic);

    (diffuse + Vec3::splat(specular)) * n_dot_l * light.color * light.intensity * attenuation
}

/// Full accumulation over a set of lights, mirroring what the additive
/// per-light draws converge to: the ambient, emissive and (externally
/// supplied) indirect terms are added exactly once, every light adds its
/// direct term.
#[must_use]
pub fn accumulate_lights(
    lights: &[&Light],
    ambient: Vec3,
    indirect: Vec3,
    surface: &SurfaceSample,
    camera_position: Vec3,
) -> Vec3 {
    let mut color = ambient * surface.albedo * surface.occlusion
        + indirect * surface.albedo * surface.occlusion
        + surface.emissive;
    for light in lights {
        color += shade_direct(light, surface, camera_position);
    }
    color
}
