//! Post-processing chain.
//!
//! Sequential fullscreen passes over the HDR accumulation result,
//! ping-ponging between scratch targets:
//!
//! anti-alias -> bright pass -> separable blur -> bloom composite ->
//! depth of field -> Reinhard tonemap -> caller's output view.
//!
//! Each stage is optional except the tonemap, which always runs (it owns
//! the conversion into the output surface format; with tonemapping
//! disabled it degenerates to a copy).
//!
//! [`reinhard_luminance`] and [`bright_pass_keeps`] are the CPU reference
//! for the shader operators and are exercised by the tests.

use glam::Vec4;

use crate::renderer::context::{FrameContext, RenderNode};
use crate::renderer::pipeline;
use crate::renderer::targets::{TargetDesc, TargetPurpose};
use crate::renderer::HDR_FORMAT;

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct ParamsUniform {
    params: Vec4,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PostKind {
    Fxaa,
    Bright,
    Blur,
    Composite,
    Dof,
    Tonemap,
}

#[derive(Debug, Clone, Copy)]
enum PostTarget {
    Purpose(TargetPurpose),
    Output,
}

struct PostStep {
    kind: PostKind,
    bind_group: wgpu::BindGroup,
    target: PostTarget,
    label: &'static str,
}

pub struct PostProcessChain {
    fxaa_pipeline: wgpu::RenderPipeline,
    bright_pipeline: wgpu::RenderPipeline,
    blur_pipeline: wgpu::RenderPipeline,
    composite_pipeline: wgpu::RenderPipeline,
    dof_pipeline: wgpu::RenderPipeline,
    tonemap_pipeline: Option<wgpu::RenderPipeline>,
    tonemap_shader: wgpu::ShaderModule,
    tonemap_format: Option<wgpu::TextureFormat>,

    fxaa_layout: wgpu::BindGroupLayout,
    tex_uniform_layout: wgpu::BindGroupLayout,
    composite_layout: wgpu::BindGroupLayout,
    dof_layout: wgpu::BindGroupLayout,

    fxaa_buffer: wgpu::Buffer,
    bright_buffer: wgpu::Buffer,
    blur_h_buffer: wgpu::Buffer,
    blur_v_buffer: wgpu::Buffer,
    composite_buffer: wgpu::Buffer,
    dof_buffer: wgpu::Buffer,
    tonemap_buffer: wgpu::Buffer,

    steps: Vec<PostStep>,
}

impl PostProcessChain {
    #[must_use]
    pub fn new(device: &wgpu::Device) -> Self {
        let fxaa_shader =
            pipeline::create_shader(device, "FXAA Shader", include_str!("../../shaders/fxaa.wgsl"));
        let bright_shader = pipeline::create_shader(
            device,
            "Bright Pass Shader",
            include_str!("../../shaders/bright_pass.wgsl"),
        );
        let blur_shader =
            pipeline::create_shader(device, "Blur Shader", include_str!("../../shaders/blur.wgsl"));
        let composite_shader = pipeline::create_shader(
            device,
            "Bloom Composite Shader",
            include_str!("../../shaders/bloom_composite.wgsl"),
        );
        let dof_shader =
            pipeline::create_shader(device, "DoF Shader", include_str!("../../shaders/dof.wgsl"));
        let tonemap_shader = pipeline::create_shader(
            device,
            "Tonemap Shader",
            include_str!("../../shaders/tonemap.wgsl"),
        );

        let fxaa_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("FXAA Layout"),
            entries: &[
                pipeline::texture_entry(0, wgpu::TextureSampleType::Float { filterable: true }),
                pipeline::sampler_entry(1, wgpu::SamplerBindingType::Filtering),
                pipeline::uniform_entry(2, wgpu::ShaderStages::FRAGMENT),
            ],
        });
        let tex_uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Post Texture+Uniform Layout"),
            entries: &[
                pipeline::texture_entry(0, wgpu::TextureSampleType::Float { filterable: true }),
                pipeline::uniform_entry(1, wgpu::ShaderStages::FRAGMENT),
            ],
        });
        let composite_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Bloom Composite Layout"),
            entries: &[
                pipeline::texture_entry(0, wgpu::TextureSampleType::Float { filterable: true }),
                pipeline::texture_entry(1, wgpu::TextureSampleType::Float { filterable: true }),
                pipeline::uniform_entry(2, wgpu::ShaderStages::FRAGMENT),
            ],
        });
        let dof_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("DoF Layout"),
            entries: &[
                pipeline::texture_entry(0, wgpu::TextureSampleType::Float { filterable: true }),
                pipeline::texture_entry(1, wgpu::TextureSampleType::Float { filterable: true }),
                pipeline::texture_entry(2, wgpu::TextureSampleType::Depth),
                pipeline::uniform_entry(3, wgpu::ShaderStages::FRAGMENT),
            ],
        });

        let fxaa_pipeline = pipeline::create_fullscreen_pipeline(
            device,
            "FXAA Pipeline",
            &fxaa_shader,
            &[&fxaa_layout],
            HDR_FORMAT,
            None,
        );
        let bright_pipeline = pipeline::create_fullscreen_pipeline(
            device,
            "Bright Pass Pipeline",
            &bright_shader,
            &[&tex_uniform_layout],
            HDR_FORMAT,
            None,
        );
        let blur_pipeline = pipeline::create_fullscreen_pipeline(
            device,
            "Post Blur Pipeline",
            &blur_shader,
            &[&tex_uniform_layout],
            HDR_FORMAT,
            None,
        );
        let composite_pipeline = pipeline::create_fullscreen_pipeline(
            device,
            "Bloom Composite Pipeline",
            &composite_shader,
            &[&composite_layout],
            HDR_FORMAT,
            None,
        );
        let dof_pipeline = pipeline::create_fullscreen_pipeline(
            device,
            "DoF Pipeline",
            &dof_shader,
            &[&dof_layout],
            HDR_FORMAT,
            None,
        );

        let make_buffer = |label: &'static str| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size: std::mem::size_of::<ParamsUniform>() as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        };

        Self {
            fxaa_pipeline,
            bright_pipeline,
            blur_pipeline,
            composite_pipeline,
            dof_pipeline,
            tonemap_pipeline: None,
            tonemap_shader,
            tonemap_format: None,
            fxaa_layout,
            tex_uniform_layout,
            composite_layout,
            dof_layout,
            fxaa_buffer: make_buffer("FXAA Uniforms"),
            bright_buffer: make_buffer("Bright Pass Uniforms"),
            blur_h_buffer: make_buffer("Post Blur H Uniforms"),
            blur_v_buffer: make_buffer("Post Blur V Uniforms"),
            composite_buffer: make_buffer("Bloom Composite Uniforms"),
            dof_buffer: make_buffer("DoF Uniforms"),
            tonemap_buffer: make_buffer("Tonemap Uniforms"),
            steps: Vec::new(),
        }
    }

    fn write_uniforms(&self, ctx: &FrameContext<'_>) {
        let write = |buffer, params| {
            ctx.queue
                .write_buffer(buffer, 0, bytemuck::bytes_of(&ParamsUniform { params }));
        };
        let (w, h) = ctx.size;
        write(
            &self.fxaa_buffer,
            Vec4::new(1.0 / w.max(1) as f32, 1.0 / h.max(1) as f32, 0.0, 0.0),
        );
        write(
            &self.bright_buffer,
            Vec4::new(ctx.settings.bloom.threshold, 0.0, 0.0, 0.0),
        );
        write(&self.blur_h_buffer, Vec4::new(1.0, 0.0, 0.0, 0.0));
        write(&self.blur_v_buffer, Vec4::new(0.0, 1.0, 0.0, 0.0));
        write(
            &self.composite_buffer,
            Vec4::new(ctx.settings.bloom.intensity, 0.0, 0.0, 0.0),
        );
        write(
            &self.dof_buffer,
            Vec4::new(
                ctx.settings.dof.focus_distance,
                ctx.settings.dof.focus_range,
                ctx.camera.near,
                ctx.camera.far,
            ),
        );
        let tonemap = &ctx.settings.tonemap;
        write(
            &self.tonemap_buffer,
            Vec4::new(
                tonemap.average_luminance.max(1e-4),
                (tonemap.white_luminance * tonemap.white_luminance).max(1e-4),
                tonemap.scale,
                f32::from(u8::from(tonemap.enabled)),
            ),
        );
    }

    fn tex_uniform_bind_group(
        &self,
        device: &wgpu::Device,
        input: &wgpu::TextureView,
        buffer: &wgpu::Buffer,
        label: &'static str,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &self.tex_uniform_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(input),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: buffer.as_entire_binding(),
                },
            ],
        })
    }
}

impl RenderNode for PostProcessChain {
    fn name(&self) -> &'static str {
        "Post Process Chain"
    }

    fn prepare(&mut self, ctx: &mut FrameContext<'_>) {
        self.write_uniforms(ctx);

        // The tonemap writes the caller's surface; rebuild if its format
        // changed
        if self.tonemap_format != Some(ctx.output_format) {
            self.tonemap_pipeline = Some(pipeline::create_fullscreen_pipeline(
                ctx.device,
                "Tonemap Pipeline",
                &self.tonemap_shader,
                &[&self.tex_uniform_layout],
                ctx.output_format,
                None,
            ));
            self.tonemap_format = Some(ctx.output_format);
        }

        let (width, height) = ctx.size;
        let usage = wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING;
        for (purpose, label) in [
            (TargetPurpose::PostPing, "Post Ping"),
            (TargetPurpose::PostPong, "Post Pong"),
            (TargetPurpose::Bright, "Bloom Bright"),
            (TargetPurpose::BlurScratch, "Post Blur Scratch"),
            (TargetPurpose::DofBlur, "DoF Blur"),
        ] {
            ctx.targets.get_or_create(
                ctx.device,
                purpose,
                &TargetDesc {
                    width,
                    height,
                    format: HDR_FORMAT,
                    usage,
                    label,
                },
            );
        }

        self.steps.clear();
        let view = |purpose| ctx.targets.view(purpose);
        let Some(hdr) = view(TargetPurpose::Hdr) else {
            return;
        };

        let mut current = TargetPurpose::Hdr;

        if ctx.settings.fxaa_enabled {
            let Some(input) = view(current) else { return };
            self.steps.push(PostStep {
                kind: PostKind::Fxaa,
                bind_group: ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("FXAA BindGroup"),
                    layout: &self.fxaa_layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: wgpu::BindingResource::TextureView(input),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::Sampler(&ctx.textures.linear_sampler),
                        },
                        wgpu::BindGroupEntry {
                            binding: 2,
                            resource: self.fxaa_buffer.as_entire_binding(),
                        },
                    ],
                }),
                target: PostTarget::Purpose(TargetPurpose::PostPing),
                label: "FXAA Pass",
            });
            current = TargetPurpose::PostPing;
        }

        if ctx.settings.bloom.enabled {
            let (Some(input), Some(bright), Some(scratch)) = (
                view(current),
                view(TargetPurpose::Bright),
                view(TargetPurpose::BlurScratch),
            ) else {
                return;
            };
            self.steps.push(PostStep {
                kind: PostKind::Bright,
                bind_group: self.tex_uniform_bind_group(
                    ctx.device,
                    input,
                    &self.bright_buffer,
                    "Bright Pass BindGroup",
                ),
                target: PostTarget::Purpose(TargetPurpose::Bright),
                label: "Bright Pass",
            });
            self.steps.push(PostStep {
                kind: PostKind::Blur,
                bind_group: self.tex_uniform_bind_group(
                    ctx.device,
                    bright,
                    &self.blur_h_buffer,
                    "Bloom Blur H BindGroup",
                ),
                target: PostTarget::Purpose(TargetPurpose::BlurScratch),
                label: "Bloom Blur H Pass",
            });
            self.steps.push(PostStep {
                kind: PostKind::Blur,
                bind_group: self.tex_uniform_bind_group(
                    ctx.device,
                    scratch,
                    &self.blur_v_buffer,
                    "Bloom Blur V BindGroup",
                ),
                target: PostTarget::Purpose(TargetPurpose::Bright),
                label: "Bloom Blur V Pass",
            });
            self.steps.push(PostStep {
                kind: PostKind::Composite,
                bind_group: ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("Bloom Composite BindGroup"),
                    layout: &self.composite_layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: wgpu::BindingResource::TextureView(input),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::TextureView(bright),
                        },
                        wgpu::BindGroupEntry {
                            binding: 2,
                            resource: self.composite_buffer.as_entire_binding(),
                        },
                    ],
                }),
                target: PostTarget::Purpose(TargetPurpose::PostPong),
                label: "Bloom Composite Pass",
            });
            current = TargetPurpose::PostPong;
        }

        if ctx.settings.dof.enabled {
            let next = if current == TargetPurpose::PostPing {
                TargetPurpose::PostPong
            } else {
                TargetPurpose::PostPing
            };
            let (Some(input), Some(scratch), Some(dof_blur), Some(depth)) = (
                view(current),
                view(TargetPurpose::BlurScratch),
                view(TargetPurpose::DofBlur),
                view(TargetPurpose::GBufferDepth),
            ) else {
                return;
            };
            self.steps.push(PostStep {
                kind: PostKind::Blur,
                bind_group: self.tex_uniform_bind_group(
                    ctx.device,
                    input,
                    &self.blur_h_buffer,
                    "DoF Blur H BindGroup",
                ),
                target: PostTarget::Purpose(TargetPurpose::BlurScratch),
                label: "DoF Blur H Pass",
            });
            self.steps.push(PostStep {
                kind: PostKind::Blur,
                bind_group: self.tex_uniform_bind_group(
                    ctx.device,
                    scratch,
                    &self.blur_v_buffer,
                    "DoF Blur V BindGroup",
                ),
                target: PostTarget::Purpose(TargetPurpose::DofBlur),
                label: "DoF Blur V Pass",
            });
            self.steps.push(PostStep {
                kind: PostKind::Dof,
                bind_group: ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("DoF BindGroup"),
                    layout: &self.dof_layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: wgpu::BindingResource::TextureView(input),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::TextureView(dof_blur),
                        },
                        wgpu::BindGroupEntry {
                            binding: 2,
                            resource: wgpu::BindingResource::TextureView(depth),
                        },
                        wgpu::BindGroupEntry {
                            binding: 3,
                            resource: self.dof_buffer.as_entire_binding(),
                        },
                    ],
                }),
                target: PostTarget::Purpose(next),
                label: "DoF Pass",
            });
            current = next;
        }

        let input = view(current).unwrap_or(hdr);
        self.steps.push(PostStep {
            kind: PostKind::Tonemap,
            bind_group: self.tex_uniform_bind_group(
                ctx.device,
                input,
                &self.tonemap_buffer,
                "Tonemap BindGroup",
            ),
            target: PostTarget::Output,
            label: "Tonemap Pass",
        });
    }

    fn run(&self, ctx: &FrameContext<'_>, encoder: &mut wgpu::CommandEncoder) {
        for step in &self.steps {
            let view = match step.target {
                PostTarget::Purpose(purpose) => match ctx.targets.view(purpose) {
                    Some(view) => view,
                    None => continue,
                },
                PostTarget::Output => ctx.output,
            };

            let pipeline = match step.kind {
                PostKind::Fxaa => &self.fxaa_pipeline,
                PostKind::Bright => &self.bright_pipeline,
                PostKind::Blur => &self.blur_pipeline,
                PostKind::Composite => &self.composite_pipeline,
                PostKind::Dof => &self.dof_pipeline,
                PostKind::Tonemap => match &self.tonemap_pipeline {
                    Some(pipeline) => pipeline,
                    None => continue,
                },
            };

            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(step.label),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
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
            pass.set_bind_group(0, &step.bind_group, &[]);
            pass.draw(0..3, 0..1);
        }
    }
}

// ─── CPU reference for the shader operators ──────────────────────────────────

/// Reinhard display luminance for an input luminance `lum`:
/// `L = scale / average * lum`, `Ld = L * (1 + L / white2) / (1 + L)`.
#[must_use]
pub fn reinhard_luminance(lum: f32, average_luminance: f32, white_luminance_sq: f32, scale: f32) -> f32 {
    let scaled = scale / average_luminance.max(1e-4) * lum;
    scaled * (1.0 + scaled / white_luminance_sq.max(1e-4)) / (1.0 + scaled)
}

/// Rec. 709 luminance.
#[must_use]
pub fn luminance(rgb: glam::Vec3) -> f32 {
    rgb.dot(glam::Vec3::new(0.2126, 0.7152, 0.0722))
}

/// Whether the bright pass keeps a texel of the given color.
#[must_use]
pub fn bright_pass_keeps(rgb: glam::Vec3, threshold: f32) -> bool {
    luminance(rgb) > threshold
}
