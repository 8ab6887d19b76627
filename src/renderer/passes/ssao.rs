//! Screen-space ambient occlusion.
//!
//! Two sub-passes: a raw hemisphere-sampling pass over depth + normal, then
//! a separable blur (horizontal, then vertical) to suppress the sampling
//! noise. The final occlusion lands in the `Ao` target, single channel in
//! [0, 1] with 1 = fully lit.

use glam::{Vec3, Vec4};
use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};
use wgpu::util::DeviceExt;

use crate::renderer::context::{FrameContext, RenderNode};
use crate::renderer::pipeline;
use crate::renderer::targets::{TargetDesc, TargetPurpose};
use crate::renderer::AO_FORMAT;

/// Maximum kernel points the shader-side array holds.
pub const MAX_KERNEL_POINTS: usize = 64;

/// Generates the hemisphere sample kernel: spherical coordinates from
/// uniform random numbers, radius scaled by a cube root so samples crowd
/// the surface, flipped into the +Z hemisphere.
///
/// One point is produced per requested sample; every slot of the returned
/// kernel is meaningful.
#[must_use]
pub fn generate_hemisphere_kernel(count: u32, radius: f32) -> Vec<Vec4> {
    let mut rng = StdRng::seed_from_u64(42);
    let count = count.min(MAX_KERNEL_POINTS as u32);
    let mut points = Vec::with_capacity(count as usize);

    for _ in 0..count {
        let u: f32 = rng.random_range(0.0..1.0);
        let v: f32 = rng.random_range(0.0..1.0);
        let theta = u * std::f32::consts::TAU;
        let phi = (2.0 * v - 1.0).acos();
        let r = (rng.random_range(0.0..1.0f32) * 0.9 + 0.1).cbrt() * radius;

        let mut p = Vec3::new(
            r * phi.sin() * theta.cos(),
            r * phi.sin() * theta.sin(),
            r * phi.cos(),
        );
        if p.z < 0.0 {
            p.z = -p.z;
        }
        points.push(p.extend(0.0));
    }
    points
}

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct SsaoUniforms {
    samples: [Vec4; MAX_KERNEL_POINTS],
    // sample count, radius, bias, unused
    params: Vec4,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct BlurUniforms {
    direction: Vec4,
}

pub struct SsaoPass {
    raw_shader: wgpu::ShaderModule,
    blur_shader: wgpu::ShaderModule,

    raw_input_layout: wgpu::BindGroupLayout,
    raw_uniform_layout: wgpu::BindGroupLayout,
    blur_layout: wgpu::BindGroupLayout,

    raw_pipeline: Option<wgpu::RenderPipeline>,
    blur_pipeline: Option<wgpu::RenderPipeline>,

    kernel_buffer: wgpu::Buffer,
    kernel_stamp: (u32, u32, u32),
    blur_h_buffer: wgpu::Buffer,
    blur_v_buffer: wgpu::Buffer,

    raw_input_bind_group: Option<wgpu::BindGroup>,
    raw_uniform_bind_group: wgpu::BindGroup,
    blur_h_bind_group: Option<wgpu::BindGroup>,
    blur_v_bind_group: Option<wgpu::BindGroup>,

    enabled: bool,
}

impl SsaoPass {
    #[must_use]
    pub fn new(device: &wgpu::Device) -> Self {
        let raw_shader = pipeline::create_shader(
            device,
            "SSAO Raw Shader",
            include_str!("../../shaders/ssao.wgsl"),
        );
        let blur_shader = pipeline::create_shader(
            device,
            "SSAO Blur Shader",
            include_str!("../../shaders/blur.wgsl"),
        );

        let raw_input_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("SSAO Input Layout"),
            entries: &[
                pipeline::texture_entry(0, wgpu::TextureSampleType::Depth),
                pipeline::texture_entry(1, wgpu::TextureSampleType::Float { filterable: true }),
            ],
        });
        let raw_uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("SSAO Uniform Layout"),
            entries: &[pipeline::uniform_entry(0, wgpu::ShaderStages::FRAGMENT)],
        });
        let blur_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("SSAO Blur Layout"),
            entries: &[
                pipeline::texture_entry(0, wgpu::TextureSampleType::Float { filterable: true }),
                pipeline::uniform_entry(1, wgpu::ShaderStages::FRAGMENT),
            ],
        });

        let kernel_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("SSAO Kernel"),
            size: std::mem::size_of::<SsaoUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let raw_uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("SSAO Uniform BindGroup"),
            layout: &raw_uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: kernel_buffer.as_entire_binding(),
            }],
        });

        let make_blur_buffer = |direction: Vec4, label| {
            let uniforms = BlurUniforms { direction };
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::bytes_of(&uniforms),
                usage: wgpu::BufferUsages::UNIFORM,
            })
        };
        let blur_h_buffer = make_blur_buffer(Vec4::new(1.0, 0.0, 0.0, 0.0), "SSAO Blur H");
        let blur_v_buffer = make_blur_buffer(Vec4::new(0.0, 1.0, 0.0, 0.0), "SSAO Blur V");

        Self {
            raw_shader,
            blur_shader,
            raw_input_layout,
            raw_uniform_layout,
            blur_layout,
            raw_pipeline: None,
            blur_pipeline: None,
            kernel_buffer,
            kernel_stamp: (0, 0, 0),
            blur_h_buffer,
            blur_v_buffer,
            raw_input_bind_group: None,
            raw_uniform_bind_group,
            blur_h_bind_group: None,
            blur_v_bind_group: None,
            enabled: false,
        }
    }

    fn ensure_pipelines(&mut self, ctx: &FrameContext<'_>) {
        if self.raw_pipeline.is_some() {
            return;
        }
        self.raw_pipeline = Some(pipeline::create_fullscreen_pipeline(
            ctx.device,
            "SSAO Raw Pipeline",
            &self.raw_shader,
            &[
                &ctx.shared.frame_layout,
                &self.raw_input_layout,
                &self.raw_uniform_layout,
            ],
            AO_FORMAT,
            None,
        ));
        self.blur_pipeline = Some(pipeline::create_fullscreen_pipeline(
            ctx.device,
            "SSAO Blur Pipeline",
            &self.blur_shader,
            &[&self.blur_layout],
            AO_FORMAT,
            None,
        ));
    }

    fn write_kernel(&mut self, ctx: &FrameContext<'_>) {
        let settings = &ctx.settings.ssao;
        let stamp = (
            settings.sample_count,
            settings.radius.to_bits(),
            settings.bias.to_bits(),
        );
        if stamp == self.kernel_stamp {
            return;
        }
        self.kernel_stamp = stamp;

        let count = settings.sample_count.min(MAX_KERNEL_POINTS as u32);
        let kernel = generate_hemisphere_kernel(count, settings.radius);
        let mut samples = [Vec4::ZERO; MAX_KERNEL_POINTS];
        samples[..kernel.len()].copy_from_slice(&kernel);

        let uniforms = SsaoUniforms {
            samples,
            params: Vec4::new(count as f32, settings.radius, settings.bias, 0.0),
        };
        ctx.queue
            .write_buffer(&self.kernel_buffer, 0, bytemuck::bytes_of(&uniforms));
    }

    fn blur_bind_group(
        &self,
        device: &wgpu::Device,
        input: &wgpu::TextureView,
        buffer: &wgpu::Buffer,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("SSAO Blur BindGroup"),
            layout: &self.blur_layout,
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

impl RenderNode for SsaoPass {
    fn name(&self) -> &'static str {
        "SSAO Pass"
    }

    fn prepare(&mut self, ctx: &mut FrameContext<'_>) {
        self.enabled = ctx.settings.ssao.enabled;
        if !self.enabled {
            return;
        }

        self.ensure_pipelines(ctx);
        self.write_kernel(ctx);

        let (width, height) = ctx.size;
        let usage = wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING;
        for (purpose, label) in [
            (TargetPurpose::Ao, "SSAO Occlusion"),
            (TargetPurpose::AoBlur, "SSAO Blur Scratch"),
        ] {
            ctx.targets.get_or_create(
                ctx.device,
                purpose,
                &TargetDesc {
                    width,
                    height,
                    format: AO_FORMAT,
                    usage,
                    label,
                },
            );
        }

        let (Some(depth), Some(normal), Some(ao), Some(ao_blur)) = (
            ctx.targets.view(TargetPurpose::GBufferDepth),
            ctx.targets.view(TargetPurpose::GBufferNormal),
            ctx.targets.view(TargetPurpose::Ao),
            ctx.targets.view(TargetPurpose::AoBlur),
        ) else {
            self.enabled = false;
            return;
        };

        self.raw_input_bind_group = Some(ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("SSAO Input BindGroup"),
            layout: &self.raw_input_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(depth),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(normal),
                },
            ],
        }));

        self.blur_h_bind_group = Some(self.blur_bind_group(ctx.device, ao, &self.blur_h_buffer));
        self.blur_v_bind_group =
            Some(self.blur_bind_group(ctx.device, ao_blur, &self.blur_v_buffer));
    }

    fn run(&self, ctx: &FrameContext<'_>, encoder: &mut wgpu::CommandEncoder) {
        if !self.enabled {
            return;
        }
        let (Some(raw_pipeline), Some(blur_pipeline)) = (&self.raw_pipeline, &self.blur_pipeline)
        else {
            return;
        };
        let (Some(raw_input_bg), Some(blur_h_bg), Some(blur_v_bg)) = (
            &self.raw_input_bind_group,
            &self.blur_h_bind_group,
            &self.blur_v_bind_group,
        ) else {
            return;
        };

        let (Some(ao), Some(ao_blur)) = (
            ctx.targets.view(TargetPurpose::Ao),
            ctx.targets.view(TargetPurpose::AoBlur),
        ) else {
            return;
        };

        let color_attachment = |view| {
            Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::WHITE),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })
        };

        // Raw occlusion into Ao
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("SSAO Raw Pass"),
                color_attachments: &[color_attachment(ao)],
                ..Default::default()
            });
            pass.set_pipeline(raw_pipeline);
            pass.set_bind_group(0, &ctx.shared.frame_bind_group, &[]);
            pass.set_bind_group(1, raw_input_bg, &[]);
            pass.set_bind_group(2, &self.raw_uniform_bind_group, &[]);
            pass.draw(0..3, 0..1);
        }

        // Horizontal blur into the scratch target
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("SSAO Blur H Pass"),
                color_attachments: &[color_attachment(ao_blur)],
                ..Default::default()
            });
            pass.set_pipeline(blur_pipeline);
            pass.set_bind_group(0, blur_h_bg, &[]);
            pass.draw(0..3, 0..1);
        }

        // Vertical blur back into Ao, which the lighting pass samples
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("SSAO Blur V Pass"),
                color_attachments: &[color_attachment(ao)],
                ..Default::default()
            });
            pass.set_pipeline(blur_pipeline);
            pass.set_bind_group(0, blur_v_bg, &[]);
            pass.draw(0..3, 0..1);
        }
    }
}
