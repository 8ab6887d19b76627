//! The deferred rendering core.
//!
//! [`Renderer::render`] drives one frame through the fixed pass order the
//! data dependencies dictate:
//!
//! ```text
//! visibility collect
//!   -> shadow maps -> G-buffer -> decals -> SSAO
//!   -> light accumulation (G-buffer + shadows + AO + probes)
//!   -> forward blend -> post-process chain -> output view
//! ```
//!
//! All submission is single-threaded and strictly sequential; the only
//! blocking GPU round-trip is [`Renderer::bake_probes`].

pub mod context;
pub mod passes;
pub mod pipeline;
pub mod probes;
pub mod settings;
pub mod sh;
pub mod stores;
pub mod targets;
pub mod uniforms;
pub mod visibility;

use std::sync::Arc;

use glam::{Mat4, Vec4};
use smallvec::SmallVec;

use crate::errors::{Result, VesperError};
use crate::renderer::context::{FrameContext, RenderCamera, RenderNode, SharedResources};
use crate::renderer::passes::{
    DecalPass, ForwardPass, GBufferPass, LightAccumulationPass, PostProcessChain, ShadowPass,
    SsaoPass,
};
use crate::renderer::probes::{ProbeGrid, ProbeVolume};
use crate::renderer::settings::RendererSettings;
use crate::renderer::sh::{project_cube_faces, CubeFace, CUBE_FACE_BASES};
use crate::renderer::stores::{GeometryStore, TextureStore};
use crate::renderer::targets::{TargetCache, TargetDesc, TargetPurpose};
use crate::renderer::uniforms::ObjectUniforms;
use crate::renderer::visibility::DrawRecord;
use crate::scene::{Camera, Scene};

pub const HDR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
pub const GBUFFER_ALBEDO_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
pub const GBUFFER_NORMAL_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
pub const GBUFFER_EXTRA_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
pub const AO_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::R8Unorm;
pub const PROBE_LOOKUP_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;

/// Inline capacity for the per-frame shadow caster list; matches the
/// default caster cap.
pub const MAX_SHADOW_CASTERS: usize = 5;

/// Far plane of the probe bake cameras.
const BAKE_FAR: f32 = 1000.0;

struct Passes {
    shadow: ShadowPass,
    gbuffer: GBufferPass,
    decal: DecalPass,
    ssao: SsaoPass,
    lighting: LightAccumulationPass,
    forward: ForwardPass,
    post: PostProcessChain,
}

/// The renderer: owns the GPU caches, the pass pipeline and the probe
/// volume. The host application owns device, queue and the output surface.
pub struct Renderer {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    size: (u32, u32),
    output_format: wgpu::TextureFormat,

    pub settings: RendererSettings,

    targets: TargetCache,
    geometries: GeometryStore,
    textures: TextureStore,
    shared: SharedResources,
    probes: ProbeVolume,
    passes: Passes,
}

impl Renderer {
    #[must_use]
    pub fn new(
        device: Arc<wgpu::Device>,
        queue: Arc<wgpu::Queue>,
        width: u32,
        height: u32,
        output_format: wgpu::TextureFormat,
    ) -> Self {
        let shared = SharedResources::new(&device);
        let textures = TextureStore::new(&device, &queue);
        let probes = ProbeVolume::new(&device, &queue);
        let passes = Passes {
            shadow: ShadowPass::new(&device),
            gbuffer: GBufferPass::new(&device),
            decal: DecalPass::new(&device),
            ssao: SsaoPass::new(&device),
            lighting: LightAccumulationPass::new(&device),
            forward: ForwardPass::new(&device),
            post: PostProcessChain::new(&device),
        };

        Self {
            device,
            queue,
            size: (width.max(1), height.max(1)),
            output_format,
            settings: RendererSettings::new(),
            targets: TargetCache::new(),
            geometries: GeometryStore::new(),
            textures,
            shared,
            probes,
            passes,
        }
    }

    /// Requests a headless device/queue pair, for tests and offline tools.
    pub fn request_device() -> Result<(Arc<wgpu::Device>, Arc<wgpu::Queue>)> {
        let instance = wgpu::Instance::default();
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|e| VesperError::AdapterRequestFailed(e.to_string()))?;

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: None,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: wgpu::MemoryHints::Performance,
            ..Default::default()
        }))?;
        Ok((Arc::new(device), Arc::new(queue)))
    }

    #[inline]
    #[must_use]
    pub fn device(&self) -> &Arc<wgpu::Device> {
        &self.device
    }

    #[inline]
    #[must_use]
    pub fn queue(&self) -> &Arc<wgpu::Queue> {
        &self.queue
    }

    #[inline]
    #[must_use]
    pub fn probes(&self) -> &ProbeVolume {
        &self.probes
    }

    /// Notifies the renderer of a new output size. Every viewport-sized
    /// target is torn down and reallocated by the next frame's prepare
    /// phase; shadow maps and bake targets survive.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 || (width, height) == self.size {
            return;
        }
        self.size = (width, height);
        self.targets.invalidate_viewport_sized();
    }

    /// Renders one frame of `scene` from `camera` into `output`, which must
    /// match the `output_format` and size the renderer was configured with.
    pub fn render(&mut self, scene: &Scene, camera: &Camera, output: &wgpu::TextureView) {
        let records = visibility::collect(scene, Some(camera));
        let render_camera = RenderCamera::from_camera(camera);

        self.shared
            .write_frame_uniforms(&self.queue, &render_camera, scene.ambient_light, self.size);
        let object_uniforms = build_object_uniforms(&records, scene);
        self.shared
            .objects
            .write(&self.device, &self.queue, &object_uniforms);

        let mut ctx = FrameContext {
            device: &self.device,
            queue: &self.queue,
            scene,
            camera: render_camera,
            settings: &self.settings,
            targets: &mut self.targets,
            geometries: &mut self.geometries,
            textures: &mut self.textures,
            shared: &mut self.shared,
            probes: &self.probes,
            records: &records,
            shadow_casters: SmallVec::new(),
            output,
            size: self.size,
            output_format: self.output_format,
        };

        // Prepare in pass order so downstream passes can bind upstream
        // targets
        self.passes.shadow.prepare(&mut ctx);
        self.passes.gbuffer.prepare(&mut ctx);
        self.passes.decal.prepare(&mut ctx);
        self.passes.ssao.prepare(&mut ctx);
        self.passes.lighting.prepare(&mut ctx);
        self.passes.forward.prepare(&mut ctx);
        self.passes.post.prepare(&mut ctx);

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        // Execution order is the data-dependency order: shadow maps and the
        // G-buffer feed SSAO and light accumulation, which feeds the blend
        // and post passes
        self.passes.shadow.run(&ctx, &mut encoder);
        self.passes.gbuffer.run(&ctx, &mut encoder);
        self.passes.decal.run(&ctx, &mut encoder);
        self.passes.ssao.run(&ctx, &mut encoder);
        self.passes.lighting.run(&ctx, &mut encoder);
        self.passes.forward.run(&ctx, &mut encoder);
        self.passes.post.run(&ctx, &mut encoder);

        self.queue.submit(std::iter::once(encoder.finish()));
    }

    /// Bakes the irradiance probe volume for `scene` over `grid`.
    ///
    /// For every probe: render the 6 canonical cube faces with the forward
    /// pass, read each face back (this stalls the GPU; baking is a startup
    /// or explicit-rebake operation, never per-frame) and project the
    /// images into second-order SH. The baked coefficients feed the light
    /// accumulation pass from the next frame on.
    pub fn bake_probes(&mut self, scene: &Scene, grid: ProbeGrid) -> Result<()> {
        let face_size = self.settings.probes.face_size.max(4);
        log::info!(
            "baking {} probes at {face_size}x{face_size} per face",
            grid.probe_count()
        );

        let color_desc = TargetDesc {
            width: face_size,
            height: face_size,
            format: HDR_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            label: "Probe Face Color",
        };
        let depth_desc = TargetDesc {
            width: face_size,
            height: face_size,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            label: "Probe Face Depth",
        };
        let color = self
            .targets
            .get_or_create(&self.device, TargetPurpose::ProbeFaceColor, &color_desc);
        let (color_texture, color_view) = (color.texture.clone(), color.view.clone());
        let depth = self
            .targets
            .get_or_create(&self.device, TargetPurpose::ProbeFaceDepth, &depth_desc);
        let depth_view = depth.view.clone();

        // Probe baking sees the whole scene; no frustum, no distance sort
        let records = visibility::collect(scene, None);
        for record in &records {
            self.geometries.prepare(&self.device, scene, record.geometry);
            if let Some(material) = scene.materials.get(record.material) {
                for handle in [
                    material.albedo_texture,
                    material.metallic_roughness_texture,
                    material.emissive_texture,
                    material.normal_texture,
                ] {
                    self.textures.prepare(&self.device, &self.queue, scene, handle);
                }
            }
            self.textures.material_bind_group(
                &self.device,
                &self.shared.material_layout,
                scene,
                record.material,
            );
        }

        self.passes.forward.ensure_pipelines(
            &self.device,
            &self.shared.frame_layout,
            self.shared.objects.layout(),
            &self.shared.material_layout,
        );
        self.passes.forward.write_lights(&self.queue, scene);
        self.shared
            .objects
            .write(&self.device, &self.queue, &build_object_uniforms(&records, scene));

        let bg = scene.background_color;
        let clear_color = wgpu::Color {
            r: f64::from(bg.x),
            g: f64::from(bg.y),
            b: f64::from(bg.z),
            a: 1.0,
        };
        let projection = Mat4::perspective_rh(std::f32::consts::FRAC_PI_2, 1.0, 0.1, BAKE_FAR);

        let mut coefficients = Vec::with_capacity(grid.probe_count());
        for (_, position) in grid.iter() {
            let mut faces: Vec<CubeFace> = Vec::with_capacity(6);
            for (forward, _, up) in CUBE_FACE_BASES {
                let view = Mat4::look_at_rh(position, position + forward, up);
                let face_camera =
                    RenderCamera::from_matrix(projection * view, position, 0.1, BAKE_FAR);
                self.shared.write_frame_uniforms(
                    &self.queue,
                    &face_camera,
                    scene.ambient_light,
                    (face_size, face_size),
                );

                let mut encoder =
                    self.device
                        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                            label: Some("Probe Bake Encoder"),
                        });
                self.passes.forward.encode_scene(
                    &mut encoder,
                    &color_view,
                    &depth_view,
                    clear_color,
                    &self.shared.frame_bind_group,
                    &self.shared.objects,
                    &self.geometries,
                    &self.textures,
                    &records,
                    scene,
                );
                self.queue.submit(std::iter::once(encoder.finish()));

                faces.push(probes::read_face_rgba16(
                    &self.device,
                    &self.queue,
                    &color_texture,
                    face_size,
                )?);
            }

            let faces: [CubeFace; 6] = faces.try_into().expect("exactly six cube faces");
            coefficients.push(project_cube_faces(&faces));
        }

        self.probes.install(
            &self.device,
            &self.queue,
            grid,
            coefficients,
            self.settings.probes.trilinear,
        );
        Ok(())
    }
}

/// Per-draw uniforms for a record list; index `i` of the result pairs with
/// `records[i]`.
fn build_object_uniforms(records: &[DrawRecord], scene: &Scene) -> Vec<ObjectUniforms> {
    records
        .iter()
        .map(|record| {
            let material = scene.materials.get(record.material);
            material.map_or_else(
                || ObjectUniforms {
                    model: record.world_matrix,
                    base_color: Vec4::ONE,
                    factors: Vec4::new(0.0, 1.0, 0.0, 0.0),
                    emissive: Vec4::ZERO,
                },
                |material| ObjectUniforms {
                    model: record.world_matrix,
                    base_color: material.base_color,
                    factors: Vec4::new(
                        material.metallic_factor,
                        material.roughness_factor,
                        material.effective_alpha_cutoff(),
                        0.0,
                    ),
                    emissive: material.emissive_factor.extend(0.0),
                },
            )
        })
        .collect()
}
