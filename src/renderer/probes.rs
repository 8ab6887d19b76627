//! Irradiance probe volume.
//!
//! A regular 3D grid of probes, each storing incoming radiance as 9 RGB
//! spherical-harmonic coefficients. Baking renders 6 cube faces per probe
//! through the forward pass, blocks on GPU readback and projects the images
//! into SH (see [`crate::renderer::sh`]); the renderer drives that loop.
//! The baked coefficients are packed into a `9 x probe_count` Rgba32Float
//! lookup texture, one column per coefficient, one row per probe, sampled
//! with `textureLoad` so no filtering ever bleeds across coefficient
//! columns. Spatial interpolation happens in the shader (and in
//! [`ProbeVolume::sample_irradiance`], its CPU mirror).

use glam::{UVec3, Vec3, Vec4};

use crate::errors::{Result, VesperError};
use crate::renderer::sh::{CubeFace, Sh9Color, SH_COEFF_COUNT};
use crate::renderer::PROBE_LOOKUP_FORMAT;

/// A regular probe grid: positions are `start + delta * (i, j, k)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeGrid {
    pub start: Vec3,
    pub delta: Vec3,
    pub dims: UVec3,
}

impl ProbeGrid {
    /// Grid spanning `min..=max` with `dims` probes per axis.
    pub fn from_bounds(min: Vec3, max: Vec3, dims: UVec3) -> Result<Self> {
        if dims.x == 0 || dims.y == 0 || dims.z == 0 {
            return Err(VesperError::InvalidProbeGrid(format!(
                "dimensions must be non-zero, got {dims}"
            )));
        }
        let span = max - min;
        let divisor = (dims - UVec3::ONE).max(UVec3::ONE).as_vec3();
        Ok(Self {
            start: min,
            delta: span / divisor,
            dims,
        })
    }

    #[inline]
    #[must_use]
    pub fn probe_count(&self) -> usize {
        (self.dims.x * self.dims.y * self.dims.z) as usize
    }

    /// World position of probe `(i, j, k)`.
    #[inline]
    #[must_use]
    pub fn position(&self, index: UVec3) -> Vec3 {
        self.start + self.delta * index.as_vec3()
    }

    /// Linear index of probe `(i, j, k)`: `i + j*dimX + k*dimX*dimY`.
    ///
    /// The same ordering fills the lookup texture rows, which is what keeps
    /// texture lookups and grid arithmetic in agreement.
    #[inline]
    #[must_use]
    pub fn linear_index(&self, index: UVec3) -> usize {
        (index.x + index.y * self.dims.x + index.z * self.dims.x * self.dims.y) as usize
    }

    /// Iterates probes in linear-index order (x fastest).
    pub fn iter(&self) -> impl Iterator<Item = (UVec3, Vec3)> + '_ {
        let dims = self.dims;
        (0..dims.z).flat_map(move |k| {
            (0..dims.y).flat_map(move |j| {
                (0..dims.x).map(move |i| {
                    let index = UVec3::new(i, j, k);
                    (index, self.position(index))
                })
            })
        })
    }
}

/// GPU uniform describing the probe grid to the lighting shader.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, bytemuck::Pod, bytemuck::Zeroable)]
struct ProbeUniforms {
    /// Grid origin; w = volume enabled.
    start: Vec4,
    /// Probe spacing; w = trilinear blend enabled.
    delta: Vec4,
    /// Grid dimensions; w = probe count.
    dims: [u32; 4],
}

/// The baked volume plus its GPU-side lookup resources.
///
/// Before the first bake the volume holds a placeholder texture and a
/// disabled uniform, so the lighting pass can bind it unconditionally.
pub struct ProbeVolume {
    grid: Option<ProbeGrid>,
    coefficients: Vec<Sh9Color>,
    trilinear: bool,

    lookup_view: wgpu::TextureView,
    uniform_buffer: wgpu::Buffer,
}

impl ProbeVolume {
    #[must_use]
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let lookup_view = upload_lookup_texture(device, queue, 1, &[0.0f32; 4]);

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Probe Uniforms"),
            size: std::mem::size_of::<ProbeUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        queue.write_buffer(
            &uniform_buffer,
            0,
            bytemuck::bytes_of(&ProbeUniforms::default()),
        );

        Self {
            grid: None,
            coefficients: Vec::new(),
            trilinear: true,
            lookup_view,
            uniform_buffer,
        }
    }

    #[inline]
    #[must_use]
    pub fn grid(&self) -> Option<&ProbeGrid> {
        self.grid.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn coefficients(&self) -> &[Sh9Color] {
        &self.coefficients
    }

    #[inline]
    #[must_use]
    pub fn is_baked(&self) -> bool {
        self.grid.is_some()
    }

    #[inline]
    #[must_use]
    pub fn lookup_view(&self) -> &wgpu::TextureView {
        &self.lookup_view
    }

    #[inline]
    #[must_use]
    pub fn uniform_buffer(&self) -> &wgpu::Buffer {
        &self.uniform_buffer
    }

    /// Installs baked coefficients: rebuilds the lookup texture and enables
    /// the volume for shading.
    pub fn install(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        grid: ProbeGrid,
        coefficients: Vec<Sh9Color>,
        trilinear: bool,
    ) {
        debug_assert_eq!(coefficients.len(), grid.probe_count());

        let mut texels = Vec::with_capacity(coefficients.len() * SH_COEFF_COUNT * 4);
        for probe in &coefficients {
            for c in &probe.coefficients {
                texels.extend_from_slice(&[c.x, c.y, c.z, 1.0]);
            }
        }
        self.lookup_view =
            upload_lookup_texture(device, queue, coefficients.len() as u32, &texels);

        let uniforms = ProbeUniforms {
            start: grid.start.extend(1.0),
            delta: grid.delta.extend(if trilinear { 1.0 } else { 0.0 }),
            dims: [
                grid.dims.x,
                grid.dims.y,
                grid.dims.z,
                grid.probe_count() as u32,
            ],
        };
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));

        log::info!(
            "installed probe volume: {}x{}x{} probes",
            grid.dims.x,
            grid.dims.y,
            grid.dims.z
        );
        self.grid = Some(grid);
        self.coefficients = coefficients;
        self.trilinear = trilinear;
    }

    /// CPU mirror of the shader-side lookup: irradiance at `position` for a
    /// surface with `normal`, either from the nearest probe or trilinearly
    /// blended over the 8 surrounding probes.
    #[must_use]
    pub fn sample_irradiance(&self, position: Vec3, normal: Vec3) -> Vec3 {
        let Some(grid) = &self.grid else {
            return Vec3::ZERO;
        };
        sample_irradiance(grid, &self.coefficients, self.trilinear, position, normal)
    }
}

/// Irradiance lookup over a baked coefficient set; the CPU reference for
/// the shader-side sampling. `coefficients` is indexed by
/// [`ProbeGrid::linear_index`].
#[must_use]
pub fn sample_irradiance(
    grid: &ProbeGrid,
    coefficients: &[Sh9Color],
    trilinear: bool,
    position: Vec3,
    normal: Vec3,
) -> Vec3 {
    let delta = grid.delta.max(Vec3::splat(1e-5));
    let coords = (position - grid.start) / delta;
    let max_cell = (grid.dims - UVec3::ONE).as_vec3();

    if !trilinear {
        let cell = coords.round().clamp(Vec3::ZERO, max_cell).as_uvec3();
        return coefficients[grid.linear_index(cell)].eval(normal);
    }

    let base = coords.floor();
    let frac = (coords - base).clamp(Vec3::ZERO, Vec3::ONE);

    let mut blended = Sh9Color::default();
    for corner in 0..8u32 {
        let offset = Vec3::new(
            (corner & 1) as f32,
            (corner >> 1 & 1) as f32,
            (corner >> 2 & 1) as f32,
        );
        let weights = Vec3::ONE - frac - offset + frac * offset * 2.0;
        let weight = weights.x * weights.y * weights.z;
        if weight <= 0.0 {
            continue;
        }
        let cell = (base + offset).clamp(Vec3::ZERO, max_cell).as_uvec3();
        blended = blended.add_scaled(&coefficients[grid.linear_index(cell)], weight);
    }
    blended.eval(normal)
}

fn upload_lookup_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    rows: u32,
    texels: &[f32],
) -> wgpu::TextureView {
    let width = SH_COEFF_COUNT as u32;
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Probe Lookup"),
        size: wgpu::Extent3d {
            width,
            height: rows.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: PROBE_LOOKUP_FORMAT,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    let mut data = texels.to_vec();
    data.resize((width * rows.max(1) * 4) as usize, 0.0);
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        bytemuck::cast_slice(&data),
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(width * 16),
            rows_per_image: Some(rows.max(1)),
        },
        wgpu::Extent3d {
            width,
            height: rows.max(1),
            depth_or_array_layers: 1,
        },
    );
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

/// Blocking readback of one baked Rgba16Float cube face into linear RGB.
///
/// This is the one deliberate GPU stall in the core; it only runs during
/// probe baking.
pub(crate) fn read_face_rgba16(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
    size: u32,
) -> Result<CubeFace> {
    const BYTES_PER_PIXEL: u32 = 8; // Rgba16Float

    let tight_bpr = size * BYTES_PER_PIXEL;
    let padded_bpr = tight_bpr.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
        * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

    let staging = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Probe Face Readback"),
        size: u64::from(padded_bpr) * u64::from(size),
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Probe Face Readback Encoder"),
    });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &staging,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded_bpr),
                rows_per_image: Some(size),
            },
        },
        wgpu::Extent3d {
            width: size,
            height: size,
            depth_or_array_layers: 1,
        },
    );
    queue.submit(std::iter::once(encoder.finish()));

    let slice = staging.slice(..);
    let (sender, receiver) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = sender.send(result);
    });
    device
        .poll(wgpu::PollType::wait_indefinitely())
        .map_err(|e| VesperError::ReadbackFailed(format!("device poll failed: {e:?}")))?;

    receiver
        .recv()
        .map_err(|_| VesperError::ReadbackFailed("map_async callback dropped".into()))?
        .map_err(|e| VesperError::ReadbackFailed(format!("buffer map failed: {e:?}")))?;

    let data = slice.get_mapped_range();
    let mut pixels = Vec::with_capacity((size * size) as usize);
    for row in 0..size {
        let row_start = (row * padded_bpr) as usize;
        for col in 0..size {
            let p = row_start + (col * BYTES_PER_PIXEL) as usize;
            let r = half::f16::from_le_bytes([data[p], data[p + 1]]).to_f32();
            let g = half::f16::from_le_bytes([data[p + 2], data[p + 3]]).to_f32();
            let b = half::f16::from_le_bytes([data[p + 4], data[p + 5]]).to_f32();
            pixels.push(Vec3::new(r, g, b));
        }
    }
    drop(data);
    staging.unmap();

    Ok(CubeFace { size, pixels })
}
