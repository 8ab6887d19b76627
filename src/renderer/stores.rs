//! GPU-side resource stores and the growable dynamic-offset uniform buffer.
//!
//! Geometries and textures are uploaded on first use and cached by handle;
//! both are read-only after creation so no version tracking is needed.
//! Missing texture bindings resolve to a shared 1x1 white view.

use std::marker::PhantomData;

use rustc_hash::FxHashMap;
use wgpu::util::DeviceExt;

use crate::resources::{GeometryHandle, MaterialHandle, TextureHandle, Vertex};
use crate::scene::Scene;

// ─── Geometry ─────────────────────────────────────────────────────────────────

/// Uploaded mesh data.
pub struct GpuGeometry {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: Option<(wgpu::Buffer, u32)>,
    pub vertex_count: u32,
}

impl GpuGeometry {
    /// Number of vertices a draw call over this geometry consumes.
    #[must_use]
    pub fn draw_count(&self) -> u32 {
        self.index_buffer
            .as_ref()
            .map_or(self.vertex_count, |(_, count)| *count)
    }
}

/// Handle-keyed cache of uploaded geometries.
#[derive(Default)]
pub struct GeometryStore {
    map: FxHashMap<GeometryHandle, GpuGeometry>,
}

impl GeometryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uploads the geometry if it is not resident yet.
    pub fn prepare(&mut self, device: &wgpu::Device, scene: &Scene, handle: GeometryHandle) {
        if self.map.contains_key(&handle) {
            return;
        }
        let Some(geometry) = scene.geometries.get(handle) else {
            log::warn!("geometry {handle:?} missing during upload");
            return;
        };
        if geometry.vertex_count() == 0 {
            return;
        }

        let vertices = geometry.interleave();
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Geometry Vertices"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = geometry.indices.as_ref().map(|indices| {
            let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Geometry Indices"),
                contents: bytemuck::cast_slice(indices),
                usage: wgpu::BufferUsages::INDEX,
            });
            (buffer, indices.len() as u32)
        });

        self.map.insert(
            handle,
            GpuGeometry {
                vertex_buffer,
                index_buffer,
                vertex_count: geometry.vertex_count(),
            },
        );
    }

    #[must_use]
    pub fn get(&self, handle: GeometryHandle) -> Option<&GpuGeometry> {
        self.map.get(&handle)
    }

    /// Issues the draw call for a resident geometry on `pass`.
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>, handle: GeometryHandle) {
        let Some(gpu) = self.map.get(&handle) else {
            return;
        };
        pass.set_vertex_buffer(0, gpu.vertex_buffer.slice(..));
        if let Some((index_buffer, count)) = &gpu.index_buffer {
            pass.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..*count, 0, 0..1);
        } else {
            pass.draw(0..gpu.vertex_count, 0..1);
        }
    }
}

// ─── Textures ─────────────────────────────────────────────────────────────────

/// Handle-keyed cache of uploaded images plus the shared samplers and the
/// white fallback.
pub struct TextureStore {
    map: FxHashMap<TextureHandle, wgpu::TextureView>,
    material_bind_groups: FxHashMap<MaterialHandle, wgpu::BindGroup>,
    white_view: wgpu::TextureView,
    pub linear_sampler: wgpu::Sampler,
    pub nearest_sampler: wgpu::Sampler,
}

impl TextureStore {
    #[must_use]
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let white_view = upload_rgba8(
            device,
            queue,
            1,
            1,
            &[255, 255, 255, 255],
            wgpu::TextureFormat::Rgba8Unorm,
            "White Fallback",
        );

        let linear_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Linear Sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let nearest_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Nearest Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Self {
            map: FxHashMap::default(),
            material_bind_groups: FxHashMap::default(),
            white_view,
            linear_sampler,
            nearest_sampler,
        }
    }

    /// Uploads the image behind `handle` if it is not resident yet.
    pub fn prepare(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        scene: &Scene,
        handle: Option<TextureHandle>,
    ) {
        let Some(handle) = handle else { return };
        if self.map.contains_key(&handle) {
            return;
        }
        let Some(image) = scene.textures.get(handle) else {
            log::warn!("texture {handle:?} missing during upload, draws fall back to white");
            return;
        };
        let view = upload_rgba8(
            device,
            queue,
            image.width,
            image.height,
            &image.data,
            image.format(),
            "Scene Texture",
        );
        self.map.insert(handle, view);
    }

    /// The view for `handle`, or the 1x1 white fallback for absent/missing
    /// bindings ("no modulation").
    #[must_use]
    pub fn view_or_white(&self, handle: Option<TextureHandle>) -> &wgpu::TextureView {
        handle
            .and_then(|h| self.map.get(&h))
            .unwrap_or(&self.white_view)
    }

    #[must_use]
    pub fn white_view(&self) -> &wgpu::TextureView {
        &self.white_view
    }

    /// Returns the cached material texture bind group, building it on first
    /// use. Materials are read-only during rendering, so the group never
    /// needs invalidation.
    pub fn material_bind_group(
        &mut self,
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        scene: &Scene,
        handle: MaterialHandle,
    ) -> Option<&wgpu::BindGroup> {
        if !self.material_bind_groups.contains_key(&handle) {
            let material = scene.materials.get(handle)?;
            let entries = [
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(
                        self.view_or_white(material.albedo_texture),
                    ),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(
                        self.view_or_white(material.metallic_roughness_texture),
                    ),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(
                        self.view_or_white(material.emissive_texture),
                    ),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(
                        self.view_or_white(material.normal_texture),
                    ),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::Sampler(&self.linear_sampler),
                },
            ];
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Material BindGroup"),
                layout,
                entries: &entries,
            });
            self.material_bind_groups.insert(handle, bind_group);
        }
        self.material_bind_groups.get(&handle)
    }

    /// Fetches a bind group built earlier this frame by
    /// [`material_bind_group`](Self::material_bind_group); used during
    /// command recording where the store is no longer mutable.
    #[must_use]
    pub fn cached_material_bind_group(&self, handle: MaterialHandle) -> Option<&wgpu::BindGroup> {
        self.material_bind_groups.get(&handle)
    }
}

fn upload_rgba8(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    width: u32,
    height: u32,
    data: &[u8],
    format: wgpu::TextureFormat,
    label: &'static str,
) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        data,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(width * 4),
            rows_per_image: Some(height),
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

// ─── Dynamic uniform buffer ───────────────────────────────────────────────────

/// A uniform buffer holding many `T` at aligned strides, bound once and
/// indexed with dynamic offsets. Grows by doubling; growth recreates the
/// bind group.
pub struct DynamicUniformBuffer<T> {
    buffer: wgpu::Buffer,
    layout: wgpu::BindGroupLayout,
    bind_group: wgpu::BindGroup,
    capacity: u32,
    stride: u32,
    label: &'static str,
    _marker: PhantomData<T>,
}

impl<T: bytemuck::Pod> DynamicUniformBuffer<T> {
    #[must_use]
    pub fn new(device: &wgpu::Device, label: &'static str, visibility: wgpu::ShaderStages) -> Self {
        let min_alignment = device.limits().min_uniform_buffer_offset_alignment.max(1);
        let stride = align_to(std::mem::size_of::<T>() as u32, min_alignment);

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(label),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(std::mem::size_of::<T>() as u64),
                },
                count: None,
            }],
        });

        let buffer = Self::create_buffer(device, label, stride, 1);
        let bind_group = Self::create_bind_group(device, label, &layout, &buffer);

        Self {
            buffer,
            layout,
            bind_group,
            capacity: 1,
            stride,
            label,
            _marker: PhantomData,
        }
    }

    fn create_buffer(
        device: &wgpu::Device,
        label: &'static str,
        stride: u32,
        capacity: u32,
    ) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: u64::from(stride) * u64::from(capacity),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    fn create_bind_group(
        device: &wgpu::Device,
        label: &'static str,
        layout: &wgpu::BindGroupLayout,
        buffer: &wgpu::Buffer,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(std::mem::size_of::<T>() as u64),
                }),
            }],
        })
    }

    /// Writes `items` at aligned strides, growing the buffer first when
    /// needed.
    pub fn write(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, items: &[T]) {
        let required = items.len().max(1) as u32;
        if required > self.capacity {
            let mut capacity = self.capacity.max(1);
            while capacity < required {
                capacity = capacity.saturating_mul(2);
            }
            self.buffer = Self::create_buffer(device, self.label, self.stride, capacity);
            self.bind_group = Self::create_bind_group(device, self.label, &self.layout, &self.buffer);
            self.capacity = capacity;
        }

        if items.is_empty() {
            return;
        }
        let mut staged = vec![0u8; self.stride as usize * items.len()];
        for (i, item) in items.iter().enumerate() {
            let offset = i * self.stride as usize;
            let bytes = bytemuck::bytes_of(item);
            staged[offset..offset + bytes.len()].copy_from_slice(bytes);
        }
        queue.write_buffer(&self.buffer, 0, &staged);
    }

    #[inline]
    #[must_use]
    pub fn offset(&self, index: usize) -> u32 {
        index as u32 * self.stride
    }

    #[inline]
    #[must_use]
    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }

    #[inline]
    #[must_use]
    pub fn layout(&self) -> &wgpu::BindGroupLayout {
        &self.layout
    }
}

fn align_to(value: u32, alignment: u32) -> u32 {
    value.div_ceil(alignment) * alignment
}
