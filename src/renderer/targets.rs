//! Purpose-keyed framebuffer target cache.
//!
//! Every intermediate render target of the pipeline (G-buffer attachments,
//! AO buffers, HDR accumulation, post-process scratch, per-light shadow
//! maps) lives in this cache under an explicit [`TargetPurpose`] key. Each
//! entry is stamped with the size and format it was allocated at;
//! [`TargetCache::get_or_create`] reallocates on mismatch, which makes
//! resize invalidation explicit instead of a scattering of null checks.
//!
//! Passes allocate during their prepare phase (`&mut self`) and read views
//! during execution (`&self`); exclusive use of a target within a pass is
//! enforced by program order, not locks.

use rustc_hash::FxHashMap;

use crate::scene::LightHandle;

/// Identity of a cached render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetPurpose {
    GBufferAlbedo,
    GBufferNormal,
    GBufferExtra,
    GBufferDepth,
    // Decal pass scratch copies of the G-buffer
    GBufferAlbedoCopy,
    GBufferNormalCopy,
    GBufferExtraCopy,
    GBufferDepthCopy,
    Ao,
    AoBlur,
    Hdr,
    PostPing,
    PostPong,
    Bright,
    BlurScratch,
    DofBlur,
    /// Depth-only target owned by a shadow-casting light for its lifetime.
    ShadowMap(LightHandle),
    ProbeFaceColor,
    ProbeFaceDepth,
}

impl TargetPurpose {
    /// Targets sized to the viewport are torn down on resize; shadow maps
    /// and probe bake faces have their own fixed sizes and survive.
    #[must_use]
    pub fn is_viewport_sized(&self) -> bool {
        !matches!(
            self,
            Self::ShadowMap(_) | Self::ProbeFaceColor | Self::ProbeFaceDepth
        )
    }
}

/// Allocation request for a target.
#[derive(Debug, Clone, Copy)]
pub struct TargetDesc {
    pub width: u32,
    pub height: u32,
    pub format: wgpu::TextureFormat,
    pub usage: wgpu::TextureUsages,
    pub label: &'static str,
}

/// A cached texture with its default view and allocation stamp.
pub struct Target {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    width: u32,
    height: u32,
    format: wgpu::TextureFormat,
    usage: wgpu::TextureUsages,
}

impl Target {
    fn create(device: &wgpu::Device, desc: &TargetDesc) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(desc.label),
            size: wgpu::Extent3d {
                width: desc.width.max(1),
                height: desc.height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: desc.format,
            usage: desc.usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            width: desc.width,
            height: desc.height,
            format: desc.format,
            usage: desc.usage,
        }
    }

    fn matches(&self, desc: &TargetDesc) -> bool {
        self.width == desc.width
            && self.height == desc.height
            && self.format == desc.format
            && self.usage.contains(desc.usage)
    }
}

/// The cache itself. Owned by the renderer and threaded through the frame
/// context; no global state.
#[derive(Default)]
pub struct TargetCache {
    entries: FxHashMap<TargetPurpose, Target>,
}

impl TargetCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the target for `purpose`, allocating (or reallocating on a
    /// stamp mismatch) as needed.
    pub fn get_or_create(
        &mut self,
        device: &wgpu::Device,
        purpose: TargetPurpose,
        desc: &TargetDesc,
    ) -> &Target {
        let stale = self.entries.get(&purpose).is_some_and(|t| !t.matches(desc));
        if stale {
            log::debug!("reallocating render target {purpose:?} at {}x{}", desc.width, desc.height);
            self.entries.remove(&purpose);
        }
        self.entries
            .entry(purpose)
            .or_insert_with(|| Target::create(device, desc))
    }

    #[must_use]
    pub fn get(&self, purpose: TargetPurpose) -> Option<&Target> {
        self.entries.get(&purpose)
    }

    #[must_use]
    pub fn view(&self, purpose: TargetPurpose) -> Option<&wgpu::TextureView> {
        self.entries.get(&purpose).map(|t| &t.view)
    }

    #[must_use]
    pub fn texture(&self, purpose: TargetPurpose) -> Option<&wgpu::Texture> {
        self.entries.get(&purpose).map(|t| &t.texture)
    }

    /// Drops every viewport-sized target. Called on resize; the next frame
    /// reallocates at the new dimensions before any pass reads them.
    pub fn invalidate_viewport_sized(&mut self) {
        self.entries.retain(|purpose, _| !purpose.is_viewport_sized());
    }

    /// Drops the shadow map owned by a removed light.
    pub fn remove_shadow_map(&mut self, light: LightHandle) {
        self.entries.remove(&TargetPurpose::ShadowMap(light));
    }
}
