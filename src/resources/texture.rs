//! CPU-side image data.

/// An RGBA8 image as handed to the renderer for upload.
#[derive(Debug, Clone)]
pub struct Image {
    pub width: u32,
    pub height: u32,
    /// Tightly packed RGBA8 texels, row-major, `width * height * 4` bytes.
    pub data: Vec<u8>,
    /// Whether the data is sRGB-encoded (albedo/emissive) or linear
    /// (metallic-roughness, normal maps).
    pub srgb: bool,
}

impl Image {
    #[must_use]
    pub fn new(width: u32, height: u32, data: Vec<u8>, srgb: bool) -> Self {
        debug_assert_eq!(data.len(), (width * height * 4) as usize);
        Self {
            width,
            height,
            data,
            srgb,
        }
    }

    /// The 1x1 white fallback substituted for missing texture bindings,
    /// so absent maps mean "no modulation".
    #[must_use]
    pub fn white() -> Self {
        Self {
            width: 1,
            height: 1,
            data: vec![255, 255, 255, 255],
            srgb: false,
        }
    }

    /// A 1x1 solid-color image, handy for tests and decals.
    #[must_use]
    pub fn solid(rgba: [u8; 4], srgb: bool) -> Self {
        Self {
            width: 1,
            height: 1,
            data: rgba.to_vec(),
            srgb,
        }
    }

    #[must_use]
    pub fn format(&self) -> wgpu::TextureFormat {
        if self.srgb {
            wgpu::TextureFormat::Rgba8UnormSrgb
        } else {
            wgpu::TextureFormat::Rgba8Unorm
        }
    }
}
