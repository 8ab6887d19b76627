//! Renderer configuration.
//!
//! All pipeline tunables in one place, threaded through the frame context so
//! passes read them without hidden globals. Defaults follow the classic
//! deferred setup this core derives from: 1024x1024 shadow maps for at most
//! 5 casters, a 64-point SSAO kernel of radius 10 and a Reinhard tonemap
//! with unit average/white luminance.

/// Shadow pass configuration.
#[derive(Debug, Clone)]
pub struct ShadowSettings {
    /// Upper bound on shadow-casting lights per frame. When more lights ask
    /// for shadows, the ones nearest the camera win (directional lights
    /// count as distance zero and always win).
    pub max_casters: usize,
    /// Default side length for lights that did not set their own map size.
    pub map_size: u32,
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Self {
            max_casters: 5,
            map_size: 1024,
        }
    }
}

/// SSAO configuration.
#[derive(Debug, Clone)]
pub struct SsaoSettings {
    pub enabled: bool,
    /// Number of hemisphere kernel points, at most 64.
    pub sample_count: u32,
    /// World-space hemisphere radius.
    pub radius: f32,
    /// Depth comparison bias preventing self-occlusion.
    pub bias: f32,
}

impl Default for SsaoSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            sample_count: 64,
            radius: 10.0,
            bias: 0.025,
        }
    }
}

/// Bloom configuration.
#[derive(Debug, Clone)]
pub struct BloomSettings {
    pub enabled: bool,
    /// Luminance threshold of the bright pass.
    pub threshold: f32,
    /// Scale applied to the blurred bright pass on composite.
    pub intensity: f32,
}

impl Default for BloomSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: 1.0,
            intensity: 1.0,
        }
    }
}

/// Depth-of-field configuration.
#[derive(Debug, Clone)]
pub struct DofSettings {
    pub enabled: bool,
    /// Distance (world units) that stays perfectly sharp.
    pub focus_distance: f32,
    /// Distance over which the circle of confusion ramps to full blur.
    pub focus_range: f32,
}

impl Default for DofSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            focus_distance: 10.0,
            focus_range: 40.0,
        }
    }
}

/// Reinhard tonemap parameters.
#[derive(Debug, Clone)]
pub struct TonemapSettings {
    /// When disabled the HDR image is passed through unchanged (apart from
    /// the surface format conversion).
    pub enabled: bool,
    pub average_luminance: f32,
    pub white_luminance: f32,
    pub scale: f32,
}

impl Default for TonemapSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            average_luminance: 1.0,
            white_luminance: 1.0,
            scale: 1.0,
        }
    }
}

/// Irradiance probe sampling configuration.
#[derive(Debug, Clone)]
pub struct ProbeSettings {
    /// Blend the 8 surrounding probes instead of snapping to the nearest.
    pub trilinear: bool,
    /// Resolution of each bake cube face. Baking cost scales with its
    /// square; 16 is plenty for an order-2 SH projection.
    pub face_size: u32,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            trilinear: true,
            face_size: 16,
        }
    }
}

/// All renderer tunables.
#[derive(Debug, Clone)]
pub struct RendererSettings {
    pub shadow: ShadowSettings,
    pub ssao: SsaoSettings,
    pub bloom: BloomSettings,
    pub dof: DofSettings,
    pub tonemap: TonemapSettings,
    pub probes: ProbeSettings,
    pub fxaa_enabled: bool,
    pub decals_enabled: bool,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            shadow: ShadowSettings::default(),
            ssao: SsaoSettings::default(),
            bloom: BloomSettings::default(),
            dof: DofSettings::default(),
            tonemap: TonemapSettings::default(),
            probes: ProbeSettings::default(),
            fxaa_enabled: true,
            decals_enabled: true,
        }
    }
}

impl RendererSettings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}
