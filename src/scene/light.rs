//! Light sources.

use glam::{Mat4, Vec3};

use crate::scene::transform::Transform;

/// Kind-specific light parameters.
#[derive(Debug, Clone)]
pub enum LightKind {
    /// Omnidirectional light with a falloff range.
    Point { range: f32 },
    /// Cone light. `cone_angle` is the half-angle of the cone in radians;
    /// `exponent` shapes the falloff towards the cone edge.
    Spot {
        range: f32,
        cone_angle: f32,
        exponent: f32,
    },
    /// Infinitely distant light. `area_size` is the half-extent of the
    /// orthographic shadow frustum.
    Directional { area_size: f32 },
}

/// A light in the scene. Position and direction derive from `transform`.
#[derive(Debug, Clone)]
pub struct Light {
    pub kind: LightKind,
    pub transform: Transform,
    pub color: Vec3,
    pub intensity: f32,

    pub cast_shadows: bool,
    pub shadow_bias: f32,
    /// Side length of the square shadow depth target; 0 uses the
    /// renderer's configured default.
    pub shadow_map_size: u32,
}

impl Light {
    #[must_use]
    pub fn new_point(color: Vec3, intensity: f32, range: f32) -> Self {
        Self {
            kind: LightKind::Point { range },
            transform: Transform::new(),
            color,
            intensity,
            cast_shadows: false,
            shadow_bias: 0.001,
            shadow_map_size: 0,
        }
    }

    #[must_use]
    pub fn new_spot(color: Vec3, intensity: f32, range: f32, cone_angle: f32, exponent: f32) -> Self {
        Self {
            kind: LightKind::Spot {
                range,
                cone_angle,
                exponent,
            },
            transform: Transform::new(),
            color,
            intensity,
            cast_shadows: false,
            shadow_bias: 0.001,
            shadow_map_size: 0,
        }
    }

    #[must_use]
    pub fn new_directional(color: Vec3, intensity: f32, area_size: f32) -> Self {
        Self {
            kind: LightKind::Directional { area_size },
            transform: Transform::new(),
            color,
            intensity,
            cast_shadows: false,
            shadow_bias: 0.001,
            shadow_map_size: 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.transform.position
    }

    #[inline]
    #[must_use]
    pub fn direction(&self) -> Vec3 {
        self.transform.forward()
    }

    /// Falloff distance of the light; infinite for directional lights.
    #[must_use]
    pub fn range(&self) -> f32 {
        match self.kind {
            LightKind::Point { range } | LightKind::Spot { range, .. } => range,
            LightKind::Directional { .. } => f32::INFINITY,
        }
    }

    /// Whether the light kind can own a shadow depth target.
    ///
    /// Point lights would need a cube depth target, which this core does
    /// not implement; their `cast_shadows` flag is ignored.
    #[must_use]
    pub fn supports_shadows(&self) -> bool {
        matches!(
            self.kind,
            LightKind::Spot { .. } | LightKind::Directional { .. }
        )
    }

    /// The view-projection used both to fill the light's shadow depth target
    /// and to sample it during light accumulation. Keeping these identical is
    /// the invariant that makes shadow projection geometrically valid.
    ///
    /// Returns `None` for point lights.
    #[must_use]
    pub fn shadow_view_projection(&self) -> Option<Mat4> {
        let direction = self.direction();
        let safe_dir = if direction.length_squared() > 1e-6 {
            direction.normalize()
        } else {
            Vec3::NEG_Z
        };
        let up = if safe_dir.y.abs() > 0.99 { Vec3::X } else { Vec3::Y };
        let position = self.position();

        match self.kind {
            LightKind::Spot {
                range, cone_angle, ..
            } => {
                let view = Mat4::look_at_rh(position, position + safe_dir, up);
                let fov = (cone_angle * 2.0).clamp(0.1, std::f32::consts::PI - 0.01);
                let far = range.max(1.0);
                let proj = Mat4::perspective_rh(fov, 1.0, 0.1, far);
                Some(proj * view)
            }
            LightKind::Directional { area_size } => {
                let view = Mat4::look_at_rh(position, position + safe_dir, up);
                let extent = area_size.max(1.0);
                let proj =
                    Mat4::orthographic_rh(-extent, extent, -extent, extent, 0.1, extent * 10.0);
                Some(proj * view)
            }
            LightKind::Point { .. } => None,
        }
    }
}
