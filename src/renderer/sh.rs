//! Second-order spherical harmonics: basis evaluation and cube-face
//! projection.
//!
//! Irradiance probes store incoming radiance as 9 RGB coefficients. Baking
//! projects the 6 rendered cube faces into that basis with per-texel
//! solid-angle weights; shading evaluates `sum(c_i * Y_i(normal))`. Both
//! directions use the same real SH basis below, so the round trip of a
//! constant environment reconstructs the constant (the DC term is exact,
//! higher bands cancel by symmetry).

use glam::Vec3;

/// Number of basis functions in a second-order (L2) expansion.
pub const SH_COEFF_COUNT: usize = 9;

/// 9 RGB spherical-harmonic coefficients.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Sh9Color {
    pub coefficients: [Vec3; SH_COEFF_COUNT],
}

impl Sh9Color {
    /// Evaluates the expansion in direction `normal`.
    #[must_use]
    pub fn eval(&self, normal: Vec3) -> Vec3 {
        let basis = sh_basis(normal);
        let mut out = Vec3::ZERO;
        for (c, y) in self.coefficients.iter().zip(basis.iter()) {
            out += *c * *y;
        }
        out
    }

    /// Component-wise `self + other * weight`, used by trilinear probe
    /// blending.
    #[must_use]
    pub fn add_scaled(mut self, other: &Self, weight: f32) -> Self {
        for (c, o) in self.coefficients.iter_mut().zip(other.coefficients.iter()) {
            *c += *o * weight;
        }
        self
    }
}

/// Real SH basis functions of bands 0..=2 evaluated at a unit direction.
#[must_use]
pub fn sh_basis(dir: Vec3) -> [f32; SH_COEFF_COUNT] {
    let Vec3 { x, y, z } = dir;
    [
        0.282_095,
        0.488_603 * y,
        0.488_603 * z,
        0.488_603 * x,
        1.092_548 * x * y,
        1.092_548 * y * z,
        0.315_392 * (3.0 * z * z - 1.0),
        1.092_548 * x * z,
        0.546_274 * (x * x - y * y),
    ]
}

/// One rendered cube face read back to the CPU: `size * size` linear RGB
/// texels, row-major.
#[derive(Debug, Clone)]
pub struct CubeFace {
    pub size: u32,
    pub pixels: Vec<Vec3>,
}

impl CubeFace {
    /// A face filled with a single radiance value, used by tests.
    #[must_use]
    pub fn solid(size: u32, color: Vec3) -> Self {
        Self {
            size,
            pixels: vec![color; (size * size) as usize],
        }
    }
}

/// Forward/right/up basis for each of the 6 canonical cube faces, in the
/// order +X, -X, +Y, -Y, +Z, -Z. The same basis drives both the bake
/// cameras and the projection integral.
pub const CUBE_FACE_BASES: [(Vec3, Vec3, Vec3); 6] = [
    (Vec3::X, Vec3::NEG_Z, Vec3::Y),
    (Vec3::NEG_X, Vec3::Z, Vec3::Y),
    (Vec3::Y, Vec3::X, Vec3::NEG_Z),
    (Vec3::NEG_Y, Vec3::X, Vec3::Z),
    (Vec3::Z, Vec3::X, Vec3::Y),
    (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
];

/// World direction through face texel coordinates `u, v` in `[-1, 1]`.
#[must_use]
pub fn cube_face_direction(face: usize, u: f32, v: f32) -> Vec3 {
    let (forward, right, up) = CUBE_FACE_BASES[face];
    (forward + right * u + up * v).normalize()
}

/// Projects 6 cube faces into SH coefficients.
///
/// Each texel contributes its radiance weighted by the solid angle it
/// subtends; the sum is renormalized so the discrete weights integrate to
/// exactly `4 * pi`, which makes the projection of a constant environment
/// reconstruct that constant.
#[must_use]
pub fn project_cube_faces(faces: &[CubeFace; 6]) -> Sh9Color {
    let mut coefficients = [Vec3::ZERO; SH_COEFF_COUNT];
    let mut total_weight = 0.0f32;

    for (face_index, face) in faces.iter().enumerate() {
        let size = face.size.max(1);
        let texel = 2.0 / size as f32;
        for j in 0..size {
            let v = (j as f32 + 0.5) * texel - 1.0;
            for i in 0..size {
                let u = (i as f32 + 0.5) * texel - 1.0;

                // Solid angle of the texel: dA * cos(theta) / r^2 with the
                // face at distance 1
                let r2 = u * u + v * v + 1.0;
                let weight = texel * texel / (r2 * r2.sqrt());

                let dir = cube_face_direction(face_index, u, v);
                let radiance = face.pixels[(j * size + i) as usize];
                let basis = sh_basis(dir);
                for (c, y) in coefficients.iter_mut().zip(basis.iter()) {
                    *c += radiance * (*y * weight);
                }
                total_weight += weight;
            }
        }
    }

    if total_weight > 0.0 {
        let normalization = 4.0 * std::f32::consts::PI / total_weight;
        for c in &mut coefficients {
            *c *= normalization;
        }
    }
    Sh9Color { coefficients }
}
