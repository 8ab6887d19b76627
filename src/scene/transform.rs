//! TRS transform component.

use glam::{Affine3A, EulerRot, Mat3, Mat4, Quat, Vec3};

/// Position, rotation and scale of a node or entity.
///
/// The local matrix is derived on demand; world matrices are composed by the
/// visibility collector during traversal, so reading a scene never mutates it.
#[derive(Debug, Clone)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    #[must_use]
    pub fn new() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }

    #[must_use]
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::new()
        }
    }

    #[inline]
    #[must_use]
    pub fn local_matrix(&self) -> Affine3A {
        Affine3A::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    #[inline]
    #[must_use]
    pub fn local_matrix_as_mat4(&self) -> Mat4 {
        Mat4::from(self.local_matrix())
    }

    /// The local -Z axis, the forward direction of cameras and lights.
    #[inline]
    #[must_use]
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    pub fn set_rotation_euler(&mut self, x: f32, y: f32, z: f32) {
        self.rotation = Quat::from_euler(EulerRot::XYZ, x, y, z);
    }

    /// Orients the transform so that [`forward`](Self::forward) points at
    /// `target`. Degenerate configurations (target at the position, or
    /// forward parallel to `up`) leave the rotation unchanged.
    pub fn look_at(&mut self, target: Vec3, up: Vec3) {
        let forward = target - self.position;
        if forward.length_squared() < 1e-10 || forward.cross(up).length_squared() < 1e-8 {
            return;
        }
        let forward = forward.normalize();
        let right = forward.cross(up).normalize();
        let new_up = right.cross(forward);
        self.rotation = Quat::from_mat3(&Mat3::from_cols(right, new_up, -forward));
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new()
    }
}
