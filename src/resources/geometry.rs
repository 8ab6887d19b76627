//! Mesh geometry: vertex attributes, indices and the local bounding box.

use glam::{Mat4, Vec3};

/// Axis-aligned bounding box in the geometry's local space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::ZERO
    }
}

impl BoundingBox {
    pub const ZERO: Self = Self {
        min: Vec3::ZERO,
        max: Vec3::ZERO,
    };

    #[must_use]
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Smallest box enclosing all `points`. Returns [`BoundingBox::ZERO`]
    /// for an empty slice.
    #[must_use]
    pub fn from_points(points: &[[f32; 3]]) -> Self {
        let Some(first) = points.first() else {
            return Self::ZERO;
        };
        let mut min = Vec3::from(*first);
        let mut max = min;
        for p in &points[1..] {
            min = min.min(Vec3::from(*p));
            max = max.max(Vec3::from(*p));
        }
        Self { min, max }
    }

    #[inline]
    #[must_use]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    #[inline]
    #[must_use]
    pub fn half_extent(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Transforms the box into another space, returning the axis-aligned
    /// box of the transformed corners as `(center, half_extent)`.
    ///
    /// The half-extent is computed from the absolute value of the upper 3x3
    /// of `matrix`, which is the tight AABB of a transformed AABB.
    #[must_use]
    pub fn transformed(&self, matrix: &Mat4) -> (Vec3, Vec3) {
        let center = matrix.transform_point3(self.center());
        let he = self.half_extent();
        let x = matrix.x_axis.truncate().abs() * he.x;
        let y = matrix.y_axis.truncate().abs() * he.y;
        let z = matrix.z_axis.truncate().abs() * he.z;
        (center, x + y + z)
    }
}

/// Interleaved vertex layout uploaded to the GPU.
///
/// Matches the vertex buffer layout declared by the draw pipelines:
/// position at shader location 0, normal at 1, uv at 2.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    pub const SIZE: u64 = std::mem::size_of::<Self>() as u64;

    pub const ATTRIBUTES: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        0 => Float32x3,
        1 => Float32x3,
        2 => Float32x2,
    ];
}

/// CPU-side mesh data. Read-only once handed to a scene.
#[derive(Debug, Clone, Default)]
pub struct Geometry {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub indices: Option<Vec<u32>>,
    pub bounding_box: BoundingBox,
}

impl Geometry {
    /// Builds a geometry from attribute arrays, deriving the bounding box.
    ///
    /// Missing normals/uvs are filled with zeroes so the interleaved layout
    /// stays valid.
    #[must_use]
    pub fn new(
        positions: Vec<[f32; 3]>,
        normals: Vec<[f32; 3]>,
        uvs: Vec<[f32; 2]>,
        indices: Option<Vec<u32>>,
    ) -> Self {
        let bounding_box = BoundingBox::from_points(&positions);
        Self {
            positions,
            normals,
            uvs,
            indices,
            bounding_box,
        }
    }

    #[inline]
    #[must_use]
    pub fn vertex_count(&self) -> u32 {
        self.positions.len() as u32
    }

    /// Number of vertices the draw call will consume.
    #[inline]
    #[must_use]
    pub fn draw_count(&self) -> u32 {
        self.indices
            .as_ref()
            .map_or_else(|| self.vertex_count(), |i| i.len() as u32)
    }

    /// Interleaves the attribute arrays into the GPU vertex layout.
    #[must_use]
    pub fn interleave(&self) -> Vec<Vertex> {
        let n = self.positions.len();
        let mut out = Vec::with_capacity(n);
        for i in 0..n {
            out.push(Vertex {
                position: self.positions[i],
                normal: self.normals.get(i).copied().unwrap_or([0.0; 3]),
                uv: self.uvs.get(i).copied().unwrap_or([0.0; 2]),
            });
        }
        out
    }
}
