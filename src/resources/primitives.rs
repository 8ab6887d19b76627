//! Procedural test geometry: box, plane and UV sphere.

use crate::resources::Geometry;

/// Axis-aligned box centered at the origin, 4 vertices per face.
#[must_use]
pub fn create_box(width: f32, height: f32, depth: f32) -> Geometry {
    let w = width / 2.0;
    let h = height / 2.0;
    let d = depth / 2.0;

    // (normal, four corners) per face, counter-clockwise seen from outside
    let faces: [([f32; 3], [[f32; 3]; 4]); 6] = [
        (
            [0.0, 0.0, 1.0],
            [[-w, -h, d], [w, -h, d], [w, h, d], [-w, h, d]],
        ),
        (
            [0.0, 0.0, -1.0],
            [[w, -h, -d], [-w, -h, -d], [-w, h, -d], [w, h, -d]],
        ),
        (
            [0.0, 1.0, 0.0],
            [[-w, h, d], [w, h, d], [w, h, -d], [-w, h, -d]],
        ),
        (
            [0.0, -1.0, 0.0],
            [[-w, -h, -d], [w, -h, -d], [w, -h, d], [-w, -h, d]],
        ),
        (
            [1.0, 0.0, 0.0],
            [[w, -h, d], [w, -h, -d], [w, h, -d], [w, h, d]],
        ),
        (
            [-1.0, 0.0, 0.0],
            [[-w, -h, -d], [-w, -h, d], [-w, h, d], [-w, h, -d]],
        ),
    ];

    let mut positions = Vec::with_capacity(24);
    let mut normals = Vec::with_capacity(24);
    let mut uvs = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);

    for (face, (normal, corners)) in faces.iter().enumerate() {
        let base = (face * 4) as u32;
        for (i, corner) in corners.iter().enumerate() {
            positions.push(*corner);
            normals.push(*normal);
            uvs.push([(i == 1 || i == 2) as u32 as f32, (i >= 2) as u32 as f32]);
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    Geometry::new(positions, normals, uvs, Some(indices))
}

/// Flat plane in the XZ plane facing +Y.
#[must_use]
pub fn create_plane(width: f32, depth: f32) -> Geometry {
    let w = width / 2.0;
    let d = depth / 2.0;

    let positions = vec![[-w, 0.0, -d], [-w, 0.0, d], [w, 0.0, d], [w, 0.0, -d]];
    let normals = vec![[0.0, 1.0, 0.0]; 4];
    let uvs = vec![[0.0, 0.0], [0.0, 1.0], [1.0, 1.0], [1.0, 0.0]];
    let indices = vec![0, 1, 2, 0, 2, 3];

    Geometry::new(positions, normals, uvs, Some(indices))
}

/// UV sphere centered at the origin.
#[must_use]
pub fn create_sphere(radius: f32, segments: u32, rings: u32) -> Geometry {
    let segments = segments.max(3);
    let rings = rings.max(2);

    let mut positions = Vec::new();
    let mut normals = Vec::new();
    let mut uvs = Vec::new();
    let mut indices = Vec::new();

    for ring in 0..=rings {
        let v = ring as f32 / rings as f32;
        let phi = v * std::f32::consts::PI;
        for seg in 0..=segments {
            let u = seg as f32 / segments as f32;
            let theta = u * std::f32::consts::TAU;

            let x = phi.sin() * theta.cos();
            let y = phi.cos();
            let z = phi.sin() * theta.sin();

            positions.push([x * radius, y * radius, z * radius]);
            normals.push([x, y, z]);
            uvs.push([u, v]);
        }
    }

    let stride = segments + 1;
    for ring in 0..rings {
        for seg in 0..segments {
            let a = ring * stride + seg;
            let b = a + stride;
            indices.extend_from_slice(&[a, b, a + 1, b, b + 1, a + 1]);
        }
    }

    Geometry::new(positions, normals, uvs, Some(indices))
}
