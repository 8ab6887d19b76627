//! Visibility collection: scene traversal, frustum culling and draw
//! ordering.

use glam::{Mat4, Vec3};

use crate::resources::{GeometryHandle, MaterialHandle};
use crate::scene::scene::EntityKind;
use crate::scene::{Camera, Frustum, NodeHandle, Scene};

/// One mesh + material + transform to rasterize. Rebuilt every collection
/// pass; never persisted.
#[derive(Debug, Clone)]
pub struct DrawRecord {
    pub world_matrix: Mat4,
    pub geometry: GeometryHandle,
    pub material: MaterialHandle,
    /// Euclidean distance from the camera eye to the world-space bounding
    /// box center; 0 when collected without a camera.
    pub distance: f32,
}

/// Walks every visible prefab entity, frustum-culls drawable nodes and
/// returns draw records sorted by ascending camera distance.
///
/// Nearer opaque geometry then draws first (better early depth rejection)
/// and blended geometry can composite back-to-front by walking the list in
/// reverse. With `camera == None` (probe baking) the frustum test is skipped
/// and every drawable node is included.
///
/// The sort is stable, so records at equal distance keep traversal order.
#[must_use]
pub fn collect(scene: &Scene, camera: Option<&Camera>) -> Vec<DrawRecord> {
    let cull = camera.map_or(Cull::None, |cam| Cull::Test {
        frustum: cam.frustum(),
        eye: cam.eye(),
    });
    collect_impl(scene, cull)
}

/// [`collect`] against an arbitrary frustum, used by the shadow pass to
/// gather casters from each light's point of view.
#[must_use]
pub fn collect_culled(scene: &Scene, frustum: &Frustum, eye: Vec3) -> Vec<DrawRecord> {
    collect_impl(scene, Cull::Test { frustum, eye })
}

#[derive(Clone, Copy)]
enum Cull<'a> {
    /// Include everything at distance 0 (probe baking).
    None,
    Test { frustum: &'a Frustum, eye: Vec3 },
}

fn collect_impl(scene: &Scene, cull: Cull<'_>) -> Vec<DrawRecord> {
    let mut records = Vec::new();

    for entity in &scene.entities {
        if !entity.visible {
            continue;
        }
        if let EntityKind::Prefab { root } = entity.kind {
            collect_node(
                scene,
                root,
                entity.transform.local_matrix_as_mat4(),
                cull,
                &mut records,
            );
        }
    }

    records.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    records
}

fn collect_node(
    scene: &Scene,
    handle: NodeHandle,
    parent_matrix: Mat4,
    cull: Cull<'_>,
    out: &mut Vec<DrawRecord>,
) {
    let Some(node) = scene.nodes.get(handle) else {
        return;
    };
    if !node.visible {
        return;
    }

    let world_matrix = parent_matrix * node.transform.local_matrix_as_mat4();

    if let (Some(geometry_handle), Some(material_handle)) = (node.geometry, node.material) {
        if let Some(geometry) = scene.geometries.get(geometry_handle) {
            // Degenerate draws (no vertices, dangling material) are dropped
            // here rather than erroring at draw time
            if geometry.vertex_count() > 0 && scene.materials.contains_key(material_handle) {
                let (center, half_extent) = geometry.bounding_box.transformed(&world_matrix);
                let (include, distance) = match cull {
                    Cull::Test { frustum, eye } => (
                        frustum.intersects_box(center, half_extent),
                        eye.distance(center),
                    ),
                    Cull::None => (true, 0.0),
                };
                if include {
                    out.push(DrawRecord {
                        world_matrix,
                        geometry: geometry_handle,
                        material: material_handle,
                        distance,
                    });
                }
            }
        }
    }

    for &child in node.children() {
        collect_node(scene, child, world_matrix, cull, out);
    }
}
