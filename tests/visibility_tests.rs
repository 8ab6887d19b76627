//! Visibility Collector Tests
//!
//! Tests for:
//! - Frustum culling correctness (fully outside never emitted, fully
//!   inside always emitted)
//! - Distance sort order
//! - Cameraless collection (probe baking path)
//! - Hierarchy transform composition
//! - Degenerate draw record filtering

use glam::Vec3;

use vesper::renderer::visibility::collect;
use vesper::resources::{primitives, Geometry, Material};
use vesper::scene::{Camera, Node, Scene, Transform};

fn test_camera() -> Camera {
    let mut cam = Camera::new_perspective(60.0, 1.0, 0.1, 500.0);
    cam.look_at(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO, Vec3::Y);
    cam
}

/// Adds a unit cube mesh node at `position` and returns the entity index.
fn add_cube(scene: &mut Scene, position: Vec3) -> usize {
    let geometry = scene.add_geometry(primitives::create_box(1.0, 1.0, 1.0));
    let material = scene.add_material(Material::default());
    let node = scene.add_node(Node::with_mesh(geometry, material));
    scene.spawn_prefab(node, Transform::from_position(position))
}

// ============================================================================
// Frustum Culling
// ============================================================================

#[test]
fn box_fully_inside_is_always_emitted() {
    let mut scene = Scene::new();
    add_cube(&mut scene, Vec3::ZERO);

    let records = collect(&scene, Some(&test_camera()));
    assert_eq!(records.len(), 1, "cube in front of the camera must be kept");
}

#[test]
fn box_fully_outside_is_never_emitted() {
    let mut scene = Scene::new();
    // Far outside the left plane
    add_cube(&mut scene, Vec3::new(-1000.0, 0.0, 0.0));
    // Behind the camera
    add_cube(&mut scene, Vec3::new(0.0, 0.0, 1000.0));

    let records = collect(&scene, Some(&test_camera()));
    assert!(
        records.is_empty(),
        "boxes fully outside the frustum must be culled, got {}",
        records.len()
    );
}

#[test]
fn collection_without_camera_includes_everything() {
    let mut scene = Scene::new();
    add_cube(&mut scene, Vec3::ZERO);
    add_cube(&mut scene, Vec3::new(-1000.0, 0.0, 0.0));
    add_cube(&mut scene, Vec3::new(0.0, 0.0, 1000.0));

    let records = collect(&scene, None);
    assert_eq!(records.len(), 3, "probe baking sees the whole scene");
    assert!(
        records.iter().all(|r| r.distance == 0.0),
        "cameraless records carry distance 0"
    );
}

// ============================================================================
// Ordering
// ============================================================================

#[test]
fn records_are_sorted_by_ascending_distance() {
    let mut scene = Scene::new();
    add_cube(&mut scene, Vec3::new(0.0, 0.0, -40.0));
    add_cube(&mut scene, Vec3::new(0.0, 0.0, 0.0));
    add_cube(&mut scene, Vec3::new(0.0, 0.0, -20.0));

    let records = collect(&scene, Some(&test_camera()));
    assert_eq!(records.len(), 3);
    for pair in records.windows(2) {
        assert!(
            pair[0].distance <= pair[1].distance,
            "distances must be non-decreasing: {} then {}",
            pair[0].distance,
            pair[1].distance
        );
    }
    // Camera sits at z=10, so the cube at the origin is nearest
    assert!(records[0].distance < records[1].distance);
}

// ============================================================================
// Hierarchy
// ============================================================================

#[test]
fn child_transforms_compose_with_parent_and_entity_root() {
    let mut scene = Scene::new();
    let geometry = scene.add_geometry(primitives::create_box(1.0, 1.0, 1.0));
    let material = scene.add_material(Material::default());

    let parent = scene.add_node(Node::new());
    let mut child_node = Node::with_mesh(geometry, material);
    child_node.transform.position = Vec3::new(0.0, 2.0, 0.0);
    let child = scene.add_node(child_node);
    scene.attach(parent, child);

    scene.spawn_prefab(parent, Transform::from_position(Vec3::new(3.0, 0.0, 0.0)));

    let records = collect(&scene, None);
    assert_eq!(records.len(), 1);
    let translation = records[0].world_matrix.w_axis.truncate();
    assert!(
        (translation - Vec3::new(3.0, 2.0, 0.0)).length() < 1e-5,
        "entity root and node transforms must compose, got {translation}"
    );
}

#[test]
fn invisible_entities_and_nodes_are_skipped() {
    let mut scene = Scene::new();
    let index = add_cube(&mut scene, Vec3::ZERO);
    scene.entities[index].visible = false;
    assert!(collect(&scene, None).is_empty());

    scene.entities[index].visible = true;
    let root = match &scene.entities[index].kind {
        vesper::scene::EntityKind::Prefab { root } => *root,
        _ => unreachable!("cube entity is a prefab"),
    };
    scene.nodes[root].visible = false;
    assert!(collect(&scene, None).is_empty());
}

// ============================================================================
// Degenerate Input
// ============================================================================

#[test]
fn empty_geometry_is_skipped() {
    let mut scene = Scene::new();
    let geometry = scene.add_geometry(Geometry::default());
    let material = scene.add_material(Material::default());
    let node = scene.add_node(Node::with_mesh(geometry, material));
    scene.spawn_prefab(node, Transform::new());

    assert!(
        collect(&scene, None).is_empty(),
        "zero-vertex geometry must not produce draw records"
    );
}

#[test]
fn node_without_material_is_skipped() {
    let mut scene = Scene::new();
    let geometry = scene.add_geometry(primitives::create_box(1.0, 1.0, 1.0));
    let mut node = Node::new();
    node.geometry = Some(geometry);
    let node = scene.add_node(node);
    scene.spawn_prefab(node, Transform::new());

    assert!(collect(&scene, None).is_empty());
}
