//! Scene Graph Tests
//!
//! Tests for:
//! - Node attach/detach bookkeeping
//! - Entity payload dispatch (prefab / light / decal)
//! - Transform forward vector and look_at

use glam::{Quat, Vec3};

use vesper::resources::Image;
use vesper::scene::{Decal, EntityKind, Light, Node, Scene, Transform};

const EPSILON: f32 = 1e-5;

fn approx_vec(a: Vec3, b: Vec3) -> bool {
    (a - b).length() < EPSILON
}

// ============================================================================
// Hierarchy
// ============================================================================

#[test]
fn attach_links_both_directions() {
    let mut scene = Scene::new();
    let parent = scene.add_node(Node::new());
    let child = scene.add_node(Node::new());
    scene.attach(parent, child);

    assert_eq!(scene.nodes[child].parent(), Some(parent));
    assert_eq!(scene.nodes[parent].children(), &[child]);
}

#[test]
fn attach_moves_a_child_between_parents() {
    let mut scene = Scene::new();
    let a = scene.add_node(Node::new());
    let b = scene.add_node(Node::new());
    let child = scene.add_node(Node::new());

    scene.attach(a, child);
    scene.attach(b, child);

    assert!(scene.nodes[a].children().is_empty(), "old parent must forget the child");
    assert_eq!(scene.nodes[child].parent(), Some(b));
    assert_eq!(scene.nodes[b].children(), &[child]);
}

#[test]
fn detach_clears_the_link() {
    let mut scene = Scene::new();
    let parent = scene.add_node(Node::new());
    let child = scene.add_node(Node::new());
    scene.attach(parent, child);
    scene.detach(child);

    assert_eq!(scene.nodes[child].parent(), None);
    assert!(scene.nodes[parent].children().is_empty());
}

// ============================================================================
// Entities
// ============================================================================

#[test]
fn add_light_registers_an_entity() {
    let mut scene = Scene::new();
    let handle = scene.add_light(Light::new_point(Vec3::ONE, 1.0, 10.0));

    assert_eq!(scene.entities.len(), 1);
    assert!(matches!(scene.entities[0].kind, EntityKind::Light(h) if h == handle));
    assert_eq!(scene.active_lights().count(), 1);
}

#[test]
fn hidden_entities_disable_their_payload() {
    let mut scene = Scene::new();
    scene.add_light(Light::new_point(Vec3::ONE, 1.0, 10.0));
    let texture = scene.add_texture(Image::white());
    scene.add_decal(Decal {
        transform: Transform::new(),
        albedo_texture: Some(texture),
        alpha: 0.5,
    });

    assert_eq!(scene.active_lights().count(), 1);
    assert_eq!(scene.active_decals().count(), 1);

    for entity in &mut scene.entities {
        entity.visible = false;
    }
    assert_eq!(scene.active_lights().count(), 0);
    assert_eq!(scene.active_decals().count(), 0);
}

// ============================================================================
// Transforms
// ============================================================================

#[test]
fn default_forward_is_negative_z() {
    assert!(approx_vec(Transform::new().forward(), Vec3::NEG_Z));
}

#[test]
fn look_at_aligns_forward_with_the_target() {
    let mut transform = Transform::from_position(Vec3::new(0.0, 5.0, 0.0));
    transform.look_at(Vec3::new(0.0, 0.0, -5.0), Vec3::Y);

    let expected = (Vec3::new(0.0, 0.0, -5.0) - transform.position).normalize();
    assert!(
        approx_vec(transform.forward(), expected),
        "forward {} should point at the target {expected}",
        transform.forward()
    );
}

#[test]
fn look_at_ignores_degenerate_targets() {
    let mut transform = Transform::new();
    let before = transform.rotation;
    transform.look_at(Vec3::ZERO, Vec3::Y); // target == position
    assert_eq!(transform.rotation, before);
}

#[test]
fn local_matrix_composes_trs() {
    let mut transform = Transform::from_position(Vec3::new(1.0, 2.0, 3.0));
    transform.scale = Vec3::splat(2.0);
    transform.rotation = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2);

    let m = transform.local_matrix_as_mat4();
    // A point on local +X lands on world -Z (rotated), doubled (scaled),
    // then offset by the translation
    let p = m.transform_point3(Vec3::X);
    assert!(
        approx_vec(p, Vec3::new(1.0, 2.0, 1.0)),
        "TRS order mismatch: got {p}"
    );
}
