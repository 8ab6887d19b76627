//! Camera and Frustum Tests
//!
//! Tests for:
//! - Perspective/Orthographic projection matrix generation
//! - View-projection matrix update
//! - Frustum plane extraction (Gribb-Hartmann)
//! - Frustum-sphere intersection
//! - Frustum-box intersection (center + half-extent)

use glam::{Affine3A, Mat4, Vec3};

use vesper::scene::camera::{Camera, Frustum};

const EPSILON: f32 = 1e-4;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

// ============================================================================
// Projection Matrix Tests
// ============================================================================

#[test]
fn perspective_depth_range_is_zero_to_one() {
    let cam = Camera::new_perspective(60.0, 1.0, 0.1, 100.0);
    let proj = cam.view_projection_matrix();

    // Near plane maps to NDC z = 0 in the WGPU convention
    let near_point = proj * glam::Vec4::new(0.0, 0.0, -0.1, 1.0);
    let ndc_near = near_point.z / near_point.w;
    assert!(
        approx(ndc_near, 0.0),
        "near plane should map to NDC z=0, got {ndc_near}"
    );

    // Far plane maps to NDC z = 1
    let far_point = proj * glam::Vec4::new(0.0, 0.0, -100.0, 1.0);
    let ndc_far = far_point.z / far_point.w;
    assert!(
        approx(ndc_far, 1.0),
        "far plane should map to NDC z=1, got {ndc_far}"
    );
}

#[test]
fn perspective_aspect_ratio_affects_x_scaling() {
    let cam_wide = Camera::new_perspective(60.0, 2.0, 0.1, 100.0);
    let cam_square = Camera::new_perspective(60.0, 1.0, 0.1, 100.0);

    assert_ne!(
        cam_wide.view_projection_matrix().x_axis.x,
        cam_square.view_projection_matrix().x_axis.x,
        "different aspect ratios should produce different X scaling"
    );
}

#[test]
fn orthographic_camera_has_parallel_projection() {
    let cam = Camera::new_orthographic(10.0, 1.0, 0.1, 100.0);
    let proj = cam.view_projection_matrix();

    // Two points at the same XY but different depths project to the same XY
    let a = proj * glam::Vec4::new(3.0, 4.0, -1.0, 1.0);
    let b = proj * glam::Vec4::new(3.0, 4.0, -50.0, 1.0);
    assert!(approx(a.x / a.w, b.x / b.w));
    assert!(approx(a.y / a.w, b.y / b.w));
}

// ============================================================================
// View-Projection Update Tests
// ============================================================================

#[test]
fn view_matrix_is_inverse_of_world() {
    let mut cam = Camera::new_perspective(60.0, 1.0, 0.1, 100.0);
    let world = Affine3A::from_translation(Vec3::new(1.0, 2.0, 3.0));
    cam.update_view_projection(&world);

    let product = Mat4::from(world) * cam.view_matrix();
    for i in 0..4 {
        for j in 0..4 {
            assert!(
                approx(product.col(i)[j], Mat4::IDENTITY.col(i)[j]),
                "world * view should be identity at [{i}][{j}]"
            );
        }
    }
}

#[test]
fn eye_follows_world_translation() {
    let mut cam = Camera::new_perspective(60.0, 1.0, 0.1, 100.0);
    cam.update_view_projection(&Affine3A::from_translation(Vec3::new(0.0, 5.0, 10.0)));

    let eye = cam.eye();
    assert!(approx(eye.x, 0.0));
    assert!(approx(eye.y, 5.0));
    assert!(approx(eye.z, 10.0));
}

#[test]
fn look_at_points_camera_at_target() {
    let mut cam = Camera::new_perspective(60.0, 1.0, 0.1, 100.0);
    cam.look_at(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y);

    // The origin should sit in the center of the view, in front of the
    // camera
    let clip = cam.view_projection_matrix() * glam::Vec4::new(0.0, 0.0, 0.0, 1.0);
    assert!(clip.w > 0.0, "target should be in front of the camera");
    assert!(approx(clip.x / clip.w, 0.0));
    assert!(approx(clip.y / clip.w, 0.0));
}

// ============================================================================
// Frustum Intersection Tests
// ============================================================================

fn make_test_frustum() -> Frustum {
    // Camera at origin looking down -Z
    let proj = Mat4::perspective_rh(60.0_f32.to_radians(), 1.0, 0.1, 1000.0);
    Frustum::from_matrix(proj)
}

#[test]
fn frustum_sphere_inside() {
    let frustum = make_test_frustum();
    assert!(
        frustum.intersects_sphere(Vec3::new(0.0, 0.0, -5.0), 1.0),
        "sphere in front of the camera should intersect"
    );
}

#[test]
fn frustum_sphere_outside_left() {
    let frustum = make_test_frustum();
    assert!(
        !frustum.intersects_sphere(Vec3::new(-1000.0, 0.0, -5.0), 1.0),
        "sphere far to the left should be outside"
    );
}

#[test]
fn frustum_sphere_behind_camera() {
    let frustum = make_test_frustum();
    assert!(
        !frustum.intersects_sphere(Vec3::new(0.0, 0.0, 10.0), 1.0),
        "sphere behind the camera should be outside"
    );
}

#[test]
fn frustum_box_inside() {
    let frustum = make_test_frustum();
    assert!(
        frustum.intersects_box(Vec3::new(0.0, 0.0, -5.0), Vec3::splat(0.5)),
        "box in front of the camera should intersect"
    );
}

#[test]
fn frustum_box_fully_outside_one_plane() {
    let frustum = make_test_frustum();
    assert!(
        !frustum.intersects_box(Vec3::new(-500.0, 0.0, -5.0), Vec3::splat(1.0)),
        "box far outside the left plane must be rejected"
    );
    assert!(
        !frustum.intersects_box(Vec3::new(0.0, 0.0, -2000.0), Vec3::splat(1.0)),
        "box beyond the far plane must be rejected"
    );
}

#[test]
fn frustum_box_straddling_plane_is_kept() {
    let frustum = make_test_frustum();
    // A large box around the camera straddles several planes; the
    // conservative test must keep it
    assert!(frustum.intersects_box(Vec3::ZERO, Vec3::splat(100.0)));
}

#[test]
fn frustum_box_respects_half_extent() {
    let frustum = make_test_frustum();
    let center = Vec3::new(-8.0, 0.0, -5.0);
    // The center alone is outside the left plane, but a large half-extent
    // reaches back in
    assert!(!frustum.intersects_box(center, Vec3::splat(0.1)));
    assert!(frustum.intersects_box(center, Vec3::splat(10.0)));
}
