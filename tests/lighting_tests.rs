//! Light Accumulation Tests
//!
//! CPU-side property tests over the reference lighting math:
//! - Additive commutativity across light order
//! - Ambient single-counting regardless of light count
//! - Distance attenuation and spot falloff shape
//! - Shadow visibility boundary
//! - Alpha-mask cutoff
//! - Shadow caster selection policy (nearest-N)

use glam::Vec3;

use vesper::renderer::passes::lighting::{
    accumulate_lights, distance_attenuation, shade_direct, shadow_visibility, spot_falloff,
    SurfaceSample,
};
use vesper::renderer::passes::shadow::select_shadow_casters;
use vesper::resources::material::{alpha_test, AlphaMode};
use vesper::scene::{Light, Scene};

const EPSILON: f32 = 1e-5;

fn approx_vec(a: Vec3, b: Vec3) -> bool {
    (a - b).length() < EPSILON
}

fn test_surface() -> SurfaceSample {
    SurfaceSample {
        position: Vec3::ZERO,
        normal: Vec3::Y,
        albedo: Vec3::new(0.8, 0.6, 0.4),
        metallic: 0.2,
        roughness: 0.7,
        emissive: Vec3::ZERO,
        occlusion: 1.0,
    }
}

// ============================================================================
// Accumulation Properties
// ============================================================================

#[test]
fn light_accumulation_is_commutative() {
    let surface = test_surface();
    let camera = Vec3::new(0.0, 5.0, 5.0);
    let ambient = Vec3::splat(0.1);

    let mut l1 = Light::new_point(Vec3::new(1.0, 0.9, 0.8), 2.0, 50.0);
    l1.transform.position = Vec3::new(3.0, 4.0, 0.0);
    let mut l2 = Light::new_directional(Vec3::new(0.2, 0.3, 1.0), 1.5, 100.0);
    l2.transform.look_at(Vec3::new(0.0, -1.0, -0.2), Vec3::Y);

    let forward = accumulate_lights(&[&l1, &l2], ambient, Vec3::ZERO, &surface, camera);
    let reversed = accumulate_lights(&[&l2, &l1], ambient, Vec3::ZERO, &surface, camera);

    assert!(
        approx_vec(forward, reversed),
        "light order must not change the result: {forward} vs {reversed}"
    );
}

#[test]
fn ambient_is_counted_exactly_once() {
    let surface = test_surface();
    let camera = Vec3::new(0.0, 5.0, 5.0);
    let ambient = Vec3::splat(0.25);

    // Lights that contribute no color: the result must be exactly
    // material * ambient however many of them the scene has
    let black = Light::new_point(Vec3::ZERO, 0.0, 10.0);
    let expected = ambient * surface.albedo;

    for count in 0..4 {
        let lights: Vec<&Light> = std::iter::repeat_n(&black, count).collect();
        let color = accumulate_lights(&lights, ambient, Vec3::ZERO, &surface, camera);
        assert!(
            approx_vec(color, expected),
            "{count} black lights: ambient must appear once, got {color} vs {expected}"
        );
    }
}

#[test]
fn occlusion_scales_the_ambient_term_only() {
    let mut surface = test_surface();
    let camera = Vec3::new(0.0, 5.0, 5.0);
    let ambient = Vec3::splat(0.5);

    let mut light = Light::new_directional(Vec3::ONE, 1.0, 100.0);
    light.transform.look_at(Vec3::NEG_Y, Vec3::Z);

    surface.occlusion = 1.0;
    let lit = accumulate_lights(&[&light], ambient, Vec3::ZERO, &surface, camera);
    surface.occlusion = 0.0;
    let occluded = accumulate_lights(&[&light], ambient, Vec3::ZERO, &surface, camera);

    let direct = shade_direct(&light, &surface, camera);
    assert!(
        approx_vec(occluded, direct),
        "fully occluded ambient leaves only the direct term"
    );
    assert!(
        approx_vec(lit - occluded, ambient * surface.albedo),
        "the difference must be exactly the ambient term"
    );
}

// ============================================================================
// Attenuation and Falloff
// ============================================================================

#[test]
fn distance_attenuation_is_monotonic_and_clamped() {
    assert!((distance_attenuation(0.0, 10.0) - 1.0).abs() < EPSILON);
    let mut previous = f32::INFINITY;
    for step in 0..=10 {
        let a = distance_attenuation(step as f32, 10.0);
        assert!(a <= previous, "attenuation must not increase with distance");
        previous = a;
    }
    assert_eq!(distance_attenuation(10.0, 10.0), 0.0);
    assert_eq!(distance_attenuation(25.0, 10.0), 0.0, "beyond range is zero");
}

#[test]
fn spot_falloff_is_zero_outside_the_cone() {
    let cos_cutoff = 30.0_f32.to_radians().cos();
    assert_eq!(spot_falloff(cos_cutoff - 0.01, cos_cutoff, 10.0), 0.0);
    assert!((spot_falloff(1.0, cos_cutoff, 10.0) - 1.0).abs() < EPSILON);
    let inside = spot_falloff(cos_cutoff + 0.05, cos_cutoff, 10.0);
    assert!(inside > 0.0 && inside < 1.0);
}

#[test]
fn point_light_beyond_range_contributes_nothing() {
    let surface = test_surface();
    let mut light = Light::new_point(Vec3::ONE, 5.0, 10.0);
    light.transform.position = Vec3::new(0.0, 50.0, 0.0);

    let color = shade_direct(&light, &surface, Vec3::new(0.0, 5.0, 5.0));
    assert!(approx_vec(color, Vec3::ZERO));
}

#[test]
fn surface_facing_away_receives_no_direct_light() {
    let mut surface = test_surface();
    surface.normal = Vec3::NEG_Y;
    let mut light = Light::new_point(Vec3::ONE, 5.0, 100.0);
    light.transform.position = Vec3::new(0.0, 10.0, 0.0);

    let color = shade_direct(&light, &surface, Vec3::new(0.0, 5.0, 5.0));
    assert!(approx_vec(color, Vec3::ZERO), "N.L clamps to zero");
}

// ============================================================================
// Shadow Boundary
// ============================================================================

#[test]
fn point_behind_occluder_is_fully_shadowed() {
    let stored = 0.5;
    let bias = 0.01;
    // Strictly deeper than stored + bias: occluded
    assert_eq!(shadow_visibility(stored, 0.6, bias), 0.0);
    // In front of the occluder: fully lit
    assert_eq!(shadow_visibility(stored, 0.4, bias), 1.0);
    // Within the bias band: fully lit (no acne)
    assert_eq!(shadow_visibility(stored, stored + bias * 0.5, bias), 1.0);
}

// ============================================================================
// Alpha Mask
// ============================================================================

#[test]
fn alpha_mask_discards_below_cutoff_only() {
    assert!(!alpha_test(0.49, AlphaMode::Mask, 0.5));
    assert!(alpha_test(0.5, AlphaMode::Mask, 0.5), "at the cutoff draws");
    assert!(alpha_test(0.51, AlphaMode::Mask, 0.5));

    // Opaque and blend modes never discard
    assert!(alpha_test(0.0, AlphaMode::Opaque, 0.5));
    assert!(alpha_test(0.0, AlphaMode::Blend, 0.5));
}

// ============================================================================
// Shadow Caster Policy
// ============================================================================

#[test]
fn shadow_casters_are_the_nearest_n() {
    let mut scene = Scene::new();
    let mut handles = Vec::new();
    for x in [30.0, 5.0, 60.0, 12.0] {
        let mut light = Light::new_spot(Vec3::ONE, 1.0, 50.0, 0.5, 8.0);
        light.transform.position = Vec3::new(x, 10.0, 0.0);
        light.cast_shadows = true;
        handles.push(scene.add_light(light));
    }

    let casters = select_shadow_casters(&scene, Vec3::ZERO, 2);
    assert_eq!(casters.len(), 2);
    assert_eq!(casters[0].light, handles[1], "nearest light wins");
    assert_eq!(casters[1].light, handles[3]);
}

#[test]
fn directional_casters_always_win() {
    let mut scene = Scene::new();
    let mut near_spot = Light::new_spot(Vec3::ONE, 1.0, 50.0, 0.5, 8.0);
    near_spot.transform.position = Vec3::new(1.0, 1.0, 0.0);
    near_spot.cast_shadows = true;
    scene.add_light(near_spot);

    let mut sun = Light::new_directional(Vec3::ONE, 1.0, 100.0);
    sun.transform.position = Vec3::new(0.0, 500.0, 0.0);
    sun.transform.look_at(Vec3::ZERO, Vec3::Z);
    sun.cast_shadows = true;
    let sun_handle = scene.add_light(sun);

    let casters = select_shadow_casters(&scene, Vec3::ZERO, 1);
    assert_eq!(casters.len(), 1);
    assert_eq!(
        casters[0].light, sun_handle,
        "directional lights sort at distance zero"
    );
}

#[test]
fn point_lights_never_cast_shadows() {
    let mut scene = Scene::new();
    let mut point = Light::new_point(Vec3::ONE, 1.0, 50.0);
    point.cast_shadows = true;
    scene.add_light(point);

    assert!(select_shadow_casters(&scene, Vec3::ZERO, 5).is_empty());
}

#[test]
fn shadow_matrix_matches_the_light_frustum() {
    // The published sampling matrix must be byte-identical to the one the
    // depth pass renders with
    let mut scene = Scene::new();
    let mut spot = Light::new_spot(Vec3::ONE, 1.0, 50.0, 0.6, 4.0);
    spot.transform.position = Vec3::new(0.0, 10.0, 0.0);
    spot.transform.look_at(Vec3::ZERO, Vec3::Z);
    spot.cast_shadows = true;
    let handle = scene.add_light(spot);

    let casters = select_shadow_casters(&scene, Vec3::ZERO, 5);
    let expected = scene.lights[handle]
        .shadow_view_projection()
        .expect("spot lights have a shadow frustum");
    assert_eq!(casters[0].view_projection, expected);
}
