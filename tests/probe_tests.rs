//! Irradiance Probe Tests
//!
//! Tests for:
//! - Probe grid position/index bijection
//! - Spherical-harmonic projection round trip of constant environments
//! - CPU-side irradiance sampling (nearest and trilinear)

use glam::{UVec3, Vec3};

use vesper::renderer::probes::{sample_irradiance, ProbeGrid};
use vesper::renderer::sh::{
    cube_face_direction, project_cube_faces, sh_basis, CubeFace, Sh9Color,
};

const EPSILON: f32 = 1e-3;

fn approx_vec(a: Vec3, b: Vec3) -> bool {
    (a - b).length() < EPSILON
}

// ============================================================================
// Probe Grid
// ============================================================================

#[test]
fn grid_positions_follow_start_plus_delta() {
    let grid = ProbeGrid {
        start: Vec3::new(-4.0, 0.0, -2.0),
        delta: Vec3::new(2.0, 1.0, 0.5),
        dims: UVec3::new(3, 4, 5),
    };

    for (index, position) in grid.iter() {
        let expected = grid.start + grid.delta * index.as_vec3();
        assert!(
            approx_vec(position, expected),
            "probe {index} position {position} != {expected}"
        );
    }
}

#[test]
fn grid_linear_index_is_a_bijection() {
    let grid = ProbeGrid {
        start: Vec3::ZERO,
        delta: Vec3::ONE,
        dims: UVec3::new(3, 4, 5),
    };

    let count = grid.probe_count();
    assert_eq!(count, 60);

    let mut seen = vec![false; count];
    for (index, _) in grid.iter() {
        let linear = grid.linear_index(index);
        assert!(linear < count, "index {linear} out of range");
        assert!(!seen[linear], "index {linear} assigned twice");
        seen[linear] = true;
    }
    assert!(seen.iter().all(|&s| s), "every slot must be covered");
}

#[test]
fn grid_iteration_matches_linear_order() {
    let grid = ProbeGrid {
        start: Vec3::ZERO,
        delta: Vec3::ONE,
        dims: UVec3::new(2, 3, 2),
    };
    for (expected, (index, _)) in grid.iter().enumerate() {
        assert_eq!(
            grid.linear_index(index),
            expected,
            "iteration order must match the lookup texture row order"
        );
    }
}

#[test]
fn grid_from_bounds_spans_the_box() {
    let grid = ProbeGrid::from_bounds(
        Vec3::new(-10.0, 0.0, -10.0),
        Vec3::new(10.0, 5.0, 10.0),
        UVec3::new(5, 2, 5),
    )
    .expect("valid grid");

    let last = grid.position(UVec3::new(4, 1, 4));
    assert!(approx_vec(last, Vec3::new(10.0, 5.0, 10.0)));

    assert!(
        ProbeGrid::from_bounds(Vec3::ZERO, Vec3::ONE, UVec3::new(0, 2, 2)).is_err(),
        "zero-sized grids are rejected"
    );
}

// ============================================================================
// Spherical Harmonics
// ============================================================================

#[test]
fn sh_round_trip_reconstructs_constant_environment() {
    let radiance = Vec3::new(0.3, 0.7, 1.2);
    let faces = std::array::from_fn(|_| CubeFace::solid(8, radiance));
    let sh = project_cube_faces(&faces);

    for dir in [
        Vec3::X,
        Vec3::NEG_X,
        Vec3::Y,
        Vec3::NEG_Y,
        Vec3::Z,
        Vec3::NEG_Z,
        Vec3::new(1.0, 1.0, 1.0).normalize(),
        Vec3::new(-0.3, 0.8, 0.2).normalize(),
    ] {
        let reconstructed = sh.eval(dir);
        assert!(
            approx_vec(reconstructed, radiance),
            "constant environment must reconstruct in direction {dir}: {reconstructed} vs {radiance}"
        );
    }
}

#[test]
fn sh_projection_of_black_environment_is_zero() {
    let faces = std::array::from_fn(|_| CubeFace::solid(4, Vec3::ZERO));
    let sh = project_cube_faces(&faces);
    assert!(approx_vec(sh.eval(Vec3::Y), Vec3::ZERO));
}

#[test]
fn sh_directional_environment_peaks_towards_the_bright_face() {
    // Only the +Y face is lit; the reconstruction must be brightest
    // looking up and darkest looking down
    let mut faces = std::array::from_fn(|_| CubeFace::solid(8, Vec3::ZERO));
    faces[2] = CubeFace::solid(8, Vec3::ONE); // +Y face
    let sh = project_cube_faces(&faces);

    let up = sh.eval(Vec3::Y).x;
    let down = sh.eval(Vec3::NEG_Y).x;
    let side = sh.eval(Vec3::X).x;
    assert!(up > side, "up ({up}) must be brighter than sideways ({side})");
    assert!(side > down, "sideways ({side}) must be brighter than down ({down})");
}

#[test]
fn cube_face_directions_align_with_face_axes() {
    // The center texel of each face looks along its axis
    let expected = [
        Vec3::X,
        Vec3::NEG_X,
        Vec3::Y,
        Vec3::NEG_Y,
        Vec3::Z,
        Vec3::NEG_Z,
    ];
    for (face, axis) in expected.iter().enumerate() {
        let dir = cube_face_direction(face, 0.0, 0.0);
        assert!(
            approx_vec(dir, *axis),
            "face {face} center direction {dir} != {axis}"
        );
    }
}

#[test]
fn sh_basis_dc_term_is_constant() {
    let a = sh_basis(Vec3::Y)[0];
    let b = sh_basis(Vec3::new(0.6, -0.48, 0.64).normalize())[0];
    assert!((a - b).abs() < 1e-6, "Y0 must not depend on direction");
}

// ============================================================================
// Volume Sampling
// ============================================================================

fn constant_probe(value: Vec3) -> Sh9Color {
    // A coefficient set whose evaluation is `value` in every direction:
    // only the DC term is populated
    let mut sh = Sh9Color::default();
    sh.coefficients[0] = value / 0.282_095;
    sh
}

#[test]
fn nearest_sampling_snaps_to_the_closest_probe() {
    let grid = ProbeGrid {
        start: Vec3::ZERO,
        delta: Vec3::splat(2.0),
        dims: UVec3::new(2, 1, 1),
    };
    let coefficients = vec![constant_probe(Vec3::ZERO), constant_probe(Vec3::ONE)];

    let near_first = sample_irradiance(&grid, &coefficients, false, Vec3::new(0.4, 0.0, 0.0), Vec3::Y);
    let near_second = sample_irradiance(&grid, &coefficients, false, Vec3::new(1.7, 0.0, 0.0), Vec3::Y);

    assert!(approx_vec(near_first, Vec3::ZERO));
    assert!(approx_vec(near_second, Vec3::ONE));
}

#[test]
fn trilinear_sampling_blends_neighbouring_probes() {
    let grid = ProbeGrid {
        start: Vec3::ZERO,
        delta: Vec3::splat(2.0),
        dims: UVec3::new(2, 1, 1),
    };
    let coefficients = vec![constant_probe(Vec3::ZERO), constant_probe(Vec3::ONE)];

    // At a probe position the blend equals that probe exactly
    let at_probe = sample_irradiance(&grid, &coefficients, true, Vec3::ZERO, Vec3::Y);
    assert!(approx_vec(at_probe, Vec3::ZERO));

    // Halfway between the two probes the blend is the average
    let halfway = sample_irradiance(&grid, &coefficients, true, Vec3::new(1.0, 0.0, 0.0), Vec3::Y);
    assert!(
        approx_vec(halfway, Vec3::splat(0.5)),
        "midpoint should blend 50/50, got {halfway}"
    );
}
