//! Post-Processing and SSAO Kernel Tests
//!
//! Tests for:
//! - Reinhard tonemap shape (monotonicity, white point, scale)
//! - Bright-pass threshold behavior
//! - SSAO hemisphere kernel generation

use glam::Vec3;

use vesper::renderer::passes::post::{bright_pass_keeps, luminance, reinhard_luminance};
use vesper::renderer::passes::ssao::{generate_hemisphere_kernel, MAX_KERNEL_POINTS};

const EPSILON: f32 = 1e-5;

// ============================================================================
// Reinhard Tonemap
// ============================================================================

#[test]
fn reinhard_is_monotonic() {
    let mut previous = -1.0;
    for step in 0..100 {
        let lum = step as f32 * 0.25;
        let mapped = reinhard_luminance(lum, 1.0, 1.0, 1.0);
        assert!(
            mapped > previous,
            "display luminance must increase with input luminance"
        );
        previous = mapped;
    }
}

#[test]
fn reinhard_maps_black_to_black() {
    assert!(reinhard_luminance(0.0, 1.0, 1.0, 1.0).abs() < EPSILON);
}

#[test]
fn reinhard_white_luminance_maps_to_one() {
    // With white = scaled luminance L, Ld = L(1 + L/L^2)/(1 + L) = 1
    let white = 4.0_f32;
    let mapped = reinhard_luminance(white, 1.0, white * white, 1.0);
    assert!(
        (mapped - 1.0).abs() < 1e-4,
        "the white point must map to display 1.0, got {mapped}"
    );
}

#[test]
fn reinhard_compresses_highlights() {
    // Doubling a bright input must far less than double the output once
    // the curve shoulders off below the white point
    let white_sq = 100.0;
    let a = reinhard_luminance(10.0, 1.0, white_sq, 1.0);
    let b = reinhard_luminance(20.0, 1.0, white_sq, 1.0);
    assert!(b < a * 1.5, "highlight compression expected: {a} -> {b}");
}

#[test]
fn reinhard_scale_brightens_proportionally_at_the_low_end() {
    let dim = reinhard_luminance(0.01, 1.0, 1.0, 1.0);
    let brighter = reinhard_luminance(0.01, 1.0, 1.0, 2.0);
    assert!(
        (brighter / dim - 2.0).abs() < 0.1,
        "scale acts linearly on dim pixels"
    );
}

// ============================================================================
// Bright Pass
// ============================================================================

#[test]
fn bright_pass_threshold_splits_on_luminance() {
    assert!(bright_pass_keeps(Vec3::splat(2.0), 1.0));
    assert!(!bright_pass_keeps(Vec3::splat(0.5), 1.0));

    // A saturated blue is dim in luminance terms
    let blue = Vec3::new(0.0, 0.0, 1.0);
    assert!(luminance(blue) < 0.1);
    assert!(!bright_pass_keeps(blue, 0.5));
}

#[test]
fn luminance_weights_sum_to_one() {
    assert!((luminance(Vec3::ONE) - 1.0).abs() < EPSILON);
}

// ============================================================================
// SSAO Kernel
// ============================================================================

#[test]
fn kernel_has_one_sample_per_requested_point() {
    for count in [1u32, 16, 32, 64] {
        let kernel = generate_hemisphere_kernel(count, 10.0);
        assert_eq!(kernel.len(), count as usize);
        assert!(
            kernel.iter().all(|p| p.truncate().length() > 1e-6),
            "no kernel slot may be left at zero"
        );
    }
}

#[test]
fn kernel_points_lie_in_the_upper_hemisphere() {
    let radius = 10.0;
    for p in generate_hemisphere_kernel(64, radius) {
        assert!(p.z >= 0.0, "hemisphere kernel must not dip below the surface");
        let len = p.truncate().length();
        assert!(
            len <= radius + EPSILON,
            "kernel point outside the radius: {len}"
        );
    }
}

#[test]
fn kernel_is_deterministic() {
    let a = generate_hemisphere_kernel(32, 5.0);
    let b = generate_hemisphere_kernel(32, 5.0);
    assert_eq!(a, b, "the kernel is seeded and must not change per frame");
}

#[test]
fn kernel_count_is_clamped_to_capacity() {
    let kernel = generate_hemisphere_kernel(500, 1.0);
    assert_eq!(kernel.len(), MAX_KERNEL_POINTS);
}
