//! Soft shadow kernel for mask content
//!
//! The shadow at a fragment is the strongest attenuated coverage found in a
//! disc of mask texels around it. Taking the maximum instead of a weighted sum
//! keeps the result bounded by `intensity` without any normalization.

use crate::atlas::{Sampler, Texture};

/// Largest radius, in texels, the kernel will ever visit
pub const MAX_SHADOW_RADIUS: i32 = 5;

/// Padding glyph rasterizers should leave around masks that cast shadows
pub const SHADOW_MARGIN_PX: u32 = MAX_SHADOW_RADIUS as u32;

/// Samples at or below this coverage are ignored
pub const COVERAGE_EPSILON: f32 = 0.01;

/// Hermite step, matching WGSL `smoothstep`
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Shadow strength at `uv` in [0, `intensity`].
///
/// Returns 0 without touching the mask when `radius` is not positive.
pub fn shadow_value<T: Texture + ?Sized>(
    mask: &T,
    sampler: &Sampler,
    uv: [f32; 2],
    radius: f32,
    intensity: f32,
) -> f32 {
    // also rejects NaN
    if !(radius > 0.0) {
        return 0.0;
    }

    let [width, height] = mask.dimensions();
    let texel_size = [1.0 / width as f32, 1.0 / height as f32];
    let reach = (radius.ceil() as i32).min(MAX_SHADOW_RADIUS);
    let radius_sq = radius * radius;

    let mut shadow = 0.0f32;
    for dy in -reach..=reach {
        for dx in -reach..=reach {
            let dist_sq = (dx * dx + dy * dy) as f32;
            if dist_sq > radius_sq {
                continue;
            }

            let sample_uv = [
                uv[0] - dx as f32 * texel_size[0],
                uv[1] - dy as f32 * texel_size[1],
            ];
            let coverage = mask.sample(sampler, sample_uv)[0];
            if coverage <= COVERAGE_EPSILON {
                continue;
            }

            let falloff = 1.0 - smoothstep(0.0, radius, dist_sq.sqrt());
            shadow = shadow.max(coverage * intensity * falloff);
        }
    }

    shadow
}
