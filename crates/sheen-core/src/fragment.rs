//! Per-fragment shading
//!
//! Dispatches on the flat content type: color quads return the atlas texel,
//! mask quads tint the coverage with the instance color and merge in the
//! shadow. Anything else is transparent.

use crate::atlas::{Atlases, Texture};
use crate::color::Color;
use crate::instance::ContentType;
use crate::shadow::shadow_value;
use crate::vertex::VertexOutput;

/// Color the shadow fades toward where the glyph has no coverage
pub const SHADOW_COLOR: Color = Color::BLACK;

/// Interpolated varyings for one fragment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FragmentInput {
    pub color: Color,
    pub uv: [f32; 2],
    pub content_type: u32,
    pub shadow_radius: f32,
    pub shadow_intensity: f32,
}

impl FragmentInput {
    /// Bilinear blend of the four quad corners at (`s`, `t`) across the quad.
    ///
    /// Flat fields come from corner 0, the first vertex of the strip.
    pub fn interpolate(corners: &[VertexOutput; 4], s: f32, t: f32) -> Self {
        let lerp2 = |a: [f32; 2], b: [f32; 2], t: f32| {
            [a[0] + (b[0] - a[0]) * t, a[1] + (b[1] - a[1]) * t]
        };

        let top = corners[0].color.lerp(corners[1].color, s);
        let bottom = corners[2].color.lerp(corners[3].color, s);
        let uv_top = lerp2(corners[0].uv, corners[1].uv, s);
        let uv_bottom = lerp2(corners[2].uv, corners[3].uv, s);

        Self {
            color: top.lerp(bottom, t),
            uv: lerp2(uv_top, uv_bottom, t),
            content_type: corners[0].content_type,
            shadow_radius: corners[0].shadow_radius,
            shadow_intensity: corners[0].shadow_intensity,
        }
    }
}

impl From<&VertexOutput> for FragmentInput {
    fn from(v: &VertexOutput) -> Self {
        Self {
            color: v.color,
            uv: v.uv,
            content_type: v.content_type,
            shadow_radius: v.shadow_radius,
            shadow_intensity: v.shadow_intensity,
        }
    }
}

/// Straight-alpha output color for one fragment
pub fn shade_fragment(input: &FragmentInput, atlases: &Atlases<'_>) -> Color {
    match ContentType::from_raw(input.content_type) {
        Some(ContentType::Color) => Color::from(atlases.color.sample(&atlases.sampler, input.uv)),
        Some(ContentType::Mask) => shade_mask(input, atlases),
        None => Color::TRANSPARENT,
    }
}

fn shade_mask(input: &FragmentInput, atlases: &Atlases<'_>) -> Color {
    let glyph_alpha = atlases.mask.sample(&atlases.sampler, input.uv)[0];

    let shadow = shadow_value(
        atlases.mask,
        &atlases.sampler,
        input.uv,
        input.shadow_radius,
        input.shadow_intensity,
    );
    let shape_alpha = glyph_alpha.max(shadow).clamp(0.0, 1.0);

    Color {
        a: input.color.a * shape_alpha,
        ..SHADOW_COLOR.lerp(input.color, glyph_alpha)
    }
}
