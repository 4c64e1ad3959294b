//! End-to-end tests of the CPU kernel
//!
//! Each test builds a small batch of instance records, runs the vertex and
//! fragment stages through `Rasterizer::draw` and checks individual pixels.

mod common;

use common::{assert_color_eq, glyph_mask, split_color_atlas, transparent_framebuffer};
use sheen_core::{
    Atlases, Color, ColorAtlas, ContentType, DepthCompare, Error, InstanceRecord, MaskAtlas, Rasterizer, pack_argb,
};

const WHITE: u32 = pack_argb(255, 255, 255, 255);
const RED: u32 = pack_argb(255, 0, 0, 255);
const BLUE: u32 = pack_argb(0, 0, 255, 255);

fn full_mask() -> MaskAtlas {
    let mut mask = MaskAtlas::new(8, 8).unwrap();
    mask.fill_rect(0, 0, 8, 8, 1.0);
    mask
}

// === Glyphs and shadows ===

#[test]
fn test_glyph_with_shadow() {
    let color = ColorAtlas::solid(1, 1, Color::WHITE).unwrap();
    let mask = glyph_mask();
    let atlases = Atlases::new(&color, &mask);
    let mut fb = transparent_framebuffer(32, 32);
    let globals = fb.globals();

    let glyph = InstanceRecord::new([0, 0], [32, 32], ContentType::Mask)
        .with_color(WHITE)
        .with_shadow(3.0, 1.0);
    Rasterizer::new().draw(&mut fb, &globals, &atlases, &[glyph]);

    // inside the glyph: full tint
    assert_color_eq(fb.pixel(16, 16), Color::WHITE, 1e-6);

    // two texels past the edge: black shadow at 1 - smoothstep(0, 3, 2)
    let shadow = fb.pixel(20, 16);
    assert_eq!((shadow.r, shadow.g, shadow.b), (0.0, 0.0, 0.0));
    assert!((shadow.a - 7.0 / 27.0).abs() < 1e-4, "shadow alpha {}", shadow.a);

    // outside the kernel reach
    assert_eq!(fb.pixel(28, 16), Color::TRANSPARENT);
}

#[test]
fn test_glyph_without_shadow_has_hard_edge() {
    let color = ColorAtlas::solid(1, 1, Color::WHITE).unwrap();
    let mask = glyph_mask();
    let atlases = Atlases::new(&color, &mask);
    let mut fb = transparent_framebuffer(32, 32);
    let globals = fb.globals();

    let glyph = InstanceRecord::new([0, 0], [32, 32], ContentType::Mask).with_color(WHITE);
    Rasterizer::new().draw(&mut fb, &globals, &atlases, &[glyph]);

    assert_eq!(fb.pixel(18, 16).a, 1.0);
    assert_eq!(fb.pixel(19, 16), Color::TRANSPARENT);
}

#[test]
fn test_shadow_radius_is_capped() {
    let color = ColorAtlas::solid(1, 1, Color::WHITE).unwrap();
    let mask = glyph_mask();
    let atlases = Atlases::new(&color, &mask);
    let mut fb = transparent_framebuffer(32, 32);
    let globals = fb.globals();

    let glyph = InstanceRecord::new([0, 0], [32, 32], ContentType::Mask)
        .with_color(WHITE)
        .with_shadow(50.0, 1.0);
    Rasterizer::new().draw(&mut fb, &globals, &atlases, &[glyph]);

    // nearest coverage is at texel 18, six texels away: beyond the kernel
    assert_eq!(fb.pixel(24, 16).a, 0.0);
    assert!(fb.pixel(23, 16).a > 0.0);
}

#[test]
fn test_glyph_alpha_scales_with_instance_alpha() {
    let color = ColorAtlas::solid(1, 1, Color::WHITE).unwrap();
    let mask = full_mask();
    let atlases = Atlases::new(&color, &mask);
    let mut fb = transparent_framebuffer(8, 8);
    let globals = fb.globals();

    let glyph = InstanceRecord::new([0, 0], [8, 8], ContentType::Mask).with_color(pack_argb(0, 255, 0, 51));
    Rasterizer::new().draw(&mut fb, &globals, &atlases, &[glyph]);

    assert_color_eq(fb.pixel(4, 4), Color::rgba(0.0, 0.2, 0.0, 0.2), 1e-6);
}

// === Color content ===

#[test]
fn test_color_quad_samples_atlas() {
    let color = split_color_atlas();
    let mask = MaskAtlas::new(1, 1).unwrap();
    let atlases = Atlases::new(&color, &mask);
    let mut fb = transparent_framebuffer(8, 8);
    let globals = fb.globals();

    // the instance color never tints image content
    let quad = InstanceRecord::new([2, 2], [4, 4], ContentType::Color).with_color(pack_argb(0, 255, 0, 255));
    let stats = Rasterizer::new().draw(&mut fb, &globals, &atlases, &[quad]);

    assert_eq!(stats.fragments, 16);
    assert_eq!(fb.pixel(2, 2), Color::rgba(1.0, 0.0, 0.0, 1.0));
    assert_eq!(fb.pixel(5, 5), Color::rgba(0.0, 0.0, 1.0, 1.0));
    assert_eq!(fb.pixel(1, 1), Color::TRANSPARENT);
    assert_eq!(fb.pixel(6, 6), Color::TRANSPARENT);
}

#[test]
fn test_red_square_from_packed_record() {
    let color = ColorAtlas::solid(1, 1, Color::rgba(1.0, 0.0, 0.0, 1.0)).unwrap();
    let mask = MaskAtlas::new(1, 1).unwrap();
    let atlases = Atlases::new(&color, &mask);
    let mut fb = transparent_framebuffer(40, 40);
    let globals = fb.globals();

    // dim packs width low, height high
    let quad = InstanceRecord {
        dim: (20 << 16) | 20,
        ..InstanceRecord::new([10, 10], [0, 0], ContentType::Color)
    };
    let stats = Rasterizer::new().draw(&mut fb, &globals, &atlases, &[quad]);
    assert_eq!(stats.fragments, 400);

    for y in 0..40 {
        for x in 0..40 {
            let inside = (10..30).contains(&x) && (10..30).contains(&y);
            let expected = if inside { Color::rgba(1.0, 0.0, 0.0, 1.0) } else { Color::TRANSPARENT };
            assert_eq!(fb.pixel(x, y), expected, "pixel ({x}, {y})");
        }
    }
}

#[test]
fn test_color_quad_uv_offset() {
    let color = split_color_atlas();
    let mask = MaskAtlas::new(1, 1).unwrap();
    let atlases = Atlases::new(&color, &mask);
    let mut fb = transparent_framebuffer(4, 4);
    let globals = fb.globals();

    // a 2x2 window into the blue half
    let quad = InstanceRecord::new([0, 0], [2, 2], ContentType::Color).with_uv([2, 1]);
    Rasterizer::new().draw(&mut fb, &globals, &atlases, &[quad]);

    assert_eq!(fb.pixel(0, 0), Color::rgba(0.0, 0.0, 1.0, 1.0));
    assert_eq!(fb.pixel(1, 1), Color::rgba(0.0, 0.0, 1.0, 1.0));
}

#[test]
fn test_unknown_content_type_draws_nothing() {
    let color = split_color_atlas();
    let mask = full_mask();
    let atlases = Atlases::new(&color, &mask);
    let mut fb = transparent_framebuffer(8, 8);
    let globals = fb.globals();

    let quad = InstanceRecord::new([0, 0], [8, 8], ContentType::Color).with_raw_content_type(7);
    let stats = Rasterizer::new().draw(&mut fb, &globals, &atlases, &[quad]);

    assert_eq!(stats.quads, 1);
    assert!(fb.pixels().iter().all(|&c| c == Color::TRANSPARENT));
}

// === Footprint and ordering ===

#[test]
fn test_offscreen_quads_are_skipped() {
    let color = split_color_atlas();
    let mask = full_mask();
    let atlases = Atlases::new(&color, &mask);
    let mut fb = transparent_framebuffer(8, 8);
    let globals = fb.globals();

    let quads = [
        InstanceRecord::new([-10, -10], [4, 4], ContentType::Mask),
        InstanceRecord::new([8, 0], [4, 4], ContentType::Mask),
        InstanceRecord::new([0, 0], [0, 4], ContentType::Mask),
    ];
    let stats = Rasterizer::new().draw(&mut fb, &globals, &atlases, &quads);

    assert_eq!(stats.quads, 0);
    assert_eq!(stats.fragments, 0);
}

#[test]
fn test_partially_offscreen_quad_is_clipped() {
    let color = ColorAtlas::solid(1, 1, Color::WHITE).unwrap();
    let mask = full_mask();
    let atlases = Atlases::new(&color, &mask);
    let mut fb = transparent_framebuffer(8, 8);
    let globals = fb.globals();

    let quad = InstanceRecord::new([-2, 6], [4, 4], ContentType::Mask).with_color(WHITE);
    let stats = Rasterizer::new().draw(&mut fb, &globals, &atlases, &[quad]);

    assert_eq!(stats.fragments, 4);
    assert_eq!(fb.pixel(0, 6).a, 1.0);
    assert_eq!(fb.pixel(1, 7).a, 1.0);
    assert_eq!(fb.pixel(2, 6).a, 0.0);
}

#[test]
fn test_submission_order_wins_without_depth() {
    let color = ColorAtlas::solid(1, 1, Color::WHITE).unwrap();
    let mask = full_mask();
    let atlases = Atlases::new(&color, &mask);
    let mut fb = transparent_framebuffer(8, 8);
    let globals = fb.globals();

    let quads = [
        InstanceRecord::new([0, 0], [4, 4], ContentType::Mask).with_color(RED).with_depth(0.2),
        InstanceRecord::new([2, 2], [4, 4], ContentType::Mask).with_color(BLUE).with_depth(0.5),
    ];
    Rasterizer::new().draw(&mut fb, &globals, &atlases, &quads);

    assert_eq!(fb.pixel(1, 1), Color::rgba(1.0, 0.0, 0.0, 1.0));
    assert_eq!(fb.pixel(3, 3), Color::rgba(0.0, 0.0, 1.0, 1.0));
}

#[test]
fn test_depth_less_keeps_nearer_quad() {
    let color = ColorAtlas::solid(1, 1, Color::WHITE).unwrap();
    let mask = full_mask();
    let atlases = Atlases::new(&color, &mask);
    let mut fb = transparent_framebuffer(8, 8);
    let globals = fb.globals();

    let quads = [
        InstanceRecord::new([0, 0], [4, 4], ContentType::Mask).with_color(RED).with_depth(0.2),
        InstanceRecord::new([2, 2], [4, 4], ContentType::Mask).with_color(BLUE).with_depth(0.5),
    ];
    let stats = Rasterizer::new()
        .with_depth_test(DepthCompare::Less, true)
        .draw(&mut fb, &globals, &atlases, &quads);

    // the four overlapping fragments of the second quad fail
    assert_eq!(stats.fragments, 28);
    assert_eq!(fb.pixel(3, 3), Color::rgba(1.0, 0.0, 0.0, 1.0));
    assert_eq!(fb.pixel(5, 5), Color::rgba(0.0, 0.0, 1.0, 1.0));
    assert_eq!(fb.depth(3, 3), 0.2);
    assert_eq!(fb.depth(5, 5), 0.5);
    assert_eq!(fb.depth(7, 7), 1.0);
}

#[test]
fn test_translucent_quads_blend_in_order() {
    let color = ColorAtlas::solid(1, 1, Color::WHITE).unwrap();
    let mask = full_mask();
    let atlases = Atlases::new(&color, &mask);
    let mut fb = transparent_framebuffer(2, 2);
    fb.clear(Color::BLACK, 1.0);
    let globals = fb.globals();

    let half_white = pack_argb(255, 255, 255, 0x80);
    let quads = [
        InstanceRecord::new([0, 0], [2, 2], ContentType::Mask).with_color(half_white),
        InstanceRecord::new([0, 0], [2, 2], ContentType::Mask).with_color(half_white),
    ];
    Rasterizer::new().draw(&mut fb, &globals, &atlases, &quads);

    let a = 128.0 / 255.0;
    let once = a;
    let twice = a + once * (1.0 - a);
    assert_color_eq(fb.pixel(0, 0), Color::rgba(twice, twice, twice, 1.0), 1e-5);
}

// === Instance buffers ===

#[test]
fn test_instance_buffer_from_bytes() {
    let records = vec![
        InstanceRecord::new([1, 2], [3, 4], ContentType::Mask).with_color(RED),
        InstanceRecord::new([-5, 6], [7, 8], ContentType::Color).with_uv([9, 10]),
    ];
    let bytes = InstanceRecord::as_bytes(&records);
    assert_eq!(bytes.len(), 2 * InstanceRecord::SIZE);
    assert_eq!(InstanceRecord::from_bytes(bytes).unwrap(), records);

    assert!(matches!(
        InstanceRecord::from_bytes(&bytes[..40]),
        Err(Error::InstanceBufferLength { .. })
    ));
}
