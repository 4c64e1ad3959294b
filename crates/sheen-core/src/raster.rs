//! CPU rasterizer for instanced quads
//!
//! Runs the vertex stage, covers pixel centers with the top-left fill rule,
//! shades and alpha-blends into a float framebuffer. Instances land in
//! submission order; rows are shaded in parallel.

use rayon::prelude::*;

use crate::atlas::Atlases;
use crate::color::{Color, linear_to_srgb};
use crate::error::Error;
use crate::fragment::{FragmentInput, shade_fragment};
use crate::instance::{Globals, InstanceRecord};
use crate::vertex::{AtlasExtents, VertexOutput, expand_instance};

/// Depth comparison applied before blending
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DepthCompare {
    /// No depth test, painter's order only
    #[default]
    Always,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

impl DepthCompare {
    pub fn passes(self, incoming: f32, stored: f32) -> bool {
        match self {
            DepthCompare::Always => true,
            DepthCompare::Less => incoming < stored,
            DepthCompare::LessEqual => incoming <= stored,
            DepthCompare::Greater => incoming > stored,
            DepthCompare::GreaterEqual => incoming >= stored,
        }
    }
}

/// Linear float render target with an attached depth buffer
#[derive(Debug, Clone)]
pub struct Framebuffer {
    width: u32,
    height: u32,
    color: Vec<Color>,
    depth: Vec<f32>,
}

impl Framebuffer {
    /// Transparent target, depth cleared to 1.0
    pub fn new(width: u32, height: u32) -> Result<Self, Error> {
        if width == 0 || height == 0 {
            return Err(Error::EmptyFramebuffer { width, height });
        }
        let len = width as usize * height as usize;
        Ok(Self {
            width,
            height,
            color: vec![Color::TRANSPARENT; len],
            depth: vec![1.0; len],
        })
    }

    pub fn clear(&mut self, color: Color, depth: f32) {
        self.color.fill(color);
        self.depth.fill(depth);
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> [u32; 2] {
        [self.width, self.height]
    }

    /// Uniforms for a draw that covers the whole target
    pub fn globals(&self) -> Globals {
        Globals::new(self.width, self.height)
    }

    pub fn pixel(&self, x: u32, y: u32) -> Color {
        self.color[self.index(x, y)]
    }

    pub fn depth(&self, x: u32, y: u32) -> f32 {
        self.depth[self.index(x, y)]
    }

    pub fn pixels(&self) -> &[Color] {
        &self.color
    }

    /// Quantize to 8 bits per channel, row-major.
    ///
    /// With `srgb` set the color channels are encoded the way an
    /// `Rgba8UnormSrgb` target stores them; alpha is never encoded.
    pub fn to_rgba8(&self, srgb: bool) -> Vec<u8> {
        self.color.iter().flat_map(|&c| encode(c, srgb).to_u8()).collect()
    }

    pub fn to_image(&self, srgb: bool) -> image::RgbaImage {
        image::RgbaImage::from_fn(self.width, self.height, |x, y| {
            image::Rgba(encode(self.pixel(x, y), srgb).to_u8())
        })
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }
}

fn encode(color: Color, srgb: bool) -> Color {
    if srgb {
        color.map_rgb(|c| linear_to_srgb(c.clamp(0.0, 1.0)))
    } else {
        color
    }
}

/// Counters from one [`Rasterizer::draw`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawStats {
    /// Instances that produced a non-empty footprint
    pub quads: usize,
    /// Fragments that passed the depth test and were blended
    pub fragments: u64,
}

/// Screen-space setup for one instance
struct QuadSetup {
    corners: [VertexOutput; 4],
    origin: [f32; 2],
    extent: [f32; 2],
    xs: std::ops::Range<u32>,
    ys: std::ops::Range<u32>,
}

impl QuadSetup {
    fn new(corners: [VertexOutput; 4], viewport: [u32; 2]) -> Option<Self> {
        let top_left = corners[0].window_position(viewport);
        let bottom_right = corners[3].window_position(viewport);

        let min = [top_left[0].min(bottom_right[0]), top_left[1].min(bottom_right[1])];
        let max = [top_left[0].max(bottom_right[0]), top_left[1].max(bottom_right[1])];

        // pixel (x, y) is covered when min <= x + 0.5 < max on both axes
        let span = |lo: f32, hi: f32, limit: u32| {
            let first = (lo - 0.5).ceil().clamp(0.0, limit as f32) as u32;
            let end = (hi - 0.5).ceil().clamp(0.0, limit as f32) as u32;
            first..end.max(first)
        };
        let xs = span(min[0], max[0], viewport[0]);
        let ys = span(min[1], max[1], viewport[1]);

        if xs.is_empty() || ys.is_empty() {
            return None;
        }

        Some(Self {
            corners,
            origin: top_left,
            extent: [bottom_right[0] - top_left[0], bottom_right[1] - top_left[1]],
            xs,
            ys,
        })
    }

    /// Varyings and depth at the center of pixel (`x`, `y`)
    fn fragment(&self, x: u32, y: u32) -> (FragmentInput, f32) {
        let s = (x as f32 + 0.5 - self.origin[0]) / self.extent[0];
        let t = (y as f32 + 0.5 - self.origin[1]) / self.extent[1];

        let top = self.corners[0].depth() + (self.corners[1].depth() - self.corners[0].depth()) * s;
        let bottom = self.corners[2].depth() + (self.corners[3].depth() - self.corners[2].depth()) * s;

        (FragmentInput::interpolate(&self.corners, s, t), top + (bottom - top) * t)
    }
}

/// Standard straight-alpha "over": color weighted by source alpha, alpha
/// accumulated as `src + dst * (1 - src)`
pub fn blend_over(src: Color, dst: Color) -> Color {
    let inv = 1.0 - src.a;
    Color {
        r: src.r * src.a + dst.r * inv,
        g: src.g * src.a + dst.g * inv,
        b: src.b * src.a + dst.b * inv,
        a: src.a + dst.a * inv,
    }
}

/// Draws instanced quads into a [`Framebuffer`]
#[derive(Debug, Clone, Copy, Default)]
pub struct Rasterizer {
    depth_compare: DepthCompare,
    depth_write: bool,
}

impl Rasterizer {
    /// Painter's order, no depth test or depth writes
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_depth_test(mut self, compare: DepthCompare, write: bool) -> Self {
        self.depth_compare = compare;
        self.depth_write = write;
        self
    }

    pub fn depth_compare(&self) -> DepthCompare {
        self.depth_compare
    }

    /// Draw `instances` in order, equivalent to one instanced draw call of
    /// four strip vertices per instance.
    ///
    /// The viewport is the full target; `globals` only feeds the vertex stage.
    pub fn draw(
        &self,
        target: &mut Framebuffer,
        globals: &Globals,
        atlases: &Atlases<'_>,
        instances: &[InstanceRecord],
    ) -> DrawStats {
        let extents = AtlasExtents::of(atlases);
        let viewport = target.size();

        let quads: Vec<QuadSetup> = instances
            .par_iter()
            .filter_map(|record| QuadSetup::new(expand_instance(record, globals, &extents), viewport))
            .collect();

        let width = target.width as usize;
        let compare = self.depth_compare;
        let write = self.depth_write;

        let fragments: u64 = target
            .color
            .par_chunks_mut(width)
            .zip(target.depth.par_chunks_mut(width))
            .enumerate()
            .map(|(y, (color_row, depth_row))| {
                let y = y as u32;
                let mut count = 0u64;
                for quad in quads.iter().filter(|q| q.ys.contains(&y)) {
                    for x in quad.xs.clone() {
                        let (input, depth) = quad.fragment(x, y);
                        // outside the clip volume, as the GPU clips it
                        if !(0.0..=1.0).contains(&depth) {
                            continue;
                        }
                        let slot = x as usize;
                        if !compare.passes(depth, depth_row[slot]) {
                            continue;
                        }
                        let src = shade_fragment(&input, atlases);
                        color_row[slot] = blend_over(src, color_row[slot]);
                        if write {
                            depth_row[slot] = depth;
                        }
                        count += 1;
                    }
                }
                count
            })
            .sum();

        log::debug!(
            "rasterized {} of {} instances, {} fragments",
            quads.len(),
            instances.len(),
            fragments
        );

        DrawStats {
            quads: quads.len(),
            fragments,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atlas::{ColorAtlas, MaskAtlas};
    use crate::color::pack_argb;
    use crate::instance::ContentType;

    fn white_atlases() -> (ColorAtlas, MaskAtlas) {
        let color = ColorAtlas::solid(8, 8, Color::WHITE).unwrap();
        let mut mask = MaskAtlas::new(8, 8).unwrap();
        mask.fill_rect(0, 0, 8, 8, 1.0);
        (color, mask)
    }

    fn covered(fb: &Framebuffer) -> Vec<(u32, u32)> {
        let mut out = Vec::new();
        for y in 0..fb.height() {
            for x in 0..fb.width() {
                if fb.pixel(x, y).a > 0.0 {
                    out.push((x, y));
                }
            }
        }
        out
    }

    #[test]
    fn test_empty_framebuffer_rejected() {
        assert!(matches!(Framebuffer::new(0, 4), Err(Error::EmptyFramebuffer { .. })));
    }

    #[test]
    fn test_footprint_exact() {
        let (color, mask) = white_atlases();
        let atlases = Atlases::new(&color, &mask);
        let mut fb = Framebuffer::new(16, 16).unwrap();
        let globals = fb.globals();

        let quad = InstanceRecord::new([3, 5], [4, 2], ContentType::Color);
        let stats = Rasterizer::new().draw(&mut fb, &globals, &atlases, &[quad]);

        let expected: Vec<_> = (5..7).flat_map(|y| (3..7).map(move |x| (x, y))).collect();
        assert_eq!(covered(&fb), expected);
        assert_eq!(stats, DrawStats { quads: 1, fragments: 8 });
    }

    #[test]
    fn test_adjacent_quads_do_not_overlap() {
        let (color, mask) = white_atlases();
        let atlases = Atlases::new(&color, &mask);
        let mut fb = Framebuffer::new(10, 10).unwrap();
        let globals = fb.globals();

        let left = InstanceRecord::new([0, 0], [5, 10], ContentType::Color);
        let right = InstanceRecord::new([5, 0], [5, 10], ContentType::Color);
        let stats = Rasterizer::new().draw(&mut fb, &globals, &atlases, &[left, right]);

        assert_eq!(stats.fragments, 100);
    }

    #[test]
    fn test_zero_size_and_offscreen_skipped() {
        let (color, mask) = white_atlases();
        let atlases = Atlases::new(&color, &mask);
        let mut fb = Framebuffer::new(8, 8).unwrap();
        let globals = fb.globals();

        let instances = [
            InstanceRecord::new([2, 2], [0, 4], ContentType::Color),
            InstanceRecord::new([-20, -20], [10, 10], ContentType::Color),
            InstanceRecord::new([6, 6], [10, 10], ContentType::Color),
        ];
        let stats = Rasterizer::new().draw(&mut fb, &globals, &atlases, &instances);

        assert_eq!(stats, DrawStats { quads: 1, fragments: 4 });
    }

    #[test]
    fn test_submission_order_wins() {
        let color = ColorAtlas::solid(1, 1, Color::WHITE).unwrap();
        let mut mask = MaskAtlas::new(1, 1).unwrap();
        mask.set(0, 0, 1.0);
        let atlases = Atlases::new(&color, &mask);
        let mut fb = Framebuffer::new(4, 4).unwrap();
        let globals = fb.globals();

        let red = InstanceRecord::new([0, 0], [4, 4], ContentType::Mask).with_color(pack_argb(255, 0, 0, 255));
        let blue = InstanceRecord::new([0, 0], [4, 4], ContentType::Mask).with_color(pack_argb(0, 0, 255, 255));
        Rasterizer::new().draw(&mut fb, &globals, &atlases, &[red, blue]);

        assert_eq!(fb.pixel(2, 2), Color::rgba(0.0, 0.0, 1.0, 1.0));
    }

    #[test]
    fn test_depth_test_keeps_nearest() {
        let color = ColorAtlas::solid(1, 1, Color::WHITE).unwrap();
        let mut mask = MaskAtlas::new(1, 1).unwrap();
        mask.set(0, 0, 1.0);
        let atlases = Atlases::new(&color, &mask);
        let mut fb = Framebuffer::new(4, 4).unwrap();
        let globals = fb.globals();

        let near = InstanceRecord::new([0, 0], [4, 4], ContentType::Mask)
            .with_color(pack_argb(255, 0, 0, 255))
            .with_depth(0.2);
        let far = InstanceRecord::new([0, 0], [4, 4], ContentType::Mask)
            .with_color(pack_argb(0, 255, 0, 255))
            .with_depth(0.6);

        let raster = Rasterizer::new().with_depth_test(DepthCompare::Less, true);
        let stats = raster.draw(&mut fb, &globals, &atlases, &[near, far]);

        assert_eq!(fb.pixel(1, 1), Color::rgba(1.0, 0.0, 0.0, 1.0));
        assert!((fb.depth(1, 1) - 0.2).abs() < 1e-6);
        assert_eq!(stats.fragments, 16);
    }

    #[test]
    fn test_depth_outside_clip_volume_is_clipped() {
        let (color, mask) = white_atlases();
        let atlases = Atlases::new(&color, &mask);
        let mut fb = Framebuffer::new(4, 4).unwrap();
        fb.clear(Color::TRANSPARENT, 1.0);
        let globals = fb.globals();

        let quads = [
            InstanceRecord::new([0, 0], [4, 4], ContentType::Color).with_depth(-0.5),
            InstanceRecord::new([0, 0], [4, 4], ContentType::Color).with_depth(1.5),
            InstanceRecord::new([0, 0], [4, 4], ContentType::Color).with_depth(f32::NAN),
        ];

        for raster in [
            Rasterizer::new(),
            Rasterizer::new().with_depth_test(DepthCompare::Less, true),
        ] {
            let stats = raster.draw(&mut fb, &globals, &atlases, &quads);
            assert_eq!(stats.fragments, 0);
            assert!(fb.pixels().iter().all(|&c| c == Color::TRANSPARENT));
            assert_eq!(fb.depth(1, 1), 1.0);
        }
    }

    #[test]
    fn test_depth_range_bounds_are_inclusive() {
        let (color, mask) = white_atlases();
        let atlases = Atlases::new(&color, &mask);
        let mut fb = Framebuffer::new(4, 4).unwrap();
        let globals = fb.globals();

        let quads = [
            InstanceRecord::new([0, 0], [2, 4], ContentType::Color).with_depth(0.0),
            InstanceRecord::new([2, 0], [2, 4], ContentType::Color).with_depth(1.0),
        ];
        let stats = Rasterizer::new().draw(&mut fb, &globals, &atlases, &quads);

        assert_eq!(stats.fragments, 16);
    }

    #[test]
    fn test_blend_over() {
        let dst = Color::rgba(0.0, 0.0, 1.0, 1.0);
        let src = Color::rgba(1.0, 0.0, 0.0, 0.5);
        let out = blend_over(src, dst);
        assert_eq!(out, Color::rgba(0.5, 0.0, 0.5, 1.0));

        assert_eq!(blend_over(Color::TRANSPARENT, dst), dst);
    }

    #[test]
    fn test_resolution_scales_footprint() {
        let (color, mask) = white_atlases();
        let atlases = Atlases::new(&color, &mask);
        let mut fb = Framebuffer::new(8, 8).unwrap();

        // uniforms describe a 4x4 screen, target is twice as large
        let globals = Globals::new(4, 4);
        let quad = InstanceRecord::new([1, 1], [2, 2], ContentType::Color);
        let stats = Rasterizer::new().draw(&mut fb, &globals, &atlases, &[quad]);

        assert_eq!(stats.fragments, 16);
        assert!(fb.pixel(2, 2).a > 0.0);
        assert_eq!(fb.pixel(1, 1).a, 0.0);
    }

    #[test]
    fn test_to_rgba8() {
        let mut fb = Framebuffer::new(2, 1).unwrap();
        fb.clear(Color::rgba(1.0, 0.0, 0.5, 1.0), 1.0);
        assert_eq!(fb.to_rgba8(false), vec![255, 0, 128, 255, 255, 0, 128, 255]);
        assert_eq!(fb.to_image(false).get_pixel(1, 0).0, [255, 0, 128, 255]);
    }

    #[test]
    fn test_to_rgba8_srgb_encodes_color_only() {
        let mut fb = Framebuffer::new(1, 1).unwrap();
        fb.clear(Color::rgba(0.2158, 1.0, 0.0, 0.5), 1.0);
        let [r, g, b, a] = fb.to_image(true).get_pixel(0, 0).0;
        assert!((127..=129).contains(&r));
        assert_eq!([g, b, a], [255, 0, 128]);
    }
}
