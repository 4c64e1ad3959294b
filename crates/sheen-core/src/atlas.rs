//! CPU-side atlas textures and sampling
//!
//! These mirror what the GPU pipeline binds in group 0: an RGBA color atlas
//! and a single channel coverage atlas, read through one sampler at an
//! explicit level of detail. The kernel borrows them immutably for a draw.

use crate::color::{Color, srgb_to_linear};
use crate::error::Error;
use crate::instance::ContentType;

/// The two atlas flavors and how their texels are stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AtlasKind {
    /// One 8-bit coverage channel
    Mask,
    /// Four 8-bit channels; `srgb` means texels are sRGB encoded and the
    /// texture decodes them on read
    Color { srgb: bool },
}

impl AtlasKind {
    pub fn num_channels(self) -> usize {
        match self {
            AtlasKind::Mask => 1,
            AtlasKind::Color { .. } => 4,
        }
    }

    pub fn content_type(self) -> ContentType {
        match self {
            AtlasKind::Mask => ContentType::Mask,
            AtlasKind::Color { .. } => ContentType::Color,
        }
    }
}

/// Color management strategy for the color atlas and instance colors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorMode {
    /// sRGB texture for the color atlas, instance colors linearized per vertex.
    /// Blending happens in linear space.
    #[default]
    Accurate,
    /// sRGB data stored in a linear texture and instance colors passed raw,
    /// which reproduces how browsers and most UI toolkits blend.
    Web,
}

impl ColorMode {
    pub fn color_atlas_kind(self) -> AtlasKind {
        AtlasKind::Color {
            srgb: matches!(self, ColorMode::Accurate),
        }
    }

    /// Value for the sRGB decode flag on instances rendered in this mode
    pub fn instance_srgb(self) -> bool {
        matches!(self, ColorMode::Accurate)
    }
}

/// Texel filter used by [`Sampler`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode {
    #[default]
    Nearest,
    Linear,
}

/// Clamp-to-edge sampler reading mip level 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Sampler {
    pub filter: FilterMode,
}

impl Sampler {
    pub const NEAREST: Self = Self {
        filter: FilterMode::Nearest,
    };

    pub const LINEAR: Self = Self {
        filter: FilterMode::Linear,
    };

    /// Texel fetch plan for `uv`: up to four texel coordinates with weights
    fn taps(&self, uv: [f32; 2], [width, height]: [u32; 2]) -> [([u32; 2], f32); 4] {
        let clamp = |v: i64, max: u32| v.clamp(0, max as i64 - 1) as u32;
        let x = uv[0] * width as f32;
        let y = uv[1] * height as f32;

        match self.filter {
            FilterMode::Nearest => {
                let texel = [clamp(x.floor() as i64, width), clamp(y.floor() as i64, height)];
                [(texel, 1.0), ([0, 0], 0.0), ([0, 0], 0.0), ([0, 0], 0.0)]
            }
            FilterMode::Linear => {
                let (x, y) = (x - 0.5, y - 0.5);
                let (x0, y0) = (x.floor(), y.floor());
                let (fx, fy) = (x - x0, y - y0);
                let (x0, y0) = (x0 as i64, y0 as i64);
                let (ax, bx) = (clamp(x0, width), clamp(x0 + 1, width));
                let (ay, by) = (clamp(y0, height), clamp(y0 + 1, height));
                [
                    ([ax, ay], (1.0 - fx) * (1.0 - fy)),
                    ([bx, ay], fx * (1.0 - fy)),
                    ([ax, by], (1.0 - fx) * fy),
                    ([bx, by], fx * fy),
                ]
            }
        }
    }
}

/// Read-only texture access used by the vertex and fragment kernels
pub trait Texture {
    /// Texture size in texels
    fn dimensions(&self) -> [u32; 2];

    /// Raw texel at integer coordinates, already decoded to floats
    fn texel(&self, x: u32, y: u32) -> [f32; 4];

    /// Sample at normalized `uv` with an explicit level of detail of 0
    fn sample(&self, sampler: &Sampler, uv: [f32; 2]) -> [f32; 4] {
        let mut out = [0.0; 4];
        for ([x, y], weight) in sampler.taps(uv, self.dimensions()) {
            if weight == 0.0 {
                continue;
            }
            let texel = self.texel(x, y);
            for (o, t) in out.iter_mut().zip(texel) {
                *o += t * weight;
            }
        }
        out
    }
}

fn check_dimensions(width: u32, height: u32) -> Result<(), Error> {
    if width == 0 || height == 0 {
        return Err(Error::EmptyAtlas { width, height });
    }
    Ok(())
}

fn check_length(width: u32, height: u32, kind: AtlasKind, actual: usize) -> Result<(), Error> {
    check_dimensions(width, height)?;
    let channels = kind.num_channels();
    let expected = width as usize * height as usize * channels;
    if actual != expected {
        return Err(Error::AtlasDataLength {
            width,
            height,
            channels,
            expected,
            actual,
        });
    }
    Ok(())
}

/// Texels of a `size` texture whose centers lie within `radius` of `center`
pub fn disc_texels(center: [f32; 2], radius: f32, size: [u32; 2]) -> impl Iterator<Item = (u32, u32)> {
    let min_x = (center[0] - radius).floor().max(0.0) as u32;
    let min_y = (center[1] - radius).floor().max(0.0) as u32;
    let max_x = ((center[0] + radius).ceil().max(0.0) as u32).min(size[0]);
    let max_y = ((center[1] + radius).ceil().max(0.0) as u32).min(size[1]);

    (min_y..max_y)
        .flat_map(move |y| (min_x..max_x).map(move |x| (x, y)))
        .filter(move |&(x, y)| {
            let dx = x as f32 + 0.5 - center[0];
            let dy = y as f32 + 0.5 - center[1];
            dx * dx + dy * dy <= radius * radius
        })
}

/// RGBA atlas holding straight (non-premultiplied) linear texels
#[derive(Debug, Clone, PartialEq)]
pub struct ColorAtlas {
    width: u32,
    height: u32,
    texels: Vec<[f32; 4]>,
}

impl ColorAtlas {
    /// Atlas filled with a single color
    pub fn solid(width: u32, height: u32, color: Color) -> Result<Self, Error> {
        check_dimensions(width, height)?;
        Ok(Self {
            width,
            height,
            texels: vec![color.to_array(); width as usize * height as usize],
        })
    }

    /// Build from tightly packed RGBA8 bytes.
    ///
    /// With `srgb` set the color channels are decoded the way an
    /// `Rgba8UnormSrgb` texture would decode them; alpha stays linear.
    pub fn from_rgba8(width: u32, height: u32, data: &[u8], srgb: bool) -> Result<Self, Error> {
        check_length(width, height, AtlasKind::Color { srgb }, data.len())?;

        let decode = |v: u8| {
            let c = v as f32 / 255.0;
            if srgb { srgb_to_linear(c) } else { c }
        };

        let texels = data
            .chunks_exact(4)
            .map(|px| [decode(px[0]), decode(px[1]), decode(px[2]), px[3] as f32 / 255.0])
            .collect();

        Ok(Self {
            width,
            height,
            texels,
        })
    }

    pub fn from_image(image: &image::RgbaImage, srgb: bool) -> Result<Self, Error> {
        Self::from_rgba8(image.width(), image.height(), image.as_raw(), srgb)
    }

    /// Paint an axis-aligned block of texels, clipped to the atlas
    pub fn fill_rect(&mut self, x: u32, y: u32, width: u32, height: u32, color: Color) {
        let x_end = x.saturating_add(width).min(self.width);
        let y_end = y.saturating_add(height).min(self.height);
        for ty in y.min(self.height)..y_end {
            for tx in x.min(self.width)..x_end {
                let idx = self.index(tx, ty);
                self.texels[idx] = color.to_array();
            }
        }
    }

    pub fn set(&mut self, x: u32, y: u32, color: Color) {
        if x < self.width && y < self.height {
            let idx = self.index(x, y);
            self.texels[idx] = color.to_array();
        }
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }
}

impl Texture for ColorAtlas {
    fn dimensions(&self) -> [u32; 2] {
        [self.width, self.height]
    }

    fn texel(&self, x: u32, y: u32) -> [f32; 4] {
        self.texels[self.index(x, y)]
    }
}

/// Single channel coverage atlas, values in [0, 1]
#[derive(Debug, Clone, PartialEq)]
pub struct MaskAtlas {
    width: u32,
    height: u32,
    coverage: Vec<f32>,
}

impl MaskAtlas {
    /// Empty (zero coverage) atlas
    pub fn new(width: u32, height: u32) -> Result<Self, Error> {
        check_dimensions(width, height)?;
        Ok(Self {
            width,
            height,
            coverage: vec![0.0; width as usize * height as usize],
        })
    }

    /// Build from tightly packed R8 bytes
    pub fn from_r8(width: u32, height: u32, data: &[u8]) -> Result<Self, Error> {
        check_length(width, height, AtlasKind::Mask, data.len())?;
        Ok(Self {
            width,
            height,
            coverage: data.iter().map(|&v| v as f32 / 255.0).collect(),
        })
    }

    pub fn from_image(image: &image::GrayImage) -> Result<Self, Error> {
        Self::from_r8(image.width(), image.height(), image.as_raw())
    }

    /// Set every texel whose center lies within `radius` of `center` (texel
    /// space) to `value`
    pub fn fill_disc(&mut self, center: [f32; 2], radius: f32, value: f32) {
        for (x, y) in disc_texels(center, radius, [self.width, self.height]) {
            self.set(x, y, value);
        }
    }

    /// Fill a block of texels, clipped to the atlas
    pub fn fill_rect(&mut self, x: u32, y: u32, width: u32, height: u32, value: f32) {
        let x_end = x.saturating_add(width).min(self.width);
        let y_end = y.saturating_add(height).min(self.height);
        for ty in y.min(self.height)..y_end {
            for tx in x.min(self.width)..x_end {
                self.set(tx, ty, value);
            }
        }
    }

    pub fn set(&mut self, x: u32, y: u32, value: f32) {
        if x < self.width && y < self.height {
            let idx = y as usize * self.width as usize + x as usize;
            self.coverage[idx] = value.clamp(0.0, 1.0);
        }
    }

    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.coverage[y as usize * self.width as usize + x as usize]
    }
}

impl Texture for MaskAtlas {
    fn dimensions(&self) -> [u32; 2] {
        [self.width, self.height]
    }

    fn texel(&self, x: u32, y: u32) -> [f32; 4] {
        [self.get(x, y), 0.0, 0.0, 1.0]
    }
}

/// Borrowed view of everything bound in group 0 for one draw
#[derive(Clone, Copy)]
pub struct Atlases<'a> {
    pub color: &'a ColorAtlas,
    pub mask: &'a MaskAtlas,
    pub sampler: Sampler,
}

impl<'a> Atlases<'a> {
    pub fn new(color: &'a ColorAtlas, mask: &'a MaskAtlas) -> Self {
        Self {
            color,
            mask,
            sampler: Sampler::NEAREST,
        }
    }

    pub fn with_sampler(mut self, sampler: Sampler) -> Self {
        self.sampler = sampler;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_channels() {
        assert_eq!(AtlasKind::Mask.num_channels(), 1);
        assert_eq!(AtlasKind::Color { srgb: true }.num_channels(), 4);
        assert_eq!(AtlasKind::Mask.content_type(), ContentType::Mask);
    }

    #[test]
    fn test_color_mode() {
        assert_eq!(ColorMode::Accurate.color_atlas_kind(), AtlasKind::Color { srgb: true });
        assert_eq!(ColorMode::Web.color_atlas_kind(), AtlasKind::Color { srgb: false });
        assert!(ColorMode::Accurate.instance_srgb());
        assert!(!ColorMode::Web.instance_srgb());
    }

    #[test]
    fn test_rejects_wrong_length() {
        let err = MaskAtlas::from_r8(4, 4, &[0; 15]).unwrap_err();
        assert!(matches!(err, Error::AtlasDataLength { expected: 16, actual: 15, .. }));

        let err = ColorAtlas::from_rgba8(2, 2, &[0; 4], false).unwrap_err();
        assert!(matches!(err, Error::AtlasDataLength { channels: 4, expected: 16, .. }));

        assert!(matches!(MaskAtlas::new(0, 8), Err(Error::EmptyAtlas { .. })));
    }

    #[test]
    fn test_nearest_sample_hits_texel() {
        let mut mask = MaskAtlas::new(8, 8).unwrap();
        mask.set(3, 5, 1.0);

        // center of texel (3, 5)
        let uv = [3.5 / 8.0, 5.5 / 8.0];
        assert_eq!(mask.sample(&Sampler::NEAREST, uv)[0], 1.0);
        assert_eq!(mask.sample(&Sampler::NEAREST, [2.5 / 8.0, 5.5 / 8.0])[0], 0.0);
    }

    #[test]
    fn test_sample_clamps_to_edge() {
        let mut mask = MaskAtlas::new(4, 4).unwrap();
        mask.set(0, 0, 0.75);
        mask.set(3, 3, 0.25);

        assert_eq!(mask.sample(&Sampler::NEAREST, [-1.0, -3.0])[0], 0.75);
        assert_eq!(mask.sample(&Sampler::NEAREST, [2.0, 1.5])[0], 0.25);
        assert_eq!(mask.sample(&Sampler::LINEAR, [-1.0, -1.0])[0], 0.75);
    }

    #[test]
    fn test_linear_sample_blends() {
        let mut mask = MaskAtlas::new(2, 1).unwrap();
        mask.set(1, 0, 1.0);

        // halfway between the two texel centers
        let v = mask.sample(&Sampler::LINEAR, [0.5, 0.5])[0];
        assert!((v - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_srgb_color_atlas_decodes_on_load() {
        let atlas = ColorAtlas::from_rgba8(1, 1, &[255, 0, 128, 128], true).unwrap();
        let texel = atlas.texel(0, 0);
        assert!((texel[0] - 1.0).abs() < 1e-6);
        assert_eq!(texel[1], 0.0);
        assert!(texel[2] < 0.25);
        assert_eq!(texel[3], 128.0 / 255.0);
    }

    #[test]
    fn test_fill_disc() {
        let mut mask = MaskAtlas::new(16, 16).unwrap();
        mask.fill_disc([8.0, 8.0], 2.0, 1.0);

        assert_eq!(mask.get(7, 7), 1.0);
        assert_eq!(mask.get(8, 8), 1.0);
        assert_eq!(mask.get(8, 5), 0.0);
        assert_eq!(mask.get(11, 8), 0.0);
    }

    #[test]
    fn test_disc_texels_clip_to_texture() {
        let texels: Vec<_> = disc_texels([0.5, 0.5], 1.0, [4, 4]).collect();
        assert_eq!(texels, vec![(0, 0), (1, 0), (0, 1)]);

        assert_eq!(disc_texels([-8.0, -8.0], 2.0, [4, 4]).count(), 0);
        assert_eq!(disc_texels([2.0, 2.0], 0.0, [4, 4]).count(), 0);
    }

    #[test]
    fn test_fill_rect_clips() {
        let mut atlas = ColorAtlas::solid(4, 4, Color::TRANSPARENT).unwrap();
        atlas.fill_rect(2, 2, 10, 10, Color::WHITE);
        assert_eq!(atlas.texel(3, 3), Color::WHITE.to_array());
        assert_eq!(atlas.texel(1, 1), Color::TRANSPARENT.to_array());
    }
}
