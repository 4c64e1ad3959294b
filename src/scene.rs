//! Scene files: atlases plus a list of quads, described in TOML
//!
//! ```toml
//! width = 256
//! height = 128
//!
//! [atlas.color]
//! path = "sprites.png"
//!
//! [atlas.mask]
//! size = [64, 64]
//!
//! [[mask_disc]]
//! center = [16.0, 16.0]
//! radius = 8.0
//!
//! [[quad]]
//! position = [20, 20]
//! size = [32, 32]
//! content = "mask"
//! color = "#ffcc00ff"
//! shadow = { radius = 3.0, intensity = 0.6 }
//! ```
//!
//! Colors are written as sRGB hex. Relative image paths resolve against the
//! scene file's directory.

use std::fs;
use std::path::{Path, PathBuf};

use image::{GrayImage, Luma, Rgba, RgbaImage};
use serde::Deserialize;
use sheen_core::{ColorAtlas, ColorMode, ContentType, InstanceRecord, MaskAtlas, disc_texels, pack_argb, parse_hex_rgba};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("Failed to read {0:?}: {1}")]
    Read(PathBuf, std::io::Error),

    #[error("Failed to parse scene: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to load image {0:?}: {1}")]
    Image(PathBuf, image::ImageError),

    #[error("Invalid color {0:?}, expected #RRGGBB or #RRGGBBAA")]
    InvalidColor(String),

    #[error("{0} atlas needs either `path` or `size`")]
    MissingAtlasSize(&'static str),

    #[error(transparent)]
    Core(#[from] sheen_core::Error),
}

/// Values a scene falls back to when it does not set them
#[derive(Debug, Clone, Copy)]
pub struct SceneDefaults {
    pub width: u32,
    pub height: u32,
    pub shadow_radius: f32,
    pub shadow_intensity: f32,
    pub color_mode: ColorMode,
}

impl Default for SceneDefaults {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            shadow_radius: 0.0,
            shadow_intensity: 0.0,
            color_mode: ColorMode::Accurate,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SceneFile {
    width: Option<u32>,
    height: Option<u32>,
    #[serde(default)]
    atlas: AtlasSection,
    #[serde(default)]
    color_rect: Vec<ColorRect>,
    #[serde(default)]
    mask_rect: Vec<MaskRect>,
    #[serde(default)]
    mask_disc: Vec<MaskDisc>,
    #[serde(default)]
    quad: Vec<QuadEntry>,
}

#[derive(Debug, Default, Deserialize)]
struct AtlasSection {
    color: Option<ColorSource>,
    mask: Option<MaskSource>,
}

#[derive(Debug, Deserialize)]
struct ColorSource {
    path: Option<PathBuf>,
    size: Option<[u32; 2]>,
    #[serde(default = "default_color_fill")]
    fill: String,
}

fn default_color_fill() -> String {
    "#00000000".to_string()
}

#[derive(Debug, Deserialize)]
struct MaskSource {
    path: Option<PathBuf>,
    size: Option<[u32; 2]>,
    #[serde(default)]
    fill: f32,
}

#[derive(Debug, Deserialize)]
struct ColorRect {
    origin: [u32; 2],
    size: [u32; 2],
    color: String,
}

#[derive(Debug, Deserialize)]
struct MaskRect {
    origin: [u32; 2],
    size: [u32; 2],
    #[serde(default = "default_coverage")]
    value: f32,
}

#[derive(Debug, Deserialize)]
struct MaskDisc {
    center: [f32; 2],
    radius: f32,
    #[serde(default = "default_coverage")]
    value: f32,
}

fn default_coverage() -> f32 {
    1.0
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ContentKind {
    Color,
    #[default]
    Mask,
}

#[derive(Debug, Deserialize)]
struct ShadowEntry {
    radius: f32,
    intensity: f32,
}

#[derive(Debug, Deserialize)]
struct QuadEntry {
    position: [i32; 2],
    size: [u16; 2],
    #[serde(default)]
    uv: [u16; 2],
    #[serde(default = "default_quad_color")]
    color: String,
    #[serde(default)]
    content: ContentKind,
    /// Raw content type, overrides `content`
    content_type: Option<u16>,
    srgb: Option<bool>,
    #[serde(default)]
    depth: f32,
    shadow: Option<ShadowEntry>,
}

fn default_quad_color() -> String {
    "#ffffffff".to_string()
}

/// A loaded scene, ready for either backend
#[derive(Debug, Clone)]
pub struct Scene {
    pub width: u32,
    pub height: u32,
    /// Color atlas texels as stored (sRGB encoded in accurate mode)
    pub color_atlas: RgbaImage,
    pub mask_atlas: GrayImage,
    pub instances: Vec<InstanceRecord>,
}

impl Scene {
    /// Load a scene file from disk
    pub fn load(path: &Path, defaults: &SceneDefaults) -> Result<Self, SceneError> {
        let content = fs::read_to_string(path).map_err(|e| SceneError::Read(path.to_path_buf(), e))?;
        let base_dir = path.parent().unwrap_or(Path::new("."));
        let scene = Self::from_toml(&content, base_dir, defaults)?;
        log::info!(
            "Loaded scene {:?}: {}x{}, {} quads",
            path,
            scene.width,
            scene.height,
            scene.instances.len()
        );
        Ok(scene)
    }

    /// Parse a scene from TOML, resolving image paths against `base_dir`
    pub fn from_toml(source: &str, base_dir: &Path, defaults: &SceneDefaults) -> Result<Self, SceneError> {
        let file: SceneFile = toml::from_str(source)?;

        let mut color_atlas = match &file.atlas.color {
            Some(source) => load_color_source(source, base_dir)?,
            None => RgbaImage::new(1, 1),
        };
        let mut mask_atlas = match &file.atlas.mask {
            Some(source) => load_mask_source(source, base_dir)?,
            None => GrayImage::new(1, 1),
        };

        for rect in &file.color_rect {
            let color = parse_color(&rect.color)?;
            fill_rect(&mut color_atlas, rect.origin, rect.size, Rgba(color));
        }
        for rect in &file.mask_rect {
            fill_rect(&mut mask_atlas, rect.origin, rect.size, Luma([coverage_byte(rect.value)]));
        }
        for disc in &file.mask_disc {
            fill_disc(&mut mask_atlas, disc.center, disc.radius, coverage_byte(disc.value));
        }

        let instances = file
            .quad
            .iter()
            .map(|quad| build_instance(quad, defaults))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            width: file.width.unwrap_or(defaults.width),
            height: file.height.unwrap_or(defaults.height),
            color_atlas,
            mask_atlas,
            instances,
        })
    }

    /// CPU copies of the atlases, decoded as the GPU textures would be
    pub fn cpu_atlases(&self, color_mode: ColorMode) -> Result<(ColorAtlas, MaskAtlas), sheen_core::Error> {
        let srgb = matches!(color_mode.color_atlas_kind(), sheen_core::AtlasKind::Color { srgb: true });
        Ok((
            ColorAtlas::from_image(&self.color_atlas, srgb)?,
            MaskAtlas::from_image(&self.mask_atlas)?,
        ))
    }
}

fn parse_color(hex: &str) -> Result<[u8; 4], SceneError> {
    parse_hex_rgba(hex).ok_or_else(|| SceneError::InvalidColor(hex.to_string()))
}

fn coverage_byte(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0 + 0.5) as u8
}

fn resolve(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() { path.to_path_buf() } else { base_dir.join(path) }
}

fn load_color_source(source: &ColorSource, base_dir: &Path) -> Result<RgbaImage, SceneError> {
    if let Some(path) = &source.path {
        let path = resolve(base_dir, path);
        let image = image::open(&path).map_err(|e| SceneError::Image(path.clone(), e))?;
        return Ok(image.to_rgba8());
    }

    let [width, height] = source.size.ok_or(SceneError::MissingAtlasSize("color"))?;
    if width == 0 || height == 0 {
        return Err(sheen_core::Error::EmptyAtlas { width, height }.into());
    }
    Ok(RgbaImage::from_pixel(width, height, Rgba(parse_color(&source.fill)?)))
}

fn load_mask_source(source: &MaskSource, base_dir: &Path) -> Result<GrayImage, SceneError> {
    if let Some(path) = &source.path {
        let path = resolve(base_dir, path);
        let image = image::open(&path).map_err(|e| SceneError::Image(path.clone(), e))?;
        return Ok(image.to_luma8());
    }

    let [width, height] = source.size.ok_or(SceneError::MissingAtlasSize("mask"))?;
    if width == 0 || height == 0 {
        return Err(sheen_core::Error::EmptyAtlas { width, height }.into());
    }
    Ok(GrayImage::from_pixel(width, height, Luma([coverage_byte(source.fill)])))
}

fn fill_rect<P: image::Pixel>(image: &mut image::ImageBuffer<P, Vec<P::Subpixel>>, origin: [u32; 2], size: [u32; 2], value: P) {
    let x_end = origin[0].saturating_add(size[0]).min(image.width());
    let y_end = origin[1].saturating_add(size[1]).min(image.height());
    for y in origin[1]..y_end {
        for x in origin[0]..x_end {
            image.put_pixel(x, y, value);
        }
    }
}

fn fill_disc(image: &mut GrayImage, center: [f32; 2], radius: f32, value: u8) {
    let size = [image.width(), image.height()];
    for (x, y) in disc_texels(center, radius, size) {
        image.put_pixel(x, y, Luma([value]));
    }
}

fn build_instance(quad: &QuadEntry, defaults: &SceneDefaults) -> Result<InstanceRecord, SceneError> {
    let [r, g, b, a] = parse_color(&quad.color)?;
    let content = match quad.content {
        ContentKind::Color => ContentType::Color,
        ContentKind::Mask => ContentType::Mask,
    };

    let mut record = InstanceRecord::new(quad.position, quad.size, content)
        .with_uv(quad.uv)
        .with_color(pack_argb(r, g, b, a))
        .with_srgb(quad.srgb.unwrap_or(defaults.color_mode.instance_srgb()))
        .with_depth(quad.depth);

    if let Some(raw) = quad.content_type {
        record = record.with_raw_content_type(raw);
    }

    record = match &quad.shadow {
        Some(shadow) => record.with_shadow(shadow.radius, shadow.intensity),
        None if content == ContentType::Mask => record.with_shadow(defaults.shadow_radius, defaults.shadow_intensity),
        None => record,
    };

    Ok(record)
}

/// One line per instance, as printed by `sheen inspect`
pub fn describe_instance(index: usize, record: &InstanceRecord) -> String {
    let content = match record.content_type() {
        Some(ContentType::Color) => "color".to_string(),
        Some(ContentType::Mask) => "mask".to_string(),
        None => format!("unknown({})", record.content_type_raw()),
    };
    let color = record.decoded_color();

    format!(
        "#{index:<4} pos=({}, {}) size={}x{} uv=({}, {}) content={content} srgb={} \
         color=({:.3}, {:.3}, {:.3}, {:.3}) depth={} shadow=({}, {})",
        record.position[0],
        record.position[1],
        record.width(),
        record.height(),
        record.uv_origin()[0],
        record.uv_origin()[1],
        record.srgb(),
        color.r,
        color.g,
        color.b,
        color.a,
        record.depth,
        record.shadow_radius,
        record.shadow_intensity,
    )
}
