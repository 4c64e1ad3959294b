//! Scene rendering on the CPU reference rasterizer

use sheen_core::{Atlases, Color, ColorMode, DepthCompare, FilterMode, Framebuffer, Globals, Rasterizer, Sampler};

use crate::scene::Scene;

/// Everything besides the scene that affects the output image
#[derive(Debug, Clone, Copy)]
pub struct RenderSettings {
    pub color_mode: ColorMode,
    pub filter: FilterMode,
    pub depth: DepthCompare,
    /// Clear color as written in the config (sRGB encoded in accurate mode)
    pub clear: Color,
    pub max_instances: usize,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            color_mode: ColorMode::Accurate,
            filter: FilterMode::Nearest,
            depth: DepthCompare::Always,
            clear: Color::rgba(0.0, 0.0, 0.0, 1.0),
            max_instances: 16 * 1024,
        }
    }
}

impl RenderSettings {
    /// The output target stores sRGB and blends in linear space
    pub fn srgb_target(&self) -> bool {
        matches!(self.color_mode, ColorMode::Accurate)
    }

    /// Clear color in the space blending happens in
    pub fn linear_clear(&self) -> Color {
        if self.srgb_target() {
            self.clear.map_rgb(sheen_core::srgb_to_linear)
        } else {
            self.clear
        }
    }
}

/// Rasterize `scene` on the CPU and return the encoded output image
pub fn render_cpu(scene: &Scene, settings: &RenderSettings) -> Result<image::RgbaImage, sheen_core::Error> {
    let (color, mask) = scene.cpu_atlases(settings.color_mode)?;
    let atlases = Atlases::new(&color, &mask).with_sampler(Sampler { filter: settings.filter });

    let mut framebuffer = Framebuffer::new(scene.width, scene.height)?;
    framebuffer.clear(settings.linear_clear(), 1.0);

    let rasterizer = Rasterizer::new().with_depth_test(settings.depth, settings.depth != DepthCompare::Always);

    let instances = if scene.instances.len() > settings.max_instances {
        log::warn!(
            "Dropping {} quads over instance capacity {}",
            scene.instances.len() - settings.max_instances,
            settings.max_instances
        );
        &scene.instances[..settings.max_instances]
    } else {
        &scene.instances[..]
    };

    let globals = Globals::new(scene.width, scene.height);
    let stats = rasterizer.draw(&mut framebuffer, &globals, &atlases, instances);
    log::info!("CPU render: {} quads, {} fragments", stats.quads, stats.fragments);

    Ok(framebuffer.to_image(settings.srgb_target()))
}
