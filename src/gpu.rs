//! GPU device bootstrap and headless scene rendering

use sheen_core::AtlasKind;
use sheen_renderer::{GpuAtlas, HeadlessTarget, QuadRenderer, RenderError};

use crate::render::RenderSettings;
use crate::scene::Scene;

/// Device and queue for offscreen rendering
pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub adapter_info: wgpu::AdapterInfo,
}

impl GpuContext {
    /// Pick the default adapter and open a device on it
    pub fn new() -> Result<Self, RenderError> {
        pollster::block_on(Self::new_async())
    }

    async fn new_async() -> Result<Self, RenderError> {
        log::debug!("Initializing GPU context");
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await?;

        let adapter_info = adapter.get_info();
        log::debug!("GPU adapter: {:?} ({:?})", adapter_info.name, adapter_info.backend);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Sheen Device"),
                ..Default::default()
            })
            .await?;

        log::debug!("GPU device created successfully");

        Ok(Self {
            device,
            queue,
            adapter_info,
        })
    }
}

/// Render `scene` through the wgpu pipeline and read the result back
pub fn render_gpu(
    gpu: &GpuContext,
    scene: &Scene,
    settings: &RenderSettings,
) -> Result<image::RgbaImage, RenderError> {
    let device = &gpu.device;
    let queue = &gpu.queue;

    let color_kind = settings.color_mode.color_atlas_kind();
    let color = GpuAtlas::from_data(
        device,
        queue,
        color_kind,
        scene.color_atlas.width(),
        scene.color_atlas.height(),
        scene.color_atlas.as_raw(),
    )?;
    let mask = GpuAtlas::from_data(
        device,
        queue,
        AtlasKind::Mask,
        scene.mask_atlas.width(),
        scene.mask_atlas.height(),
        scene.mask_atlas.as_raw(),
    )?;

    let mut renderer = QuadRenderer::new(device, settings.filter, settings.max_instances);
    renderer.bind_atlases(device, &color, &mask);

    let format = if settings.srgb_target() {
        wgpu::TextureFormat::Rgba8UnormSrgb
    } else {
        wgpu::TextureFormat::Rgba8Unorm
    };
    let target = HeadlessTarget::new(device, scene.width, scene.height, format)?;

    target.draw(
        device,
        queue,
        &mut renderer,
        &scene.instances,
        settings.linear_clear(),
        settings.depth,
    )?;

    let image = target.read_rgba8(device, queue)?;
    log::info!("GPU render: {} quads on {}", renderer.instance_count(), gpu.adapter_info.name);
    Ok(image)
}
