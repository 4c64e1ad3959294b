//! GPU atlas textures
//!
//! Upstream packers own allocation and eviction. This type only holds the
//! texture and accepts region uploads into it.

use sheen_core::AtlasKind;

use crate::error::RenderError;

/// Texture format backing an atlas of `kind`
pub fn texture_format(kind: AtlasKind) -> wgpu::TextureFormat {
    match kind {
        AtlasKind::Mask => wgpu::TextureFormat::R8Unorm,
        AtlasKind::Color { srgb: true } => wgpu::TextureFormat::Rgba8UnormSrgb,
        AtlasKind::Color { srgb: false } => wgpu::TextureFormat::Rgba8Unorm,
    }
}

/// Validate a `[x, y, width, height]` region against an atlas of `size`
/// and return the tightly packed row length in bytes
fn check_region(kind: AtlasKind, size: [u32; 2], region: [u32; 4], len: usize) -> Result<u32, RenderError> {
    let [x, y, width, height] = region;
    let [atlas_width, atlas_height] = size;

    let fits = x.checked_add(width).is_some_and(|r| r <= atlas_width)
        && y.checked_add(height).is_some_and(|b| b <= atlas_height);
    if !fits {
        return Err(RenderError::RegionOutOfBounds {
            x,
            y,
            width,
            height,
            atlas_width,
            atlas_height,
        });
    }

    let bytes_per_row = width * kind.num_channels() as u32;
    let expected = bytes_per_row as usize * height as usize;
    if len != expected {
        return Err(RenderError::RegionDataLength { expected, actual: len });
    }

    Ok(bytes_per_row)
}

/// A color or mask atlas living on the GPU
pub struct GpuAtlas {
    kind: AtlasKind,
    width: u32,
    height: u32,
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl GpuAtlas {
    /// Zero-initialized atlas
    pub fn new(device: &wgpu::Device, kind: AtlasKind, width: u32, height: u32) -> Result<Self, RenderError> {
        if width == 0 || height == 0 {
            return Err(sheen_core::Error::EmptyAtlas { width, height }.into());
        }

        let label = match kind {
            AtlasKind::Mask => "Mask Atlas",
            AtlasKind::Color { .. } => "Color Atlas",
        };

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: texture_format(kind),
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        log::debug!("Created {:?} atlas {}x{}", kind, width, height);

        Ok(Self {
            kind,
            width,
            height,
            texture,
            view,
        })
    }

    /// Atlas filled from tightly packed texels covering the whole texture
    pub fn from_data(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        kind: AtlasKind,
        width: u32,
        height: u32,
        data: &[u8],
    ) -> Result<Self, RenderError> {
        let atlas = Self::new(device, kind, width, height)?;
        atlas.upload_region(queue, 0, 0, width, height, data)?;
        Ok(atlas)
    }

    /// Write a `width` x `height` block of texels at (`x`, `y`)
    pub fn upload_region(
        &self,
        queue: &wgpu::Queue,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        data: &[u8],
    ) -> Result<(), RenderError> {
        let bytes_per_row = check_region(self.kind, self.size(), [x, y, width, height], data.len())?;

        if width == 0 || height == 0 {
            return Ok(());
        }

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d { x, y, z: 0 },
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_row),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );

        Ok(())
    }

    pub fn kind(&self) -> AtlasKind {
        self.kind
    }

    pub fn size(&self) -> [u32; 2] {
        [self.width, self.height]
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }
}
