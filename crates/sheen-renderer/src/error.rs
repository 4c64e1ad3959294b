use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("no compatible GPU adapter: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),

    #[error("failed to create device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    #[error("atlas upload of {width}x{height} at ({x}, {y}) does not fit a {atlas_width}x{atlas_height} atlas")]
    RegionOutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        atlas_width: u32,
        atlas_height: u32,
    },

    #[error("atlas upload is {actual} bytes, expected {expected}")]
    RegionDataLength { expected: usize, actual: usize },

    #[error("atlases must be bound before rendering")]
    AtlasesNotBound,

    #[error("no pipeline selected for the render target")]
    PipelineNotPrepared,

    #[error("buffer readback failed: {0}")]
    Readback(String),

    #[error(transparent)]
    Core(#[from] sheen_core::Error),
}
