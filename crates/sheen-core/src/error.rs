//! Errors raised at the host-side boundaries of the kernel
//!
//! The shading functions themselves are infallible. Only decoding of raw
//! buffers and construction of CPU atlases can fail.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("instance buffer is {len} bytes, not a multiple of the {record}-byte record")]
    InstanceBufferLength { len: usize, record: usize },

    #[error("atlas data is {actual} bytes, expected {expected} for {width}x{height} with {channels} channel(s)")]
    AtlasDataLength {
        width: u32,
        height: u32,
        channels: usize,
        expected: usize,
        actual: usize,
    },

    #[error("atlas dimensions must be non-zero, got {width}x{height}")]
    EmptyAtlas { width: u32, height: u32 },

    #[error("framebuffer dimensions must be non-zero, got {width}x{height}")]
    EmptyFramebuffer { width: u32, height: u32 },
}
