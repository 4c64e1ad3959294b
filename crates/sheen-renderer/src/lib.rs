//! Sheen renderer - GPU quad compositing with wgpu
//!
//! One instanced pipeline draws color atlas images and tinted mask glyphs
//! with optional soft shadows. Instance layout and shading semantics come
//! from `sheen-core`, whose CPU rasterizer is the reference for this path.

pub mod atlas;
pub mod error;
pub mod headless;
pub mod quad_renderer;
pub mod shaders;

pub use atlas::{GpuAtlas, texture_format};
pub use error::RenderError;
pub use headless::{DEPTH_FORMAT, HeadlessTarget, compare_function};
pub use quad_renderer::{INSTANCE_ATTRIBUTES, QuadRenderer, instance_layout};
