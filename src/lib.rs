//! Sheen - instanced quad and glyph compositor
//!
//! This is the root crate with the scene format and the CLI plumbing.
//! The actual implementation lives in:
//! - `sheen-core` - instance layout and CPU reference kernel
//! - `sheen-renderer` - wgpu pipeline and WGSL shader
//! - `sheen-config` - configuration
//!
//! Render a scene:
//! ```sh
//! cargo run -- render scene.toml -o out.png --backend gpu
//! ```

pub mod gpu;
pub mod render;
pub mod scene;

pub use gpu::{GpuContext, render_gpu};
pub use render::{RenderSettings, render_cpu};
pub use scene::{Scene, SceneDefaults, SceneError};
