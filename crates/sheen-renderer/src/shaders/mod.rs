//! Shader module - WGSL shaders for GPU rendering
//!
//! Shaders are stored as external .wgsl files and included at compile time.

/// Built-in shaders included at compile time
pub mod builtin {
    /// Quad shader - instanced color/mask quads with the mask shadow kernel
    pub const QUAD: &str = include_str!("quad.wgsl");
}
