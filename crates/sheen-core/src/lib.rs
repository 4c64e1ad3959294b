//! Sheen core: instance records and the reference quad kernel
//!
//! This crate defines the packed per-instance layout shared with the GPU
//! pipeline, plus a CPU implementation of the same vertex and fragment
//! stages. The GPU path in `sheen-renderer` is checked against it.

pub mod atlas;
pub mod color;
pub mod error;
pub mod fragment;
pub mod instance;
pub mod raster;
pub mod shadow;
pub mod vertex;

pub use atlas::{AtlasKind, Atlases, ColorAtlas, ColorMode, FilterMode, MaskAtlas, Sampler, Texture, disc_texels};
pub use color::{Color, decode_color, linear_to_srgb, pack_argb, parse_hex_rgba, srgb_to_linear};
pub use error::Error;
pub use fragment::{FragmentInput, SHADOW_COLOR, shade_fragment};
pub use instance::{ContentType, Globals, InstanceRecord};
pub use raster::{DepthCompare, DrawStats, Framebuffer, Rasterizer, blend_over};
pub use shadow::{MAX_SHADOW_RADIUS, SHADOW_MARGIN_PX, shadow_value, smoothstep};
pub use vertex::{AtlasExtents, CORNERS_PER_INSTANCE, VertexOutput, expand_corner, expand_instance};
