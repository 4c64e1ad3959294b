//! Vertex expansion: one instance record, four quad corners
//!
//! Corner `c` is `(c & 1, (c >> 1) & 1)` scaled by the quad size, giving
//! top-left, top-right, bottom-left, bottom-right. That order draws as a
//! triangle strip without an index buffer.

use crate::atlas::{Atlases, Texture};
use crate::color::Color;
use crate::instance::{Globals, InstanceRecord};

/// Vertices emitted per instance
pub const CORNERS_PER_INSTANCE: u32 = 4;

/// Pixel offset of `corner` from the quad origin
pub fn corner_offset(corner: u32, [width, height]: [u32; 2]) -> [u32; 2] {
    [(corner & 1) * width, ((corner >> 1) & 1) * height]
}

/// Extents of both atlases, used to normalize texel coordinates.
///
/// The shader picks the extent per vertex from the content type; here the
/// two sizes are looked up once per draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtlasExtents {
    pub color: [u32; 2],
    pub mask: [u32; 2],
}

impl AtlasExtents {
    pub fn of(atlases: &Atlases<'_>) -> Self {
        Self {
            color: atlases.color.dimensions(),
            mask: atlases.mask.dimensions(),
        }
    }

    /// Color atlas for content type 0, mask atlas for everything else
    pub fn for_content(&self, content_type: u32) -> [u32; 2] {
        if content_type == 0 { self.color } else { self.mask }
    }
}

/// Everything the vertex stage hands to the rasterizer for one corner
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexOutput {
    /// Clip space position, `w` is always 1
    pub clip_position: [f32; 4],
    pub color: Color,
    /// Normalized atlas coordinate
    pub uv: [f32; 2],
    /// Flat
    pub content_type: u32,
    /// Flat
    pub shadow_radius: f32,
    /// Flat
    pub shadow_intensity: f32,
}

impl VertexOutput {
    /// Map the clip position back to pixels for a viewport of `viewport` size
    pub fn window_position(&self, [width, height]: [u32; 2]) -> [f32; 2] {
        let [x, y, _, w] = self.clip_position;
        [
            (x / w + 1.0) * 0.5 * width as f32,
            (1.0 - y / w) * 0.5 * height as f32,
        ]
    }

    pub fn depth(&self) -> f32 {
        self.clip_position[2] / self.clip_position[3]
    }
}

/// Run the vertex stage for one corner of one instance
pub fn expand_corner(
    record: &InstanceRecord,
    corner: u32,
    globals: &Globals,
    extents: &AtlasExtents,
) -> VertexOutput {
    let offset = corner_offset(corner, record.size());

    let pos = [
        record.position[0].wrapping_add(offset[0] as i32),
        record.position[1].wrapping_add(offset[1] as i32),
    ];

    let [res_x, res_y] = globals.screen_resolution;
    let mut clip_position = [
        2.0 * pos[0] as f32 / res_x as f32 - 1.0,
        2.0 * pos[1] as f32 / res_y as f32 - 1.0,
        record.depth,
        1.0,
    ];
    // pixel space is y-down, clip space is y-up
    clip_position[1] *= -1.0;

    let content_type = record.content_type_raw();
    let [uv_x, uv_y] = record.uv_origin();
    let [dim_x, dim_y] = extents.for_content(content_type);
    let uv = [
        uv_x.wrapping_add(offset[0]) as f32 / dim_x as f32,
        uv_y.wrapping_add(offset[1]) as f32 / dim_y as f32,
    ];

    VertexOutput {
        clip_position,
        color: record.decoded_color(),
        uv,
        content_type,
        shadow_radius: record.shadow_radius,
        shadow_intensity: record.shadow_intensity,
    }
}

/// All four corners of one instance, in strip order
pub fn expand_instance(
    record: &InstanceRecord,
    globals: &Globals,
    extents: &AtlasExtents,
) -> [VertexOutput; 4] {
    std::array::from_fn(|corner| expand_corner(record, corner as u32, globals, extents))
}
