//! Packed per-instance records and the global uniform block
//!
//! `InstanceRecord` is the exact byte layout the vertex buffer carries. Size and
//! uv origin are packed as two `u16` halves of a `u32`; the accessors here are
//! the only place that knows about the packing.

use bytemuck::{Pod, Zeroable};

use crate::color::{Color, decode_color};
use crate::error::Error;

/// Which atlas (and which shading path) a quad uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ContentType {
    /// RGBA color/image atlas, sampled and returned as-is
    Color = 0,
    /// Single channel coverage atlas, tinted by the instance color
    Mask = 1,
}

impl ContentType {
    /// Decode the low half of `content_type_with_srgb`.
    ///
    /// Returns `None` for values the compositor does not know; those quads
    /// render transparent.
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(ContentType::Color),
            1 => Some(ContentType::Mask),
            _ => None,
        }
    }

    pub fn as_raw(self) -> u32 {
        self as u32
    }
}

/// Pack two 16-bit values with `lo` in bits 0-15 and `hi` in bits 16-31
pub const fn pack_u16_pair(lo: u16, hi: u16) -> u32 {
    ((hi as u32) << 16) | lo as u32
}

/// Inverse of [`pack_u16_pair`]
pub const fn unpack_u16_pair(packed: u32) -> [u32; 2] {
    [packed & 0xffff, (packed & 0xffff_0000) >> 16]
}

/// Per-instance data for one rectangle
///
/// Field order and widths match the instance vertex buffer layout: 36 bytes,
/// no padding.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct InstanceRecord {
    /// Top-left corner in pixels, may be negative
    pub position: [i32; 2],
    /// Width in the low 16 bits, height in the high 16 bits
    pub dim: u32,
    /// Atlas texel origin, u in the low 16 bits, v in the high 16 bits
    pub uv: u32,
    /// A|R|G|B, alpha in the high byte
    pub color: u32,
    /// Content type in the low 16 bits, sRGB decode flag in the high 16 bits
    pub content_type_with_srgb: u32,
    /// Normalized device depth
    pub depth: f32,
    /// Shadow blur radius in pixels, 0 disables the shadow
    pub shadow_radius: f32,
    /// Shadow contribution multiplier in [0, 1]
    pub shadow_intensity: f32,
}

impl InstanceRecord {
    /// Size of one record on the wire
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// Opaque white quad of `size` at `position`, uv origin 0, no shadow
    pub fn new(position: [i32; 2], size: [u16; 2], content_type: ContentType) -> Self {
        Self {
            position,
            dim: pack_u16_pair(size[0], size[1]),
            uv: 0,
            color: 0xffff_ffff,
            content_type_with_srgb: content_type.as_raw(),
            depth: 0.0,
            shadow_radius: 0.0,
            shadow_intensity: 0.0,
        }
    }

    pub fn with_uv(mut self, uv: [u16; 2]) -> Self {
        self.uv = pack_u16_pair(uv[0], uv[1]);
        self
    }

    pub fn with_color(mut self, argb: u32) -> Self {
        self.color = argb;
        self
    }

    pub fn with_srgb(mut self, srgb: bool) -> Self {
        self.content_type_with_srgb = (self.content_type_with_srgb & 0xffff) | ((srgb as u32) << 16);
        self
    }

    pub fn with_depth(mut self, depth: f32) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_shadow(mut self, radius: f32, intensity: f32) -> Self {
        self.shadow_radius = radius;
        self.shadow_intensity = intensity;
        self
    }

    /// Overwrite the raw content type, keeping the sRGB flag
    pub fn with_raw_content_type(mut self, raw: u16) -> Self {
        self.content_type_with_srgb = (self.content_type_with_srgb & 0xffff_0000) | raw as u32;
        self
    }

    pub fn width(&self) -> u32 {
        unpack_u16_pair(self.dim)[0]
    }

    pub fn height(&self) -> u32 {
        unpack_u16_pair(self.dim)[1]
    }

    pub fn size(&self) -> [u32; 2] {
        unpack_u16_pair(self.dim)
    }

    pub fn uv_origin(&self) -> [u32; 2] {
        unpack_u16_pair(self.uv)
    }

    pub fn content_type_raw(&self) -> u32 {
        self.content_type_with_srgb & 0xffff
    }

    pub fn content_type(&self) -> Option<ContentType> {
        ContentType::from_raw(self.content_type_raw())
    }

    /// Any non-zero high half counts as "color is sRGB encoded"
    pub fn srgb(&self) -> bool {
        (self.content_type_with_srgb & 0xffff_0000) >> 16 != 0
    }

    pub fn decoded_color(&self) -> Color {
        decode_color(self.color, self.srgb())
    }

    /// View a slice of records as the bytes uploaded to the instance buffer
    pub fn as_bytes(records: &[Self]) -> &[u8] {
        bytemuck::cast_slice(records)
    }

    /// Decode records from raw instance buffer bytes.
    ///
    /// The input does not need to be aligned; it only has to be a whole number
    /// of records.
    pub fn from_bytes(bytes: &[u8]) -> Result<Vec<Self>, Error> {
        if bytes.len() % Self::SIZE != 0 {
            return Err(Error::InstanceBufferLength {
                len: bytes.len(),
                record: Self::SIZE,
            });
        }
        Ok(bytemuck::pod_collect_to_vec(bytes))
    }
}

/// Global uniforms shared by every instance of a draw
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct Globals {
    pub screen_resolution: [u32; 2],
    pub _pad: [u32; 2],
}

impl Globals {
    pub const fn new(width: u32, height: u32) -> Self {
        Self {
            screen_resolution: [width, height],
            _pad: [0, 0],
        }
    }

    pub fn width(&self) -> u32 {
        self.screen_resolution[0]
    }

    pub fn height(&self) -> u32 {
        self.screen_resolution[1]
    }
}
