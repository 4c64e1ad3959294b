//! Color values and the packed instance color decoder
//!
//! Instance colors travel as a single `u32` (A|R|G|B from the high byte down)
//! and are unpacked per vertex, optionally through the sRGB transfer curve.

/// RGBA color as floats (0.0 - 1.0)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    /// Create a new opaque color
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Create a new color with alpha
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Create from 8-bit components
    pub fn from_u8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
            a: a as f32 / 255.0,
        }
    }

    /// Convert to 8-bit components, rounding and clamping each channel
    pub fn to_u8(self) -> [u8; 4] {
        let quantize = |c: f32| (c.clamp(0.0, 1.0) * 255.0 + 0.5) as u8;
        [quantize(self.r), quantize(self.g), quantize(self.b), quantize(self.a)]
    }

    /// Same color with red, green and blue passed through `f`
    pub fn map_rgb(self, f: impl Fn(f32) -> f32) -> Self {
        Self {
            r: f(self.r),
            g: f(self.g),
            b: f(self.b),
            a: self.a,
        }
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Component-wise linear interpolation between `self` and `other`
    pub fn lerp(self, other: Self, t: f32) -> Self {
        Self {
            r: mix(self.r, other.r, t),
            g: mix(self.g, other.g, t),
            b: mix(self.b, other.b, t),
            a: mix(self.a, other.a, t),
        }
    }

    /// White color
    pub const WHITE: Self = Self::rgb(1.0, 1.0, 1.0);
    /// Black color
    pub const BLACK: Self = Self::rgb(0.0, 0.0, 0.0);
    /// Transparent
    pub const TRANSPARENT: Self = Self::rgba(0.0, 0.0, 0.0, 0.0);
}

impl From<[f32; 4]> for Color {
    fn from([r, g, b, a]: [f32; 4]) -> Self {
        Self { r, g, b, a }
    }
}

/// WGSL-style `mix`
pub(crate) fn mix(a: f32, b: f32, t: f32) -> f32 {
    a * (1.0 - t) + b * t
}

/// sRGB electro-optical transfer function for one normalized channel
pub fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Inverse of [`srgb_to_linear`]
pub fn linear_to_srgb(c: f32) -> f32 {
    if c <= 0.0031308 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

/// Pack 8-bit channels into the instance color layout (alpha in the high byte)
pub const fn pack_argb(r: u8, g: u8, b: u8, a: u8) -> u32 {
    ((a as u32) << 24) | ((r as u32) << 16) | ((g as u32) << 8) | b as u32
}

/// Parse `#RRGGBB` or `#RRGGBBAA` (leading `#` optional) into 8-bit channels
pub fn parse_hex_rgba(hex: &str) -> Option<[u8; 4]> {
    let hex = hex.strip_prefix('#').unwrap_or(hex);
    if !matches!(hex.len(), 6 | 8) || !hex.is_ascii() {
        return None;
    }

    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    let alpha = if hex.len() == 8 { byte(6)? } else { 255 };
    Some([byte(0)?, byte(2)?, byte(4)?, alpha])
}

/// Decode a packed instance color.
///
/// With `srgb` set the red, green and blue channels are linearized; alpha is
/// always a plain `a / 255`.
pub fn decode_color(packed: u32, srgb: bool) -> Color {
    let channel = |shift: u32| ((packed >> shift) & 0xff) as f32 / 255.0;

    let (r, g, b) = (channel(16), channel(8), channel(0));
    let a = channel(24);

    if srgb {
        Color::rgba(srgb_to_linear(r), srgb_to_linear(g), srgb_to_linear(b), a)
    } else {
        Color::rgba(r, g, b, a)
    }
}
