//! Color utilities
//!
//! Paint colors and the sRGB transfer functions used by the blitter.

/// Straight (non-premultiplied) 8-bit RGBA color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

/// sRGB to linear conversion (0.0-1.0)
pub fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Linear to sRGB conversion (0.0-1.0)
pub fn linear_to_srgb(c: f32) -> f32 {
    if c <= 0.0031308 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

/// Decode one 8-bit channel to 0.0-1.0, optionally from sRGB
#[inline]
pub fn decode_channel(v: u8, srgb: bool) -> f32 {
    let c = v as f32 / 255.0;
    if srgb {
        srgb_to_linear(c)
    } else {
        c
    }
}

/// Encode 0.0-1.0 back to an 8-bit channel, optionally to sRGB
#[inline]
pub fn encode_channel(c: f32, srgb: bool) -> u8 {
    let c = c.clamp(0.0, 1.0);
    let c = if srgb { linear_to_srgb(c) } else { c };
    (c * 255.0 + 0.5) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_srgb_endpoints() {
        assert_eq!(srgb_to_linear(0.0), 0.0);
        assert!((srgb_to_linear(1.0) - 1.0).abs() < 1e-6);
        assert!((linear_to_srgb(1.0) - 1.0).abs() < 1e-6);
        // Mid-gray is darker in linear space
        assert!(srgb_to_linear(0.5) < 0.25);
    }

    #[test]
    fn test_channel_roundtrip() {
        for v in 0..=255u8 {
            assert_eq!(encode_channel(decode_channel(v, true), true), v);
            assert_eq!(encode_channel(decode_channel(v, false), false), v);
        }
    }
}
