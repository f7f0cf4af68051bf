//! Glyph blitter
//!
//! Copies a rasterized bitmap (mono, gray or BGRA) into an atlas surface,
//! either overwriting the destination (opaque) or compositing source-over
//! (blend). Surfaces hold premultiplied RGBA8; when a surface is sRGB the
//! color channels are decoded to linear before blending and re-encoded after.

use crate::atlas::{Rect, Surface};
use crate::constants::ATLAS_BYTES_PER_PIXEL;
use crate::raster::{BitmapRef, PixelMode};
use crate::utils::color::{decode_channel, encode_channel, srgb_to_linear, Rgba};

/// How source pixels combine with what is already in the surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendMode {
    /// Overwrite destination pixels (base layer)
    Opaque,
    /// Source-over: `out = src + dst * (1 - src.a)`
    Blend,
}

/// Writes bitmaps into one clipped region of a surface
pub struct Blitter<'a> {
    surface: &'a mut Surface,
    clip: Rect,
}

impl<'a> Blitter<'a> {
    /// Blitter restricted to `clip` (clamped to the surface bounds)
    pub fn new(surface: &'a mut Surface, clip: Rect) -> Self {
        let x = clip.x.min(surface.width());
        let y = clip.y.min(surface.height());
        let clip = Rect::new(
            x,
            y,
            clip.width.min(surface.width() - x),
            clip.height.min(surface.height() - y),
        );
        Self { surface, clip }
    }

    /// Draw `src` with its top-left at (`x`, `y`) relative to the clip origin
    ///
    /// `color` tints mono and gray coverage; BGRA sources carry their own
    /// color. With `flip` the source rows are written in reverse order.
    pub fn draw(
        &mut self,
        src: &BitmapRef<'_>,
        x: i32,
        y: i32,
        color: Rgba,
        mode: BlendMode,
        flip: bool,
    ) {
        let srgb = self.surface.is_srgb();
        let paint = premultiplied(color, srgb);
        let stride = self.surface.stride();
        let clip = self.clip;

        let (sx0, dx0, cols) = span(x, src.width, clip.width);
        let (sy0, dy0, rows) = span(y, src.rows, clip.height);
        if cols == 0 || rows == 0 {
            return;
        }

        let pixels = self.surface.pixels_mut();
        for j in 0..rows {
            let src_y = sy0 + j;
            let row = if flip {
                src.image_row(src.rows - 1 - src_y)
            } else {
                src.image_row(src_y)
            };
            let dst_row = (clip.y + dy0 + j) as usize * stride;

            for i in 0..cols {
                let s = source_pixel(src.mode, row, sx0 + i, paint, srgb);
                let at = dst_row + (clip.x + dx0 + i) as usize * ATLAS_BYTES_PER_PIXEL;
                let dst = &mut pixels[at..at + ATLAS_BYTES_PER_PIXEL];

                match mode {
                    BlendMode::Opaque => store(dst, s, srgb),
                    BlendMode::Blend => {
                        if s[3] <= 0.0 {
                            continue;
                        }
                        if s[3] >= 1.0 {
                            store(dst, s, srgb);
                            continue;
                        }
                        let d = load(dst, srgb);
                        let inv = 1.0 - s[3];
                        let out = [
                            s[0] + d[0] * inv,
                            s[1] + d[1] * inv,
                            s[2] + d[2] * inv,
                            s[3] + d[3] * inv,
                        ];
                        store(dst, out, srgb);
                    }
                }
            }
        }
    }
}

/// Visible part of a source span placed at `offset` inside `limit`
///
/// Returns (first source index, first destination index, length).
fn span(offset: i32, len: u32, limit: u32) -> (u32, u32, u32) {
    let skip = if offset < 0 { offset.unsigned_abs() } else { 0 };
    let start = offset.max(0) as u32;
    if skip >= len || start >= limit {
        return (0, 0, 0);
    }
    let count = (len - skip).min(limit - start);
    (skip, start, count)
}

/// Paint color as premultiplied working-space floats
fn premultiplied(color: Rgba, srgb: bool) -> [f32; 4] {
    let a = color.a as f32 / 255.0;
    [
        decode_channel(color.r, srgb) * a,
        decode_channel(color.g, srgb) * a,
        decode_channel(color.b, srgb) * a,
        a,
    ]
}

/// Premultiplied working-space value of source pixel `x` in `row`
#[inline]
fn source_pixel(mode: PixelMode, row: &[u8], x: u32, paint: [f32; 4], srgb: bool) -> [f32; 4] {
    let x = x as usize;
    match mode {
        PixelMode::Mono => {
            let bit = (row[x / 8] >> (7 - (x % 8))) & 1;
            if bit != 0 {
                paint
            } else {
                [0.0; 4]
            }
        }
        PixelMode::Gray => {
            let cov = row[x] as f32 / 255.0;
            [paint[0] * cov, paint[1] * cov, paint[2] * cov, paint[3] * cov]
        }
        PixelMode::Bgra => {
            let p = &row[x * 4..x * 4 + 4];
            let a = p[3] as f32 / 255.0;
            // Swizzle BGRA -> RGBA
            let (r, g, b) = (p[2], p[1], p[0]);
            if !srgb {
                return [r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0, a];
            }
            if a <= 0.0 {
                return [0.0; 4];
            }
            // Premultiplied sRGB: decode the straight color, premultiply again
            let lin = |c: u8| srgb_to_linear((c as f32 / 255.0 / a).min(1.0)) * a;
            [lin(r), lin(g), lin(b), a]
        }
    }
}

#[inline]
fn load(dst: &[u8], srgb: bool) -> [f32; 4] {
    [
        decode_channel(dst[0], srgb),
        decode_channel(dst[1], srgb),
        decode_channel(dst[2], srgb),
        decode_channel(dst[3], false),
    ]
}

#[inline]
fn store(dst: &mut [u8], v: [f32; 4], srgb: bool) {
    dst[0] = encode_channel(v[0], srgb);
    dst[1] = encode_channel(v[1], srgb);
    dst[2] = encode_channel(v[2], srgb);
    dst[3] = encode_channel(v[3], false);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::GlyphBitmap;

    const RED: Rgba = Rgba::new(255, 0, 0, 255);

    fn full(surface: &Surface) -> Rect {
        Rect::new(0, 0, surface.width(), surface.height())
    }

    #[test]
    fn test_mono_single_bit_opaque() {
        let mut buf = vec![0u8; 8];
        buf[3] = 0b0001_0000; // (3, 3)
        let bmp = GlyphBitmap::new(8, 8, PixelMode::Mono, buf);

        let mut surface = Surface::new(8, 8, false, false);
        let clip = full(&surface);
        Blitter::new(&mut surface, clip).draw(&bmp.as_ref(), 0, 0, RED, BlendMode::Opaque, false);

        for y in 0..8 {
            for x in 0..8 {
                let expected = if (x, y) == (3, 3) { [255, 0, 0, 255] } else { [0; 4] };
                assert_eq!(surface.pixel(x, y), expected, "pixel ({}, {})", x, y);
            }
        }
    }

    #[test]
    fn test_gray_scales_paint_color() {
        let bmp = GlyphBitmap::new(2, 1, PixelMode::Gray, vec![255, 51]);
        let mut surface = Surface::new(2, 1, false, false);
        let clip = full(&surface);
        let color = Rgba::new(255, 255, 255, 255);
        Blitter::new(&mut surface, clip).draw(&bmp.as_ref(), 0, 0, color, BlendMode::Opaque, false);
        assert_eq!(surface.pixel(0, 0), [255, 255, 255, 255]);
        assert_eq!(surface.pixel(1, 0), [51, 51, 51, 51]);
    }

    #[test]
    fn test_bgra_is_swizzled() {
        let bmp = GlyphBitmap::new(1, 1, PixelMode::Bgra, vec![10, 20, 30, 255]);
        let mut surface = Surface::new(1, 1, false, false);
        let clip = full(&surface);
        Blitter::new(&mut surface, clip).draw(&bmp.as_ref(), 0, 0, RED, BlendMode::Opaque, false);
        assert_eq!(surface.pixel(0, 0), [30, 20, 10, 255]);
    }

    fn fill(surface: &mut Surface, px: [u8; 4]) {
        for p in surface.pixels_mut().chunks_mut(4) {
            p.copy_from_slice(&px);
        }
    }

    #[test]
    fn test_opaque_source_same_in_both_modes() {
        for srgb in [false, true] {
            let bmp = GlyphBitmap::new(2, 2, PixelMode::Gray, vec![255; 4]);
            let color = Rgba::new(200, 100, 50, 255);

            let mut a = Surface::new(2, 2, false, srgb);
            let mut b = Surface::new(2, 2, false, srgb);
            fill(&mut a, [12, 34, 56, 200]);
            fill(&mut b, [12, 34, 56, 200]);

            let clip = full(&a);
            Blitter::new(&mut a, clip).draw(&bmp.as_ref(), 0, 0, color, BlendMode::Opaque, false);
            Blitter::new(&mut b, clip).draw(&bmp.as_ref(), 0, 0, color, BlendMode::Blend, false);
            assert_eq!(a.pixels(), b.pixels());
            assert_eq!(a.pixel(0, 0), [200, 100, 50, 255]);
        }
    }

    #[test]
    fn test_transparent_source_leaves_destination() {
        for srgb in [false, true] {
            let bmp = GlyphBitmap::new(3, 1, PixelMode::Gray, vec![0; 3]);
            let mut surface = Surface::new(3, 1, false, srgb);
            fill(&mut surface, [90, 80, 70, 60]);
            let before = surface.pixels().to_vec();

            let clip = full(&surface);
            Blitter::new(&mut surface, clip).draw(&bmp.as_ref(), 0, 0, RED, BlendMode::Blend, false);
            assert_eq!(surface.pixels(), &before[..]);
        }
    }

    #[test]
    fn test_half_coverage_blends_over_black() {
        let bmp = GlyphBitmap::new(1, 1, PixelMode::Gray, vec![128]);
        let mut surface = Surface::new(1, 1, false, false);
        fill(&mut surface, [0, 0, 0, 255]);
        let clip = full(&surface);
        let white = Rgba::new(255, 255, 255, 255);
        Blitter::new(&mut surface, clip).draw(&bmp.as_ref(), 0, 0, white, BlendMode::Blend, false);
        // src = 128/255 premultiplied white, dst alpha stays 1
        assert_eq!(surface.pixel(0, 0), [128, 128, 128, 255]);
    }

    #[test]
    fn test_srgb_blend_happens_in_linear_space() {
        let bmp = GlyphBitmap::new(1, 1, PixelMode::Gray, vec![128]);
        let mut linear = Surface::new(1, 1, false, false);
        let mut srgb = Surface::new(1, 1, false, true);
        fill(&mut linear, [0, 0, 0, 255]);
        fill(&mut srgb, [0, 0, 0, 255]);
        let white = Rgba::new(255, 255, 255, 255);

        let clip = full(&linear);
        Blitter::new(&mut linear, clip).draw(&bmp.as_ref(), 0, 0, white, BlendMode::Blend, false);
        Blitter::new(&mut srgb, clip).draw(&bmp.as_ref(), 0, 0, white, BlendMode::Blend, false);

        // 50% linear light encodes brighter than 50% in sRGB
        assert!(srgb.pixel(0, 0)[0] > linear.pixel(0, 0)[0] + 40);
        assert_eq!(srgb.pixel(0, 0)[3], 255);
    }

    #[test]
    fn test_clip_and_flip() {
        // Column of three rows: 1, 2, 3
        let bmp = GlyphBitmap::new(1, 3, PixelMode::Gray, vec![10, 20, 30]);
        let mut surface = Surface::new(4, 4, false, false);
        let white = Rgba::new(255, 255, 255, 255);

        // Clip to a 1x2 region at (2, 1); the third row falls outside
        Blitter::new(&mut surface, Rect::new(2, 1, 1, 2)).draw(
            &bmp.as_ref(),
            0,
            0,
            white,
            BlendMode::Opaque,
            true,
        );
        assert_eq!(surface.pixel(2, 1)[3], 30);
        assert_eq!(surface.pixel(2, 2)[3], 20);
        assert_eq!(surface.pixel(2, 3), [0; 4]);
        assert_eq!(surface.pixel(1, 1), [0; 4]);
    }

    #[test]
    fn test_negative_offset_is_clipped() {
        let bmp = GlyphBitmap::new(2, 1, PixelMode::Gray, vec![50, 100]);
        let mut surface = Surface::new(2, 1, false, false);
        let clip = full(&surface);
        let white = Rgba::new(255, 255, 255, 255);
        Blitter::new(&mut surface, clip).draw(&bmp.as_ref(), -1, 0, white, BlendMode::Opaque, false);
        assert_eq!(surface.pixel(0, 0)[3], 100);
        assert_eq!(surface.pixel(1, 0), [0; 4]);
    }

    #[test]
    fn test_span() {
        assert_eq!(span(0, 5, 10), (0, 0, 5));
        assert_eq!(span(-2, 5, 10), (2, 0, 3));
        assert_eq!(span(8, 5, 10), (0, 8, 2));
        assert_eq!(span(10, 5, 10), (0, 0, 0));
        assert_eq!(span(-5, 5, 10), (0, 0, 0));
    }
}
