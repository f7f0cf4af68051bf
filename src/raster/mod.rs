//! Rasterizer adapter boundary
//!
//! The glyph cache never talks to a font library directly. It drives a
//! [`Rasterizer`]: load a glyph by index, optionally stroke it, render it to a
//! bitmap in one of three pixel formats. [`freetype`] provides the production
//! implementation; tests plug in stubs.

pub mod freetype;

use bitflags::bitflags;

use crate::error::{FontError, Result};

pub use self::freetype::{FtEngine, FtRasterizer};

bitflags! {
    /// Options for [`Rasterizer::load_glyph`]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct LoadFlags: u32 {
        /// Prefer embedded color bitmaps (emoji) when the font has them
        const COLOR = 1 << 0;
        /// Load the outline only; the stroker cannot consume a bitmap
        const NO_BITMAP = 1 << 1;
        /// Render 1-bit monochrome instead of 8-bit coverage
        const MONOCHROME = 1 << 2;
    }
}

/// Pixel layout of a rendered glyph bitmap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelMode {
    /// 1 bit per pixel, 8 pixels per byte, MSB first
    Mono,
    /// 8-bit coverage
    Gray,
    /// 32-bit premultiplied BGRA (color fonts)
    Bgra,
}

impl PixelMode {
    /// Bytes needed for one row of `width` pixels
    pub fn row_bytes(self, width: u32) -> usize {
        match self {
            PixelMode::Mono => (width as usize + 7) / 8,
            PixelMode::Gray => width as usize,
            PixelMode::Bgra => width as usize * 4,
        }
    }
}

/// Owned glyph bitmap copied out of the rasterizer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlyphBitmap {
    pub width: u32,
    pub rows: u32,
    /// Bytes between the starts of consecutive rows
    pub pitch: usize,
    pub mode: PixelMode,
    pub buffer: Vec<u8>,
    /// Row 0 of `buffer` is the bottom row of the image
    pub bottom_up: bool,
}

impl GlyphBitmap {
    /// Zero-area bitmap (space and other blank glyphs)
    pub fn empty(mode: PixelMode) -> Self {
        Self {
            width: 0,
            rows: 0,
            pitch: 0,
            mode,
            buffer: Vec::new(),
            bottom_up: false,
        }
    }

    /// Tightly packed top-down bitmap
    pub fn new(width: u32, rows: u32, mode: PixelMode, buffer: Vec<u8>) -> Self {
        Self {
            width,
            rows,
            pitch: mode.row_bytes(width),
            mode,
            buffer,
            bottom_up: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.rows == 0
    }

    /// Check that every row lies inside `buffer`
    ///
    /// Adapters hand back public fields, so the cache checks the layout
    /// before any row is sliced.
    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Ok(());
        }
        let row_bytes = self.mode.row_bytes(self.width);
        if self.pitch < row_bytes {
            return Err(FontError::Rasterizer {
                op: "render",
                reason: format!(
                    "bitmap pitch {} shorter than a {:?} row of {} pixels",
                    self.pitch, self.mode, self.width
                ),
            });
        }
        let needed = (self.rows as usize - 1)
            .checked_mul(self.pitch)
            .and_then(|n| n.checked_add(row_bytes));
        match needed {
            Some(n) if n <= self.buffer.len() => Ok(()),
            _ => Err(FontError::Rasterizer {
                op: "render",
                reason: format!(
                    "bitmap buffer holds {} bytes, {}x{} {:?} at pitch {} needs more",
                    self.buffer.len(),
                    self.width,
                    self.rows,
                    self.mode,
                    self.pitch
                ),
            }),
        }
    }

    pub fn as_ref(&self) -> BitmapRef<'_> {
        BitmapRef {
            width: self.width,
            rows: self.rows,
            pitch: self.pitch,
            mode: self.mode,
            buffer: &self.buffer,
            bottom_up: self.bottom_up,
        }
    }
}

/// Borrowed view of a bitmap (rasterizer output or resampler scratch)
#[derive(Debug, Clone, Copy)]
pub struct BitmapRef<'a> {
    pub width: u32,
    pub rows: u32,
    pub pitch: usize,
    pub mode: PixelMode,
    pub buffer: &'a [u8],
    pub bottom_up: bool,
}

impl BitmapRef<'_> {
    /// Row slice as stored in memory
    #[inline]
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.pitch;
        &self.buffer[start..start + self.mode.row_bytes(self.width)]
    }

    /// Row slice in top-down image order
    #[inline]
    pub fn image_row(&self, y: u32) -> &[u8] {
        if self.bottom_up {
            self.row(self.rows - 1 - y)
        } else {
            self.row(y)
        }
    }
}

/// Bitmap plus its placement relative to the glyph origin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedBitmap {
    pub bitmap: GlyphBitmap,
    /// Distance from the pen position to the left edge (pixels)
    pub left: i32,
    /// Distance from the baseline up to the top edge (pixels)
    pub top: i32,
}

/// Face-wide vertical metrics in device pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LineMetrics {
    pub ascender: i32,
    /// Negative below the baseline
    pub descender: i32,
    pub line_spacing: i32,
}

/// Stroke cap style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineCap {
    Butt,
    #[default]
    Round,
    Square,
}

impl LineCap {
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "butt" => Some(Self::Butt),
            "round" => Some(Self::Round),
            "square" => Some(Self::Square),
            _ => None,
        }
    }
}

/// Stroke join style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineJoin {
    #[default]
    Round,
    Bevel,
    /// Miter clipped at the miter limit
    Miter,
    /// Miter replaced by a bevel past the miter limit
    MiterFixed,
}

impl LineJoin {
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "round" => Some(Self::Round),
            "bevel" => Some(Self::Bevel),
            "miter" | "miter-variable" => Some(Self::Miter),
            "miter-fixed" => Some(Self::MiterFixed),
            _ => None,
        }
    }
}

/// Outline expansion parameters (pixels)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeParams {
    pub radius: f32,
    pub cap: LineCap,
    pub join: LineJoin,
    pub miter_limit: f32,
}

/// Pixels -> 26.6 fixed point
#[inline]
pub fn to_26_6(value: f32) -> i64 {
    (value * 64.0) as i64
}

/// 26.6 fixed point -> whole pixels (truncating)
#[inline]
pub fn from_26_6(fixed: i64) -> i32 {
    (fixed / 64) as i32
}

/// 26.6 fixed point -> nearest whole pixel
#[inline]
pub fn round_26_6(fixed: i64) -> i32 {
    ((fixed + 32) >> 6) as i32
}

/// Glyph loader and renderer for one font face
///
/// Calls follow the native library's state machine: `load_glyph` selects the
/// current glyph, after which `advance`, `stroke_glyph` and `render_glyph`
/// operate on it. Every non-success status is returned as an error.
pub trait Rasterizer {
    /// Glyph index for a code point (0 = not found)
    fn char_index(&self, ch: char) -> u32;

    /// Ascender/descender/line spacing at the face's pixel size
    fn line_metrics(&self) -> LineMetrics;

    /// Whether the face carries kerning data
    fn has_kerning(&self) -> bool;

    /// Kerning between two glyph indices in pixels
    fn kerning(&self, left: u32, right: u32) -> Result<(i32, i32)>;

    /// Make `glyph_index` the current glyph
    fn load_glyph(&mut self, glyph_index: u32, flags: LoadFlags) -> Result<()>;

    /// Horizontal advance of the current glyph in pixels
    fn advance(&self) -> i32;

    /// Stroke the current glyph's outline and rasterize the result
    fn stroke_glyph(&mut self, params: &StrokeParams) -> Result<PlacedBitmap>;

    /// Render the current glyph
    fn render_glyph(&mut self) -> Result<PlacedBitmap>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_point() {
        assert_eq!(to_26_6(1.5), 96);
        assert_eq!(from_26_6(96), 1);
        assert_eq!(from_26_6(-64), -1);
        assert_eq!(round_26_6(96), 2);
        assert_eq!(round_26_6(95), 1);
        assert_eq!(round_26_6(-96), -1);
    }

    #[test]
    fn test_row_bytes() {
        assert_eq!(PixelMode::Mono.row_bytes(8), 1);
        assert_eq!(PixelMode::Mono.row_bytes(9), 2);
        assert_eq!(PixelMode::Gray.row_bytes(9), 9);
        assert_eq!(PixelMode::Bgra.row_bytes(9), 36);
    }

    #[test]
    fn test_validate_bitmap_layout() {
        assert!(GlyphBitmap::empty(PixelMode::Bgra).validate().is_ok());
        assert!(GlyphBitmap::new(4, 4, PixelMode::Gray, vec![0; 16]).validate().is_ok());
        // Last row may stop at its own width
        let padded = GlyphBitmap {
            width: 3,
            rows: 2,
            pitch: 4,
            mode: PixelMode::Gray,
            buffer: vec![0; 7],
            bottom_up: false,
        };
        assert!(padded.validate().is_ok());

        let short = GlyphBitmap::new(4, 4, PixelMode::Gray, vec![0; 8]);
        assert!(matches!(
            short.validate(),
            Err(FontError::Rasterizer { op: "render", .. })
        ));
        let narrow = GlyphBitmap {
            pitch: 4,
            ..GlyphBitmap::new(2, 1, PixelMode::Bgra, vec![0; 8])
        };
        assert!(narrow.validate().is_err());
        let mono = GlyphBitmap::new(9, 2, PixelMode::Mono, vec![0; 3]);
        assert!(mono.validate().is_err());
    }

    #[test]
    fn test_bottom_up_rows() {
        let bmp = GlyphBitmap {
            width: 1,
            rows: 3,
            pitch: 1,
            mode: PixelMode::Gray,
            buffer: vec![10, 20, 30],
            bottom_up: true,
        };
        let r = bmp.as_ref();
        assert_eq!(r.image_row(0), &[30]);
        assert_eq!(r.image_row(2), &[10]);
    }

    #[test]
    fn test_style_names() {
        assert_eq!(LineCap::from_name("Square"), Some(LineCap::Square));
        assert_eq!(LineJoin::from_name("miter-fixed"), Some(LineJoin::MiterFixed));
        assert_eq!(LineJoin::from_name("wavy"), None);
    }
}
