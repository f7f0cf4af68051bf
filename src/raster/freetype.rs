//! FreeType wrapper
//!
//! Implements the rasterizer boundary with freetype-rs: glyph loading,
//! outline stroking and bitmap rendering.

use std::rc::Rc;

use ::freetype::bitmap::PixelMode as FtPixelMode;
use ::freetype::face::{KerningMode, LoadFlag};
use ::freetype::render_mode::RenderMode;
use ::freetype::stroker::{Stroker, StrokerLineCap, StrokerLineJoin};
use ::freetype::{Bitmap, Face, Library};
use log::{debug, info};

use super::{
    from_26_6, to_26_6, GlyphBitmap, LineCap, LineJoin, LineMetrics, LoadFlags, PixelMode,
    PlacedBitmap, Rasterizer, StrokeParams,
};
use crate::error::{FontError, Result};

/// Glyphs larger than this are rejected (malformed fonts)
const MAX_GLYPH_DIMENSION: u32 = 4096;

/// FreeType library handle
///
/// Created once by the host and passed to every face it opens. Faces keep the
/// library alive, so it is released after the last face is dropped.
#[derive(Clone)]
pub struct FtEngine {
    library: Rc<Library>,
}

impl FtEngine {
    /// Initialize the FreeType library
    pub fn init() -> Result<Self> {
        let library = Library::init().map_err(|e| FontError::rasterizer("init", e))?;
        info!("FreeType library initialized");
        Ok(Self {
            library: Rc::new(library),
        })
    }

    /// Open a face from font data at a pixel size
    pub fn load_face(&self, data: Vec<u8>, face_index: isize, size_px: u32) -> Result<FtRasterizer> {
        // freetype-rs requires Rc<Vec<u8>>
        let font_data: Rc<Vec<u8>> = Rc::new(data);

        let face = self
            .library
            .new_memory_face(font_data, face_index)
            .map_err(|e| FontError::rasterizer("new_face", e))?;

        face.set_pixel_sizes(0, size_px)
            .map_err(|e| FontError::rasterizer("set_pixel_sizes", e))?;

        let family = face.family_name().unwrap_or_else(|| "unknown".to_string());
        info!("FreeType face loaded: {} ({}px)", family, size_px);

        Ok(FtRasterizer {
            face,
            stroker: None,
            monochrome: false,
            library: Rc::clone(&self.library),
        })
    }
}

/// FreeType-backed rasterizer for one face
///
/// Owns the face and (once stroking is requested) a stroker. Field order
/// matters: both are released before the library reference.
pub struct FtRasterizer {
    face: Face,
    stroker: Option<Stroker>,
    /// Current glyph was loaded for 1-bit rendering
    monochrome: bool,
    library: Rc<Library>,
}

impl FtRasterizer {
    /// Family name reported by the face
    pub fn family_name(&self) -> Option<String> {
        self.face.family_name()
    }

    fn stroker(&mut self) -> Result<&Stroker> {
        if self.stroker.is_none() {
            let stroker = self
                .library
                .new_stroker()
                .map_err(|e| FontError::rasterizer("new_stroker", e))?;
            debug!("FreeType stroker created");
            self.stroker = Some(stroker);
        }
        match self.stroker.as_ref() {
            Some(s) => Ok(s),
            None => Err(FontError::rasterizer("new_stroker", "stroker unavailable")),
        }
    }
}

impl Rasterizer for FtRasterizer {
    fn char_index(&self, ch: char) -> u32 {
        self.face.get_char_index(ch as usize).unwrap_or(0)
    }

    fn line_metrics(&self) -> LineMetrics {
        match self.face.size_metrics() {
            Some(m) => LineMetrics {
                ascender: from_26_6(m.ascender as i64),
                descender: from_26_6(m.descender as i64),
                line_spacing: from_26_6(m.height as i64),
            },
            None => LineMetrics::default(),
        }
    }

    fn has_kerning(&self) -> bool {
        self.face.has_kerning()
    }

    fn kerning(&self, left: u32, right: u32) -> Result<(i32, i32)> {
        let v = self
            .face
            .get_kerning(left, right, KerningMode::KerningDefault)
            .map_err(|e| FontError::rasterizer("kerning", e))?;
        Ok((from_26_6(v.x as i64), from_26_6(v.y as i64)))
    }

    fn load_glyph(&mut self, glyph_index: u32, flags: LoadFlags) -> Result<()> {
        let mut ft_flags = LoadFlag::DEFAULT;
        if flags.contains(LoadFlags::COLOR) {
            ft_flags |= LoadFlag::COLOR;
        }
        if flags.contains(LoadFlags::NO_BITMAP) {
            ft_flags |= LoadFlag::NO_BITMAP;
        }
        if flags.contains(LoadFlags::MONOCHROME) {
            ft_flags |= LoadFlag::TARGET_MONO;
        }
        self.monochrome = flags.contains(LoadFlags::MONOCHROME);

        self.face
            .load_glyph(glyph_index, ft_flags)
            .map_err(|e| FontError::rasterizer("load_glyph", e))
    }

    fn advance(&self) -> i32 {
        from_26_6(self.face.glyph().advance().x as i64)
    }

    fn stroke_glyph(&mut self, params: &StrokeParams) -> Result<PlacedBitmap> {
        let cap = match params.cap {
            LineCap::Butt => StrokerLineCap::Butt,
            LineCap::Round => StrokerLineCap::Round,
            LineCap::Square => StrokerLineCap::Square,
        };
        let join = match params.join {
            LineJoin::Round => StrokerLineJoin::Round,
            LineJoin::Bevel => StrokerLineJoin::Bevel,
            LineJoin::Miter => StrokerLineJoin::MiterVariable,
            LineJoin::MiterFixed => StrokerLineJoin::MiterFixed,
        };
        // Miter limit is 16.16 in FreeType
        let miter = (params.miter_limit * 65536.0) as i64;
        let radius = to_26_6(params.radius);

        let glyph = self
            .face
            .glyph()
            .get_glyph()
            .map_err(|e| FontError::rasterizer("get_glyph", e))?;

        let stroker = self.stroker()?;
        stroker.set(radius as _, cap, join, miter as _);

        let stroked = glyph
            .stroke(stroker)
            .map_err(|e| FontError::rasterizer("stroke", e))?;
        let bitmap_glyph = stroked
            .to_bitmap(RenderMode::Normal, None)
            .map_err(|e| FontError::rasterizer("stroke_to_bitmap", e))?;

        Ok(PlacedBitmap {
            bitmap: copy_bitmap(&bitmap_glyph.bitmap())?,
            left: bitmap_glyph.left(),
            top: bitmap_glyph.top(),
        })
    }

    fn render_glyph(&mut self) -> Result<PlacedBitmap> {
        let render_mode = if self.monochrome {
            RenderMode::Mono
        } else {
            RenderMode::Normal
        };

        let slot = self.face.glyph();
        slot.render_glyph(render_mode)
            .map_err(|e| FontError::rasterizer("render_glyph", e))?;

        Ok(PlacedBitmap {
            bitmap: copy_bitmap(&slot.bitmap())?,
            left: slot.bitmap_left(),
            top: slot.bitmap_top(),
        })
    }
}

/// Copy a FreeType bitmap into an owned buffer with positive pitch
fn copy_bitmap(bitmap: &Bitmap) -> Result<GlyphBitmap> {
    let width = bitmap.width().max(0) as u32;
    let rows = bitmap.rows().max(0) as u32;
    // Blank glyphs may report no pixel mode at all
    if width == 0 || rows == 0 {
        return Ok(GlyphBitmap::empty(PixelMode::Gray));
    }

    let mode = match bitmap
        .pixel_mode()
        .map_err(|e| FontError::rasterizer("pixel_mode", e))?
    {
        FtPixelMode::Mono => PixelMode::Mono,
        FtPixelMode::Gray => PixelMode::Gray,
        FtPixelMode::Bgra => PixelMode::Bgra,
        other => return Err(FontError::UnsupportedPixelMode(format!("{:?}", other))),
    };

    // Sanity check: prevents overflow and OOM from malformed fonts
    if width > MAX_GLYPH_DIMENSION || rows > MAX_GLYPH_DIMENSION {
        return Err(FontError::rasterizer(
            "render",
            format!("glyph too large ({}x{})", width, rows),
        ));
    }

    // Negative pitch: rows are stored bottom-up
    let pitch = bitmap.pitch().unsigned_abs() as usize;
    let row_bytes = mode.row_bytes(width);
    let buffer = bitmap.buffer();

    let mut data = Vec::with_capacity(row_bytes * rows as usize);
    for y in 0..rows as usize {
        let start = y * pitch;
        let row = buffer.get(start..start + row_bytes).ok_or_else(|| {
            FontError::rasterizer("render", "bitmap buffer shorter than rows * pitch")
        })?;
        data.extend_from_slice(row);
    }

    Ok(GlyphBitmap {
        width,
        rows,
        pitch: row_bytes,
        mode,
        buffer: data,
        bottom_up: bitmap.pitch() < 0,
    })
}
