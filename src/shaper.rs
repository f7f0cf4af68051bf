//! Text shaping
//!
//! Uses rustybuzz to turn a run of text into positioned glyph indices.
//! Positions come back in font units; they are brought to 26.6 fixed point
//! at the face's pixel size and rounded to whole pixels, so the output can
//! be fed straight into [`crate::FontFace::glyph_info`] with
//! [`crate::GlyphId::Index`].

use std::str::FromStr;

use log::debug;

use crate::error::{FontError, Result};
use crate::raster::round_26_6;

/// One positioned glyph of a shaped run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapedGlyph {
    /// Glyph index in the face
    pub glyph_id: u32,
    /// Byte offset of the source cluster in the input text
    pub cluster: u32,
    pub x_offset: i32,
    pub y_offset: i32,
    pub x_advance: i32,
    pub y_advance: i32,
}

/// Segment properties; unset fields are guessed from the text
#[derive(Debug, Clone, Default)]
pub struct ShapeOptions {
    /// `ltr`, `rtl`, `ttb` or `btt`
    pub direction: Option<String>,
    /// ISO 15924 tag, e.g. `Latn`
    pub script: Option<String>,
    /// BCP 47 tag, e.g. `en`
    pub language: Option<String>,
}

/// Text shaper for one face
pub struct TextShaper<'a> {
    face: rustybuzz::Face<'a>,
    features: Vec<rustybuzz::Feature>,
    size_px: u32,
    units_per_em: i32,
    /// Reusable buffer: result list
    result_buf: Vec<ShapedGlyph>,
}

impl<'a> TextShaper<'a> {
    /// Create shaper from the same font data the rasterizer was loaded from
    pub fn new(font_data: &'a [u8], face_index: u32, size_px: u32) -> Result<Self> {
        let face = rustybuzz::Face::from_slice(font_data, face_index).ok_or_else(|| {
            FontError::InvalidConfig(format!("font data has no usable face {}", face_index))
        })?;
        let units_per_em = (face.units_per_em() as i32).max(1);

        // Standard ligatures and contextual alternates
        let features = ["kern", "liga", "calt", "clig"]
            .iter()
            .filter_map(|s| rustybuzz::Feature::from_str(s).ok())
            .collect();

        debug!(
            "TextShaper initialized ({}px, {} units/em)",
            size_px, units_per_em
        );

        Ok(Self {
            face,
            features,
            size_px,
            units_per_em,
            result_buf: Vec::with_capacity(256),
        })
    }

    /// Shape one run of text
    pub fn shape(&mut self, text: &str, options: &ShapeOptions) -> Result<Vec<ShapedGlyph>> {
        self.result_buf.clear();
        if text.is_empty() {
            return Ok(Vec::new());
        }

        let mut buffer = rustybuzz::UnicodeBuffer::new();
        buffer.push_str(text);

        if let Some(dir) = &options.direction {
            let dir = rustybuzz::Direction::from_str(dir)
                .map_err(|e| FontError::InvalidConfig(format!("direction {:?}: {}", dir, e)))?;
            buffer.set_direction(dir);
        }
        if let Some(script) = &options.script {
            let tag = rustybuzz::Script::from_str(script)
                .map_err(|e| FontError::InvalidConfig(format!("script {:?}: {}", script, e)))?;
            buffer.set_script(tag);
        }
        if let Some(lang) = &options.language {
            let lang = rustybuzz::Language::from_str(lang)
                .map_err(|e| FontError::InvalidConfig(format!("language {:?}: {}", lang, e)))?;
            buffer.set_language(lang);
        }
        buffer.guess_segment_properties();

        let glyph_buffer = rustybuzz::shape(&self.face, &self.features, buffer);

        for (info, pos) in glyph_buffer
            .glyph_infos()
            .iter()
            .zip(glyph_buffer.glyph_positions())
        {
            self.result_buf.push(ShapedGlyph {
                glyph_id: info.glyph_id,
                cluster: info.cluster,
                x_offset: units_to_pixels(pos.x_offset, self.size_px, self.units_per_em),
                y_offset: units_to_pixels(pos.y_offset, self.size_px, self.units_per_em),
                x_advance: units_to_pixels(pos.x_advance, self.size_px, self.units_per_em),
                y_advance: units_to_pixels(pos.y_advance, self.size_px, self.units_per_em),
            });
        }

        // Return ownership of result (buffer will be reused on next call)
        Ok(std::mem::take(&mut self.result_buf))
    }
}

/// Font units -> 26.6 at `size_px` -> nearest whole pixel
fn units_to_pixels(units: i32, size_px: u32, units_per_em: i32) -> i32 {
    let fixed = units as i64 * size_px as i64 * 64 / units_per_em as i64;
    round_26_6(fixed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_units_to_pixels_rounds_to_nearest() {
        // 1000 upem at 16px: 600 units = 9.6px
        assert_eq!(units_to_pixels(600, 16, 1000), 10);
        // 2048 upem at 12px: 1229 units = 7.2px
        assert_eq!(units_to_pixels(1229, 12, 2048), 7);
        assert_eq!(units_to_pixels(0, 16, 1000), 0);
        assert_eq!(units_to_pixels(-600, 16, 1000), -10);
    }

    #[test]
    fn test_rejects_non_font_data() {
        let data = [0u8; 64];
        assert!(TextShaper::new(&data, 0, 16).is_err());
    }
}
