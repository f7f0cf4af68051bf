//! Font face: glyph cache and query facade
//!
//! A [`FontFace`] owns one rasterizer, its atlas pages and a cache of
//! [`GlyphInfo`] keyed by glyph index. Glyphs are populated on first request
//! (rasterize, optionally stroke, resample for the display scale, blit into a
//! reserved atlas cell) and never recomputed afterwards.
//!
//! Code points without a glyph fall back to the face's substitution
//! character, chosen once at construction. Everything is single-threaded:
//! queries take `&mut self` because any of them may populate the cache.

use std::collections::HashMap;

use log::{debug, info, trace, warn};

use crate::atlas::{AtlasAllocator, AtlasId, AtlasReservation, AtlasSettings, Rect, Surface};
use crate::blit::{BlendMode, Blitter};
use crate::constants::{FALLBACK_CHARS, FILL_COLOR, STROKE_COLOR};
use crate::error::{FontError, Result};
use crate::raster::{GlyphBitmap, LineMetrics, LoadFlags, PlacedBitmap, Rasterizer, StrokeParams};
use crate::resample::Resampler;
use crate::utils::color::Rgba;

/// Integer corrections applied to the face's native metrics (pixels)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricAdjustments {
    pub ascender: i32,
    pub descender: i32,
    pub line_spacing: i32,
    pub advance: i32,
    /// Added to the glyph box height
    pub vertical_advance: i32,
    pub offset_x: i32,
    pub offset_y: i32,
}

/// Per-face configuration, fixed at construction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceSettings {
    /// Display scale applied to every metric and bitmap
    pub scale: f32,
    pub adjustments: MetricAdjustments,
    /// Outline drawn beneath the fill
    pub stroke: Option<StrokeParams>,
    /// Preferred replacement for code points with no glyph
    pub substitution: Option<char>,
    /// Request 1-bit rendering from the rasterizer
    pub monochrome: bool,
    pub atlas: AtlasSettings,
}

impl Default for FaceSettings {
    fn default() -> Self {
        Self {
            scale: 1.0,
            adjustments: MetricAdjustments::default(),
            stroke: None,
            substitution: None,
            monochrome: false,
            atlas: AtlasSettings::default(),
        }
    }
}

impl FaceSettings {
    pub fn validate(&self) -> Result<()> {
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(FontError::InvalidConfig(format!(
                "display scale must be positive (got {})",
                self.scale
            )));
        }
        if let Some(stroke) = &self.stroke {
            if !stroke.radius.is_finite() || stroke.radius <= 0.0 {
                return Err(FontError::InvalidConfig(format!(
                    "stroke radius must be positive (got {})",
                    stroke.radius
                )));
            }
            if !stroke.miter_limit.is_finite() || stroke.miter_limit <= 0.0 {
                return Err(FontError::InvalidConfig(format!(
                    "miter limit must be positive (got {})",
                    stroke.miter_limit
                )));
            }
        }
        self.atlas.validate()
    }
}

/// What a glyph request names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlyphId {
    /// Unicode code point, resolved through the face's character map
    Char(char),
    /// Font-internal glyph index (e.g. shaping output)
    Index(u32),
}

/// Cached placement and atlas location of one glyph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GlyphInfo {
    /// Horizontal advance (pixels)
    pub advance: i32,
    /// Logical box: painted layers plus the advance adjustments
    pub width: u32,
    pub height: u32,
    /// From the pen position to the left edge
    pub offset_x: i32,
    /// From the top of the line (ascender) down to the top edge
    pub offset_y: i32,
    /// Page holding the bitmap; `None` for blank glyphs such as space
    pub atlas: Option<AtlasId>,
    /// Cell in texture space (row 0 = top)
    pub texture_region: Rect,
}

#[inline]
fn floor_scale(value: i32, scale: f32) -> i32 {
    (value as f32 * scale).floor() as i32
}

#[inline]
fn floor_scale_u(value: u32, scale: f32) -> u32 {
    (value as f32 * scale).floor() as u32
}

/// Glyph cache plus public font queries for one face
pub struct FontFace<R: Rasterizer> {
    rasterizer: R,
    settings: FaceSettings,
    /// Glyph index -> populated entry
    glyphs: HashMap<u32, GlyphInfo>,
    /// Code point -> glyph index (0 = none)
    char_map: HashMap<char, u32>,
    atlases: AtlasAllocator,
    resampler: Resampler,
    substitute: char,
    line: LineMetrics,
}

impl<R: Rasterizer> FontFace<R> {
    /// Build a face around `rasterizer`
    ///
    /// Picks the substitution character and populates its glyph up front, so
    /// a broken font or undersized atlas fails here rather than mid-frame.
    pub fn new(rasterizer: R, settings: FaceSettings) -> Result<Self> {
        settings.validate()?;
        let atlases = AtlasAllocator::new(settings.atlas)?;
        let line = rasterizer.line_metrics();

        let mut face = Self {
            rasterizer,
            settings,
            glyphs: HashMap::new(),
            char_map: HashMap::new(),
            atlases,
            resampler: Resampler::new(),
            substitute: '?',
            line,
        };
        face.substitute = face.probe_substitute();

        let index = face.glyph_index(face.substitute);
        if index != 0 {
            face.info_for_index(index)?;
        }

        info!(
            "Font face ready: scale={}, stroke={}, substitute=U+{:04X}",
            face.settings.scale,
            face.settings.stroke.map_or(0.0, |s| s.radius),
            face.substitute as u32
        );
        Ok(face)
    }

    fn probe_substitute(&mut self) -> char {
        if let Some(ch) = self.settings.substitution {
            if self.glyph_index(ch) != 0 {
                return ch;
            }
            warn!(
                "Substitution character U+{:04X} not in face, probing fallbacks",
                ch as u32
            );
        }
        for ch in FALLBACK_CHARS {
            if self.glyph_index(ch) != 0 {
                return ch;
            }
        }
        warn!("Face has no fallback glyph; missing characters will not render");
        '?'
    }

    pub fn settings(&self) -> &FaceSettings {
        &self.settings
    }

    pub fn rasterizer(&self) -> &R {
        &self.rasterizer
    }

    /// Character drawn in place of code points the face lacks
    pub fn substitute(&self) -> char {
        self.substitute
    }

    /// Glyph index for a code point (0 = not in face), memoized
    pub fn glyph_index(&mut self, ch: char) -> u32 {
        if let Some(&index) = self.char_map.get(&ch) {
            return index;
        }
        let index = self.rasterizer.char_index(ch);
        self.char_map.insert(ch, index);
        index
    }

    pub fn has_glyph(&mut self, ch: char) -> bool {
        self.glyph_index(ch) != 0
    }

    /// Glyph index to draw for `ch`, after substitution
    fn resolve(&mut self, ch: char) -> Option<u32> {
        let index = self.glyph_index(ch);
        if index != 0 {
            return Some(index);
        }
        if ch == self.substitute {
            return None;
        }
        let index = self.glyph_index(self.substitute);
        if index == 0 {
            return None;
        }
        trace!(
            "U+{:04X} not in face, using U+{:04X}",
            ch as u32,
            self.substitute as u32
        );
        Some(index)
    }

    /// Cached glyph info, populating the glyph on first use
    ///
    /// Returns `Ok(None)` only for a code point that has no glyph while the
    /// substitution character has none either.
    pub fn glyph_info(&mut self, id: GlyphId) -> Result<Option<GlyphInfo>> {
        let index = match id {
            GlyphId::Index(index) => index,
            GlyphId::Char(ch) => match self.resolve(ch) {
                Some(index) => index,
                None => return Ok(None),
            },
        };
        self.info_for_index(index).map(Some)
    }

    fn info_for_index(&mut self, index: u32) -> Result<GlyphInfo> {
        if let Some(info) = self.glyphs.get(&index) {
            trace!("Glyph cache hit: {}", index);
            return Ok(*info);
        }
        let info = self.populate(index)?;
        self.glyphs.insert(index, info);
        Ok(info)
    }

    /// Populate one glyph; returns whether the face can draw `ch`
    pub fn ensure_glyph(&mut self, ch: char) -> Result<bool> {
        Ok(self.glyph_info(GlyphId::Char(ch))?.is_some())
    }

    /// Populate a batch of glyphs ahead of use
    pub fn prewarm<I: IntoIterator<Item = char>>(&mut self, chars: I) -> Result<()> {
        let before = self.glyphs.len();
        for ch in chars {
            self.ensure_glyph(ch)?;
        }
        debug!("Prewarmed {} glyphs", self.glyphs.len() - before);
        Ok(())
    }

    /// Number of populated glyphs
    pub fn cached_glyphs(&self) -> usize {
        self.glyphs.len()
    }

    fn populate(&mut self, index: u32) -> Result<GlyphInfo> {
        let scale = self.settings.scale;
        let adj = self.settings.adjustments;
        let stroke = self.settings.stroke;

        // The stroker needs an outline, not an embedded bitmap
        let mut flags = if stroke.is_some() {
            LoadFlags::NO_BITMAP
        } else if self.settings.monochrome {
            LoadFlags::empty()
        } else {
            LoadFlags::COLOR
        };
        if self.settings.monochrome {
            flags |= LoadFlags::MONOCHROME;
        }
        self.rasterizer.load_glyph(index, flags)?;
        let advance = self.rasterizer.advance();

        let outline = match &stroke {
            Some(params) => Some(self.rasterizer.stroke_glyph(params)?),
            None => None,
        };
        let fill = self.rasterizer.render_glyph()?;
        fill.bitmap.validate()?;
        if let Some(o) = &outline {
            o.bitmap.validate()?;
        }

        let origin: &PlacedBitmap = outline.as_ref().unwrap_or(&fill);
        let (origin_left, origin_top) = (origin.left, origin.top);

        let (mut native_w, mut native_h) = (fill.bitmap.width, fill.bitmap.rows);
        if let Some(o) = &outline {
            native_w = native_w.max(o.bitmap.width);
            native_h = native_h.max(o.bitmap.rows);
        }
        let box_w = floor_scale_u(native_w, scale);
        let box_h = floor_scale_u(native_h, scale);

        // Fill position inside the cell, relative to the outer layer
        let fill_x = floor_scale(fill.left - origin_left, scale);
        let fill_y = floor_scale(origin_top - fill.top, scale);

        let mut info = GlyphInfo {
            advance: floor_scale(advance + adj.advance, scale),
            width: floor_scale(native_w as i32 + adj.advance, scale).max(0) as u32,
            height: floor_scale(native_h as i32 + adj.vertical_advance, scale).max(0) as u32,
            offset_x: floor_scale(origin_left + adj.offset_x, scale),
            offset_y: floor_scale(
                self.line.ascender + adj.ascender - origin_top + adj.offset_y,
                scale,
            ),
            atlas: None,
            texture_region: Rect::default(),
        };

        if box_w == 0 || box_h == 0 {
            debug!("Glyph {} is blank (advance {})", index, info.advance);
            return Ok(info);
        }

        let reservation = self.atlases.reserve(box_w, box_h)?;
        if let Some(o) = &outline {
            self.paint(&reservation, &o.bitmap, 0, 0, STROKE_COLOR, BlendMode::Opaque)?;
        }
        let mode = if outline.is_some() {
            BlendMode::Blend
        } else {
            BlendMode::Opaque
        };
        self.paint(&reservation, &fill.bitmap, fill_x, fill_y, FILL_COLOR, mode)?;

        let page = self.atlases.settings();
        info.atlas = Some(reservation.atlas);
        info.texture_region = reservation.texture_rect(page.height, page.flipped);

        debug!(
            "Glyph {} populated: {}x{} on page {} at ({}, {}), advance {}",
            index,
            box_w,
            box_h,
            reservation.atlas.index(),
            reservation.x,
            reservation.y,
            info.advance
        );
        Ok(info)
    }

    /// Blit one layer into its reserved cell, resampling for the display scale
    fn paint(
        &mut self,
        reservation: &AtlasReservation,
        bitmap: &GlyphBitmap,
        x: i32,
        y: i32,
        color: Rgba,
        mode: BlendMode,
    ) -> Result<()> {
        if bitmap.is_empty() {
            return Ok(());
        }
        let scale = self.settings.scale;
        let src = if scale != 1.0 {
            let w = floor_scale_u(bitmap.width, scale);
            let h = floor_scale_u(bitmap.rows, scale);
            if w == 0 || h == 0 {
                return Ok(());
            }
            self.resampler.resample(&bitmap.as_ref(), w, h, scale)
        } else {
            bitmap.as_ref()
        };

        let surface = self
            .atlases
            .surface_mut(reservation.atlas)
            .ok_or_else(|| {
                FontError::InvalidConfig(format!(
                    "reservation on unknown atlas page {}",
                    reservation.atlas.index()
                ))
            })?;

        // Bottom-up pages: land right-side-up in texture space
        let flip = surface.is_flipped();
        let y = if flip {
            (reservation.height as i32 - src.rows as i32) - y
        } else {
            y
        };

        Blitter::new(surface, reservation.rect()).draw(&src, x, y, color, mode, flip);
        surface.invalidate();
        Ok(())
    }

    /// Ascender with adjustment and scale applied
    pub fn ascender(&self) -> i32 {
        floor_scale(
            self.line.ascender + self.settings.adjustments.ascender,
            self.settings.scale,
        )
    }

    /// Descender (negative below the baseline) with adjustment and scale
    pub fn descender(&self) -> i32 {
        floor_scale(
            self.line.descender + self.settings.adjustments.descender,
            self.settings.scale,
        )
    }

    /// Distance between consecutive baselines
    pub fn line_spacing(&self) -> i32 {
        floor_scale(
            self.line.line_spacing + self.settings.adjustments.line_spacing,
            self.settings.scale,
        )
    }

    /// Kerning between two glyph indices, scaled
    ///
    /// `(0, 0)` when the face has no kerning data or either index is 0.
    pub fn kerning_by_index(&mut self, left: u32, right: u32) -> Result<(i32, i32)> {
        if !self.rasterizer.has_kerning() || left == 0 || right == 0 {
            return Ok((0, 0));
        }
        let (x, y) = self.rasterizer.kerning(left, right)?;
        let scale = self.settings.scale;
        Ok((floor_scale(x, scale), floor_scale(y, scale)))
    }

    /// Kerning between two code points, scaled
    pub fn kerning(&mut self, left: char, right: char) -> Result<(i32, i32)> {
        if !self.rasterizer.has_kerning() {
            return Ok((0, 0));
        }
        let l = self.glyph_index(left);
        let r = self.glyph_index(right);
        self.kerning_by_index(l, r)
    }

    /// Advance of one character and the line height
    pub fn measure_glyph(&mut self, ch: char) -> Result<(i32, i32)> {
        let advance = self
            .glyph_info(GlyphId::Char(ch))?
            .map_or(0, |info| info.advance);
        Ok((advance, self.line_spacing()))
    }

    /// Width of the widest line and total height of `text`
    ///
    /// Lines are split on `'\n'`. Characters the face cannot draw add nothing.
    pub fn measure_string(&mut self, text: &str) -> Result<(i32, i32)> {
        if text.is_empty() {
            return Ok((0, 0));
        }
        let mut width = 0;
        let mut lines = 0;
        for line in text.split('\n') {
            lines += 1;
            let mut line_width = 0;
            let mut prev: Option<u32> = None;
            for ch in line.chars() {
                let Some(index) = self.resolve(ch) else {
                    prev = None;
                    continue;
                };
                if let Some(p) = prev {
                    line_width += self.kerning_by_index(p, index)?.0;
                }
                line_width += self.info_for_index(index)?.advance;
                prev = Some(index);
            }
            width = width.max(line_width);
        }
        Ok((width, lines * self.line_spacing()))
    }

    /// Atlas pages in creation order
    pub fn atlases(&self) -> &AtlasAllocator {
        &self.atlases
    }

    /// Pages changed since the last call, for GPU upload
    pub fn take_dirty(&mut self) -> Vec<(AtlasId, &Surface)> {
        self.atlases.take_dirty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::{LineCap, LineJoin};

    #[test]
    fn test_floor_scale_truncates_down() {
        assert_eq!(floor_scale(7, 0.5), 3);
        assert_eq!(floor_scale(-7, 0.5), -4);
        assert_eq!(floor_scale(10, 1.5), 15);
        assert_eq!(floor_scale_u(9, 0.75), 6);
    }

    #[test]
    fn test_settings_validation() {
        assert!(FaceSettings::default().validate().is_ok());

        let bad_scale = FaceSettings {
            scale: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            bad_scale.validate(),
            Err(FontError::InvalidConfig(_))
        ));

        let nan_scale = FaceSettings {
            scale: f32::NAN,
            ..Default::default()
        };
        assert!(nan_scale.validate().is_err());

        let bad_stroke = FaceSettings {
            stroke: Some(StrokeParams {
                radius: -1.0,
                cap: LineCap::Round,
                join: LineJoin::Round,
                miter_limit: 4.0,
            }),
            ..Default::default()
        };
        assert!(bad_stroke.validate().is_err());

        let bad_atlas = FaceSettings {
            atlas: AtlasSettings {
                width: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(bad_atlas.validate().is_err());
    }
}
