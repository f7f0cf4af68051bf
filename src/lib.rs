//! glyphcache - glyph rasterization and atlas caching
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │            FontFace (queries)                │
//! ├──────────────────────────────────────────────┤
//! │  glyph cache hit → GlyphInfo                 │
//! │  miss:  Rasterizer (load / stroke / render)  │
//! │           ↓                                  │
//! │         Resampler (display scale ≠ 1)        │
//! │           ↓                                  │
//! │         AtlasAllocator (reserve cell)        │
//! │           ↓                                  │
//! │         Blitter (stroke, then fill)          │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! The host owns the [`FtEngine`] and passes it to every face it opens:
//!
//! ```no_run
//! use glyphcache::{FaceSettings, FontFace, FtEngine, GlyphId};
//!
//! # fn main() -> glyphcache::Result<()> {
//! let engine = FtEngine::init()?;
//! let data = std::fs::read("/usr/share/fonts/TTF/DejaVuSans.ttf").unwrap_or_default();
//! let mut face = FontFace::new(engine.load_face(data, 0, 16)?, FaceSettings::default())?;
//! if let Some(info) = face.glyph_info(GlyphId::Char('A'))? {
//!     println!("advance {} on page {:?}", info.advance, info.atlas);
//! }
//! # Ok(())
//! # }
//! ```

pub mod atlas;
pub mod blit;
pub mod config;
pub mod constants;
pub mod error;
pub mod face;
pub mod fontconfig;
#[cfg(feature = "gl")]
pub mod gpu;
pub mod raster;
pub mod resample;
pub mod shaper;
pub mod utils;

pub use atlas::{AtlasAllocator, AtlasId, AtlasReservation, AtlasSettings, Rect, Surface};
pub use blit::{BlendMode, Blitter};
pub use error::{FontError, Result};
pub use face::{FaceSettings, FontFace, GlyphId, GlyphInfo, MetricAdjustments};
pub use raster::{
    FtEngine, FtRasterizer, GlyphBitmap, LineCap, LineJoin, LineMetrics, LoadFlags, PixelMode,
    PlacedBitmap, Rasterizer, StrokeParams,
};
pub use resample::Resampler;
pub use shaper::{ShapeOptions, ShapedGlyph, TextShaper};
pub use utils::color::Rgba;
