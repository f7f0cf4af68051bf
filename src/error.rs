//! Error types
//!
//! Every failure here is fatal for the query that triggered it.
//! A code point without a glyph is not an error: lookups report it as `None`.

use thiserror::Error;

/// Errors raised while building a face or populating a glyph
#[derive(Debug, Error)]
pub enum FontError {
    /// Bad face or atlas configuration (detected at construction)
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The rasterizer returned a non-success status
    #[error("rasterizer failed during {op}: {reason}")]
    Rasterizer {
        /// Operation that failed (load, render, stroke, ...)
        op: &'static str,
        /// Native error as reported by the rasterizer
        reason: String,
    },

    /// A glyph does not fit even into an empty atlas
    #[error("glyph too big for atlas: {width}x{height} does not fit {atlas_width}x{atlas_height}")]
    GlyphTooLarge {
        width: u32,
        height: u32,
        atlas_width: u32,
        atlas_height: u32,
    },

    /// The rasterizer produced a bitmap format we cannot blit
    #[error("unsupported pixel mode: {0}")]
    UnsupportedPixelMode(String),
}

impl FontError {
    /// Shorthand for wrapping a native rasterizer error
    pub fn rasterizer(op: &'static str, reason: impl std::fmt::Debug) -> Self {
        Self::Rasterizer {
            op,
            reason: format!("{:?}", reason),
        }
    }
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, FontError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let e = FontError::GlyphTooLarge {
            width: 300,
            height: 20,
            atlas_width: 256,
            atlas_height: 256,
        };
        assert_eq!(
            e.to_string(),
            "glyph too big for atlas: 300x20 does not fit 256x256"
        );

        let e = FontError::rasterizer("load", "InvalidGlyphIndex");
        assert_eq!(
            e.to_string(),
            "rasterizer failed during load: \"InvalidGlyphIndex\""
        );
    }
}
