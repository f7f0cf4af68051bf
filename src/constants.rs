//! Shared constants for glyphcache
//!
//! Atlas geometry defaults, fallback code points and layer colors.

use crate::utils::color::Rgba;

// ============================================================================
// Atlas Defaults
// ============================================================================

/// Default atlas page width (pixels)
pub const DEFAULT_ATLAS_WIDTH: u32 = 1024;

/// Default atlas page height (pixels)
pub const DEFAULT_ATLAS_HEIGHT: u32 = 1024;

/// Default gap between packed cells (prevents bilinear bleed)
pub const DEFAULT_ATLAS_SPACING: u32 = 2;

/// Largest atlas page accepted by the config validator
pub const MAX_ATLAS_DIMENSION: u32 = 16384;

/// Bytes per atlas pixel (RGBA8)
pub const ATLAS_BYTES_PER_PIXEL: usize = 4;

// ============================================================================
// Substitution
// ============================================================================

/// Code points probed (in order) when picking the substitution character
pub const FALLBACK_CHARS: [char; 3] = ['\u{FFFD}', '\u{25A1}', '?'];

// ============================================================================
// Layer Colors
// ============================================================================

/// Stroke layer paint color (outline mask)
pub const STROKE_COLOR: Rgba = Rgba::new(0, 0, 0, 255);

/// Fill layer paint color (tinted at draw time)
pub const FILL_COLOR: Rgba = Rgba::new(255, 255, 255, 255);

// ============================================================================
// Font Defaults
// ============================================================================

/// Default pixel size when the config does not name one
pub const DEFAULT_FONT_SIZE: u32 = 16;

/// Default stroke miter limit
pub const DEFAULT_MITER_LIMIT: f32 = 4.0;
