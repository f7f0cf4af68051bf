//! fontconfig integration
//!
//! Locate font files for the CLI: an explicit path wins, otherwise the
//! family name is looked up through fontconfig.

use std::path::{Path, PathBuf};

use ::fontconfig::Fontconfig;
use anyhow::{anyhow, Context, Result};
use log::{info, warn};

/// Font search result
#[derive(Debug, Clone)]
pub struct FontMatch {
    /// Font file path
    pub path: PathBuf,
    /// Font name
    pub family: String,
}

/// Search fonts using fontconfig
pub struct FontFinder {
    fc: Fontconfig,
}

impl FontFinder {
    pub fn new() -> Result<Self> {
        let fc = Fontconfig::new().ok_or_else(|| anyhow!("fontconfig initialization failed"))?;
        info!("fontconfig initialized");
        Ok(Self { fc })
    }

    /// Search by family name
    ///
    /// fontconfig always answers with its closest match, so the result is
    /// only accepted when the names overlap.
    pub fn find_font(&self, family: &str) -> Option<FontMatch> {
        let font = self.fc.find(family, None)?;
        if names_match(family, &font.name) {
            return Some(FontMatch {
                path: font.path,
                family: font.name,
            });
        }
        warn!(
            "fontconfig: rejected false match for \"{}\": got \"{}\"",
            family, font.name
        );
        None
    }

    /// First available general-purpose family
    pub fn find_default(&self) -> Option<FontMatch> {
        let fallbacks = [
            "DejaVu Sans",
            "Noto Sans",
            "Liberation Sans",
            "Cantarell",
            "sans-serif",
        ];
        for name in fallbacks {
            if let Some(m) = self.find_font(name) {
                return Some(m);
            }
        }
        warn!("No default font found via fontconfig");
        None
    }
}

fn names_match(requested: &str, got: &str) -> bool {
    let req = requested.to_ascii_lowercase();
    let got = got.to_ascii_lowercase();
    got.contains(&req) || req.contains(&got)
}

/// Load font file
pub fn load_font_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("Failed to read font file: {}", path.display()))
}

/// Resolve the configured font to its bytes
///
/// `path` is used when set; otherwise `family` (or a default family when
/// empty) goes through fontconfig.
pub fn resolve_font(path: Option<&Path>, family: &str) -> Result<(Vec<u8>, PathBuf)> {
    if let Some(path) = path {
        info!("Font loaded from path: {}", path.display());
        return Ok((load_font_file(path)?, path.to_path_buf()));
    }

    let finder = FontFinder::new()?;
    let found = if family.is_empty() {
        finder.find_default()
    } else {
        finder.find_font(family)
    };
    let font_match = found.ok_or_else(|| anyhow!("Font not found: \"{}\"", family))?;
    info!(
        "Font resolved by name: \"{}\" → {} ({})",
        family,
        font_match.family,
        font_match.path.display()
    );
    Ok((load_font_file(&font_match.path)?, font_match.path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_match_either_direction() {
        assert!(names_match("DejaVu Sans", "DejaVu Sans"));
        assert!(names_match("dejavu", "DejaVu Sans Mono"));
        assert!(names_match("Noto Sans CJK JP", "Noto Sans"));
        assert!(!names_match("Fira Code", "DejaVu Sans"));
    }

    #[test]
    fn test_explicit_path_is_read_directly() {
        let dir = std::env::temp_dir().join(format!("glyphcache-fc-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let file = dir.join("font.bin");
        std::fs::write(&file, b"not really a font").unwrap();

        let (data, path) = resolve_font(Some(&file), "ignored").unwrap();
        assert_eq!(data, b"not really a font");
        assert_eq!(path, file);

        let missing = dir.join("missing.ttf");
        let err = resolve_font(Some(&missing), "").unwrap_err();
        assert!(err.to_string().contains("missing.ttf"));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
