//! Configuration file management
//!
//! Loads TOML configuration files and turns them into face settings.
//! Default config path: ~/.config/glyphcache/config.toml

use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::atlas::AtlasSettings;
use crate::constants::{
    DEFAULT_ATLAS_HEIGHT, DEFAULT_ATLAS_SPACING, DEFAULT_ATLAS_WIDTH, DEFAULT_FONT_SIZE,
    DEFAULT_MITER_LIMIT,
};
use crate::error::FontError;
use crate::face::{FaceSettings, MetricAdjustments};
use crate::raster::{LineCap, LineJoin, StrokeParams};

/// Application settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Font selection
    pub font: FontConfig,
    /// Display settings
    pub display: DisplayConfig,
    /// Metric adjustments
    pub metrics: MetricsConfig,
    /// Outline stroke
    pub stroke: StrokeConfig,
    /// Atlas page geometry
    pub atlas: AtlasConfig,
}

/// Font settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontConfig {
    /// Font file path (takes precedence over `family`)
    pub path: String,
    /// Family name looked up through fontconfig (system default if empty)
    pub family: String,
    /// Pixel size
    pub size: u32,
    /// Face index inside a collection file
    pub face_index: u32,
    /// Replacement for characters the font lacks (must be one character)
    pub substitution: Option<String>,
    /// Render 1-bit glyphs instead of 8-bit coverage
    pub monochrome: bool,
}

/// Display settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Scale factor applied to glyph bitmaps and metrics
    pub scale: f32,
}

/// Integer metric corrections (pixels, before scaling)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub ascender: i32,
    pub descender: i32,
    pub line_spacing: i32,
    pub advance: i32,
    pub vertical_advance: i32,
    pub offset_x: i32,
    pub offset_y: i32,
}

/// Outline stroke settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrokeConfig {
    /// Stroke radius in pixels (0 = disabled)
    pub radius: f32,
    /// "butt" | "round" | "square"
    pub cap: String,
    /// "round" | "bevel" | "miter" | "miter-fixed"
    pub join: String,
    pub miter_limit: f32,
}

/// Atlas settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AtlasConfig {
    pub width: u32,
    pub height: u32,
    /// Gap between glyph cells (pixels)
    pub spacing: u32,
    /// Store sRGB-encoded pixels
    pub srgb: bool,
    /// Bottom-up rows (GL texture convention)
    pub flipped: bool,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
            family: String::new(),
            size: DEFAULT_FONT_SIZE,
            face_index: 0,
            substitution: None,
            monochrome: false,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { scale: 1.0 }
    }
}

impl Default for StrokeConfig {
    fn default() -> Self {
        Self {
            radius: 0.0,
            cap: "round".to_string(),
            join: "round".to_string(),
            miter_limit: DEFAULT_MITER_LIMIT,
        }
    }
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_ATLAS_WIDTH,
            height: DEFAULT_ATLAS_HEIGHT,
            spacing: DEFAULT_ATLAS_SPACING,
            srgb: false,
            flipped: false,
        }
    }
}

impl StrokeConfig {
    /// Stroke parameters, or `None` when stroking is disabled
    pub fn to_params(&self) -> std::result::Result<Option<StrokeParams>, FontError> {
        if self.radius == 0.0 {
            return Ok(None);
        }
        let cap = LineCap::from_name(&self.cap)
            .ok_or_else(|| FontError::InvalidConfig(format!("unknown stroke cap {:?}", self.cap)))?;
        let join = LineJoin::from_name(&self.join).ok_or_else(|| {
            FontError::InvalidConfig(format!("unknown stroke join {:?}", self.join))
        })?;
        Ok(Some(StrokeParams {
            radius: self.radius,
            cap,
            join,
            miter_limit: self.miter_limit,
        }))
    }
}

impl Config {
    /// Environment variable naming an explicit config file
    pub const ENV_VAR: &'static str = "GLYPHCACHE_CONFIG";

    /// Get the path that would be used for loading config
    /// Returns None if using built-in defaults
    pub fn config_path() -> Option<PathBuf> {
        // 1. GLYPHCACHE_CONFIG environment variable
        if let Ok(path) = std::env::var(Self::ENV_VAR) {
            let p = Path::new(&path);
            if p.exists() {
                return Some(p.to_path_buf());
            }
            warn!("{} points to missing file: {}", Self::ENV_VAR, path);
        }

        // 2. User config: ~/.config/glyphcache/config.toml
        let config_path = Self::default_path()?;
        config_path.exists().then_some(config_path)
    }

    /// ~/.config/glyphcache/config.toml
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("glyphcache").join("config.toml"))
    }

    /// Load configuration with priority:
    /// 1. GLYPHCACHE_CONFIG environment variable
    /// 2. ~/.config/glyphcache/config.toml
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Some(path) = Self::config_path() {
            match Self::load_from_file(&path) {
                Ok(config) => {
                    info!("Loaded config: {}", path.display());
                    return config;
                }
                Err(e) => {
                    warn!("Failed to load config {}: {:#}", path.display(), e);
                }
            }
        }
        info!("Using built-in default config");
        Self::default()
    }

    /// Load settings from specified path
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Write the default configuration as a template
    ///
    /// Refuses to overwrite an existing file.
    pub fn write_default(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists: {}", path.display());
        }
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        let body = toml::to_string_pretty(&Self::default())?;
        let template = format!(
            "# glyphcache configuration\n\
             # Every key is optional; missing keys use the values below.\n\
             # [font] path wins over family; family is looked up with fontconfig.\n\
             # [stroke] radius = 0 disables the outline layer.\n\n{}",
            body
        );
        std::fs::write(path, template)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        info!("Wrote default config: {}", path.display());
        Ok(())
    }

    /// Validated settings for building a face
    pub fn face_settings(&self) -> std::result::Result<FaceSettings, FontError> {
        let substitution = match self.font.substitution.as_deref() {
            None | Some("") => None,
            Some(s) => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(ch), None) => Some(ch),
                    _ => {
                        return Err(FontError::InvalidConfig(format!(
                            "substitution must be a single character (got {:?})",
                            s
                        )))
                    }
                }
            }
        };
        if self.font.size == 0 {
            return Err(FontError::InvalidConfig("font size must be non-zero".into()));
        }

        let m = &self.metrics;
        let settings = FaceSettings {
            scale: self.display.scale,
            adjustments: MetricAdjustments {
                ascender: m.ascender,
                descender: m.descender,
                line_spacing: m.line_spacing,
                advance: m.advance,
                vertical_advance: m.vertical_advance,
                offset_x: m.offset_x,
                offset_y: m.offset_y,
            },
            stroke: self.stroke.to_params()?,
            substitution,
            monochrome: self.font.monochrome,
            atlas: AtlasSettings {
                width: self.atlas.width,
                height: self.atlas.height,
                spacing: self.atlas.spacing,
                srgb: self.atlas.srgb,
                flipped: self.atlas.flipped,
            },
        };
        settings.validate()?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [font]
            size = 24

            [stroke]
            radius = 1.5
            join = "miter"
            "#,
        )
        .unwrap();
        assert_eq!(config.font.size, 24);
        assert_eq!(config.atlas, AtlasConfig::default());
        assert_eq!(config.stroke.cap, "round");

        let settings = config.face_settings().unwrap();
        let stroke = settings.stroke.unwrap();
        assert_eq!(stroke.radius, 1.5);
        assert_eq!(stroke.join, LineJoin::Miter);
        assert_eq!(stroke.miter_limit, DEFAULT_MITER_LIMIT);
    }

    #[test]
    fn test_metrics_and_monochrome_reach_face_settings() {
        let config: Config = toml::from_str(
            r#"
            [font]
            monochrome = true

            [metrics]
            advance = 2
            vertical_advance = -1
            "#,
        )
        .unwrap();
        let settings = config.face_settings().unwrap();
        assert!(settings.monochrome);
        assert_eq!(settings.adjustments.advance, 2);
        assert_eq!(settings.adjustments.vertical_advance, -1);
        assert!(!Config::default().face_settings().unwrap().monochrome);
    }

    #[test]
    fn test_default_settings_have_no_stroke() {
        let settings = Config::default().face_settings().unwrap();
        assert!(settings.stroke.is_none());
        assert_eq!(settings.scale, 1.0);
        assert_eq!(settings.atlas, AtlasSettings::default());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let mut config = Config::default();
        config.atlas.spacing = 4096;
        assert!(matches!(
            config.face_settings(),
            Err(FontError::InvalidConfig(_))
        ));

        let mut config = Config::default();
        config.stroke.radius = 1.0;
        config.stroke.cap = "pointy".into();
        assert!(config.face_settings().is_err());

        let mut config = Config::default();
        config.font.substitution = Some("ab".into());
        assert!(config.face_settings().is_err());

        let mut config = Config::default();
        config.display.scale = -2.0;
        assert!(config.face_settings().is_err());
    }

    #[test]
    fn test_substitution_character() {
        let mut config = Config::default();
        config.font.substitution = Some("□".into());
        assert_eq!(config.face_settings().unwrap().substitution, Some('□'));
    }

    #[test]
    fn test_write_default_roundtrips() {
        let dir = std::env::temp_dir().join(format!("glyphcache-cfg-{}", std::process::id()));
        let path = dir.join("nested").join("config.toml");
        let _ = std::fs::remove_dir_all(&dir);

        Config::write_default(&path).unwrap();
        assert_eq!(Config::load_from_file(&path).unwrap(), Config::default());
        // Existing files are left alone
        assert!(Config::write_default(&path).is_err());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_parse_error_has_context() {
        let dir = std::env::temp_dir().join(format!("glyphcache-bad-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "[atlas]\nwidth = \"wide\"\n").unwrap();

        let err = Config::load_from_file(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse config file"));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
