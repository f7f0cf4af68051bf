//! glyphcache - rasterize text into glyph atlases
//!
//! Builds a font face from the config (plus command-line overrides), pulls
//! every glyph of the given text through the cache, prints metrics and
//! writes the atlas pages as PNG files.

use anyhow::{anyhow, bail, Context, Result};
use log::info;
use std::path::{Path, PathBuf};

use glyphcache::config::Config;
use glyphcache::fontconfig::resolve_font;
use glyphcache::{FontFace, FtEngine, FtRasterizer, GlyphId, ShapeOptions, TextShaper};

/// Parsed command line
#[derive(Debug, Default, PartialEq)]
struct CliArgs {
    help: bool,
    version: bool,
    init_config: bool,
    config: Option<PathBuf>,
    font: Option<PathBuf>,
    size: Option<u32>,
    scale: Option<f32>,
    stroke: Option<f32>,
    shape: bool,
    out: Option<PathBuf>,
    text: Option<String>,
}

fn parse_args(args: &[String]) -> Result<CliArgs> {
    let mut cli = CliArgs::default();
    let mut iter = args.iter();

    fn value<'a>(iter: &mut std::slice::Iter<'a, String>, flag: &str) -> Result<&'a String> {
        iter.next()
            .ok_or_else(|| anyhow!("{} requires a value", flag))
    }

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-h" | "--help" => cli.help = true,
            "-V" | "--version" => cli.version = true,
            "--init-config" => cli.init_config = true,
            "--shape" => cli.shape = true,
            "--config" => cli.config = Some(PathBuf::from(value(&mut iter, arg)?)),
            "--font" => cli.font = Some(PathBuf::from(value(&mut iter, arg)?)),
            "--out" => cli.out = Some(PathBuf::from(value(&mut iter, arg)?)),
            "--size" => {
                let v = value(&mut iter, arg)?;
                cli.size = Some(v.parse().with_context(|| format!("Invalid --size: {}", v))?);
            }
            "--scale" => {
                let v = value(&mut iter, arg)?;
                cli.scale = Some(v.parse().with_context(|| format!("Invalid --scale: {}", v))?);
            }
            "--stroke" => {
                let v = value(&mut iter, arg)?;
                cli.stroke = Some(v.parse().with_context(|| format!("Invalid --stroke: {}", v))?);
            }
            other if other.starts_with('-') && other.len() > 1 => {
                bail!("Unknown option: {}", other)
            }
            text => {
                if cli.text.is_some() {
                    bail!("Only one TEXT argument is accepted");
                }
                cli.text = Some(text.to_string());
            }
        }
    }
    Ok(cli)
}

/// Print help message
fn print_help() {
    println!(
        r#"glyphcache {} - glyph rasterization and atlas cache

USAGE:
    glyphcache [OPTIONS] TEXT

OPTIONS:
    -h, --help          Print this help message
    -V, --version       Print version information
    --init-config       Write a default config file and exit
    --config PATH       Config file (default: $GLYPHCACHE_CONFIG or
                        ~/.config/glyphcache/config.toml)
    --font PATH         Font file (overrides [font] path/family)
    --size N            Pixel size
    --scale F           Display scale factor
    --stroke R          Outline stroke radius in pixels (0 = off)
    --shape             Shape TEXT before caching glyphs
    --out DIR           Write atlas pages to DIR/atlas-N.png

EXAMPLES:
    glyphcache "Hello, world"
    glyphcache --scale 1.5 --stroke 1 --out /tmp/atlas "Outlined"
"#,
        env!("CARGO_PKG_VERSION")
    );
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let cli = parse_args(&args)?;

    if cli.help {
        print_help();
        return Ok(());
    }
    if cli.version {
        println!("glyphcache {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    if cli.init_config {
        let path = match cli.config.clone() {
            Some(p) => p,
            None => Config::default_path().ok_or_else(|| anyhow!("Config directory not found"))?,
        };
        Config::write_default(&path)?;
        println!("Config written: {}", path.display());
        return Ok(());
    }

    let text = cli
        .text
        .clone()
        .ok_or_else(|| anyhow!("No TEXT given (see --help)"))?;

    let mut config = match &cli.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::load(),
    };
    apply_overrides(&mut config, &cli);
    let settings = config.face_settings()?;

    let font_path = if config.font.path.is_empty() {
        None
    } else {
        Some(PathBuf::from(&config.font.path))
    };
    let (data, path) = resolve_font(font_path.as_deref(), &config.font.family)?;
    info!("Using font {}", path.display());

    let engine = FtEngine::init()?;
    let rasterizer = engine.load_face(data.clone(), config.font.face_index as isize, config.font.size)?;
    let family = rasterizer.family_name().unwrap_or_else(|| "unknown".to_string());
    let mut face = FontFace::new(rasterizer, settings)?;

    println!("font:         {} ({})", family, path.display());
    println!("size:         {}px x {}", config.font.size, config.display.scale);
    println!("ascender:     {}", face.ascender());
    println!("descender:    {}", face.descender());
    println!("line spacing: {}", face.line_spacing());

    if cli.shape {
        let mut shaper = TextShaper::new(&data, config.font.face_index, config.font.size)?;
        print_shaped(&mut face, &mut shaper, &text)?;
    } else {
        print_chars(&mut face, &text)?;
    }

    let (width, height) = face.measure_string(&text)?;
    println!("extent:       {}x{}", width, height);
    println!(
        "cache:        {} glyphs on {} page(s)",
        face.cached_glyphs(),
        face.atlases().len()
    );

    if let Some(dir) = &cli.out {
        write_atlases(&face, dir)?;
    }
    Ok(())
}

fn apply_overrides(config: &mut Config, cli: &CliArgs) {
    if let Some(font) = &cli.font {
        config.font.path = font.to_string_lossy().to_string();
    }
    if let Some(size) = cli.size {
        config.font.size = size;
    }
    if let Some(scale) = cli.scale {
        config.display.scale = scale;
    }
    if let Some(radius) = cli.stroke {
        config.stroke.radius = radius;
    }
}

fn print_chars(face: &mut FontFace<FtRasterizer>, text: &str) -> Result<()> {
    for ch in text.chars().filter(|&c| c != '\n') {
        match face.glyph_info(GlyphId::Char(ch))? {
            Some(g) => println!(
                "U+{:04X} {:?}: advance {} box {}x{} offset ({}, {}) page {} region {:?}",
                ch as u32,
                ch,
                g.advance,
                g.width,
                g.height,
                g.offset_x,
                g.offset_y,
                g.atlas.map_or("-".to_string(), |a| a.index().to_string()),
                g.texture_region
            ),
            None => println!("U+{:04X} {:?}: no glyph", ch as u32, ch),
        }
    }
    Ok(())
}

fn print_shaped(
    face: &mut FontFace<FtRasterizer>,
    shaper: &mut TextShaper<'_>,
    text: &str,
) -> Result<()> {
    for line in text.split('\n') {
        for g in shaper.shape(line, &ShapeOptions::default())? {
            let info = face.glyph_info(GlyphId::Index(g.glyph_id))?.unwrap_or_default();
            println!(
                "glyph {} (cluster {}): advance {} offset ({}, {}) box {}x{}",
                g.glyph_id, g.cluster, g.x_advance, g.x_offset, g.y_offset, info.width, info.height
            );
        }
    }
    Ok(())
}

fn write_atlases(face: &FontFace<FtRasterizer>, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    for (id, atlas) in face.atlases().iter() {
        let surface = atlas.surface();
        let path = dir.join(format!("atlas-{}.png", id.index()));

        let file = std::fs::File::create(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        let mut encoder =
            png::Encoder::new(std::io::BufWriter::new(file), surface.width(), surface.height());
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(&surface.to_top_down_rgba())?;

        println!("wrote {} ({} glyphs)", path.display(), atlas.cell_count());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_args() {
        let cli = parse_args(&args(&[
            "--size", "24", "--scale", "1.5", "--stroke", "2", "--shape", "--out", "/tmp/x", "Hi",
        ]))
        .unwrap();
        assert_eq!(cli.size, Some(24));
        assert_eq!(cli.scale, Some(1.5));
        assert_eq!(cli.stroke, Some(2.0));
        assert!(cli.shape);
        assert_eq!(cli.out, Some(PathBuf::from("/tmp/x")));
        assert_eq!(cli.text.as_deref(), Some("Hi"));
    }

    #[test]
    fn test_parse_args_errors() {
        assert!(parse_args(&args(&["--size"])).is_err());
        assert!(parse_args(&args(&["--size", "big"])).is_err());
        assert!(parse_args(&args(&["--bogus"])).is_err());
        assert!(parse_args(&args(&["a", "b"])).is_err());
        // A lone dash is text
        assert_eq!(parse_args(&args(&["-"])).unwrap().text.as_deref(), Some("-"));
    }

    #[test]
    fn test_overrides_replace_config_values() {
        let mut config = Config::default();
        let cli = CliArgs {
            font: Some(PathBuf::from("/fonts/a.ttf")),
            size: Some(30),
            stroke: Some(1.0),
            ..Default::default()
        };
        apply_overrides(&mut config, &cli);
        assert_eq!(config.font.path, "/fonts/a.ttf");
        assert_eq!(config.font.size, 30);
        assert_eq!(config.stroke.radius, 1.0);
        assert_eq!(config.display.scale, 1.0);
    }
}
