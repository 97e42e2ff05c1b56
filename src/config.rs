/// Configuration system: TOML-based with sensible defaults.
/// Config file: `~/.config/texture-text/config.toml`

use crate::atlas::Depth;
use crate::font::{FaceMode, FontOptions, RenderMode};
use crate::manager::matcher::default_directories;
use crate::manager::DEFAULT_CACHE;
use crate::text::Color;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub atlas: AtlasConfig,
    pub font: FontConfig,
    pub matcher: MatcherConfig,
    pub text: TextConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AtlasConfig {
    pub width: usize,
    pub height: usize,
    pub depth: Depth,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FontConfig {
    /// Codepoints preloaded into every new font.
    pub cache: String,
    pub hinting: bool,
    pub kerning: bool,
    pub filtering: bool,
    pub scaletex: bool,
    pub padding: usize,
    pub lcd_weights: [u8; 5],
    pub rendermode: RenderMode,
    pub outline_thickness: f32,
    pub face_mode: FaceMode,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    pub directories: Vec<PathBuf>,
    /// Extra family aliases, on top of the built-in generic names.
    pub aliases: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TextConfig {
    pub base_color: String,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            width: 512,
            height: 512,
            depth: Depth::Alpha,
        }
    }
}

impl Default for FontConfig {
    fn default() -> Self {
        let options = FontOptions::default();
        Self {
            cache: DEFAULT_CACHE.into(),
            hinting: options.hinting,
            kerning: options.kerning,
            filtering: options.filtering,
            scaletex: options.scaletex,
            padding: options.padding,
            lcd_weights: options.lcd_weights,
            rendermode: options.rendermode,
            outline_thickness: options.outline_thickness,
            face_mode: options.face_mode,
        }
    }
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            directories: default_directories(),
            aliases: HashMap::new(),
        }
    }
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            base_color: "#000000ff".into(),
        }
    }
}

impl FontConfig {
    pub fn options(&self) -> FontOptions {
        FontOptions {
            hinting: self.hinting,
            kerning: self.kerning,
            filtering: self.filtering,
            scaletex: self.scaletex,
            padding: self.padding,
            lcd_weights: self.lcd_weights,
            rendermode: self.rendermode,
            outline_thickness: self.outline_thickness,
            face_mode: self.face_mode,
        }
    }
}

impl TextConfig {
    /// The base color, black if the hex string does not parse.
    pub fn color(&self) -> Color {
        Color::from_hex(&self.base_color).unwrap_or_else(|| {
            log::warn!("invalid base_color {:?}, using black", self.base_color);
            Color::BLACK
        })
    }
}

impl Config {
    /// Config file path: `~/.config/texture-text/config.toml`
    pub fn path() -> PathBuf {
        dirs_path().join("config.toml")
    }

    /// Load config from file, falling back to defaults.
    pub fn load() -> Self {
        let path = Self::path();
        match std::fs::read_to_string(&path) {
            Ok(contents) => Self::from_str(&contents),
            Err(_) => Self::default(),
        }
    }

    /// Parse config from TOML string.
    pub fn from_str(s: &str) -> Self {
        toml::from_str(s).unwrap_or_else(|e| {
            log::warn!("invalid config, using defaults: {}", e);
            Self::default()
        })
    }
}

fn dirs_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
    PathBuf::from(home).join(".config").join("texture-text")
}
