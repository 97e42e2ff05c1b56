/// Per-run text style: font selection, colors and decorations.

use crate::manager::FontId;
use serde::{Deserialize, Serialize};

/// RGBA color, components in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Color = Color::rgba(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Color = Color::rgba(1.0, 1.0, 1.0, 1.0);
    pub const TRANSPARENT: Color = Color::rgba(0.0, 0.0, 0.0, 0.0);

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Parse `#rrggbb` or `#rrggbbaa`; the `#` is optional.
    pub fn from_hex(hex: &str) -> Option<Color> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if hex.len() != 6 && hex.len() != 8 {
            return None;
        }
        let channel = |i: usize| -> Option<f32> {
            let v = u8::from_str_radix(hex.get(i..i + 2)?, 16).ok()?;
            Some(v as f32 / 255.0)
        };
        let a = if hex.len() == 8 { channel(6)? } else { 1.0 };
        Some(Color { r: channel(0)?, g: channel(2)?, b: channel(4)?, a })
    }

    /// Whether anything drawn in this color shows up.
    pub fn is_visible(&self) -> bool {
        self.a > 0.0
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Markup {
    pub family: String,
    pub size: f32,
    pub bold: bool,
    pub italic: bool,
    /// Extra advance as a fraction of each glyph's own advance.
    pub spacing: f32,
    pub gamma: f32,
    /// Falls back to the text buffer's base color.
    pub foreground_color: Option<Color>,
    pub background_color: Color,
    pub outline: bool,
    pub outline_color: Color,
    pub underline: bool,
    pub underline_color: Color,
    pub overline: bool,
    pub overline_color: Color,
    pub strikethrough: bool,
    pub strikethrough_color: Color,
    /// Resolved lazily by the font manager.
    pub font: Option<FontId>,
}

impl Default for Markup {
    fn default() -> Self {
        Self {
            family: "monospace".into(),
            size: 12.0,
            bold: false,
            italic: false,
            spacing: 0.0,
            gamma: 1.0,
            foreground_color: None,
            background_color: Color::TRANSPARENT,
            outline: false,
            outline_color: Color::TRANSPARENT,
            underline: false,
            underline_color: Color::BLACK,
            overline: false,
            overline_color: Color::BLACK,
            strikethrough: false,
            strikethrough_color: Color::BLACK,
            font: None,
        }
    }
}

impl Markup {
    pub fn with_font(mut self, font: FontId) -> Self {
        self.font = Some(font);
        self
    }

    pub fn draws_underline(&self) -> bool {
        self.underline && self.underline_color.is_visible()
    }

    pub fn draws_overline(&self) -> bool {
        self.overline && self.overline_color.is_visible()
    }

    pub fn draws_strikethrough(&self) -> bool {
        self.strikethrough && self.strikethrough_color.is_visible()
    }

    pub fn draws_background(&self) -> bool {
        self.background_color.is_visible()
    }
}
