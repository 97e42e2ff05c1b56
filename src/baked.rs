/// Baked fonts: an atlas image plus glyph metrics and kerning, serialized
/// to JSON so that text can be drawn without a rasterizer at runtime.

use crate::atlas::{Depth, TextureAtlas};
use crate::font::{FontMetrics, TextureFont};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BakedTexture {
    pub width: usize,
    pub height: usize,
    pub depth: Depth,
    /// Row-major, `depth` bytes per pixel.
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BakedGlyph {
    pub codepoint: u32,
    pub width: usize,
    pub height: usize,
    pub offset_x: i32,
    pub offset_y: i32,
    pub advance_x: f32,
    pub advance_y: f32,
    pub s0: f32,
    pub t0: f32,
    pub s1: f32,
    pub t1: f32,
    /// (preceding codepoint, adjustment) pairs.
    pub kerning: Vec<(u32, f32)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BakedFont {
    pub name: String,
    pub size: f32,
    pub metrics: FontMetrics,
    pub texture: BakedTexture,
    pub glyphs: Vec<BakedGlyph>,
}

impl BakedFont {
    /// Snapshot every codepoint glyph of `font` and the atlas holding them.
    pub fn from_font(name: impl Into<String>, font: &TextureFont, atlas: &TextureAtlas) -> Self {
        let glyphs = font
            .codepoint_glyphs()
            .into_iter()
            .map(|(c, g)| BakedGlyph {
                codepoint: c as u32,
                width: g.width,
                height: g.height,
                offset_x: g.offset_x,
                offset_y: g.offset_y,
                advance_x: g.advance_x,
                advance_y: g.advance_y,
                s0: g.s0,
                t0: g.t0,
                s1: g.s1,
                t1: g.t1,
                kerning: g.kerning.iter().collect(),
            })
            .collect();
        Self {
            name: name.into(),
            size: font.size(),
            metrics: *font.metrics(),
            texture: BakedTexture {
                width: atlas.width(),
                height: atlas.height(),
                depth: atlas.depth(),
                data: atlas.data().to_vec(),
            },
            glyphs,
        }
    }

    pub fn glyph(&self, c: char) -> Option<&BakedGlyph> {
        self.glyphs.iter().find(|g| g.codepoint == c as u32)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }

    pub fn write(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        serde_json::to_writer(&mut out, self)?;
        out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::synthetic::{SyntheticFace, SyntheticLoader};
    use crate::font::{FontOptions, FontSource};
    use std::rc::Rc;

    fn bake() -> BakedFont {
        let mut atlas = TextureAtlas::new(128, 128, Depth::Alpha).unwrap();
        let loader = Rc::new(SyntheticLoader::new(SyntheticFace::new().with_kerning('A', 'V', -0.1)));
        let source = FontSource::Memory(Rc::from(vec![0u8]));
        let mut font = TextureFont::load(&mut atlas, 12.0, source, loader, &FontOptions::default()).unwrap();
        assert_eq!(font.load_glyphs(&mut atlas, "AVa"), 0);
        BakedFont::from_font("Synthetic", &font, &atlas)
    }

    #[test]
    fn test_from_font() {
        let baked = bake();
        assert_eq!(baked.glyphs.len(), 3);
        assert_eq!(baked.size, 12.0);
        assert_eq!(baked.metrics.ascender, 9.0);
        assert_eq!(baked.texture.data.len(), 128 * 128);
        let v = baked.glyph('V').unwrap();
        assert_eq!(v.kerning.len(), 1);
        assert_eq!(v.kerning[0].0, 'A' as u32);
        assert!(v.kerning[0].1 < 0.0);
        assert!(baked.glyph('A').unwrap().kerning.is_empty());
        assert!(baked.glyph('z').is_none());
    }

    #[test]
    fn test_json_restores_font() {
        let baked = bake();
        let json = baked.to_json().unwrap();
        assert!(json.contains("\"name\":\"Synthetic\""));
        assert_eq!(BakedFont::from_json(&json).unwrap(), baked);
    }

    #[test]
    fn test_write_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("font.json");
        let baked = bake();
        baked.write(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(BakedFont::from_json(&text).unwrap().glyphs.len(), 3);
    }
}
