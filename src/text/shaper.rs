/// Text shaping via harfbuzz: ligatures, mark positioning and complex
/// scripts. Produces positioned glyph indices for
/// `TextBuffer::add_glyph_run`.

/// One shaped glyph, positions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ShapedGlyph {
    /// Face glyph index, not a codepoint.
    pub glyph_index: u32,
    /// Byte offset of the source cluster in the shaped text.
    pub cluster: u32,
    pub x_advance: f32,
    pub y_advance: f32,
    pub x_offset: f32,
    pub y_offset: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    LeftToRight,
    RightToLeft,
    TopToBottom,
    BottomToTop,
}

/// Segment properties; unset fields are guessed from the text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShapeOptions {
    pub direction: Option<Direction>,
    /// ISO 15924 tag such as `"Latn"` or `"Arab"`.
    pub script: Option<String>,
    /// BCP 47 tag such as `"en"`.
    pub language: Option<String>,
}

#[cfg(feature = "shaping")]
pub use self::hb::TextShaper;

#[cfg(feature = "shaping")]
mod hb {
    use super::{Direction, ShapeOptions, ShapedGlyph};
    use crate::error::FontError;
    use crate::font::{FontSource, TextureFont};
    use harfbuzz_rs::{shape, Blob, Face, Font as HbFont, Language, Owned, Tag, UnicodeBuffer};
    use std::path::Path;

    /// 26.6 fixed point.
    const SCALE: f32 = 64.0;

    pub struct TextShaper {
        font: Owned<HbFont<'static>>,
        size: f32,
    }

    impl TextShaper {
        fn with_face(face: Owned<Face<'static>>, size: f32) -> Self {
            let mut font = HbFont::new(face);
            let scale = (size * SCALE) as i32;
            font.set_scale(scale, scale);
            Self { font, size }
        }

        pub fn from_file(path: impl AsRef<Path>, size: f32) -> Result<Self, FontError> {
            let path = path.as_ref();
            let face = Face::from_file(path, 0).map_err(|source| FontError::CannotLoadFile {
                path: path.to_path_buf(),
                source,
            })?;
            Ok(Self::with_face(face, size))
        }

        pub fn from_bytes(bytes: Vec<u8>, size: f32) -> Self {
            let blob = Blob::with_bytes_owned(bytes, |b| b.as_slice());
            Self::with_face(Face::new(blob, 0), size)
        }

        /// A shaper over the same face and size as `font`.
        pub fn for_font(font: &TextureFont) -> Result<Self, FontError> {
            match font.source() {
                FontSource::File(path) => Self::from_file(path, font.size()),
                FontSource::Memory(bytes) => Ok(Self::from_bytes(bytes.to_vec(), font.size())),
            }
        }

        pub fn size(&self) -> f32 {
            self.size
        }

        /// Shape one line of text.
        pub fn shape(&self, text: &str, options: &ShapeOptions) -> Vec<ShapedGlyph> {
            if text.is_empty() {
                return Vec::new();
            }
            let mut buffer = UnicodeBuffer::new().add_str(text);
            if let Some(direction) = options.direction {
                buffer = buffer.set_direction(match direction {
                    Direction::LeftToRight => harfbuzz_rs::Direction::Ltr,
                    Direction::RightToLeft => harfbuzz_rs::Direction::Rtl,
                    Direction::TopToBottom => harfbuzz_rs::Direction::Ttb,
                    Direction::BottomToTop => harfbuzz_rs::Direction::Btt,
                });
            }
            if let Some(tag) = options.script.as_deref().and_then(script_tag) {
                buffer = buffer.set_script(tag);
            }
            if let Some(language) = options.language.as_deref().and_then(|l| l.parse::<Language>().ok()) {
                buffer = buffer.set_language(language);
            }
            let output = shape(&self.font, buffer, &[]);
            let positions = output.get_glyph_positions();
            let infos = output.get_glyph_infos();

            infos
                .iter()
                .zip(positions.iter())
                .map(|(info, pos)| ShapedGlyph {
                    glyph_index: info.codepoint,
                    cluster: info.cluster,
                    x_advance: pos.x_advance as f32 / SCALE,
                    y_advance: pos.y_advance as f32 / SCALE,
                    x_offset: pos.x_offset as f32 / SCALE,
                    y_offset: pos.y_offset as f32 / SCALE,
                })
                .collect()
        }
    }

    fn script_tag(script: &str) -> Option<Tag> {
        let mut chars = script.chars();
        match (chars.next(), chars.next(), chars.next(), chars.next(), chars.next()) {
            (Some(a), Some(b), Some(c), Some(d), None) => Some(Tag::new(a, b, c, d)),
            _ => None,
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        const DEJAVU_MONO: &str = "/usr/share/fonts/truetype/dejavu/DejaVuSansMono.ttf";

        fn shaper() -> Option<TextShaper> {
            Path::new(DEJAVU_MONO)
                .exists()
                .then(|| TextShaper::from_file(DEJAVU_MONO, 14.0).unwrap())
        }

        #[test]
        fn test_script_tag() {
            assert!(script_tag("Latn").is_some());
            assert!(script_tag("Lat").is_none());
            assert!(script_tag("Latin").is_none());
        }

        #[test]
        fn test_missing_file() {
            let err = TextShaper::from_file("/nonexistent/font.ttf", 12.0).err().unwrap();
            assert!(matches!(err, FontError::CannotLoadFile { .. }));
        }

        #[test]
        fn test_shape_empty() {
            let Some(shaper) = shaper() else { return };
            assert!(shaper.shape("", &ShapeOptions::default()).is_empty());
            assert_eq!(shaper.size(), 14.0);
        }

        #[test]
        fn test_monospace_advances() {
            let Some(shaper) = shaper() else { return };
            let glyphs = shaper.shape("ABCDEF", &ShapeOptions::default());
            assert_eq!(glyphs.len(), 6);
            let first = glyphs[0].x_advance;
            assert!(first > 0.0);
            for g in &glyphs {
                assert_eq!(g.x_advance, first);
            }
            let clusters: Vec<_> = glyphs.iter().map(|g| g.cluster).collect();
            assert_eq!(clusters, vec![0, 1, 2, 3, 4, 5]);
        }

        #[test]
        fn test_right_to_left_reverses_clusters() {
            let Some(shaper) = shaper() else { return };
            let options = ShapeOptions {
                direction: Some(Direction::RightToLeft),
                ..Default::default()
            };
            let glyphs = shaper.shape("abc", &options);
            let clusters: Vec<_> = glyphs.iter().map(|g| g.cluster).collect();
            assert_eq!(clusters, vec![2, 1, 0]);
        }
    }
}
