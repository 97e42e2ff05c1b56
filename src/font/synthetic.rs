/// Deterministic in-memory face: box glyphs with fixed proportions,
/// configurable kerning pairs, bitmap strikes and color output. Used by
/// tests and benchmarks where a real font file would make results depend
/// on the machine.

use crate::error::FontError;
use crate::font::face::{
    FaceLoader, FaceMetrics, FontFace, FontSource, LoadFlags, PixelFormat, RasterGlyph,
};
use std::cell::Cell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Proportions in em units.
const ASCENT: f32 = 0.75;
const DESCENT: f32 = -0.25;
const LINE_HEIGHT: f32 = 1.2;
const UNDERLINE_POSITION: f32 = -0.1;
const UNDERLINE_THICKNESS: f32 = 0.05;
const ADVANCE: f32 = 0.6;
const BOX_WIDTH: f32 = 0.5;
const CAP_HEIGHT: f32 = 0.7;
const X_HEIGHT: f32 = 0.5;
const DROP: f32 = 0.2;

#[derive(Debug, Clone)]
pub struct SyntheticFace {
    chars: Vec<char>,
    kerning: HashMap<(char, char), f32>,
    fixed_sizes: Vec<f32>,
    color: bool,
}

impl Default for SyntheticFace {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntheticFace {
    /// A scalable face covering printable ASCII.
    pub fn new() -> Self {
        Self {
            chars: (' '..='~').collect(),
            kerning: HashMap::new(),
            fixed_sizes: Vec::new(),
            color: false,
        }
    }

    pub fn with_chars(mut self, chars: impl IntoIterator<Item = char>) -> Self {
        for c in chars {
            if !self.chars.contains(&c) {
                self.chars.push(c);
            }
        }
        self
    }

    pub fn without_char(mut self, c: char) -> Self {
        self.chars.retain(|&x| x != c);
        self
    }

    /// Kerning between `left` and `right`, in em units.
    pub fn with_kerning(mut self, left: char, right: char, em: f32) -> Self {
        self.kerning.insert((left, right), em);
        self
    }

    /// Drop outlines and render only at the given strike sizes.
    pub fn bitmap_only(mut self, sizes: &[f32]) -> Self {
        self.fixed_sizes = sizes.to_vec();
        self
    }

    pub fn with_color(mut self) -> Self {
        self.color = true;
        self
    }

    fn char_at(&self, index: u32) -> Option<char> {
        let i = index.checked_sub(1)? as usize;
        self.chars.get(i).copied()
    }

    fn coverage(&self, index: u32, px: f32) -> (usize, usize, i32, Vec<u8>) {
        let width = (BOX_WIDTH * px).round().max(1.0) as usize;
        let Some(c) = self.char_at(index) else {
            // Notdef: hollow box.
            let height = (CAP_HEIGHT * px).ceil() as usize;
            let mut data = vec![0u8; width * height];
            for y in 0..height {
                for x in 0..width {
                    if x == 0 || y == 0 || x + 1 == width || y + 1 == height {
                        data[y * width + x] = 255;
                    }
                }
            }
            return (width, height, height as i32, data);
        };
        if c.is_whitespace() {
            return (0, 0, 0, Vec::new());
        }
        let height = if c.is_lowercase() {
            (X_HEIGHT * px).ceil() as usize
        } else {
            (CAP_HEIGHT * px).ceil() as usize
        };
        let top = if matches!(c, 'g' | 'j' | 'p' | 'q' | 'y') {
            height as i32 - (DROP * px).ceil() as i32
        } else {
            height as i32
        };
        (width, height, top, vec![255; width * height])
    }
}

impl FontFace for SyntheticFace {
    fn metrics(&self, px: f32) -> FaceMetrics {
        FaceMetrics {
            ascender: ASCENT * px,
            descender: DESCENT * px,
            height: LINE_HEIGHT * px,
            underline_position: UNDERLINE_POSITION * px,
            underline_thickness: UNDERLINE_THICKNESS * px,
        }
    }

    fn is_scalable(&self) -> bool {
        self.fixed_sizes.is_empty()
    }

    fn fixed_sizes(&self) -> Vec<f32> {
        self.fixed_sizes.clone()
    }

    fn has_color_glyphs(&self) -> bool {
        self.color
    }

    fn renders_color(&self) -> bool {
        true
    }

    fn glyph_index(&self, c: char) -> u32 {
        self.chars
            .iter()
            .position(|&x| x == c)
            .map(|i| i as u32 + 1)
            .unwrap_or(0)
    }

    fn rasterize(&self, index: u32, px: f32, flags: LoadFlags) -> Result<RasterGlyph, FontError> {
        if index as usize > self.chars.len() {
            return Err(FontError::Rasterizer(format!("glyph index {} out of range", index)));
        }
        if flags.contains(LoadFlags::NO_BITMAP) && !self.is_scalable() {
            return Err(FontError::Stroker("face has no outlines".into()));
        }
        let (width, height, top, gray) = self.coverage(index, px);
        let (format, data) = if flags.contains(LoadFlags::COLOR) && self.color {
            let data = gray.iter().flat_map(|&a| [0, a / 2, a, a]).collect();
            (PixelFormat::Bgra, data)
        } else if flags.contains(LoadFlags::TARGET_LCD) {
            let data = gray.iter().flat_map(|&a| [a, a, a]).collect();
            (PixelFormat::Lcd, data)
        } else {
            (PixelFormat::Gray, gray)
        };
        Ok(RasterGlyph {
            width,
            height,
            pitch: width * format.bytes(),
            format,
            left: 0,
            top,
            advance_x: ADVANCE * px,
            advance_y: 0.0,
            data,
        })
    }

    fn kerning(&self, left: u32, right: u32, px: f32) -> f32 {
        match (self.char_at(left), self.char_at(right)) {
            (Some(l), Some(r)) => self.kerning.get(&(l, r)).map_or(0.0, |em| em * px),
            _ => 0.0,
        }
    }
}

/// Opens synthetic faces. Registered paths get their own face; any other
/// existing file and every memory source get the default one.
pub struct SyntheticLoader {
    default: SyntheticFace,
    files: HashMap<PathBuf, SyntheticFace>,
    opens: Cell<usize>,
}

impl SyntheticLoader {
    pub fn new(default: SyntheticFace) -> Self {
        Self { default, files: HashMap::new(), opens: Cell::new(0) }
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>, face: SyntheticFace) -> Self {
        self.files.insert(path.into(), face);
        self
    }

    pub fn open_count(&self) -> usize {
        self.opens.get()
    }
}

impl FaceLoader for SyntheticLoader {
    fn open(&self, source: &FontSource) -> Result<Rc<dyn FontFace>, FontError> {
        let face = match source {
            FontSource::Memory(_) => self.default.clone(),
            FontSource::File(path) => match self.files.get(path) {
                Some(face) => face.clone(),
                None if path.is_file() => self.default.clone(),
                None => {
                    return Err(FontError::CannotLoadFile {
                        path: path.clone(),
                        source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such font"),
                    })
                }
            },
        };
        self.opens.set(self.opens.get() + 1);
        Ok(Rc::new(face))
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path) || path.is_file()
    }
}
