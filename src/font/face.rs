/// Rasterizer seam: a face yields bitmaps, metrics and kerning for glyph
/// indices at a requested pixel size. Backends implement `FontFace`; a
/// `FaceLoader` opens them from a `FontSource`.

use crate::error::FontError;
use bitflags::bitflags;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Where a font's bytes come from.
#[derive(Clone)]
pub enum FontSource {
    File(PathBuf),
    Memory(Rc<[u8]>),
}

impl FontSource {
    pub fn path(&self) -> Option<&Path> {
        match self {
            FontSource::File(path) => Some(path),
            FontSource::Memory(_) => None,
        }
    }
}

impl std::fmt::Debug for FontSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FontSource::File(path) => f.debug_tuple("File").field(path).finish(),
            FontSource::Memory(bytes) => write!(f, "Memory({} bytes)", bytes.len()),
        }
    }
}

impl PartialEq for FontSource {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (FontSource::File(a), FontSource::File(b)) => a == b,
            (FontSource::Memory(a), FontSource::Memory(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

bitflags! {
    /// Glyph load options handed to the rasterizer.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LoadFlags: u32 {
        const RENDER = 1 << 0;
        /// Skip embedded bitmap strikes; an outline is required.
        const NO_BITMAP = 1 << 1;
        const NO_HINTING = 1 << 2;
        const FORCE_AUTOHINT = 1 << 3;
        /// Horizontal RGB subpixel coverage.
        const TARGET_LCD = 1 << 4;
        /// Color bitmaps when the face carries them.
        const COLOR = 1 << 5;
    }
}

/// Vertical metrics in pixels at one size, y up.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FaceMetrics {
    pub ascender: f32,
    pub descender: f32,
    /// Baseline-to-baseline distance.
    pub height: f32,
    pub underline_position: f32,
    pub underline_thickness: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// One coverage byte per pixel.
    Gray,
    /// Three subpixel coverage bytes per pixel, R G B.
    Lcd,
    /// Premultiplied color, B G R A.
    Bgra,
}

impl PixelFormat {
    pub fn bytes(self) -> usize {
        match self {
            PixelFormat::Gray => 1,
            PixelFormat::Lcd => 3,
            PixelFormat::Bgra => 4,
        }
    }
}

/// A rendered glyph bitmap, rows top to bottom.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterGlyph {
    /// Size in pixels.
    pub width: usize,
    pub height: usize,
    /// Bytes per row.
    pub pitch: usize,
    pub format: PixelFormat,
    /// Bearing from the pen to the left column.
    pub left: i32,
    /// Bearing from the baseline up to the top row.
    pub top: i32,
    pub advance_x: f32,
    pub advance_y: f32,
    pub data: Vec<u8>,
}

impl RasterGlyph {
    pub fn empty(advance_x: f32) -> Self {
        Self {
            width: 0,
            height: 0,
            pitch: 0,
            format: PixelFormat::Gray,
            left: 0,
            top: 0,
            advance_x,
            advance_y: 0.0,
            data: Vec::new(),
        }
    }
}

pub trait FontFace {
    /// Vertical metrics at `px` pixels per em.
    fn metrics(&self, px: f32) -> FaceMetrics;

    /// Whether outlines can be rendered at any size.
    fn is_scalable(&self) -> bool;

    /// Pixel sizes of embedded bitmap strikes.
    fn fixed_sizes(&self) -> Vec<f32>;

    /// Whether the face carries color glyph tables.
    fn has_color_glyphs(&self) -> bool;

    /// Whether this backend can render those tables in color.
    fn renders_color(&self) -> bool;

    /// Glyph index for `c`; zero is the notdef glyph.
    fn glyph_index(&self, c: char) -> u32;

    fn rasterize(&self, index: u32, px: f32, flags: LoadFlags) -> Result<RasterGlyph, FontError>;

    /// Horizontal adjustment in pixels between two glyph indices.
    fn kerning(&self, left: u32, right: u32, px: f32) -> f32;
}

pub trait FaceLoader {
    fn open(&self, source: &FontSource) -> Result<Rc<dyn FontFace>, FontError>;

    /// Whether `path` names something this loader can open.
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }
}

/// Read a font file, mapping failures to `CannotLoadFile`.
pub fn read_source(source: &FontSource) -> Result<Rc<[u8]>, FontError> {
    match source {
        FontSource::Memory(bytes) => Ok(bytes.clone()),
        FontSource::File(path) => std::fs::read(path)
            .map(Rc::from)
            .map_err(|source| FontError::CannotLoadFile { path: path.clone(), source }),
    }
}
