/// Error kinds for atlas packing, font loading and typesetting.
/// Per-glyph failures are recovered by the caller; everything else propagates.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AtlasError {
    #[error("Atlas full: no room for a {width}x{height} region")]
    Full { width: usize, height: usize },

    #[error("Region ({x}, {y}) {width}x{height} crosses the atlas border")]
    RegionOutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    },

    #[error("Source buffer holds {got} bytes, region needs {need}")]
    SourceTooSmall { need: usize, got: usize },

    #[error("Invalid atlas size {width}x{height}")]
    InvalidSize { width: usize, height: usize },

    #[error("Cannot enlarge atlas from {from:?} to {to:?}")]
    InvalidEnlarge {
        from: (usize, usize),
        to: (usize, usize),
    },

    #[error("Out of memory allocating {0} bytes")]
    OutOfMemory(usize),
}

#[derive(Error, Debug)]
pub enum FontError {
    #[error("Cannot load font file {path:?}: {source}")]
    CannotLoadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Font unavailable: {0}")]
    FontUnavailable(String),

    #[error("Invalid font size {0}")]
    InvalidSize(f32),

    #[error("Color glyphs requested but the rasterizer cannot render them")]
    LoadColorNotAvailable,

    #[error("Font has no scalable outlines and no bitmap strike")]
    NoFixedSizeInColorFont,

    #[error("Rasterizer error: {0}")]
    Rasterizer(String),

    #[error("Stroker error: {0}")]
    Stroker(String),

    #[error("Font is bound to a different atlas")]
    ForeignAtlas,

    #[error(transparent)]
    Atlas(#[from] AtlasError),
}

#[derive(Error, Debug)]
pub enum TextError {
    #[error("Markup has no resolved font")]
    NoFontInMarkup,

    #[error("Markup refers to a font the manager does not hold")]
    UnknownFont,

    #[error(transparent)]
    Font(#[from] FontError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VertexFormatError {
    #[error("Malformed vertex attribute {0:?}")]
    Malformed(String),

    #[error("Unknown attribute type {0:?}")]
    UnknownType(char),
}
