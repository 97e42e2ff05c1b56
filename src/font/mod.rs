pub mod distance;
pub mod face;
pub mod fontdue_face;
pub mod glyph;
pub mod lifecycle;
pub mod pixel;
pub mod synthetic;
pub mod texture_font;

pub use face::{FaceLoader, FaceMetrics, FontFace, FontSource, LoadFlags, PixelFormat, RasterGlyph};
pub use fontdue_face::{FontdueFace, FontdueLoader};
pub use glyph::{Glyph, KerningTable, RenderMode};
pub use lifecycle::{FaceHandle, FaceMode};
pub use texture_font::{FontMetrics, FontOptions, GlyphId, TextureFont};
