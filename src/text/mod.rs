pub mod markup;
pub mod shaper;
pub mod text_buffer;
pub mod vertex_buffer;

pub use markup::{Color, Markup};
#[cfg(feature = "shaping")]
pub use shaper::TextShaper;
pub use shaper::{Direction, ShapeOptions, ShapedGlyph};
pub use text_buffer::{Align, GlyphVertex, LineInfo, Pen, Rect, TextBuffer};
pub use vertex_buffer::{AttributeType, Vertex, VertexAttribute, VertexBuffer, VertexFormat, VertexItem};
