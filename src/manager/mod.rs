pub mod font_manager;
pub mod matcher;

pub use font_manager::{FontId, FontManager, DEFAULT_CACHE};
pub use matcher::{DirectoryMatcher, FontMatcher, NoMatcher};
