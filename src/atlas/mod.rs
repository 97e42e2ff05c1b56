pub mod skyline;
pub mod texture;

pub use skyline::{Node, Region, Skyline};
pub use texture::{AtlasId, Depth, TextureAtlas};
