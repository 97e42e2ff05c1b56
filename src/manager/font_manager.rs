/// Owns one atlas and every font packed into it. Fonts are looked up by
/// exact (file, size) and loaded on demand, with a string of codepoints
/// preloaded into each new font.

use crate::atlas::{Depth, TextureAtlas};
use crate::config::Config;
use crate::error::{AtlasError, FontError};
use crate::font::{FaceLoader, FontOptions, FontSource, FontdueLoader, TextureFont};
use crate::manager::matcher::{default_aliases, default_directories, DirectoryMatcher, FontMatcher};
use crate::text::Markup;
use slotmap::{new_key_type, SlotMap};
use std::path::{Path, PathBuf};
use std::rc::Rc;

new_key_type! {
    /// Handle to a font held by a `FontManager`.
    pub struct FontId;
}

/// Printable ASCII.
pub const DEFAULT_CACHE: &str = " !\"#$%&'()*+,-./0123456789:;<=>?@ABCDEFGHIJKLMNOPQRSTUVWXYZ[\\]^_`abcdefghijklmnopqrstuvwxyz{|}~";

pub struct FontManager {
    atlas: TextureAtlas,
    fonts: SlotMap<FontId, TextureFont>,
    cache: String,
    loader: Rc<dyn FaceLoader>,
    matcher: Box<dyn FontMatcher>,
    options: FontOptions,
}

impl FontManager {
    /// A manager over a fresh atlas, loading with fontdue and matching
    /// families against the usual system font directories.
    pub fn new(width: usize, height: usize, depth: Depth) -> Result<Self, FontError> {
        let atlas = TextureAtlas::new(width, height, depth)?;
        let matcher = DirectoryMatcher::new(default_directories(), default_aliases());
        Ok(Self::with_parts(
            atlas,
            Rc::new(FontdueLoader),
            Box::new(matcher),
            FontOptions::default(),
        ))
    }

    pub fn with_parts(
        atlas: TextureAtlas,
        loader: Rc<dyn FaceLoader>,
        matcher: Box<dyn FontMatcher>,
        options: FontOptions,
    ) -> Self {
        Self {
            atlas,
            fonts: SlotMap::with_key(),
            cache: DEFAULT_CACHE.to_string(),
            loader,
            matcher,
            options,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, FontError> {
        let atlas = TextureAtlas::new(config.atlas.width, config.atlas.height, config.atlas.depth)?;
        let mut aliases = default_aliases();
        aliases.extend(config.matcher.aliases.clone());
        let matcher = DirectoryMatcher::new(config.matcher.directories.clone(), aliases);
        let mut manager =
            Self::with_parts(atlas, Rc::new(FontdueLoader), Box::new(matcher), config.font.options());
        manager.cache = config.font.cache.clone();
        Ok(manager)
    }

    /// Codepoints preloaded into every new font.
    pub fn cache(&self) -> &str {
        &self.cache
    }

    pub fn set_cache(&mut self, cache: impl Into<String>) {
        self.cache = cache.into();
    }

    pub fn options(&self) -> &FontOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut FontOptions {
        &mut self.options
    }

    fn preload(&mut self, mut font: TextureFont) -> FontId {
        let misses = font.load_glyphs(&mut self.atlas, &self.cache);
        if misses > 0 {
            log::warn!("{} cached codepoints did not fit for {:?}", misses, font);
        }
        self.fonts.insert(font)
    }

    /// The font for `path` at exactly `size`, loading it on first use.
    pub fn get_from_filename(&mut self, path: impl AsRef<Path>, size: f32) -> Result<FontId, FontError> {
        let source = FontSource::File(path.as_ref().to_path_buf());
        let hit = self
            .fonts
            .iter()
            .find(|(_, f)| f.source() == &source && f.size() == size)
            .map(|(id, _)| id);
        if let Some(id) = hit {
            return Ok(id);
        }
        // Another size of the same file shares its open face.
        let font = match self.fonts.values().find(|f| f.source() == &source) {
            Some(sibling) => sibling.clone_with_size(&mut self.atlas, size)?,
            None => TextureFont::load(&mut self.atlas, size, source, self.loader.clone(), &self.options)?,
        };
        Ok(self.preload(font))
    }

    /// Load a font from bytes. Memory fonts are never shared.
    pub fn add_from_memory(&mut self, bytes: impl Into<Rc<[u8]>>, size: f32) -> Result<FontId, FontError> {
        let source = FontSource::Memory(bytes.into());
        let font = TextureFont::load(&mut self.atlas, size, source, self.loader.clone(), &self.options)?;
        Ok(self.preload(font))
    }

    /// Resolve a family to a file, either as a literal path or through the
    /// matcher, then load it.
    pub fn get_from_description(
        &mut self,
        family: &str,
        size: f32,
        bold: bool,
        italic: bool,
    ) -> Result<FontId, FontError> {
        let path = if self.loader.exists(Path::new(family)) {
            PathBuf::from(family)
        } else {
            self.matcher
                .match_description(family, size, bold, italic)
                .ok_or_else(|| FontError::FontUnavailable(format!("no font matches {:?}", family)))?
        };
        self.get_from_filename(path, size)
    }

    pub fn get_from_markup(&mut self, markup: &Markup) -> Result<FontId, FontError> {
        self.get_from_description(&markup.family, markup.size, markup.bold, markup.italic)
    }

    /// Fill `markup.font` if it is unset or stale.
    pub fn resolve_markup(&mut self, markup: &mut Markup) -> Result<FontId, FontError> {
        if let Some(id) = markup.font.filter(|id| self.fonts.contains_key(*id)) {
            return Ok(id);
        }
        let id = self.get_from_markup(markup)?;
        markup.font = Some(id);
        Ok(id)
    }

    /// Drop a font and its glyphs. Its atlas regions stay allocated.
    pub fn delete_font(&mut self, id: FontId) -> Option<TextureFont> {
        self.fonts.remove(id)
    }

    pub fn font(&self, id: FontId) -> Option<&TextureFont> {
        self.fonts.get(id)
    }

    pub fn font_mut(&mut self, id: FontId) -> Option<&mut TextureFont> {
        self.fonts.get_mut(id)
    }

    /// A font together with the atlas its glyphs are packed into.
    pub fn font_and_atlas_mut(&mut self, id: FontId) -> Option<(&mut TextureFont, &mut TextureAtlas)> {
        let font = self.fonts.get_mut(id)?;
        Some((font, &mut self.atlas))
    }

    pub fn fonts(&self) -> impl Iterator<Item = (FontId, &TextureFont)> {
        self.fonts.iter()
    }

    pub fn atlas(&self) -> &TextureAtlas {
        &self.atlas
    }

    pub fn atlas_mut(&mut self) -> &mut TextureAtlas {
        &mut self.atlas
    }

    /// Grow the shared atlas and rescale the glyphs of every font.
    pub fn enlarge_atlas(&mut self, width: usize, height: usize) -> Result<(), AtlasError> {
        let (old_w, old_h) = (self.atlas.width(), self.atlas.height());
        self.atlas.enlarge(width, height)?;
        for font in self.fonts.values_mut() {
            font.rescale_glyphs(old_w, old_h, width, height);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }
}

impl std::fmt::Debug for FontManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontManager")
            .field("atlas", &self.atlas)
            .field("fonts", &self.fonts.len())
            .field("cache", &self.cache.chars().count())
            .finish()
    }
}
