/// Glyph cache for one face at one size. Glyphs are rasterized on first
/// use, packed into a shared `TextureAtlas` and kept in a stable arena so
/// that `GlyphId`s survive later insertions.

use crate::atlas::{AtlasId, Depth, TextureAtlas};
use crate::error::{AtlasError, FontError};
use crate::font::distance;
use crate::font::face::{FaceLoader, FontFace, FontSource, LoadFlags, PixelFormat, RasterGlyph};
use crate::font::fontdue_face::FontdueLoader;
use crate::font::glyph::{Glyph, RenderMode};
use crate::font::lifecycle::{FaceHandle, FaceMode};
use crate::font::pixel;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;

/// Rasterization settings applied to newly loaded fonts.
#[derive(Debug, Clone, PartialEq)]
pub struct FontOptions {
    pub hinting: bool,
    pub kerning: bool,
    pub filtering: bool,
    pub scaletex: bool,
    pub padding: usize,
    pub lcd_weights: [u8; 5],
    pub rendermode: RenderMode,
    pub outline_thickness: f32,
    pub face_mode: FaceMode,
}

impl Default for FontOptions {
    fn default() -> Self {
        Self {
            hinting: true,
            kerning: true,
            filtering: true,
            scaletex: true,
            padding: 0,
            lcd_weights: [0x10, 0x40, 0x70, 0x40, 0x10],
            rendermode: RenderMode::Normal,
            outline_thickness: 0.0,
            face_mode: FaceMode::default(),
        }
    }
}

/// Vertical metrics in whole pixels, y up.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FontMetrics {
    pub ascender: f32,
    pub descender: f32,
    /// Baseline-to-baseline distance.
    pub height: f32,
    pub linegap: f32,
    pub underline_position: f32,
    pub underline_thickness: f32,
}

/// Stable handle to a glyph inside one `TextureFont`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlyphId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum GlyphSlot {
    Char(char),
    Index(u32),
}

/// A glyph variant: what was asked for and how it was rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct GlyphKey {
    slot: GlyphSlot,
    mode: RenderMode,
    /// Outline thickness bits; zero for modes that ignore thickness.
    thickness: u32,
}

const SPECIAL: GlyphId = GlyphId(0);

pub struct TextureFont {
    atlas_id: AtlasId,
    face: FaceHandle,
    glyphs: Vec<Glyph>,
    table: HashMap<GlyphKey, GlyphId>,
    size: f32,
    /// Bitmap strike in use for faces without outlines.
    strike: Option<f32>,
    scale: f32,
    metrics: FontMetrics,
    pub hinting: bool,
    pub kerning: bool,
    pub filtering: bool,
    pub scaletex: bool,
    pub padding: usize,
    pub lcd_weights: [u8; 5],
    pub rendermode: RenderMode,
    pub outline_thickness: f32,
}

fn check_size(size: f32) -> Result<(), FontError> {
    if size.is_finite() && size > 0.0 {
        Ok(())
    } else {
        Err(FontError::InvalidSize(size))
    }
}

/// The solid block glyph sampled from the middle of the atlas's special
/// region.
fn special_glyph(atlas: &mut TextureAtlas, scaletex: bool) -> Result<Glyph, FontError> {
    let r = atlas.special_region()?;
    let (x, y) = (r.x as f32 + 2.0, r.y as f32 + 2.0);
    let (s0, t0, s1, t1) = if scaletex {
        let (w, h) = (atlas.width() as f32, atlas.height() as f32);
        (x / w, y / h, (x + 1.0) / w, (y + 1.0) / h)
    } else {
        (x, y, x + 1.0, y + 1.0)
    };
    Ok(Glyph {
        width: r.width - 1,
        height: r.height - 1,
        s0,
        t0,
        s1,
        t1,
        is_special: true,
        ..Default::default()
    })
}

impl TextureFont {
    /// Open `source` and prepare a font of `size` pixels bound to `atlas`.
    pub fn load(
        atlas: &mut TextureAtlas,
        size: f32,
        source: FontSource,
        loader: Rc<dyn FaceLoader>,
        options: &FontOptions,
    ) -> Result<Self, FontError> {
        check_size(size)?;
        let face = FaceHandle::new(source, loader, options.face_mode);
        let special = special_glyph(atlas, options.scaletex)?;
        let mut font = Self {
            atlas_id: atlas.id(),
            face,
            glyphs: vec![special],
            table: HashMap::new(),
            size,
            strike: None,
            scale: 1.0,
            metrics: FontMetrics::default(),
            hinting: options.hinting,
            kerning: options.kerning,
            filtering: options.filtering,
            scaletex: options.scaletex,
            padding: options.padding,
            lcd_weights: options.lcd_weights,
            rendermode: options.rendermode,
            outline_thickness: options.outline_thickness,
        };
        let depth = atlas.depth();
        font.with_face(|font, face| {
            if depth == Depth::Rgba && face.has_color_glyphs() && !face.renders_color() {
                return Err(FontError::LoadColorNotAvailable);
            }
            font.apply_size(face, size)
        })?;
        log::debug!("loaded font {:?} at {}px", font.face.source(), size);
        Ok(font)
    }

    pub fn from_file(
        atlas: &mut TextureAtlas,
        size: f32,
        path: impl AsRef<Path>,
        options: &FontOptions,
    ) -> Result<Self, FontError> {
        let source = FontSource::File(path.as_ref().to_path_buf());
        Self::load(atlas, size, source, Rc::new(FontdueLoader), options)
    }

    pub fn from_memory(
        atlas: &mut TextureAtlas,
        size: f32,
        bytes: impl Into<Rc<[u8]>>,
        options: &FontOptions,
    ) -> Result<Self, FontError> {
        let source = FontSource::Memory(bytes.into());
        Self::load(atlas, size, source, Rc::new(FontdueLoader), options)
    }

    /// Run `f` with the face open, honoring the lifecycle policy.
    fn with_face<T>(
        &mut self,
        f: impl FnOnce(&mut Self, &dyn FontFace) -> Result<T, FontError>,
    ) -> Result<T, FontError> {
        let face = self.face.enter()?;
        let result = f(self, face.as_ref());
        self.face.leave();
        result
    }

    fn apply_size(&mut self, face: &dyn FontFace, size: f32) -> Result<(), FontError> {
        if face.is_scalable() {
            self.strike = None;
            self.scale = 1.0;
        } else {
            let ratio = |s: f32| if size > s { size / s } else { s / size };
            let strike = face
                .fixed_sizes()
                .into_iter()
                .filter(|s| *s > 0.0)
                .min_by(|a, b| ratio(*a).total_cmp(&ratio(*b)))
                .ok_or(FontError::NoFixedSizeInColorFont)?;
            self.strike = Some(strike);
            self.scale = size / strike;
        }
        self.size = size;

        let m = face.metrics(self.raster_size());
        let ascender = m.ascender.ceil();
        let descender = m.descender.floor();
        let height = m.height.ceil();
        self.metrics = FontMetrics {
            ascender,
            descender,
            height,
            linegap: height - ascender + descender,
            underline_position: m.underline_position.round().min(-2.0),
            underline_thickness: m.underline_thickness.round().max(1.0),
        };
        Ok(())
    }

    fn raster_size(&self) -> f32 {
        self.strike.unwrap_or(self.size)
    }

    fn key(&self, slot: GlyphSlot) -> GlyphKey {
        let thickness = if self.rendermode.is_outline() {
            self.outline_thickness.to_bits()
        } else {
            0
        };
        GlyphKey { slot, mode: self.rendermode, thickness }
    }

    /// Cached glyph for `c` in the current mode. `'\0'` is the solid block.
    pub fn find_glyph(&self, c: char) -> Option<GlyphId> {
        if c == '\0' {
            return Some(SPECIAL);
        }
        self.table.get(&self.key(GlyphSlot::Char(c))).copied()
    }

    pub fn find_glyph_by_index(&self, index: u32) -> Option<GlyphId> {
        self.table.get(&self.key(GlyphSlot::Index(index))).copied()
    }

    /// Cached or freshly rasterized glyph for `c`; `None` when it cannot be
    /// produced, for instance because the atlas is full.
    pub fn get_glyph(&mut self, atlas: &mut TextureAtlas, c: char) -> Option<GlyphId> {
        match self.load_glyph(atlas, c) {
            Ok(id) => Some(id),
            Err(e) => {
                log::warn!("glyph {:?} skipped: {}", c, e);
                None
            }
        }
    }

    /// Like `get_glyph` but reports why a glyph could not be produced.
    pub fn load_glyph(&mut self, atlas: &mut TextureAtlas, c: char) -> Result<GlyphId, FontError> {
        if let Some(id) = self.find_glyph(c) {
            return Ok(id);
        }
        self.check_atlas(atlas)?;
        self.with_face(|font, face| {
            let index = face.glyph_index(c);
            if index == 0 {
                // Missing codepoints share the notdef glyph.
                let id = font.insert_index(atlas, face, 0)?;
                let key = font.key(GlyphSlot::Char(c));
                font.table.insert(key, id);
                return Ok(id);
            }
            let glyph = font.rasterize(atlas, face, c as u32, index)?;
            let key = font.key(GlyphSlot::Char(c));
            let id = font.push(key, glyph);
            if font.kerning {
                font.backfill_kerning(face, id);
            }
            Ok(id)
        })
    }

    /// Glyph by face index, as produced by a shaper. Shaped advances carry
    /// kerning already, so these glyphs have no kerning table.
    pub fn get_glyph_by_index(&mut self, atlas: &mut TextureAtlas, index: u32) -> Option<GlyphId> {
        if let Some(id) = self.find_glyph_by_index(index) {
            return Some(id);
        }
        let result = self
            .check_atlas(atlas)
            .and_then(|_| self.with_face(|font, face| font.insert_index(atlas, face, index)));
        match result {
            Ok(id) => Some(id),
            Err(e) => {
                log::warn!("glyph index {} skipped: {}", index, e);
                None
            }
        }
    }

    fn insert_index(
        &mut self,
        atlas: &mut TextureAtlas,
        face: &dyn FontFace,
        index: u32,
    ) -> Result<GlyphId, FontError> {
        let key = self.key(GlyphSlot::Index(index));
        if let Some(id) = self.table.get(&key) {
            return Ok(*id);
        }
        let glyph = self.rasterize(atlas, face, 0, index)?;
        Ok(self.push(key, glyph))
    }

    fn push(&mut self, key: GlyphKey, glyph: Glyph) -> GlyphId {
        let id = GlyphId(self.glyphs.len());
        self.glyphs.push(glyph);
        self.table.insert(key, id);
        id
    }

    fn check_atlas(&self, atlas: &TextureAtlas) -> Result<(), FontError> {
        if atlas.id() == self.atlas_id {
            Ok(())
        } else {
            Err(FontError::ForeignAtlas)
        }
    }

    /// Record kerning between the new glyph and every codepoint glyph
    /// already cached, in both directions.
    fn backfill_kerning(&mut self, face: &dyn FontFace, new: GlyphId) {
        let px = self.raster_size();
        let (new_cp, new_index) = {
            let g = &self.glyphs[new.0];
            (g.codepoint, g.glyph_index)
        };
        for i in 1..self.glyphs.len() {
            if i == new.0 {
                continue;
            }
            let (prev_cp, prev_index) = {
                let g = &self.glyphs[i];
                (g.codepoint, g.glyph_index)
            };
            if prev_cp == 0 || prev_index == 0 {
                continue;
            }
            let after = face.kerning(prev_index, new_index, px) * self.scale;
            let before = face.kerning(new_index, prev_index, px) * self.scale;
            if after != 0.0 {
                self.glyphs[new.0].kerning.set(prev_cp, after);
            }
            if before != 0.0 {
                self.glyphs[i].kerning.set(new_cp, before);
            }
        }
    }

    fn load_flags(&self, depth: Depth) -> LoadFlags {
        let mut flags = if self.rendermode.is_outline() {
            LoadFlags::NO_BITMAP
        } else {
            LoadFlags::RENDER
        };
        flags |= if self.hinting {
            LoadFlags::FORCE_AUTOHINT
        } else {
            LoadFlags::NO_HINTING
        };
        match depth {
            Depth::Rgb => flags |= LoadFlags::TARGET_LCD,
            Depth::Rgba => flags |= LoadFlags::COLOR,
            Depth::Alpha => {}
        }
        flags
    }

    fn rasterize(
        &self,
        atlas: &mut TextureAtlas,
        face: &dyn FontFace,
        codepoint: u32,
        index: u32,
    ) -> Result<Glyph, FontError> {
        let depth = atlas.depth();
        let mode = self.rendermode;
        let mut raster = face.rasterize(index, self.raster_size(), self.load_flags(depth))?;

        if mode.is_outline() && raster.width > 0 && raster.height > 0 {
            let margin = distance::stroke_margin(self.outline_thickness);
            let (w, h) = (raster.width + 2 * margin, raster.height + 2 * margin);
            let padded = distance::pad(&pixel::coverage(&raster), raster.width, raster.height, margin);
            raster = RasterGlyph {
                width: w,
                height: h,
                pitch: w,
                format: PixelFormat::Gray,
                left: raster.left - margin as i32,
                top: raster.top + margin as i32,
                data: distance::stroke(&padded, w, h, mode, self.outline_thickness),
                ..raster
            };
        }
        if depth == Depth::Rgb && self.filtering && raster.format == PixelFormat::Lcd {
            pixel::lcd_filter(&mut raster.data, raster.width, raster.height, raster.pitch, self.lcd_weights);
        }

        let sdf = mode == RenderMode::SignedDistanceField;
        let pad_lead = self.padding + usize::from(sdf);
        let pad_trail = self.padding + 1;
        let tgt_w = raster.width + pad_lead + pad_trail;
        let tgt_h = raster.height + pad_lead + pad_trail;

        let region = atlas
            .get_region(tgt_w, tgt_h)
            .ok_or(AtlasError::Full { width: tgt_w, height: tgt_h })?;

        let bytes = depth.bytes();
        let mut buffer = vec![0u8; tgt_w * tgt_h * bytes];
        if sdf {
            let mut plane = vec![0u8; tgt_w * tgt_h];
            pixel::blit(&raster, Depth::Alpha, &mut plane[pad_lead * tgt_w + pad_lead..], tgt_w);
            let field = RasterGlyph {
                width: tgt_w,
                height: tgt_h,
                pitch: tgt_w,
                format: PixelFormat::Gray,
                data: distance::distance_field(&plane, tgt_w, tgt_h),
                ..RasterGlyph::empty(0.0)
            };
            pixel::blit(&field, depth, &mut buffer, tgt_w * bytes);
        } else {
            let at = (pad_lead * tgt_w + pad_lead) * bytes;
            pixel::blit(&raster, depth, &mut buffer[at..], tgt_w * bytes);
        }
        atlas.set_region(region.x, region.y, tgt_w, tgt_h, &buffer, tgt_w * bytes)?;

        let (x, y) = (region.x as f32, region.y as f32);
        let (w, h) = (tgt_w as f32, tgt_h as f32);
        let (s0, t0, s1, t1) = if self.scaletex {
            let (aw, ah) = (atlas.width() as f32, atlas.height() as f32);
            (x / aw, y / ah, (x + w) / aw, (y + h) / ah)
        } else {
            (x - 0.5, y - 0.5, x + w - 0.5, y + h - 0.5)
        };

        log::debug!("rasterized glyph {} ({:?}) into {:?}", index, mode, region);
        Ok(Glyph {
            codepoint,
            glyph_index: index,
            width: tgt_w,
            height: tgt_h,
            offset_x: raster.left - pad_lead as i32,
            offset_y: raster.top + pad_lead as i32,
            advance_x: raster.advance_x * self.scale,
            advance_y: raster.advance_y * self.scale,
            s0,
            t0,
            s1,
            t1,
            rendermode: mode,
            outline_thickness: if mode.is_outline() { self.outline_thickness } else { 0.0 },
            is_special: false,
            kerning: Default::default(),
        })
    }

    /// Preload every codepoint of `text`. Returns how many could not be
    /// loaded.
    pub fn load_glyphs(&mut self, atlas: &mut TextureAtlas, text: &str) -> usize {
        // One face scope for the whole batch.
        let held = self.face.enter().is_ok();
        let misses = text.chars().filter(|&c| self.get_glyph(atlas, c).is_none()).count();
        if held {
            self.face.leave();
        }
        misses
    }

    /// Switch to a new size. Cached glyphs belong to the old size and are
    /// dropped; their atlas regions stay allocated until the atlas is
    /// cleared.
    pub fn set_size(&mut self, size: f32) -> Result<(), FontError> {
        check_size(size)?;
        self.with_face(|font, face| font.apply_size(face, size))?;
        self.glyphs.truncate(1);
        self.table.clear();
        Ok(())
    }

    /// An independent font over the same face at another size.
    pub fn clone_with_size(&self, atlas: &mut TextureAtlas, size: f32) -> Result<Self, FontError> {
        check_size(size)?;
        self.check_atlas(atlas)?;
        let mut font = Self {
            atlas_id: self.atlas_id,
            face: self.face.share(),
            glyphs: vec![special_glyph(atlas, self.scaletex)?],
            table: HashMap::new(),
            size,
            strike: None,
            scale: 1.0,
            metrics: FontMetrics::default(),
            hinting: self.hinting,
            kerning: self.kerning,
            filtering: self.filtering,
            scaletex: self.scaletex,
            padding: self.padding,
            lcd_weights: self.lcd_weights,
            rendermode: self.rendermode,
            outline_thickness: self.outline_thickness,
        };
        font.with_face(|font, face| font.apply_size(face, size))?;
        Ok(font)
    }

    /// Grow `atlas` and keep this font's texture coordinates valid.
    ///
    /// Only this font is rescaled. When other fonts share the atlas, grow
    /// it through `FontManager::enlarge_atlas` instead, or call
    /// `rescale_glyphs` on each of them.
    pub fn enlarge_atlas(
        &mut self,
        atlas: &mut TextureAtlas,
        width: usize,
        height: usize,
    ) -> Result<(), FontError> {
        self.check_atlas(atlas)?;
        let (old_w, old_h) = (atlas.width(), atlas.height());
        atlas.enlarge(width, height)?;
        self.rescale_glyphs(old_w, old_h, width, height);
        Ok(())
    }

    /// Rescale normalized texture coordinates after the atlas grew. Pixel
    /// coordinates do not move.
    pub fn rescale_glyphs(&mut self, old_w: usize, old_h: usize, new_w: usize, new_h: usize) {
        if !self.scaletex {
            return;
        }
        let sx = old_w as f32 / new_w as f32;
        let sy = old_h as f32 / new_h as f32;
        for g in &mut self.glyphs {
            g.s0 *= sx;
            g.s1 *= sx;
            g.t0 *= sy;
            g.t1 *= sy;
        }
    }

    /// Close the face if the lifecycle policy allows it.
    pub fn close_face(&mut self) {
        self.face.close();
    }

    pub fn face(&self) -> &FaceHandle {
        &self.face
    }

    pub fn set_face_mode(&mut self, mode: FaceMode) {
        self.face.set_mode(mode);
    }

    pub fn glyph(&self, id: GlyphId) -> Option<&Glyph> {
        self.glyphs.get(id.0)
    }

    pub fn special_glyph(&self) -> &Glyph {
        &self.glyphs[SPECIAL.0]
    }

    /// Every cached variant of `c`.
    pub fn variants(&self, c: char) -> Vec<GlyphId> {
        let mut ids: Vec<GlyphId> = self
            .table
            .iter()
            .filter(|(k, _)| k.slot == GlyphSlot::Char(c))
            .map(|(_, id)| *id)
            .collect();
        ids.sort_by_key(|id| id.0);
        ids.dedup();
        ids
    }

    /// Cached codepoint glyphs in load order, with the codepoint that
    /// requested each one.
    pub fn codepoint_glyphs(&self) -> Vec<(char, &Glyph)> {
        let mut out: Vec<(char, GlyphId)> = self
            .table
            .iter()
            .filter_map(|(k, id)| match k.slot {
                GlyphSlot::Char(c) => Some((c, *id)),
                GlyphSlot::Index(_) => None,
            })
            .collect();
        out.sort_by_key(|(c, id)| (id.0, *c));
        out.into_iter().map(|(c, id)| (c, &self.glyphs[id.0])).collect()
    }

    /// Number of rasterized glyphs, the solid block excluded.
    pub fn glyph_count(&self) -> usize {
        self.glyphs.len() - 1
    }

    pub fn size(&self) -> f32 {
        self.size
    }

    /// Factor from the active bitmap strike to the requested size.
    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn metrics(&self) -> &FontMetrics {
        &self.metrics
    }

    pub fn atlas_id(&self) -> AtlasId {
        self.atlas_id
    }

    pub fn source(&self) -> &FontSource {
        self.face.source()
    }
}

impl std::fmt::Debug for TextureFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextureFont")
            .field("source", self.face.source())
            .field("size", &self.size)
            .field("glyphs", &self.glyph_count())
            .field("rendermode", &self.rendermode)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::synthetic::{SyntheticFace, SyntheticLoader};
    use approx::assert_relative_eq;

    fn memory() -> FontSource {
        FontSource::Memory(Rc::from(vec![0u8]))
    }

    fn font_with(face: SyntheticFace, atlas: &mut TextureAtlas, size: f32) -> TextureFont {
        let loader = Rc::new(SyntheticLoader::new(face));
        TextureFont::load(atlas, size, memory(), loader, &FontOptions::default()).unwrap()
    }

    fn setup() -> (TextureAtlas, TextureFont) {
        let mut atlas = TextureAtlas::new(512, 512, Depth::Alpha).unwrap();
        let font = font_with(SyntheticFace::new(), &mut atlas, 12.0);
        (atlas, font)
    }

    /// Atlas pixel rectangle of a normalized glyph.
    fn rect(g: &Glyph, atlas: &TextureAtlas) -> (usize, usize, usize, usize) {
        let x = (g.s0 * atlas.width() as f32).round() as usize;
        let y = (g.t0 * atlas.height() as f32).round() as usize;
        (x, y, g.width, g.height)
    }

    #[test]
    fn test_metrics() {
        let (_, font) = setup();
        let m = font.metrics();
        assert_eq!(m.ascender, 9.0);
        assert_eq!(m.descender, -3.0);
        assert_eq!(m.height, 15.0);
        assert_eq!(m.linegap, 3.0);
        assert_eq!(m.underline_position, -2.0);
        assert_eq!(m.underline_thickness, 1.0);
    }

    #[test]
    fn test_special_glyph_resident() {
        let (atlas, font) = setup();
        let id = font.find_glyph('\0').unwrap();
        let g = font.glyph(id).unwrap();
        assert!(g.is_special);
        let x = (g.s0 * 512.0).round() as usize;
        let y = (g.t0 * 512.0).round() as usize;
        assert_eq!(atlas.pixel(x, y), &[255]);
        assert_eq!(font.glyph_count(), 0);
    }

    #[test]
    fn test_get_glyph_idempotent_per_variant() {
        let (mut atlas, mut font) = setup();
        let a = font.get_glyph(&mut atlas, 'A').unwrap();
        assert_eq!(font.get_glyph(&mut atlas, 'A'), Some(a));

        font.rendermode = RenderMode::OutlineEdge;
        font.outline_thickness = 2.0;
        let outlined = font.get_glyph(&mut atlas, 'A').unwrap();
        assert_ne!(outlined, a);
        assert_eq!(font.variants('A'), vec![a, outlined]);

        let (ax, ay, aw, ah) = rect(font.glyph(a).unwrap(), &atlas);
        let (bx, by, bw, bh) = rect(font.glyph(outlined).unwrap(), &atlas);
        let disjoint = ax + aw <= bx || bx + bw <= ax || ay + ah <= by || by + bh <= ay;
        assert!(disjoint);
    }

    #[test]
    fn test_thickness_ignored_outside_outline_modes() {
        let (mut atlas, mut font) = setup();
        let a = font.get_glyph(&mut atlas, 'A').unwrap();
        font.outline_thickness = 3.0;
        assert_eq!(font.find_glyph('A'), Some(a));
    }

    #[test]
    fn test_glyph_geometry() {
        let (mut atlas, mut font) = setup();
        let id = font.get_glyph(&mut atlas, 'A').unwrap();
        let g = font.glyph(id).unwrap();
        assert_eq!((g.width, g.height), (7, 10));
        assert_eq!((g.offset_x, g.offset_y), (0, 9));
        assert_relative_eq!(g.advance_x, 7.2, epsilon = 1e-5);
        assert!(g.s0 < g.s1 && g.t0 < g.t1);
        let (x, y, _, _) = rect(g, &atlas);
        assert_eq!(atlas.pixel(x, y), &[255]);
        // Trailing gutter stays clear.
        assert_eq!(atlas.pixel(x + 6, y), &[0]);
    }

    #[test]
    fn test_sdf_padding_moves_bearings() {
        let (mut atlas, mut font) = setup();
        font.rendermode = RenderMode::SignedDistanceField;
        let id = font.get_glyph(&mut atlas, 'A').unwrap();
        let g = font.glyph(id).unwrap();
        assert_eq!((g.width, g.height), (8, 11));
        assert_eq!((g.offset_x, g.offset_y), (-1, 10));
    }

    #[test]
    fn test_outline_margin() {
        let (mut atlas, mut font) = setup();
        font.rendermode = RenderMode::OutlineEdge;
        font.outline_thickness = 2.0;
        let id = font.get_glyph(&mut atlas, 'A').unwrap();
        let g = font.glyph(id).unwrap();
        assert_eq!((g.width, g.height), (13, 16));
        assert_eq!((g.offset_x, g.offset_y), (-3, 12));
        assert_eq!(g.outline_thickness, 2.0);
    }

    #[test]
    fn test_user_padding() {
        let (mut atlas, mut font) = setup();
        font.padding = 2;
        let id = font.get_glyph(&mut atlas, 'A').unwrap();
        let g = font.glyph(id).unwrap();
        assert_eq!((g.width, g.height), (11, 14));
        assert_eq!((g.offset_x, g.offset_y), (-2, 11));
    }

    #[test]
    fn test_kerning_backfill() {
        let mut atlas = TextureAtlas::new(512, 512, Depth::Alpha).unwrap();
        let face = SyntheticFace::new().with_kerning('A', 'V', -0.1);
        let mut font = font_with(face, &mut atlas, 12.0);
        assert_eq!(font.load_glyphs(&mut atlas, "AV"), 0);
        let v = font.find_glyph('V').unwrap();
        let k = font.glyph(v).unwrap().get_kerning('A');
        assert_relative_eq!(k, -1.2, epsilon = 1e-5);
        assert!(k < 0.0 && k.abs() < 5.0);
        let a = font.find_glyph('A').unwrap();
        assert_eq!(font.glyph(a).unwrap().get_kerning('V'), 0.0);
    }

    #[test]
    fn test_kerning_backfill_either_order() {
        let mut atlas = TextureAtlas::new(512, 512, Depth::Alpha).unwrap();
        let face = SyntheticFace::new().with_kerning('A', 'V', -0.1);
        let mut font = font_with(face, &mut atlas, 12.0);
        font.load_glyphs(&mut atlas, "VA");
        let v = font.find_glyph('V').unwrap();
        assert_relative_eq!(font.glyph(v).unwrap().get_kerning('A'), -1.2, epsilon = 1e-5);
    }

    #[test]
    fn test_kerning_disabled() {
        let mut atlas = TextureAtlas::new(512, 512, Depth::Alpha).unwrap();
        let face = SyntheticFace::new().with_kerning('A', 'V', -0.1);
        let mut font = font_with(face, &mut atlas, 12.0);
        font.kerning = false;
        font.load_glyphs(&mut atlas, "AV");
        let v = font.find_glyph('V').unwrap();
        assert!(font.glyph(v).unwrap().kerning.is_empty());
    }

    #[test]
    fn test_missing_codepoints_share_notdef() {
        let (mut atlas, mut font) = setup();
        let a = font.get_glyph(&mut atlas, '中').unwrap();
        let b = font.get_glyph(&mut atlas, '字').unwrap();
        assert_eq!(a, b);
        assert!(font.glyph(a).unwrap().is_missing());
        assert_eq!(font.glyph_count(), 1);
    }

    #[test]
    fn test_atlas_full_keeps_font_usable() {
        let mut atlas = TextureAtlas::new(16, 16, Depth::Alpha).unwrap();
        let mut font = font_with(SyntheticFace::new(), &mut atlas, 12.0);
        assert_eq!(font.load_glyphs(&mut atlas, "AB"), 1);
        assert!(font.find_glyph('A').is_some());
        assert!(font.find_glyph('B').is_none());
        assert!(matches!(
            font.load_glyph(&mut atlas, 'B'),
            Err(FontError::Atlas(AtlasError::Full { .. }))
        ));
    }

    #[test]
    fn test_enlarge_rescales_coordinates() {
        let mut atlas = TextureAtlas::new(16, 16, Depth::Alpha).unwrap();
        let mut font = font_with(SyntheticFace::new(), &mut atlas, 12.0);
        let a = font.get_glyph(&mut atlas, 'A').unwrap();
        let before = rect(font.glyph(a).unwrap(), &atlas);
        font.enlarge_atlas(&mut atlas, 64, 64).unwrap();
        assert_eq!(rect(font.glyph(a).unwrap(), &atlas), before);
        assert!(font.get_glyph(&mut atlas, 'B').is_some());
    }

    #[test]
    fn test_enlarge_leaves_sibling_fonts_to_caller() {
        let mut atlas = TextureAtlas::new(32, 32, Depth::Alpha).unwrap();
        let mut first = font_with(SyntheticFace::new(), &mut atlas, 12.0);
        let mut second = font_with(SyntheticFace::new(), &mut atlas, 10.0);
        let a = first.get_glyph(&mut atlas, 'A').unwrap();
        let b = second.get_glyph(&mut atlas, 'A').unwrap();
        let before = rect(second.glyph(b).unwrap(), &atlas);

        first.enlarge_atlas(&mut atlas, 64, 64).unwrap();
        assert!(first.glyph(a).is_some());
        assert_ne!(rect(second.glyph(b).unwrap(), &atlas), before);
        second.rescale_glyphs(32, 32, 64, 64);
        assert_eq!(rect(second.glyph(b).unwrap(), &atlas), before);
    }

    #[test]
    fn test_pixel_coordinates_without_scaletex() {
        let mut atlas = TextureAtlas::new(64, 64, Depth::Alpha).unwrap();
        let loader = Rc::new(SyntheticLoader::new(SyntheticFace::new()));
        let options = FontOptions { scaletex: false, ..Default::default() };
        let mut font = TextureFont::load(&mut atlas, 12.0, memory(), loader, &options).unwrap();
        let id = font.get_glyph(&mut atlas, 'A').unwrap();
        let g = font.glyph(id).unwrap();
        assert_eq!(g.s1 - g.s0, 7.0);
        assert_eq!(g.s0.fract(), 0.5);
        let (x, y) = ((g.s0 + 0.5) as usize, (g.t0 + 0.5) as usize);
        assert_eq!(atlas.pixel(x, y), &[255]);
    }

    #[test]
    fn test_set_size_drops_glyphs() {
        let (mut atlas, mut font) = setup();
        font.get_glyph(&mut atlas, 'A').unwrap();
        font.set_size(24.0).unwrap();
        assert_eq!(font.metrics().ascender, 18.0);
        assert!(font.find_glyph('A').is_none());
        assert!(font.find_glyph('\0').is_some());
        assert!(matches!(font.set_size(0.0), Err(FontError::InvalidSize(_))));
    }

    #[test]
    fn test_bitmap_strike_scaling() {
        let mut atlas = TextureAtlas::new(512, 512, Depth::Alpha).unwrap();
        let face = SyntheticFace::new().bitmap_only(&[16.0, 32.0]);
        let mut font = font_with(face, &mut atlas, 20.0);
        assert_relative_eq!(font.scale(), 1.25);
        assert_eq!(font.metrics().ascender, 12.0);
        let id = font.get_glyph(&mut atlas, 'A').unwrap();
        assert_relative_eq!(font.glyph(id).unwrap().advance_x, 12.0, epsilon = 1e-4);

        font.set_size(30.0).unwrap();
        assert_relative_eq!(font.scale(), 30.0 / 32.0);
    }

    #[test]
    fn test_bitmap_strike_cannot_outline() {
        let mut atlas = TextureAtlas::new(512, 512, Depth::Alpha).unwrap();
        let mut font = font_with(SyntheticFace::new().bitmap_only(&[16.0]), &mut atlas, 16.0);
        font.rendermode = RenderMode::OutlinePositive;
        font.outline_thickness = 1.0;
        assert!(matches!(font.load_glyph(&mut atlas, 'A'), Err(FontError::Stroker(_))));
    }

    #[test]
    fn test_foreign_atlas_rejected() {
        let (_, mut font) = setup();
        let mut other = TextureAtlas::new(64, 64, Depth::Alpha).unwrap();
        assert!(matches!(font.load_glyph(&mut other, 'A'), Err(FontError::ForeignAtlas)));
    }

    #[test]
    fn test_glyph_by_index() {
        let (mut atlas, mut font) = setup();
        let by_char = font.get_glyph(&mut atlas, 'A').unwrap();
        let index = 'A' as u32 - ' ' as u32 + 1;
        let by_index = font.get_glyph_by_index(&mut atlas, index).unwrap();
        assert_ne!(by_char, by_index);
        let g = font.glyph(by_index).unwrap();
        assert_eq!((g.codepoint, g.glyph_index), (0, index));
        assert_eq!(font.find_glyph_by_index(index), Some(by_index));
        assert!(font.get_glyph_by_index(&mut atlas, 10_000).is_none());
    }

    #[test]
    fn test_lcd_atlas() {
        let mut atlas = TextureAtlas::new(128, 128, Depth::Rgb).unwrap();
        let mut font = font_with(SyntheticFace::new(), &mut atlas, 12.0);
        let id = font.get_glyph(&mut atlas, 'H').unwrap();
        let (x, y, _, _) = rect(font.glyph(id).unwrap(), &atlas);
        assert!(atlas.pixel(x + 3, y + 3).iter().all(|&b| b > 0));
    }

    #[test]
    fn test_rgba_atlas_color_glyph() {
        let mut atlas = TextureAtlas::new(128, 128, Depth::Rgba).unwrap();
        let mut font = font_with(SyntheticFace::new().with_color(), &mut atlas, 12.0);
        let id = font.get_glyph(&mut atlas, 'H').unwrap();
        let (x, y, _, _) = rect(font.glyph(id).unwrap(), &atlas);
        assert_eq!(atlas.pixel(x, y), &[255, 127, 0, 255]);
    }

    #[test]
    fn test_clone_shares_face() {
        let mut atlas = TextureAtlas::new(512, 512, Depth::Alpha).unwrap();
        let loader = Rc::new(SyntheticLoader::new(SyntheticFace::new()));
        let mut font =
            TextureFont::load(&mut atlas, 12.0, memory(), loader.clone(), &FontOptions::default())
                .unwrap();
        font.get_glyph(&mut atlas, 'A').unwrap();
        let mut big = font.clone_with_size(&mut atlas, 24.0).unwrap();
        assert_eq!(loader.open_count(), 1);
        assert_eq!(big.glyph_count(), 0);
        assert_eq!(big.metrics().ascender, 18.0);
        big.get_glyph(&mut atlas, 'A').unwrap();
        assert_eq!(font.glyph_count(), 1);
        assert_eq!(big.special_glyph().s0, font.special_glyph().s0);
    }

    #[test]
    fn test_auto_close_reopens_per_call() {
        let mut atlas = TextureAtlas::new(512, 512, Depth::Alpha).unwrap();
        let loader = Rc::new(SyntheticLoader::new(SyntheticFace::new()));
        let options = FontOptions { face_mode: FaceMode::AutoClose, ..Default::default() };
        let mut font =
            TextureFont::load(&mut atlas, 12.0, memory(), loader.clone(), &options).unwrap();
        assert!(!font.face().is_open());
        assert_eq!(font.load_glyphs(&mut atlas, "abc"), 0);
        assert_eq!(loader.open_count(), 2);
        assert!(!font.face().is_open());
    }

    #[test]
    fn test_manual_close() {
        let mut atlas = TextureAtlas::new(512, 512, Depth::Alpha).unwrap();
        let loader = Rc::new(SyntheticLoader::new(SyntheticFace::new()));
        let options = FontOptions { face_mode: FaceMode::ManualClose, ..Default::default() };
        let mut font =
            TextureFont::load(&mut atlas, 12.0, memory(), loader.clone(), &options).unwrap();
        assert!(font.face().is_open());
        font.close_face();
        assert!(!font.face().is_open());
        font.get_glyph(&mut atlas, 'x').unwrap();
        assert_eq!(loader.open_count(), 2);
    }

    #[test]
    fn test_codepoint_glyphs_in_load_order() {
        let (mut atlas, mut font) = setup();
        font.load_glyphs(&mut atlas, "ba");
        let chars: Vec<char> = font.codepoint_glyphs().iter().map(|(c, _)| *c).collect();
        assert_eq!(chars, vec!['b', 'a']);
    }

    #[test]
    fn test_dejavu_end_to_end() {
        let path = "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf";
        if !Path::new(path).exists() {
            return;
        }
        let mut atlas = TextureAtlas::new(512, 512, Depth::Alpha).unwrap();
        let mut font = TextureFont::from_file(&mut atlas, 32.0, path, &FontOptions::default()).unwrap();
        assert_eq!(font.load_glyphs(&mut atlas, "AV"), 0);
        let v = font.find_glyph('V').unwrap();
        let k = font.glyph(v).unwrap().get_kerning('A');
        assert!(k <= 0.0 && k.abs() < 5.0);
    }
}
