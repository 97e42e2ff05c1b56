/// `FontFace` backend on fontdue. fontdue covers outlines, metrics and
/// kerning; underline metrics and color-table detection come from a small
/// sfnt table reader.

use crate::error::FontError;
use crate::font::face::{
    read_source, FaceLoader, FaceMetrics, FontFace, FontSource, LoadFlags, PixelFormat,
    RasterGlyph,
};
use std::rc::Rc;

#[derive(Clone, Copy)]
struct R<'a>(&'a [u8], usize);

impl<'a> R<'a> {
    fn u16(&mut self) -> Option<u16> {
        let s = self.0.get(self.1..self.1 + 2)?;
        self.1 += 2;
        Some(u16::from_be_bytes(s.try_into().ok()?))
    }
    fn i16(&mut self) -> Option<i16> {
        self.u16().map(|v| v as i16)
    }
    fn u32(&mut self) -> Option<u32> {
        let s = self.0.get(self.1..self.1 + 4)?;
        self.1 += 4;
        Some(u32::from_be_bytes(s.try_into().ok()?))
    }
    fn tag(&mut self) -> Option<[u8; 4]> {
        let s = self.0.get(self.1..self.1 + 4)?;
        self.1 += 4;
        s.try_into().ok()
    }
}

/// What fontdue does not expose, read straight from the table directory.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct SfntInfo {
    /// Underline position and thickness in font units.
    underline: Option<(i16, i16)>,
    color: bool,
    outlines: bool,
}

fn table_offset(data: &[u8], tag: &[u8; 4]) -> Option<usize> {
    let mut base = 0usize;
    if data.get(0..4)? == b"ttcf" {
        base = R(data, 12).u32()? as usize;
    }
    let count = R(data, base + 4).u16()? as usize;
    (0..count).find_map(|i| {
        let mut r = R(data, base + 12 + i * 16);
        let t = r.tag()?;
        r.u32()?;
        let offset = r.u32()? as usize;
        (&t == tag).then_some(offset)
    })
}

fn read_sfnt(data: &[u8]) -> SfntInfo {
    let underline = table_offset(data, b"post").and_then(|post| {
        let position = R(data, post + 8).i16()?;
        let thickness = R(data, post + 10).i16()?;
        Some((position, thickness))
    });
    let has = |tag: &[u8; 4]| table_offset(data, tag).is_some();
    SfntInfo {
        underline,
        color: has(b"CBDT") || has(b"sbix") || has(b"COLR"),
        outlines: has(b"glyf") || has(b"CFF ") || has(b"CFF2"),
    }
}

pub struct FontdueFace {
    font: fontdue::Font,
    info: SfntInfo,
}

impl FontdueFace {
    pub fn from_bytes(data: &[u8]) -> Result<Self, FontError> {
        let font = fontdue::Font::from_bytes(data, fontdue::FontSettings::default())
            .map_err(|e| FontError::FontUnavailable(e.to_string()))?;
        let info = read_sfnt(data);
        Ok(Self { font, info })
    }

    fn index(&self, index: u32) -> Result<u16, FontError> {
        match u16::try_from(index) {
            Ok(i) if i < self.font.glyph_count() => Ok(i),
            _ => Err(FontError::Rasterizer(format!("glyph index {} out of range", index))),
        }
    }
}

impl FontFace for FontdueFace {
    fn metrics(&self, px: f32) -> FaceMetrics {
        let line = self.font.horizontal_line_metrics(px);
        let (ascender, descender, height) = match line {
            Some(m) => (m.ascent, m.descent, m.new_line_size),
            None => (px * 0.8, -px * 0.2, px * 1.2),
        };
        let scale = px / self.font.units_per_em();
        let (position, thickness) = match self.info.underline {
            Some((p, t)) => (p as f32 * scale, t as f32 * scale),
            None => (-px * 0.1, px * 0.05),
        };
        FaceMetrics {
            ascender,
            descender,
            height,
            underline_position: position,
            underline_thickness: thickness,
        }
    }

    fn is_scalable(&self) -> bool {
        self.info.outlines
    }

    fn fixed_sizes(&self) -> Vec<f32> {
        Vec::new()
    }

    fn has_color_glyphs(&self) -> bool {
        self.info.color
    }

    fn renders_color(&self) -> bool {
        false
    }

    fn glyph_index(&self, c: char) -> u32 {
        self.font.lookup_glyph_index(c) as u32
    }

    fn rasterize(&self, index: u32, px: f32, flags: LoadFlags) -> Result<RasterGlyph, FontError> {
        let index = self.index(index)?;
        if flags.contains(LoadFlags::NO_BITMAP) && !self.info.outlines {
            return Err(FontError::Stroker("face has no outlines".into()));
        }
        let (metrics, data, format) = if flags.contains(LoadFlags::TARGET_LCD) {
            let (m, d) = self.font.rasterize_indexed_subpixel(index, px);
            (m, d, PixelFormat::Lcd)
        } else {
            let (m, d) = self.font.rasterize_indexed(index, px);
            (m, d, PixelFormat::Gray)
        };
        Ok(RasterGlyph {
            width: metrics.width,
            height: metrics.height,
            pitch: metrics.width * format.bytes(),
            format,
            left: metrics.xmin,
            top: metrics.ymin + metrics.height as i32,
            advance_x: metrics.advance_width,
            advance_y: metrics.advance_height,
            data,
        })
    }

    fn kerning(&self, left: u32, right: u32, px: f32) -> f32 {
        match (self.index(left), self.index(right)) {
            (Ok(l), Ok(r)) => self.font.horizontal_kern_indexed(l, r, px).unwrap_or(0.0),
            _ => 0.0,
        }
    }
}

/// Opens faces from files or memory through fontdue.
#[derive(Debug, Default, Clone, Copy)]
pub struct FontdueLoader;

impl FaceLoader for FontdueLoader {
    fn open(&self, source: &FontSource) -> Result<Rc<dyn FontFace>, FontError> {
        let bytes = read_source(source)?;
        let face = FontdueFace::from_bytes(&bytes).map_err(|e| match (e, source.path()) {
            (FontError::FontUnavailable(msg), Some(path)) => {
                FontError::FontUnavailable(format!("{}: {}", path.display(), msg))
            }
            (e, _) => e,
        })?;
        Ok(Rc::new(face))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    const DEJAVU: &str = "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf";

    /// A minimal table directory holding the named tables, each 16 bytes.
    fn sfnt(tables: &[(&[u8; 4], [u8; 16])]) -> Vec<u8> {
        let mut out = vec![0, 1, 0, 0];
        out.extend_from_slice(&(tables.len() as u16).to_be_bytes());
        out.extend_from_slice(&[0; 6]);
        let mut offset = 12 + tables.len() * 16;
        for (tag, _) in tables {
            out.extend_from_slice(*tag);
            out.extend_from_slice(&[0; 4]);
            out.extend_from_slice(&(offset as u32).to_be_bytes());
            out.extend_from_slice(&16u32.to_be_bytes());
            offset += 16;
        }
        for (_, body) in tables {
            out.extend_from_slice(body);
        }
        out
    }

    #[test]
    fn test_read_sfnt_underline() {
        let mut post = [0u8; 16];
        post[8..10].copy_from_slice(&(-150i16).to_be_bytes());
        post[10..12].copy_from_slice(&50i16.to_be_bytes());
        let info = read_sfnt(&sfnt(&[(b"glyf", [0; 16]), (b"post", post)]));
        assert_eq!(info.underline, Some((-150, 50)));
        assert!(info.outlines);
        assert!(!info.color);
    }

    #[test]
    fn test_read_sfnt_color_only() {
        let info = read_sfnt(&sfnt(&[(b"CBDT", [0; 16])]));
        assert!(info.color);
        assert!(!info.outlines);
        assert_eq!(info.underline, None);
    }

    #[test]
    fn test_read_sfnt_truncated() {
        assert_eq!(read_sfnt(&[0, 1]), SfntInfo::default());
    }

    #[test]
    fn test_garbage_is_unavailable() {
        let err = FontdueFace::from_bytes(b"definitely not a font").err();
        assert!(matches!(err, Some(FontError::FontUnavailable(_))));
    }

    #[test]
    fn test_dejavu_glyph() {
        if !Path::new(DEJAVU).exists() {
            return;
        }
        let face = FontdueLoader.open(&FontSource::File(DEJAVU.into())).unwrap();
        let index = face.glyph_index('A');
        assert_ne!(index, 0);
        let g = face.rasterize(index, 32.0, LoadFlags::RENDER).unwrap();
        assert!(g.width > 0 && g.height > 0);
        assert_eq!(g.data.len(), g.width * g.height);
        let lcd = face.rasterize(index, 32.0, LoadFlags::TARGET_LCD).unwrap();
        assert_eq!(lcd.data.len(), lcd.width * lcd.height * 3);
        let m = face.metrics(32.0);
        assert!(m.ascender > 0.0 && m.descender < 0.0);
        assert!(m.underline_position < 0.0);
        assert!(face.rasterize(u32::MAX, 32.0, LoadFlags::RENDER).is_err());
    }
}
