/// Typesetter: turns styled runs into textured quads, one vertex item per
/// run, with per-line bookkeeping for alignment and bounds. Coordinates
/// are y up; a pen at (x, y) sits on the baseline of the line below it
/// once the line's ascender is known.

use crate::atlas::TextureAtlas;
use crate::config::Config;
use crate::error::TextError;
use crate::font::{FontMetrics, Glyph, TextureFont};
use crate::manager::FontManager;
use crate::text::markup::{Color, Markup};
use crate::text::shaper::ShapedGlyph;
use crate::text::vertex_buffer::{Vertex, VertexBuffer};

/// One corner of a glyph or decoration quad.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GlyphVertex {
    /// Pixel position, x snapped to whole pixels.
    pub position: [f32; 3],
    pub tex_coord: [f32; 2],
    pub color: [f32; 4],
    /// Fractional part of x lost to snapping.
    pub shift: f32,
    pub gamma: f32,
}

impl Vertex for GlyphVertex {
    const FORMAT: &'static str = "vertex:3f,tex_coord:2f,color:4f,ashift:1f,agamma:1f";
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pen {
    pub x: f32,
    pub y: f32,
}

impl Pen {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Rectangle with `top` above `top - height`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn right(&self) -> f32 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.top - self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineInfo {
    /// First vertex of the line.
    pub start: usize,
    pub bounds: Rect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

const QUAD: [u32; 6] = [0, 1, 2, 0, 2, 3];

/// Quads for one glyph, flushed into the buffer together.
#[derive(Default)]
struct Quads {
    vertices: Vec<GlyphVertex>,
    indices: Vec<u32>,
}

impl Quads {
    #[allow(clippy::too_many_arguments)]
    fn push(&mut self, x0: f32, y0: f32, x1: f32, y1: f32, uv: [f32; 4], color: Color, gamma: f32) {
        let [s0, t0, s1, t1] = uv;
        let color = color.to_array();
        let base = self.vertices.len() as u32;
        let corner = |x: f32, y: f32, s: f32, t: f32| GlyphVertex {
            position: [x.floor(), y, 0.0],
            tex_coord: [s, t],
            color,
            shift: x - x.floor(),
            gamma,
        };
        self.vertices.extend_from_slice(&[
            corner(x0, y0, s0, t0),
            corner(x0, y1, s0, t1),
            corner(x1, y1, s1, t1),
            corner(x1, y0, s1, t0),
        ]);
        self.indices.extend(QUAD.iter().map(|i| base + i));
    }
}

pub struct TextBuffer {
    buffer: VertexBuffer<GlyphVertex>,
    lines: Vec<LineInfo>,
    origin: Pen,
    /// Pen after the last run, used to close its line when the next run
    /// starts elsewhere.
    last_pen: Pen,
    bounds: Rect,
    line_start: usize,
    line_left: f32,
    line_ascender: f32,
    line_descender: f32,
    /// Foreground for markups without one.
    pub base_color: Color,
}

impl Default for TextBuffer {
    fn default() -> Self {
        Self::new()
    }
}

fn font_for<'a>(
    fonts: &'a mut FontManager,
    markup: &Markup,
) -> Result<(&'a mut TextureFont, &'a mut TextureAtlas), TextError> {
    let id = markup.font.ok_or(TextError::NoFontInMarkup)?;
    fonts.font_and_atlas_mut(id).ok_or(TextError::UnknownFont)
}

impl TextBuffer {
    pub fn new() -> Self {
        Self {
            buffer: VertexBuffer::new(),
            lines: Vec::new(),
            origin: Pen::default(),
            last_pen: Pen::default(),
            bounds: Rect::default(),
            line_start: 0,
            line_left: 0.0,
            line_ascender: 0.0,
            line_descender: 0.0,
            base_color: Color::BLACK,
        }
    }

    pub fn with_base_color(base_color: Color) -> Self {
        Self { base_color, ..Self::new() }
    }

    /// A buffer drawing in the configured base color.
    pub fn from_config(config: &Config) -> Self {
        Self::with_base_color(config.text.color())
    }

    pub fn buffer(&self) -> &VertexBuffer<GlyphVertex> {
        &self.buffer
    }

    /// Finished lines.
    pub fn lines(&self) -> &[LineInfo] {
        &self.lines
    }

    /// Append several runs in order.
    pub fn printf(
        &mut self,
        fonts: &mut FontManager,
        pen: &mut Pen,
        runs: &[(&Markup, &str)],
    ) -> Result<(), TextError> {
        for (markup, text) in runs {
            self.add_text(fonts, pen, markup, text, None)?;
        }
        Ok(())
    }

    /// Append one run. `length` limits the number of characters used.
    pub fn add_text(
        &mut self,
        fonts: &mut FontManager,
        pen: &mut Pen,
        markup: &Markup,
        text: &str,
        length: Option<usize>,
    ) -> Result<(), TextError> {
        let (font, atlas) = font_for(fonts, markup)?;
        self.begin_run(pen);
        let mut previous = None;
        for c in text.chars().take(length.unwrap_or(usize::MAX)) {
            self.put_char(font, atlas, pen, markup, c, previous);
            previous = Some(c);
        }
        self.last_pen = *pen;
        Ok(())
    }

    /// Append one character to the current run, kerned against `previous`.
    pub fn add_char(
        &mut self,
        fonts: &mut FontManager,
        pen: &mut Pen,
        markup: &Markup,
        current: char,
        previous: Option<char>,
    ) -> Result<(), TextError> {
        let (font, atlas) = font_for(fonts, markup)?;
        self.put_char(font, atlas, pen, markup, current, previous);
        self.last_pen = *pen;
        Ok(())
    }

    /// Append a shaped run. Advances and offsets come from the shaper, so
    /// no kerning is applied here.
    pub fn add_glyph_run(
        &mut self,
        fonts: &mut FontManager,
        pen: &mut Pen,
        markup: &Markup,
        glyphs: &[ShapedGlyph],
    ) -> Result<(), TextError> {
        let (font, atlas) = font_for(fonts, markup)?;
        self.begin_run(pen);
        let metrics = *font.metrics();
        for shaped in glyphs {
            self.adopt_metrics(pen, &metrics);
            let Some(id) = font.get_glyph_by_index(atlas, shaped.glyph_index) else {
                continue;
            };
            let Some(glyph) = font.glyph(id) else {
                continue;
            };
            let at = Pen::new(pen.x + shaped.x_offset, pen.y + shaped.y_offset);
            let quads = self.quads(*pen, at, markup, &metrics, glyph, font.special_glyph(), 0.0, shaped.x_advance);
            self.buffer.extend_last(&quads.vertices, &quads.indices);
            pen.x += shaped.x_advance * (1.0 + markup.spacing);
            pen.y += shaped.y_advance;
        }
        self.last_pen = *pen;
        Ok(())
    }

    fn begin_run(&mut self, pen: &Pen) {
        let moved = pen.y != self.last_pen.y;
        if self.buffer.vertices().is_empty() {
            self.origin = *pen;
            self.line_left = pen.x;
            self.bounds.left = pen.x;
            self.bounds.top = pen.y;
            if moved {
                self.reset_line_metrics();
            }
        } else {
            self.origin.x = self.origin.x.min(pen.x);
            if moved {
                if self.line_start != self.buffer.vertices().len() {
                    let mut last = self.last_pen;
                    self.finish_line(&mut last, false);
                } else {
                    // Runs that emitted nothing leave no line behind.
                    self.reset_line_metrics();
                }
                self.line_left = pen.x;
            }
        }
        self.buffer.push_back(&[], &[]);
    }

    fn reset_line_metrics(&mut self) {
        self.line_ascender = 0.0;
        self.line_descender = 0.0;
    }

    /// Raise the line to fit a taller font and track the deepest descender.
    fn adopt_metrics(&mut self, pen: &mut Pen, metrics: &FontMetrics) {
        if metrics.ascender > self.line_ascender {
            let y = pen.y;
            pen.y -= metrics.ascender - self.line_ascender;
            self.move_last_line((y - pen.y).trunc());
            self.line_ascender = metrics.ascender;
        }
        if metrics.descender < self.line_descender {
            self.line_descender = metrics.descender;
        }
    }

    fn put_char(
        &mut self,
        font: &mut TextureFont,
        atlas: &mut TextureAtlas,
        pen: &mut Pen,
        markup: &Markup,
        current: char,
        previous: Option<char>,
    ) {
        let metrics = *font.metrics();
        self.adopt_metrics(pen, &metrics);
        if current == '\n' {
            self.finish_line(pen, true);
            return;
        }
        let Some(id) = font.get_glyph(atlas, current) else {
            return;
        };
        let Some(glyph) = font.glyph(id) else {
            return;
        };
        let kerning = match previous {
            Some(p) if font.kerning => glyph.get_kerning(p),
            _ => 0.0,
        };
        pen.x += kerning;
        let quads = self.quads(*pen, *pen, markup, &metrics, glyph, font.special_glyph(), kerning, glyph.advance_x);
        self.buffer.extend_last(&quads.vertices, &quads.indices);
        pen.x += glyph.advance_x * (1.0 + markup.spacing);
    }

    /// Background, decorations and the glyph itself, in that order.
    #[allow(clippy::too_many_arguments)]
    fn quads(
        &self,
        pen: Pen,
        at: Pen,
        markup: &Markup,
        m: &FontMetrics,
        glyph: &Glyph,
        special: &Glyph,
        kerning: f32,
        advance: f32,
    ) -> Quads {
        let mut quads = Quads::default();
        let gamma = markup.gamma;
        let solid = special.tex_coords();
        let x0 = pen.x - kerning;
        let x1 = x0 + advance;

        if markup.draws_background() {
            let y0 = (pen.y + m.descender).floor();
            let y1 = (y0 + m.height + m.linegap).floor();
            quads.push(x0, y0, x1, y1, solid, markup.background_color, gamma);
        }
        if markup.draws_underline() {
            let y0 = (pen.y + m.underline_position).floor();
            let y1 = (y0 + m.underline_thickness).floor();
            quads.push(x0, y0, x1, y1, solid, markup.underline_color, gamma);
        }
        if markup.draws_overline() {
            let y0 = (pen.y + m.ascender.trunc()).floor();
            let y1 = (y0 + m.underline_thickness.trunc()).floor();
            quads.push(x0, y0, x1, y1, solid, markup.overline_color, gamma);
        }
        if markup.draws_strikethrough() {
            let y0 = (pen.y + m.ascender.trunc() * 0.33).floor();
            let y1 = (y0 + m.underline_thickness.trunc()).floor();
            quads.push(x0, y0, x1, y1, solid, markup.strikethrough_color, gamma);
        }

        let gx0 = at.x + glyph.offset_x as f32;
        let gy0 = (at.y + glyph.offset_y as f32).floor();
        let gx1 = gx0 + glyph.width as f32;
        let gy1 = (gy0 - glyph.height as f32).floor();
        let color = markup.foreground_color.unwrap_or(self.base_color);
        quads.push(gx0, gy0, gx1, gy1, glyph.tex_coords(), color, gamma);
        quads
    }

    fn move_last_line(&mut self, dy: f32) {
        for v in &mut self.buffer.vertices_mut()[self.line_start..] {
            v.position[1] -= dy;
        }
    }

    fn finish_line(&mut self, pen: &mut Pen, advance: bool) {
        let line_left = self.line_left;
        let line_right = pen.x;
        let line_top = pen.y + self.line_ascender;
        let line_height = self.line_ascender - self.line_descender;
        let line_bottom = line_top - line_height;
        self.lines.push(LineInfo {
            start: self.line_start,
            bounds: Rect {
                left: line_left,
                top: line_top,
                width: line_right - line_left,
                height: line_height,
            },
        });

        if line_left < self.bounds.left {
            self.bounds.left = line_left;
        }
        if line_top > self.bounds.top {
            self.bounds.top = line_top;
        }
        if line_right > self.bounds.right() {
            self.bounds.width = line_right - self.bounds.left;
        }
        if line_bottom < self.bounds.bottom() {
            self.bounds.height = self.bounds.top - line_bottom;
        }

        if advance {
            pen.x = self.origin.x;
            pen.y += self.line_descender.trunc();
        }
        self.reset_line_metrics();
        self.line_start = self.buffer.vertices().len();
        self.line_left = pen.x;
    }

    fn finish_open_line(&mut self, pen: &mut Pen) {
        if self.line_start != self.buffer.vertices().len() {
            self.finish_line(pen, false);
        }
    }

    /// Shift every line horizontally relative to the total bounds.
    pub fn align(&mut self, pen: &mut Pen, alignment: Align) {
        if alignment == Align::Left {
            return;
        }
        self.finish_open_line(pen);
        let self_right = self.bounds.right();
        let self_center = (self.bounds.left + self_right) / 2.0;
        let total = self.buffer.vertices().len();
        for i in 0..self.lines.len() {
            let line = self.lines[i];
            let end = self.lines.get(i + 1).map_or(total, |next| next.start);
            let line_right = line.bounds.right();
            let dx = match alignment {
                Align::Right => self_right - line_right,
                _ => self_center - (line.bounds.left + line_right) / 2.0,
            }
            .round();
            for v in &mut self.buffer.vertices_mut()[line.start..end] {
                v.position[0] += dx;
            }
            self.lines[i].bounds.left += dx;
        }
    }

    /// Close the current line and return the bounds of everything so far.
    pub fn bounds(&mut self, pen: &mut Pen) -> Rect {
        self.finish_open_line(pen);
        self.bounds
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.lines.clear();
        self.line_start = 0;
        self.reset_line_metrics();
        self.bounds = Rect::default();
    }
}
