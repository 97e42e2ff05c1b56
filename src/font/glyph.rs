/// Glyph records: one rendered variant of a codepoint, with its atlas
/// coordinates, bearings, advance and kerning against preceding codepoints.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    #[default]
    Normal,
    OutlineEdge,
    OutlinePositive,
    OutlineNegative,
    #[serde(rename = "sdf")]
    SignedDistanceField,
}

impl RenderMode {
    pub fn is_outline(self) -> bool {
        matches!(
            self,
            RenderMode::OutlineEdge | RenderMode::OutlinePositive | RenderMode::OutlineNegative
        )
    }
}

impl FromStr for RenderMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(RenderMode::Normal),
            "outline_edge" => Ok(RenderMode::OutlineEdge),
            "outline_positive" => Ok(RenderMode::OutlinePositive),
            "outline_negative" => Ok(RenderMode::OutlineNegative),
            "sdf" => Ok(RenderMode::SignedDistanceField),
            other => Err(format!("unknown render mode {:?}", other)),
        }
    }
}

/// Sparse kerning map keyed by the preceding codepoint. Rows of 256 entries
/// are indexed by the high bits and allocated only when populated.
#[derive(Debug, Clone, Default)]
pub struct KerningTable {
    rows: Vec<Option<Box<[f32; 256]>>>,
    len: usize,
}

impl KerningTable {
    pub fn get(&self, left: u32) -> f32 {
        let (hi, lo) = ((left >> 8) as usize, (left & 0xff) as usize);
        match self.rows.get(hi) {
            Some(Some(row)) => row[lo],
            _ => 0.0,
        }
    }

    pub fn set(&mut self, left: u32, value: f32) {
        let (hi, lo) = ((left >> 8) as usize, (left & 0xff) as usize);
        if hi >= self.rows.len() {
            self.rows.resize_with(hi + 1, || None);
        }
        let row = self.rows[hi].get_or_insert_with(|| Box::new([0.0; 256]));
        match (row[lo] != 0.0, value != 0.0) {
            (false, true) => self.len += 1,
            (true, false) => self.len -= 1,
            _ => {}
        }
        row[lo] = value;
    }

    /// Number of non-zero pairs.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.rows.clear();
        self.len = 0;
    }

    /// Non-zero `(left, value)` pairs in codepoint order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, f32)> + '_ {
        self.rows.iter().enumerate().flat_map(|(hi, row)| {
            row.iter().flat_map(move |row| {
                row.iter()
                    .enumerate()
                    .filter(|(_, v)| **v != 0.0)
                    .map(move |(lo, v)| (((hi as u32) << 8) | lo as u32, *v))
            })
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct Glyph {
    /// Unicode scalar value; zero for glyphs loaded by index.
    pub codepoint: u32,
    /// Index of the glyph in the face.
    pub glyph_index: u32,
    /// Bitmap size in pixels, padding included.
    pub width: usize,
    pub height: usize,
    /// Bearing from the pen to the bitmap's top-left corner, y up.
    pub offset_x: i32,
    pub offset_y: i32,
    pub advance_x: f32,
    pub advance_y: f32,
    pub s0: f32,
    pub t0: f32,
    pub s1: f32,
    pub t1: f32,
    pub rendermode: RenderMode,
    pub outline_thickness: f32,
    /// Solid white block used for backgrounds and decorations.
    pub is_special: bool,
    pub kerning: KerningTable,
}

impl Glyph {
    /// Horizontal adjustment to apply when this glyph follows `previous`.
    pub fn get_kerning(&self, previous: char) -> f32 {
        self.kerning.get(previous as u32)
    }

    /// The notdef glyph a face substitutes for missing codepoints.
    pub fn is_missing(&self) -> bool {
        !self.is_special && self.glyph_index == 0
    }

    pub fn tex_coords(&self) -> [f32; 4] {
        [self.s0, self.t0, self.s1, self.t1]
    }
}
