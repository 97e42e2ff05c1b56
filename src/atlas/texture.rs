/// Texture atlas: a CPU-side pixel sheet packed by a skyline allocator.
/// The sheet is uploaded lazily by the renderer whenever `modified` is set.

use crate::atlas::skyline::{Node, Region, Skyline};
use crate::error::AtlasError;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ATLAS_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of an atlas, used to catch fonts used with the wrong sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AtlasId(u64);

/// Bytes per pixel of the sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Depth {
    /// Coverage only.
    Alpha = 1,
    /// Horizontal LCD subpixel coverage, R G B.
    Rgb = 3,
    /// Color glyphs, R G B A.
    Rgba = 4,
}

impl Depth {
    pub fn bytes(self) -> usize {
        self as usize
    }
}

impl TryFrom<u8> for Depth {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Depth::Alpha),
            3 => Ok(Depth::Rgb),
            4 => Ok(Depth::Rgba),
            other => Err(format!("atlas depth must be 1, 3 or 4, got {}", other)),
        }
    }
}

impl From<Depth> for u8 {
    fn from(depth: Depth) -> u8 {
        depth as u8
    }
}

/// Size of the solid white block reserved for decorations.
const SPECIAL_SIZE: usize = 4;

pub struct TextureAtlas {
    id: AtlasId,
    width: usize,
    height: usize,
    depth: Depth,
    data: Vec<u8>,
    skyline: Skyline,
    used: usize,
    modified: bool,
    special: Option<Region>,
}

fn zeroed(len: usize) -> Result<Vec<u8>, AtlasError> {
    let mut data = Vec::new();
    data.try_reserve_exact(len)
        .map_err(|_| AtlasError::OutOfMemory(len))?;
    data.resize(len, 0);
    Ok(data)
}

impl TextureAtlas {
    pub fn new(width: usize, height: usize, depth: Depth) -> Result<Self, AtlasError> {
        if width < 3 || height < 3 {
            return Err(AtlasError::InvalidSize { width, height });
        }
        let len = width
            .checked_mul(height)
            .and_then(|n| n.checked_mul(depth.bytes()))
            .ok_or(AtlasError::OutOfMemory(usize::MAX))?;
        Ok(Self {
            id: AtlasId(NEXT_ATLAS_ID.fetch_add(1, Ordering::Relaxed)),
            width,
            height,
            depth,
            data: zeroed(len)?,
            skyline: Skyline::new(width, height),
            used: 0,
            modified: true,
            special: None,
        })
    }

    pub fn id(&self) -> AtlasId {
        self.id
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn depth(&self) -> Depth {
        self.depth
    }

    /// Row-major pixel bytes, `width * height * depth` long.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn nodes(&self) -> &[Node] {
        self.skyline.nodes()
    }

    /// Total allocated area in pixels.
    pub fn used(&self) -> usize {
        self.used
    }

    /// Allocated fraction of the sheet, 0..=1.
    pub fn occupancy(&self) -> f32 {
        self.used as f32 / (self.width * self.height) as f32
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Clear the dirty flag, returning its previous value.
    pub fn take_modified(&mut self) -> bool {
        std::mem::replace(&mut self.modified, false)
    }

    /// Reserve a `width x height` rectangle. `None` means the sheet is full;
    /// the caller may enlarge and retry.
    pub fn get_region(&mut self, width: usize, height: usize) -> Option<Region> {
        let region = self.skyline.allocate(width, height)?;
        self.used += width * height;
        Some(region)
    }

    /// Copy `src` into the sheet. `stride` is the byte distance between
    /// source rows.
    pub fn set_region(
        &mut self,
        x: usize,
        y: usize,
        width: usize,
        height: usize,
        src: &[u8],
        stride: usize,
    ) -> Result<(), AtlasError> {
        if x < 1 || y < 1 || x + width > self.width - 1 || y + height > self.height - 1 {
            return Err(AtlasError::RegionOutOfBounds { x, y, width, height });
        }
        if width == 0 || height == 0 {
            return Ok(());
        }
        let depth = self.depth.bytes();
        let row_bytes = width * depth;
        let need = (height - 1) * stride + row_bytes;
        if src.len() < need {
            return Err(AtlasError::SourceTooSmall { need, got: src.len() });
        }
        for row in 0..height {
            let dst = ((y + row) * self.width + x) * depth;
            let from = row * stride;
            self.data[dst..dst + row_bytes].copy_from_slice(&src[from..from + row_bytes]);
        }
        self.modified = true;
        Ok(())
    }

    /// Reset packing and zero every pixel.
    pub fn clear(&mut self) {
        self.skyline.reset();
        self.data.fill(0);
        self.used = 0;
        self.special = None;
        self.modified = true;
    }

    /// Grow the sheet. Existing pixels keep their coordinates, so glyph
    /// texture coordinates only need rescaling when they are normalized.
    pub fn enlarge(&mut self, width: usize, height: usize) -> Result<(), AtlasError> {
        let (old_w, old_h) = (self.width, self.height);
        if width < old_w || height < old_h || width + height <= old_w + old_h {
            return Err(AtlasError::InvalidEnlarge {
                from: (old_w, old_h),
                to: (width, height),
            });
        }
        let depth = self.depth.bytes();
        let len = width
            .checked_mul(height)
            .and_then(|n| n.checked_mul(depth))
            .ok_or(AtlasError::OutOfMemory(usize::MAX))?;
        let mut data = zeroed(len)?;

        // Copy the interior, skipping the one-pixel margin.
        let row_bytes = (old_w - 2) * depth;
        for y in 1..old_h - 1 {
            let src = (y * old_w + 1) * depth;
            let dst = (y * width + 1) * depth;
            data[dst..dst + row_bytes].copy_from_slice(&self.data[src..src + row_bytes]);
        }

        self.data = data;
        self.width = width;
        self.height = height;
        self.skyline.grow(width, height);
        self.modified = true;
        log::debug!("atlas enlarged from {}x{} to {}x{}", old_w, old_h, width, height);
        Ok(())
    }

    /// The solid white block used for backgrounds and decoration stripes.
    /// Allocated on first use.
    pub fn special_region(&mut self) -> Result<Region, AtlasError> {
        if let Some(region) = self.special {
            return Ok(region);
        }
        let size = SPECIAL_SIZE + 1;
        let region = self
            .get_region(size, size)
            .ok_or(AtlasError::Full { width: size, height: size })?;
        let row = SPECIAL_SIZE * self.depth.bytes();
        let white = vec![0xff; row * SPECIAL_SIZE];
        self.set_region(region.x, region.y, SPECIAL_SIZE, SPECIAL_SIZE, &white, row)?;
        self.special = Some(region);
        Ok(region)
    }

    /// Pixel value at (x, y), for inspection.
    pub fn pixel(&self, x: usize, y: usize) -> &[u8] {
        let depth = self.depth.bytes();
        let at = (y * self.width + x) * depth;
        &self.data[at..at + depth]
    }
}

impl std::fmt::Debug for TextureAtlas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextureAtlas")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("depth", &self.depth)
            .field("nodes", &self.skyline.nodes().len())
            .field("used", &self.used)
            .field("modified", &self.modified)
            .finish()
    }
}
