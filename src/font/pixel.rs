/// Typed pixels and the conversions used when copying rasterizer output
/// into an atlas of a different depth.

use crate::atlas::Depth;
use crate::font::face::{PixelFormat, RasterGlyph};
use bytemuck::{Pod, Zeroable};

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct Gray(pub u8);

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct Bgra {
    pub b: u8,
    pub g: u8,
    pub r: u8,
    pub a: u8,
}

impl From<Gray> for Rgb {
    fn from(p: Gray) -> Rgb {
        Rgb { r: p.0, g: p.0, b: p.0 }
    }
}

/// Coverage becomes alpha over solid white.
impl From<Gray> for Rgba {
    fn from(p: Gray) -> Rgba {
        Rgba { r: 255, g: 255, b: 255, a: p.0 }
    }
}

impl From<Rgb> for Gray {
    fn from(p: Rgb) -> Gray {
        Gray(((p.r as u16 + p.g as u16 + p.b as u16) / 3) as u8)
    }
}

impl From<Rgb> for Rgba {
    fn from(p: Rgb) -> Rgba {
        Gray::from(p).into()
    }
}

impl From<Bgra> for Rgba {
    fn from(p: Bgra) -> Rgba {
        Rgba { r: p.r, g: p.g, b: p.b, a: p.a }
    }
}

/// Luminosity weighted by alpha.
impl From<Bgra> for Gray {
    fn from(p: Bgra) -> Gray {
        let luma = 0.3 * p.r as f32 + 0.59 * p.g as f32 + 0.11 * p.b as f32;
        Gray((luma * (p.a as f32 / 255.0)).round().min(255.0) as u8)
    }
}

impl From<Bgra> for Rgb {
    fn from(p: Bgra) -> Rgb {
        Gray::from(p).into()
    }
}

/// Copy `height` rows of `width` pixels, converting each one.
fn convert_rows<S, D>(
    src: &[u8],
    src_pitch: usize,
    width: usize,
    height: usize,
    dst: &mut [u8],
    dst_pitch: usize,
) where
    S: Pod,
    D: Pod + From<S>,
{
    let src_row = width * std::mem::size_of::<S>();
    let dst_row = width * std::mem::size_of::<D>();
    for row in 0..height {
        let s: &[S] = bytemuck::cast_slice(&src[row * src_pitch..row * src_pitch + src_row]);
        let d: &mut [D] =
            bytemuck::cast_slice_mut(&mut dst[row * dst_pitch..row * dst_pitch + dst_row]);
        for (out, px) in d.iter_mut().zip(s) {
            *out = D::from(*px);
        }
    }
}

/// Write `glyph` into `dst`, a buffer of `depth`-byte pixels with
/// `dst_pitch` bytes per row, converting the pixel format as needed.
pub fn blit(glyph: &RasterGlyph, depth: Depth, dst: &mut [u8], dst_pitch: usize) {
    let (w, h, p) = (glyph.width, glyph.height, glyph.pitch);
    let src = &glyph.data[..];
    match (glyph.format, depth) {
        (PixelFormat::Gray, Depth::Alpha) => convert_rows::<Gray, Gray>(src, p, w, h, dst, dst_pitch),
        (PixelFormat::Gray, Depth::Rgb) => convert_rows::<Gray, Rgb>(src, p, w, h, dst, dst_pitch),
        (PixelFormat::Gray, Depth::Rgba) => convert_rows::<Gray, Rgba>(src, p, w, h, dst, dst_pitch),
        (PixelFormat::Lcd, Depth::Alpha) => convert_rows::<Rgb, Gray>(src, p, w, h, dst, dst_pitch),
        (PixelFormat::Lcd, Depth::Rgb) => convert_rows::<Rgb, Rgb>(src, p, w, h, dst, dst_pitch),
        (PixelFormat::Lcd, Depth::Rgba) => convert_rows::<Rgb, Rgba>(src, p, w, h, dst, dst_pitch),
        (PixelFormat::Bgra, Depth::Alpha) => convert_rows::<Bgra, Gray>(src, p, w, h, dst, dst_pitch),
        (PixelFormat::Bgra, Depth::Rgb) => convert_rows::<Bgra, Rgb>(src, p, w, h, dst, dst_pitch),
        (PixelFormat::Bgra, Depth::Rgba) => convert_rows::<Bgra, Rgba>(src, p, w, h, dst, dst_pitch),
    }
}

/// Collapse any raster to a tight coverage plane, `width * height` bytes.
pub fn coverage(glyph: &RasterGlyph) -> Vec<u8> {
    let mut out = vec![0; glyph.width * glyph.height];
    blit(glyph, Depth::Alpha, &mut out, glyph.width);
    out
}

/// Five-tap FIR over the subpixels of each row, reducing color fringes on
/// LCD output. Weights are in 1/256 units.
pub fn lcd_filter(data: &mut [u8], width: usize, height: usize, pitch: usize, weights: [u8; 5]) {
    let n = width * 3;
    let mut row = vec![0u8; n];
    for y in 0..height {
        let line = &mut data[y * pitch..y * pitch + n];
        row.copy_from_slice(line);
        for (i, out) in line.iter_mut().enumerate() {
            let mut acc = 0u32;
            for (k, &w) in weights.iter().enumerate() {
                let j = i as isize + k as isize - 2;
                if j >= 0 && (j as usize) < n {
                    acc += w as u32 * row[j as usize] as u32;
                }
            }
            *out = (acc >> 8).min(255) as u8;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raster(format: PixelFormat, width: usize, height: usize, data: Vec<u8>) -> RasterGlyph {
        RasterGlyph {
            width,
            height,
            pitch: width * format.bytes(),
            format,
            left: 0,
            top: height as i32,
            advance_x: width as f32,
            advance_y: 0.0,
            data,
        }
    }

    #[test]
    fn test_bgra_to_rgba_swaps() {
        let px: Rgba = Bgra { b: 1, g: 2, r: 3, a: 4 }.into();
        assert_eq!(px, Rgba { r: 3, g: 2, b: 1, a: 4 });
    }

    #[test]
    fn test_bgra_to_gray_luminosity() {
        let white: Gray = Bgra { b: 255, g: 255, r: 255, a: 255 }.into();
        assert_eq!(white, Gray(255));
        let half_red: Gray = Bgra { b: 0, g: 0, r: 200, a: 255 }.into();
        assert_eq!(half_red, Gray(60));
        let clear: Gray = Bgra { b: 255, g: 255, r: 255, a: 0 }.into();
        assert_eq!(clear, Gray(0));
    }

    #[test]
    fn test_gray_to_rgba_white() {
        let px: Rgba = Gray(77).into();
        assert_eq!(px, Rgba { r: 255, g: 255, b: 255, a: 77 });
    }

    #[test]
    fn test_blit_honors_pitches() {
        let src = raster(PixelFormat::Gray, 2, 2, vec![1, 2, 3, 4]);
        let mut dst = vec![0u8; 4 * 3];
        blit(&src, Depth::Alpha, &mut dst[4 + 1..], 4);
        assert_eq!(dst, vec![0, 0, 0, 0, 0, 1, 2, 0, 0, 3, 4, 0]);
    }

    #[test]
    fn test_blit_gray_into_rgba() {
        let src = raster(PixelFormat::Gray, 1, 1, vec![9]);
        let mut dst = vec![0u8; 4];
        blit(&src, Depth::Rgba, &mut dst, 4);
        assert_eq!(dst, vec![255, 255, 255, 9]);
    }

    #[test]
    fn test_blit_bgra_into_rgba() {
        let src = raster(PixelFormat::Bgra, 1, 1, vec![10, 20, 30, 40]);
        let mut dst = vec![0u8; 4];
        blit(&src, Depth::Rgba, &mut dst, 4);
        assert_eq!(dst, vec![30, 20, 10, 40]);
    }

    #[test]
    fn test_coverage_from_lcd() {
        let src = raster(PixelFormat::Lcd, 2, 1, vec![30, 60, 90, 0, 0, 0]);
        assert_eq!(coverage(&src), vec![60, 0]);
    }

    #[test]
    fn test_lcd_filter_spreads_energy() {
        // A single lit subpixel in the middle of a two-pixel row.
        let mut data = vec![0, 0, 0, 255, 0, 0];
        lcd_filter(&mut data, 2, 1, 6, [0x10, 0x40, 0x70, 0x40, 0x10]);
        assert_eq!(data[3], (0x70 * 255 >> 8) as u8);
        assert_eq!(data[2], (0x40 * 255 >> 8) as u8);
        assert_eq!(data[4], (0x40 * 255 >> 8) as u8);
        assert_eq!(data[1], (0x10 * 255 >> 8) as u8);
        assert_eq!(data[0], 0);
    }
}
