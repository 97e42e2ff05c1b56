/// Euclidean distance transforms over coverage bitmaps: signed distance
/// fields and round-joined outline strokes.

use crate::font::glyph::RenderMode;

const FAR: f64 = 1e20;

/// Squared distance transform of a sampled function (Felzenszwalb and
/// Huttenlocher), one dimension.
fn edt_1d(f: &[f64], out: &mut [f64], v: &mut [usize], z: &mut [f64]) {
    let n = f.len();
    if n == 0 {
        return;
    }
    let mut k = 0usize;
    v[0] = 0;
    z[0] = -FAR;
    z[1] = FAR;
    for q in 1..n {
        let qf = q as f64;
        loop {
            let p = v[k] as f64;
            let s = ((f[q] + qf * qf) - (f[v[k]] + p * p)) / (2.0 * qf - 2.0 * p);
            if s <= z[k] && k > 0 {
                k -= 1;
                continue;
            }
            if s <= z[k] {
                // Only reachable at k == 0 with s <= -FAR.
                v[0] = q;
                z[1] = FAR;
                break;
            }
            k += 1;
            v[k] = q;
            z[k] = s;
            z[k + 1] = FAR;
            break;
        }
    }
    k = 0;
    for (q, slot) in out.iter_mut().enumerate().take(n) {
        let qf = q as f64;
        while z[k + 1] < qf {
            k += 1;
        }
        let d = qf - v[k] as f64;
        *slot = d * d + f[v[k]];
    }
}

/// Distance in pixels from every pixel to the nearest pixel where `seed`
/// holds.
fn distance_to(seed: &[bool], width: usize, height: usize) -> Vec<f32> {
    let mut grid: Vec<f64> = seed.iter().map(|&s| if s { 0.0 } else { FAR }).collect();
    let n = width.max(height);
    let mut f = vec![0.0; n];
    let mut out = vec![0.0; n];
    let mut v = vec![0usize; n];
    let mut z = vec![0.0; n + 1];

    for x in 0..width {
        for y in 0..height {
            f[y] = grid[y * width + x];
        }
        edt_1d(&f[..height], &mut out[..height], &mut v, &mut z);
        for y in 0..height {
            grid[y * width + x] = out[y];
        }
    }
    for y in 0..height {
        let row = &mut grid[y * width..(y + 1) * width];
        f[..width].copy_from_slice(row);
        edt_1d(&f[..width], &mut out[..width], &mut v, &mut z);
        row.copy_from_slice(&out[..width]);
    }
    grid.into_iter().map(|d| d.sqrt() as f32).collect()
}

/// Signed distance to the coverage edge, negative inside. Partially
/// covered pixels take the sub-pixel estimate `0.5 - coverage`.
pub fn signed_distance(coverage: &[u8], width: usize, height: usize) -> Vec<f32> {
    let inside: Vec<bool> = coverage.iter().map(|&c| c >= 128).collect();
    let outside: Vec<bool> = inside.iter().map(|&i| !i).collect();
    let to_inside = distance_to(&inside, width, height);
    let to_outside = distance_to(&outside, width, height);
    coverage
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            if c > 0 && c < 255 {
                0.5 - c as f32 / 255.0
            } else if inside[i] {
                0.5 - to_outside[i]
            } else {
                to_inside[i] - 0.5
            }
        })
        .collect()
}

/// Map a coverage bitmap to an 8-bit distance field: 255 deep inside,
/// about 128 on the edge, 0 far outside. Distances are normalized by the
/// deepest inside distance.
pub fn distance_field(coverage: &[u8], width: usize, height: usize) -> Vec<u8> {
    let dist = signed_distance(coverage, width, height);
    let depth = dist.iter().fold(0.0f32, |m, &d| m.max(-d));
    if depth <= f32::EPSILON {
        return vec![0; coverage.len()];
    }
    dist.iter()
        .map(|&d| {
            let t = (d.clamp(-depth, depth) + depth) / (2.0 * depth);
            (255.0 - t * 255.0).round() as u8
        })
        .collect()
}

/// Pixels an outline of `thickness` may extend past the glyph box.
pub fn stroke_margin(thickness: f32) -> usize {
    thickness.max(0.0).ceil() as usize + 1
}

/// Stroke a coverage bitmap. The input must already carry
/// `stroke_margin(thickness)` blank pixels on every side.
pub fn stroke(
    coverage: &[u8],
    width: usize,
    height: usize,
    mode: RenderMode,
    thickness: f32,
) -> Vec<u8> {
    let dist = signed_distance(coverage, width, height);
    let r = thickness.max(0.0);
    dist.iter()
        .map(|&d| {
            let a = match mode {
                RenderMode::OutlineEdge => r + 0.5 - d.abs(),
                RenderMode::OutlinePositive => r + 0.5 - d,
                RenderMode::OutlineNegative => -r + 0.5 - d,
                RenderMode::Normal | RenderMode::SignedDistanceField => {
                    return coverage_of(d);
                }
            };
            (a.clamp(0.0, 1.0) * 255.0).round() as u8
        })
        .collect()
}

fn coverage_of(d: f32) -> u8 {
    ((0.5 - d).clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Surround a tight `width x height` plane with `margin` blank pixels.
pub fn pad(coverage: &[u8], width: usize, height: usize, margin: usize) -> Vec<u8> {
    let pw = width + 2 * margin;
    let ph = height + 2 * margin;
    let mut out = vec![0; pw * ph];
    for y in 0..height {
        let dst = (y + margin) * pw + margin;
        out[dst..dst + width].copy_from_slice(&coverage[y * width..(y + 1) * width]);
    }
    out
}
