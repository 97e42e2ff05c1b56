/// Performance benchmarks for packing, glyph caching and layout.
/// Run with: cargo test --release bench_ -- --nocapture

use crate::atlas::{Depth, TextureAtlas};
use crate::font::distance;
use crate::font::synthetic::{SyntheticFace, SyntheticLoader};
use crate::font::{FontOptions, FontSource, TextureFont};
use crate::manager::{FontManager, NoMatcher, DEFAULT_CACHE};
use crate::text::{Markup, Pen, TextBuffer};
use std::rc::Rc;
use std::time::{Duration, Instant};

pub struct BenchResult {
    pub name: &'static str,
    pub iterations: usize,
    pub total_ms: f64,
    pub per_iter_us: f64,
    pub throughput_mb_s: Option<f64>,
}

impl BenchResult {
    fn new(name: &'static str, iterations: usize, elapsed: Duration, bytes: Option<usize>) -> Self {
        let secs = elapsed.as_secs_f64().max(f64::MIN_POSITIVE);
        Self {
            name,
            iterations,
            total_ms: secs * 1000.0,
            per_iter_us: secs * 1_000_000.0 / iterations as f64,
            throughput_mb_s: bytes.map(|b| b as f64 * iterations as f64 / secs / 1_048_576.0),
        }
    }
}

impl std::fmt::Display for BenchResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {:.1}µs/iter ({} iters, {:.1}ms total",
               self.name, self.per_iter_us, self.iterations, self.total_ms)?;
        if let Some(tp) = self.throughput_mb_s {
            write!(f, ", {:.1} MB/s", tp)?;
        }
        write!(f, ")")
    }
}

/// Benchmark skyline packing of many small glyph-sized regions.
pub fn bench_atlas_pack() -> BenchResult {
    let iterations = if cfg!(debug_assertions) { 5 } else { 50 };
    let start = Instant::now();
    for _ in 0..iterations {
        let mut atlas = TextureAtlas::new(1024, 1024, Depth::Alpha).unwrap();
        let mut i = 0usize;
        while atlas.get_region(4 + i % 13, 6 + i % 17).is_some() {
            i += 1;
        }
    }
    BenchResult::new("atlas_pack", iterations, start.elapsed(), None)
}

/// Benchmark rasterizing and caching printable ASCII into a fresh font.
pub fn bench_glyph_cache() -> BenchResult {
    let iterations = if cfg!(debug_assertions) { 10 } else { 200 };
    let loader = Rc::new(SyntheticLoader::new(SyntheticFace::new()));
    let start = Instant::now();
    for i in 0..iterations {
        let mut atlas = TextureAtlas::new(512, 512, Depth::Alpha).unwrap();
        let source = FontSource::Memory(Rc::from(vec![0u8]));
        let size = 10.0 + (i % 8) as f32;
        let mut font = TextureFont::load(&mut atlas, size, source, loader.clone(), &FontOptions::default())
            .unwrap();
        font.load_glyphs(&mut atlas, DEFAULT_CACHE);
    }
    BenchResult::new("glyph_cache", iterations, start.elapsed(), None)
}

/// Benchmark typesetting a page of cached text.
pub fn bench_layout() -> BenchResult {
    let loader = Rc::new(SyntheticLoader::new(SyntheticFace::new()));
    let atlas = TextureAtlas::new(512, 512, Depth::Alpha).unwrap();
    let mut fonts = FontManager::with_parts(atlas, loader, Box::new(NoMatcher), FontOptions::default());
    let id = fonts.add_from_memory(vec![0u8], 14.0).unwrap();
    let markup = Markup { underline: true, ..Default::default() }.with_font(id);
    let page: String = (0..40).map(|_| "The quick brown fox jumps over the lazy dog.\n").collect();

    let iterations = if cfg!(debug_assertions) { 20 } else { 1_000 };
    let mut buffer = TextBuffer::new();
    let start = Instant::now();
    for _ in 0..iterations {
        buffer.clear();
        let mut pen = Pen::new(0.0, 800.0);
        buffer
            .add_text(&mut fonts, &mut pen, &markup, &page, None)
            .unwrap();
    }
    BenchResult::new("layout", iterations, start.elapsed(), Some(page.len()))
}

/// Benchmark the distance transform behind SDF glyphs.
pub fn bench_sdf() -> BenchResult {
    let (w, h) = (64, 64);
    let coverage: Vec<u8> = (0..w * h)
        .map(|i| {
            let (x, y) = (i % w, i / w);
            if (16..48).contains(&x) && (8..56).contains(&y) { 255 } else { 0 }
        })
        .collect();
    let iterations = if cfg!(debug_assertions) { 5 } else { 200 };
    let start = Instant::now();
    for _ in 0..iterations {
        let field = distance::distance_field(&coverage, w, h);
        std::hint::black_box(field);
    }
    BenchResult::new("sdf", iterations, start.elapsed(), Some(w * h))
}

/// Run all benchmarks and return results.
pub fn run_all() -> Vec<BenchResult> {
    vec![
        bench_atlas_pack(),
        bench_glyph_cache(),
        bench_layout(),
        bench_sdf(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bench_all_pass() {
        let results = run_all();
        for r in &results {
            println!("{}", r);
            assert!(r.total_ms > 0.0);
            assert!(r.per_iter_us > 0.0);
        }
        assert_eq!(results.len(), 4);
    }

    #[test]
    fn bench_layout_over_1mbs() {
        let r = bench_layout();
        println!("{}", r);
        // Only enforce threshold in release mode; debug is much slower
        #[cfg(not(debug_assertions))]
        {
            let tp = r.throughput_mb_s.unwrap();
            assert!(tp > 1.0, "layout too slow: {:.1} MB/s", tp);
        }
    }

    #[test]
    fn test_display() {
        let r = BenchResult::new("x", 2, Duration::from_millis(4), Some(1_048_576));
        assert_eq!(r.to_string(), "x: 2000.0µs/iter (2 iters, 4.0ms total, 500.0 MB/s)");
    }
}
