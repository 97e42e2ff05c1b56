#![no_main]
use libfuzzer_sys::fuzz_target;
use libtext::atlas::{Depth, Region, TextureAtlas};

// Each byte pair is one request: a region of (w, h), or an enlarge when
// the first byte is 0.
fuzz_target!(|data: &[u8]| {
    let Ok(mut atlas) = TextureAtlas::new(64, 64, Depth::Alpha) else {
        return;
    };
    let mut regions: Vec<Region> = Vec::new();
    for pair in data.chunks_exact(2) {
        if pair[0] == 0 {
            let (w, h) = (atlas.width() * 2, atlas.height());
            if w <= 1024 && atlas.enlarge(w, h).is_err() {
                panic!("enlarge to {}x{} failed", w, h);
            }
            continue;
        }
        let (w, h) = (usize::from(pair[0] % 40), usize::from(pair[1] % 40));
        if let Some(r) = atlas.get_region(w, h) {
            assert!(r.x >= 1 && r.y >= 1);
            assert!(r.right() <= atlas.width() - 1 && r.bottom() <= atlas.height() - 1);
            if w > 0 && h > 0 {
                assert!(regions.iter().all(|o| !o.intersects(&r)), "{:?} overlaps", r);
                regions.push(r);
            }
        }
        let nodes = atlas.nodes();
        for pair in nodes.windows(2) {
            assert_eq!(pair[0].x + pair[0].width, pair[1].x);
            assert_ne!(pair[0].y, pair[1].y);
        }
        assert!(nodes.last().map_or(true, |n| n.x + n.width <= atlas.width() - 1));
    }
});
