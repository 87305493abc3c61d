use image::{DynamicImage, Rgba, RgbaImage};
use rand::{Rng, SeedableRng};
use sprite_atlas_core::prelude::*;

fn is_pow2(v: u32) -> bool {
    v != 0 && (v & (v - 1)) == 0
}

fn random_inputs(seed: u64, count: usize, max: u32) -> Vec<InputImage> {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    (0..count)
        .map(|i| {
            let w = rng.gen_range(1..=max);
            let h = rng.gen_range(1..=max);
            let px = Rgba([i as u8, (i >> 8) as u8, 77, 255]);
            InputImage::new(format!("r{i}"), DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, px)))
        })
        .collect()
}

/// Distinct frames of a canvas; aliases of one unit share a frame.
fn unique_frames(canvas: &AtlasCanvas) -> Vec<Rect> {
    let mut frames: Vec<Rect> = Vec::new();
    for s in &canvas.sprites {
        let r = Rect::new(s.frame.x, s.frame.y, s.frame.w, s.frame.h);
        if !frames.contains(&r) {
            frames.push(r);
        }
    }
    frames
}

fn max_content_extents(frames: &[Rect], s: &PackingSettings) -> (u32, u32) {
    let tail = s.extrude + s.border_padding;
    frames.iter().fold((0, 0), |(w, h), f| (w.max(f.x2() + tail), h.max(f.y2() + tail)))
}

#[test]
fn slots_are_disjoint_and_inside_the_canvas() {
    let mut rng = rand::rngs::StdRng::seed_from_u64(42);
    for round in 0..12u64 {
        let settings = PackingSettings::builder()
            .with_dimensions(rng.gen_range(96..=256), rng.gen_range(96..=256))
            .padding(rng.gen_range(0..=4))
            .extrude(rng.gen_range(0..=2))
            .border_padding(rng.gen_range(0..=3))
            .allow_rotation(rng.gen_bool(0.5))
            .pow2(rng.gen_bool(0.5))
            .build();
        let out = pack_images(random_inputs(round, 60, 40), &settings).expect("pack");
        let (e, p, b) = (settings.extrude, settings.padding, settings.border_padding);

        for canvas in &out.canvases {
            let frames = unique_frames(canvas);
            for f in &frames {
                assert!(f.x >= b + e && f.y >= b + e, "{f:?} crosses the border");
                assert!(f.x2() + e + b <= canvas.size.w, "{f:?} leaves the canvas");
                assert!(f.y2() + e + b <= canvas.size.h, "{f:?} leaves the canvas");
            }
            let slots: Vec<Rect> = frames
                .iter()
                .map(|f| Rect::new(f.x - e, f.y - e, f.w + 2 * e + p, f.h + 2 * e + p))
                .collect();
            for i in 0..slots.len() {
                for j in (i + 1)..slots.len() {
                    assert!(
                        !slots[i].intersects(&slots[j]),
                        "round {round}: {:?} overlaps {:?}",
                        slots[i],
                        slots[j]
                    );
                }
            }
        }
    }
}

#[test]
fn packing_is_deterministic() {
    let settings = PackingSettings::builder()
        .with_dimensions(128, 128)
        .padding(1)
        .build();
    let layout = |out: &PackOutput| -> Vec<((u32, u32), Vec<(String, u32, u32, bool)>)> {
        out.canvases
            .iter()
            .map(|c| {
                let sprites = c
                    .sprites
                    .iter()
                    .map(|s| (s.name.clone(), s.frame.x, s.frame.y, s.rotated))
                    .collect();
                ((c.size.w, c.size.h), sprites)
            })
            .collect()
    };
    let a = pack_images(random_inputs(5, 80, 48), &settings).expect("first");
    let b = pack_images(random_inputs(5, 80, 48), &settings).expect("second");
    assert!(a.canvases.len() > 1);
    assert_eq!(layout(&a), layout(&b));
}

#[test]
fn pow2_canvases_cover_their_content() {
    let mut rng = rand::rngs::StdRng::seed_from_u64(3);
    for seed in 0..8u64 {
        let settings = PackingSettings::builder()
            .with_dimensions(300, 180)
            .padding(rng.gen_range(0..=4))
            .extrude(rng.gen_range(0..=2))
            .border_padding(rng.gen_range(0..=5))
            .pow2(true)
            .build();
        let out = pack_images(random_inputs(seed, 30, 64), &settings).expect("pack");
        for c in out.canvases.iter().filter(|c| !c.oversized) {
            let (min_w, min_h) = max_content_extents(&unique_frames(c), &settings);
            assert!(is_pow2(c.size.w) && is_pow2(c.size.h), "{:?}", c.size);
            assert!(c.size.w >= min_w && c.size.h >= min_h);
            assert!(c.size.w < min_w * 2 && c.size.h < min_h * 2);
        }
    }
}

#[test]
fn square_and_fixed_size() {
    let square = PackingSettings::builder()
        .with_dimensions(300, 180)
        .padding(2)
        .pow2(false)
        .square(true)
        .build();
    let out = pack_images(random_inputs(9, 20, 50), &square).expect("square");
    for c in &out.canvases {
        assert_eq!(c.size.w, c.size.h);
    }

    let fixed = PackingSettings::builder()
        .with_dimensions(300, 180)
        .fixed_size(true)
        .build();
    let out = pack_images(random_inputs(9, 20, 50), &fixed).expect("fixed");
    for c in out.canvases.iter().filter(|c| !c.oversized) {
        assert_eq!((c.size.w, c.size.h), (300, 180));
        assert_eq!(c.rgba.dimensions(), (300, 180));
    }
}

#[test]
fn stats_reflect_deduplicated_area() {
    let img = RgbaImage::from_pixel(10, 10, Rgba([1, 1, 1, 255]));
    let inputs = vec![
        InputImage::new("a", DynamicImage::ImageRgba8(img.clone())),
        InputImage::new("b", DynamicImage::ImageRgba8(img)),
    ];
    let settings = PackingSettings::builder().padding(0).pow2(false).build();
    let stats = pack_images(inputs, &settings).expect("pack").stats();
    assert_eq!(stats.num_sprites, 2);
    assert_eq!(stats.num_packed, 1);
    assert_eq!(stats.used_area, 100);
    assert_eq!(stats.total_canvas_area, 100);
    assert!((stats.occupancy - 1.0).abs() < 1e-9);
    assert_eq!(stats.wasted_area(), 0);
}
