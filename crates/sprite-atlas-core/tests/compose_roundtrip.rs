use image::{DynamicImage, Rgba, RgbaImage, imageops};
use rand::{Rng, SeedableRng};
use sprite_atlas_core::prelude::*;
use std::collections::HashMap;

fn noisy_sprite(rng: &mut rand::rngs::StdRng, w: u32, h: u32) -> RgbaImage {
    let cw = rng.gen_range(1..=w);
    let ch = rng.gen_range(1..=h);
    let cx = rng.gen_range(0..=w - cw);
    let cy = rng.gen_range(0..=h - ch);
    let mut img = RgbaImage::new(w, h);
    for y in cy..cy + ch {
        for x in cx..cx + cw {
            img.put_pixel(x, y, Rgba([rng.r#gen(), rng.r#gen(), rng.r#gen(), rng.gen_range(1..=255)]));
        }
    }
    img
}

fn check_roundtrip(settings: &PackingSettings, seed: u64) {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let mut originals: HashMap<String, RgbaImage> = HashMap::new();
    let mut inputs = Vec::new();
    for i in 0..40 {
        let w = rng.gen_range(4..=48);
        let h = rng.gen_range(4..=48);
        let img = noisy_sprite(&mut rng, w, h);
        let name = format!("s{i}");
        originals.insert(name.clone(), img.clone());
        inputs.push(InputImage::new(name, DynamicImage::ImageRgba8(img)));
    }

    let out = pack_images(inputs, settings).expect("pack");
    let mut seen = 0;
    for canvas in &out.canvases {
        for s in &canvas.sprites {
            seen += 1;
            let f = s.frame;
            let mut region = imageops::crop_imm(&canvas.rgba, f.x, f.y, f.w, f.h).to_image();
            if s.rotated {
                region = imageops::rotate270(&region);
            }
            let src = &originals[&s.name];
            let ss = s.sprite_source_size;
            let expected = imageops::crop_imm(src, ss.x, ss.y, ss.w, ss.h).to_image();
            assert_eq!(region, expected, "sprite {} (rotated: {})", s.name, s.rotated);

            let t = s.trimmed_data;
            assert_eq!(s.source_size.w, ss.w + t.left + t.right);
            assert_eq!(s.source_size.h, ss.h + t.top + t.bottom);
            assert_eq!((s.source_size.w, s.source_size.h), src.dimensions());
        }
    }
    assert_eq!(seen, 40);
}

#[test]
fn canvas_pixels_match_trimmed_sources() {
    let settings = PackingSettings::builder()
        .with_dimensions(256, 256)
        .padding(2)
        .extrude(0)
        .allow_rotation(true)
        .pow2(false)
        .build();
    check_roundtrip(&settings, 7);
}

#[test]
fn extrusion_never_bleeds_into_neighbours() {
    for method in [ExtrudeMethod::Copy, ExtrudeMethod::Mirror, ExtrudeMethod::Repeat] {
        let settings = PackingSettings::builder()
            .with_dimensions(200, 200)
            .padding(0)
            .extrude(2)
            .border_padding(1)
            .extrude_method(method)
            .build();
        check_roundtrip(&settings, 11);
    }
}

#[test]
fn extruded_border_copies_edge_pixels() {
    let mut img = RgbaImage::from_pixel(4, 4, Rgba([10, 20, 30, 255]));
    img.put_pixel(0, 0, Rgba([99, 0, 0, 255]));
    let settings = PackingSettings::builder()
        .with_dimensions(64, 64)
        .padding(0)
        .extrude(1)
        .build();
    let out = pack_images(
        vec![InputImage::new("tile", DynamicImage::ImageRgba8(img))],
        &settings,
    )
    .expect("pack");
    let c = &out.canvases[0];
    let f = c.sprites[0].frame;
    assert_eq!((f.x, f.y), (1, 1));
    // corner of the extrude ring repeats the corner pixel
    assert_eq!(c.rgba.get_pixel(0, 0).0, [99, 0, 0, 255]);
    assert_eq!(c.rgba.get_pixel(5, 5).0, [10, 20, 30, 255]);
}
