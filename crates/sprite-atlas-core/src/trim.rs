use crate::config::{ExtrudeMethod, PackingSettings, TrimMode};
use crate::model::{OriginalInfo, Size, TrimOffsets};
use crate::resample::scale_image;
use image::{DynamicImage, RgbaImage, imageops};

/// Output of the trimmer for one image.
#[derive(Debug, Clone)]
pub struct Trimmed {
    /// Trimmed pixels with `extrude` pixels grown on every edge.
    pub pixels: RgbaImage,
    /// Trimmed width (extrusion excluded).
    pub width: u32,
    /// Trimmed height (extrusion excluded).
    pub height: u32,
    pub extrude: u32,
    pub info: OriginalInfo,
}

/// Measures how many fully transparent rows/columns surround the visible content.
///
/// A pixel is visible when its alpha is strictly greater than `threshold`. Each edge is
/// scanned independently from the outside in. Images with no visible pixel report zero
/// offsets so they are never cropped to an empty rectangle.
pub fn measure_trim(rgba: &RgbaImage, threshold: u8) -> TrimOffsets {
    let (w, h) = rgba.dimensions();
    let raw = rgba.as_raw();
    let visible = |x: u32, y: u32| raw[(y as usize * w as usize + x as usize) * 4 + 3] > threshold;
    let column_visible = |x: u32| (0..h).any(|y| visible(x, y));
    let row_visible = |y: u32| (0..w).any(|x| visible(x, y));

    let Some(left) = (0..w).position(column_visible) else {
        return TrimOffsets::default();
    };
    let right = (0..w).rev().position(column_visible).unwrap_or(0);
    let top = (0..h).position(row_visible).unwrap_or(0);
    let bottom = (0..h).rev().position(row_visible).unwrap_or(0);

    TrimOffsets {
        top: top as u32,
        left: left as u32,
        bottom: bottom as u32,
        right: right as u32,
    }
}

/// Scales, trims and extrudes one decoded image according to `settings`.
///
/// Offsets are computed against the scaled dimensions. Images without an alpha channel
/// (and every image under `TrimMode::None`) are only converted to RGBA.
pub fn trim_image(image: &DynamicImage, settings: &PackingSettings) -> Trimmed {
    let has_alpha = image.color().has_alpha();
    let mut rgba = image.to_rgba8();
    if rgba.width() == 0 || rgba.height() == 0 {
        rgba = RgbaImage::new(1, 1);
    }
    if (settings.scale - 1.0).abs() > f32::EPSILON {
        rgba = scale_image(&rgba, settings.scale, settings.scale_method);
    }
    let (w, h) = rgba.dimensions();

    let trim = if has_alpha && settings.trim_mode != TrimMode::None {
        measure_trim(&rgba, settings.alpha_threshold)
    } else {
        TrimOffsets::default()
    };

    let tw = w - trim.left - trim.right;
    let th = h - trim.top - trim.bottom;
    let cropped = if trim.is_zero() {
        rgba
    } else {
        imageops::crop_imm(&rgba, trim.left, trim.top, tw, th).to_image()
    };

    let pixels = extrude_image(&cropped, settings.extrude, settings.extrude_method);
    Trimmed {
        pixels,
        width: tw,
        height: th,
        extrude: settings.extrude,
        info: OriginalInfo {
            original_size: Size { w, h },
            trim,
        },
    }
}

/// Grows `src` by `extrude` pixels on every edge.
pub fn extrude_image(src: &RgbaImage, extrude: u32, method: ExtrudeMethod) -> RgbaImage {
    if extrude == 0 {
        return src.clone();
    }
    let (w, h) = src.dimensions();
    let e = extrude as i64;
    let mut out = RgbaImage::new(w + extrude * 2, h + extrude * 2);
    for (x, y, px) in out.enumerate_pixels_mut() {
        let sx = source_index(x as i64 - e, w, method);
        let sy = source_index(y as i64 - e, h, method);
        *px = *src.get_pixel(sx, sy);
    }
    out
}

/// Maps a possibly out-of-range coordinate onto `0..len`.
fn source_index(i: i64, len: u32, method: ExtrudeMethod) -> u32 {
    let n = len as i64;
    let mapped = match method {
        ExtrudeMethod::Copy => i.clamp(0, n - 1),
        ExtrudeMethod::Repeat => i.rem_euclid(n),
        ExtrudeMethod::Mirror => {
            let m = i.rem_euclid(2 * n);
            if m < n { m } else { 2 * n - 1 - m }
        }
    };
    mapped as u32
}
