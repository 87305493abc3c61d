use crate::config::TrimMode;
use crate::model::{
    AtlasCanvas, Bin, OriginalInfo, PackedSprite, Size, SpriteRect, TrimOffsets,
};
use image::RgbaImage;
use tracing::instrument;

/// Copy `src` into `canvas` with its top-left at (dx, dy), optionally rotated 90° clockwise.
/// Destination pixels are overwritten, not blended; pixels falling outside the canvas are dropped.
pub fn blit_rgba(src: &RgbaImage, canvas: &mut RgbaImage, dx: u32, dy: u32, rotated: bool) {
    let (cw, ch) = canvas.dimensions();
    let (sw, sh) = src.dimensions();
    // destination (rendered) size differs when rotated
    let (rw, rh) = if rotated { (sh, sw) } else { (sw, sh) };

    for yy in 0..rh {
        if dy + yy >= ch {
            break;
        }
        for xx in 0..rw {
            if dx + xx >= cw {
                break;
            }
            let (ix, iy) = if rotated { (yy, sh - 1 - xx) } else { (xx, yy) };
            canvas.put_pixel(dx + xx, dy + yy, *src.get_pixel(ix, iy));
        }
    }
}

/// Composes one bin into an RGBA canvas and its per-alias sprite records.
///
/// Each unit's pixel buffer (extrusion included) is blitted at its placement minus the
/// extrusion and released right after. Every alias gets its own record built from its
/// own trim data; `index`, `first` and `last` follow emission order.
#[instrument(skip_all, fields(width = bin.width, height = bin.height, units = bin.units.len()))]
pub fn compose_bin(bin: Bin, trim_mode: TrimMode) -> AtlasCanvas {
    let mut canvas = RgbaImage::new(bin.width, bin.height);
    let mut sprites: Vec<PackedSprite> = Vec::new();

    for unit in bin.units {
        let Some(place) = unit.placement() else {
            continue;
        };
        let (w, h, e) = (unit.width, unit.height, unit.extrude);
        let frame = if place.rotated {
            SpriteRect { x: place.x, y: place.y, w: h, h: w }
        } else {
            SpriteRect { x: place.x, y: place.y, w, h }
        };

        let (pixels, source) = unit.into_parts();
        blit_rgba(
            &pixels,
            &mut canvas,
            place.x.saturating_sub(e),
            place.y.saturating_sub(e),
            place.rotated,
        );
        drop(pixels);

        for alias in &source.aliases {
            let info = source.original_info.get(alias).copied().unwrap_or(OriginalInfo {
                original_size: Size { w, h },
                trim: TrimOffsets::default(),
            });
            let (trimmed, sprite_source_size, source_size) = match trim_mode {
                TrimMode::Crop => (false, SpriteRect { x: 0, y: 0, w, h }, Size { w, h }),
                TrimMode::Trim | TrimMode::None => (
                    !info.trim.is_zero(),
                    SpriteRect {
                        x: info.trim.left,
                        y: info.trim.top,
                        w,
                        h,
                    },
                    info.original_size,
                ),
            };
            sprites.push(PackedSprite {
                name: alias.clone(),
                frame,
                trimmed,
                rotated: place.rotated,
                oversized: place.oversized,
                sprite_source_size,
                source_size,
                trimmed_data: info.trim,
                index: 0,
                first: false,
                last: false,
            });
        }
    }

    let count = sprites.len();
    for (i, s) in sprites.iter_mut().enumerate() {
        s.index = i;
        s.first = i == 0;
        s.last = i + 1 == count;
    }

    AtlasCanvas {
        rgba: canvas,
        size: Size {
            w: bin.width,
            h: bin.height,
        },
        oversized: bin.oversized,
        tag: bin.tag,
        sprites,
    }
}
