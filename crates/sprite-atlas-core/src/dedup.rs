use crate::model::{ContentHash, PackableUnit, SourceImage};
use crate::trim::Trimmed;
use image::RgbaImage;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use tracing::debug;

/// BLAKE3 digest over the buffer dimensions and raw RGBA bytes, tagged with `tag`.
pub fn content_hash(pixels: &RgbaImage, tag: Option<&str>) -> ContentHash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&pixels.width().to_le_bytes());
    hasher.update(&pixels.height().to_le_bytes());
    hasher.update(pixels.as_raw());
    ContentHash {
        digest: *hasher.finalize().as_bytes(),
        tag: tag.map(str::to_owned),
    }
}

/// Wraps a trimmed image into a packable unit known by a single alias.
pub fn make_unit(trimmed: Trimmed, name: String, tag: Option<String>, order: usize) -> PackableUnit {
    let hash = content_hash(&trimmed.pixels, tag.as_deref());
    let source = SourceImage::new(name, tag, trimmed.info);
    PackableUnit::new(
        trimmed.pixels,
        trimmed.width,
        trimmed.height,
        trimmed.extrude,
        hash,
        source,
        order,
    )
}

/// Merges units with identical content hashes.
///
/// The first unit seen for a hash is the representative; later duplicates append their aliases
/// and trim records to it and are dropped. Representatives keep first-seen order.
/// With `detect_identical == false` every unit is returned unchanged.
pub fn deduplicate(units: Vec<PackableUnit>, detect_identical: bool) -> Vec<PackableUnit> {
    if !detect_identical {
        return units;
    }
    let mut first_seen: HashMap<ContentHash, usize> = HashMap::with_capacity(units.len());
    let mut out: Vec<PackableUnit> = Vec::with_capacity(units.len());
    for unit in units {
        match first_seen.entry(unit.hash.clone()) {
            Entry::Occupied(slot) => {
                let rep = &mut out[*slot.get()];
                debug!(
                    alias = unit.name(),
                    representative = rep.name(),
                    "merged identical sprite"
                );
                let (_pixels, source) = unit.into_parts();
                rep.source.absorb(source);
            }
            Entry::Vacant(slot) => {
                slot.insert(out.len());
                out.push(unit);
            }
        }
    }
    out
}
