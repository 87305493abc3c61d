use image::{DynamicImage, RgbaImage};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Axis-aligned rectangle (pixels). `x,y` is top-left; `w,h` are sizes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }
    /// Exclusive right edge (`x + w`).
    pub fn x2(&self) -> u32 {
        self.x + self.w
    }
    /// Exclusive bottom edge (`y + h`).
    pub fn y2(&self) -> u32 {
        self.y + self.h
    }
    pub fn area(&self) -> u64 {
        self.w as u64 * self.h as u64
    }
    /// Returns true if `r` is fully inside `self`.
    pub fn contains(&self, r: &Rect) -> bool {
        r.x >= self.x && r.y >= self.y && r.x2() <= self.x2() && r.y2() <= self.y2()
    }
    /// Returns true if the two rectangles share at least one pixel.
    pub fn intersects(&self, r: &Rect) -> bool {
        !(self.x >= r.x2() || r.x >= self.x2() || self.y >= r.y2() || r.y >= self.y2())
    }
}

/// Width/height pair.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Size<N = u32> {
    pub w: N,
    pub h: N,
}

/// Rectangle as reported in sprite metadata.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SpriteRect<N = u32> {
    pub x: N,
    pub y: N,
    pub w: N,
    pub h: N,
}

/// Pixels removed from each edge of an image when trimming.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct TrimOffsets<N = u32> {
    pub top: N,
    pub left: N,
    pub bottom: N,
    pub right: N,
}

impl TrimOffsets {
    pub fn is_zero(&self) -> bool {
        self.top == 0 && self.left == 0 && self.bottom == 0 && self.right == 0
    }
}

/// Pre-trim size and trim record of one alias.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OriginalInfo {
    pub original_size: Size,
    pub trim: TrimOffsets,
}

/// In-memory image to pack (name + optional tag + decoded image).
#[derive(Debug, Clone)]
pub struct InputImage {
    pub name: String,
    /// Images sharing a tag always land in the same bins; untagged images form their own group.
    pub tag: Option<String>,
    pub image: DynamicImage,
}

impl InputImage {
    pub fn new(name: impl Into<String>, image: DynamicImage) -> Self {
        Self {
            name: name.into(),
            tag: None,
            image,
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }
}

/// Names and per-alias trim records a packable unit stands for.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceImage {
    /// Ordered names this content is known by; the first one is the representative.
    pub aliases: Vec<String>,
    pub tag: Option<String>,
    pub original_info: HashMap<String, OriginalInfo>,
}

impl SourceImage {
    pub fn new(alias: String, tag: Option<String>, info: OriginalInfo) -> Self {
        let mut original_info = HashMap::with_capacity(1);
        original_info.insert(alias.clone(), info);
        Self {
            aliases: vec![alias],
            tag,
            original_info,
        }
    }

    pub fn name(&self) -> &str {
        self.aliases.first().map(String::as_str).unwrap_or_default()
    }

    /// Appends `other`'s aliases and trim records. An alias already known keeps its first record.
    pub fn absorb(&mut self, other: SourceImage) {
        let SourceImage {
            aliases,
            mut original_info,
            ..
        } = other;
        for alias in aliases {
            if self.aliases.contains(&alias) {
                continue;
            }
            if let Some(info) = original_info.remove(&alias) {
                self.original_info.insert(alias.clone(), info);
            }
            self.aliases.push(alias);
        }
    }
}

/// Digest of a unit's trimmed pixels, suffixed with its tag so tagged duplicates never merge across tags.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentHash {
    pub digest: [u8; 32],
    pub tag: Option<String>,
}

/// Position assigned by the bin packer. `x,y` is the top-left of the sprite content
/// (extrusion excluded) in stored orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub x: u32,
    pub y: u32,
    pub rotated: bool,
    pub oversized: bool,
}

/// A trimmed sprite ready for packing.
#[derive(Debug, Clone)]
pub struct PackableUnit {
    /// Trimmed (post-scale, pre-extrude) width.
    pub width: u32,
    /// Trimmed (post-scale, pre-extrude) height.
    pub height: u32,
    /// Extrusion already baked into `pixels` on every edge.
    pub extrude: u32,
    pub hash: ContentHash,
    pub source: SourceImage,
    /// Trimmed + extruded pixels, `(width + 2 * extrude) x (height + 2 * extrude)`.
    pub(crate) pixels: RgbaImage,
    /// First-seen input index, used to break packing-order ties.
    pub(crate) order: usize,
    placement: Option<Placement>,
}

impl PackableUnit {
    pub(crate) fn new(
        pixels: RgbaImage,
        width: u32,
        height: u32,
        extrude: u32,
        hash: ContentHash,
        source: SourceImage,
        order: usize,
    ) -> Self {
        Self {
            width,
            height,
            extrude,
            hash,
            source,
            pixels,
            order,
            placement: None,
        }
    }

    pub fn name(&self) -> &str {
        self.source.name()
    }

    pub fn tag(&self) -> Option<&str> {
        self.source.tag.as_deref()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// `None` until the bin packer has placed the unit.
    pub fn placement(&self) -> Option<Placement> {
        self.placement
    }

    /// Atlas rectangle of the sprite content in stored orientation.
    pub fn frame(&self) -> Option<Rect> {
        self.placement.map(|p| {
            let (w, h) = if p.rotated {
                (self.height, self.width)
            } else {
                (self.width, self.height)
            };
            Rect::new(p.x, p.y, w, h)
        })
    }

    pub(crate) fn place(&mut self, placement: Placement) {
        debug_assert!(self.placement.is_none(), "unit placed twice");
        if self.placement.is_none() {
            self.placement = Some(placement);
        }
    }

    pub(crate) fn into_parts(self) -> (RgbaImage, SourceImage) {
        (self.pixels, self.source)
    }
}

/// A packed bin: final dimensions and placed units in placement order.
#[derive(Debug, Clone)]
pub struct Bin {
    pub width: u32,
    pub height: u32,
    /// True for a bin holding a single sprite larger than the configured canvas.
    pub oversized: bool,
    pub tag: Option<String>,
    pub units: Vec<PackableUnit>,
}

/// Final per-alias output record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackedSprite<N = u32> {
    pub name: String,
    /// Rectangle within the atlas (stored orientation, extrusion excluded).
    pub frame: SpriteRect<N>,
    pub trimmed: bool,
    pub rotated: bool,
    pub oversized: bool,
    /// Trim box within the original image.
    pub sprite_source_size: SpriteRect<N>,
    /// Original (untrimmed) image size.
    pub source_size: Size<N>,
    pub trimmed_data: TrimOffsets<N>,
    pub index: usize,
    pub first: bool,
    pub last: bool,
}

impl PackedSprite<u32> {
    /// Proportionally scales every geometric field. Fractional results are kept as-is.
    pub fn scaled(&self, s: f32) -> PackedSprite<f32> {
        let f = |v: u32| v as f32 * s;
        let r = |r: &SpriteRect| SpriteRect {
            x: f(r.x),
            y: f(r.y),
            w: f(r.w),
            h: f(r.h),
        };
        PackedSprite {
            name: self.name.clone(),
            frame: r(&self.frame),
            trimmed: self.trimmed,
            rotated: self.rotated,
            oversized: self.oversized,
            sprite_source_size: r(&self.sprite_source_size),
            source_size: Size {
                w: f(self.source_size.w),
                h: f(self.source_size.h),
            },
            trimmed_data: TrimOffsets {
                top: f(self.trimmed_data.top),
                left: f(self.trimmed_data.left),
                bottom: f(self.trimmed_data.bottom),
                right: f(self.trimmed_data.right),
            },
            index: self.index,
            first: self.first,
            last: self.last,
        }
    }
}

/// A composed atlas page: RGBA pixels plus its sprite records.
#[derive(Debug, Clone)]
pub struct AtlasCanvas {
    pub rgba: RgbaImage,
    pub size: Size,
    pub oversized: bool,
    pub tag: Option<String>,
    pub sprites: Vec<PackedSprite>,
}

/// Statistics about atlas packing efficiency.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PackStats {
    /// Total number of canvases.
    pub num_canvases: usize,
    /// Total number of sprite records (aliases).
    pub num_sprites: usize,
    /// Distinct packed rectangles (aliases of one deduplicated unit count once).
    pub num_packed: usize,
    /// Total area of all canvases.
    pub total_canvas_area: u64,
    /// Area covered by distinct packed rectangles.
    pub used_area: u64,
    /// used_area / total_canvas_area (0.0 to 1.0). Higher is better.
    pub occupancy: f64,
    pub num_rotated: usize,
    pub num_trimmed: usize,
    pub num_oversized_canvases: usize,
}

impl PackStats {
    /// Computes packing statistics for a set of canvases.
    pub fn from_canvases(canvases: &[AtlasCanvas]) -> Self {
        let mut stats = PackStats {
            num_canvases: canvases.len(),
            num_sprites: 0,
            num_packed: 0,
            total_canvas_area: 0,
            used_area: 0,
            occupancy: 0.0,
            num_rotated: 0,
            num_trimmed: 0,
            num_oversized_canvases: 0,
        };

        for canvas in canvases {
            stats.total_canvas_area += canvas.size.w as u64 * canvas.size.h as u64;
            if canvas.oversized {
                stats.num_oversized_canvases += 1;
            }
            let mut seen: HashSet<(u32, u32)> = HashSet::new();
            for sprite in &canvas.sprites {
                stats.num_sprites += 1;
                if sprite.rotated {
                    stats.num_rotated += 1;
                }
                if sprite.trimmed {
                    stats.num_trimmed += 1;
                }
                if seen.insert((sprite.frame.x, sprite.frame.y)) {
                    stats.num_packed += 1;
                    stats.used_area += sprite.frame.w as u64 * sprite.frame.h as u64;
                }
            }
        }

        if stats.total_canvas_area > 0 {
            stats.occupancy = stats.used_area as f64 / stats.total_canvas_area as f64;
        }
        stats
    }

    /// Returns a human-readable summary of the statistics.
    pub fn summary(&self) -> String {
        format!(
            "Canvases: {}, Sprites: {} ({} packed), Occupancy: {:.2}%, Total Area: {} px², Used Area: {} px², Rotated: {}, Trimmed: {}",
            self.num_canvases,
            self.num_sprites,
            self.num_packed,
            self.occupancy * 100.0,
            self.total_canvas_area,
            self.used_area,
            self.num_rotated,
            self.num_trimmed,
        )
    }

    /// Returns wasted space in pixels.
    pub fn wasted_area(&self) -> u64 {
        self.total_canvas_area.saturating_sub(self.used_area)
    }
}
