//! Output assembly: per-variant re-scaling, multipack naming and per-canvas metadata.
//!
//! Sprite geometry is scaled after packing, so non-unit output scales may yield fractional
//! frames. Encoding the pixels and rendering descriptors is left to the caller.

use crate::config::{MultipackPolicy, OutputSettings, PackingSettings};
use crate::error::Result;
use crate::model::{AtlasCanvas, PackedSprite, Size};
use crate::resample::scale_image;
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Pixel layout of every produced texture.
pub const TEXTURE_FORMAT: &str = "RGBA8888";

const PLACEHOLDER: &str = "{n}";

/// Resolves the file base name of canvas `index` out of `total`.
///
/// When `policy` asks for an index on this canvas, a `{n}` placeholder in `base` is replaced by
/// `starting_index + index`; without one, `-{n}` is appended unless the number is 0. Otherwise
/// the placeholder is dropped.
pub fn multipack_name(
    base: &str,
    index: usize,
    total: usize,
    policy: MultipackPolicy,
    starting_index: usize,
) -> String {
    let wanted = match policy {
        MultipackPolicy::Always => true,
        MultipackPolicy::Auto => total > 1,
        MultipackPolicy::IgnoreFirst => index > 0,
    };
    if !wanted {
        return base.replace(PLACEHOLDER, "");
    }
    let n = starting_index + index;
    if base.contains(PLACEHOLDER) {
        base.replace(PLACEHOLDER, &n.to_string())
    } else if n == 0 {
        base.to_string()
    } else {
        format!("{base}-{n}")
    }
}

/// Metadata of one exported canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AtlasMetadata {
    /// Descriptor base name of this canvas.
    pub name: String,
    /// Texture base name, without extension.
    pub image: String,
    pub format: String,
    /// Combined packing and output scale.
    pub scale: f32,
    /// Texture dimensions after output scaling.
    pub size: Size,
    pub oversized: bool,
    /// Descriptor names of the sibling canvases of the same variant.
    pub related_multi_packs: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    pub app: String,
    pub version: String,
}

/// One canvas of one output variant, ready to encode.
#[derive(Debug, Clone)]
pub struct AtlasOutput {
    pub rgba: RgbaImage,
    pub metadata: AtlasMetadata,
    pub sprites: Vec<PackedSprite<f32>>,
}

/// Builds the outputs of a single variant, in canvas order.
#[instrument(skip_all, fields(name = %output.name, scale = output.scale))]
pub fn assemble(
    canvases: &[AtlasCanvas],
    packing: &PackingSettings,
    output: &OutputSettings,
) -> Result<Vec<AtlasOutput>> {
    output.validate()?;
    let total = canvases.len();
    let name_of = |base: &str, i: usize| {
        multipack_name(base, i, total, output.multipack, output.starting_multipack_index)
    };
    let descriptors: Vec<String> = (0..total)
        .map(|i| name_of(output.descriptor_base_name(), i))
        .collect();

    let mut out = Vec::with_capacity(total);
    for (i, canvas) in canvases.iter().enumerate() {
        let rgba = if output.scale == 1.0 {
            canvas.rgba.clone()
        } else {
            scale_image(&canvas.rgba, output.scale, output.scale_method)
        };
        let sprites = canvas.sprites.iter().map(|s| s.scaled(output.scale)).collect();
        let related_multi_packs = descriptors
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .map(|(_, d)| d.clone())
            .collect();
        debug!(canvas = i, w = rgba.width(), h = rgba.height(), "assembled canvas");
        out.push(AtlasOutput {
            metadata: AtlasMetadata {
                name: descriptors[i].clone(),
                image: name_of(output.texture_base_name(), i),
                format: TEXTURE_FORMAT.to_string(),
                scale: packing.scale * output.scale,
                size: Size {
                    w: rgba.width(),
                    h: rgba.height(),
                },
                oversized: canvas.oversized,
                related_multi_packs,
                tag: canvas.tag.clone(),
                app: env!("CARGO_PKG_NAME").to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            rgba,
            sprites,
        });
    }
    Ok(out)
}

/// Builds every requested variant from the same canvases; one entry per variant.
pub fn assemble_all(
    canvases: &[AtlasCanvas],
    packing: &PackingSettings,
    outputs: &[OutputSettings],
) -> Result<Vec<Vec<AtlasOutput>>> {
    outputs
        .iter()
        .map(|o| assemble(canvases, packing, o))
        .collect()
}
