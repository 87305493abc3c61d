//! Core library for packing sprites into texture atlases.
//!
//! - Trimmer: scale, transparent-margin trim, extrusion
//! - Deduplicator: BLAKE3 content hashing, identical sprites share one packed rectangle
//! - Bin packer: MaxRects best-area-fit over as many bins as needed, per tag group
//! - Compositor and output assembler: RGBA canvases, per-alias sprite records and per-variant metadata
//!
//! Quick example:
//! ```ignore
//! use sprite_atlas_core::prelude::*;
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let inputs = vec![
//!     InputImage::decode("hero.png", &std::fs::read("hero.png")?, None)?,
//!     InputImage::decode("coin.png", &std::fs::read("coin.png")?, None)?,
//! ];
//! let settings = PackingSettings::builder().with_dimensions(1024, 1024).build();
//! let out = pack_images(inputs, &settings)?;
//! for atlas in assemble(&out.canvases, &settings, &OutputSettings::default())? {
//!     println!("{}: {}", atlas.metadata.name, to_json_hash(&atlas));
//! }
//! # Ok(()) }
//! ```

pub mod compositing;
pub mod config;
pub mod dedup;
pub mod error;
pub mod export;
pub mod model;
pub mod output;
pub mod packer;
pub mod pipeline;
pub mod resample;
pub mod trim;

pub use config::*;
pub use error::*;
pub use export::*;
pub use model::*;
pub use output::*;
pub use pipeline::*;

/// Convenience prelude for common types and functions.
/// Importing `sprite_atlas_core::prelude::*` brings the primary APIs into scope.
pub mod prelude {
    pub use crate::config::{
        ExtrudeMethod, MultipackPolicy, OutputSettings, OversizedBehaviour, PackingSettings,
        PackingSettingsBuilder, ScaleMethod, SettingsOverrides, TrimMode,
    };
    pub use crate::export::{to_json_array, to_json_hash};
    pub use crate::model::{AtlasCanvas, InputImage, PackStats, PackedSprite, Rect};
    pub use crate::output::{AtlasOutput, assemble, assemble_all, multipack_name};
    pub use crate::pipeline::{
        Cancellation, PackOutput, TagGroupOutput, pack_images, pack_tag_groups,
        pack_tag_groups_with_cancel,
    };
}
