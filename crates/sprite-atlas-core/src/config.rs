//! Packing configuration and per-output export variants.
//! Key notes:
//!   - `PackingSettings` is consumed once per packing run and never mutated by the engine
//!   - partial settings (e.g. from a JSON file) are layered over defaults with [`PackingSettings::merge`]
//!   - `OutputSettings` only affects the output assembler; packing is never re-run per variant

use crate::error::{AtlasError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How extruded border pixels are generated around a trimmed sprite.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExtrudeMethod {
    /// Repeat the nearest edge pixel.
    #[default]
    Copy,
    /// Reflect the sprite across each edge.
    Mirror,
    /// Wrap around to the opposite edge (seamless tiles).
    Repeat,
}

impl ExtrudeMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Copy => "copy",
            Self::Mirror => "mirror",
            Self::Repeat => "repeat",
        }
    }
}

impl FromStr for ExtrudeMethod {
    type Err = AtlasError;
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "copy" => Ok(Self::Copy),
            "mirror" => Ok(Self::Mirror),
            "repeat" | "tile" => Ok(Self::Repeat),
            _ => Err(unknown("extrudeMethod", s)),
        }
    }
}

/// What to do with transparent margins around a sprite.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TrimMode {
    /// Remove the margins; sprites keep reporting their original size.
    #[default]
    Trim,
    /// Remove the margins; sprites report the smaller size as if they never had any.
    Crop,
    /// Keep sprites as they are.
    None,
}

impl TrimMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trim => "trim",
            Self::Crop => "crop",
            Self::None => "none",
        }
    }
}

impl FromStr for TrimMode {
    type Err = AtlasError;
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "trim" => Ok(Self::Trim),
            "crop" => Ok(Self::Crop),
            "none" => Ok(Self::None),
            _ => Err(unknown("trimMode", s)),
        }
    }
}

/// Resampling kernels used when scaling sprites or whole canvases.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScaleMethod {
    /// Nearest-neighbor.
    #[default]
    Nearest,
    /// Catmull-Rom.
    Cubic,
    /// Mitchell-Netravali (B = C = 1/3).
    Mitchell,
    /// Lanczos-windowed sinc, a = 2.
    Lanczos2,
    /// Lanczos-windowed sinc, a = 3.
    Lanczos3,
}

impl ScaleMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nearest => "nearest",
            Self::Cubic => "cubic",
            Self::Mitchell => "mitchell",
            Self::Lanczos2 => "lanczos2",
            Self::Lanczos3 => "lanczos3",
        }
    }
}

impl FromStr for ScaleMethod {
    type Err = AtlasError;
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "nearest" => Ok(Self::Nearest),
            "cubic" | "catmullrom" => Ok(Self::Cubic),
            "mitchell" => Ok(Self::Mitchell),
            "lanczos2" => Ok(Self::Lanczos2),
            "lanczos3" | "lanczos" => Ok(Self::Lanczos3),
            _ => Err(unknown("scaleMethod", s)),
        }
    }
}

/// Policy for sprites that do not fit an empty bin in either orientation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OversizedBehaviour {
    /// Drop the sprite.
    Ignore,
    /// Abort the packing run of the sprite's tag group.
    Error,
    /// Give the sprite a bin of its own, sized to fit it exactly.
    #[default]
    Special,
}

impl OversizedBehaviour {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ignore => "ignore",
            Self::Error => "error",
            Self::Special => "special",
        }
    }
}

impl FromStr for OversizedBehaviour {
    type Err = AtlasError;
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "ignore" | "warn" => Ok(Self::Ignore),
            "error" => Ok(Self::Error),
            "special" => Ok(Self::Special),
            _ => Err(unknown("oversizedBehaviour", s)),
        }
    }
}

/// When a multipack index is appended to output names.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum MultipackPolicy {
    /// Only when the run produced more than one canvas.
    #[default]
    Auto,
    /// On every canvas.
    Always,
    /// On every canvas except the first one.
    IgnoreFirst,
}

impl MultipackPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Always => "always",
            Self::IgnoreFirst => "ignore-first",
        }
    }
}

impl FromStr for MultipackPolicy {
    type Err = AtlasError;
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "always" => Ok(Self::Always),
            "ignore-first" | "ignore_first" | "ignorefirst" => Ok(Self::IgnoreFirst),
            _ => Err(unknown("appendMultipackIndex", s)),
        }
    }
}

macro_rules! display_as_str {
    ($($t:ty),*) => {
        $(impl fmt::Display for $t {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

display_as_str!(ExtrudeMethod, TrimMode, ScaleMethod, OversizedBehaviour, MultipackPolicy);

fn unknown(option: &'static str, value: &str) -> AtlasError {
    AtlasError::UnknownOption {
        option,
        value: value.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PackingSettings {
    /// Maximum (or, with `fixed_size`, exact) bin width in pixels.
    pub width: u32,
    /// Maximum (or, with `fixed_size`, exact) bin height in pixels.
    pub height: u32,
    /// Pixels between neighbouring sprites (after extrusion).
    pub padding: u32,
    /// Pixels kept empty along the canvas edges.
    pub border_padding: u32,
    /// Border pixels generated around every sprite; not part of the reported frame.
    pub extrude: u32,
    pub extrude_method: ExtrudeMethod,
    /// Allow 90° rotations when a sprite fits better that way.
    pub allow_rotation: bool,
    /// Pack pixel-identical sprites once and report every alias.
    pub detect_identical: bool,
    /// Round bin dimensions up to the next power of two.
    pub power_of_two: bool,
    /// Force width == height.
    #[serde(alias = "sqaure")]
    pub square: bool,
    /// Bins are exactly `width` x `height`, regardless of content.
    pub fixed_size: bool,
    pub trim_mode: TrimMode,
    /// Pixels with alpha <= threshold count as transparent when trimming.
    pub alpha_threshold: u8,
    /// Sprites are scaled by this factor before trimming and packing.
    pub scale: f32,
    pub scale_method: ScaleMethod,
    pub oversized_behaviour: OversizedBehaviour,
    /// Cap on regular bins per tag group. `None` opens bins as needed.
    pub max_bins: Option<usize>,
}

impl Default for PackingSettings {
    fn default() -> Self {
        Self {
            width: 2048,
            height: 2048,
            padding: 2,
            border_padding: 0,
            extrude: 0,
            extrude_method: ExtrudeMethod::Copy,
            allow_rotation: true,
            detect_identical: true,
            power_of_two: true,
            square: false,
            fixed_size: false,
            trim_mode: TrimMode::Trim,
            alpha_threshold: 0,
            scale: 1.0,
            scale_method: ScaleMethod::Nearest,
            oversized_behaviour: OversizedBehaviour::Special,
            max_bins: None,
        }
    }
}

impl PackingSettings {
    /// Validates the configuration parameters.
    ///
    /// Returns an error if:
    /// - Dimensions are zero
    /// - `border_padding` leaves no usable space
    /// - `scale` is not a positive finite number
    /// - `max_bins` is `Some(0)`
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(AtlasError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }

        let total_border = self.border_padding.saturating_mul(2);
        if total_border >= self.width || total_border >= self.height {
            return Err(AtlasError::InvalidConfig(format!(
                "borderPadding ({}) * 2 exceeds atlas dimensions ({}x{})",
                self.border_padding, self.width, self.height
            )));
        }

        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(AtlasError::InvalidConfig(format!(
                "scale must be a positive number, got {}",
                self.scale
            )));
        }

        if self.max_bins == Some(0) {
            return Err(AtlasError::InvalidConfig(
                "maxBins must be at least 1".into(),
            ));
        }

        Ok(())
    }

    /// Usable packing area once the edge border is removed.
    pub fn usable_dimensions(&self) -> (u32, u32) {
        let b = self.border_padding.saturating_mul(2);
        (self.width.saturating_sub(b), self.height.saturating_sub(b))
    }

    /// Returns a copy of `self` with every field set in `overrides` replaced.
    pub fn merge(&self, overrides: &SettingsOverrides) -> Self {
        let mut out = self.clone();
        macro_rules! take {
            ($($field:ident),*) => {
                $(if let Some(v) = &overrides.$field {
                    out.$field = v.clone();
                })*
            };
        }
        take!(
            width,
            height,
            padding,
            border_padding,
            extrude,
            extrude_method,
            allow_rotation,
            detect_identical,
            power_of_two,
            square,
            fixed_size,
            trim_mode,
            alpha_threshold,
            scale,
            scale_method,
            oversized_behaviour
        );
        if let Some(n) = overrides.max_bins {
            out.max_bins = Some(n);
        }
        out
    }

    /// Parses a (possibly partial) JSON settings object and layers it over the defaults.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let overrides: SettingsOverrides = serde_json::from_str(s)?;
        Ok(Self::default().merge(&overrides))
    }

    /// Create a fluent builder for `PackingSettings`.
    pub fn builder() -> PackingSettingsBuilder {
        PackingSettingsBuilder::new()
    }
}

/// Partial `PackingSettings`: unset fields keep the value they are merged over.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SettingsOverrides {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub padding: Option<u32>,
    pub border_padding: Option<u32>,
    pub extrude: Option<u32>,
    pub extrude_method: Option<ExtrudeMethod>,
    pub allow_rotation: Option<bool>,
    pub detect_identical: Option<bool>,
    pub power_of_two: Option<bool>,
    #[serde(alias = "sqaure")]
    pub square: Option<bool>,
    pub fixed_size: Option<bool>,
    pub trim_mode: Option<TrimMode>,
    pub alpha_threshold: Option<u8>,
    pub scale: Option<f32>,
    pub scale_method: Option<ScaleMethod>,
    pub oversized_behaviour: Option<OversizedBehaviour>,
    pub max_bins: Option<usize>,
}

/// Builder for `PackingSettings` for ergonomic construction.
#[derive(Debug, Default, Clone)]
pub struct PackingSettingsBuilder {
    cfg: PackingSettings,
}

impl PackingSettingsBuilder {
    pub fn new() -> Self {
        Self {
            cfg: PackingSettings::default(),
        }
    }
    pub fn with_dimensions(mut self, w: u32, h: u32) -> Self {
        self.cfg.width = w;
        self.cfg.height = h;
        self
    }
    pub fn padding(mut self, v: u32) -> Self {
        self.cfg.padding = v;
        self
    }
    pub fn border_padding(mut self, v: u32) -> Self {
        self.cfg.border_padding = v;
        self
    }
    pub fn extrude(mut self, v: u32) -> Self {
        self.cfg.extrude = v;
        self
    }
    pub fn extrude_method(mut self, v: ExtrudeMethod) -> Self {
        self.cfg.extrude_method = v;
        self
    }
    pub fn allow_rotation(mut self, v: bool) -> Self {
        self.cfg.allow_rotation = v;
        self
    }
    pub fn detect_identical(mut self, v: bool) -> Self {
        self.cfg.detect_identical = v;
        self
    }
    pub fn pow2(mut self, v: bool) -> Self {
        self.cfg.power_of_two = v;
        self
    }
    pub fn square(mut self, v: bool) -> Self {
        self.cfg.square = v;
        self
    }
    pub fn fixed_size(mut self, v: bool) -> Self {
        self.cfg.fixed_size = v;
        self
    }
    pub fn trim_mode(mut self, v: TrimMode) -> Self {
        self.cfg.trim_mode = v;
        self
    }
    pub fn alpha_threshold(mut self, v: u8) -> Self {
        self.cfg.alpha_threshold = v;
        self
    }
    pub fn scale(mut self, v: f32) -> Self {
        self.cfg.scale = v;
        self
    }
    pub fn scale_method(mut self, v: ScaleMethod) -> Self {
        self.cfg.scale_method = v;
        self
    }
    pub fn oversized(mut self, v: OversizedBehaviour) -> Self {
        self.cfg.oversized_behaviour = v;
        self
    }
    pub fn max_bins(mut self, v: Option<usize>) -> Self {
        self.cfg.max_bins = v;
        self
    }
    pub fn build(self) -> PackingSettings {
        self.cfg
    }
}

/// One export variant of a packing run (name, scale, multipack naming).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OutputSettings {
    /// Descriptor base name; `{n}` is replaced by the multipack index when present.
    pub name: String,
    /// Texture base name; falls back to `name`.
    pub texture_name: Option<String>,
    /// Scale applied to the composed canvas and, proportionally, to sprite geometry.
    pub scale: f32,
    pub scale_method: ScaleMethod,
    #[serde(rename = "appendMultipackIndex")]
    pub multipack: MultipackPolicy,
    pub starting_multipack_index: usize,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            name: "atlas".into(),
            texture_name: None,
            scale: 1.0,
            scale_method: ScaleMethod::Nearest,
            multipack: MultipackPolicy::Auto,
            starting_multipack_index: 0,
        }
    }
}

impl OutputSettings {
    pub fn validate(&self) -> Result<()> {
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(AtlasError::InvalidConfig(format!(
                "output scale must be a positive number, got {}",
                self.scale
            )));
        }
        if self.name.is_empty() && self.texture_name.as_deref().is_none_or(str::is_empty) {
            return Err(AtlasError::InvalidConfig(
                "output needs a descriptor or texture name".into(),
            ));
        }
        Ok(())
    }

    pub fn texture_base_name(&self) -> &str {
        match self.texture_name.as_deref() {
            Some(t) if !t.is_empty() => t,
            _ => &self.name,
        }
    }

    pub fn descriptor_base_name(&self) -> &str {
        if self.name.is_empty() {
            self.texture_base_name()
        } else {
            &self.name
        }
    }
}
