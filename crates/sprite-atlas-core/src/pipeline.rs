use crate::compositing::compose_bin;
use crate::config::PackingSettings;
use crate::dedup::{deduplicate, make_unit};
use crate::error::{AtlasError, Result};
use crate::model::{AtlasCanvas, Bin, InputImage, PackStats, PackableUnit};
use crate::packer::bins::BinPacker;
use crate::trim::trim_image;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, instrument};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

impl InputImage {
    /// Decodes an encoded image (any format enabled on the `image` crate).
    pub fn decode(name: impl Into<String>, bytes: &[u8], tag: Option<String>) -> Result<Self> {
        let name = name.into();
        match image::load_from_memory(bytes) {
            Ok(image) => Ok(Self { name, tag, image }),
            Err(source) => Err(AtlasError::Decode { name, source }),
        }
    }
}

/// Decodes a batch of `(name, bytes, tag)` entries. Failures are reported per entry so
/// callers can skip unreadable files and pack the rest.
pub fn decode_inputs<I, N, B>(entries: I) -> Vec<Result<InputImage>>
where
    I: IntoIterator<Item = (N, B, Option<String>)>,
    N: Into<String>,
    B: AsRef<[u8]>,
{
    entries
        .into_iter()
        .map(|(name, bytes, tag)| InputImage::decode(name, bytes.as_ref(), tag))
        .collect()
}

/// Shared flag for aborting a run before its canvases are composed.
#[derive(Debug, Clone, Default)]
pub struct Cancellation(Arc<AtomicBool>);

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(AtlasError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Canvases of one tag group, or the error that aborted that group.
#[derive(Debug)]
pub struct TagGroupOutput {
    pub tag: Option<String>,
    pub result: Result<Vec<AtlasCanvas>>,
}

/// Output of a packing run: every composed canvas, tag groups in first-seen order.
#[derive(Debug, Clone)]
pub struct PackOutput {
    pub canvases: Vec<AtlasCanvas>,
}

impl PackOutput {
    pub fn stats(&self) -> PackStats {
        PackStats::from_canvases(&self.canvases)
    }
}

/// Splits inputs by tag, keeping first-seen group order and each input's position.
fn group_by_tag(inputs: Vec<InputImage>) -> Vec<(Option<String>, Vec<(usize, InputImage)>)> {
    let mut groups: Vec<(Option<String>, Vec<(usize, InputImage)>)> = Vec::new();
    for (order, input) in inputs.into_iter().enumerate() {
        match groups.iter_mut().find(|(tag, _)| *tag == input.tag) {
            Some((_, members)) => members.push((order, input)),
            None => groups.push((input.tag.clone(), vec![(order, input)])),
        }
    }
    groups
}

fn prepare_units(images: Vec<(usize, InputImage)>, settings: &PackingSettings) -> Vec<PackableUnit> {
    #[cfg(feature = "parallel")]
    let iter = images.into_par_iter();
    #[cfg(not(feature = "parallel"))]
    let iter = images.into_iter();

    iter.map(|(order, input)| {
        let trimmed = trim_image(&input.image, settings);
        debug!(
            name = %input.name,
            top = trimmed.info.trim.top,
            left = trimmed.info.trim.left,
            bottom = trimmed.info.trim.bottom,
            right = trimmed.info.trim.right,
            "trimmed image"
        );
        make_unit(trimmed, input.name, input.tag, order)
    })
    .collect()
}

fn compose_bins(bins: Vec<Bin>, settings: &PackingSettings) -> Vec<AtlasCanvas> {
    let mode = settings.trim_mode;
    #[cfg(feature = "parallel")]
    let iter = bins.into_par_iter();
    #[cfg(not(feature = "parallel"))]
    let iter = bins.into_iter();

    iter.map(|bin| compose_bin(bin, mode)).collect()
}

#[instrument(skip_all, fields(tag = ?tag, images = images.len()))]
fn pack_group(
    tag: Option<String>,
    images: Vec<(usize, InputImage)>,
    settings: &PackingSettings,
    cancel: &Cancellation,
) -> Result<Vec<AtlasCanvas>> {
    if images.is_empty() {
        return Err(AtlasError::Empty { tag });
    }
    let units = prepare_units(images, settings);
    cancel.check()?;

    let units = deduplicate(units, settings.detect_identical);
    let num_units = units.len();
    let bins = BinPacker::new(settings).pack(tag.clone(), units)?;
    cancel.check()?;

    let canvases = compose_bins(bins, settings);
    info!(
        tag = ?tag,
        units = num_units,
        bins = canvases.len(),
        sprites = canvases.iter().map(|c| c.sprites.len()).sum::<usize>(),
        "packed tag group"
    );
    Ok(canvases)
}

/// Packs each tag group independently; a failing group does not affect the others.
pub fn pack_tag_groups(
    inputs: Vec<InputImage>,
    settings: &PackingSettings,
) -> Result<Vec<TagGroupOutput>> {
    pack_tag_groups_with_cancel(inputs, settings, &Cancellation::new())
}

/// Like [`pack_tag_groups`], checking `cancel` after trimming and again before composing
/// each group. A group whose composition has started always completes.
#[instrument(skip_all, fields(inputs = inputs.len()))]
pub fn pack_tag_groups_with_cancel(
    inputs: Vec<InputImage>,
    settings: &PackingSettings,
    cancel: &Cancellation,
) -> Result<Vec<TagGroupOutput>> {
    settings.validate()?;
    if inputs.is_empty() {
        return Err(AtlasError::Empty { tag: None });
    }
    Ok(group_by_tag(inputs)
        .into_iter()
        .map(|(tag, images)| TagGroupOutput {
            result: pack_group(tag.clone(), images, settings, cancel),
            tag,
        })
        .collect())
}

/// Packs `inputs` into atlas canvases; the first failing tag group aborts the run.
#[instrument(skip_all)]
pub fn pack_images(inputs: Vec<InputImage>, settings: &PackingSettings) -> Result<PackOutput> {
    let mut canvases = Vec::new();
    for group in pack_tag_groups(inputs, settings)? {
        canvases.extend(group.result?);
    }
    let out = PackOutput { canvases };
    info!(summary = %out.stats().summary(), "packing finished");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgba, RgbaImage};

    fn solid(name: &str, tag: Option<&str>, w: u32, h: u32, v: u8) -> InputImage {
        let img = RgbaImage::from_pixel(w, h, Rgba([v, v, v, 255]));
        let input = InputImage::new(name, DynamicImage::ImageRgba8(img));
        match tag {
            Some(t) => input.with_tag(t),
            None => input,
        }
    }

    #[test]
    fn groups_keep_first_seen_order() {
        let groups = group_by_tag(vec![
            solid("a", Some("ui"), 2, 2, 1),
            solid("b", None, 2, 2, 2),
            solid("c", Some("ui"), 2, 2, 3),
        ]);
        let tags: Vec<Option<&str>> = groups.iter().map(|(t, _)| t.as_deref()).collect();
        assert_eq!(tags, vec![Some("ui"), None]);
        assert_eq!(groups[0].1.iter().map(|(o, _)| *o).collect::<Vec<_>>(), vec![0, 2]);
    }

    #[test]
    fn empty_input_is_an_error() {
        let err = pack_images(Vec::new(), &PackingSettings::default()).unwrap_err();
        assert!(matches!(err, AtlasError::Empty { tag: None }));
    }

    #[test]
    fn cancelled_run_composes_nothing() {
        let cancel = Cancellation::new();
        cancel.cancel();
        let groups = pack_tag_groups_with_cancel(
            vec![solid("a", None, 4, 4, 1)],
            &PackingSettings::default(),
            &cancel,
        )
        .expect("valid run");
        assert!(matches!(groups[0].result, Err(AtlasError::Cancelled)));
    }

    #[test]
    fn failing_group_leaves_others_intact() {
        let settings = PackingSettings::builder()
            .with_dimensions(32, 32)
            .oversized(crate::config::OversizedBehaviour::Error)
            .build();
        let groups = pack_tag_groups(
            vec![solid("huge", Some("big"), 64, 64, 1), solid("ok", None, 8, 8, 2)],
            &settings,
        )
        .expect("valid run");
        assert!(matches!(groups[0].result, Err(AtlasError::Oversized { .. })));
        let ok = groups[1].result.as_ref().expect("untagged group packs");
        assert_eq!(ok[0].sprites[0].name, "ok");
    }

    #[test]
    fn decode_reports_the_failing_name() {
        let results = decode_inputs(vec![("broken.png", b"not an image".as_slice(), None)]);
        match &results[0] {
            Err(AtlasError::Decode { name, .. }) => assert_eq!(name, "broken.png"),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
