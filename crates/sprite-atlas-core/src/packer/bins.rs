use super::Packer;
use super::maxrects::MaxRectsPacker;
use crate::config::{OversizedBehaviour, PackingSettings};
use crate::error::{AtlasError, Result};
use crate::model::{Bin, PackableUnit, Placement, Rect};
use tracing::{debug, warn};

/// Places the units of one tag group into as many bins as needed.
///
/// Every unit reserves a slot of `(w + 2 * extrude + padding) x (h + 2 * extrude + padding)`
/// inside a free area of `(width - 2 * border + padding) x (height - 2 * border + padding)`,
/// so extruded sprites stay `padding` apart and the trailing padding of the last column/row
/// never costs canvas space.
pub struct BinPacker<'a> {
    settings: &'a PackingSettings,
}

enum Slot {
    Open {
        packer: Box<dyn Packer + Send>,
        units: Vec<PackableUnit>,
    },
    Special(Bin),
}

impl<'a> BinPacker<'a> {
    pub fn new(settings: &'a PackingSettings) -> Self {
        Self { settings }
    }

    fn new_packer(&self) -> Box<dyn Packer + Send> {
        let s = self.settings;
        let (uw, uh) = s.usable_dimensions();
        let area = Rect::new(
            s.border_padding,
            s.border_padding,
            uw + s.padding,
            uh + s.padding,
        );
        Box::new(MaxRectsPacker::new(area, s.allow_rotation))
    }

    fn slot_size(&self, unit: &PackableUnit) -> (u32, u32) {
        let grow = self.settings.extrude * 2 + self.settings.padding;
        (unit.width + grow, unit.height + grow)
    }

    /// True when a `w x h` sprite fits an empty bin in neither allowed orientation.
    pub fn is_oversized(&self, w: u32, h: u32) -> bool {
        let (uw, uh) = self.settings.usable_dimensions();
        let e = self.settings.extrude * 2;
        let fits = |w: u32, h: u32| w + e <= uw && h + e <= uh;
        !fits(w, h) && !(self.settings.allow_rotation && fits(h, w))
    }

    /// Packs `units` (all sharing `tag`) and returns the bins in opening order.
    ///
    /// Units are inserted by decreasing area, ties broken by first-seen order. Each unit
    /// tries the open bins of the group in opening order and a new bin is opened when none
    /// has room.
    pub fn pack(&self, tag: Option<String>, mut units: Vec<PackableUnit>) -> Result<Vec<Bin>> {
        if units.is_empty() {
            return Err(AtlasError::Empty { tag });
        }
        units.sort_by(|a, b| b.area().cmp(&a.area()).then_with(|| a.order.cmp(&b.order)));

        let s = self.settings;
        let e = s.extrude;
        let mut slots: Vec<Slot> = Vec::new();
        let mut regular_bins = 0usize;

        'units: for mut unit in units {
            if self.is_oversized(unit.width, unit.height) {
                match s.oversized_behaviour {
                    OversizedBehaviour::Ignore => {
                        warn!(name = unit.name(), w = unit.width, h = unit.height, "ignoring oversized sprite");
                        continue;
                    }
                    OversizedBehaviour::Error => {
                        return Err(AtlasError::Oversized {
                            name: unit.name().to_string(),
                            width: unit.width,
                            height: unit.height,
                            max_width: s.width,
                            max_height: s.height,
                        });
                    }
                    OversizedBehaviour::Special => {
                        warn!(name = unit.name(), w = unit.width, h = unit.height, "oversized sprite gets its own bin");
                        slots.push(Slot::Special(self.special_bin(tag.clone(), unit)));
                        continue;
                    }
                }
            }

            let (sw, sh) = self.slot_size(&unit);
            for slot in slots.iter_mut() {
                if let Slot::Open { packer, units } = slot {
                    if let Some((place, rotated)) = packer.pack(sw, sh) {
                        unit.place(Placement {
                            x: place.x + e,
                            y: place.y + e,
                            rotated,
                            oversized: false,
                        });
                        units.push(unit);
                        continue 'units;
                    }
                }
            }

            if s.max_bins.is_some_and(|max| regular_bins >= max) {
                match s.oversized_behaviour {
                    OversizedBehaviour::Ignore => {
                        warn!(name = unit.name(), bins = regular_bins, "no room left, ignoring sprite");
                    }
                    OversizedBehaviour::Special => {
                        warn!(name = unit.name(), bins = regular_bins, "no room left, sprite gets its own bin");
                        slots.push(Slot::Special(self.special_bin(tag.clone(), unit)));
                    }
                    OversizedBehaviour::Error => {
                        return Err(AtlasError::PackingExhaustion {
                            name: unit.name().to_string(),
                            bins: regular_bins,
                        });
                    }
                }
                continue;
            }

            let mut packer = self.new_packer();
            let Some((place, rotated)) = packer.pack(sw, sh) else {
                return Err(AtlasError::PackingExhaustion {
                    name: unit.name().to_string(),
                    bins: regular_bins,
                });
            };
            regular_bins += 1;
            debug!(tag = ?tag, bin = slots.len(), "opened bin");
            unit.place(Placement {
                x: place.x + e,
                y: place.y + e,
                rotated,
                oversized: false,
            });
            slots.push(Slot::Open {
                packer,
                units: vec![unit],
            });
        }

        Ok(slots
            .into_iter()
            .map(|slot| match slot {
                Slot::Open { units, .. } => {
                    let (width, height) = bin_size(&units, s);
                    Bin {
                        width,
                        height,
                        oversized: false,
                        tag: tag.clone(),
                        units,
                    }
                }
                Slot::Special(bin) => bin,
            })
            .collect())
    }

    fn special_bin(&self, tag: Option<String>, mut unit: PackableUnit) -> Bin {
        let s = self.settings;
        let offset = s.border_padding + s.extrude;
        let width = unit.width + offset * 2;
        let height = unit.height + offset * 2;
        unit.place(Placement {
            x: offset,
            y: offset,
            rotated: false,
            oversized: true,
        });
        Bin {
            width,
            height,
            oversized: true,
            tag,
            units: vec![unit],
        }
    }
}

/// Final dimensions of a regular bin: the tight extent of its placed sprites (extrusion and
/// border included), squared and rounded to a power of two as configured. `fixed_size`
/// always yields the configured dimensions.
pub fn bin_size(units: &[PackableUnit], s: &PackingSettings) -> (u32, u32) {
    if s.fixed_size {
        return (s.width, s.height);
    }
    let tail = s.extrude + s.border_padding;
    let mut w = 0u32;
    let mut h = 0u32;
    for frame in units.iter().filter_map(PackableUnit::frame) {
        w = w.max(frame.x2() + tail);
        h = h.max(frame.y2() + tail);
    }
    if s.square {
        let m = w.max(h);
        w = m;
        h = m;
    }
    if s.power_of_two {
        w = next_pow2(w);
        h = next_pow2(h);
    }
    (w.max(1), h.max(1))
}

pub fn next_pow2(v: u32) -> u32 {
    v.max(1).next_power_of_two()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dedup::make_unit;
    use crate::trim::trim_image;
    use image::{DynamicImage, Rgba, RgbaImage};

    fn unit(name: &str, w: u32, h: u32, s: &PackingSettings, order: usize) -> PackableUnit {
        let img = RgbaImage::from_pixel(w, h, Rgba([order as u8, 0, 0, 255]));
        make_unit(
            trim_image(&DynamicImage::ImageRgba8(img), s),
            name.into(),
            None,
            order,
        )
    }

    fn settings(w: u32, h: u32) -> PackingSettings {
        PackingSettings::builder()
            .with_dimensions(w, h)
            .padding(0)
            .pow2(false)
            .build()
    }

    #[test]
    fn splits_into_bins_when_full() {
        let s = settings(64, 64);
        let units: Vec<_> = (0..5).map(|i| unit(&format!("u{i}"), 32, 32, &s, i)).collect();
        let bins = BinPacker::new(&s).pack(None, units).expect("pack");
        assert_eq!(bins.len(), 2);
        assert_eq!(bins[0].units.len(), 4);
        assert_eq!((bins[0].width, bins[0].height), (64, 64));
        assert_eq!((bins[1].width, bins[1].height), (32, 32));
    }

    #[test]
    fn later_small_units_backfill_earlier_bins() {
        let s = settings(64, 64);
        let units = vec![
            unit("big", 64, 48, &s, 0),
            unit("wide", 64, 20, &s, 1),
            unit("strip", 64, 16, &s, 2),
        ];
        let bins = BinPacker::new(&s).pack(None, units).expect("pack");
        assert_eq!(bins.len(), 2);
        let names: Vec<&str> = bins[0].units.iter().map(|u| u.name()).collect();
        assert_eq!(names, vec!["big", "strip"]);
    }

    #[test]
    fn oversized_policies() {
        let mut s = settings(64, 64);
        s.oversized_behaviour = OversizedBehaviour::Ignore;
        let bins = BinPacker::new(&s)
            .pack(None, vec![unit("huge", 100, 100, &s, 0), unit("ok", 8, 8, &s, 1)])
            .expect("pack");
        assert_eq!(bins.len(), 1);
        assert_eq!(bins[0].units[0].name(), "ok");

        s.oversized_behaviour = OversizedBehaviour::Error;
        let err = BinPacker::new(&s)
            .pack(None, vec![unit("huge", 100, 100, &s, 0)])
            .unwrap_err();
        assert!(matches!(err, AtlasError::Oversized { width: 100, .. }));

        s.oversized_behaviour = OversizedBehaviour::Special;
        let bins = BinPacker::new(&s)
            .pack(None, vec![unit("huge", 100, 100, &s, 0)])
            .expect("pack");
        assert_eq!(bins.len(), 1);
        assert!(bins[0].oversized);
        assert_eq!((bins[0].width, bins[0].height), (100, 100));
        assert!(bins[0].units[0].placement().expect("placed").oversized);
    }

    #[test]
    fn rotation_rescues_tall_sprites() {
        let mut s = settings(64, 16);
        let bins = BinPacker::new(&s)
            .pack(None, vec![unit("tall", 10, 60, &s, 0)])
            .expect("pack");
        let p = bins[0].units[0].placement().expect("placed");
        assert!(p.rotated && !p.oversized);
        assert_eq!((bins[0].width, bins[0].height), (60, 10));

        s.allow_rotation = false;
        s.oversized_behaviour = OversizedBehaviour::Error;
        assert!(BinPacker::new(&s).pack(None, vec![unit("tall", 10, 60, &s, 0)]).is_err());
    }

    #[test]
    fn max_bins_exhaustion() {
        let mut s = settings(32, 32);
        s.max_bins = Some(1);
        s.oversized_behaviour = OversizedBehaviour::Error;
        let units = vec![unit("a", 32, 32, &s, 0), unit("b", 32, 32, &s, 1)];
        let err = BinPacker::new(&s).pack(None, units).unwrap_err();
        assert!(matches!(err, AtlasError::PackingExhaustion { bins: 1, .. }));
    }

    #[test]
    fn max_bins_overflow_goes_to_special_bins() {
        let mut s = settings(16, 16);
        s.max_bins = Some(1);
        s.oversized_behaviour = OversizedBehaviour::Special;
        let units = vec![unit("a", 16, 16, &s, 0), unit("b", 16, 16, &s, 1)];
        let bins = BinPacker::new(&s).pack(None, units).expect("pack");
        assert_eq!(bins.len(), 2);
        assert!(!bins[0].oversized);
        assert_eq!(bins[0].units[0].name(), "a");
        assert!(bins[1].oversized);
        assert_eq!(bins[1].units[0].name(), "b");
        assert_eq!((bins[1].width, bins[1].height), (16, 16));
        assert!(bins[1].units[0].placement().expect("placed").oversized);
    }

    #[test]
    fn sizing_rules() {
        let mut s = settings(256, 256);
        s.power_of_two = true;
        let bins = BinPacker::new(&s)
            .pack(None, vec![unit("a", 40, 20, &s, 0)])
            .expect("pack");
        assert_eq!((bins[0].width, bins[0].height), (64, 32));

        s.square = true;
        let bins = BinPacker::new(&s)
            .pack(None, vec![unit("a", 40, 20, &s, 0)])
            .expect("pack");
        assert_eq!((bins[0].width, bins[0].height), (64, 64));

        s.fixed_size = true;
        let bins = BinPacker::new(&s)
            .pack(None, vec![unit("a", 40, 20, &s, 0)])
            .expect("pack");
        assert_eq!((bins[0].width, bins[0].height), (256, 256));
    }

    #[test]
    fn padding_and_extrude_reserve_space() {
        let mut s = settings(64, 64);
        s.padding = 2;
        s.extrude = 1;
        s.allow_rotation = false;
        let units = vec![unit("a", 20, 20, &s, 0), unit("b", 20, 20, &s, 1)];
        let bins = BinPacker::new(&s).pack(None, units).expect("pack");
        let a = bins[0].units[0].frame().expect("a");
        let b = bins[0].units[1].frame().expect("b");
        assert_eq!((a.x, a.y), (1, 1));
        // a's slot: 0..24 wide, b's content starts after it plus its own extrude
        assert_eq!((b.x, b.y), (25, 1));
        assert_eq!((bins[0].width, bins[0].height), (46, 22));
    }

    #[test]
    fn pow2_helper() {
        assert_eq!(next_pow2(0), 1);
        assert_eq!(next_pow2(1), 1);
        assert_eq!(next_pow2(33), 64);
        assert_eq!(next_pow2(64), 64);
    }
}
