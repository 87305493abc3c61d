use super::Packer;
use crate::model::Rect;

/// Single-bin MaxRects free list with best-area-fit placement.
///
/// Tracks every maximal free rectangle; each placement splits the free rectangles it
/// intersects into their remaining sub-rectangles and prunes the ones contained in another.
pub struct MaxRectsPacker {
    free: Vec<Rect>,
    used: Vec<Rect>,
    allow_rotation: bool,
}

impl MaxRectsPacker {
    /// `area` is the whole placeable region; placed rectangles never leave it.
    pub fn new(area: Rect, allow_rotation: bool) -> Self {
        Self {
            free: vec![area],
            used: Vec::new(),
            allow_rotation,
        }
    }

    fn place_rect(&mut self, node: &Rect) {
        let mut new_free: Vec<Rect> = Vec::new();
        let mut i = 0usize;
        while i < self.free.len() {
            let fr = self.free[i];
            if fr.intersects(node) {
                self.free.swap_remove(i);
                split_free_node(fr, node, &mut new_free);
            } else {
                i += 1;
            }
        }
        self.prune_new_vs_old(&mut new_free);
        prune_within(&mut new_free);
        self.free.extend(new_free);
        self.used.push(*node);
    }

    fn prune_new_vs_old(&mut self, new_free: &mut Vec<Rect>) {
        // new rects fully contained in an existing free rect are redundant
        new_free.retain(|nr| nr.w > 0 && nr.h > 0 && !self.free.iter().any(|of| of.contains(nr)));
        // and existing ones swallowed by a new rect
        self.free
            .retain(|of| !new_free.iter().any(|nr| nr.contains(of)));
    }

    /// Best-area-fit score of placing `w x h` into `fr`: (leftover area, shorter leftover side).
    fn score(fr: &Rect, w: u32, h: u32) -> (i64, i64) {
        let leftover_h = fr.w as i64 - w as i64;
        let leftover_v = fr.h as i64 - h as i64;
        let area_fit = fr.area() as i64 - (w as i64 * h as i64);
        (area_fit, leftover_h.min(leftover_v))
    }

    /// Finds the best free position for a `w x h` rectangle. Returns the placed rectangle
    /// (post-rotation size) and whether it was rotated.
    pub fn find_position(&self, w: u32, h: u32) -> Option<(Rect, bool)> {
        // (area fit, short side fit, top edge, left edge)
        let mut best: Option<((i64, i64, u32, u32), Rect, bool)> = None;
        let mut consider = |fr: &Rect, w: u32, h: u32, rotated: bool| {
            let (s1, s2) = Self::score(fr, w, h);
            let key = (s1, s2, fr.y + h, fr.x);
            if best.as_ref().is_none_or(|(k, _, _)| key < *k) {
                best = Some((key, Rect::new(fr.x, fr.y, w, h), rotated));
            }
        };

        for fr in &self.free {
            if fr.w >= w && fr.h >= h {
                // perfect fit early-out
                if fr.w == w && fr.h == h {
                    return Some((Rect::new(fr.x, fr.y, w, h), false));
                }
                consider(fr, w, h, false);
            }
            if self.allow_rotation && w != h && fr.w >= h && fr.h >= w {
                if fr.w == h && fr.h == w {
                    return Some((Rect::new(fr.x, fr.y, h, w), true));
                }
                consider(fr, h, w, true);
            }
        }

        best.map(|(_, rect, rotated)| (rect, rotated))
    }

    pub fn free_list_len(&self) -> usize {
        self.free.len()
    }

    pub fn used(&self) -> &[Rect] {
        &self.used
    }
}

fn split_free_node(fr: Rect, node: &Rect, out: &mut Vec<Rect>) {
    // Left
    if node.x > fr.x && node.x < fr.x2() {
        out.push(Rect::new(fr.x, fr.y, node.x - fr.x, fr.h));
    }
    // Right
    if node.x2() < fr.x2() {
        out.push(Rect::new(node.x2(), fr.y, fr.x2() - node.x2(), fr.h));
    }
    // Top
    if node.y > fr.y && node.y < fr.y2() {
        out.push(Rect::new(fr.x, fr.y, fr.w, node.y - fr.y));
    }
    // Bottom
    if node.y2() < fr.y2() {
        out.push(Rect::new(fr.x, node.y2(), fr.w, fr.y2() - node.y2()));
    }
}

fn prune_within(v: &mut Vec<Rect>) {
    let mut i = 0;
    while i < v.len() {
        let a = v[i];
        let dominated = v
            .iter()
            .enumerate()
            .any(|(j, b)| j != i && b.contains(&a) && (a != *b || j < i));
        if dominated {
            v.swap_remove(i);
        } else {
            i += 1;
        }
    }
}

impl Packer for MaxRectsPacker {
    fn can_pack(&self, w: u32, h: u32) -> bool {
        self.find_position(w, h).is_some()
    }

    fn pack(&mut self, w: u32, h: u32) -> Option<(Rect, bool)> {
        let (place, rotated) = self.find_position(w, h)?;
        self.place_rect(&place);
        Some((place, rotated))
    }
}
