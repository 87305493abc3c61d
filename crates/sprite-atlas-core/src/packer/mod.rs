use crate::model::Rect;

pub mod bins;
pub mod maxrects;

/// A packer places rectangles into a single bin.
///
/// Implementations must ensure no overlaps and never place outside their area.
/// `pack` returns the placed rectangle (post-rotation size) and whether it was rotated,
/// or `None` if the rectangle does not fit the bin anymore.
pub trait Packer {
    fn can_pack(&self, w: u32, h: u32) -> bool;
    fn pack(&mut self, w: u32, h: u32) -> Option<(Rect, bool)>;
}
