//! Box against box tests between actors.
//!
//! Actor boxes are closed like the geometry edges in [`super::bounds::CollisionBox`]: two boxes that only
//! share an edge still touch.

use crate::geom::{Point, Rect};

/// Two intersecting boxes, by index into the slice given to [`between_boxes`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BoxCollision {
    pub a: usize,
    pub b: usize,
    /// Shared area, relative to box `a`. Zero sized when the boxes only touch.
    pub overlap: Rect,
}

/// Every intersecting pair `(i, j)` with `i < j`, in order.
pub fn between_boxes(boxes: &[Rect]) -> impl Iterator<Item = BoxCollision> + '_ {
    boxes.iter().enumerate().flat_map(move |(i, a)| {
        boxes[i + 1..]
            .iter()
            .enumerate()
            .filter_map(move |(k, b)| {
                compare_boxes(*a, *b).map(|mut collision| {
                    collision.a = i;
                    collision.b = i + 1 + k;
                    collision
                })
            })
    })
}

/// The collision between two boxes, if they touch. Indices are left at zero.
#[must_use]
pub fn compare_boxes(a: Rect, b: Rect) -> Option<BoxCollision> {
    overlap_relative(a, b).map(|overlap| BoxCollision { a: 0, b: 0, overlap })
}

/// Whether two closed boxes touch.
#[must_use]
pub fn intersects(a: Rect, b: Rect) -> bool {
    overlap(a, b).is_some()
}

/// Shared area of two closed boxes, in the same space as the boxes.
#[must_use]
pub fn overlap(a: Rect, b: Rect) -> Option<Rect> {
    let x1 = a.x.max(b.x);
    let y1 = a.y.max(b.y);
    let x2 = (a.x + a.w).min(b.x + b.w);
    let y2 = (a.y + a.h).min(b.y + b.h);
    (x2 >= x1 && y2 >= y1).then(|| Rect::new(x1, y1, x2 - x1, y2 - y1))
}

/// [`overlap`], relative to `source`'s corner.
#[must_use]
pub fn overlap_relative(source: Rect, other: Rect) -> Option<Rect> {
    let delta = Point::new(-source.x, -source.y);
    overlap(source.translate(delta), other.translate(delta))
}
