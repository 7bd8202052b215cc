//! Actor bodies and their bounding boxes.

use crate::geom::{Point, Rect};

/// Anything that moves through a level and collides with it.
pub trait Body {
    /// World position of the top left corner of the sprite.
    fn position(&self) -> Point;
    /// Sprite size. Only `w` and `h` are used.
    fn size(&self) -> Rect;
    /// Collision box relative to the sprite. Zero means the whole sprite.
    fn hitbox(&self) -> Rect {
        Rect::default()
    }
    fn grounded(&self) -> bool;
    fn set_grounded(&mut self, grounded: bool);
}

/// The sprite rect in world space.
#[must_use]
pub fn bounding_rect(body: &(impl Body + ?Sized)) -> Rect {
    let p = body.position();
    let size = body.size();
    Rect::new(p.x, p.y, size.w, size.h)
}
/// The collision box in world space: the hitbox moved to the body's position, or the sprite rect without one.
#[must_use]
pub fn bounding_rect_hitbox(body: &(impl Body + ?Sized), hitbox: Rect) -> Rect {
    let rect = bounding_rect(body);
    if hitbox.is_zero() {
        rect
    } else {
        Rect::new(rect.x + hitbox.x, rect.y + hitbox.y, hitbox.w, hitbox.h)
    }
}
/// Sprite rect shrunk to the hitbox's size.
#[must_use]
pub fn size_plus_hitbox(size: Rect, hitbox: Rect) -> Rect {
    if hitbox.is_zero() {
        return size;
    }
    Rect::new(size.x + hitbox.x, size.y + hitbox.y, hitbox.w, hitbox.h)
}

/// A body seen through its hitbox: positioned at the hitbox corner, with a hitbox starting at `0,0`.
///
/// Geometry collision works on this, then moves results back by [`ActorOffset::offset`].
pub struct ActorOffset<'a, B: Body + ?Sized> {
    body: &'a mut B,
    offset: Point,
}
impl<'a, B: Body + ?Sized> ActorOffset<'a, B> {
    pub fn new(body: &'a mut B) -> Self {
        let hitbox = body.hitbox();
        Self {
            body,
            offset: Point::new(hitbox.x, hitbox.y),
        }
    }
    #[must_use]
    pub fn offset(&self) -> Point {
        self.offset
    }
}
impl<B: Body + ?Sized> Body for ActorOffset<'_, B> {
    fn position(&self) -> Point {
        self.body.position() + self.offset
    }
    fn size(&self) -> Rect {
        self.body.size()
    }
    fn hitbox(&self) -> Rect {
        let hitbox = self.body.hitbox();
        Rect::new(0, 0, hitbox.w, hitbox.h)
    }
    fn grounded(&self) -> bool {
        self.body.grounded()
    }
    fn set_grounded(&mut self, grounded: bool) {
        self.body.set_grounded(grounded);
    }
}

/// The four edges of a box, each as a pair of end points.
///
/// Boxes here are closed: the right and bottom edges sit on `x + w` and `y + h`. The left and right edges
/// stop a pixel short of the corners, which belong to the top and bottom edges.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CollisionBox {
    pub top: [Point; 2],
    pub bottom: [Point; 2],
    pub left: [Point; 2],
    pub right: [Point; 2],
}
impl CollisionBox {
    #[must_use]
    pub fn new(rect: Rect) -> Self {
        let Rect { x, y, w, h } = rect;
        Self {
            top: [Point::new(x, y), Point::new(x + w, y)],
            bottom: [Point::new(x, y + h), Point::new(x + w, y + h)],
            left: [Point::new(x, y + h - 1), Point::new(x, y + 1)],
            right: [Point::new(x + w, y + h - 1), Point::new(x + w, y + 1)],
        }
    }
    #[must_use]
    pub fn top_left(&self) -> Point {
        self.top[0]
    }
    #[must_use]
    pub fn bottom_right(&self) -> Point {
        self.bottom[1]
    }
}

/// A plain [`Body`] for tests and simple callers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SimpleBody {
    pub position: Point,
    pub size: Rect,
    pub hitbox: Rect,
    pub grounded: bool,
}
impl SimpleBody {
    #[must_use]
    pub fn new(position: Point, w: i32, h: i32) -> Self {
        Self {
            position,
            size: Rect::sized(w, h),
            ..Self::default()
        }
    }
}
impl Body for SimpleBody {
    fn position(&self) -> Point {
        self.position
    }
    fn size(&self) -> Rect {
        self.size
    }
    fn hitbox(&self) -> Rect {
        self.hitbox
    }
    fn grounded(&self) -> bool {
        self.grounded
    }
    fn set_grounded(&mut self, grounded: bool) {
        self.grounded = grounded;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn hitbox_offsets() {
        let mut body = SimpleBody::new(Point::new(100, 200), 64, 32);
        assert_eq!(bounding_rect(&body), Rect::new(100, 200, 64, 32));
        assert_eq!(bounding_rect_hitbox(&body, body.hitbox), Rect::new(100, 200, 64, 32));

        body.hitbox = Rect::new(16, 8, 32, 24);
        assert_eq!(bounding_rect_hitbox(&body, body.hitbox), Rect::new(116, 208, 32, 24));
        assert_eq!(
            size_plus_hitbox(bounding_rect(&body), body.hitbox),
            Rect::new(116, 208, 32, 24)
        );

        let mut offset = ActorOffset::new(&mut body);
        assert_eq!(offset.offset(), Point::new(16, 8));
        assert_eq!(offset.position(), Point::new(116, 208));
        assert_eq!(offset.hitbox(), Rect::new(0, 0, 32, 24));
        offset.set_grounded(true);
        assert!(body.grounded);
    }
    #[test]
    fn edges() {
        let edges = CollisionBox::new(Rect::new(10, 20, 30, 40));
        assert_eq!(edges.top, [Point::new(10, 20), Point::new(40, 20)]);
        assert_eq!(edges.bottom, [Point::new(10, 60), Point::new(40, 60)]);
        assert_eq!(edges.left, [Point::new(10, 59), Point::new(10, 21)]);
        assert_eq!(edges.right, [Point::new(40, 59), Point::new(40, 21)]);
        assert_eq!(edges.bottom_right(), Point::new(40, 60));
    }
}
