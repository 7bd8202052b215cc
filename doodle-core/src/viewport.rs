//! The visible window onto a level, and keeping things inside the page.

use crate::{
    collision::Body,
    geom::{Point, Rect},
    page::PageType,
};

/// Part of the world shown on screen, in world coordinates.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Viewport {
    /// World point at the top left of the screen.
    pub scroll: Point,
    pub width: i32,
    pub height: i32,
    /// Debug switch: scroll anywhere regardless of page type.
    pub no_limit: bool,
}

impl Viewport {
    #[must_use]
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }
    #[must_use]
    pub fn rect(&self) -> Rect {
        Rect::new(self.scroll.x, self.scroll.y, self.width, self.height)
    }
    /// [`Viewport::rect`] grown by `margin` on every side: the chunks worth keeping warm.
    #[must_use]
    pub fn loading_rect(&self, margin: i32) -> Rect {
        self.rect().inflate(margin)
    }
    pub fn scroll_by(&mut self, delta: Point) {
        self.scroll += delta;
    }

    /// Keep the view inside the page. `max` is the page size, used by bounded page types. Returns whether
    /// the scroll position had to change.
    pub fn clamp(&mut self, page: PageType, max: (i32, i32)) -> bool {
        if self.no_limit {
            return false;
        }
        let before = self.scroll;
        if page.is_bounded() {
            let (max_w, max_h) = max;
            if max_w > 0 && self.scroll.x + self.width > max_w {
                self.scroll.x = max_w - self.width;
            }
            if max_h > 0 && self.scroll.y + self.height > max_h {
                self.scroll.y = max_h - self.height;
            }
        }
        // The top left edge wins when the page is smaller than the screen.
        if page.has_origin() {
            self.scroll.x = self.scroll.x.max(0);
            self.scroll.y = self.scroll.y.max(0);
        }
        self.scroll != before
    }

    /// Scroll to keep an actor inside the scroll box, a margin of `scrollbox` in from the middle of the
    /// screen. Each axis moves at most `max_scroll` per call. Returns the scroll applied.
    pub fn follow(&mut self, actor: Rect, scrollbox: Point, max_scroll: i32) -> Point {
        let horizontal = self.width / 2 - scrollbox.x;
        let vertical = self.height / 2 - scrollbox.y;
        let mut delta = Point::ORIGIN;

        if actor.x <= self.scroll.x + horizontal {
            delta.x = actor.x - (self.scroll.x + horizontal);
        }
        if actor.x >= self.scroll.x + self.width - actor.w - horizontal {
            delta.x = actor.x - (self.scroll.x + self.width - actor.w - horizontal);
        }
        if actor.y <= self.scroll.y + vertical {
            delta.y = actor.y - (self.scroll.y + vertical);
        }
        if actor.y >= self.scroll.y + self.height - actor.h - vertical {
            delta.y = actor.y - (self.scroll.y + self.height - actor.h - vertical);
        }

        let delta = Point::new(
            delta.x.clamp(-max_scroll, max_scroll),
            delta.y.clamp(-max_scroll, max_scroll),
        );
        self.scroll_by(delta);
        delta
    }
}

/// Push a body back inside the page. Landing on the floor of a bounded page counts as standing on
/// ground. Returns whether it moved.
pub fn contain_actor<B: Body + ?Sized>(
    page: PageType,
    max: (i32, i32),
    body: &mut B,
    move_to: impl FnOnce(&mut B, Point),
) -> bool {
    if !page.has_origin() {
        return false;
    }
    let p = body.position();
    let size = body.size();
    let mut fixed = Point::new(p.x.max(0), p.y.max(0));
    if page.is_bounded() {
        let (max_w, max_h) = max;
        if max_w > 0 && p.x + size.w > max_w {
            fixed.x = max_w - size.w;
        }
        if max_h > 0 && p.y + size.h > max_h {
            fixed.y = max_h - size.h;
            body.set_grounded(true);
        }
    }
    if fixed == p {
        return false;
    }
    move_to(body, fixed);
    true
}
