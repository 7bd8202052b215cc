//! # Collision
//!
//! Moving actors through level geometry ([`Geometry`]) and testing actors against each other ([`boxes`]).
//!
//! Geometry collision sweeps the actor's box along the integer line from where it is to where it wants
//! to be, looking only at the four edges of the box. It keeps the furthest point along that line that
//! didn't push through a floor, ceiling or wall. Short ledges along the way are stepped up onto.

mod bounds;
pub mod boxes;

pub use bounds::{
    bounding_rect, bounding_rect_hitbox, size_plus_hitbox, ActorOffset, Body, CollisionBox, SimpleBody,
};

use crate::{
    chunker::Chunker,
    geom::{iter_line, Point, Rect},
    palette::{Palette, PaletteIndex},
};

bitflags::bitflags! {
    #[derive(Copy, Clone, Default, PartialEq, Eq, Hash, Debug)]
    pub struct Sides: u8 {
        const TOP    = 0b0001;
        const BOTTOM = 0b0010;
        const LEFT   = 0b0100;
        const RIGHT  = 0b1000;
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, strum::Display)]
pub enum Side {
    Top,
    Bottom,
    Left,
    Right,
}
impl Side {
    pub const ALL: [Self; 4] = [Self::Top, Self::Bottom, Self::Left, Self::Right];
    #[must_use]
    pub fn flag(self) -> Sides {
        match self {
            Self::Top => Sides::TOP,
            Self::Bottom => Sides::BOTTOM,
            Self::Left => Sides::LEFT,
            Self::Right => Sides::RIGHT,
        }
    }
}

/// Where a side of the box last touched geometry.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Contact {
    pub point: Point,
    pub swatch: PaletteIndex,
    pub semisolid: bool,
}

/// How a move went.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Collide {
    pub sides: Sides,
    contacts: [Option<Contact>; 4],
    /// Furthest legal position towards the target.
    pub move_to: Point,
    /// Name of the fire swatch the actor is touching, if any.
    pub in_fire: Option<String>,
    pub in_water: bool,
    pub is_slippery: bool,
}

impl Collide {
    #[must_use]
    pub fn new(move_to: Point) -> Self {
        Self {
            sides: Sides::empty(),
            contacts: [None; 4],
            move_to,
            in_fire: None,
            in_water: false,
            is_slippery: false,
        }
    }
    /// The last contact seen on a side. Contacts outlive [`Collide::reset`].
    #[must_use]
    pub fn contact(&self, side: Side) -> Option<&Contact> {
        self.contacts[side as usize].as_ref()
    }
    #[must_use]
    pub fn touches(&self, side: Side) -> bool {
        self.sides.contains(side.flag())
    }
    fn semisolid(&self, side: Side) -> bool {
        self.contact(side).is_some_and(|c| c.semisolid)
    }
    /// Touching a wall only counts when the wall isn't semisolid.
    #[must_use]
    pub fn is_colliding(&self) -> bool {
        self.touches(Side::Top)
            || self.touches(Side::Bottom)
            || (self.touches(Side::Left) && !self.semisolid(Side::Left))
            || (self.touches(Side::Right) && !self.semisolid(Side::Right))
            || self.in_fire.is_some()
            || self.in_water
    }
    /// Clear the side flags and water, keeping contacts, fire and slipperiness.
    pub fn reset(&mut self) {
        self.sides = Sides::empty();
        self.in_water = false;
    }
    fn hit(&mut self, side: Side, contact: Contact) {
        self.sides |= side.flag();
        self.contacts[side as usize] = Some(contact);
    }
    fn contact_point(&self, side: Side) -> Point {
        self.contact(side).map_or(Point::ORIGIN, |c| c.point)
    }
}

/// Level geometry for actors to collide with: one layer of pixels and the palette that gives them meaning.
pub struct Geometry<'a> {
    chunker: &'a Chunker,
    palette: &'a Palette,
    slope_max_height: i32,
}

impl<'a> Geometry<'a> {
    pub const DEFAULT_SLOPE_MAX_HEIGHT: i32 = 8;

    #[must_use]
    pub fn new(chunker: &'a Chunker, palette: &'a Palette) -> Self {
        Self {
            chunker,
            palette,
            slope_max_height: Self::DEFAULT_SLOPE_MAX_HEIGHT,
        }
    }
    /// Tallest ledge an actor walks up onto instead of being stopped by.
    #[must_use]
    pub fn with_slope_max_height(mut self, height: i32) -> Self {
        self.slope_max_height = height;
        self
    }

    /// Move a body towards `target`, both in sprite coordinates, honoring its hitbox.
    ///
    /// Updates the body's grounded flag. The body's position is left alone: callers move it to
    /// [`Collide::move_to`].
    pub fn collides_with_grid<B: Body + ?Sized>(&self, body: &mut B, target: Point) -> Collide {
        let mut actor = ActorOffset::new(body);
        let offset = actor.offset();
        let mut result = self.box_collides(&mut actor, target + offset);
        result.move_to -= offset;
        result
    }

    /// [`Geometry::collides_with_grid`] for a body whose hitbox starts at its position.
    pub fn box_collides<B: Body + ?Sized>(&self, body: &mut B, mut target: Point) -> Collide {
        let mut p = body.position();
        let size = size_plus_hitbox(bounding_rect(&*body), body.hitbox());
        let actor_height = p.y + size.h;
        let mut result = Collide::new(p);

        let mut ceiling = false;
        let mut cap_height = 0;
        let mut cap_left = 0;
        let mut cap_right = 0;
        let mut cap_floor = 0;
        let mut hit_left = false;
        let mut hit_right = false;
        let mut hit_floor = false;

        // Already stuck in something: wiggle a pixel away from it.
        if self.scan_bounding_box(&mut result, bounding_rect_hitbox(&*body, body.hitbox())) {
            body.set_grounded(result.touches(Side::Bottom));
            if result.touches(Side::Top) {
                ceiling = true;
                p.y += 1;
            }
            if result.touches(Side::Left) && !result.semisolid(Side::Left) {
                p.x += 1;
            }
            if result.touches(Side::Right) && !result.semisolid(Side::Right) {
                p.x -= 1;
            }
        }

        if body.grounded() {
            if !result.touches(Side::Bottom) || target.y < p.y {
                // Walked off a ledge, or jumping.
                body.set_grounded(false);
            } else {
                target.y = p.y;
            }
        }

        let left = result.touches(Side::Left);
        let right = result.touches(Side::Right);
        if (left && target.x < p.x) || (right && target.x > p.x) {
            let slope = if left {
                result.contact_point(Side::Left).y
            } else {
                result.contact_point(Side::Right).y
            };
            if let Some(step) = self.can_step_up(actor_height, slope, target.x > p.x) {
                target += step;
            } else if !(left && result.semisolid(Side::Left)) && !(right && result.semisolid(Side::Right)) {
                target.x = p.x;
            }
        }

        if ceiling {
            cap_height = p.y;
        }

        result.reset();
        result.move_to = p;
        for mut point in iter_line(p, target) {
            // Caps found earlier on the line hold for the rest of it.
            if cap_height != 0 && point.y < cap_height {
                point.y = cap_height;
            }
            if cap_left != 0 && point.x < cap_left {
                point.x = cap_left;
            }
            if cap_right != 0 && point.x > cap_right {
                point.x = cap_right;
            }

            if self.scan_bounding_box(&mut result, Rect::new(point.x, point.y, size.w, size.h)) {
                if result.touches(Side::Bottom) {
                    if !hit_floor {
                        hit_floor = true;
                        cap_floor = result.contact_point(Side::Bottom).y - size.h;
                    }
                    body.set_grounded(true);
                }
                if result.touches(Side::Top) && !ceiling {
                    ceiling = true;
                    cap_height = result.contact_point(Side::Top).y + 1;
                }
                if result.touches(Side::Left) && !hit_left && !result.semisolid(Side::Left) {
                    let wall = result.contact_point(Side::Left);
                    if self.can_step_up(actor_height, wall.y, false).is_none() {
                        hit_left = true;
                        cap_left = wall.x;
                    }
                }
                if result.touches(Side::Right) && !hit_right && !result.semisolid(Side::Right) {
                    let wall = result.contact_point(Side::Right);
                    if self.can_step_up(actor_height, wall.y, false).is_none() {
                        hit_right = true;
                        cap_right = wall.x - size.w;
                    }
                }
            }
            result.move_to = point;
        }

        if ceiling && result.move_to.y < cap_height {
            result.sides |= Sides::TOP;
            result.move_to.y = cap_height;
        }
        if hit_floor && result.move_to.y > cap_floor {
            result.sides |= Sides::BOTTOM;
            result.move_to.y = cap_floor;
        }
        if hit_left && !result.semisolid(Side::Left) {
            result.sides |= Sides::LEFT;
            result.move_to.x = cap_left;
        }
        if hit_right && !result.semisolid(Side::Right) {
            result.sides |= Sides::RIGHT;
            result.move_to.x = cap_right;
        }
        result
    }

    /// Offset that steps an actor whose feet are at `actor_height` up onto a ledge whose top is at
    /// `slope_height`, or `None` if the ledge is too tall.
    #[must_use]
    pub fn can_step_up(&self, actor_height: i32, slope_height: i32, moving_right: bool) -> Option<Point> {
        let height = actor_height - slope_height;
        (height <= self.slope_max_height).then(|| Point::new(if moving_right { 1 } else { -1 }, -height))
    }

    /// Scan the edges of a box for geometry, accumulating into `result`. Returns whether the result is
    /// now colliding.
    pub fn scan_bounding_box(&self, result: &mut Collide, rect: Rect) -> bool {
        let edges = CollisionBox::new(rect);
        self.scan_grid_line(result, edges.top, Side::Top);
        self.scan_grid_line(result, edges.bottom, Side::Bottom);
        self.scan_grid_line(result, edges.left, Side::Left);
        self.scan_grid_line(result, edges.right, Side::Right);
        result.is_colliding()
    }

    /// Scan one edge. The last solid pixel along the edge becomes that side's contact.
    pub fn scan_grid_line(&self, result: &mut Collide, [mut from, mut to]: [Point; 2], side: Side) {
        // Corners belong to the left and right edges.
        if matches!(side, Side::Top | Side::Bottom) {
            from.x += 1;
            to.x -= 1;
        }
        for point in iter_line(from, to) {
            let Some(index) = self.chunker.get(point) else {
                continue;
            };
            let swatch = match self.palette.at(index) {
                Ok(swatch) => swatch,
                Err(e) => {
                    log::trace!("collision at {point}: {e}");
                    continue;
                }
            };
            if swatch.fire {
                result.in_fire = Some(swatch.name.clone());
            }
            if swatch.water {
                result.in_water = true;
            }
            if side == Side::Bottom && swatch.slippery {
                result.is_slippery = true;
            }
            if !swatch.solid && !swatch.semisolid {
                continue;
            }
            // Platforms can be jumped through from below.
            if swatch.semisolid && side == Side::Top {
                continue;
            }
            result.hit(
                side,
                Contact {
                    point,
                    swatch: index,
                    semisolid: swatch.semisolid,
                },
            );
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::palette::Swatch;

    /// A floor along `y = 500` for `x` in `0..1000`, and a 20px wall standing on it at `x = 500`.
    fn level() -> (Chunker, Palette) {
        let palette = Palette::default_palette();
        let solid = palette.get("solid").unwrap().index();
        let mut chunker = Chunker::new(128);
        chunker.set_rect(Rect::new(0, 500, 1000, 1), solid);
        chunker.set_rect(Rect::new(500, 480, 1, 20), solid);
        (chunker, palette)
    }
    /// No solid pixel inside the box, edges excluded.
    fn interior_clear(geometry: &Geometry, at: Point, w: i32, h: i32) -> bool {
        Rect::new(at.x + 1, at.y + 1, w - 1, h - 1).points().all(|p| {
            geometry
                .chunker
                .get(p)
                .and_then(|i| geometry.palette.at(i).ok())
                .map_or(true, |s| !s.solid)
        })
    }

    #[test]
    fn stops_at_wall() {
        let (chunker, palette) = level();
        let geometry = Geometry::new(&chunker, &palette);
        let mut body = SimpleBody::new(Point::new(458, 468), 32, 32);

        let result = geometry.collides_with_grid(&mut body, Point::new(510, 468));
        assert_eq!(result.move_to, Point::new(468, 468));
        assert_eq!(result.sides, Sides::RIGHT | Sides::BOTTOM);
        assert_eq!(result.contact(Side::Right).unwrap().point, Point::new(500, 480));
        assert!(result.is_colliding());
        assert!(body.grounded);
        assert!(interior_clear(&geometry, result.move_to, 32, 32));
    }
    #[test]
    fn ceiling() {
        let (chunker, palette) = level();
        let geometry = Geometry::new(&chunker, &palette);
        let mut body = SimpleBody::new(Point::new(458, 550), 32, 32);

        let result = geometry.collides_with_grid(&mut body, Point::new(458, 467));
        assert_eq!(result.move_to, Point::new(458, 501));
        assert!(result.touches(Side::Top));
        assert!(!body.grounded);
        assert!(interior_clear(&geometry, result.move_to, 32, 32));
    }
    #[test]
    fn lands_on_floor() {
        let (chunker, palette) = level();
        let geometry = Geometry::new(&chunker, &palette);
        let mut body = SimpleBody::new(Point::new(100, 400), 32, 32);

        let result = geometry.collides_with_grid(&mut body, Point::new(100, 480));
        assert_eq!(result.move_to, Point::new(100, 468));
        assert!(result.touches(Side::Bottom));
        assert!(body.grounded);

        // Standing still: gravity can't pull through.
        body.position = result.move_to;
        let result = geometry.collides_with_grid(&mut body, Point::new(100, 475));
        assert_eq!(result.move_to, Point::new(100, 468));
        assert!(body.grounded);
    }
    #[test]
    fn never_ends_inside_solid() {
        let (chunker, palette) = level();
        // (start, velocity, slope max, expected stop)
        let mut cases = Vec::new();
        for vy in [1, 10, 31, 32, 33, 68, 80, 200] {
            cases.push((Point::new(100, 400), Point::new(0, vy), 8, Point::new(100, (400 + vy).min(468))));
        }
        for vy in [-10, -49, -50, -83, -200] {
            cases.push((Point::new(458, 550), Point::new(0, vy), 8, Point::new(458, (550 + vy).max(501))));
        }
        // The wall is 20px tall, so no threshold below that lets an actor step over it.
        for slope in [0, 2, 8, 12, 19] {
            for vx in [1, 5, 10, 20, 52, 120] {
                cases.push((Point::new(458, 468), Point::new(vx, 0), slope, Point::new((458 + vx).min(468), 468)));
                cases.push((Point::new(510, 468), Point::new(-vx, 0), slope, Point::new((510 - vx).max(500), 468)));
            }
        }

        for (start, velocity, slope, expected) in cases {
            let geometry = Geometry::new(&chunker, &palette).with_slope_max_height(slope);
            let mut body = SimpleBody::new(start, 32, 32);
            let result = geometry.collides_with_grid(&mut body, start + velocity);
            assert_eq!(result.move_to, expected, "from {start} by {velocity}, slope {slope}");
            assert!(
                interior_clear(&geometry, result.move_to, 32, 32),
                "from {start} by {velocity}, slope {slope}: stopped inside geometry at {}",
                result.move_to
            );
        }
    }
    #[test]
    fn walks_off_ledge() {
        let (chunker, palette) = level();
        let geometry = Geometry::new(&chunker, &palette);
        let mut body = SimpleBody::new(Point::new(1000, 468), 32, 32);
        body.grounded = true;

        let result = geometry.collides_with_grid(&mut body, Point::new(1000, 478));
        assert_eq!(result.move_to, Point::new(1000, 478));
        assert!(!result.is_colliding());
        assert!(!body.grounded);
    }
    #[test]
    fn steps_up_short_ledge() {
        let (mut chunker, palette) = level();
        let solid = palette.get("solid").unwrap().index();
        chunker.set_rect(Rect::new(520, 496, 80, 4), solid);
        chunker.delete_rect(Rect::new(500, 480, 1, 20));
        let geometry = Geometry::new(&chunker, &palette);
        let mut body = SimpleBody::new(Point::new(470, 468), 32, 32);
        body.grounded = true;

        // First tick walks into the ledge, the next one climbs it.
        let result = geometry.collides_with_grid(&mut body, Point::new(500, 468));
        assert_eq!(result.move_to, Point::new(500, 468));
        body.position = result.move_to;
        let result = geometry.collides_with_grid(&mut body, Point::new(510, 468));
        assert_eq!(result.move_to, Point::new(511, 464));
        assert!(body.grounded);

        // Too tall to step up with a lower threshold.
        let strict = Geometry::new(&chunker, &palette).with_slope_max_height(2);
        let mut body = SimpleBody::new(Point::new(470, 468), 32, 32);
        body.grounded = true;
        let result = strict.collides_with_grid(&mut body, Point::new(500, 468));
        assert_eq!(result.move_to, Point::new(488, 468));
        assert!(result.touches(Side::Right));
    }
    #[test]
    fn hitbox_offset() {
        let (chunker, palette) = level();
        let geometry = Geometry::new(&chunker, &palette);
        // 64x64 sprite whose 32x32 hitbox sits at the bottom middle.
        let mut body = SimpleBody::new(Point::new(442, 400), 64, 64);
        body.hitbox = Rect::new(16, 32, 32, 32);

        let result = geometry.collides_with_grid(&mut body, Point::new(442, 480));
        assert_eq!(result.move_to, Point::new(442, 436));
        assert!(body.grounded);
    }
    #[test]
    fn attributes() {
        let mut palette = Palette::default_palette();
        let ice = palette
            .add(Swatch::new("ice", crate::Color::WHITE).solid())
            .unwrap();
        palette.get_mut("ice").unwrap().slippery = true;
        let fire = palette.get("fire").unwrap().index();
        let platform = palette
            .add(Swatch::new("platform", crate::Color::BLACK).semisolid())
            .unwrap();
        let mut chunker = Chunker::new(64);
        chunker.set_rect(Rect::new(0, 100, 100, 1), ice);
        chunker.set(Point::new(0, 90), fire);
        chunker.set_rect(Rect::new(200, 50, 100, 1), platform);
        let geometry = Geometry::new(&chunker, &palette);

        let mut body = SimpleBody::new(Point::new(0, 68), 32, 32);
        let result = geometry.collides_with_grid(&mut body, Point::new(0, 70));
        assert!(result.is_slippery);
        assert_eq!(result.in_fire.as_deref(), Some("fire"));

        // Jumping up through a platform, then landing on it.
        let mut body = SimpleBody::new(Point::new(220, 60), 32, 32);
        let result = geometry.collides_with_grid(&mut body, Point::new(220, 10));
        assert_eq!(result.move_to, Point::new(220, 10));
        body.position = result.move_to;
        let result = geometry.collides_with_grid(&mut body, Point::new(220, 30));
        assert_eq!(result.move_to, Point::new(220, 18));
        assert!(body.grounded);
    }
}
