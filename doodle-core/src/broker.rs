//! # Actor collision broker
//!
//! After every actor has moved against the level geometry, the broker finds the actors that overlap and
//! lets their scripts react. A script may [`Verdict::Veto`] an overlap, in which case the actor that moved
//! into it is pushed back along its path to the last position the script accepted.

use crate::{
    collision::{
        bounding_rect,
        boxes::{between_boxes, intersects, overlap_relative},
        Body,
    },
    geom::{iter_line, Point, Rect},
};
use std::collections::BTreeMap;

/// A script's answer to an overlap.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Verdict {
    #[default]
    Proceed,
    /// Don't let the other actor in.
    Veto,
}

/// What an actor's script is told when another actor touches it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CollideEvent<'a> {
    /// The actor doing the touching.
    pub other: &'a str,
    /// Shared area, relative to the receiving actor's box.
    pub overlap: Rect,
    /// Whether the overlap reaches the receiving actor's hitbox.
    pub in_hitbox: bool,
    /// Set on the one final call after the other actor has come to rest this tick.
    pub settled: bool,
}

/// The scripting side of the simulation, addressed by actor id.
pub trait ScriptHost {
    fn on_collide(&mut self, actor: &str, event: &CollideEvent<'_>) -> Verdict;
    fn on_leave(&mut self, actor: &str, other: &str);
    fn on_use(&mut self, actor: &str, other: &str);
}

/// An actor as far as the broker cares.
pub trait Participant: Body {
    fn id(&self) -> &str;
    /// Immobile actors never collide with each other.
    fn is_mobile(&self) -> bool;
    /// The "use" key is held this tick.
    fn is_using(&self) -> bool;
    fn move_to(&mut self, p: Point);
}

/// Remembers which actors touched last tick, to tell them when they part.
#[derive(Debug, Default)]
pub struct Broker {
    /// Keyed by the sorted pair of ids. Holds `(receiver, mover)` as of the last tick they touched, since
    /// either one may do the moving from tick to tick.
    colliding: BTreeMap<(String, String), (String, String)>,
}

fn pair_key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_owned(), b.to_owned())
    } else {
        (b.to_owned(), a.to_owned())
    }
}

impl Broker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
    /// Pairs `(a, b)` that touched on the last tick: `b` moved into `a`.
    pub fn colliding(&self) -> impl Iterator<Item = (&str, &str)> {
        self.colliding.values().map(|(a, b)| (a.as_str(), b.as_str()))
    }
    /// Whether two actors touched on the last tick, whichever one moved.
    #[must_use]
    pub fn is_colliding(&self, a: &str, b: &str) -> bool {
        self.colliding.contains_key(&pair_key(a, b))
    }
    pub fn reset(&mut self) {
        self.colliding.clear();
    }

    /// Settle actor overlaps for this tick.
    ///
    /// `before[i]` is where `actors[i]` stood before moving this tick. Returns how many pairs touched.
    pub fn resolve<P: Participant>(
        &mut self,
        actors: &mut [P],
        before: &[Point],
        host: &mut impl ScriptHost,
    ) -> usize {
        let mut boxes: Vec<Rect> = actors.iter().map(|a| bounding_rect(a)).collect();
        let pairs: Vec<_> = between_boxes(&boxes).map(|c| (c.a, c.b)).collect();
        let mut colliding = BTreeMap::new();

        for (i, j) in pairs {
            if !actors[i].is_mobile() && !actors[j].is_mobile() {
                continue;
            }
            // `b` is whoever moved into the other. Earlier pairs may have pushed either one away since.
            // An immobile actor is never `b`.
            let moved = |k: usize| before.get(k).is_some_and(|&p| p != actors[k].position());
            let (a, b) = if !actors[j].is_mobile() || (!moved(j) && moved(i)) {
                (j, i)
            } else {
                (i, j)
            };
            if intersects(boxes[a], boxes[b]) {
                Self::trace(actors, &mut boxes, a, b, before.get(b).copied(), host);
                let (receiver, mover) = (actors[a].id(), actors[b].id());
                colliding.insert(
                    pair_key(receiver, mover),
                    (receiver.to_owned(), mover.to_owned()),
                );
            }
        }

        let touched = colliding.len();
        for (key, (a, b)) in &self.colliding {
            if !colliding.contains_key(key) {
                log::trace!("{b} left {a}");
                host.on_leave(a, b);
            }
        }
        self.colliding = colliding;
        touched
    }

    /// Walk `b` from where it started to where it is, asking `a`'s script about every overlapping step.
    fn trace<P: Participant>(
        actors: &mut [P],
        boxes: &mut [Rect],
        a: usize,
        b: usize,
        from: Option<Point>,
        host: &mut impl ScriptHost,
    ) {
        let target = actors[b].position();
        let size = boxes[b];
        let a_box = boxes[a];
        let a_hitbox = actors[a].hitbox();
        let other = actors[b].id().to_owned();
        let receiver = actors[a].id().to_owned();

        let mut last_good = from.unwrap_or(target);
        let (mut lock_x, mut lock_y) = (false, false);
        for mut point in iter_line(last_good, target) {
            if lock_x {
                point.x = last_good.x;
            }
            if lock_y {
                point.y = last_good.y;
            }
            let test = Rect::new(point.x, point.y, size.w, size.h);
            let Some(overlap) = overlap_relative(a_box, test) else {
                last_good = point;
                continue;
            };
            let event = CollideEvent {
                other: &other,
                overlap,
                in_hitbox: in_hitbox(overlap, a_hitbox, a_box),
                settled: false,
            };
            if host.on_collide(&receiver, &event) == Verdict::Proceed {
                last_good = point;
                continue;
            }

            // Landing on top of `a`: stand on it.
            if (test.y + test.h - a_box.y) <= 1 {
                actors[b].set_grounded(true);
                lock_y = true;
            } else if point.x != last_good.x {
                lock_x = true;
            } else {
                lock_y = true;
            }
            log::trace!("{receiver} vetoed {other} at {point}, held at {last_good}");
        }

        actors[b].move_to(last_good);
        boxes[b] = Rect::new(last_good.x, last_good.y, size.w, size.h);

        let overlap = overlap_relative(a_box, boxes[b]).unwrap_or_default();
        let event = CollideEvent {
            other: &other,
            overlap,
            in_hitbox: in_hitbox(overlap, a_hitbox, a_box),
            settled: true,
        };
        // The settled call can't undo anything, so its verdict doesn't matter.
        let _ = host.on_collide(&receiver, &event);
        if actors[b].is_using() {
            host.on_use(&receiver, &other);
        }
    }
}

fn in_hitbox(overlap: Rect, hitbox: Rect, sprite: Rect) -> bool {
    let hitbox = if hitbox.is_zero() {
        Rect::sized(sprite.w, sprite.h)
    } else {
        hitbox
    };
    intersects(overlap, hitbox)
}
