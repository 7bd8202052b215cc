//! # Play mode
//!
//! A [`Simulation`] runs a level one tick at a time: scripts and their timers, then every actor against
//! the level geometry, then actors against each other. Nothing here is threaded. Scripts may react to
//! each other within a tick, so the order below is part of the behavior:
//!
//! 1. Actors destroyed during the last tick are removed.
//! 2. Script timers fire and waiting messages are delivered.
//! 3. Mobile actors move against the geometry, in the order the level lists them.
//! 4. Actors on bounded pages are kept inside the page.
//! 5. The [`Broker`] settles overlaps between actors and sends leave events.

use crate::{
    actor::Actor,
    archive::files,
    broker::{Broker, Participant},
    collision::{Body, Collide, Geometry, Side},
    doodad::{self, Doodad},
    drawing::Drawing,
    geom::{Point, Rect},
    level::Level,
    script::Supervisor,
    settings::Settings,
    viewport::{self, Viewport},
};
use std::collections::BTreeSet;

/// Pixels per tick added to a falling actor's downward speed.
pub const GRAVITY: i32 = 6;

/// An actor taking part in play.
#[derive(Clone, Debug)]
pub struct LiveActor {
    id: String,
    pub filename: String,
    position: Point,
    size: Rect,
    hitbox: Rect,
    /// Pixels moved per tick, set by the actor's script or the player.
    pub velocity: Point,
    pub mobile: bool,
    pub gravity: bool,
    /// The "use" key is held this tick.
    pub using: bool,
    /// Removed at the start of the next tick.
    pub destroyed: bool,
    grounded: bool,
    last_collide: Option<Collide>,
}

impl LiveActor {
    /// An immobile actor with a `size` square sprite and no hitbox.
    #[must_use]
    pub fn new(id: impl Into<String>, position: Point, size: i32) -> Self {
        Self {
            id: id.into(),
            filename: String::new(),
            position,
            size: Rect::sized(size, size),
            hitbox: Rect::default(),
            velocity: Point::ORIGIN,
            mobile: false,
            gravity: false,
            using: false,
            destroyed: false,
            grounded: false,
            last_collide: None,
        }
    }
    /// An actor sized after its doodad, or [`doodad::DEFAULT_SIZE`] without one.
    #[must_use]
    pub fn from_actor(actor: &Actor, doodad: Option<&Doodad>) -> Self {
        let size = doodad.map_or(doodad::DEFAULT_SIZE, Doodad::size);
        let mut live = Self::new(actor.id(), actor.point, size);
        live.filename.clone_from(&actor.filename);
        if let Some(doodad) = doodad {
            // A hitbox covering the whole sprite is the same as none.
            if doodad.hitbox != doodad.rect() {
                live.hitbox = doodad.hitbox;
            }
        }
        live
    }
    #[must_use]
    pub fn with_hitbox(mut self, hitbox: Rect) -> Self {
        self.hitbox = hitbox;
        self
    }
    /// Mobile and falling.
    #[must_use]
    pub fn with_physics(mut self) -> Self {
        self.mobile = true;
        self.gravity = true;
        self
    }
    pub fn set_position(&mut self, p: Point) {
        self.position = p;
    }
    /// How the last geometry check went, for mobile actors.
    #[must_use]
    pub fn last_collide(&self) -> Option<&Collide> {
        self.last_collide.as_ref()
    }
    fn target(&mut self) -> Point {
        if self.gravity && !self.grounded {
            self.velocity.y += GRAVITY;
        } else if self.gravity && self.velocity.y > 0 {
            self.velocity.y = 0;
        }
        let mut target = self.position + self.velocity;
        if self.gravity && self.grounded {
            // Keep pressing into the floor so walking off a ledge is noticed.
            target.y += GRAVITY;
        }
        target
    }
}

impl Body for LiveActor {
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

impl Participant for LiveActor {
    fn id(&self) -> &str {
        &self.id
    }
    fn is_mobile(&self) -> bool {
        self.mobile
    }
    fn is_using(&self) -> bool {
        self.using
    }
    fn move_to(&mut self, p: Point) {
        self.position = p;
    }
}

/// What one tick did.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    pub tick: u64,
    /// Actors removed at the start of the tick.
    pub removed: usize,
    /// Mobile actors whose position changed.
    pub moved: usize,
    /// Actor pairs touching at the end of the tick.
    pub touching: usize,
}

/// A level in play.
pub struct Simulation {
    pub level: Level,
    actors: Vec<LiveActor>,
    pub supervisor: Supervisor,
    broker: Broker,
    pub viewport: Viewport,
    /// Actor the camera keeps in view.
    pub follow: Option<String>,
    settings: Settings,
    tick: u64,
}

impl Simulation {
    /// Set up play for a level: a live actor and a script `Vm` for each of its actors, with links
    /// wired up for publishing. Doodads embedded in the level give actors their size and hitbox.
    #[must_use]
    pub fn new(mut level: Level, settings: Settings) -> Self {
        level.chunker.set_policy(crate::chunker::CachePolicy::from(&settings));
        let mut supervisor = Supervisor::new(settings.target_fps);
        supervisor.install(&level.actors);

        let actors = level
            .actors
            .iter()
            .map(|actor| {
                let doodad = level
                    .files
                    .get(&files::doodad_key(&actor.filename))
                    .ok()
                    .and_then(|bytes| match Doodad::from_bytes(bytes) {
                        Ok(doodad) => Some(doodad),
                        Err(e) => {
                            log::error!("actor {}: load {}: {e}", actor.id(), actor.filename);
                            None
                        }
                    });
                LiveActor::from_actor(actor, doodad.as_ref())
            })
            .collect::<Vec<_>>();
        log::info!("simulation ready with {} actors", actors.len());

        Self {
            level,
            actors,
            supervisor,
            broker: Broker::new(),
            viewport: Viewport::new(0, 0),
            follow: None,
            settings,
            tick: 0,
        }
    }
    #[must_use]
    pub fn tick_count(&self) -> u64 {
        self.tick
    }
    #[must_use]
    pub fn actors(&self) -> &[LiveActor] {
        &self.actors
    }
    #[must_use]
    pub fn actor(&self, id: &str) -> Option<&LiveActor> {
        self.actors.iter().find(|a| a.id == id)
    }
    pub fn actor_mut(&mut self, id: &str) -> Option<&mut LiveActor> {
        self.actors.iter_mut().find(|a| a.id == id)
    }
    /// Add an actor to play, with a script `Vm` of its own. It moves after those already playing.
    pub fn spawn(&mut self, actor: LiveActor) {
        self.supervisor.add(&actor.id);
        self.actors.push(actor);
    }
    #[must_use]
    pub fn broker(&self) -> &Broker {
        &self.broker
    }

    /// Run one tick.
    pub fn tick(&mut self) -> TickReport {
        self.tick += 1;
        let mut report = TickReport {
            tick: self.tick,
            ..TickReport::default()
        };

        report.removed = self.remove_destroyed();
        self.supervisor.tick(self.tick);

        let before: Vec<Point> = self.actors.iter().map(|a| a.position).collect();
        let geometry = Geometry::new(&self.level.chunker, &self.level.palette)
            .with_slope_max_height(self.settings.slope_max_height);
        let page = self.level.page_type;
        let max = self.level.max();
        for actor in &mut self.actors {
            if !actor.mobile {
                continue;
            }
            let target = actor.target();
            let result = geometry.collides_with_grid(actor, target);
            if result.touches(Side::Bottom) || result.touches(Side::Top) {
                actor.velocity.y = 0;
            }
            actor.position = result.move_to;
            actor.last_collide = Some(result);
            viewport::contain_actor(page, max, actor, |a, p| a.position = p);
        }
        report.moved = self
            .actors
            .iter()
            .zip(&before)
            .filter(|&(a, &p)| a.position != p)
            .count();

        report.touching = self.broker.resolve(&mut self.actors, &before, &mut self.supervisor);
        self.follow_camera();
        self.warm_caches();
        report
    }

    fn remove_destroyed(&mut self) -> usize {
        let mut gone: BTreeSet<String> = self.supervisor.take_destroyed();
        gone.extend(self.actors.iter().filter(|a| a.destroyed).map(|a| a.id.clone()));
        if gone.is_empty() {
            return 0;
        }
        let count = self.actors.len();
        self.actors.retain(|a| !gone.contains(&a.id));
        for id in &gone {
            log::debug!("actor {id} removed at tick {}", self.tick);
            self.supervisor.remove(id);
        }
        count - self.actors.len()
    }

    fn follow_camera(&mut self) {
        let Some(id) = &self.follow else {
            return;
        };
        let Some(actor) = self.actors.iter().find(|a| &a.id == id) else {
            return;
        };
        let rect = crate::collision::bounding_rect(actor);
        self.viewport.follow(rect, self.settings.scrollbox_offset, self.settings.follow_actor_max_scroll);
        self.viewport.clamp(self.level.page_type, self.level.max());
    }

    /// Chunk cache upkeep on the settings' cadence.
    fn warm_caches(&mut self) {
        if let Some(freed) = self.level.chunker.free_caches(self.tick) {
            if freed > 0 {
                log::trace!("tick {}: freed {freed} chunks", self.tick);
            }
        }
        let every = self.settings.load_unload_ticks.max(1);
        if self.viewport.width > 0 && self.tick % every == 0 {
            let rect = self.viewport.loading_rect(self.settings.loading_viewport_margin);
            self.level.chunker.load_unload(rect, &self.level.palette);
        }
    }
}
