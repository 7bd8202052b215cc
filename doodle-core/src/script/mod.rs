//! # Scripting
//!
//! The engine side of actor scripts. Each actor gets a [`Vm`]: the event handlers, message subscriptions
//! and timers its script registered. The [`Supervisor`] owns every `Vm`, routes messages between them and
//! answers the collision broker as its [`ScriptHost`].
//!
//! Handlers are plain closures. Whatever language drives them registers closures that call back into it.

mod pubsub;
mod timers;

pub use pubsub::{Message, PubSub};
pub use timers::{TimerId, Timers};

use crate::{
    actor::ActorMap,
    broker::{CollideEvent, ScriptHost, Verdict},
};
use std::collections::{BTreeMap, BTreeSet};

pub type Subscriber = Box<dyn FnMut(&mut Api<'_>, &Message)>;
pub type CollideHandler = Box<dyn FnMut(&mut Api<'_>, &CollideEvent<'_>) -> Verdict>;
/// Handler told the id of another actor, for leave and use events.
pub type ActorHandler = Box<dyn FnMut(&mut Api<'_>, &str)>;
pub type TimerCallback = Box<dyn FnMut(&mut Api<'_>)>;

/// Requests a handler made, carried out once it returns.
#[derive(Debug, Default)]
struct Requests {
    publish: Vec<(String, Vec<serde_json::Value>)>,
    broadcast: Vec<(String, Vec<serde_json::Value>)>,
    destroy: bool,
}

/// What a running handler can do to the world.
pub struct Api<'a> {
    actor: &'a str,
    tick: u64,
    requests: &'a mut Requests,
}
impl Api<'_> {
    /// Id of the actor whose script is running.
    #[must_use]
    pub fn actor(&self) -> &str {
        self.actor
    }
    #[must_use]
    pub fn tick(&self) -> u64 {
        self.tick
    }
    /// Message every linked actor, once the handler returns.
    pub fn publish(&mut self, name: &str, args: Vec<serde_json::Value>) {
        self.requests.publish.push((name.to_owned(), args));
    }
    /// Message every other actor, once the handler returns.
    pub fn broadcast(&mut self, name: &str, args: Vec<serde_json::Value>) {
        self.requests.broadcast.push((name.to_owned(), args));
    }
    /// Remove this actor at the start of the next tick.
    pub fn destroy(&mut self) {
        self.requests.destroy = true;
    }
}

/// One actor's script state.
pub struct Vm {
    name: String,
    subscribers: BTreeMap<String, Vec<Subscriber>>,
    on_collide: Vec<CollideHandler>,
    on_leave: Vec<ActorHandler>,
    on_use: Vec<ActorHandler>,
    timers: Timers<TimerCallback>,
}

impl Vm {
    #[must_use]
    pub fn new(name: impl Into<String>, target_fps: u32) -> Self {
        Self {
            name: name.into(),
            subscribers: BTreeMap::new(),
            on_collide: Vec::new(),
            on_leave: Vec::new(),
            on_use: Vec::new(),
            timers: Timers::new(target_fps),
        }
    }
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn subscribe(&mut self, name: &str, handler: impl FnMut(&mut Api<'_>, &Message) + 'static) {
        self.subscribers
            .entry(name.to_owned())
            .or_default()
            .push(Box::new(handler));
    }
    pub fn on_collide(&mut self, handler: impl FnMut(&mut Api<'_>, &CollideEvent<'_>) -> Verdict + 'static) {
        self.on_collide.push(Box::new(handler));
    }
    pub fn on_leave(&mut self, handler: impl FnMut(&mut Api<'_>, &str) + 'static) {
        self.on_leave.push(Box::new(handler));
    }
    pub fn on_use(&mut self, handler: impl FnMut(&mut Api<'_>, &str) + 'static) {
        self.on_use.push(Box::new(handler));
    }
    pub fn set_timeout(&mut self, now: u64, ms: u64, callback: impl FnMut(&mut Api<'_>) + 'static) -> TimerId {
        self.timers.set_timeout(now, Box::new(callback), ms)
    }
    pub fn set_interval(&mut self, now: u64, ms: u64, callback: impl FnMut(&mut Api<'_>) + 'static) -> TimerId {
        self.timers.set_interval(now, Box::new(callback), ms)
    }
    /// Clears timeouts and intervals alike.
    pub fn clear_timer(&mut self, id: TimerId) -> bool {
        self.timers.clear(id)
    }

    fn receive(&mut self, api: &mut Api<'_>, message: &Message) {
        let Some(subscribers) = self.subscribers.get_mut(&message.name) else {
            return;
        };
        for subscriber in subscribers {
            log::debug!("pubsub: {} receives {} from {}", self.name, message.name, message.sender);
            subscriber(api, message);
        }
    }
    /// The first handler to veto stops the rest.
    fn run_collide(&mut self, api: &mut Api<'_>, event: &CollideEvent<'_>) -> Verdict {
        for handler in &mut self.on_collide {
            if handler(api, event) == Verdict::Veto {
                return Verdict::Veto;
            }
        }
        Verdict::Proceed
    }
}

/// Every actor's [`Vm`], and the message bus between them.
pub struct Supervisor {
    vms: BTreeMap<String, Vm>,
    bus: PubSub,
    target_fps: u32,
    tick: u64,
    destroyed: BTreeSet<String>,
}

impl Supervisor {
    #[must_use]
    pub fn new(target_fps: u32) -> Self {
        Self {
            vms: BTreeMap::new(),
            bus: PubSub::new(),
            target_fps,
            tick: 0,
            destroyed: BTreeSet::new(),
        }
    }
    /// The `Vm` of an actor, created on first use.
    pub fn add(&mut self, id: &str) -> &mut Vm {
        self.bus.add(id);
        let fps = self.target_fps;
        self.vms
            .entry(id.to_owned())
            .or_insert_with(|| Vm::new(id, fps))
    }
    pub fn get_mut(&mut self, id: &str) -> Option<&mut Vm> {
        self.vms.get_mut(id)
    }
    pub fn remove(&mut self, id: &str) -> Option<Vm> {
        self.bus.remove(id);
        self.vms.remove(id)
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.vms.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vms.is_empty()
    }
    /// The tick the last [`Supervisor::tick`] ran.
    #[must_use]
    pub fn now(&self) -> u64 {
        self.tick
    }
    /// Route `from`'s publishes to `to`.
    pub fn link(&mut self, from: &str, to: &str) -> bool {
        self.bus.link(from, to)
    }
    /// A `Vm` for every actor, with publishes following the actors' links. Returns how many links were made.
    pub fn install(&mut self, actors: &ActorMap) -> usize {
        for actor in actors.iter() {
            self.add(actor.id());
        }
        let mut links = 0;
        for actor in actors.iter() {
            for to in &actor.links {
                if self.bus.link(actor.id(), to) {
                    links += 1;
                } else {
                    log::warn!("actor {} links to {to}, which has no script", actor.id());
                }
            }
        }
        links
    }
    pub fn publish(&mut self, sender: &str, name: &str, args: Vec<serde_json::Value>) -> usize {
        self.bus.publish(sender, name, args)
    }
    pub fn broadcast(&mut self, sender: &str, name: &str, args: Vec<serde_json::Value>) -> usize {
        self.bus.broadcast(sender, name, args)
    }
    /// Actors whose scripts asked to be destroyed since the last call.
    pub fn take_destroyed(&mut self) -> BTreeSet<String> {
        std::mem::take(&mut self.destroyed)
    }

    /// Run due timers, then deliver waiting messages. Messages sent by subscribers wait for the next tick.
    pub fn tick(&mut self, now: u64) {
        self.tick = now;
        let ids: Vec<String> = self.vms.keys().cloned().collect();
        for id in &ids {
            let mut requests = Requests::default();
            if let Some(vm) = self.vms.get_mut(id) {
                let mut api = Api {
                    actor: id,
                    tick: now,
                    requests: &mut requests,
                };
                vm.timers.tick(now, |_, callback| callback(&mut api));
            }
            self.apply(id, requests);
        }
        for id in &ids {
            let inbox = self.bus.drain(id);
            if inbox.is_empty() {
                continue;
            }
            let mut requests = Requests::default();
            if let Some(vm) = self.vms.get_mut(id) {
                let mut api = Api {
                    actor: id,
                    tick: now,
                    requests: &mut requests,
                };
                for message in &inbox {
                    vm.receive(&mut api, message);
                }
            }
            self.apply(id, requests);
        }
    }

    /// Run a handler of actor `id` and carry out its requests.
    fn run<R>(&mut self, id: &str, f: impl FnOnce(&mut Vm, &mut Api<'_>) -> R) -> Option<R> {
        let mut requests = Requests::default();
        let result = self.vms.get_mut(id).map(|vm| {
            let mut api = Api {
                actor: id,
                tick: self.tick,
                requests: &mut requests,
            };
            f(vm, &mut api)
        });
        self.apply(id, requests);
        result
    }
    fn apply(&mut self, id: &str, requests: Requests) {
        for (name, args) in requests.publish {
            self.bus.publish(id, &name, args);
        }
        for (name, args) in requests.broadcast {
            self.bus.broadcast(id, &name, args);
        }
        if requests.destroy {
            log::debug!("actor {id} destroys itself");
            self.destroyed.insert(id.to_owned());
        }
    }
}

impl ScriptHost for Supervisor {
    fn on_collide(&mut self, actor: &str, event: &CollideEvent<'_>) -> Verdict {
        self.run(actor, |vm, api| vm.run_collide(api, event))
            .unwrap_or_default()
    }
    fn on_leave(&mut self, actor: &str, other: &str) {
        self.run(actor, |vm, api| {
            for handler in &mut vm.on_leave {
                handler(api, other);
            }
        });
    }
    fn on_use(&mut self, actor: &str, other: &str) {
        self.run(actor, |vm, api| {
            for handler in &mut vm.on_use {
                handler(api, other);
            }
        });
    }
}
