//! Messages between actor scripts.
//!
//! Every script has an inbox. Publishing sends to the inboxes of the actors the sender links to,
//! broadcasting sends to everyone but the sender. Inboxes are drained once per tick.

use std::collections::{BTreeMap, VecDeque};

#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    pub name: String,
    pub sender: String,
    /// What the sender passed after the name.
    pub args: Vec<serde_json::Value>,
}
impl Message {
    /// The full call as published: the name, then its arguments.
    #[must_use]
    pub fn argv(&self) -> Vec<serde_json::Value> {
        std::iter::once(serde_json::Value::from(self.name.as_str()))
            .chain(self.args.iter().cloned())
            .collect()
    }
}

#[derive(Debug, Default)]
struct Inbox {
    queue: VecDeque<Message>,
    /// Actors this one publishes to.
    outbound: Vec<String>,
}

#[derive(Debug, Default)]
pub struct PubSub {
    inboxes: BTreeMap<String, Inbox>,
}

impl PubSub {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
    /// Give an actor an inbox. Adding it again keeps its links and queue.
    pub fn add(&mut self, id: &str) {
        self.inboxes.entry(id.to_owned()).or_default();
    }
    /// Drop an actor's inbox and every link to it.
    pub fn remove(&mut self, id: &str) {
        self.inboxes.remove(id);
        for inbox in self.inboxes.values_mut() {
            inbox.outbound.retain(|to| to != id);
        }
    }
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.inboxes.contains_key(id)
    }
    /// Route `from`'s publishes to `to` as well. Links are one way.
    pub fn link(&mut self, from: &str, to: &str) -> bool {
        if from == to || !self.inboxes.contains_key(to) {
            return false;
        }
        let Some(inbox) = self.inboxes.get_mut(from) else {
            return false;
        };
        if inbox.outbound.iter().any(|id| id == to) {
            return false;
        }
        inbox.outbound.push(to.to_owned());
        true
    }
    #[must_use]
    pub fn links(&self, from: &str) -> &[String] {
        self.inboxes.get(from).map_or(&[][..], |inbox| inbox.outbound.as_slice())
    }

    /// Send to every actor `sender` links to. Returns how many inboxes got it.
    pub fn publish(&mut self, sender: &str, name: &str, args: Vec<serde_json::Value>) -> usize {
        let targets = self.links(sender).to_vec();
        let mut sent = 0;
        for to in targets {
            if let Some(inbox) = self.inboxes.get_mut(&to) {
                log::debug!("pubsub: {sender} publishes {name} to {to}");
                inbox.queue.push_back(message(sender, name, args.clone()));
                sent += 1;
            }
        }
        sent
    }
    /// Send to every actor but `sender`. Returns how many inboxes got it.
    pub fn broadcast(&mut self, sender: &str, name: &str, args: Vec<serde_json::Value>) -> usize {
        let mut sent = 0;
        for (to, inbox) in &mut self.inboxes {
            if to == sender {
                continue;
            }
            inbox.queue.push_back(message(sender, name, args.clone()));
            sent += 1;
        }
        log::debug!("pubsub: {sender} broadcasts {name} to {sent} actors");
        sent
    }
    /// Everything waiting in an actor's inbox, oldest first.
    pub fn drain(&mut self, id: &str) -> Vec<Message> {
        self.inboxes
            .get_mut(id)
            .map(|inbox| inbox.queue.drain(..).collect())
            .unwrap_or_default()
    }
    #[must_use]
    pub fn pending(&self, id: &str) -> usize {
        self.inboxes.get(id).map_or(0, |inbox| inbox.queue.len())
    }
}

fn message(sender: &str, name: &str, args: Vec<serde_json::Value>) -> Message {
    Message {
        name: name.to_owned(),
        sender: sender.to_owned(),
        args,
    }
}
