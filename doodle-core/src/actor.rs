//! Actors: instances of doodads placed in a level, and their user-set options.

use crate::geom::Point;
use std::collections::BTreeMap;

#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    Hash,
    serde::Serialize,
    serde::Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OptionType {
    Bool,
    Str,
    Int,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OptionParseError {
    #[error("unknown option type {0:?}")]
    UnknownType(String),
    #[error("option {name} expects an int, got {value:?}")]
    NotAnInt { name: String, value: String },
}

/// An option's value. Untagged: json `true`, `5` and `"x"` map straight onto it.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    #[default]
    Unset,
    Bool(bool),
    Int(i64),
    Str(String),
}
impl std::fmt::Display for OptionValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unset => f.write_str("<nil>"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}
impl OptionValue {
    /// Parse user input as a value of the given type. `bool` is true only for the exact text `"true"`.
    pub fn parse(kind: OptionType, name: &str, text: &str) -> Result<Self, OptionParseError> {
        Ok(match kind {
            OptionType::Bool => Self::Bool(text == "true"),
            OptionType::Str => Self::Str(text.to_owned()),
            OptionType::Int => Self::Int(text.trim().parse().map_err(|_| {
                OptionParseError::NotAnInt {
                    name: name.to_owned(),
                    value: text.to_owned(),
                }
            })?),
        })
    }
}

/// A level designer's override of one of a doodad's options.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ActorOption {
    #[serde(rename = "type")]
    pub kind: OptionType,
    pub name: String,
    #[serde(default)]
    pub value: OptionValue,
}
impl ActorOption {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: OptionType) -> Self {
        Self {
            kind,
            name: name.into(),
            value: OptionValue::Unset,
        }
    }
    /// Set from user input, returning the new value as text. A bad int logs and stores `0`.
    pub fn set_from_str(&mut self, text: &str) -> String {
        self.value = OptionValue::parse(self.kind, &self.name, text).unwrap_or_else(|e| {
            log::error!("actor option: {e}");
            OptionValue::Int(0)
        });
        self.value.to_string()
    }
}

/// An instance of a doodad in a level.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Actor {
    /// Key of this actor in its [`ActorMap`].
    #[serde(skip)]
    id: String,
    /// Doodad this is an instance of, like `"exit.doodad"`.
    pub filename: String,
    pub point: Point,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, ActorOption>,
}
impl Actor {
    #[must_use]
    pub fn new(filename: impl Into<String>, point: Point) -> Self {
        Self {
            filename: filename.into(),
            point,
            ..Self::default()
        }
    }
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }
    /// Link to another actor, once.
    pub fn add_link(&mut self, other: &str) {
        if other != self.id && !self.links.iter().any(|l| l == other) {
            self.links.push(other.to_owned());
        }
    }
    pub fn unlink(&mut self, other: &str) -> bool {
        let before = self.links.len();
        self.links.retain(|l| l != other);
        self.links.len() != before
    }
    #[must_use]
    pub fn is_linked_to(&self, other: &str) -> bool {
        self.links.iter().any(|l| l == other)
    }
    /// Set an option, creating it with the given type if it's new. Returns the stored value as text.
    pub fn set_option(&mut self, name: &str, kind: &str, text: &str) -> Result<String, OptionParseError> {
        let kind: OptionType = kind
            .parse()
            .map_err(|_| OptionParseError::UnknownType(kind.to_owned()))?;
        Ok(self
            .options
            .entry(name.to_owned())
            .or_insert_with(|| ActorOption::new(name, kind))
            .set_from_str(text))
    }
    #[must_use]
    pub fn option(&self, name: &str) -> Option<&OptionValue> {
        self.options.get(name).map(|o| &o.value)
    }
}

/// Every actor of a level, by id. Sorted, so iteration and saved files are stable.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct ActorMap(BTreeMap<String, Actor>);

impl ActorMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
    /// Give every actor its own key as its id, after loading.
    pub fn inflate(&mut self) {
        for (id, actor) in &mut self.0 {
            id.clone_into(&mut actor.id);
        }
    }
    /// Insert an actor, giving it a random id if it has none. Returns the id.
    pub fn add(&mut self, mut actor: Actor) -> String {
        if actor.id.is_empty() {
            actor.id = uuid::Uuid::new_v4().to_string();
        }
        let id = actor.id.clone();
        self.0.insert(id.clone(), actor);
        id
    }
    pub fn remove(&mut self, id: &str) -> Option<Actor> {
        self.0.remove(id)
    }
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Actor> {
        self.0.get(id)
    }
    pub fn get_mut(&mut self, id: &str) -> Option<&mut Actor> {
        self.0.get_mut(id)
    }
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.0.contains_key(id)
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
    pub fn iter(&self) -> impl Iterator<Item = &Actor> {
        self.0.values()
    }
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Actor> {
        self.0.values_mut()
    }
    /// Link `a` to `b` and `b` to `a`.
    pub fn link(&mut self, a: &str, b: &str) -> Result<(), crate::Error> {
        for id in [a, b] {
            if !self.contains(id) {
                return Err(crate::Error::not_found(format_args!("actor {id}")));
            }
        }
        if let Some(actor) = self.0.get_mut(a) {
            actor.add_link(b);
        }
        if let Some(actor) = self.0.get_mut(b) {
            actor.add_link(a);
        }
        Ok(())
    }
    /// Drop links pointing at actors that no longer exist. Returns how many were dropped.
    pub fn prune_links(&mut self) -> usize {
        let ids: hashbrown::HashSet<String> = self.0.keys().cloned().collect();
        let mut pruned = 0;
        for (id, actor) in &mut self.0 {
            actor.links.retain(|link| {
                let keep = ids.contains(link);
                if !keep {
                    log::warn!(
                        "actor {id} ({}) was linked to unresolved actor {link}",
                        actor.filename
                    );
                    pruned += 1;
                }
                keep
            });
        }
        pruned
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn add_assigns_ids() {
        let mut actors = ActorMap::new();
        let a = actors.add(Actor::new("button.doodad", Point::new(10, 20)));
        let b = actors.add(Actor::new("door.doodad", Point::ORIGIN).with_id("door-1"));
        assert_eq!(a.len(), 36);
        assert_eq!(b, "door-1");
        assert_eq!(actors.get(&a).unwrap().id(), a);
        assert_eq!(actors.len(), 2);
        assert!(actors.remove("door-1").is_some());
        assert!(actors.remove("door-1").is_none());
    }
    #[test]
    fn json_and_inflate() {
        let text = r#"{
            "abc": {"filename": "exit.doodad", "point": {"x": 1, "y": 2}, "links": ["def"]},
            "def": {"filename": "key.doodad", "point": {"x": 3, "y": 4},
                    "options": {"color": {"type": "str", "name": "color", "value": "red"}}}
        }"#;
        let mut actors: ActorMap = serde_json::from_str(text).unwrap();
        assert_eq!(actors.get("abc").unwrap().id(), "");
        actors.inflate();
        assert_eq!(actors.get("abc").unwrap().id(), "abc");
        assert!(actors.get("abc").unwrap().is_linked_to("def"));
        assert_eq!(
            actors.get("def").unwrap().option("color"),
            Some(&OptionValue::Str("red".into()))
        );
        let back = serde_json::to_value(&actors).unwrap();
        assert_eq!(back["abc"]["point"]["y"], 2);
        assert!(back["abc"].get("options").is_none());
    }
    #[test]
    fn prune_links() {
        let mut actors = ActorMap::new();
        let a = actors.add(Actor::new("a.doodad", Point::ORIGIN));
        let b = actors.add(Actor::new("b.doodad", Point::ORIGIN));
        actors.link(&a, &b).unwrap();
        actors.get_mut(&a).unwrap().add_link("ghost");
        assert!(actors.link(&a, "ghost").unwrap_err().is_not_found());
        actors.remove(&b);
        assert_eq!(actors.prune_links(), 2);
        assert!(actors.get(&a).unwrap().links.is_empty());
        assert_eq!(actors.prune_links(), 0);
    }
    #[test]
    fn options() {
        let mut actor = Actor::new("switch.doodad", Point::ORIGIN);
        assert_eq!(actor.set_option("on", "bool", "true").unwrap(), "true");
        assert_eq!(actor.set_option("on", "bool", "yes").unwrap(), "false");
        assert_eq!(actor.set_option("count", "int", " 12").unwrap(), "12");
        // Bad ints fall back to zero.
        assert_eq!(actor.set_option("count", "int", "twelve").unwrap(), "0");
        assert_eq!(actor.set_option("label", "str", "hi").unwrap(), "hi");
        assert!(matches!(
            actor.set_option("x", "float", "1.5"),
            Err(OptionParseError::UnknownType(_))
        ));
        assert_eq!(actor.option("count"), Some(&OptionValue::Int(0)));
        assert!(OptionValue::parse(OptionType::Int, "n", "x").is_err());
        let json = serde_json::to_string(&actor.options["on"]).unwrap();
        assert_eq!(json, r#"{"type":"bool","name":"on","value":false}"#);
    }
}
