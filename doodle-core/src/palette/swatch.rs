use crate::color::Color;

/// Index of a swatch within its palette. This is what pixels actually store.
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct PaletteIndex(pub u16);
impl PaletteIndex {
    /// Reserved to mean "no pixel" in dense encodings. Never a valid swatch.
    pub const NULL: Self = Self(0xFFFF);
    #[must_use]
    pub fn get(self) -> usize {
        usize::from(self.0)
    }
}
impl std::fmt::Display for PaletteIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

fn is_false(v: &bool) -> bool {
    !v
}

/// A named color with gameplay attributes.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Swatch {
    pub name: String,
    pub color: Color,
    /// Name of a texture to tile over pixels of this swatch.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pattern: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub solid: bool,
    /// Collides only from above, like a platform.
    #[serde(default, skip_serializing_if = "is_false")]
    pub semisolid: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub fire: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub water: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub slippery: bool,

    // Assigned by the owning palette.
    #[serde(skip)]
    pub(super) index: usize,
}
impl Swatch {
    #[must_use]
    pub fn new(name: impl Into<String>, color: Color) -> Self {
        Self {
            name: name.into(),
            color,
            pattern: String::new(),
            solid: false,
            semisolid: false,
            fire: false,
            water: false,
            slippery: false,
            index: 0,
        }
    }
    #[must_use]
    pub fn solid(mut self) -> Self {
        self.solid = true;
        self
    }
    #[must_use]
    pub fn semisolid(mut self) -> Self {
        self.semisolid = true;
        self
    }
    #[must_use]
    pub fn fire(mut self) -> Self {
        self.fire = true;
        self
    }
    #[must_use]
    pub fn water(mut self) -> Self {
        self.water = true;
        self
    }
    #[must_use]
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = pattern.into();
        self
    }
    /// Position in the owning palette.
    #[must_use]
    pub fn index(&self) -> PaletteIndex {
        // Palettes refuse to grow past u16 range.
        PaletteIndex(self.index as u16)
    }
    /// Whether actors bump into this swatch at all.
    #[must_use]
    pub fn collides(&self) -> bool {
        self.solid || self.semisolid
    }
    /// Comma separated attribute names, e.g. `"solid,fire"`, or `"none"`.
    #[must_use]
    pub fn attributes(&self) -> String {
        let names = [
            (self.solid, "solid"),
            (self.semisolid, "semisolid"),
            (self.fire, "fire"),
            (self.water, "water"),
            (self.slippery, "slippery"),
        ]
        .into_iter()
        .filter_map(|(set, name)| set.then_some(name))
        .collect::<Vec<_>>();
        if names.is_empty() {
            "none".to_owned()
        } else {
            names.join(",")
        }
    }
}
impl std::fmt::Display for Swatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.color)
    }
}
