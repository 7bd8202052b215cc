//! # Palette
//!
//! Every drawing owns one palette: an ordered list of [`Swatch`]es, unique by name. Pixels only ever store
//! a [`PaletteIndex`], so swatches can be edited (or the whole palette replaced) without touching chunk data.

mod swatch;
pub use swatch::{PaletteIndex, Swatch};

use crate::{color::Color, error::Error};

/// Names accepted by [`Palette::builtin`].
pub const BUILTIN_PALETTES: [&str; 3] = ["Default", "Colored Pencil", "Blueprint"];

#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct Palette {
    swatches: Vec<Swatch>,
    // Cache of swatch name -> index, rebuilt by `inflate`.
    #[serde(skip)]
    by_name: hashbrown::HashMap<String, usize>,
}
impl Palette {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
    /// Build from a list of swatches. Later duplicates of a name shadow earlier ones in [`Palette::get`].
    #[must_use]
    pub fn from_swatches(swatches: Vec<Swatch>) -> Self {
        let mut palette = Self {
            swatches,
            by_name: hashbrown::HashMap::new(),
        };
        palette.inflate();
        palette
    }
    /// The palette new drawings start with.
    #[must_use]
    pub fn default_palette() -> Self {
        Self::from_swatches(vec![
            Swatch::new("solid", Color::BLACK).solid(),
            Swatch::new("decoration", Color::GREY),
            Swatch::new("fire", Color::RED).fire(),
            Swatch::new("water", Color::rgba(0, 0, 255, 180)).water(),
        ])
    }
    #[must_use]
    pub fn blueprint() -> Self {
        Self::from_swatches(vec![
            Swatch::new("solid", Color::rgb(254, 254, 254)).solid(),
            Swatch::new("decoration", Color::GREY),
            Swatch::new("fire", Color::rgb(255, 80, 0)).fire(),
            Swatch::new("water", Color::rgb(0, 153, 255)).water(),
            Swatch::new("electric", Color::YELLOW).solid(),
        ])
    }
    #[must_use]
    pub fn colored_pencil() -> Self {
        Self::from_swatches(vec![
            Swatch::new("darkstone", Color::rgb(119, 119, 119))
                .solid()
                .with_pattern("noise.png"),
            Swatch::new("grass", Color::DARK_GREEN)
                .solid()
                .with_pattern("noise.png"),
            Swatch::new("dirt", Color::rgb(153, 102, 0))
                .solid()
                .with_pattern("noise.png"),
            Swatch::new("stone", Color::GREY).solid().with_pattern("noise.png"),
            Swatch::new("planks", Color::rgb(204, 136, 51))
                .semisolid()
                .with_pattern("noise.png"),
            Swatch::new("fire", Color::RED).fire().with_pattern("marker.png"),
            Swatch::new("water", Color::rgb(0, 153, 255))
                .water()
                .with_pattern("bubbles.png"),
        ])
    }
    /// Look up one of the [`BUILTIN_PALETTES`] by name.
    #[must_use]
    pub fn builtin(name: &str) -> Option<Self> {
        match name {
            "Default" => Some(Self::default_palette()),
            "Colored Pencil" => Some(Self::colored_pencil()),
            "Blueprint" => Some(Self::blueprint()),
            _ => None,
        }
    }
    /// Assign each swatch its index and rebuild the name lookup.
    /// Must be called after deserializing.
    pub fn inflate(&mut self) {
        self.by_name.clear();
        for (i, swatch) in self.swatches.iter_mut().enumerate() {
            swatch.index = i;
            self.by_name.insert(swatch.name.clone(), i);
        }
    }
    /// Append a swatch, returning its new index.
    pub fn add(&mut self, mut swatch: Swatch) -> Result<PaletteIndex, Error> {
        if self.by_name.contains_key(&swatch.name) {
            return Err(Error::Invariant(format!(
                "palette already has a swatch named {:?}",
                swatch.name
            )));
        }
        let index = self.swatches.len();
        // Last index is reserved for the null pixel.
        if index >= usize::from(PaletteIndex::NULL.0) {
            return Err(Error::IndexOutOfRange {
                index,
                len: index,
            });
        }
        swatch.index = index;
        self.by_name.insert(swatch.name.clone(), index);
        self.swatches.push(swatch);
        Ok(PaletteIndex(index as u16))
    }
    /// Append a fresh swatch with a generated name, like `"color 4"`.
    pub fn add_new(&mut self) -> Result<PaletteIndex, Error> {
        let mut n = self.swatches.len();
        let name = loop {
            let name = format!("color {n}");
            if !self.by_name.contains_key(&name) {
                break name;
            }
            n += 1;
        };
        self.add(Swatch::new(name, Color::rgb(255, 0, 255)))
    }
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Swatch> {
        self.by_name.get(name).and_then(|&i| self.swatches.get(i))
    }
    #[must_use]
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Swatch> {
        let i = *self.by_name.get(name)?;
        self.swatches.get_mut(i)
    }
    /// Resolve an index, failing with [`Error::IndexOutOfRange`].
    pub fn at(&self, index: PaletteIndex) -> Result<&Swatch, Error> {
        self.swatches
            .get(index.get())
            .ok_or(Error::IndexOutOfRange {
                index: index.get(),
                len: self.swatches.len(),
            })
    }
    /// Check that `index` names a swatch, without borrowing it.
    pub fn check(&self, index: PaletteIndex) -> Result<(), Error> {
        self.at(index).map(|_| ())
    }
    /// Overwrite this palette with `other`, keeping indices stable.
    ///
    /// Swatches are updated field by field in place, so every pixel keeps pointing at the same slot.
    /// Slots beyond the end of `other` are kept rather than dropped, since pixels may still use them.
    pub fn replace(&mut self, other: &Palette) {
        for (i, theirs) in other.swatches.iter().enumerate() {
            match self.swatches.get_mut(i) {
                Some(ours) => {
                    let index = ours.index;
                    *ours = theirs.clone();
                    ours.index = index;
                }
                None => self.swatches.push(theirs.clone()),
            }
        }
        if self.swatches.len() > other.swatches.len() {
            log::debug!(
                "Palette::replace kept {} trailing swatches",
                self.swatches.len() - other.swatches.len()
            );
        }
        self.inflate();
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.swatches.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.swatches.is_empty()
    }
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &Swatch> {
        self.swatches.iter()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults() {
        let palette = Palette::default_palette();
        assert_eq!(palette.len(), 4);
        let water = palette.get("water").unwrap();
        assert_eq!(water.color, Color::rgba(0, 0, 255, 180));
        assert_eq!(water.index(), PaletteIndex(3));
        assert_eq!(palette.get("solid").unwrap().attributes(), "solid");
        assert_eq!(palette.get("decoration").unwrap().attributes(), "none");
        assert!(palette.get("electric").is_none());
        assert!(Palette::builtin("Blueprint").unwrap().get("electric").is_some());
        for name in BUILTIN_PALETTES {
            assert!(Palette::builtin(name).is_some(), "{name}");
        }
    }
    #[test]
    fn add_assigns_indices() {
        let mut palette = Palette::new();
        assert_eq!(
            palette.add(Swatch::new("a", Color::RED)).unwrap(),
            PaletteIndex(0)
        );
        assert_eq!(palette.add_new().unwrap(), PaletteIndex(1));
        assert_eq!(palette.get("color 1").unwrap().index(), PaletteIndex(1));
        // Duplicate names are refused.
        assert!(palette.add(Swatch::new("a", Color::BLUE)).is_err());
        assert_eq!(palette.len(), 2);
    }
    #[test]
    fn json_then_inflate() {
        let json = r##"{"swatches":[
            {"name":"ground","color":"#777777","solid":true},
            {"name":"lava","color":"#ff0000","fire":true,"pattern":"marker.png"}
        ]}"##;
        let mut palette: Palette = serde_json::from_str(json).unwrap();
        // Lookups need the name cache.
        assert!(palette.get("lava").is_none());
        palette.inflate();
        let lava = palette.get("lava").unwrap();
        assert_eq!(lava.index(), PaletteIndex(1));
        assert_eq!(lava.pattern, "marker.png");
        assert!(lava.fire && !lava.solid);
    }
    #[test]
    fn index_out_of_range() {
        let palette = Palette::default_palette();
        assert!(palette.at(PaletteIndex(3)).is_ok());
        assert!(matches!(
            palette.at(PaletteIndex(4)),
            Err(Error::IndexOutOfRange { index: 4, len: 4 })
        ));
    }
    #[test]
    fn replace_keeps_slots() {
        let mut palette = Palette::blueprint();
        palette.replace(&Palette::default_palette());
        // Blueprint's 5th swatch survives, the first four take the default's values.
        assert_eq!(palette.len(), 5);
        assert_eq!(palette.at(PaletteIndex(0)).unwrap().color, Color::BLACK);
        assert_eq!(palette.get("electric").unwrap().index(), PaletteIndex(4));
        assert_eq!(palette.get("water").unwrap().index(), PaletteIndex(3));
    }
}
