use crate::{
    error::Error,
    geom::{Point, Rect},
    io::varint,
    palette::{Palette, PaletteIndex},
};

/// Sparse pixel storage: world point to palette index.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MapAccessor {
    grid: hashbrown::HashMap<Point, PaletteIndex>,
}
impl MapAccessor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.grid.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.grid.is_empty()
    }
    #[must_use]
    pub fn get(&self, p: Point) -> Option<PaletteIndex> {
        self.grid.get(&p).copied()
    }
    /// Insert or overwrite. Returns the previous index, if any.
    pub fn set(&mut self, p: Point, index: PaletteIndex) -> Option<PaletteIndex> {
        self.grid.insert(p, index)
    }
    pub fn delete(&mut self, p: Point) -> Result<PaletteIndex, Error> {
        self.grid
            .remove(&p)
            .ok_or_else(|| Error::not_found(format_args!("pixel {p}")))
    }
    pub fn clear(&mut self) {
        self.grid.clear();
    }
    pub fn iter(&self) -> impl Iterator<Item = (Point, PaletteIndex)> + '_ {
        self.grid.iter().map(|(&p, &i)| (p, i))
    }
    pub fn iter_viewport(&self, viewport: Rect) -> impl Iterator<Item = (Point, PaletteIndex)> + '_ {
        self.iter().filter(move |(p, _)| viewport.contains(*p))
    }
    /// Check every stored index against the palette.
    pub fn inflate(&self, palette: &Palette) -> Result<(), Error> {
        self.check(palette.len())
    }
    /// Check every stored index is below `swatches`.
    pub fn check(&self, swatches: usize) -> Result<(), Error> {
        if let Some((point, index)) = self
            .grid
            .iter()
            .find(|(_, index)| index.get() >= swatches)
        {
            log::error!("pixel {point} uses swatch {index} of {swatches}");
            return Err(Error::IndexOutOfRange {
                index: index.get(),
                len: swatches,
            });
        }
        Ok(())
    }

    /// The json form, `{"x,y": index}`.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        let dict = self
            .grid
            .iter()
            .map(|(p, i)| (p.to_string(), serde_json::Value::from(i.0)))
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(dict)
    }
    pub fn from_json(value: &serde_json::Value) -> Result<Self, Error> {
        let dict = value
            .as_object()
            .ok_or_else(|| Error::malformed("map chunk data is not an object"))?;
        let mut grid = hashbrown::HashMap::with_capacity(dict.len());
        for (key, index) in dict {
            let point = key.parse::<Point>()?;
            let index = index
                .as_u64()
                .and_then(|i| u16::try_from(i).ok())
                .ok_or_else(|| Error::malformed(format_args!("bad palette index at {key}")))?;
            grid.insert(point, PaletteIndex(index));
        }
        Ok(Self { grid })
    }
    /// Packed form: repeated `(varint x, varint y, uvarint index)`.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.grid.len() * 4);
        for (p, index) in &self.grid {
            varint::write_varint(&mut out, i64::from(p.x));
            varint::write_varint(&mut out, i64::from(p.y));
            varint::write_uvarint(&mut out, u64::from(index.0));
        }
        out
    }
    pub fn decode(bytes: &[u8]) -> Result<Self, Error> {
        let mut reader = varint::Reader::new(bytes);
        let mut grid = hashbrown::HashMap::new();
        let narrow = |v: i64| i32::try_from(v).map_err(|_| Error::malformed("pixel coordinate overflow"));
        while !reader.is_empty() {
            let x = narrow(reader.read_varint()?)?;
            let y = narrow(reader.read_varint()?)?;
            let index = u16::try_from(reader.read_uvarint()?)
                .map_err(|_| Error::malformed("palette index overflow"))?;
            grid.insert(Point::new(x, y), PaletteIndex(index));
        }
        Ok(Self { grid })
    }
}

impl FromIterator<(Point, PaletteIndex)> for MapAccessor {
    fn from_iter<T: IntoIterator<Item = (Point, PaletteIndex)>>(iter: T) -> Self {
        Self {
            grid: iter.into_iter().collect(),
        }
    }
}
