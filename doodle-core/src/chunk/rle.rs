//! Run length encoded chunk storage.
//!
//! In memory an [`RleAccessor`] is just a [`MapAccessor`] for random access. The run length form only
//! exists on disk: the chunk is laid out as a dense `size × size` grid, walked row major from the top left,
//! and emitted as `(uvarint palette index, uvarint run length)` pairs with [`PaletteIndex::NULL`] for
//! empty pixels.

use super::map::MapAccessor;
use crate::{
    error::Error,
    geom::{Point, Rect},
    io::varint,
    palette::PaletteIndex,
};

/// Dense row-major grid of optional palette indices.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    size: usize,
    cells: Vec<Option<PaletteIndex>>,
}
impl Grid {
    #[must_use]
    pub fn new(size: usize) -> Self {
        Self {
            size,
            cells: vec![None; size * size],
        }
    }
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }
    #[must_use]
    pub fn get(&self, x: usize, y: usize) -> Option<PaletteIndex> {
        if x >= self.size || y >= self.size {
            return None;
        }
        self.cells[y * self.size + x]
    }
    /// Out of bounds writes are ignored.
    pub fn set(&mut self, x: usize, y: usize, value: Option<PaletteIndex>) {
        if x < self.size && y < self.size {
            self.cells[y * self.size + x] = value;
        }
    }
    pub fn cells(&self) -> &[Option<PaletteIndex>] {
        &self.cells
    }

    /// Emit the run length stream.
    #[must_use]
    pub fn compress(&self) -> Vec<u8> {
        let mut out = Vec::new();
        let mut runs = self.cells.iter().map(|c| c.unwrap_or(PaletteIndex::NULL));
        let Some(mut current) = runs.next() else {
            return out;
        };
        let mut length = 1u64;
        for index in runs {
            if index == current {
                length += 1;
                continue;
            }
            varint::write_uvarint(&mut out, u64::from(current.0));
            varint::write_uvarint(&mut out, length);
            current = index;
            length = 1;
        }
        varint::write_uvarint(&mut out, u64::from(current.0));
        varint::write_uvarint(&mut out, length);
        out
    }
    /// Rebuild a `size × size` grid from a run length stream.
    ///
    /// A stream that covers fewer cells leaves the rest empty. One that overruns the grid is malformed.
    pub fn decompress(size: usize, bytes: &[u8]) -> Result<Self, Error> {
        let mut grid = Self::new(size);
        let mut reader = varint::Reader::new(bytes);
        let mut cursor = 0usize;
        while !reader.is_empty() {
            let index = reader.read_uvarint()?;
            let length = reader.read_uvarint()?;
            let index = u16::try_from(index)
                .map(PaletteIndex)
                .map_err(|_| Error::malformed(format_args!("rle palette index {index}")))?;
            let length = usize::try_from(length).unwrap_or(usize::MAX);
            let end = cursor.saturating_add(length);
            if end > grid.cells.len() {
                return Err(Error::malformed(format_args!(
                    "rle stream overruns {size}x{size} chunk"
                )));
            }
            let value = (index != PaletteIndex::NULL).then_some(index);
            grid.cells[cursor..end].fill(value);
            cursor = end;
        }
        Ok(grid)
    }
}

/// Chunk storage that saves as a run length encoded grid.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RleAccessor {
    map: MapAccessor,
}
impl RleAccessor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
    /// Wrap an existing sparse accessor. Used when optimizing chunks on save.
    #[must_use]
    pub fn from_map(map: MapAccessor) -> Self {
        Self { map }
    }
    #[must_use]
    pub fn into_map(self) -> MapAccessor {
        self.map
    }
    #[must_use]
    pub fn map(&self) -> &MapAccessor {
        &self.map
    }
    pub fn map_mut(&mut self) -> &mut MapAccessor {
        &mut self.map
    }

    /// Lay the pixels of the chunk at `bounds` out on a grid. Pixels outside are skipped with a warning.
    #[must_use]
    pub fn to_grid(&self, bounds: Rect) -> Grid {
        let mut grid = Grid::new(usize::try_from(bounds.w).unwrap_or(0));
        for (p, index) in self.map.iter() {
            if !bounds.contains(p) {
                log::warn!("RleAccessor: pixel {p} lies outside of its chunk {bounds}");
                continue;
            }
            // Non-negative: contains() checked it.
            grid.set((p.x - bounds.x) as usize, (p.y - bounds.y) as usize, Some(index));
        }
        grid
    }
    #[must_use]
    pub fn encode(&self, bounds: Rect) -> Vec<u8> {
        self.to_grid(bounds).compress()
    }
    pub fn decode(bounds: Rect, bytes: &[u8]) -> Result<Self, Error> {
        let size = usize::try_from(bounds.w).map_err(|_| Error::malformed("negative chunk size"))?;
        let grid = Grid::decompress(size, bytes)?;
        let mut map = MapAccessor::new();
        for (i, cell) in grid.cells().iter().enumerate() {
            if let Some(index) = *cell {
                // i < size² and size came from an i32.
                let (x, y) = ((i % size) as i32, (i / size) as i32);
                map.set(Point::new(bounds.x + x, bounds.y + y), index);
            }
        }
        Ok(Self { map })
    }
}
