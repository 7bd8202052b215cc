//! # Chunker
//!
//! Owns every chunk of one drawing layer and maps world coordinates onto them.
//!
//! Chunks can live in two places: in memory, or cold inside the archive the drawing was loaded from. Any
//! lookup of a chunk that isn't in memory faults it in from the archive. Read-only lookups (`&self`) fault
//! into a side table behind a lock, which is folded into the main map by the next `&mut self` call, so
//! collision and rendering code can share a chunker freely.

mod cache;
mod optimize;
mod zipfile;

pub use cache::CachePolicy;
pub use zipfile::ChunkerJson;

use crate::{
    archive::ArchiveHandle,
    chunk::Chunk,
    error::Error,
    geom::{floor_div, Point, Rect},
    palette::{Palette, PaletteIndex, Swatch},
};
use hashbrown::{HashMap, HashSet};

#[derive(Debug)]
pub struct Chunker {
    size: i32,
    /// Layer number, which picks the `chunks/<layer>/` directory in the archive.
    layer: usize,
    chunks: HashMap<Point, Chunk>,
    // Chunks loaded from the archive by `&self` lookups.
    faulted: parking_lot::Mutex<HashMap<Point, Chunk>>,
    // Archived chunks that were erased in memory, and so must not be faulted back in.
    erased: HashSet<Point>,
    archive: Option<ArchiveHandle>,
    /// Swatch count of the palette, once inflated. Faulted chunks are checked against it.
    swatches: Option<usize>,
    requests: parking_lot::Mutex<cache::Requests>,
    policy: CachePolicy,
}

impl Chunker {
    #[must_use]
    pub fn new(size: i32) -> Self {
        Self {
            size: size.max(0),
            layer: 0,
            chunks: HashMap::new(),
            faulted: parking_lot::Mutex::new(HashMap::new()),
            erased: HashSet::new(),
            archive: None,
            swatches: None,
            requests: parking_lot::Mutex::new(cache::Requests::default()),
            policy: CachePolicy::default(),
        }
    }
    #[must_use]
    pub fn with_layer(mut self, layer: usize) -> Self {
        self.layer = layer;
        self
    }
    #[must_use]
    pub fn size(&self) -> i32 {
        self.size
    }
    #[must_use]
    pub fn layer(&self) -> usize {
        self.layer
    }
    pub fn set_layer(&mut self, layer: usize) {
        self.layer = layer;
    }
    pub fn set_policy(&mut self, policy: CachePolicy) {
        self.policy = policy;
    }
    #[must_use]
    pub fn archive(&self) -> Option<&ArchiveHandle> {
        self.archive.as_ref()
    }
    /// Read cold chunks from this archive from now on.
    ///
    /// In-memory chunks are kept: they take priority over whatever the archive holds.
    pub fn attach_archive(&mut self, archive: Option<ArchiveHandle>) {
        self.absorb_faulted();
        self.archive = archive;
    }
    /// Switch to an archive just written by [`Chunker::write_zip`].
    ///
    /// It holds every edit, so the in-memory chunks and erasures are dropped and fault back in from it.
    pub fn reattach(&mut self, archive: ArchiveHandle) {
        self.chunks.clear();
        self.faulted.get_mut().clear();
        self.erased.clear();
        self.archive = Some(archive);
    }

    /// Check every loaded chunk against the palette, and remember it for chunks faulted in later.
    pub fn inflate(&mut self, palette: &Palette) -> Result<(), Error> {
        self.absorb_faulted();
        for chunk in self.chunks.values() {
            chunk.inflate(palette)?;
        }
        self.swatches = Some(palette.len());
        Ok(())
    }

    /// Which chunk holds this world point. Floored, so `-1` lands in chunk `-1`.
    #[must_use]
    pub fn chunk_coord(&self, p: Point) -> Point {
        if self.size == 0 {
            return Point::ORIGIN;
        }
        Point::new(floor_div(p.x, self.size), floor_div(p.y, self.size))
    }

    /// Fold chunks faulted in through `&self` into the main map.
    fn absorb_faulted(&mut self) {
        let faulted = std::mem::take(self.faulted.get_mut());
        for (coord, chunk) in faulted {
            self.chunks.entry(coord).or_insert(chunk);
        }
    }
    /// Whether a coordinate has a chunk, in memory or in the archive. Doesn't load it.
    #[must_use]
    pub fn has_chunk(&self, coord: Point) -> bool {
        if let Some(chunk) = self.chunks.get(&coord) {
            return !chunk.is_empty();
        }
        if self.faulted.lock().contains_key(&coord) {
            return true;
        }
        !self.erased.contains(&coord)
            && self.archive.as_ref().is_some_and(|a| {
                zipfile::chunk_member(a, self.layer, coord).is_some()
            })
    }

    /// Borrow a chunk, faulting it in from the archive if needed. Empty chunks count as absent.
    pub fn get_chunk(&mut self, coord: Point) -> Option<&mut Chunk> {
        self.absorb_faulted();
        self.log_access(coord);
        if !self.chunks.contains_key(&coord) {
            let chunk = self.load_chunk(coord)?;
            self.chunks.insert(coord, chunk);
            self.enforce_lru(coord);
        }
        self.chunks.get_mut(&coord).filter(|chunk| !chunk.is_empty())
    }
    /// Run `f` against a chunk without needing `&mut self`.
    fn with_chunk<R>(&self, coord: Point, f: impl FnOnce(&Chunk) -> R) -> Option<R> {
        self.log_access(coord);
        if let Some(chunk) = self.chunks.get(&coord) {
            return (!chunk.is_empty()).then(|| f(chunk));
        }
        let mut faulted = self.faulted.lock();
        if let Some(chunk) = faulted.get(&coord) {
            return Some(f(chunk));
        }
        let chunk = self.load_chunk(coord)?;
        let result = f(&chunk);
        faulted.insert(coord, chunk);
        Some(result)
    }
    /// Read a chunk from the archive. Failures are logged and treated as a missing chunk.
    fn load_chunk(&self, coord: Point) -> Option<Chunk> {
        if self.erased.contains(&coord) {
            return None;
        }
        let archive = self.archive.as_ref()?;
        match zipfile::read_chunk(archive, self.layer, coord, self.size) {
            Ok(Some(chunk)) => {
                if let Some(swatches) = self.swatches {
                    if let Err(e) = chunk.check(swatches) {
                        log::error!("chunk {coord} from archive: {e}");
                        return None;
                    }
                }
                log::trace!("faulted in chunk {coord} ({} pixels)", chunk.len());
                Some(chunk)
            }
            Ok(None) => None,
            Err(e) => {
                log::error!("reading chunk {coord} from archive: {e}");
                None
            }
        }
    }

    /// The palette index at a world point.
    #[must_use]
    pub fn get(&self, p: Point) -> Option<PaletteIndex> {
        if self.size == 0 {
            return None;
        }
        self.with_chunk(self.chunk_coord(p), |chunk| chunk.get(p))
            .flatten()
    }
    /// The swatch at a world point. [`Error::NotFound`] if there's no pixel there.
    pub fn get_swatch<'p>(&self, p: Point, palette: &'p Palette) -> Result<&'p Swatch, Error> {
        let index = self
            .get(p)
            .ok_or_else(|| Error::not_found(format_args!("pixel {p}")))?;
        palette.at(index)
    }
    /// Paint a pixel, creating its chunk if needed. Returns the index that was there before.
    pub fn set(&mut self, p: Point, index: PaletteIndex) -> Option<PaletteIndex> {
        if self.size == 0 {
            return None;
        }
        let coord = self.chunk_coord(p);
        // Faults in an archived chunk so its other pixels survive.
        if self.get_chunk(coord).is_none() {
            self.erased.remove(&coord);
            let size = self.size;
            let mut chunk = self
                .chunks
                .remove(&coord)
                .unwrap_or_else(|| Chunk::new(coord, size));
            let previous = chunk.set(p, index);
            self.chunks.insert(coord, chunk);
            return previous;
        }
        self.chunks.get_mut(&coord).and_then(|chunk| chunk.set(p, index))
    }
    /// Erase a pixel, pruning its chunk if that empties it.
    pub fn delete(&mut self, p: Point) -> Result<PaletteIndex, Error> {
        let coord = self.chunk_coord(p);
        let chunk = self
            .get_chunk(coord)
            .ok_or_else(|| Error::not_found(format_args!("chunk {coord} for pixel {p}")))?;
        let removed = chunk.delete(p)?;
        if chunk.is_empty() {
            self.prune_chunk(coord);
        }
        Ok(removed)
    }
    /// Paint every pixel of a rect.
    pub fn set_rect(&mut self, rect: Rect, index: PaletteIndex) {
        for p in rect.points() {
            self.set(p, index);
        }
    }
    /// Erase every pixel of a rect. Returns how many were actually removed.
    pub fn delete_rect(&mut self, rect: Rect) -> usize {
        rect.points().filter(|&p| self.delete(p).is_ok()).count()
    }
    /// Every pixel of a rect that is set. Used to remember what a thick stroke paints over.
    pub fn read_rect(&self, rect: Rect) -> Vec<(Point, PaletteIndex)> {
        rect.points()
            .filter_map(|p| self.get(p).map(|index| (p, index)))
            .collect()
    }
    fn prune_chunk(&mut self, coord: Point) {
        self.chunks.remove(&coord);
        if self
            .archive
            .as_ref()
            .is_some_and(|a| zipfile::chunk_member(a, self.layer, coord).is_some())
        {
            self.erased.insert(coord);
        }
        log::trace!("pruned empty chunk {coord}");
    }

    /// Every chunk coordinate, in memory or in the archive, sorted.
    #[must_use]
    pub fn iter_chunks(&self) -> Vec<Point> {
        let mut coords: HashSet<Point> = self
            .chunks
            .iter()
            .filter(|(_, c)| !c.is_empty())
            .map(|(&p, _)| p)
            .collect();
        coords.extend(self.faulted.lock().keys().copied());
        if let Some(archive) = &self.archive {
            coords.extend(
                archive
                    .chunk_coords(self.layer)
                    .into_iter()
                    .filter(|c| !self.erased.contains(c)),
            );
        }
        let mut coords: Vec<Point> = coords.into_iter().collect();
        coords.sort_unstable_by_key(|p| (p.y, p.x));
        coords
    }
    /// Fault in every chunk. Used before whole-drawing passes.
    pub fn load_all(&mut self) -> usize {
        let mut loaded = 0;
        for coord in self.iter_chunks() {
            if !self.chunks.contains_key(&coord) && self.get_chunk(coord).is_some() {
                loaded += 1;
            }
        }
        loaded
    }
    /// Chunks currently in memory.
    pub fn iter_cached(&mut self) -> impl Iterator<Item = &Chunk> {
        self.absorb_faulted();
        self.chunks.values()
    }
    /// Every chunk, faulting in the whole drawing.
    pub fn iter_chunks_mut(&mut self) -> impl Iterator<Item = &mut Chunk> {
        self.load_all();
        self.chunks.values_mut().filter(|c| !c.is_empty())
    }
    /// Every pixel of the drawing.
    pub fn iter(&mut self) -> impl Iterator<Item = (Point, PaletteIndex)> + '_ {
        self.load_all();
        self.chunks.values().flat_map(Chunk::iter)
    }
    /// Every pixel inside `viewport`.
    pub fn iter_viewport(&mut self, viewport: Rect) -> impl Iterator<Item = (Point, PaletteIndex)> + '_ {
        let coords = self.iter_viewport_chunks(viewport);
        let chunks = &self.chunks;
        coords
            .into_iter()
            .filter_map(move |coord| chunks.get(&coord))
            .flat_map(move |chunk| chunk.iter_viewport(viewport))
    }
    /// Coordinates of the chunks touching `viewport`, faulting them in.
    ///
    /// The viewport is sampled every quarter chunk, so chunks are visited in scan order with no repeats.
    pub fn iter_viewport_chunks(&mut self, viewport: Rect) -> Vec<Point> {
        if self.size == 0 || viewport.is_empty() {
            return vec![];
        }
        let step = (self.size / 4).max(1);
        let mut seen = HashSet::new();
        let mut out = vec![];
        let far = viewport.bottom_right();
        let mut y = viewport.y;
        loop {
            let mut x = viewport.x;
            loop {
                let coord = self.chunk_coord(Point::new(x.min(far.x - 1), y.min(far.y - 1)));
                if seen.insert(coord) && self.get_chunk(coord).is_some() {
                    out.push(coord);
                }
                if x >= far.x - 1 {
                    break;
                }
                x += step;
            }
            if y >= far.y - 1 {
                break;
            }
            y += step;
        }
        out
    }

    /// Lowest and highest chunk coordinates. Always includes the origin chunk.
    #[must_use]
    pub fn bounds(&self) -> (Point, Point) {
        let mut low = Point::ORIGIN;
        let mut high = Point::ORIGIN;
        for coord in self.iter_chunks() {
            low.x = low.x.min(coord.x);
            low.y = low.y.min(coord.y);
            high.x = high.x.max(coord.x);
            high.y = high.y.max(coord.y);
        }
        (low, high)
    }
    /// Area spanned by the chunks.
    ///
    /// Unlike every other rect in the crate, `w` and `h` here are the far corner's *coordinates*
    /// (inclusive), not a size: `(low * size, high * size + size - 1)`.
    #[must_use]
    pub fn world_size(&self) -> Rect {
        let (low, high) = self.bounds();
        let size = self.size;
        Rect::new(
            low.x * size,
            low.y * size,
            high.x * size + (size - 1).max(0),
            high.y * size + (size - 1).max(0),
        )
    }
    /// [`Chunker::world_size`] moved to the origin, with `w`, `h` the total extent.
    #[must_use]
    pub fn world_size_positive(&self) -> Rect {
        let world = self.world_size();
        Rect::new(0, 0, world.x.abs() + world.w, world.y.abs() + world.h)
    }

    /// Mark every in-memory chunk for redraw.
    pub fn redraw(&mut self) {
        self.absorb_faulted();
        for chunk in self.chunks.values_mut() {
            chunk.set_dirty();
        }
    }
    /// Chunks in memory.
    #[must_use]
    pub fn cache_size(&self) -> usize {
        self.chunks.len() + self.faulted.lock().len()
    }
    /// Drop every in-memory chunk, erased and modified or not. They fault back in from the archive.
    pub fn clear_cache(&mut self) {
        self.chunks.clear();
        self.faulted.get_mut().clear();
    }
    /// Total pixels in memory.
    #[must_use]
    pub fn cached_pixels(&self) -> usize {
        self.chunks.values().map(Chunk::len).sum()
    }
}
