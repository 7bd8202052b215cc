//! Keeping the chunk cache bounded: freeing cold chunks of archived drawings, and warming or tearing down
//! chunk bitmaps around the viewport. None of this affects what the drawing contains.

use super::Chunker;
use crate::{
    chunk::Chunk,
    geom::{Point, Rect},
    palette::Palette,
    settings::Settings,
};
use hashbrown::{HashMap, HashSet};
use rayon::iter::{IntoParallelIterator, ParallelIterator};

/// Tunables for the chunk cache, normally taken from [`Settings`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CachePolicy {
    /// Cap on chunks in memory. `0` disables it.
    pub lru_cache_max: usize,
    /// Request sets rotate every this many ticks.
    pub free_cache_ticks: u64,
    /// How long an unrequested chunk waits before being freed.
    pub chopping_block_ticks: u64,
}
impl Default for CachePolicy {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}
impl From<&Settings> for CachePolicy {
    fn from(settings: &Settings) -> Self {
        Self {
            lru_cache_max: settings.lru_cache_max,
            free_cache_ticks: settings.free_cache_ticks.max(1),
            chopping_block_ticks: settings.chopping_block_ticks,
        }
    }
}

/// Which chunks were asked for recently.
#[derive(Debug, Default)]
pub(super) struct Requests {
    this_tick: HashSet<Point>,
    n1: HashSet<Point>,
    n2: HashSet<Point>,
    /// Chunk to the tick after which it gets freed.
    chopping_block: HashMap<Point, u64>,
    last_tick: Option<u64>,
}

impl Chunker {
    pub(super) fn log_access(&self, coord: Point) {
        let mut requests = self.requests.lock();
        requests.chopping_block.remove(&coord);
        requests.this_tick.insert(coord);
    }
    /// Evict unmodified chunks (other than `keep`) while over the cap.
    pub(super) fn enforce_lru(&mut self, keep: Point) {
        let cap = self.policy.lru_cache_max;
        if cap == 0 || self.chunks.len() <= cap {
            return;
        }
        log::error!(
            "chunks in memory ({}) exceed the cache cap of {cap}, freeing some",
            self.chunks.len()
        );
        let over = self.chunks.len() - cap;
        let victims: Vec<Point> = self
            .chunks
            .iter()
            .filter(|(&coord, chunk)| coord != keep && !chunk.is_modified() && !chunk.is_empty())
            .map(|(&coord, _)| coord)
            .take(over)
            .collect();
        for coord in victims {
            self.chunks.remove(&coord);
        }
    }

    /// Periodic cache upkeep, called once per game tick.
    ///
    /// Every [`CachePolicy::free_cache_ticks`], chunks that were requested two rotations ago but not since
    /// go on the chopping block, and chunks that sat there longer than
    /// [`CachePolicy::chopping_block_ticks`] are freed. Returns how many were freed, or `None` if there
    /// is no archive to reload them from.
    pub fn free_caches(&mut self, tick: u64) -> Option<usize> {
        self.archive.as_ref()?;
        self.absorb_faulted();
        let policy = self.policy;
        let expired: Vec<Point> = {
            let requests = self.requests.get_mut();
            let last = *requests.last_tick.get_or_insert(tick);
            if tick.saturating_sub(last) % policy.free_cache_ticks != 0 {
                return Some(0);
            }
            let Requests {
                this_tick,
                n1,
                n2,
                chopping_block,
                last_tick,
            } = requests;
            for coord in n2.iter() {
                if !this_tick.contains(coord) {
                    chopping_block.insert(*coord, tick + policy.chopping_block_ticks);
                }
            }
            let expired = chopping_block
                .iter()
                .filter(|(_, &at)| tick > at)
                .map(|(&coord, _)| coord)
                .collect::<Vec<_>>();
            for coord in &expired {
                chopping_block.remove(coord);
            }
            *n2 = std::mem::take(n1);
            *n1 = std::mem::take(this_tick);
            *last_tick = Some(tick);
            expired
        };
        let freed = expired.into_iter().filter(|&c| self.free_chunk(c)).count();
        if freed > 0 {
            log::debug!("freed {freed} cold chunks at tick {tick}");
        }
        Some(freed)
    }
    /// Drop one chunk from memory so it will be read back from the archive.
    ///
    /// Modified or emptied chunks are kept, since the archive copy is stale.
    pub fn free_chunk(&mut self, coord: Point) -> bool {
        if self.archive.is_none() {
            return false;
        }
        match self.chunks.get(&coord) {
            Some(chunk) if chunk.is_modified() || chunk.is_empty() => false,
            Some(_) => {
                self.chunks.remove(&coord);
                true
            }
            None => false,
        }
    }
    /// Chunks waiting to be freed.
    #[must_use]
    pub fn gc_size(&self) -> usize {
        self.requests.lock().chopping_block.len()
    }

    /// Render bitmaps for up to `n` chunks that lack one, in parallel. Returns how many still lack one.
    pub fn prerender_n(&mut self, n: usize, palette: &Palette) -> usize {
        self.load_all();
        let (todo, missing): (Vec<&mut Chunk>, usize) = {
            let mut todo = vec![];
            let mut missing = 0;
            for chunk in self.chunks.values_mut().filter(|c| !c.has_bitmap()) {
                if todo.len() < n {
                    todo.push(chunk);
                } else {
                    missing += 1;
                }
            }
            (todo, missing)
        };
        todo.into_par_iter().for_each(|chunk| {
            chunk.bitmap(palette);
        });
        missing
    }
    /// Warm bitmaps of chunks inside `viewport` and tear down the rest. Returns `(warmed, torn down)`.
    pub fn load_unload(&mut self, viewport: Rect, palette: &Palette) -> (usize, usize) {
        let inside: HashSet<Point> = self.iter_viewport_chunks(viewport).into_iter().collect();
        let mut warm = vec![];
        let mut freed = 0;
        for (coord, chunk) in &mut self.chunks {
            if inside.contains(coord) {
                if !chunk.has_bitmap() {
                    warm.push(chunk);
                }
            } else if chunk.teardown() > 0 {
                freed += 1;
            }
        }
        let warmed = warm.len();
        warm.into_par_iter().for_each(|chunk| {
            chunk.bitmap(palette);
        });
        (warmed, freed)
    }
}
