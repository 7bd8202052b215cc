use super::Chunker;
use crate::chunk::ChunkType;
use rayon::iter::{IntoParallelIterator, ParallelIterator};

impl Chunker {
    /// Migrate every map chunk to RLE storage, across the whole drawing. Returns how many changed.
    ///
    /// Run before saving, so chunks go to disk in the compact form.
    pub fn optimize_accessors(&mut self) -> usize {
        self.load_all();
        let maps: Vec<_> = self
            .chunks
            .values_mut()
            .filter(|chunk| chunk.kind() == ChunkType::Map)
            .collect();
        let migrated: usize = maps
            .into_par_iter()
            .filter(|chunk| !chunk.is_empty())
            .map(|chunk| usize::from(chunk.migrate_rle()))
            .sum();
        if migrated > 0 {
            log::info!("optimized {migrated} chunks to RLE on layer {}", self.layer);
        }
        migrated
    }
}

#[cfg(test)]
mod test {
    use crate::{
        chunk::ChunkType,
        chunker::Chunker,
        geom::{Point, Rect},
        palette::PaletteIndex,
    };

    #[test]
    fn migrates_everything_once() {
        let mut chunker = Chunker::new(32);
        chunker.set_rect(Rect::new(-40, -40, 80, 80), PaletteIndex(4));
        let total = chunker.iter_chunks().len();
        assert_eq!(chunker.optimize_accessors(), total);
        assert_eq!(chunker.optimize_accessors(), 0);
        assert!(chunker.iter_cached().all(|c| c.kind() == ChunkType::Rle));
        // Still the same pixels.
        assert_eq!(chunker.get(Point::new(39, 39)), Some(PaletteIndex(4)));
        assert_eq!(chunker.iter().count(), 80 * 80);
    }
}
