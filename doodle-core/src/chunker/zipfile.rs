//! Moving chunks between a [`Chunker`] and archives, or the inline json of the single-file formats.

use super::Chunker;
use crate::{
    archive::{self, ArchiveHandle, ChunkFileFormat},
    chunk::Chunk,
    error::Error,
    geom::Point,
};
use hashbrown::HashSet;
use std::collections::BTreeMap;

/// Name of the archive member holding a chunk, preferring the binary sidecar.
pub(super) fn chunk_member(archive: &ArchiveHandle, layer: usize, coord: Point) -> Option<String> {
    [ChunkFileFormat::Bin, ChunkFileFormat::Json]
        .into_iter()
        .map(|format| archive::chunk_name(layer, coord, format))
        .find(|name| archive.contains(name))
}

/// Decode a chunk from whichever sidecar the archive has for it.
pub(super) fn read_chunk(
    archive: &ArchiveHandle,
    layer: usize,
    coord: Point,
    size: i32,
) -> Result<Option<Chunk>, Error> {
    let Some(name) = chunk_member(archive, layer, coord) else {
        return Ok(None);
    };
    let bytes = archive.read(&name)?;
    let chunk = if name.ends_with(".bin") {
        Chunk::decode(coord, size, &bytes)?
    } else {
        Chunk::from_json_bytes(coord, size, &bytes)?
    };
    Ok(Some(chunk))
}

fn write_chunk<W: std::io::Write + std::io::Seek>(
    zip: &mut zip::ZipWriter<W>,
    layer: usize,
    chunk: &Chunk,
    format: ChunkFileFormat,
) -> Result<(), Error> {
    use std::io::Write as _;
    let name = archive::chunk_name(layer, chunk.coord(), format);
    let data = match format {
        ChunkFileFormat::Json => chunk.to_json_bytes()?,
        ChunkFileFormat::Bin => chunk.encode(),
    };
    zip.start_file(name.as_str(), zip::write::FileOptions::default())?;
    zip.write_all(&data)?;
    log::trace!("wrote chunk {name} ({} bytes)", data.len());
    Ok(())
}

/// Json shape of a chunker inside a drawing header: `{"size": 128, "chunks": {"x,y": chunk}}`.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct ChunkerJson {
    pub size: i32,
    #[serde(default)]
    pub chunks: BTreeMap<String, serde_json::Value>,
}

impl Chunker {
    /// Write this layer's chunks into a new archive being built.
    ///
    /// Archived chunks that weren't loaded are copied across untouched (or re-encoded, if they're stored in
    /// the other sidecar format), then every in-memory chunk is written. Memory is left alone: the edits
    /// are only dropped by [`Chunker::reattach`], once the new archive holds them.
    pub fn write_zip<W: std::io::Write + std::io::Seek>(
        &mut self,
        zip: &mut zip::ZipWriter<W>,
        format: ChunkFileFormat,
    ) -> Result<usize, Error> {
        self.absorb_faulted();
        let mut written: HashSet<Point> = HashSet::new();

        if let Some(archive) = self.archive.clone() {
            for coord in archive.chunk_coords(self.layer) {
                if self.erased.contains(&coord) {
                    log::debug!("skip copying chunk {coord}: erased");
                    continue;
                }
                if self.chunks.contains_key(&coord) {
                    continue;
                }
                if !written.insert(coord) {
                    log::warn!("skip copying duplicate chunk {coord}");
                    continue;
                }
                let Some(name) = chunk_member(&archive, self.layer, coord) else {
                    continue;
                };
                let stored_as = archive::parse_chunk_name(&name).map(|(_, _, f)| f);
                if stored_as == Some(format) {
                    archive.raw_copy(&name, zip)?;
                } else {
                    log::debug!("re-encoding chunk {name} as {format}");
                    match read_chunk(&archive, self.layer, coord, self.size)? {
                        Some(chunk) if !chunk.is_empty() => {
                            write_chunk(zip, self.layer, &chunk, format)?;
                        }
                        _ => {
                            written.remove(&coord);
                        }
                    }
                }
            }
        }

        let mut coords: Vec<Point> = self.chunks.keys().copied().collect();
        coords.sort_unstable_by_key(|p| (p.y, p.x));
        for coord in coords {
            let Some(chunk) = self.chunks.get(&coord) else {
                continue;
            };
            if chunk.is_empty() {
                continue;
            }
            if !written.insert(coord) {
                return Err(Error::Invariant(format!(
                    "chunk {coord} written to archive twice"
                )));
            }
            write_chunk(zip, self.layer, chunk, format)?;
        }

        log::debug!(
            "wrote {} chunks of layer {} to zip",
            written.len(),
            self.layer
        );
        Ok(written.len())
    }

    /// Inline json form with every chunk embedded, for the single-file formats.
    pub fn to_json(&mut self) -> ChunkerJson {
        self.load_all();
        let chunks = self
            .chunks
            .iter()
            .filter(|(_, chunk)| !chunk.is_empty())
            .map(|(coord, chunk)| (coord.to_string(), chunk.to_json()))
            .collect();
        ChunkerJson {
            size: self.size,
            chunks,
        }
    }
    /// Json form for archives, where chunks live in their own members.
    #[must_use]
    pub fn to_json_header(&self) -> ChunkerJson {
        ChunkerJson {
            size: self.size,
            chunks: BTreeMap::new(),
        }
    }
    pub fn from_json(json: ChunkerJson) -> Result<Self, Error> {
        let mut chunker = Self::new(json.size);
        for (key, value) in json.chunks {
            let coord: Point = key.parse()?;
            let chunk = Chunk::from_json(coord, chunker.size, value)?;
            if !chunk.is_empty() {
                chunker.chunks.insert(coord, chunk);
            }
        }
        Ok(chunker)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{geom::Rect, palette::PaletteIndex};

    fn save(chunker: &mut Chunker, format: ChunkFileFormat) -> ArchiveHandle {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        chunker.write_zip(&mut zip, format).unwrap();
        let archive = ArchiveHandle::from_bytes(zip.finish().unwrap().into_inner()).unwrap();
        chunker.reattach(archive.clone());
        archive
    }

    #[test]
    fn save_and_page_back() {
        let mut chunker = Chunker::new(16);
        chunker.set_rect(Rect::new(0, 0, 48, 4), PaletteIndex(1));
        chunker.set(Point::new(-1, -1), PaletteIndex(2));

        let archive = save(&mut chunker, ChunkFileFormat::Json);
        assert!(archive.contains("chunks/0/0,0.json"));
        assert!(archive.contains("chunks/0/-1,-1.json"));
        assert_eq!(chunker.cache_size(), 0);

        assert_eq!(chunker.get(Point::new(47, 3)), Some(PaletteIndex(1)));
        assert_eq!(chunker.get(Point::new(-1, -1)), Some(PaletteIndex(2)));
        assert_eq!(chunker.iter_chunks().len(), 4);
        assert_eq!(chunker.iter().count(), 48 * 4 + 1);
    }
    #[test]
    fn resave_copies_and_erases() {
        let mut chunker = Chunker::new(16);
        chunker.set_rect(Rect::new(0, 0, 48, 1), PaletteIndex(1));
        save(&mut chunker, ChunkFileFormat::Json);

        // Erase chunk 1 entirely, edit chunk 2, leave chunk 0 cold.
        assert_eq!(chunker.delete_rect(Rect::new(16, 0, 16, 1)), 16);
        chunker.set(Point::new(40, 5), PaletteIndex(3));
        assert_eq!(chunker.iter_chunks(), [Point::new(0, 0), Point::new(2, 0)]);

        let archive = save(&mut chunker, ChunkFileFormat::Bin);
        // Chunk 0 was re-encoded into the new format.
        assert!(archive.contains("chunks/0/0,0.bin"));
        assert!(!archive.contains("chunks/0/1,0.bin"));
        assert!(!archive.contains("chunks/0/1,0.json"));
        assert_eq!(chunker.get(Point::new(3, 0)), Some(PaletteIndex(1)));
        assert_eq!(chunker.get(Point::new(20, 0)), None);
        assert_eq!(chunker.get(Point::new(40, 5)), Some(PaletteIndex(3)));
    }
    #[test]
    fn layers_are_separate() {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        let mut a = Chunker::new(8);
        a.set(Point::new(1, 1), PaletteIndex(0));
        let mut b = Chunker::new(8).with_layer(1);
        b.set(Point::new(20, 20), PaletteIndex(1));
        a.write_zip(&mut zip, ChunkFileFormat::Json).unwrap();
        b.write_zip(&mut zip, ChunkFileFormat::Json).unwrap();
        let archive = ArchiveHandle::from_bytes(zip.finish().unwrap().into_inner()).unwrap();
        a.reattach(archive.clone());
        b.reattach(archive);
        assert_eq!(a.iter_chunks(), [Point::new(0, 0)]);
        assert_eq!(b.iter_chunks(), [Point::new(2, 2)]);
        assert_eq!(b.get(Point::new(1, 1)), None);
    }
    #[test]
    fn failed_save_keeps_edits() {
        let mut chunker = Chunker::new(16);
        chunker.set_rect(Rect::new(0, 0, 32, 1), PaletteIndex(1));
        save(&mut chunker, ChunkFileFormat::Bin);

        chunker.set(Point::new(3, 0), PaletteIndex(2));
        assert_eq!(chunker.delete_rect(Rect::new(16, 0, 16, 1)), 16);
        // Written, but the save is abandoned before the new archive is attached.
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        chunker.write_zip(&mut zip, ChunkFileFormat::Bin).unwrap();
        drop(zip);
        assert!(chunker.archive().is_some_and(|a| a.contains("chunks/0/1,0.bin")));
        assert_eq!(chunker.get(Point::new(3, 0)), Some(PaletteIndex(2)));
        assert_eq!(chunker.get(Point::new(20, 0)), None);

        // A later save still carries the edit and the erase.
        save(&mut chunker, ChunkFileFormat::Bin);
        assert_eq!(chunker.cache_size(), 0);
        assert_eq!(chunker.get(Point::new(3, 0)), Some(PaletteIndex(2)));
        assert_eq!(chunker.get(Point::new(20, 0)), None);
        assert_eq!(chunker.iter_chunks(), [Point::new(0, 0)]);
    }
    #[test]
    fn inline_json() {
        let mut chunker = Chunker::new(8);
        chunker.set_rect(Rect::new(-4, -4, 8, 8), PaletteIndex(0));
        let json = chunker.to_json();
        assert_eq!(json.chunks.len(), 4);
        let text = serde_json::to_string(&json).unwrap();
        let back: ChunkerJson = serde_json::from_str(&text).unwrap();
        let mut back = Chunker::from_json(back).unwrap();
        assert_eq!(back.size(), 8);
        assert_eq!(back.iter().count(), 64);
        assert!(chunker.to_json_header().chunks.is_empty());
    }
}
