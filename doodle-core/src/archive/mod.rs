//! # Archive
//!
//! Read side of the zip container that drawings are saved in. An [`ArchiveHandle`] is shared between every
//! chunker of a drawing (one per doodad layer) and its embedded [`files::FileSystem`], so that chunks and
//! assets can be faulted in lazily long after the drawing was opened.
//!
//! Archives are never written in place: saving builds a brand new zip and swaps the handle, so readers
//! holding the old handle keep working against the old bytes.

pub mod files;

use crate::{error::Error, geom::Point};
use std::io::{Read, Seek};
use std::sync::Arc;

/// Name of the header member of a level archive.
pub const LEVEL_HEADER: &str = "level.json";
/// Name of the header member of a doodad archive.
pub const DOODAD_HEADER: &str = "doodad.json";

/// Anything the zip reader can sit on.
#[derive(Debug)]
pub enum Source {
    Memory(std::io::Cursor<Vec<u8>>),
    File(std::io::BufReader<std::fs::File>),
}
impl Read for Source {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            Self::Memory(cursor) => cursor.read(buf),
            Self::File(file) => file.read(buf),
        }
    }
}
impl Seek for Source {
    fn seek(&mut self, pos: std::io::SeekFrom) -> std::io::Result<u64> {
        match self {
            Self::Memory(cursor) => cursor.seek(pos),
            Self::File(file) => file.seek(pos),
        }
    }
}

pub struct Archive {
    // ZipArchive needs `&mut` for every read, so reads are serialized here.
    zip: parking_lot::Mutex<zip::ZipArchive<Source>>,
    names: Vec<String>,
}
impl std::fmt::Debug for Archive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Archive")
            .field("members", &self.names.len())
            .finish_non_exhaustive()
    }
}

/// Cheaply clonable, thread safe, read-only handle to an opened archive.
#[derive(Clone, Debug)]
pub struct ArchiveHandle(Arc<Archive>);

impl ArchiveHandle {
    pub fn from_source(source: Source) -> Result<Self, Error> {
        let zip = zip::ZipArchive::new(source)?;
        let mut names: Vec<String> = zip.file_names().map(ToOwned::to_owned).collect();
        names.sort_unstable();
        log::debug!("opened archive with {} members", names.len());
        Ok(Self(Arc::new(Archive {
            zip: parking_lot::Mutex::new(zip),
            names,
        })))
    }
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, Error> {
        Self::from_source(Source::Memory(std::io::Cursor::new(bytes)))
    }
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self, Error> {
        let file = std::fs::File::open(path.as_ref())?;
        Self::from_source(Source::File(std::io::BufReader::new(file)))
    }
    /// Sorted member names.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.0.names
    }
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.names.binary_search_by(|n| n.as_str().cmp(name)).is_ok()
    }
    /// Member names under a prefix, e.g. `assets/doodads/`.
    pub fn names_with_prefix<'s>(&'s self, prefix: &'s str) -> impl Iterator<Item = &'s str> + 's {
        let start = self.0.names.partition_point(|n| n.as_str() < prefix);
        self.0.names[start..]
            .iter()
            .take_while(move |n| n.starts_with(prefix))
            .map(String::as_str)
    }
    /// Read a whole member.
    pub fn read(&self, name: &str) -> Result<Vec<u8>, Error> {
        let mut zip = self.0.zip.lock();
        let mut file = match zip.by_name(name) {
            Ok(file) => file,
            Err(zip::result::ZipError::FileNotFound) => {
                return Err(Error::not_found(format_args!("archive member {name}")))
            }
            Err(e) => return Err(e.into()),
        };
        let mut out = Vec::with_capacity(usize::try_from(file.size()).unwrap_or(0));
        file.read_to_end(&mut out)?;
        log::trace!(
            "read {name} from archive ({})",
            human_bytes::human_bytes(out.len() as f64)
        );
        Ok(out)
    }
    /// Copy a member into a new archive without recompressing it.
    pub fn raw_copy<W: std::io::Write + Seek>(
        &self,
        name: &str,
        into: &mut zip::ZipWriter<W>,
    ) -> Result<(), Error> {
        let mut zip = self.0.zip.lock();
        let file = zip.by_name(name)?;
        into.raw_copy_file(file)?;
        Ok(())
    }
    /// Coordinates of every chunk sidecar stored for `layer`, in name order.
    #[must_use]
    pub fn chunk_coords(&self, layer: usize) -> Vec<Point> {
        let prefix = chunk_dir(layer);
        let mut coords: Vec<Point> = self
            .names_with_prefix(&prefix)
            .filter_map(|name| match parse_chunk_name(name) {
                Some((l, coord, _)) if l == layer => Some(coord),
                Some(_) => None,
                None => {
                    log::error!("archive member {name} doesn't name a chunk");
                    None
                }
            })
            .collect();
        coords.dedup();
        coords
    }
    /// Whether two handles refer to the same opened archive.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Sidecar encoding of chunk members.
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ChunkFileFormat {
    #[default]
    Json,
    Bin,
}
impl ChunkFileFormat {
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Bin => "bin",
        }
    }
}

fn chunk_dir(layer: usize) -> String {
    format!("chunks/{layer}/")
}

/// `chunks/<layer>/<x>,<y>.<ext>`
#[must_use]
pub fn chunk_name(layer: usize, coord: Point, format: ChunkFileFormat) -> String {
    format!("chunks/{layer}/{coord}.{}", format.extension())
}

/// Inverse of [`chunk_name`].
#[must_use]
pub fn parse_chunk_name(name: &str) -> Option<(usize, Point, ChunkFileFormat)> {
    let rest = name.strip_prefix("chunks/")?;
    let (layer, file) = rest.split_once('/')?;
    let (coord, ext) = file.rsplit_once('.')?;
    let format = match ext {
        "json" => ChunkFileFormat::Json,
        "bin" => ChunkFileFormat::Bin,
        _ => return None,
    };
    Some((layer.parse().ok()?, coord.parse().ok()?, format))
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use std::io::Write;

    /// Build a small in-memory zip from name/content pairs.
    pub(crate) fn zip_of(members: &[(&str, &[u8])]) -> Vec<u8> {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        for (name, data) in members {
            zip.start_file(*name, zip::write::FileOptions::default())
                .unwrap();
            zip.write_all(data).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn names() {
        assert_eq!(
            chunk_name(0, Point::new(-1, 2), ChunkFileFormat::Json),
            "chunks/0/-1,2.json"
        );
        assert_eq!(
            parse_chunk_name("chunks/3/10,-20.bin"),
            Some((3, Point::new(10, -20), ChunkFileFormat::Bin))
        );
        assert_eq!(parse_chunk_name("chunks/3/10,-20.png"), None);
        assert_eq!(parse_chunk_name("assets/3/10,-20.json"), None);
    }
    #[test]
    fn read_members() {
        let bytes = zip_of(&[
            ("level.json", b"{}"),
            ("chunks/0/0,0.json", b"a"),
            ("chunks/0/1,0.bin", b"b"),
            ("chunks/1/5,5.json", b"c"),
            ("assets/wallpapers/x.png", b"d"),
        ]);
        let archive = ArchiveHandle::from_bytes(bytes).unwrap();
        assert!(archive.contains("level.json"));
        assert_eq!(archive.read("chunks/0/1,0.bin").unwrap(), b"b");
        assert!(archive.read("nope").unwrap_err().is_not_found());
        assert_eq!(
            archive.chunk_coords(0),
            [Point::new(0, 0), Point::new(1, 0)]
        );
        assert_eq!(archive.chunk_coords(1), [Point::new(5, 5)]);
        assert_eq!(
            archive.names_with_prefix("assets/").collect::<Vec<_>>(),
            ["assets/wallpapers/x.png"]
        );

        let clone = archive.clone();
        assert!(clone.ptr_eq(&archive));
    }
    #[test]
    fn not_a_zip() {
        assert!(ArchiveHandle::from_bytes(b"{\"title\":1}".to_vec()).is_err());
    }
}
