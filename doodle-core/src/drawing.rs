//! # Drawings
//!
//! What levels and doodads have in common: the base metadata block and the three file formats they can be
//! stored in. The format of a file on disk is sniffed from its first bytes, so all three load the same way.

use crate::{archive::ArchiveHandle, error::Error, settings::Settings};
use std::io::{Read, Write};

/// Version of the drawing file format written by this crate.
pub const FILE_VERSION: u32 = 1;
/// Recorded in every saved drawing.
pub const GAME_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    serde::Serialize,
    serde::Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum DrawingFormat {
    /// One json document with every chunk inline.
    Json,
    /// The json document, gzipped.
    Gzip,
    /// Zip with a json header and chunks and assets as separate members.
    #[default]
    Zipfile,
}
impl DrawingFormat {
    /// Tell the format from a file's leading bytes.
    pub fn sniff(bytes: &[u8]) -> Result<Self, Error> {
        match bytes {
            [b'{', ..] => Ok(Self::Json),
            [0x1F, 0x8B, ..] => Ok(Self::Gzip),
            [b'P', b'K', 0x03, 0x04, ..] | [b'P', b'K', 0x05, 0x06, ..] => Ok(Self::Zipfile),
            _ => {
                // Json may have leading whitespace.
                let first = bytes.iter().find(|b| !b.is_ascii_whitespace());
                if first == Some(&b'{') {
                    Ok(Self::Json)
                } else {
                    Err(Error::UnsupportedFormat(
                        "not a json, gzip or zip drawing".to_owned(),
                    ))
                }
            }
        }
    }
}

/// Metadata shared by levels and doodads.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Base {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub game_version: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub locked: bool,
}
impl Default for Base {
    fn default() -> Self {
        Self {
            version: FILE_VERSION,
            game_version: GAME_VERSION.to_owned(),
            title: "Untitled".to_owned(),
            author: default_author(),
            locked: false,
        }
    }
}

/// The OS user name, as a guess at who is drawing.
#[must_use]
pub fn default_author() -> String {
    ["USER", "USERNAME"]
        .into_iter()
        .find_map(|var| std::env::var(var).ok().filter(|v| !v.is_empty()))
        .unwrap_or_else(|| "Guest".to_owned())
}

pub fn gzip(bytes: &[u8]) -> Result<Vec<u8>, Error> {
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(bytes)?;
    Ok(encoder.finish()?)
}
pub fn gunzip(bytes: &[u8]) -> Result<Vec<u8>, Error> {
    let mut out = Vec::new();
    flate2::read::GzDecoder::new(bytes).read_to_end(&mut out)?;
    Ok(out)
}
/// Serialize a header, pretty printed if asked to.
pub fn to_json_bytes<T: serde::Serialize>(value: &T, indent: bool) -> Result<Vec<u8>, Error> {
    Ok(if indent {
        serde_json::to_vec_pretty(value)?
    } else {
        serde_json::to_vec(value)?
    })
}

/// A level or doodad: something with a header that saves in any [`DrawingFormat`].
pub trait Drawing: Sized {
    /// Archive member holding the header json.
    const HEADER: &'static str;
    /// File extension, with the dot.
    const EXTENSION: &'static str;

    fn base(&self) -> &Base;
    fn base_mut(&mut self) -> &mut Base;
    /// Header json. `inline` embeds chunks and files, for the single-file formats.
    fn to_header(&mut self, inline: bool) -> Result<serde_json::Value, Error>;
    /// Rebuild from header json. Chunks and files not inline are paged from `archive`.
    fn from_header(header: serde_json::Value, archive: Option<ArchiveHandle>) -> Result<Self, Error>;
    /// Write chunk and file members into a new archive.
    fn write_members<W: Write + std::io::Seek>(
        &mut self,
        zip: &mut zip::ZipWriter<W>,
        settings: &Settings,
    ) -> Result<(), Error>;
    /// Read chunks and files from a newly written archive from now on.
    fn attach_archive(&mut self, archive: ArchiveHandle);
    /// Hook run before any save.
    fn prepare_save(&mut self, settings: &Settings) {
        let _ = settings;
    }

    /// Encode in the given format.
    fn to_bytes(&mut self, format: DrawingFormat, settings: &Settings) -> Result<Vec<u8>, Error> {
        {
            let base = self.base_mut();
            base.version = FILE_VERSION;
            GAME_VERSION.clone_into(&mut base.game_version);
        }
        self.prepare_save(settings);
        let bytes = match format {
            DrawingFormat::Json => to_json_bytes(&self.to_header(true)?, settings.json_indent)?,
            DrawingFormat::Gzip => gzip(&to_json_bytes(&self.to_header(true)?, settings.json_indent)?)?,
            DrawingFormat::Zipfile => {
                let mut zip = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
                self.write_members(&mut zip, settings)?;
                let header = to_json_bytes(&self.to_header(false)?, settings.json_indent)?;
                zip.start_file(Self::HEADER, zip::write::FileOptions::default())?;
                zip.write_all(&header)?;
                let bytes = zip.finish()?.into_inner();
                self.attach_archive(ArchiveHandle::from_bytes(bytes.clone())?);
                bytes
            }
        };
        log::debug!(
            "encoded {} {:?} as {format} ({})",
            Self::EXTENSION,
            self.base().title,
            human_bytes::human_bytes(bytes.len() as f64)
        );
        Ok(bytes)
    }
    /// Decode any format, sniffed from the bytes.
    fn from_bytes(bytes: Vec<u8>) -> Result<Self, Error> {
        match DrawingFormat::sniff(&bytes)? {
            DrawingFormat::Json => Self::from_header(serde_json::from_slice(&bytes)?, None),
            DrawingFormat::Gzip => {
                log::debug!("decompressing gzip drawing");
                Self::from_header(serde_json::from_slice(&gunzip(&bytes)?)?, None)
            }
            DrawingFormat::Zipfile => {
                let archive = ArchiveHandle::from_bytes(bytes)?;
                let header = archive.read(Self::HEADER)?;
                Self::from_header(serde_json::from_slice(&header)?, Some(archive))
            }
        }
    }
    /// Load from disk. Zip drawings are paged from the file as needed.
    fn load_file(path: impl AsRef<std::path::Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let mut head = [0u8; 4];
        let read = {
            let mut file = std::fs::File::open(path)?;
            let mut read = 0;
            while read < head.len() {
                match file.read(&mut head[read..])? {
                    0 => break,
                    n => read += n,
                }
            }
            read
        };
        log::info!("loading {}", path.display());
        if matches!(DrawingFormat::sniff(&head[..read]), Ok(DrawingFormat::Zipfile)) {
            let archive = ArchiveHandle::open(path)?;
            let header = archive.read(Self::HEADER)?;
            return Self::from_header(serde_json::from_slice(&header)?, Some(archive));
        }
        Self::from_bytes(std::fs::read(path)?)
    }
    /// Save atomically: write a temp file next to `path` and move it into place.
    ///
    /// Zip drawings then page from the new file.
    fn write_file(
        &mut self,
        path: impl AsRef<std::path::Path>,
        format: DrawingFormat,
        settings: &Settings,
    ) -> Result<(), Error> {
        let path = path.as_ref();
        let bytes = self.to_bytes(format, settings)?;
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| std::path::Path::new("."));
        let mut temp = tempfile::NamedTempFile::new_in(dir)?;
        temp.write_all(&bytes)?;
        temp.as_file().sync_all()?;
        temp.persist(path).map_err(|e| e.error)?;
        log::info!(
            "wrote {} ({})",
            path.display(),
            human_bytes::human_bytes(bytes.len() as f64)
        );
        if format == DrawingFormat::Zipfile {
            self.attach_archive(ArchiveHandle::open(path)?);
        }
        Ok(())
    }
}
