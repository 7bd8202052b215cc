//! Files embedded in a drawing: wallpapers, screenshots, and the doodads a level depends on.

use super::ArchiveHandle;
use crate::error::Error;
use base64::Engine as _;
use std::collections::BTreeMap;

/// Every embedded file lives under this prefix. Other archive members belong to the drawing itself.
pub const ASSETS_DIR: &str = "assets/";
pub const DOODADS_DIR: &str = "assets/doodads/";
pub const WALLPAPERS_DIR: &str = "assets/wallpapers/";
pub const SCREENSHOTS_DIR: &str = "assets/screenshots/";

/// Key of an embedded doodad.
#[must_use]
pub fn doodad_key(filename: &str) -> String {
    format!("{DOODADS_DIR}{filename}")
}
/// Key of an embedded wallpaper.
#[must_use]
pub fn wallpaper_key(filename: &str) -> String {
    format!("{WALLPAPERS_DIR}{filename}")
}

/// Embedded file store.
///
/// Files written since the last save live in memory. Everything else is read on demand from the
/// archive the drawing was loaded from, if any.
#[derive(Clone, Debug, Default)]
pub struct FileSystem {
    files: BTreeMap<String, Vec<u8>>,
    deleted: hashbrown::HashSet<String>,
    archive: Option<ArchiveHandle>,
}
impl FileSystem {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
    pub fn attach_archive(&mut self, archive: Option<ArchiveHandle>) {
        self.archive = archive;
    }
    /// The attached archive, if `name` is an embedded file it holds.
    fn archived(&self, name: &str) -> Option<&ArchiveHandle> {
        self.archive
            .as_ref()
            .filter(|a| name.starts_with(ASSETS_DIR) && a.contains(name))
    }
    pub fn get(&self, name: &str) -> Result<Vec<u8>, Error> {
        if let Some(data) = self.files.get(name) {
            return Ok(data.clone());
        }
        match self.archived(name) {
            Some(archive) if !self.deleted.contains(name) => archive.read(name),
            _ => Err(Error::not_found(format_args!("embedded file {name}"))),
        }
    }
    #[must_use]
    pub fn exists(&self, name: &str) -> bool {
        self.files.contains_key(name)
            || (!self.deleted.contains(name) && self.archived(name).is_some())
    }
    pub fn set(&mut self, name: impl Into<String>, data: Vec<u8>) {
        let name = name.into();
        self.deleted.remove(&name);
        self.files.insert(name, data);
    }
    /// Returns whether there was anything to delete.
    pub fn delete(&mut self, name: &str) -> bool {
        let existed = self.exists(name);
        self.files.remove(name);
        if self.archived(name).is_some() {
            self.deleted.insert(name.to_owned());
        }
        existed
    }
    /// Sorted names of every file under `prefix`.
    #[must_use]
    pub fn list(&self, prefix: &str) -> Vec<String> {
        let mut names: std::collections::BTreeSet<String> = self
            .files
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        if let Some(archive) = &self.archive {
            names.extend(
                archive
                    .names_with_prefix(prefix)
                    .filter(|n| {
                        n.starts_with(ASSETS_DIR) && !self.deleted.contains(*n) && !n.ends_with('/')
                    })
                    .map(ToOwned::to_owned),
            );
        }
        names.into_iter().collect()
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.list("").len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write every file as its own zip member, then forget the in-memory copies once a new archive is attached.
    pub fn write_zip<W: std::io::Write + std::io::Seek>(
        &self,
        zip: &mut zip::ZipWriter<W>,
    ) -> Result<usize, Error> {
        use std::io::Write as _;
        let mut written = 0;
        for name in self.list("") {
            if let Some(data) = self.files.get(&name) {
                zip.start_file(name.as_str(), zip::write::FileOptions::default())?;
                zip.write_all(data)?;
            } else if let Some(archive) = &self.archive {
                archive.raw_copy(&name, zip)?;
            }
            written += 1;
        }
        log::debug!("wrote {written} embedded files to zip");
        Ok(written)
    }
    /// Drop files already persisted in `archive` and read through it from now on.
    pub fn reattach(&mut self, archive: ArchiveHandle) {
        self.files.retain(|name, _| !archive.contains(name));
        self.deleted.clear();
        self.archive = Some(archive);
    }

    /// Inline form used by the json formats: `{"name": {"data": "<base64>"}}`.
    pub fn to_json(&self) -> Result<serde_json::Value, Error> {
        let mut map = serde_json::Map::new();
        for name in self.list("") {
            let data = self.get(&name)?;
            map.insert(
                name,
                serde_json::json!({
                    "data": base64::engine::general_purpose::STANDARD.encode(data)
                }),
            );
        }
        Ok(serde_json::Value::Object(map))
    }
    pub fn from_json(value: &serde_json::Value) -> Result<Self, Error> {
        let mut fs = Self::new();
        let Some(map) = value.as_object() else {
            return Ok(fs);
        };
        for (name, file) in map {
            let text = file["data"]
                .as_str()
                .ok_or_else(|| Error::malformed(format_args!("embedded file {name} has no data")))?;
            let data = base64::engine::general_purpose::STANDARD
                .decode(text)
                .map_err(|e| Error::malformed(format_args!("embedded file {name}: {e}")))?;
            fs.files.insert(name.clone(), data);
        }
        Ok(fs)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::archive::test::zip_of;

    #[test]
    fn memory_only() {
        let mut fs = FileSystem::new();
        fs.set(doodad_key("door.doodad"), vec![1, 2, 3]);
        fs.set(wallpaper_key("paper.png"), vec![4]);
        assert_eq!(fs.get("assets/doodads/door.doodad").unwrap(), [1, 2, 3]);
        assert_eq!(fs.list(DOODADS_DIR), ["assets/doodads/door.doodad"]);
        assert!(fs.delete("assets/doodads/door.doodad"));
        assert!(!fs.delete("assets/doodads/door.doodad"));
        assert!(fs.get("assets/doodads/door.doodad").unwrap_err().is_not_found());
        assert_eq!(fs.len(), 1);
    }
    #[test]
    fn layered_over_archive() {
        let archive = ArchiveHandle::from_bytes(zip_of(&[
            ("level.json", b"{}"),
            ("chunks/0/0,0.bin", b"chunk"),
            ("assets/wallpapers/a.png", b"old"),
            ("assets/wallpapers/b.png", b"bee"),
        ]))
        .unwrap();
        let mut fs = FileSystem::new();
        fs.attach_archive(Some(archive));
        fs.set(wallpaper_key("a.png"), b"new".to_vec());
        assert_eq!(fs.get("assets/wallpapers/a.png").unwrap(), b"new");
        assert_eq!(fs.get("assets/wallpapers/b.png").unwrap(), b"bee");
        assert!(fs.delete("assets/wallpapers/b.png"));
        assert!(!fs.exists("assets/wallpapers/b.png"));
        assert_eq!(fs.list(WALLPAPERS_DIR), ["assets/wallpapers/a.png"]);
        // Drawing members are not embedded files.
        assert_eq!(fs.list(""), ["assets/wallpapers/a.png"]);
        assert!(!fs.exists("chunks/0/0,0.bin"));
        assert!(fs.get("level.json").unwrap_err().is_not_found());

        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        assert_eq!(fs.write_zip(&mut zip).unwrap(), 1);
        let saved = ArchiveHandle::from_bytes(zip.finish().unwrap().into_inner()).unwrap();
        fs.reattach(saved);
        assert_eq!(fs.get("assets/wallpapers/a.png").unwrap(), b"new");
        assert_eq!(fs.list(""), ["assets/wallpapers/a.png"]);
    }
    #[test]
    fn inline_json() {
        let mut fs = FileSystem::new();
        fs.set("assets/screenshots/small.png", vec![0xFF, 0x00]);
        let json = fs.to_json().unwrap();
        assert_eq!(json["assets/screenshots/small.png"]["data"], "/wA=");
        let back = FileSystem::from_json(&json).unwrap();
        assert_eq!(back.get("assets/screenshots/small.png").unwrap(), [0xFF, 0x00]);
        assert!(FileSystem::from_json(&serde_json::Value::Null).unwrap().is_empty());
    }
}
