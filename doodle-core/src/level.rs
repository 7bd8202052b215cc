//! # Levels
//!
//! A level is the drawing the game is played on: one chunked layer of pixels, the actors placed in it,
//! the page it sits on and any files it carries along (embedded doodads, wallpapers, screenshots).

use crate::{
    actor::ActorMap,
    archive::{
        self,
        files::{self, FileSystem},
        ArchiveHandle,
    },
    chunker::{CachePolicy, Chunker, ChunkerJson},
    drawing::{Base, Drawing},
    edit::Editor,
    environment::Environment,
    error::Error,
    geom::Point,
    page::PageType,
    palette::Palette,
    settings::Settings,
    stroke::History,
    wallpaper::{Wallpaper, DEFAULT_WALLPAPER},
};

pub const DEFAULT_MAX_WIDTH: i32 = 2550;
pub const DEFAULT_MAX_HEIGHT: i32 = 3300;

#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize, strum::Display,
)]
#[serde(try_from = "i8", into = "i8")]
pub enum Difficulty {
    Peaceful,
    #[default]
    Normal,
    Hard,
}
impl From<Difficulty> for i8 {
    fn from(value: Difficulty) -> Self {
        match value {
            Difficulty::Peaceful => -1,
            Difficulty::Normal => 0,
            Difficulty::Hard => 1,
        }
    }
}
impl TryFrom<i8> for Difficulty {
    type Error = String;
    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Self::Peaceful),
            0 => Ok(Self::Normal),
            1 => Ok(Self::Hard),
            other => Err(format!("unknown difficulty {other}")),
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct GameRules {
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub survival: bool,
}

/// Json header of a level.
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct Header {
    #[serde(flatten)]
    base: Base,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    uuid: String,
    #[serde(default, rename = "passwd")]
    password: String,
    #[serde(default)]
    rules: GameRules,
    chunks: ChunkerJson,
    #[serde(default)]
    palette: Palette,
    #[serde(default)]
    page_type: PageType,
    #[serde(default = "default_max_width", rename = "boundedWidth")]
    max_width: i32,
    #[serde(default = "default_max_height", rename = "boundedHeight")]
    max_height: i32,
    #[serde(default)]
    wallpaper: String,
    #[serde(default)]
    scroll: Point,
    #[serde(default)]
    actors: ActorMap,
    #[serde(default)]
    save_doodads: bool,
    #[serde(default)]
    save_builtins: bool,
    /// Embedded files, only present in the single-file formats.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    files: Option<serde_json::Value>,
}
fn default_max_width() -> i32 {
    DEFAULT_MAX_WIDTH
}
fn default_max_height() -> i32 {
    DEFAULT_MAX_HEIGHT
}

#[derive(Debug)]
pub struct Level {
    pub base: Base,
    /// Set on first save.
    pub uuid: String,
    pub password: String,
    pub rules: GameRules,
    pub chunker: Chunker,
    pub palette: Palette,
    pub page_type: PageType,
    /// Page size, for bounded page types.
    pub max_width: i32,
    pub max_height: i32,
    pub wallpaper: String,
    /// Where the editor was last scrolled to.
    pub scroll: Point,
    pub actors: ActorMap,
    /// Embed the custom doodads the level uses when publishing.
    pub save_doodads: bool,
    /// Embed built-in doodads too.
    pub save_builtins: bool,
    pub files: FileSystem,
    /// Not saved.
    pub history: History,
}

impl Default for Level {
    fn default() -> Self {
        Self::new(&Settings::default())
    }
}

impl Level {
    /// A blank level with the default palette.
    #[must_use]
    pub fn new(settings: &Settings) -> Self {
        let mut chunker = Chunker::new(settings.chunk_size);
        chunker.set_policy(CachePolicy::from(settings));
        Self {
            base: Base::default(),
            uuid: String::new(),
            password: String::new(),
            rules: GameRules::default(),
            chunker,
            palette: Palette::default_palette(),
            page_type: PageType::default(),
            max_width: DEFAULT_MAX_WIDTH,
            max_height: DEFAULT_MAX_HEIGHT,
            wallpaper: DEFAULT_WALLPAPER.to_owned(),
            scroll: Point::ORIGIN,
            actors: ActorMap::new(),
            save_doodads: false,
            save_builtins: false,
            files: FileSystem::new(),
            history: History::new(settings.undo_history),
        }
    }
    /// Page size as `(width, height)`.
    #[must_use]
    pub fn max(&self) -> (i32, i32) {
        (self.max_width, self.max_height)
    }
    /// Edit the level's pixels, recording strokes in its history.
    pub fn editor(&mut self) -> Editor<'_> {
        Editor::new(&mut self.chunker, &mut self.history)
    }
    /// Apply cache tunables, e.g. after loading.
    pub fn set_settings(&mut self, settings: &Settings) {
        self.chunker.set_policy(CachePolicy::from(settings));
        if self.history.limit() != settings.undo_history {
            self.history = History::new(settings.undo_history);
        }
    }

    /// Drop links to actors that no longer exist. Returns how many were dropped.
    pub fn prune_links(&mut self) -> usize {
        self.actors.prune_links()
    }
    /// Free every chunk bitmap. Returns how many were freed.
    pub fn teardown(&mut self) -> usize {
        let freed: usize = self.chunker.iter_chunks_mut().map(|c| c.teardown()).sum();
        log::debug!("teardown level {:?}: freed {freed} bitmaps", self.base.title);
        freed
    }

    /// Carry a doodad file inside the level.
    pub fn embed_doodad(&mut self, filename: &str, bytes: Vec<u8>) {
        self.files.set(files::doodad_key(filename), bytes);
    }
    /// File names of embedded doodads.
    #[must_use]
    pub fn embedded_doodads(&self) -> Vec<String> {
        self.files
            .list(files::DOODADS_DIR)
            .into_iter()
            .filter_map(|key| key.strip_prefix(files::DOODADS_DIR).map(ToOwned::to_owned))
            .collect()
    }
    /// Find and slice this level's wallpaper: embedded first, then the user's and the system's
    /// `wallpapers/` directories.
    pub fn load_wallpaper(&self, env: Option<&Environment>) -> Result<Wallpaper, Error> {
        let key = files::wallpaper_key(&self.wallpaper);
        if self.files.exists(&key) {
            return Wallpaper::from_bytes(self.wallpaper.as_str(), &self.files.get(&key)?);
        }
        let dirs = env
            .into_iter()
            .flat_map(|env| std::iter::once(env.profile()).chain(env.system_dir()));
        for dir in dirs {
            let path = dir.join("wallpapers").join(&self.wallpaper);
            if path.is_file() {
                return Wallpaper::from_bytes(self.wallpaper.as_str(), &std::fs::read(path)?);
            }
        }
        Err(Error::not_found(format_args!("wallpaper {}", self.wallpaper)))
    }
    /// Render the large, medium and small previews into the embedded files.
    pub fn update_screenshots(&mut self, env: &Environment) -> Result<(), Error> {
        let _guard = env.screenshot_lock()?;
        let wallpaper = self.load_wallpaper(Some(env)).ok();
        for (name, png) in crate::screenshot::level_screenshots(self, wallpaper.as_ref())? {
            log::debug!("update screenshot {name} ({} bytes)", png.len());
            self.files.set(format!("{}{name}", files::SCREENSHOTS_DIR), png);
        }
        Ok(())
    }
}

impl Drawing for Level {
    const HEADER: &'static str = archive::LEVEL_HEADER;
    const EXTENSION: &'static str = crate::environment::LEVEL_EXTENSION;

    fn base(&self) -> &Base {
        &self.base
    }
    fn base_mut(&mut self) -> &mut Base {
        &mut self.base
    }
    fn prepare_save(&mut self, settings: &Settings) {
        if self.uuid.is_empty() {
            self.uuid = uuid::Uuid::new_v4().to_string();
        }
        let pruned = self.prune_links();
        if pruned > 0 {
            log::warn!("pruned {pruned} broken actor links");
        }
        if settings.optimize_rle_on_save {
            let migrated = self.chunker.optimize_accessors();
            log::debug!("migrated {migrated} chunks to RLE");
        }
    }
    fn to_header(&mut self, inline: bool) -> Result<serde_json::Value, Error> {
        let (chunks, files) = if inline {
            (self.chunker.to_json(), Some(self.files.to_json()?))
        } else {
            (self.chunker.to_json_header(), None)
        };
        let header = Header {
            base: self.base.clone(),
            uuid: self.uuid.clone(),
            password: self.password.clone(),
            rules: self.rules,
            chunks,
            palette: self.palette.clone(),
            page_type: self.page_type,
            max_width: self.max_width,
            max_height: self.max_height,
            wallpaper: self.wallpaper.clone(),
            scroll: self.scroll,
            actors: self.actors.clone(),
            save_doodads: self.save_doodads,
            save_builtins: self.save_builtins,
            files,
        };
        Ok(serde_json::to_value(header)?)
    }
    fn from_header(header: serde_json::Value, archive: Option<ArchiveHandle>) -> Result<Self, Error> {
        let header: Header = serde_json::from_value(header)?;
        let mut palette = header.palette;
        palette.inflate();
        let mut chunker = Chunker::from_json(header.chunks)?;
        chunker.attach_archive(archive.clone());
        chunker.inflate(&palette)?;
        let mut actors = header.actors;
        actors.inflate();
        let mut files = match &header.files {
            Some(value) => FileSystem::from_json(value)?,
            None => FileSystem::new(),
        };
        files.attach_archive(archive);

        Ok(Self {
            base: header.base,
            uuid: header.uuid,
            password: header.password,
            rules: header.rules,
            chunker,
            palette,
            page_type: header.page_type,
            max_width: header.max_width,
            max_height: header.max_height,
            wallpaper: header.wallpaper,
            scroll: header.scroll,
            actors,
            save_doodads: header.save_doodads,
            save_builtins: header.save_builtins,
            files,
            history: History::new(Settings::default().undo_history),
        })
    }
    fn write_members<W: std::io::Write + std::io::Seek>(
        &mut self,
        zip: &mut zip::ZipWriter<W>,
        settings: &Settings,
    ) -> Result<(), Error> {
        self.chunker.write_zip(zip, settings.chunk_file_format)?;
        self.files.write_zip(zip)?;
        Ok(())
    }
    fn attach_archive(&mut self, archive: ArchiveHandle) {
        self.chunker.reattach(archive.clone());
        self.files.reattach(archive);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        actor::Actor,
        archive::ChunkFileFormat,
        drawing::DrawingFormat,
        geom::Rect,
        stroke::{Shape, Stroke},
    };

    fn sample() -> Level {
        let mut level = Level::default();
        level.base.title = "Castle".to_owned();
        level.page_type = PageType::Bordered;
        level.rules.difficulty = Difficulty::Hard;
        let solid = level.palette.get("solid").unwrap().index();
        level.chunker.set_rect(Rect::new(-10, 120, 300, 16), solid);
        let door = level.actors.add(Actor::new("door.doodad", Point::new(40, 60)).with_id("door"));
        let key = level.actors.add(Actor::new("key.doodad", Point::new(90, 60)).with_id("key"));
        level.actors.link(&door, &key).unwrap();
        level.files.set("assets/wallpapers/paper.png", b"png".to_vec());
        level
    }

    #[test]
    fn defaults() {
        let level = Level::default();
        assert_eq!(level.base.version, 1);
        assert_eq!(level.base.title, "Untitled");
        assert_eq!(level.page_type, PageType::NoNegativeSpace);
        assert_eq!(level.wallpaper, "notebook.png");
        assert_eq!(level.max(), (2550, 3300));
        assert_eq!(level.chunker.size(), 128);
    }
    #[test]
    fn every_format_round_trips() {
        let settings = Settings::default();
        for format in [DrawingFormat::Json, DrawingFormat::Gzip, DrawingFormat::Zipfile] {
            let mut level = sample();
            let bytes = level.to_bytes(format, &settings).unwrap();
            assert_eq!(DrawingFormat::sniff(&bytes).unwrap(), format);

            let mut loaded = Level::from_bytes(bytes).unwrap();
            assert_eq!(loaded.base.title, "Castle", "{format}");
            assert_eq!(loaded.page_type, PageType::Bordered);
            assert_eq!(loaded.rules.difficulty, Difficulty::Hard);
            assert_eq!(loaded.uuid, level.uuid);
            assert!(!loaded.uuid.is_empty());
            assert_eq!(loaded.actors.get("door").unwrap().links, ["key"]);
            assert_eq!(loaded.actors.get("key").unwrap().id(), "key");
            assert_eq!(loaded.files.get("assets/wallpapers/paper.png").unwrap(), b"png");
            assert_eq!(loaded.chunker.get(Point::new(-10, 120)), Some(level.palette.get("solid").unwrap().index()));
            assert_eq!(loaded.chunker.iter().count(), 300 * 16);
        }
    }
    #[test]
    fn header_keys() {
        let mut level = sample();
        let header = level.to_header(false).unwrap();
        for key in [
            "version", "gameVersion", "title", "author", "locked", "passwd", "rules", "chunks", "palette",
            "pageType", "boundedWidth", "boundedHeight", "wallpaper", "scroll", "actors", "saveDoodads",
            "saveBuiltins",
        ] {
            assert!(header.get(key).is_some(), "missing {key}");
        }
        assert_eq!(header["pageType"], 3);
        assert_eq!(header["rules"]["difficulty"], 1);
        assert_eq!(header["actors"]["door"]["point"]["x"], 40);
        assert!(header.get("files").is_none());
        assert!(header["chunks"]["chunks"].as_object().unwrap().is_empty());
    }
    #[test]
    fn save_prunes_links() {
        let mut level = sample();
        level.actors.remove("key");
        level.to_bytes(DrawingFormat::Json, &Settings::default()).unwrap();
        assert!(level.actors.get("door").unwrap().links.is_empty());
    }
    #[test]
    fn file_save_pages_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("castle.level");
        let settings = Settings {
            chunk_file_format: ChunkFileFormat::Bin,
            ..Settings::default()
        };
        let mut level = sample();
        level.write_file(&path, DrawingFormat::Zipfile, &settings).unwrap();
        assert_eq!(level.chunker.cache_size(), 0);

        let mut loaded = Level::load_file(&path).unwrap();
        assert!(loaded.chunker.archive().unwrap().contains("chunks/0/0,0.bin"));
        assert_eq!(loaded.chunker.iter().count(), 300 * 16);

        // Edit and save over the file it pages from.
        let solid = loaded.palette.get("solid").unwrap().index();
        loaded.chunker.set(Point::new(500, 500), solid);
        loaded.write_file(&path, DrawingFormat::Zipfile, &settings).unwrap();
        let mut again = Level::load_file(&path).unwrap();
        assert_eq!(again.chunker.get(Point::new(500, 500)), Some(solid));
        assert_eq!(again.chunker.iter().count(), 300 * 16 + 1);
    }
    #[test]
    fn resave_keeps_edits_to_archived_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("castle.level");
        let settings = Settings {
            chunk_file_format: ChunkFileFormat::Bin,
            ..Settings::default()
        };
        sample().write_file(&path, DrawingFormat::Zipfile, &settings).unwrap();

        let mut loaded = Level::load_file(&path).unwrap();
        assert_eq!(loaded.files.list(""), ["assets/wallpapers/paper.png"]);
        let decoration = loaded.palette.get("decoration").unwrap().index();
        // Repaint a pixel of chunk 0,0 and empty chunk -1,0 out, both cold in the archive.
        loaded.chunker.set(Point::new(0, 120), decoration);
        assert_eq!(loaded.chunker.delete_rect(Rect::new(-10, 120, 10, 8)), 80);
        loaded.write_file(&path, DrawingFormat::Zipfile, &settings).unwrap();

        let mut again = Level::load_file(&path).unwrap();
        assert_eq!(again.chunker.get(Point::new(0, 120)), Some(decoration));
        assert_eq!(again.chunker.get(Point::new(-5, 122)), None);
        assert!(!again.chunker.archive().unwrap().contains("chunks/0/-1,0.bin"));
        assert_eq!(again.chunker.iter().count(), 300 * 16 - 80);
        assert_eq!(again.files.get("assets/wallpapers/paper.png").unwrap(), b"png");
    }
    #[test]
    fn undo_through_the_level() {
        let mut level = Level::default();
        let solid = level.palette.get("solid").unwrap().clone();
        let stroke = Stroke::new(Shape::Line, solid.color)
            .with_swatch(solid.index())
            .between(Point::new(0, 0), Point::new(9, 0));
        level.editor().commit(stroke).unwrap();
        assert_eq!(level.chunker.iter().count(), 10);
        assert!(level.editor().undo());
        assert_eq!(level.chunker.iter().count(), 0);
        assert!(level.editor().redo());
        assert_eq!(level.chunker.iter().count(), 10);
    }
    #[test]
    fn embedded_doodads() {
        let mut level = Level::default();
        level.embed_doodad("door.doodad", b"{}".to_vec());
        assert_eq!(level.embedded_doodads(), ["door.doodad"]);
        assert!(level.load_wallpaper(None).unwrap_err().is_not_found());
    }
}
