//! Game balance and engine tunables, saved as toml in the user's preferences.

use crate::{archive::ChunkFileFormat, drawing::DrawingFormat, geom::Point};

const DOCUMENTATION: &str = r#"# Doodle engine settings. You may edit this file, but be aware that formatting and comments will not
# be preserved. Delete a key (or the whole file) to get its default back.

"#;

/// Name of the directory settings and user data live under.
pub const APP_NAME: &str = "doodle";

#[must_use]
pub fn preferences_dir() -> Option<std::path::PathBuf> {
    let mut base_dir = dirs::preference_dir()?;
    base_dir.push(APP_NAME);
    Some(base_dir)
}

/// Convert a duration in milliseconds into ticks at `fps`, rounding up.
#[must_use]
pub fn ms_to_ticks(ms: u64, fps: u32) -> u64 {
    (ms * u64::from(fps)).div_ceil(1000)
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Side length of chunks in new drawings.
    pub chunk_size: i32,
    /// Strokes kept for undo.
    pub undo_history: usize,
    pub drawing_format: DrawingFormat,
    pub chunk_file_format: ChunkFileFormat,
    /// Convert chunks to run length encoding when saving.
    pub optimize_rle_on_save: bool,
    /// Pretty print json headers.
    pub json_indent: bool,
    /// Cap on chunks held in memory per layer, `0` for none.
    pub lru_cache_max: usize,
    pub free_cache_ticks: u64,
    pub chopping_block_ticks: u64,
    pub load_unload_ticks: u64,
    /// Added on every side of the screen when deciding which chunks to keep warm.
    pub loading_viewport_margin: i32,
    /// Tallest ledge an actor walks up without jumping.
    pub slope_max_height: i32,
    /// Fastest the follow camera moves in one tick.
    pub follow_actor_max_scroll: i32,
    /// How close to the screen edge a followed actor may get.
    pub scrollbox_offset: Point,
    pub target_fps: u32,
    pub flood_fill_limit: i32,
    /// Flood fill radius when filling empty space.
    pub flood_fill_void_limit: i32,
}
impl Default for Settings {
    fn default() -> Self {
        Self {
            chunk_size: 128,
            undo_history: 20,
            drawing_format: DrawingFormat::Zipfile,
            chunk_file_format: ChunkFileFormat::Json,
            optimize_rle_on_save: true,
            json_indent: false,
            lru_cache_max: 0,
            free_cache_ticks: 4,
            chopping_block_ticks: 60,
            load_unload_ticks: 15,
            loading_viewport_margin: 1024,
            slope_max_height: 8,
            follow_actor_max_scroll: 300,
            scrollbox_offset: Point::new(128, 96),
            target_fps: 60,
            flood_fill_limit: 1200,
            flood_fill_void_limit: 350,
        }
    }
}
impl Settings {
    const FILENAME: &'static str = "settings.toml";

    /// Load from the preferences directory, or defaults if that fails for any reason.
    #[must_use]
    pub fn load() -> Self {
        match preferences_dir() {
            None => {
                log::warn!("No preferences dir, using default settings.");
                Self::default()
            }
            Some(mut dir) => {
                dir.push(Self::FILENAME);
                Self::load_or_default(&dir)
            }
        }
    }
    #[must_use]
    pub fn load_or_default(path: &std::path::Path) -> Self {
        let settings: anyhow::Result<Self> = (|| {
            let string = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&string)?)
        })();
        settings.unwrap_or_else(|e| {
            log::warn!("Settings at {} unavailable ({e}), using defaults.", path.display());
            Self::default()
        })
    }
    pub fn save(&self) -> anyhow::Result<()> {
        let preferences =
            preferences_dir().ok_or_else(|| anyhow::anyhow!("No preferences dir found"))?;
        // Not recursive: a missing parent means the platform dir is unusable.
        let _ = std::fs::DirBuilder::new().create(&preferences);
        self.save_to(&preferences.join(Self::FILENAME))
    }
    pub fn save_to(&self, path: &std::path::Path) -> anyhow::Result<()> {
        let string = toml::ser::to_string_pretty(self)?;
        std::fs::write(path, DOCUMENTATION.to_owned() + &string)?;
        Ok(())
    }
    #[must_use]
    pub fn ms_to_ticks(&self, ms: u64) -> u64 {
        ms_to_ticks(ms, self.target_fps)
    }
}
