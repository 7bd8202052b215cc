//! # Doodads
//!
//! Doodads are the reusable pieces placed into levels as actors: buttons, doors, enemies. Each has one or
//! more named layers (animation frames or states), a script, a hitbox and designer-facing options.

use crate::{
    actor::{OptionParseError, OptionType, OptionValue},
    archive::{self, files::FileSystem, ArchiveHandle},
    chunker::{Chunker, ChunkerJson},
    drawing::{Base, Drawing},
    edit::Editor,
    error::Error,
    geom::Rect,
    palette::Palette,
    settings::Settings,
    stroke::History,
};
use std::collections::BTreeMap;

/// Chunk size of doodads created with a size of `0`.
pub const DEFAULT_SIZE: i32 = 100;

#[derive(Debug)]
pub struct Layer {
    pub name: String,
    pub chunker: Chunker,
}

#[derive(serde::Serialize, serde::Deserialize)]
struct LayerJson {
    name: String,
    chunks: ChunkerJson,
}

/// An option a level designer can set on each actor of this doodad, with its default.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DoodadOption {
    #[serde(rename = "type")]
    pub kind: OptionType,
    pub name: String,
    #[serde(default)]
    pub default: OptionValue,
}
impl DoodadOption {
    /// Set the default from text, returning it as text. A bad int logs and keeps the old value.
    pub fn set(&mut self, text: &str) -> String {
        match OptionValue::parse(self.kind, &self.name, text) {
            Ok(value) => self.default = value,
            Err(e) => log::error!("doodad option: {e}"),
        }
        self.default.to_string()
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct Header {
    #[serde(flatten)]
    base: Base,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    hidden: bool,
    #[serde(default)]
    palette: Palette,
    #[serde(default)]
    script: String,
    /// Chunk size of the first layer.
    #[serde(default)]
    size: i32,
    #[serde(default)]
    hitbox: Rect,
    #[serde(default)]
    layers: Vec<LayerJson>,
    #[serde(default, rename = "data")]
    tags: BTreeMap<String, String>,
    #[serde(default)]
    options: BTreeMap<String, DoodadOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    files: Option<serde_json::Value>,
}

#[derive(Debug)]
pub struct Doodad {
    pub base: Base,
    /// Hidden from the editor's doodad list.
    pub hidden: bool,
    pub palette: Palette,
    /// Script source, run by the script host.
    pub script: String,
    /// Part of the sprite that collides. Zero means all of it.
    pub hitbox: Rect,
    /// Always at least one.
    layers: Vec<Layer>,
    /// Free-form key/value data.
    pub tags: BTreeMap<String, String>,
    pub options: BTreeMap<String, DoodadOption>,
    pub files: FileSystem,
    /// Not saved.
    pub history: History,
}

impl Doodad {
    /// A blank doodad with one layer named `main`. A size of `0` means [`DEFAULT_SIZE`].
    #[must_use]
    pub fn new(size: i32, settings: &Settings) -> Self {
        let size = if size == 0 { DEFAULT_SIZE } else { size };
        Self {
            base: Base::default(),
            hidden: false,
            palette: Palette::default_palette(),
            script: String::new(),
            hitbox: Rect::sized(size, size),
            layers: vec![Layer {
                name: "main".to_owned(),
                chunker: Chunker::new(size),
            }],
            tags: BTreeMap::new(),
            options: BTreeMap::new(),
            files: FileSystem::new(),
            history: History::new(settings.undo_history),
        }
    }
    /// Chunk size of the first layer, which is also the sprite size.
    #[must_use]
    pub fn size(&self) -> i32 {
        self.layers[0].chunker.size()
    }
    #[must_use]
    pub fn rect(&self) -> Rect {
        Rect::sized(self.size(), self.size())
    }
    #[must_use]
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }
    pub fn layers_mut(&mut self) -> &mut [Layer] {
        &mut self.layers
    }
    #[must_use]
    pub fn layer_index(&self, name: &str) -> Option<usize> {
        self.layers.iter().position(|l| l.name == name)
    }
    /// Append a layer, blank if no chunker is given. Returns its index.
    pub fn add_layer(&mut self, name: impl Into<String>, chunker: Option<Chunker>) -> usize {
        let index = self.layers.len();
        let mut chunker = chunker.unwrap_or_else(|| Chunker::new(self.size()));
        chunker.set_layer(index);
        self.layers.push(Layer {
            name: name.into(),
            chunker,
        });
        index
    }
    /// Edit one layer's pixels through the doodad's history.
    pub fn editor(&mut self, layer: usize) -> Option<Editor<'_>> {
        let layer = self.layers.get_mut(layer)?;
        Some(Editor::new(&mut layer.chunker, &mut self.history))
    }
    /// A tag's value, or empty if it isn't set.
    #[must_use]
    pub fn tag(&self, name: &str) -> &str {
        self.tags.get(name).map_or_else(
            || {
                log::warn!("doodad {:?}: tag {name} not defined", self.base.title);
                ""
            },
            String::as_str,
        )
    }
    /// Set an option's default, creating the option with the given type if it's new.
    pub fn set_option(&mut self, name: &str, kind: &str, text: &str) -> Result<String, OptionParseError> {
        let kind: OptionType = kind
            .parse()
            .map_err(|_| OptionParseError::UnknownType(kind.to_owned()))?;
        Ok(self
            .options
            .entry(name.to_owned())
            .or_insert_with(|| DoodadOption {
                kind,
                name: name.to_owned(),
                default: OptionValue::Unset,
            })
            .set(text))
    }
    /// Free every chunk bitmap. Returns how many were freed.
    pub fn teardown(&mut self) -> usize {
        let freed: usize = self
            .layers
            .iter_mut()
            .flat_map(|l| l.chunker.iter_chunks_mut())
            .map(|c| c.teardown())
            .sum();
        if freed > 0 {
            log::debug!("teardown doodad {:?}: freed {freed} bitmaps", self.base.title);
        }
        freed
    }
}

impl Drawing for Doodad {
    const HEADER: &'static str = archive::DOODAD_HEADER;
    const EXTENSION: &'static str = crate::environment::DOODAD_EXTENSION;

    fn base(&self) -> &Base {
        &self.base
    }
    fn base_mut(&mut self) -> &mut Base {
        &mut self.base
    }
    fn prepare_save(&mut self, settings: &Settings) {
        if settings.optimize_rle_on_save {
            let migrated: usize = self
                .layers
                .iter_mut()
                .map(|l| l.chunker.optimize_accessors())
                .sum();
            log::debug!("migrated {migrated} chunks to RLE");
        }
    }
    fn to_header(&mut self, inline: bool) -> Result<serde_json::Value, Error> {
        let layers = self
            .layers
            .iter_mut()
            .map(|layer| LayerJson {
                name: layer.name.clone(),
                chunks: if inline {
                    layer.chunker.to_json()
                } else {
                    layer.chunker.to_json_header()
                },
            })
            .collect();
        let files = if inline { Some(self.files.to_json()?) } else { None };
        let header = Header {
            base: self.base.clone(),
            hidden: self.hidden,
            palette: self.palette.clone(),
            script: self.script.clone(),
            size: self.size(),
            hitbox: self.hitbox,
            layers,
            tags: self.tags.clone(),
            options: self.options.clone(),
            files,
        };
        Ok(serde_json::to_value(header)?)
    }
    fn from_header(header: serde_json::Value, archive: Option<ArchiveHandle>) -> Result<Self, Error> {
        let header: Header = serde_json::from_value(header)?;
        let mut palette = header.palette;
        palette.inflate();

        let mut layers = Vec::with_capacity(header.layers.len().max(1));
        for (index, layer) in header.layers.into_iter().enumerate() {
            let mut chunker = Chunker::from_json(layer.chunks)?.with_layer(index);
            chunker.attach_archive(archive.clone());
            chunker.inflate(&palette)?;
            layers.push(Layer {
                name: layer.name,
                chunker,
            });
        }
        if layers.is_empty() {
            let size = if header.size > 0 { header.size } else { DEFAULT_SIZE };
            log::warn!("doodad {:?} has no layers, adding a blank one", header.base.title);
            layers.push(Layer {
                name: "main".to_owned(),
                chunker: Chunker::new(size),
            });
        }
        let mut files = match &header.files {
            Some(value) => FileSystem::from_json(value)?,
            None => FileSystem::new(),
        };
        files.attach_archive(archive);

        Ok(Self {
            base: header.base,
            hidden: header.hidden,
            palette,
            script: header.script,
            hitbox: header.hitbox,
            layers,
            tags: header.tags,
            options: header.options,
            files,
            history: History::new(Settings::default().undo_history),
        })
    }
    fn write_members<W: std::io::Write + std::io::Seek>(
        &mut self,
        zip: &mut zip::ZipWriter<W>,
        settings: &Settings,
    ) -> Result<(), Error> {
        for layer in &mut self.layers {
            layer.chunker.write_zip(zip, settings.chunk_file_format)?;
        }
        self.files.write_zip(zip)?;
        Ok(())
    }
    fn attach_archive(&mut self, archive: ArchiveHandle) {
        for layer in &mut self.layers {
            layer.chunker.reattach(archive.clone());
        }
        self.files.reattach(archive);
    }
}
