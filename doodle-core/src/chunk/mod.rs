//! # Chunks
//!
//! A chunk is one `size × size` tile of a drawing. Its pixels live in an [`Accessor`], which is one of two
//! storage strategies chosen at construction (or migrated on save), plus some render caches.
//!
//! Pixels are always addressed in *world* coordinates, never chunk-relative ones. Every pixel stored in
//! a chunk satisfies `floor(p / size) == chunk.coord()`, which the [`crate::chunker::Chunker`] guarantees.

pub mod map;
pub mod rle;

pub use map::MapAccessor;
pub use rle::RleAccessor;

use crate::{
    color::Color,
    error::Error,
    geom::{Point, Rect},
    io::varint,
    palette::{Palette, PaletteIndex},
};
use base64::Engine as _;

/// On-disk tag of an [`Accessor`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, strum::Display)]
pub enum ChunkType {
    Map,
    Rle,
}
impl ChunkType {
    #[must_use]
    pub fn id(self) -> u64 {
        match self {
            Self::Map => 0,
            Self::Rle => 1,
        }
    }
}
impl TryFrom<u64> for ChunkType {
    type Error = Error;
    fn try_from(value: u64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Map),
            1 => Ok(Self::Rle),
            other => Err(Error::UnsupportedFormat(format!("chunk type {other}"))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Accessor {
    Map(MapAccessor),
    Rle(RleAccessor),
}
impl Default for Accessor {
    fn default() -> Self {
        Self::Map(MapAccessor::new())
    }
}
impl Accessor {
    #[must_use]
    pub fn kind(&self) -> ChunkType {
        match self {
            Self::Map(_) => ChunkType::Map,
            Self::Rle(_) => ChunkType::Rle,
        }
    }
    fn map(&self) -> &MapAccessor {
        match self {
            Self::Map(map) => map,
            Self::Rle(rle) => rle.map(),
        }
    }
    fn map_mut(&mut self) -> &mut MapAccessor {
        match self {
            Self::Map(map) => map,
            Self::Rle(rle) => rle.map_mut(),
        }
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.map().len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map().is_empty()
    }
    #[must_use]
    pub fn get(&self, p: Point) -> Option<PaletteIndex> {
        self.map().get(p)
    }
    pub fn set(&mut self, p: Point, index: PaletteIndex) -> Option<PaletteIndex> {
        self.map_mut().set(p, index)
    }
    pub fn delete(&mut self, p: Point) -> Result<PaletteIndex, Error> {
        self.map_mut().delete(p)
    }
    pub fn iter(&self) -> impl Iterator<Item = (Point, PaletteIndex)> + '_ {
        self.map().iter()
    }
    pub fn iter_viewport(&self, viewport: Rect) -> impl Iterator<Item = (Point, PaletteIndex)> + '_ {
        self.map().iter_viewport(viewport)
    }
    pub fn inflate(&self, palette: &Palette) -> Result<(), Error> {
        self.map().inflate(palette)
    }
    pub fn check(&self, swatches: usize) -> Result<(), Error> {
        self.map().check(swatches)
    }
}

/// Wire shape of a chunk inside json: `{"type": 0, "data": ...}`.
#[derive(serde::Serialize, serde::Deserialize)]
struct JsonChunk {
    #[serde(rename = "type")]
    kind: u64,
    #[serde(default)]
    data: serde_json::Value,
}

/// Cached render of a chunk with every pixel painted one color.
#[derive(Clone, Debug)]
struct MaskedBitmap {
    mask: Color,
    image: image::RgbaImage,
}

#[derive(Clone, Debug)]
pub struct Chunk {
    coord: Point,
    size: i32,
    accessor: Accessor,
    bitmap: Option<image::RgbaImage>,
    masked: Option<MaskedBitmap>,
    /// Bitmaps are stale.
    dirty: bool,
    /// Changed since it was loaded. Never unset; the chunk is rebuilt from disk after a save.
    modified: bool,
}
impl Chunk {
    #[must_use]
    pub fn new(coord: Point, size: i32) -> Self {
        Self::with_accessor(coord, size, Accessor::default())
    }
    #[must_use]
    pub fn with_accessor(coord: Point, size: i32, accessor: Accessor) -> Self {
        Self {
            coord,
            size,
            accessor,
            bitmap: None,
            masked: None,
            dirty: true,
            modified: false,
        }
    }
    #[must_use]
    pub fn coord(&self) -> Point {
        self.coord
    }
    #[must_use]
    pub fn size(&self) -> i32 {
        self.size
    }
    #[must_use]
    pub fn kind(&self) -> ChunkType {
        self.accessor.kind()
    }
    #[must_use]
    pub fn accessor(&self) -> &Accessor {
        &self.accessor
    }
    /// The world area this chunk covers.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        Rect::new(
            self.coord.x * self.size,
            self.coord.y * self.size,
            self.size,
            self.size,
        )
    }
    /// World point to chunk-local point.
    #[must_use]
    pub fn relative_coordinate(&self, world: Point) -> Point {
        world - self.bounds().origin()
    }
    /// Chunk-local point to world point.
    #[must_use]
    pub fn from_relative(&self, local: Point) -> Point {
        local + self.bounds().origin()
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.accessor.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accessor.is_empty()
    }
    /// Fraction of the tile that holds a pixel.
    #[must_use]
    pub fn usage(&self) -> f64 {
        let area = f64::from(self.size) * f64::from(self.size);
        if area == 0.0 {
            return 0.0;
        }
        self.len() as f64 / area
    }
    #[must_use]
    pub fn get(&self, p: Point) -> Option<PaletteIndex> {
        self.accessor.get(p)
    }
    pub fn set(&mut self, p: Point, index: PaletteIndex) -> Option<PaletteIndex> {
        self.dirty = true;
        self.modified = true;
        self.accessor.set(p, index)
    }
    pub fn delete(&mut self, p: Point) -> Result<PaletteIndex, Error> {
        let removed = self.accessor.delete(p)?;
        self.dirty = true;
        self.modified = true;
        Ok(removed)
    }
    pub fn iter(&self) -> impl Iterator<Item = (Point, PaletteIndex)> + '_ {
        self.accessor.iter()
    }
    pub fn iter_viewport(&self, viewport: Rect) -> impl Iterator<Item = (Point, PaletteIndex)> + '_ {
        self.accessor.iter_viewport(viewport)
    }
    pub fn inflate(&self, palette: &Palette) -> Result<(), Error> {
        self.accessor.inflate(palette)
    }
    /// [`Chunk::inflate`] against a palette of `swatches` entries.
    pub fn check(&self, swatches: usize) -> Result<(), Error> {
        self.accessor.check(swatches)
    }
    #[must_use]
    pub fn is_modified(&self) -> bool {
        self.modified
    }
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
    /// Force the bitmaps to redraw, e.g. after a palette change.
    pub fn set_dirty(&mut self) {
        self.dirty = true;
    }
    /// Switch a map chunk over to RLE storage. Returns whether anything changed.
    pub fn migrate_rle(&mut self) -> bool {
        match std::mem::take(&mut self.accessor) {
            Accessor::Map(map) => {
                self.accessor = Accessor::Rle(RleAccessor::from_map(map));
                true
            }
            rle @ Accessor::Rle(_) => {
                self.accessor = rle;
                false
            }
        }
    }

    /// Cached bitmap, redrawn if dirty.
    pub fn bitmap(&mut self, palette: &Palette) -> &image::RgbaImage {
        if self.dirty {
            self.bitmap = None;
            self.masked = None;
            self.dirty = false;
        }
        let bounds = self.bounds();
        let accessor = &self.accessor;
        self.bitmap
            .get_or_insert_with(|| render_bitmap(accessor, bounds, palette, None))
    }
    /// Cached bitmap with every pixel replaced (or tinted, if translucent) by `mask`.
    pub fn masked_bitmap(&mut self, palette: &Palette, mask: Color) -> &image::RgbaImage {
        if self.dirty {
            self.bitmap = None;
            self.masked = None;
            self.dirty = false;
        }
        if self.masked.as_ref().is_some_and(|m| m.mask != mask) {
            self.masked = None;
        }
        let bounds = self.bounds();
        let accessor = &self.accessor;
        &self
            .masked
            .get_or_insert_with(|| MaskedBitmap {
                mask,
                image: render_bitmap(accessor, bounds, palette, Some(mask)),
            })
            .image
    }
    #[must_use]
    pub fn has_bitmap(&self) -> bool {
        self.bitmap.is_some() && !self.dirty
    }
    /// Drop cached bitmaps. Returns how many were freed.
    pub fn teardown(&mut self) -> usize {
        usize::from(self.bitmap.take().is_some()) + usize::from(self.masked.take().is_some())
    }

    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        let data = match &self.accessor {
            Accessor::Map(map) => map.to_json(),
            Accessor::Rle(rle) => serde_json::Value::String(
                base64::engine::general_purpose::STANDARD.encode(rle.encode(self.bounds())),
            ),
        };
        serde_json::json!({ "type": self.kind().id(), "data": data })
    }
    pub fn from_json(coord: Point, size: i32, value: serde_json::Value) -> Result<Self, Error> {
        let JsonChunk { kind, data } = serde_json::from_value(value)?;
        let mut chunk = Self::new(coord, size);
        chunk.accessor = match ChunkType::try_from(kind)? {
            ChunkType::Map => Accessor::Map(MapAccessor::from_json(&data)?),
            ChunkType::Rle => {
                let text = data
                    .as_str()
                    .ok_or_else(|| Error::malformed("rle chunk data is not a string"))?;
                let bytes = base64::engine::general_purpose::STANDARD
                    .decode(text)
                    .map_err(|e| Error::malformed(format_args!("rle chunk base64: {e}")))?;
                Accessor::Rle(RleAccessor::decode(chunk.bounds(), &bytes)?)
            }
        };
        Ok(chunk)
    }
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, Error> {
        Ok(serde_json::to_vec(&self.to_json())?)
    }
    pub fn from_json_bytes(coord: Point, size: i32, bytes: &[u8]) -> Result<Self, Error> {
        Self::from_json(coord, size, serde_json::from_slice(bytes)?)
    }
    /// Binary sidecar: uvarint type, then the accessor's packed bytes.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = vec![];
        varint::write_uvarint(&mut out, self.kind().id());
        match &self.accessor {
            Accessor::Map(map) => out.extend(map.encode()),
            Accessor::Rle(rle) => out.extend(rle.encode(self.bounds())),
        }
        out
    }
    pub fn decode(coord: Point, size: i32, bytes: &[u8]) -> Result<Self, Error> {
        let mut reader = varint::Reader::new(bytes);
        let kind = ChunkType::try_from(reader.read_uvarint()?)?;
        let mut chunk = Self::new(coord, size);
        chunk.accessor = match kind {
            ChunkType::Map => Accessor::Map(MapAccessor::decode(reader.remaining())?),
            ChunkType::Rle => Accessor::Rle(RleAccessor::decode(chunk.bounds(), reader.remaining())?),
        };
        Ok(chunk)
    }
}

/// Paint a chunk's pixels onto a transparent tile.
fn render_bitmap(
    accessor: &Accessor,
    bounds: Rect,
    palette: &Palette,
    mask: Option<Color>,
) -> image::RgbaImage {
    let side = u32::try_from(bounds.w).unwrap_or(0);
    let mut image = image::RgbaImage::new(side, side);
    for (p, index) in accessor.iter() {
        let Ok(swatch) = palette.at(index) else {
            log::warn!("chunk bitmap: pixel {p} has no swatch {index}");
            continue;
        };
        let color = match mask {
            None => swatch.color,
            Some(mask) if mask.is_opaque() => mask,
            Some(mask) => blend(swatch.color, mask),
        };
        let local = p - bounds.origin();
        if let (Ok(x), Ok(y)) = (u32::try_from(local.x), u32::try_from(local.y)) {
            if x < side && y < side {
                image.put_pixel(x, y, color.into());
            }
        }
    }
    image
}

/// Source-over of `top` onto an opaque-ish `base`, keeping the base's alpha.
fn blend(base: Color, top: Color) -> Color {
    let a = u16::from(top.a);
    let mix = |b: u8, t: u8| ((u16::from(b) * (255 - a) + u16::from(t) * a) / 255) as u8;
    Color::rgba(mix(base.r, top.r), mix(base.g, top.g), mix(base.b, top.b), base.a)
}

#[cfg(test)]
mod test {
    use super::*;

    fn filled(coord: Point, size: i32) -> Chunk {
        let mut chunk = Chunk::new(coord, size);
        let origin = chunk.bounds().origin();
        for i in 0..size {
            chunk.set(origin + Point::new(i, i), PaletteIndex(1));
        }
        chunk.set(origin, PaletteIndex(0));
        chunk
    }

    #[test]
    fn bounds_and_relative() {
        let chunk = Chunk::new(Point::new(-1, 2), 100);
        assert_eq!(chunk.bounds(), Rect::new(-100, 200, 100, 100));
        assert_eq!(chunk.relative_coordinate(Point::new(-1, 250)), Point::new(99, 50));
        assert_eq!(chunk.from_relative(Point::new(99, 50)), Point::new(-1, 250));
    }
    #[test]
    fn flags() {
        let mut chunk = Chunk::new(Point::ORIGIN, 8);
        assert!(!chunk.is_modified());
        // Deleting nothing changes nothing.
        assert!(chunk.delete(Point::new(1, 1)).is_err());
        assert!(!chunk.is_modified());
        chunk.set(Point::new(1, 1), PaletteIndex(0));
        assert!(chunk.is_modified() && chunk.is_dirty());
        assert_eq!(chunk.usage(), 1.0 / 64.0);
    }
    #[test]
    fn json_both_types() {
        let mut chunk = filled(Point::new(2, -3), 16);
        let map = Chunk::from_json(chunk.coord(), 16, chunk.to_json()).unwrap();
        assert_eq!(map.kind(), ChunkType::Map);
        assert_eq!(map.accessor(), chunk.accessor());

        assert!(chunk.migrate_rle());
        assert!(!chunk.migrate_rle());
        let json = chunk.to_json();
        assert_eq!(json["type"], 1);
        assert!(json["data"].is_string());
        let rle = Chunk::from_json_bytes(chunk.coord(), 16, &chunk.to_json_bytes().unwrap()).unwrap();
        assert_eq!(rle.kind(), ChunkType::Rle);
        assert_eq!(rle.len(), 16);
        assert_eq!(rle.get(Point::new(32, -48)), Some(PaletteIndex(0)));
        assert_eq!(rle.get(Point::new(33, -47)), Some(PaletteIndex(1)));
    }
    #[test]
    fn binary_both_types() {
        let mut chunk = filled(Point::new(0, 1), 32);
        let back = Chunk::decode(chunk.coord(), 32, &chunk.encode()).unwrap();
        assert_eq!(back.accessor(), chunk.accessor());
        chunk.migrate_rle();
        let back = Chunk::decode(chunk.coord(), 32, &chunk.encode()).unwrap();
        assert_eq!(back.accessor(), chunk.accessor());
    }
    #[test]
    fn unknown_type() {
        let json = serde_json::json!({"type": 9, "data": {}});
        let err = Chunk::from_json(Point::ORIGIN, 8, json).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::UnsupportedFormat);
    }
    #[test]
    fn bitmaps() {
        let palette = Palette::default_palette();
        let mut chunk = filled(Point::new(1, 1), 8);
        let image = chunk.bitmap(&palette);
        assert_eq!(image.dimensions(), (8, 8));
        assert_eq!(image.get_pixel(0, 0).0, Color::BLACK.to_array());
        assert_eq!(image.get_pixel(3, 3).0, Color::GREY.to_array());
        assert_eq!(image.get_pixel(3, 4).0, [0; 4]);
        assert!(chunk.has_bitmap());

        let masked = chunk.masked_bitmap(&palette, Color::RED);
        assert_eq!(masked.get_pixel(3, 3).0, Color::RED.to_array());
        assert_eq!(chunk.teardown(), 2);
        assert!(!chunk.has_bitmap());
    }
}
