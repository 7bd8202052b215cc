//! The drawing surface a front end provides, and getting chunk bitmaps onto it.

use crate::{
    chunker::Chunker,
    color::Color,
    geom::{Point, Rect},
    palette::Palette,
    viewport::Viewport,
    wallpaper::Wallpaper,
};

/// Keys and buttons held down this frame.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InputState {
    pub cursor: Point,
    pub left_button: bool,
    pub right_button: bool,
    /// Names of held keys, lowercase (`"a"`, `"shift"`, `"space"`).
    pub keys: smallvec::SmallVec<[String; 4]>,
    /// The window was asked to close.
    pub quit: bool,
}
impl InputState {
    #[must_use]
    pub fn is_down(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k == key)
    }
}

/// A window and renderer. Coordinates are screen pixels.
pub trait RenderEngine {
    /// Handle to an uploaded image.
    type Texture: Clone;

    fn clear(&mut self, color: Color);
    fn draw_point(&mut self, color: Color, p: Point);
    fn draw_line(&mut self, color: Color, a: Point, b: Point);
    /// Outline.
    fn draw_rect(&mut self, color: Color, rect: Rect);
    /// Filled.
    fn draw_box(&mut self, color: Color, rect: Rect);
    fn draw_text(&mut self, font: &str, size: u32, color: Color, text: &str, at: Point);
    /// Copy `src` of a texture to `dst` on screen, stretching if sizes differ.
    fn copy(&mut self, texture: &Self::Texture, src: Rect, dst: Rect);
    /// Like [`RenderEngine::copy`], mirrored.
    fn copy_flipped(&mut self, texture: &Self::Texture, src: Rect, dst: Rect, flip_h: bool, flip_v: bool);
    /// Upload an image under `key`, replacing any previous texture of that key.
    fn store_texture(&mut self, key: &str, image: &image::RgbaImage) -> Self::Texture;
    fn texture(&self, key: &str) -> Option<Self::Texture>;
    fn present(&mut self);
    fn delay(&mut self, ms: u32);
    /// Milliseconds since the engine started.
    fn get_ticks(&self) -> u64;
    fn poll(&mut self) -> InputState;
    fn load_font(&mut self, name: &str, bytes: &[u8]) -> anyhow::Result<()>;
}

/// Draw the visible chunks of a chunker. `origin` is where the viewport's top left lands on screen,
/// `namespace` keeps texture keys of different drawings apart.
///
/// Chunks drawn for the first time or changed since are uploaded again. Returns how many were uploaded.
pub fn present_chunks<E: RenderEngine + ?Sized>(
    engine: &mut E,
    namespace: &str,
    chunker: &mut Chunker,
    palette: &Palette,
    viewport: &Viewport,
    origin: Point,
) -> usize {
    let view = viewport.rect();
    let layer = chunker.layer();
    let mut uploaded = 0;
    for coord in chunker.iter_viewport_chunks(view) {
        let Some(chunk) = chunker.get_chunk(coord) else {
            continue;
        };
        let bounds = chunk.bounds();
        let Some(visible) = bounds.overlap(&view) else {
            continue;
        };
        let key = format!("{namespace}/chunk-{layer}-{coord}");
        let texture = match engine.texture(&key) {
            Some(texture) if !chunk.is_dirty() => texture,
            _ => {
                uploaded += 1;
                log::trace!("uploading {key}");
                engine.store_texture(&key, chunk.bitmap(palette))
            }
        };
        let src = visible.translate(Point::ORIGIN - bounds.origin());
        let dst = visible.translate(origin - view.origin());
        engine.copy(&texture, src, dst);
    }
    uploaded
}

/// Draw a wallpaper behind a page. The quarter textures are uploaded once per wallpaper name.
pub fn present_wallpaper<E: RenderEngine + ?Sized>(
    engine: &mut E,
    wallpaper: &Wallpaper,
    page: crate::page::PageType,
    max: (i32, i32),
    viewport: &Viewport,
    origin: Point,
) {
    let view = viewport.rect();
    for tile in wallpaper.tiles(page, view, max) {
        let key = format!("wallpaper/{}/{}", wallpaper.name, tile.quarter);
        let texture = match engine.texture(&key) {
            Some(texture) => texture,
            None => engine.store_texture(&key, wallpaper.quarter(tile.quarter)),
        };
        let dst = tile.dest.translate(origin - view.origin());
        if tile.flip_h || tile.flip_v {
            engine.copy_flipped(&texture, tile.src, dst, tile.flip_h, tile.flip_v);
        } else {
            engine.copy(&texture, tile.src, dst);
        }
    }
}
