//! Rasterizing part of a level to an image, for previews and screenshots.

use crate::{
    archive::files,
    doodad::Doodad,
    drawing::Drawing,
    error::Error,
    geom::Rect,
    level::Level,
    wallpaper::Wallpaper,
};
use image::{imageops, Rgba, RgbaImage};

/// Previews stored in every level, by file name under `assets/screenshots/`.
pub const SCREENSHOT_SIZES: [(&str, u32, u32); 3] = [
    ("large.png", 1280, 720),
    ("medium.png", 640, 360),
    ("small.png", 320, 180),
];

/// Render a world rect of a level: wallpaper, then pixels, then actors whose doodads the level embeds.
pub fn render(level: &mut Level, view: Rect, wallpaper: Option<&Wallpaper>) -> Result<RgbaImage, Error> {
    let (Ok(width), Ok(height)) = (u32::try_from(view.w), u32::try_from(view.h)) else {
        return Err(Error::malformed(format_args!("screenshot of {view}")));
    };
    if width == 0 || height == 0 {
        return Err(Error::malformed(format_args!("screenshot of {view}")));
    }
    let mut canvas = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));

    if let Some(wallpaper) = wallpaper {
        for tile in wallpaper.tiles(level.page_type, view, level.max()) {
            let texture = wallpaper.quarter(tile.quarter);
            let mut piece = imageops::crop_imm(
                texture,
                to_u32(tile.src.x),
                to_u32(tile.src.y),
                to_u32(tile.src.w),
                to_u32(tile.src.h),
            )
            .to_image();
            if tile.flip_h {
                imageops::flip_horizontal_in_place(&mut piece);
            }
            if tile.flip_v {
                imageops::flip_vertical_in_place(&mut piece);
            }
            let at = tile.dest.origin() - view.origin();
            imageops::overlay(&mut canvas, &piece, at.x.into(), at.y.into());
        }
    }

    let palette = &level.palette;
    for coord in level.chunker.iter_viewport_chunks(view) {
        let Some(chunk) = level.chunker.get_chunk(coord) else {
            continue;
        };
        let at = chunk.bounds().origin() - view.origin();
        imageops::overlay(&mut canvas, chunk.bitmap(palette), at.x.into(), at.y.into());
    }

    for actor in level.actors.iter() {
        let Ok(bytes) = level.files.get(&files::doodad_key(&actor.filename)) else {
            log::trace!("screenshot: {} isn't embedded, skipping", actor.filename);
            continue;
        };
        let mut doodad = match Doodad::from_bytes(bytes) {
            Ok(doodad) => doodad,
            Err(e) => {
                log::error!("screenshot: load {}: {e}", actor.filename);
                continue;
            }
        };
        let palette = doodad.palette.clone();
        let chunker = &mut doodad.layers_mut()[0].chunker;
        let sprite = Rect::sized(chunker.size(), chunker.size());
        for coord in chunker.iter_viewport_chunks(sprite) {
            if let Some(chunk) = chunker.get_chunk(coord) {
                let at = actor.point + chunk.bounds().origin() - view.origin();
                imageops::overlay(&mut canvas, chunk.bitmap(&palette), at.x.into(), at.y.into());
            }
        }
    }
    Ok(canvas)
}

/// Render the previews from the level's scroll position, as PNG files by name.
pub fn level_screenshots(
    level: &mut Level,
    wallpaper: Option<&Wallpaper>,
) -> Result<Vec<(&'static str, Vec<u8>)>, Error> {
    let [(_, width, height), ..] = SCREENSHOT_SIZES;
    let view = Rect::new(
        level.scroll.x,
        level.scroll.y,
        i32::try_from(width).unwrap_or(i32::MAX),
        i32::try_from(height).unwrap_or(i32::MAX),
    );
    let large = render(level, view, wallpaper)?;
    SCREENSHOT_SIZES
        .into_iter()
        .map(|(name, w, h)| {
            let png = if (w, h) == large.dimensions() {
                encode_png(&large)?
            } else {
                encode_png(&imageops::resize(&large, w, h, imageops::FilterType::Triangle))?
            };
            Ok((name, png))
        })
        .collect()
}

pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, Error> {
    let mut out = std::io::Cursor::new(Vec::new());
    image.write_to(&mut out, image::ImageFormat::Png)?;
    Ok(out.into_inner())
}

fn to_u32(v: i32) -> u32 {
    u32::try_from(v).unwrap_or(0)
}

/// Save a screenshot of a world rect as a timestamped PNG in the user's screenshot directory.
pub fn save_screenshot(
    env: &crate::environment::Environment,
    level: &mut Level,
    view: Rect,
    wallpaper: Option<&Wallpaper>,
) -> Result<std::path::PathBuf, Error> {
    let image = {
        let _guard = env.screenshot_lock()?;
        render(level, view, wallpaper)?
    };
    let stamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |d| d.as_secs());
    let path = env.screenshots_dir().join(format!("screenshot-{stamp}.png"));
    std::fs::write(&path, encode_png(&image)?)?;
    log::info!("saved screenshot {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{actor::Actor, environment::Environment, geom::Point, settings::Settings};

    const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

    #[test]
    fn pixels_land_relative_to_view() {
        let mut level = Level::default();
        let solid = level.palette.get("solid").unwrap().index();
        level.chunker.set(Point::new(105, 52), solid);
        let image = render(&mut level, Rect::new(100, 50, 20, 10), None).unwrap();
        assert_eq!(image.dimensions(), (20, 10));
        assert_eq!(image.get_pixel(5, 2), &BLACK);
        assert_eq!(image.get_pixel(0, 0), &WHITE);
        assert!(render(&mut level, Rect::new(0, 0, 0, 10), None).is_err());
    }
    #[test]
    fn wallpaper_behind_pixels() {
        let mut level = Level::default();
        let red = Rgba([255, 0, 0, 255]);
        let paper = Wallpaper::from_image("red.png", &RgbaImage::from_pixel(8, 8, red)).unwrap();
        let solid = level.palette.get("solid").unwrap().index();
        level.chunker.set(Point::new(1, 1), solid);
        let image = render(&mut level, Rect::new(0, 0, 16, 16), Some(&paper)).unwrap();
        assert_eq!(image.get_pixel(0, 0), &red);
        assert_eq!(image.get_pixel(15, 15), &red);
        assert_eq!(image.get_pixel(1, 1), &BLACK);
    }
    #[test]
    fn embedded_actors_are_drawn() {
        let settings = Settings::default();
        let mut doodad = Doodad::new(10, &settings);
        let solid = doodad.palette.get("solid").unwrap().index();
        doodad.layers_mut()[0].chunker.set(Point::new(0, 0), solid);
        let bytes = doodad.to_bytes(crate::drawing::DrawingFormat::Json, &settings).unwrap();

        let mut level = Level::default();
        level.embed_doodad("dot.doodad", bytes);
        level.actors.add(Actor::new("dot.doodad", Point::new(30, 40)));
        level.actors.add(Actor::new("missing.doodad", Point::new(0, 0)));
        let image = render(&mut level, Rect::new(20, 20, 20, 30), None).unwrap();
        assert_eq!(image.get_pixel(10, 20), &BLACK);
        assert_eq!(image.get_pixel(11, 20), &WHITE);
    }
    #[test]
    fn previews_into_the_level() {
        let dir = tempfile::tempdir().unwrap();
        let env = Environment::new(dir.path(), Settings::default());
        let mut level = Level::default();
        level.update_screenshots(&env).unwrap();
        assert_eq!(
            level.files.list("assets/screenshots/"),
            ["assets/screenshots/large.png", "assets/screenshots/medium.png", "assets/screenshots/small.png"]
        );
        let small = image::load_from_memory(&level.files.get("assets/screenshots/small.png").unwrap()).unwrap();
        assert_eq!((small.width(), small.height()), (320, 180));

        let _busy = env.screenshot_lock().unwrap();
        let err = level.update_screenshots(&env).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Busy);
    }
    #[test]
    fn saved_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let env = Environment::new(dir.path(), Settings::default());
        env.init().unwrap();
        let mut level = Level::default();
        let path = save_screenshot(&env, &mut level, Rect::new(0, 0, 8, 8), None).unwrap();
        assert!(path.starts_with(env.screenshots_dir()));
        assert_eq!(image::open(&path).unwrap().width(), 8);
    }
}
