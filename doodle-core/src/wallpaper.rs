//! # Wallpaper
//!
//! A wallpaper is one image cut into four quarters:
//!
//! ```text
//! +--------+--------+
//! | corner | top    |
//! +--------+--------+
//! | left   | repeat |
//! +--------+--------+
//! ```
//!
//! Pages with an origin put the corner at `0,0`, run the top and left quarters along their edges and
//! fill the rest with the repeating quarter. Unbounded pages only repeat. Bordered pages mirror the
//! edges along their far sides too.

use crate::{
    error::Error,
    geom::{floor_div, Rect},
    page::PageType,
};
use image::RgbaImage;

/// Wallpaper of new levels.
pub const DEFAULT_WALLPAPER: &str = "notebook.png";

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, strum::Display)]
pub enum Quarter {
    Corner,
    Top,
    Left,
    Repeat,
}

/// One quarter to draw, in world coordinates.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Tile {
    pub quarter: Quarter,
    /// Part of the quarter texture to copy, already flipped if asked.
    pub src: Rect,
    pub dest: Rect,
    pub flip_h: bool,
    pub flip_v: bool,
}

#[derive(Clone, Debug)]
pub struct Wallpaper {
    pub name: String,
    quarters: [RgbaImage; 4],
}

impl Wallpaper {
    /// Cut an image into quarters. Odd sizes lose their last row or column.
    pub fn from_image(name: impl Into<String>, image: &RgbaImage) -> Result<Self, Error> {
        let (w, h) = (image.width() / 2, image.height() / 2);
        if w == 0 || h == 0 {
            return Err(Error::malformed(format_args!(
                "wallpaper of {}x{} is too small to quarter",
                image.width(),
                image.height()
            )));
        }
        let cut = |x, y| image::imageops::crop_imm(image, x, y, w, h).to_image();
        Ok(Self {
            name: name.into(),
            quarters: [cut(0, 0), cut(w, 0), cut(0, h), cut(w, h)],
        })
    }
    /// Decode an image file, PNG or any other format the `image` crate was built with.
    pub fn from_bytes(name: impl Into<String>, bytes: &[u8]) -> Result<Self, Error> {
        let image = image::load_from_memory(bytes)?.to_rgba8();
        Self::from_image(name, &image)
    }
    /// Width and height of one quarter.
    #[must_use]
    pub fn quarter_size(&self) -> (i32, i32) {
        let corner = &self.quarters[0];
        (
            i32::try_from(corner.width()).unwrap_or(i32::MAX),
            i32::try_from(corner.height()).unwrap_or(i32::MAX),
        )
    }
    #[must_use]
    pub fn quarter(&self, quarter: Quarter) -> &RgbaImage {
        &self.quarters[quarter as usize]
    }

    /// What to draw, bottom to top, to cover `view` on a page of the given type and size.
    #[must_use]
    pub fn tiles(&self, page: PageType, view: Rect, max: (i32, i32)) -> Vec<Tile> {
        let (qw, qh) = self.quarter_size();
        let mut tiles = Vec::new();
        let Some(area) = page_area(page, max).overlap(&view) else {
            return tiles;
        };

        let mut push = |quarter, x, y, flip_h, flip_v| {
            let dest = Rect::new(x, y, qw, qh);
            let Some(visible) = dest.overlap(&area) else {
                return;
            };
            let mut src = Rect::new(visible.x - x, visible.y - y, visible.w, visible.h);
            if flip_h {
                src.x = qw - src.x - src.w;
            }
            if flip_v {
                src.y = qh - src.y - src.h;
            }
            tiles.push(Tile {
                quarter,
                src,
                dest: visible,
                flip_h,
                flip_v,
            });
        };

        let (x0, y0) = (floor_div(area.x, qw) * qw, floor_div(area.y, qh) * qh);
        let (x1, y1) = (area.x + area.w, area.y + area.h);
        for y in (y0..y1).step_by(qh as usize) {
            for x in (x0..x1).step_by(qw as usize) {
                push(Quarter::Repeat, x, y, false, false);
            }
        }
        if page.has_origin() {
            for y in (y0..y1).step_by(qh as usize) {
                push(Quarter::Left, 0, y, false, false);
            }
            for x in (x0..x1).step_by(qw as usize) {
                push(Quarter::Top, x, 0, false, false);
            }
            push(Quarter::Corner, 0, 0, false, false);
        }
        if page == PageType::Bordered {
            let (right, bottom) = (max.0 - qw, max.1 - qh);
            if max.0 > 0 {
                for y in (y0..y1).step_by(qh as usize) {
                    push(Quarter::Left, right, y, true, false);
                }
            }
            if max.1 > 0 {
                for x in (x0..x1).step_by(qw as usize) {
                    push(Quarter::Top, x, bottom, false, true);
                }
            }
            if max.0 > 0 {
                push(Quarter::Corner, right, 0, true, false);
            }
            if max.1 > 0 {
                push(Quarter::Corner, 0, bottom, false, true);
            }
            if max.0 > 0 && max.1 > 0 {
                push(Quarter::Corner, right, bottom, true, true);
            }
        }
        tiles
    }
}

/// The part of the world a page covers.
fn page_area(page: PageType, (max_w, max_h): (i32, i32)) -> Rect {
    if !page.has_origin() {
        return Rect::new(i32::MIN / 2, i32::MIN / 2, i32::MAX, i32::MAX);
    }
    let w = if page.is_bounded() && max_w > 0 { max_w } else { i32::MAX / 2 };
    let h = if page.is_bounded() && max_h > 0 { max_h } else { i32::MAX / 2 };
    Rect::new(0, 0, w, h)
}
