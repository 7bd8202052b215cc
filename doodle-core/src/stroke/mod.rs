//! # Strokes
//!
//! A stroke is one drawing operation: the pixels a pencil drag, line, rectangle, ellipse or eraser touched,
//! plus what was under them before, so the operation can be undone. Strokes are also the unit of the
//! [`History`].

mod history;

pub use history::History;

use crate::{
    color::Color,
    geom::{iter_ellipse, iter_line, iter_rect, Point, Rect},
    id::UniqueId,
    palette::PaletteIndex,
};
use either::Either;
use hashbrown::{HashMap, HashSet};

pub type StrokeId = UniqueId<Stroke>;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
pub enum Shape {
    #[default]
    Freehand,
    Line,
    Rectangle,
    Ellipse,
    /// Freehand, deleting instead of painting.
    Eraser,
}

#[derive(Clone, Debug)]
pub struct Stroke {
    id: StrokeId,
    pub shape: Shape,
    /// Color shown while the stroke is live, before it's committed.
    pub color: Color,
    /// What gets painted. `None` for erasers.
    pub swatch: Option<PaletteIndex>,
    /// Half the side of the square brush. Zero paints single pixels.
    pub thickness: i32,
    pub point_a: Point,
    pub point_b: Point,
    points: Vec<Point>,
    seen: HashSet<Point>,
    /// What was under the stroke before it was committed, for undo.
    pub original_points: HashMap<Point, PaletteIndex>,
    /// Anything else the editor wants to remember about this stroke.
    pub extra_data: Option<serde_json::Value>,
}

impl Stroke {
    #[must_use]
    pub fn new(shape: Shape, color: Color) -> Self {
        Self {
            id: StrokeId::default(),
            shape,
            color,
            swatch: None,
            thickness: 0,
            point_a: Point::ORIGIN,
            point_b: Point::ORIGIN,
            points: Vec::new(),
            seen: HashSet::new(),
            original_points: HashMap::new(),
            extra_data: None,
        }
    }
    #[must_use]
    pub fn with_swatch(mut self, swatch: PaletteIndex) -> Self {
        self.swatch = Some(swatch);
        self
    }
    #[must_use]
    pub fn with_thickness(mut self, thickness: i32) -> Self {
        self.thickness = thickness.max(0);
        self
    }
    #[must_use]
    pub fn between(mut self, a: Point, b: Point) -> Self {
        self.point_a = a;
        self.point_b = b;
        self
    }
    #[must_use]
    pub fn id(&self) -> StrokeId {
        self.id
    }
    /// Same shape, color and brush under a new id, with no points.
    #[must_use]
    pub fn copy(&self) -> Self {
        Self {
            swatch: self.swatch,
            thickness: self.thickness,
            ..Self::new(self.shape, self.color)
        }
    }
    #[must_use]
    pub fn is_eraser(&self) -> bool {
        self.shape == Shape::Eraser
    }

    /// Add a freehand point. Points already in the stroke are ignored.
    pub fn add_point(&mut self, p: Point) {
        if self.seen.insert(p) {
            self.points.push(p);
        }
    }
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Every pixel the stroke covers, ignoring thickness.
    pub fn iter_points(&self) -> impl Iterator<Item = Point> + '_ {
        match self.shape {
            Shape::Freehand | Shape::Eraser => Either::Left(self.points.iter().copied()),
            Shape::Line => Either::Right(Either::Left(iter_line(self.point_a, self.point_b))),
            Shape::Rectangle => Either::Right(Either::Right(Either::Left(iter_rect(
                self.point_a,
                self.point_b,
            )))),
            Shape::Ellipse => Either::Right(Either::Right(Either::Right(iter_ellipse(
                self.point_a,
                self.point_b,
            )))),
        }
    }
    /// The square brush rect around each point.
    pub fn iter_thick_rects(&self) -> impl Iterator<Item = Rect> + '_ {
        let t = self.thickness;
        self.iter_points()
            .map(move |p| Rect::new(p.x - t, p.y - t, t * 2, t * 2))
    }
    /// Remember what was at a point before painting over it. Only the first record for each point sticks.
    pub fn record_original(&mut self, p: Point, index: PaletteIndex) {
        self.original_points.entry(p).or_insert(index);
    }
    /// Area touched, for redrawing.
    #[must_use]
    pub fn bounds(&self) -> Option<Rect> {
        let t = self.thickness;
        // Thin strokes cover their points, thick ones the brush rects around them.
        let span = if t > 0 { 2 * t } else { 1 };
        let mut points = self.iter_points();
        let first = points.next()?;
        let (mut low, mut high) = (first, first);
        for p in points {
            low = Point::new(low.x.min(p.x), low.y.min(p.y));
            high = Point::new(high.x.max(p.x), high.y.max(p.y));
        }
        Some(Rect::new(
            low.x - t,
            low.y - t,
            high.x - low.x + span,
            high.y - low.y + span,
        ))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn freehand_dedupes() {
        let mut stroke = Stroke::new(Shape::Freehand, Color::BLACK);
        for p in [(1, 1), (2, 1), (1, 1), (3, 3), (2, 1)] {
            stroke.add_point(Point::new(p.0, p.1));
        }
        assert_eq!(
            stroke.iter_points().collect::<Vec<_>>(),
            [Point::new(1, 1), Point::new(2, 1), Point::new(3, 3)]
        );
    }
    #[test]
    fn shapes() {
        let line = Stroke::new(Shape::Line, Color::BLACK).between(Point::new(0, 0), Point::new(4, 2));
        let points: Vec<_> = line.iter_points().collect();
        assert_eq!(points.first(), Some(&Point::new(0, 0)));
        assert_eq!(points.last(), Some(&Point::new(4, 2)));
        assert_eq!(points.len(), 5);

        let rect = Stroke::new(Shape::Rectangle, Color::BLACK).between(Point::new(0, 0), Point::new(3, 3));
        let border: HashSet<_> = rect.iter_points().collect();
        assert_eq!(border.len(), 12);
        assert!(!border.contains(&Point::new(1, 1)));

        let ellipse = Stroke::new(Shape::Ellipse, Color::BLACK).between(Point::new(0, 0), Point::new(10, 6));
        assert!(ellipse
            .iter_points()
            .all(|p| (0..=10).contains(&p.x) && (0..=6).contains(&p.y)));
        assert!(ellipse.iter_points().count() > 0);
    }
    #[test]
    fn thick_rects() {
        let mut stroke = Stroke::new(Shape::Freehand, Color::BLACK).with_thickness(2);
        stroke.add_point(Point::new(10, 10));
        assert_eq!(
            stroke.iter_thick_rects().collect::<Vec<_>>(),
            [Rect::new(8, 8, 4, 4)]
        );
        assert_eq!(stroke.bounds(), Some(Rect::new(8, 8, 4, 4)));
        stroke.add_point(Point::new(12, 10));
        assert_eq!(stroke.bounds(), Some(Rect::new(8, 8, 6, 4)));
        assert_eq!(Stroke::new(Shape::Eraser, Color::WHITE).bounds(), None);
    }
    #[test]
    fn ids_and_copies() {
        let mut a = Stroke::new(Shape::Line, Color::RED).with_swatch(PaletteIndex(1));
        a.record_original(Point::new(1, 1), PaletteIndex(3));
        a.record_original(Point::new(1, 1), PaletteIndex(4));
        assert_eq!(a.original_points[&Point::new(1, 1)], PaletteIndex(3));
        let b = a.copy();
        assert_ne!(a.id(), b.id());
        assert_eq!(b.swatch, Some(PaletteIndex(1)));
        assert!(b.original_points.is_empty());
    }
}
