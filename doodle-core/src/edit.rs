//! Applying strokes to a drawing layer, undoably.

use crate::{
    chunker::Chunker,
    error::Error,
    geom::Point,
    palette::{PaletteIndex, Swatch},
    stroke::{History, Shape, Stroke},
};
use std::collections::VecDeque;

/// Edits one chunker, recording every change in a history.
pub struct Editor<'a> {
    chunker: &'a mut Chunker,
    history: &'a mut History,
}

impl<'a> Editor<'a> {
    pub fn new(chunker: &'a mut Chunker, history: &'a mut History) -> Self {
        Self { chunker, history }
    }
    #[must_use]
    pub fn history(&self) -> &History {
        self.history
    }

    /// Paint (or erase) a finished stroke into the drawing and add it to the history.
    pub fn commit(&mut self, mut stroke: Stroke) -> Result<(), Error> {
        apply(self.chunker, &mut stroke)?;
        log::debug!(
            "committed {} {} ({} pixels replaced)",
            stroke.shape,
            stroke.id(),
            stroke.original_points.len()
        );
        self.history.push(stroke);
        Ok(())
    }
    /// Revert the latest stroke. `false` if there was nothing to undo.
    pub fn undo(&mut self) -> bool {
        if let Some(stroke) = self.history.latest() {
            revert(self.chunker, stroke);
        }
        self.history.undo()
    }
    /// Re-apply the most recently undone stroke. `false` if there was nothing to redo.
    pub fn redo(&mut self) -> bool {
        if !self.history.redo() {
            return false;
        }
        let Some(stroke) = self.history.latest_mut() else {
            return false;
        };
        stroke.original_points.clear();
        if let Err(e) = apply(self.chunker, stroke) {
            log::error!("redo {}: {e}", stroke.id());
            return false;
        }
        true
    }

    /// Fill the area of same-colored pixels around `at` with `swatch`, recorded as a freehand stroke.
    ///
    /// Filling stops `limit` pixels away from `at` in either axis, or `void_limit` when `at` is empty,
    /// since the empty space around a drawing never ends. Returns how many pixels were filled.
    pub fn flood_fill(&mut self, at: Point, swatch: &Swatch, limit: i32, void_limit: i32) -> usize {
        let target = swatch.index();
        let base = self.chunker.get(at);
        if base == Some(target) {
            return 0;
        }
        let limit = if base.is_none() {
            log::debug!("flood fill at {at} starts in empty space");
            void_limit
        } else {
            limit
        };

        let mut stroke = Stroke::new(Shape::Freehand, swatch.color).with_swatch(target);
        let mut queue = VecDeque::from([at]);
        let mut visited = hashbrown::HashSet::new();
        while let Some(node) = queue.pop_front() {
            if !visited.insert(node) {
                continue;
            }
            let here = self.chunker.get(node);
            if here != base {
                continue;
            }
            if let Some(index) = here {
                stroke.record_original(node, index);
            }
            for neighbor in [
                Point::new(node.x - 1, node.y),
                Point::new(node.x + 1, node.y),
                Point::new(node.x, node.y - 1),
                Point::new(node.x, node.y + 1),
            ] {
                if (neighbor.x - at.x).abs() <= limit
                    && (neighbor.y - at.y).abs() <= limit
                    && !visited.contains(&neighbor)
                {
                    queue.push_back(neighbor);
                }
            }
            stroke.add_point(node);
            self.chunker.set(node, target);
        }

        let filled = stroke.points().len();
        log::debug!("flood filled {filled} pixels from {at}");
        self.history.push(stroke);
        filled
    }
}

/// Paint a stroke, recording what it covers.
fn apply(chunker: &mut Chunker, stroke: &mut Stroke) -> Result<(), Error> {
    let erasing = stroke.is_eraser();
    let swatch = match (erasing, stroke.swatch) {
        (true, _) => PaletteIndex::NULL,
        (false, Some(swatch)) => swatch,
        (false, None) => {
            return Err(Error::Invariant(format!("stroke {} has no swatch", stroke.id())));
        }
    };

    if stroke.thickness > 0 {
        let rects: Vec<_> = stroke.iter_thick_rects().collect();
        // Only erasers remember what thick brushes cover: restoring a painted-over area is too costly.
        if erasing {
            for &rect in &rects {
                for (p, index) in chunker.read_rect(rect) {
                    stroke.record_original(p, index);
                }
            }
        }
        for rect in rects {
            if erasing {
                chunker.delete_rect(rect);
            } else {
                chunker.set_rect(rect, swatch);
            }
        }
    } else {
        let points: Vec<_> = stroke.iter_points().collect();
        for p in points {
            if let Some(index) = chunker.get(p) {
                stroke.record_original(p, index);
            }
            if erasing {
                // Erasing empty space is fine.
                let _ = chunker.delete(p);
            } else {
                chunker.set(p, swatch);
            }
        }
    }
    Ok(())
}

/// Put back what a stroke covered.
fn revert(chunker: &mut Chunker, stroke: &Stroke) {
    if stroke.thickness > 0 {
        if stroke.is_eraser() {
            for (&p, &index) in &stroke.original_points {
                chunker.set(p, index);
            }
        } else {
            for rect in stroke.iter_thick_rects() {
                chunker.delete_rect(rect);
            }
        }
        return;
    }
    for p in stroke.iter_points() {
        match stroke.original_points.get(&p) {
            Some(&index) => {
                chunker.set(p, index);
            }
            None => {
                let _ = chunker.delete(p);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{color::Color, geom::Rect, palette::Palette};

    fn snapshot(chunker: &mut Chunker) -> Vec<(Point, PaletteIndex)> {
        let mut pixels: Vec<_> = chunker.iter().collect();
        pixels.sort_unstable_by_key(|(p, _)| (p.y, p.x));
        pixels
    }

    #[test]
    fn undo_is_an_inverse() {
        let mut chunker = Chunker::new(16);
        chunker.set_rect(Rect::new(0, 0, 10, 3), PaletteIndex(1));
        chunker.set(Point::new(30, 30), PaletteIndex(2));
        let before = snapshot(&mut chunker);
        let mut history = History::new(10);
        let mut editor = Editor::new(&mut chunker, &mut history);

        let line = Stroke::new(Shape::Line, Color::RED)
            .with_swatch(PaletteIndex(0))
            .between(Point::new(-5, 1), Point::new(20, 1));
        editor.commit(line).unwrap();
        assert_eq!(editor.history().latest().unwrap().original_points.len(), 10);
        let after = snapshot(editor.chunker);
        assert!(after.contains(&(Point::new(-5, 1), PaletteIndex(0))));

        assert!(editor.undo());
        assert_eq!(snapshot(editor.chunker), before);
        assert!(editor.redo());
        assert_eq!(snapshot(editor.chunker), after);
        assert!(!editor.redo());
    }
    #[test]
    fn eraser_round_trip() {
        let mut chunker = Chunker::new(8);
        chunker.set_rect(Rect::new(0, 0, 20, 20), PaletteIndex(3));
        let before = snapshot(&mut chunker);
        let mut history = History::new(10);
        let mut editor = Editor::new(&mut chunker, &mut history);

        let mut eraser = Stroke::new(Shape::Eraser, Color::WHITE).with_thickness(3);
        eraser.add_point(Point::new(10, 10));
        eraser.add_point(Point::new(18, 18));
        editor.commit(eraser).unwrap();
        assert_eq!(editor.chunker.get(Point::new(10, 10)), None);
        assert_eq!(editor.chunker.get(Point::new(0, 0)), Some(PaletteIndex(3)));

        assert!(editor.undo());
        assert_eq!(snapshot(editor.chunker), before);
    }
    #[test]
    fn thick_paint_undo_clears() {
        let mut chunker = Chunker::new(8);
        let mut history = History::new(10);
        let mut editor = Editor::new(&mut chunker, &mut history);
        let mut brush = Stroke::new(Shape::Freehand, Color::BLACK)
            .with_swatch(PaletteIndex(0))
            .with_thickness(2);
        brush.add_point(Point::new(5, 5));
        editor.commit(brush).unwrap();
        assert_eq!(editor.chunker.iter().count(), 16);
        assert!(editor.undo());
        assert_eq!(editor.chunker.iter().count(), 0);
        assert!(editor.chunker.iter_chunks().is_empty());
    }
    #[test]
    fn needs_a_swatch() {
        let mut chunker = Chunker::new(8);
        let mut history = History::new(10);
        let mut editor = Editor::new(&mut chunker, &mut history);
        let mut stroke = Stroke::new(Shape::Freehand, Color::BLACK);
        stroke.add_point(Point::ORIGIN);
        let err = editor.commit(stroke).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Invariant);
        assert!(editor.history().is_empty());
    }
    #[test]
    fn flood_fill_bounded_area() {
        let palette = Palette::default_palette();
        let solid = palette.get("solid").unwrap();
        let water = palette.get("water").unwrap();
        let mut chunker = Chunker::new(16);
        // A 5x5 box outline, filled inside.
        let outline = Stroke::new(Shape::Rectangle, Color::BLACK)
            .with_swatch(solid.index())
            .between(Point::new(0, 0), Point::new(6, 6));
        let mut history = History::new(10);
        let mut editor = Editor::new(&mut chunker, &mut history);
        editor.commit(outline).unwrap();

        assert_eq!(editor.flood_fill(Point::new(3, 3), water, 1200, 20), 25);
        assert_eq!(editor.chunker.get(Point::new(1, 1)), Some(water.index()));
        assert_eq!(editor.chunker.get(Point::new(7, 7)), None);
        // Filling with the same color is a no-op.
        assert_eq!(editor.flood_fill(Point::new(3, 3), water, 1200, 20), 0);
        assert_eq!(editor.history().len(), 2);

        assert!(editor.undo());
        assert_eq!(editor.chunker.get(Point::new(3, 3)), None);
        assert_eq!(editor.chunker.get(Point::new(0, 3)), Some(solid.index()));

        // Empty space is capped by the void limit.
        assert_eq!(editor.flood_fill(Point::new(100, 100), water, 1200, 2), 25);
    }
}
