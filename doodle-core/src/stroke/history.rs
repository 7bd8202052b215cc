use super::Stroke;
use std::collections::VecDeque;

/// Bounded undo history of strokes.
///
/// Strokes before the cursor are applied to the drawing; those after it were undone and can be redone,
/// until a new stroke is pushed and drops them.
#[derive(Clone, Debug)]
pub struct History {
    limit: usize,
    strokes: VecDeque<Stroke>,
    cursor: usize,
}

impl History {
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            strokes: VecDeque::with_capacity(limit.min(64)),
            cursor: 0,
        }
    }
    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }
    pub fn reset(&mut self) {
        self.strokes.clear();
        self.cursor = 0;
    }
    /// Strokes held, including undone ones that could still be redone.
    #[must_use]
    pub fn len(&self) -> usize {
        self.strokes.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }
    /// The most recently applied stroke. `None` if everything was undone.
    #[must_use]
    pub fn latest(&self) -> Option<&Stroke> {
        self.cursor.checked_sub(1).and_then(|i| self.strokes.get(i))
    }
    pub fn latest_mut(&mut self) -> Option<&mut Stroke> {
        self.cursor.checked_sub(1).and_then(|i| self.strokes.get_mut(i))
    }
    /// The oldest stroke still held, applied or not.
    #[must_use]
    pub fn oldest(&self) -> Option<&Stroke> {
        self.strokes.front()
    }
    /// Add a newly committed stroke, dropping any undone strokes and, past the limit, the oldest.
    pub fn push(&mut self, stroke: Stroke) {
        self.strokes.truncate(self.cursor);
        self.strokes.push_back(stroke);
        while self.strokes.len() > self.limit {
            self.strokes.pop_front();
        }
        self.cursor = self.strokes.len();
    }
    /// Step back one stroke. `false` if there was nothing left to undo.
    pub fn undo(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        true
    }
    /// Step forward over an undone stroke, which [`History::latest`] then returns.
    pub fn redo(&mut self) -> bool {
        if self.cursor >= self.strokes.len() {
            return false;
        }
        self.cursor += 1;
        true
    }
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.cursor < self.strokes.len()
    }
}

#[cfg(test)]
mod test {
    use super::History;
    use crate::{
        color::Color,
        geom::Point,
        stroke::{Shape, Stroke},
    };

    fn stroke(i: i32) -> Stroke {
        Stroke::new(Shape::Line, Color::BLACK).between(Point::new(i, i), Point::new(i, i))
    }
    fn latest(history: &History) -> Option<Point> {
        history.latest().map(|s| s.point_a)
    }

    #[test]
    fn undo_the_only_stroke() {
        let mut history = History::new(10);
        assert!(!history.undo());
        history.push(stroke(999));
        assert_eq!(history.len(), 1);
        assert!(history.undo());
        assert!(history.latest().is_none());
        assert!(!history.undo());
        // Undoing everything still leaves it redoable.
        assert!(history.redo());
        assert_eq!(latest(&history), Some(Point::new(999, 999)));
    }
    #[test]
    fn undo_redo_and_branching() {
        let mut history = History::new(10);
        history.push(stroke(1));
        history.push(stroke(2));
        assert!(history.undo());
        assert_eq!(history.len(), 2);
        assert_eq!(latest(&history), Some(Point::new(1, 1)));
        assert!(history.redo());
        assert_eq!(latest(&history), Some(Point::new(2, 2)));
        assert!(!history.redo());

        for i in 3..=6 {
            history.push(stroke(i));
        }
        assert_eq!(history.len(), 6);
        assert!(history.undo() && history.undo() && history.undo());
        assert_eq!(history.len(), 6);
        history.push(stroke(7));
        assert_eq!(history.len(), 4);
        assert!(!history.redo());
        assert_eq!(latest(&history), Some(Point::new(7, 7)));
    }
    #[test]
    fn overflow_drops_oldest() {
        let mut history = History::new(10);
        for i in 1..=16 {
            history.push(stroke(i));
        }
        assert_eq!(history.len(), 10);
        assert_eq!(history.oldest().map(|s| s.point_a), Some(Point::new(7, 7)));
        assert_eq!(latest(&history), Some(Point::new(16, 16)));

        for _ in 0..10 {
            assert!(history.undo());
        }
        assert!(history.latest().is_none());
        assert!(!history.undo());
        assert!(history.can_redo());
        history.reset();
        assert!(history.is_empty() && !history.can_redo());
    }
}
