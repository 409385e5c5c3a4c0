//! Ordered record of sealed strokes used to rebuild the canvas.

use crate::stroke::StrokeBuffer;

/// Sealed strokes in draw order (back to front).
///
/// History only grows. Clearing the canvas during a redraw never touches it.
#[derive(Debug, Clone, Default)]
pub struct StrokeHistory {
    strokes: Vec<StrokeBuffer>,
}

impl StrokeHistory {
    /// Create an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seal `stroke` and append it on top of everything drawn so far.
    pub fn commit(&mut self, mut stroke: StrokeBuffer) {
        stroke.seal();
        self.strokes.push(stroke);
    }

    /// Strokes oldest first.
    pub fn iter(&self) -> std::slice::Iter<'_, StrokeBuffer> {
        self.strokes.iter()
    }

    /// Get a stroke by position in draw order.
    pub fn get(&self, index: usize) -> Option<&StrokeBuffer> {
        self.strokes.get(index)
    }

    /// Number of sealed strokes.
    pub fn len(&self) -> usize {
        self.strokes.len()
    }

    /// Check if nothing has been committed yet.
    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }
}

impl<'a> IntoIterator for &'a StrokeHistory {
    type Item = &'a StrokeBuffer;
    type IntoIter = std::slice::Iter<'a, StrokeBuffer>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Point;

    fn stroke(points: &[(f64, f64)]) -> StrokeBuffer {
        let mut stroke = StrokeBuffer::begin();
        for &(x, y) in points {
            stroke.append(Point::new(x, y)).unwrap();
        }
        stroke
    }

    #[test]
    fn test_commit_seals() {
        let mut history = StrokeHistory::new();
        history.commit(stroke(&[(0.0, 0.0), (1.0, 1.0)]));

        assert_eq!(history.len(), 1);
        assert!(history.get(0).unwrap().is_sealed());
    }

    #[test]
    fn test_insertion_order_is_draw_order() {
        let mut history = StrokeHistory::new();
        history.commit(stroke(&[(1.0, 1.0)]));
        history.commit(stroke(&[(2.0, 2.0)]));
        history.commit(stroke(&[(3.0, 3.0)]));

        let firsts: Vec<f64> = history.iter().map(|s| s.points()[0].x).collect();
        assert_eq!(firsts, vec![1.0, 2.0, 3.0]);
    }
}
