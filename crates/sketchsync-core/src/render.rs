//! Render engine capability and the clear-and-replay redraw.

use crate::config::{CanvasStyle, PenStyle};
use crate::history::StrokeHistory;
use crate::stroke::{StrokePoint, path_from_points};
use kurbo::BezPath;
use peniko::Color;

/// Drawing surface the controller paints on.
///
/// Implementations rasterize or record; they never see strokes as anything
/// but paths.
pub trait RenderEngine {
    /// Fill the whole surface with `color`.
    fn clear(&mut self, color: Color);

    /// Stroke `path` with `pen`. A path made of a lone `MoveTo` is a dot of
    /// the pen's diameter.
    fn stroke_path(&mut self, path: &BezPath, pen: &PenStyle);
}

/// Repaint the surface from scratch.
///
/// Clears to the background, strokes every sealed stroke oldest first, then
/// strokes `overlay` on top. Output depends only on the arguments.
pub fn redraw<R: RenderEngine + ?Sized>(
    engine: &mut R,
    style: &CanvasStyle,
    history: &StrokeHistory,
    overlay: Option<&[StrokePoint]>,
) {
    engine.clear(style.background_color());

    for stroke in history.iter().filter(|s| !s.is_empty()) {
        engine.stroke_path(&stroke.to_path(), &style.pen);
    }

    if let Some(points) = overlay.filter(|p| !p.is_empty()) {
        engine.stroke_path(&path_from_points(points), &style.pen);
    }
}

/// Engine that records calls instead of drawing.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingEngine {
    pub ops: Vec<RenderOp>,
}

#[cfg(test)]
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum RenderOp {
    Clear([u8; 4]),
    Stroke(Vec<kurbo::Point>),
}

#[cfg(test)]
impl RecordingEngine {
    /// Points of every stroke since the last clear.
    pub fn last_frame(&self) -> Vec<Vec<kurbo::Point>> {
        let start = self
            .ops
            .iter()
            .rposition(|op| matches!(op, RenderOp::Clear(_)))
            .map_or(0, |i| i + 1);
        self.ops[start..]
            .iter()
            .filter_map(|op| match op {
                RenderOp::Stroke(points) => Some(points.clone()),
                RenderOp::Clear(_) => None,
            })
            .collect()
    }

    pub fn clear_count(&self) -> usize {
        self.ops.iter().filter(|op| matches!(op, RenderOp::Clear(_))).count()
    }
}

#[cfg(test)]
impl RenderEngine for RecordingEngine {
    fn clear(&mut self, color: Color) {
        let c = color.to_rgba8();
        self.ops.push(RenderOp::Clear([c.r, c.g, c.b, c.a]));
    }

    fn stroke_path(&mut self, path: &BezPath, _pen: &PenStyle) {
        let points = path
            .elements()
            .iter()
            .filter_map(|el| match el {
                kurbo::PathEl::MoveTo(p) | kurbo::PathEl::LineTo(p) => Some(*p),
                _ => None,
            })
            .collect();
        self.ops.push(RenderOp::Stroke(points));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stroke::StrokeBuffer;
    use kurbo::Point;

    fn stroke(points: &[(f64, f64)]) -> StrokeBuffer {
        let mut stroke = StrokeBuffer::begin();
        for &(x, y) in points {
            stroke.append(Point::new(x, y)).unwrap();
        }
        stroke
    }

    fn pts(points: &[(f64, f64)]) -> Vec<Point> {
        points.iter().map(|&(x, y)| Point::new(x, y)).collect()
    }

    #[test]
    fn test_clear_comes_first_with_background() {
        let mut engine = RecordingEngine::default();
        redraw(&mut engine, &CanvasStyle::default(), &StrokeHistory::new(), None);
        assert_eq!(engine.ops, vec![RenderOp::Clear([255, 255, 255, 255])]);
    }

    #[test]
    fn test_history_in_order_then_overlay() {
        let mut history = StrokeHistory::new();
        history.commit(stroke(&[(0.0, 0.0), (10.0, 10.0)]));
        history.commit(stroke(&[(10.0, 0.0), (0.0, 10.0)]));
        let overlay = stroke(&[(5.0, 5.0), (6.0, 6.0)]);

        let mut engine = RecordingEngine::default();
        redraw(&mut engine, &CanvasStyle::default(), &history, Some(overlay.points()));

        assert_eq!(
            engine.last_frame(),
            vec![
                pts(&[(0.0, 0.0), (10.0, 10.0)]),
                pts(&[(10.0, 0.0), (0.0, 10.0)]),
                pts(&[(5.0, 5.0), (6.0, 6.0)]),
            ]
        );
    }

    #[test]
    fn test_history_only_strokes_in_order() {
        let mut history = StrokeHistory::new();
        history.commit(stroke(&[(0.0, 0.0), (10.0, 10.0)]));
        history.commit(stroke(&[(10.0, 0.0), (0.0, 10.0)]));

        let mut engine = RecordingEngine::default();
        redraw(&mut engine, &CanvasStyle::default(), &history, None);

        assert_eq!(engine.clear_count(), 1);
        assert!(matches!(engine.ops[0], RenderOp::Clear(_)));
        assert_eq!(
            engine.last_frame(),
            vec![pts(&[(0.0, 0.0), (10.0, 10.0)]), pts(&[(10.0, 0.0), (0.0, 10.0)])]
        );
    }

    #[test]
    fn test_empty_overlay_draws_nothing() {
        let mut history = StrokeHistory::new();
        history.commit(stroke(&[(1.0, 1.0)]));

        let mut engine = RecordingEngine::default();
        redraw(&mut engine, &CanvasStyle::default(), &history, Some(&[]));
        assert_eq!(engine.last_frame(), vec![pts(&[(1.0, 1.0)])]);
    }

    #[test]
    fn test_redraw_is_repeatable() {
        let mut history = StrokeHistory::new();
        history.commit(stroke(&[(1.0, 2.0), (3.0, 4.0)]));
        let overlay = stroke(&[(7.0, 7.0)]);

        let mut first = RecordingEngine::default();
        let mut second = RecordingEngine::default();
        redraw(&mut first, &CanvasStyle::default(), &history, Some(overlay.points()));
        redraw(&mut second, &CanvasStyle::default(), &history, Some(overlay.points()));
        assert_eq!(first.ops, second.ops);
    }
}
