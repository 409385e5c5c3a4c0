//! Freehand stroke model.
//!
//! A stroke is the ordered list of points captured between pen-down and
//! pen-up. Buffers are append-only and become immutable once sealed.

use kurbo::{BezPath, Point};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stroke model errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StrokeError {
    #[error("Cannot append to a sealed stroke")]
    Sealed,
}

/// A single sampled pen position.
///
/// `is_continuation` is `false` for the pen-down point and `true` for every
/// point after it. On the wire the flag is called `isDrawing`; senders that
/// omit it are read as pen-down points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrokePoint {
    pub x: f64,
    pub y: f64,
    #[serde(rename = "isDrawing", default)]
    pub is_continuation: bool,
}

impl StrokePoint {
    /// Create a pen-down point.
    pub fn start(position: Point) -> Self {
        Self {
            x: position.x,
            y: position.y,
            is_continuation: false,
        }
    }

    /// Create a point continuing the current stroke.
    pub fn continuation(position: Point) -> Self {
        Self {
            x: position.x,
            y: position.y,
            is_continuation: true,
        }
    }

    /// Position as a kurbo point.
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Build a path through `points`: move to the first, line to the rest.
///
/// A single point yields a lone `MoveTo`, which render engines draw as a dot.
pub fn path_from_points(points: &[StrokePoint]) -> BezPath {
    let mut path = BezPath::new();

    let Some(first) = points.first() else {
        return path;
    };

    path.move_to(first.position());
    for point in &points[1..] {
        path.line_to(point.position());
    }

    path
}

/// An in-progress or completed pen gesture.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StrokeBuffer {
    points: Vec<StrokePoint>,
    sealed: bool,
}

impl StrokeBuffer {
    /// Begin a new, empty, appendable stroke.
    pub fn begin() -> Self {
        Self::default()
    }

    /// Append a position to the stroke.
    ///
    /// The continuation flag is derived from the buffer: the first point is
    /// the pen-down point, every later one continues it.
    pub fn append(&mut self, position: Point) -> Result<&StrokePoint, StrokeError> {
        if self.sealed {
            return Err(StrokeError::Sealed);
        }

        let point = if self.points.is_empty() {
            StrokePoint::start(position)
        } else {
            StrokePoint::continuation(position)
        };
        self.points.push(point);

        Ok(&self.points[self.points.len() - 1])
    }

    /// Mark the stroke as complete. Sealing twice is a no-op.
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    /// Whether the stroke no longer accepts points.
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Points in capture order.
    pub fn points(&self) -> &[StrokePoint] {
        &self.points
    }

    /// Get the number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the stroke is empty.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Path through every point of the stroke.
    pub fn to_path(&self) -> BezPath {
        path_from_points(&self.points)
    }
}
