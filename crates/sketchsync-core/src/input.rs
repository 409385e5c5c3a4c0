//! Pointer input and client-to-canvas coordinate mapping.

use kurbo::{Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Pointer event in client (window-relative) coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PointerEvent {
    Down { position: Point },
    Move { position: Point },
    Up { position: Point },
}

impl PointerEvent {
    /// Client position carried by the event.
    pub fn position(&self) -> Point {
        match *self {
            PointerEvent::Down { position }
            | PointerEvent::Move { position }
            | PointerEvent::Up { position } => position,
        }
    }
}

/// Where the canvas sits in client coordinates.
///
/// Raw pointer positions are window-relative; strokes are stored relative to
/// the canvas' top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasBounds {
    rect: Rect,
}

impl CanvasBounds {
    /// Canvas occupying `rect` in client coordinates.
    pub fn new(rect: Rect) -> Self {
        Self { rect }
    }

    /// Canvas of `size` whose top-left corner is the client origin.
    pub fn at_origin(size: Size) -> Self {
        Self {
            rect: Rect::from_origin_size(Point::ZERO, size),
        }
    }

    /// Bounding box in client coordinates.
    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// Move the canvas, e.g. after the page scrolled or the window moved.
    pub fn set_origin(&mut self, origin: Point) {
        self.rect = self.rect.with_origin(origin);
    }

    /// Map a client position to canvas-local coordinates.
    pub fn to_local(&self, client: Point) -> Point {
        client - Vec2::new(self.rect.x0, self.rect.y0)
    }

    /// Whether `client` falls inside the canvas.
    pub fn contains(&self, client: Point) -> bool {
        self.rect.contains(client)
    }
}

impl Default for CanvasBounds {
    fn default() -> Self {
        Self::at_origin(Size::new(800.0, 600.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_local_subtracts_origin() {
        let bounds = CanvasBounds::new(Rect::new(40.0, 25.0, 840.0, 625.0));
        assert_eq!(bounds.to_local(Point::new(50.0, 35.0)), Point::new(10.0, 10.0));
        assert_eq!(bounds.to_local(Point::new(40.0, 25.0)), Point::ZERO);
    }

    #[test]
    fn test_at_origin_is_identity() {
        let bounds = CanvasBounds::at_origin(Size::new(800.0, 600.0));
        let p = Point::new(123.5, 456.25);
        assert_eq!(bounds.to_local(p), p);
    }

    #[test]
    fn test_set_origin_keeps_size() {
        let mut bounds = CanvasBounds::default();
        bounds.set_origin(Point::new(100.0, 200.0));

        assert_eq!(bounds.rect().size(), Size::new(800.0, 600.0));
        assert_eq!(bounds.to_local(Point::new(100.0, 200.0)), Point::ZERO);
        assert!(bounds.contains(Point::new(500.0, 500.0)));
        assert!(!bounds.contains(Point::new(50.0, 50.0)));
    }

    #[test]
    fn test_event_position() {
        let event = PointerEvent::Move {
            position: Point::new(3.0, 4.0),
        };
        assert_eq!(event.position(), Point::new(3.0, 4.0));
    }
}
