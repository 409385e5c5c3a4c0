//! Vello scene builder.

use kurbo::{Affine, BezPath, Circle, PathEl, Point, Rect, Size};
use peniko::{Color, Fill};
use sketchsync_core::{LineCap, PenStyle, RenderEngine};
use vello::Scene;

/// Render engine that records into a Vello [`Scene`].
///
/// The host owns the GPU side: after a redraw it takes [`scene`](Self::scene)
/// and hands it to a `vello::Renderer`.
pub struct VelloCanvas {
    scene: Scene,
    size: Size,
}

impl VelloCanvas {
    pub fn new(size: Size) -> Self {
        Self {
            scene: Scene::new(),
            size,
        }
    }

    /// The scene built by the last redraw.
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn size(&self) -> Size {
        self.size
    }
}

impl RenderEngine for VelloCanvas {
    fn clear(&mut self, color: Color) {
        self.scene.reset();
        let bg_rect = Rect::from_origin_size(Point::ZERO, self.size);
        self.scene
            .fill(Fill::NonZero, Affine::IDENTITY, color, None, &bg_rect);
    }

    fn stroke_path(&mut self, path: &BezPath, pen: &PenStyle) {
        // Vello draws nothing for a zero-length stroke, so dots are filled.
        if let Some(center) = lone_point(path) {
            let radius = pen.width / 2.0;
            match pen.cap {
                LineCap::Round => self.scene.fill(
                    Fill::NonZero,
                    Affine::IDENTITY,
                    pen.color(),
                    None,
                    &Circle::new(center, radius),
                ),
                LineCap::Square => self.scene.fill(
                    Fill::NonZero,
                    Affine::IDENTITY,
                    pen.color(),
                    None,
                    &Rect::from_center_size(center, (pen.width, pen.width)),
                ),
                LineCap::Butt => {}
            }
            return;
        }

        self.scene
            .stroke(&pen.stroke(), Affine::IDENTITY, pen.color(), None, path);
    }
}

/// The point of a path consisting of a single `MoveTo`.
fn lone_point(path: &BezPath) -> Option<Point> {
    match path.elements() {
        [PathEl::MoveTo(p)] => Some(*p),
        _ => None,
    }
}
