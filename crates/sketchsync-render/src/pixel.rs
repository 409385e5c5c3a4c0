//! CPU render engine backed by tiny-skia, with PNG export.

use crate::renderer::{RenderResult, RendererError};
use kurbo::{BezPath, PathEl, Point, Rect};
use peniko::Color;
use sketchsync_core::{CanvasStyle, LineCap, PenStyle, RenderEngine};
use std::path::Path;
use tiny_skia::{FillRule, Paint, PathBuilder, Pixmap, Transform};

const FLATTEN_TOLERANCE: f64 = 0.25;

/// RGBA pixel surface implementing [`RenderEngine`].
///
/// Identical draw calls produce identical pixels.
pub struct PixelCanvas {
    pixmap: Pixmap,
}

impl PixelCanvas {
    /// Transparent canvas of `width`×`height` pixels.
    pub fn new(width: u32, height: u32) -> RenderResult<Self> {
        let pixmap = Pixmap::new(width, height).ok_or(RendererError::InvalidSize { width, height })?;
        Ok(Self { pixmap })
    }

    /// Canvas sized for `style`.
    pub fn for_style(style: &CanvasStyle) -> RenderResult<Self> {
        Self::new(style.width, style.height)
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    /// Raw premultiplied RGBA bytes, row-major.
    pub fn data(&self) -> &[u8] {
        self.pixmap.data()
    }

    /// Straight-alpha color at `(x, y)`, or `None` outside the canvas.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let c = self.pixmap.pixel(x, y)?.demultiply();
        Some([c.red(), c.green(), c.blue(), c.alpha()])
    }

    /// Encode the canvas as PNG.
    pub fn encode_png(&self) -> RenderResult<Vec<u8>> {
        let rgba_data: Vec<u8> = self
            .pixmap
            .pixels()
            .iter()
            .flat_map(|px| {
                let c = px.demultiply();
                [c.red(), c.green(), c.blue(), c.alpha()]
            })
            .collect();

        let mut png_data = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut png_data, self.width(), self.height());
            encoder.set_color(png::ColorType::Rgba);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder.write_header()?;
            writer.write_image_data(&rgba_data)?;
        }
        Ok(png_data)
    }

    /// Encode the canvas as PNG and write it to `path`.
    pub fn write_png(&self, path: impl AsRef<Path>) -> RenderResult<()> {
        let bytes = self.encode_png()?;
        std::fs::write(path.as_ref(), bytes)?;
        log::debug!(
            "Wrote {}x{} snapshot to {}",
            self.width(),
            self.height(),
            path.as_ref().display()
        );
        Ok(())
    }

    /// Region outside of which nothing can reach the visible pixels.
    fn clip_rect(&self, pen: &PenStyle) -> Rect {
        let margin = pen.width + 1.0;
        Rect::new(0.0, 0.0, f64::from(self.width()), f64::from(self.height()))
            .inflate(margin, margin)
    }

    fn fill_dot(&mut self, center: Point, pen: &PenStyle, paint: &Paint) {
        let radius = (pen.width / 2.0) as f32;
        let (x, y) = (center.x as f32, center.y as f32);
        match pen.cap {
            LineCap::Round => {
                if let Some(circle) = PathBuilder::from_circle(x, y, radius) {
                    self.pixmap
                        .fill_path(&circle, paint, FillRule::Winding, Transform::identity(), None);
                }
            }
            LineCap::Square => {
                if let Some(rect) =
                    tiny_skia::Rect::from_xywh(x - radius, y - radius, radius * 2.0, radius * 2.0)
                {
                    self.pixmap.fill_rect(rect, paint, Transform::identity(), None);
                }
            }
            LineCap::Butt => {}
        }
    }
}

impl RenderEngine for PixelCanvas {
    fn clear(&mut self, color: Color) {
        let c = color.to_rgba8();
        self.pixmap
            .fill(tiny_skia::Color::from_rgba8(c.r, c.g, c.b, c.a));
    }

    fn stroke_path(&mut self, path: &BezPath, pen: &PenStyle) {
        if !pen.width.is_finite() || pen.width <= 0.0 {
            return;
        }

        let [r, g, b, a] = pen.color;
        let mut paint = Paint::default();
        paint.set_color_rgba8(r, g, b, a);
        paint.anti_alias = true;

        let clip = self.clip_rect(pen);
        let lines = polylines(path);

        // Lone points stroke to nothing; draw them as the cap shape.
        for line in &lines {
            if let [point] = line.as_slice() {
                if clip.contains(*point) {
                    self.fill_dot(*point, pen, &paint);
                }
            }
        }

        let Some(outline) = clipped_path(&lines, clip) else {
            return;
        };
        let stroke = tiny_skia::Stroke {
            width: pen.width as f32,
            line_cap: skia_cap(pen.cap),
            line_join: tiny_skia::LineJoin::Round,
            ..tiny_skia::Stroke::default()
        };
        self.pixmap
            .stroke_path(&outline, &paint, &stroke, Transform::identity(), None);
    }
}

fn skia_cap(cap: LineCap) -> tiny_skia::LineCap {
    match cap {
        LineCap::Butt => tiny_skia::LineCap::Butt,
        LineCap::Square => tiny_skia::LineCap::Square,
        LineCap::Round => tiny_skia::LineCap::Round,
    }
}

/// Flatten `path` into one polyline per subpath, dropping repeated points.
fn polylines(path: &BezPath) -> Vec<Vec<Point>> {
    let mut lines: Vec<Vec<Point>> = Vec::new();
    kurbo::flatten(path, FLATTEN_TOLERANCE, |el| match el {
        PathEl::MoveTo(p) => lines.push(vec![p]),
        PathEl::LineTo(p) => match lines.last_mut() {
            Some(line) => line.push(p),
            None => lines.push(vec![p]),
        },
        PathEl::ClosePath => {
            if let Some(line) = lines.last_mut() {
                if let Some(&first) = line.first() {
                    line.push(first);
                }
            }
        }
        _ => {}
    });
    for line in &mut lines {
        line.dedup();
    }
    lines
}

/// Build a tiny-skia path from the parts of `lines` inside `clip`.
///
/// Coordinates handed to tiny-skia are `f32`; clipping first keeps far-away
/// points from overflowing.
fn clipped_path(lines: &[Vec<Point>], clip: Rect) -> Option<tiny_skia::Path> {
    let mut builder = PathBuilder::new();
    for line in lines {
        let mut pen_at: Option<Point> = None;
        for pair in line.windows(2) {
            let Some((start, end)) = clip_segment(pair[0], pair[1], clip) else {
                pen_at = None;
                continue;
            };
            if pen_at != Some(start) {
                builder.move_to(start.x as f32, start.y as f32);
            }
            builder.line_to(end.x as f32, end.y as f32);
            pen_at = Some(end);
        }
    }
    builder.finish()
}

const LEFT: u8 = 1;
const RIGHT: u8 = 2;
const TOP: u8 = 4;
const BOTTOM: u8 = 8;

fn outcode(p: Point, rect: Rect) -> u8 {
    let mut code = 0;
    if p.x < rect.x0 {
        code |= LEFT;
    } else if p.x > rect.x1 {
        code |= RIGHT;
    }
    if p.y < rect.y0 {
        code |= TOP;
    } else if p.y > rect.y1 {
        code |= BOTTOM;
    }
    code
}

/// Other coordinate where the segment `from`→`to` crosses `edge`.
///
/// The parameter is computed on halved inputs and the result as a weighted
/// sum, so spans close to `f64::MAX` stay finite.
fn cross_at(from: f64, to: f64, edge: f64, other_from: f64, other_to: f64) -> f64 {
    if other_from == other_to {
        return other_from;
    }
    let t = (edge * 0.5 - from * 0.5) / (to * 0.5 - from * 0.5);
    other_from * (1.0 - t) + other_to * t
}

/// Cohen–Sutherland clip of `a`→`b` against `rect`.
///
/// Clipped endpoints land exactly on the edge they were clipped to;
/// endpoints already inside are returned unchanged.
fn clip_segment(mut a: Point, mut b: Point, rect: Rect) -> Option<(Point, Point)> {
    if ![a.x, a.y, b.x, b.y].iter().all(|v| v.is_finite()) {
        return None;
    }

    // Each pass moves one endpoint onto an edge; four edges per endpoint.
    for _ in 0..8 {
        let (code_a, code_b) = (outcode(a, rect), outcode(b, rect));
        if code_a | code_b == 0 {
            return Some((a, b));
        }
        if code_a & code_b != 0 {
            return None;
        }

        let (code, from, to) = if code_a != 0 { (code_a, a, b) } else { (code_b, b, a) };
        let moved = if code & LEFT != 0 {
            Point::new(rect.x0, cross_at(from.x, to.x, rect.x0, from.y, to.y))
        } else if code & RIGHT != 0 {
            Point::new(rect.x1, cross_at(from.x, to.x, rect.x1, from.y, to.y))
        } else if code & TOP != 0 {
            Point::new(cross_at(from.y, to.y, rect.y0, from.x, to.x), rect.y0)
        } else {
            Point::new(cross_at(from.y, to.y, rect.y1, from.x, to.x), rect.y1)
        };

        if code_a != 0 {
            a = moved;
        } else {
            b = moved;
        }
    }
    None
}
