//! Backend-independent list of 2D shapes produced by the scenes each frame.
//!
//! Scenes project their entities, edges and meshes and push shapes here in
//! painter's order (back to front). Coordinates are in the nominal 800×600
//! drawing space; the canvas renderer maps them into the window.

use crate::color::Color;
use crate::mesh::Polyline;
use crate::projector::View;

/// One primitive in nominal drawing coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// Filled disc with a soft edge.
    Circle {
        center: (f32, f32),
        radius: f32,
        color: Color,
    },
    /// Disc whose alpha falls off to zero at `radius`.
    Glow {
        center: (f32, f32),
        radius: f32,
        color: Color,
    },
    /// Circle outline.
    Ring {
        center: (f32, f32),
        radius: f32,
        width: f32,
        color: Color,
    },
    /// Straight segment of the given width.
    Line {
        from: (f32, f32),
        to: (f32, f32),
        width: f32,
        color: Color,
    },
    /// Axis-aligned rectangle.
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: Color,
    },
}

/// Shapes for one frame.
#[derive(Debug, Default, Clone)]
pub struct DrawList {
    shapes: Vec<Shape>,
}

impl DrawList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.shapes.clear();
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Skips degenerate or fully transparent discs.
    pub fn circle(&mut self, center: (f32, f32), radius: f32, color: Color) {
        if radius > 0.0 && radius.is_finite() && color.alpha() > 0.0 {
            self.shapes.push(Shape::Circle {
                center,
                radius,
                color,
            });
        }
    }

    pub fn glow(&mut self, center: (f32, f32), radius: f32, color: Color) {
        if radius > 0.0 && radius.is_finite() && color.alpha() > 0.0 {
            self.shapes.push(Shape::Glow {
                center,
                radius,
                color,
            });
        }
    }

    pub fn ring(&mut self, center: (f32, f32), radius: f32, width: f32, color: Color) {
        if radius > 0.0 && radius.is_finite() && width > 0.0 && color.alpha() > 0.0 {
            self.shapes.push(Shape::Ring {
                center,
                radius,
                width,
                color,
            });
        }
    }

    pub fn line(&mut self, from: (f32, f32), to: (f32, f32), width: f32, color: Color) {
        let finite = from.0.is_finite() && from.1.is_finite() && to.0.is_finite() && to.1.is_finite();
        if finite && width > 0.0 && color.alpha() > 0.0 {
            self.shapes.push(Shape::Line {
                from,
                to,
                width,
                color,
            });
        }
    }

    /// Connected segments through `points`, optionally closing the loop.
    pub fn polyline(&mut self, points: &[(f32, f32)], width: f32, color: Color, closed: bool) {
        for pair in points.windows(2) {
            self.line(pair[0], pair[1], width, color);
        }
        if closed && points.len() > 2 {
            if let (Some(last), Some(first)) = (points.last(), points.first()) {
                self.line(*last, *first, width, color);
            }
        }
    }

    /// Dashed variant of [`DrawList::polyline`]: every other segment is skipped.
    pub fn dashed(&mut self, points: &[(f32, f32)], width: f32, color: Color) {
        for (i, pair) in points.windows(2).enumerate() {
            if i % 2 == 0 {
                self.line(pair[0], pair[1], width, color);
            }
        }
    }

    pub fn rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Color) {
        if width > 0.0 && height > 0.0 && color.alpha() > 0.0 {
            self.shapes.push(Shape::Rect {
                x,
                y,
                width,
                height,
                color,
            });
        }
    }

    /// Projects a mesh loop and strokes the visible part of it.
    ///
    /// Points behind the eye break the stroke instead of being connected.
    pub fn mesh_loop(&mut self, view: &View, line: &Polyline, width: f32, color: Color) {
        let mut run: Vec<(f32, f32)> = Vec::with_capacity(line.len());
        let mut all_visible = true;
        for point in &line.points {
            let p = view.project(*point);
            if p.is_visible(view.fov) {
                run.push((p.x, p.y));
            } else {
                all_visible = false;
                self.polyline(&run, width, color, false);
                run.clear();
            }
        }
        self.polyline(&run, width, color, line.closed && all_visible);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polyline_segments() {
        let mut list = DrawList::new();
        let square = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)];
        list.polyline(&square, 1.0, Color::WHITE, false);
        assert_eq!(list.len(), 3);
        list.clear();
        list.polyline(&square, 1.0, Color::WHITE, true);
        assert_eq!(list.len(), 4);
        list.clear();
        list.dashed(&square, 1.0, Color::WHITE);
        assert_eq!(list.len(), 2);
    }

    /// Invisible or degenerate shapes never reach the renderer.
    #[test]
    fn test_degenerate_shapes_skipped() {
        let mut list = DrawList::new();
        list.circle((0.0, 0.0), 0.0, Color::WHITE);
        list.circle((0.0, 0.0), 2.0, Color::TRANSPARENT);
        list.line((0.0, f32::NAN), (1.0, 1.0), 1.0, Color::WHITE);
        list.rect(0.0, 0.0, -1.0, 4.0, Color::WHITE);
        assert!(list.is_empty());
    }
}
