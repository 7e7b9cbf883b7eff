//! [`DrawingSurface`] backed by an egui painter
//!
//! Surface coordinates are relative to the top-left corner of the canvas
//! rect; they are translated to screen coordinates here.

use crate::frontend::surface::{DrawingSurface, LabelAnchor, Rgba, ScreenPoint, Stroke, TextStyle};
use egui::{Align2, Color32, FontId, Mesh, Painter, Pos2, Rect, Shape};

/// Convert an unmultiplied RGBA colour
pub fn to_color32(color: Rgba) -> Color32 {
    Color32::from_rgba_unmultiplied(color[0], color[1], color[2], color[3])
}

/// Egui canvas the plot renders into
pub struct EguiSurface<'a> {
    painter: &'a Painter,
    rect: Rect,
}

impl<'a> EguiSurface<'a> {
    /// Paint into `rect` using `painter`; drawing is clipped to `rect`
    pub fn new(painter: &'a Painter, rect: Rect) -> Self {
        Self { painter, rect }
    }

    /// Fill the whole canvas with `color`
    pub fn clear(&self, color: Rgba) {
        self.painter.rect_filled(self.rect, 0.0, to_color32(color));
    }

    fn to_screen(&self, p: ScreenPoint) -> Pos2 {
        Pos2::new(self.rect.min.x + p.x, self.rect.min.y + p.y)
    }

    /// Inverse of the canvas translation, for pointer input
    pub fn from_screen(&self, pos: Pos2) -> ScreenPoint {
        ScreenPoint::new(pos.x - self.rect.min.x, pos.y - self.rect.min.y)
    }
}

impl DrawingSurface for EguiSurface<'_> {
    fn size(&self) -> (f32, f32) {
        (self.rect.width(), self.rect.height())
    }

    fn draw_polyline(&mut self, points: &[ScreenPoint], stroke: Stroke) {
        if points.len() < 2 {
            return;
        }
        let points: Vec<Pos2> = points.iter().map(|p| self.to_screen(*p)).collect();
        self.painter.add(Shape::line(
            points,
            egui::Stroke::new(stroke.width, to_color32(stroke.color)),
        ));
    }

    fn fill_to_baseline(&mut self, points: &[ScreenPoint], baseline_y: f32, fill: Rgba) {
        if points.len() < 2 {
            return;
        }
        let color = to_color32(fill);
        let mut mesh = Mesh::default();
        // One quad per segment, from the segment down to the baseline
        for pair in points.windows(2) {
            let base = mesh.vertices.len() as u32;
            let (a, b) = (pair[0], pair[1]);
            mesh.colored_vertex(self.to_screen(a), color);
            mesh.colored_vertex(self.to_screen(b), color);
            mesh.colored_vertex(self.to_screen(ScreenPoint::new(b.x, baseline_y)), color);
            mesh.colored_vertex(self.to_screen(ScreenPoint::new(a.x, baseline_y)), color);
            mesh.add_triangle(base, base + 1, base + 2);
            mesh.add_triangle(base, base + 2, base + 3);
        }
        self.painter.add(Shape::mesh(mesh));
    }

    fn draw_tick_label(&mut self, at: ScreenPoint, text: &str, anchor: LabelAnchor, style: TextStyle) {
        let align = match anchor {
            LabelAnchor::TopCenter => Align2::CENTER_TOP,
            LabelAnchor::RightCenter => Align2::RIGHT_CENTER,
        };
        self.painter.text(
            self.to_screen(at),
            align,
            text,
            FontId::proportional(style.size),
            to_color32(style.color),
        );
    }
}
