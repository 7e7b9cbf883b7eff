//! Drawing surface abstraction
//!
//! The renderer only ever asks a surface for three things: stroke a
//! polyline, fill the region between a polyline and a horizontal baseline,
//! and place a text label. Everything toolkit specific lives behind
//! [`DrawingSurface`]; the egui implementation is in `painter.rs`.
//!
//! Coordinates are in pixels with the origin at the top-left corner of the
//! surface and y growing downwards.

use serde::{Deserialize, Serialize};

/// RGBA colour, unmultiplied
pub type Rgba = [u8; 4];

/// A point in surface pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenPoint {
    pub x: f32,
    pub y: f32,
}

impl ScreenPoint {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle in surface pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl ScreenRect {
    pub const fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }

    /// Whether the rectangle has room to draw anything
    pub fn is_drawable(&self) -> bool {
        self.width >= 1.0 && self.height >= 1.0
    }

    /// Closed outline, clockwise from the top-left corner
    pub fn outline(&self) -> [ScreenPoint; 5] {
        [
            ScreenPoint::new(self.left, self.top),
            ScreenPoint::new(self.right(), self.top),
            ScreenPoint::new(self.right(), self.bottom()),
            ScreenPoint::new(self.left, self.bottom()),
            ScreenPoint::new(self.left, self.top),
        ]
    }
}

/// Line style
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub width: f32,
    pub color: Rgba,
}

impl Stroke {
    pub const fn new(width: f32, color: Rgba) -> Self {
        Self { width, color }
    }
}

/// Which point of the label's bounding box sits on the requested position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelAnchor {
    /// Label centred horizontally, hanging below the point (x axis)
    TopCenter,
    /// Label right-aligned, centred vertically on the point (y axis)
    RightCenter,
}

/// Text appearance for tick labels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub size: f32,
    pub color: Rgba,
}

/// Minimal drawing interface the plot renders into
#[cfg_attr(test, mockall::automock)]
pub trait DrawingSurface {
    /// Drawable size in pixels as (width, height)
    fn size(&self) -> (f32, f32);

    /// Stroke a connected line through `points`
    fn draw_polyline(&mut self, points: &[ScreenPoint], stroke: Stroke);

    /// Fill the area between the line through `points` and the horizontal
    /// line `y = baseline_y`
    fn fill_to_baseline(&mut self, points: &[ScreenPoint], baseline_y: f32, fill: Rgba);

    /// Draw a tick label with its `anchor` placed at `at`
    fn draw_tick_label(&mut self, at: ScreenPoint, text: &str, anchor: LabelAnchor, style: TextStyle);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_edges() {
        let rect = ScreenRect::new(10.0, 20.0, 100.0, 50.0);
        assert_eq!(rect.right(), 110.0);
        assert_eq!(rect.bottom(), 70.0);
        assert!(rect.is_drawable());
        assert!(!ScreenRect::new(0.0, 0.0, 0.5, 10.0).is_drawable());
    }

    #[test]
    fn test_outline_is_closed() {
        let outline = ScreenRect::new(0.0, 0.0, 4.0, 3.0).outline();
        assert_eq!(outline.first(), outline.last());
    }
}
