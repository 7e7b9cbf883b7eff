//! Recording drawing surface and feed helpers

use thermovis_rs::frontend::surface::{
    DrawingSurface, LabelAnchor, Rgba, ScreenPoint, Stroke, TextStyle,
};
use thermovis_rs::history::SharedHistory;
use thermovis_rs::{AppConfig, TelemetrySession};

/// One call made on a [`RecordingSurface`]
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCall {
    Polyline {
        points: Vec<ScreenPoint>,
        stroke: Stroke,
    },
    Fill {
        points: Vec<ScreenPoint>,
        baseline_y: f32,
        fill: Rgba,
    },
    Label {
        at: ScreenPoint,
        text: String,
        anchor: LabelAnchor,
    },
}

/// Surface that records every call for later inspection
pub struct RecordingSurface {
    pub width: f32,
    pub height: f32,
    pub calls: Vec<DrawCall>,
}

impl RecordingSurface {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            calls: Vec::new(),
        }
    }

    pub fn fills(&self) -> Vec<&DrawCall> {
        self.calls
            .iter()
            .filter(|c| matches!(c, DrawCall::Fill { .. }))
            .collect()
    }

    pub fn labels(&self, anchor: LabelAnchor) -> Vec<String> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                DrawCall::Label {
                    text, anchor: a, ..
                } if *a == anchor => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    /// Polylines stroked with `color`
    pub fn lines_with_color(&self, color: Rgba) -> Vec<&Vec<ScreenPoint>> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                DrawCall::Polyline { points, stroke } if stroke.color == color => Some(points),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }
}

impl DrawingSurface for RecordingSurface {
    fn size(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    fn draw_polyline(&mut self, points: &[ScreenPoint], stroke: Stroke) {
        self.calls.push(DrawCall::Polyline {
            points: points.to_vec(),
            stroke,
        });
    }

    fn fill_to_baseline(&mut self, points: &[ScreenPoint], baseline_y: f32, fill: Rgba) {
        self.calls.push(DrawCall::Fill {
            points: points.to_vec(),
            baseline_y,
            fill,
        });
    }

    fn draw_tick_label(&mut self, at: ScreenPoint, text: &str, anchor: LabelAnchor, _style: TextStyle) {
        self.calls.push(DrawCall::Label {
            at,
            text: text.to_string(),
            anchor,
        });
    }
}

/// Session with default configuration over a fresh history
pub fn create_test_session() -> TelemetrySession {
    TelemetrySession::new(&AppConfig::default(), SharedHistory::default())
        .expect("default config is valid")
}
