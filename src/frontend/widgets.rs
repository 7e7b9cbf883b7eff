//! Small widgets for the shell's top bar
//!
//! - [`StatusIndicator`] - Coloured dot with the feed connection state
//! - [`Readout`] - Label, value and unit of one live reading

use crate::types::ConnectionStatus;
use egui::{Color32, Response, Ui, Widget};

/// Coloured dot followed by the connection state
pub struct StatusIndicator {
    status: ConnectionStatus,
    tooltip: Option<String>,
}

impl StatusIndicator {
    pub fn new(status: ConnectionStatus) -> Self {
        Self {
            status,
            tooltip: None,
        }
    }

    pub fn with_tooltip(mut self, tooltip: impl Into<String>) -> Self {
        self.tooltip = Some(tooltip.into());
        self
    }

    pub fn color(status: ConnectionStatus) -> Color32 {
        match status {
            ConnectionStatus::Connected => Color32::GREEN,
            ConnectionStatus::Disconnected => Color32::GRAY,
            ConnectionStatus::Error => Color32::RED,
        }
    }
}

impl Widget for StatusIndicator {
    fn ui(self, ui: &mut Ui) -> Response {
        let response = ui
            .horizontal(|ui| {
                ui.colored_label(Self::color(self.status), "●");
                ui.label(self.status.to_string());
            })
            .response;

        match self.tooltip {
            Some(tooltip) => response.on_hover_text(tooltip),
            None => response,
        }
    }
}

/// One live reading, shown as `Label: value unit`
///
/// A missing value is shown as a dash.
pub struct Readout {
    label: &'static str,
    value: Option<f64>,
    precision: usize,
    unit: &'static str,
    color: Option<Color32>,
}

impl Readout {
    pub fn new(label: &'static str, value: Option<f64>, precision: usize, unit: &'static str) -> Self {
        Self {
            label,
            value,
            precision,
            unit,
            color: None,
        }
    }

    /// Colour the value like its plot series
    pub fn with_color(mut self, color: Color32) -> Self {
        self.color = Some(color);
        self
    }

    fn text(&self) -> String {
        match self.value {
            Some(v) if v.is_finite() => format!("{:.*} {}", self.precision, v, self.unit),
            _ => "–".to_string(),
        }
    }
}

impl Widget for Readout {
    fn ui(self, ui: &mut Ui) -> Response {
        ui.horizontal(|ui| {
            ui.label(format!("{}:", self.label));
            let text = self.text();
            match self.color {
                Some(color) => ui.colored_label(color, text),
                None => ui.strong(text),
            };
        })
        .response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_readout_text() {
        assert_eq!(Readout::new("T", Some(4.2), 3, "K").text(), "4.200 K");
        assert_eq!(Readout::new("T", None, 3, "K").text(), "–");
        assert_eq!(Readout::new("T", Some(f64::NAN), 1, "%").text(), "–");
    }

    #[test]
    fn test_status_colors_differ() {
        assert_ne!(
            StatusIndicator::color(ConnectionStatus::Connected),
            StatusIndicator::color(ConnectionStatus::Error)
        );
    }
}
