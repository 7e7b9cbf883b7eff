//! Dual-pane temperature history plot
//!
//! This module renders the scrolling history into any [`DrawingSurface`].
//!
//! # Panes
//!
//! - **Temperature pane** (top, five sixths of the height): temperature in K
//!   with an auto-fitting value axis that never goes below 0.
//! - **Heater/flow pane** (bottom): heater and gas flow normalized to
//!   `[0, 1]`, each drawn as a filled area with a crisp outline and a
//!   baseline, on the fixed range `[-0.02, 1.02]`.
//!
//! Both panes share one time axis in minutes relative to the newest sample.
//! Panning or zooming either pane moves both.
//!
//! # Main Types
//!
//! - [`DualPaneRenderer`] - Linked axis state and the render pass
//! - [`PlotStyle`] - Colours, fonts and line widths, passed in explicitly
//! - [`PlotLayout`] / [`LayoutVariant`] - Margins, label sizing and
//!   downsampling mode of the classic and refined layouts

use crate::analysis::downsample::DownsampleMode;
use crate::analysis::ticks::{format_tick, TickPlanner};
use crate::frontend::surface::{
    DrawingSurface, LabelAnchor, Rgba, ScreenPoint, ScreenRect, Stroke, TextStyle,
};
use crate::frontend::viewport::{slice_between_padded, Viewport, WindowChange, NORMALIZED_Y_RANGE};
use crate::types::Sample;
use serde::{Deserialize, Serialize};

/// Value range shown on the temperature pane before any data arrives
pub const DEFAULT_TEMPERATURE_RANGE: (f64, f64) = (5.0, 300.0);

/// Fraction of the data span added above and below when auto-fitting
const AUTO_FIT_PADDING: f64 = 0.002;

/// Half-height of the auto-fit range when all visible values are equal
const FLAT_SERIES_HALF_SPAN: f64 = 0.5;

/// Smallest x span reachable by zooming, in minutes
const MIN_X_SPAN: f64 = 1e-4;

/// Approximate glyph width as a fraction of the font size
const GLYPH_WIDTH_FACTOR: f32 = 0.6;

/// Visual style of the plot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotStyle {
    /// Text colour of tick labels
    pub foreground: Rgba,
    /// Fill behind both panes
    pub background: Rgba,
    /// Colour of pane frames and tick marks
    pub axis_color: Rgba,
    pub axis_width: f32,
    pub font_size: f32,
    pub line_width: f32,
    pub temperature_color: Rgba,
    pub heater_color: Rgba,
    pub flow_color: Rgba,
    /// Alpha of the heater/flow area fills
    pub fill_alpha: u8,
    pub tick_length: f32,
    /// Gap between a tick mark and its label
    pub tick_text_offset: f32,
}

impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            foreground: [0, 0, 0, 255],
            background: [255, 255, 255, 255],
            axis_color: [128, 128, 128, 255],
            axis_width: 1.5,
            font_size: 12.0,
            line_width: 3.0,
            temperature_color: [0, 204, 153, 255],
            heater_color: [221, 61, 53, 255],
            flow_color: [100, 171, 246, 255],
            fill_alpha: 51,
            tick_length: 5.0,
            tick_text_offset: 5.0,
        }
    }
}

impl PlotStyle {
    fn fill_of(&self, color: Rgba) -> Rgba {
        [color[0], color[1], color[2], self.fill_alpha]
    }

    fn text(&self) -> TextStyle {
        TextStyle {
            size: self.font_size,
            color: self.foreground,
        }
    }

    fn axis_stroke(&self) -> Stroke {
        Stroke::new(self.axis_width, self.axis_color)
    }
}

/// The two historical layouts of the plot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutVariant {
    /// Fixed label gutter and subsampling
    Classic,
    /// Label gutter sized from the labels, peak-preserving downsampling
    #[default]
    Refined,
}

/// How wide the y-axis label gutter is
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LabelWidth {
    /// Constant gutter in pixels
    Fixed(f32),
    /// Gutter fitted to the widest label, estimated from its character count
    Estimated,
}

/// Outer spacing around the plot in pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Margins {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
}

/// Geometry and policy settings that differ between layout variants
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlotLayout {
    pub margins: Margins,
    /// Vertical gap between the two panes
    pub pane_spacing: f32,
    /// Height share of the temperature pane relative to the heater/flow pane
    pub temperature_share: f32,
    pub label_width: LabelWidth,
    pub downsample: DownsampleMode,
    /// Number of tick levels drawn per axis
    pub tick_levels: usize,
}

impl PlotLayout {
    pub fn for_variant(variant: LayoutVariant) -> Self {
        match variant {
            LayoutVariant::Classic => Self {
                margins: Margins {
                    left: 10.0,
                    right: 10.0,
                    top: 2.0,
                    bottom: 2.0,
                },
                pane_spacing: 0.0,
                temperature_share: 5.0,
                label_width: LabelWidth::Fixed(40.0),
                downsample: DownsampleMode::Subsample,
                tick_levels: 2,
            },
            LayoutVariant::Refined => Self {
                margins: Margins {
                    left: 10.0,
                    right: 10.0,
                    top: 4.0,
                    bottom: 4.0,
                },
                pane_spacing: 1.0,
                temperature_share: 5.0,
                label_width: LabelWidth::Estimated,
                downsample: DownsampleMode::Peak,
                tick_levels: 2,
            },
        }
    }
}

impl Default for PlotLayout {
    fn default() -> Self {
        Self::for_variant(LayoutVariant::default())
    }
}

/// Lifecycle of the pane pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaneState {
    /// No data yet, or the session has ended
    #[default]
    Idle,
    /// Redrawing the visible slice on every new sample
    Live,
}

/// A named series bound to one pane, in (relative minutes, value) pairs
#[derive(Debug, Clone, PartialEq)]
pub struct PaneSeries {
    pub name: &'static str,
    pub points: Vec<[f64; 2]>,
}

impl PaneSeries {
    /// Temperature in K, unnormalized
    pub fn temperature(samples: &[Sample], reference: f64) -> Self {
        Self {
            name: "temperature",
            points: samples
                .iter()
                .map(|s| [s.minutes_since(reference), s.temperature])
                .collect(),
        }
    }

    /// Heater output scaled to [0, 1]
    pub fn heater(samples: &[Sample], reference: f64) -> Self {
        Self {
            name: "heater",
            points: samples
                .iter()
                .map(|s| [s.minutes_since(reference), s.heater_fraction()])
                .collect(),
        }
    }

    /// Gas flow scaled to [0, 1]
    pub fn flow(samples: &[Sample], reference: f64) -> Self {
        Self {
            name: "flow",
            points: samples
                .iter()
                .map(|s| [s.minutes_since(reference), s.flow_fraction()])
                .collect(),
        }
    }
}

/// Maps data coordinates of one pane to surface pixels
#[derive(Debug, Clone, Copy)]
struct PaneTransform {
    rect: ScreenRect,
    x: (f64, f64),
    y: (f64, f64),
}

impl PaneTransform {
    fn x_to_px(&self, x: f64) -> f32 {
        let t = (x - self.x.0) / (self.x.1 - self.x.0);
        self.rect.left + (t as f32) * self.rect.width
    }

    fn y_to_px(&self, y: f64) -> f32 {
        let t = ((y - self.y.0) / (self.y.1 - self.y.0)).clamp(-0.01, 1.01);
        self.rect.bottom() - (t as f32) * self.rect.height
    }

    fn to_screen(&self, points: &[[f64; 2]]) -> Vec<ScreenPoint> {
        points
            .iter()
            .filter(|p| p[1].is_finite())
            .map(|p| ScreenPoint::new(self.x_to_px(p[0]), self.y_to_px(p[1])))
            .collect()
    }
}

/// Counters from one render pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderStats {
    /// Samples in the visible slice
    pub visible_samples: usize,
    /// Points handed to the surface per series after reduction
    pub points_per_series: usize,
    /// Whether the series were downsampled
    pub downsampled: bool,
}

/// Renders the linked temperature and heater/flow panes
#[derive(Debug, Clone)]
pub struct DualPaneRenderer {
    style: PlotStyle,
    layout: PlotLayout,
    planner: TickPlanner,
    /// Shared x range of both panes, in relative minutes
    x_range: (f64, f64),
    temperature_y: (f64, f64),
    auto_fit_temperature: bool,
    state: PaneState,
    torn_down: bool,
}

impl DualPaneRenderer {
    /// Create a renderer showing `x_range` with the given style and layout
    pub fn new(style: PlotStyle, layout: PlotLayout, x_range: (f64, f64)) -> Self {
        Self {
            style,
            planner: TickPlanner::new(layout.tick_levels),
            layout,
            x_range,
            temperature_y: DEFAULT_TEMPERATURE_RANGE,
            auto_fit_temperature: true,
            state: PaneState::Idle,
            torn_down: false,
        }
    }

    pub fn style(&self) -> &PlotStyle {
        &self.style
    }

    pub fn layout(&self) -> &PlotLayout {
        &self.layout
    }

    pub fn state(&self) -> PaneState {
        self.state
    }

    /// Shared x range of both panes
    pub fn x_range(&self) -> (f64, f64) {
        self.x_range
    }

    pub fn temperature_y_range(&self) -> (f64, f64) {
        self.temperature_y
    }

    pub fn normalized_y_range(&self) -> (f64, f64) {
        NORMALIZED_Y_RANGE
    }

    pub fn is_auto_fitting(&self) -> bool {
        self.auto_fit_temperature
    }

    /// Apply a window width change from the viewport
    pub fn apply_window(&mut self, change: WindowChange) {
        self.x_range = change.x_range;
        if change.refit_temperature {
            self.auto_fit_temperature = true;
        }
    }

    /// Set the shared x range of both panes
    pub fn set_x_range(&mut self, lo: f64, hi: f64) {
        let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
        if hi - lo < MIN_X_SPAN {
            let mid = (lo + hi) / 2.0;
            self.x_range = (mid - MIN_X_SPAN / 2.0, mid + MIN_X_SPAN / 2.0);
        } else {
            self.x_range = (lo, hi);
        }
    }

    /// Shift both panes by `dx` minutes
    pub fn pan_x(&mut self, dx: f64) {
        self.set_x_range(self.x_range.0 + dx, self.x_range.1 + dx);
    }

    /// Scale the shared x range about `anchor` (factor < 1 zooms in)
    pub fn zoom_x(&mut self, factor: f64, anchor: f64) {
        if !(factor > 0.0 && factor.is_finite()) {
            return;
        }
        let (lo, hi) = self.x_range;
        self.set_x_range(anchor + (lo - anchor) * factor, anchor + (hi - anchor) * factor);
    }

    /// Scale the temperature range about `anchor`; turns auto-fit off
    pub fn zoom_temperature(&mut self, factor: f64, anchor: f64) {
        if !(factor > 0.0 && factor.is_finite()) {
            return;
        }
        let (lo, hi) = self.temperature_y;
        let lo = (anchor + (lo - anchor) * factor).max(0.0);
        let hi = anchor + (hi - anchor) * factor;
        if hi > lo {
            self.temperature_y = (lo, hi);
            self.auto_fit_temperature = false;
        }
    }

    /// Shift the temperature range by `dy` K; turns auto-fit off
    pub fn pan_temperature(&mut self, dy: f64) {
        let (lo, hi) = self.temperature_y;
        let dy = dy.max(-lo);
        self.temperature_y = (lo + dy, hi + dy);
        self.auto_fit_temperature = false;
    }

    /// Restore the window's x range and temperature auto-fit
    pub fn reset_view(&mut self, viewport: &Viewport) {
        self.x_range = viewport.x_range();
        self.auto_fit_temperature = true;
    }

    /// Return to idle at session teardown
    pub fn shutdown(&mut self) {
        self.state = PaneState::Idle;
        self.torn_down = true;
    }

    /// Split a surface of `size` into (temperature, heater/flow) plot areas
    pub fn pane_rects(&self, size: (f32, f32), label_gutter: f32) -> (ScreenRect, ScreenRect) {
        let m = self.layout.margins;
        let x_label_band = self.style.font_size + self.style.tick_text_offset + self.style.tick_length;
        let left = m.left + label_gutter;
        let width = (size.0 - left - m.right).max(0.0);
        let available = (size.1 - m.top - m.bottom - x_label_band - self.layout.pane_spacing).max(0.0);
        let share = self.layout.temperature_share.max(0.0);
        let upper = available * share / (share + 1.0);
        let lower = available - upper;

        let temperature = ScreenRect::new(left, m.top, width, upper);
        let normalized = ScreenRect::new(left, m.top + upper + self.layout.pane_spacing, width, lower);
        (temperature, normalized)
    }

    /// Redraw both panes from `samples` (the full history, oldest first)
    ///
    /// Calling this repeatedly with the same input draws the same picture.
    pub fn render(
        &mut self,
        surface: &mut dyn DrawingSurface,
        samples: &[Sample],
        viewport: &Viewport,
    ) -> RenderStats {
        if !self.torn_down {
            self.state = if samples.is_empty() {
                PaneState::Idle
            } else {
                PaneState::Live
            };
        }

        let (x_lo, x_hi) = self.x_range;
        let reference = samples.last().map(|s| s.timestamp).unwrap_or(0.0);
        let visible = slice_between_padded(samples, reference, x_lo, x_hi);

        let temperature = PaneSeries::temperature(visible, reference);
        let heater = PaneSeries::heater(visible, reference);
        let flow = PaneSeries::flow(visible, reference);

        if self.auto_fit_temperature {
            if let Some(range) = fit_range(&temperature.points, self.x_range) {
                self.temperature_y = range;
            }
        }

        // The y ticks only depend on the pane height, which does not depend
        // on the label gutter, so plan them first to size the gutter
        let size = surface.size();
        let (probe, _) = self.pane_rects(size, 0.0);
        let (t_lo, t_hi) = self.temperature_y;
        let y_plan = self.planner.plan(t_lo, t_hi, f64::from(probe.height));
        let y_ticks = y_plan.tick_values(t_lo, t_hi);
        let y_labels: Vec<Vec<(f64, String)>> = y_ticks
            .iter()
            .zip(y_plan.spacings())
            .map(|(values, spacing)| {
                values
                    .iter()
                    .map(|v| (*v, format_tick(*v, spacing)))
                    .collect()
            })
            .collect();
        let gutter = self.label_gutter(&y_labels);
        let (upper, lower) = self.pane_rects(size, gutter);

        if !upper.is_drawable() || !lower.is_drawable() {
            return RenderStats {
                visible_samples: visible.len(),
                ..Default::default()
            };
        }

        let upper_tf = PaneTransform {
            rect: upper,
            x: self.x_range,
            y: self.temperature_y,
        };
        let lower_tf = PaneTransform {
            rect: lower,
            x: self.x_range,
            y: NORMALIZED_Y_RANGE,
        };

        // Series
        let temperature_pts = clip_x(&temperature.points, self.x_range);
        let heater_pts = clip_x(&heater.points, self.x_range);
        let flow_pts = clip_x(&flow.points, self.x_range);

        let clipped_len = temperature_pts.len();
        let temperature_pts = viewport.reduce(&temperature_pts, upper.width);
        let heater_pts = viewport.reduce(&heater_pts, lower.width);
        let flow_pts = viewport.reduce(&flow_pts, lower.width);
        let downsampled = temperature_pts.len() < clipped_len;

        let line_width = self.style.line_width;
        let temperature_screen = upper_tf.to_screen(&temperature_pts);
        if temperature_screen.len() >= 2 {
            surface.draw_polyline(
                &temperature_screen,
                Stroke::new(line_width, self.style.temperature_color),
            );
        }

        let baseline_y = lower_tf.y_to_px(0.0);
        let filled = [
            (&heater_pts, self.style.heater_color),
            (&flow_pts, self.style.flow_color),
        ];
        for (points, color) in filled {
            let screen = lower_tf.to_screen(points);
            if screen.len() >= 2 {
                surface.fill_to_baseline(&screen, baseline_y, self.style.fill_of(color));
                surface.draw_polyline(&screen, Stroke::new(line_width, color));
            }
        }
        for (points, color) in filled {
            if let (Some(first), Some(last)) = (points.first(), points.last()) {
                if first[0] < last[0] {
                    let outline = [
                        ScreenPoint::new(lower_tf.x_to_px(first[0]), baseline_y),
                        ScreenPoint::new(lower_tf.x_to_px(last[0]), baseline_y),
                    ];
                    surface.draw_polyline(&outline, Stroke::new(line_width, color));
                }
            }
        }

        // Frames and axes drawn last so they stay on top of the data
        self.draw_frame(surface, upper);
        self.draw_frame(surface, lower);
        self.draw_y_axis(surface, &upper_tf, &y_labels);
        self.draw_x_axis(surface, &lower_tf);

        tracing::trace!(
            "Rendered {} visible samples as {} points per series",
            visible.len(),
            temperature_pts.len()
        );

        RenderStats {
            visible_samples: visible.len(),
            points_per_series: temperature_pts.len(),
            downsampled,
        }
    }

    fn label_gutter(&self, labels: &[Vec<(f64, String)>]) -> f32 {
        let text_band = self.style.tick_length + self.style.tick_text_offset;
        match self.layout.label_width {
            LabelWidth::Fixed(width) => width,
            LabelWidth::Estimated => {
                let widest = labels
                    .iter()
                    .flatten()
                    .map(|(_, text)| self.estimate_text_width(text))
                    .fold(0.0f32, f32::max);
                widest + text_band
            }
        }
    }

    fn estimate_text_width(&self, text: &str) -> f32 {
        text.chars().count() as f32 * self.style.font_size * GLYPH_WIDTH_FACTOR
    }

    fn draw_frame(&self, surface: &mut dyn DrawingSurface, rect: ScreenRect) {
        surface.draw_polyline(&rect.outline(), self.style.axis_stroke());
    }

    fn draw_y_axis(
        &self,
        surface: &mut dyn DrawingSurface,
        tf: &PaneTransform,
        labels: &[Vec<(f64, String)>],
    ) {
        let text = self.style.text();
        let x = tf.rect.left;
        for (level, ticks) in labels.iter().enumerate() {
            let length = self.style.tick_length / (level as f32 + 1.0);
            // Minor labels only where there is vertical room for them
            let label_this_level = level == 0 || level_gap_px(ticks, |v| tf.y_to_px(v)) >= text.size * 1.5;
            for (value, label) in ticks {
                let y = tf.y_to_px(*value);
                surface.draw_polyline(
                    &[ScreenPoint::new(x, y), ScreenPoint::new(x + length, y)],
                    self.style.axis_stroke(),
                );
                if label_this_level {
                    surface.draw_tick_label(
                        ScreenPoint::new(x - self.style.tick_text_offset, y),
                        label,
                        LabelAnchor::RightCenter,
                        text,
                    );
                }
            }
        }
    }

    fn draw_x_axis(&self, surface: &mut dyn DrawingSurface, tf: &PaneTransform) {
        let (lo, hi) = tf.x;
        let plan = self.planner.plan(lo, hi, f64::from(tf.rect.width));
        let text = self.style.text();
        let y = tf.rect.bottom();

        for (level, (values, spacing)) in plan
            .tick_values(lo, hi)
            .into_iter()
            .zip(plan.spacings())
            .enumerate()
        {
            let labels: Vec<(f64, String)> = values
                .iter()
                .map(|v| (*v, format_tick(*v, spacing)))
                .collect();
            let widest = labels
                .iter()
                .map(|(_, l)| self.estimate_text_width(l))
                .fold(0.0f32, f32::max);
            let length = self.style.tick_length / (level as f32 + 1.0);
            let label_this_level =
                level == 0 || level_gap_px(&labels, |v| tf.x_to_px(v)) >= widest + 4.0;

            for (value, label) in &labels {
                let x = tf.x_to_px(*value);
                surface.draw_polyline(
                    &[ScreenPoint::new(x, y), ScreenPoint::new(x, y - length)],
                    self.style.axis_stroke(),
                );
                if label_this_level {
                    surface.draw_tick_label(
                        ScreenPoint::new(x, y + self.style.tick_text_offset),
                        label,
                        LabelAnchor::TopCenter,
                        text,
                    );
                }
            }
        }
    }
}

/// Smallest pixel distance between adjacent ticks of one level
fn level_gap_px(ticks: &[(f64, String)], to_px: impl Fn(f64) -> f32) -> f32 {
    ticks
        .windows(2)
        .map(|w| (to_px(w[1].0) - to_px(w[0].0)).abs())
        .fold(f32::INFINITY, f32::min)
}

/// Temperature range covering the values inside `x_range`, floored at 0 K
fn fit_range(points: &[[f64; 2]], x_range: (f64, f64)) -> Option<(f64, f64)> {
    let (min, max) = points
        .iter()
        .filter(|p| p[0] >= x_range.0 && p[0] <= x_range.1 && p[1].is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
            (lo.min(p[1]), hi.max(p[1]))
        });
    if min > max {
        return None;
    }
    let span = max - min;
    let (lo, hi) = if span > 0.0 {
        (min - span * AUTO_FIT_PADDING, max + span * AUTO_FIT_PADDING)
    } else {
        (min - FLAT_SERIES_HALF_SPAN, max + FLAT_SERIES_HALF_SPAN)
    };
    let lo = lo.max(0.0);
    let hi = if hi > lo { hi } else { lo + 2.0 * FLAT_SERIES_HALF_SPAN };
    Some((lo, hi))
}

/// Cut a polyline to `x_range`, interpolating the crossing points
///
/// Points must be sorted by x.
fn clip_x(points: &[[f64; 2]], x_range: (f64, f64)) -> Vec<[f64; 2]> {
    let (lo, hi) = x_range;
    let mut out = Vec::with_capacity(points.len());
    for (i, p) in points.iter().enumerate() {
        if p[0] >= lo && p[0] <= hi {
            if p[0] > lo && i > 0 && points[i - 1][0] < lo {
                out.push(interpolate(points[i - 1], *p, lo));
            }
            out.push(*p);
            if p[0] < hi && i + 1 < points.len() && points[i + 1][0] > hi {
                out.push(interpolate(*p, points[i + 1], hi));
            }
        } else if p[0] < lo && i + 1 < points.len() && points[i + 1][0] > hi {
            // A single segment spanning the whole range
            out.push(interpolate(*p, points[i + 1], lo));
            out.push(interpolate(*p, points[i + 1], hi));
        }
    }
    out
}

fn interpolate(a: [f64; 2], b: [f64; 2], x: f64) -> [f64; 2] {
    let dx = b[0] - a[0];
    if dx == 0.0 {
        return [x, a[1]];
    }
    let t = (x - a[0]) / dx;
    [x, a[1] + (b[1] - a[1]) * t]
}
