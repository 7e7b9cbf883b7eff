//! Visible time window and point budget
//!
//! The plot's x axis is in minutes relative to the newest sample, so the
//! newest sample always sits at 0 and the window `[-width, 0]` scrolls with
//! the data. [`Viewport`] owns the window width chosen by the user and the
//! downsampling policy that keeps the number of rasterized points bounded.

use crate::analysis::downsample::{downsample, DownsampleMode};
use crate::error::{Result, ThermoVisError};
use crate::types::{Sample, DOWNSAMPLE_POINTS_PER_PIXEL};
use std::borrow::Cow;

/// Fixed value range of the normalized heater/flow pane
pub const NORMALIZED_Y_RANGE: (f64, f64) = (-0.02, 1.02);

/// Width of the visible history in minutes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeWindow {
    width_minutes: f64,
}

impl TimeWindow {
    /// Create a window; the width must be positive and finite
    pub fn new(width_minutes: f64) -> Result<Self> {
        if width_minutes > 0.0 && width_minutes.is_finite() {
            Ok(Self { width_minutes })
        } else {
            Err(ThermoVisError::InvalidWindow(width_minutes))
        }
    }

    pub fn width_minutes(&self) -> f64 {
        self.width_minutes
    }

    /// The x range `[-width, 0]` in relative minutes
    pub fn range(&self) -> (f64, f64) {
        (-self.width_minutes, 0.0)
    }
}

/// Result of a window width change, applied by the renderer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowChange {
    /// New shared x range of both panes
    pub x_range: (f64, f64),
    /// Whether temperature auto-fit should be switched back on
    pub refit_temperature: bool,
}

/// Current time window and downsampling policy
#[derive(Debug, Clone)]
pub struct Viewport {
    window: TimeWindow,
    downsample_mode: DownsampleMode,
}

impl Viewport {
    pub fn new(window: TimeWindow, downsample_mode: DownsampleMode) -> Self {
        if !downsample_mode.preserves_extrema() {
            tracing::warn!(
                "Downsampling mode '{}' may hide short spikes",
                downsample_mode.display_name()
            );
        }
        Self {
            window,
            downsample_mode,
        }
    }

    pub fn width_minutes(&self) -> f64 {
        self.window.width_minutes()
    }

    pub fn window(&self) -> TimeWindow {
        self.window
    }

    pub fn downsample_mode(&self) -> DownsampleMode {
        self.downsample_mode
    }

    /// The x range currently selected by the user
    pub fn x_range(&self) -> (f64, f64) {
        self.window.range()
    }

    /// Change the window width
    ///
    /// The returned change resets the shared x axis to `[-minutes, 0]` and
    /// re-enables temperature auto-fit.
    pub fn set_width(&mut self, minutes: f64) -> Result<WindowChange> {
        self.window = TimeWindow::new(minutes)?;
        tracing::debug!("Display window set to {} min", minutes);
        Ok(WindowChange {
            x_range: self.window.range(),
            refit_temperature: true,
        })
    }

    /// Samples whose relative time falls within `[-width, 0]`
    pub fn visible_slice<'a>(&self, samples: &'a [Sample]) -> &'a [Sample] {
        let Some(reference) = samples.last().map(|s| s.timestamp) else {
            return samples;
        };
        let (lo, hi) = self.x_range();
        slice_between(samples, reference, lo, hi)
    }

    /// Whether `point_count` points are too many for `pixel_width` columns
    pub fn needs_downsampling(&self, point_count: usize, pixel_width: f32) -> bool {
        pixel_width > 0.0 && point_count as f64 > DOWNSAMPLE_POINTS_PER_PIXEL * f64::from(pixel_width)
    }

    /// Reduce a series to what `pixel_width` columns can show
    pub fn reduce<'a>(&self, points: &'a [[f64; 2]], pixel_width: f32) -> Cow<'a, [[f64; 2]]> {
        if !self.needs_downsampling(points.len(), pixel_width) {
            return Cow::Borrowed(points);
        }
        downsample(points, self.downsample_mode, pixel_width.ceil() as usize)
    }
}

/// Samples with relative time (minutes from `reference`) within `[lo, hi]`
///
/// Samples must be in non-decreasing timestamp order.
pub fn slice_between(samples: &[Sample], reference: f64, lo: f64, hi: f64) -> &[Sample] {
    let start = samples.partition_point(|s| s.minutes_since(reference) < lo);
    let end = samples.partition_point(|s| s.minutes_since(reference) <= hi);
    if start >= end {
        return &[];
    }
    &samples[start..end]
}

/// Like [`slice_between`], extended by one sample on each side so that lines
/// can be drawn up to the edges of the range
pub fn slice_between_padded(samples: &[Sample], reference: f64, lo: f64, hi: f64) -> &[Sample] {
    let start = samples.partition_point(|s| s.minutes_since(reference) < lo);
    let end = samples.partition_point(|s| s.minutes_since(reference) <= hi);
    let start = start.saturating_sub(1);
    let end = (end + 1).min(samples.len());
    if start >= end {
        return &[];
    }
    &samples[start..end]
}
