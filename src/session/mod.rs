//! Telemetry session
//!
//! A [`TelemetrySession`] ties the history, the viewport and the renderer
//! together and is the interface the application shell talks to:
//!
//! - `append_sample` - record a sample and schedule a redraw
//! - `set_window_width` - change the visible window
//! - `render` - redraw both panes from the newest snapshot
//! - `export` - write the retained history as a tab-separated trace
//!
//! Redraws are latest-wins: any number of requests between two frames
//! collapse into one redraw of the newest data.

pub mod autosave;
pub mod export;

pub use autosave::Autosaver;
pub use export::{normalize_export_path, TraceExporter};

use crate::config::AppConfig;
use crate::error::Result;
use crate::frontend::plot::{DualPaneRenderer, PlotLayout, RenderStats};
use crate::frontend::surface::DrawingSurface;
use crate::frontend::viewport::{TimeWindow, Viewport};
use crate::history::{HistorySnapshot, SharedHistory};
use crate::types::Sample;
use chrono::Local;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Coalescing redraw flag shared between producers and the render loop
///
/// Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct RedrawScheduler {
    pending: Arc<AtomicBool>,
    superseded: Arc<AtomicU64>,
}

impl RedrawScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask for a redraw
    ///
    /// Returns `false` when a redraw was already pending, in which case this
    /// request is absorbed by it.
    pub fn request(&self) -> bool {
        let newly = !self.pending.swap(true, Ordering::AcqRel);
        if !newly {
            self.superseded.fetch_add(1, Ordering::Relaxed);
        }
        newly
    }

    /// Consume the pending request, if any
    pub fn take(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Requests that were absorbed by an already pending redraw
    pub fn superseded(&self) -> u64 {
        self.superseded.load(Ordering::Relaxed)
    }
}

/// History, window and plot of one monitoring session
pub struct TelemetrySession {
    history: SharedHistory,
    viewport: Viewport,
    renderer: DualPaneRenderer,
    exporter: TraceExporter,
    scheduler: RedrawScheduler,
    last_rendered: Option<u64>,
}

impl TelemetrySession {
    /// Create a session over `history` configured from `config`
    pub fn new(config: &AppConfig, history: SharedHistory) -> Result<Self> {
        let layout = PlotLayout::for_variant(config.display.variant);
        let window = TimeWindow::new(config.display.window_minutes)?;
        let viewport = Viewport::new(window, layout.downsample);
        let renderer = DualPaneRenderer::new(config.style.clone(), layout, viewport.x_range());

        tracing::debug!(
            "Session started: {:?} layout, {} min window",
            config.display.variant,
            window.width_minutes()
        );

        let scheduler = RedrawScheduler::new();
        scheduler.request();

        Ok(Self {
            history,
            viewport,
            renderer,
            exporter: TraceExporter::new(config.feed.heater_voltage_limit),
            scheduler,
            last_rendered: None,
        })
    }

    pub fn history(&self) -> &SharedHistory {
        &self.history
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn renderer(&self) -> &DualPaneRenderer {
        &self.renderer
    }

    pub fn exporter(&self) -> &TraceExporter {
        &self.exporter
    }

    /// Handle for producers that want to request redraws
    pub fn scheduler(&self) -> RedrawScheduler {
        self.scheduler.clone()
    }

    /// Record a sample and schedule a redraw; returns the new generation
    pub fn append_sample(&self, sample: Sample) -> u64 {
        let generation = self.history.append(sample);
        self.scheduler.request();
        generation
    }

    /// Note that a producer appended up to `generation`
    pub fn notify_appended(&self, generation: u64) {
        if self.last_rendered != Some(generation) {
            self.scheduler.request();
        }
    }

    /// Show the last `minutes` minutes and refit the temperature axis
    pub fn set_window_width(&mut self, minutes: f64) -> Result<()> {
        let change = self.viewport.set_width(minutes)?;
        self.renderer.apply_window(change);
        self.scheduler.request();
        Ok(())
    }

    pub fn window_minutes(&self) -> f64 {
        self.viewport.width_minutes()
    }

    /// Samples currently inside the window
    pub fn visible_count(&self) -> usize {
        let snapshot = self.history.snapshot();
        self.viewport.visible_slice(&snapshot).len()
    }

    pub fn snapshot(&self) -> HistorySnapshot {
        self.history.snapshot()
    }

    /// Whether a redraw has been requested since the last render
    pub fn needs_redraw(&self) -> bool {
        self.scheduler.is_pending()
    }

    /// Redraw both panes from the newest snapshot
    ///
    /// Rendering the same snapshot twice produces the same drawing calls.
    pub fn render(&mut self, surface: &mut dyn DrawingSurface) -> RenderStats {
        self.scheduler.take();
        let snapshot = self.history.snapshot();
        self.last_rendered = Some(snapshot.generation());
        self.renderer.render(surface, &snapshot, &self.viewport)
    }

    /// Pan both panes by `dx` minutes
    pub fn pan_x(&mut self, dx: f64) {
        self.renderer.pan_x(dx);
        self.scheduler.request();
    }

    /// Zoom both panes' time axis about `anchor`
    pub fn zoom_x(&mut self, factor: f64, anchor: f64) {
        self.renderer.zoom_x(factor, anchor);
        self.scheduler.request();
    }

    /// Zoom the temperature axis about `anchor`, turning off auto-fit
    pub fn zoom_temperature(&mut self, factor: f64, anchor: f64) {
        self.renderer.zoom_temperature(factor, anchor);
        self.scheduler.request();
    }

    /// Pan the temperature axis by `dy` K, turning off auto-fit
    pub fn pan_temperature(&mut self, dy: f64) {
        self.renderer.pan_temperature(dy);
        self.scheduler.request();
    }

    /// Return to `[-width, 0]` with temperature auto-fit
    pub fn reset_view(&mut self) {
        self.renderer.reset_view(&self.viewport);
        self.scheduler.request();
    }

    /// Export the retained history to `path`, appending `.txt` if missing
    ///
    /// The history is not modified whether or not the export succeeds.
    pub fn export(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let snapshot = self.history.snapshot();
        self.exporter
            .export(path, &snapshot, Local::now().date_naive())
    }

    /// End the session; the panes go back to idle
    pub fn shutdown(&mut self) {
        self.renderer.shutdown();
        self.scheduler.request();
        tracing::info!(
            "Session ended with {} samples retained",
            self.history.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::plot::PaneState;
    use crate::frontend::surface::MockDrawingSurface;

    fn quiet_surface() -> MockDrawingSurface {
        let mut surface = MockDrawingSurface::new();
        surface.expect_size().return_const((640.0f32, 480.0f32));
        surface.expect_draw_polyline().returning(|_, _| ());
        surface.expect_fill_to_baseline().returning(|_, _, _| ());
        surface.expect_draw_tick_label().returning(|_, _, _, _| ());
        surface
    }

    fn session() -> TelemetrySession {
        TelemetrySession::new(&AppConfig::default(), SharedHistory::default()).unwrap()
    }

    #[test]
    fn test_scheduler_coalesces_requests() {
        let scheduler = RedrawScheduler::new();
        assert!(scheduler.request());
        assert!(!scheduler.request());
        assert!(!scheduler.request());
        assert_eq!(scheduler.superseded(), 2);
        assert!(scheduler.take());
        assert!(!scheduler.take());
        assert!(scheduler.clone().request());
        assert!(scheduler.is_pending());
    }

    #[test]
    fn test_append_then_render_goes_live() {
        let mut s = session();
        let mut surface = quiet_surface();
        s.render(&mut surface);
        assert!(!s.needs_redraw());

        s.append_sample(Sample::new(0.0, 10.0, 0.0, 0.0));
        s.append_sample(Sample::new(60.0, 20.0, 50.0, 50.0));
        assert!(s.needs_redraw());

        let stats = s.render(&mut surface);
        assert_eq!(stats.visible_samples, 2);
        assert_eq!(s.renderer().state(), PaneState::Live);
        assert!(!s.needs_redraw());

        // Already rendered generation does not request again
        s.notify_appended(2);
        assert!(!s.needs_redraw());
        s.notify_appended(3);
        assert!(s.needs_redraw());
    }

    #[test]
    fn test_window_width_changes_visible_slice() {
        let mut s = session();
        s.append_sample(Sample::new(0.0, 10.0, 0.0, 0.0));
        s.append_sample(Sample::new(60.0, 20.0, 50.0, 50.0));

        s.set_window_width(2.0).unwrap();
        assert_eq!(s.visible_count(), 2);
        s.set_window_width(0.5).unwrap();
        assert_eq!(s.visible_count(), 1);
        assert_eq!(s.renderer().x_range(), (-0.5, 0.0));

        assert!(s.set_window_width(0.0).is_err());
        assert_eq!(s.window_minutes(), 0.5);
    }

    #[test]
    fn test_reset_view_after_zoom() {
        let mut s = session();
        s.zoom_temperature(0.5, 100.0);
        s.pan_x(-10.0);
        assert!(!s.renderer().is_auto_fitting());

        s.reset_view();
        assert!(s.renderer().is_auto_fitting());
        assert_eq!(s.renderer().x_range(), (-60.0, 0.0));
    }

    #[test]
    fn test_failed_export_leaves_history() {
        let dir = tempfile::tempdir().unwrap();
        let s = session();
        s.append_sample(Sample::new(0.0, 10.0, 0.0, 0.0));

        let result = s.export(dir.path().join("no_such_dir").join("trace"));
        assert!(result.unwrap_err().is_export_failure());
        assert_eq!(s.history().len(), 1);
    }

    #[test]
    fn test_shutdown_returns_to_idle() {
        let mut s = session();
        s.append_sample(Sample::new(0.0, 10.0, 0.0, 0.0));
        let mut surface = quiet_surface();
        s.render(&mut surface);
        s.shutdown();
        s.render(&mut surface);
        assert_eq!(s.renderer().state(), PaneState::Idle);
    }
}
