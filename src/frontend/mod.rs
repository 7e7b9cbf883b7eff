//! Frontend module for the egui UI
//!
//! The shell receives events from the polling backend through crossbeam
//! channels, keeps the live readouts up to date and paints the dual-pane
//! history plot every frame.
//!
//! # Main Types
//!
//! - [`ThermoVisApp`] - Main application state implementing [`eframe::App`]
//!
//! # Submodules
//!
//! - [`viewport`] - Visible time window and downsampling policy
//! - [`plot`] - Dual-pane renderer, plot style and layout variants
//! - [`surface`] - Drawing surface trait the renderer draws into
//! - [`painter`] - Egui implementation of the drawing surface
//! - [`widgets`] - Status indicator and readouts

pub mod painter;
pub mod plot;
pub mod surface;
pub mod viewport;
pub mod widgets;

pub use plot::{DualPaneRenderer, LayoutVariant, PlotLayout, PlotStyle};
pub use surface::DrawingSurface;
pub use viewport::{TimeWindow, Viewport};

use crate::backend::{validate_setpoint, FeedEvent, FeedHandle};
use crate::config::{AppConfig, AppState};
use crate::session::{Autosaver, TelemetrySession};
use crate::types::{ConnectionStatus, FeedStats, Reading};
use chrono::Local;
use painter::{to_color32, EguiSurface};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use widgets::{Readout, StatusIndicator};

/// How long a status message stays visible
const STATUS_MESSAGE_TTL: Duration = Duration::from_secs(8);

/// Zoom factor per scrolled point
const SCROLL_ZOOM_RATE: f64 = 0.002;

/// Main application state
pub struct ThermoVisApp {
    // === Communication ===
    feed: FeedHandle,
    backend_thread: Option<JoinHandle<()>>,

    // === Core ===
    session: TelemetrySession,
    autosaver: Option<Autosaver>,

    // === Shared State ===
    config: AppConfig,
    app_state: AppState,
    status: ConnectionStatus,
    latest: Option<Reading>,
    stats: FeedStats,
    status_message: Option<(String, Instant)>,

    // === Inputs ===
    window_minutes: f64,
    setpoint_input: String,
}

impl ThermoVisApp {
    /// Create the application around a running feed backend
    pub fn new(
        config: AppConfig,
        app_state: AppState,
        feed: FeedHandle,
        backend_thread: Option<JoinHandle<()>>,
        mut session: TelemetrySession,
    ) -> Self {
        let window_minutes = app_state
            .last_window_minutes
            .map(|w| config.display.clamp_window(w))
            .unwrap_or(config.display.window_minutes);
        if let Err(e) = session.set_window_width(window_minutes) {
            tracing::warn!("Ignoring remembered window width: {}", e);
        }

        let autosaver = if config.logging.autosave_enabled {
            match config.logging.autosave_dir() {
                Some(dir) => Some(Autosaver::new(
                    dir,
                    config.logging.autosave_interval(),
                    Local::now(),
                    *session.exporter(),
                )),
                None => {
                    tracing::warn!("No data directory available, autosave disabled");
                    None
                }
            }
        } else {
            None
        };

        Self {
            feed,
            backend_thread,
            session,
            autosaver,
            config,
            app_state,
            status: ConnectionStatus::Disconnected,
            latest: None,
            stats: FeedStats::default(),
            status_message: None,
            window_minutes,
            setpoint_input: String::new(),
        }
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = Some((message.into(), Instant::now()));
    }

    /// Drain backend events; returns whether any arrived
    ///
    /// Only the newest generation matters for drawing, so several appends
    /// between two frames cause a single redraw.
    fn process_feed_events(&mut self) -> bool {
        let events = self.feed.drain();
        let had_events = !events.is_empty();
        let mut newest_generation = None;

        for event in events {
            match event {
                FeedEvent::Connected(connected) => {
                    self.status = if connected {
                        ConnectionStatus::Connected
                    } else {
                        ConnectionStatus::Disconnected
                    };
                }
                FeedEvent::Notify(message) => self.set_status_message(message),
                FeedEvent::SampleAppended { generation, reading } => {
                    newest_generation = Some(generation);
                    self.latest = Some(reading);
                }
                FeedEvent::Stats(stats) => self.stats = stats,
                FeedEvent::Shutdown => {
                    self.status = ConnectionStatus::Disconnected;
                }
            }
        }

        if let Some(generation) = newest_generation {
            self.session.notify_appended(generation);
        }
        had_events
    }

    fn run_autosave(&mut self) {
        let connected = self.status == ConnectionStatus::Connected;
        let history = self.session.history().clone();
        let Some(autosaver) = self.autosaver.as_mut() else {
            return;
        };
        if let Some(Err(e)) = autosaver.tick(connected, Instant::now(), || history.snapshot()) {
            self.set_status_message(format!("Autosave failed: {}", e));
        }
    }

    fn export_dialog(&mut self) {
        let mut dialog = rfd::FileDialog::new()
            .add_filter("Text", &["txt"])
            .set_file_name("temperature_trace.txt");
        if let Some(dir) = &self.app_state.last_export_dir {
            dialog = dialog.set_directory(dir);
        }
        let Some(path) = dialog.save_file() else {
            return;
        };

        match self.session.export(&path) {
            Ok(written) => {
                self.app_state.remember_export(&written);
                self.set_status_message(format!("Saved {}", written.display()));
            }
            Err(e) => {
                tracing::error!("Export failed: {}", e);
                self.set_status_message(format!("Export failed: {}", e));
            }
        }
    }

    fn apply_setpoint(&mut self) {
        match self.setpoint_input.trim().parse::<f64>() {
            Ok(value) => match validate_setpoint(value) {
                Ok(kelvin) => self.feed.set_setpoint(kelvin),
                Err(e) => self.set_status_message(e.to_string()),
            },
            Err(_) => self.set_status_message("Setpoint must be a number in K"),
        }
    }

    fn render_top_bar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.add(
                StatusIndicator::new(self.status).with_tooltip(format!(
                    "{} reads, {:.1}% ok, {} notifications dropped",
                    self.stats.successful_reads + self.stats.failed_reads,
                    self.stats.success_rate(),
                    self.stats.dropped_notifications
                )),
            );

            let connected = self.status == ConnectionStatus::Connected;
            if ui.button(if connected { "Disconnect" } else { "Connect" }).clicked() {
                if connected {
                    self.feed.stop();
                } else {
                    self.feed.start();
                }
            }

            ui.separator();
            let style = self.session.renderer().style();
            let reading = self.latest.as_ref();
            ui.add(
                Readout::new("Temperature", reading.map(|r| r.temperature), 3, "K")
                    .with_color(to_color32(style.temperature_color)),
            );
            ui.add(Readout::new(
                "Setpoint",
                reading.and_then(|r| r.temperature_setpoint),
                2,
                "K",
            ));
            ui.add(
                Readout::new("Heater", reading.map(|r| r.heater_percent), 1, "%")
                    .with_color(to_color32(style.heater_color)),
            );
            ui.add(Readout::new(
                "Heater voltage",
                reading.and_then(|r| r.heater_volt),
                2,
                "V",
            ));
            ui.add(
                Readout::new("Gas flow", reading.map(|r| r.flow_percent), 1, "%")
                    .with_color(to_color32(style.flow_color)),
            );
        });

        ui.horizontal(|ui| {
            ui.label("Setpoint (K):");
            let response = ui.add(
                egui::TextEdit::singleline(&mut self.setpoint_input).desired_width(70.0),
            );
            let submitted =
                response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
            let enabled = self.status == ConnectionStatus::Connected;
            if ui.add_enabled(enabled, egui::Button::new("Set")).clicked() || (enabled && submitted) {
                self.apply_setpoint();
            }

            ui.separator();
            let display = &self.config.display;
            let slider = egui::Slider::new(
                &mut self.window_minutes,
                display.min_window_minutes..=display.max_window_minutes,
            )
            .logarithmic(true)
            .integer()
            .text("min")
            .prefix("Show last ");
            if ui.add(slider).changed() {
                if let Err(e) = self.session.set_window_width(self.window_minutes) {
                    self.set_status_message(e.to_string());
                }
            }

            if ui
                .button("Auto")
                .on_hover_text("Reset zoom and follow the newest data")
                .clicked()
            {
                self.session.reset_view();
            }

            if ui.button("Export…").clicked() {
                self.export_dialog();
            }

            if let Some((message, at)) = &self.status_message {
                if at.elapsed() < STATUS_MESSAGE_TTL {
                    ui.separator();
                    ui.label(message.as_str());
                }
            }
        });
    }

    fn render_plot(&mut self, ui: &mut egui::Ui) {
        let (response, painter) =
            ui.allocate_painter(ui.available_size(), egui::Sense::drag());
        let rect = response.rect;

        self.handle_plot_input(ui, &response, rect);

        let mut surface = EguiSurface::new(&painter, rect);
        surface.clear(self.session.renderer().style().background);
        self.session.render(&mut surface);
    }

    /// Drag pans, scroll zooms time; Ctrl+scroll over the temperature pane
    /// zooms temperature
    fn handle_plot_input(&mut self, ui: &egui::Ui, response: &egui::Response, rect: egui::Rect) {
        if rect.width() < 1.0 || rect.height() < 1.0 {
            return;
        }
        let (x_lo, x_hi) = self.session.renderer().x_range();
        let minutes_per_px = (x_hi - x_lo) / f64::from(rect.width());

        let drag = response.drag_delta();
        if drag.x != 0.0 {
            self.session.pan_x(-f64::from(drag.x) * minutes_per_px);
        }

        let Some(pointer) = response.hover_pos() else {
            return;
        };
        let (scroll, ctrl) = ui.input(|i| (i.smooth_scroll_delta, i.modifiers.ctrl));
        if scroll.y == 0.0 {
            return;
        }
        let factor = (-f64::from(scroll.y) * SCROLL_ZOOM_RATE).exp();

        let (upper, _) = self
            .session
            .renderer()
            .pane_rects((rect.width(), rect.height()), 0.0);
        let local_y = pointer.y - rect.min.y;
        let over_temperature = local_y >= upper.top && local_y <= upper.bottom();

        if ctrl && over_temperature {
            let (t_lo, t_hi) = self.session.renderer().temperature_y_range();
            let frac = f64::from((upper.bottom() - local_y) / upper.height.max(1.0));
            self.session.zoom_temperature(factor, t_lo + frac * (t_hi - t_lo));
        } else {
            let anchor = x_lo + f64::from(pointer.x - rect.min.x) * minutes_per_px;
            self.session.zoom_x(factor, anchor);
        }
    }
}

impl eframe::App for ThermoVisApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let had_events = self.process_feed_events();
        self.run_autosave();

        egui::TopBottomPanel::top("controls").show(ctx, |ui| {
            self.render_top_bar(ui);
        });

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                self.render_plot(ui);
            });

        if had_events || self.session.needs_redraw() {
            ctx.request_repaint();
        } else if self.status == ConnectionStatus::Connected {
            ctx.request_repaint_after(self.config.feed.poll_interval() / 2);
        } else {
            ctx.request_repaint_after(Duration::from_millis(250));
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.feed.shutdown();
        self.session.shutdown();

        self.app_state.last_window_minutes = Some(self.session.window_minutes());
        if let Err(e) = self.app_state.save() {
            tracing::warn!("Failed to save app state: {}", e);
        }

        if let Some(handle) = self.backend_thread.take() {
            if handle.join().is_err() {
                tracing::error!("Feed thread panicked");
            }
        }
    }
}
