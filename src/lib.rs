//! # ThermoVis-RS: Temperature Controller Monitor
//!
//! A live monitor for a laboratory temperature controller. The controller is
//! polled in the background and its readings are drawn as a scrolling
//! history: temperature in one pane, heater output and gas flow in a second
//! pane that shares the time axis.
//!
//! ## Architecture
//!
//! - **Backend**: Polls a [`backend::TemperatureFeed`] in a separate thread and
//!   appends every reading to the shared [`history::SharedHistory`]
//! - **History**: Bounded ring buffer (about 24 h at 1 Hz) with cheap
//!   snapshots for the renderer
//! - **Frontend**: eframe/egui shell and the dual-pane renderer, which draws
//!   through the [`frontend::DrawingSurface`] trait
//! - **Session**: Ties history, viewport and renderer together and exports
//!   the history as a tab-separated trace
//! - **Communication**: Crossbeam channels for thread-safe notifications
//!
//! ## Configuration
//!
//! Settings are read from `config.toml` in the platform config directory
//! under `dev.thermovis.thermovis-rs`; see [`config`].
//!
//! ## Example
//!
//! ```ignore
//! use thermovis_rs::{
//!     backend::{FeedBackend, SimulatedController},
//!     config::{AppConfig, AppState},
//!     frontend::ThermoVisApp,
//!     history::SharedHistory,
//!     session::TelemetrySession,
//! };
//!
//! fn main() -> eframe::Result<()> {
//!     let config = AppConfig::load_or_default();
//!     let history = SharedHistory::default();
//!     let (backend, feed) =
//!         FeedBackend::new(&config.feed, history.clone(), Box::new(SimulatedController::new()));
//!     let thread = std::thread::spawn(move || backend.run());
//!     let session = TelemetrySession::new(&config, history).unwrap();
//!
//!     eframe::run_native(
//!         "ThermoVis",
//!         eframe::NativeOptions::default(),
//!         Box::new(|_cc| {
//!             Ok(Box::new(ThermoVisApp::new(
//!                 config,
//!                 AppState::load_or_default(),
//!                 feed,
//!                 Some(thread),
//!                 session,
//!             )))
//!         }),
//!     )
//! }
//! ```

pub mod analysis;
pub mod backend;
pub mod config;
pub mod error;
pub mod frontend;
pub mod history;
pub mod logging;
pub mod session;
pub mod types;

// Re-export commonly used types
pub use analysis::{DownsampleMode, TickPlan, TickPlanner};
pub use backend::{FeedBackend, FeedCommand, FeedEvent, FeedHandle, TemperatureFeed};
pub use config::{AppConfig, AppState};
pub use error::{Result, ThermoVisError};
pub use frontend::{DualPaneRenderer, ThermoVisApp, Viewport};
pub use history::{HistoryBuffer, HistorySnapshot, SharedHistory};
pub use session::TelemetrySession;
pub use types::{Reading, Sample};
