//! ThermoVis - Main Entry Point
//!
//! Live monitor for a laboratory temperature controller with a scrolling
//! temperature, heater and gas flow history.

use anyhow::Context;
use thermovis_rs::{
    backend::{FeedBackend, SimulatedController},
    config::{AppConfig, AppState},
    frontend::ThermoVisApp,
    history::SharedHistory,
    logging::init_logging,
    session::TelemetrySession,
};

fn main() -> anyhow::Result<()> {
    let config = AppConfig::load_or_default();
    let _log_guard = init_logging(&config.logging);

    tracing::info!("Starting ThermoVis");

    let app_state = AppState::load_or_default();
    let dark_mode = app_state.dark_mode;

    // The feed thread is the only writer of the history
    let history = SharedHistory::default();
    let feed = SimulatedController::new()
        .with_heater_voltage_limit(config.feed.heater_voltage_limit)
        .with_noise(0.02);
    let (backend, feed_handle) = FeedBackend::new(&config.feed, history.clone(), Box::new(feed));
    let backend_thread = std::thread::Builder::new()
        .name("feed".to_string())
        .spawn(move || backend.run())
        .context("Failed to spawn feed thread")?;

    let session =
        TelemetrySession::new(&config, history).context("Failed to create telemetry session")?;

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1100.0, 700.0])
            .with_min_inner_size([640.0, 420.0])
            .with_title("ThermoVis"),
        ..Default::default()
    };

    eframe::run_native(
        "ThermoVis",
        native_options,
        Box::new(move |cc| {
            if dark_mode {
                cc.egui_ctx.set_visuals(egui::Visuals::dark());
            } else {
                cc.egui_ctx.set_visuals(egui::Visuals::light());
            }

            Ok(Box::new(ThermoVisApp::new(
                config,
                app_state,
                feed_handle,
                Some(backend_thread),
                session,
            )))
        }),
    )
    .map_err(|e| anyhow::anyhow!("UI terminated with an error: {e}"))?;

    tracing::info!("Shut down");
    Ok(())
}
