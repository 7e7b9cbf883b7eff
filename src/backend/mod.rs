//! Backend module for polling the temperature controller
//!
//! The controller is polled in a separate thread to keep the UI responsive.
//! The polling thread is the only writer of the shared history; the UI only
//! reads snapshots. Communication uses crossbeam channels.
//!
//! # Architecture
//!
//! - [`FeedCommand`] - Messages sent from UI to backend (start, stop, setpoint)
//! - [`FeedEvent`] - Messages sent from backend to UI (connection, new samples)
//! - [`FeedHandle`] - UI-side handle for sending commands and receiving events
//! - [`FeedBackend`] - Backend entry point that owns the worker state
//!
//! # Components
//!
//! - [`TemperatureFeed`] - Anything that can produce readings
//! - [`SimulatedController`] - Cryostat model used when no instrument is attached
//! - [`FeedWorker`] - Polling loop
//!
//! # Example
//!
//! ```ignore
//! use thermovis_rs::backend::{FeedBackend, SimulatedController};
//! use thermovis_rs::config::AppConfig;
//! use thermovis_rs::history::SharedHistory;
//!
//! let history = SharedHistory::default();
//! let feed = Box::new(SimulatedController::new());
//! let (backend, handle) = FeedBackend::new(&AppConfig::default().feed, history.clone(), feed);
//!
//! std::thread::spawn(move || backend.run());
//! handle.start();
//!
//! for event in handle.drain() {
//!     if let FeedEvent::SampleAppended { generation, .. } = event {
//!         // Schedule a redraw
//!     }
//! }
//! ```

pub mod simulated;
pub mod worker;

pub use simulated::SimulatedController;
pub use worker::FeedWorker;

use crate::config::FeedConfig;
use crate::error::{Result, ThermoVisError};
use crate::history::SharedHistory;
use crate::types::{FeedStats, Reading};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

/// Lowest setpoint the controller accepts, in K (exclusive)
pub const MIN_SETPOINT: f64 = 3.5;

/// Highest setpoint the controller accepts, in K (exclusive)
pub const MAX_SETPOINT: f64 = 300.0;

/// Check a setpoint against the controller's accepted range
pub fn validate_setpoint(kelvin: f64) -> Result<f64> {
    if kelvin > MIN_SETPOINT && kelvin < MAX_SETPOINT {
        Ok(kelvin)
    } else {
        Err(ThermoVisError::Feed(format!(
            "Setpoint {} K is outside ({}, {}) K",
            kelvin, MIN_SETPOINT, MAX_SETPOINT
        )))
    }
}

/// A source of temperature controller readings
///
/// Implementations talk to an instrument (or simulate one). They are moved
/// into the polling thread, so they must be `Send`.
#[cfg_attr(test, mockall::automock)]
pub trait TemperatureFeed: Send {
    /// Open the connection to the controller
    fn connect(&mut self) -> Result<()>;

    /// Close the connection; safe to call when not connected
    fn disconnect(&mut self);

    /// Take one reading
    fn read(&mut self) -> Result<Reading>;

    /// Change the control loop setpoint in K
    fn set_setpoint(&mut self, kelvin: f64) -> Result<()>;

    /// Human readable name for logs and the status line
    fn name(&self) -> String;
}

/// Message sent from the UI to the backend
#[derive(Debug, Clone, PartialEq)]
pub enum FeedCommand {
    /// Connect and start polling
    Start,
    /// Stop polling and disconnect
    Stop,
    /// Change the polling interval
    SetInterval(Duration),
    /// Change the controller setpoint in K
    SetSetpoint(f64),
    /// Shut the backend down
    Shutdown,
}

/// Message sent from the backend to the UI
#[derive(Debug, Clone)]
pub enum FeedEvent {
    /// Connection state changed
    Connected(bool),
    /// Something the user should see in the status line
    Notify(String),
    /// A reading was appended to the shared history
    SampleAppended {
        /// History generation after the append
        generation: u64,
        /// The full reading, for the live readouts
        reading: Reading,
    },
    /// Statistics update
    Stats(FeedStats),
    /// Backend is shutting down
    Shutdown,
}

/// UI-side handle to the polling backend
pub struct FeedHandle {
    /// Receiver for backend events
    pub receiver: Receiver<FeedEvent>,
    /// Sender for commands to the backend
    pub command_sender: Sender<FeedCommand>,
}

impl FeedHandle {
    /// Try to receive an event without blocking
    pub fn try_recv(&self) -> Option<FeedEvent> {
        self.receiver.try_recv().ok()
    }

    /// Receive all pending events
    pub fn drain(&self) -> Vec<FeedEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }
        events
    }

    /// Send a command to the backend
    pub fn send_command(&self, cmd: FeedCommand) -> Result<()> {
        self.command_sender
            .send(cmd)
            .map_err(|e| ThermoVisError::Channel(format!("Feed thread gone: {:?}", e.into_inner())))
    }

    pub fn start(&self) {
        let _ = self.command_sender.send(FeedCommand::Start);
    }

    pub fn stop(&self) {
        let _ = self.command_sender.send(FeedCommand::Stop);
    }

    pub fn set_interval(&self, interval: Duration) {
        let _ = self.command_sender.send(FeedCommand::SetInterval(interval));
    }

    pub fn set_setpoint(&self, kelvin: f64) {
        let _ = self.command_sender.send(FeedCommand::SetSetpoint(kelvin));
    }

    /// Request shutdown
    pub fn shutdown(&self) {
        let _ = self.command_sender.send(FeedCommand::Shutdown);
    }
}

/// The polling backend that runs in a separate thread
pub struct FeedBackend {
    feed: Box<dyn TemperatureFeed>,
    history: SharedHistory,
    poll_interval: Duration,
    command_receiver: Receiver<FeedCommand>,
    event_sender: Sender<FeedEvent>,
    running: Arc<AtomicBool>,
}

impl FeedBackend {
    /// Create a backend writing into `history`, with its communication channels
    pub fn new(
        config: &FeedConfig,
        history: SharedHistory,
        feed: Box<dyn TemperatureFeed>,
    ) -> (Self, FeedHandle) {
        let (cmd_tx, cmd_rx) = bounded(64);
        // Notifications are dropped when full; the UI only needs the latest
        let (event_tx, event_rx) = bounded(config.channel_capacity.max(1));

        let backend = Self {
            feed,
            history,
            poll_interval: config.poll_interval(),
            command_receiver: cmd_rx,
            event_sender: event_tx,
            running: Arc::new(AtomicBool::new(true)),
        };

        let handle = FeedHandle {
            receiver: event_rx,
            command_sender: cmd_tx,
        };

        (backend, handle)
    }

    /// Run the polling loop until shutdown
    pub fn run(self) {
        let mut worker = FeedWorker::new(
            self.feed,
            self.history,
            self.poll_interval,
            self.command_receiver,
            self.event_sender,
            self.running,
        );
        worker.run();
    }

    /// Get a handle to stop the backend
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }
}
