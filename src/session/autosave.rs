//! Periodic autosave of the temperature history
//!
//! While the feed is connected, the whole history is written every few
//! minutes to one log file per session, named after the session start time:
//! `LOG_FILES/temperature_log 2026-10-19_14-03-22.txt`. Each save overwrites
//! the previous one.

use crate::error::{Result, ThermoVisError};
use crate::session::export::TraceExporter;
use crate::types::Sample;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Build the log file name for a session started at `started`
pub fn log_file_name(started: DateTime<Local>) -> String {
    format!("temperature_log {}.txt", started.format("%Y-%m-%d_%H-%M-%S"))
}

/// Writes the history to a per-session log file at a fixed interval
#[derive(Debug)]
pub struct Autosaver {
    path: PathBuf,
    interval: Duration,
    last_save: Instant,
    exporter: TraceExporter,
    saves: u64,
}

impl Autosaver {
    /// Create an autosaver writing into `dir`
    ///
    /// The first save is due one `interval` after creation.
    pub fn new(
        dir: impl AsRef<Path>,
        interval: Duration,
        started: DateTime<Local>,
        exporter: TraceExporter,
    ) -> Self {
        Self {
            path: dir.as_ref().join(log_file_name(started)),
            interval,
            last_save: Instant::now(),
            exporter,
            saves: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn saves(&self) -> u64 {
        self.saves
    }

    /// Whether a save is due at `now`
    pub fn is_due(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_save) >= self.interval
    }

    /// Write `samples` now, creating the log directory if needed
    pub fn save(&mut self, samples: &[Sample]) -> Result<PathBuf> {
        self.last_save = Instant::now();
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir).map_err(|source| ThermoVisError::Export {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        let written = self
            .exporter
            .export(&self.path, samples, Local::now().date_naive())?;
        self.saves += 1;
        Ok(written)
    }

    /// Save if connected and the interval has elapsed
    ///
    /// `samples` is only called when a save actually happens. Returns `None`
    /// when nothing was due.
    pub fn tick<F, S>(&mut self, connected: bool, now: Instant, samples: F) -> Option<Result<PathBuf>>
    where
        F: FnOnce() -> S,
        S: AsRef<[Sample]>,
    {
        if !connected || !self.is_due(now) {
            return None;
        }
        let result = self.save(samples().as_ref());
        match &result {
            Ok(path) => tracing::debug!("Autosaved history to {}", path.display()),
            Err(e) => tracing::error!("Autosave failed: {}", e),
        }
        Some(result)
    }
}
