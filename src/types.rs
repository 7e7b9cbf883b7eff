//! Core data types for ThermoVis
//!
//! This module contains the fundamental data structures shared by the
//! feed, the history store and the plot.
//!
//! # Main Types
//!
//! - [`Reading`] - One structured reading delivered by the polling feed
//! - [`Sample`] - The immutable record kept in the history buffer
//! - [`ConnectionStatus`] - Feed connection state shown in the shell
//! - [`FeedStats`] - Counters kept by the polling worker
//!
//! # Memory Management
//!
//! Samples are stored in a ring buffer capped at [`HISTORY_CAPACITY`]
//! entries, roughly 24 hours at one sample per second. When the buffer is
//! full the oldest sample is evicted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of samples retained in memory (~24 h at 1 Hz)
pub const HISTORY_CAPACITY: usize = 86_400;

/// Downsampling kicks in once a series has more points than this many
/// times the pixel width of the plotting surface
pub const DOWNSAMPLE_POINTS_PER_PIXEL: f64 = 3.0;

/// Seconds per minute, used to convert sample timestamps to the plot's x axis
pub const SECONDS_PER_MINUTE: f64 = 60.0;

/// Seconds since the Unix epoch, with sub-second precision
pub fn epoch_seconds(time: &DateTime<Utc>) -> f64 {
    time.timestamp() as f64 + f64::from(time.timestamp_subsec_nanos()) * 1e-9
}

/// A structured reading from the temperature controller
///
/// Field names on the wire follow the instrument driver's reading keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Wall-clock time the reading was taken
    pub timestamp: DateTime<Utc>,
    /// Sensor temperature in K
    #[serde(rename = "Temp")]
    pub temperature: f64,
    /// Control loop setpoint in K, if the controller reports one
    #[serde(rename = "TempSetpoint", default)]
    pub temperature_setpoint: Option<f64>,
    /// Heater output as percent of the heater voltage limit
    #[serde(rename = "HeaterPercent")]
    pub heater_percent: f64,
    /// Heater output voltage in V
    #[serde(rename = "HeaterVolt", default)]
    pub heater_volt: Option<f64>,
    /// Needle valve opening in percent
    #[serde(rename = "FlowPercent")]
    pub flow_percent: f64,
}

impl Reading {
    /// Create a reading with only the plotted quantities
    pub fn new(
        timestamp: DateTime<Utc>,
        temperature: f64,
        heater_percent: f64,
        flow_percent: f64,
    ) -> Self {
        Self {
            timestamp,
            temperature,
            temperature_setpoint: None,
            heater_percent,
            heater_volt: None,
            flow_percent,
        }
    }

    /// Attach the controller setpoint
    pub fn with_setpoint(mut self, setpoint: f64) -> Self {
        self.temperature_setpoint = Some(setpoint);
        self
    }

    /// Attach the heater voltage
    pub fn with_heater_volt(mut self, volt: f64) -> Self {
        self.heater_volt = Some(volt);
        self
    }

    /// Convert to the record stored in the history buffer, stamped with the
    /// reading's own wall-clock time
    pub fn to_sample(&self) -> Sample {
        self.to_sample_at(epoch_seconds(&self.timestamp))
    }

    /// Convert to a history record stamped with `timestamp` seconds
    pub fn to_sample_at(&self, timestamp: f64) -> Sample {
        Sample::new(
            timestamp,
            self.temperature,
            self.heater_percent,
            self.flow_percent,
        )
    }
}

/// One timestamped reading of temperature, heater and gas flow
///
/// Samples are `Copy` and never mutated after they are recorded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Time of the reading in seconds
    pub timestamp: f64,
    /// Temperature in K
    pub temperature: f64,
    /// Heater output in percent (0-100)
    pub heater_percent: f64,
    /// Gas flow in percent (0-100)
    pub flow_percent: f64,
}

impl Sample {
    /// Create a new sample
    pub fn new(timestamp: f64, temperature: f64, heater_percent: f64, flow_percent: f64) -> Self {
        Self {
            timestamp,
            temperature,
            heater_percent,
            flow_percent,
        }
    }

    /// Heater output normalized to [0, 1] for co-display with gas flow
    #[inline]
    pub fn heater_fraction(&self) -> f64 {
        self.heater_percent / 100.0
    }

    /// Gas flow normalized to [0, 1]
    #[inline]
    pub fn flow_fraction(&self) -> f64 {
        self.flow_percent / 100.0
    }

    /// Minutes elapsed relative to `reference` (negative for older samples)
    #[inline]
    pub fn minutes_since(&self, reference: f64) -> f64 {
        (self.timestamp - reference) / SECONDS_PER_MINUTE
    }
}

impl From<&Reading> for Sample {
    fn from(reading: &Reading) -> Self {
        reading.to_sample()
    }
}

/// Represents the connection status of the temperature feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    /// Not polling
    #[default]
    Disconnected,
    /// Polling and receiving readings
    Connected,
    /// The last poll failed
    Error,
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionStatus::Disconnected => write!(f, "Disconnected"),
            ConnectionStatus::Connected => write!(f, "Connected"),
            ConnectionStatus::Error => write!(f, "Error"),
        }
    }
}

/// Statistics kept by the polling worker
#[derive(Debug, Clone, Default)]
pub struct FeedStats {
    /// Number of successful reads
    pub successful_reads: u64,
    /// Number of failed reads
    pub failed_reads: u64,
    /// Notifications dropped because the UI queue was full
    pub dropped_notifications: u64,
    /// Attempts to deliver a status change that found the UI queue full
    pub deferred_status_updates: u64,
    /// Average read time in microseconds
    pub avg_read_time_us: f64,
}

impl FeedStats {
    /// Calculate the success rate as a percentage
    pub fn success_rate(&self) -> f64 {
        let total = self.successful_reads + self.failed_reads;
        if total == 0 {
            100.0
        } else {
            (self.successful_reads as f64 / total as f64) * 100.0
        }
    }

    /// Fold a new read duration into the running average
    pub fn record_read_time(&mut self, micros: f64) {
        let n = self.successful_reads.max(1) as f64;
        self.avg_read_time_us += (micros - self.avg_read_time_us) / n;
    }
}
