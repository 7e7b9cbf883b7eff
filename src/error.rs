//! Error handling for the ThermoVis application
//!
//! This module defines the crate error type and a Result alias for use
//! throughout the library. The binary wraps these in `anyhow` at its boundary.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for ThermoVis operations
#[derive(Error, Debug)]
pub enum ThermoVisError {
    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors reported by a temperature feed while polling
    #[error("Feed error: {0}")]
    Feed(String),

    /// Errors related to channel communication
    #[error("Channel error: {0}")]
    Channel(String),

    /// A display window width that is not a positive, finite number of minutes
    #[error("Invalid window width: {0} min")]
    InvalidWindow(f64),

    /// Writing the temperature trace to disk failed
    #[error("Export to {path:?} failed: {source}")]
    Export {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<ThermoVisError>,
    },
}

impl ThermoVisError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        ThermoVisError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Whether this error (or the error it wraps) came from an export attempt
    pub fn is_export_failure(&self) -> bool {
        match self {
            ThermoVisError::Export { .. } => true,
            ThermoVisError::WithContext { source, .. } => source.is_export_failure(),
            _ => false,
        }
    }
}

/// Result type alias for ThermoVis operations
pub type Result<T> = std::result::Result<T, ThermoVisError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ThermoVisError::Feed("instrument not responding".to_string());
        assert_eq!(err.to_string(), "Feed error: instrument not responding");
    }

    #[test]
    fn test_error_with_context() {
        let err = ThermoVisError::Config("bad value".to_string());
        let with_ctx = err.with_context("Failed to load config");
        assert!(with_ctx.to_string().contains("Failed to load config"));
    }

    #[test]
    fn test_invalid_window_display() {
        let err = ThermoVisError::InvalidWindow(-3.0);
        assert!(err.to_string().contains("-3"));
    }

    #[test]
    fn test_export_failure_survives_context() {
        let err = ThermoVisError::Export {
            path: PathBuf::from("/nonexistent/trace.txt"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such directory"),
        };
        assert!(err.to_string().contains("trace.txt"));
        let wrapped = err.with_context("Autosave");
        assert!(wrapped.is_export_failure());
        assert!(!ThermoVisError::Channel("closed".into()).is_export_failure());
    }
}
