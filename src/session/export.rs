//! Tab-separated temperature trace export
//!
//! File layout:
//!
//! ```text
//! # temperature trace, saved on 19/10/2026
//! # Time (sec)	Temperature (K)	Heater (% of 40 V)	Gas flow (%)
//! 0	10	0	0
//! 60	20	50	50
//! ```
//!
//! Numbers use the shortest representation that reads back to the same
//! value. Rows are in buffer order.

use crate::error::{Result, ThermoVisError};
use crate::types::Sample;
use chrono::NaiveDate;
use std::ffi::OsString;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Extension every exported trace carries
pub const EXPORT_EXTENSION: &str = "txt";

/// Prefix that marks the title and header as comments
const COMMENT_PREFIX: &str = "# ";

/// Append `.txt` unless the path already ends in it
pub fn normalize_export_path(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    let has_extension = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(EXPORT_EXTENSION));
    if has_extension {
        return path.to_path_buf();
    }
    let mut name = OsString::from(path.as_os_str());
    name.push(".");
    name.push(EXPORT_EXTENSION);
    PathBuf::from(name)
}

/// Title line naming the save date
pub fn title_line(saved_on: NaiveDate) -> String {
    format!(
        "{}temperature trace, saved on {}",
        COMMENT_PREFIX,
        saved_on.format("%d/%m/%Y")
    )
}

/// Column header line
pub fn header_line(heater_voltage_limit: f64) -> String {
    format!(
        "{}Time (sec)\tTemperature (K)\tHeater (% of {} V)\tGas flow (%)",
        COMMENT_PREFIX, heater_voltage_limit
    )
}

/// One data row
pub fn format_row(sample: &Sample) -> String {
    format!(
        "{}\t{}\t{}\t{}",
        sample.timestamp, sample.temperature, sample.heater_percent, sample.flow_percent
    )
}

/// Writes temperature traces
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceExporter {
    heater_voltage_limit: f64,
}

impl TraceExporter {
    pub fn new(heater_voltage_limit: f64) -> Self {
        Self {
            heater_voltage_limit,
        }
    }

    pub fn heater_voltage_limit(&self) -> f64 {
        self.heater_voltage_limit
    }

    /// Write the title, header and one row per sample to `writer`
    pub fn write_to<W: Write>(
        &self,
        writer: &mut W,
        samples: &[Sample],
        saved_on: NaiveDate,
    ) -> std::io::Result<()> {
        writeln!(writer, "{}", title_line(saved_on))?;
        writeln!(writer, "{}", header_line(self.heater_voltage_limit))?;
        for sample in samples {
            writeln!(writer, "{}", format_row(sample))?;
        }
        writer.flush()
    }

    /// Export `samples` to `path` (with `.txt` appended if missing)
    ///
    /// Returns the path actually written. The samples are only read.
    pub fn export(
        &self,
        path: impl AsRef<Path>,
        samples: &[Sample],
        saved_on: NaiveDate,
    ) -> Result<PathBuf> {
        let path = normalize_export_path(path);
        let to_export_error = |source| ThermoVisError::Export {
            path: path.clone(),
            source,
        };

        let file = File::create(&path).map_err(to_export_error)?;
        let mut writer = BufWriter::new(file);
        self.write_to(&mut writer, samples, saved_on)
            .map_err(to_export_error)?;

        tracing::info!("Exported {} samples to {}", samples.len(), path.display());
        Ok(path)
    }
}
