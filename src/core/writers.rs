//! Data writers for processed series and the scour-depth log.
//!
//! - Processed instrument CSV (`,name [unit]` header, NaN as empty cell)
//! - `Instrument,Depth` scour log, appended to or truncated per call

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use thiserror::Error;

use super::series::TimeSeries;

/// Errors that can occur during write operations.
#[derive(Error, Debug)]
pub enum WriteError {
    /// Failed to create parent directories.
    #[error("failed to create parent directories for '{path}': {source}")]
    CreateDirectory {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to create or open file for writing.
    #[error("failed to create file '{path}': {source}")]
    CreateFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write data to file.
    #[error("failed to write to file '{path}': {source}")]
    WriteFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// CSV writing error.
    #[error("CSV write error for '{path}': {source}")]
    CsvError {
        path: String,
        #[source]
        source: csv::Error,
    },
}

/// Result type for write operations.
pub type Result<T> = std::result::Result<T, WriteError>;

/// How the scour log is opened for a single record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogMode {
    /// Add a line after the existing content
    Append,
    /// Start the log over with this line
    Truncate,
}

/// Creates parent directories for a file path if they don't exist.
fn ensure_parent_dirs(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| WriteError::CreateDirectory {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
    }
    Ok(())
}

fn format_value(v: f64) -> String {
    if v.is_nan() {
        String::new()
    } else {
        v.to_string()
    }
}

/// Write one instrument's series as `,name [unit]` then `time,value` rows.
pub fn write_processed_series(path: &Path, name: &str, series: &TimeSeries) -> Result<()> {
    ensure_parent_dirs(path)?;

    let file = File::create(path).map_err(|e| WriteError::CreateFile {
        path: path.display().to_string(),
        source: e,
    })?;
    let mut csv_writer = csv::Writer::from_writer(BufWriter::new(file));
    let path_str = path.display().to_string();

    let header = format!("{} [{}]", name, series.unit());
    csv_writer
        .write_record(["", header.as_str()])
        .map_err(|e| WriteError::CsvError {
            path: path_str.clone(),
            source: e,
        })?;

    for (t, v) in series.time().iter().zip(series.values()) {
        csv_writer
            .write_record([t.to_string(), format_value(*v)])
            .map_err(|e| WriteError::CsvError {
                path: path_str.clone(),
                source: e,
            })?;
    }

    csv_writer.flush().map_err(|e| WriteError::WriteFile {
        path: path_str,
        source: e,
    })?;

    Ok(())
}

/// Record one `instrument,depth` line in the scour log.
pub fn write_scour_depth(path: &Path, instrument: &str, depth: f64, mode: LogMode) -> Result<()> {
    ensure_parent_dirs(path)?;

    let mut options = OpenOptions::new();
    match mode {
        LogMode::Append => options.create(true).append(true),
        LogMode::Truncate => options.create(true).write(true).truncate(true),
    };
    let file = options.open(path).map_err(|e| WriteError::CreateFile {
        path: path.display().to_string(),
        source: e,
    })?;

    let mut writer = BufWriter::new(file);
    writeln!(writer, "{},{}", instrument, format_value(depth))
        .and_then(|_| writer.flush())
        .map_err(|e| WriteError::WriteFile {
            path: path.display().to_string(),
            source: e,
        })?;

    Ok(())
}
