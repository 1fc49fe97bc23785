//! CSV exports for the cleaned sample table and the day/night table.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use thiserror::Error;

use super::loaders::SampleTable;
use crate::processors::daynight::DayNightInterval;

/// Timestamp layout used in every export.
const EXPORT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

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

    /// CSV writing error.
    #[error("CSV write error for '{path}': {source}")]
    CsvError {
        path: String,
        #[source]
        source: csv::Error,
    },

    /// Failed to flush the output file.
    #[error("failed to write to file '{path}': {source}")]
    WriteFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for write operations.
pub type Result<T> = std::result::Result<T, WriteError>;

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

fn csv_err(path: &Path) -> impl Fn(csv::Error) -> WriteError + '_ {
    move |source| WriteError::CsvError {
        path: path.display().to_string(),
        source,
    }
}

/// Write the cleaned sample table, including ODBA when attached.
///
/// Undefined ODBA entries (the warm-up rows of the rolling window) are
/// written as empty cells rather than zero.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn write_samples_csv(path: &Path, table: &SampleTable) -> Result<()> {
    ensure_parent_dirs(path)?;

    let mut writer = csv::Writer::from_path(path).map_err(csv_err(path))?;
    writer
        .write_record([
            "timestamp",
            "pressure",
            "temperature",
            "acc_x",
            "acc_y",
            "acc_z",
            "odba",
        ])
        .map_err(csv_err(path))?;

    for i in 0..table.len() {
        let odba = table
            .odba
            .as_ref()
            .and_then(|col| col[i])
            .map(|v| format!("{:.6}", v))
            .unwrap_or_default();

        writer
            .write_record([
                table.timestamps[i].format(EXPORT_TIME_FORMAT).to_string(),
                table.pressure[i].to_string(),
                table.temperature[i].to_string(),
                table.acc_x[i].to_string(),
                table.acc_y[i].to_string(),
                table.acc_z[i].to_string(),
                odba,
            ])
            .map_err(csv_err(path))?;
    }

    writer.flush().map_err(|e| WriteError::WriteFile {
        path: path.display().to_string(),
        source: e,
    })?;

    Ok(())
}

/// Write the per-date sunrise/sunset table.
pub fn write_intervals_csv(
    path: &Path,
    intervals: &BTreeMap<NaiveDate, DayNightInterval>,
) -> Result<()> {
    ensure_parent_dirs(path)?;

    let mut writer = csv::Writer::from_path(path).map_err(csv_err(path))?;
    writer
        .write_record(["date", "sunrise", "sunset"])
        .map_err(csv_err(path))?;

    for (date, interval) in intervals {
        writer
            .write_record([
                date.format("%Y-%m-%d").to_string(),
                interval.sunrise.format(EXPORT_TIME_FORMAT).to_string(),
                interval.sunset.format(EXPORT_TIME_FORMAT).to_string(),
            ])
            .map_err(csv_err(path))?;
    }

    writer.flush().map_err(|e| WriteError::WriteFile {
        path: path.display().to_string(),
        source: e,
    })?;

    Ok(())
}
