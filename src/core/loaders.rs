//! Data loaders for biologging tag CSV exports.
//!
//! Tag exports start with a block of metadata lines (serial number, sampling
//! rate, deployment notes) followed by a header row and one row per sample.
//! This module reads the raw rows; validation happens in
//! [`crate::processors::cleaning`].

use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use csv::ReaderBuilder;
use thiserror::Error;

use crate::config::TagConfig;

/// Errors that can occur during file loading.
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Empty file: {0}")]
    EmptyFile(PathBuf),

    #[error("Missing required columns: {0}")]
    MissingColumns(String),
}

/// Result type for loader operations.
pub type Result<T> = std::result::Result<T, LoaderError>;

/// Acceleration axis of the tag's accelerometer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn label(&self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        }
    }
}

/// One row of the export before validation.
///
/// Numeric cells that are empty or unparsable are `None`. Acceleration cells
/// fall back to NaN so they surface later as a missing ODBA value.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub timestamp: String,
    pub pressure: Option<f64>,
    pub temperature: Option<f64>,
    pub acc: [f64; 3],
}

/// A validated sensor reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub timestamp: NaiveDateTime,
    /// Proxy for depth (dbar)
    pub pressure: f64,
    pub temperature: f64,
    pub acc: [f64; 3],
}

/// Column-oriented table of cleaned samples.
#[derive(Debug, Clone, Default)]
pub struct SampleTable {
    pub timestamps: Vec<NaiveDateTime>,
    pub pressure: Vec<f64>,
    pub temperature: Vec<f64>,
    pub acc_x: Vec<f64>,
    pub acc_y: Vec<f64>,
    pub acc_z: Vec<f64>,
    /// Derived column, absent until ODBA has been attached.
    pub odba: Option<Vec<Option<f64>>>,
}

impl SampleTable {
    /// Creates a new empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new table with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            timestamps: Vec::with_capacity(capacity),
            pressure: Vec::with_capacity(capacity),
            temperature: Vec::with_capacity(capacity),
            acc_x: Vec::with_capacity(capacity),
            acc_y: Vec::with_capacity(capacity),
            acc_z: Vec::with_capacity(capacity),
            odba: None,
        }
    }

    /// Builds a table from samples in the given order.
    pub fn from_samples<I: IntoIterator<Item = Sample>>(samples: I) -> Self {
        let mut table = Self::new();
        for sample in samples {
            table.push(sample);
        }
        table
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Appends a sample. Invalidates any attached ODBA column.
    pub fn push(&mut self, sample: Sample) {
        self.timestamps.push(sample.timestamp);
        self.pressure.push(sample.pressure);
        self.temperature.push(sample.temperature);
        self.acc_x.push(sample.acc[0]);
        self.acc_y.push(sample.acc[1]);
        self.acc_z.push(sample.acc[2]);
        self.odba = None;
    }

    /// Returns the sample at `index`, if any.
    pub fn get(&self, index: usize) -> Option<Sample> {
        if index >= self.len() {
            return None;
        }
        Some(Sample {
            timestamp: self.timestamps[index],
            pressure: self.pressure[index],
            temperature: self.temperature[index],
            acc: [self.acc_x[index], self.acc_y[index], self.acc_z[index]],
        })
    }

    /// Acceleration column for one axis.
    pub fn axis(&self, axis: Axis) -> &[f64] {
        match axis {
            Axis::X => &self.acc_x,
            Axis::Y => &self.acc_y,
            Axis::Z => &self.acc_z,
        }
    }

    /// Unique calendar dates in ascending order.
    pub fn dates(&self) -> BTreeSet<NaiveDate> {
        self.timestamps.iter().map(|t| t.date()).collect()
    }

    /// First and last timestamp, assuming chronological order.
    pub fn time_span(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        Some((*self.timestamps.first()?, *self.timestamps.last()?))
    }

    /// True if timestamps never decrease.
    pub fn is_chronological(&self) -> bool {
        self.timestamps.windows(2).all(|w| w[0] <= w[1])
    }

    /// Stable sort of every column by timestamp.
    pub fn sort_by_timestamp(&mut self) {
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.sort_by_key(|&i| self.timestamps[i]);

        let reorder = |col: &Vec<f64>| -> Vec<f64> { order.iter().map(|&i| col[i]).collect() };

        self.pressure = reorder(&self.pressure);
        self.temperature = reorder(&self.temperature);
        self.acc_x = reorder(&self.acc_x);
        self.acc_y = reorder(&self.acc_y);
        self.acc_z = reorder(&self.acc_z);
        self.timestamps = order.iter().map(|&i| self.timestamps[i]).collect();
        self.odba = self
            .odba
            .take()
            .map(|col| order.iter().map(|&i| col[i]).collect());
    }
}

/// Parse a numeric cell. Empty or unparsable cells are `None`; `NaN` and
/// `inf` spellings parse to their float values.
fn parse_cell(cell: Option<&str>) -> Option<f64> {
    let trimmed = cell?.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse().ok()
}

/// Read the raw rows of a tag export.
///
/// Skips `config.skip_rows` metadata lines, then expects a header row naming
/// the timestamp, pressure, temperature and acceleration columns
/// (case-insensitive).
///
/// # Errors
///
/// Returns an error if the file cannot be read, a required column is missing,
/// or no data rows follow the header.
pub fn read_raw_records<P: AsRef<Path>>(path: P, config: &TagConfig) -> Result<Vec<RawRecord>> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    // Metadata block
    let mut discard = String::new();
    for _ in 0..config.skip_rows {
        discard.clear();
        if reader.read_line(&mut discard)? == 0 {
            return Err(LoaderError::EmptyFile(path.to_path_buf()));
        }
    }

    let mut csv_reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let col_map: HashMap<String, usize> = headers
        .iter()
        .enumerate()
        .map(|(i, name)| (name.trim().to_lowercase(), i))
        .collect();

    let mut missing = Vec::new();
    let mut column = |name: &str| -> usize {
        match col_map.get(&name.trim().to_lowercase()) {
            Some(&idx) => idx,
            None => {
                missing.push(name.to_string());
                usize::MAX
            }
        }
    };

    let ts_idx = column(&config.timestamp_column);
    let p_idx = column(&config.pressure_column);
    let t_idx = column(&config.temperature_column);
    let acc_idx = [
        column(&config.acceleration_columns[0]),
        column(&config.acceleration_columns[1]),
        column(&config.acceleration_columns[2]),
    ];

    if !missing.is_empty() {
        return Err(LoaderError::MissingColumns(missing.join(", ")));
    }

    // Pre-allocate (tags commonly log at 1 Hz for several days)
    let mut records = Vec::with_capacity(100_000);

    for result in csv_reader.records() {
        let record = result?;

        let acc = acc_idx.map(|idx| parse_cell(record.get(idx)).unwrap_or(f64::NAN));

        records.push(RawRecord {
            timestamp: record.get(ts_idx).unwrap_or("").trim().to_string(),
            pressure: parse_cell(record.get(p_idx)),
            temperature: parse_cell(record.get(t_idx)),
            acc,
        });
    }

    if records.is_empty() {
        return Err(LoaderError::EmptyFile(path.to_path_buf()));
    }

    Ok(records)
}
