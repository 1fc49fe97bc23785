//! Row validation for tag exports.
//!
//! Bad rows are dropped and counted, never fatal. A row is first checked for
//! a parsable timestamp; only rows that pass are checked for pressure and
//! temperature, so each dropped row is counted exactly once.

use std::path::Path;

use chrono::NaiveDateTime;
use log::{debug, info, warn};

use crate::config::TagConfig;
use crate::core::loaders::{self, LoaderError, RawRecord, Sample, SampleTable};

/// Why a row was excluded from the cleaned table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    BadTimestamp,
    BadPressureTemperature,
}

/// Row counts from a cleaning pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleaningReport {
    pub rows_read: usize,
    pub dropped_bad_timestamp: usize,
    /// Missing and non-finite pressure or temperature are counted together.
    pub dropped_bad_pressure_temperature: usize,
    pub rows_remaining: usize,
    /// Set when the source was out of order and had to be sorted.
    pub sorted: bool,
}

impl CleaningReport {
    /// Total rows excluded.
    pub fn dropped(&self) -> usize {
        self.dropped_bad_timestamp + self.dropped_bad_pressure_temperature
    }

    fn record(&mut self, reason: DropReason) {
        match reason {
            DropReason::BadTimestamp => self.dropped_bad_timestamp += 1,
            DropReason::BadPressureTemperature => self.dropped_bad_pressure_temperature += 1,
        }
    }
}

fn is_usable(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

/// Validate one raw row.
///
/// # Errors
///
/// Returns the [`DropReason`] if the row must be excluded.
pub fn validate_record(record: &RawRecord, timestamp_format: &str) -> Result<Sample, DropReason> {
    let timestamp = NaiveDateTime::parse_from_str(&record.timestamp, timestamp_format)
        .map_err(|_| DropReason::BadTimestamp)?;

    let pressure = is_usable(record.pressure).ok_or(DropReason::BadPressureTemperature)?;
    let temperature = is_usable(record.temperature).ok_or(DropReason::BadPressureTemperature)?;

    Ok(Sample {
        timestamp,
        pressure,
        temperature,
        acc: record.acc,
    })
}

/// Filter raw rows into a chronologically ordered sample table.
///
/// Rolling-window computations downstream assume timestamp order, so an
/// out-of-order source is stable-sorted here.
pub fn clean_records(records: &[RawRecord], timestamp_format: &str) -> (SampleTable, CleaningReport) {
    let mut report = CleaningReport {
        rows_read: records.len(),
        ..Default::default()
    };
    let mut table = SampleTable::with_capacity(records.len());

    for (row, record) in records.iter().enumerate() {
        match validate_record(record, timestamp_format) {
            Ok(sample) => table.push(sample),
            Err(reason) => {
                debug!("Dropping row {} ({:?}): {:?}", row, reason, record.timestamp);
                report.record(reason);
            }
        }
    }

    if !table.is_chronological() {
        warn!("Samples are not in chronological order, sorting by timestamp");
        table.sort_by_timestamp();
        report.sorted = true;
    }

    report.rows_remaining = table.len();
    (table, report)
}

/// Load and clean a tag export in one step.
///
/// # Errors
///
/// Fails only for unreadable files, missing columns, or exports with no data
/// rows. Individual bad rows are dropped and counted in the report.
pub fn load_tag_csv<P: AsRef<Path>>(
    path: P,
    config: &TagConfig,
) -> Result<(SampleTable, CleaningReport), LoaderError> {
    let records = loaders::read_raw_records(path, config)?;
    let (table, report) = clean_records(&records, &config.timestamp_format);

    info!("Rows read: {}", report.rows_read);
    info!("Dropped (bad timestamp): {}", report.dropped_bad_timestamp);
    info!(
        "Dropped (bad pressure/temperature): {}",
        report.dropped_bad_pressure_temperature
    );
    info!("Rows remaining: {}", report.rows_remaining);

    Ok((table, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const FORMAT: &str = "%d/%m/%y %H:%M";

    fn raw(ts: &str, pressure: Option<f64>, temperature: Option<f64>) -> RawRecord {
        RawRecord {
            timestamp: ts.to_string(),
            pressure,
            temperature,
            acc: [0.0, -1.0, 0.0],
        }
    }

    #[test]
    fn test_validate_record() {
        let ok = validate_record(&raw("01/03/23 10:00", Some(5.0), Some(24.0)), FORMAT).unwrap();
        assert_eq!(ok.pressure, 5.0);
        assert_eq!(ok.timestamp.format("%Y-%m-%d %H:%M").to_string(), "2023-03-01 10:00");

        assert_eq!(
            validate_record(&raw("2023-03-01 10:00", Some(5.0), Some(24.0)), FORMAT),
            Err(DropReason::BadTimestamp)
        );
        assert_eq!(
            validate_record(&raw("31/02/23 10:00", Some(5.0), Some(24.0)), FORMAT),
            Err(DropReason::BadTimestamp)
        );
        assert_eq!(
            validate_record(&raw("01/03/23 10:00", None, Some(24.0)), FORMAT),
            Err(DropReason::BadPressureTemperature)
        );
        assert_eq!(
            validate_record(&raw("01/03/23 10:00", Some(5.0), Some(f64::INFINITY)), FORMAT),
            Err(DropReason::BadPressureTemperature)
        );
        assert_eq!(
            validate_record(&raw("01/03/23 10:00", Some(f64::NAN), Some(24.0)), FORMAT),
            Err(DropReason::BadPressureTemperature)
        );
    }

    #[test]
    fn test_bad_timestamp_takes_precedence() {
        assert_eq!(
            validate_record(&raw("garbage", None, None), FORMAT),
            Err(DropReason::BadTimestamp)
        );
    }

    #[test]
    fn test_counts_add_up() {
        let records = vec![
            raw("01/03/23 10:00", Some(5.0), Some(24.0)),
            raw("not a date", Some(5.0), Some(24.0)),
            raw("01/03/23 10:01", None, Some(24.0)),
            raw("01/03/23 10:02", Some(5.5), Some(f64::NEG_INFINITY)),
            raw("", None, None),
            raw("01/03/23 10:03", Some(6.0), Some(23.9)),
        ];

        let (table, report) = clean_records(&records, FORMAT);

        assert_eq!(report.rows_read, 6);
        assert_eq!(report.dropped_bad_timestamp, 2);
        assert_eq!(report.dropped_bad_pressure_temperature, 2);
        assert_eq!(report.rows_remaining, 2);
        assert_eq!(report.dropped() + report.rows_remaining, report.rows_read);
        assert_eq!(table.len(), 2);
        assert!(!report.sorted);
    }

    #[test]
    fn test_out_of_order_rows_are_sorted() {
        let records = vec![
            raw("01/03/23 10:02", Some(3.0), Some(24.0)),
            raw("01/03/23 10:00", Some(1.0), Some(24.0)),
            raw("01/03/23 10:01", Some(2.0), Some(24.0)),
        ];

        let (table, report) = clean_records(&records, FORMAT);

        assert!(report.sorted);
        assert!(table.is_chronological());
        assert_eq!(table.pressure, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_load_tag_csv() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "Tag ID: 4321\nSampling: 1 Hz\nDeployment: test").unwrap();
        writeln!(file, "Date Time,Pressure,Temperature,Acc X,Acc Y,Acc Z").unwrap();
        writeln!(file, "01/03/23 10:00,12.5,24.1,0.01,-0.98,0.05").unwrap();
        writeln!(file, "01/03/23 10:01,,24.0,0.02,-0.97,0.04").unwrap();
        writeln!(file, "2023-03-01 10:02,13.0,24.0,0.00,-0.99,0.04").unwrap();
        writeln!(file, "01/03/23 10:03,13.5,inf,0.00,-0.99,0.04").unwrap();
        writeln!(file, "01/03/23 10:04,14.0,23.8,0.03,-1.01,0.06").unwrap();
        file.flush().unwrap();

        let (table, report) = load_tag_csv(file.path(), &TagConfig::default()).unwrap();
        assert_eq!(report.rows_read, 5);
        assert_eq!(report.dropped_bad_timestamp, 1);
        assert_eq!(report.dropped_bad_pressure_temperature, 2);
        assert_eq!(report.rows_remaining, 2);
        assert_eq!(table.pressure, vec![12.5, 14.0]);
    }
}
