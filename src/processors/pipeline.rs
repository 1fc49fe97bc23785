//! End-to-end analysis of one tag export.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use log::info;

use super::cleaning::{load_tag_csv, CleaningReport};
use super::daynight::{build_interval_table, DayNightInterval};
use super::odba::attach_odba;
use super::resampling::{moving_average, resample_mean, BinnedSeries};
use crate::config::PipelineConfig;
use crate::core::loaders::SampleTable;

/// Everything the renderers and exports consume.
#[derive(Debug, Clone)]
pub struct Analysis {
    /// Cleaned samples with the ODBA column attached
    pub table: SampleTable,
    pub report: CleaningReport,
    pub intervals: BTreeMap<NaiveDate, DayNightInterval>,
    /// ODBA averaged into fixed bins
    pub odba_binned: BinnedSeries,
    /// Moving average of `odba_binned`, aligned with its bins
    pub odba_smoothed: Vec<Option<f64>>,
}

impl Analysis {
    /// ODBA column; empty if never attached.
    pub fn odba(&self) -> &[Option<f64>] {
        self.table.odba.as_deref().unwrap_or(&[])
    }
}

/// Load, clean, derive ODBA, resample it, and build the day/night table.
///
/// # Errors
///
/// Fails on an unreadable export, an invalid config, or an export with no
/// valid rows left after cleaning.
pub fn analyze<P: AsRef<Path>>(path: P, config: &PipelineConfig) -> Result<Analysis> {
    let path = path.as_ref();
    config.validate().context("Invalid configuration")?;

    let (mut table, report) = load_tag_csv(path, &config.tag)
        .with_context(|| format!("Failed to load tag export {}", path.display()))?;

    if table.is_empty() {
        anyhow::bail!(
            "No valid samples in {} ({} rows read, all dropped)",
            path.display(),
            report.rows_read
        );
    }

    attach_odba(&mut table, config.processing.odba_window)?;

    let odba_binned = resample_mean(
        &table.timestamps,
        table.odba.as_deref().unwrap_or(&[]),
        config.processing.resample_seconds,
    );
    let odba_smoothed = moving_average(&odba_binned.values, config.processing.smoothing_window);
    info!("Resampled ODBA into {} bins", odba_binned.len());

    let intervals = build_interval_table(table.dates(), &config.observer)?;
    info!("Computed day/night intervals for {} dates", intervals.len());

    Ok(Analysis {
        table,
        report,
        intervals,
        odba_binned,
        odba_smoothed,
    })
}
