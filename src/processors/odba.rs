//! Overall Dynamic Body Acceleration.
//!
//! Each axis is split into a static component (trailing simple moving
//! average) and a dynamic component (raw minus static). ODBA is the sum of
//! the absolute dynamic components across the three axes.

use rayon::prelude::*;
use thiserror::Error;

use crate::core::loaders::{Axis, SampleTable};

/// Errors that can occur while deriving ODBA.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OdbaError {
    #[error("Rolling window must contain at least one sample")]
    InvalidWindow,
}

/// Result type for ODBA operations.
pub type Result<T> = std::result::Result<T, OdbaError>;

/// Trailing simple moving average.
///
/// Entry `i` is the mean of `values[i + 1 - window..=i]`. The first
/// `window - 1` entries, and any window containing a non-finite value, are
/// `None`.
pub fn rolling_mean(values: &[f64], window: usize) -> Result<Vec<Option<f64>>> {
    if window == 0 {
        return Err(OdbaError::InvalidWindow);
    }

    let mut out = vec![None; values.len()];
    if values.len() < window {
        return Ok(out);
    }

    for (i, slot) in out.iter_mut().enumerate().skip(window - 1) {
        let win = &values[i + 1 - window..=i];
        if win.iter().all(|v| v.is_finite()) {
            *slot = Some(win.iter().sum::<f64>() / window as f64);
        }
    }

    Ok(out)
}

/// Raw value minus its trailing moving average.
pub fn dynamic_component(values: &[f64], window: usize) -> Result<Vec<Option<f64>>> {
    let smoothed = rolling_mean(values, window)?;
    Ok(values
        .iter()
        .zip(smoothed)
        .map(|(&raw, mean)| mean.map(|m| raw - m))
        .collect())
}

/// ODBA for every row of `table`.
///
/// Axes are processed in parallel; the result is identical to a sequential
/// pass. Rows where any axis has no dynamic component are `None`.
pub fn compute_odba(table: &SampleTable, window: usize) -> Result<Vec<Option<f64>>> {
    let per_axis: Vec<Vec<Option<f64>>> = Axis::ALL
        .par_iter()
        .map(|&axis| dynamic_component(table.axis(axis), window))
        .collect::<Result<_>>()?;

    Ok((0..table.len())
        .map(|i| {
            per_axis
                .iter()
                .map(|axis| axis[i].map(f64::abs))
                .sum::<Option<f64>>()
        })
        .collect())
}

/// Compute ODBA and store it as the table's derived column.
pub fn attach_odba(table: &mut SampleTable, window: usize) -> Result<()> {
    let odba = compute_odba(table, window)?;
    table.odba = Some(odba);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::loaders::Sample;
    use chrono::{Duration, NaiveDate};

    fn table_from_acc(acc: &[[f64; 3]]) -> SampleTable {
        let t0 = NaiveDate::from_ymd_opt(2023, 3, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        SampleTable::from_samples(acc.iter().enumerate().map(|(i, &a)| Sample {
            timestamp: t0 + Duration::seconds(i as i64),
            pressure: 10.0,
            temperature: 24.0,
            acc: a,
        }))
    }

    #[test]
    fn test_rolling_mean_warm_up() {
        let means = rolling_mean(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 3).unwrap();
        assert_eq!(means, vec![None, None, Some(2.0), Some(3.0), Some(4.0), Some(5.0)]);
    }

    #[test]
    fn test_rolling_mean_short_series() {
        assert_eq!(rolling_mean(&[1.0, 2.0], 5).unwrap(), vec![None, None]);
        assert_eq!(rolling_mean(&[], 5).unwrap(), Vec::<Option<f64>>::new());
    }

    #[test]
    fn test_rolling_mean_window_one() {
        assert_eq!(rolling_mean(&[1.5, 2.5], 1).unwrap(), vec![Some(1.5), Some(2.5)]);
    }

    #[test]
    fn test_rolling_mean_nan_poisons_window() {
        let means = rolling_mean(&[1.0, f64::NAN, 3.0, 4.0, 5.0], 2).unwrap();
        assert_eq!(means, vec![None, None, None, Some(3.5), Some(4.5)]);
    }

    #[test]
    fn test_zero_window_rejected() {
        assert_eq!(rolling_mean(&[1.0], 0), Err(OdbaError::InvalidWindow));
        assert_eq!(
            compute_odba(&table_from_acc(&[[0.0; 3]]), 0),
            Err(OdbaError::InvalidWindow)
        );
    }

    #[test]
    fn test_constant_signal_has_zero_odba() {
        let table = table_from_acc(&[[0.12, -0.98, 0.05]; 12]);
        let odba = compute_odba(&table, 5).unwrap();

        assert_eq!(odba.len(), 12);
        assert!(odba[..4].iter().all(|v| v.is_none()));
        for v in &odba[4..] {
            assert!(v.unwrap().abs() < 1e-12);
        }
    }

    #[test]
    fn test_odba_sums_absolute_dynamic_components() {
        // Window 2: dynamic = (a[i] - a[i-1]) / 2 per axis
        let table = table_from_acc(&[[0.0, 0.0, 0.0], [1.0, -2.0, 4.0], [1.0, -2.0, 2.0]]);
        let odba = compute_odba(&table, 2).unwrap();

        assert_eq!(odba[0], None);
        assert!((odba[1].unwrap() - (0.5 + 1.0 + 2.0)).abs() < 1e-12);
        assert!((odba[2].unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_missing_axis_value_gives_no_odba() {
        let table = table_from_acc(&[[0.0, 0.0, 0.0], [0.0, f64::NAN, 0.0], [0.0, 0.0, 0.0], [0.0; 3]]);
        let odba = compute_odba(&table, 2).unwrap();
        assert_eq!(odba[1], None);
        assert_eq!(odba[2], None);
        assert_eq!(odba[3], Some(0.0));
    }

    #[test]
    fn test_attach_odba() {
        let mut table = table_from_acc(&[[0.0; 3]; 6]);
        attach_odba(&mut table, 5).unwrap();
        let col = table.odba.as_ref().unwrap();
        assert_eq!(col.len(), 6);
        assert_eq!(col[3], None);
        assert_eq!(col[4], Some(0.0));
    }
}
