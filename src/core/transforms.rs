//! Numeric helpers shared by the processors and renderers.
//!
//! Everything here ignores non-finite values, which is how missing cells and
//! undefined ODBA entries flow through the pipeline.

use chrono::{Duration, NaiveDateTime};

/// Linear-interpolated percentile of the finite values in `values`.
///
/// Uses the closest-ranks interpolation (rank = p/100 * (n - 1)), which is
/// the numpy default. Returns `None` if no finite values are present.
///
/// # Arguments
///
/// * `values` - Input values, in any order
/// * `p` - Percentile in 0..=100 (clamped)
pub fn percentile(values: &[f64], p: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(|a, b| a.total_cmp(b));
    Some(percentile_of_sorted(&sorted, p))
}

fn percentile_of_sorted(sorted: &[f64], p: f64) -> f64 {
    let p = p.clamp(0.0, 100.0);
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Lower and upper percentile bounds in one sort.
///
/// Used for colour normalization so a handful of bursts do not wash out the
/// rest of the scale.
pub fn percentile_bounds(values: &[f64], low: f64, high: f64) -> Option<(f64, f64)> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(|a, b| a.total_cmp(b));
    Some((
        percentile_of_sorted(&sorted, low),
        percentile_of_sorted(&sorted, high),
    ))
}

/// Minimum and maximum of the finite values.
pub fn finite_range(values: &[f64]) -> Option<(f64, f64)> {
    values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Flatten optional values, mapping `None` to NaN.
pub fn flatten_optional(values: &[Option<f64>]) -> Vec<f64> {
    values.iter().map(|v| v.unwrap_or(f64::NAN)).collect()
}

/// Floor a timestamp to a multiple of `bin_seconds` since the epoch.
pub fn floor_to_bin(t: NaiveDateTime, bin_seconds: i64) -> NaiveDateTime {
    let secs = t.and_utc().timestamp();
    let floored = secs - secs.rem_euclid(bin_seconds);
    t - Duration::seconds(secs - floored)
}

/// Hours elapsed from `origin` to `t`.
#[inline]
pub fn hours_since(origin: NaiveDateTime, t: NaiveDateTime) -> f64 {
    (t - origin).num_seconds() as f64 / 3600.0
}

/// Inverse of [`hours_since`], rounded to the second.
#[inline]
pub fn from_hours(origin: NaiveDateTime, hours: f64) -> NaiveDateTime {
    origin + Duration::seconds((hours * 3600.0).round() as i64)
}
