//! Fixed-width time binning for the ODBA overview chart.

use chrono::{Duration, NaiveDateTime};

use crate::core::transforms::floor_to_bin;

/// Value series on a regular time grid.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BinnedSeries {
    /// Start of each bin
    pub times: Vec<NaiveDateTime>,
    /// Mean of the finite samples in the bin; `None` for empty bins
    pub values: Vec<Option<f64>>,
}

impl BinnedSeries {
    #[inline]
    pub fn len(&self) -> usize {
        self.times.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Bins that hold a value.
    pub fn points(&self) -> impl Iterator<Item = (NaiveDateTime, f64)> + '_ {
        self.times
            .iter()
            .zip(&self.values)
            .filter_map(|(&t, v)| v.map(|v| (t, v)))
    }
}

/// Mean of `values` in contiguous bins of `bin_seconds`.
///
/// Bins run from the floor of the first timestamp to the bin holding the
/// last one. Bins with no finite sample are kept as `None` so gaps stay
/// visible to the moving average. Timestamps must be chronological.
pub fn resample_mean(
    timestamps: &[NaiveDateTime],
    values: &[Option<f64>],
    bin_seconds: i64,
) -> BinnedSeries {
    debug_assert_eq!(timestamps.len(), values.len());

    let (first, last) = match (timestamps.first(), timestamps.last()) {
        (Some(&first), Some(&last)) if bin_seconds > 0 => (first, last),
        _ => return BinnedSeries::default(),
    };

    let start = floor_to_bin(first, bin_seconds);
    let num_bins = ((last - start).num_seconds() / bin_seconds + 1) as usize;

    let mut sums = vec![0.0f64; num_bins];
    let mut counts = vec![0usize; num_bins];

    for (t, v) in timestamps.iter().zip(values) {
        let Some(v) = v.filter(|v| v.is_finite()) else {
            continue;
        };
        let bin = ((*t - start).num_seconds() / bin_seconds) as usize;
        if bin < num_bins {
            sums[bin] += v;
            counts[bin] += 1;
        }
    }

    let times = (0..num_bins)
        .map(|i| start + Duration::seconds(i as i64 * bin_seconds))
        .collect();
    let values = sums
        .iter()
        .zip(&counts)
        .map(|(&s, &n)| if n > 0 { Some(s / n as f64) } else { None })
        .collect();

    BinnedSeries { times, values }
}

/// Trailing moving average over an optional series.
///
/// Entry `i` needs `window` defined values ending at `i`; otherwise `None`.
pub fn moving_average(series: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; series.len()];
    }

    (0..series.len())
        .map(|i| {
            if i + 1 < window {
                return None;
            }
            series[i + 1 - window..=i]
                .iter()
                .copied()
                .sum::<Option<f64>>()
                .map(|s| s / window as f64)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn test_resample_mean_per_minute() {
        let times = vec![
            ts("2023-03-01 10:00:10"),
            ts("2023-03-01 10:00:40"),
            ts("2023-03-01 10:01:05"),
            ts("2023-03-01 10:03:00"),
        ];
        let values = vec![Some(1.0), Some(3.0), None, Some(5.0)];

        let binned = resample_mean(&times, &values, 60);

        assert_eq!(binned.len(), 4);
        assert_eq!(binned.times[0], ts("2023-03-01 10:00:00"));
        assert_eq!(binned.times[3], ts("2023-03-01 10:03:00"));
        assert_eq!(binned.values, vec![Some(2.0), None, None, Some(5.0)]);
        assert_eq!(binned.points().count(), 2);
    }

    #[test]
    fn test_resample_empty() {
        assert!(resample_mean(&[], &[], 60).is_empty());
        assert!(resample_mean(&[ts("2023-03-01 10:00:00")], &[Some(1.0)], 0).is_empty());
    }

    #[test]
    fn test_moving_average() {
        let series = vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0), Some(5.0), Some(6.0)];
        let ma = moving_average(&series, 5);
        assert_eq!(ma, vec![None, None, None, None, Some(3.0), Some(4.0)]);
    }

    #[test]
    fn test_moving_average_gap() {
        let series = vec![Some(1.0), None, Some(3.0), Some(5.0)];
        let ma = moving_average(&series, 2);
        assert_eq!(ma, vec![None, None, None, Some(4.0)]);
        assert_eq!(moving_average(&series, 0), vec![None; 4]);
    }
}
