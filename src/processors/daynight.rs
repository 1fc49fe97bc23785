//! Sunrise/sunset table and day/night shading spans.
//!
//! Sun times follow the NOAA sunrise equation: solar mean anomaly, equation
//! of the centre, ecliptic longitude, solar transit and the hour angle at
//! which the sun's upper limb touches the horizon (-0.833 degrees, which
//! folds in atmospheric refraction). Accuracy is about a minute, well within
//! what shading needs.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use log::warn;
use rayon::prelude::*;
use thiserror::Error;

use crate::config::{ConfigError, ObserverConfig};

/// Julian date of 2000-01-01 12:00 UTC.
const J2000: f64 = 2_451_545.0;

/// Julian date of the Unix epoch.
const UNIX_EPOCH_JD: f64 = 2_440_587.5;

/// Sun altitude at sunrise/sunset in degrees.
const HORIZON_ALTITUDE_DEG: f64 = -0.833;

/// Axial tilt of the Earth in degrees.
const OBLIQUITY_DEG: f64 = 23.4397;

/// Errors that can occur while computing sun times.
#[derive(Debug, Error, PartialEq)]
pub enum DayNightError {
    #[error("Sun does not rise or set on {0} at this latitude")]
    NoSunriseOrSunset(NaiveDate),

    #[error("Time out of range on {0}")]
    OutOfRange(NaiveDate),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for day/night operations.
pub type Result<T> = std::result::Result<T, DayNightError>;

/// Sunrise and sunset for one calendar date, in naive local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayNightInterval {
    pub date: NaiveDate,
    pub sunrise: NaiveDateTime,
    pub sunset: NaiveDateTime,
}

impl DayNightInterval {
    /// Length of daylight.
    pub fn day_length(&self) -> chrono::Duration {
        self.sunset - self.sunrise
    }
}

/// Kind of background band drawn behind the charts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadeKind {
    Day,
    Night,
}

/// One background band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShadeSpan {
    pub kind: ShadeKind,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

/// Sunrise and sunset as Julian dates (UTC).
///
/// `longitude` is east-positive; `date` is the observer's civil date.
fn sun_events_jd(date: NaiveDate, latitude: f64, longitude: f64) -> Result<(f64, f64)> {
    let epoch = NaiveDate::from_ymd_opt(2000, 1, 1).ok_or(DayNightError::OutOfRange(date))?;
    let days = (date - epoch).num_days() as f64;

    // Mean solar time at the observer's meridian
    let j_star = days - longitude / 360.0;

    let m = (357.5291 + 0.985_600_28 * j_star).rem_euclid(360.0);
    let m_rad = m.to_radians();

    let c = 1.9148 * m_rad.sin() + 0.0200 * (2.0 * m_rad).sin() + 0.0003 * (3.0 * m_rad).sin();

    // 102.9372 is the argument of perihelion
    let lambda = (m + c + 180.0 + 102.9372).rem_euclid(360.0);
    let lambda_rad = lambda.to_radians();

    let transit = J2000 + j_star + 0.0053 * m_rad.sin() - 0.0069 * (2.0 * lambda_rad).sin();

    let sin_dec = lambda_rad.sin() * OBLIQUITY_DEG.to_radians().sin();
    let cos_dec = sin_dec.asin().cos();

    let lat_rad = latitude.to_radians();
    let cos_hour_angle = (HORIZON_ALTITUDE_DEG.to_radians().sin() - lat_rad.sin() * sin_dec)
        / (lat_rad.cos() * cos_dec);

    if !(-1.0..=1.0).contains(&cos_hour_angle) {
        return Err(DayNightError::NoSunriseOrSunset(date));
    }

    let hour_angle = cos_hour_angle.acos().to_degrees();

    Ok((transit - hour_angle / 360.0, transit + hour_angle / 360.0))
}

fn jd_to_local(jd: f64, tz: &Tz, date: NaiveDate) -> Result<NaiveDateTime> {
    let millis = ((jd - UNIX_EPOCH_JD) * 86_400_000.0).round() as i64;
    let utc = DateTime::from_timestamp_millis(millis).ok_or(DayNightError::OutOfRange(date))?;
    Ok(tz.from_utc_datetime(&utc.naive_utc()).naive_local())
}

/// Sunrise and sunset for `date` at the configured observer.
///
/// Instants are converted to the observer's time zone and stripped of the
/// zone annotation so they compare directly with tag timestamps.
///
/// # Errors
///
/// Returns [`DayNightError::NoSunriseOrSunset`] during polar day or night, or
/// a config error for an unknown time zone.
pub fn sun_times(date: NaiveDate, observer: &ObserverConfig) -> Result<DayNightInterval> {
    let tz = observer.validate()?;
    sun_times_in(date, observer.latitude, observer.longitude, &tz)
}

fn sun_times_in(date: NaiveDate, latitude: f64, longitude: f64, tz: &Tz) -> Result<DayNightInterval> {
    let (rise_jd, set_jd) = sun_events_jd(date, latitude, longitude)?;
    Ok(DayNightInterval {
        date,
        sunrise: jd_to_local(rise_jd, tz, date)?,
        sunset: jd_to_local(set_jd, tz, date)?,
    })
}

/// One interval per date. Dates without a sunrise or sunset are logged and
/// left out.
///
/// # Errors
///
/// Fails on an unknown time zone or out-of-range coordinates.
pub fn build_interval_table<I>(
    dates: I,
    observer: &ObserverConfig,
) -> Result<BTreeMap<NaiveDate, DayNightInterval>>
where
    I: IntoIterator<Item = NaiveDate>,
{
    let tz = observer.validate()?;
    let dates: Vec<NaiveDate> = dates.into_iter().collect();

    let computed: Vec<(NaiveDate, Result<DayNightInterval>)> = dates
        .par_iter()
        .map(|&date| {
            (
                date,
                sun_times_in(date, observer.latitude, observer.longitude, &tz),
            )
        })
        .collect();

    let mut table = BTreeMap::new();
    for (date, result) in computed {
        match result {
            Ok(interval) => {
                table.insert(date, interval);
            }
            Err(e) => warn!("Skipping day/night interval: {}", e),
        }
    }

    Ok(table)
}

/// Background bands for the charts.
///
/// Each date contributes a day band from sunrise to sunset. A night band runs
/// from each date's sunset to the following entry's sunrise; the last date
/// has no following sunrise and gets no night band.
pub fn shading_spans(intervals: &BTreeMap<NaiveDate, DayNightInterval>) -> Vec<ShadeSpan> {
    let ordered: Vec<&DayNightInterval> = intervals.values().collect();
    let mut spans = Vec::with_capacity(ordered.len() * 2);

    for (i, interval) in ordered.iter().enumerate() {
        spans.push(ShadeSpan {
            kind: ShadeKind::Day,
            start: interval.sunrise,
            end: interval.sunset,
        });

        if let Some(next) = ordered.get(i + 1) {
            spans.push(ShadeSpan {
                kind: ShadeKind::Night,
                start: interval.sunset,
                end: next.sunrise,
            });
        }
    }

    spans
}
