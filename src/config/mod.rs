//! Configuration types for the biologging report pipeline.

use serde::{Deserialize, Serialize};
use std::path::Path;

use chrono_tz::Tz;
use thiserror::Error;

/// Errors raised by [`PipelineConfig::validate`].
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Unknown time zone: {0}")]
    UnknownTimezone(String),

    #[error("Window size for {0} must be at least 1")]
    ZeroWindow(&'static str),

    #[error("Invalid percentile bounds: low={low}, high={high}")]
    InvalidPercentiles { low: f64, high: f64 },

    #[error("Invalid observer coordinates: lat={lat}, lon={lon}")]
    InvalidCoordinates { lat: f64, lon: f64 },
}

/// Layout of the tag export CSV.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagConfig {
    /// Metadata lines preceding the header row
    #[serde(default = "default_skip_rows")]
    pub skip_rows: usize,

    /// chrono format string for the timestamp column
    #[serde(default = "default_timestamp_format")]
    pub timestamp_format: String,

    #[serde(default = "default_timestamp_column")]
    pub timestamp_column: String,

    #[serde(default = "default_pressure_column")]
    pub pressure_column: String,

    #[serde(default = "default_temperature_column")]
    pub temperature_column: String,

    /// Acceleration column names in x, y, z order
    #[serde(default = "default_acceleration_columns")]
    pub acceleration_columns: [String; 3],
}

fn default_skip_rows() -> usize {
    3
}

fn default_timestamp_format() -> String {
    "%d/%m/%y %H:%M".to_string()
}

fn default_timestamp_column() -> String {
    "Date Time".to_string()
}

fn default_pressure_column() -> String {
    "Pressure".to_string()
}

fn default_temperature_column() -> String {
    "Temperature".to_string()
}

fn default_acceleration_columns() -> [String; 3] {
    [
        "Acc X".to_string(),
        "Acc Y".to_string(),
        "Acc Z".to_string(),
    ]
}

impl Default for TagConfig {
    fn default() -> Self {
        Self {
            skip_rows: default_skip_rows(),
            timestamp_format: default_timestamp_format(),
            timestamp_column: default_timestamp_column(),
            pressure_column: default_pressure_column(),
            temperature_column: default_temperature_column(),
            acceleration_columns: default_acceleration_columns(),
        }
    }
}

/// Configuration for derived signals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Trailing window (samples) used to remove static acceleration
    #[serde(default = "default_odba_window")]
    pub odba_window: usize,

    /// Bin width for the resampled ODBA series
    #[serde(default = "default_resample_seconds")]
    pub resample_seconds: i64,

    /// Moving average window (bins) drawn over the resampled ODBA
    #[serde(default = "default_smoothing_window")]
    pub smoothing_window: usize,
}

fn default_odba_window() -> usize {
    5
}

fn default_resample_seconds() -> i64 {
    60
}

fn default_smoothing_window() -> usize {
    5
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            odba_window: default_odba_window(),
            resample_seconds: default_resample_seconds(),
            smoothing_window: default_smoothing_window(),
        }
    }
}

/// Tagging site used for sunrise/sunset computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObserverConfig {
    /// Degrees, north positive
    #[serde(default = "default_latitude")]
    pub latitude: f64,

    /// Degrees, east positive
    #[serde(default = "default_longitude")]
    pub longitude: f64,

    /// IANA zone name the tag clock was set to
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_latitude() -> f64 {
    25.7326
}

fn default_longitude() -> f64 {
    -79.2760
}

fn default_timezone() -> String {
    "America/Nassau".to_string()
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            latitude: default_latitude(),
            longitude: default_longitude(),
            timezone: default_timezone(),
        }
    }
}

impl ObserverConfig {
    /// Parse the configured zone name.
    pub fn tz(&self) -> Result<Tz, ConfigError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| ConfigError::UnknownTimezone(self.timezone.clone()))
    }

    /// Check coordinates and zone, returning the parsed zone.
    pub fn validate(&self) -> Result<Tz, ConfigError> {
        let tz = self.tz()?;
        let (lat, lon) = (self.latitude, self.longitude);
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(ConfigError::InvalidCoordinates { lat, lon });
        }
        Ok(tz)
    }
}

/// Chart output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlotConfig {
    #[serde(default = "default_width")]
    pub width: u32,

    #[serde(default = "default_height")]
    pub height: u32,

    /// Lower percentile for ODBA colour clipping
    #[serde(default = "default_percentile_low")]
    pub percentile_low: f64,

    /// Upper percentile for ODBA colour clipping
    #[serde(default = "default_percentile_high")]
    pub percentile_high: f64,

    /// Marker radius in pixels
    #[serde(default = "default_point_size")]
    pub point_size: u32,

    /// Marker opacity (0.0 to 1.0)
    #[serde(default = "default_alpha")]
    pub alpha: f64,

    /// Maximum markers per panel (stride-subsampled beyond this, 0 = all)
    #[serde(default = "default_plot_max_points")]
    pub max_points: usize,
}

fn default_width() -> u32 {
    1920
}

fn default_height() -> u32 {
    1080
}

fn default_percentile_low() -> f64 {
    2.0
}

fn default_percentile_high() -> f64 {
    98.0
}

fn default_point_size() -> u32 {
    2
}

fn default_alpha() -> f64 {
    0.8
}

fn default_plot_max_points() -> usize {
    200_000
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            percentile_low: default_percentile_low(),
            percentile_high: default_percentile_high(),
            point_size: default_point_size(),
            alpha: default_alpha(),
            max_points: default_plot_max_points(),
        }
    }
}

/// Main pipeline configuration combining all sub-configs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub tag: TagConfig,

    #[serde(default)]
    pub processing: ProcessingConfig,

    #[serde(default)]
    pub observer: ObserverConfig,

    #[serde(default)]
    pub plot: PlotConfig,
}

impl PipelineConfig {
    /// Load configuration from a YAML file.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: PipelineConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a YAML file.
    pub fn to_yaml<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check values that serde cannot reject on its own.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.observer.validate()?;

        if self.processing.odba_window == 0 {
            return Err(ConfigError::ZeroWindow("odba_window"));
        }
        if self.processing.smoothing_window == 0 {
            return Err(ConfigError::ZeroWindow("smoothing_window"));
        }
        if self.processing.resample_seconds <= 0 {
            return Err(ConfigError::ZeroWindow("resample_seconds"));
        }

        let (low, high) = (self.plot.percentile_low, self.plot.percentile_high);
        if !(0.0..=100.0).contains(&low) || !(0.0..=100.0).contains(&high) || low >= high {
            return Err(ConfigError::InvalidPercentiles { low, high });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_pipeline_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.tag.skip_rows, 3);
        assert_eq!(config.processing.odba_window, 5);
        assert_eq!(config.plot.percentile_low, 2.0);
        assert_eq!(config.plot.percentile_high, 98.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = "observer:\n  latitude: -33.9\n  longitude: 18.4\n  timezone: Africa/Johannesburg\n";
        let config: PipelineConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.observer.latitude, -33.9);
        assert_eq!(config.observer.timezone, "Africa/Johannesburg");
        assert_eq!(config.tag.timestamp_format, "%d/%m/%y %H:%M");
        assert_eq!(config.tag.acceleration_columns[2], "Acc Z");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_round_trip_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        let mut config = PipelineConfig::default();
        config.processing.odba_window = 7;
        config.to_yaml(&path).unwrap();

        let loaded = PipelineConfig::from_yaml(&path).unwrap();
        assert_eq!(loaded.processing.odba_window, 7);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = PipelineConfig::default();
        config.observer.timezone = "Mars/Olympus_Mons".to_string();
        assert_eq!(
            config.validate(),
            Err(ConfigError::UnknownTimezone("Mars/Olympus_Mons".to_string()))
        );

        let mut config = PipelineConfig::default();
        config.processing.odba_window = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroWindow("odba_window")));

        let mut config = PipelineConfig::default();
        config.observer.latitude = 120.0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidCoordinates { lat: 120.0, lon: -79.2760 })
        );

        let mut config = PipelineConfig::default();
        config.observer.longitude = 400.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidCoordinates { .. })
        ));

        let mut config = PipelineConfig::default();
        config.plot.percentile_low = 99.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidPercentiles { .. })
        ));
    }
}
