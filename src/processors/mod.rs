//! Data processing modules.

pub mod cleaning;
pub mod daynight;
pub mod odba;
pub mod pipeline;
pub mod resampling;

// Re-export key types for convenience
pub use cleaning::{clean_records, load_tag_csv, validate_record, CleaningReport, DropReason};
pub use daynight::{
    build_interval_table, shading_spans, sun_times, DayNightError, DayNightInterval, ShadeKind,
    ShadeSpan,
};
pub use odba::{attach_odba, compute_odba, dynamic_component, rolling_mean, OdbaError};
pub use pipeline::{analyze, Analysis};
pub use resampling::{moving_average, resample_mean, BinnedSeries};
