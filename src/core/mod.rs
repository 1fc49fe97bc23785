//! Core data types and I/O operations.

pub mod loaders;
pub mod transforms;
pub mod writers;

pub use loaders::{Axis, RawRecord, Sample, SampleTable};
pub use writers::{write_intervals_csv, write_samples_csv, WriteError};
