//! Biologging report pipeline for a tagged shark.
//!
//! This crate provides tools for:
//! - Loading tag CSV exports and dropping rows with bad timestamps or sensor values
//! - Deriving ODBA (Overall Dynamic Body Acceleration) from tri-axial acceleration
//! - Computing local sunrise/sunset for each deployment date
//! - Rendering depth, temperature and ODBA charts over day/night bands
//!
//! # Example
//!
//! ```no_run
//! use shark_biologging::{processors::pipeline::analyze, visualization::render_all, PipelineConfig};
//! use std::path::Path;
//!
//! let config = PipelineConfig::default();
//! let analysis = analyze("tag_export.csv", &config).unwrap();
//! render_all(Path::new("report"), &analysis, &config.plot).unwrap();
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod processors;
pub mod visualization;

pub use config::{ObserverConfig, PipelineConfig, PlotConfig, ProcessingConfig, TagConfig};
pub use crate::core::loaders::{Sample, SampleTable};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
