//! Sensor correction and bed-surface reconstruction for flume scour tests.
//!
//! This crate provides tools for:
//! - Loading raw logger exports, threshold tables, reach times and scour curves
//! - Cleaning, gap-filling and rebaselining instrument time series
//! - Aligning sparse scour-depth curves onto sensor time grids
//! - Gridding LiDAR point clouds into a bed surface (parallelized) and masking
//!   the structure footprint
//!
//! # Example
//!
//! ```no_run
//! use scour_tools::{Experiment, PipelineConfig};
//! use scour_tools::experiment::ProcessOptions;
//! use std::path::Path;
//!
//! let mut exp = Experiment::new(Path::new("SW-H2-A3"), PipelineConfig::default()).unwrap();
//! exp.load_raw(Path::new("SW-H2-A3/raw.txt"), None).unwrap();
//! exp.load_supporting().unwrap();
//! exp.process(&ProcessOptions::default()).unwrap();
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod experiment;
pub mod processors;
pub mod surface;
pub mod visualization;

pub use config::{ExperimentConfig, GridConfig, PipelineConfig, RegionConfig, StructureConfig};
pub use core::loaders::PointCloud;
pub use core::series::TimeSeries;
pub use experiment::{Experiment, Instrument};
pub use surface::{ScourSurface, StructureFootprint};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
