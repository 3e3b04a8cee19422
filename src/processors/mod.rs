//! Time-series processing steps.

pub mod alignment;
pub mod baseline;
pub mod filters;
pub mod gaps;
pub mod interp;
pub mod thresholds;

// Re-export key types for convenience
pub use alignment::{aligned_depth, apply_depth_correction, CorrectionCurve, CurveError};
pub use baseline::{BaselineCorrector, BaselineError, SensorKind};
pub use gaps::{fill_gaps, find_nan_runs, NanRun};
pub use thresholds::{apply_rules, Comparison, ThresholdError, ThresholdRule};
