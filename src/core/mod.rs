//! Core data types and I/O operations.

pub mod loaders;
pub mod series;
pub mod units;
pub mod writers;

pub use loaders::{LoaderError, PointCloud, SeriesTable, ThresholdTable};
pub use series::{SeriesError, TimeSeries};
pub use units::{ConversionTable, QuantityFamily, Unit, UnitError};
pub use writers::{write_processed_series, write_scour_depth, LogMode, WriteError};
