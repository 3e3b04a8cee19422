//! Bed surface reconstruction from LiDAR scans.
//!
//! - `footprint`: structure outline from the test codes
//! - `grid`: scattered-to-regular interpolation, smoothing, lookup
//! - `patch`: mirror repair of scan shadows
//! - `scatter`: the scour surface pipeline and final-depth logging

pub mod footprint;
pub mod grid;
pub mod patch;
pub mod scatter;

use thiserror::Error;

use crate::core::writers::WriteError;

pub use footprint::{FootprintError, StructureFootprint};
pub use grid::GridSurface;
pub use patch::{PatchDirection, RotationPatch};
pub use scatter::{select_region, ScourSurface};

#[derive(Error, Debug)]
pub enum SurfaceError {
    #[error("Triangulation failed: {0}")]
    Triangulation(String),

    #[error("Patch x [{x_start}, {x_end}] ± {y_offset} m covers no grid nodes on one side")]
    EmptyPatch {
        x_start: f64,
        x_end: f64,
        y_offset: f64,
    },

    #[error("Patch halves differ in shape: source {from:?}, target {to:?} (rows, columns)")]
    PatchShapeMismatch {
        from: (usize, usize),
        to: (usize, usize),
    },

    #[error(transparent)]
    Footprint(#[from] FootprintError),

    #[error(transparent)]
    Write(#[from] WriteError),
}

pub type Result<T> = std::result::Result<T, SurfaceError>;
