//! Plan-view footprint of the structure in the flume.
//!
//! The footprint is an axis-aligned rectangle at a fixed location, rotated
//! about a pivot by the angle code and shifted along x so its rightmost
//! corner sits on the anchor line.

use geo::{Contains, LineString, Point, Polygon};
use log::debug;
use thiserror::Error;

use crate::config::StructureConfig;
use crate::experiment::info::ExperimentInfo;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FootprintError {
    #[error("No width configured for structure '{0}'")]
    MissingWidth(String),

    #[error("Footprint corner {0} is not finite")]
    NonFiniteCorner(usize),
}

pub type Result<T> = std::result::Result<T, FootprintError>;

/// Four corners of the structure, in ring order.
#[derive(Debug, Clone, PartialEq)]
pub struct StructureFootprint {
    corners: [[f64; 2]; 4],
}

impl StructureFootprint {
    /// Compute the footprint for the codes of a test name.
    ///
    /// The angle table of `config` takes precedence over the nominal angle of
    /// the code; "not applicable" resolves to no rotation.
    pub fn from_codes(info: &ExperimentInfo, config: &StructureConfig) -> Result<Self> {
        let code = info.structure.code();
        let width = *config
            .widths
            .get(code)
            .ok_or_else(|| FootprintError::MissingWidth(code.to_string()))?;
        let angle = config
            .angles
            .get(info.angle.code())
            .copied()
            .unwrap_or_else(|| info.angle.degrees())
            .unwrap_or(0.0);

        let upper_y = (-config.channel_width + width) / 2.0;
        let lower_y = (-config.channel_width - width) / 2.0;
        let rectangle = [
            [config.start_x, upper_y],
            [config.end_x, upper_y],
            [config.end_x, lower_y],
            [config.start_x, lower_y],
        ];

        let (sin, cos) = angle.to_radians().sin_cos();
        let [px, py] = config.pivot;
        let mut corners = rectangle.map(|[x, y]| {
            let (dx, dy) = (x - px, y - py);
            [px + dx * cos - dy * sin, py + dx * sin + dy * cos]
        });

        let max_x = corners
            .iter()
            .map(|c| c[0])
            .fold(f64::NEG_INFINITY, f64::max);
        let shift = max_x - config.anchor_x;
        for corner in corners.iter_mut() {
            corner[0] -= shift;
        }

        debug!(
            "Footprint for {}-{}: width {} m, angle {}°",
            code,
            info.angle.code(),
            width,
            angle
        );
        Self::from_corners(corners)
    }

    /// Use measured corners as-is.
    pub fn from_corners(corners: [[f64; 2]; 4]) -> Result<Self> {
        if let Some(i) = corners
            .iter()
            .position(|c| !c[0].is_finite() || !c[1].is_finite())
        {
            return Err(FootprintError::NonFiniteCorner(i));
        }
        Ok(Self { corners })
    }

    #[inline]
    pub fn corners(&self) -> &[[f64; 2]; 4] {
        &self.corners
    }

    /// Mean of the corners.
    pub fn center(&self) -> [f64; 2] {
        let (sx, sy) = self
            .corners
            .iter()
            .fold((0.0, 0.0), |(sx, sy), c| (sx + c[0], sy + c[1]));
        [sx / 4.0, sy / 4.0]
    }

    pub fn polygon(&self) -> Polygon<f64> {
        let ring: Vec<(f64, f64)> = self.corners.iter().map(|c| (c[0], c[1])).collect();
        Polygon::new(LineString::from(ring), vec![])
    }

    /// Strict interior test; points on the outline are outside.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        if x.is_nan() || y.is_nan() {
            return false;
        }
        self.polygon().contains(&Point::new(x, y))
    }
}
