//! Alignment of sparse scour-depth curves onto a sensor's time grid.

use log::warn;
use thiserror::Error;

use super::interp::linear_extrapolated;
use crate::core::series::{SeriesError, TimeSeries};
use crate::core::units::{ConversionTable, Unit};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CurveError {
    #[error("A correction curve needs at least 2 points, got {0}")]
    TooFewPoints(usize),

    #[error("Curve time has {time_len} samples, depth has {depth_len}")]
    LengthMismatch { time_len: usize, depth_len: usize },

    #[error("Curve contains a NaN time stamp")]
    NanTime,
}

/// Sparse `(time, depth)` curve measured independently of the sensor.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrectionCurve {
    time: Vec<f64>,
    depth: Vec<f64>,
    unit: Unit,
}

impl CorrectionCurve {
    /// Build a curve; samples are sorted by time.
    pub fn new(time: Vec<f64>, depth: Vec<f64>, unit: Unit) -> Result<Self, CurveError> {
        if time.len() != depth.len() {
            return Err(CurveError::LengthMismatch {
                time_len: time.len(),
                depth_len: depth.len(),
            });
        }
        if time.len() < 2 {
            return Err(CurveError::TooFewPoints(time.len()));
        }
        if time.iter().any(|t| t.is_nan()) {
            return Err(CurveError::NanTime);
        }

        let mut pairs: Vec<(f64, f64)> = time.into_iter().zip(depth).collect();
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
        let (time, depth) = pairs.into_iter().unzip();

        Ok(Self { time, depth, unit })
    }

    #[inline]
    pub fn unit(&self) -> Unit {
        self.unit
    }

    pub fn time(&self) -> &[f64] {
        &self.time
    }

    pub fn depth(&self) -> &[f64] {
        &self.depth
    }

    /// Depth at `t`, extending the nearest segment past either end.
    #[inline]
    pub fn depth_at(&self, t: f64) -> f64 {
        linear_extrapolated(&self.time, &self.depth, t)
    }

    /// Depth on every time in `grid`.
    pub fn sample(&self, grid: &[f64]) -> Vec<f64> {
        grid.iter().map(|&t| self.depth_at(t)).collect()
    }
}

/// Depth estimate of `curve` on the time grid of `series`, in the curve's unit.
///
/// The series is expressed in the curve's unit for the duration of the
/// lookup and restored afterwards. `Ok(None)` means no curve is attached,
/// which callers treat as "skip".
pub fn aligned_depth(
    curve: Option<&CorrectionCurve>,
    series: &mut TimeSeries,
    table: &ConversionTable,
) -> Result<Option<Vec<f64>>, SeriesError> {
    let Some(curve) = curve else {
        return Ok(None);
    };
    let depth = series.with_unit(table, curve.unit(), |s| curve.sample(s.time()))?;
    Ok(Some(depth))
}

/// Add the aligned depth to `series` (in the curve's unit), then restore the
/// series' own unit. Returns `false` when no curve is attached.
pub fn apply_depth_correction(
    curve: Option<&CorrectionCurve>,
    series: &mut TimeSeries,
    table: &ConversionTable,
    name: &str,
) -> Result<bool, SeriesError> {
    let Some(curve) = curve else {
        warn!("No correction data available for {}", name);
        return Ok(false);
    };
    series.with_unit(table, curve.unit(), |s| {
        let depth = curve.sample(s.time());
        s.values_mut()
            .iter_mut()
            .zip(depth)
            .for_each(|(v, d)| *v += d);
    })?;
    Ok(true)
}
