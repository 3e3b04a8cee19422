//! Unit-tagged time series with a retained raw copy.

use thiserror::Error;

use super::units::{ConversionTable, Unit, UnitError};

/// Errors that can occur when building or mutating a series.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SeriesError {
    #[error("time has {time_len} samples, values has {values_len}")]
    LengthMismatch { time_len: usize, values_len: usize },

    #[error("time is not strictly increasing at sample {0}")]
    UnorderedTime(usize),

    #[error(transparent)]
    Unit(#[from] UnitError),
}

/// Result type for series operations.
pub type Result<T> = std::result::Result<T, SeriesError>;

/// Sampled signal `(time, value)` with a physical unit.
///
/// A working copy is mutated by the processing steps while the raw copy
/// stays untouched so the series can always be [`reset`](Self::reset).
/// `time` and `values` are always replaced together, have equal length, and
/// `time` is strictly increasing.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    time: Vec<f64>,
    values: Vec<f64>,
    unit: Unit,
    original_time: Vec<f64>,
    original_values: Vec<f64>,
    original_unit: Unit,
}

impl TimeSeries {
    pub fn new(time: Vec<f64>, values: Vec<f64>, unit: Unit) -> Result<Self> {
        check_arrays(&time, &values)?;
        Ok(Self {
            original_time: time.clone(),
            original_values: values.clone(),
            original_unit: unit,
            time,
            values,
            unit,
        })
    }

    #[inline]
    pub fn time(&self) -> &[f64] {
        &self.time
    }

    #[inline]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Mutable access to the values; the length cannot change through it.
    #[inline]
    pub fn values_mut(&mut self) -> &mut [f64] {
        &mut self.values
    }

    #[inline]
    pub fn unit(&self) -> Unit {
        self.unit
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.time.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Sampling frequency from the first two samples.
    pub fn frequency(&self) -> Option<f64> {
        match self.time.as_slice() {
            [t0, t1, ..] if t1 > t0 => Some(1.0 / (t1 - t0)),
            _ => None,
        }
    }

    /// Swap in new arrays, keeping the unit.
    pub fn replace(&mut self, time: Vec<f64>, values: Vec<f64>) -> Result<()> {
        check_arrays(&time, &values)?;
        self.time = time;
        self.values = values;
        Ok(())
    }

    /// Keep only the samples strictly before `duration`.
    pub fn truncate(&mut self, duration: f64) {
        let (time, values): (Vec<f64>, Vec<f64>) = self
            .time
            .iter()
            .zip(&self.values)
            .filter(|(t, _)| **t < duration)
            .map(|(t, v)| (*t, *v))
            .unzip();
        self.time = time;
        self.values = values;
    }

    /// Restore the raw copy, including its unit.
    pub fn reset(&mut self) {
        self.time = self.original_time.clone();
        self.values = self.original_values.clone();
        self.unit = self.original_unit;
    }

    /// Convert the working values to `target`.
    pub fn convert_to(&mut self, table: &ConversionTable, target: Unit) -> Result<()> {
        table.convert_in_place(&mut self.values, self.unit, target)?;
        self.unit = target;
        Ok(())
    }

    /// Run `f` with the series expressed in `unit`, then convert back.
    pub fn with_unit<R>(
        &mut self,
        table: &ConversionTable,
        unit: Unit,
        f: impl FnOnce(&mut Self) -> R,
    ) -> Result<R> {
        let restore = self.unit;
        // Fail before mutating if the way back is unsupported.
        table.factor(unit, restore)?;
        self.convert_to(table, unit)?;
        let out = f(self);
        self.convert_to(table, restore)?;
        Ok(out)
    }
}

fn check_arrays(time: &[f64], values: &[f64]) -> Result<()> {
    if time.len() != values.len() {
        return Err(SeriesError::LengthMismatch {
            time_len: time.len(),
            values_len: values.len(),
        });
    }
    if let Some(i) = time.iter().position(|t| !t.is_finite()) {
        return Err(SeriesError::UnorderedTime(i));
    }
    match time.windows(2).position(|w| w[1] <= w[0]) {
        Some(i) => Err(SeriesError::UnorderedTime(i + 1)),
        None => Ok(()),
    }
}
