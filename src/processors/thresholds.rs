//! Time-windowed, unit-aware threshold cleaning.

use std::str::FromStr;

use log::debug;
use thiserror::Error;

use crate::core::series::{SeriesError, TimeSeries};
use crate::core::units::{ConversionTable, Unit};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ThresholdError {
    #[error("Unknown comparison '{0}', expected 'g' or 'l'")]
    UnknownComparison(String),

    #[error(transparent)]
    Series(#[from] SeriesError),
}

/// Direction a sample has to exceed the limit to be discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Greater,
    Less,
}

impl FromStr for Comparison {
    type Err = ThresholdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "g" | "greater" => Ok(Comparison::Greater),
            "l" | "less" => Ok(Comparison::Less),
            other => Err(ThresholdError::UnknownComparison(other.to_string())),
        }
    }
}

/// One row of a threshold table.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdRule {
    pub time_start: f64,
    pub time_end: f64,
    pub unit: Unit,
    pub comparison: Comparison,
    pub limit: f64,
}

impl ThresholdRule {
    /// Whether the sample at `(t, v)` is rejected. NaN is never selected.
    #[inline]
    pub fn rejects(&self, t: f64, v: f64) -> bool {
        let in_window = t > self.time_start && t < self.time_end;
        let out_of_range = match self.comparison {
            Comparison::Greater => v > self.limit,
            Comparison::Less => v < self.limit,
        };
        in_window && out_of_range
    }
}

/// Apply `rules` in order, replacing rejected samples with NaN.
///
/// Each rule sees the series in its own unit and the NaNs left by earlier
/// rules. Returns how many samples were discarded in total.
pub fn apply_rules(
    series: &mut TimeSeries,
    rules: &[ThresholdRule],
    table: &ConversionTable,
) -> Result<usize, ThresholdError> {
    let mut removed = 0;

    for rule in rules {
        let count = series.with_unit(table, rule.unit, |s| {
            let time = s.time().to_vec();
            let mut count = 0;
            for (t, v) in time.iter().zip(s.values_mut().iter_mut()) {
                if rule.rejects(*t, *v) {
                    *v = f64::NAN;
                    count += 1;
                }
            }
            count
        })?;
        debug!(
            "Rule {:?} {} {} on ({}, {}) removed {} samples",
            rule.comparison, rule.limit, rule.unit, rule.time_start, rule.time_end, count
        );
        removed += count;
    }

    Ok(removed)
}
