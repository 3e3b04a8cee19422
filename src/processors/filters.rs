//! Sample-level cleanup and smoothing of a series.

use crate::core::series::{Result, TimeSeries};

/// Gravitational acceleration used for Froude time scaling (m/s²).
const GRAVITY: f64 = 9.81;

/// Trailing rolling mean over `window` samples that skips NaN.
///
/// A window with fewer than `min_periods` valid samples yields NaN.
pub fn rolling_mean(values: &[f64], window: usize, min_periods: usize) -> Vec<f64> {
    let window = window.max(1);
    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    let mut count = 0usize;

    for i in 0..values.len() {
        let v = values[i];
        if !v.is_nan() {
            sum += v;
            count += 1;
        }
        if i >= window {
            let old = values[i - window];
            if !old.is_nan() {
                sum -= old;
                count -= 1;
            }
        }
        out.push(if count >= min_periods && count > 0 {
            sum / count as f64
        } else {
            f64::NAN
        });
    }

    out
}

/// Replace the series with its trailing rolling mean.
pub fn moving_average(series: &mut TimeSeries, window: usize, min_periods: usize) {
    let smoothed = rolling_mean(series.values(), window, min_periods);
    series.values_mut().copy_from_slice(&smoothed);
}

/// Rolling mean restricted to samples with `start <= t < end`.
pub fn windowed_moving_average(
    series: &mut TimeSeries,
    start: f64,
    end: f64,
    window: usize,
    min_periods: usize,
) {
    let indices: Vec<usize> = series
        .time()
        .iter()
        .enumerate()
        .filter(|(_, t)| **t >= start && **t < end)
        .map(|(i, _)| i)
        .collect();
    if indices.is_empty() {
        return;
    }

    let subset: Vec<f64> = indices.iter().map(|&i| series.values()[i]).collect();
    let smoothed = rolling_mean(&subset, window, min_periods);
    let values = series.values_mut();
    for (&i, v) in indices.iter().zip(smoothed) {
        values[i] = v;
    }
}

/// NaN every sample below `threshold`.
pub fn remove_below(series: &mut TimeSeries, threshold: f64) -> usize {
    let mut removed = 0;
    for v in series.values_mut() {
        if *v < threshold {
            *v = f64::NAN;
            removed += 1;
        }
    }
    removed
}

/// NaN every sample within `tolerance` of `value`.
pub fn remove_value(series: &mut TimeSeries, value: f64, tolerance: f64) -> usize {
    let mut removed = 0;
    for v in series.values_mut() {
        if (*v - value).abs() < tolerance {
            *v = f64::NAN;
            removed += 1;
        }
    }
    removed
}

/// NaN the samples at `indices`; indices past the end are ignored.
pub fn remove_indices(series: &mut TimeSeries, indices: &[usize]) -> usize {
    let values = series.values_mut();
    let mut removed = 0;
    for &i in indices {
        if let Some(v) = values.get_mut(i) {
            *v = f64::NAN;
            removed += 1;
        }
    }
    removed
}

/// Froude scaling by the reference depth `d0` (meters).
pub fn normalize(series: &mut TimeSeries, d0: f64) -> Result<()> {
    let time_scale = (GRAVITY / d0).sqrt();
    let time = series.time().iter().map(|t| t * time_scale).collect();
    let values = series.values().iter().map(|v| v / d0).collect();
    series.replace(time, values)
}

/// Delay the series by `dt`, back-filling zeros from `t = 0` on the series'
/// own sampling interval, then keep `t < duration`.
pub fn shift(series: &mut TimeSeries, dt: f64, duration: f64) -> Result<()> {
    let step = series.frequency().map(|f| 1.0 / f);
    let shifted: Vec<f64> = series.time().iter().map(|t| t + dt).collect();

    let mut time = Vec::with_capacity(shifted.len());
    let mut values = Vec::with_capacity(shifted.len());
    if let (Some(step), Some(&first)) = (step, shifted.first()) {
        let n = (first / step).ceil().max(0.0) as usize;
        time.extend((0..n).map(|k| k as f64 * step).take_while(|t| *t < first));
        values.resize(time.len(), 0.0);
    }
    time.extend(shifted);
    values.extend_from_slice(series.values());

    series.replace(time, values)?;
    series.truncate(duration);
    Ok(())
}
