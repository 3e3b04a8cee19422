//! Reach-time rebaselining of sensor readings.
//!
//! Surface-elevation sensors report the distance down to the water, so the
//! mean pre-reach reading is taken as the dry reference and every sample is
//! turned into a depth `baseline - value`. Velocity sensors already measure
//! the quantity of interest and only get their pre-reach samples zeroed.

use thiserror::Error;

use crate::core::series::TimeSeries;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BaselineError {
    #[error("No valid samples before reach time {0} to compute a baseline")]
    NoPreReachSamples(f64),
}

/// Physical category of a sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorKind {
    SurfaceElevation,
    Velocity,
}

/// Correction parameters for one instrument.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaselineCorrector {
    pub kind: SensorKind,
    /// Moment the flow reaches the sensor
    pub reach_time: f64,
    /// Pre-reach readings above this are spurious wetting and are discarded
    pub pre_reach_threshold: Option<f64>,
}

impl BaselineCorrector {
    pub fn new(kind: SensorKind, reach_time: f64) -> Self {
        Self {
            kind,
            reach_time,
            pre_reach_threshold: None,
        }
    }

    pub fn with_threshold(mut self, threshold: Option<f64>) -> Self {
        self.pre_reach_threshold = threshold;
        self
    }

    /// Apply the correction in place. Not idempotent: a second call works on
    /// already corrected depths.
    pub fn apply(&self, series: &mut TimeSeries) -> Result<(), BaselineError> {
        match self.kind {
            SensorKind::SurfaceElevation => self.correct_surface(series),
            SensorKind::Velocity => {
                self.zero_pre_reach(series);
                Ok(())
            }
        }
    }

    fn correct_surface(&self, series: &mut TimeSeries) -> Result<(), BaselineError> {
        let reach = self.reach_time;
        let time = series.time().to_vec();

        if let Some(threshold) = self.pre_reach_threshold {
            for (t, v) in time.iter().zip(series.values_mut().iter_mut()) {
                if *t < reach && *v > threshold {
                    *v = f64::NAN;
                }
            }
        }

        let (sum, count) = time
            .iter()
            .zip(series.values())
            .filter(|(t, v)| **t < reach && !v.is_nan())
            .fold((0.0, 0usize), |(s, n), (_, v)| (s + v, n + 1));
        if count == 0 {
            return Err(BaselineError::NoPreReachSamples(reach));
        }
        let baseline = sum / count as f64;

        series
            .values_mut()
            .iter_mut()
            .for_each(|v| *v = baseline - *v);
        self.zero_pre_reach(series);

        Ok(())
    }

    fn zero_pre_reach(&self, series: &mut TimeSeries) {
        let time = series.time().to_vec();
        for (t, v) in time.iter().zip(series.values_mut().iter_mut()) {
            if *t < self.reach_time {
                *v = 0.0;
            }
        }
    }
}
