//! One sensor of an experiment and the processing steps it goes through.

use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use thiserror::Error;

use crate::core::loaders::{load_index_file, LoaderError};
use crate::core::series::{SeriesError, TimeSeries};
use crate::core::units::{ConversionTable, Unit};
use crate::core::writers::{write_processed_series, WriteError};
use crate::processors::alignment::{aligned_depth, apply_depth_correction, CorrectionCurve};
use crate::processors::baseline::{BaselineCorrector, BaselineError, SensorKind};
use crate::processors::filters;
use crate::processors::gaps::fill_gaps;
use crate::processors::thresholds::{apply_rules, ThresholdError, ThresholdRule};

#[derive(Error, Debug)]
pub enum InstrumentError {
    #[error("Cannot infer the sensor category of '{0}' (expected US* or ADV*)")]
    UnknownCategory(String),

    #[error("No reach time set for {0}")]
    MissingReachTime(String),

    #[error("{name}: {source}")]
    Series {
        name: String,
        #[source]
        source: SeriesError,
    },

    #[error(transparent)]
    Threshold(#[from] ThresholdError),

    #[error("{name}: {source}")]
    Baseline {
        name: String,
        #[source]
        source: BaselineError,
    },

    #[error(transparent)]
    Loader(#[from] LoaderError),

    #[error(transparent)]
    Write(#[from] WriteError),
}

pub type Result<T> = std::result::Result<T, InstrumentError>;

/// Infer the category from the instrument name.
pub fn sensor_kind(name: &str) -> Result<SensorKind> {
    if name.contains("US") {
        Ok(SensorKind::SurfaceElevation)
    } else if name.contains("ADV") {
        Ok(SensorKind::Velocity)
    } else {
        Err(InstrumentError::UnknownCategory(name.to_string()))
    }
}

/// Unit a raw reading of `kind` is recorded in.
pub fn default_unit(kind: SensorKind) -> Unit {
    match kind {
        SensorKind::SurfaceElevation => Unit::Millimeter,
        SensorKind::Velocity => Unit::MeterPerSecond,
    }
}

/// Axis label for plots of `kind`.
pub fn quantity_label(kind: SensorKind) -> &'static str {
    match kind {
        SensorKind::SurfaceElevation => "Z",
        SensorKind::Velocity => "Velocity",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrectionState {
    Uncorrected,
    Corrected,
}

#[derive(Debug, Clone)]
pub struct Instrument {
    name: String,
    kind: SensorKind,
    series: TimeSeries,
    thresholds: Vec<ThresholdRule>,
    correction: Option<CorrectionCurve>,
    corner: Option<CorrectionCurve>,
    reach_time: Option<f64>,
    state: CorrectionState,
    /// Depth read off the final scan at this instrument, if logged
    pub final_scour: Option<f64>,
}

impl Instrument {
    /// Raw readings in the category's default unit.
    pub fn new(name: &str, time: Vec<f64>, values: Vec<f64>) -> Result<Self> {
        let kind = sensor_kind(name)?;
        let series = TimeSeries::new(time, values, default_unit(kind)).map_err(|source| {
            InstrumentError::Series {
                name: name.to_string(),
                source,
            }
        })?;
        Ok(Self::with_kind(name, kind, series))
    }

    /// Wrap an already loaded series (e.g. processed data) as-is.
    pub fn from_series(name: &str, series: TimeSeries) -> Result<Self> {
        let kind = sensor_kind(name)?;
        Ok(Self::with_kind(name, kind, series))
    }

    fn with_kind(name: &str, kind: SensorKind, series: TimeSeries) -> Self {
        Self {
            name: name.to_string(),
            kind,
            series,
            thresholds: Vec::new(),
            correction: None,
            corner: None,
            reach_time: None,
            state: CorrectionState::Uncorrected,
            final_scour: None,
        }
    }

    fn series_error(&self, source: SeriesError) -> InstrumentError {
        InstrumentError::Series {
            name: self.name.clone(),
            source,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> SensorKind {
        self.kind
    }

    pub fn label(&self) -> &'static str {
        quantity_label(self.kind)
    }

    pub fn series(&self) -> &TimeSeries {
        &self.series
    }

    pub fn series_mut(&mut self) -> &mut TimeSeries {
        &mut self.series
    }

    pub fn state(&self) -> CorrectionState {
        self.state
    }

    pub fn reach_time(&self) -> Option<f64> {
        self.reach_time
    }

    pub fn set_reach_time(&mut self, reach_time: f64) {
        self.reach_time = Some(reach_time);
    }

    pub fn thresholds(&self) -> &[ThresholdRule] {
        &self.thresholds
    }

    pub fn set_thresholds(&mut self, rules: Vec<ThresholdRule>) {
        self.thresholds = rules;
    }

    pub fn correction(&self) -> Option<&CorrectionCurve> {
        self.correction.as_ref()
    }

    pub fn set_correction(&mut self, curve: CorrectionCurve) {
        self.correction = Some(curve);
    }

    pub fn corner(&self) -> Option<&CorrectionCurve> {
        self.corner.as_ref()
    }

    pub fn set_corner(&mut self, curve: CorrectionCurve) {
        self.corner = Some(curve);
    }

    #[inline]
    pub fn frequency(&self) -> Option<f64> {
        self.series.frequency()
    }

    pub fn truncate(&mut self, duration: f64) {
        self.series.truncate(duration);
    }

    /// Back to the raw readings; the instrument is uncorrected again.
    pub fn reset(&mut self) {
        self.series.reset();
        self.state = CorrectionState::Uncorrected;
    }

    /// Apply the threshold rules. Returns the number of discarded samples.
    pub fn clean(&mut self, table: &ConversionTable) -> Result<usize> {
        let removed = apply_rules(&mut self.series, &self.thresholds, table)?;
        debug!("{}: thresholds removed {} samples", self.name, removed);
        Ok(removed)
    }

    /// Fill NaN runs of at most `limit` samples.
    pub fn interpolate(&mut self, limit: Option<usize>) -> usize {
        fill_gaps(self.series.values_mut(), limit)
    }

    /// Rebaseline against the reach time.
    ///
    /// The correction is one-way: running it again without [`reset`](Self::reset)
    /// works on depths instead of raw readings.
    pub fn correct_baseline(&mut self, pre_reach_threshold: Option<f64>) -> Result<()> {
        let reach_time = self
            .reach_time
            .ok_or_else(|| InstrumentError::MissingReachTime(self.name.clone()))?;
        if self.state == CorrectionState::Corrected {
            warn!("{} is already corrected; reset before correcting again", self.name);
        }

        BaselineCorrector::new(self.kind, reach_time)
            .with_threshold(pre_reach_threshold)
            .apply(&mut self.series)
            .map_err(|source| InstrumentError::Baseline {
                name: self.name.clone(),
                source,
            })?;
        self.state = CorrectionState::Corrected;
        Ok(())
    }

    /// Add the attached scour curve to the readings. `false` when none is set.
    pub fn correct_depth(&mut self, table: &ConversionTable) -> Result<bool> {
        apply_depth_correction(self.correction.as_ref(), &mut self.series, table, &self.name)
            .map_err(|e| self.series_error(e))
    }

    /// Scour curve on this instrument's time grid, in the curve's unit.
    pub fn aligned_depth(&mut self, table: &ConversionTable) -> Result<Option<Vec<f64>>> {
        aligned_depth(self.correction.as_ref(), &mut self.series, table)
            .map_err(|e| self.series_error(e))
    }

    /// Corner scour curve on this instrument's time grid.
    pub fn corner_depth(&mut self, table: &ConversionTable) -> Result<Option<Vec<f64>>> {
        aligned_depth(self.corner.as_ref(), &mut self.series, table)
            .map_err(|e| self.series_error(e))
    }

    pub fn remove_negatives(&mut self, threshold: f64) -> usize {
        filters::remove_below(&mut self.series, threshold)
    }

    pub fn remove_value(&mut self, value: f64, tolerance: f64) -> usize {
        filters::remove_value(&mut self.series, value, tolerance)
    }

    pub fn remove_indices(&mut self, indices: &[usize]) -> usize {
        filters::remove_indices(&mut self.series, indices)
    }

    /// Discard the samples listed in an index file. A missing file is a no-op.
    pub fn remove_indices_from_file(&mut self, path: &Path) -> Result<usize> {
        if !path.exists() {
            warn!("{}: no index file at {}", self.name, path.display());
            return Ok(0);
        }
        let indices = load_index_file(path)?;
        Ok(self.remove_indices(&indices))
    }

    pub fn normalize(&mut self, d0: f64) -> Result<()> {
        filters::normalize(&mut self.series, d0).map_err(|e| self.series_error(e))
    }

    pub fn moving_average(&mut self, window: usize, min_periods: usize) {
        filters::moving_average(&mut self.series, window, min_periods);
    }

    pub fn windowed_moving_average(
        &mut self,
        start: f64,
        end: f64,
        window: usize,
        min_periods: usize,
    ) {
        filters::windowed_moving_average(&mut self.series, start, end, window, min_periods);
    }

    pub fn shift(&mut self, dt: f64, duration: f64) -> Result<()> {
        filters::shift(&mut self.series, dt, duration).map_err(|e| self.series_error(e))
    }

    /// Path of the processed CSV for this instrument inside `dir`.
    pub fn processed_path(&self, dir: &Path, filtered: bool) -> PathBuf {
        let suffix = if filtered { "-filtered" } else { "" };
        dir.join(format!("{}{}.csv", self.name, suffix))
    }

    pub fn save(&self, dir: &Path, filtered: bool) -> Result<PathBuf> {
        let path = self.processed_path(dir, filtered);
        write_processed_series(&path, &self.name, &self.series)?;
        info!("Saved {} to {}", self.name, path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::thresholds::Comparison;
    use tempfile::tempdir;

    const NAN: f64 = f64::NAN;

    fn us1() -> Instrument {
        Instrument::new(
            "US1",
            vec![0.0, 1.0, 2.0, 3.0],
            vec![100.0, 100.0, 90.0, 80.0],
        )
        .unwrap()
    }

    #[test]
    fn test_category_from_name() {
        assert_eq!(sensor_kind("US3").unwrap(), SensorKind::SurfaceElevation);
        assert_eq!(sensor_kind("ADV-x").unwrap(), SensorKind::Velocity);
        assert!(matches!(
            sensor_kind("Temp"),
            Err(InstrumentError::UnknownCategory(_))
        ));

        let adv = Instrument::new("ADV-y", vec![0.0], vec![0.1]).unwrap();
        assert_eq!(adv.series().unit(), Unit::MeterPerSecond);
        assert_eq!(adv.label(), "Velocity");
        assert_eq!(us1().label(), "Z");
    }

    #[test]
    fn test_correct_baseline_requires_reach_time() {
        let mut inst = us1();
        assert!(matches!(
            inst.correct_baseline(None),
            Err(InstrumentError::MissingReachTime(_))
        ));
    }

    #[test]
    fn test_correct_then_reset() {
        let mut inst = us1();
        inst.set_reach_time(2.0);
        inst.correct_baseline(None).unwrap();
        assert_eq!(inst.series().values(), &[0.0, 0.0, 10.0, 20.0]);
        assert_eq!(inst.state(), CorrectionState::Corrected);

        inst.reset();
        assert_eq!(inst.state(), CorrectionState::Uncorrected);
        inst.correct_baseline(None).unwrap();
        assert_eq!(inst.series().values(), &[0.0, 0.0, 10.0, 20.0]);
    }

    #[test]
    fn test_clean_and_interpolate() {
        let mut inst = Instrument::new(
            "US2",
            vec![0.0, 1.0, 2.0, 3.0, 4.0],
            vec![10.0, 10.0, 50.0, NAN, 10.0],
        )
        .unwrap();
        inst.set_thresholds(vec![ThresholdRule {
            time_start: 0.0,
            time_end: 10.0,
            unit: Unit::Centimeter,
            comparison: Comparison::Greater,
            limit: 4.0,
        }]);

        assert_eq!(inst.clean(&ConversionTable::default()).unwrap(), 1);
        assert_eq!(inst.interpolate(Some(3)), 2);
        assert!(inst.series().values().iter().all(|v| (v - 10.0).abs() < 1e-9));
        assert_eq!(inst.series().unit(), Unit::Millimeter);
    }

    #[test]
    fn test_depth_correction_skips_without_curve() {
        let table = ConversionTable::default();
        let mut inst = us1();
        assert!(!inst.correct_depth(&table).unwrap());
        assert_eq!(inst.aligned_depth(&table).unwrap(), None);
        assert_eq!(inst.corner_depth(&table).unwrap(), None);
    }

    #[test]
    fn test_corner_depth() {
        let table = ConversionTable::default();
        let mut inst = us1();
        inst.set_corner(
            CorrectionCurve::new(vec![0.0, 10.0], vec![0.0, 10.0], Unit::Centimeter).unwrap(),
        );
        let depth = inst.corner_depth(&table).unwrap().unwrap();
        assert_eq!(depth.len(), 4);
        assert!((depth[3] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_remove_indices_from_missing_file() {
        let dir = tempdir().unwrap();
        let mut inst = us1();
        let removed = inst
            .remove_indices_from_file(&dir.path().join("US1.txt"))
            .unwrap();
        assert_eq!(removed, 0);

        let path = dir.path().join("US1-indices.txt");
        std::fs::write(&path, "1\n3\n").unwrap();
        assert_eq!(inst.remove_indices_from_file(&path).unwrap(), 2);
        assert!(inst.series().values()[1].is_nan());
        assert!(inst.series().values()[3].is_nan());
    }

    #[test]
    fn test_save_filtered_path() {
        let dir = tempdir().unwrap();
        let inst = us1();
        let path = inst.save(dir.path(), true).unwrap();
        assert!(path.ends_with("US1-filtered.csv"));
        assert!(path.exists());
    }
}
