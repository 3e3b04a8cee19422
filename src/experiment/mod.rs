//! A single flume test: its instruments, supporting tables and the bed scan.
//!
//! An experiment lives in a directory named after the test (`SW-H2-A3`).
//! File names inside it are taken from [`ExperimentConfig`](crate::config::ExperimentConfig).

pub mod info;
pub mod instrument;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use thiserror::Error;

use crate::config::PipelineConfig;
use crate::core::loaders::{
    load_correction_curve, load_footprint_override, load_point_cloud, load_processed_series,
    load_reach_times, load_scour_log, load_series_table, load_threshold_rules, LoaderError,
};
use crate::core::writers::LogMode;
use crate::surface::{FootprintError, ScourSurface, StructureFootprint, SurfaceError};

pub use info::{AngleCode, ExperimentInfo, ImpoundmentCode, InfoError, StructureCode};
pub use instrument::{CorrectionState, Instrument, InstrumentError};

#[derive(Error, Debug)]
pub enum ExperimentError {
    #[error("Experiment directory has no usable name: {0}")]
    InvalidDirectory(PathBuf),

    #[error(transparent)]
    Info(#[from] InfoError),

    #[error("Unknown instrument '{0}'")]
    UnknownInstrument(String),

    #[error(transparent)]
    Loader(#[from] LoaderError),

    #[error(transparent)]
    Instrument(#[from] InstrumentError),

    #[error(transparent)]
    Footprint(#[from] FootprintError),

    #[error(transparent)]
    Surface(#[from] SurfaceError),
}

pub type Result<T> = std::result::Result<T, ExperimentError>;

/// Options for [`Experiment::process`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessOptions {
    /// Longest NaN run that gets filled; `None` fills every run
    pub gap_limit: Option<usize>,
    /// Pre-reach surface readings above this are dropped from the baseline
    pub pre_reach_threshold: Option<f64>,
    /// Add the attached scour curve after rebaselining
    pub correct_depth: bool,
}

/// Counts reported by [`Experiment::process`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessSummary {
    pub processed: usize,
    pub skipped: usize,
    pub removed: usize,
    pub filled: usize,
    pub depth_corrected: usize,
}

#[derive(Debug, Clone)]
pub struct Experiment {
    name: String,
    root: PathBuf,
    info: ExperimentInfo,
    config: PipelineConfig,
    instruments: BTreeMap<String, Instrument>,
}

impl Experiment {
    /// Open the experiment in `root`; the directory name is the test name.
    pub fn new(root: &Path, config: PipelineConfig) -> Result<Self> {
        let name = root
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ExperimentError::InvalidDirectory(root.to_path_buf()))?
            .to_string();
        let info = ExperimentInfo::parse(&name)?;
        info!("Experiment {}: {}", name, info);

        Ok(Self {
            name,
            root: root.to_path_buf(),
            info,
            config,
            instruments: BTreeMap::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn info(&self) -> &ExperimentInfo {
        &self.info
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn instruments(&self) -> &BTreeMap<String, Instrument> {
        &self.instruments
    }

    pub fn instrument(&self, name: &str) -> Result<&Instrument> {
        self.instruments
            .get(name)
            .ok_or_else(|| ExperimentError::UnknownInstrument(name.to_string()))
    }

    pub fn instrument_mut(&mut self, name: &str) -> Result<&mut Instrument> {
        self.instruments
            .get_mut(name)
            .ok_or_else(|| ExperimentError::UnknownInstrument(name.to_string()))
    }

    pub fn insert(&mut self, instrument: Instrument) {
        self.instruments
            .insert(instrument.name().to_string(), instrument);
    }

    fn path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    fn processed_dir(&self) -> PathBuf {
        self.path(&self.config.experiment.processed_dir)
    }

    fn scour_log_path(&self) -> PathBuf {
        self.path(&self.config.experiment.scour_dir)
            .join(&self.config.experiment.final_scour_log)
    }

    /// Load raw logger readings, optionally with threshold rules.
    ///
    /// Columns whose category cannot be inferred are skipped with a warning.
    /// Every series is truncated to the configured duration.
    pub fn load_raw(&mut self, data: &Path, thresholds: Option<&Path>) -> Result<usize> {
        let table = load_series_table(data)?;
        let rules = thresholds.map(load_threshold_rules).transpose()?;
        let duration = self.config.experiment.duration;

        let mut loaded = 0;
        for (name, values) in &table.columns {
            let mut instrument = match Instrument::new(name, table.time.clone(), values.clone()) {
                Ok(instrument) => instrument,
                Err(InstrumentError::UnknownCategory(name)) => {
                    warn!("Skipping column '{}' of unknown category", name);
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            instrument.truncate(duration);
            if let Some(rules) = &rules {
                instrument.set_thresholds(rules.for_instrument(name));
            }
            self.insert(instrument);
            loaded += 1;
        }

        info!("Loaded {} instruments from {}", loaded, data.display());
        Ok(loaded)
    }

    /// Load previously saved per-instrument CSVs from the processed directory.
    pub fn load_processed(&mut self, filtered: bool) -> Result<usize> {
        let dir = self.processed_dir();
        let mut files: Vec<PathBuf> = fs::read_dir(&dir)
            .map_err(LoaderError::from)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().map_or(false, |e| e == "csv"))
            .filter(|p| {
                let is_filtered = p
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .map_or(false, |s| s.ends_with("-filtered"));
                is_filtered == filtered
            })
            .collect();
        files.sort();

        let mut loaded = 0;
        for path in files {
            let (name, series) = load_processed_series(&path)?;
            match Instrument::from_series(&name, series) {
                Ok(instrument) => {
                    self.insert(instrument);
                    loaded += 1;
                }
                Err(InstrumentError::UnknownCategory(name)) => {
                    warn!("Skipping {} ({}): unknown category", path.display(), name);
                }
                Err(e) => return Err(e.into()),
            }
        }

        info!("Loaded {} processed instruments from {}", loaded, dir.display());
        Ok(loaded)
    }

    /// Attach reach times, scour curves and logged final depths.
    ///
    /// Absent files are not an error; instruments simply stay without the
    /// corresponding data.
    pub fn load_supporting(&mut self) -> Result<()> {
        let reach_path = self.path(&self.config.experiment.reach_times);
        if reach_path.exists() {
            for (name, reach_time) in load_reach_times(&reach_path)? {
                match self.instruments.get_mut(&name) {
                    Some(instrument) => instrument.set_reach_time(reach_time),
                    None => debug!("Reach time for unloaded instrument {}", name),
                }
            }
        } else {
            warn!("No reach times at {}", reach_path.display());
        }

        let scour_dir = self.path(&self.config.experiment.scour_dir);
        let Ok(entries) = fs::read_dir(&scour_dir) else {
            debug!("No scour directory at {}", scour_dir.display());
            return Ok(());
        };
        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().map_or(false, |e| e == "csv"))
            .collect();
        files.sort();

        for path in files {
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let lower = stem.to_lowercase();

            if lower.contains("final scour") {
                for (name, depth) in load_scour_log(&path)? {
                    if let Some(instrument) = self.instruments.get_mut(&name) {
                        instrument.final_scour = (!depth.is_nan()).then_some(depth);
                    }
                }
            } else if lower.contains("corner") {
                let curve = load_correction_curve(&path)?;
                let target = &self.config.experiment.corner_instrument;
                match self.instruments.get_mut(target) {
                    Some(instrument) => instrument.set_corner(curve),
                    None => warn!("Corner curve found but {} is not loaded", target),
                }
            } else if let Some(instrument) = self.instruments.get_mut(stem) {
                instrument.set_correction(load_correction_curve(&path)?);
                debug!("Attached scour curve {} to {}", path.display(), stem);
            }
        }
        Ok(())
    }

    /// Clean, gap-fill, rebaseline and optionally depth-correct every
    /// instrument that has a reach time.
    pub fn process(&mut self, options: &ProcessOptions) -> Result<ProcessSummary> {
        let table = &self.config.units;
        let mut summary = ProcessSummary::default();

        for (name, instrument) in self.instruments.iter_mut() {
            if instrument.reach_time().is_none() {
                warn!("{} has no reach time, left unprocessed", name);
                summary.skipped += 1;
                continue;
            }

            summary.removed += instrument.clean(table)?;
            summary.filled += instrument.interpolate(options.gap_limit);
            instrument.correct_baseline(options.pre_reach_threshold)?;
            if options.correct_depth && instrument.correct_depth(table)? {
                summary.depth_corrected += 1;
            }
            summary.processed += 1;
        }

        info!(
            "Processed {} instruments ({} skipped), {} samples removed, {} filled",
            summary.processed, summary.skipped, summary.removed, summary.filled
        );
        Ok(summary)
    }

    /// Second pass over processed records: discard the samples listed in
    /// `<indices_dir>/<name>.txt` and fill the gaps left behind.
    pub fn refine(
        &mut self,
        indices_dir: Option<&Path>,
        gap_limit: Option<usize>,
    ) -> Result<ProcessSummary> {
        let mut summary = ProcessSummary::default();
        for (name, instrument) in self.instruments.iter_mut() {
            if let Some(dir) = indices_dir {
                summary.removed +=
                    instrument.remove_indices_from_file(&dir.join(format!("{}.txt", name)))?;
            }
            summary.filled += instrument.interpolate(gap_limit);
            summary.processed += 1;
        }
        info!(
            "Refined {} instruments, {} samples removed, {} filled",
            summary.processed, summary.removed, summary.filled
        );
        Ok(summary)
    }

    /// Write every instrument to the processed directory.
    pub fn save_processed(&self, filtered: bool) -> Result<Vec<PathBuf>> {
        let dir = self.processed_dir();
        self.instruments
            .values()
            .map(|instrument| instrument.save(&dir, filtered).map_err(ExperimentError::from))
            .collect()
    }

    /// Structure outline: measured corners when an override file exists,
    /// otherwise computed from the test codes.
    pub fn footprint(&self) -> Result<StructureFootprint> {
        let override_path = self.path(&self.config.experiment.footprint_override);
        if override_path.exists() {
            info!("Using measured footprint {}", override_path.display());
            let corners = load_footprint_override(&override_path)?;
            return Ok(StructureFootprint::from_corners(corners)?);
        }
        Ok(StructureFootprint::from_codes(
            &self.info,
            &self.config.structure,
        )?)
    }

    /// Grid the bed scan of this experiment.
    pub fn build_surface(&self) -> Result<ScourSurface> {
        let cloud = load_point_cloud(self.path(&self.config.experiment.point_cloud))?;
        let footprint = self.footprint()?;
        Ok(ScourSurface::build(
            &cloud,
            footprint,
            &self.config.region,
            &self.config.grid,
        )?)
    }

    /// Read the final depth at `(x, y)` off `surface` and log it for `instrument`.
    pub fn record_final_scour(
        &mut self,
        surface: &ScourSurface,
        instrument: &str,
        x: f64,
        y: f64,
        mode: LogMode,
    ) -> Result<f64> {
        let depth = surface.record_depth(&self.scour_log_path(), instrument, x, y, mode)?;
        if let Some(inst) = self.instruments.get_mut(instrument) {
            inst.final_scour = (!depth.is_nan()).then_some(depth);
        }
        Ok(depth)
    }
}
