//! Data loaders for experiment tables and LiDAR point clouds.
//!
//! This module provides parsers for:
//! - Raw logger files (whitespace separated) and headed CSV time series
//! - Processed single-instrument CSVs (`name [unit]` header)
//! - Threshold rule tables, correction curves, reach times and scour logs
//! - Point cloud exports (`X,Y,Z` columns)
//! - Structure footprint override tables

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord};
use regex::Regex;
use thiserror::Error;

use super::series::{SeriesError, TimeSeries};
use super::units::{Unit, UnitError};
use crate::processors::alignment::{CorrectionCurve, CurveError};
use crate::processors::thresholds::{ThresholdError, ThresholdRule};

/// Column names of the raw data logger export, in file order.
pub const LOGGER_COLUMNS: [&str; 9] = [
    "Time", "US1", "US2", "US3", "US4", "US5", "ADV-x", "ADV-y", "ADV-z",
];

/// Row labels of a footprint override table, in corner order.
pub const FOOTPRINT_ROWS: [&str; 4] = [
    "Upstream-upper",
    "Upstream-lower",
    "Downstream-lower",
    "Downstream-upper",
];

/// Errors that can occur during file loading.
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Empty file: {0}")]
    EmptyFile(PathBuf),

    #[error("Missing required columns in {path}: {columns}")]
    MissingColumns { path: PathBuf, columns: String },

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error(transparent)]
    Unit(#[from] UnitError),

    #[error(transparent)]
    Series(#[from] SeriesError),

    #[error(transparent)]
    Curve(#[from] CurveError),

    #[error(transparent)]
    Threshold(#[from] ThresholdError),
}

/// Result type for loader operations.
pub type Result<T> = std::result::Result<T, LoaderError>;

/// Container for 3D LiDAR returns in the lab frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointCloud {
    /// X coordinates of all points.
    pub x: Vec<f64>,
    /// Y coordinates of all points.
    pub y: Vec<f64>,
    /// Z coordinates of all points.
    pub z: Vec<f64>,
}

impl PointCloud {
    /// Creates a new empty point cloud.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new point cloud with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            x: Vec::with_capacity(capacity),
            y: Vec::with_capacity(capacity),
            z: Vec::with_capacity(capacity),
        }
    }

    /// Returns the number of points in the cloud.
    #[inline]
    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// Returns true if the point cloud is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Adds a point to the cloud.
    #[inline]
    pub fn push(&mut self, x: f64, y: f64, z: f64) {
        self.x.push(x);
        self.y.push(y);
        self.z.push(z);
    }

    /// Iterate points as `(x, y, z)`.
    pub fn iter(&self) -> impl Iterator<Item = (f64, f64, f64)> + '_ {
        self.x
            .iter()
            .zip(&self.y)
            .zip(&self.z)
            .map(|((x, y), z)| (*x, *y, *z))
    }
}

/// Time-indexed table with one column per instrument.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeriesTable {
    pub time: Vec<f64>,
    /// Instrument columns in file order.
    pub columns: Vec<(String, Vec<f64>)>,
}

impl SeriesTable {
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(n, _)| n.as_str())
    }
}

/// Threshold rules, optionally tagged with the instrument they belong to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThresholdTable {
    pub rules: Vec<(Option<String>, ThresholdRule)>,
}

impl ThresholdTable {
    /// Rules for `instrument` in table order; untagged rows apply to all.
    pub fn for_instrument(&self, instrument: &str) -> Vec<ThresholdRule> {
        self.rules
            .iter()
            .filter(|(name, _)| name.as_deref().map_or(true, |n| n == instrument))
            .map(|(_, rule)| rule.clone())
            .collect()
    }
}

/// Parse a numeric cell; blanks and `nan` become NaN.
fn parse_cell(s: &str) -> f64 {
    let s = s.trim();
    if s.is_empty() {
        return f64::NAN;
    }
    s.parse().unwrap_or(f64::NAN)
}

/// Parse a numeric cell that must hold a number.
fn parse_required(s: Option<&str>, what: &str) -> Result<f64> {
    let s = s.map(str::trim).unwrap_or_default();
    s.parse()
        .map_err(|_| LoaderError::ParseError(format!("Invalid {} value: '{}'", what, s)))
}

fn open_csv(path: &Path) -> Result<csv::Reader<BufReader<File>>> {
    let file = File::open(path)?;
    Ok(ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(BufReader::new(file)))
}

/// Case-insensitive lookup of required header columns.
fn require_columns(path: &Path, headers: &StringRecord, names: &[&str]) -> Result<Vec<usize>> {
    let col_map: HashMap<String, usize> = headers
        .iter()
        .enumerate()
        .map(|(i, name)| (name.trim().to_lowercase(), i))
        .collect();

    let mut missing = Vec::new();
    let mut indices = Vec::with_capacity(names.len());
    for name in names {
        match col_map.get(&name.to_lowercase()) {
            Some(&i) => indices.push(i),
            None => missing.push(*name),
        }
    }

    if !missing.is_empty() {
        return Err(LoaderError::MissingColumns {
            path: path.to_path_buf(),
            columns: missing.join(", "),
        });
    }
    Ok(indices)
}

/// Load an instrument table.
///
/// A file whose first line contains a comma is read as a headed CSV with
/// time in the first column. Anything else is treated as a raw logger export:
/// one title line followed by whitespace separated [`LOGGER_COLUMNS`].
pub fn load_series_table<P: AsRef<Path>>(path: P) -> Result<SeriesTable> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let mut lines = BufReader::new(file).lines();

    let first = match lines.next() {
        Some(line) => line?,
        None => return Err(LoaderError::EmptyFile(path.to_path_buf())),
    };

    let table = if first.contains(',') {
        load_csv_table(path)?
    } else {
        let mut time = Vec::new();
        let mut data: Vec<Vec<f64>> = vec![Vec::new(); LOGGER_COLUMNS.len() - 1];
        for line in lines {
            let line = line?;
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.is_empty() {
                continue;
            }
            // A short row keeps its time sample; the missing readings are gaps.
            time.push(parse_required(fields.first().copied(), "Time")?);
            for (i, column) in data.iter_mut().enumerate() {
                column.push(fields.get(i + 1).map_or(f64::NAN, |f| parse_cell(f)));
            }
        }
        SeriesTable {
            time,
            columns: LOGGER_COLUMNS[1..]
                .iter()
                .map(|n| n.to_string())
                .zip(data)
                .collect(),
        }
    };

    if table.time.is_empty() {
        return Err(LoaderError::EmptyFile(path.to_path_buf()));
    }
    Ok(table)
}

fn load_csv_table(path: &Path) -> Result<SeriesTable> {
    let mut reader = open_csv(path)?;
    let headers = reader.headers()?.clone();
    if headers.len() < 2 {
        return Err(LoaderError::MissingColumns {
            path: path.to_path_buf(),
            columns: "time and at least one instrument".to_string(),
        });
    }

    let mut time = Vec::new();
    let mut data: Vec<Vec<f64>> = vec![Vec::new(); headers.len() - 1];
    for result in reader.records() {
        let record = result?;
        time.push(parse_required(record.get(0), "time")?);
        for (i, column) in data.iter_mut().enumerate() {
            column.push(record.get(i + 1).map_or(f64::NAN, parse_cell));
        }
    }

    Ok(SeriesTable {
        time,
        columns: headers
            .iter()
            .skip(1)
            .map(|n| n.to_string())
            .zip(data)
            .collect(),
    })
}

/// Split a `name [unit]` column header.
pub fn parse_unit_header(header: &str) -> Result<(String, Unit)> {
    let pattern = Regex::new(r"^\s*(.*?)\s*\[(.+)\]\s*$")
        .map_err(|e| LoaderError::ParseError(e.to_string()))?;
    let captures = pattern
        .captures(header)
        .ok_or_else(|| LoaderError::ParseError(format!("No unit in header '{}'", header)))?;
    let name = captures[1].to_string();
    let unit = captures[2].parse()?;
    Ok((name, unit))
}

/// Load a processed single-instrument CSV written by
/// [`write_processed_series`](super::writers::write_processed_series).
pub fn load_processed_series<P: AsRef<Path>>(path: P) -> Result<(String, TimeSeries)> {
    let path = path.as_ref();
    let mut reader = open_csv(path)?;
    let headers = reader.headers()?.clone();
    let header = headers.get(1).ok_or_else(|| LoaderError::MissingColumns {
        path: path.to_path_buf(),
        columns: "name [unit]".to_string(),
    })?;
    let (name, unit) = parse_unit_header(header)?;

    let mut time = Vec::new();
    let mut values = Vec::new();
    for result in reader.records() {
        let record = result?;
        time.push(parse_required(record.get(0), "time")?);
        values.push(record.get(1).map_or(f64::NAN, parse_cell));
    }
    if time.is_empty() {
        return Err(LoaderError::EmptyFile(path.to_path_buf()));
    }

    Ok((name, TimeSeries::new(time, values, unit)?))
}

/// Load a `Start,End,Unit,Type,Threshold` rule table.
///
/// An optional `Instrument` column tags rows with the sensor they apply to.
pub fn load_threshold_rules<P: AsRef<Path>>(path: P) -> Result<ThresholdTable> {
    let path = path.as_ref();
    let mut reader = open_csv(path)?;
    let headers = reader.headers()?.clone();
    let idx = require_columns(path, &headers, &["Start", "End", "Unit", "Type", "Threshold"])?;
    let instrument_idx = headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case("instrument"));

    let mut rules = Vec::new();
    for result in reader.records() {
        let record = result?;
        let rule = ThresholdRule {
            time_start: parse_required(record.get(idx[0]), "Start")?,
            time_end: parse_required(record.get(idx[1]), "End")?,
            unit: record.get(idx[2]).unwrap_or_default().parse()?,
            comparison: record.get(idx[3]).unwrap_or_default().parse()?,
            limit: parse_required(record.get(idx[4]), "Threshold")?,
        };
        let instrument = instrument_idx
            .and_then(|i| record.get(i))
            .map(str::to_string)
            .filter(|s| !s.is_empty());
        rules.push((instrument, rule));
    }

    Ok(ThresholdTable { rules })
}

/// Load a scour-depth correction curve with `Time`, `Scour depth` and `Unit`
/// columns. The unit is taken from the first row.
pub fn load_correction_curve<P: AsRef<Path>>(path: P) -> Result<CorrectionCurve> {
    let path = path.as_ref();
    let mut reader = open_csv(path)?;
    let headers = reader.headers()?.clone();
    let idx = require_columns(path, &headers, &["Time", "Scour depth", "Unit"])?;

    let mut time = Vec::new();
    let mut depth = Vec::new();
    let mut unit: Option<Unit> = None;
    for result in reader.records() {
        let record = result?;
        time.push(parse_required(record.get(idx[0]), "Time")?);
        depth.push(record.get(idx[1]).map_or(f64::NAN, parse_cell));
        if unit.is_none() {
            unit = Some(record.get(idx[2]).unwrap_or_default().parse()?);
        }
    }

    let unit = unit.ok_or_else(|| LoaderError::EmptyFile(path.to_path_buf()))?;
    Ok(CorrectionCurve::new(time, depth, unit)?)
}

/// Read a two-column `name,value` file into a map. Blank values are kept
/// as NaN when `allow_blank` is set and rejected otherwise.
fn load_named_values(
    path: &Path,
    has_header: bool,
    allow_blank: bool,
    what: &str,
) -> Result<BTreeMap<String, f64>> {
    let file = File::open(path)?;
    let mut reader = ReaderBuilder::new()
        .has_headers(has_header)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(BufReader::new(file));

    let mut values = BTreeMap::new();
    for result in reader.records() {
        let record = result?;
        let Some(name) = record.get(0).filter(|n| !n.is_empty()) else {
            continue;
        };
        let raw = record.get(1).unwrap_or_default();
        let value = if allow_blank && raw.is_empty() {
            f64::NAN
        } else {
            parse_required(Some(raw), what)?
        };
        values.insert(name.to_string(), value);
    }
    Ok(values)
}

/// Load `Instrument,Reach Time` rows (one header row).
pub fn load_reach_times<P: AsRef<Path>>(path: P) -> Result<BTreeMap<String, f64>> {
    load_named_values(path.as_ref(), true, false, "reach time")
}

/// Load an `Instrument,Depth` scour log (no header). Later lines win.
pub fn load_scour_log<P: AsRef<Path>>(path: P) -> Result<BTreeMap<String, f64>> {
    load_named_values(path.as_ref(), false, true, "scour depth")
}

/// Load a point cloud export with `X,Y,Z` columns (meters).
pub fn load_point_cloud<P: AsRef<Path>>(path: P) -> Result<PointCloud> {
    let path = path.as_ref();
    let mut reader = open_csv(path)?;
    let headers = reader.headers()?.clone();
    let idx = require_columns(path, &headers, &["X", "Y", "Z"])?;

    // Pre-allocate (scans are typically a few hundred thousand points)
    let mut cloud = PointCloud::with_capacity(100_000);
    for result in reader.records() {
        let record = result?;
        cloud.push(
            record.get(idx[0]).map_or(f64::NAN, parse_cell),
            record.get(idx[1]).map_or(f64::NAN, parse_cell),
            record.get(idx[2]).map_or(f64::NAN, parse_cell),
        );
    }

    if cloud.is_empty() {
        return Err(LoaderError::EmptyFile(path.to_path_buf()));
    }
    Ok(cloud)
}

/// Load a footprint override: rows [`FOOTPRINT_ROWS`] × columns `X,Y`.
pub fn load_footprint_override<P: AsRef<Path>>(path: P) -> Result<[[f64; 2]; 4]> {
    let path = path.as_ref();
    let mut reader = open_csv(path)?;
    let headers = reader.headers()?.clone();
    let idx = require_columns(path, &headers, &["X", "Y"])?;

    let mut rows: HashMap<String, [f64; 2]> = HashMap::new();
    for result in reader.records() {
        let record = result?;
        let label = record.get(0).unwrap_or_default().to_lowercase();
        rows.insert(
            label,
            [
                parse_required(record.get(idx[0]), "X")?,
                parse_required(record.get(idx[1]), "Y")?,
            ],
        );
    }

    let missing: Vec<&str> = FOOTPRINT_ROWS
        .iter()
        .copied()
        .filter(|r| !rows.contains_key(&r.to_lowercase()))
        .collect();
    if !missing.is_empty() {
        return Err(LoaderError::MissingColumns {
            path: path.to_path_buf(),
            columns: missing.join(", "),
        });
    }

    let mut corners = [[0.0; 2]; 4];
    for (corner, label) in corners.iter_mut().zip(FOOTPRINT_ROWS) {
        *corner = rows[&label.to_lowercase()];
    }
    Ok(corners)
}

/// Load a list of sample indices, one per line.
pub fn load_index_file<P: AsRef<Path>>(path: P) -> Result<Vec<usize>> {
    let file = File::open(path.as_ref())?;
    let mut indices = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let index = trimmed
            .parse()
            .map_err(|_| LoaderError::ParseError(format!("Invalid index: '{}'", trimmed)))?;
        indices.push(index);
    }
    Ok(indices)
}
