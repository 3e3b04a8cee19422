//! Configuration types for the scour pipeline.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::core::units::ConversionTable;
use crate::surface::patch::RotationPatch;

/// Region-of-interest box in the lab frame.
///
/// `x` and `y` are in meters, `z_max` is applied after the elevation has been
/// scaled by `z_scale` (meters to centimeters by default).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionConfig {
    #[serde(default)]
    pub x_min: f64,

    #[serde(default = "default_x_max")]
    pub x_max: f64,

    #[serde(default = "default_y_min")]
    pub y_min: f64,

    #[serde(default = "default_y_max")]
    pub y_max: f64,

    #[serde(default = "default_z_max")]
    pub z_max: f64,

    /// Factor applied to raw elevations on ingestion
    #[serde(default = "default_z_scale")]
    pub z_scale: f64,
}

fn default_x_max() -> f64 {
    3.3
}

fn default_y_min() -> f64 {
    -1.4
}

fn default_y_max() -> f64 {
    -0.1
}

fn default_z_max() -> f64 {
    0.1
}

fn default_z_scale() -> f64 {
    100.0
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            x_min: 0.0,
            x_max: default_x_max(),
            y_min: default_y_min(),
            y_max: default_y_max(),
            z_max: default_z_max(),
            z_scale: default_z_scale(),
        }
    }
}

impl RegionConfig {
    /// Strict acceptance test for a single (already scaled) sample.
    #[inline]
    pub fn contains(&self, x: f64, y: f64, z: f64) -> bool {
        x > self.x_min && x < self.x_max && y > self.y_min && y < self.y_max && z < self.z_max
    }
}

/// Configuration for surface gridding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    /// Grid nodes along x
    #[serde(default = "default_columns")]
    pub columns: usize,

    /// Grid nodes along y
    #[serde(default = "default_rows")]
    pub rows: usize,

    /// Apply Gaussian smoothing after gridding
    #[serde(default = "default_apply_filter")]
    pub apply_filter: bool,

    /// Gaussian spread in grid cells
    #[serde(default = "default_sigma")]
    pub sigma: f64,

    /// Shadow repairs applied after smoothing, in order
    #[serde(default)]
    pub patches: Vec<RotationPatch>,
}

fn default_columns() -> usize {
    1000
}

fn default_rows() -> usize {
    500
}

fn default_apply_filter() -> bool {
    true
}

fn default_sigma() -> f64 {
    5.0
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            columns: default_columns(),
            rows: default_rows(),
            apply_filter: default_apply_filter(),
            sigma: default_sigma(),
            patches: Vec::new(),
        }
    }
}

/// Fixed geometry of the structure and the flume it sits in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructureConfig {
    /// Structure width (across the flume) per family code
    #[serde(default = "default_widths")]
    pub widths: BTreeMap<String, f64>,

    /// Rotation in degrees per angle code; `None` means "not applicable"
    #[serde(default = "default_angles")]
    pub angles: BTreeMap<String, Option<f64>>,

    #[serde(default = "default_start_x")]
    pub start_x: f64,

    #[serde(default = "default_end_x")]
    pub end_x: f64,

    #[serde(default = "default_channel_width")]
    pub channel_width: f64,

    /// Rotation pivot `[x, y]`
    #[serde(default = "default_pivot")]
    pub pivot: [f64; 2],

    /// The rotated footprint is shifted so its rightmost corner sits here
    #[serde(default = "default_end_x")]
    pub anchor_x: f64,
}

fn default_widths() -> BTreeMap<String, f64> {
    let mut widths = BTreeMap::new();
    widths.insert("SC".to_string(), 0.1);
    widths.insert("SW".to_string(), 0.3);
    widths.insert("LW".to_string(), 0.5);
    widths
}

fn default_angles() -> BTreeMap<String, Option<f64>> {
    let mut angles = BTreeMap::new();
    angles.insert("A0".to_string(), None);
    angles.insert("A1".to_string(), Some(0.0));
    angles.insert("A2".to_string(), Some(-45.0));
    angles.insert("A3".to_string(), Some(90.0));
    angles
}

fn default_start_x() -> f64 {
    1.9
}

fn default_end_x() -> f64 {
    2.0
}

fn default_channel_width() -> f64 {
    1.5
}

fn default_pivot() -> [f64; 2] {
    [1.95, -0.75]
}

impl Default for StructureConfig {
    fn default() -> Self {
        Self {
            widths: default_widths(),
            angles: default_angles(),
            start_x: default_start_x(),
            end_x: default_end_x(),
            channel_width: default_channel_width(),
            pivot: default_pivot(),
            anchor_x: default_end_x(),
        }
    }
}

/// File layout of an experiment directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// Duration in seconds that instrument series are truncated to
    #[serde(default = "default_duration")]
    pub duration: f64,

    #[serde(default = "default_reach_times")]
    pub reach_times: String,

    #[serde(default = "default_scour_dir")]
    pub scour_dir: String,

    #[serde(default = "default_point_cloud")]
    pub point_cloud: String,

    #[serde(default = "default_processed_dir")]
    pub processed_dir: String,

    /// File name of the final scour depth log inside `scour_dir`
    #[serde(default = "default_final_scour_log")]
    pub final_scour_log: String,

    /// Instrument the corner scour curve is attached to
    #[serde(default = "default_corner_instrument")]
    pub corner_instrument: String,

    /// Measured structure corners, used instead of the computed footprint
    #[serde(default = "default_footprint_override")]
    pub footprint_override: String,
}

fn default_duration() -> f64 {
    60.0
}

fn default_reach_times() -> String {
    "Reach Times.csv".to_string()
}

fn default_scour_dir() -> String {
    "Scour Depth".to_string()
}

fn default_point_cloud() -> String {
    "LiDAR/Point Cloud.txt".to_string()
}

fn default_processed_dir() -> String {
    "Processed Data".to_string()
}

fn default_final_scour_log() -> String {
    "Final Scour Depth.csv".to_string()
}

fn default_corner_instrument() -> String {
    "US3".to_string()
}

fn default_footprint_override() -> String {
    "LiDAR/Structure Footprint.csv".to_string()
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            duration: default_duration(),
            reach_times: default_reach_times(),
            scour_dir: default_scour_dir(),
            point_cloud: default_point_cloud(),
            processed_dir: default_processed_dir(),
            final_scour_log: default_final_scour_log(),
            corner_instrument: default_corner_instrument(),
            footprint_override: default_footprint_override(),
        }
    }
}

/// Main pipeline configuration combining all sub-configs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub units: ConversionTable,

    #[serde(default)]
    pub region: RegionConfig,

    #[serde(default)]
    pub grid: GridConfig,

    #[serde(default)]
    pub structure: StructureConfig,

    #[serde(default)]
    pub experiment: ExperimentConfig,
}

impl PipelineConfig {
    /// Load configuration from a YAML file.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: PipelineConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a YAML file.
    pub fn to_yaml<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
