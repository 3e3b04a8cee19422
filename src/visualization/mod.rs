//! Rendering of scour surfaces and instrument records.
//!
//! This module draws a heat map of a gridded bed surface with the structure
//! outline on top, and time-series plots of instrument readings, using the
//! plotters bitmap backend.

use std::path::Path;

use plotters::prelude::*;
use plotters_bitmap::BitMapBackend;
use thiserror::Error;

use crate::core::series::TimeSeries;
use crate::surface::ScourSurface;

/// Errors that can occur during visualization.
#[derive(Error, Debug)]
pub enum VisualizationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Plotting error: {0}")]
    PlottingError(String),

    #[error("Surface has no valid nodes")]
    EmptySurface,

    #[error("Series has no valid samples")]
    EmptySeries,
}

/// Result type for visualization operations.
pub type Result<T> = std::result::Result<T, VisualizationError>;

/// Default plot width in pixels.
pub const DEFAULT_WIDTH: u32 = 1920;

/// Default plot height in pixels.
pub const DEFAULT_HEIGHT: u32 = 1080;

/// Erosion end of the color scale.
const SCOUR_COLOR: (u8, u8, u8) = (178, 24, 43);

/// Undisturbed bed.
const NEUTRAL_COLOR: (u8, u8, u8) = (247, 247, 247);

/// Deposition end of the color scale.
const DEPOSIT_COLOR: (u8, u8, u8) = (33, 102, 172);

const SERIES_COLOR: RGBColor = RGBColor(55, 126, 184);
const BED_COLOR: RGBColor = RGBColor(166, 86, 40);

/// Samples per dash (and per gap) of the bed elevation line.
const DASH_LENGTH: usize = 8;

fn plot_err<E: std::fmt::Display>(e: E) -> VisualizationError {
    VisualizationError::PlottingError(e.to_string())
}

fn lerp(a: u8, b: u8, t: f64) -> u8 {
    (a as f64 + (b as f64 - a as f64) * t).round() as u8
}

/// Diverging color for `value` on a scale symmetric about zero.
///
/// Negative values (scour) shade towards red, positive values (deposition)
/// towards blue, saturating at `±limit`.
pub fn depth_color(value: f64, limit: f64) -> RGBColor {
    let limit = if limit > 0.0 { limit } else { 1.0 };
    let t = (value / limit).clamp(-1.0, 1.0);
    let end = if t < 0.0 { SCOUR_COLOR } else { DEPOSIT_COLOR };
    let (n, t) = (NEUTRAL_COLOR, t.abs());
    RGBColor(lerp(n.0, end.0, t), lerp(n.1, end.1, t), lerp(n.2, end.2, t))
}

/// Split a line into alternating drawn pieces, `DASH_LENGTH` samples each.
///
/// NaN samples break the line.
pub fn dashed_segments(points: &[(f64, f64)]) -> Vec<Vec<(f64, f64)>> {
    let mut dashes = Vec::new();
    for run in valid_runs(points) {
        for (i, chunk) in run.chunks(DASH_LENGTH).enumerate() {
            if i % 2 == 0 && chunk.len() > 1 {
                dashes.push(chunk.to_vec());
            }
        }
    }
    dashes
}

/// Maximal runs of consecutive points with a finite value.
fn valid_runs(points: &[(f64, f64)]) -> Vec<Vec<(f64, f64)>> {
    let mut runs = Vec::new();
    let mut current = Vec::new();
    for &(t, v) in points {
        if v.is_finite() && t.is_finite() {
            current.push((t, v));
        } else if !current.is_empty() {
            runs.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }
    runs
}

/// Heat map of the bed surface with the structure outline, saved as PNG.
///
/// Missing nodes (outside the scan, under the structure) stay white.
pub fn plot_surface(output_path: &Path, surface: &ScourSurface, width: u32, height: u32) -> Result<()> {
    let grid = surface.grid();
    let (lo, hi) = grid.value_range().ok_or(VisualizationError::EmptySurface)?;
    let limit = lo.abs().max(hi.abs());

    let (x, y) = (grid.x(), grid.y());
    let (x_min, x_max) = padded(x[0], x[x.len() - 1]);
    let (y_min, y_max) = padded(y[0], y[y.len() - 1]);
    let dx = if x.len() > 1 { (x[1] - x[0]) / 2.0 } else { 0.5 };
    let dy = if y.len() > 1 { (y[1] - y[0]) / 2.0 } else { 0.5 };

    let root = BitMapBackend::new(output_path, (width, height)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .disable_y_mesh()
        .draw()
        .map_err(plot_err)?;

    let columns = grid.columns();
    chart
        .draw_series(grid.values().iter().enumerate().filter_map(|(i, &v)| {
            if v.is_nan() {
                return None;
            }
            let (r, c) = (i / columns, i % columns);
            Some(Rectangle::new(
                [(x[c] - dx, y[r] - dy), (x[c] + dx, y[r] + dy)],
                depth_color(v, limit).filled(),
            ))
        }))
        .map_err(plot_err)?;

    let mut outline: Vec<(f64, f64)> = surface
        .footprint()
        .corners()
        .iter()
        .map(|c| (c[0], c[1]))
        .collect();
    outline.push(outline[0]);
    chart
        .draw_series(std::iter::once(PathElement::new(
            outline,
            BLACK.stroke_width(2),
        )))
        .map_err(plot_err)?;

    root.present().map_err(plot_err)?;
    Ok(())
}

/// Line plot of an instrument record, saved as PNG.
///
/// `bed` is an optional bed elevation on the same time grid, drawn dashed.
pub fn plot_series(
    output_path: &Path,
    series: &TimeSeries,
    bed: Option<&[f64]>,
    width: u32,
    height: u32,
) -> Result<()> {
    let points: Vec<(f64, f64)> = series
        .time()
        .iter()
        .copied()
        .zip(series.values().iter().copied())
        .collect();
    let runs = valid_runs(&points);
    if runs.is_empty() {
        return Err(VisualizationError::EmptySeries);
    }

    let bed_points: Vec<(f64, f64)> = bed
        .map(|b| series.time().iter().copied().zip(b.iter().copied()).collect())
        .unwrap_or_default();

    let all = points.iter().chain(&bed_points).filter(|(_, v)| v.is_finite());
    let (mut t_min, mut t_max) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut v_min, mut v_max) = (f64::INFINITY, f64::NEG_INFINITY);
    for &(t, v) in all {
        t_min = t_min.min(t);
        t_max = t_max.max(t);
        v_min = v_min.min(v);
        v_max = v_max.max(v);
    }
    let (t_min, t_max) = padded(t_min, t_max);
    let (v_min, v_max) = padded(v_min, v_max);

    let root = BitMapBackend::new(output_path, (width, height)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(t_min..t_max, v_min..v_max)
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .disable_y_mesh()
        .draw()
        .map_err(plot_err)?;

    for run in runs {
        chart
            .draw_series(LineSeries::new(run, SERIES_COLOR.stroke_width(2)))
            .map_err(plot_err)?;
    }
    chart
        .draw_series(
            dashed_segments(&bed_points)
                .into_iter()
                .map(|dash| PathElement::new(dash, BED_COLOR.stroke_width(2))),
        )
        .map_err(plot_err)?;

    root.present().map_err(plot_err)?;
    Ok(())
}

/// Add 5% padding, or a unit range when `min == max`.
fn padded(min: f64, max: f64) -> (f64, f64) {
    let span = max - min;
    if span.abs() < f64::EPSILON {
        (min - 1.0, max + 1.0)
    } else {
        (min - span * 0.05, max + span * 0.05)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GridConfig, RegionConfig};
    use crate::core::loaders::PointCloud;
    use crate::core::units::Unit;
    use crate::surface::StructureFootprint;
    use tempfile::tempdir;

    #[test]
    fn test_depth_color_scale() {
        assert_eq!(depth_color(0.0, 5.0), RGBColor(247, 247, 247));
        assert_eq!(depth_color(-5.0, 5.0), RGBColor(178, 24, 43));
        assert_eq!(depth_color(-50.0, 5.0), RGBColor(178, 24, 43));
        assert_eq!(depth_color(5.0, 5.0), RGBColor(33, 102, 172));
        // zero limit falls back to a unit scale
        assert_eq!(depth_color(-1.0, 0.0), RGBColor(178, 24, 43));
    }

    #[test]
    fn test_dashed_segments() {
        let points: Vec<(f64, f64)> = (0..20).map(|i| (i as f64, 1.0)).collect();
        let dashes = dashed_segments(&points);
        // chunks 0..8 and 16..20 are drawn
        assert_eq!(dashes.len(), 2);
        assert_eq!(dashes[0].len(), 8);
        assert_eq!(dashes[1][0], (16.0, 1.0));
    }

    #[test]
    fn test_nan_breaks_line() {
        let points = vec![(0.0, 1.0), (1.0, 2.0), (2.0, f64::NAN), (3.0, 1.0), (4.0, 1.0)];
        let runs = valid_runs(&points);
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[1], vec![(3.0, 1.0), (4.0, 1.0)]);
    }

    #[test]
    fn test_padded() {
        assert_eq!(padded(2.0, 2.0), (1.0, 3.0));
        let (lo, hi) = padded(0.0, 10.0);
        assert!((lo + 0.5).abs() < 1e-12 && (hi - 10.5).abs() < 1e-12);
    }

    #[test]
    fn test_empty_inputs_rejected() {
        let dir = tempdir().unwrap();

        let series = TimeSeries::new(vec![0.0, 1.0], vec![f64::NAN; 2], Unit::Millimeter).unwrap();
        assert!(matches!(
            plot_series(&dir.path().join("s.png"), &series, None, 200, 100),
            Err(VisualizationError::EmptySeries)
        ));

        let footprint =
            StructureFootprint::from_corners([[1.9, -0.7], [2.0, -0.7], [2.0, -0.8], [1.9, -0.8]])
                .unwrap();
        let surface = ScourSurface::build(
            &PointCloud::new(),
            footprint,
            &RegionConfig::default(),
            &GridConfig::default(),
        )
        .unwrap();
        assert!(matches!(
            plot_surface(&dir.path().join("m.png"), &surface, 200, 100),
            Err(VisualizationError::EmptySurface)
        ));
    }
}
