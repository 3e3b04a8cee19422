//! Scour surface: point cloud in, masked elevation grid out.

use std::path::Path;

use log::{debug, info};

use super::footprint::StructureFootprint;
use super::grid::GridSurface;
use super::patch::RotationPatch;
use super::{Result, SurfaceError};
use crate::config::{GridConfig, RegionConfig};
use crate::core::loaders::PointCloud;
use crate::core::writers::{write_scour_depth, LogMode};

/// Scale elevations by `region.z_scale` and keep the points inside the box.
pub fn select_region(cloud: &PointCloud, region: &RegionConfig) -> PointCloud {
    let mut selected = PointCloud::with_capacity(cloud.len());
    for (x, y, z) in cloud.iter() {
        let z = z * region.z_scale;
        if region.contains(x, y, z) {
            selected.push(x, y, z);
        }
    }
    debug!(
        "Region of interest kept {} of {} points",
        selected.len(),
        cloud.len()
    );
    selected
}

/// Gridded bed elevation around one structure.
#[derive(Debug, Clone)]
pub struct ScourSurface {
    grid: GridSurface,
    footprint: StructureFootprint,
    points: usize,
}

impl ScourSurface {
    /// Grid the region-of-interest subset of `cloud` without further edits.
    pub fn from_cloud(
        cloud: &PointCloud,
        footprint: StructureFootprint,
        region: &RegionConfig,
        grid: &GridConfig,
    ) -> Result<Self> {
        let selected = select_region(cloud, region);
        let surface = GridSurface::from_scattered(&selected, grid.columns, grid.rows)
            .map_err(|e| SurfaceError::Triangulation(format!("{:?}", e)))?;

        Ok(Self {
            grid: surface,
            footprint,
            points: selected.len(),
        })
    }

    /// Full pipeline: grid, optional smoothing, configured patches, mask.
    pub fn build(
        cloud: &PointCloud,
        footprint: StructureFootprint,
        region: &RegionConfig,
        grid: &GridConfig,
    ) -> Result<Self> {
        let mut surface = Self::from_cloud(cloud, footprint, region, grid)?;
        if grid.apply_filter {
            surface.smooth(grid.sigma);
        }
        if surface.grid.valid_count() == 0 {
            debug!("Surface is empty, skipping {} patches", grid.patches.len());
        } else {
            for patch in &grid.patches {
                surface.apply_patch(patch)?;
            }
        }
        surface.mask_structure();

        info!(
            "Surface {}x{} from {} points, {} nodes valid",
            surface.grid.columns(),
            surface.grid.rows(),
            surface.points,
            surface.grid.valid_count()
        );
        Ok(surface)
    }

    pub fn grid(&self) -> &GridSurface {
        &self.grid
    }

    pub fn footprint(&self) -> &StructureFootprint {
        &self.footprint
    }

    /// Points that survived the region-of-interest filter.
    pub fn point_count(&self) -> usize {
        self.points
    }

    pub fn smooth(&mut self, sigma: f64) {
        debug!("Gaussian filter, sigma {}", sigma);
        self.grid.gaussian_filter(sigma);
    }

    /// Mirror-repair one block about the structure's center line.
    pub fn apply_patch(&mut self, patch: &RotationPatch) -> Result<usize> {
        let center_y = self.footprint.center()[1];
        let written = patch.apply(&mut self.grid, center_y)?;
        debug!(
            "Patched {} nodes in x [{}, {}] ({:?})",
            written, patch.x_start, patch.x_end, patch.direction
        );
        Ok(written)
    }

    /// Blank the nodes under the structure.
    pub fn mask_structure(&mut self) -> usize {
        let masked = self.grid.mask_polygon(&self.footprint);
        debug!("Masked {} nodes under the structure", masked);
        masked
    }

    /// Elevation at `(x, y)`; NaN outside the grid or next to a gap.
    pub fn depth_at(&self, x: f64, y: f64) -> f64 {
        self.grid.sample(x, y)
    }

    /// Look up the depth at an instrument's position and log it.
    pub fn record_depth(
        &self,
        log_path: &Path,
        instrument: &str,
        x: f64,
        y: f64,
        mode: LogMode,
    ) -> Result<f64> {
        let depth = self.depth_at(x, y);
        write_scour_depth(log_path, instrument, depth, mode)?;
        info!(
            "Final scour depth for {} at ({}, {}): {}",
            instrument, x, y, depth
        );
        Ok(depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::patch::PatchDirection;
    use std::fs;
    use tempfile::tempdir;

    /// Bowl-shaped bed sampled every 5 cm over the region of interest, in meters.
    fn bed_cloud() -> PointCloud {
        let mut cloud = PointCloud::new();
        for i in 1..66 {
            for j in 1..26 {
                let x = i as f64 * 0.05;
                let y = -1.4 + j as f64 * 0.05;
                let z = -0.01 * ((x - 1.95).powi(2) + (y + 0.75).powi(2));
                cloud.push(x, y, z);
            }
        }
        // noise outside the tank
        cloud.push(5.0, -0.5, 0.0);
        cloud.push(1.0, -0.5, 0.5);
        cloud
    }

    fn footprint() -> StructureFootprint {
        StructureFootprint::from_corners([[1.9, -0.7], [2.0, -0.7], [2.0, -0.8], [1.9, -0.8]])
            .unwrap()
    }

    fn small_grid() -> GridConfig {
        GridConfig {
            columns: 120,
            rows: 60,
            apply_filter: false,
            ..GridConfig::default()
        }
    }

    #[test]
    fn test_select_region_scales_and_filters() {
        let selected = select_region(&bed_cloud(), &RegionConfig::default());
        assert_eq!(selected.len(), 65 * 25);
        assert!(selected.x.iter().all(|&x| x < 3.3));
        assert!(selected.z.iter().all(|&z| z < 0.1));
    }

    #[test]
    fn test_build_masks_structure() {
        let surface = ScourSurface::build(
            &bed_cloud(),
            footprint(),
            &RegionConfig::default(),
            &small_grid(),
        )
        .unwrap();

        assert!(surface.depth_at(1.95, -0.75).is_nan());
        let near = surface.depth_at(1.5, -0.75);
        let expected = -(0.45_f64.powi(2));
        assert!((near - expected).abs() < 0.01, "{} vs {}", near, expected);
    }

    #[test]
    fn test_empty_region_tolerated() {
        let mut cloud = PointCloud::new();
        cloud.push(10.0, 10.0, 0.0);
        let surface =
            ScourSurface::build(&cloud, footprint(), &RegionConfig::default(), &small_grid())
                .unwrap();
        assert_eq!(surface.point_count(), 0);
        assert_eq!(surface.grid().valid_count(), 0);
        assert!(surface.depth_at(1.0, -0.5).is_nan());
    }

    #[test]
    fn test_empty_region_skips_patches() {
        let mut cloud = PointCloud::new();
        cloud.push(10.0, 10.0, 0.0);
        let grid = GridConfig {
            patches: vec![RotationPatch {
                x_start: 1.8,
                x_end: 2.2,
                y_offset: 0.3,
                direction: PatchDirection::TopToBottom,
            }],
            ..small_grid()
        };
        let surface =
            ScourSurface::build(&cloud, footprint(), &RegionConfig::default(), &grid).unwrap();
        assert_eq!(surface.grid().valid_count(), 0);
    }

    #[test]
    fn test_configured_patch_applied() {
        // 61 rows put y = -0.75 exactly on row 30, 2 cm apart
        let grid_config = GridConfig {
            rows: 61,
            patches: vec![RotationPatch {
                x_start: 1.0,
                x_end: 1.5,
                y_offset: 0.3,
                direction: PatchDirection::TopToBottom,
            }],
            ..small_grid()
        };
        let surface = ScourSurface::build(
            &bed_cloud(),
            footprint(),
            &RegionConfig::default(),
            &grid_config,
        )
        .unwrap();

        let grid = surface.grid();
        let columns: Vec<usize> = (0..grid.columns())
            .filter(|&c| grid.x()[c] >= 1.0 && grid.x()[c] <= 1.5)
            .collect();
        assert!(!columns.is_empty());
        for &c in &columns {
            for k in 1..=15 {
                assert_eq!(grid.get(30 - k, c), grid.get(30 + k, c), "row offset {}", k);
            }
        }
    }

    #[test]
    fn test_record_depth_modes() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("Final Scour Depth.csv");
        let surface = ScourSurface::build(
            &bed_cloud(),
            footprint(),
            &RegionConfig::default(),
            &small_grid(),
        )
        .unwrap();

        surface
            .record_depth(&log, "US1", 1.5, -0.75, LogMode::Truncate)
            .unwrap();
        surface
            .record_depth(&log, "US2", 1.95, -0.75, LogMode::Append)
            .unwrap();
        let content = fs::read_to_string(&log).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("US1,-"));
        assert_eq!(lines[1], "US2,");

        surface
            .record_depth(&log, "US3", 1.5, -0.75, LogMode::Truncate)
            .unwrap();
        assert_eq!(fs::read_to_string(&log).unwrap().lines().count(), 1);
    }
}
