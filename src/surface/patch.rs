//! Mirror repair of scan shadows on one side of the structure.

use serde::{Deserialize, Serialize};

use super::grid::GridSurface;
use super::SurfaceError;

/// Which half of the block provides the values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PatchDirection {
    /// Copy the half above the centerline onto the half below it
    TopToBottom,
    /// Copy the half below the centerline onto the half above it
    BottomToTop,
}

/// A block `x_start <= x <= x_end` spanning `y_offset` either side of the
/// centerline row, whose occluded half is replaced by the mirror image of
/// the other half.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RotationPatch {
    pub x_start: f64,
    pub x_end: f64,
    pub y_offset: f64,
    pub direction: PatchDirection,
}

impl RotationPatch {
    /// Overwrite the target half of the block. Returns the number of nodes
    /// written.
    ///
    /// Rows are picked by index: `center_y` snaps to the nearest row `c` and
    /// `y_offset` to `n` whole row spacings, then rows `c+1..=c+n` mirror onto
    /// `c-1..=c-n`. The centerline row belongs to neither half. A block the
    /// grid edge cuts short on either side is rejected.
    pub fn apply(&self, grid: &mut GridSurface, center_y: f64) -> Result<usize, SurfaceError> {
        let columns: Vec<usize> = grid
            .x()
            .iter()
            .enumerate()
            .filter(|(_, &x)| x >= self.x_start && x <= self.x_end)
            .map(|(i, _)| i)
            .collect();

        let y = grid.y();
        let rows = y.len() as isize;
        let dy = if y.len() > 1 { y[1] - y[0] } else { 0.0 };
        let half = if dy > 0.0 {
            (self.y_offset / dy).round()
        } else {
            0.0
        };
        if columns.is_empty() || half.is_nan() || half < 1.0 || !center_y.is_finite() {
            return Err(self.empty());
        }
        let center = ((center_y - y[0]) / dy).round() as isize;
        let half = half as isize;

        let in_grid = |r: &isize| (0..rows).contains(r);
        let top: Vec<isize> = (1..=half).map(|k| center + k).filter(in_grid).collect();
        let bottom: Vec<isize> = (1..=half).map(|k| center - k).filter(in_grid).collect();
        if top.is_empty() && bottom.is_empty() {
            return Err(self.empty());
        }

        let (source, target) = match self.direction {
            PatchDirection::TopToBottom => (&top, &bottom),
            PatchDirection::BottomToTop => (&bottom, &top),
        };
        if source.len() != target.len() {
            return Err(SurfaceError::PatchShapeMismatch {
                from: (source.len(), columns.len()),
                to: (target.len(), columns.len()),
            });
        }

        // Both halves are ordered outward from the centerline, so pairing
        // them in order lands each row on its mirror image.
        let mut written = 0;
        for (&from, &to) in source.iter().zip(target.iter()) {
            for &c in &columns {
                if let Some(v) = grid.get(from as usize, c) {
                    grid.set(to as usize, c, v);
                    written += 1;
                }
            }
        }
        Ok(written)
    }

    fn empty(&self) -> SurfaceError {
        SurfaceError::EmptyPatch {
            x_start: self.x_start,
            x_end: self.x_end,
            y_offset: self.y_offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::loaders::PointCloud;

    /// 5 columns over x in [0, 4], 5 rows over y in [-2, 2]; z = 10·row + col.
    fn grid() -> GridSurface {
        let mut cloud = PointCloud::new();
        for r in 0..5 {
            for c in 0..5 {
                cloud.push(c as f64, r as f64 - 2.0, (10 * r + c) as f64);
            }
        }
        GridSurface::from_scattered(&cloud, 5, 5).unwrap()
    }

    fn value(grid: &GridSurface, r: usize, c: usize) -> f64 {
        grid.get(r, c).unwrap().round()
    }

    #[test]
    fn test_top_to_bottom_mirrors_rows() {
        let mut g = grid();
        let patch = RotationPatch {
            x_start: 1.0,
            x_end: 2.0,
            y_offset: 2.0,
            direction: PatchDirection::TopToBottom,
        };
        let written = patch.apply(&mut g, 0.0).unwrap();
        assert_eq!(written, 4);

        // row 4 (y=2) lands on row 0 (y=-2), row 3 on row 1
        assert_eq!(value(&g, 0, 1), 41.0);
        assert_eq!(value(&g, 1, 2), 32.0);
        // outside the x range untouched
        assert_eq!(value(&g, 0, 0), 0.0);
        assert_eq!(value(&g, 0, 3), 3.0);
        // source half and centerline untouched
        assert_eq!(value(&g, 4, 1), 41.0);
        assert_eq!(value(&g, 2, 1), 21.0);
    }

    #[test]
    fn test_bottom_to_top() {
        let mut g = grid();
        let patch = RotationPatch {
            x_start: 0.0,
            x_end: 0.0,
            y_offset: 1.0,
            direction: PatchDirection::BottomToTop,
        };
        assert_eq!(patch.apply(&mut g, 0.0).unwrap(), 1);
        assert_eq!(value(&g, 3, 0), 10.0);
        assert_eq!(value(&g, 4, 0), 40.0);
    }

    #[test]
    fn test_block_cut_by_grid_edge_fails() {
        let mut g = grid();
        let before = g.clone();
        let patch = RotationPatch {
            x_start: 0.0,
            x_end: 4.0,
            y_offset: 2.0,
            direction: PatchDirection::TopToBottom,
        };
        // centerline on row 3: only row 4 lies above it, rows 2 and 1 below
        let err = patch.apply(&mut g, 1.0).unwrap_err();
        assert!(matches!(
            err,
            SurfaceError::PatchShapeMismatch {
                from: (1, 5),
                to: (2, 5)
            }
        ));
        assert_eq!(g, before);
    }

    #[test]
    fn test_off_row_center_snaps_to_nearest_row() {
        let mut g = grid();
        let patch = RotationPatch {
            x_start: 0.0,
            x_end: 4.0,
            y_offset: 1.5,
            direction: PatchDirection::TopToBottom,
        };
        // 0.2 snaps to row 2 (y = 0); 1.5 rounds to two row spacings
        assert_eq!(patch.apply(&mut g, 0.2).unwrap(), 10);
        assert_eq!(value(&g, 1, 4), 34.0);
        assert_eq!(value(&g, 0, 4), 44.0);
    }

    #[test]
    fn test_center_between_rows_never_mismatches() {
        let mut cloud = PointCloud::new();
        for &(x, y) in &[(1.5, -1.35), (2.5, -1.35), (1.5, -0.15), (2.5, -0.15)] {
            cloud.push(x, y, -0.01);
        }
        let grid = GridSurface::from_scattered(&cloud, 50, 500).unwrap();
        let patch = RotationPatch {
            x_start: 1.8,
            x_end: 2.2,
            y_offset: 0.3,
            direction: PatchDirection::TopToBottom,
        };
        for i in 0..20 {
            let center = -0.795 + 0.005 * i as f64;
            let mut g = grid.clone();
            let written = patch
                .apply(&mut g, center)
                .unwrap_or_else(|e| panic!("center {}: {}", center, e));
            assert_eq!(written % 125, 0, "center {}", center);
        }
    }

    #[test]
    fn test_empty_block_fails() {
        let mut g = grid();
        let patch = RotationPatch {
            x_start: 10.0,
            x_end: 11.0,
            y_offset: 1.0,
            direction: PatchDirection::TopToBottom,
        };
        assert!(matches!(
            patch.apply(&mut g, 0.0),
            Err(SurfaceError::EmptyPatch { .. })
        ));
    }
}
