//! Regular elevation grid built from scattered scan returns.
//!
//! Nodes are stored row-major: row `r` has `y[r]`, column `c` has `x[c]`,
//! and rows run from the smallest to the largest y. Missing nodes are NaN.

use geo::{Contains, Point};
use log::debug;
use rayon::prelude::*;
use spade::{
    DelaunayTriangulation, FloatTriangulation, HasPosition, InsertionError, Point2, Triangulation,
};

use super::footprint::StructureFootprint;
use crate::core::loaders::PointCloud;

/// Node count of the kernel's half width per unit of sigma.
const GAUSSIAN_TRUNCATE: f64 = 4.0;

struct Sample {
    position: Point2<f64>,
    z: f64,
}

impl HasPosition for Sample {
    type Scalar = f64;

    fn position(&self) -> Point2<f64> {
        self.position
    }
}

/// `n` evenly spaced values from `start` to `end` inclusive.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { end } else { start + step * i as f64 })
                .collect()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridSurface {
    x: Vec<f64>,
    y: Vec<f64>,
    z: Vec<f64>,
}

impl GridSurface {
    /// A `rows × columns` grid with every node missing.
    pub fn empty(columns: usize, rows: usize) -> Self {
        Self {
            x: vec![0.0; columns],
            y: vec![0.0; rows],
            z: vec![f64::NAN; columns * rows],
        }
    }

    /// Linear interpolation of `cloud` onto a grid spanning its x/y extent.
    ///
    /// Nodes outside the convex hull of the samples stay missing. An empty
    /// cloud gives an all-missing grid.
    pub fn from_scattered(
        cloud: &PointCloud,
        columns: usize,
        rows: usize,
    ) -> Result<Self, InsertionError> {
        let samples: Vec<(f64, f64, f64)> = cloud
            .iter()
            .filter(|(x, y, z)| x.is_finite() && y.is_finite() && z.is_finite())
            .collect();
        if samples.is_empty() {
            debug!("No samples to grid, surface is empty");
            return Ok(Self::empty(columns, rows));
        }

        let (mut x_min, mut x_max) = (f64::INFINITY, f64::NEG_INFINITY);
        let (mut y_min, mut y_max) = (f64::INFINITY, f64::NEG_INFINITY);
        for &(x, y, _) in &samples {
            x_min = x_min.min(x);
            x_max = x_max.max(x);
            y_min = y_min.min(y);
            y_max = y_max.max(y);
        }

        let mut triangulation: DelaunayTriangulation<Sample> = DelaunayTriangulation::new();
        for (x, y, z) in samples {
            triangulation.insert(Sample {
                position: Point2::new(x, y),
                z,
            })?;
        }
        debug!(
            "Triangulated {} vertices into {} faces",
            triangulation.num_vertices(),
            triangulation.num_inner_faces()
        );

        let x = linspace(x_min, x_max, columns);
        let y = linspace(y_min, y_max, rows);
        let mut z = vec![f64::NAN; columns * rows];
        if columns > 0 {
            z.par_chunks_mut(columns).enumerate().for_each_init(
                || triangulation.barycentric(),
                |barycentric, (r, row)| {
                    for (c, node) in row.iter_mut().enumerate() {
                        *node = barycentric
                            .interpolate(|v| v.data().z, Point2::new(x[c], y[r]))
                            .unwrap_or(f64::NAN);
                    }
                },
            );
        }

        Ok(Self { x, y, z })
    }

    #[inline]
    pub fn columns(&self) -> usize {
        self.x.len()
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.y.len()
    }

    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn y(&self) -> &[f64] {
        &self.y
    }

    /// All nodes, row-major.
    pub fn values(&self) -> &[f64] {
        &self.z
    }

    #[inline]
    pub fn get(&self, row: usize, column: usize) -> Option<f64> {
        if row < self.rows() && column < self.columns() {
            Some(self.z[row * self.columns() + column])
        } else {
            None
        }
    }

    #[inline]
    pub fn set(&mut self, row: usize, column: usize, value: f64) {
        let columns = self.columns();
        if row < self.rows() && column < columns {
            self.z[row * columns + column] = value;
        }
    }

    /// Count of nodes holding a value.
    pub fn valid_count(&self) -> usize {
        self.z.iter().filter(|v| !v.is_nan()).count()
    }

    /// (min, max) over valid nodes, `None` when every node is missing.
    pub fn value_range(&self) -> Option<(f64, f64)> {
        self.z
            .iter()
            .filter(|v| !v.is_nan())
            .fold(None, |acc, &v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    /// Separable Gaussian smoothing with `sigma` in grid cells.
    ///
    /// The kernel is truncated at 4σ and the edges are mirrored about the
    /// half sample. Missing nodes spread over the kernel footprint.
    pub fn gaussian_filter(&mut self, sigma: f64) {
        if sigma <= 0.0 || self.z.is_empty() {
            return;
        }
        let kernel = gaussian_kernel(sigma);
        let (rows, columns) = (self.rows(), self.columns());

        // along y
        let source = self.z.clone();
        self.z
            .par_chunks_mut(columns)
            .enumerate()
            .for_each(|(r, row)| {
                for (c, node) in row.iter_mut().enumerate() {
                    *node = convolve_at(&kernel, r, rows, |i| source[i * columns + c]);
                }
            });

        // along x
        self.z.par_chunks_mut(columns).for_each(|row| {
            let line = row.to_vec();
            for (c, node) in row.iter_mut().enumerate() {
                *node = convolve_at(&kernel, c, columns, |i| line[i]);
            }
        });
    }

    /// Set nodes inside `footprint` to missing. Returns how many were inside.
    pub fn mask_polygon(&mut self, footprint: &StructureFootprint) -> usize {
        let columns = self.columns();
        if columns == 0 {
            return 0;
        }
        let polygon = footprint.polygon();
        let (x, y) = (&self.x, &self.y);
        self.z
            .par_chunks_mut(columns)
            .enumerate()
            .map(|(r, row)| {
                let mut masked = 0;
                for (c, node) in row.iter_mut().enumerate() {
                    if !x[c].is_nan()
                        && !y[r].is_nan()
                        && polygon.contains(&Point::new(x[c], y[r]))
                    {
                        *node = f64::NAN;
                        masked += 1;
                    }
                }
                masked
            })
            .sum()
    }

    /// Bilinear lookup at `(x, y)`.
    ///
    /// Points outside the grid, or next to a missing node, give NaN.
    pub fn sample(&self, x: f64, y: f64) -> f64 {
        let (Some((c, tx)), Some((r, ty))) = (locate(&self.x, x), locate(&self.y, y)) else {
            return f64::NAN;
        };
        let columns = self.columns();
        let at = |row: usize, col: usize| self.z[row * columns + col];
        let c1 = (c + 1).min(columns - 1);
        let r1 = (r + 1).min(self.rows() - 1);

        let bottom = at(r, c) * (1.0 - tx) + at(r, c1) * tx;
        let top = at(r1, c) * (1.0 - tx) + at(r1, c1) * tx;
        bottom * (1.0 - ty) + top * ty
    }
}

/// Cell index and fractional offset of `v` on an increasing axis.
fn locate(axis: &[f64], v: f64) -> Option<(usize, f64)> {
    let (&first, &last) = (axis.first()?, axis.last()?);
    if v.is_nan() || v < first || v > last {
        return None;
    }
    if axis.len() == 1 {
        return Some((0, 0.0));
    }
    if last <= first {
        return None;
    }

    let i = axis
        .partition_point(|&a| a <= v)
        .saturating_sub(1)
        .min(axis.len() - 2);
    let span = axis[i + 1] - axis[i];
    let t = if span > 0.0 { (v - axis[i]) / span } else { 0.0 };
    Some((i, t))
}

fn gaussian_kernel(sigma: f64) -> Vec<f64> {
    let radius = (GAUSSIAN_TRUNCATE * sigma + 0.5) as isize;
    let mut weights: Vec<f64> = (-radius..=radius)
        .map(|i| (-0.5 * (i as f64 / sigma).powi(2)).exp())
        .collect();
    let total: f64 = weights.iter().sum();
    weights.iter_mut().for_each(|w| *w /= total);
    weights
}

/// Mirror `i` into `0..n`, repeating the edge sample (`d c b a | a b c d`).
#[inline]
fn reflect_index(i: isize, n: usize) -> usize {
    let period = 2 * n as isize;
    let m = i.rem_euclid(period);
    if m < n as isize {
        m as usize
    } else {
        (period - 1 - m) as usize
    }
}

fn convolve_at<F: Fn(usize) -> f64>(kernel: &[f64], center: usize, n: usize, value: F) -> f64 {
    let radius = (kernel.len() / 2) as isize;
    kernel
        .iter()
        .enumerate()
        .map(|(k, w)| w * value(reflect_index(center as isize + k as isize - radius, n)))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Plane z = x + 2y sampled on a 5×5 lattice over [0,1]².
    fn plane_cloud() -> PointCloud {
        let mut cloud = PointCloud::new();
        for i in 0..5 {
            for j in 0..5 {
                let (x, y) = (i as f64 / 4.0, j as f64 / 4.0);
                cloud.push(x, y, x + 2.0 * y);
            }
        }
        cloud
    }

    #[test]
    fn test_linspace() {
        assert_eq!(linspace(0.0, 1.0, 5), vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(linspace(2.0, 3.0, 1), vec![2.0]);
        assert!(linspace(0.0, 1.0, 0).is_empty());
    }

    #[test]
    fn test_plane_is_reproduced() {
        let grid = GridSurface::from_scattered(&plane_cloud(), 11, 7).unwrap();
        assert_eq!(grid.columns(), 11);
        assert_eq!(grid.rows(), 7);
        assert_eq!(grid.valid_count(), 77);
        for r in 0..grid.rows() {
            for c in 0..grid.columns() {
                let expected = grid.x()[c] + 2.0 * grid.y()[r];
                assert!((grid.get(r, c).unwrap() - expected).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_outside_hull_is_missing() {
        let mut cloud = PointCloud::new();
        cloud.push(0.0, 0.0, 1.0);
        cloud.push(1.0, 0.0, 1.0);
        cloud.push(0.0, 1.0, 1.0);
        let grid = GridSurface::from_scattered(&cloud, 3, 3).unwrap();

        assert!((grid.get(0, 0).unwrap() - 1.0).abs() < 1e-12);
        assert!(grid.get(2, 2).unwrap().is_nan());
    }

    #[test]
    fn test_empty_cloud_gives_missing_surface() {
        let grid = GridSurface::from_scattered(&PointCloud::new(), 4, 3).unwrap();
        assert_eq!(grid.values().len(), 12);
        assert_eq!(grid.valid_count(), 0);
        assert!(grid.sample(0.0, 0.0).is_nan());
        assert_eq!(grid.value_range(), None);
    }

    #[test]
    fn test_gaussian_preserves_constant() {
        let mut grid = GridSurface::empty(6, 4);
        grid.z.iter_mut().for_each(|v| *v = 3.0);
        grid.gaussian_filter(1.5);
        assert!(grid.values().iter().all(|v| (v - 3.0).abs() < 1e-12));
    }

    #[test]
    fn test_gaussian_kernel_shape() {
        let kernel = gaussian_kernel(5.0);
        assert_eq!(kernel.len(), 41);
        assert!((kernel.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(kernel[20] > kernel[19]);
    }

    #[test]
    fn test_gaussian_spreads_missing() {
        let mut grid = GridSurface::empty(9, 1);
        grid.z = vec![1.0; 9];
        grid.z[4] = f64::NAN;
        grid.gaussian_filter(0.5);
        // radius = int(4 * 0.5 + 0.5) = 2
        assert!(grid.values()[2..7].iter().all(|v| v.is_nan()));
        assert!(!grid.values()[1].is_nan());
        assert!(!grid.values()[7].is_nan());
    }

    #[test]
    fn test_reflect_index() {
        assert_eq!(reflect_index(-1, 4), 0);
        assert_eq!(reflect_index(-2, 4), 1);
        assert_eq!(reflect_index(4, 4), 3);
        assert_eq!(reflect_index(5, 4), 2);
        assert_eq!(reflect_index(7, 1), 0);
    }

    #[test]
    fn test_bilinear_sample() {
        let grid = GridSurface::from_scattered(&plane_cloud(), 5, 5).unwrap();
        assert!((grid.sample(0.3, 0.6) - 1.5).abs() < 1e-9);
        assert!((grid.sample(1.0, 1.0) - 3.0).abs() < 1e-9);
        assert!(grid.sample(1.1, 0.5).is_nan());
        assert!(grid.sample(f64::NAN, 0.5).is_nan());
    }

    #[test]
    fn test_mask_polygon() {
        let mut grid = GridSurface::from_scattered(&plane_cloud(), 21, 21).unwrap();
        let before = grid.clone();
        let fp =
            StructureFootprint::from_corners([[0.4, 0.6], [0.6, 0.6], [0.6, 0.4], [0.4, 0.4]])
                .unwrap();

        let masked = grid.mask_polygon(&fp);
        assert!(masked > 0);
        for r in 0..grid.rows() {
            for c in 0..grid.columns() {
                let v = grid.get(r, c).unwrap();
                if fp.contains(grid.x()[c], grid.y()[r]) {
                    assert!(v.is_nan());
                } else {
                    assert_eq!(v, before.get(r, c).unwrap());
                }
            }
        }
    }
}
