//! Bounded gap filling for NaN runs.

use log::debug;

use super::interp::linear_clamped;

/// Inclusive index range `[start, end]` of consecutive NaN samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NanRun {
    pub start: usize,
    pub end: usize,
}

impl NanRun {
    /// Number of missing samples in the run.
    #[inline]
    pub fn samples(&self) -> usize {
        self.end - self.start + 1
    }
}

/// Find every maximal run of consecutive NaN values.
pub fn find_nan_runs(values: &[f64]) -> Vec<NanRun> {
    let mut runs = Vec::new();
    let mut start: Option<usize> = None;

    for (i, v) in values.iter().enumerate() {
        match (v.is_nan(), start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                runs.push(NanRun { start: s, end: i - 1 });
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        runs.push(NanRun {
            start: s,
            end: values.len() - 1,
        });
    }

    runs
}

/// Fill NaN runs of at most `limit` samples by linear interpolation.
///
/// The interpolant is built over every valid (non-NaN) sample index. Runs that
/// touch either end of the series take the nearest valid value, runs longer
/// than `limit` are left as they are. `None` means no limit. Returns the
/// number of samples filled; a series without any valid sample is untouched.
pub fn fill_gaps(values: &mut [f64], limit: Option<usize>) -> usize {
    let limit = limit.unwrap_or(values.len());

    let (valid_idx, valid_values): (Vec<f64>, Vec<f64>) = values
        .iter()
        .enumerate()
        .filter(|(_, v)| !v.is_nan())
        .map(|(i, v)| (i as f64, *v))
        .unzip();

    if valid_idx.is_empty() {
        return 0;
    }

    let mut filled = 0;
    for run in find_nan_runs(values) {
        if run.samples() > limit {
            debug!(
                "Leaving gap {}..={} ({} samples > limit {})",
                run.start,
                run.end,
                run.samples(),
                limit
            );
            continue;
        }
        for i in run.start..=run.end {
            values[i] = linear_clamped(&valid_idx, &valid_values, i as f64);
        }
        filled += run.samples();
    }

    filled
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAN: f64 = f64::NAN;

    #[test]
    fn test_find_nan_runs() {
        let values = [NAN, 1.0, NAN, NAN, 2.0, NAN];
        let runs = find_nan_runs(&values);
        assert_eq!(
            runs,
            vec![
                NanRun { start: 0, end: 0 },
                NanRun { start: 2, end: 3 },
                NanRun { start: 5, end: 5 },
            ]
        );
        assert!(find_nan_runs(&[1.0, 2.0]).is_empty());
    }

    #[test]
    fn test_flat_gap_between_equal_endpoints() {
        let mut values = [10.0, 10.0, NAN, NAN, 10.0, 10.0];
        let filled = fill_gaps(&mut values, Some(3));
        assert_eq!(filled, 2);
        assert_eq!(values, [10.0; 6]);
    }

    #[test]
    fn test_long_runs_untouched() {
        let mut values = [0.0, NAN, NAN, NAN, 4.0, NAN, 6.0];
        fill_gaps(&mut values, Some(2));
        assert!(values[1].is_nan() && values[2].is_nan() && values[3].is_nan());
        assert_eq!(values[5], 5.0);
    }

    #[test]
    fn test_filled_values_sandwiched() {
        let mut values = [1.0, NAN, NAN, NAN, 9.0];
        fill_gaps(&mut values, None);
        assert_eq!(values, [1.0, 3.0, 5.0, 7.0, 9.0]);
        for w in values.windows(2) {
            assert!(w[0] <= w[1]);
        }
    }

    #[test]
    fn test_edge_runs_take_boundary_value() {
        let mut values = [NAN, NAN, 3.0, 4.0, NAN];
        fill_gaps(&mut values, None);
        assert_eq!(values, [3.0, 3.0, 3.0, 4.0, 4.0]);
    }

    #[test]
    fn test_all_nan_untouched() {
        let mut values = [NAN, NAN];
        assert_eq!(fill_gaps(&mut values, None), 0);
        assert!(values.iter().all(|v| v.is_nan()));
    }
}
