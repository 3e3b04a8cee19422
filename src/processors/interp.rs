//! One-dimensional piecewise-linear interpolation.
//!
//! Two boundary policies are provided: [`linear_clamped`] holds the end values
//! outside the sample span, [`linear_extrapolated`] extends the nearest
//! segment's slope. Both expect `xp` sorted ascending and free of NaN.

/// Index `i` of the segment `xp[i]..=xp[i + 1]` used for `x`.
///
/// Values outside the span map onto the first or last segment.
#[inline]
fn segment(xp: &[f64], x: f64) -> usize {
    let upper = xp.partition_point(|&v| v <= x);
    upper.saturating_sub(1).min(xp.len().saturating_sub(2))
}

#[inline]
fn lerp(x0: f64, x1: f64, y0: f64, y1: f64, x: f64) -> f64 {
    if x1 == x0 {
        return y0;
    }
    y0 + (x - x0) * (y1 - y0) / (x1 - x0)
}

/// Interpolate with the end values held constant outside `xp`.
///
/// Returns NaN when `xp` is empty or `x` is NaN.
pub fn linear_clamped(xp: &[f64], fp: &[f64], x: f64) -> f64 {
    debug_assert_eq!(xp.len(), fp.len());
    if xp.is_empty() || x.is_nan() {
        return f64::NAN;
    }
    let last = xp.len() - 1;
    if x <= xp[0] {
        return fp[0];
    }
    if x >= xp[last] {
        return fp[last];
    }
    let i = segment(xp, x);
    lerp(xp[i], xp[i + 1], fp[i], fp[i + 1], x)
}

/// Interpolate with the outermost segments extended past the ends.
///
/// A single sample yields that constant; an empty table or NaN query yields NaN.
pub fn linear_extrapolated(xp: &[f64], fp: &[f64], x: f64) -> f64 {
    debug_assert_eq!(xp.len(), fp.len());
    match xp.len() {
        _ if x.is_nan() => f64::NAN,
        0 => f64::NAN,
        1 => fp[0],
        _ => {
            let i = segment(xp, x);
            lerp(xp[i], xp[i + 1], fp[i], fp[i + 1], x)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamped_inside_and_outside() {
        let xp = [0.0, 2.0, 4.0];
        let fp = [0.0, 10.0, 0.0];
        assert_eq!(linear_clamped(&xp, &fp, 1.0), 5.0);
        assert_eq!(linear_clamped(&xp, &fp, 3.0), 5.0);
        assert_eq!(linear_clamped(&xp, &fp, 2.0), 10.0);
        assert_eq!(linear_clamped(&xp, &fp, -5.0), 0.0);
        assert_eq!(linear_clamped(&xp, &fp, 9.0), 0.0);
    }

    #[test]
    fn test_extrapolated_extends_slope() {
        let xp = [0.0, 10.0];
        let fp = [0.0, 5.0];
        assert_eq!(linear_extrapolated(&xp, &fp, 15.0), 7.5);
        assert_eq!(linear_extrapolated(&xp, &fp, -10.0), -5.0);
        assert_eq!(linear_extrapolated(&xp, &fp, 10.0), 5.0);
    }

    #[test]
    fn test_extrapolated_uses_outer_segments() {
        let xp = [0.0, 1.0, 2.0];
        let fp = [0.0, 1.0, 3.0];
        // last segment has slope 2
        assert_eq!(linear_extrapolated(&xp, &fp, 3.0), 5.0);
        // first segment has slope 1
        assert_eq!(linear_extrapolated(&xp, &fp, -1.0), -1.0);
    }

    #[test]
    fn test_degenerate_tables() {
        assert!(linear_clamped(&[], &[], 1.0).is_nan());
        assert!(linear_extrapolated(&[], &[], 1.0).is_nan());
        assert_eq!(linear_extrapolated(&[3.0], &[7.0], 100.0), 7.0);
        assert!(linear_extrapolated(&[0.0, 1.0], &[0.0, 1.0], f64::NAN).is_nan());
    }
}
