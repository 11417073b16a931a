//! Piecewise-linear interpolation of sparse key points onto a daily calendar.
//!
//! The x axis is the integer day offset from the calendar's first day, not the
//! date itself. Outside the key range the nearest edge value is held.

use chrono::NaiveDate;

use crate::domain::Calendar;

/// Interpolate `x` over ascending `xp` with values `fp`.
///
/// - `x <= xp[0]` gives `fp[0]`, `x >= xp[last]` gives `fp[last]`
/// - `x` equal to a key point gives that point's value exactly
///
/// `xp` must be non-empty, ascending and the same length as `fp`.
pub fn interp(x: f64, xp: &[f64], fp: &[f64]) -> f64 {
    debug_assert_eq!(xp.len(), fp.len());
    debug_assert!(!xp.is_empty());

    let last = xp.len() - 1;
    if x <= xp[0] {
        return fp[0];
    }
    if x >= xp[last] {
        return fp[last];
    }
    // First index with xp[j] > x; j is in 1..=last here.
    let j = xp.partition_point(|&v| v <= x);
    let i = j - 1;
    if x == xp[i] {
        return fp[i];
    }
    let t = (x - xp[i]) / (xp[j] - xp[i]);
    fp[i] + t * (fp[j] - fp[i])
}

/// One value per calendar day from sparse `(date, value)` points sorted by date.
///
/// Returns an empty vector if `points` is empty.
pub fn interpolate_on_calendar(points: &[(NaiveDate, f64)], calendar: &Calendar) -> Vec<f64> {
    if points.is_empty() {
        return Vec::new();
    }
    let xp: Vec<f64> = points.iter().map(|(d, _)| calendar.offset(*d) as f64).collect();
    let fp: Vec<f64> = points.iter().map(|(_, v)| *v).collect();
    (0..calendar.len()).map(|i| interp(i as f64, &xp, &fp)).collect()
}
