//! Stability and lumpiness of a series over tiled windows.
//!
//! The series is cut into non-overlapping windows of width `freq` (or 10
//! for `freq == 1`); trailing observations that do not fill a window are
//! ignored. Stability is the variance of the window means, lumpiness the
//! variance of the window variances.

use crate::error::{Result, StatTestError};
use crate::utils::stats::{nan_mean, nan_variance};

/// Threshold used by [`is_stable`] and [`is_lumpy`] when none is given.
pub const DEFAULT_ALPHA: f64 = 0.5;

fn window_width(freq: usize) -> Result<usize> {
    match freq {
        0 => Err(StatTestError::InvalidParameter(
            "frequency must be at least 1".to_string(),
        )),
        1 => Ok(10),
        f => Ok(f),
    }
}

/// Sample variance of a statistic computed over every full window.
///
/// Series shorter than two windows have no spread to measure and give 0.
fn tiled_variance(x: &[f64], freq: usize, statistic: impl Fn(&[f64]) -> f64) -> Result<f64> {
    let width = window_width(freq)?;
    if x.len() < 2 * width {
        return Ok(0.0);
    }

    let values: Vec<f64> = x.chunks_exact(width).map(statistic).collect();
    Ok(nan_variance(&values, 1))
}

/// Variance of the means of consecutive windows.
///
/// # Example
/// ```
/// use ts_stat_tests::stability::stability;
///
/// // Window means 1, 2 and 3
/// let x = [1.0, 1.0, 2.0, 2.0, 3.0, 3.0];
/// assert_eq!(stability(&x, 2).unwrap(), 1.0);
/// ```
pub fn stability(x: &[f64], freq: usize) -> Result<f64> {
    tiled_variance(x, freq, nan_mean)
}

/// Variance of the sample variances of consecutive windows.
pub fn lumpiness(x: &[f64], freq: usize) -> Result<f64> {
    tiled_variance(x, freq, |w| nan_variance(w, 1))
}

/// Whether the stability exceeds `alpha`.
pub fn is_stable(x: &[f64], freq: usize, alpha: f64) -> Result<bool> {
    Ok(stability(x, freq)? > alpha)
}

/// Whether the lumpiness exceeds `alpha`.
pub fn is_lumpy(x: &[f64], freq: usize, alpha: f64) -> Result<bool> {
    Ok(lumpiness(x, freq)? > alpha)
}
