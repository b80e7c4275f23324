//! Statistical utility functions.
//!
//! Every helper here treats `NaN` as a missing observation unless the name
//! says otherwise.

use crate::error::{Result, StatTestError};
use statrs::distribution::{ChiSquared, ContinuousCDF, Normal};

/// Iterate over the non-missing observations of a series.
pub fn present(values: &[f64]) -> impl Iterator<Item = f64> + '_ {
    values.iter().copied().filter(|v| !v.is_nan())
}

/// Number of non-missing observations.
pub fn count_present(values: &[f64]) -> usize {
    present(values).count()
}

/// Whether any observation is missing.
pub fn has_missing(values: &[f64]) -> bool {
    values.iter().any(|v| v.is_nan())
}

/// Mean of the non-missing observations (`NaN` when there are none).
pub fn nan_mean(values: &[f64]) -> f64 {
    let (sum, count) = present(values).fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        return f64::NAN;
    }
    sum / count as f64
}

/// Variance of the non-missing observations with `ddof` delta degrees of freedom.
///
/// Returns `NaN` when fewer than `ddof + 1` observations are present.
pub fn nan_variance(values: &[f64], ddof: usize) -> f64 {
    let count = count_present(values);
    if count <= ddof {
        return f64::NAN;
    }
    let m = nan_mean(values);
    let sum_sq: f64 = present(values).map(|v| (v - m).powi(2)).sum();
    sum_sq / (count - ddof) as f64
}

/// Population standard deviation of the non-missing observations.
pub fn population_std(values: &[f64]) -> f64 {
    nan_variance(values, 0).sqrt()
}

/// Sample variance (n - 1 denominator) of the non-missing observations.
pub fn sample_variance(values: &[f64]) -> f64 {
    nan_variance(values, 1)
}

/// Upper-tail probability of a chi-square distribution.
///
/// # Arguments
/// * `x` - Test statistic
/// * `df` - Degrees of freedom (must be positive)
pub fn chi2_sf(x: f64, df: usize) -> Result<f64> {
    if df == 0 {
        return Err(StatTestError::InvalidParameter(
            "chi-square degrees of freedom must be positive".to_string(),
        ));
    }
    if x.is_nan() {
        return Ok(f64::NAN);
    }
    if x <= 0.0 {
        return Ok(1.0);
    }
    if x.is_infinite() {
        return Ok(0.0);
    }

    let dist = ChiSquared::new(df as f64)
        .map_err(|e| StatTestError::ComputationError(e.to_string()))?;
    Ok(dist.sf(x))
}

/// Two-sided standard normal critical value for significance level `alpha`.
///
/// # Example
/// ```
/// use ts_stat_tests::utils::stats::normal_critical_value;
///
/// let z = normal_critical_value(0.05).unwrap();
/// assert!((z - 1.96).abs() < 0.01);
/// ```
pub fn normal_critical_value(alpha: f64) -> Result<f64> {
    if !(alpha > 0.0 && alpha < 1.0) {
        return Err(StatTestError::InvalidParameter(format!(
            "alpha must lie in (0, 1), got {alpha}"
        )));
    }
    let normal =
        Normal::new(0.0, 1.0).map_err(|e| StatTestError::ComputationError(e.to_string()))?;
    Ok(normal.inverse_cdf(1.0 - alpha / 2.0))
}
