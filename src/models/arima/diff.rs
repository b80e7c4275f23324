//! Differencing utilities for ARIMA models.

use crate::utils::stats::sample_variance;

/// Apply differencing to a time series.
///
/// # Arguments
/// * `series` - The input series
/// * `d` - Differencing order (number of times to difference)
///
/// # Returns
/// The differenced series; each pass shortens it by one. Missing values
/// propagate into both neighbouring differences.
pub fn difference(series: &[f64], d: usize) -> Vec<f64> {
    let mut result = series.to_vec();
    for _ in 0..d {
        if result.len() <= 1 {
            return Vec::new();
        }
        result = result.windows(2).map(|w| w[1] - w[0]).collect();
    }
    result
}

/// Apply seasonal differencing to a time series.
///
/// # Arguments
/// * `series` - The input series
/// * `d` - Seasonal differencing order
/// * `period` - Seasonal period
pub fn seasonal_difference(series: &[f64], d: usize, period: usize) -> Vec<f64> {
    if d == 0 || period == 0 {
        return series.to_vec();
    }

    let mut result = series.to_vec();
    for _ in 0..d {
        if result.len() <= period {
            return Vec::new();
        }
        result = result
            .iter()
            .skip(period)
            .zip(result.iter())
            .map(|(curr, prev)| curr - prev)
            .collect();
    }
    result
}

/// Suggest a non-seasonal differencing order (0, 1 or 2) from the variance
/// reduction each difference achieves.
pub fn suggest_differencing(series: &[f64]) -> usize {
    if series.len() < 3 {
        return 0;
    }

    let var_0 = sample_variance(series);
    let diff_1 = difference(series, 1);
    let var_1 = sample_variance(&diff_1);

    if !(var_0 > 0.0) || !(var_1 / var_0 < 0.9) {
        return 0;
    }

    let diff_2 = difference(&diff_1, 1);
    if diff_2.len() >= 2 {
        let var_2 = sample_variance(&diff_2);
        if var_2 / var_1 < 0.9 && var_2 < var_0 {
            return 2;
        }
    }
    1
}

/// Suggest a seasonal differencing order (0 or 1): difference when removing
/// the seasonal lag shrinks the population variance by more than 30%.
pub fn suggest_seasonal_differencing(series: &[f64], period: usize) -> usize {
    if period < 2 || series.len() < 2 * period {
        return 0;
    }

    let population_var = |v: &[f64]| {
        let m = v.iter().sum::<f64>() / v.len() as f64;
        v.iter().map(|x| (x - m).powi(2)).sum::<f64>() / v.len() as f64
    };

    let seasonal_diffs = seasonal_difference(series, 1, period);
    if population_var(&seasonal_diffs) < population_var(series) * 0.7 {
        1
    } else {
        0
    }
}
