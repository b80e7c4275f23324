//! Cross-correlation function.

use crate::error::{Result, StatTestError};
use crate::utils::fft::lagged_products;
use crate::utils::stats::has_missing;

/// Compute the cross-correlation between two equally long series.
///
/// `ccf[k]` correlates `x[t + k]` with `y[t]`; the output has one entry per
/// lag `0..n`. Standard deviations use the population (`n`) denominator.
///
/// # Arguments
/// * `x`, `y` - Input series without missing values
/// * `adjusted` - Divide lag-k cross products by `n - k` instead of `n`
/// * `fft` - Compute the cross products through the FFT
pub fn ccf(x: &[f64], y: &[f64], adjusted: bool, fft: bool) -> Result<Vec<f64>> {
    let n = x.len();
    if n == 0 {
        return Err(StatTestError::EmptyData);
    }
    if y.len() != n {
        return Err(StatTestError::DimensionMismatch {
            expected: n,
            got: y.len(),
        });
    }
    if has_missing(x) || has_missing(y) {
        return Err(StatTestError::MissingValues);
    }

    let centre = |v: &[f64]| -> Vec<f64> {
        let m = v.iter().sum::<f64>() / n as f64;
        v.iter().map(|a| a - m).collect()
    };
    let xo = centre(x);
    let yo = centre(y);

    let products = if fft {
        lagged_products(&xo, &yo)
    } else {
        (0..n)
            .map(|k| xo[k..].iter().zip(&yo).map(|(a, b)| a * b).sum())
            .collect()
    };

    let sx = (xo.iter().map(|a| a * a).sum::<f64>() / n as f64).sqrt();
    let sy = (yo.iter().map(|b| b * b).sum::<f64>() / n as f64).sqrt();

    Ok(products
        .iter()
        .enumerate()
        .map(|(k, p)| {
            let d = if adjusted { (n - k) as f64 } else { n as f64 };
            p / d / (sx * sy)
        })
        .collect())
}
