//! Entropy estimators for time series regularity.

use std::str::FromStr;

use crate::error::{Result, StatTestError};
use crate::utils::fft::periodogram;
use crate::utils::stats::{has_missing, population_std};

/// Distance between embedded templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Metric {
    /// Maximum absolute coordinate difference.
    #[default]
    Chebyshev,
    /// Euclidean distance.
    Euclidean,
}

impl Metric {
    fn distance(self, a: &[f64], b: &[f64]) -> f64 {
        let diffs = a.iter().zip(b).map(|(x, y)| (x - y).abs());
        match self {
            Self::Chebyshev => diffs.fold(0.0, f64::max),
            Self::Euclidean => diffs.map(|d| d * d).sum::<f64>().sqrt(),
        }
    }
}

impl FromStr for Metric {
    type Err = StatTestError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "chebyshev" => Ok(Self::Chebyshev),
            "euclidean" => Ok(Self::Euclidean),
            other => Err(StatTestError::InvalidParameter(format!(
                "unknown metric '{other}', expected 'chebyshev' or 'euclidean'"
            ))),
        }
    }
}

/// Shared validation of the template-based estimators.
fn validate(x: &[f64], order: usize) -> Result<()> {
    if order == 0 {
        return Err(StatTestError::InvalidParameter(
            "embedding order must be at least 1".to_string(),
        ));
    }
    if x.len() < order + 2 {
        return Err(StatTestError::InsufficientData {
            needed: order + 2,
            got: x.len(),
        });
    }
    if has_missing(x) {
        return Err(StatTestError::MissingValues);
    }
    Ok(())
}

/// Default similarity radius: `0.2` population standard deviations.
pub fn default_tolerance(x: &[f64]) -> f64 {
    0.2 * population_std(x)
}

/// Count template pairs `i < j` among the first `n_templates` templates of
/// length `m` that lie within `r` of each other.
fn count_pairs(x: &[f64], m: usize, n_templates: usize, r: f64, metric: Metric) -> usize {
    let within = |d: f64| match metric {
        Metric::Chebyshev => d < r,
        Metric::Euclidean => d <= r,
    };

    let mut count = 0;
    for i in 0..n_templates {
        for j in (i + 1)..n_templates {
            if within(metric.distance(&x[i..i + m], &x[j..j + m])) {
                count += 1;
            }
        }
    }
    count
}

/// Sample entropy.
///
/// `-ln(A / B)`, where `B` counts pairs of length-`order` templates within
/// `r = 0.2 * std(x)` and `A` the same pairs extended by one point. Both
/// counts use the first `n - order` templates and exclude self-matches. A
/// series with no matching templates has entropy 0; matches that never
/// extend give `+inf`.
///
/// # Example
/// ```
/// use ts_stat_tests::regularity::{sample_entropy, Metric};
///
/// let periodic: Vec<f64> = (0..60).map(|t| (t % 3) as f64).collect();
/// let value = sample_entropy(&periodic, 2, Metric::Chebyshev).unwrap();
/// assert!(value.abs() < 1e-12);
/// ```
pub fn sample_entropy(x: &[f64], order: usize, metric: Metric) -> Result<f64> {
    validate(x, order)?;

    let r = default_tolerance(x);
    let n_templates = x.len() - order;
    let b = count_pairs(x, order, n_templates, r, metric);
    let a = count_pairs(x, order + 1, n_templates, r, metric);

    Ok(match (a, b) {
        (_, 0) => 0.0,
        (0, _) => f64::INFINITY,
        (a, b) => -(a as f64 / b as f64).ln(),
    })
}

/// Approximate entropy.
///
/// `phi(order) - phi(order + 1)` with
/// `phi(m) = mean_i ln(C_i(m) / (n - m + 1))`, where `C_i(m)` counts the
/// templates within `r = 0.2 * std(x)` of template `i`, itself included.
pub fn approx_entropy(x: &[f64], order: usize, metric: Metric) -> Result<f64> {
    validate(x, order)?;

    let r = default_tolerance(x);
    Ok(phi(x, order, r, metric) - phi(x, order + 1, r, metric))
}

fn phi(x: &[f64], m: usize, r: f64, metric: Metric) -> f64 {
    let n_templates = x.len() - m + 1;
    let mut sum = 0.0;

    for i in 0..n_templates {
        let count = (0..n_templates)
            .filter(|&j| metric.distance(&x[i..i + m], &x[j..j + m]) <= r)
            .count();
        sum += (count as f64 / n_templates as f64).ln();
    }

    sum / n_templates as f64
}

/// Spectral entropy.
///
/// Shannon entropy, in bits, of the normalised one-sided periodogram.
/// With `normalize` the value is divided by `log2` of the number of
/// frequency bins, so it lies in `[0, 1]`.
///
/// # Arguments
/// * `x` - Input series
/// * `sf` - Sampling frequency
/// * `normalize` - Scale the entropy to `[0, 1]`
pub fn spectral_entropy(x: &[f64], sf: f64, normalize: bool) -> Result<f64> {
    if x.is_empty() {
        return Err(StatTestError::EmptyData);
    }
    if has_missing(x) {
        return Err(StatTestError::MissingValues);
    }
    if !(sf > 0.0 && sf.is_finite()) {
        return Err(StatTestError::InvalidParameter(format!(
            "sampling frequency must be positive, got {sf}"
        )));
    }

    let psd = periodogram(x, sf);
    let total: f64 = psd.iter().sum();
    if !(total > 0.0) {
        return Err(StatTestError::DegenerateSeries(
            "the power spectrum is identically zero".to_string(),
        ));
    }

    let entropy = -psd
        .iter()
        .map(|p| p / total)
        .filter(|&p| p > 0.0)
        .map(|p| p * p.log2())
        .sum::<f64>();

    if normalize && psd.len() > 1 {
        Ok(entropy / (psd.len() as f64).log2())
    } else {
        Ok(entropy)
    }
}
