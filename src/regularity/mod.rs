//! Regularity of a series measured by entropy.
//!
//! A series whose entropy falls below a tolerance (by default `0.2`
//! population standard deviations) is considered regular.

mod entropy;

pub use entropy::{approx_entropy, default_tolerance, sample_entropy, spectral_entropy, Metric};

use std::str::FromStr;

use crate::error::{Result, StatTestError};

/// Template-based entropy estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntropyAlgorithm {
    /// Sample entropy.
    #[default]
    Sample,
    /// Approximate entropy.
    Approximate,
}

impl FromStr for EntropyAlgorithm {
    type Err = StatTestError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sample" | "sampl" | "samp" => Ok(Self::Sample),
            "app" | "aprox" | "approx" => Ok(Self::Approximate),
            other => Err(StatTestError::InvalidParameter(format!(
                "unknown entropy algorithm '{other}', expected one of \
                 'sample', 'sampl', 'samp', 'app', 'aprox', 'approx'"
            ))),
        }
    }
}

/// Threshold below which the entropy counts as regular.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Tolerance {
    /// `0.2` population standard deviations of the series.
    #[default]
    Default,
    /// A fixed threshold.
    Value(f64),
}

impl Tolerance {
    /// Resolve the threshold for `x`.
    pub fn resolve(self, x: &[f64]) -> f64 {
        match self {
            Self::Default => default_tolerance(x),
            Self::Value(v) => v,
        }
    }
}

impl FromStr for Tolerance {
    type Err = StatTestError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "default" | "none" => Ok(Self::Default),
            _ => trimmed.parse::<f64>().map(Self::Value).map_err(|_| {
                StatTestError::InvalidParameter(format!(
                    "tolerance must be a number or 'default', got '{trimmed}'"
                ))
            }),
        }
    }
}

/// Outcome of [`is_regular`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegularityResult {
    /// Whether the entropy is below the tolerance.
    pub result: bool,
    /// The entropy value.
    pub entropy: f64,
    /// The tolerance it was compared against.
    pub tolerance: f64,
}

/// Compute the entropy of `x` with the chosen algorithm.
pub fn entropy(x: &[f64], order: usize, metric: Metric, algorithm: EntropyAlgorithm) -> Result<f64> {
    match algorithm {
        EntropyAlgorithm::Sample => sample_entropy(x, order, metric),
        EntropyAlgorithm::Approximate => approx_entropy(x, order, metric),
    }
}

/// Check whether `x` is regular.
///
/// # Example
/// ```
/// use ts_stat_tests::regularity::{is_regular, EntropyAlgorithm, Metric, Tolerance};
///
/// let x: Vec<f64> = (0..120).map(|t| 10.0 * ((t % 4) as f64)).collect();
/// let verdict = is_regular(&x, 2, Metric::Chebyshev, EntropyAlgorithm::Sample, Tolerance::Default)
///     .unwrap();
/// assert!(verdict.result);
/// ```
pub fn is_regular(
    x: &[f64],
    order: usize,
    metric: Metric,
    algorithm: EntropyAlgorithm,
    tolerance: Tolerance,
) -> Result<RegularityResult> {
    let value = entropy(x, order, metric, algorithm)?;
    let tolerance = tolerance.resolve(x);

    Ok(RegularityResult {
        result: value < tolerance,
        entropy: value,
        tolerance,
    })
}
