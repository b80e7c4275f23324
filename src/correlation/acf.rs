//! Sample autocorrelation function.

use std::str::FromStr;

use crate::error::{Result, StatTestError};
use crate::utils::fft::lagged_products;
use crate::utils::stats::{chi2_sf, count_present, has_missing, nan_mean, normal_critical_value};

/// How missing observations (`NaN`) are handled when computing correlations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingPolicy {
    /// No special handling; a missing value makes the result `NaN`.
    #[default]
    None,
    /// Fail with [`StatTestError::MissingValues`].
    Raise,
    /// Pairwise deletion: lagged pairs touching a missing value are skipped.
    /// Listwise deletion is not offered.
    Drop,
}

impl FromStr for MissingPolicy {
    type Err = StatTestError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "raise" => Ok(Self::Raise),
            "drop" => Ok(Self::Drop),
            other => Err(StatTestError::InvalidParameter(format!(
                "unknown missing-value policy '{other}', expected one of: none, raise, drop"
            ))),
        }
    }
}

/// Options for [`acf`].
#[derive(Debug, Clone, PartialEq)]
pub struct AcfConfig {
    /// Divide lag-k autocovariances by the number of contributing pairs instead of `n`.
    pub adjusted: bool,
    /// Number of lags; defaults to `min(10 * log10(n), n - 1)`.
    pub nlags: Option<usize>,
    /// Also compute Ljung-Box statistics and p-values for every lag.
    pub qstat: bool,
    /// Compute autocovariances through the FFT.
    pub fft: bool,
    /// Significance level for confidence intervals.
    pub alpha: Option<f64>,
    /// Use Bartlett's formula for the interval width.
    pub bartlett_confint: bool,
    /// Missing-value handling.
    pub missing: MissingPolicy,
}

impl Default for AcfConfig {
    fn default() -> Self {
        Self {
            adjusted: false,
            nlags: None,
            qstat: false,
            fft: true,
            alpha: None,
            bartlett_confint: true,
            missing: MissingPolicy::None,
        }
    }
}

impl AcfConfig {
    /// Set the number of lags.
    pub fn with_nlags(mut self, nlags: usize) -> Self {
        self.nlags = Some(nlags);
        self
    }

    /// Set the missing-value policy.
    pub fn with_missing(mut self, missing: MissingPolicy) -> Self {
        self.missing = missing;
        self
    }

    /// Request confidence intervals at significance level `alpha`.
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = Some(alpha);
        self
    }

    /// Request Ljung-Box statistics.
    pub fn with_qstat(mut self) -> Self {
        self.qstat = true;
        self
    }

    /// Use the adjusted (n - k) denominator.
    pub fn adjusted(mut self) -> Self {
        self.adjusted = true;
        self
    }

    /// Sum lagged products directly instead of through the FFT.
    pub fn direct(mut self) -> Self {
        self.fft = false;
        self
    }
}

/// Output of [`acf`].
#[derive(Debug, Clone, PartialEq)]
pub struct AcfResult {
    /// Autocorrelations for lags `0..=nlags`; `acf[0] == 1`.
    pub acf: Vec<f64>,
    /// Confidence intervals, one `(lower, upper)` pair per lag.
    pub confint: Option<Vec<(f64, f64)>>,
    /// Ljung-Box statistic for lags `1..=nlags`.
    pub qstat: Option<Vec<f64>>,
    /// Chi-square p-values of the Ljung-Box statistics.
    pub pvalues: Option<Vec<f64>>,
}

/// Default lag count, `min(floor(10 log10 n), n - 1)`.
pub(crate) fn default_nlags(nobs: usize) -> usize {
    let by_log = (10.0 * (nobs as f64).log10()).floor().max(0.0) as usize;
    by_log.min(nobs.saturating_sub(1))
}

/// Autocovariances for lags `0..=nlags`.
///
/// Deviations are taken from the mean of the present observations; with
/// [`MissingPolicy::Drop`] a pair contributes only if both of its members are
/// present and the normalisation uses the present count (or the pair count
/// when `adjusted`).
pub fn autocovariance(
    x: &[f64],
    nlags: usize,
    adjusted: bool,
    fft: bool,
    missing: MissingPolicy,
) -> Result<Vec<f64>> {
    let n = x.len();
    if n == 0 {
        return Err(StatTestError::EmptyData);
    }
    if nlags >= n {
        return Err(StatTestError::InvalidParameter(format!(
            "nlags must be smaller than the series length ({n}), got {nlags}"
        )));
    }

    let masked = missing == MissingPolicy::Drop && has_missing(x);
    match missing {
        MissingPolicy::Raise if has_missing(x) => return Err(StatTestError::MissingValues),
        MissingPolicy::None if has_missing(x) => return Ok(vec![f64::NAN; nlags + 1]),
        _ => {}
    }

    let m = nan_mean(x);
    let deviations: Vec<f64> = x
        .iter()
        .map(|&v| if v.is_nan() { 0.0 } else { v - m })
        .collect();

    let products: Vec<f64> = if fft {
        let mut p = lagged_products(&deviations, &deviations);
        p.truncate(nlags + 1);
        p
    } else {
        (0..=nlags)
            .map(|k| {
                deviations[k..]
                    .iter()
                    .zip(&deviations)
                    .map(|(a, b)| a * b)
                    .sum()
            })
            .collect()
    };

    let present = count_present(x);
    let acov = products
        .iter()
        .enumerate()
        .map(|(k, &p)| {
            let denom = match (adjusted, masked) {
                (false, false) => n as f64,
                (false, true) => present as f64,
                (true, false) => (n - k) as f64,
                (true, true) => x[k..]
                    .iter()
                    .zip(x)
                    .filter(|(a, b)| !a.is_nan() && !b.is_nan())
                    .count() as f64,
            };
            p / denom
        })
        .collect();

    Ok(acov)
}

/// Ljung-Box statistics for the autocorrelations `r[1..]` of `nobs` observations.
pub(crate) fn ljung_box_q(acf: &[f64], nobs: usize) -> Vec<f64> {
    let n = nobs as f64;
    let mut running = 0.0;
    acf.iter()
        .enumerate()
        .skip(1)
        .map(|(k, r)| {
            running += r * r / (n - k as f64);
            n * (n + 2.0) * running
        })
        .collect()
}

/// Compute the sample autocorrelation function.
///
/// # Arguments
/// * `x` - Input series; `NaN` marks a missing observation
/// * `config` - Lag count, missing-value policy and optional extras
///
/// # Example
/// ```
/// use ts_stat_tests::correlation::{acf, AcfConfig};
///
/// let x: Vec<f64> = (0..48).map(|i| ((i % 12) as f64).sin()).collect();
/// let result = acf(&x, &AcfConfig::default().with_nlags(24)).unwrap();
/// assert_eq!(result.acf.len(), 25);
/// assert!((result.acf[0] - 1.0).abs() < 1e-12);
/// ```
pub fn acf(x: &[f64], config: &AcfConfig) -> Result<AcfResult> {
    if x.is_empty() {
        return Err(StatTestError::EmptyData);
    }

    let nobs = match config.missing {
        MissingPolicy::Drop => count_present(x),
        _ => x.len(),
    };
    let nlags = config.nlags.unwrap_or_else(|| default_nlags(nobs));

    let acov = autocovariance(x, nlags, config.adjusted, config.fft, config.missing)?;
    let c0 = acov[0];
    let acf: Vec<f64> = acov.iter().map(|c| c / c0).collect();

    let confint = match config.alpha {
        Some(alpha) => {
            let z = normal_critical_value(alpha)?;
            let variances: Vec<f64> = if config.bartlett_confint {
                let mut cumulative = 0.0;
                (0..acf.len())
                    .map(|k| match k {
                        0 => 0.0,
                        _ => {
                            if k >= 2 {
                                cumulative += acf[k - 1] * acf[k - 1];
                            }
                            (1.0 + 2.0 * cumulative) / nobs as f64
                        }
                    })
                    .collect()
            } else {
                vec![1.0 / x.len() as f64; acf.len()]
            };
            Some(
                acf.iter()
                    .zip(&variances)
                    .map(|(r, v)| (r - z * v.sqrt(), r + z * v.sqrt()))
                    .collect(),
            )
        }
        None => None,
    };

    let (qstat, pvalues) = if config.qstat {
        let q = ljung_box_q(&acf, nobs);
        let p = q
            .iter()
            .enumerate()
            .map(|(i, &stat)| chi2_sf(stat, i + 1))
            .collect::<Result<Vec<f64>>>()?;
        (Some(q), Some(p))
    } else {
        (None, None)
    };

    Ok(AcfResult {
        acf,
        confint,
        qstat,
        pvalues,
    })
}
