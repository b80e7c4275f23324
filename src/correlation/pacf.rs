//! Partial autocorrelation function.

use std::str::FromStr;

use super::acf::{autocovariance, MissingPolicy};
use crate::error::{Result, StatTestError};
use crate::utils::stats::normal_critical_value;

/// Estimator for the partial autocorrelations.
///
/// Yule-Walker and Levinson-Durbin solve the same Toeplitz system, both through
/// the Durbin-Levinson recursion here; the variants differ in how the
/// autocovariances are normalised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PacfMethod {
    /// Yule-Walker, autocovariances normalised by `n - k`.
    #[default]
    YuleWalkerAdjusted,
    /// Yule-Walker, autocovariances normalised by `n` (maximum likelihood).
    YuleWalkerMle,
    /// Levinson-Durbin, autocovariances normalised by `n - k`.
    LevinsonDurbinAdjusted,
    /// Levinson-Durbin, autocovariances normalised by `n`.
    LevinsonDurbin,
}

impl PacfMethod {
    fn adjusted(self) -> bool {
        matches!(self, Self::YuleWalkerAdjusted | Self::LevinsonDurbinAdjusted)
    }
}

impl FromStr for PacfMethod {
    type Err = StatTestError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "yw" | "ywa" | "ywadjusted" | "ywunbiased" => Ok(Self::YuleWalkerAdjusted),
            "ywm" | "ywmle" => Ok(Self::YuleWalkerMle),
            "ld" | "lda" | "ldadjusted" | "ldunbiased" => Ok(Self::LevinsonDurbinAdjusted),
            "ldb" | "ldbiased" => Ok(Self::LevinsonDurbin),
            other => Err(StatTestError::InvalidParameter(format!(
                "unknown pacf method '{other}'"
            ))),
        }
    }
}

/// Output of [`pacf`].
#[derive(Debug, Clone, PartialEq)]
pub struct PacfResult {
    /// Partial autocorrelations for lags `0..=nlags`; `pacf[0] == 1`.
    pub pacf: Vec<f64>,
    /// Confidence intervals, one `(lower, upper)` pair per lag.
    pub confint: Option<Vec<(f64, f64)>>,
}

/// Durbin-Levinson recursion over autocorrelations `r[0..=nlags]`.
///
/// Returns the last coefficient of each AR(k) fit, `k = 1..=nlags`.
fn durbin_levinson(r: &[f64]) -> Result<Vec<f64>> {
    let nlags = r.len() - 1;
    let mut out = Vec::with_capacity(nlags);
    let mut phi: Vec<f64> = Vec::with_capacity(nlags);

    for k in 1..=nlags {
        let num = r[k] - phi.iter().enumerate().map(|(j, p)| p * r[k - 1 - j]).sum::<f64>();
        let denom = 1.0 - phi.iter().enumerate().map(|(j, p)| p * r[j + 1]).sum::<f64>();
        if denom.abs() < 1e-12 {
            return Err(StatTestError::ComputationError(format!(
                "Durbin-Levinson recursion is singular at lag {k}"
            )));
        }
        let reflection = num / denom;

        let previous = phi.clone();
        for j in 0..phi.len() {
            phi[j] = previous[j] - reflection * previous[previous.len() - 1 - j];
        }
        phi.push(reflection);
        out.push(reflection);
    }

    Ok(out)
}

/// Compute the sample partial autocorrelation function.
///
/// # Arguments
/// * `x` - Input series without missing values
/// * `nlags` - Number of lags; defaults to `min(10 log10 n, n / 2 - 1)`
/// * `method` - Autocovariance normalisation
/// * `alpha` - Optional significance level for `z / sqrt(n)` intervals
pub fn pacf(
    x: &[f64],
    nlags: Option<usize>,
    method: PacfMethod,
    alpha: Option<f64>,
) -> Result<PacfResult> {
    let n = x.len();
    if n == 0 {
        return Err(StatTestError::EmptyData);
    }

    let default = ((10.0 * (n as f64).log10()).floor() as usize)
        .min((n / 2).saturating_sub(1))
        .max(1);
    let nlags = nlags.unwrap_or(default);
    if nlags >= n / 2 {
        return Err(StatTestError::InvalidParameter(format!(
            "nlags must be smaller than half the series length ({}), got {nlags}",
            n / 2
        )));
    }

    let acov = autocovariance(x, nlags, method.adjusted(), false, MissingPolicy::Raise)?;
    if acov[0] == 0.0 {
        return Err(StatTestError::DegenerateSeries(
            "partial autocorrelation of a constant series is undefined".to_string(),
        ));
    }
    let r: Vec<f64> = acov.iter().map(|c| c / acov[0]).collect();

    let mut values = Vec::with_capacity(nlags + 1);
    values.push(1.0);
    values.extend(durbin_levinson(&r)?);

    let confint = match alpha {
        Some(a) => {
            let half = normal_critical_value(a)? / (n as f64).sqrt();
            Some(
                values
                    .iter()
                    .enumerate()
                    .map(|(k, &v)| if k == 0 { (v, v) } else { (v - half, v + half) })
                    .collect(),
            )
        }
        None => None,
    };

    Ok(PacfResult {
        pacf: values,
        confint,
    })
}
