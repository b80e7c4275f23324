//! QS test for residual seasonality.
//!
//! The QS statistic is a Ljung-Box style portmanteau restricted to the
//! seasonal lags `freq` and `2 * freq`, counting only positive
//! autocorrelation as evidence of seasonality. Under the null of no
//! seasonality it is approximately chi-square with two degrees of freedom.

use crate::correlation::{acf, AcfConfig, MissingPolicy};
use crate::error::Result;
use crate::models::BoxedModel;
use crate::seasonality::residualizer::{default_strategies, residualize_with, ResidualStrategy};
use crate::utils::stats::{chi2_sf, count_present};

/// Name reported in every [`QsResult`].
pub const QS_TEST_NAME: &str = "QS";

/// Options of the QS pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QsConfig {
    /// Take the first difference before testing.
    pub diff: bool,
    /// Test model residuals instead of the series itself.
    pub residuals: bool,
    /// Try an automatic ARIMA search before the fixed `(0, 1, 1)` model.
    pub autoarima: bool,
}

impl Default for QsConfig {
    fn default() -> Self {
        Self {
            diff: true,
            residuals: false,
            autoarima: true,
        }
    }
}

impl QsConfig {
    /// Enable or disable differencing.
    pub fn with_diff(mut self, diff: bool) -> Self {
        self.diff = diff;
        self
    }

    /// Enable or disable testing model residuals.
    pub fn with_residuals(mut self, residuals: bool) -> Self {
        self.residuals = residuals;
        self
    }

    /// Enable or disable the automatic order search.
    pub fn with_autoarima(mut self, autoarima: bool) -> Self {
        self.autoarima = autoarima;
        self
    }
}

/// Outcome of the QS test.
#[derive(Debug)]
pub struct QsResult {
    /// The QS statistic (`NaN` when the seasonal lags are unavailable).
    pub statistic: f64,
    /// Upper-tail chi-square(2) probability of the statistic.
    pub p_value: f64,
    /// Always `"QS"`.
    pub test: &'static str,
    /// Model whose residuals were tested, if any.
    pub model: Option<BoxedModel>,
}

impl QsResult {
    /// Whether the null of no seasonality is rejected at level `alpha`.
    pub fn is_seasonal(&self, alpha: f64) -> bool {
        self.p_value < alpha
    }
}

/// Compute the QS statistic of an already prepared series.
///
/// Autocorrelations are computed with pairwise deletion of missing values
/// and `N` is the number of non-missing observations. If either seasonal
/// autocorrelation is not positive both are set to zero. When the series is
/// too short to have lag `2 * freq` the missing coefficients are `NaN`, and
/// so is the statistic. Denominators `N - freq` and `N - 2 * freq` are not
/// guarded.
///
/// # Example
/// ```
/// use ts_stat_tests::seasonality::compute;
///
/// let y: Vec<f64> = (0..48).map(|t| [3.0, -1.0, -4.0, 2.0][t % 4] + 0.01 * t as f64).collect();
/// let result = compute(&y, 4, None).unwrap();
/// assert_eq!(result.test, "QS");
/// assert!(result.p_value < 0.01);
/// ```
pub fn compute(y: &[f64], freq: usize, model: Option<BoxedModel>) -> Result<QsResult> {
    let second_lag = freq.saturating_mul(2);
    let nlags = second_lag.min(y.len().saturating_sub(1));
    let config = AcfConfig::default()
        .with_nlags(nlags)
        .with_missing(MissingPolicy::Drop);
    let correlations = acf(y, &config)?.acf;

    let mut rho1 = correlations.get(freq).copied().unwrap_or(f64::NAN);
    let mut rho2 = correlations.get(second_lag).copied().unwrap_or(f64::NAN);
    if !rho1.is_nan() && !rho2.is_nan() && (rho1 <= 0.0 || rho2 <= 0.0) {
        rho1 = 0.0;
        rho2 = 0.0;
    }

    let n = count_present(y) as f64;
    let f = freq as f64;
    let statistic = n * (n + 2.0) * (rho1 * rho1 / (n - f) + rho2 * rho2 / (n - 2.0 * f));
    let p_value = chi2_sf(statistic, 2)?;

    Ok(QsResult {
        statistic,
        p_value,
        test: QS_TEST_NAME,
        model,
    })
}

/// Run the QS seasonality test.
///
/// # Arguments
/// * `series` - Input series; `NaN` marks a missing observation
/// * `freq` - Observations per seasonal cycle (at least 2)
/// * `config` - Differencing and residualization options
///
/// # Errors
/// `InvalidInput` when every observation is missing or `freq < 2`, and
/// `DegenerateSeries` when the prepared series has zero variance. Model
/// fitting failures never escape; they fall back to the next strategy and
/// finally to the unmodelled series.
///
/// # Example
/// ```
/// use ts_stat_tests::seasonality::{qs, QsConfig};
///
/// let pattern = [5.0, 9.0, 2.0, 7.0, 1.0, 6.0];
/// let series: Vec<f64> = (0..60).map(|t| pattern[t % 6] + 0.2 * t as f64).collect();
///
/// let result = qs(&series, 6, &QsConfig::default()).unwrap();
/// assert!(result.is_seasonal(0.05));
/// assert!(result.model.is_none());
/// ```
pub fn qs(series: &[f64], freq: usize, config: &QsConfig) -> Result<QsResult> {
    Qs::new(*config).test(series, freq)
}

/// Reusable QS tester with an optional custom residual strategy chain.
#[derive(Debug, Default)]
pub struct Qs {
    config: QsConfig,
    strategies: Option<Vec<Box<dyn ResidualStrategy>>>,
}

impl Qs {
    /// Create a tester with the default strategy chain.
    pub fn new(config: QsConfig) -> Self {
        Self {
            config,
            strategies: None,
        }
    }

    /// Replace the residual strategy chain used when `config.residuals` is set.
    pub fn with_strategies(mut self, strategies: Vec<Box<dyn ResidualStrategy>>) -> Self {
        self.strategies = Some(strategies);
        self
    }

    /// Get the configuration.
    pub fn config(&self) -> &QsConfig {
        &self.config
    }

    /// Test `series` for seasonality at period `freq`.
    pub fn test(&self, series: &[f64], freq: usize) -> Result<QsResult> {
        let prepared = if !self.config.residuals {
            residualize_with(series, freq, self.config.diff, None)?
        } else if let Some(chain) = &self.strategies {
            residualize_with(series, freq, self.config.diff, Some(chain.as_slice()))?
        } else {
            let chain = default_strategies(freq, self.config.autoarima);
            residualize_with(series, freq, self.config.diff, Some(chain.as_slice()))?
        };

        compute(&prepared.series, freq, prepared.model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StatTestError;
    use crate::models::{FittedModel, ModelOrder};
    use approx::assert_relative_eq;

    #[derive(Debug)]
    struct Failing;

    impl ResidualStrategy for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn fit(&self, _series: &[f64]) -> Result<BoxedModel> {
            Err(StatTestError::ComputationError("no fit".to_string()))
        }
    }

    #[derive(Debug)]
    struct Identity;

    #[derive(Debug)]
    struct IdentityModel(Vec<f64>);

    impl FittedModel for IdentityModel {
        fn order(&self) -> ModelOrder {
            ModelOrder::default()
        }

        fn residuals(&self) -> &[f64] {
            &self.0
        }

        fn name(&self) -> &str {
            "identity"
        }
    }

    impl ResidualStrategy for Identity {
        fn name(&self) -> &str {
            "identity"
        }

        fn fit(&self, series: &[f64]) -> Result<BoxedModel> {
            Ok(Box::new(IdentityModel(series.to_vec())))
        }
    }

    fn seasonal_series(n: usize, period: usize) -> Vec<f64> {
        let mut state: u64 = 17;
        (0..n)
            .map(|t| {
                state = state
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(1442695040888963407);
                let noise = (state >> 11) as f64 / (1u64 << 53) as f64 - 0.5;
                let phase = 2.0 * std::f64::consts::PI * (t % period) as f64 / period as f64;
                20.0 + 5.0 * phase.sin() + 0.1 * t as f64 + noise
            })
            .collect()
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn detects_seasonality() {
        let x = seasonal_series(96, 12);
        let result = qs(&x, 12, &QsConfig::default()).unwrap();

        assert_eq!(result.test, "QS");
        assert!(result.statistic > 50.0);
        assert!(result.p_value < 1e-6);
        assert!(result.model.is_none());
    }

    #[test]
    fn statistic_matches_formula() {
        let y = seasonal_series(60, 4);
        let result = compute(&y, 4, None).unwrap();

        let r = acf(&y, &AcfConfig::default().with_nlags(8)).unwrap().acf;
        let n = 60.0;
        let expected = n * (n + 2.0) * (r[4] * r[4] / (n - 4.0) + r[8] * r[8] / (n - 8.0));
        assert!(r[4] > 0.0 && r[8] > 0.0);
        assert_relative_eq!(result.statistic, expected, max_relative = 1e-12);
        assert_relative_eq!(result.p_value, (-expected / 2.0).exp(), max_relative = 1e-9);
    }

    #[test]
    fn non_positive_autocorrelation_is_clamped() {
        // Odd lags of an alternating series are negative
        let y: Vec<f64> = (0..40).map(|t| if t % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let result = compute(&y, 3, None).unwrap();

        assert_eq!(result.statistic, 0.0);
        assert_eq!(result.p_value, 1.0);
        assert!(!result.is_seasonal(0.05));
    }

    #[test]
    fn short_series_gives_nan() {
        let y = [1.0, 4.0, 2.0, 5.0, 3.0];
        let result = compute(&y, 4, None).unwrap();

        assert!(result.statistic.is_nan());
        assert!(result.p_value.is_nan());
    }

    #[test]
    fn huge_frequency_gives_nan() {
        let y = seasonal_series(48, 4);
        let result = compute(&y, usize::MAX / 2 + 1, None).unwrap();
        assert!(result.statistic.is_nan());

        let result = qs(&y, usize::MAX, &QsConfig::default()).unwrap();
        assert!(result.statistic.is_nan());
        assert!(result.p_value.is_nan());
    }

    #[test]
    fn missing_values_counted_out() {
        let mut y = seasonal_series(72, 6);
        y[5] = f64::NAN;
        y[30] = f64::NAN;
        let result = compute(&y, 6, None).unwrap();

        assert!(result.statistic.is_finite());
        assert!(result.p_value < 0.05);
    }

    #[test]
    fn rejects_invalid_input() {
        assert!(matches!(
            qs(&[f64::NAN; 12], 4, &QsConfig::default()),
            Err(StatTestError::InvalidInput(_))
        ));
        assert!(matches!(
            qs(&seasonal_series(24, 4), 1, &QsConfig::default()),
            Err(StatTestError::InvalidInput(_))
        ));
        assert!(matches!(
            qs(&[3.0; 24], 4, &QsConfig::default().with_diff(false)),
            Err(StatTestError::DegenerateSeries(_))
        ));
    }

    #[test]
    fn residual_pipeline_reports_model() {
        let x = seasonal_series(96, 12);
        let config = QsConfig::default().with_diff(false).with_residuals(true);
        let result = qs(&x, 12, &config).unwrap();

        let model = result.model.as_ref().unwrap();
        assert!(model.order().p + model.order().q <= 3);
        assert!(result.statistic.is_finite());
    }

    #[test]
    fn injected_strategies() {
        let x = seasonal_series(48, 4);
        let config = QsConfig::default().with_diff(false).with_residuals(true);

        let failing = Qs::new(config)
            .with_strategies(vec![Box::new(Failing), Box::new(Failing)])
            .test(&x, 4)
            .unwrap();
        let plain = qs(&x, 4, &QsConfig::default().with_diff(false)).unwrap();
        assert!(failing.model.is_none());
        assert_eq!(failing.statistic, plain.statistic);

        let identity = Qs::new(config)
            .with_strategies(vec![Box::new(Failing), Box::new(Identity)])
            .test(&x, 4)
            .unwrap();
        assert_eq!(identity.model.as_ref().unwrap().name(), "identity");
        assert_eq!(identity.statistic, plain.statistic);
    }

    #[test]
    fn strategies_ignored_without_residuals() {
        let x = seasonal_series(48, 4);
        let result = Qs::new(QsConfig::default())
            .with_strategies(vec![Box::new(Identity)])
            .test(&x, 4)
            .unwrap();
        assert!(result.model.is_none());
    }

    #[test]
    fn repeated_calls_agree() {
        let x = seasonal_series(60, 6);
        let tester = Qs::new(QsConfig::default());
        let first = tester.test(&x, 6).unwrap();
        let second = tester.test(&x, 6).unwrap();
        assert_eq!(first.statistic, second.statistic);
        assert_eq!(first.p_value, second.p_value);
    }

    #[test]
    fn config_builders() {
        let config = QsConfig::default()
            .with_diff(false)
            .with_residuals(true)
            .with_autoarima(false);
        assert!(!config.diff && config.residuals && !config.autoarima);
        assert_eq!(*Qs::new(config).config(), config);
    }

    #[test]
    fn results_are_thread_safe() {
        assert_send_sync::<QsResult>();
        assert_send_sync::<Qs>();
        assert_send_sync::<QsConfig>();
    }
}
