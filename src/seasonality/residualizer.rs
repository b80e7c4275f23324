//! Series preparation for the QS test: optional model residuals, optional
//! first difference, and the degenerate-series check.

use std::fmt;

use tracing::{debug, warn};

use crate::error::{Result, StatTestError};
use crate::models::arima::{difference, AutoARIMA, AutoARIMAConfig, ARIMA};
use crate::models::{BoxedModel, ModelOrder};
use crate::utils::stats::{count_present, nan_variance};

/// A way of fitting a model whose residuals replace the series.
///
/// Strategies are tried in order and the first success wins, so a failing
/// strategy only has to report why it failed.
pub trait ResidualStrategy: fmt::Debug + Send + Sync {
    /// Strategy name for diagnostics.
    fn name(&self) -> &str;

    /// Fit a model to `series`.
    fn fit(&self, series: &[f64]) -> Result<BoxedModel>;
}

/// Automatic non-seasonal ARIMA search.
#[derive(Debug, Clone)]
pub struct AutoArimaStrategy {
    config: AutoARIMAConfig,
}

impl AutoArimaStrategy {
    /// Search bounds tuned to the seasonal frequency.
    ///
    /// Up to three AR and MA terms, exhaustive search without seasonal
    /// terms. Short cycles (`freq < 8`) keep a single ARMA term, longer
    /// cycles allow three. A once-differenced model always carries its
    /// intercept.
    pub fn for_frequency(freq: usize) -> Self {
        let max_order = if freq < 8 { 1 } else { 3 };
        let config = AutoARIMAConfig::default()
            .with_max_orders(3, 2, 3)
            .with_seasonal_orders(1, 1, 1)
            .with_max_order(max_order)
            .non_seasonal()
            .exhaustive();
        Self { config }
    }

    /// Use a custom search configuration.
    pub fn with_config(config: AutoARIMAConfig) -> Self {
        Self { config }
    }

    /// Get the search configuration.
    pub fn config(&self) -> &AutoARIMAConfig {
        &self.config
    }
}

impl ResidualStrategy for AutoArimaStrategy {
    fn name(&self) -> &str {
        "auto_arima"
    }

    fn fit(&self, series: &[f64]) -> Result<BoxedModel> {
        let model = AutoARIMA::with_config(self.config.clone()).fit(series)?;
        Ok(Box::new(model))
    }
}

/// ARIMA with a fixed order, `(0, 1, 1)` by default.
#[derive(Debug, Clone, Copy)]
pub struct FixedOrderStrategy {
    order: ModelOrder,
}

impl FixedOrderStrategy {
    /// Create a strategy for the given order.
    pub fn new(order: ModelOrder) -> Self {
        Self { order }
    }

    /// Get the order.
    pub fn order(&self) -> ModelOrder {
        self.order
    }
}

impl Default for FixedOrderStrategy {
    fn default() -> Self {
        Self::new(ModelOrder::new(0, 1, 1))
    }
}

impl ResidualStrategy for FixedOrderStrategy {
    fn name(&self) -> &str {
        "fixed_order"
    }

    fn fit(&self, series: &[f64]) -> Result<BoxedModel> {
        let model = ARIMA::from_order(self.order).fit(series)?;
        Ok(Box::new(model))
    }
}

/// The default fallback chain: automatic search (when enabled), then a
/// fixed `(0, 1, 1)` model.
pub fn default_strategies(freq: usize, autoarima: bool) -> Vec<Box<dyn ResidualStrategy>> {
    let mut strategies: Vec<Box<dyn ResidualStrategy>> = Vec::with_capacity(2);
    if autoarima {
        strategies.push(Box::new(AutoArimaStrategy::for_frequency(freq)));
    }
    strategies.push(Box::new(FixedOrderStrategy::default()));
    strategies
}

/// A prepared series together with the model whose residuals it holds.
#[derive(Debug)]
pub struct Residualized {
    /// Series to test.
    pub series: Vec<f64>,
    /// Model used for the residuals, if any was fitted.
    pub model: Option<BoxedModel>,
}

/// Prepare `x` for the QS test with the default fallback chain.
///
/// # Arguments
/// * `x` - Input series; `NaN` marks a missing observation
/// * `freq` - Observations per seasonal cycle (at least 2)
/// * `diff` - Take the first difference of the working series
/// * `residuals` - Replace the series by model residuals first
/// * `autoarima` - Try an automatic order search before `(0, 1, 1)`
pub fn residualize(
    x: &[f64],
    freq: usize,
    diff: bool,
    residuals: bool,
    autoarima: bool,
) -> Result<Residualized> {
    if residuals {
        let strategies = default_strategies(freq, autoarima);
        residualize_with(x, freq, diff, Some(strategies.as_slice()))
    } else {
        residualize_with(x, freq, diff, None)
    }
}

/// Prepare `x` using a caller-supplied strategy chain.
///
/// `None` skips model fitting entirely. With `Some`, the first strategy that
/// fits replaces the series by its residuals; when every strategy fails the
/// series is kept as is and no model is returned.
pub fn residualize_with(
    x: &[f64],
    freq: usize,
    diff: bool,
    strategies: Option<&[Box<dyn ResidualStrategy>]>,
) -> Result<Residualized> {
    if count_present(x) == 0 {
        return Err(StatTestError::InvalidInput(
            "all observations are missing".to_string(),
        ));
    }
    if freq < 2 {
        return Err(StatTestError::InvalidInput(format!(
            "too few observations per cycle: freq must be at least 2, got {freq}"
        )));
    }
    if diff && strategies.is_some() {
        warn!("differencing model residuals; the residuals are usually stationary already");
    }

    let (mut series, model) = match strategies {
        Some(chain) => match fit_first(x, chain) {
            Some(model) => (model.residuals().to_vec(), Some(model)),
            None => {
                warn!("no residual model could be fitted; testing the original series");
                (x.to_vec(), None)
            }
        },
        None => (x.to_vec(), None),
    };

    if diff {
        series = difference(&series, 1);
    }

    // Population variance of what is left; nothing left counts as zero
    let variance = nan_variance(&series, 0);
    if variance.is_nan() || variance == 0.0 {
        return Err(StatTestError::DegenerateSeries(
            "the series to test has zero variance".to_string(),
        ));
    }

    Ok(Residualized { series, model })
}

fn fit_first(x: &[f64], strategies: &[Box<dyn ResidualStrategy>]) -> Option<BoxedModel> {
    for strategy in strategies {
        match strategy.fit(x) {
            Ok(model) => {
                debug!(
                    strategy = strategy.name(),
                    order = %model.order(),
                    "residual model fitted"
                );
                return Some(model);
            }
            Err(err) => {
                warn!(strategy = strategy.name(), error = %err, "residual model failed to fit");
            }
        }
    }
    None
}
