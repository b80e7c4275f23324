//! Automatic ARIMA and SARIMA order selection.

use std::str::FromStr;

use tracing::debug;

use crate::error::{Result, StatTestError};
use crate::models::arima::diff::{suggest_differencing, suggest_seasonal_differencing};
use crate::models::arima::model::{FittedARIMA, ARIMA};
use crate::models::traits::ModelOrder;

/// Criterion used to rank candidate models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InformationCriterion {
    /// Akaike information criterion.
    #[default]
    Aic,
    /// Bayesian information criterion.
    Bic,
}

impl FromStr for InformationCriterion {
    type Err = StatTestError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "aic" => Ok(Self::Aic),
            "bic" => Ok(Self::Bic),
            other => Err(StatTestError::InvalidParameter(format!(
                "unknown information criterion '{other}', expected 'aic' or 'bic'"
            ))),
        }
    }
}

/// Configuration for AutoARIMA.
#[derive(Debug, Clone)]
pub struct AutoARIMAConfig {
    /// Maximum non-seasonal AR order to consider.
    pub max_p: usize,
    /// Maximum non-seasonal MA order to consider.
    pub max_q: usize,
    /// Maximum non-seasonal differencing order.
    pub max_d: usize,
    /// Maximum seasonal AR order.
    pub max_cap_p: usize,
    /// Maximum seasonal MA order.
    pub max_cap_q: usize,
    /// Maximum seasonal differencing order.
    pub max_cap_d: usize,
    /// Upper bound on `p + q + P + Q`.
    pub max_order: usize,
    /// Whether seasonal terms are searched at all.
    pub seasonal: bool,
    /// Seasonal period (0 for non-seasonal).
    pub period: usize,
    /// Use stepwise search (faster) vs exhaustive.
    pub stepwise: bool,
    /// Allow a drift term when the series is differenced once.
    pub allow_drift: bool,
    /// Selection criterion.
    pub information_criterion: InformationCriterion,
}

impl Default for AutoARIMAConfig {
    fn default() -> Self {
        Self {
            max_p: 5,
            max_q: 5,
            max_d: 2,
            max_cap_p: 2,
            max_cap_q: 2,
            max_cap_d: 1,
            max_order: 5,
            seasonal: true,
            period: 0,
            stepwise: true,
            allow_drift: true,
            information_criterion: InformationCriterion::Aic,
        }
    }
}

impl AutoARIMAConfig {
    /// Set maximum non-seasonal orders.
    pub fn with_max_orders(mut self, max_p: usize, max_d: usize, max_q: usize) -> Self {
        self.max_p = max_p;
        self.max_d = max_d;
        self.max_q = max_q;
        self
    }

    /// Set maximum seasonal orders.
    pub fn with_seasonal_orders(mut self, max_p: usize, max_d: usize, max_q: usize) -> Self {
        self.max_cap_p = max_p;
        self.max_cap_d = max_d;
        self.max_cap_q = max_q;
        self
    }

    /// Set the bound on `p + q + P + Q`.
    pub fn with_max_order(mut self, max_order: usize) -> Self {
        self.max_order = max_order;
        self
    }

    /// Set seasonal period.
    pub fn with_seasonal_period(mut self, period: usize) -> Self {
        self.period = period;
        self
    }

    /// Restrict the search to non-seasonal models.
    pub fn non_seasonal(mut self) -> Self {
        self.seasonal = false;
        self
    }

    /// Allow or forbid drift.
    pub fn with_drift(mut self, allow: bool) -> Self {
        self.allow_drift = allow;
        self
    }

    /// Set the selection criterion.
    pub fn with_information_criterion(mut self, criterion: InformationCriterion) -> Self {
        self.information_criterion = criterion;
        self
    }

    /// Use exhaustive search instead of stepwise.
    pub fn exhaustive(mut self) -> Self {
        self.stepwise = false;
        self
    }

    fn seasonal_period(&self) -> Option<usize> {
        (self.seasonal && self.period > 1).then_some(self.period)
    }
}

/// Automatic ARIMA/SARIMA model selection.
///
/// Picks the differencing orders from variance reduction, fits every
/// candidate `(p, q)(P, Q)` allowed by the configuration and keeps the one
/// with the lowest finite information criterion. Every candidate shares the
/// differencing orders, so their likelihoods cover the same observations.
/// Candidates with an AR or MA inverse root beyond
/// [`UNIT_ROOT_THRESHOLD`](super::UNIT_ROOT_THRESHOLD) are skipped.
#[derive(Debug, Clone, Default)]
pub struct AutoARIMA {
    config: AutoARIMAConfig,
}

impl AutoARIMA {
    /// Create a new AutoARIMA with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create AutoARIMA with custom configuration.
    pub fn with_config(config: AutoARIMAConfig) -> Self {
        Self { config }
    }

    /// Create AutoARIMA with seasonal period.
    pub fn seasonal(period: usize) -> Self {
        Self::with_config(AutoARIMAConfig::default().with_seasonal_period(period))
    }

    /// Get the configuration.
    pub fn config(&self) -> &AutoARIMAConfig {
        &self.config
    }

    /// Select and fit the best model for `series`.
    pub fn fit(&self, series: &[f64]) -> Result<FittedARIMA> {
        if series.is_empty() {
            return Err(StatTestError::EmptyData);
        }
        if series.iter().any(|v| !v.is_finite()) {
            return Err(StatTestError::MissingValues);
        }

        let period = self.config.seasonal_period();
        let min_required = period.map_or(10, |s| 3 * s);
        if series.len() < min_required {
            return Err(StatTestError::InsufficientData {
                needed: min_required,
                got: series.len(),
            });
        }

        let d = suggest_differencing(series).min(self.config.max_d);
        let cap_d = period.map_or(0, |s| {
            suggest_seasonal_differencing(series, s).min(self.config.max_cap_d)
        });

        let candidates = self.candidates(d, cap_d);
        debug!(d, cap_d, candidates = candidates.len(), "searching ARIMA orders");

        let mut best: Option<(FittedARIMA, f64)> = None;
        for order in candidates {
            if series.len() < min_length(&order) {
                continue;
            }

            let Some((model, score)) = self.evaluate_model(series, order) else {
                continue;
            };
            if best.as_ref().map_or(true, |(_, s)| score < *s) {
                best = Some((model, score));
            }
        }

        let (model, score) = best.ok_or_else(|| {
            StatTestError::ComputationError(
                "No valid ARIMA/SARIMA model could be fitted".to_string(),
            )
        })?;
        debug!(order = %model.order(), score, "selected ARIMA model");
        Ok(model)
    }

    /// Candidate orders allowed by the configuration, in evaluation order.
    fn candidates(&self, d: usize, cap_d: usize) -> Vec<ModelOrder> {
        let raw = if self.config.stepwise {
            self.stepwise_candidates(d, cap_d)
        } else {
            self.exhaustive_candidates(d, cap_d)
        };

        let mut candidates: Vec<ModelOrder> = raw
            .into_iter()
            .filter(|o| o.arma_terms() <= self.config.max_order)
            .collect();
        candidates.sort_by_key(|o| (o.cap_p, o.cap_q, o.p, o.q));
        candidates.dedup();
        candidates
    }

    /// Generate candidate orders using stepwise search.
    fn stepwise_candidates(&self, d: usize, cap_d: usize) -> Vec<ModelOrder> {
        let config = &self.config;
        let s = self.config.seasonal_period().unwrap_or(0);

        let nonseasonal = [
            (0, 0),
            (1, 0),
            (0, 1),
            (1, 1),
            (2, 0),
            (0, 2),
            (2, 1),
            (1, 2),
            (2, 2),
        ];

        let mut candidates: Vec<ModelOrder> = nonseasonal
            .iter()
            .filter(|&&(p, q)| p <= config.max_p && q <= config.max_q)
            .map(|&(p, q)| ModelOrder::seasonal(p, d, q, 0, cap_d, 0, s))
            .collect();

        if s > 1 {
            let seasonal = [
                (0, 1),
                (1, 0),
                (1, 1),
                (2, 0),
                (0, 2),
                (2, 1),
                (1, 2),
                (2, 2),
            ];
            let nonseasonal_with_seasonal = [
                (0, 0),
                (1, 0),
                (0, 1),
                (1, 1),
                (2, 0),
                (0, 2),
                (2, 1),
                (1, 2),
                (3, 0),
                (0, 3),
            ];

            for &(p, q) in &nonseasonal_with_seasonal {
                for &(cap_p, cap_q) in &seasonal {
                    if p <= config.max_p
                        && q <= config.max_q
                        && cap_p <= config.max_cap_p
                        && cap_q <= config.max_cap_q
                    {
                        candidates.push(ModelOrder::seasonal(p, d, q, cap_p, cap_d, cap_q, s));
                    }
                }
            }
        }

        candidates
    }

    /// Generate all candidate orders (exhaustive).
    fn exhaustive_candidates(&self, d: usize, cap_d: usize) -> Vec<ModelOrder> {
        let config = &self.config;
        let s = config.seasonal_period().unwrap_or(0);
        let (max_cap_p, max_cap_q) = if s > 1 {
            (config.max_cap_p, config.max_cap_q)
        } else {
            (0, 0)
        };

        let mut candidates = Vec::new();
        for p in 0..=config.max_p {
            for q in 0..=config.max_q {
                for cap_p in 0..=max_cap_p {
                    for cap_q in 0..=max_cap_q {
                        candidates.push(ModelOrder::seasonal(p, d, q, cap_p, cap_d, cap_q, s));
                    }
                }
            }
        }
        candidates
    }

    /// Constant policy: a mean for undifferenced series, drift when
    /// differenced once and allowed, nothing otherwise.
    fn include_constant(&self, order: &ModelOrder) -> bool {
        match order.d + order.cap_d {
            0 => true,
            1 => self.config.allow_drift,
            _ => false,
        }
    }

    /// Fit and evaluate a model with given order.
    fn evaluate_model(&self, series: &[f64], order: ModelOrder) -> Option<(FittedARIMA, f64)> {
        let model = ARIMA::from_order(order)
            .with_constant(self.include_constant(&order))
            .fit(series);

        match model {
            Ok(model) if model.has_near_unit_root() => {
                debug!(%order, "candidate rejected, near unit root");
                None
            }
            Ok(model) => {
                let score = match self.config.information_criterion {
                    InformationCriterion::Aic => model.aic(),
                    InformationCriterion::Bic => model.bic(),
                };
                score.is_finite().then_some((model, score))
            }
            Err(err) => {
                debug!(%order, error = %err, "candidate failed to fit");
                None
            }
        }
    }
}

/// Shortest series worth fitting `order` to.
fn min_length(order: &ModelOrder) -> usize {
    let s = order.s.max(1);
    order.d
        + order.cap_d * order.s
        + (order.p + order.cap_p * s).max(order.q + order.cap_q * s)
        + 5
}
