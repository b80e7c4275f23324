//! ARIMA and SARIMA models fitted by exact Gaussian maximum likelihood.

use tracing::debug;

use crate::error::{Result, StatTestError};
use crate::models::arima::diff::{difference, seasonal_difference};
use crate::models::arima::state_space::StateSpace;
use crate::models::traits::{FittedModel, ModelOrder};
use crate::utils::optimization::{nelder_mead, NelderMeadConfig};

/// Inverse roots of the AR or MA polynomial beyond this modulus count as a
/// unit root.
pub const UNIT_ROOT_THRESHOLD: f64 = 0.99;

/// Optimizer passes; each restarts the simplex at the previous optimum.
const OPTIMIZER_PASSES: usize = 2;

/// Unfitted ARIMA(p, d, q)(P, D, Q)\[s\] specification.
///
/// The model is cast in state-space form and its likelihood evaluated with
/// the Kalman filter. Differencing is part of the state, so the fit sees the
/// original series and yields one residual per observation. AR and MA
/// coefficients are optimized through a reparametrisation that keeps them
/// stationary and invertible.
#[derive(Debug, Clone)]
pub struct ARIMA {
    order: ModelOrder,
    include_constant: Option<bool>,
    optimizer: NelderMeadConfig,
}

impl ARIMA {
    /// Create a non-seasonal ARIMA(p, d, q) model.
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self::from_order(ModelOrder::new(p, d, q))
    }

    /// Create a seasonal ARIMA model.
    pub fn seasonal(
        p: usize,
        d: usize,
        q: usize,
        cap_p: usize,
        cap_d: usize,
        cap_q: usize,
        s: usize,
    ) -> Self {
        Self::from_order(ModelOrder::seasonal(p, d, q, cap_p, cap_d, cap_q, s))
    }

    /// Create a model from a full order.
    pub fn from_order(order: ModelOrder) -> Self {
        Self {
            order,
            include_constant: None,
            optimizer: NelderMeadConfig::default()
                .with_max_iter(2000)
                .with_tolerance(1e-10)
                .with_initial_step(0.1),
        }
    }

    /// Force the constant in or out.
    ///
    /// The constant is an intercept in the equation of the differenced
    /// series, i.e. drift when `d = 1`. By default it is included when
    /// `d + D <= 1`.
    pub fn with_constant(mut self, include: bool) -> Self {
        self.include_constant = Some(include);
        self
    }

    /// Replace the optimizer settings.
    pub fn with_optimizer(mut self, config: NelderMeadConfig) -> Self {
        self.optimizer = config;
        self
    }

    /// Get the model order.
    pub fn order(&self) -> ModelOrder {
        self.order
    }

    /// Whether the fitted model will carry a constant.
    pub fn includes_constant(&self) -> bool {
        self.include_constant
            .unwrap_or(self.order.d + self.order.cap_d <= 1)
    }

    /// Fit the model to `series`.
    pub fn fit(&self, series: &[f64]) -> Result<FittedARIMA> {
        if series.is_empty() {
            return Err(StatTestError::EmptyData);
        }
        if series.iter().any(|v| !v.is_finite()) {
            return Err(StatTestError::MissingValues);
        }

        let order = self.order;
        let has_seasonal_terms = order.cap_p > 0 || order.cap_d > 0 || order.cap_q > 0;
        if has_seasonal_terms && order.s < 2 {
            return Err(StatTestError::InvalidParameter(format!(
                "seasonal terms need a period of at least 2, got {}",
                order.s
            )));
        }
        let s = if has_seasonal_terms { order.s } else { 0 };

        let span_ar = order.p + order.cap_p * s;
        let span_ma = order.q + order.cap_q * s;
        let start = span_ar.max(span_ma);
        let min_len = order.d + order.cap_d * s + start + 2;
        if series.len() < min_len {
            return Err(StatTestError::InsufficientData {
                needed: min_len,
                got: series.len(),
            });
        }

        let layout = Layout {
            constant: self.includes_constant(),
            p: order.p,
            q: order.q,
            cap_p: order.cap_p,
            cap_q: order.cap_q,
            s,
            d: order.d,
            cap_d: order.cap_d,
            seasonal_lags: seasonal_difference_lags(order.cap_d, s),
        };

        let (coefficients, converged) = self.estimate(&layout, series)?;
        let model = coefficients.state_space(&layout).ok_or_else(|| {
            StatTestError::ComputationError(format!("{order} estimate is not stationary"))
        })?;
        let filtered = model.filter(series);
        if !filtered.loglike.is_finite() {
            return Err(StatTestError::ComputationError(format!(
                "log-likelihood of {order} is not finite"
            )));
        }

        // Coefficients plus the innovation variance
        let k = (layout.len() + 1) as f64;
        let n_eff = (series.len() - model.burn()) as f64;
        let ll = filtered.loglike;
        let aic = -2.0 * ll + 2.0 * k;
        let bic = -2.0 * ll + k * n_eff.ln();

        debug!(%order, aic, sigma2 = coefficients.sigma2, converged, "fitted ARIMA model");

        Ok(FittedARIMA {
            order,
            include_constant: layout.constant,
            coefficients,
            residuals: filtered.residuals,
            loglike: ll,
            aic,
            bic,
            converged,
        })
    }

    /// Maximise the exact likelihood over the unconstrained parameters.
    fn estimate(&self, layout: &Layout, series: &[f64]) -> Result<(Coefficients, bool)> {
        let differenced =
            seasonal_difference(&difference(series, layout.d), layout.cap_d, layout.s);
        let n = differenced.len() as f64;
        let mean = differenced.iter().sum::<f64>() / n;
        let variance = differenced.iter().map(|w| (w - mean).powi(2)).sum::<f64>() / n;
        if !(variance > 0.0) {
            return Err(StatTestError::ComputationError(format!(
                "differenced series is constant, {} has no innovations",
                self.order
            )));
        }

        let mut initial = Vec::with_capacity(layout.len() + 1);
        if layout.constant {
            initial.push(mean);
        }
        initial.extend(std::iter::repeat(0.0).take(layout.arma_len()));
        initial.push(variance.ln());

        let objective = |params: &[f64]| match layout.split(params).state_space(layout) {
            Some(model) => -model.filter(series).loglike,
            None => f64::INFINITY,
        };

        let mut converged = false;
        let mut best = initial;
        let mut value = f64::INFINITY;
        for _ in 0..OPTIMIZER_PASSES {
            let result = nelder_mead(&objective, &best, None, self.optimizer.clone());
            best = result.optimal_point;
            value = result.optimal_value;
            converged = result.converged;
        }

        if !value.is_finite() {
            return Err(StatTestError::ComputationError(format!(
                "likelihood optimisation for {} did not reach a finite value",
                self.order
            )));
        }

        Ok((layout.split(&best), converged))
    }
}

/// Position of each coefficient group inside the optimizer's parameter vector,
/// plus the differencing the state-space form needs.
#[derive(Debug, Clone)]
struct Layout {
    constant: bool,
    p: usize,
    q: usize,
    cap_p: usize,
    cap_q: usize,
    s: usize,
    d: usize,
    cap_d: usize,
    seasonal_lags: Vec<f64>,
}

impl Layout {
    fn arma_len(&self) -> usize {
        self.p + self.q + self.cap_p + self.cap_q
    }

    /// Estimated coefficients, excluding the innovation variance.
    fn len(&self) -> usize {
        usize::from(self.constant) + self.arma_len()
    }

    /// Map unconstrained optimizer parameters to model coefficients.
    fn split(&self, params: &[f64]) -> Coefficients {
        let mut rest = params;
        let mut take = |count: usize| {
            let (head, tail) = rest.split_at(count.min(rest.len()));
            rest = tail;
            head.to_vec()
        };

        let intercept = if self.constant {
            take(1).first().copied().unwrap_or(0.0)
        } else {
            0.0
        };
        let ar = constrain_stationary(&take(self.p));
        let ma = invertible(&take(self.q));
        let seasonal_ar = constrain_stationary(&take(self.cap_p));
        let seasonal_ma = invertible(&take(self.cap_q));
        let sigma2 = take(1).first().copied().unwrap_or(0.0).exp();

        Coefficients {
            intercept,
            ar_lags: expand_ar(&ar, &seasonal_ar, self.s),
            ma_lags: expand_ma(&ma, &seasonal_ma, self.s),
            ar,
            ma,
            seasonal_ar,
            seasonal_ma,
            sigma2,
        }
    }
}

#[derive(Debug, Clone)]
struct Coefficients {
    intercept: f64,
    ar: Vec<f64>,
    ma: Vec<f64>,
    seasonal_ar: Vec<f64>,
    seasonal_ma: Vec<f64>,
    ar_lags: Vec<f64>,
    ma_lags: Vec<f64>,
    sigma2: f64,
}

impl Coefficients {
    fn state_space(&self, layout: &Layout) -> Option<StateSpace> {
        StateSpace::new(
            &self.ar_lags,
            &self.ma_lags,
            self.intercept,
            self.sigma2,
            layout.d,
            &layout.seasonal_lags,
        )
    }
}

/// Map `R^n` onto the coefficients of a stationary AR(n) polynomial.
///
/// Each value is squashed into a partial autocorrelation in `(-1, 1)`, then
/// the Durbin-Levinson recursion turns the partial autocorrelations into AR
/// coefficients.
fn constrain_stationary(unconstrained: &[f64]) -> Vec<f64> {
    let n = unconstrained.len();
    let mut previous: Vec<f64> = Vec::with_capacity(n);
    for (k, x) in unconstrained.iter().enumerate() {
        let r = x / (1.0 + x * x).sqrt();
        let mut current = Vec::with_capacity(k + 1);
        for i in 0..k {
            current.push(previous[i] + r * previous[k - i - 1]);
        }
        current.push(r);
        previous = current;
    }
    previous.iter().map(|y| -y).collect()
}

/// Invertible MA coefficients: the MA polynomial `1 + theta(B)` is the AR
/// polynomial `1 - phi(B)` with `theta = -phi`.
fn invertible(unconstrained: &[f64]) -> Vec<f64> {
    constrain_stationary(unconstrained)
        .into_iter()
        .map(|c| -c)
        .collect()
}

/// Whether every inverse root of `1 - sum_k phi_k B^k` lies strictly inside
/// the circle of the given radius.
///
/// Runs the Durbin-Levinson recursion backwards on the rescaled
/// coefficients; the roots are inside iff every reflection coefficient is
/// smaller than one in magnitude.
fn inverse_roots_within(phi: &[f64], radius: f64) -> bool {
    let mut a: Vec<f64> = phi
        .iter()
        .enumerate()
        .map(|(j, c)| c / radius.powi(j as i32 + 1))
        .collect();

    while let Some(&r) = a.last() {
        if !(r.abs() < 1.0) {
            return false;
        }
        let k = a.len();
        let scale = 1.0 - r * r;
        a = (0..k - 1).map(|j| (a[j] + r * a[k - 2 - j]) / scale).collect();
    }
    true
}

/// Lag coefficients `delta` with `(1 - B^s)^D = 1 - sum_j delta_j B^j`.
fn seasonal_difference_lags(cap_d: usize, s: usize) -> Vec<f64> {
    if cap_d == 0 || s == 0 {
        return Vec::new();
    }
    let mut poly = vec![1.0];
    for _ in 0..cap_d {
        poly = multiply(&poly, &lag_polynomial(&[1.0], s, -1.0));
    }
    poly[1..].iter().map(|c| -c).collect()
}

/// `1 + sign * sum_i c_i B^(i * step)` as a dense coefficient vector.
fn lag_polynomial(coefficients: &[f64], step: usize, sign: f64) -> Vec<f64> {
    if coefficients.is_empty() {
        return vec![1.0];
    }
    let mut poly = vec![0.0; coefficients.len() * step + 1];
    poly[0] = 1.0;
    for (i, c) in coefficients.iter().enumerate() {
        poly[(i + 1) * step] = sign * c;
    }
    poly
}

fn multiply(a: &[f64], b: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; a.len() + b.len() - 1];
    for (i, x) in a.iter().enumerate() {
        for (j, y) in b.iter().enumerate() {
            out[i + j] += x * y;
        }
    }
    out
}

/// Lag coefficients of `(1 - phi(B))(1 - Phi(B^s))`, so that the AR part of
/// the prediction is `sum_k c_k w[t - k]`.
fn expand_ar(ar: &[f64], seasonal_ar: &[f64], s: usize) -> Vec<f64> {
    let product = multiply(
        &lag_polynomial(ar, 1, -1.0),
        &lag_polynomial(seasonal_ar, s, -1.0),
    );
    product[1..].iter().map(|c| -c).collect()
}

/// Lag coefficients of `(1 + theta(B))(1 + Theta(B^s))`.
fn expand_ma(ma: &[f64], seasonal_ma: &[f64], s: usize) -> Vec<f64> {
    let product = multiply(
        &lag_polynomial(ma, 1, 1.0),
        &lag_polynomial(seasonal_ma, s, 1.0),
    );
    product[1..].to_vec()
}

/// A fitted ARIMA or SARIMA model.
///
/// Residuals are the one-step forecast errors of the Kalman filter on the
/// original scale, one per observation. The first `d + D*s` of them come
/// from the diffuse start: the very first one is the first observation minus
/// the unconditional mean of the ARMA part.
#[derive(Debug, Clone)]
pub struct FittedARIMA {
    order: ModelOrder,
    include_constant: bool,
    coefficients: Coefficients,
    residuals: Vec<f64>,
    loglike: f64,
    aic: f64,
    bic: f64,
    converged: bool,
}

impl FittedARIMA {
    /// Get the model order.
    pub fn order(&self) -> ModelOrder {
        self.order
    }

    /// Whether a constant was estimated.
    pub fn include_constant(&self) -> bool {
        self.include_constant
    }

    /// Get the intercept of the differenced series equation (0 when no
    /// constant is estimated).
    pub fn intercept(&self) -> f64 {
        self.coefficients.intercept
    }

    /// Get AR coefficients.
    pub fn ar_coefficients(&self) -> &[f64] {
        &self.coefficients.ar
    }

    /// Get MA coefficients.
    pub fn ma_coefficients(&self) -> &[f64] {
        &self.coefficients.ma
    }

    /// Get seasonal AR coefficients.
    pub fn seasonal_ar_coefficients(&self) -> &[f64] {
        &self.coefficients.seasonal_ar
    }

    /// Get seasonal MA coefficients.
    pub fn seasonal_ma_coefficients(&self) -> &[f64] {
        &self.coefficients.seasonal_ma
    }

    /// Get residuals.
    pub fn residuals(&self) -> &[f64] {
        &self.residuals
    }

    /// Innovation variance estimate.
    pub fn sigma2(&self) -> f64 {
        self.coefficients.sigma2
    }

    /// Maximised log-likelihood.
    pub fn loglike(&self) -> f64 {
        self.loglike
    }

    /// Get AIC.
    pub fn aic(&self) -> f64 {
        self.aic
    }

    /// Get BIC.
    pub fn bic(&self) -> f64 {
        self.bic
    }

    /// Whether the optimizer met its convergence tolerance.
    pub fn converged(&self) -> bool {
        self.converged
    }

    /// Whether an AR or MA inverse root lies beyond [`UNIT_ROOT_THRESHOLD`].
    ///
    /// Such fits sit on the edge of the stationary or invertible region and
    /// are unreliable.
    pub fn has_near_unit_root(&self) -> bool {
        let ma_as_ar: Vec<f64> = self.coefficients.ma_lags.iter().map(|c| -c).collect();
        !inverse_roots_within(&self.coefficients.ar_lags, UNIT_ROOT_THRESHOLD)
            || !inverse_roots_within(&ma_as_ar, UNIT_ROOT_THRESHOLD)
    }
}

impl FittedModel for FittedARIMA {
    fn order(&self) -> ModelOrder {
        self.order
    }

    fn residuals(&self) -> &[f64] {
        &self.residuals
    }

    fn name(&self) -> &str {
        if self.order.is_seasonal() {
            "SARIMA"
        } else {
            "ARIMA"
        }
    }

    fn aic(&self) -> Option<f64> {
        Some(self.aic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn shocks(n: usize, seed: u64) -> Vec<f64> {
        let mut state = seed;
        (0..n)
            .map(|_| {
                state = state
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(1442695040888963407);
                (state >> 11) as f64 / (1u64 << 53) as f64 - 0.5
            })
            .collect()
    }

    fn ar1(n: usize, phi: f64) -> Vec<f64> {
        let e = shocks(n, 7);
        let mut x = vec![0.0; n];
        for t in 1..n {
            x[t] = phi * x[t - 1] + e[t];
        }
        x
    }

    #[test]
    fn expand_ar_multiplies_seasonal_polynomial() {
        // (1 - 0.5B)(1 - 0.4B^4) = 1 - 0.5B - 0.4B^4 + 0.2B^5
        let lags = expand_ar(&[0.5], &[0.4], 4);
        assert_eq!(lags.len(), 5);
        assert_relative_eq!(lags[0], 0.5, epsilon = 1e-12);
        assert_relative_eq!(lags[1], 0.0, epsilon = 1e-12);
        assert_relative_eq!(lags[3], 0.4, epsilon = 1e-12);
        assert_relative_eq!(lags[4], -0.2, epsilon = 1e-12);
    }

    #[test]
    fn expand_ma_multiplies_seasonal_polynomial() {
        // (1 + 0.3B)(1 + 0.6B^2) = 1 + 0.3B + 0.6B^2 + 0.18B^3
        let lags = expand_ma(&[0.3], &[0.6], 2);
        assert_eq!(lags.len(), 3);
        assert_relative_eq!(lags[0], 0.3, epsilon = 1e-12);
        assert_relative_eq!(lags[1], 0.6, epsilon = 1e-12);
        assert_relative_eq!(lags[2], 0.18, epsilon = 1e-12);
        assert!(expand_ma(&[], &[], 0).is_empty());
    }

    #[test]
    fn seasonal_difference_lags_expand_power() {
        assert!(seasonal_difference_lags(0, 12).is_empty());
        assert_eq!(seasonal_difference_lags(1, 3), vec![0.0, 0.0, 1.0]);
        // (1 - B^2)^2 = 1 - 2B^2 + B^4
        assert_eq!(seasonal_difference_lags(2, 2), vec![0.0, 2.0, 0.0, -1.0]);
    }

    #[test]
    fn constrained_coefficients_are_stationary() {
        for raw in [vec![5.0], vec![-40.0, 3.0], vec![2.0, -2.0, 7.5]] {
            let phi = constrain_stationary(&raw);
            assert_eq!(phi.len(), raw.len());
            assert!(inverse_roots_within(&phi, 1.0), "{phi:?} is not stationary");
        }
        // A single value maps through x / sqrt(1 + x^2), sign flipped
        assert_relative_eq!(constrain_stationary(&[1.0])[0], -1.0 / 2f64.sqrt(), epsilon = 1e-12);
        assert!(constrain_stationary(&[]).is_empty());
    }

    #[test]
    fn inverse_root_radius() {
        assert!(inverse_roots_within(&[0.5], UNIT_ROOT_THRESHOLD));
        assert!(!inverse_roots_within(&[0.995], UNIT_ROOT_THRESHOLD));
        // 1 - 0.39B - 0.61B^2 has a root at B = 1
        assert!(!inverse_roots_within(&[0.39, 0.61], UNIT_ROOT_THRESHOLD));
        // Complex pair with modulus sqrt(0.5)
        assert!(inverse_roots_within(&[1.0, -0.5], UNIT_ROOT_THRESHOLD));
        assert!(inverse_roots_within(&[], UNIT_ROOT_THRESHOLD));
    }

    #[test]
    fn arima_recovers_ar_coefficient() {
        let x = ar1(400, 0.7);
        let fitted = ARIMA::new(1, 0, 0).fit(&x).unwrap();

        assert!(fitted.include_constant());
        assert_relative_eq!(fitted.ar_coefficients()[0], 0.7, epsilon = 0.1);
        assert_eq!(fitted.residuals().len(), 400);
        assert!(fitted.aic().is_finite());
        assert!(fitted.bic() > fitted.aic());
        assert!(!fitted.has_near_unit_root());
    }

    #[test]
    fn arima_white_noise_mean_model() {
        let x: Vec<f64> = shocks(100, 3).iter().map(|e| 5.0 + e).collect();
        let fitted = ARIMA::new(0, 0, 0).fit(&x).unwrap();
        let mean = x.iter().sum::<f64>() / 100.0;
        let variance = x.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / 100.0;

        assert_relative_eq!(fitted.intercept(), mean, epsilon = 1e-4);
        assert_relative_eq!(fitted.sigma2(), variance, max_relative = 1e-3);
        assert_eq!(fitted.residuals().len(), 100);
        assert_relative_eq!(fitted.residuals().iter().sum::<f64>(), 0.0, epsilon = 1e-2);

        // Gaussian log-likelihood at the MLE: -n/2 (1 + ln 2 pi sigma2)
        let expected = -50.0 * (1.0 + (2.0 * std::f64::consts::PI * variance).ln());
        assert_relative_eq!(fitted.loglike(), expected, epsilon = 1e-4);
        assert_relative_eq!(fitted.aic(), -2.0 * fitted.loglike() + 4.0, epsilon = 1e-12);
    }

    #[test]
    fn arima_residuals_cover_every_observation() {
        let e = shocks(120, 11);
        let mut x = vec![0.0; 120];
        for t in 1..120 {
            x[t] = x[t - 1] + 0.5 + e[t];
        }

        let fitted = ARIMA::new(0, 1, 1).fit(&x).unwrap();
        assert_eq!(fitted.residuals().len(), 120);
        assert!(fitted.include_constant());
        assert_relative_eq!(fitted.intercept(), 0.5, epsilon = 0.1);
        // Nothing is known before the first observation but the drift
        assert_relative_eq!(fitted.residuals()[0], x[0] - fitted.intercept(), epsilon = 1e-9);

        let no_drift = ARIMA::new(0, 1, 1).with_constant(false).fit(&x).unwrap();
        assert_eq!(no_drift.intercept(), 0.0);
        assert_eq!(no_drift.residuals()[0], x[0]);
    }

    #[test]
    fn arima_default_constant_rule() {
        assert!(ARIMA::new(1, 1, 0).includes_constant());
        assert!(!ARIMA::new(1, 2, 0).includes_constant());
        assert!(!ARIMA::seasonal(0, 1, 1, 0, 1, 1, 12).includes_constant());
        assert!(ARIMA::new(1, 2, 0).with_constant(true).includes_constant());
    }

    #[test]
    fn sarima_fits_seasonal_series() {
        let pattern = [10.0, 14.0, 8.0, 4.0];
        let e = shocks(96, 5);
        let x: Vec<f64> = (0..96).map(|t| pattern[t % 4] + 0.05 * t as f64 + e[t]).collect();

        let fitted = ARIMA::seasonal(0, 0, 1, 0, 1, 1, 4).fit(&x).unwrap();
        assert_eq!(FittedModel::name(&fitted), "SARIMA");
        assert_eq!(fitted.seasonal_ma_coefficients().len(), 1);
        assert_eq!(fitted.residuals().len(), 96);
        assert!(fitted.residuals().iter().all(|r| r.is_finite()));
        assert!(fitted.sigma2().is_finite());
    }

    #[test]
    fn arima_rejects_bad_input() {
        assert_eq!(
            ARIMA::new(1, 0, 0).fit(&[1.0, f64::NAN, 2.0, 3.0]).unwrap_err(),
            StatTestError::MissingValues
        );
        assert_eq!(ARIMA::new(1, 0, 0).fit(&[]).unwrap_err(), StatTestError::EmptyData);
        assert_eq!(
            ARIMA::new(0, 1, 1).fit(&[0.0, 1.0]).unwrap_err(),
            StatTestError::InsufficientData { needed: 4, got: 2 }
        );
        assert!(matches!(
            ARIMA::seasonal(0, 0, 0, 1, 0, 0, 1).fit(&[1.0; 50]),
            Err(StatTestError::InvalidParameter(_))
        ));
        assert!(matches!(
            ARIMA::new(0, 1, 1).fit(&[2.0; 20]),
            Err(StatTestError::ComputationError(_))
        ));
    }

    #[test]
    fn fitted_arima_as_trait_object() {
        let x = ar1(200, 0.4);
        let model: Box<dyn FittedModel> = Box::new(ARIMA::new(1, 0, 1).fit(&x).unwrap());

        assert_eq!(model.order(), ModelOrder::new(1, 0, 1));
        assert_eq!(model.name(), "ARIMA");
        assert!(model.aic().is_some());
        assert_eq!(model.residuals().len(), 200);
    }
}
