//! Opaque handle for fitted models used to residualize a series.

use std::fmt;

/// Order of a (seasonal) ARIMA model, `(p, d, q)(P, D, Q)[s]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ModelOrder {
    /// Non-seasonal AR order.
    pub p: usize,
    /// Non-seasonal differencing order.
    pub d: usize,
    /// Non-seasonal MA order.
    pub q: usize,
    /// Seasonal AR order.
    pub cap_p: usize,
    /// Seasonal differencing order.
    pub cap_d: usize,
    /// Seasonal MA order.
    pub cap_q: usize,
    /// Seasonal period (0 for non-seasonal).
    pub s: usize,
}

impl ModelOrder {
    /// Non-seasonal order `(p, d, q)`.
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self {
            p,
            d,
            q,
            ..Default::default()
        }
    }

    /// Full seasonal order `(p, d, q)(P, D, Q)[s]`.
    pub fn seasonal(
        p: usize,
        d: usize,
        q: usize,
        cap_p: usize,
        cap_d: usize,
        cap_q: usize,
        s: usize,
    ) -> Self {
        Self {
            p,
            d,
            q,
            cap_p,
            cap_d,
            cap_q,
            s,
        }
    }

    /// Check if this order has any seasonal component.
    pub fn is_seasonal(&self) -> bool {
        self.s > 1 && (self.cap_p > 0 || self.cap_d > 0 || self.cap_q > 0)
    }

    /// The non-seasonal part as a `(p, d, q)` tuple.
    pub fn non_seasonal(&self) -> (usize, usize, usize) {
        (self.p, self.d, self.q)
    }

    /// Number of AR and MA coefficients, seasonal ones included.
    pub fn arma_terms(&self) -> usize {
        self.p + self.q + self.cap_p + self.cap_q
    }
}

impl fmt::Display for ModelOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ARIMA({},{},{})", self.p, self.d, self.q)?;
        if self.is_seasonal() {
            write!(f, "({},{},{})[{}]", self.cap_p, self.cap_d, self.cap_q, self.s)?;
        }
        Ok(())
    }
}

/// A fitted model exposing what the seasonality test needs: its order and
/// its residual sequence.
///
/// Implementations are immutable once fitted and can be shared across threads.
pub trait FittedModel: fmt::Debug + Send + Sync {
    /// Order of the fitted model.
    fn order(&self) -> ModelOrder;

    /// In-sample residuals.
    fn residuals(&self) -> &[f64];

    /// Model name for diagnostics.
    fn name(&self) -> &str;

    /// Akaike information criterion, when the model defines one.
    fn aic(&self) -> Option<f64> {
        None
    }
}

/// Type alias for boxed fitted models.
pub type BoxedModel = Box<dyn FittedModel>;
