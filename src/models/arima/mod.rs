//! ARIMA and SARIMA (Autoregressive Integrated Moving Average) models.
//!
//! This module provides:
//! - differencing helpers
//! - ARIMA(p, d, q)(P, D, Q)\[s\] fitted by exact maximum likelihood
//!   through a state-space form and the Kalman filter
//! - AutoARIMA for automatic order selection

mod auto_arima;
mod diff;
mod model;
mod state_space;

pub use auto_arima::{AutoARIMA, AutoARIMAConfig, InformationCriterion};
pub use diff::{difference, seasonal_difference, suggest_differencing, suggest_seasonal_differencing};
pub use model::{FittedARIMA, ARIMA, UNIT_ROOT_THRESHOLD};
