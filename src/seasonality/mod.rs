//! Seasonality testing.
//!
//! This module provides the QS test:
//! - series preparation (model residuals, differencing, degeneracy check)
//!   through an ordered chain of [`ResidualStrategy`] implementations
//! - the QS statistic on the seasonal lags `freq` and `2 * freq`

mod qs;
mod residualizer;

pub use qs::{compute, qs, Qs, QsConfig, QsResult, QS_TEST_NAME};
pub use residualizer::{
    default_strategies, residualize, residualize_with, AutoArimaStrategy, FixedOrderStrategy,
    ResidualStrategy, Residualized,
};
