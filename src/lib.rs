//! # ts-stat-tests
//!
//! Statistical diagnostics for univariate time series.
//!
//! The centrepiece is the QS test for residual seasonality, which can test
//! the series itself, its first difference, or the residuals of an
//! automatically selected ARIMA model. Around it sit the building blocks
//! it needs and a few related diagnostics: autocorrelation functions,
//! (S)ARIMA fitting, entropy-based regularity, and window-based stability.
//!
//! ```
//! use ts_stat_tests::prelude::*;
//!
//! let pattern = [4.0, 8.0, 15.0, 16.0, 23.0, 42.0];
//! let series: Vec<f64> = (0..72).map(|t| pattern[t % 6] + 0.5 * t as f64).collect();
//!
//! let result = qs(&series, 6, &QsConfig::default())?;
//! assert!(result.p_value < 0.01);
//! # Ok::<(), StatTestError>(())
//! ```

#![allow(clippy::upper_case_acronyms)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::needless_range_loop)]

pub mod correlation;
pub mod error;
pub mod models;
pub mod regularity;
pub mod seasonality;
pub mod stability;
pub mod utils;

pub use error::{Result, StatTestError};

pub mod prelude {
    pub use crate::correlation::{acf, ccf, pacf, AcfConfig, MissingPolicy, PacfMethod};
    pub use crate::error::{Result, StatTestError};
    pub use crate::models::{FittedModel, ModelOrder};
    pub use crate::regularity::{is_regular, EntropyAlgorithm, Metric, Tolerance};
    pub use crate::seasonality::{qs, Qs, QsConfig, QsResult};
    pub use crate::stability::{is_lumpy, is_stable, lumpiness, stability};
}
