//! Correlation measures for a univariate series.
//!
//! Provides the sample autocorrelation (with Bartlett confidence intervals and
//! Ljung-Box statistics), the partial autocorrelation and the
//! cross-correlation of two series.
//!
//! # Example
//!
//! ```
//! use ts_stat_tests::correlation::{acf, pacf, AcfConfig, MissingPolicy, PacfMethod};
//!
//! let series: Vec<f64> = (0..60).map(|i| (i % 12) as f64 + 0.1 * i as f64).collect();
//!
//! let config = AcfConfig::default().with_nlags(24).with_missing(MissingPolicy::Drop);
//! let result = acf(&series, &config).unwrap();
//! assert!(result.acf[12] > 0.0);
//!
//! let partial = pacf(&series, Some(10), PacfMethod::default(), None).unwrap();
//! assert_eq!(partial.pacf.len(), 11);
//! ```

mod acf;
mod ccf;
mod pacf;

pub use acf::{acf, autocovariance, AcfConfig, AcfResult, MissingPolicy};
pub use ccf::ccf;
pub use pacf::{pacf, PacfMethod, PacfResult};
