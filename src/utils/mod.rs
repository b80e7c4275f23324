//! Numerical helpers shared across the crate.

pub mod fft;
pub mod optimization;
pub mod stats;

pub use optimization::{nelder_mead, NelderMeadConfig, NelderMeadResult};
pub use stats::{chi2_sf, nan_mean, nan_variance, population_std};
