//! Models used to residualize a series before testing it.

mod traits;

pub mod arima;

pub use traits::{BoxedModel, FittedModel, ModelOrder};
