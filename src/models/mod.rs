//! Forecasting model families.
//!
//! Two engines share the [`Forecaster`] interface: exponential-smoothing
//! state-space models ([`ets`]) and seasonal ARIMA models ([`arima`]).
//! Each family has a manual entry point (build a spec, fit it) and an
//! automatic search ([`AutoEts`], [`AutoArima`]) that fits candidates and
//! ranks them by information criterion.

mod traits;

pub mod arima;
pub mod ets;

pub use arima::{Arima, ArimaSpec, AutoArima, AutoArimaConfig};
pub use ets::{
    AutoEts, AutoEtsConfig, ErrorComponent, Ets, EtsSpec, SeasonComponent, TrendComponent,
};
pub use traits::{BoxedForecaster, Forecaster};

/// Default confidence level for prediction intervals.
pub const DEFAULT_LEVEL: f64 = 0.80;
