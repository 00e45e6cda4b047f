//! # chronocast
//!
//! Univariate time-series forecasting: exponential smoothing (ETS) and
//! seasonal ARIMA with automatic model search, plus the supporting
//! machinery both need: power transforms, differencing, stationarity
//! tests, information-criterion selection, and prediction intervals.
//!
//! [`pipeline::ForecastPipeline`] is the one-call entry point; the
//! [`models`] module exposes the engines directly for callers that want
//! control over specs and search configuration.

#![allow(clippy::too_many_arguments)]
#![allow(clippy::needless_range_loop)]

pub mod core;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod selection;
pub mod transform;
pub mod utils;
pub mod validation;

pub use error::{ForecastError, Result};

pub mod prelude {
    pub use crate::core::{Forecast, PredictionInterval, TimeSeries};
    pub use crate::error::{ForecastError, Result};
    pub use crate::models::{
        Arima, ArimaSpec, AutoArima, AutoEts, Ets, EtsSpec, Forecaster,
    };
    pub use crate::pipeline::{Engine, ForecastPipeline, PipelineConfig, TransformChoice};
    pub use crate::selection::SelectionCriterion;
    pub use crate::transform::TransformSpec;
}
