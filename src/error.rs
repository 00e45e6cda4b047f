//! Error types for the chronocast library.

use thiserror::Error;

/// Result type alias for forecasting operations.
pub type Result<T> = std::result::Result<T, ForecastError>;

/// Errors that can occur during transformation, fitting, and forecasting.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForecastError {
    /// Input data is empty.
    #[error("empty input data")]
    EmptyData,

    /// Insufficient data points for the operation.
    #[error("insufficient data: need at least {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Timestamp-related error.
    #[error("timestamp error: {0}")]
    TimestampError(String),

    /// Model has not been fitted yet.
    #[error("model must be fitted before prediction")]
    FitRequired,

    /// A transform cannot be applied to the given data.
    #[error("invalid transform: {0}")]
    InvalidTransform(String),

    /// Structurally invalid smoothing-model specification for the data.
    #[error("invalid model specification: {0}")]
    InvalidSpec(String),

    /// ARIMA order outside the allowed caps.
    #[error("invalid order: {0}")]
    InvalidOrder(String),

    /// Parameter estimate violates stationarity or invertibility.
    #[error("unstable model: {0}")]
    UnstableModel(String),

    /// Optimizer exhausted its budget without converging.
    #[error("optimizer failed to converge within {iterations} iterations")]
    NonConvergence { iterations: usize },

    /// Every candidate in an automatic search failed to fit.
    #[error("no viable model: all {attempted} candidates failed ({failed} fit errors)")]
    NoViableModel { attempted: usize, failed: usize },
}
