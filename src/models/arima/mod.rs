//! Seasonal ARIMA models.
//!
//! [`ArimaSpec`] names an order tuple (p, d, q)(P, D, Q)[m], [`Arima`]
//! estimates it by conditional sum of squares, and [`AutoArima`] searches
//! over orders after fixing the differencing from stationarity tests.

mod model;
mod search;
mod spec;

pub use model::Arima;
pub use search::{AutoArima, AutoArimaConfig};
pub use spec::ArimaSpec;
