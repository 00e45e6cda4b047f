//! Core data structures: the input series and the fit/forecast records.

mod fitted;
mod forecast;
mod series;

pub use fitted::{Coefficient, FittedModel, ResidualSet};
pub use forecast::{Forecast, PredictionInterval};
pub use series::TimeSeries;
