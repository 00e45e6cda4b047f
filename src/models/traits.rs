//! Forecaster trait defining the common interface for both model families.

use crate::core::{Forecast, TimeSeries};
use crate::error::Result;

/// Common interface for all forecasting models.
///
/// A model starts unfitted; [`fit`] estimates its parameters from a series
/// and [`forecast`] projects forward from the fitted state. Fitting again
/// replaces the previous fit. The trait is object-safe and can be used with
/// [`BoxedForecaster`].
///
/// [`fit`]: Forecaster::fit
/// [`forecast`]: Forecaster::forecast
///
/// # Example
/// ```
/// use chrono::{Duration, TimeZone, Utc};
/// use chronocast::core::TimeSeries;
/// use chronocast::models::{ErrorComponent, Ets, EtsSpec, Forecaster, TrendComponent};
///
/// let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
/// let timestamps: Vec<_> = (0..30).map(|i| base + Duration::days(i as i64)).collect();
/// let values: Vec<f64> = (0..30)
///     .map(|i| 10.0 + 0.5 * i as f64 + (i as f64 * 0.9).sin())
///     .collect();
/// let series = TimeSeries::univariate(timestamps, values).unwrap();
///
/// let spec = EtsSpec::non_seasonal(ErrorComponent::Additive, TrendComponent::Additive);
/// let mut model = Ets::new(spec);
/// model.fit(&series).unwrap();
///
/// assert!(model.is_fitted());
/// let forecast = model.forecast(6, &[0.80, 0.95]).unwrap();
/// assert_eq!(forecast.horizon(), 6);
/// assert!(forecast.interval(0.95).is_some());
/// ```
pub trait Forecaster {
    /// Fit the model to the time series data.
    fn fit(&mut self, series: &TimeSeries) -> Result<()>;

    /// Forecast `horizon` steps ahead with interval bounds at each of the
    /// requested confidence `levels` (each in (0, 1), e.g. `&[0.80, 0.95]`).
    fn forecast(&self, horizon: usize, levels: &[f64]) -> Result<Forecast>;

    /// Point forecasts without interval bounds.
    fn predict(&self, horizon: usize) -> Result<Forecast> {
        self.forecast(horizon, &[])
    }

    /// Forecast with interval bounds at a single confidence level.
    fn predict_with_intervals(&self, horizon: usize, level: f64) -> Result<Forecast> {
        self.forecast(horizon, &[level])
    }

    /// One-step-ahead fitted values on the data scale, once fitted.
    ///
    /// Models with a warm-up span (ARIMA before its first full set of lags)
    /// report NaN for the steps they cannot fit.
    fn fitted_values(&self) -> Option<&[f64]>;

    /// One-step-ahead innovation residuals on the modeling scale, once
    /// fitted: relative errors for multiplicative-error models, differenced
    /// errors for ARIMA. Warm-up steps are NaN.
    fn residuals(&self) -> Option<&[f64]>;

    /// Model label, e.g. "ETS(A,N,N)" or "ARIMA(1,1,1)".
    fn name(&self) -> &str;

    /// Whether the model has been fitted.
    fn is_fitted(&self) -> bool {
        self.fitted_values().is_some()
    }
}

/// Rejects confidence levels outside the open interval (0, 1).
pub(crate) fn validate_levels(levels: &[f64]) -> Result<()> {
    for &level in levels {
        if !(level > 0.0 && level < 1.0) {
            return Err(crate::error::ForecastError::InvalidParameter(format!(
                "confidence level must be in (0, 1), got {level}"
            )));
        }
    }
    Ok(())
}

/// Builds symmetric Gaussian interval bounds around the point forecasts.
pub(crate) fn intervals_from_se(
    point: &[f64],
    se: &[f64],
    levels: &[f64],
) -> Vec<crate::core::PredictionInterval> {
    levels
        .iter()
        .map(|&level| {
            let z = crate::utils::z_for_level(level);
            let lower = point
                .iter()
                .zip(se)
                .map(|(&p, &s)| p - z * s)
                .collect();
            let upper = point
                .iter()
                .zip(se)
                .map(|(&p, &s)| p + z * s)
                .collect();
            crate::core::PredictionInterval {
                level,
                lower,
                upper,
            }
        })
        .collect()
}

/// Owned trait object for heterogeneous model collections.
///
/// # Example
/// ```
/// use chrono::{Duration, TimeZone, Utc};
/// use chronocast::core::TimeSeries;
/// use chronocast::models::{
///     Arima, ArimaSpec, BoxedForecaster, ErrorComponent, Ets, EtsSpec, TrendComponent,
/// };
///
/// let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
/// let timestamps: Vec<_> = (0..40).map(|i| base + Duration::days(i as i64)).collect();
/// let values: Vec<f64> = (0..40)
///     .map(|i| 20.0 + 0.8 * i as f64 + (i as f64 * 0.7).sin())
///     .collect();
/// let series = TimeSeries::univariate(timestamps, values).unwrap();
///
/// let mut models: Vec<BoxedForecaster> = vec![
///     Box::new(Ets::new(EtsSpec::non_seasonal(
///         ErrorComponent::Additive,
///         TrendComponent::Additive,
///     ))),
///     Box::new(Arima::new(ArimaSpec::new(1, 1, 0))),
/// ];
///
/// for model in &mut models {
///     model.fit(&series).unwrap();
///     assert_eq!(model.predict(4).unwrap().horizon(), 4);
/// }
/// ```
pub type BoxedForecaster = Box<dyn Forecaster>;
