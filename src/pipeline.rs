//! End-to-end forecasting pipeline.
//!
//! [`ForecastPipeline`] is the one-call entry point: it resolves the
//! variance-stabilizing transform (fixed, estimated, or none), fits the
//! configured engine on the transformed scale, and maps fitted values and
//! forecasts back to the data scale.
//!
//! Inversion order matters and is fixed by construction: the engines undo
//! their own differencing while still on the transformed scale, and the
//! pipeline applies the inverse power transform last. Point forecasts and
//! interval bounds map through the inverse directly (monotone transforms
//! carry quantiles); standard errors map via the delta method.

use crate::core::{FittedModel, Forecast, PredictionInterval, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::models::{
    Arima, ArimaSpec, AutoArima, AutoArimaConfig, AutoEts, AutoEtsConfig, Ets, EtsSpec,
    Forecaster, DEFAULT_LEVEL,
};
use crate::transform::{estimate_lambda, TransformSpec};
use crate::utils::FitBudget;
use crate::validation::{default_lags, ljung_box, LjungBoxResult};

/// Which model family the pipeline fits.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Engine {
    /// Search all admissible exponential-smoothing forms.
    #[default]
    AutoEts,
    /// Stepwise seasonal ARIMA order search.
    AutoArima,
    /// A single fixed exponential-smoothing form.
    Ets(EtsSpec),
    /// A single fixed ARIMA order.
    Arima(ArimaSpec),
}

/// How the pipeline chooses its power transform.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum TransformChoice {
    /// Model the data as-is.
    #[default]
    None,
    /// Estimate a Box-Cox lambda from the data at fit time.
    EstimateBoxCox,
    /// Apply the given transform.
    Fixed(TransformSpec),
}

/// Configuration for a [`ForecastPipeline`].
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Seasonal period in observations; 1 means non-seasonal.
    pub period: usize,
    /// Model family to fit.
    pub engine: Engine,
    /// Power-transform policy.
    pub transform: TransformChoice,
    /// Optimizer budget handed to the engine.
    pub budget: FitBudget,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            period: 1,
            engine: Engine::default(),
            transform: TransformChoice::default(),
            budget: FitBudget::default().with_max_iterations(2000),
        }
    }
}

impl PipelineConfig {
    /// Configuration for the given seasonal period with defaults elsewhere.
    pub fn new(period: usize) -> Self {
        Self {
            period: period.max(1),
            ..Self::default()
        }
    }

    /// Select the model family.
    pub fn with_engine(mut self, engine: Engine) -> Self {
        self.engine = engine;
        self
    }

    /// Apply a fixed transform before fitting.
    pub fn with_transform(mut self, transform: TransformSpec) -> Self {
        self.transform = TransformChoice::Fixed(transform);
        self
    }

    /// Estimate a Box-Cox lambda from the data at fit time.
    pub fn with_estimated_transform(mut self) -> Self {
        self.transform = TransformChoice::EstimateBoxCox;
        self
    }

    /// Override the optimizer budget.
    pub fn with_budget(mut self, budget: FitBudget) -> Self {
        self.budget = budget;
        self
    }
}

/// The fitted engine behind a pipeline.
#[derive(Debug, Clone)]
enum FittedEngine {
    Ets(Ets),
    AutoEts(AutoEts),
    Arima(Arima),
    AutoArima(AutoArima),
}

impl FittedEngine {
    fn forecaster(&self) -> &dyn Forecaster {
        match self {
            FittedEngine::Ets(model) => model,
            FittedEngine::AutoEts(search) => search,
            FittedEngine::Arima(model) => model,
            FittedEngine::AutoArima(search) => search,
        }
    }

    fn forecaster_mut(&mut self) -> &mut dyn Forecaster {
        match self {
            FittedEngine::Ets(model) => model,
            FittedEngine::AutoEts(search) => search,
            FittedEngine::Arima(model) => model,
            FittedEngine::AutoArima(search) => search,
        }
    }

    fn fitted_model(&self) -> Result<FittedModel> {
        match self {
            FittedEngine::Ets(model) => model.fitted_model(),
            FittedEngine::AutoEts(search) => {
                search.selected().ok_or(ForecastError::FitRequired)?.fitted_model()
            }
            FittedEngine::Arima(model) => model.fitted_model(),
            FittedEngine::AutoArima(search) => {
                search.selected().ok_or(ForecastError::FitRequired)?.fitted_model()
            }
        }
    }

    /// Parameters counted against the Ljung-Box degrees of freedom:
    /// smoothing parameters for exponential smoothing, ARMA coefficients
    /// for ARIMA.
    fn fitted_params(&self) -> usize {
        fn arma_terms(spec: ArimaSpec) -> usize {
            spec.p + spec.q + spec.seasonal_p + spec.seasonal_q
        }
        match self {
            FittedEngine::Ets(model) => model.spec().num_smoothing_params(),
            FittedEngine::AutoEts(search) => search
                .selected_spec()
                .map_or(0, |spec| spec.num_smoothing_params()),
            FittedEngine::Arima(model) => arma_terms(model.spec()),
            FittedEngine::AutoArima(search) => search.selected_spec().map_or(0, arma_terms),
        }
    }
}

/// One-call forecasting flow: transform, fit, forecast, invert.
///
/// The pipeline owns the transform bookkeeping so callers never touch the
/// transformed scale. [`fitted_values`], [`residuals`], and every forecast
/// come back on the scale of the input data; [`summary`] reports the
/// engine's coefficients and residual sequences on the modeling scale,
/// where the likelihood lives.
///
/// [`fitted_values`]: Forecaster::fitted_values
/// [`residuals`]: Forecaster::residuals
/// [`summary`]: ForecastPipeline::summary
///
/// # Example
/// ```
/// use chrono::{Duration, TimeZone, Utc};
/// use chronocast::core::TimeSeries;
/// use chronocast::pipeline::ForecastPipeline;
///
/// let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
/// let timestamps: Vec<_> = (0..24).map(|i| base + Duration::days(i as i64)).collect();
/// let values: Vec<f64> = (0..24).map(|i| 100.0 + 2.0 * i as f64).collect();
/// let series = TimeSeries::univariate(timestamps, values).unwrap();
///
/// let mut pipeline = ForecastPipeline::auto(1);
/// let (summary, forecast) = pipeline.run(&series, 6).unwrap();
/// assert_eq!(forecast.horizon(), 6);
/// assert_eq!(forecast.intervals.len(), 1);
/// assert!(summary.criteria.aicc.is_finite());
/// ```
#[derive(Debug, Clone)]
pub struct ForecastPipeline {
    config: PipelineConfig,
    transform: Option<TransformSpec>,
    engine: Option<FittedEngine>,
    label: String,
    fitted: Option<Vec<f64>>,
    residuals: Option<Vec<f64>>,
}

impl ForecastPipeline {
    /// Pipeline with the given configuration, unfitted.
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            transform: None,
            engine: None,
            label: String::from("Pipeline"),
            fitted: None,
            residuals: None,
        }
    }

    /// Automatic exponential-smoothing pipeline for the given period,
    /// no transform.
    pub fn auto(period: usize) -> Self {
        Self::new(PipelineConfig::new(period))
    }

    /// The configuration this pipeline was built with.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The transform resolved at fit time, once fitted. For
    /// [`TransformChoice::EstimateBoxCox`] this carries the estimated
    /// lambda.
    pub fn resolved_transform(&self) -> Option<TransformSpec> {
        self.transform
    }

    /// Fit and forecast in one call at the default confidence level.
    pub fn run(
        &mut self,
        series: &TimeSeries,
        horizon: usize,
    ) -> Result<(FittedModel, Forecast)> {
        self.fit(series)?;
        let forecast = self.forecast(horizon, &[DEFAULT_LEVEL])?;
        Ok((self.summary()?, forecast))
    }

    /// Fit summary from the underlying engine: coefficients, information
    /// criteria, and residual sequences, all on the modeling scale.
    pub fn summary(&self) -> Result<FittedModel> {
        self.engine
            .as_ref()
            .ok_or(ForecastError::FitRequired)?
            .fitted_model()
    }

    /// Ljung-Box test on the engine's innovation residuals, with degrees
    /// of freedom adjusted for the number of fitted parameters. Warm-up
    /// NaNs are dropped before testing. When `lags` is `None` the default
    /// follows the configured period, so seasonal pipelines test through
    /// lag 2m.
    pub fn residual_diagnostics(&self, lags: Option<usize>) -> Result<LjungBoxResult> {
        let engine = self.engine.as_ref().ok_or(ForecastError::FitRequired)?;
        let residuals = engine
            .forecaster()
            .residuals()
            .ok_or(ForecastError::FitRequired)?;
        let finite: Vec<f64> = residuals.iter().copied().filter(|r| r.is_finite()).collect();
        let lags = lags.unwrap_or_else(|| default_lags(finite.len(), self.config.period));
        Ok(ljung_box(&finite, Some(lags), engine.fitted_params()))
    }

    fn build_engine(&self) -> FittedEngine {
        let config = &self.config;
        match config.engine {
            Engine::AutoEts => FittedEngine::AutoEts(AutoEts::new(
                AutoEtsConfig::new(config.period).with_budget(config.budget),
            )),
            Engine::AutoArima => FittedEngine::AutoArima(AutoArima::new(
                AutoArimaConfig::new(config.period).with_budget(config.budget),
            )),
            Engine::Ets(spec) => FittedEngine::Ets(Ets::new(spec).with_budget(config.budget)),
            Engine::Arima(spec) => {
                FittedEngine::Arima(Arima::new(spec).with_budget(config.budget))
            }
        }
    }
}

impl Forecaster for ForecastPipeline {
    fn fit(&mut self, series: &TimeSeries) -> Result<()> {
        let values = series.values();

        let transform = match self.config.transform {
            TransformChoice::None => TransformSpec::None,
            TransformChoice::Fixed(spec) => spec,
            TransformChoice::EstimateBoxCox => {
                TransformSpec::BoxCox(estimate_lambda(values, self.config.period)?)
            }
        };
        let transformed = transform.forward(values)?;
        let working = TimeSeries::univariate(series.timestamps().to_vec(), transformed)?;

        let mut engine = self.build_engine();
        engine.forecaster_mut().fit(&working)?;

        // Fitted values back on the data scale; warm-up NaNs pass through
        // the inverse untouched and leave NaN residuals.
        let (fitted, residuals) = match engine.forecaster().fitted_values() {
            Some(on_modeling_scale) => {
                let fitted = transform.inverse(on_modeling_scale);
                let residuals = values.iter().zip(&fitted).map(|(y, f)| y - f).collect();
                (fitted, residuals)
            }
            None => (Vec::new(), Vec::new()),
        };

        self.label = match transform {
            TransformSpec::None => engine.forecaster().name().to_string(),
            t => format!("{} [{t}]", engine.forecaster().name()),
        };
        self.transform = Some(transform);
        self.fitted = Some(fitted);
        self.residuals = Some(residuals);
        self.engine = Some(engine);
        Ok(())
    }

    fn forecast(&self, horizon: usize, levels: &[f64]) -> Result<Forecast> {
        let engine = self.engine.as_ref().ok_or(ForecastError::FitRequired)?;
        let transform = self.transform.ok_or(ForecastError::FitRequired)?;
        let on_modeling_scale = engine.forecaster().forecast(horizon, levels)?;
        Ok(map_to_data_scale(transform, on_modeling_scale))
    }

    fn fitted_values(&self) -> Option<&[f64]> {
        self.fitted.as_deref()
    }

    fn residuals(&self) -> Option<&[f64]> {
        self.residuals.as_deref()
    }

    fn name(&self) -> &str {
        &self.label
    }
}

/// Map a modeling-scale forecast back to the data scale.
///
/// Monotone transforms carry quantiles, so interval bounds invert
/// directly; the order-reversing inverse transform swaps them afterwards.
/// Standard errors scale by the derivative of the inverse at the
/// transformed point (delta method).
fn map_to_data_scale(transform: TransformSpec, forecast: Forecast) -> Forecast {
    if transform == TransformSpec::None {
        return forecast;
    }
    let point = transform.inverse(&forecast.point);
    let se = forecast
        .se
        .iter()
        .zip(&forecast.point)
        .map(|(s, w)| s * transform.inverse_derivative(*w).abs())
        .collect();
    let intervals = forecast
        .intervals
        .iter()
        .map(|interval| {
            let mut lower = transform.inverse(&interval.lower);
            let mut upper = transform.inverse(&interval.upper);
            if transform.reverses_order() {
                std::mem::swap(&mut lower, &mut upper);
            }
            PredictionInterval {
                level: interval.level,
                lower,
                upper,
            }
        })
        .collect();
    Forecast::with_uncertainty(point, se, intervals)
}
