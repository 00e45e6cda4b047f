//! Estimation and forecasting for a single ETS specification.
//!
//! Fitting maximizes the concentrated Gaussian likelihood of the innovations
//! over the smoothing parameters and the initial states jointly, using
//! bounded Nelder-Mead from a moment-based start. The error variance is
//! concentrated out analytically, and multiplicative-error models carry the
//! `sum(ln |mu_t|)` Jacobian so their likelihoods stay comparable with
//! additive-error fits on the same data.

use rand::distributions::Distribution;
use rand::rngs::StdRng;
use rand::SeedableRng;
use statrs::distribution::Normal;

use crate::core::{
    Coefficient, FittedModel, Forecast, PredictionInterval, ResidualSet, TimeSeries,
};
use crate::error::{ForecastError, Result};
use crate::models::traits::{intervals_from_se, validate_levels};
use crate::models::Forecaster;
use crate::selection::{criteria, InformationCriteria};
use crate::utils::{empirical_quantile, nelder_mead, std_dev, FitBudget, NelderMeadConfig};

use super::filter::{
    advance, damped_sum, forecast_path, heuristic_state, one_step_forecast, run_filter, EtsState,
    SmoothingParams,
};
use super::spec::{ErrorComponent, EtsSpec, SeasonComponent, TrendComponent};

const DEFAULT_MAX_ITERATIONS: usize = 2000;
const DEFAULT_SIMULATION_PATHS: usize = 2000;
const DEFAULT_SEED: u64 = 42;

/// Floor applied to the concentrated variance so perfect fits (constant
/// series) keep a finite likelihood.
const SIGMA2_FLOOR: f64 = 1e-300;

const SMOOTHING_BOUNDS: (f64, f64) = (1e-4, 0.9999);
const PHI_BOUNDS: (f64, f64) = (0.8001, 0.998);
const POSITIVE_FLOOR: f64 = 1e-8;

/// Exponential smoothing model with a fixed specification.
///
/// # Example
/// ```
/// use chrono::{Duration, TimeZone, Utc};
/// use chronocast::core::TimeSeries;
/// use chronocast::models::{ErrorComponent, Ets, EtsSpec, Forecaster, TrendComponent};
///
/// let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
/// let timestamps: Vec<_> = (0..12).map(|i| start + Duration::days(i)).collect();
/// let values = (0..12).map(|i| 5.0 + 0.1 * (i as f64).sin()).collect();
/// let series = TimeSeries::univariate(timestamps, values).unwrap();
///
/// let mut model = Ets::new(EtsSpec::non_seasonal(
///     ErrorComponent::Additive,
///     TrendComponent::None,
/// ));
/// model.fit(&series).unwrap();
///
/// let forecast = model.forecast(4, &[0.80]).unwrap();
/// assert_eq!(forecast.point.len(), 4);
/// assert!(forecast.interval(0.80).is_some());
/// ```
#[derive(Debug, Clone)]
pub struct Ets {
    spec: EtsSpec,
    label: String,
    budget: FitBudget,
    simulation_paths: usize,
    seed: u64,
    fit: Option<EtsFit>,
}

#[derive(Debug, Clone)]
struct EtsFit {
    params: SmoothingParams,
    initial_state: EtsState,
    final_state: EtsState,
    fitted: Vec<f64>,
    raw_residuals: Vec<f64>,
    innovations: Vec<f64>,
    sigma2: f64,
    log_likelihood: f64,
    criteria: InformationCriteria,
    n: usize,
}

impl Ets {
    /// Unfitted model for the given specification.
    pub fn new(spec: EtsSpec) -> Self {
        Self {
            spec,
            label: spec.label(),
            budget: FitBudget::default().with_max_iterations(DEFAULT_MAX_ITERATIONS),
            simulation_paths: DEFAULT_SIMULATION_PATHS,
            seed: DEFAULT_SEED,
            fit: None,
        }
    }

    /// Replace the optimizer budget.
    pub fn with_budget(mut self, budget: FitBudget) -> Self {
        self.budget = budget;
        self
    }

    /// Number of sample paths used for simulated intervals.
    pub fn with_simulation_paths(mut self, paths: usize) -> Self {
        self.simulation_paths = paths;
        self
    }

    /// Seed for the interval simulation; forecasts are reproducible for a
    /// fixed seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// The model specification.
    pub fn spec(&self) -> EtsSpec {
        self.spec
    }

    /// Estimated smoothing parameters, once fitted.
    pub fn params(&self) -> Option<&SmoothingParams> {
        self.fit.as_ref().map(|f| &f.params)
    }

    /// Estimated initial state, once fitted.
    pub fn initial_state(&self) -> Option<&EtsState> {
        self.fit.as_ref().map(|f| &f.initial_state)
    }

    /// State after the last observation, once fitted.
    pub fn final_state(&self) -> Option<&EtsState> {
        self.fit.as_ref().map(|f| &f.final_state)
    }

    /// Concentrated innovation variance estimate.
    pub fn sigma2(&self) -> Option<f64> {
        self.fit.as_ref().map(|f| f.sigma2)
    }

    /// Maximized log-likelihood.
    pub fn log_likelihood(&self) -> Option<f64> {
        self.fit.as_ref().map(|f| f.log_likelihood)
    }

    /// Information criteria for the fit.
    pub fn criteria(&self) -> Option<InformationCriteria> {
        self.fit.as_ref().map(|f| f.criteria)
    }

    /// Full fit summary with named coefficients and residual sequences.
    pub fn fitted_model(&self) -> Result<FittedModel> {
        let fit = self.fit.as_ref().ok_or(ForecastError::FitRequired)?;
        let spec = &self.spec;

        let mut coefficients = vec![Coefficient::new("alpha", fit.params.alpha)];
        if spec.has_trend() {
            coefficients.push(Coefficient::new("beta", fit.params.beta));
        }
        if spec.damped() {
            coefficients.push(Coefficient::new("phi", fit.params.phi));
        }
        if spec.has_season() {
            coefficients.push(Coefficient::new("gamma", fit.params.gamma));
        }
        coefficients.push(Coefficient::new("l0", fit.initial_state.level));
        if spec.has_trend() {
            coefficients.push(Coefficient::new("b0", fit.initial_state.trend));
        }
        for (j, s) in fit.initial_state.seasonal.iter().enumerate() {
            coefficients.push(Coefficient::new(format!("s{j}"), *s));
        }

        Ok(FittedModel {
            label: self.label.clone(),
            coefficients,
            log_likelihood: fit.log_likelihood,
            criteria: fit.criteria,
            n: fit.n,
            num_params: spec.num_params() + 1,
            residuals: ResidualSet {
                fitted: fit.fitted.clone(),
                raw: fit.raw_residuals.clone(),
                innovation: fit.innovations.clone(),
            },
        })
    }

    fn fit_values(&mut self, values: &[f64]) -> Result<()> {
        let needed = self.spec.min_observations();
        if values.len() < needed {
            return Err(ForecastError::InsufficientData {
                needed,
                got: values.len(),
            });
        }
        if self.spec.requires_positive() && values.iter().any(|&v| v <= 0.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "{} requires strictly positive observations",
                self.label
            )));
        }

        let spec = self.spec;
        let n = values.len();
        let seed_state = heuristic_state(&spec, values);
        let x0 = initial_point(&spec, &seed_state);
        let bounds = parameter_bounds(&spec);

        let objective = |x: &[f64]| -> f64 {
            let (params, state) = unpack(&spec, x);
            match run_filter(&spec, &params, state, values) {
                Some(pass) => concentrated_nll(pass.sse, pass.log_scale, n),
                None => f64::INFINITY,
            }
        };

        let config = NelderMeadConfig::default().with_budget(self.budget);
        let tolerance = config.tolerance;
        let baseline = objective(&x0);
        let result = nelder_mead(objective, &x0, Some(&bounds), config);

        // A fit is usable when it converged, or when it at least improved
        // on the heuristic start before the budget ran out.
        let improved = baseline - result.optimal_value > tolerance;
        if !result.optimal_value.is_finite() || !(result.converged || improved) {
            return Err(ForecastError::NonConvergence {
                iterations: result.iterations,
            });
        }

        let (params, mut initial_state) = unpack(&spec, &result.optimal_point);
        renormalize_seasonal(&spec, &mut initial_state);

        let pass = run_filter(&spec, &params, initial_state.clone(), values).ok_or(
            ForecastError::NonConvergence {
                iterations: result.iterations,
            },
        )?;

        let sigma2 = (pass.sse / n as f64).max(SIGMA2_FLOOR);
        let log_likelihood = -concentrated_nll(pass.sse, pass.log_scale, n);
        let k = spec.num_params() + 1;
        let raw_residuals = values
            .iter()
            .zip(&pass.fitted)
            .map(|(y, f)| y - f)
            .collect();

        self.fit = Some(EtsFit {
            params,
            initial_state,
            final_state: pass.state,
            fitted: pass.fitted,
            raw_residuals,
            innovations: pass.innovations,
            sigma2,
            log_likelihood,
            criteria: criteria(log_likelihood, k, n),
            n,
        });
        Ok(())
    }

    /// Additive-error models without a multiplicative season admit the
    /// closed-form forecast variance; the rest are simulated.
    fn has_analytic_variance(&self) -> bool {
        self.spec.error == ErrorComponent::Additive
            && self.spec.season != SeasonComponent::Multiplicative
    }

    fn analytic_se(&self, fit: &EtsFit, horizon: usize) -> Vec<f64> {
        let params = &fit.params;
        let mut cumulative = 0.0;
        let mut se = Vec::with_capacity(horizon);
        for h in 1..=horizon {
            if h > 1 {
                let j = h - 1;
                let mut c = params.alpha;
                match self.spec.trend {
                    TrendComponent::None => {}
                    TrendComponent::Additive => c += params.alpha * params.beta * j as f64,
                    TrendComponent::Damped => {
                        c += params.alpha * params.beta * damped_sum(params.phi, j)
                    }
                }
                if self.spec.season == SeasonComponent::Additive && j % self.spec.period == 0 {
                    c += params.gamma;
                }
                cumulative += c * c;
            }
            se.push((fit.sigma2 * (1.0 + cumulative)).sqrt());
        }
        se
    }

    /// Simulated forecast uncertainty: the per-horizon standard deviation
    /// across sample paths, and interval bounds as empirical path
    /// quantiles (asymmetric for multiplicative families, where the
    /// Gaussian symmetry does not hold on the data scale).
    fn simulated_uncertainty(
        &self,
        fit: &EtsFit,
        point: &[f64],
        horizon: usize,
        levels: &[f64],
    ) -> Result<(Vec<f64>, Vec<PredictionInterval>)> {
        let sigma = fit.sigma2.sqrt();
        let normal = Normal::new(0.0, sigma)
            .map_err(|e| ForecastError::InvalidParameter(format!("simulation noise: {e}")))?;
        let mut rng = StdRng::seed_from_u64(self.seed);
        let spec = &self.spec;

        let mut paths: Vec<Vec<f64>> = Vec::with_capacity(self.simulation_paths);
        'path: for _ in 0..self.simulation_paths {
            let mut state = fit.final_state.clone();
            let mut path = Vec::with_capacity(horizon);
            for h in 0..horizon {
                let t = fit.n + h;
                let mu = one_step_forecast(spec, &fit.params, &state, t);
                if !mu.is_finite() {
                    continue 'path;
                }
                let eps = normal.sample(&mut rng);
                let y = match spec.error {
                    ErrorComponent::Additive => mu + eps,
                    ErrorComponent::Multiplicative => mu * (1.0 + eps),
                };
                if advance(spec, &fit.params, &mut state, t, y).is_none() {
                    continue 'path;
                }
                path.push(y);
            }
            paths.push(path);
        }

        if paths.len() < 2 {
            // Too few admissible sample paths; approximate with the
            // additive formula, rescaled to the forecast level for
            // relative errors, and Gaussian bounds around it.
            let base = self.analytic_se(fit, horizon);
            let se: Vec<f64> = match spec.error {
                ErrorComponent::Additive => base,
                ErrorComponent::Multiplicative => base
                    .iter()
                    .zip(point)
                    .map(|(s, p)| s * p.abs())
                    .collect(),
            };
            let intervals = intervals_from_se(point, &se, levels);
            return Ok((se, intervals));
        }

        let columns: Vec<Vec<f64>> = (0..horizon)
            .map(|h| paths.iter().map(|p| p[h]).collect())
            .collect();
        let se = columns.iter().map(|c| std_dev(c)).collect();
        let intervals = levels
            .iter()
            .map(|&level| {
                let tail = (1.0 - level) / 2.0;
                PredictionInterval {
                    level,
                    lower: columns
                        .iter()
                        .map(|c| empirical_quantile(c, tail))
                        .collect(),
                    upper: columns
                        .iter()
                        .map(|c| empirical_quantile(c, 1.0 - tail))
                        .collect(),
                }
            })
            .collect();
        Ok((se, intervals))
    }
}

impl Forecaster for Ets {
    fn fit(&mut self, series: &TimeSeries) -> Result<()> {
        self.fit_values(series.values())
    }

    fn forecast(&self, horizon: usize, levels: &[f64]) -> Result<Forecast> {
        let fit = self.fit.as_ref().ok_or(ForecastError::FitRequired)?;
        validate_levels(levels)?;

        let point = forecast_path(&self.spec, &fit.params, &fit.final_state, fit.n, horizon);
        let (se, intervals) = if self.has_analytic_variance() {
            let se = self.analytic_se(fit, horizon);
            let intervals = intervals_from_se(&point, &se, levels);
            (se, intervals)
        } else {
            self.simulated_uncertainty(fit, &point, horizon, levels)?
        };
        Ok(Forecast::with_uncertainty(point, se, intervals))
    }

    fn fitted_values(&self) -> Option<&[f64]> {
        self.fit.as_ref().map(|f| f.fitted.as_slice())
    }

    fn residuals(&self) -> Option<&[f64]> {
        self.fit.as_ref().map(|f| f.raw_residuals.as_slice())
    }

    fn name(&self) -> &str {
        &self.label
    }
}

/// Negative concentrated log-likelihood from one filtering sweep.
fn concentrated_nll(sse: f64, log_scale: f64, n: usize) -> f64 {
    let n = n as f64;
    let sigma2 = (sse / n).max(SIGMA2_FLOOR);
    0.5 * n * ((2.0 * std::f64::consts::PI).ln() + 1.0 + sigma2.ln()) + log_scale
}

/// Parameter vector layout: smoothing parameters (alpha, beta, phi, gamma,
/// each only when its component is present), then level, trend, and the
/// seasonal indices.
fn initial_point(spec: &EtsSpec, state: &EtsState) -> Vec<f64> {
    let mut x = vec![0.3];
    if spec.has_trend() {
        x.push(0.1);
    }
    if spec.damped() {
        x.push(0.98);
    }
    if spec.has_season() {
        x.push(0.1);
    }
    x.push(state.level);
    if spec.has_trend() {
        x.push(state.trend);
    }
    if spec.has_season() {
        x.extend_from_slice(&state.seasonal);
    }
    x
}

fn parameter_bounds(spec: &EtsSpec) -> Vec<(f64, f64)> {
    let unbounded = (f64::NEG_INFINITY, f64::INFINITY);
    let positive = (POSITIVE_FLOOR, f64::INFINITY);

    let mut bounds = vec![SMOOTHING_BOUNDS];
    if spec.has_trend() {
        bounds.push(SMOOTHING_BOUNDS);
    }
    if spec.damped() {
        bounds.push(PHI_BOUNDS);
    }
    if spec.has_season() {
        bounds.push(SMOOTHING_BOUNDS);
    }
    bounds.push(if spec.requires_positive() {
        positive
    } else {
        unbounded
    });
    if spec.has_trend() {
        bounds.push(unbounded);
    }
    if spec.has_season() {
        let per_index = if spec.season == SeasonComponent::Multiplicative {
            positive
        } else {
            unbounded
        };
        bounds.extend(std::iter::repeat(per_index).take(spec.period));
    }
    bounds
}

fn unpack(spec: &EtsSpec, x: &[f64]) -> (SmoothingParams, EtsState) {
    let mut pos = 0;
    let take = |pos: &mut usize| {
        let v = x[*pos];
        *pos += 1;
        v
    };

    let alpha = take(&mut pos);
    let beta = if spec.has_trend() { take(&mut pos) } else { 0.0 };
    let phi = if spec.damped() { take(&mut pos) } else { 1.0 };
    let gamma = if spec.has_season() { take(&mut pos) } else { 0.0 };
    let level = take(&mut pos);
    let trend = if spec.has_trend() { take(&mut pos) } else { 0.0 };
    let seasonal = if spec.has_season() {
        x[pos..pos + spec.period].to_vec()
    } else {
        Vec::new()
    };

    (
        SmoothingParams {
            alpha,
            beta,
            gamma,
            phi,
        },
        EtsState {
            level,
            trend,
            seasonal,
        },
    )
}

/// Pin the seasonal indices to mean zero (additive) or mean one
/// (multiplicative), compensating the level and trend so every fitted value
/// and innovation is unchanged. The optimizer leaves the split between
/// level and seasonal mean unidentified; this fixes the reported states.
fn renormalize_seasonal(spec: &EtsSpec, state: &mut EtsState) {
    if !spec.has_season() {
        return;
    }
    let mean = state.seasonal.iter().sum::<f64>() / spec.period as f64;
    match spec.season {
        SeasonComponent::Additive => {
            for s in &mut state.seasonal {
                *s -= mean;
            }
            state.level += mean;
        }
        SeasonComponent::Multiplicative => {
            if mean.abs() < 1e-10 {
                return;
            }
            for s in &mut state.seasonal {
                *s /= mean;
            }
            state.level *= mean;
            state.trend *= mean;
        }
        SeasonComponent::None => {}
    }
}
