//! Conditional-sum-of-squares estimation and forecasting for seasonal
//! ARIMA models.
//!
//! Differencing is applied up front and the stripped boundary values are
//! retained for exact undifferencing of fitted values and forecasts. On
//! the differenced series the model runs in regression form: the composed
//! AR polynomial applies to mean-centered lags, the composed MA polynomial
//! to lagged innovations, and pre-sample innovations are zero. The
//! Gaussian likelihood is evaluated on the post-warm-up span only.

use crate::core::{Coefficient, FittedModel, Forecast, ResidualSet, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::models::traits::{intervals_from_se, validate_levels};
use crate::models::Forecaster;
use crate::selection::{criteria, InformationCriteria};
use crate::transform::{DifferenceSpec, DifferencedSeries};
use crate::utils::{mean, nelder_mead, FitBudget, NelderMeadConfig};

use super::spec::{expand_ar, expand_ma, is_invertible, is_stationary, polymul, ArimaSpec};

const DEFAULT_MAX_ITERATIONS: usize = 2000;
const SIGMA2_FLOOR: f64 = 1e-300;

/// Seasonal ARIMA model estimated by conditional sum of squares.
///
/// # Example
/// ```
/// use chrono::{Duration, TimeZone, Utc};
/// use chronocast::core::TimeSeries;
/// use chronocast::models::{Arima, ArimaSpec, Forecaster};
///
/// let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
/// let timestamps: Vec<_> = (0..30).map(|i| base + Duration::days(i as i64)).collect();
/// let values: Vec<f64> = (0..30).map(|i| 3.0 + 0.5 * i as f64).collect();
/// let series = TimeSeries::univariate(timestamps, values).unwrap();
///
/// // A random walk with drift continues a linear trend exactly.
/// let mut model = Arima::new(ArimaSpec::new(0, 1, 0).with_constant(true));
/// model.fit(&series).unwrap();
/// let forecast = model.predict(2).unwrap();
/// assert!((forecast.point[0] - 18.0).abs() < 1e-9);
/// assert!((forecast.point[1] - 18.5).abs() < 1e-9);
/// ```
#[derive(Debug, Clone)]
pub struct Arima {
    spec: ArimaSpec,
    label: String,
    budget: FitBudget,
    fit: Option<ArimaFit>,
}

/// Everything produced by a successful fit.
#[derive(Debug, Clone)]
struct ArimaFit {
    ar: Vec<f64>,
    ma: Vec<f64>,
    seasonal_ar: Vec<f64>,
    seasonal_ma: Vec<f64>,
    mean: f64,
    /// Composed AR coefficients on the differenced series.
    ar_full: Vec<f64>,
    /// Composed MA coefficients on the differenced series.
    ma_full: Vec<f64>,
    sigma2: f64,
    log_likelihood: f64,
    criteria: InformationCriteria,
    /// Differenced observations plus the boundary values that undo them.
    differenced: DifferencedSeries,
    /// Innovations on the differenced scale, zero over the warm-up span.
    innovations: Vec<f64>,
    /// One-step fitted values on the original scale, NaN over the warm-up.
    fitted: Vec<f64>,
    /// Residuals on the original scale, NaN over the warm-up.
    raw_residuals: Vec<f64>,
    /// Observations actually entering the likelihood.
    n_eff: usize,
}

/// Coefficient vector split back into its blocks. The optimizer sees a
/// flat vector laid out as mean (when present), AR, MA, seasonal AR,
/// seasonal MA.
struct CoefBlocks {
    mean: f64,
    ar: Vec<f64>,
    ma: Vec<f64>,
    seasonal_ar: Vec<f64>,
    seasonal_ma: Vec<f64>,
}

impl CoefBlocks {
    fn unpack(spec: &ArimaSpec, x: &[f64]) -> Self {
        let mut pos = 0;
        let take = |pos: &mut usize, len: usize| -> Vec<f64> {
            let block = x[*pos..*pos + len].to_vec();
            *pos += len;
            block
        };
        let mean = if spec.include_constant {
            pos += 1;
            x[0]
        } else {
            0.0
        };
        Self {
            mean,
            ar: take(&mut pos, spec.p),
            ma: take(&mut pos, spec.q),
            seasonal_ar: take(&mut pos, spec.seasonal_p),
            seasonal_ma: take(&mut pos, spec.seasonal_q),
        }
    }
}

/// One conditional-sum-of-squares sweep over the differenced series.
struct CssPass {
    /// Innovations aligned with the differenced series, zero before the
    /// first predictable step.
    innovations: Vec<f64>,
    sse: f64,
}

/// Run the innovation filter. Returns `None` when the series is too short
/// to predict a single step or the sum of squares overflows.
fn css_pass(w: &[f64], ar_full: &[f64], ma_full: &[f64], mean: f64) -> Option<CssPass> {
    let start = ar_full.len();
    if w.len() <= start {
        return None;
    }
    let mut innovations = vec![0.0; w.len()];
    let mut sse = 0.0;
    for t in start..w.len() {
        let mut pred = mean;
        for (i, &phi) in ar_full.iter().enumerate() {
            pred += phi * (w[t - 1 - i] - mean);
        }
        for (j, &theta) in ma_full.iter().enumerate() {
            if t > j {
                pred += theta * innovations[t - 1 - j];
            }
        }
        let e = w[t] - pred;
        innovations[t] = e;
        sse += e * e;
    }
    if !sse.is_finite() {
        return None;
    }
    Some(CssPass { innovations, sse })
}

impl Arima {
    /// Model for the given order specification, not yet fitted.
    pub fn new(spec: ArimaSpec) -> Self {
        Self {
            label: spec.label(),
            spec,
            budget: FitBudget::default().with_max_iterations(DEFAULT_MAX_ITERATIONS),
            fit: None,
        }
    }

    /// Replace the optimizer budget.
    pub fn with_budget(mut self, budget: FitBudget) -> Self {
        self.budget = budget;
        self
    }

    /// The order specification.
    pub fn spec(&self) -> ArimaSpec {
        self.spec
    }

    /// Innovation variance estimate, once fitted.
    pub fn sigma2(&self) -> Option<f64> {
        self.fit.as_ref().map(|f| f.sigma2)
    }

    /// Gaussian log-likelihood of the fit.
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
        let mut coefficients = Vec::with_capacity(self.spec.num_coefficients());
        for (i, &value) in fit.ar.iter().enumerate() {
            coefficients.push(Coefficient::new(format!("ar{}", i + 1), value));
        }
        for (i, &value) in fit.ma.iter().enumerate() {
            coefficients.push(Coefficient::new(format!("ma{}", i + 1), value));
        }
        for (i, &value) in fit.seasonal_ar.iter().enumerate() {
            coefficients.push(Coefficient::new(format!("sar{}", i + 1), value));
        }
        for (i, &value) in fit.seasonal_ma.iter().enumerate() {
            coefficients.push(Coefficient::new(format!("sma{}", i + 1), value));
        }
        if self.spec.include_constant {
            coefficients.push(Coefficient::new("mean", fit.mean));
        }

        let start = fit.ar_full.len();
        Ok(FittedModel {
            label: self.label.clone(),
            coefficients,
            log_likelihood: fit.log_likelihood,
            criteria: fit.criteria,
            n: fit.n_eff,
            num_params: self.spec.num_coefficients() + 1,
            residuals: ResidualSet {
                fitted: fit.fitted.clone(),
                raw: fit.raw_residuals.clone(),
                innovation: fit.innovations[start..].to_vec(),
            },
        })
    }

    fn fit_values(&mut self, values: &[f64]) -> Result<()> {
        self.spec.validate()?;
        let spec = self.spec;
        let offset = spec.d + spec.period * spec.seasonal_d;
        let ar_span = spec.p + spec.period * spec.seasonal_p;
        // Enough observations that the post-warm-up span keeps the AICc
        // denominator positive.
        let needed = offset + ar_span + spec.num_coefficients() + 3;
        if values.len() < needed {
            return Err(ForecastError::InsufficientData {
                needed,
                got: values.len(),
            });
        }

        let differenced =
            DifferenceSpec::from_orders(spec.d, spec.seasonal_d, spec.period)?.apply(values)?;
        let w = differenced.values();

        let has_coefs = spec.p + spec.q + spec.seasonal_p + spec.seasonal_q > 0;
        let (blocks, pass) = if has_coefs {
            self.estimate(w)?
        } else {
            // Pure differencing model: the mean of the differenced series
            // is the maximum-likelihood constant, no search needed.
            let blocks = CoefBlocks {
                mean: if spec.include_constant { mean(w) } else { 0.0 },
                ar: Vec::new(),
                ma: Vec::new(),
                seasonal_ar: Vec::new(),
                seasonal_ma: Vec::new(),
            };
            let pass = css_pass(w, &[], &[], blocks.mean).ok_or_else(|| {
                ForecastError::UnstableModel(format!("{}: innovation filter diverged", self.label))
            })?;
            (blocks, pass)
        };

        let ar_full = expand_ar(&blocks.ar, &blocks.seasonal_ar, spec.period);
        let ma_full = expand_ma(&blocks.ma, &blocks.seasonal_ma, spec.period);
        let start = ar_full.len();
        let n_eff = w.len() - start;

        let sigma2 = (pass.sse / n_eff as f64).max(SIGMA2_FLOOR);
        let n_f = n_eff as f64;
        let log_likelihood = -0.5 * n_f * ((2.0 * std::f64::consts::PI).ln() + 1.0 + sigma2.ln());
        let k = spec.num_coefficients() + 1;

        // Differencing is linear with unit weight on the current
        // observation, so the innovation is the one-step error on the
        // original scale too.
        let warmup = offset + start;
        let mut fitted = vec![f64::NAN; values.len()];
        let mut raw_residuals = vec![f64::NAN; values.len()];
        for t in warmup..values.len() {
            let e = pass.innovations[t - offset];
            fitted[t] = values[t] - e;
            raw_residuals[t] = e;
        }

        self.fit = Some(ArimaFit {
            ar: blocks.ar,
            ma: blocks.ma,
            seasonal_ar: blocks.seasonal_ar,
            seasonal_ma: blocks.seasonal_ma,
            mean: blocks.mean,
            ar_full,
            ma_full,
            sigma2,
            log_likelihood,
            criteria: criteria(log_likelihood, k, n_eff),
            differenced,
            innovations: pass.innovations,
            fitted,
            raw_residuals,
            n_eff,
        });
        Ok(())
    }

    /// Minimize the conditional sum of squares over the coefficient
    /// vector. Stationarity and invertibility are enforced on the composed
    /// polynomials through an infinite objective rather than box bounds,
    /// which would cut off valid higher-order regions.
    fn estimate(&self, w: &[f64]) -> Result<(CoefBlocks, CssPass)> {
        let spec = self.spec;
        let mut x0 = Vec::with_capacity(spec.num_coefficients());
        if spec.include_constant {
            x0.push(mean(w));
        }
        for order in [spec.p, spec.q, spec.seasonal_p, spec.seasonal_q] {
            for i in 0..order {
                x0.push(0.1 / (i + 1) as f64);
            }
        }

        let objective = |x: &[f64]| -> f64 {
            let blocks = CoefBlocks::unpack(&spec, x);
            let ar_full = expand_ar(&blocks.ar, &blocks.seasonal_ar, spec.period);
            let ma_full = expand_ma(&blocks.ma, &blocks.seasonal_ma, spec.period);
            if !is_stationary(&ar_full) || !is_invertible(&ma_full) {
                return f64::INFINITY;
            }
            match css_pass(w, &ar_full, &ma_full, blocks.mean) {
                Some(pass) => pass.sse,
                None => f64::INFINITY,
            }
        };

        let config = NelderMeadConfig::default().with_budget(self.budget);
        let tolerance = config.tolerance;
        let baseline = objective(&x0);
        let result = nelder_mead(objective, &x0, None, config);

        // A fit is usable when it converged, or when it at least improved
        // on the starting point before the budget ran out.
        let improved = baseline - result.optimal_value > tolerance;
        if !result.optimal_value.is_finite() || !(result.converged || improved) {
            return Err(ForecastError::NonConvergence {
                iterations: result.iterations,
            });
        }

        let blocks = CoefBlocks::unpack(&spec, &result.optimal_point);
        let ar_full = expand_ar(&blocks.ar, &blocks.seasonal_ar, spec.period);
        let ma_full = expand_ma(&blocks.ma, &blocks.seasonal_ma, spec.period);
        if !is_stationary(&ar_full) || !is_invertible(&ma_full) {
            return Err(ForecastError::UnstableModel(format!(
                "{}: AR/MA polynomial has a root inside the unit circle",
                self.label
            )));
        }
        let pass = css_pass(w, &ar_full, &ma_full, blocks.mean).ok_or_else(|| {
            ForecastError::UnstableModel(format!("{}: innovation filter diverged", self.label))
        })?;
        Ok((blocks, pass))
    }

    /// Forecast standard errors from the psi-weight expansion of the full
    /// model, differencing included: `se_h = sigma * sqrt(sum_{j<h} psi_j^2)`.
    fn psi_weight_se(&self, fit: &ArimaFit, horizon: usize) -> Vec<f64> {
        if horizon == 0 {
            return Vec::new();
        }

        // AR side of the full model as a polynomial in B, differencing
        // operators multiplied in.
        let mut full = Vec::with_capacity(fit.ar_full.len() + 1);
        full.push(1.0);
        full.extend(fit.ar_full.iter().map(|c| -c));
        for _ in 0..self.spec.d {
            full = polymul(&full, &[1.0, -1.0]);
        }
        if self.spec.seasonal_d > 0 {
            let mut seasonal = vec![0.0; self.spec.period + 1];
            seasonal[0] = 1.0;
            seasonal[self.spec.period] = -1.0;
            for _ in 0..self.spec.seasonal_d {
                full = polymul(&full, &seasonal);
            }
        }
        let phi_star: Vec<f64> = full[1..].iter().map(|c| -c).collect();

        let mut psi = Vec::with_capacity(horizon);
        psi.push(1.0);
        for j in 1..horizon {
            let mut value = if j <= fit.ma_full.len() {
                fit.ma_full[j - 1]
            } else {
                0.0
            };
            for (i, &phi) in phi_star.iter().enumerate() {
                if j > i {
                    value += phi * psi[j - 1 - i];
                }
            }
            psi.push(value);
        }

        let mut se = Vec::with_capacity(horizon);
        let mut cumulative = 0.0;
        for &weight in &psi {
            cumulative += weight * weight;
            se.push((fit.sigma2 * cumulative).sqrt());
        }
        se
    }
}

impl Forecaster for Arima {
    fn fit(&mut self, series: &TimeSeries) -> Result<()> {
        self.fit_values(series.values())
    }

    fn forecast(&self, horizon: usize, levels: &[f64]) -> Result<Forecast> {
        let fit = self.fit.as_ref().ok_or(ForecastError::FitRequired)?;
        validate_levels(levels)?;

        // Zero-innovation recursion on the differenced scale: future
        // observations are replaced by their predictions and future
        // innovations by zero.
        let mut w_ext = fit.differenced.values().to_vec();
        let mut e_ext = fit.innovations.clone();
        let n_w = w_ext.len();
        for _ in 0..horizon {
            let t = w_ext.len();
            let mut pred = fit.mean;
            for (i, &phi) in fit.ar_full.iter().enumerate() {
                if t > i {
                    pred += phi * (w_ext[t - 1 - i] - fit.mean);
                }
            }
            for (j, &theta) in fit.ma_full.iter().enumerate() {
                if t > j {
                    pred += theta * e_ext[t - 1 - j];
                }
            }
            w_ext.push(pred);
            e_ext.push(0.0);
        }

        // Undifference before any further inversion: the retained boundary
        // values integrate the forecasts back to the original scale.
        let point = fit.differenced.extend(&w_ext[n_w..]);
        let se = self.psi_weight_se(fit, horizon);
        let intervals = intervals_from_se(&point, &se, levels);
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
