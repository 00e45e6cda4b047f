//! Innovations state-space filter shared by all ETS combinations.
//!
//! A single recursion covers the whole taxonomy. Each step forms the
//! one-step forecast `mu` from the current state, records the innovation in
//! the form the error component dictates, and rewrites the state from the
//! observation itself:
//!
//! ```text
//! q  = level + damped trend
//! mu = q | q + s | q * s            (season component)
//! e  = y - mu | (y - mu) / mu       (error component)
//! p  = y | y - s | y / s
//! level' = q + alpha * (p - q)
//! trend' = q_b + beta * (level' - level - q_b)    q_b = damped trend
//! s'     = s + gamma * (d - s)      d = y - q | y / q
//! ```
//!
//! Expanding the multiplicative-error update equations shows they reduce to
//! exactly this observation form, so the error component only changes which
//! innovation is recorded (and the Jacobian term in the likelihood), never
//! the state path.

use super::spec::{ErrorComponent, EtsSpec, SeasonComponent, TrendComponent};

/// Denominators smaller than this reject the parameter point.
const MIN_DENOM: f64 = 1e-10;

/// Smoothing parameters. Unused entries are ignored by the recursion:
/// `beta` and `phi` only matter with a trend component, `gamma` only with
/// a seasonal one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothingParams {
    /// Level smoothing factor.
    pub alpha: f64,
    /// Trend smoothing factor, relative to level changes.
    pub beta: f64,
    /// Seasonal smoothing factor.
    pub gamma: f64,
    /// Trend damping factor; 1.0 leaves the trend undamped.
    pub phi: f64,
}

impl Default for SmoothingParams {
    fn default() -> Self {
        Self {
            alpha: 0.3,
            beta: 0.1,
            gamma: 0.1,
            phi: 1.0,
        }
    }
}

/// Level, trend, and per-position seasonal states.
///
/// `seasonal[t % m]` is the index in effect at time `t`, so the vector never
/// rotates; each step overwrites the slot it consumed.
#[derive(Debug, Clone, PartialEq)]
pub struct EtsState {
    pub level: f64,
    pub trend: f64,
    pub seasonal: Vec<f64>,
}

/// Everything one filtering sweep produces.
#[derive(Debug, Clone)]
pub(crate) struct FilterPass {
    /// One-step-ahead forecasts, aligned with the observations.
    pub(crate) fitted: Vec<f64>,
    /// Innovations in the error component's own form.
    pub(crate) innovations: Vec<f64>,
    /// Sum of squared innovations.
    pub(crate) sse: f64,
    /// `sum(ln |mu_t|)`, the Jacobian term; zero for additive errors.
    pub(crate) log_scale: f64,
    /// State after the final observation.
    pub(crate) state: EtsState,
}

fn damped_trend(spec: &EtsSpec, params: &SmoothingParams, state: &EtsState) -> f64 {
    match spec.trend {
        TrendComponent::None => 0.0,
        TrendComponent::Additive => state.trend,
        TrendComponent::Damped => params.phi * state.trend,
    }
}

/// Forecast for time `t` from the state before observing it.
pub(crate) fn one_step_forecast(
    spec: &EtsSpec,
    params: &SmoothingParams,
    state: &EtsState,
    t: usize,
) -> f64 {
    let q = state.level + damped_trend(spec, params, state);
    match spec.season {
        SeasonComponent::None => q,
        SeasonComponent::Additive => q + state.seasonal[t % spec.period],
        SeasonComponent::Multiplicative => q * state.seasonal[t % spec.period],
    }
}

/// Advance the state past observation `y` at time `t`.
///
/// Returns the one-step forecast and the innovation, or `None` when the
/// parameter point degenerates (a divisor vanishes or a state leaves the
/// finite range).
pub(crate) fn advance(
    spec: &EtsSpec,
    params: &SmoothingParams,
    state: &mut EtsState,
    t: usize,
    y: f64,
) -> Option<(f64, f64)> {
    let q_b = damped_trend(spec, params, state);
    let q = state.level + q_b;

    let slot = t % spec.period;
    let s = match spec.season {
        SeasonComponent::None => 0.0,
        _ => state.seasonal[slot],
    };

    let mu = match spec.season {
        SeasonComponent::None => q,
        SeasonComponent::Additive => q + s,
        SeasonComponent::Multiplicative => q * s,
    };

    let e = match spec.error {
        ErrorComponent::Additive => y - mu,
        ErrorComponent::Multiplicative => {
            if mu.abs() < MIN_DENOM {
                return None;
            }
            (y - mu) / mu
        }
    };
    if !mu.is_finite() || !e.is_finite() {
        return None;
    }

    // Observation with the seasonal effect removed.
    let p = match spec.season {
        SeasonComponent::None => y,
        SeasonComponent::Additive => y - s,
        SeasonComponent::Multiplicative => {
            if s.abs() < MIN_DENOM {
                return None;
            }
            y / s
        }
    };

    let new_level = q + params.alpha * (p - q);
    if !new_level.is_finite() {
        return None;
    }

    if spec.has_trend() {
        let new_trend = q_b + params.beta * (new_level - state.level - q_b);
        if !new_trend.is_finite() {
            return None;
        }
        state.trend = new_trend;
    }

    if spec.has_season() {
        // Observation with level and trend removed.
        let d = match spec.season {
            SeasonComponent::Additive => y - q,
            SeasonComponent::Multiplicative => {
                if q.abs() < MIN_DENOM {
                    return None;
                }
                y / q
            }
            SeasonComponent::None => unreachable!(),
        };
        let new_seasonal = s + params.gamma * (d - s);
        if !new_seasonal.is_finite() {
            return None;
        }
        state.seasonal[slot] = new_seasonal;
    }

    state.level = new_level;
    Some((mu, e))
}

/// Filter the whole series from an initial state.
pub(crate) fn run_filter(
    spec: &EtsSpec,
    params: &SmoothingParams,
    mut state: EtsState,
    values: &[f64],
) -> Option<FilterPass> {
    let mut fitted = Vec::with_capacity(values.len());
    let mut innovations = Vec::with_capacity(values.len());
    let mut sse = 0.0;
    let mut log_scale = 0.0;

    for (t, &y) in values.iter().enumerate() {
        let (mu, e) = advance(spec, params, &mut state, t, y)?;
        fitted.push(mu);
        innovations.push(e);
        sse += e * e;
        if spec.error == ErrorComponent::Multiplicative {
            log_scale += mu.abs().ln();
        }
    }
    if !sse.is_finite() {
        return None;
    }

    Some(FilterPass {
        fitted,
        innovations,
        sse,
        log_scale,
        state,
    })
}

/// Moment-based initial state used to seed the optimizer.
///
/// Seasonal models average up to three full cycles: the first cycle mean
/// seeds the level, the gap between the first two cycle means seeds the
/// trend, and per-position deviations from (or ratios to) the cycle means
/// seed the seasonal indices before normalization.
pub(crate) fn heuristic_state(spec: &EtsSpec, values: &[f64]) -> EtsState {
    if spec.has_season() {
        let m = spec.period;
        let cycles = (values.len() / m).min(3).max(1);
        let cycle_means: Vec<f64> = (0..cycles)
            .map(|k| values[k * m..(k + 1) * m].iter().sum::<f64>() / m as f64)
            .collect();

        let level = cycle_means[0];
        let trend = if spec.has_trend() && cycles > 1 {
            (cycle_means[1] - cycle_means[0]) / m as f64
        } else {
            0.0
        };

        let multiplicative = spec.season == SeasonComponent::Multiplicative;
        let mut seasonal = vec![0.0; m];
        for (j, slot) in seasonal.iter_mut().enumerate() {
            let mut acc = 0.0;
            for (k, &c) in cycle_means.iter().enumerate() {
                let y = values[k * m + j];
                acc += if multiplicative {
                    if c.abs() < MIN_DENOM {
                        1.0
                    } else {
                        y / c
                    }
                } else {
                    y - c
                };
            }
            *slot = acc / cycles as f64;
        }

        // Normalize so the indices are mean-zero (additive) or mean-one
        // (multiplicative) over a cycle.
        let mean = seasonal.iter().sum::<f64>() / m as f64;
        for s in &mut seasonal {
            if multiplicative {
                if mean.abs() >= MIN_DENOM {
                    *s /= mean;
                }
            } else {
                *s -= mean;
            }
        }

        EtsState {
            level,
            trend,
            seasonal,
        }
    } else {
        let level = values[0];
        let trend = if spec.has_trend() && values.len() > 1 {
            values[1] - values[0]
        } else {
            0.0
        };
        EtsState {
            level,
            trend,
            seasonal: Vec::new(),
        }
    }
}

/// `phi + phi^2 + ... + phi^h`, the damped growth multiplier at horizon `h`.
pub(crate) fn damped_sum(phi: f64, h: usize) -> f64 {
    if (phi - 1.0).abs() < MIN_DENOM {
        h as f64
    } else {
        phi * (1.0 - phi.powi(h as i32)) / (1.0 - phi)
    }
}

/// Zero-innovation point forecasts from a final state.
///
/// `start` is the time index of the first forecast step, i.e. the length of
/// the series the state was filtered over.
pub(crate) fn forecast_path(
    spec: &EtsSpec,
    params: &SmoothingParams,
    state: &EtsState,
    start: usize,
    horizon: usize,
) -> Vec<f64> {
    (1..=horizon)
        .map(|h| {
            let growth = match spec.trend {
                TrendComponent::None => 0.0,
                TrendComponent::Additive => h as f64 * state.trend,
                TrendComponent::Damped => damped_sum(params.phi, h) * state.trend,
            };
            let q = state.level + growth;
            match spec.season {
                SeasonComponent::None => q,
                SeasonComponent::Additive => q + state.seasonal[(start + h - 1) % spec.period],
                SeasonComponent::Multiplicative => {
                    q * state.seasonal[(start + h - 1) % spec.period]
                }
            }
        })
        .collect()
}
