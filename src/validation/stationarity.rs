//! Unit-root diagnostics and differencing-order selection.
//!
//! The KPSS test drives the automatic choice of regular differencing order
//! (`ndiffs`); a classical-decomposition seasonal-strength heuristic drives
//! the seasonal order (`nsdiffs`). An Augmented Dickey-Fuller test is kept
//! as a second opinion with the opposite null hypothesis.

use crate::transform::difference;
use crate::utils::variance;

/// Seasonal strength at or above this level calls for one seasonal difference.
const SEASONAL_STRENGTH_THRESHOLD: f64 = 0.64;

/// Result of a unit-root test.
#[derive(Debug, Clone)]
pub struct StationarityResult {
    /// Test statistic
    pub statistic: f64,
    /// P-value (approximate)
    pub p_value: f64,
    /// Number of lags used
    pub lags: usize,
    /// Whether the series appears stationary
    pub is_stationary: bool,
    /// Critical values at common significance levels
    pub critical_values: CriticalValues,
}

/// Critical values for unit-root tests.
#[derive(Debug, Clone, Default)]
pub struct CriticalValues {
    /// Critical value at 1% significance
    pub cv_1pct: f64,
    /// Critical value at 5% significance
    pub cv_5pct: f64,
    /// Critical value at 10% significance
    pub cv_10pct: f64,
}

/// KPSS test for level stationarity.
///
/// Null hypothesis: the series is stationary around a constant level.
/// Rejection (statistic above the critical value) implies a unit root,
/// i.e. the series should be differenced.
///
/// # Arguments
/// * `series` - Time series data
/// * `lags` - Bandwidth for the HAC variance (default: ⌊4·(n/100)^0.25⌋)
pub fn kpss_test(series: &[f64], lags: Option<usize>) -> StationarityResult {
    let n = series.len();

    if n < 4 {
        return StationarityResult {
            statistic: f64::NAN,
            p_value: f64::NAN,
            lags: 0,
            is_stationary: false,
            critical_values: CriticalValues::default(),
        };
    }

    let lags = lags.unwrap_or_else(|| (4.0 * (n as f64 / 100.0).powf(0.25)).floor() as usize);
    let lags = lags.clamp(1, n / 2);

    // Residuals from the level-stationary null: demeaned series.
    let mean: f64 = series.iter().sum::<f64>() / n as f64;
    let residuals: Vec<f64> = series.iter().map(|&x| x - mean).collect();

    // Partial sums S_t and the numerator Σ S_t² / n².
    let mut cumsum = 0.0;
    let mut numerator = 0.0;
    for &r in &residuals {
        cumsum += r;
        numerator += cumsum * cumsum;
    }
    numerator /= (n * n) as f64;

    // Long-run variance: Bartlett-kernel HAC estimator.
    let mut long_run_var = residuals.iter().map(|&r| r * r).sum::<f64>() / n as f64;
    for j in 1..=lags {
        let weight = 1.0 - j as f64 / (lags + 1) as f64;
        let autocovar: f64 = residuals
            .iter()
            .skip(j)
            .zip(residuals.iter())
            .map(|(&a, &b)| a * b)
            .sum::<f64>()
            / n as f64;
        long_run_var += 2.0 * weight * autocovar;
    }

    let critical_values = kpss_critical_values();

    if long_run_var <= 0.0 {
        // Degenerate (e.g. constant) series: nothing to difference away.
        return StationarityResult {
            statistic: f64::NAN,
            p_value: f64::NAN,
            lags,
            is_stationary: true,
            critical_values,
        };
    }

    let statistic = numerator / long_run_var;
    let p_value = kpss_p_value(statistic);
    let is_stationary = statistic < critical_values.cv_5pct;

    StationarityResult {
        statistic,
        p_value,
        lags,
        is_stationary,
        critical_values,
    }
}

fn kpss_critical_values() -> CriticalValues {
    CriticalValues {
        cv_1pct: 0.739,
        cv_5pct: 0.463,
        cv_10pct: 0.347,
    }
}

/// Tabulated KPSS critical value for a significance level.
fn kpss_critical_value(alpha: f64) -> f64 {
    let cv = kpss_critical_values();
    if alpha <= 0.01 {
        cv.cv_1pct
    } else if alpha <= 0.05 {
        cv.cv_5pct
    } else {
        cv.cv_10pct
    }
}

/// Piecewise-linear p-value interpolation over the KPSS critical-value table.
fn kpss_p_value(statistic: f64) -> f64 {
    if statistic.is_nan() {
        return f64::NAN;
    }

    if statistic < 0.347 {
        0.10 + 0.90 * (1.0 - statistic / 0.347)
    } else if statistic < 0.463 {
        0.05 + 0.05 * (0.463 - statistic) / (0.463 - 0.347)
    } else if statistic < 0.739 {
        0.01 + 0.04 * (0.739 - statistic) / (0.739 - 0.463)
    } else {
        0.01 * (1.0 - (statistic - 0.739).min(1.0)).max(0.0)
    }
}

/// Number of regular (lag-1) differences needed for stationarity.
///
/// Greedy: keep differencing while the KPSS test rejects stationarity at
/// `alpha`, capped at `max_d` (never more than two).
pub fn ndiffs(series: &[f64], max_d: usize, alpha: f64) -> usize {
    let cap = max_d.min(2);
    let critical = kpss_critical_value(alpha);

    let mut working = series.to_vec();
    let mut d = 0;
    while d < cap {
        let result = kpss_test(&working, None);
        if result.statistic.is_nan() || result.statistic <= critical {
            break;
        }
        working = difference(&working, 1);
        d += 1;
    }
    d
}

/// Number of seasonal (lag-`period`) differences needed.
///
/// Applies one seasonal difference while the seasonal strength of the working
/// series stays at or above 0.64, capped at `max_d` (never more than two;
/// one is the usual cap for the model search).
pub fn nsdiffs(series: &[f64], period: usize, max_d: usize) -> usize {
    if period < 2 {
        return 0;
    }

    let cap = max_d.min(2);
    let mut working = series.to_vec();
    let mut d = 0;
    while d < cap {
        match seasonal_strength(&working, period) {
            Some(strength) if strength >= SEASONAL_STRENGTH_THRESHOLD => {
                working = difference(&working, period);
                d += 1;
            }
            _ => break,
        }
    }
    d
}

/// Strength of the seasonal pattern at `period`, in [0, 1].
///
/// Classical decomposition: detrend with a centered moving average, average
/// the detrended values by seasonal position, and compare the remainder
/// variance against the detrended variance: `1 - var(r) / var(s + r)`.
/// Returns `None` when the series is too short (fewer than three full cycles)
/// or the detrended variance is degenerate.
pub fn seasonal_strength(series: &[f64], period: usize) -> Option<f64> {
    let n = series.len();
    if period < 2 || n < 3 * period {
        return None;
    }

    let trend = centered_moving_average(series, period);
    let offset = period / 2;

    // Detrended values aligned with their original positions.
    let detrended: Vec<f64> = trend
        .iter()
        .enumerate()
        .map(|(i, &t)| series[i + offset] - t)
        .collect();

    // Mean of the detrended series by seasonal position.
    let mut position_sums = vec![0.0; period];
    let mut position_counts = vec![0usize; period];
    for (i, &v) in detrended.iter().enumerate() {
        let pos = (i + offset) % period;
        position_sums[pos] += v;
        position_counts[pos] += 1;
    }
    let position_means: Vec<f64> = position_sums
        .iter()
        .zip(&position_counts)
        .map(|(&s, &c)| if c > 0 { s / c as f64 } else { 0.0 })
        .collect();

    let remainder: Vec<f64> = detrended
        .iter()
        .enumerate()
        .map(|(i, &v)| v - position_means[(i + offset) % period])
        .collect();

    let var_detrended = variance(&detrended);
    if var_detrended < 1e-10 {
        return None;
    }

    Some((1.0 - variance(&remainder) / var_detrended).clamp(0.0, 1.0))
}

/// Centered moving average of window `period`; for an even window the two
/// half-weighted endpoints make it the classical 2×m average. The result is
/// shorter than the input by `period` (even) or `period - 1` (odd) values.
fn centered_moving_average(series: &[f64], period: usize) -> Vec<f64> {
    let n = series.len();
    if period % 2 == 1 {
        let k = period / 2;
        (k..n - k)
            .map(|t| series[t - k..=t + k].iter().sum::<f64>() / period as f64)
            .collect()
    } else {
        let k = period / 2;
        (k..n - k)
            .map(|t| {
                let window = &series[t - k..=t + k];
                let inner: f64 = window[1..period].iter().sum();
                (inner + 0.5 * (window[0] + window[period])) / period as f64
            })
            .collect()
    }
}

/// Augmented Dickey-Fuller test for a unit root.
///
/// Null hypothesis: the series has a unit root (non-stationary); rejection
/// implies stationarity. Note the null is the reverse of [`kpss_test`].
/// Kept as a cross-check; the automatic differencing decision uses KPSS.
///
/// # Arguments
/// * `series` - Time series data
/// * `max_lags` - Maximum augmentation lags (default: ⌊(n-1)^(1/3)⌋)
pub fn adf_test(series: &[f64], max_lags: Option<usize>) -> StationarityResult {
    let n = series.len();

    let critical_values = CriticalValues {
        cv_1pct: -3.43,
        cv_5pct: -2.86,
        cv_10pct: -2.57,
    };

    if n < 4 {
        return StationarityResult {
            statistic: f64::NAN,
            p_value: f64::NAN,
            lags: 0,
            is_stationary: false,
            critical_values,
        };
    }

    let max_lags = max_lags.unwrap_or_else(|| ((n - 1) as f64).powf(1.0 / 3.0).floor() as usize);
    let max_lags = max_lags.clamp(1, n / 2 - 1);

    let diff: Vec<f64> = series.windows(2).map(|w| w[1] - w[0]).collect();
    let level = &series[..n - 1];

    // Pick the augmentation lag by AIC over the Dickey-Fuller regression.
    let mut best_lag = 1;
    let mut best_aic = f64::INFINITY;
    for lag in 1..=max_lags {
        if let Some(reg) = level_regression(&diff, level, lag) {
            let aic = reg.aic(lag + 2);
            if aic < best_aic {
                best_aic = aic;
                best_lag = lag;
            }
        }
    }

    let stat = level_regression(&diff, level, best_lag).and_then(|reg| reg.t_statistic());
    let Some(t_stat) = stat else {
        return StationarityResult {
            statistic: f64::NAN,
            p_value: f64::NAN,
            lags: best_lag,
            is_stationary: false,
            critical_values,
        };
    };

    let p_value = adf_p_value(t_stat);
    let is_stationary = t_stat < critical_values.cv_5pct;

    StationarityResult {
        statistic: t_stat,
        p_value,
        lags: best_lag,
        is_stationary,
        critical_values,
    }
}

/// OLS fit of `Δy_t = α + β·y_{t-1} + ε_t` over the post-`lag` sample.
struct LevelRegression {
    slope: f64,
    slope_xx: f64,
    rss: f64,
    n_eff: usize,
}

impl LevelRegression {
    /// AIC of the regression with `k` parameters.
    fn aic(&self, k: usize) -> f64 {
        if self.rss <= 0.0 || self.n_eff < 3 {
            return f64::INFINITY;
        }
        let n = self.n_eff as f64;
        n * (self.rss / n).ln() + 2.0 * k as f64
    }

    /// t statistic of the level coefficient, `None` when degenerate.
    fn t_statistic(&self) -> Option<f64> {
        if self.n_eff < 3 {
            return None;
        }
        let sigma_sq = self.rss / (self.n_eff - 2) as f64;
        if sigma_sq <= 0.0 || self.slope_xx <= 0.0 {
            return None;
        }
        let se = (sigma_sq / self.slope_xx).sqrt();
        if se == 0.0 || se.is_nan() {
            return None;
        }
        Some(self.slope / se)
    }
}

fn level_regression(diff: &[f64], level: &[f64], lag: usize) -> Option<LevelRegression> {
    let n = diff.len();
    let start = lag;
    if n <= start + 2 || level.len() < n {
        return None;
    }

    let n_eff = n - start;
    let y_mean: f64 = diff[start..].iter().sum::<f64>() / n_eff as f64;
    let x_mean: f64 = level[start..n].iter().sum::<f64>() / n_eff as f64;

    let mut xx = 0.0;
    let mut xy = 0.0;
    let mut yy = 0.0;
    for i in start..n {
        let x = level[i] - x_mean;
        let y = diff[i] - y_mean;
        xx += x * x;
        xy += x * y;
        yy += y * y;
    }

    if xx == 0.0 {
        return None;
    }

    let slope = xy / xx;
    let rss = yy - slope * xy;

    Some(LevelRegression {
        slope,
        slope_xx: xx,
        rss,
        n_eff,
    })
}

/// Approximate ADF p-value from the tabulated tau distribution (constant,
/// no trend), piecewise over the usual critical points.
fn adf_p_value(t_stat: f64) -> f64 {
    if t_stat.is_nan() {
        return f64::NAN;
    }

    if t_stat < -4.0 {
        0.001
    } else if t_stat < -3.43 {
        0.01
    } else if t_stat < -2.86 {
        0.05
    } else if t_stat < -2.57 {
        0.10
    } else if t_stat < -1.94 {
        0.20
    } else if t_stat < -1.62 {
        0.30
    } else if t_stat < -1.28 {
        0.40
    } else if t_stat < -0.84 {
        0.50
    } else if t_stat < 0.0 {
        0.70
    } else {
        0.90 + 0.05 * (1.0 - (-t_stat).exp())
    }
}
