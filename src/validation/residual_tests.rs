//! White-noise tests for model residuals.
//!
//! A fitted model should leave no autocorrelation behind in its innovations;
//! the Ljung-Box test quantifies how much remains. A failed test is a
//! reported diagnostic, never an error.

use statrs::distribution::{ChiSquared, ContinuousCDF};

/// Ljung-Box test result.
#[derive(Debug, Clone)]
pub struct LjungBoxResult {
    /// Test statistic Q
    pub statistic: f64,
    /// P-value
    pub p_value: f64,
    /// Number of lags tested
    pub lags: usize,
    /// Degrees of freedom (lags minus fitted parameters, at least one)
    pub df: usize,
}

impl LjungBoxResult {
    /// Whether the residuals look like white noise at significance `alpha`
    /// (true when the null of independence is not rejected).
    pub fn is_white_noise(&self, alpha: f64) -> bool {
        self.p_value > alpha
    }
}

/// Ljung-Box portmanteau test for residual autocorrelation.
///
/// Null hypothesis: the residuals are independently distributed. The
/// statistic is `Q = n(n+2) Σ_{k=1..l} r_k² / (n-k)` with `r_k` the lag-k
/// sample autocorrelation, compared against a chi-square distribution with
/// `l - fitted_params` degrees of freedom (floored at one).
///
/// # Arguments
/// * `residuals` - Model innovations
/// * `lags` - Number of lags `l` (default: min(10, n/5))
/// * `fitted_params` - Parameters estimated by the model, subtracted from
///   the degrees of freedom
pub fn ljung_box(residuals: &[f64], lags: Option<usize>, fitted_params: usize) -> LjungBoxResult {
    let n = residuals.len();

    if n < 3 {
        return LjungBoxResult {
            statistic: f64::NAN,
            p_value: f64::NAN,
            lags: 0,
            df: 0,
        };
    }

    let lags = lags.unwrap_or_else(|| default_lags(n, 1));
    let lags = lags.clamp(1, n - 1);
    let df = lags.saturating_sub(fitted_params).max(1);

    let mean: f64 = residuals.iter().sum::<f64>() / n as f64;
    let centered: Vec<f64> = residuals.iter().map(|&x| x - mean).collect();

    let denom: f64 = centered.iter().map(|&x| x * x).sum();
    if denom == 0.0 {
        // Zero-variance residuals carry no autocorrelation signal.
        return LjungBoxResult {
            statistic: 0.0,
            p_value: 1.0,
            lags,
            df,
        };
    }

    let mut q = 0.0;
    for k in 1..=lags {
        let r_k: f64 = centered
            .iter()
            .skip(k)
            .zip(centered.iter())
            .map(|(&a, &b)| a * b)
            .sum::<f64>()
            / denom;
        q += r_k * r_k / (n - k) as f64;
    }
    q *= n as f64 * (n + 2) as f64;

    let p_value = chi_squared_sf(q, df);

    LjungBoxResult {
        statistic: q,
        p_value,
        lags,
        df,
    }
}

/// Default lag count for the Ljung-Box test: min(10, n/5) for non-seasonal
/// data, min(2·period, n/5) when a seasonal period is known. Always at
/// least one.
pub fn default_lags(n: usize, period: usize) -> usize {
    let base = if period > 1 { 2 * period } else { 10 };
    base.min(n / 5).max(1)
}

/// Chi-square survival function P(X > x).
fn chi_squared_sf(x: f64, df: usize) -> f64 {
    if x <= 0.0 || df == 0 {
        return 1.0;
    }
    match ChiSquared::new(df as f64) {
        Ok(dist) => dist.sf(x),
        Err(_) => f64::NAN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn pseudo_noise(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| ((i * 17 + 13) % 97) as f64 / 50.0 - 1.0)
            .collect()
    }

    /// Twelve summed uniform draws per sample, approximately standard normal.
    fn gaussian_noise(seed: u64, n: usize) -> Vec<f64> {
        let mut state = seed;
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            let mut sum = 0.0;
            for _ in 0..12 {
                state = state
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(1442695040888963407);
                sum += (state >> 11) as f64 / (1u64 << 53) as f64;
            }
            out.push(sum - 6.0);
        }
        out
    }

    // ==================== ljung_box ====================

    #[test]
    fn ljung_box_statistic_and_bounds() {
        let result = ljung_box(&pseudo_noise(100), Some(10), 0);

        assert!(result.statistic >= 0.0);
        assert!(result.p_value >= 0.0 && result.p_value <= 1.0);
        assert_eq!(result.lags, 10);
        assert_eq!(result.df, 10);
    }

    #[test]
    fn ljung_box_rejects_ar_residuals() {
        // AR(1) with coefficient 0.9 retains heavy autocorrelation.
        let mut residuals = vec![0.0; 100];
        residuals[0] = 1.0;
        for i in 1..100 {
            residuals[i] = 0.9 * residuals[i - 1] + 0.1 * ((i * 17) % 23) as f64 / 23.0;
        }

        let result = ljung_box(&residuals, Some(10), 0);

        assert!(result.statistic > 0.0);
        assert!(result.p_value < 0.01);
        assert!(!result.is_white_noise(0.05));
    }

    #[test]
    fn ljung_box_rejection_rate_tracks_the_significance_level() {
        // Binomial(200, 0.05) puts the count near 10.
        let mut rejections = 0;
        for trial in 0..200u64 {
            let noise = gaussian_noise(trial * 104_729 + 17, 1000);
            if ljung_box(&noise, Some(10), 0).p_value < 0.05 {
                rejections += 1;
            }
        }
        assert!(
            (4..=22).contains(&rejections),
            "rejected {rejections} of 200 white-noise trials at alpha 0.05"
        );
    }

    #[test]
    fn ljung_box_constant_residuals() {
        let result = ljung_box(&[1.0; 50], Some(5), 0);

        assert_eq!(result.statistic, 0.0);
        assert_eq!(result.p_value, 1.0);
    }

    #[test]
    fn ljung_box_short() {
        let result = ljung_box(&[1.0, 2.0], Some(5), 0);
        assert!(result.statistic.is_nan());
    }

    #[test]
    fn ljung_box_empty() {
        let result = ljung_box(&[], Some(5), 0);
        assert!(result.statistic.is_nan());
    }

    #[test]
    fn ljung_box_is_white_noise() {
        let result = LjungBoxResult {
            statistic: 5.0,
            p_value: 0.3,
            lags: 10,
            df: 10,
        };

        assert!(result.is_white_noise(0.05));
        assert!(!result.is_white_noise(0.5));
    }

    #[test]
    fn ljung_box_df_adjustment() {
        let residuals = pseudo_noise(100);

        let plain = ljung_box(&residuals, Some(10), 0);
        let adjusted = ljung_box(&residuals, Some(10), 2);

        assert_eq!(plain.df, 10);
        assert_eq!(adjusted.df, 8);
        // Same statistic, fewer degrees of freedom.
        assert_relative_eq!(plain.statistic, adjusted.statistic);
        assert!(adjusted.p_value <= plain.p_value);
    }

    #[test]
    fn ljung_box_df_floor() {
        let result = ljung_box(&pseudo_noise(100), Some(3), 10);
        assert_eq!(result.df, 1);
    }

    #[test]
    fn ljung_box_lags_clamped_to_series() {
        let result = ljung_box(&pseudo_noise(10), Some(50), 0);
        assert!(result.lags <= 9);
    }

    // ==================== default_lags ====================

    #[test]
    fn default_lags_nonseasonal() {
        assert_eq!(default_lags(100, 1), 10);
        assert_eq!(default_lags(30, 1), 6);
        assert_eq!(default_lags(4, 1), 1);
    }

    #[test]
    fn default_lags_seasonal() {
        assert_eq!(default_lags(200, 12), 24);
        assert_eq!(default_lags(60, 12), 12);
        assert_eq!(default_lags(60, 4), 8);
    }

    // ==================== chi_squared_sf ====================

    #[test]
    fn chi_squared_sf_zero() {
        assert_eq!(chi_squared_sf(0.0, 5), 1.0);
    }

    #[test]
    fn chi_squared_sf_known_values() {
        // df=2 is the exponential distribution: P(X > 2) = e^{-1}.
        assert_relative_eq!(chi_squared_sf(2.0, 2), (-1.0f64).exp(), epsilon = 1e-9);

        // Upper 5% point of chi-square with 10 df.
        let p = chi_squared_sf(18.307, 10);
        assert_relative_eq!(p, 0.05, epsilon = 1e-3);
    }
}
