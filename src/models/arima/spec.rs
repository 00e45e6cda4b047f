//! Seasonal ARIMA order specification and lag-polynomial algebra.
//!
//! A specification is the order tuple (p, d, q)(P, D, Q)[m] plus a constant
//! flag. The regular and seasonal polynomial pairs are composed by
//! convolution into single AR and MA coefficient vectors before estimation,
//! so the filter itself never distinguishes seasonal from regular lags.

use std::fmt;

use crate::error::{ForecastError, Result};
use crate::selection::DifferencingId;

/// Cap on each of p, q, P, and Q.
const MAX_ORDER: usize = 5;
/// Cap on the regular differencing order.
const MAX_REGULAR_D: usize = 2;
/// Cap on the seasonal differencing order.
const MAX_SEASONAL_D: usize = 2;

/// Seasonal ARIMA order specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArimaSpec {
    /// Regular AR order.
    pub p: usize,
    /// Regular differencing order.
    pub d: usize,
    /// Regular MA order.
    pub q: usize,
    /// Seasonal AR order.
    pub seasonal_p: usize,
    /// Seasonal differencing order.
    pub seasonal_d: usize,
    /// Seasonal MA order.
    pub seasonal_q: usize,
    /// Seasonal period; 1 means non-seasonal.
    pub period: usize,
    /// Whether a mean term is estimated on the differenced series.
    pub include_constant: bool,
}

impl ArimaSpec {
    /// Non-seasonal specification. The constant defaults to on for `d = 0`
    /// and off otherwise, matching the usual convention that differenced
    /// series are modeled without drift.
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self {
            p,
            d,
            q,
            seasonal_p: 0,
            seasonal_d: 0,
            seasonal_q: 0,
            period: 1,
            include_constant: d == 0,
        }
    }

    /// Seasonal specification (p, d, q)(P, D, Q)[period].
    #[allow(clippy::too_many_arguments)]
    pub fn seasonal(
        p: usize,
        d: usize,
        q: usize,
        seasonal_p: usize,
        seasonal_d: usize,
        seasonal_q: usize,
        period: usize,
    ) -> Self {
        Self {
            p,
            d,
            q,
            seasonal_p,
            seasonal_d,
            seasonal_q,
            period,
            include_constant: d + seasonal_d == 0,
        }
    }

    /// Override the constant flag.
    pub fn with_constant(mut self, include_constant: bool) -> Self {
        self.include_constant = include_constant;
        self
    }

    /// Check the order caps and the seasonal/period consistency.
    pub fn validate(&self) -> Result<()> {
        if self.p > MAX_ORDER
            || self.q > MAX_ORDER
            || self.seasonal_p > MAX_ORDER
            || self.seasonal_q > MAX_ORDER
        {
            return Err(ForecastError::InvalidOrder(format!(
                "AR/MA orders are capped at {MAX_ORDER}, got {}",
                self.label()
            )));
        }
        if self.d > MAX_REGULAR_D {
            return Err(ForecastError::InvalidOrder(format!(
                "regular differencing order {} exceeds maximum {MAX_REGULAR_D}",
                self.d
            )));
        }
        if self.seasonal_d > MAX_SEASONAL_D {
            return Err(ForecastError::InvalidOrder(format!(
                "seasonal differencing order {} exceeds maximum {MAX_SEASONAL_D}",
                self.seasonal_d
            )));
        }
        let seasonal_part = self.seasonal_p + self.seasonal_d + self.seasonal_q;
        if seasonal_part > 0 && self.period < 2 {
            return Err(ForecastError::InvalidOrder(
                "seasonal orders require a period of at least 2".to_string(),
            ));
        }
        Ok(())
    }

    /// Standard label, e.g. "ARIMA(1,1,1)(0,1,1)[12]" or
    /// "ARIMA(1,0,0) with mean".
    pub fn label(&self) -> String {
        let mut label = format!("ARIMA({},{},{})", self.p, self.d, self.q);
        if self.period > 1 && self.seasonal_p + self.seasonal_d + self.seasonal_q > 0 {
            label.push_str(&format!(
                "({},{},{})[{}]",
                self.seasonal_p, self.seasonal_d, self.seasonal_q, self.period
            ));
        }
        if self.include_constant {
            label.push_str(" with mean");
        }
        label
    }

    /// Number of estimated coefficients (AR + MA + seasonal AR + seasonal
    /// MA + constant), excluding the error variance.
    pub fn num_coefficients(&self) -> usize {
        self.p
            + self.q
            + self.seasonal_p
            + self.seasonal_q
            + usize::from(self.include_constant)
    }

    /// The differencing this specification fits under.
    pub fn differencing(&self) -> DifferencingId {
        DifferencingId {
            regular: self.d,
            seasonal: self.seasonal_d,
        }
    }
}

impl fmt::Display for ArimaSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Polynomial product by convolution.
pub(crate) fn polymul(a: &[f64], b: &[f64]) -> Vec<f64> {
    if a.is_empty() || b.is_empty() {
        return Vec::new();
    }
    let mut out = vec![0.0; a.len() + b.len() - 1];
    for (i, &x) in a.iter().enumerate() {
        if x == 0.0 {
            continue;
        }
        for (j, &y) in b.iter().enumerate() {
            out[i + j] += x * y;
        }
    }
    out
}

/// Characteristic polynomial `1 + sign*c_1 B^s + sign*c_2 B^{2s} + ...`
/// with coefficients placed at multiples of `stride`.
fn char_poly(coefs: &[f64], stride: usize, sign: f64) -> Vec<f64> {
    let mut poly = vec![0.0; coefs.len() * stride + 1];
    poly[0] = 1.0;
    for (k, &c) in coefs.iter().enumerate() {
        poly[(k + 1) * stride] = sign * c;
    }
    poly
}

/// Compose regular and seasonal AR coefficients into the single vector
/// `phi~` used by the regression form `w_t = mean + sum phi~_i (w_{t-i} -
/// mean) + ...`: expand `(1 - sum phi_i B^i)(1 - sum PHI_k B^{km})` and
/// negate the tail.
pub(crate) fn expand_ar(ar: &[f64], seasonal_ar: &[f64], period: usize) -> Vec<f64> {
    let poly = polymul(
        &char_poly(ar, 1, -1.0),
        &char_poly(seasonal_ar, period.max(1), -1.0),
    );
    poly[1..].iter().map(|c| -c).collect()
}

/// Compose regular and seasonal MA coefficients with the positive
/// convention `(1 + sum theta_j B^j)(1 + sum THETA_k B^{km})`; the tail is
/// the composed `theta~` applied directly to lagged innovations.
pub(crate) fn expand_ma(ma: &[f64], seasonal_ma: &[f64], period: usize) -> Vec<f64> {
    let poly = polymul(
        &char_poly(ma, 1, 1.0),
        &char_poly(seasonal_ma, period.max(1), 1.0),
    );
    poly[1..].to_vec()
}

/// Whether every root of `1 - sum c_i z^i` lies outside the unit circle,
/// by the Schur-Cohn step-down: the final coefficient of each reduced
/// polynomial is a partial autocorrelation, and stationarity holds exactly
/// when all of them are inside (-1, 1). A small margin also rejects roots
/// on the circle itself.
pub(crate) fn is_stationary(coefs: &[f64]) -> bool {
    const MARGIN: f64 = 1e-8;
    let mut c = coefs.to_vec();
    while !c.is_empty() {
        let k = c.len();
        let last = c[k - 1];
        if !last.is_finite() || last.abs() >= 1.0 - MARGIN {
            return false;
        }
        if k == 1 {
            return true;
        }
        let denom = 1.0 - last * last;
        c = (0..k - 1)
            .map(|j| (c[j] + last * c[k - 2 - j]) / denom)
            .collect();
    }
    true
}

/// Invertibility of an MA polynomial in the positive convention: the same
/// root condition as stationarity, applied to the sign-flipped tail.
pub(crate) fn is_invertible(ma: &[f64]) -> bool {
    let flipped: Vec<f64> = ma.iter().map(|c| -c).collect();
    is_stationary(&flipped)
}
