//! Variance-stabilizing power transforms.
//!
//! Every transform is a monotone map with an exact algebraic inverse, so
//! interval bounds computed on the transformed scale map back through
//! [`TransformSpec::inverse`] directly. Lambda for the Box-Cox member is
//! either supplied or estimated once per series with Guerrero's method and
//! then held fixed.

use std::fmt;

use crate::error::{ForecastError, Result};
use crate::utils::optimization::golden_section;
use crate::utils::stats::{mean, std_dev};

/// Lambda search range for Guerrero estimation.
const LAMBDA_LOWER: f64 = -0.9;
const LAMBDA_UPPER: f64 = 2.0;

/// Lambda values this close to zero use the log limit of the Box-Cox map.
const LAMBDA_LOG_EPS: f64 = 1e-10;

/// A reversible variance-stabilizing transform.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum TransformSpec {
    /// Identity.
    #[default]
    None,
    /// Square root.
    Sqrt,
    /// Cube root (sign-preserving).
    CubeRoot,
    /// Natural logarithm.
    Log,
    /// Reciprocal 1/y.
    Inverse,
    /// Box-Cox with fixed lambda in (-1, 2].
    BoxCox(f64),
}

impl fmt::Display for TransformSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransformSpec::None => write!(f, "none"),
            TransformSpec::Sqrt => write!(f, "sqrt"),
            TransformSpec::CubeRoot => write!(f, "cube-root"),
            TransformSpec::Log => write!(f, "log"),
            TransformSpec::Inverse => write!(f, "inverse"),
            TransformSpec::BoxCox(lambda) => write!(f, "box-cox({lambda:.3})"),
        }
    }
}

impl TransformSpec {
    /// Whether the transform requires strictly positive input.
    ///
    /// The cube root is defined on all reals; everything else in the family
    /// needs y > 0 (the reciprocal also needs positivity so the map stays
    /// order-reversing-free after bound swapping, see `inverse`).
    pub fn requires_positive(&self) -> bool {
        !matches!(self, TransformSpec::None | TransformSpec::CubeRoot)
    }

    /// Whether applying this transform flips the ordering of values.
    ///
    /// Interval bounds must be swapped after inverse-mapping through an
    /// order-reversing transform.
    pub fn reverses_order(&self) -> bool {
        matches!(self, TransformSpec::Inverse)
    }

    /// Validate the transform against the data it will be applied to.
    pub fn validate(&self, values: &[f64]) -> Result<()> {
        if let TransformSpec::BoxCox(lambda) = self {
            if !(*lambda > -1.0 && *lambda <= 2.0) {
                return Err(ForecastError::InvalidTransform(format!(
                    "box-cox lambda {lambda} outside (-1, 2]"
                )));
            }
        }
        if self.requires_positive() && values.iter().any(|&y| y <= 0.0) {
            return Err(ForecastError::InvalidTransform(format!(
                "{self} transform requires positive values"
            )));
        }
        Ok(())
    }

    /// Apply the transform.
    pub fn forward(&self, values: &[f64]) -> Result<Vec<f64>> {
        self.validate(values)?;
        let out = match *self {
            TransformSpec::None => values.to_vec(),
            TransformSpec::Sqrt => values.iter().map(|y| y.sqrt()).collect(),
            TransformSpec::CubeRoot => values.iter().map(|y| y.cbrt()).collect(),
            TransformSpec::Log => values.iter().map(|y| y.ln()).collect(),
            TransformSpec::Inverse => values.iter().map(|y| 1.0 / y).collect(),
            TransformSpec::BoxCox(lambda) => values.iter().map(|&y| boxcox(y, lambda)).collect(),
        };
        Ok(out)
    }

    /// Invert the transform.
    ///
    /// Total on all finite input: the Box-Cox inverse clamps its base at
    /// zero before the fractional power, so far-out lower interval bounds
    /// come back as 0 instead of NaN. NaN input stays NaN, which keeps
    /// warm-up fitted values recognizable after the inverse map.
    pub fn inverse(&self, values: &[f64]) -> Vec<f64> {
        match *self {
            TransformSpec::None => values.to_vec(),
            TransformSpec::Sqrt => values.iter().map(|w| w * w).collect(),
            TransformSpec::CubeRoot => values.iter().map(|w| w.powi(3)).collect(),
            TransformSpec::Log => values.iter().map(|w| w.exp()).collect(),
            TransformSpec::Inverse => values.iter().map(|w| 1.0 / w).collect(),
            TransformSpec::BoxCox(lambda) => {
                values.iter().map(|&w| inv_boxcox(w, lambda)).collect()
            }
        }
    }

    /// Derivative of the inverse map at a transformed-scale value, used to
    /// carry standard errors back to the original scale (delta method).
    pub fn inverse_derivative(&self, w: f64) -> f64 {
        match *self {
            TransformSpec::None => 1.0,
            TransformSpec::Sqrt => 2.0 * w,
            TransformSpec::CubeRoot => 3.0 * w * w,
            TransformSpec::Log => w.exp(),
            TransformSpec::Inverse => -1.0 / (w * w),
            TransformSpec::BoxCox(lambda) => {
                if lambda.abs() < LAMBDA_LOG_EPS {
                    w.exp()
                } else {
                    let base = lambda * w + 1.0;
                    let base = if base < 0.0 { 0.0 } else { base };
                    base.powf(1.0 / lambda - 1.0)
                }
            }
        }
    }
}

fn boxcox(y: f64, lambda: f64) -> f64 {
    if lambda.abs() < LAMBDA_LOG_EPS {
        y.ln()
    } else {
        (y.powf(lambda) - 1.0) / lambda
    }
}

fn inv_boxcox(w: f64, lambda: f64) -> f64 {
    if lambda.abs() < LAMBDA_LOG_EPS {
        w.exp()
    } else {
        // Comparison clamp: f64::max(0.0) would swallow warm-up NaNs.
        let base = lambda * w + 1.0;
        let base = if base < 0.0 { 0.0 } else { base };
        base.powf(1.0 / lambda)
    }
}

/// Estimate the Box-Cox lambda with Guerrero's method over the default
/// range (-0.9, 2.0].
///
/// The series is split into consecutive blocks of length `period` (length 2
/// when non-seasonal); lambda is chosen to minimize the coefficient of
/// variation of `s_i / mean_i^(1 - lambda)` across blocks, i.e. to make the
/// block spread independent of the block level.
pub fn estimate_lambda(values: &[f64], period: usize) -> Result<f64> {
    estimate_lambda_within(values, period, LAMBDA_LOWER, LAMBDA_UPPER)
}

/// Guerrero lambda estimation over an explicit closed interval.
pub fn estimate_lambda_within(
    values: &[f64],
    period: usize,
    lower: f64,
    upper: f64,
) -> Result<f64> {
    if values.iter().any(|&y| y <= 0.0) {
        return Err(ForecastError::InvalidTransform(
            "lambda estimation requires positive values".to_string(),
        ));
    }
    let block_len = period.max(2);
    if values.len() < 2 * block_len {
        return Err(ForecastError::InsufficientData {
            needed: 2 * block_len,
            got: values.len(),
        });
    }

    let blocks: Vec<(f64, f64)> = values
        .chunks_exact(block_len)
        .map(|block| (mean(block), std_dev(block)))
        .collect();

    let objective = |lambda: f64| {
        let ratios: Vec<f64> = blocks
            .iter()
            .map(|&(m, s)| s / m.powf(1.0 - lambda))
            .collect();
        let center = mean(&ratios);
        if center.abs() < f64::EPSILON {
            return f64::INFINITY;
        }
        let cv = std_dev(&ratios) / center;
        if cv.is_finite() {
            cv
        } else {
            f64::INFINITY
        }
    };

    Ok(golden_section(objective, lower, upper, 1e-6))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn roundtrip(spec: TransformSpec, values: &[f64]) {
        let forward = spec.forward(values).unwrap();
        let back = spec.inverse(&forward);
        for (orig, rec) in values.iter().zip(back.iter()) {
            assert_relative_eq!(orig, rec, max_relative = 1e-9);
        }
    }

    #[test]
    fn all_transforms_round_trip() {
        let values = vec![0.5, 1.0, 2.0, 3.5, 10.0, 100.0];
        for spec in [
            TransformSpec::None,
            TransformSpec::Sqrt,
            TransformSpec::CubeRoot,
            TransformSpec::Log,
            TransformSpec::Inverse,
            TransformSpec::BoxCox(0.5),
            TransformSpec::BoxCox(-0.5),
            TransformSpec::BoxCox(2.0),
            TransformSpec::BoxCox(0.0),
        ] {
            roundtrip(spec, &values);
        }
    }

    #[test]
    fn cube_root_handles_negative_values() {
        roundtrip(TransformSpec::CubeRoot, &[-8.0, -1.0, 0.0, 1.0, 27.0]);
    }

    #[test]
    fn near_zero_lambda_uses_log_limit() {
        let values = vec![1.0, 2.0, 3.0];
        let bc = TransformSpec::BoxCox(1e-12).forward(&values).unwrap();
        let log = TransformSpec::Log.forward(&values).unwrap();
        for (a, b) in bc.iter().zip(log.iter()) {
            assert_relative_eq!(a, b, epsilon = 1e-10);
        }
    }

    #[test]
    fn positivity_is_enforced() {
        let values = vec![1.0, 0.0, 2.0];
        for spec in [
            TransformSpec::Sqrt,
            TransformSpec::Log,
            TransformSpec::Inverse,
            TransformSpec::BoxCox(0.5),
        ] {
            assert!(matches!(
                spec.forward(&values),
                Err(ForecastError::InvalidTransform(_))
            ));
        }
        assert!(TransformSpec::None.forward(&values).is_ok());
        assert!(TransformSpec::CubeRoot.forward(&values).is_ok());
    }

    #[test]
    fn lambda_outside_range_is_rejected() {
        assert!(TransformSpec::BoxCox(-1.0).forward(&[1.0]).is_err());
        assert!(TransformSpec::BoxCox(2.5).forward(&[1.0]).is_err());
        assert!(TransformSpec::BoxCox(2.0).forward(&[1.0]).is_ok());
    }

    #[test]
    fn boxcox_inverse_clamps_out_of_domain_bounds() {
        // lambda*w + 1 < 0 for w = -5, lambda = 0.5; the clamp maps it to 0.
        let back = TransformSpec::BoxCox(0.5).inverse(&[-5.0]);
        assert_eq!(back[0], 0.0);
    }

    #[test]
    fn boxcox_inverse_passes_nan_through() {
        for lambda in [0.5, -0.5, 0.0] {
            let spec = TransformSpec::BoxCox(lambda);
            assert!(spec.inverse(&[f64::NAN])[0].is_nan(), "lambda {lambda}");
            assert!(spec.inverse_derivative(f64::NAN).is_nan(), "lambda {lambda}");
        }
    }

    #[test]
    fn boxcox_known_values() {
        let out = TransformSpec::BoxCox(2.0).forward(&[1.0, 2.0, 3.0]).unwrap();
        assert_relative_eq!(out[0], 0.0, epsilon = 1e-10);
        assert_relative_eq!(out[1], 1.5, epsilon = 1e-10);
        assert_relative_eq!(out[2], 4.0, epsilon = 1e-10);
    }

    #[test]
    fn inverse_transform_reverses_order() {
        assert!(TransformSpec::Inverse.reverses_order());
        assert!(!TransformSpec::Log.reverses_order());

        // 1/y flips which bound is larger.
        let (a, b) = (1.0, 2.0);
        let inv = TransformSpec::Inverse.inverse(&[a, b]);
        assert!(inv[0] > inv[1]);
    }

    #[test]
    fn inverse_derivative_matches_finite_difference() {
        let h = 1e-6;
        for spec in [
            TransformSpec::Sqrt,
            TransformSpec::CubeRoot,
            TransformSpec::Log,
            TransformSpec::Inverse,
            TransformSpec::BoxCox(0.5),
        ] {
            let w = 1.7;
            let exact = spec.inverse_derivative(w);
            let numeric = (spec.inverse(&[w + h])[0] - spec.inverse(&[w - h])[0]) / (2.0 * h);
            assert_relative_eq!(exact, numeric, max_relative = 1e-4);
        }
    }

    #[test]
    fn display_labels() {
        assert_eq!(TransformSpec::Log.to_string(), "log");
        assert_eq!(TransformSpec::BoxCox(0.5).to_string(), "box-cox(0.500)");
    }

    #[test]
    fn guerrero_lambda_near_zero_for_level_proportional_spread() {
        // Each length-4 block has spread proportional to its level, the
        // signature of a log-scale series.
        let pattern = [-0.1, 0.05, 0.12, -0.07];
        let mut values = Vec::new();
        for block in 0..8 {
            let level = 10.0 * 1.8_f64.powi(block);
            for p in pattern {
                values.push(level * (1.0 + p));
            }
        }

        let lambda = estimate_lambda(&values, 4).unwrap();
        assert!(lambda.abs() < 0.3, "lambda = {lambda}");
    }

    #[test]
    fn guerrero_lambda_near_one_for_constant_spread() {
        // Additive noise with level-independent spread wants no transform.
        let pattern = [-1.0, 0.5, 1.2, -0.7];
        let mut values = Vec::new();
        for block in 0..8 {
            let level = 50.0 + 10.0 * block as f64;
            for p in pattern {
                values.push(level + p);
            }
        }

        let lambda = estimate_lambda(&values, 4).unwrap();
        assert!(lambda > 0.7, "lambda = {lambda}");
    }

    #[test]
    fn guerrero_requires_positive_data_and_two_blocks() {
        assert!(matches!(
            estimate_lambda(&[1.0, -1.0, 2.0, 3.0], 2),
            Err(ForecastError::InvalidTransform(_))
        ));
        assert!(matches!(
            estimate_lambda(&[1.0, 2.0, 3.0], 2),
            Err(ForecastError::InsufficientData { .. })
        ));
    }

    #[test]
    fn guerrero_non_seasonal_uses_pair_blocks() {
        let values: Vec<f64> = (1..=20).map(|i| i as f64).collect();
        let lambda = estimate_lambda(&values, 1).unwrap();
        assert!((LAMBDA_LOWER..=LAMBDA_UPPER).contains(&lambda));
    }
}
