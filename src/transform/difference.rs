//! Differencing operators with boundary retention.
//!
//! Differencing shortens a series by `lag` per application; inverting it
//! needs the values that were consumed. [`DifferencedSeries`] keeps, per
//! applied difference, the first `lag` values (exact reconstruction of the
//! whole series) and the last `lag` values (undifferencing forecasts that
//! continue past the end).

use crate::error::{ForecastError, Result};

/// Maximum total seasonal differencing order.
const MAX_SEASONAL_ORDER: usize = 2;
/// Maximum total non-seasonal differencing order.
const MAX_REGULAR_ORDER: usize = 2;

/// One differencing operation: `order` applications at `lag`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DifferenceStep {
    /// Differencing lag: 1 for trend, the seasonal period for seasonal.
    pub lag: usize,
    /// Number of times the lag-difference is applied.
    pub order: usize,
}

/// An ordered list of differencing steps.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DifferenceSpec {
    steps: Vec<DifferenceStep>,
}

impl DifferenceSpec {
    /// No differencing.
    pub fn none() -> Self {
        Self::default()
    }

    /// Build a spec from explicit steps, enforcing the over-differencing
    /// guard: at most 2 seasonal orders and 2 regular orders in total.
    pub fn new(steps: Vec<DifferenceStep>) -> Result<Self> {
        let mut regular = 0;
        let mut seasonal = 0;
        for step in &steps {
            if step.lag == 0 {
                return Err(ForecastError::InvalidTransform(
                    "differencing lag must be at least 1".to_string(),
                ));
            }
            if step.lag == 1 {
                regular += step.order;
            } else {
                seasonal += step.order;
            }
        }
        if regular > MAX_REGULAR_ORDER {
            return Err(ForecastError::InvalidTransform(format!(
                "regular differencing order {regular} exceeds maximum {MAX_REGULAR_ORDER}"
            )));
        }
        if seasonal > MAX_SEASONAL_ORDER {
            return Err(ForecastError::InvalidTransform(format!(
                "seasonal differencing order {seasonal} exceeds maximum {MAX_SEASONAL_ORDER}"
            )));
        }
        Ok(Self { steps })
    }

    /// Seasonal differencing (lag = period) followed by regular differencing.
    pub fn from_orders(d: usize, seasonal_d: usize, period: usize) -> Result<Self> {
        if seasonal_d > 0 && period <= 1 {
            return Err(ForecastError::InvalidTransform(
                "seasonal differencing requires period > 1".to_string(),
            ));
        }
        let mut steps = Vec::new();
        if seasonal_d > 0 {
            steps.push(DifferenceStep {
                lag: period,
                order: seasonal_d,
            });
        }
        if d > 0 {
            steps.push(DifferenceStep { lag: 1, order: d });
        }
        Self::new(steps)
    }

    /// The configured steps in application order.
    pub fn steps(&self) -> &[DifferenceStep] {
        &self.steps
    }

    /// True when no differencing is configured.
    pub fn is_identity(&self) -> bool {
        self.steps.iter().all(|s| s.order == 0)
    }

    /// Observations consumed by applying the spec (sum of lag x order).
    pub fn total_offset(&self) -> usize {
        self.steps.iter().map(|s| s.lag * s.order).sum()
    }

    /// Total regular (lag-1) order.
    pub fn regular_order(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.lag == 1)
            .map(|s| s.order)
            .sum()
    }

    /// Total seasonal (lag > 1) order.
    pub fn seasonal_order(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.lag > 1)
            .map(|s| s.order)
            .sum()
    }

    /// Apply the spec, retaining boundary values for inversion.
    pub fn apply(&self, values: &[f64]) -> Result<DifferencedSeries> {
        let mut current = values.to_vec();
        let mut layers = Vec::new();

        for step in &self.steps {
            for _ in 0..step.order {
                if step.lag >= current.len() {
                    return Err(ForecastError::InvalidTransform(format!(
                        "differencing lag {} exceeds remaining series length {}",
                        step.lag,
                        current.len()
                    )));
                }
                layers.push(BoundaryLayer {
                    lag: step.lag,
                    head: current[..step.lag].to_vec(),
                    tail: current[current.len() - step.lag..].to_vec(),
                });
                current = difference(&current, step.lag);
            }
        }

        Ok(DifferencedSeries {
            values: current,
            layers,
        })
    }
}

/// `values[t] - values[t - lag]` for t >= lag.
pub fn difference(values: &[f64], lag: usize) -> Vec<f64> {
    if lag == 0 || values.len() <= lag {
        return Vec::new();
    }
    (lag..values.len()).map(|t| values[t] - values[t - lag]).collect()
}

/// Boundary values consumed by one application of a lag-difference.
#[derive(Debug, Clone, PartialEq)]
struct BoundaryLayer {
    lag: usize,
    /// First `lag` values of the pre-difference series.
    head: Vec<f64>,
    /// Last `lag` values of the pre-difference series.
    tail: Vec<f64>,
}

/// A differenced series together with the boundary values needed to invert
/// the differencing, both for the observed span and for future values.
#[derive(Debug, Clone, PartialEq)]
pub struct DifferencedSeries {
    values: Vec<f64>,
    layers: Vec<BoundaryLayer>,
}

impl DifferencedSeries {
    /// The differenced values.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Reconstruct the original series exactly.
    pub fn invert(&self) -> Vec<f64> {
        let mut current = self.values.clone();
        for layer in self.layers.iter().rev() {
            let mut rebuilt = Vec::with_capacity(layer.head.len() + current.len());
            rebuilt.extend_from_slice(&layer.head);
            for (i, &diff) in current.iter().enumerate() {
                let prev = rebuilt[i];
                rebuilt.push(diff + prev);
            }
            current = rebuilt;
        }
        current
    }

    /// Undifference `future` values that continue the differenced series
    /// past its end, producing values on the original scale.
    pub fn extend(&self, future: &[f64]) -> Vec<f64> {
        let mut out = future.to_vec();
        for layer in self.layers.iter().rev() {
            for h in 0..out.len() {
                let prev = if h < layer.lag {
                    layer.tail[h]
                } else {
                    out[h - layer.lag]
                };
                out[h] += prev;
            }
            // After integrating this layer, its tail must continue on the
            // next (earlier) layer's scale, which `tail` already is.
        }
        out
    }
}
