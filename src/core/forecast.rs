//! Forecast result records.

/// Interval bounds at one confidence level.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionInterval {
    /// Confidence level in (0, 1), e.g. 0.80.
    pub level: f64,
    /// Lower bound per horizon step.
    pub lower: Vec<f64>,
    /// Upper bound per horizon step.
    pub upper: Vec<f64>,
}

/// A forecast: per-horizon point values, standard errors, and interval
/// bounds at each requested confidence level. Plain data, read access only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Forecast {
    /// Point forecasts, one per horizon step.
    pub point: Vec<f64>,
    /// Standard error of each point forecast (same scale as `point`).
    pub se: Vec<f64>,
    /// One entry per requested confidence level.
    pub intervals: Vec<PredictionInterval>,
}

impl Forecast {
    /// Point-only forecast.
    pub fn from_point(point: Vec<f64>) -> Self {
        Self {
            point,
            se: Vec::new(),
            intervals: Vec::new(),
        }
    }

    /// Forecast with standard errors and interval bounds.
    pub fn with_uncertainty(point: Vec<f64>, se: Vec<f64>, intervals: Vec<PredictionInterval>) -> Self {
        Self {
            point,
            se,
            intervals,
        }
    }

    /// Number of horizon steps.
    pub fn horizon(&self) -> usize {
        self.point.len()
    }

    /// Check whether the forecast holds any steps.
    pub fn is_empty(&self) -> bool {
        self.point.is_empty()
    }

    /// Check whether interval bounds are present.
    pub fn has_intervals(&self) -> bool {
        !self.intervals.is_empty()
    }

    /// Interval bounds at a given confidence level, if requested during
    /// forecasting.
    pub fn interval(&self, level: f64) -> Option<&PredictionInterval> {
        self.intervals
            .iter()
            .find(|pi| (pi.level - level).abs() < 1e-9)
    }
}
