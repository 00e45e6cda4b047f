//! Univariate time series container.

use chrono::{DateTime, Duration, Utc};

use crate::error::{ForecastError, Result};

/// A univariate time series with strictly increasing timestamps.
///
/// The fitting path requires finite values and no gaps; construction
/// validates finiteness and timestamp ordering, while spacing is only
/// consulted when future timestamps are extrapolated.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    timestamps: Vec<DateTime<Utc>>,
    values: Vec<f64>,
}

impl TimeSeries {
    /// Create a univariate series, validating shape and ordering.
    pub fn univariate(timestamps: Vec<DateTime<Utc>>, values: Vec<f64>) -> Result<Self> {
        if timestamps.len() != values.len() {
            return Err(ForecastError::InvalidParameter(format!(
                "timestamps ({}) and values ({}) must have equal length",
                timestamps.len(),
                values.len()
            )));
        }
        for pair in timestamps.windows(2) {
            if pair[1] <= pair[0] {
                return Err(ForecastError::TimestampError(
                    "timestamps must be strictly increasing".to_string(),
                ));
            }
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::InvalidParameter(
                "series values must be finite".to_string(),
            ));
        }
        Ok(Self { timestamps, values })
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check whether the series is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Observation values in time order.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Observation timestamps in time order.
    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    /// The sampling step, taken from the first inter-timestamp delta.
    pub fn step(&self) -> Result<Duration> {
        if self.len() < 2 {
            return Err(ForecastError::InsufficientData {
                needed: 2,
                got: self.len(),
            });
        }
        Ok(self.timestamps[1] - self.timestamps[0])
    }

    /// Extrapolate `horizon` timestamps past the end of the series.
    pub fn future_timestamps(&self, horizon: usize) -> Result<Vec<DateTime<Utc>>> {
        let step = self.step()?;
        let last = *self.timestamps.last().ok_or(ForecastError::EmptyData)?;
        Ok((1..=horizon as i32).map(|i| last + step * i).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn hourly(n: usize) -> Vec<DateTime<Utc>> {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        (0..n).map(|i| base + Duration::hours(i as i64)).collect()
    }

    #[test]
    fn univariate_accepts_valid_input() {
        let ts = TimeSeries::univariate(hourly(3), vec![1.0, 2.0, 3.0]).unwrap();
        assert_eq!(ts.len(), 3);
        assert!(!ts.is_empty());
        assert_eq!(ts.values(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn univariate_rejects_length_mismatch() {
        let err = TimeSeries::univariate(hourly(3), vec![1.0, 2.0]).unwrap_err();
        assert!(matches!(err, ForecastError::InvalidParameter(_)));
    }

    #[test]
    fn univariate_rejects_unsorted_timestamps() {
        let mut stamps = hourly(3);
        stamps.swap(0, 2);
        let err = TimeSeries::univariate(stamps, vec![1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(err, ForecastError::TimestampError(_)));
    }

    #[test]
    fn univariate_rejects_duplicate_timestamps() {
        let mut stamps = hourly(3);
        stamps[2] = stamps[1];
        let err = TimeSeries::univariate(stamps, vec![1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(err, ForecastError::TimestampError(_)));
    }

    #[test]
    fn univariate_rejects_non_finite_values() {
        let err = TimeSeries::univariate(hourly(3), vec![1.0, f64::NAN, 3.0]).unwrap_err();
        assert!(matches!(err, ForecastError::InvalidParameter(_)));
    }

    #[test]
    fn step_uses_first_delta() {
        let ts = TimeSeries::univariate(hourly(4), vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(ts.step().unwrap(), Duration::hours(1));
    }

    #[test]
    fn step_needs_two_points() {
        let ts = TimeSeries::univariate(hourly(1), vec![1.0]).unwrap();
        assert!(matches!(
            ts.step(),
            Err(ForecastError::InsufficientData { needed: 2, got: 1 })
        ));
    }

    #[test]
    fn future_timestamps_continue_the_grid() {
        let ts = TimeSeries::univariate(hourly(3), vec![1.0, 2.0, 3.0]).unwrap();
        let future = ts.future_timestamps(2).unwrap();
        assert_eq!(future.len(), 2);
        assert_eq!(future[0] - *ts.timestamps().last().unwrap(), Duration::hours(1));
        assert_eq!(future[1] - future[0], Duration::hours(1));
    }
}
