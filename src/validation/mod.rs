//! Stationarity diagnostics and residual validation.
//!
//! Guides the automatic differencing decision before fitting (KPSS on the
//! transformed series, seasonal strength for the seasonal order) and checks
//! fitted innovations for leftover autocorrelation afterwards.
//!
//! # Example
//!
//! ```
//! use chronocast::validation::{kpss_test, ljung_box, ndiffs};
//!
//! // How many regular differences does a trending series need?
//! let series: Vec<f64> = (0..100).map(|i| i as f64 * 0.5 + (i % 7) as f64 * 0.1).collect();
//! let d = ndiffs(&series, 2, 0.05);
//! assert!(d >= 1);
//!
//! // Residual whiteness after a fit.
//! let residuals = vec![0.1, -0.2, 0.15, -0.1, 0.05, -0.08, 0.12, -0.15, 0.1, -0.05];
//! let lb = ljung_box(&residuals, Some(2), 0);
//! if lb.is_white_noise(0.05) {
//!     println!("residuals pass the Ljung-Box test");
//! }
//!
//! // Raw KPSS statistic for the same trending series.
//! let result = kpss_test(&series, None);
//! assert!(!result.is_stationary);
//! ```

pub mod residual_tests;
pub mod stationarity;

// Re-export from residual_tests
pub use residual_tests::{default_lags, ljung_box, LjungBoxResult};

// Re-export from stationarity
pub use stationarity::{
    adf_test, kpss_test, ndiffs, nsdiffs, seasonal_strength, CriticalValues, StationarityResult,
};
