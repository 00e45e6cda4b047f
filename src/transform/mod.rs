//! Reversible series transformations.
//!
//! Two layers: variance-stabilizing power transforms ([`TransformSpec`])
//! and differencing operators ([`DifferenceSpec`]). Forecasting inverts
//! them in the opposite order they were applied: undifference first, then
//! undo the power transform.
//!
//! # Example
//!
//! ```
//! use chronocast::transform::{DifferenceSpec, TransformSpec};
//!
//! let series = vec![1.0, 4.0, 9.0, 16.0, 25.0, 36.0];
//!
//! let logged = TransformSpec::Log.forward(&series).unwrap();
//! let diffed = DifferenceSpec::from_orders(1, 0, 1)
//!     .unwrap()
//!     .apply(&logged)
//!     .unwrap();
//!
//! // Exact inversion back to the original scale.
//! let recovered = TransformSpec::Log.inverse(&diffed.invert());
//! assert!((recovered[3] - 16.0).abs() < 1e-9);
//! ```

mod difference;
mod power;

pub use difference::{difference, DifferenceSpec, DifferenceStep, DifferencedSeries};
pub use power::{estimate_lambda, estimate_lambda_within, TransformSpec};
