//! Numeric utilities shared by the fitting engines.

pub mod optimization;
pub mod stats;

pub use optimization::{golden_section, nelder_mead, FitBudget, NelderMeadConfig, NelderMeadResult};
pub use stats::{
    autocorrelation, empirical_quantile, mean, normal_quantile, std_dev, variance, z_for_level,
};
