//! Plain-data summary of a successful fit.

use crate::selection::InformationCriteria;

/// One named coefficient estimate.
#[derive(Debug, Clone, PartialEq)]
pub struct Coefficient {
    /// Coefficient name, e.g. "ar1", "alpha", "l0".
    pub name: String,
    /// Estimated value.
    pub value: f64,
}

impl Coefficient {
    /// Convenience constructor.
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Residual sequences from one fit.
///
/// `fitted` and `raw` live on the data scale; `innovation` holds the
/// one-step-ahead errors on the modeling scale (relative errors for
/// multiplicative-error models, differenced-scale errors for ARIMA).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResidualSet {
    /// One-step-ahead fitted values.
    pub fitted: Vec<f64>,
    /// Observed minus fitted on the data scale.
    pub raw: Vec<f64>,
    /// Innovations on the modeling scale.
    pub innovation: Vec<f64>,
}

/// Summary record exposed at the crate boundary after a fit succeeds.
/// Plain data, read access only.
#[derive(Debug, Clone, PartialEq)]
pub struct FittedModel {
    /// Human-readable model label, e.g. "ETS(A,Ad,N)" or "ARIMA(1,1,1)(0,1,1)[12]".
    pub label: String,
    /// Named coefficient estimates, including initial states where estimated.
    pub coefficients: Vec<Coefficient>,
    /// Maximized Gaussian log-likelihood.
    pub log_likelihood: f64,
    /// Information criteria computed from the likelihood.
    pub criteria: InformationCriteria,
    /// Number of observations entering the likelihood.
    pub n: usize,
    /// Parameter count used by the criteria (includes the error variance).
    pub num_params: usize,
    /// Residual sequences.
    pub residuals: ResidualSet,
}

impl FittedModel {
    /// Look up a coefficient by name.
    pub fn coefficient(&self, name: &str) -> Option<f64> {
        self.coefficients
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::criteria;

    #[test]
    fn coefficient_lookup_by_name() {
        let model = FittedModel {
            label: "ARIMA(1,0,0)".to_string(),
            coefficients: vec![
                Coefficient::new("ar1", 0.6),
                Coefficient::new("mean", 10.0),
            ],
            log_likelihood: -42.0,
            criteria: criteria(-42.0, 3, 100),
            n: 100,
            num_params: 3,
            residuals: ResidualSet::default(),
        };

        assert_eq!(model.coefficient("ar1"), Some(0.6));
        assert_eq!(model.coefficient("mean"), Some(10.0));
        assert_eq!(model.coefficient("ma1"), None);
    }
}
