//! Automatic ETS specification search.
//!
//! Fits every valid specification for the configured period and keeps the
//! one with the best information criterion. Candidates that fail to fit
//! (non-positive data under a multiplicative component, too little data,
//! non-convergence) are recorded and skipped; the search only errors when
//! no candidate at all survives.

use crate::core::{Forecast, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::models::Forecaster;
use crate::selection::{Candidate, CandidatePool, DifferencingId, SelectionCriterion};
use crate::utils::FitBudget;

use super::model::Ets;
use super::spec::{ErrorComponent, EtsSpec, SeasonComponent, TrendComponent};

/// Configuration for the automatic search.
#[derive(Debug, Clone)]
pub struct AutoEtsConfig {
    /// Seasonal period; 1 restricts the search to non-seasonal models.
    pub period: usize,
    /// Criterion used to rank candidates.
    pub criterion: SelectionCriterion,
    /// Restrict the search to fully additive specifications.
    pub additive_only: bool,
    /// Whether damped-trend specifications are candidates.
    pub allow_damped: bool,
    /// Optimizer budget applied to each candidate fit.
    pub budget: FitBudget,
}

impl Default for AutoEtsConfig {
    fn default() -> Self {
        Self {
            period: 1,
            criterion: SelectionCriterion::default(),
            additive_only: false,
            allow_damped: true,
            budget: FitBudget::default().with_max_iterations(2000),
        }
    }
}

impl AutoEtsConfig {
    /// Default search over models with the given seasonal period.
    pub fn new(period: usize) -> Self {
        Self {
            period,
            ..Self::default()
        }
    }

    /// Rank candidates by the given criterion instead of AICc.
    pub fn with_criterion(mut self, criterion: SelectionCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Drop multiplicative error and season from the candidate set. Useful
    /// for series that cross zero, where those fits are rejected anyway.
    pub fn additive_only(mut self) -> Self {
        self.additive_only = true;
        self
    }

    /// Drop damped-trend specifications from the candidate set.
    pub fn without_damped(mut self) -> Self {
        self.allow_damped = false;
        self
    }

    /// Replace the per-candidate optimizer budget.
    pub fn with_budget(mut self, budget: FitBudget) -> Self {
        self.budget = budget;
        self
    }
}

/// ETS model chosen by information-criterion search over the taxonomy.
#[derive(Debug, Clone)]
pub struct AutoEts {
    config: AutoEtsConfig,
    selected: Option<Ets>,
    candidates: Vec<Candidate<EtsSpec>>,
}

impl AutoEts {
    /// Unfitted search with the given configuration.
    pub fn new(config: AutoEtsConfig) -> Self {
        Self {
            config,
            selected: None,
            candidates: Vec::new(),
        }
    }

    /// Search over non-seasonal specifications.
    pub fn non_seasonal() -> Self {
        Self::new(AutoEtsConfig::default())
    }

    /// The winning model, once fitted.
    pub fn selected(&self) -> Option<&Ets> {
        self.selected.as_ref()
    }

    /// The winning specification, once fitted.
    pub fn selected_spec(&self) -> Option<EtsSpec> {
        self.selected.as_ref().map(|m| m.spec())
    }

    /// Scored candidates from the last search, best first.
    pub fn candidates(&self) -> &[Candidate<EtsSpec>] {
        &self.candidates
    }

    fn candidate_specs(&self) -> Vec<EtsSpec> {
        EtsSpec::all_valid(self.config.period)
            .into_iter()
            .filter(|spec| {
                !self.config.additive_only
                    || (spec.error == ErrorComponent::Additive
                        && spec.season != SeasonComponent::Multiplicative)
            })
            .filter(|spec| self.config.allow_damped || spec.trend != TrendComponent::Damped)
            .collect()
    }
}

impl Forecaster for AutoEts {
    fn fit(&mut self, series: &TimeSeries) -> Result<()> {
        let n = series.len();
        if n < 4 {
            return Err(ForecastError::InsufficientData { needed: 4, got: n });
        }

        // All ETS candidates see the undifferenced series, so the pool's
        // differencing id is trivially shared.
        let differencing = DifferencingId::default();
        let mut pool: CandidatePool<EtsSpec> =
            CandidatePool::with_criterion(differencing, self.config.criterion);

        for spec in self.candidate_specs() {
            let mut model = Ets::new(spec).with_budget(self.config.budget);
            match model.fit(series) {
                Ok(()) => match model.criteria() {
                    Some(c) => {
                        let _ = pool.push(spec, differencing, c, spec.num_params() + 1);
                    }
                    None => pool.record_failure(),
                },
                Err(_) => pool.record_failure(),
            }
        }

        let best_spec = match pool.best() {
            Some(candidate) => candidate.spec,
            None => return Err(pool.no_viable_error()),
        };

        let mut winner = Ets::new(best_spec).with_budget(self.config.budget);
        winner.fit(series)?;

        self.candidates = pool.ranked().into_iter().cloned().collect();
        self.selected = Some(winner);
        Ok(())
    }

    fn forecast(&self, horizon: usize, levels: &[f64]) -> Result<Forecast> {
        self.selected
            .as_ref()
            .ok_or(ForecastError::FitRequired)?
            .forecast(horizon, levels)
    }

    fn fitted_values(&self) -> Option<&[f64]> {
        self.selected.as_ref().and_then(|m| m.fitted_values())
    }

    fn residuals(&self) -> Option<&[f64]> {
        self.selected.as_ref().and_then(|m| m.residuals())
    }

    fn name(&self) -> &str {
        self.selected.as_ref().map_or("AutoETS", |m| m.name())
    }
}
