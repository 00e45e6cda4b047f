//! Automatic seasonal ARIMA order selection.
//!
//! Differencing orders are decided first (seasonal-strength test for D,
//! KPSS sequence for d), so every candidate is fitted to the same
//! effective sample and criteria stay comparable. AR/MA orders are then
//! searched either by a stepwise neighborhood walk or over the full grid.

use std::collections::HashSet;

use crate::core::{Forecast, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::models::Forecaster;
use crate::selection::{Candidate, CandidatePool, DifferencingId, SelectionCriterion};
use crate::transform::difference;
use crate::utils::FitBudget;
use crate::validation::{ndiffs, nsdiffs};

use super::model::Arima;
use super::spec::ArimaSpec;

/// Configuration for the automatic order search.
#[derive(Debug, Clone)]
pub struct AutoArimaConfig {
    /// Seasonal period; 1 restricts the search to non-seasonal models.
    pub period: usize,
    /// Largest regular AR order considered.
    pub max_p: usize,
    /// Largest regular MA order considered.
    pub max_q: usize,
    /// Largest seasonal AR order considered.
    pub max_seasonal_p: usize,
    /// Largest seasonal MA order considered.
    pub max_seasonal_q: usize,
    /// Largest regular differencing order the KPSS sequence may choose.
    pub max_d: usize,
    /// Largest seasonal differencing order the strength test may choose.
    pub max_seasonal_d: usize,
    /// Criterion used to rank candidates.
    pub criterion: SelectionCriterion,
    /// Stepwise walk when true, full grid when false.
    pub stepwise: bool,
    /// Significance level for the KPSS tests behind the choice of d.
    pub alpha: f64,
    /// Optimizer budget applied to each candidate fit.
    pub budget: FitBudget,
}

impl Default for AutoArimaConfig {
    fn default() -> Self {
        Self {
            period: 1,
            max_p: 5,
            max_q: 5,
            max_seasonal_p: 2,
            max_seasonal_q: 2,
            max_d: 2,
            max_seasonal_d: 1,
            criterion: SelectionCriterion::default(),
            stepwise: true,
            alpha: 0.05,
            budget: FitBudget::default().with_max_iterations(2000),
        }
    }
}

impl AutoArimaConfig {
    /// Default search over models with the given seasonal period.
    pub fn new(period: usize) -> Self {
        Self {
            period,
            ..Self::default()
        }
    }

    /// Search the full order grid instead of walking neighborhoods. Slower
    /// but immune to the local optima a stepwise walk can stop at.
    pub fn exhaustive(mut self) -> Self {
        self.stepwise = false;
        self
    }

    /// Rank candidates by the given criterion instead of AICc.
    pub fn with_criterion(mut self, criterion: SelectionCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Cap the regular AR and MA orders.
    pub fn with_max_orders(mut self, max_p: usize, max_q: usize) -> Self {
        self.max_p = max_p;
        self.max_q = max_q;
        self
    }

    /// Cap the seasonal AR and MA orders.
    pub fn with_seasonal_orders(mut self, max_seasonal_p: usize, max_seasonal_q: usize) -> Self {
        self.max_seasonal_p = max_seasonal_p;
        self.max_seasonal_q = max_seasonal_q;
        self
    }

    /// Replace the per-candidate optimizer budget.
    pub fn with_budget(mut self, budget: FitBudget) -> Self {
        self.budget = budget;
        self
    }
}

/// ARIMA model chosen by information-criterion search over orders.
///
/// The stepwise walk follows the usual recipe: seed specifications, then
/// repeated moves to the best improving neighbor (orders shifted by one,
/// constant toggled) until no neighbor improves.
#[derive(Debug, Clone)]
pub struct AutoArima {
    config: AutoArimaConfig,
    selected: Option<Arima>,
    candidates: Vec<Candidate<ArimaSpec>>,
    differencing: Option<DifferencingId>,
}

impl AutoArima {
    /// Unfitted search with the given configuration.
    pub fn new(config: AutoArimaConfig) -> Self {
        Self {
            config,
            selected: None,
            candidates: Vec::new(),
            differencing: None,
        }
    }

    /// Search over non-seasonal specifications.
    pub fn non_seasonal() -> Self {
        Self::new(AutoArimaConfig::default())
    }

    /// The winning model, once fitted.
    pub fn selected(&self) -> Option<&Arima> {
        self.selected.as_ref()
    }

    /// The winning specification, once fitted.
    pub fn selected_spec(&self) -> Option<ArimaSpec> {
        self.selected.as_ref().map(|m| m.spec())
    }

    /// Scored candidates from the last search, best first.
    pub fn candidates(&self) -> &[Candidate<ArimaSpec>] {
        &self.candidates
    }

    /// Differencing orders fixed before the order search, once fitted.
    pub fn chosen_differencing(&self) -> Option<DifferencingId> {
        self.differencing
    }

    /// Specification with all orders clamped to the configured caps.
    fn build_spec(
        &self,
        p: usize,
        q: usize,
        seasonal_p: usize,
        seasonal_q: usize,
        d: usize,
        seasonal_d: usize,
        constant: bool,
    ) -> ArimaSpec {
        let cfg = &self.config;
        let seasonal = cfg.period > 1;
        ArimaSpec::seasonal(
            p.min(cfg.max_p),
            d,
            q.min(cfg.max_q),
            if seasonal {
                seasonal_p.min(cfg.max_seasonal_p)
            } else {
                0
            },
            if seasonal { seasonal_d } else { 0 },
            if seasonal {
                seasonal_q.min(cfg.max_seasonal_q)
            } else {
                0
            },
            cfg.period.max(1),
        )
        .with_constant(constant)
    }

    /// Fit one candidate and record it in the pool. Returns the criterion
    /// value when the fit is usable, `None` for duplicates and failures.
    fn score(
        &self,
        spec: ArimaSpec,
        series: &TimeSeries,
        tried: &mut HashSet<ArimaSpec>,
        pool: &mut CandidatePool<ArimaSpec>,
    ) -> Option<f64> {
        if !tried.insert(spec) {
            return None;
        }
        let mut model = Arima::new(spec).with_budget(self.config.budget);
        match model.fit(series) {
            Ok(()) => match model.criteria() {
                Some(c) => {
                    let value = c.value(self.config.criterion);
                    pool.push(spec, spec.differencing(), c, spec.num_coefficients() + 1)
                        .ok()
                        .map(|()| value)
                }
                None => {
                    pool.record_failure();
                    None
                }
            },
            Err(_) => {
                pool.record_failure();
                None
            }
        }
    }

    /// Shifts of exactly one order by one step around `spec`, plus the
    /// constant toggle.
    fn neighbors(&self, spec: ArimaSpec, allow_constant: bool) -> Vec<ArimaSpec> {
        const DELTAS: [(isize, isize); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

        let shift = |value: usize, delta: isize, max: usize| -> Option<usize> {
            let shifted = value as isize + delta;
            (shifted >= 0 && shifted as usize <= max).then_some(shifted as usize)
        };

        let cfg = &self.config;
        let mut out = Vec::new();
        for (dp, dq) in DELTAS {
            if let (Some(p), Some(q)) = (shift(spec.p, dp, cfg.max_p), shift(spec.q, dq, cfg.max_q))
            {
                let mut next = spec;
                next.p = p;
                next.q = q;
                out.push(next);
            }
        }
        if spec.period > 1 {
            for (dp, dq) in DELTAS {
                if let (Some(sp), Some(sq)) = (
                    shift(spec.seasonal_p, dp, cfg.max_seasonal_p),
                    shift(spec.seasonal_q, dq, cfg.max_seasonal_q),
                ) {
                    let mut next = spec;
                    next.seasonal_p = sp;
                    next.seasonal_q = sq;
                    out.push(next);
                }
            }
        }
        if allow_constant {
            out.push(spec.with_constant(!spec.include_constant));
        }
        out
    }

    /// Greedy walk from four standard seeds. Stops at a local optimum, so
    /// it can miss the global best; every evaluated candidate still lands
    /// in the pool.
    fn stepwise_walk(
        &self,
        series: &TimeSeries,
        d: usize,
        seasonal_d: usize,
        allow_constant: bool,
        tried: &mut HashSet<ArimaSpec>,
        pool: &mut CandidatePool<ArimaSpec>,
    ) {
        const MAX_STEPS: usize = 50;

        let seeds = [(2, 2, 1, 1), (0, 0, 0, 0), (1, 0, 1, 0), (0, 1, 0, 1)];
        let mut current: Option<(ArimaSpec, f64)> = None;
        for (p, q, seasonal_p, seasonal_q) in seeds {
            let spec = self.build_spec(
                p,
                q,
                seasonal_p,
                seasonal_q,
                d,
                seasonal_d,
                allow_constant,
            );
            if let Some(value) = self.score(spec, series, tried, pool) {
                if current.map_or(true, |(_, best)| value < best) {
                    current = Some((spec, value));
                }
            }
        }
        let (mut spec, mut value) = match current {
            Some(pair) => pair,
            None => return,
        };

        for _ in 0..MAX_STEPS {
            let mut improvement: Option<(ArimaSpec, f64)> = None;
            for neighbor in self.neighbors(spec, allow_constant) {
                if let Some(v) = self.score(neighbor, series, tried, pool) {
                    if improvement.map_or(true, |(_, best)| v < best) {
                        improvement = Some((neighbor, v));
                    }
                }
            }
            match improvement {
                Some((next, v)) if v < value => {
                    spec = next;
                    value = v;
                }
                _ => break,
            }
        }
    }

    /// Every specification in the configured order grid.
    fn exhaustive_specs(&self, d: usize, seasonal_d: usize, allow_constant: bool) -> Vec<ArimaSpec> {
        let cfg = &self.config;
        let (max_sp, max_sq) = if cfg.period > 1 {
            (cfg.max_seasonal_p, cfg.max_seasonal_q)
        } else {
            (0, 0)
        };
        let mut specs = Vec::new();
        for p in 0..=cfg.max_p {
            for q in 0..=cfg.max_q {
                for seasonal_p in 0..=max_sp {
                    for seasonal_q in 0..=max_sq {
                        let spec =
                            self.build_spec(p, q, seasonal_p, seasonal_q, d, seasonal_d, false);
                        specs.push(spec);
                        if allow_constant {
                            specs.push(spec.with_constant(true));
                        }
                    }
                }
            }
        }
        specs
    }
}

impl Forecaster for AutoArima {
    fn fit(&mut self, series: &TimeSeries) -> Result<()> {
        let n = series.len();
        let needed = if self.config.period > 1 {
            3 * self.config.period
        } else {
            10
        };
        if n < needed {
            return Err(ForecastError::InsufficientData { needed, got: n });
        }
        let values = series.values();

        // Fix the differencing first: seasonal order from the strength
        // test, then the regular order from the KPSS sequence applied to
        // the seasonally differenced series.
        let seasonal_d = if self.config.period > 1 {
            nsdiffs(values, self.config.period, self.config.max_seasonal_d)
        } else {
            0
        };
        let mut deseasonalized = values.to_vec();
        for _ in 0..seasonal_d {
            deseasonalized = difference(&deseasonalized, self.config.period);
        }
        let d = ndiffs(&deseasonalized, self.config.max_d, self.config.alpha);

        // A constant under differencing induces a polynomial trend in the
        // original scale; beyond one total order that is rarely wanted.
        let allow_constant = d + seasonal_d <= 1;

        let differencing = DifferencingId {
            regular: d,
            seasonal: seasonal_d,
        };
        let mut pool: CandidatePool<ArimaSpec> =
            CandidatePool::with_criterion(differencing, self.config.criterion);
        let mut tried: HashSet<ArimaSpec> = HashSet::new();

        if self.config.stepwise {
            self.stepwise_walk(series, d, seasonal_d, allow_constant, &mut tried, &mut pool);
        } else {
            for spec in self.exhaustive_specs(d, seasonal_d, allow_constant) {
                let _ = self.score(spec, series, &mut tried, &mut pool);
            }
        }

        let best_spec = match pool.best() {
            Some(candidate) => candidate.spec,
            None => return Err(pool.no_viable_error()),
        };

        let mut winner = Arima::new(best_spec).with_budget(self.config.budget);
        winner.fit(series)?;

        self.candidates = pool.ranked().into_iter().cloned().collect();
        self.differencing = Some(differencing);
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
        self.selected.as_ref().map_or("AutoARIMA", |m| m.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn make_series(values: Vec<f64>) -> TimeSeries {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let timestamps: Vec<DateTime<Utc>> = (0..values.len())
            .map(|i| start + Duration::days(i as i64))
            .collect();
        TimeSeries::univariate(timestamps, values).unwrap()
    }

    /// Deterministic uniform noise in [-0.5, 0.5).
    fn noise(n: usize, seed: u64) -> Vec<f64> {
        let mut state = seed;
        (0..n)
            .map(|_| {
                state = state
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(1442695040888963407);
                (state >> 11) as f64 / (1u64 << 53) as f64 - 0.5
            })
            .collect()
    }

    #[test]
    fn trending_data_gets_differenced() {
        let e = noise(60, 2);
        let values: Vec<f64> = (0..60).map(|i| 5.0 + 0.5 * i as f64 + e[i]).collect();

        let mut auto = AutoArima::new(AutoArimaConfig::new(1).with_max_orders(2, 2));
        auto.fit(&make_series(values)).unwrap();

        assert!(auto.chosen_differencing().unwrap().regular >= 1);
    }

    #[test]
    fn stationary_data_keeps_its_level() {
        let e = noise(130, 9);
        let mut values = Vec::with_capacity(130);
        let mut prev = 0.0;
        for &err in &e {
            prev = 0.6 * prev + err;
            values.push(20.0 + prev);
        }
        let values = values[50..].to_vec();

        let mut auto = AutoArima::new(AutoArimaConfig::new(1).with_max_orders(2, 2));
        auto.fit(&make_series(values)).unwrap();

        assert_eq!(auto.chosen_differencing().unwrap().regular, 0);
        assert!(auto.selected_spec().unwrap().include_constant);
    }

    #[test]
    fn strong_season_triggers_seasonal_differencing() {
        let pattern = [20.0, -5.0, 10.0, -25.0];
        let e = noise(48, 13);
        let values: Vec<f64> = (0..48).map(|i| 50.0 + pattern[i % 4] + e[i]).collect();

        let mut auto = AutoArima::new(
            AutoArimaConfig::new(4)
                .with_max_orders(1, 1)
                .with_seasonal_orders(1, 1),
        );
        auto.fit(&make_series(values)).unwrap();

        assert_eq!(auto.chosen_differencing().unwrap().seasonal, 1);
        assert_eq!(auto.selected_spec().unwrap().period, 4);
    }

    #[test]
    fn exhaustive_is_at_least_as_good_as_stepwise() {
        let e = noise(80, 21);
        let values: Vec<f64> = (1..80).map(|t| 10.0 + e[t] + 0.5 * e[t - 1]).collect();
        let series = make_series(values);

        let config = AutoArimaConfig::new(1).with_max_orders(2, 2);
        let mut stepwise = AutoArima::new(config.clone());
        stepwise.fit(&series).unwrap();
        let mut grid = AutoArima::new(config.exhaustive());
        grid.fit(&series).unwrap();

        let best_stepwise = stepwise.candidates()[0].criteria.aicc;
        let best_grid = grid.candidates()[0].criteria.aicc;
        assert!(best_grid <= best_stepwise + 1e-9);
    }

    #[test]
    fn stepwise_neighbors_move_one_order_at_a_time() {
        let auto = AutoArima::new(AutoArimaConfig::new(12));
        let base = ArimaSpec::seasonal(1, 0, 1, 1, 0, 1, 12);

        let neighbors = auto.neighbors(base, true);
        assert!(!neighbors.is_empty());
        for next in neighbors {
            let order_moves = next.p.abs_diff(base.p)
                + next.q.abs_diff(base.q)
                + next.seasonal_p.abs_diff(base.seasonal_p)
                + next.seasonal_q.abs_diff(base.seasonal_q);
            let toggled = next.include_constant != base.include_constant;
            assert!(
                (order_moves == 1 && !toggled) || (order_moves == 0 && toggled),
                "{next:?}"
            );
        }
    }

    #[test]
    fn candidates_are_ranked_by_the_criterion() {
        let e = noise(60, 4);
        let values: Vec<f64> = (0..60).map(|i| 30.0 + e[i] * 3.0).collect();

        let mut auto = AutoArima::new(AutoArimaConfig::new(1).with_max_orders(2, 2));
        auto.fit(&make_series(values)).unwrap();

        let ranked = auto.candidates();
        assert!(!ranked.is_empty());
        for pair in ranked.windows(2) {
            assert!(pair[0].criteria.aicc <= pair[1].criteria.aicc);
        }
        assert_eq!(auto.selected_spec().unwrap(), ranked[0].spec);
    }

    #[test]
    fn rejects_very_short_series() {
        let mut auto = AutoArima::non_seasonal();
        assert!(matches!(
            auto.fit(&make_series(vec![1.0, 2.0, 3.0, 4.0, 5.0])).unwrap_err(),
            ForecastError::InsufficientData { needed: 10, .. }
        ));

        let mut seasonal = AutoArima::new(AutoArimaConfig::new(12));
        let short: Vec<f64> = (0..20).map(|i| i as f64).collect();
        assert!(matches!(
            seasonal.fit(&make_series(short)).unwrap_err(),
            ForecastError::InsufficientData { needed: 36, .. }
        ));
    }

    #[test]
    fn delegates_forecasting_to_the_winner() {
        let e = noise(40, 31);
        let values: Vec<f64> = (0..40).map(|i| 8.0 + 0.3 * i as f64 + e[i]).collect();

        let mut auto = AutoArima::new(AutoArimaConfig::new(1).with_max_orders(2, 2));
        auto.fit(&make_series(values)).unwrap();

        let forecast = auto.forecast(6, &[0.80, 0.95]).unwrap();
        assert_eq!(forecast.point.len(), 6);
        assert_eq!(forecast.se.len(), 6);
        assert_eq!(forecast.intervals.len(), 2);
        assert_eq!(auto.fitted_values().unwrap().len(), 40);
        assert!(auto.name().starts_with("ARIMA("));
    }
}
