//! Information criteria and candidate ranking for automatic model search.
//!
//! Both engines fit candidates independently and reduce them through a
//! [`CandidatePool`], which guards comparability (only candidates fitted
//! under the same differencing may be ranked together) and applies a
//! deterministic tie-break chain so the winner does not depend on
//! evaluation order.

use crate::error::{ForecastError, Result};

/// AIC, small-sample-corrected AIC, and BIC for one fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InformationCriteria {
    pub aic: f64,
    pub aicc: f64,
    pub bic: f64,
}

/// Criterion used to rank candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionCriterion {
    /// Akaike Information Criterion.
    AIC,
    /// Corrected Akaike Information Criterion.
    #[default]
    AICc,
    /// Bayesian Information Criterion.
    BIC,
}

/// Compute the criteria triple from a maximized log-likelihood.
///
/// `k` counts every estimated parameter (constant and initial states
/// included) plus one for the error variance. AICc degenerates to `+inf`
/// when `n - k - 1 <= 0`, so over-parameterized candidates are never
/// selected.
pub fn criteria(loglik: f64, k: usize, n: usize) -> InformationCriteria {
    let k_f = k as f64;
    let n_f = n as f64;
    let aic = -2.0 * loglik + 2.0 * k_f;
    let aicc = if n_f - k_f - 1.0 > 0.0 {
        aic + 2.0 * k_f * (k_f + 1.0) / (n_f - k_f - 1.0)
    } else {
        f64::INFINITY
    };
    let bic = aic + k_f * (n_f.ln() - 2.0);
    InformationCriteria { aic, aicc, bic }
}

impl InformationCriteria {
    /// Value of the chosen criterion.
    pub fn value(&self, criterion: SelectionCriterion) -> f64 {
        match criterion {
            SelectionCriterion::AIC => self.aic,
            SelectionCriterion::AICc => self.aicc,
            SelectionCriterion::BIC => self.bic,
        }
    }
}

/// The differencing a candidate was fitted under.
///
/// Criteria are only comparable between fits that saw the same effective
/// sample; mixing differencing orders in one ranking is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DifferencingId {
    /// Regular (lag-1) differencing order.
    pub regular: usize,
    /// Seasonal (lag-m) differencing order.
    pub seasonal: usize,
}

/// One scored candidate.
#[derive(Debug, Clone)]
pub struct Candidate<T> {
    /// The candidate's specification.
    pub spec: T,
    /// Criteria computed from its fit.
    pub criteria: InformationCriteria,
    /// Parameter count (including the error variance).
    pub num_params: usize,
}

/// Accumulates candidate fits and reduces them deterministically.
#[derive(Debug, Clone)]
pub struct CandidatePool<T> {
    differencing: DifferencingId,
    criterion: SelectionCriterion,
    candidates: Vec<Candidate<T>>,
    attempted: usize,
    failed: usize,
}

impl<T> CandidatePool<T> {
    /// Empty pool for candidates sharing `differencing`, ranked by AICc.
    pub fn new(differencing: DifferencingId) -> Self {
        Self::with_criterion(differencing, SelectionCriterion::default())
    }

    /// Empty pool ranked by the given criterion.
    pub fn with_criterion(differencing: DifferencingId, criterion: SelectionCriterion) -> Self {
        Self {
            differencing,
            criterion,
            candidates: Vec::new(),
            attempted: 0,
            failed: 0,
        }
    }

    /// Record a scored candidate.
    ///
    /// Rejects candidates fitted under a different differencing and
    /// candidates whose criterion value is NaN (a fit that produced no
    /// usable likelihood should be recorded via [`record_failure`]).
    ///
    /// [`record_failure`]: CandidatePool::record_failure
    pub fn push(
        &mut self,
        spec: T,
        differencing: DifferencingId,
        criteria: InformationCriteria,
        num_params: usize,
    ) -> Result<()> {
        if differencing != self.differencing {
            return Err(ForecastError::InvalidParameter(format!(
                "candidate differencing (d={}, D={}) does not match the pool (d={}, D={})",
                differencing.regular,
                differencing.seasonal,
                self.differencing.regular,
                self.differencing.seasonal
            )));
        }
        if criteria.value(self.criterion).is_nan() {
            self.attempted += 1;
            self.failed += 1;
            return Err(ForecastError::InvalidParameter(
                "candidate criterion is NaN".to_string(),
            ));
        }
        self.attempted += 1;
        self.candidates.push(Candidate {
            spec,
            criteria,
            num_params,
        });
        Ok(())
    }

    /// Record a candidate whose fit failed (excluded from ranking).
    pub fn record_failure(&mut self) {
        self.attempted += 1;
        self.failed += 1;
    }

    /// Number of candidates attempted (scored + failed).
    pub fn attempted(&self) -> usize {
        self.attempted
    }

    /// Number of failed candidates.
    pub fn failed(&self) -> usize {
        self.failed
    }

    /// Scored candidates in insertion order.
    pub fn candidates(&self) -> &[Candidate<T>] {
        &self.candidates
    }

    /// The winning candidate: lowest criterion value, ties broken by lowest
    /// AIC, then fewest parameters, then first-enumerated.
    pub fn best(&self) -> Option<&Candidate<T>> {
        let mut best: Option<&Candidate<T>> = None;
        for candidate in &self.candidates {
            match best {
                None => best = Some(candidate),
                Some(current) => {
                    if strictly_better(candidate, current, self.criterion) {
                        best = Some(candidate);
                    }
                }
            }
        }
        best
    }

    /// Candidates sorted by the tie-break chain, best first.
    pub fn ranked(&self) -> Vec<&Candidate<T>> {
        let mut order: Vec<usize> = (0..self.candidates.len()).collect();
        order.sort_by(|&a, &b| {
            let (ca, cb) = (&self.candidates[a], &self.candidates[b]);
            chain_key(ca, self.criterion)
                .partial_cmp(&chain_key(cb, self.criterion))
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.cmp(&b))
        });
        order.into_iter().map(|i| &self.candidates[i]).collect()
    }

    /// The error reported when every candidate failed.
    pub fn no_viable_error(&self) -> ForecastError {
        ForecastError::NoViableModel {
            attempted: self.attempted,
            failed: self.failed,
        }
    }
}

fn chain_key<T>(c: &Candidate<T>, criterion: SelectionCriterion) -> (f64, f64, usize) {
    (c.criteria.value(criterion), c.criteria.aic, c.num_params)
}

/// Strictly-better comparison along the tie-break chain; equal candidates
/// keep the incumbent (first-enumerated wins).
fn strictly_better<T>(a: &Candidate<T>, b: &Candidate<T>, criterion: SelectionCriterion) -> bool {
    let (pa, pb) = (a.criteria.value(criterion), b.criteria.value(criterion));
    if pa != pb {
        return pa < pb;
    }
    if a.criteria.aic != b.criteria.aic {
        return a.criteria.aic < b.criteria.aic;
    }
    a.num_params < b.num_params
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn criteria_reproduces_hand_computed_values() {
        // loglik = -100, k = 4, n = 50
        let ic = criteria(-100.0, 4, 50);
        assert_relative_eq!(ic.aic, 208.0, epsilon = 1e-12);
        assert_relative_eq!(ic.aicc, 208.0 + 40.0 / 45.0, epsilon = 1e-12);
        assert_relative_eq!(ic.bic, 208.0 + 4.0 * (50.0_f64.ln() - 2.0), epsilon = 1e-12);
    }

    #[test]
    fn aicc_is_infinite_when_sample_too_small() {
        assert_eq!(criteria(-10.0, 10, 11).aicc, f64::INFINITY);
        assert_eq!(criteria(-10.0, 12, 11).aicc, f64::INFINITY);
        assert!(criteria(-10.0, 9, 11).aicc.is_finite());
    }

    #[test]
    fn aicc_always_exceeds_aic_for_valid_samples() {
        for k in 1..8 {
            for n in 12..40 {
                let ic = criteria(-50.0, k, n);
                if (n as f64 - k as f64 - 1.0) > 0.0 {
                    assert!(ic.aicc > ic.aic, "k={k} n={n}");
                }
            }
        }
    }

    #[test]
    fn aicc_penalty_increases_with_k() {
        let n = 30;
        let mut last = f64::NEG_INFINITY;
        for k in 1..12 {
            let ic = criteria(-50.0, k, n);
            assert!(ic.aicc > last, "k={k}");
            last = ic.aicc;
        }
    }

    #[test]
    fn pool_selects_lowest_criterion() {
        let diff = DifferencingId::default();
        let mut pool: CandidatePool<&str> = CandidatePool::new(diff);
        pool.push("a", diff, criteria(-100.0, 3, 50), 3).unwrap();
        pool.push("b", diff, criteria(-95.0, 3, 50), 3).unwrap();
        pool.push("c", diff, criteria(-99.0, 2, 50), 2).unwrap();

        assert_eq!(pool.best().unwrap().spec, "b");
        let ranked = pool.ranked();
        assert_eq!(ranked[0].spec, "b");
        assert_eq!(ranked.last().unwrap().spec, "a");
    }

    #[test]
    fn pool_breaks_ties_by_aic_then_params_then_order() {
        let diff = DifferencingId::default();
        let ic = InformationCriteria {
            aic: 100.0,
            aicc: 101.0,
            bic: 103.0,
        };

        // Same AICc, lower AIC wins.
        let mut pool: CandidatePool<&str> = CandidatePool::new(diff);
        pool.push("hi-aic", diff, InformationCriteria { aic: 100.5, ..ic }, 3)
            .unwrap();
        pool.push("lo-aic", diff, ic, 3).unwrap();
        assert_eq!(pool.best().unwrap().spec, "lo-aic");

        // Same AICc and AIC, fewer parameters win.
        let mut pool: CandidatePool<&str> = CandidatePool::new(diff);
        pool.push("big", diff, ic, 4).unwrap();
        pool.push("small", diff, ic, 2).unwrap();
        assert_eq!(pool.best().unwrap().spec, "small");

        // Full tie: first-enumerated wins.
        let mut pool: CandidatePool<&str> = CandidatePool::new(diff);
        pool.push("first", diff, ic, 3).unwrap();
        pool.push("second", diff, ic, 3).unwrap();
        assert_eq!(pool.best().unwrap().spec, "first");
    }

    #[test]
    fn pool_rejects_mismatched_differencing() {
        let mut pool: CandidatePool<&str> = CandidatePool::new(DifferencingId {
            regular: 1,
            seasonal: 0,
        });
        let err = pool
            .push(
                "x",
                DifferencingId {
                    regular: 2,
                    seasonal: 0,
                },
                criteria(-10.0, 2, 30),
                2,
            )
            .unwrap_err();
        assert!(matches!(err, ForecastError::InvalidParameter(_)));
        assert!(pool.best().is_none());
    }

    #[test]
    fn pool_counts_failures_for_no_viable_error() {
        let mut pool: CandidatePool<&str> = CandidatePool::new(DifferencingId::default());
        pool.record_failure();
        pool.record_failure();
        assert_eq!(pool.attempted(), 2);
        assert_eq!(pool.failed(), 2);
        assert_eq!(
            pool.no_viable_error(),
            ForecastError::NoViableModel {
                attempted: 2,
                failed: 2
            }
        );
    }

    #[test]
    fn infinite_aicc_candidate_loses_to_finite() {
        let diff = DifferencingId::default();
        let mut pool: CandidatePool<&str> = CandidatePool::new(diff);
        pool.push("tiny-sample", diff, criteria(-5.0, 20, 21), 20)
            .unwrap();
        pool.push("ok", diff, criteria(-50.0, 2, 21), 2).unwrap();
        assert_eq!(pool.best().unwrap().spec, "ok");
    }
}
