//! Derivative-free optimizers used for parameter estimation.
//!
//! Both model families minimize a negative log-likelihood with box bounds:
//! the ETS and ARIMA fits use the Nelder-Mead simplex, and Box-Cox lambda
//! estimation uses golden-section search on a closed interval. Every search
//! loop checks a cooperative [`FitBudget`] so non-convergent parameter
//! regions cannot run away.

use std::time::{Duration, Instant};

/// Iteration and wall-clock budget for one optimization run.
///
/// Candidate fits in an automatic search share nothing, so each carries its
/// own budget; exhaustion is reported through `converged = false` and mapped
/// to a `NonConvergence` error by the caller, never returned as a silent
/// best fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FitBudget {
    /// Maximum optimizer iterations.
    pub max_iterations: usize,
    /// Optional wall-clock limit for one fit.
    pub max_duration: Option<Duration>,
}

impl Default for FitBudget {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            max_duration: None,
        }
    }
}

impl FitBudget {
    /// Set the iteration cap.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the wall-clock cap.
    pub fn with_max_duration(mut self, max_duration: Duration) -> Self {
        self.max_duration = Some(max_duration);
        self
    }

    /// Begin timing a run against this budget.
    pub fn start(&self) -> BudgetClock {
        BudgetClock {
            started: Instant::now(),
            budget: *self,
        }
    }
}

/// Running clock for a single optimization against a [`FitBudget`].
#[derive(Debug, Clone)]
pub struct BudgetClock {
    started: Instant,
    budget: FitBudget,
}

impl BudgetClock {
    /// True once either the iteration or the wall-clock budget is spent.
    pub fn exhausted(&self, iterations: usize) -> bool {
        if iterations >= self.budget.max_iterations {
            return true;
        }
        match self.budget.max_duration {
            Some(limit) => self.started.elapsed() >= limit,
            None => false,
        }
    }
}

/// Result of a Nelder-Mead run.
#[derive(Debug, Clone)]
pub struct NelderMeadResult {
    /// Best point found.
    pub optimal_point: Vec<f64>,
    /// Objective value at the best point.
    pub optimal_value: f64,
    /// Iterations performed.
    pub iterations: usize,
    /// Whether the simplex met the tolerance before the budget ran out.
    pub converged: bool,
}

/// Configuration for Nelder-Mead optimization.
#[derive(Debug, Clone)]
pub struct NelderMeadConfig {
    /// Iteration/wall-clock budget.
    pub budget: FitBudget,
    /// Convergence tolerance on the objective spread across the simplex.
    pub tolerance: f64,
    /// Reflection coefficient.
    pub alpha: f64,
    /// Expansion coefficient.
    pub gamma: f64,
    /// Contraction coefficient.
    pub rho: f64,
    /// Shrink coefficient.
    pub sigma: f64,
    /// Relative step used to build the initial simplex.
    pub initial_step: f64,
}

impl Default for NelderMeadConfig {
    fn default() -> Self {
        Self {
            budget: FitBudget::default(),
            tolerance: 1e-8,
            alpha: 1.0,
            gamma: 2.0,
            rho: 0.5,
            sigma: 0.5,
            initial_step: 0.05,
        }
    }
}

impl NelderMeadConfig {
    /// Replace the fit budget.
    pub fn with_budget(mut self, budget: FitBudget) -> Self {
        self.budget = budget;
        self
    }
}

/// Minimize `objective` with the Nelder-Mead simplex under optional box bounds.
///
/// # Example
/// ```
/// use chronocast::utils::optimization::{nelder_mead, NelderMeadConfig};
///
/// // Minimize (x-2)^2 + (y-3)^2
/// let result = nelder_mead(
///     |x| (x[0] - 2.0).powi(2) + (x[1] - 3.0).powi(2),
///     &[0.0, 0.0],
///     None,
///     NelderMeadConfig::default(),
/// );
///
/// assert!(result.converged);
/// assert!((result.optimal_point[0] - 2.0).abs() < 0.01);
/// assert!((result.optimal_point[1] - 3.0).abs() < 0.01);
/// ```
pub fn nelder_mead<F>(
    objective: F,
    initial: &[f64],
    bounds: Option<&[(f64, f64)]>,
    config: NelderMeadConfig,
) -> NelderMeadResult
where
    F: Fn(&[f64]) -> f64,
{
    let n = initial.len();
    if n == 0 {
        return NelderMeadResult {
            optimal_point: vec![],
            optimal_value: f64::NAN,
            iterations: 0,
            converged: false,
        };
    }

    // Simplex vertices kept as (point, value) pairs, sorted best-first.
    let mut simplex: Vec<(Vec<f64>, f64)> = Vec::with_capacity(n + 1);
    let start = clamp_point(initial.to_vec(), bounds);
    let start_value = objective(&start);
    simplex.push((start, start_value));

    for i in 0..n {
        let mut vertex = initial.to_vec();
        let step = if initial[i].abs() > 1e-10 {
            config.initial_step * initial[i].abs()
        } else {
            config.initial_step
        };
        vertex[i] += step;
        let vertex = clamp_point(vertex, bounds);
        let value = objective(&vertex);
        simplex.push((vertex, value));
    }

    let clock = config.budget.start();
    let mut iterations = 0;
    let mut converged = false;

    loop {
        simplex.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

        let spread = simplex[n].1 - simplex[0].1;
        if spread.abs() < config.tolerance {
            converged = true;
            break;
        }

        let centroid = centroid_excluding_worst(&simplex);

        // Degenerate simplex counts as converged as well.
        let max_dist = simplex
            .iter()
            .map(|(v, _)| euclidean_distance(v, &centroid))
            .fold(0.0, f64::max);
        if max_dist < config.tolerance {
            converged = true;
            break;
        }

        if clock.exhausted(iterations) {
            break;
        }
        iterations += 1;

        let (best_value, second_worst_value, worst_value) =
            (simplex[0].1, simplex[n - 1].1, simplex[n].1);

        // All four moves are steps from the centroid toward (or away from) a
        // reference point: x = centroid + coeff * (reference - centroid).
        let reflected = clamp_point(
            step_from(&centroid, &simplex[n].0, -config.alpha),
            bounds,
        );
        let reflected_value = objective(&reflected);

        if reflected_value < second_worst_value && reflected_value >= best_value {
            simplex[n] = (reflected, reflected_value);
            continue;
        }

        if reflected_value < best_value {
            let expanded = clamp_point(step_from(&centroid, &reflected, config.gamma), bounds);
            let expanded_value = objective(&expanded);
            simplex[n] = if expanded_value < reflected_value {
                (expanded, expanded_value)
            } else {
                (reflected, reflected_value)
            };
            continue;
        }

        if reflected_value < worst_value {
            let contracted = clamp_point(step_from(&centroid, &reflected, config.rho), bounds);
            let contracted_value = objective(&contracted);
            if contracted_value <= reflected_value {
                simplex[n] = (contracted, contracted_value);
                continue;
            }
        } else {
            let contracted = clamp_point(step_from(&centroid, &simplex[n].0, config.rho), bounds);
            let contracted_value = objective(&contracted);
            if contracted_value < worst_value {
                simplex[n] = (contracted, contracted_value);
                continue;
            }
        }

        // Shrink everything toward the best vertex.
        let best = simplex[0].0.clone();
        for entry in simplex.iter_mut().skip(1) {
            for (x, b) in entry.0.iter_mut().zip(best.iter()) {
                *x = b + config.sigma * (*x - b);
            }
            entry.0 = clamp_point(std::mem::take(&mut entry.0), bounds);
            entry.1 = objective(&entry.0);
        }
    }

    simplex.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
    let (optimal_point, optimal_value) = simplex.swap_remove(0);

    NelderMeadResult {
        optimal_point,
        optimal_value,
        iterations,
        converged,
    }
}

/// Golden-section search for the minimum of a 1-D objective on `[lower, upper]`.
///
/// The interval shrinks by the golden ratio each iteration, so 100 iterations
/// narrow any practical starting interval far below `tolerance`.
pub fn golden_section<F>(objective: F, lower: f64, upper: f64, tolerance: f64) -> f64
where
    F: Fn(f64) -> f64,
{
    const INV_PHI: f64 = 0.618_033_988_749_894_9;
    const MAX_ITER: usize = 200;

    let (mut a, mut b) = (lower.min(upper), lower.max(upper));
    let mut c = b - INV_PHI * (b - a);
    let mut d = a + INV_PHI * (b - a);
    let mut fc = objective(c);
    let mut fd = objective(d);

    for _ in 0..MAX_ITER {
        if (b - a).abs() <= tolerance {
            break;
        }
        if fc < fd {
            b = d;
            d = c;
            fd = fc;
            c = b - INV_PHI * (b - a);
            fc = objective(c);
        } else {
            a = c;
            c = d;
            fc = fd;
            d = a + INV_PHI * (b - a);
            fd = objective(d);
        }
    }

    0.5 * (a + b)
}

/// Centroid of all vertices except the worst (the simplex is sorted).
fn centroid_excluding_worst(simplex: &[(Vec<f64>, f64)]) -> Vec<f64> {
    let n = simplex[0].0.len();
    let count = simplex.len() - 1;
    let mut centroid = vec![0.0; n];
    for (vertex, _) in &simplex[..count] {
        for (c, x) in centroid.iter_mut().zip(vertex.iter()) {
            *c += x;
        }
    }
    for c in &mut centroid {
        *c /= count as f64;
    }
    centroid
}

/// `base + coeff * (reference - base)` componentwise.
fn step_from(base: &[f64], reference: &[f64], coeff: f64) -> Vec<f64> {
    base.iter()
        .zip(reference.iter())
        .map(|(b, r)| b + coeff * (r - b))
        .collect()
}

/// Clamp a point into the box bounds.
fn clamp_point(mut point: Vec<f64>, bounds: Option<&[(f64, f64)]>) -> Vec<f64> {
    if let Some(bounds) = bounds {
        for (x, &(lo, hi)) in point.iter_mut().zip(bounds.iter()) {
            *x = x.clamp(lo, hi);
        }
    }
    point
}

fn euclidean_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}
