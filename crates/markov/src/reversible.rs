//! Reversible maximum-likelihood transition matrix estimation.
//!
//! The estimator maximises the likelihood of the observed counts over all
//! transition matrices that satisfy detailed balance with respect to their
//! own stationary distribution. It works with the symmetric flux
//! `x_ij = π_i P_ij = π_j P_ji` and iterates the self-consistency condition
//!
//! ```text
//! x_ij = (c_ij + c_ji) / (c_i / π_i + c_j / π_j),     π_i = Σ_j x_ij / Σ_kl x_kl
//! ```
//!
//! where `c_i` is the outgoing count of state `i`. Each round reads an
//! immutable snapshot of π and writes a freshly allocated vector, so the
//! per-state flux sums of one round are independent and may run in parallel.
//!
//! # Dangling states
//!
//! A state with no outgoing count (after removing other such states) cannot
//! be given a meaningful row. It is excluded from the iteration, made
//! absorbing (`P[i][i] = 1`), and given `π_i = 0`. Counts into it are
//! dropped, so detailed balance still holds.

use msmkit_counts::{CountMatrix, CountsError};
use ndarray::{Array2, ArrayView2};
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::config::{InitialGuess, ReversibleConfig, StationaryConfig};
use crate::diagnostics::detailed_balance_residual;
use crate::error::MarkovError;
use crate::stationary::stationary_distribution;
use crate::transition::{TransitionMatrix, estimate_nonreversible};

/// Tolerance of the debug-build invariant checks.
const INVARIANT_TOL: f64 = 1e-9;

/// Result of a reversible estimation.
#[derive(Debug, Clone)]
pub struct ReversibleEstimate {
    transition_matrix: TransitionMatrix,
    stationary: Vec<f64>,
    active_states: Vec<usize>,
    iterations: usize,
    final_delta: f64,
}

impl ReversibleEstimate {
    /// The estimated reversible transition matrix, shape `(n, n)`.
    pub fn transition_matrix(&self) -> &TransitionMatrix {
        &self.transition_matrix
    }

    /// Stationary distribution of the estimate, length `n`.
    pub fn stationary_distribution(&self) -> &[f64] {
        &self.stationary
    }

    /// States that took part in the iteration. The others are dangling and
    /// absorbing.
    pub fn active_states(&self) -> &[usize] {
        &self.active_states
    }

    /// Number of completed update rounds before convergence.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Largest change of π in the final round.
    pub fn final_delta(&self) -> f64 {
        self.final_delta
    }

    /// Splits the estimate into its transition matrix and stationary vector.
    pub fn into_parts(self) -> (TransitionMatrix, Vec<f64>) {
        (self.transition_matrix, self.stationary)
    }
}

/// Estimates the maximum-likelihood reversible transition matrix.
///
/// The counts should normally be restricted to one strongly connected
/// component first (see
/// [`CountMatrix::largest_connected_submatrix`](msmkit_counts::CountMatrix::largest_connected_submatrix)).
///
/// # Errors
///
/// - [`MarkovError::InvalidConfig`] for an invalid configuration.
/// - [`MarkovError::Counts`] with [`CountsError::Disconnected`] if no state
///   has an outgoing count.
/// - [`MarkovError::NotConverged`] if `max_iter` rounds do not reach the
///   tolerance. The error carries the last stationary vector.
#[tracing::instrument(skip(counts, config), fields(n_states = counts.n_states()))]
pub fn estimate_reversible(
    counts: &CountMatrix,
    config: &ReversibleConfig,
) -> Result<ReversibleEstimate, MarkovError> {
    config.validate()?;
    let n = counts.n_states();

    let regularized = counts.as_array().mapv(|c| c + config.prior());
    let active = active_states(regularized.view());
    if active.is_empty() {
        return Err(CountsError::Disconnected.into());
    }
    if active.len() < n {
        warn!(
            n_dangling = n - active.len(),
            "states without outgoing counts made absorbing"
        );
    }

    let sub = Array2::from_shape_fn((active.len(), active.len()), |(a, b)| {
        regularized[[active[a], active[b]]]
    });
    let problem = FluxProblem::new(sub, active.len() >= config.parallel_threshold());
    let initial = problem.initial_guess(config.initial());

    let solution = problem.solve(initial, config.tolerance(), config.max_iter());
    let (pi, iterations, delta) = match solution {
        Ok(converged) => converged,
        Err(Unconverged {
            iterations,
            delta,
            pi,
        }) => {
            warn!(iterations, delta, "reversible estimator did not converge");
            return Err(MarkovError::NotConverged {
                iterations,
                delta,
                stationary: scatter(&pi, &active, n),
            });
        }
    };
    debug!(iterations, delta, "reversible estimator converged");

    let (transition_matrix, stationary) = problem.assemble(&pi, &active, n);
    debug_assert!(
        transition_matrix.validate().is_ok(),
        "assembled matrix is not row-stochastic"
    );
    debug_assert!(
        detailed_balance_residual(&transition_matrix, &stationary) < INVARIANT_TOL,
        "detailed balance violated after assembly"
    );

    Ok(ReversibleEstimate {
        transition_matrix,
        stationary,
        active_states: active,
        iterations,
        final_delta: delta,
    })
}

/// States that keep a positive outgoing count once every dangling state has
/// been removed.
fn active_states(counts: ArrayView2<'_, f64>) -> Vec<usize> {
    let n = counts.nrows();
    let mut active = vec![true; n];
    loop {
        let mut changed = false;
        for i in 0..n {
            if !active[i] {
                continue;
            }
            let outgoing: f64 = (0..n).filter(|&j| active[j]).map(|j| counts[[i, j]]).sum();
            if outgoing <= 0.0 {
                active[i] = false;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
    (0..n).filter(|&i| active[i]).collect()
}

/// Expands a vector over the active states to all `n` states, zero elsewhere.
fn scatter(values: &[f64], active: &[usize], n: usize) -> Vec<f64> {
    let mut full = vec![0.0; n];
    for (&v, &i) in values.iter().zip(active) {
        full[i] = v;
    }
    full
}

/// Flux of one pair, the non-negative root of its stationarity condition.
///
/// A state whose π underflowed to zero contributes an infinite term, which
/// drives the flux to zero instead of dividing by zero.
fn pair_flux(pair_count: f64, c_i: f64, pi_i: f64, c_j: f64, pi_j: f64) -> f64 {
    let weight = |c: f64, pi: f64| if pi > 0.0 { c / pi } else { f64::INFINITY };
    let x = pair_count / (weight(c_i, pi_i) + weight(c_j, pi_j));
    if x.is_finite() && x > 0.0 { x } else { 0.0 }
}

/// Iteration state on the active submatrix. Never mutated after construction.
struct FluxProblem {
    counts: Array2<f64>,
    row_sums: Vec<f64>,
    parallel: bool,
}

struct Unconverged {
    iterations: usize,
    delta: f64,
    pi: Vec<f64>,
}

impl FluxProblem {
    fn new(counts: Array2<f64>, parallel: bool) -> Self {
        let row_sums = counts.rows().into_iter().map(|r| r.sum()).collect();
        Self {
            counts,
            row_sums,
            parallel,
        }
    }

    fn n(&self) -> usize {
        self.row_sums.len()
    }

    fn flux(&self, i: usize, j: usize, pi: &[f64]) -> f64 {
        let pair_count = self.counts[[i, j]] + self.counts[[j, i]];
        if pair_count <= 0.0 {
            return 0.0;
        }
        pair_flux(pair_count, self.row_sums[i], pi[i], self.row_sums[j], pi[j])
    }

    fn row_flux(&self, i: usize, pi: &[f64]) -> f64 {
        (0..self.n()).map(|j| self.flux(i, j, pi)).sum()
    }

    fn initial_guess(&self, initial: InitialGuess) -> Vec<f64> {
        let from_rows = || normalized(self.row_sums.clone()).unwrap_or_else(|| uniform(self.n()));
        match initial {
            InitialGuess::RowSums => from_rows(),
            InitialGuess::NonReversibleStationary => {
                let counts = CountMatrix::new(self.counts.clone());
                let seeded = counts.ok().and_then(|c| {
                    stationary_distribution(&estimate_nonreversible(&c), &StationaryConfig::new())
                        .ok()
                });
                match seeded {
                    Some(pi) if pi.iter().all(|&v| v > 0.0) => pi,
                    _ => {
                        debug!("non-reversible seed not strictly positive, using row sums");
                        from_rows()
                    }
                }
            }
        }
    }

    /// One round: reads `pi`, returns the renormalised next vector.
    fn update(&self, pi: &[f64]) -> Option<Vec<f64>> {
        let next: Vec<f64> = if self.parallel {
            (0..self.n())
                .into_par_iter()
                .map(|i| self.row_flux(i, pi))
                .collect()
        } else {
            (0..self.n()).map(|i| self.row_flux(i, pi)).collect()
        };
        normalized(next)
    }

    fn solve(
        &self,
        initial: Vec<f64>,
        tolerance: f64,
        max_iter: usize,
    ) -> Result<(Vec<f64>, usize, f64), Unconverged> {
        let mut pi = initial;
        let mut round = 0usize;
        loop {
            let Some(next) = self.update(&pi) else {
                return Err(Unconverged {
                    iterations: round,
                    delta: f64::INFINITY,
                    pi,
                });
            };
            debug_assert!(next.iter().all(|&v| v >= 0.0), "negative stationary entry");
            debug_assert!(
                (next.iter().sum::<f64>() - 1.0).abs() < INVARIANT_TOL,
                "stationary vector not normalised"
            );

            let delta = max_abs_diff(&pi, &next);
            if delta < tolerance {
                return Ok((next, round, delta));
            }
            if round >= max_iter {
                return Err(Unconverged {
                    iterations: round,
                    delta,
                    pi: next,
                });
            }
            pi = next;
            round += 1;
        }
    }

    /// Builds the full `n x n` matrix and stationary vector from the fluxes
    /// at `pi`.
    fn assemble(&self, pi: &[f64], active: &[usize], n: usize) -> (TransitionMatrix, Vec<f64>) {
        let m = self.n();
        let flux = Array2::from_shape_fn((m, m), |(a, b)| self.flux(a, b, pi));
        let total = flux.sum();

        let mut probs = Array2::<f64>::zeros((n, n));
        let mut stationary = vec![0.0; n];
        for (a, &i) in active.iter().enumerate() {
            let weight = flux.row(a).sum();
            if !(weight > 0.0 && total > 0.0) {
                probs[[i, i]] = 1.0;
                continue;
            }
            stationary[i] = weight / total;
            let mut off_diagonal = 0.0;
            for (b, &j) in active.iter().enumerate() {
                if a != b {
                    let p = flux[[a, b]] / weight;
                    probs[[i, j]] = p;
                    off_diagonal += p;
                }
            }
            probs[[i, i]] = (1.0 - off_diagonal).max(0.0);
        }
        for i in 0..n {
            if stationary[i] == 0.0 {
                probs.row_mut(i).fill(0.0);
                probs[[i, i]] = 1.0;
            }
        }

        (TransitionMatrix::from_probs(probs), stationary)
    }
}

fn normalized(mut values: Vec<f64>) -> Option<Vec<f64>> {
    let total: f64 = values.iter().sum();
    if !(total > 0.0 && total.is_finite()) {
        return None;
    }
    for v in &mut values {
        *v /= total;
    }
    Some(values)
}

fn uniform(n: usize) -> Vec<f64> {
    vec![1.0 / n as f64; n]
}

fn max_abs_diff(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f64::max)
}
