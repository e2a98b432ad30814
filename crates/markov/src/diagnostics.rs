//! Likelihood and reversibility diagnostics.

use msmkit_counts::CountMatrix;

use crate::error::MarkovError;
use crate::transition::TransitionMatrix;

/// Log-likelihood `Σ C_ij ln P_ij` of the counts under `tm`.
///
/// Only positive counts contribute. Returns `-inf` when a counted transition
/// has zero probability.
///
/// # Errors
///
/// Returns [`MarkovError::LengthMismatch`] if the state counts differ.
pub fn log_likelihood(counts: &CountMatrix, tm: &TransitionMatrix) -> Result<f64, MarkovError> {
    if counts.n_states() != tm.n_states() {
        return Err(MarkovError::LengthMismatch {
            expected: counts.n_states(),
            got: tm.n_states(),
        });
    }
    let p = tm.as_array();
    Ok(counts
        .as_array()
        .indexed_iter()
        .filter(|&(_, &c)| c > 0.0)
        .map(|((i, j), &c)| c * p[[i, j]].ln())
        .sum())
}

/// Largest violation `|π_i P_ij − π_j P_ji|` of detailed balance.
///
/// # Panics
///
/// Panics if `stationary` is shorter than the number of states.
pub fn detailed_balance_residual(tm: &TransitionMatrix, stationary: &[f64]) -> f64 {
    let p = tm.as_array();
    let n = tm.n_states();
    let mut worst = 0.0_f64;
    for i in 0..n {
        for j in (i + 1)..n {
            let r = (stationary[i] * p[[i, j]] - stationary[j] * p[[j, i]]).abs();
            worst = worst.max(r);
        }
    }
    worst
}

/// Returns true if `tm` satisfies detailed balance with respect to
/// `stationary` within `tol`.
///
/// # Errors
///
/// Returns [`MarkovError::LengthMismatch`] if `stationary` does not have one
/// entry per state.
pub fn is_reversible(
    tm: &TransitionMatrix,
    stationary: &[f64],
    tol: f64,
) -> Result<bool, MarkovError> {
    if stationary.len() != tm.n_states() {
        return Err(MarkovError::LengthMismatch {
            expected: tm.n_states(),
            got: stationary.len(),
        });
    }
    Ok(detailed_balance_residual(tm, stationary) < tol)
}
