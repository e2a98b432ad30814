//! Stationary distribution of a transition matrix.
//!
//! The stationary distribution is the normalised left eigenvector of `P` for
//! eigenvalue 1. It is unique exactly when the chain has one closed
//! communicating class; transient states then carry zero mass.

use msmkit_counts::ConnectedSets;
use nalgebra::{DMatrix, DVector};
use ndarray::Array1;
use tracing::debug;

use crate::config::{StationaryConfig, StationarySolver};
use crate::error::MarkovError;
use crate::transition::TransitionMatrix;

/// Computes the stationary distribution of `tm`.
///
/// # Errors
///
/// - [`MarkovError::NoStationaryDistribution`] if the chain does not have
///   exactly one closed communicating class.
/// - [`MarkovError::NotConverged`] if power iteration exhausts its budget.
/// - [`MarkovError::SingularSystem`] if the direct solve breaks down.
/// - [`MarkovError::InvalidConfig`] for an invalid configuration.
#[tracing::instrument(skip(tm, config), fields(n_states = tm.n_states()))]
pub fn stationary_distribution(
    tm: &TransitionMatrix,
    config: &StationaryConfig,
) -> Result<Vec<f64>, MarkovError> {
    config.validate()?;

    let closed = closed_classes(tm);
    if closed.len() != 1 {
        return Err(MarkovError::NoStationaryDistribution {
            closed_classes: closed.len(),
        });
    }

    match config.resolve(tm.n_states()) {
        StationarySolver::Power => power_iteration(tm, config.tolerance(), config.max_iter()),
        StationarySolver::Direct => direct_solve(tm),
    }
}

/// Closed communicating classes of `tm`: strongly connected components of the
/// positive pattern that no transition leaves.
pub fn closed_classes(tm: &TransitionMatrix) -> Vec<Vec<usize>> {
    let p = tm.as_array();
    let sets = ConnectedSets::from_pattern(p);
    sets.iter()
        .enumerate()
        .filter(|&(c, members)| {
            members.iter().all(|&i| {
                p.row(i)
                    .iter()
                    .enumerate()
                    .all(|(j, &v)| v <= 0.0 || sets.component_of(j) == c)
            })
        })
        .map(|(_, members)| members.to_vec())
        .collect()
}

/// Solves `(Pᵀ - I)π = 0` with the last equation replaced by `Σπ = 1`.
fn direct_solve(tm: &TransitionMatrix) -> Result<Vec<f64>, MarkovError> {
    let n = tm.n_states();
    let p = tm.as_array();
    let mut a = DMatrix::<f64>::from_fn(n, n, |i, j| {
        let identity = if i == j { 1.0 } else { 0.0 };
        p[[j, i]] - identity
    });
    a.row_mut(n - 1).fill(1.0);
    let mut b = DVector::<f64>::zeros(n);
    b[n - 1] = 1.0;

    let x = a.lu().solve(&b).ok_or(MarkovError::SingularSystem)?;
    let pi = clean_distribution(x.iter().copied());
    if pi.iter().any(|v| !v.is_finite()) {
        return Err(MarkovError::SingularSystem);
    }
    debug!(method = "direct", "stationary distribution solved");
    Ok(pi)
}

/// Power iteration on the lazy chain `(P + I) / 2`, which shares `P`'s
/// stationary distribution but is aperiodic.
fn power_iteration(
    tm: &TransitionMatrix,
    tolerance: f64,
    max_iter: usize,
) -> Result<Vec<f64>, MarkovError> {
    let n = tm.n_states();
    let p = tm.as_array();
    let mut pi = Array1::from_elem(n, 1.0 / n as f64);
    let mut delta = f64::INFINITY;

    for iteration in 0..max_iter {
        let mut next = (&pi + &pi.dot(&p)) * 0.5;
        let total = next.sum();
        next /= total;
        delta = next
            .iter()
            .zip(pi.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max);
        pi = next;
        if delta < tolerance {
            debug!(method = "power", iterations = iteration + 1, "stationary distribution converged");
            return Ok(clean_distribution(pi.iter().copied()));
        }
    }

    Err(MarkovError::NotConverged {
        iterations: max_iter,
        delta,
        stationary: pi.to_vec(),
    })
}

/// Clamps round-off negatives to zero and renormalises.
fn clean_distribution(values: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut pi: Vec<f64> = values.map(|v| v.max(0.0)).collect();
    let total: f64 = pi.iter().sum();
    for v in &mut pi {
        *v /= total;
    }
    pi
}
