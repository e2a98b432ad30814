//! Row-stochastic transition matrices and the non-reversible estimator.

use msmkit_counts::CountMatrix;
use ndarray::{Array2, ArrayView1, ArrayView2};

use crate::error::MarkovError;

/// Tolerance on row sums accepted by [`TransitionMatrix::new`].
const ROW_SUM_TOL: f64 = 1e-8;

/// An `n x n` row-stochastic transition matrix.
///
/// Row `i` holds the probabilities of moving from state `i` to every state
/// within one lag time. Rows sum to 1.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionMatrix {
    probs: Array2<f64>,
}

impl TransitionMatrix {
    /// Builds a transition matrix, checking that it is row-stochastic.
    ///
    /// # Errors
    ///
    /// Returns [`MarkovError::NotStochastic`] if the matrix is empty or not
    /// square, holds a non-finite value or one outside `[0, 1]`, or has a row
    /// that does not sum to 1 (tolerance: 1e-8).
    pub fn new(probs: Array2<f64>) -> Result<Self, MarkovError> {
        let tm = Self { probs };
        tm.validate()?;
        Ok(tm)
    }

    /// Wraps a matrix the estimators built to be stochastic.
    pub(crate) fn from_probs(probs: Array2<f64>) -> Self {
        Self { probs }
    }

    /// Number of states `n`.
    pub fn n_states(&self) -> usize {
        self.probs.nrows()
    }

    /// Transition probabilities out of state `from`.
    pub fn row(&self, from: usize) -> ArrayView1<'_, f64> {
        self.probs.row(from)
    }

    /// Probability of moving from `from` to `to`.
    pub fn prob(&self, from: usize, to: usize) -> f64 {
        self.probs[[from, to]]
    }

    /// Read-only view of the `(n, n)` probabilities.
    pub fn as_array(&self) -> ArrayView2<'_, f64> {
        self.probs.view()
    }

    /// Consumes the matrix and returns the underlying array.
    pub fn into_inner(self) -> Array2<f64> {
        self.probs
    }

    /// Validates that the matrix is row-stochastic.
    pub fn validate(&self) -> Result<(), MarkovError> {
        let (rows, cols) = self.probs.dim();
        if rows != cols || rows == 0 {
            return Err(MarkovError::NotStochastic {
                reason: format!("matrix is {rows}x{cols}, expected non-empty square"),
            });
        }
        for (i, row) in self.probs.rows().into_iter().enumerate() {
            let mut sum = 0.0;
            for (j, &p) in row.iter().enumerate() {
                if !p.is_finite() {
                    return Err(MarkovError::NotStochastic {
                        reason: format!("probs[{i}][{j}] is not finite: {p}"),
                    });
                }
                if !(0.0..=1.0).contains(&p) {
                    return Err(MarkovError::NotStochastic {
                        reason: format!("probs[{i}][{j}] = {p} is outside [0, 1]"),
                    });
                }
                sum += p;
            }
            if (sum - 1.0).abs() > ROW_SUM_TOL {
                return Err(MarkovError::NotStochastic {
                    reason: format!("row {i} sums to {sum}, expected 1.0"),
                });
            }
        }
        Ok(())
    }

    /// Samples the next state given the current state, using the cumulative
    /// row distribution.
    ///
    /// Falls back to the last state with positive probability if rounding
    /// prevents a match.
    pub fn sample(&self, from: usize, rng: &mut impl rand::Rng) -> usize {
        let u: f64 = rng.random();
        let row = self.probs.row(from);
        let mut cumulative = 0.0;
        let mut last_positive = from;
        for (to, &p) in row.iter().enumerate() {
            if p > 0.0 {
                last_positive = to;
            }
            cumulative += p;
            if cumulative >= u && p > 0.0 {
                return to;
            }
        }
        last_positive
    }
}

/// Estimates a transition matrix by row-normalising the counts.
///
/// Rows without any outgoing count become absorbing (`P[i][i] = 1`).
pub fn estimate_nonreversible(counts: &CountMatrix) -> TransitionMatrix {
    row_normalize(counts.as_array().to_owned())
}

/// Estimates a transition matrix after adding `prior` to every count.
///
/// # Errors
///
/// Returns [`MarkovError::InvalidConfig`] if `prior` is negative or not finite.
pub fn estimate_nonreversible_with_prior(
    counts: &CountMatrix,
    prior: f64,
) -> Result<TransitionMatrix, MarkovError> {
    if !prior.is_finite() || prior < 0.0 {
        return Err(MarkovError::InvalidConfig {
            reason: format!("prior must be finite and >= 0, got {prior}"),
        });
    }
    Ok(row_normalize(counts.as_array().mapv(|c| c + prior)))
}

fn row_normalize(mut probs: Array2<f64>) -> TransitionMatrix {
    for (i, mut row) in probs.rows_mut().into_iter().enumerate() {
        let s: f64 = row.sum();
        if s > 0.0 {
            row.mapv_inplace(|c| c / s);
        } else {
            row.fill(0.0);
            row[i] = 1.0;
        }
    }
    TransitionMatrix::from_probs(probs)
}
