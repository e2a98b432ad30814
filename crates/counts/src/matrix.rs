//! The validated count matrix type.

use ndarray::{Array2, ArrayView2};

use crate::connectivity::{ConnectedSets, connected_sets};
use crate::error::CountsError;

/// A square matrix of observed transition counts.
///
/// `C[i][j]` is the number of transitions from state `i` to state `j`
/// observed at a fixed lag time. Entries are finite and non-negative; real
/// values are allowed for weighted or sliding-window counting.
#[derive(Debug, Clone, PartialEq)]
pub struct CountMatrix {
    counts: Array2<f64>,
}

impl CountMatrix {
    /// Builds a count matrix, checking shape and entries.
    ///
    /// # Errors
    ///
    /// Returns [`CountsError::InvalidShape`] if the matrix is empty, not
    /// square, or holds a negative or non-finite entry.
    pub fn new(counts: Array2<f64>) -> Result<Self, CountsError> {
        let (rows, cols) = counts.dim();
        if rows != cols {
            return Err(CountsError::InvalidShape {
                reason: format!("matrix is {rows}x{cols}, expected square"),
            });
        }
        if rows == 0 {
            return Err(CountsError::InvalidShape {
                reason: "matrix has no states".to_string(),
            });
        }
        for ((i, j), &c) in counts.indexed_iter() {
            if !c.is_finite() {
                return Err(CountsError::InvalidShape {
                    reason: format!("count[{i}][{j}] is not finite: {c}"),
                });
            }
            if c < 0.0 {
                return Err(CountsError::InvalidShape {
                    reason: format!("count[{i}][{j}] = {c} is negative"),
                });
            }
        }
        Ok(Self { counts })
    }

    /// Builds a count matrix from nested rows.
    ///
    /// # Errors
    ///
    /// Returns [`CountsError::InvalidShape`] for ragged rows or any of the
    /// conditions checked by [`CountMatrix::new`].
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, CountsError> {
        let n = rows.len();
        let mut counts = Array2::zeros((n, n));
        for (i, row) in rows.iter().enumerate() {
            if row.len() != n {
                return Err(CountsError::InvalidShape {
                    reason: format!("row {i} has {} entries, expected {n}", row.len()),
                });
            }
            for (j, &c) in row.iter().enumerate() {
                counts[[i, j]] = c;
            }
        }
        Self::new(counts)
    }

    /// Wraps a matrix already known to be valid.
    pub(crate) fn from_valid(counts: Array2<f64>) -> Self {
        debug_assert!(counts.is_square());
        Self { counts }
    }

    /// Number of states `n`.
    pub fn n_states(&self) -> usize {
        self.counts.nrows()
    }

    /// Count of transitions from `i` to `j`.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.counts[[i, j]]
    }

    /// Read-only view of the `(n, n)` counts.
    pub fn as_array(&self) -> ArrayView2<'_, f64> {
        self.counts.view()
    }

    /// Consumes the matrix and returns the underlying array.
    pub fn into_inner(self) -> Array2<f64> {
        self.counts
    }

    /// Outgoing count of every state.
    pub fn row_sums(&self) -> Vec<f64> {
        self.counts.rows().into_iter().map(|r| r.sum()).collect()
    }

    /// Total number of counted transitions.
    pub fn total(&self) -> f64 {
        self.counts.sum()
    }

    /// Checks that the matrix holds at least one transition and returns its
    /// strongly connected components, largest first.
    ///
    /// # Errors
    ///
    /// Returns [`CountsError::Disconnected`] if every entry is zero.
    pub fn validate(&self) -> Result<ConnectedSets, CountsError> {
        if !self.counts.iter().any(|&c| c > 0.0) {
            return Err(CountsError::Disconnected);
        }
        Ok(connected_sets(self))
    }

    /// Restricts the matrix to `states`, in the order given.
    ///
    /// # Errors
    ///
    /// Returns [`CountsError::InvalidSelection`] if `states` is empty, holds
    /// a duplicate, or names a state outside `0..n`.
    pub fn submatrix(&self, states: &[usize]) -> Result<Self, CountsError> {
        if states.is_empty() {
            return Err(CountsError::InvalidSelection {
                reason: "no states selected".to_string(),
            });
        }
        let n = self.n_states();
        let mut seen = vec![false; n];
        for &s in states {
            if s >= n {
                return Err(CountsError::InvalidSelection {
                    reason: format!("state {s} out of range for {n} states"),
                });
            }
            if seen[s] {
                return Err(CountsError::InvalidSelection {
                    reason: format!("state {s} selected twice"),
                });
            }
            seen[s] = true;
        }
        let m = states.len();
        let sub = Array2::from_shape_fn((m, m), |(a, b)| self.counts[[states[a], states[b]]]);
        Ok(Self::from_valid(sub))
    }

    /// Restricts the matrix to its largest strongly connected component.
    ///
    /// Returns the submatrix together with the original indices of the kept
    /// states (ascending).
    ///
    /// # Errors
    ///
    /// Returns [`CountsError::Disconnected`] if the matrix has no transition,
    /// or if every component is a single state without a self-transition.
    pub fn largest_connected_submatrix(&self) -> Result<(Self, Vec<usize>), CountsError> {
        let sets = self.validate()?;
        let largest = sets.largest().to_vec();
        let sub = self.submatrix(&largest)?;
        if sub.total() <= 0.0 {
            return Err(CountsError::Disconnected);
        }
        Ok((sub, largest))
    }
}
