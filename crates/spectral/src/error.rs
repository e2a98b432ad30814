//! Error types for the msmkit-spectral crate.

use std::fmt;

use num_complex::Complex64;

/// Error type for all fallible operations in the msmkit-spectral crate.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SpectralError {
    /// Returned when the requested number of eigenvalues is zero or exceeds
    /// the number of states.
    #[error("invalid number of eigenvalues: {k} (must be in 1..={n_states})")]
    InvalidK {
        /// Requested count.
        k: usize,
        /// Number of states.
        n_states: usize,
    },

    /// Returned when the lag time is not a positive finite number.
    #[error("invalid lag time: {lag} (must be finite and > 0)")]
    InvalidLag {
        /// The rejected lag.
        lag: f64,
    },

    /// Returned when a supplied stationary distribution has an entry that is
    /// zero, negative or not finite.
    #[error("stationary distribution entry {index} is not positive: {value}")]
    NonPositiveStationary {
        /// State index of the offending entry.
        index: usize,
        /// Its value.
        value: f64,
    },

    /// Returned when the stationary distribution does not have one entry per
    /// state.
    #[error("length mismatch: expected {expected}, got {got}")]
    LengthMismatch {
        /// Number of states.
        expected: usize,
        /// Actual length.
        got: usize,
    },

    /// Returned when an eigensolver fails to converge or breaks down.
    #[error("eigensolver failed: {reason}")]
    EigenSolverFailed {
        /// Description of the failure.
        reason: String,
    },
}

/// Why an eigenvalue has no finite relaxation timescale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DegeneracyKind {
    /// `|λ|` equals 1: a second stationary component, infinite timescale.
    Unit,
    /// Real `λ <= 0`: the timescale is undefined.
    NonPositive,
}

impl fmt::Display for DegeneracyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DegeneracyKind::Unit => f.write_str("unit modulus"),
            DegeneracyKind::NonPositive => f.write_str("non-positive real eigenvalue"),
        }
    }
}

/// Per-eigenvalue failure of a timescale computation.
///
/// Reported in place of the timescale; it never aborts the other entries.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
#[error("eigenvalue {index} ({eigenvalue}) has no finite timescale: {kind}")]
pub struct DegenerateSpectrum {
    /// Position of the eigenvalue in the sorted spectrum.
    pub index: usize,
    /// The eigenvalue.
    pub eigenvalue: Complex64,
    /// Why no timescale exists.
    pub kind: DegeneracyKind,
}
