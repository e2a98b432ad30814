//! Error types for the msmkit-markov crate.

use msmkit_counts::CountsError;

/// Error type for all fallible operations in the msmkit-markov crate.
#[derive(Debug, Clone, thiserror::Error)]
pub enum MarkovError {
    /// Returned when the input count matrix is malformed or empty of
    /// transitions.
    #[error(transparent)]
    Counts(#[from] CountsError),

    /// Returned when an iterative solver exhausts its iteration budget.
    ///
    /// `stationary` holds the best estimate reached, so callers can inspect
    /// it or retry with a looser tolerance or a larger budget.
    #[error("did not converge after {iterations} iterations (last change {delta:e})")]
    NotConverged {
        /// Iterations performed.
        iterations: usize,
        /// Largest absolute change of the stationary vector in the last
        /// iteration.
        delta: f64,
        /// Stationary vector at the last iteration.
        stationary: Vec<f64>,
    },

    /// Returned when a transition matrix has no unique stationary
    /// distribution.
    #[error("no unique stationary distribution: {closed_classes} closed communicating classes")]
    NoStationaryDistribution {
        /// Number of closed communicating classes found.
        closed_classes: usize,
    },

    /// Returned when a linear solve hits a numerically singular system.
    #[error("singular linear system while solving for the stationary distribution")]
    SingularSystem,

    /// Returned when a matrix is not row-stochastic.
    #[error("not a transition matrix: {reason}")]
    NotStochastic {
        /// Description of the problem.
        reason: String,
    },

    /// Returned when a configuration value is out of range.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Description of the problem.
        reason: String,
    },

    /// Returned when a state index is outside the matrix.
    #[error("state {state} out of range for {n_states} states")]
    StateOutOfRange {
        /// The offending state.
        state: usize,
        /// Number of states.
        n_states: usize,
    },

    /// Returned when a vector argument has the wrong length.
    #[error("length mismatch: expected {expected}, got {got}")]
    LengthMismatch {
        /// Expected length.
        expected: usize,
        /// Actual length.
        got: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_counts_is_transparent() {
        let e = MarkovError::from(CountsError::Disconnected);
        assert_eq!(e.to_string(), "count matrix has no observed transitions");
    }

    #[test]
    fn error_not_converged() {
        let e = MarkovError::NotConverged {
            iterations: 10,
            delta: 0.5,
            stationary: vec![0.5, 0.5],
        };
        assert_eq!(
            e.to_string(),
            "did not converge after 10 iterations (last change 5e-1)"
        );
    }

    #[test]
    fn error_no_stationary_distribution() {
        let e = MarkovError::NoStationaryDistribution { closed_classes: 2 };
        assert_eq!(
            e.to_string(),
            "no unique stationary distribution: 2 closed communicating classes"
        );
    }

    #[test]
    fn error_invalid_config() {
        let e = MarkovError::InvalidConfig {
            reason: "tolerance must be positive".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "invalid configuration: tolerance must be positive"
        );
    }

    #[test]
    fn error_length_mismatch() {
        let e = MarkovError::LengthMismatch {
            expected: 4,
            got: 3,
        };
        assert_eq!(e.to_string(), "length mismatch: expected 4, got 3");
    }

    #[test]
    fn error_is_std_error() {
        fn assert_impl<T: std::error::Error>() {}
        assert_impl::<MarkovError>();
    }

    #[test]
    fn error_is_send_and_sync() {
        fn assert_impl<T: Send + Sync>() {}
        assert_impl::<MarkovError>();
    }
}
