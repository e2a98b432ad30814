//! Error types for the msmkit-counts crate.

/// Error type for all fallible operations in the msmkit-counts crate.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CountsError {
    /// Returned when a count matrix is not square, is empty, or holds
    /// negative or non-finite entries.
    #[error("invalid count matrix: {reason}")]
    InvalidShape {
        /// Description of the problem.
        reason: String,
    },

    /// Returned when a count matrix contains no positive transition at all.
    #[error("count matrix has no observed transitions")]
    Disconnected,

    /// Returned when no trajectory holds any frame.
    #[error("no discrete trajectory frames to count")]
    EmptyTrajectories,

    /// Returned when the lag time is zero.
    #[error("invalid lag time: {lag} (must be >= 1)")]
    InvalidLag {
        /// The rejected lag.
        lag: usize,
    },

    /// Returned when a trajectory visits a state outside the declared range.
    #[error("state {state} out of range for {n_states} states")]
    StateOutOfRange {
        /// The offending state index.
        state: usize,
        /// Declared number of states.
        n_states: usize,
    },

    /// Returned when counting would allocate a matrix with more states than
    /// the configured cap.
    #[error("{n_states} states exceed the limit of {limit}")]
    TooManyStates {
        /// Number of states the matrix would need.
        n_states: usize,
        /// Configured cap.
        limit: usize,
    },

    /// Returned when a submatrix is requested for an invalid state selection.
    #[error("invalid state selection: {reason}")]
    InvalidSelection {
        /// Description of the problem.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_invalid_shape() {
        let e = CountsError::InvalidShape {
            reason: "matrix is 2x3".to_string(),
        };
        assert_eq!(e.to_string(), "invalid count matrix: matrix is 2x3");
    }

    #[test]
    fn error_disconnected() {
        assert_eq!(
            CountsError::Disconnected.to_string(),
            "count matrix has no observed transitions"
        );
    }

    #[test]
    fn error_invalid_lag() {
        let e = CountsError::InvalidLag { lag: 0 };
        assert_eq!(e.to_string(), "invalid lag time: 0 (must be >= 1)");
    }

    #[test]
    fn error_state_out_of_range() {
        let e = CountsError::StateOutOfRange {
            state: 7,
            n_states: 5,
        };
        assert_eq!(e.to_string(), "state 7 out of range for 5 states");
    }

    #[test]
    fn error_too_many_states() {
        let e = CountsError::TooManyStates {
            n_states: 1_000_001,
            limit: 10_000,
        };
        assert_eq!(e.to_string(), "1000001 states exceed the limit of 10000");
    }

    #[test]
    fn error_is_send_and_sync() {
        fn assert_impl<T: Send + Sync + std::error::Error>() {}
        assert_impl::<CountsError>();
    }
}
