//! Transition counting from discrete trajectories.

use ndarray::Array2;
use tracing::debug;

use crate::error::CountsError;
use crate::matrix::CountMatrix;

/// Default upper bound on the number of states of a dense count matrix.
pub const DEFAULT_MAX_STATES: usize = 10_000;

/// How transition pairs are drawn from a trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CountMode {
    /// Every pair `(s[t], s[t + lag])`. Statistically efficient but the
    /// counts are correlated.
    #[default]
    Sliding,
    /// Non-overlapping pairs `(s[k·lag], s[(k + 1)·lag])`.
    Sample,
}

/// Configuration for transition counting.
///
/// # Example
///
/// ```
/// use msmkit_counts::{CountConfig, CountMode};
///
/// let config = CountConfig::new(10).with_mode(CountMode::Sample);
/// assert_eq!(config.lag(), 10);
/// ```
#[derive(Debug, Clone)]
pub struct CountConfig {
    lag: usize,
    mode: CountMode,
    n_states: Option<usize>,
    max_states: usize,
}

impl CountConfig {
    /// Creates a configuration for the given lag with sliding-window counting.
    pub fn new(lag: usize) -> Self {
        Self {
            lag,
            mode: CountMode::Sliding,
            n_states: None,
            max_states: DEFAULT_MAX_STATES,
        }
    }

    /// Sets the counting mode.
    pub fn with_mode(mut self, mode: CountMode) -> Self {
        self.mode = mode;
        self
    }

    /// Fixes the number of states instead of inferring `max state + 1`.
    pub fn with_n_states(mut self, n_states: usize) -> Self {
        self.n_states = Some(n_states);
        self
    }

    /// Sets the largest state count accepted before allocating the matrix.
    pub fn with_max_states(mut self, max_states: usize) -> Self {
        self.max_states = max_states;
        self
    }

    /// Returns the lag time in frames.
    pub fn lag(&self) -> usize {
        self.lag
    }

    /// Returns the counting mode.
    pub fn mode(&self) -> CountMode {
        self.mode
    }

    /// Returns the fixed number of states, if set.
    pub fn n_states(&self) -> Option<usize> {
        self.n_states
    }

    /// Returns the largest accepted state count.
    pub fn max_states(&self) -> usize {
        self.max_states
    }
}

/// Tallies a count matrix from one or more discrete trajectories.
///
/// Trajectories shorter than `lag + 1` frames contribute no transitions.
///
/// # Errors
///
/// - [`CountsError::InvalidLag`] if the lag is zero.
/// - [`CountsError::EmptyTrajectories`] if there is no frame at all.
/// - [`CountsError::StateOutOfRange`] if a state exceeds a fixed `n_states`.
/// - [`CountsError::TooManyStates`] if the matrix would exceed
///   `max_states` states.
#[tracing::instrument(skip(dtrajs), fields(n_trajs = dtrajs.len(), lag = config.lag()))]
pub fn count_matrix<T: AsRef<[usize]>>(
    dtrajs: &[T],
    config: &CountConfig,
) -> Result<CountMatrix, CountsError> {
    let lag = config.lag();
    if lag == 0 {
        return Err(CountsError::InvalidLag { lag });
    }
    let max_state = dtrajs
        .iter()
        .flat_map(|t| t.as_ref().iter().copied())
        .max()
        .ok_or(CountsError::EmptyTrajectories)?;

    let n_states = match config.n_states() {
        Some(n) if max_state >= n => {
            return Err(CountsError::StateOutOfRange {
                state: max_state,
                n_states: n,
            });
        }
        Some(n) => n,
        None => max_state.saturating_add(1),
    };
    if n_states > config.max_states() {
        return Err(CountsError::TooManyStates {
            n_states,
            limit: config.max_states(),
        });
    }

    let step = match config.mode() {
        CountMode::Sliding => 1,
        CountMode::Sample => lag,
    };

    let mut counts = Array2::<f64>::zeros((n_states, n_states));
    let mut n_pairs = 0usize;
    for traj in dtrajs {
        let traj = traj.as_ref();
        if traj.len() <= lag {
            continue;
        }
        for t in (0..traj.len() - lag).step_by(step) {
            counts[[traj[t], traj[t + lag]]] += 1.0;
            n_pairs += 1;
        }
    }
    debug!(n_states, n_pairs, "counted transitions");

    Ok(CountMatrix::from_valid(counts))
}
