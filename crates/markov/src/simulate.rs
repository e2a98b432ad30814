//! Discrete trajectory simulation.

use crate::error::MarkovError;
use crate::transition::TransitionMatrix;

/// Simulates a discrete trajectory of `n_steps` frames.
///
/// The first frame is `start`; every following frame is drawn from the row
/// of the previous one.
///
/// # Errors
///
/// Returns [`MarkovError::StateOutOfRange`] if `start` is not a state of `tm`.
pub fn simulate_trajectory(
    tm: &TransitionMatrix,
    n_steps: usize,
    start: usize,
    rng: &mut impl rand::Rng,
) -> Result<Vec<usize>, MarkovError> {
    let mut out = vec![start; n_steps];
    simulate_trajectory_into(tm, start, rng, &mut out)?;
    Ok(out)
}

/// Simulates a discrete trajectory into a pre-allocated buffer.
///
/// # Errors
///
/// Returns [`MarkovError::StateOutOfRange`] if `start` is not a state of `tm`.
pub fn simulate_trajectory_into(
    tm: &TransitionMatrix,
    start: usize,
    rng: &mut impl rand::Rng,
    out: &mut [usize],
) -> Result<(), MarkovError> {
    if start >= tm.n_states() {
        return Err(MarkovError::StateOutOfRange {
            state: start,
            n_states: tm.n_states(),
        });
    }
    let mut prev = start;
    for (t, slot) in out.iter_mut().enumerate() {
        if t > 0 {
            prev = tm.sample(prev, rng);
        }
        *slot = prev;
    }
    Ok(())
}
