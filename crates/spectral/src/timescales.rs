//! Implied relaxation timescales.

use msmkit_markov::TransitionMatrix;
use num_complex::Complex64;

use crate::decompose::{SpectralDecomposition, decompose};
use crate::error::{DegeneracyKind, DegenerateSpectrum, SpectralError};

/// `|λ|` within this distance of 1 counts as a unit eigenvalue.
pub(crate) const UNIT_TOL: f64 = 1e-10;

/// Imaginary parts at most this large count as real.
pub(crate) const REAL_TOL: f64 = 1e-12;

impl SpectralDecomposition {
    /// Relaxation timescales `t_i = -lag / ln|λ_i|` for every eigenvalue
    /// after the first.
    ///
    /// An eigenvalue without a finite timescale yields a
    /// [`DegenerateSpectrum`] entry; the remaining entries are still
    /// computed.
    ///
    /// # Errors
    ///
    /// Returns [`SpectralError::InvalidLag`] if `lag` is not finite and
    /// positive.
    pub fn timescales(
        &self,
        lag: f64,
    ) -> Result<Vec<Result<f64, DegenerateSpectrum>>, SpectralError> {
        if !(lag > 0.0 && lag.is_finite()) {
            return Err(SpectralError::InvalidLag { lag });
        }
        Ok(self
            .eigenvalues()
            .iter()
            .enumerate()
            .skip(1)
            .map(|(index, &eigenvalue)| implied_timescale(index, eigenvalue, lag))
            .collect())
    }
}

fn implied_timescale(
    index: usize,
    eigenvalue: Complex64,
    lag: f64,
) -> Result<f64, DegenerateSpectrum> {
    let degenerate = |kind| DegenerateSpectrum {
        index,
        eigenvalue,
        kind,
    };
    // Round-off leaves true zeros slightly positive.
    if eigenvalue.im.abs() <= REAL_TOL && eigenvalue.re <= REAL_TOL {
        return Err(degenerate(DegeneracyKind::NonPositive));
    }
    let modulus = eigenvalue.norm();
    if (modulus - 1.0).abs() <= UNIT_TOL {
        return Err(degenerate(DegeneracyKind::Unit));
    }
    Ok(-lag / modulus.ln())
}

/// Decomposes `tm` and returns its `k - 1` leading relaxation timescales.
///
/// # Errors
///
/// Any error of [`decompose`] or [`SpectralDecomposition::timescales`].
pub fn timescales(
    tm: &TransitionMatrix,
    lag: f64,
    k: usize,
    stationary: Option<&[f64]>,
) -> Result<Vec<Result<f64, DegenerateSpectrum>>, SpectralError> {
    if !(lag > 0.0 && lag.is_finite()) {
        return Err(SpectralError::InvalidLag { lag });
    }
    decompose(tm, k, stationary)?.timescales(lag)
}
