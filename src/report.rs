//! JSON output structures for estimation results.

use msmkit_spectral::{DegenerateSpectrum, SpectralDecomposition};
use ndarray::ArrayView2;
use serde::Serialize;

/// Top-level estimation output.
#[derive(Debug, Serialize)]
pub struct EstimateReport {
    /// Configuration summary.
    pub config: ConfigSummary,
    /// Original indices of the states that were estimated.
    pub active_set: Vec<usize>,
    /// Row-stochastic transition matrix on the active set.
    pub transition_matrix: Vec<Vec<f64>>,
    pub stationary_distribution: Vec<f64>,
    /// Reversible estimator convergence, absent for non-reversible runs.
    pub convergence: Option<ConvergenceSummary>,
    /// `Σ C_ij ln P_ij`; `null` when a counted transition has zero probability.
    pub log_likelihood: f64,
    pub detailed_balance_residual: f64,
    pub eigenvalues: Vec<Eigenvalue>,
    /// One entry per eigenvalue after the first; `null` when degenerate.
    pub timescales: Vec<Option<f64>>,
}

/// Summary of the configuration used.
#[derive(Debug, Serialize)]
pub struct ConfigSummary {
    pub lag: usize,
    pub reversible: bool,
    pub prior: f64,
    pub n_states: usize,
    pub n_active: usize,
    pub total_counts: f64,
}

/// Reversible estimator convergence.
#[derive(Debug, Serialize)]
pub struct ConvergenceSummary {
    pub iterations: usize,
    pub final_delta: f64,
}

/// Complex eigenvalue.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Eigenvalue {
    pub re: f64,
    pub im: f64,
}

/// Converts a square array into nested rows.
pub fn matrix_rows(m: ArrayView2<'_, f64>) -> Vec<Vec<f64>> {
    m.rows().into_iter().map(|r| r.to_vec()).collect()
}

/// Eigenvalues of a decomposition in report form.
pub fn eigenvalues(d: &SpectralDecomposition) -> Vec<Eigenvalue> {
    d.eigenvalues()
        .iter()
        .map(|l| Eigenvalue { re: l.re, im: l.im })
        .collect()
}

/// Drops the reason of degenerate timescales.
pub fn timescales(entries: &[Result<f64, DegenerateSpectrum>]) -> Vec<Option<f64>> {
    entries.iter().map(|t| t.as_ref().ok().copied()).collect()
}
