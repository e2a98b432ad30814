//! Estimate command: counts -> transition matrix -> stationary distribution
//! -> spectrum, written as a JSON report.

use anyhow::{Context, Result};
use tracing::{info, info_span, warn};

use msmkit_counts::{CountMatrix, count_matrix};
use msmkit_markov::{
    MarkovError, TransitionMatrix, detailed_balance_residual, estimate_nonreversible_with_prior,
    estimate_reversible, log_likelihood, stationary_distribution,
};
use msmkit_spectral::decompose;

use crate::cli::EstimateArgs;
use crate::config::MsmkitConfig;
use crate::convert;
use crate::input;
use crate::report::{self, ConfigSummary, ConvergenceSummary, EstimateReport};

/// Run the estimation pipeline.
pub fn run(args: EstimateArgs) -> Result<()> {
    let _cmd = info_span!("estimate").entered();

    // 1. Load project TOML
    let config = match &args.config {
        Some(path) => MsmkitConfig::load(path)?,
        None => MsmkitConfig::default(),
    };
    let count_cfg = convert::build_count_config(&config.counting, args.lag)?;

    // 2. Read counts or tally them from trajectories
    let counts = match &args.counts {
        Some(path) => {
            info!(path = %path.display(), "reading count matrix");
            input::read_count_matrix(path)?
        }
        None => {
            let dtrajs = args
                .dtraj
                .iter()
                .map(|p| input::read_dtraj(p))
                .collect::<Result<Vec<_>>>()?;
            info!(n_trajs = dtrajs.len(), lag = count_cfg.lag(), "counting transitions");
            count_matrix(&dtrajs, &count_cfg).context("failed to count transitions")?
        }
    };
    info!(n_states = counts.n_states(), total = counts.total(), "counts loaded");

    // 3. Estimate
    let report = estimate(&counts, &config, count_cfg.lag())?;

    // 4. Write JSON report
    let json = serde_json::to_string_pretty(&report).context("failed to serialise report")?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, &json)
                .with_context(|| format!("failed to write report: {}", path.display()))?;
            info!(path = %path.display(), "report written");
        }
        None => println!("{json}"),
    }
    Ok(())
}

/// Estimates a model from `counts` and assembles the report.
pub fn estimate(counts: &CountMatrix, config: &MsmkitConfig, lag: usize) -> Result<EstimateReport> {
    let estimation = &config.estimation;

    let (active_counts, active_set) = if estimation.restrict_to_largest {
        let (sub, kept) = counts
            .largest_connected_submatrix()
            .context("failed to restrict to the largest connected set")?;
        if kept.len() < counts.n_states() {
            warn!(
                n_states = counts.n_states(),
                n_active = kept.len(),
                "restricted to largest connected set"
            );
        }
        (sub, kept)
    } else {
        let sets = counts.validate().context("invalid count matrix")?;
        if !sets.is_connected() {
            warn!(n_components = sets.len(), "count matrix is not connected");
        }
        (counts.clone(), (0..counts.n_states()).collect())
    };

    let (tm, stationary, convergence) = if estimation.reversible {
        let rev_cfg = convert::build_reversible_config(estimation)?;
        let est = match estimate_reversible(&active_counts, &rev_cfg) {
            Ok(est) => est,
            Err(MarkovError::NotConverged {
                iterations, delta, ..
            }) => anyhow::bail!(
                "reversible estimator did not converge after {iterations} iterations \
                 (last change {delta:e}); raise [estimation].max_iter or tolerance"
            ),
            Err(e) => return Err(e).context("reversible estimation failed"),
        };
        info!(iterations = est.iterations(), "reversible estimate done");
        let convergence = ConvergenceSummary {
            iterations: est.iterations(),
            final_delta: est.final_delta(),
        };
        let (tm, pi) = est.into_parts();
        (tm, pi, Some(convergence))
    } else {
        let tm = estimate_nonreversible_with_prior(&active_counts, estimation.prior)
            .context("non-reversible estimation failed")?;
        let stat_cfg = convert::build_stationary_config(&config.stationary)?;
        let pi = stationary_distribution(&tm, &stat_cfg)
            .context("failed to compute stationary distribution")?;
        (tm, pi, None)
    };

    let (eigenvalues, timescales) = spectrum(&tm, &stationary, config, lag)?;

    Ok(EstimateReport {
        config: ConfigSummary {
            lag,
            reversible: estimation.reversible,
            prior: estimation.prior,
            n_states: counts.n_states(),
            n_active: active_set.len(),
            total_counts: active_counts.total(),
        },
        active_set,
        transition_matrix: report::matrix_rows(tm.as_array()),
        log_likelihood: log_likelihood(&active_counts, &tm)?,
        detailed_balance_residual: detailed_balance_residual(&tm, &stationary),
        stationary_distribution: stationary,
        convergence,
        eigenvalues,
        timescales,
    })
}

/// Leading eigenvalues and their timescales.
///
/// The symmetric path needs a strictly positive π; otherwise the general
/// path is used.
fn spectrum(
    tm: &TransitionMatrix,
    stationary: &[f64],
    config: &MsmkitConfig,
    lag: usize,
) -> Result<(Vec<report::Eigenvalue>, Vec<Option<f64>>)> {
    let k = (config.spectral.n_timescales + 1).min(tm.n_states());
    let symmetric = config.estimation.reversible && stationary.iter().all(|&v| v > 0.0);
    let pi = symmetric.then_some(stationary);

    let decomposition = decompose(tm, k, pi).context("eigendecomposition failed")?;
    let timescales = decomposition
        .timescales(lag as f64)
        .context("failed to compute timescales")?;
    for degenerate in timescales.iter().filter_map(|t| t.as_ref().err()) {
        warn!(%degenerate, "degenerate timescale");
    }
    Ok((
        report::eigenvalues(&decomposition),
        report::timescales(&timescales),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::io::Write;

    fn config(toml_str: &str) -> MsmkitConfig {
        toml::from_str(toml_str).unwrap()
    }

    #[test]
    fn reversible_flip_report() {
        let counts = CountMatrix::from_rows(&[vec![0.0, 10.0], vec![10.0, 0.0]]).unwrap();
        let report = estimate(&counts, &MsmkitConfig::default(), 1).unwrap();
        assert_eq!(report.active_set, vec![0, 1]);
        assert_eq!(report.transition_matrix[0][1], 1.0);
        assert_abs_diff_eq!(report.stationary_distribution[0], 0.5, epsilon = 1e-14);
        assert_eq!(report.convergence.as_ref().unwrap().iterations, 0);
        // λ = -1 has no timescale.
        assert_eq!(report.timescales, vec![None]);
    }

    #[test]
    fn restricts_to_largest_set() {
        let counts = CountMatrix::from_rows(&[
            vec![8.0, 2.0, 0.0],
            vec![3.0, 7.0, 1.0],
            vec![0.0, 0.0, 5.0],
        ])
        .unwrap();
        let report = estimate(&counts, &MsmkitConfig::default(), 1).unwrap();
        assert_eq!(report.active_set, vec![0, 1]);
        assert_eq!(report.config.n_states, 3);
        assert_eq!(report.config.n_active, 2);
        assert_eq!(report.transition_matrix.len(), 2);
        assert_eq!(report.eigenvalues.len(), 2);
    }

    #[test]
    fn nonreversible_disconnected_fails() {
        let counts = CountMatrix::from_rows(&[vec![5.0, 0.0], vec![0.0, 5.0]]).unwrap();
        let cfg = config("[estimation]\nreversible = false\nrestrict_to_largest = false\n");
        let err = estimate(&counts, &cfg, 1).unwrap_err();
        assert!(format!("{err:#}").contains("stationary distribution"));
    }

    #[test]
    fn nonreversible_timescale_matches_analytic() {
        let counts = CountMatrix::from_rows(&[vec![90.0, 10.0], vec![30.0, 70.0]]).unwrap();
        let cfg = config("[estimation]\nreversible = false\n");
        let report = estimate(&counts, &cfg, 3).unwrap();
        assert!(report.convergence.is_none());
        assert_abs_diff_eq!(report.stationary_distribution[0], 0.75, epsilon = 1e-12);
        let t = report.timescales[0].unwrap();
        assert_abs_diff_eq!(t, -3.0 / 0.6_f64.ln(), epsilon = 1e-9);
    }

    #[test]
    fn zero_budget_error_names_the_knob() {
        let counts = CountMatrix::from_rows(&[vec![1.0, 9.0], vec![1.0, 1.0]]).unwrap();
        let cfg = config("[estimation]\nmax_iter = 0\n");
        let err = estimate(&counts, &cfg, 1).unwrap_err();
        assert!(err.to_string().contains("max_iter"));
    }

    #[test]
    fn default_budget_handles_metastable_counts() {
        let counts = CountMatrix::from_rows(&[
            vec![1000.0, 2.0, 0.0],
            vec![1.0, 1000.0, 1.0],
            vec![0.0, 2.0, 1000.0],
        ])
        .unwrap();
        let report = estimate(&counts, &MsmkitConfig::default(), 1).unwrap();
        assert!(report.convergence.as_ref().unwrap().iterations > 1000);
        assert_abs_diff_eq!(report.stationary_distribution[0], 0.25, epsilon = 1e-8);
        assert_abs_diff_eq!(report.stationary_distribution[1], 0.5, epsilon = 1e-8);
        assert!(report.timescales.iter().all(|t| t.is_some()));
    }

    #[test]
    fn run_writes_json_report() {
        let dir = tempfile::tempdir().unwrap();
        let traj_path = dir.path().join("traj.txt");
        let mut traj = std::fs::File::create(&traj_path).unwrap();
        writeln!(traj, "0 0 1 1 2 2 1 0 0 1 2 1 0").unwrap();

        let output = dir.path().join("report.json");
        let args = EstimateArgs {
            config: None,
            counts: None,
            dtraj: vec![traj_path],
            lag: Some(1),
            output: Some(output.clone()),
        };
        run(args).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(json["config"]["lag"], 1);
        assert_eq!(json["active_set"].as_array().unwrap().len(), 3);
        let pi_sum: f64 = json["stationary_distribution"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_f64().unwrap())
            .sum();
        assert_abs_diff_eq!(pi_sum, 1.0, epsilon = 1e-12);
    }
}
