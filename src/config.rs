use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Top-level msmkit configuration.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct MsmkitConfig {
    /// Transition counting settings.
    #[serde(default)]
    pub counting: CountingToml,

    /// Transition matrix estimation settings.
    #[serde(default)]
    pub estimation: EstimationToml,

    /// Stationary distribution solver settings.
    #[serde(default)]
    pub stationary: StationaryToml,

    /// Eigendecomposition settings.
    #[serde(default)]
    pub spectral: SpectralToml,
}

impl MsmkitConfig {
    /// Reads and parses a TOML configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let toml_str = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        toml::from_str(&toml_str).context("failed to parse TOML config")
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CountingToml {
    #[serde(default = "default_lag")]
    pub lag: usize,
    #[serde(default = "default_mode")]
    pub mode: String,
    #[serde(default)]
    pub n_states: Option<usize>,
    #[serde(default = "default_max_states")]
    pub max_states: usize,
}

impl Default for CountingToml {
    fn default() -> Self {
        Self {
            lag: default_lag(),
            mode: default_mode(),
            n_states: None,
            max_states: default_max_states(),
        }
    }
}

fn default_lag() -> usize {
    1
}
fn default_mode() -> String {
    "sliding".to_string()
}
fn default_max_states() -> usize {
    msmkit_counts::DEFAULT_MAX_STATES
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EstimationToml {
    #[serde(default = "default_true")]
    pub reversible: bool,
    #[serde(default)]
    pub prior: f64,
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    #[serde(default = "default_max_iter")]
    pub max_iter: usize,
    #[serde(default = "default_initial")]
    pub initial: String,
    #[serde(default = "default_true")]
    pub restrict_to_largest: bool,
    #[serde(default = "default_parallel_threshold")]
    pub parallel_threshold: usize,
}

impl Default for EstimationToml {
    fn default() -> Self {
        Self {
            reversible: true,
            prior: 0.0,
            tolerance: default_tolerance(),
            max_iter: default_max_iter(),
            initial: default_initial(),
            restrict_to_largest: true,
            parallel_threshold: default_parallel_threshold(),
        }
    }
}

fn default_tolerance() -> f64 {
    1e-10
}
// Metastable counts can need thousands of rounds.
fn default_max_iter() -> usize {
    1_000_000
}
fn default_initial() -> String {
    "row-sums".to_string()
}
fn default_parallel_threshold() -> usize {
    256
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StationaryToml {
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default = "default_dense_threshold")]
    pub dense_threshold: usize,
    #[serde(default = "default_stationary_tolerance")]
    pub tolerance: f64,
    #[serde(default = "default_stationary_max_iter")]
    pub max_iter: usize,
}

impl Default for StationaryToml {
    fn default() -> Self {
        Self {
            method: default_method(),
            dense_threshold: default_dense_threshold(),
            tolerance: default_stationary_tolerance(),
            max_iter: default_stationary_max_iter(),
        }
    }
}

fn default_method() -> String {
    "auto".to_string()
}
fn default_dense_threshold() -> usize {
    500
}
fn default_stationary_tolerance() -> f64 {
    1e-12
}
fn default_stationary_max_iter() -> usize {
    100_000
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpectralToml {
    #[serde(default = "default_n_timescales")]
    pub n_timescales: usize,
}

impl Default for SpectralToml {
    fn default() -> Self {
        Self {
            n_timescales: default_n_timescales(),
        }
    }
}

fn default_n_timescales() -> usize {
    5
}
