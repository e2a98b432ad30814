//! Pure conversion functions: TOML config structs -> crate API config types.

use anyhow::{Context, Result, bail};

use crate::config::*;

use msmkit_counts::{CountConfig, CountMode};
use msmkit_markov::{InitialGuess, ReversibleConfig, StationaryConfig, StationaryMethod};

/// Parses a counting mode name into the corresponding enum variant.
pub fn parse_count_mode(s: &str) -> Result<CountMode> {
    match s.to_lowercase().as_str() {
        "sliding" => Ok(CountMode::Sliding),
        "sample" => Ok(CountMode::Sample),
        other => bail!("unknown counting mode: {other:?}"),
    }
}

/// Parses an initial guess name into the corresponding enum variant.
pub fn parse_initial_guess(s: &str) -> Result<InitialGuess> {
    match s.to_lowercase().replace('_', "-").as_str() {
        "row-sums" => Ok(InitialGuess::RowSums),
        "nonreversible" | "non-reversible" => Ok(InitialGuess::NonReversibleStationary),
        other => bail!("unknown initial guess: {other:?}"),
    }
}

/// Parses a stationary solver name into the corresponding enum variant.
pub fn parse_stationary_method(s: &str) -> Result<StationaryMethod> {
    match s.to_lowercase().as_str() {
        "auto" => Ok(StationaryMethod::Auto),
        "direct" => Ok(StationaryMethod::Direct),
        "power" => Ok(StationaryMethod::Power),
        other => bail!("unknown stationary method: {other:?}"),
    }
}

/// Builds a [`CountConfig`] from the TOML counting configuration.
///
/// A lag given on the command line takes precedence over the file.
pub fn build_count_config(counting: &CountingToml, lag: Option<usize>) -> Result<CountConfig> {
    let mode = parse_count_mode(&counting.mode)?;
    let lag = lag.unwrap_or(counting.lag);
    if lag == 0 {
        bail!("lag time must be >= 1");
    }
    let mut cfg = CountConfig::new(lag).with_mode(mode);
    if let Some(n) = counting.n_states {
        cfg = cfg.with_n_states(n);
    }
    Ok(cfg.with_max_states(counting.max_states))
}

/// Builds a [`ReversibleConfig`] from the TOML estimation configuration.
pub fn build_reversible_config(estimation: &EstimationToml) -> Result<ReversibleConfig> {
    let initial = parse_initial_guess(&estimation.initial)?;
    let cfg = ReversibleConfig::new()
        .with_prior(estimation.prior)
        .with_tolerance(estimation.tolerance)
        .with_max_iter(estimation.max_iter)
        .with_initial(initial)
        .with_parallel_threshold(estimation.parallel_threshold);
    cfg.validate().context("invalid [estimation] section")?;
    Ok(cfg)
}

/// Builds a [`StationaryConfig`] from the TOML stationary configuration.
pub fn build_stationary_config(stationary: &StationaryToml) -> Result<StationaryConfig> {
    let method = parse_stationary_method(&stationary.method)?;
    let cfg = StationaryConfig::new()
        .with_method(method)
        .with_dense_threshold(stationary.dense_threshold)
        .with_tolerance(stationary.tolerance)
        .with_max_iter(stationary.max_iter);
    cfg.validate().context("invalid [stationary] section")?;
    Ok(cfg)
}
