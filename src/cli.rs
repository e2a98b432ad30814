use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// msmkit Markov state model estimator.
#[derive(Parser)]
#[command(
    name = "msmkit",
    version,
    about = "Markov state model estimation from discretised simulation data"
)]
pub struct Cli {
    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand)]
pub enum Command {
    /// Estimate a transition matrix, its stationary distribution and its
    /// relaxation timescales.
    Estimate(EstimateArgs),
}

/// Arguments for the `estimate` subcommand.
#[derive(clap::Args)]
pub struct EstimateArgs {
    /// Path to TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Count matrix text file (whitespace or comma separated rows).
    #[arg(long, conflicts_with = "dtraj", required_unless_present = "dtraj")]
    pub counts: Option<PathBuf>,

    /// Discrete trajectory text files, one integer state per token.
    #[arg(long, num_args = 1..)]
    pub dtraj: Vec<PathBuf>,

    /// Override the lag time from config.
    #[arg(short, long)]
    pub lag: Option<usize>,

    /// Path for the JSON report. Printed to stdout when omitted.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_counts_input() {
        let cli = Cli::parse_from(["msmkit", "-vv", "estimate", "--counts", "c.txt", "--lag", "5"]);
        assert_eq!(cli.verbose, 2);
        let Command::Estimate(args) = cli.command;
        assert_eq!(args.counts, Some(PathBuf::from("c.txt")));
        assert_eq!(args.lag, Some(5));
        assert!(args.dtraj.is_empty());
    }

    #[test]
    fn parses_multiple_trajectories() {
        let cli = Cli::parse_from(["msmkit", "estimate", "--dtraj", "a.txt", "b.txt"]);
        let Command::Estimate(args) = cli.command;
        assert_eq!(args.dtraj.len(), 2);
        assert!(args.counts.is_none());
    }

    #[test]
    fn rejects_both_inputs() {
        let result = Cli::try_parse_from([
            "msmkit", "estimate", "--counts", "c.txt", "--dtraj", "a.txt",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn requires_an_input() {
        assert!(Cli::try_parse_from(["msmkit", "estimate"]).is_err());
    }
}
