//! Transition matrix estimation for Markov state models.
//!
//! This crate turns a validated count matrix into a row-stochastic transition
//! matrix, either by plain row normalisation or by reversible maximum
//! likelihood, and computes the stationary distribution of the result.
//!
//! # Pipeline
//!
//! ```text
//!  ┌────────────────┐     ┌────────────────────────┐     ┌──────────────┐
//!  │  CountMatrix   │────▶│  estimate_reversible   │────▶│  stationary  │
//!  │ (msmkit-counts)│     │  estimate_nonreversible│     │  diagnostics │
//!  └────────────────┘     └────────────────────────┘     └──────────────┘
//! ```
//!
//! # Quick start
//!
//! ```rust
//! use msmkit_counts::CountMatrix;
//! use msmkit_markov::{ReversibleConfig, estimate_reversible};
//!
//! let counts = CountMatrix::from_rows(&[
//!     vec![90.0, 10.0, 0.0],
//!     vec![8.0, 80.0, 12.0],
//!     vec![0.0, 14.0, 86.0],
//! ])
//! .unwrap();
//!
//! let estimate = estimate_reversible(&counts, &ReversibleConfig::new()).unwrap();
//! let pi = estimate.stationary_distribution();
//! assert!((pi.iter().sum::<f64>() - 1.0).abs() < 1e-12);
//! ```
//!
//! ## Mathematical Glossary
//!
//! | Symbol | Accessor | Meaning |
//! |--------|----------|---------|
//! | C | [`CountMatrix`](msmkit_counts::CountMatrix) | observed transition counts at one lag |
//! | P | [`TransitionMatrix`] | row-stochastic transition probabilities |
//! | π | [`ReversibleEstimate::stationary_distribution`] | stationary distribution, `πP = π` |
//! | x_ij | internal | symmetric flux `π_i P_ij` of a reversible chain |

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod reversible;
pub mod simulate;
pub mod stationary;
pub mod transition;

pub use config::{
    InitialGuess, ReversibleConfig, StationaryConfig, StationaryMethod, StationarySolver,
};
pub use diagnostics::{detailed_balance_residual, is_reversible, log_likelihood};
pub use error::MarkovError;
pub use reversible::{ReversibleEstimate, estimate_reversible};
pub use simulate::{simulate_trajectory, simulate_trajectory_into};
pub use stationary::{closed_classes, stationary_distribution};
pub use transition::{TransitionMatrix, estimate_nonreversible, estimate_nonreversible_with_prior};
