//! Transition count matrices for Markov state models.
//!
//! A count matrix `C` records how often each discrete state was followed by
//! each other state after a fixed lag time. This crate validates such
//! matrices, finds their strongly connected components, and tallies them
//! from discrete trajectories.
//!
//! # Pipeline
//!
//! ```text
//!  ┌─────────────┐     ┌──────────────┐     ┌─────────────────────────┐
//!  │  counting   │────▶│ CountMatrix  │────▶│      connectivity       │
//!  │  (tally C)  │     │  (validate)  │     │ (components, restrict)  │
//!  └─────────────┘     └──────────────┘     └─────────────────────────┘
//! ```
//!
//! # Quick start
//!
//! ```rust
//! use msmkit_counts::{CountConfig, count_matrix};
//!
//! let dtraj = vec![0usize, 0, 1, 2, 1, 0, 2, 2];
//! let counts = count_matrix(&[dtraj], &CountConfig::new(1)).unwrap();
//! let sets = counts.validate().unwrap();
//! assert!(sets.is_connected());
//! ```

pub mod connectivity;
pub mod counting;
pub mod error;
pub mod matrix;

pub use connectivity::{ConnectedSets, connected_sets, is_connected, largest_connected_set};
pub use counting::{CountConfig, CountMode, DEFAULT_MAX_STATES, count_matrix};
pub use error::CountsError;
pub use matrix::CountMatrix;
