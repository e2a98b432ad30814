//! Spectral analysis of Markov state models.
//!
//! The eigenvalues of a transition matrix estimated at lag time τ encode the
//! relaxation processes of the underlying dynamics. Eigenvalue `λ_i` decays
//! as `λ_i^t`, which gives the implied timescale `t_i = -τ / ln|λ_i|`.
//!
//! # Quick start
//!
//! ```rust
//! use msmkit_markov::TransitionMatrix;
//! use msmkit_spectral::decompose;
//! use ndarray::array;
//!
//! let tm = TransitionMatrix::new(array![[0.9, 0.1], [0.3, 0.7]]).unwrap();
//! let spectrum = decompose(&tm, 2, Some(&[0.75, 0.25])).unwrap();
//! let timescales = spectrum.timescales(1.0).unwrap();
//! let t = timescales[0].as_ref().unwrap();
//! assert!((t - (-1.0 / 0.6_f64.ln())).abs() < 1e-9);
//! ```

pub mod decompose;
pub mod error;
pub mod timescales;

pub use decompose::{SpectralDecomposition, decompose};
pub use error::{DegeneracyKind, DegenerateSpectrum, SpectralError};
pub use timescales::timescales;
