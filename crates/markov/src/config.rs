//! Configuration for transition matrix estimation and stationary solves.

use crate::error::MarkovError;

/// Starting point of the reversible fixed-point iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InitialGuess {
    /// Normalised row sums of the counts.
    #[default]
    RowSums,
    /// Stationary distribution of the non-reversible estimate. Falls back to
    /// row sums if that vector is not strictly positive on the active states.
    NonReversibleStationary,
}

/// Configuration for the reversible maximum-likelihood estimator.
///
/// # Example
///
/// ```
/// use msmkit_markov::ReversibleConfig;
///
/// let config = ReversibleConfig::new()
///     .with_tolerance(1e-8)
///     .with_max_iter(5000);
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Debug)]
pub struct ReversibleConfig {
    prior: f64,
    tolerance: f64,
    max_iter: usize,
    initial: InitialGuess,
    parallel_threshold: usize,
}

impl ReversibleConfig {
    /// Creates a new configuration with defaults.
    ///
    /// Defaults: `prior = 0.0`, `tolerance = 1e-10`, `max_iter = 1000`,
    /// `initial = RowSums`, `parallel_threshold = 256`.
    pub fn new() -> Self {
        Self {
            prior: 0.0,
            tolerance: 1e-10,
            max_iter: 1000,
            initial: InitialGuess::RowSums,
            parallel_threshold: 256,
        }
    }

    /// Sets the uniform pseudo-count added to every entry.
    pub fn with_prior(mut self, prior: f64) -> Self {
        self.prior = prior;
        self
    }

    /// Sets the convergence tolerance on the stationary vector.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Sets the iteration budget.
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Sets the starting point of the iteration.
    pub fn with_initial(mut self, initial: InitialGuess) -> Self {
        self.initial = initial;
        self
    }

    /// Sets the number of active states at which each round runs on the
    /// rayon thread pool.
    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }

    // --- Accessors ---

    /// Returns the uniform pseudo-count.
    pub fn prior(&self) -> f64 {
        self.prior
    }

    /// Returns the convergence tolerance.
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Returns the iteration budget.
    pub fn max_iter(&self) -> usize {
        self.max_iter
    }

    /// Returns the starting point of the iteration.
    pub fn initial(&self) -> InitialGuess {
        self.initial
    }

    /// Returns the parallel threshold.
    pub fn parallel_threshold(&self) -> usize {
        self.parallel_threshold
    }

    /// Validates this configuration.
    ///
    /// The prior must be finite and non-negative; the tolerance finite and
    /// positive.
    pub fn validate(&self) -> Result<(), MarkovError> {
        if !self.prior.is_finite() || self.prior < 0.0 {
            return Err(MarkovError::InvalidConfig {
                reason: format!("prior must be finite and >= 0, got {}", self.prior),
            });
        }
        if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
            return Err(MarkovError::InvalidConfig {
                reason: format!(
                    "tolerance must be finite and positive, got {}",
                    self.tolerance
                ),
            });
        }
        Ok(())
    }
}

impl Default for ReversibleConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Algorithm used to compute a stationary distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StationaryMethod {
    /// Direct solve for small matrices, power iteration above the threshold.
    #[default]
    Auto,
    /// LU solve of the normalised balance equations.
    Direct,
    /// Power iteration on the lazy chain `(P + I) / 2`.
    Power,
}

/// Concrete solver chosen for a given matrix size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StationarySolver {
    /// LU solve of the normalised balance equations.
    Direct,
    /// Power iteration on the lazy chain.
    Power,
}

/// Configuration for the stationary distribution solver.
#[derive(Clone, Debug)]
pub struct StationaryConfig {
    method: StationaryMethod,
    dense_threshold: usize,
    tolerance: f64,
    max_iter: usize,
}

impl StationaryConfig {
    /// Creates a new configuration with defaults.
    ///
    /// Defaults: `method = Auto`, `dense_threshold = 500`,
    /// `tolerance = 1e-12`, `max_iter = 100_000`.
    pub fn new() -> Self {
        Self {
            method: StationaryMethod::Auto,
            dense_threshold: 500,
            tolerance: 1e-12,
            max_iter: 100_000,
        }
    }

    /// Sets the solver algorithm.
    pub fn with_method(mut self, method: StationaryMethod) -> Self {
        self.method = method;
        self
    }

    /// Sets the largest state count solved directly under `Auto`.
    pub fn with_dense_threshold(mut self, threshold: usize) -> Self {
        self.dense_threshold = threshold;
        self
    }

    /// Sets the power-iteration tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Sets the power-iteration budget.
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Returns the solver algorithm.
    pub fn method(&self) -> StationaryMethod {
        self.method
    }

    /// Returns the dense threshold.
    pub fn dense_threshold(&self) -> usize {
        self.dense_threshold
    }

    /// Returns the power-iteration tolerance.
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Returns the power-iteration budget.
    pub fn max_iter(&self) -> usize {
        self.max_iter
    }

    /// Picks the solver for a matrix with `n` states; `Auto` goes direct at
    /// or below the dense threshold.
    pub fn resolve(&self, n: usize) -> StationarySolver {
        match self.method {
            StationaryMethod::Direct => StationarySolver::Direct,
            StationaryMethod::Power => StationarySolver::Power,
            StationaryMethod::Auto if n <= self.dense_threshold => StationarySolver::Direct,
            StationaryMethod::Auto => StationarySolver::Power,
        }
    }

    /// Validates this configuration.
    pub fn validate(&self) -> Result<(), MarkovError> {
        if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
            return Err(MarkovError::InvalidConfig {
                reason: format!(
                    "tolerance must be finite and positive, got {}",
                    self.tolerance
                ),
            });
        }
        Ok(())
    }
}

impl Default for StationaryConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reversible_defaults() {
        let cfg = ReversibleConfig::new();
        assert_eq!(cfg.prior(), 0.0);
        assert!((cfg.tolerance() - 1e-10).abs() < f64::EPSILON);
        assert_eq!(cfg.max_iter(), 1000);
        assert_eq!(cfg.initial(), InitialGuess::RowSums);
        assert_eq!(cfg.parallel_threshold(), 256);
    }

    #[test]
    fn reversible_builder_chaining() {
        let cfg = ReversibleConfig::new()
            .with_prior(0.5)
            .with_tolerance(1e-6)
            .with_max_iter(10)
            .with_initial(InitialGuess::NonReversibleStationary)
            .with_parallel_threshold(4);
        assert!((cfg.prior() - 0.5).abs() < f64::EPSILON);
        assert!((cfg.tolerance() - 1e-6).abs() < f64::EPSILON);
        assert_eq!(cfg.max_iter(), 10);
        assert_eq!(cfg.initial(), InitialGuess::NonReversibleStationary);
        assert_eq!(cfg.parallel_threshold(), 4);
    }

    #[test]
    fn reversible_validate_ok() {
        assert!(ReversibleConfig::new().validate().is_ok());
        // Zero iterations is a legal (if unforgiving) budget.
        assert!(ReversibleConfig::new().with_max_iter(0).validate().is_ok());
    }

    #[test]
    fn reversible_validate_bad_prior() {
        assert!(ReversibleConfig::new().with_prior(-1.0).validate().is_err());
        assert!(
            ReversibleConfig::new()
                .with_prior(f64::NAN)
                .validate()
                .is_err()
        );
        assert!(
            ReversibleConfig::new()
                .with_prior(f64::INFINITY)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn reversible_validate_bad_tolerance() {
        assert!(
            ReversibleConfig::new()
                .with_tolerance(0.0)
                .validate()
                .is_err()
        );
        assert!(
            ReversibleConfig::new()
                .with_tolerance(-1e-3)
                .validate()
                .is_err()
        );
        assert!(
            ReversibleConfig::new()
                .with_tolerance(f64::NAN)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn stationary_resolve() {
        let cfg = StationaryConfig::new().with_dense_threshold(10);
        assert_eq!(cfg.resolve(10), StationarySolver::Direct);
        assert_eq!(cfg.resolve(11), StationarySolver::Power);
        let forced = cfg.clone().with_method(StationaryMethod::Power);
        assert_eq!(forced.resolve(2), StationarySolver::Power);
        let direct = cfg.with_method(StationaryMethod::Direct);
        assert_eq!(direct.resolve(10_000), StationarySolver::Direct);
    }

    #[test]
    fn stationary_validate_bad_tolerance() {
        assert!(
            StationaryConfig::new()
                .with_tolerance(0.0)
                .validate()
                .is_err()
        );
        assert!(StationaryConfig::new().validate().is_ok());
    }
}
