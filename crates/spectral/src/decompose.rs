//! Eigendecomposition of transition matrices.
//!
//! Two paths are available:
//!
//! - **Reversible.** Given a strictly positive stationary distribution π,
//!   `S = D^{1/2} P D^{-1/2}` (with `D = diag(π)`) is symmetric when `P`
//!   satisfies detailed balance. Its eigenvectors `u` give right
//!   eigenvectors `D^{-1/2} u` and left eigenvectors `D^{1/2} u` of `P`, and
//!   every eigenvalue is real.
//! - **General.** Eigenvalues come from a real Schur decomposition and may
//!   be complex. Eigenvectors are refined by shifted inverse iteration;
//!   a repeated eigenvalue gets an orthonormal basis of its eigenspace.

use msmkit_markov::{TransitionMatrix, detailed_balance_residual};
use nalgebra::{DMatrix, DVector, Schur, SymmetricEigen};
use ndarray::{Array2, ArrayView2};
use num_complex::Complex64;
use tracing::{debug, warn};

use crate::error::SpectralError;

/// Convergence threshold passed to the nalgebra eigensolvers.
const SOLVER_EPS: f64 = f64::EPSILON;

/// Iteration cap of the nalgebra eigensolvers.
const SOLVER_MAX_ITER: usize = 10_000;

/// Relative offset of the inverse-iteration shift from the eigenvalue.
const SHIFT: f64 = 1e-10;

const INVERSE_MAX_ITER: usize = 50;
const INVERSE_TOL: f64 = 1e-12;

/// Relative distance below which two eigenvalues share an eigenspace.
const CLUSTER_TOL: f64 = 1e-8;

/// Detailed balance violation above which the symmetric path warns.
const REVERSIBILITY_WARN: f64 = 1e-8;

/// Leading eigenvalues and eigenvectors of a transition matrix.
///
/// Eigenvalues are sorted by modulus, descending; for equal modulus the one
/// with the larger real part comes first, then the one with the larger
/// imaginary part. Column `i` of [`right_eigenvectors`](Self::right_eigenvectors)
/// and [`left_eigenvectors`](Self::left_eigenvectors) belongs to eigenvalue `i`.
#[derive(Debug, Clone)]
pub struct SpectralDecomposition {
    eigenvalues: Vec<Complex64>,
    right: Array2<Complex64>,
    left: Array2<Complex64>,
    reversible: bool,
}

impl SpectralDecomposition {
    /// The `k` leading eigenvalues.
    pub fn eigenvalues(&self) -> &[Complex64] {
        &self.eigenvalues
    }

    /// Real parts of the eigenvalues, if every imaginary part is negligible.
    pub fn real_eigenvalues(&self) -> Option<Vec<f64>> {
        self.eigenvalues
            .iter()
            .all(|l| l.im.abs() <= crate::timescales::REAL_TOL)
            .then(|| self.eigenvalues.iter().map(|l| l.re).collect())
    }

    /// Right eigenvectors as columns, shape `(n, k)`.
    pub fn right_eigenvectors(&self) -> ArrayView2<'_, Complex64> {
        self.right.view()
    }

    /// Left eigenvectors as columns, shape `(n, k)`.
    pub fn left_eigenvectors(&self) -> ArrayView2<'_, Complex64> {
        self.left.view()
    }

    /// Number of eigenvalues kept.
    pub fn k(&self) -> usize {
        self.eigenvalues.len()
    }

    /// Returns true if the decomposition used the symmetric path.
    pub fn is_reversible(&self) -> bool {
        self.reversible
    }
}

/// Computes the `k` largest-magnitude eigenvalues of `tm` with their right
/// and left eigenvectors.
///
/// With `stationary` given, the symmetric path is used: right eigenvectors
/// `r` and left eigenvectors `l` then satisfy `⟨l_i, r_j⟩ = δ_ij`, with
/// `l_0 = π` and `r_0 = 1` for a connected chain. Without it, right vectors
/// have unit norm, the component of largest modulus is made real positive,
/// and left vectors are scaled so that `⟨l_i, r_j⟩ = δ_ij`. A repeated
/// eigenvalue gets independent vectors spanning its eigenspace.
///
/// # Errors
///
/// - [`SpectralError::InvalidK`] if `k` is zero or exceeds the number of
///   states.
/// - [`SpectralError::LengthMismatch`] if `stationary` has the wrong length.
/// - [`SpectralError::NonPositiveStationary`] if an entry of `stationary` is
///   not strictly positive.
/// - [`SpectralError::EigenSolverFailed`] if an eigensolver does not
///   converge.
#[tracing::instrument(skip(tm, stationary), fields(n_states = tm.n_states(), reversible = stationary.is_some()))]
pub fn decompose(
    tm: &TransitionMatrix,
    k: usize,
    stationary: Option<&[f64]>,
) -> Result<SpectralDecomposition, SpectralError> {
    let n = tm.n_states();
    if k == 0 || k > n {
        return Err(SpectralError::InvalidK { k, n_states: n });
    }
    match stationary {
        Some(pi) => {
            check_stationary(pi, n)?;
            decompose_reversible(tm, k, pi)
        }
        None => decompose_general(tm, k),
    }
}

fn check_stationary(pi: &[f64], n: usize) -> Result<(), SpectralError> {
    if pi.len() != n {
        return Err(SpectralError::LengthMismatch {
            expected: n,
            got: pi.len(),
        });
    }
    match pi.iter().position(|&v| !(v > 0.0 && v.is_finite())) {
        Some(index) => Err(SpectralError::NonPositiveStationary {
            index,
            value: pi[index],
        }),
        None => Ok(()),
    }
}

fn decompose_reversible(
    tm: &TransitionMatrix,
    k: usize,
    pi: &[f64],
) -> Result<SpectralDecomposition, SpectralError> {
    let residual = detailed_balance_residual(tm, pi);
    if residual > REVERSIBILITY_WARN {
        warn!(residual, "matrix is not reversible with respect to π; using its symmetric part");
    }

    let n = tm.n_states();
    let p = tm.as_array();
    let sqrt_pi: Vec<f64> = pi.iter().map(|v| v.sqrt()).collect();
    let s = DMatrix::<f64>::from_fn(n, n, |i, j| {
        0.5 * (sqrt_pi[i] * p[[i, j]] / sqrt_pi[j] + sqrt_pi[j] * p[[j, i]] / sqrt_pi[i])
    });

    let eigen = SymmetricEigen::try_new(s, SOLVER_EPS, SOLVER_MAX_ITER).ok_or_else(|| {
        SpectralError::EigenSolverFailed {
            reason: "symmetric eigensolver did not converge".to_string(),
        }
    })?;

    let values: Vec<Complex64> = eigen
        .eigenvalues
        .iter()
        .map(|&v| Complex64::new(v, 0.0))
        .collect();
    let order = sorted_order(&values);

    let mut right = Array2::<Complex64>::zeros((n, k));
    let mut left = Array2::<Complex64>::zeros((n, k));
    for (col, &idx) in order.iter().take(k).enumerate() {
        let u = eigen.eigenvectors.column(idx);
        let sign = largest_component_sign(u.iter().copied());
        for i in 0..n {
            let ui = sign * u[i];
            right[[i, col]] = Complex64::new(ui / sqrt_pi[i], 0.0);
            left[[i, col]] = Complex64::new(ui * sqrt_pi[i], 0.0);
        }
    }

    let eigenvalues: Vec<Complex64> = order.iter().take(k).map(|&i| values[i]).collect();
    debug!(k, leading = eigenvalues[0].re, "symmetric decomposition done");
    Ok(SpectralDecomposition {
        eigenvalues,
        right,
        left,
        reversible: true,
    })
}

fn decompose_general(tm: &TransitionMatrix, k: usize) -> Result<SpectralDecomposition, SpectralError> {
    let n = tm.n_states();
    let p = tm.as_array();
    let real = DMatrix::<f64>::from_fn(n, n, |i, j| p[[i, j]]);

    let schur = Schur::try_new(real.clone(), SOLVER_EPS, SOLVER_MAX_ITER).ok_or_else(|| {
        SpectralError::EigenSolverFailed {
            reason: "Schur decomposition did not converge".to_string(),
        }
    })?;
    let values: Vec<Complex64> = schur.complex_eigenvalues().iter().copied().collect();
    let order = sorted_order(&values);

    let a = real.map(|v| Complex64::new(v, 0.0));
    let at = a.transpose();

    let eigenvalues: Vec<Complex64> = order.iter().take(k).map(|&i| values[i]).collect();
    let mut rights: Vec<DVector<Complex64>> = Vec::with_capacity(k);
    let mut lefts: Vec<DVector<Complex64>> = Vec::with_capacity(k);
    let mut clusters: Vec<Vec<usize>> = Vec::new();
    for (col, &lambda) in eigenvalues.iter().enumerate() {
        let cluster = match clusters
            .iter()
            .position(|members| same_eigenvalue(eigenvalues[members[0]], lambda))
        {
            Some(c) => c,
            None => {
                clusters.push(Vec::new());
                clusters.len() - 1
            }
        };
        let members = &clusters[cluster];
        let found_right: Vec<&DVector<Complex64>> = members.iter().map(|&m| &rights[m]).collect();
        let found_left: Vec<&DVector<Complex64>> = members.iter().map(|&m| &lefts[m]).collect();
        let r = inverse_iteration(&a, lambda, &found_right)?;
        let l = inverse_iteration(&at, lambda, &found_left)?;
        rights.push(r);
        lefts.push(l);
        clusters[cluster].push(col);
    }
    for members in &clusters {
        scale_left(members, &rights, &mut lefts);
    }

    let mut right = Array2::<Complex64>::zeros((n, k));
    let mut left = Array2::<Complex64>::zeros((n, k));
    for col in 0..k {
        for i in 0..n {
            right[[i, col]] = rights[col][i];
            left[[i, col]] = lefts[col][i];
        }
    }

    debug!(k, "general decomposition done");
    Ok(SpectralDecomposition {
        eigenvalues,
        right,
        left,
        reversible: false,
    })
}

/// Indices of `values` sorted by modulus descending, then real part, then
/// imaginary part.
fn sorted_order(values: &[Complex64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| {
        let (x, y) = (values[a], values[b]);
        y.norm()
            .total_cmp(&x.norm())
            .then_with(|| y.re.total_cmp(&x.re))
            .then_with(|| y.im.total_cmp(&x.im))
    });
    order
}

fn largest_component_sign(values: impl Iterator<Item = f64>) -> f64 {
    let largest = values.fold(0.0_f64, |best, v| if v.abs() > best.abs() { v } else { best });
    if largest < 0.0 { -1.0 } else { 1.0 }
}

fn same_eigenvalue(a: Complex64, b: Complex64) -> bool {
    (a - b).norm() <= CLUSTER_TOL * a.norm().max(1.0)
}

/// Rescales the left vectors of one eigenvalue cluster so that
/// `⟨l_a, r_b⟩ = δ_ab` within it.
fn scale_left(members: &[usize], rights: &[DVector<Complex64>], lefts: &mut [DVector<Complex64>]) {
    let m = members.len();
    let overlap =
        DMatrix::<Complex64>::from_fn(m, m, |a, b| lefts[members[a]].dot(&rights[members[b]]));
    if overlap.determinant().norm() <= f64::EPSILON {
        debug!(cluster = ?members, "left and right eigenvectors are orthogonal, leaving left unscaled");
        return;
    }
    let Some(inverse) = overlap.try_inverse() else {
        debug!(cluster = ?members, "singular overlap, leaving left unscaled");
        return;
    };

    // L' = L M^{-T}
    let one = Complex64::new(1.0, 0.0);
    let scaled: Vec<DVector<Complex64>> = (0..m)
        .map(|a| {
            let mut l = DVector::<Complex64>::zeros(lefts[members[a]].len());
            for c in 0..m {
                l.axpy(inverse[(a, c)], &lefts[members[c]], one);
            }
            l
        })
        .collect();
    for (&col, l) in members.iter().zip(scaled) {
        lefts[col] = l;
    }
}

/// Removes the components of `v` along the orthonormal vectors `basis`.
fn orthogonalize(v: &mut DVector<Complex64>, basis: &[&DVector<Complex64>]) {
    let one = Complex64::new(1.0, 0.0);
    for u in basis {
        let projection = u.dotc(&*v);
        v.axpy(-projection, *u, one);
    }
}

/// Eigenvector of `a` for the eigenvalue nearest `lambda`, orthogonal to the
/// eigenvectors already `found` for the same eigenvalue.
fn inverse_iteration(
    a: &DMatrix<Complex64>,
    lambda: Complex64,
    found: &[&DVector<Complex64>],
) -> Result<DVector<Complex64>, SpectralError> {
    let n = a.nrows();
    let shift = lambda + SHIFT * lambda.norm().max(1.0);
    let mut shifted = a.clone();
    for i in 0..n {
        shifted[(i, i)] -= shift;
    }
    let lu = shifted.lu();

    // Fractional parts of multiples of the golden ratio: far from any
    // structured eigenvector. Each member of a cluster starts elsewhere.
    let offset = found.len() * n;
    let mut v = DVector::<Complex64>::from_fn(n, |i, _| {
        Complex64::new(((i + offset) as f64 * 0.618_033_988_749_895).fract() + 0.5, 0.0)
    });
    orthogonalize(&mut v, found);
    if !normalize(&mut v) {
        return Err(SpectralError::EigenSolverFailed {
            reason: format!("no start vector outside the found eigenspace at {lambda}"),
        });
    }

    for _ in 0..INVERSE_MAX_ITER {
        let mut next = lu
            .solve(&v)
            .ok_or_else(|| SpectralError::EigenSolverFailed {
                reason: format!("singular shifted system at eigenvalue {lambda}"),
            })?;
        orthogonalize(&mut next, found);
        if !normalize(&mut next) {
            return Err(SpectralError::EigenSolverFailed {
                reason: format!("inverse iteration broke down at eigenvalue {lambda}"),
            });
        }
        let change = (&next - &v).norm();
        v = next;
        if change < INVERSE_TOL {
            break;
        }
    }
    Ok(v)
}

/// Scales `v` to unit norm with its largest-modulus component real positive.
///
/// Returns false if `v` is zero or not finite.
fn normalize(v: &mut DVector<Complex64>) -> bool {
    let norm = v.norm();
    if !(norm > 0.0 && norm.is_finite()) {
        return false;
    }
    let pivot = v
        .iter()
        .copied()
        .fold(Complex64::new(0.0, 0.0), |best, z| if z.norm() > best.norm() { z } else { best });
    let phase = pivot.conj() / (pivot.norm() * norm);
    v.apply(|z| *z *= phase);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn tm(p: Array2<f64>) -> TransitionMatrix {
        TransitionMatrix::new(p).unwrap()
    }

    /// Checks `P r = λ r` and `lᵀ P = λ lᵀ` for every kept pair.
    fn assert_eigenpairs(tm: &TransitionMatrix, d: &SpectralDecomposition, eps: f64) {
        let p = tm.as_array();
        let n = tm.n_states();
        for (col, &lambda) in d.eigenvalues().iter().enumerate() {
            let r = d.right_eigenvectors().column(col).to_owned();
            let l = d.left_eigenvectors().column(col).to_owned();
            for i in 0..n {
                let pr: Complex64 = (0..n).map(|j| r[j] * p[[i, j]]).sum();
                let lp: Complex64 = (0..n).map(|j| l[j] * p[[j, i]]).sum();
                assert!((pr - lambda * r[i]).norm() < eps, "right pair {col} row {i}");
                assert!((lp - lambda * l[i]).norm() < eps, "left pair {col} row {i}");
            }
        }
    }

    #[test]
    fn two_state_reversible() {
        let p = tm(array![[0.9, 0.1], [0.3, 0.7]]);
        let d = decompose(&p, 2, Some(&[0.75, 0.25])).unwrap();
        assert!(d.is_reversible());
        assert_abs_diff_eq!(d.eigenvalues()[0].re, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(d.eigenvalues()[1].re, 0.6, epsilon = 1e-12);
        assert_eigenpairs(&p, &d, 1e-10);

        // l_0 = π and r_0 = 1.
        let l0 = d.left_eigenvectors().column(0).to_owned();
        let r0 = d.right_eigenvectors().column(0).to_owned();
        assert_abs_diff_eq!(l0[0].re, 0.75, epsilon = 1e-12);
        assert_abs_diff_eq!(l0[1].re, 0.25, epsilon = 1e-12);
        assert_abs_diff_eq!(r0[0].re, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(r0[1].re, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn reversible_vectors_are_biorthonormal() {
        let p = tm(array![[0.5, 0.5, 0.0], [0.25, 0.5, 0.25], [0.0, 0.5, 0.5]]);
        let d = decompose(&p, 3, Some(&[0.25, 0.5, 0.25])).unwrap();
        let r = d.right_eigenvectors();
        let l = d.left_eigenvectors();
        for a in 0..3 {
            for b in 0..3 {
                let dot: Complex64 = (0..3).map(|i| l[[i, a]] * r[[i, b]]).sum();
                let expected = if a == b { 1.0 } else { 0.0 };
                assert_abs_diff_eq!(dot.re, expected, epsilon = 1e-10);
            }
        }
        // Eigenvalues of this birth-death chain are 1, 0.5 and 0.
        let values = d.real_eigenvalues().unwrap();
        assert_abs_diff_eq!(values[0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(values[1], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(values[2], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn general_matches_reversible_eigenvalues() {
        let p = tm(array![[0.9, 0.1], [0.3, 0.7]]);
        let general = decompose(&p, 2, None).unwrap();
        assert!(!general.is_reversible());
        assert_abs_diff_eq!(general.eigenvalues()[0].re, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(general.eigenvalues()[1].re, 0.6, epsilon = 1e-12);
        assert_eigenpairs(&p, &general, 1e-8);
    }

    #[test]
    fn cyclic_chain_has_complex_pair() {
        // Biased circulant 3-cycle: λ = 0.1 + 0.8ω + 0.1ω² for the cube
        // roots of unity ω.
        let p = tm(array![[0.1, 0.8, 0.1], [0.1, 0.1, 0.8], [0.8, 0.1, 0.1]]);
        let d = decompose(&p, 3, None).unwrap();
        assert!(d.real_eigenvalues().is_none());
        let im = 0.7 * 3f64.sqrt() / 2.0;
        assert_abs_diff_eq!(d.eigenvalues()[0].re, 1.0, epsilon = 1e-10);
        assert_abs_diff_eq!(d.eigenvalues()[1].re, -0.35, epsilon = 1e-10);
        assert_abs_diff_eq!(d.eigenvalues()[1].im, im, epsilon = 1e-10);
        assert_abs_diff_eq!(d.eigenvalues()[2].im, -im, epsilon = 1e-10);
        assert_eigenpairs(&p, &d, 1e-8);
    }

    #[test]
    fn repeated_eigenvalues_get_independent_vectors() {
        // Two identical uncoupled blocks: λ = 1 and λ = 0.7, each twice.
        let block = [[0.9, 0.1], [0.2, 0.8]];
        let p = tm(Array2::from_shape_fn((4, 4), |(i, j)| {
            if i / 2 == j / 2 { block[i % 2][j % 2] } else { 0.0 }
        }));
        let d = decompose(&p, 4, None).unwrap();
        let values = d.real_eigenvalues().unwrap();
        assert_abs_diff_eq!(values[0], 1.0, epsilon = 1e-10);
        assert_abs_diff_eq!(values[1], 1.0, epsilon = 1e-10);
        assert_abs_diff_eq!(values[2], 0.7, epsilon = 1e-10);
        assert_abs_diff_eq!(values[3], 0.7, epsilon = 1e-10);
        assert_eigenpairs(&p, &d, 1e-8);

        let r = d.right_eigenvectors();
        let l = d.left_eigenvectors();
        for (a, b) in [(0, 1), (2, 3)] {
            let overlap: Complex64 = (0..4).map(|i| r[[i, a]].conj() * r[[i, b]]).sum();
            assert!(overlap.norm() < 1e-8, "right vectors {a} and {b} coincide");
        }
        for a in 0..4 {
            for b in 0..4 {
                let dot: Complex64 = (0..4).map(|i| l[[i, a]] * r[[i, b]]).sum();
                let expected = if a == b { 1.0 } else { 0.0 };
                assert!(
                    (dot - expected).norm() < 1e-8,
                    "<l_{a}, r_{b}> = {dot}, expected {expected}"
                );
            }
        }
    }

    #[test]
    fn truncates_to_k() {
        let p = tm(array![[0.5, 0.5, 0.0], [0.25, 0.5, 0.25], [0.0, 0.5, 0.5]]);
        let d = decompose(&p, 2, None).unwrap();
        assert_eq!(d.k(), 2);
        assert_eq!(d.right_eigenvectors().dim(), (3, 2));
    }

    #[test]
    fn invalid_k() {
        let p = tm(array![[1.0]]);
        assert!(matches!(
            decompose(&p, 0, None),
            Err(SpectralError::InvalidK { k: 0, n_states: 1 })
        ));
        assert!(matches!(
            decompose(&p, 2, None),
            Err(SpectralError::InvalidK { k: 2, n_states: 1 })
        ));
    }

    #[test]
    fn stationary_checks() {
        let p = tm(array![[0.9, 0.1], [0.3, 0.7]]);
        assert!(matches!(
            decompose(&p, 2, Some(&[1.0])),
            Err(SpectralError::LengthMismatch {
                expected: 2,
                got: 1
            })
        ));
        assert!(matches!(
            decompose(&p, 2, Some(&[1.0, 0.0])),
            Err(SpectralError::NonPositiveStationary { index: 1, .. })
        ));
    }

    #[test]
    fn sorted_order_by_modulus() {
        let values = [
            Complex64::new(0.2, 0.0),
            Complex64::new(-0.9, 0.0),
            Complex64::new(1.0, 0.0),
            Complex64::new(0.0, -0.5),
            Complex64::new(0.0, 0.5),
        ];
        assert_eq!(sorted_order(&values), vec![2, 1, 4, 3, 0]);
    }
}
