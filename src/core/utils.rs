//! Utility functions for single-qubit operators.
//!
//! This module contains helper functions for:
//! - Matrix operations (trace, adjoint, outer product, sandwich products).
//! - Completeness checks for measurements and channels.

use ndarray::{Array1, Array2};
use num_complex::Complex64;

/// Computes the trace of a matrix (sum of diagonal elements).
pub fn trace(matrix: &Array2<Complex64>) -> Complex64 {
    matrix.diag().sum()
}

/// Conjugate transpose $M^\dagger$.
pub fn dagger(matrix: &Array2<Complex64>) -> Array2<Complex64> {
    matrix.t().mapv(|c| c.conj())
}

/// Computes $K \rho K^\dagger$.
pub fn sandwich(op: &Array2<Complex64>, rho: &Array2<Complex64>) -> Array2<Complex64> {
    op.dot(rho).dot(&dagger(op))
}

/// Computes the outer product of two vectors $|a\rangle\langle b|$.
pub fn outer_product(a: &Array1<Complex64>, b: &Array1<Complex64>) -> Array2<Complex64> {
    let n = a.len();
    let m = b.len();
    let mut res = Array2::zeros((n, m));

    for i in 0..n {
        for j in 0..m {
            res[[i, j]] = a[i] * b[j].conj();
        }
    }
    res
}

/// Checks completeness relation for measurement or Kraus operators.
///
/// Verifies if $\sum M_k^\dagger M_k = I$.
pub fn check_completeness(ops: &[Array2<Complex64>], dim: usize) -> bool {
    let eye = Array2::<Complex64>::eye(dim);
    let sum = ops
        .iter()
        .fold(Array2::<Complex64>::zeros((dim, dim)), |acc, op| {
            acc + dagger(op).dot(op)
        });
    sum.iter()
        .zip(eye.iter())
        .all(|(a, b)| (a - b).norm() < 1e-9)
}

/// True when every entry of `a` is within `tol` of the matching entry of `b`.
pub fn approx_eq(a: &Array2<Complex64>, b: &Array2<Complex64>, tol: f64) -> bool {
    a.dim() == b.dim() && a.iter().zip(b.iter()).all(|(x, y)| (x - y).norm() < tol)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn c(re: f64) -> Complex64 {
        Complex64::new(re, 0.0)
    }

    #[test]
    fn trace_sums_diagonal() {
        let m = array![[c(0.25), c(3.0)], [c(-1.0), c(0.75)]];
        assert!((trace(&m) - c(1.0)).norm() < 1e-12);
    }

    #[test]
    fn dagger_conjugates_and_transposes() {
        let m = array![
            [c(1.0), Complex64::new(0.0, 2.0)],
            [c(3.0), c(4.0)]
        ];
        let d = dagger(&m);
        assert_eq!(d[[1, 0]], Complex64::new(0.0, -2.0));
        assert_eq!(d[[0, 1]], c(3.0));
    }

    #[test]
    fn projectors_are_complete() {
        let zero = array![c(1.0), c(0.0)];
        let one = array![c(0.0), c(1.0)];
        let ops = vec![outer_product(&zero, &zero), outer_product(&one, &one)];
        assert!(check_completeness(&ops, 2));
        assert!(!check_completeness(&ops[..1], 2));
    }
}
