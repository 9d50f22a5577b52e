//! Superoperator form of the Lindblad master equation.
//!
//! A density matrix `ρ` on `n` states is flattened column-major into a vector
//! of length `n²`: the element in row `i`, column `j` sits at index
//! `i + j n`. In this representation the master equation becomes the linear
//! ODE
//! ```text
//! d/dt vec(ρ) = M vec(ρ)
//! ```
//! whose generator `M` (the Liouvillian) is the sum of a [unitary] part built
//! from the Hamiltonian and a [dissipative][lindblad] part built from a matrix
//! of decay rates.

use ndarray as nd;
use num_complex::Complex64 as C64;
use crate::error::{ DensityError, DensityResult };

pub mod unitary;
pub use unitary::unitary;

pub mod lindblad;
pub use lindblad::{ lindblad_pair, total_lindblad };

/// Flattened index of the density matrix element at `(row, col)`.
#[inline]
pub fn flatten_index(row: usize, col: usize, n: usize) -> usize {
    row + col * n
}

/// Inverse of [`flatten_index`].
#[inline]
pub fn unflatten_index(k: usize, n: usize) -> (usize, usize) {
    (k % n, k / n)
}

/// Flattened indices of the main-diagonal (population) elements, in order.
pub fn population_indices(n: usize) -> impl Iterator<Item = usize> {
    (0..n).map(move |i| flatten_index(i, i, n))
}

/// Flatten a square matrix into a vector following [`flatten_index`].
pub fn vectorize<S>(rho: &nd::ArrayBase<S, nd::Ix2>) -> DensityResult<nd::Array1<C64>>
where S: nd::Data<Elem = C64>
{
    if !rho.is_square() {
        return Err(DensityError::dim("density matrix", "square", rho.shape()));
    }
    let n = rho.nrows();
    Ok(
        (0..n * n)
            .map(|k| {
                let (i, j) = unflatten_index(k, n);
                rho[[i, j]]
            })
            .collect()
    )
}

/// Reshape a flattened vector back into an `n × n` matrix; the inverse of
/// [`vectorize`].
pub fn unvectorize<S>(v: &nd::ArrayBase<S, nd::Ix1>, n: usize)
    -> DensityResult<nd::Array2<C64>>
where S: nd::Data<Elem = C64>
{
    if v.len() != n * n {
        return Err(DensityError::dim("flattened density", n * n, v.len()));
    }
    Ok(nd::Array2::from_shape_fn((n, n), |(i, j)| v[flatten_index(i, j, n)]))
}

/// Compute the commutator `[A, B] = A B - B A`.
pub fn commutator<SA, SB>(
    A: &nd::ArrayBase<SA, nd::Ix2>,
    B: &nd::ArrayBase<SB, nd::Ix2>,
) -> nd::Array2<C64>
where
    SA: nd::Data<Elem = C64>,
    SB: nd::Data<Elem = C64>,
{
    A.dot(B) - B.dot(A)
}

/// Compute the anti-commutator `{A, B} = A B + B A`.
pub fn anti_commutator<SA, SB>(
    A: &nd::ArrayBase<SA, nd::Ix2>,
    B: &nd::ArrayBase<SB, nd::Ix2>,
) -> nd::Array2<C64>
where
    SA: nd::Data<Elem = C64>,
    SB: nd::Data<Elem = C64>,
{
    A.dot(B) + B.dot(A)
}

/// Evaluate the right-hand side of the master equation directly on a density
/// matrix, without building any superoperator.
///
/// `Y[[g, e]]` is the decay rate from state `e` to state `g`; as in
/// [`total_lindblad`], only entries with `g < e` contribute.
pub fn master_rhs(
    H: &nd::Array2<C64>,
    Y: &nd::Array2<f64>,
    rho: &nd::Array2<C64>,
) -> nd::Array2<C64>
{
    let n = rho.nrows();
    let mut drho = -C64::i() * commutator(H, rho);
    for g in 0..n {
        for e in g + 1..n {
            let y = Y[[g, e]];
            if y == 0.0 { continue; }
            let mut sigma: nd::Array2<C64> = nd::Array2::zeros((n, n));
            sigma[[g, e]] = C64::from(1.0);
            let sigma_dag = sigma.t().mapv(|s| s.conj());
            let jump = sigma.dot(rho).dot(&sigma_dag);
            let decay = anti_commutator(&sigma_dag.dot(&sigma), rho);
            drho = drho + (jump - decay * 0.5) * y;
        }
    }
    drho
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_bijection() {
        for n in 1..6 {
            let mut seen = vec![false; n * n];
            for j in 0..n {
                for i in 0..n {
                    let k = flatten_index(i, j, n);
                    assert!(k < n * n);
                    assert!(!seen[k]);
                    seen[k] = true;
                    assert_eq!(unflatten_index(k, n), (i, j));
                }
            }
            assert!(seen.into_iter().all(|s| s));
        }
    }

    #[test]
    fn column_major_layout() {
        assert_eq!(flatten_index(0, 0, 3), 0);
        assert_eq!(flatten_index(1, 0, 3), 1);
        assert_eq!(flatten_index(0, 1, 3), 3);
        assert_eq!(flatten_index(2, 2, 3), 8);
        let diag: Vec<usize> = population_indices(3).collect();
        assert_eq!(diag, vec![0, 4, 8]);
    }

    #[test]
    fn vectorize_roundtrip() {
        let rho = nd::Array2::from_shape_fn(
            (3, 3), |(i, j)| C64::new(i as f64, 10.0 * j as f64));
        let v = vectorize(&rho).unwrap();
        assert_eq!(v[1], C64::new(1.0, 0.0));
        assert_eq!(v[3], C64::new(0.0, 10.0));
        assert_eq!(unvectorize(&v, 3).unwrap(), rho);
    }

    #[test]
    fn unvectorize_wrong_length() {
        let v: nd::Array1<C64> = nd::Array1::zeros(5);
        assert!(matches!(
            unvectorize(&v, 2),
            Err(DensityError::InvalidDimension { .. })
        ));
    }

    #[test]
    fn vectorize_non_square() {
        let rho: nd::Array2<C64> = nd::Array2::zeros((2, 3));
        assert!(vectorize(&rho).is_err());
    }
}
