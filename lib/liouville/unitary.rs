//! Coherent (Hamiltonian) part of the Liouvillian.

use itertools::Itertools;
use ndarray as nd;
use num_complex::Complex64 as C64;
use crate::error::{ DensityError, DensityResult };
use super::flatten_index;

/// Build the `n² × n²` superoperator of `ρ ↦ -i[H, ρ]`.
///
/// Written element-wise,
/// ```text
/// d/dt ρ[i, j] = -i Σ_k (H[i, k] ρ[k, j] - ρ[i, k] H[k, j])
/// ```
/// so each output element `(i, j)` picks up two entries per intermediate
/// index `k`. Different `(i, j, k)` triples can land on the same cell (e.g.
/// the diagonal of `H` on `(i, i)`), so contributions are accumulated.
///
/// Fails if `H` is not square.
pub fn unitary<S>(H: &nd::ArrayBase<S, nd::Ix2>) -> DensityResult<nd::Array2<C64>>
where S: nd::Data<Elem = C64>
{
    if !H.is_square() {
        return Err(DensityError::dim("Hamiltonian", "square", H.shape()));
    }
    let n = H.nrows();
    let mut M: nd::Array2<C64> = nd::Array2::zeros((n * n, n * n));
    let iter = (0..n).cartesian_product(0..n).cartesian_product(0..n);
    for ((j, i), k) in iter {
        let row = flatten_index(i, j, n);
        M[[row, flatten_index(k, j, n)]] -= C64::i() * H[[i, k]];
        M[[row, flatten_index(i, k, n)]] += C64::i() * H[[k, j]];
    }
    Ok(M)
}
