//! Dissipative part of the Liouvillian.
//!
//! Spontaneous decay from state `e` to state `g` at rate `Γ` is modeled by
//! the jump operator `σ = |g⟩⟨e|` and the dissipator
//! ```text
//! D[σ](ρ) = Γ (σ ρ σ† - ½ {σ†σ, ρ})
//! ```
//! Since `σ ρ σ† = ρ[e, e] |g⟩⟨g|` and `σ†σ = |e⟩⟨e|`, the superoperator can
//! be written down entry by entry in the flattened representation without
//! any matrix products.

use itertools::Itertools;
use ndarray as nd;
use num_complex::Complex64 as C64;
use tracing::{ debug, warn };
use crate::error::{ DensityError, DensityResult };
use super::flatten_index;

// accumulate the single-channel superoperator into `L`
fn add_pair(L: &mut nd::Array2<C64>, n: usize, g: usize, e: usize, rate: f64) {
    let half = C64::from(rate / 2.0);
    for (j, i) in (0..n).cartesian_product(0..n) {
        let row = flatten_index(i, j, n);
        if i == g && j == g {
            L[[row, flatten_index(e, e, n)]] += rate;
        }
        if i == e {
            L[[row, flatten_index(e, j, n)]] -= half;
        }
        if j == e {
            L[[row, flatten_index(i, e, n)]] -= half;
        }
    }
}

/// Build the `n² × n²` superoperator for decay from state `e` to state `g` at
/// `rate`.
pub fn lindblad_pair(n: usize, g: usize, e: usize, rate: f64)
    -> DensityResult<nd::Array2<C64>>
{
    if g >= n || e >= n {
        return Err(DensityError::InvalidArgument(format!(
            "decay channel {} -> {} out of range for {} states", e, g, n)));
    }
    let mut L: nd::Array2<C64> = nd::Array2::zeros((n * n, n * n));
    add_pair(&mut L, n, g, e, rate);
    Ok(L)
}

/// Sum the single-channel superoperators for every decay channel in `Y`.
///
/// `Y[[g, e]]` is the rate of decay from state `e` to state `g`. Only the
/// strict upper triangle (`g < e`) is read: diagonal entries describe no
/// transition and are skipped, and nonzero entries below the diagonal are
/// ignored with a warning.
pub fn total_lindblad<S>(Y: &nd::ArrayBase<S, nd::Ix2>)
    -> DensityResult<nd::Array2<C64>>
where S: nd::Data<Elem = f64>
{
    if !Y.is_square() {
        return Err(DensityError::dim("decay matrix", "square", Y.shape()));
    }
    let n = Y.nrows();
    let ignored
        = Y.indexed_iter()
        .filter(|((g, e), y)| g > e && **y != 0.0)
        .count();
    if ignored > 0 {
        warn!(
            ignored,
            "decay matrix has nonzero entries below the diagonal; only \
            entries [g, e] with g < e are used"
        );
    }
    let mut L: nd::Array2<C64> = nd::Array2::zeros((n * n, n * n));
    let mut channels: usize = 0;
    for g in 0..n {
        for e in g + 1..n {
            let y = Y[[g, e]];
            if y == 0.0 { continue; }
            add_pair(&mut L, n, g, e, y);
            channels += 1;
        }
    }
    debug!(n, channels, "built total dissipator");
    Ok(L)
}
