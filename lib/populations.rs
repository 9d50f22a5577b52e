//! Readback of populations from integration results.

use ndarray as nd;
use num_complex::Complex64 as C64;
use tracing::warn;
use crate::{
    config::SolverConfig,
    error::{ DensityError, DensityResult },
    liouville::{ flatten_index, population_indices, unvectorize, vectorize },
};

/// Extract the populations (main-diagonal density matrix elements) from a
/// series of flattened density matrices, one per column.
///
/// Returns an `n × T` real array. The imaginary parts of physically valid
/// populations vanish; if any exceeds `imag_tol` in magnitude, this either
/// logs a warning or, when `strict` is set, fails.
pub fn populations_from_vec<S>(
    v: &nd::ArrayBase<S, nd::Ix2>,
    n: usize,
    imag_tol: f64,
    strict: bool,
) -> DensityResult<nd::Array2<f64>>
where S: nd::Data<Elem = C64>
{
    if v.nrows() != n * n {
        return Err(DensityError::dim("flattened trajectory", n * n, v.nrows()));
    }
    let diag: Vec<usize> = population_indices(n).collect();
    let pops: nd::Array2<C64> = v.select(nd::Axis(0), &diag);
    let max_imag
        = pops.iter()
        .map(|p| p.im.abs())
        .fold(0.0, f64::max);
    if max_imag > imag_tol {
        if strict {
            return Err(DensityError::Numerical(format!(
                "population has imaginary part {:e} (tolerance {:e})",
                max_imag, imag_tol,
            )));
        }
        warn!(max_imag, imag_tol, "discarding imaginary population residue");
    }
    Ok(pops.mapv(|p| p.re))
}

/// Select rows (states) of a population array by index.
///
/// Order is preserved and repeats are allowed. Fails if any index is out of
/// range.
pub fn select_states(pops: &nd::Array2<f64>, states: &[usize])
    -> DensityResult<nd::Array2<f64>>
{
    if let Some(bad) = states.iter().find(|s| **s >= pops.nrows()) {
        return Err(DensityError::InvalidArgument(format!(
            "state index {} out of range for {} states", bad, pops.nrows())));
    }
    Ok(pops.select(nd::Axis(0), states))
}

/// Time series of flattened density matrices produced by
/// [`StateSpace::integrate`][crate::state::StateSpace::integrate].
#[derive(Clone, Debug)]
pub struct Trajectory {
    n: usize,
    time: nd::Array1<f64>,
    rho: nd::Array2<C64>,
    imag_tol: f64,
    strict: bool,
}

impl Trajectory {
    pub(crate) fn new(
        n: usize,
        time: nd::Array1<f64>,
        rho: nd::Array2<C64>,
        config: &SolverConfig,
    ) -> Self
    {
        Self {
            n,
            time,
            rho,
            imag_tol: config.imag_tol,
            strict: config.strict_populations,
        }
    }

    /// Number of states.
    pub fn num_states(&self) -> usize { self.n }

    /// Number of time points.
    pub fn len(&self) -> usize { self.time.len() }

    /// `true` if there are no time points.
    pub fn is_empty(&self) -> bool { self.time.is_empty() }

    /// Time coordinates.
    pub fn time(&self) -> &nd::Array1<f64> { &self.time }

    /// The raw `n² × T` array; column `k` is the flattened density matrix at
    /// `time()[k]`.
    pub fn flattened(&self) -> &nd::Array2<C64> { &self.rho }

    /// Reshape the `k`-th time point into an `n × n` density matrix.
    pub fn density_at(&self, k: usize) -> DensityResult<nd::Array2<C64>> {
        if k >= self.len() {
            return Err(DensityError::InvalidArgument(format!(
                "time index {} out of range for {} points", k, self.len())));
        }
        unvectorize(&self.rho.column(k), self.n)
    }

    /// Trace of the density matrix at every time point.
    pub fn trace(&self) -> nd::Array1<C64> {
        self.rho.axis_iter(nd::Axis(1))
            .map(|v| population_indices(self.n).map(|k| v[k]).sum::<C64>())
            .collect()
    }

    /// A single density matrix element over time.
    pub fn element(&self, row: usize, col: usize) -> DensityResult<nd::Array1<C64>> {
        if row >= self.n || col >= self.n {
            return Err(DensityError::InvalidArgument(format!(
                "element ({}, {}) out of range for {} states", row, col, self.n)));
        }
        Ok(self.rho.row(flatten_index(row, col, self.n)).to_owned())
    }

    /// All populations, as an `n × T` array.
    pub fn populations(&self) -> DensityResult<nd::Array2<f64>> {
        populations_from_vec(&self.rho, self.n, self.imag_tol, self.strict)
    }

    /// Populations of the listed states, in the listed order.
    pub fn select_populations(&self, states: &[usize])
        -> DensityResult<nd::Array2<f64>>
    {
        select_states(&self.populations()?, states)
    }

    /// [`Self::populations`] if `selector` is `None`, otherwise
    /// [`Self::select_populations`].
    pub fn get_populations(&self, selector: Option<&[usize]>)
        -> DensityResult<nd::Array2<f64>>
    {
        match selector {
            Some(states) => self.select_populations(states),
            None => self.populations(),
        }
    }
}

/// Result of
/// [`StateSpace::solve_steady_state`][crate::state::StateSpace::solve_steady_state].
#[derive(Clone, Debug)]
pub struct SteadyState {
    rho: nd::Array2<C64>,
    imag_tol: f64,
    strict: bool,
}

impl SteadyState {
    pub(crate) fn new(rho: nd::Array2<C64>, config: &SolverConfig) -> Self {
        Self {
            rho,
            imag_tol: config.imag_tol,
            strict: config.strict_populations,
        }
    }

    /// The `n × n` density matrix.
    pub fn density(&self) -> &nd::Array2<C64> { &self.rho }

    /// Trace of the density matrix.
    pub fn trace(&self) -> C64 { self.rho.diag().sum() }

    /// Populations of every state.
    pub fn populations(&self) -> DensityResult<nd::Array1<f64>> {
        let n = self.rho.nrows();
        let v = vectorize(&self.rho)?.insert_axis(nd::Axis(1));
        let pops = populations_from_vec(&v, n, self.imag_tol, self.strict)?;
        Ok(pops.column(0).to_owned())
    }

    /// Populations of the listed states, in the listed order.
    pub fn select_populations(&self, states: &[usize])
        -> DensityResult<nd::Array1<f64>>
    {
        let pops = self.populations()?.insert_axis(nd::Axis(1));
        Ok(select_states(&pops, states)?.column(0).to_owned())
    }
}
