//! Time integration and steady-state solution of `d/dt v = M v` for a
//! constant Liouvillian `M`.
//!
//! The second axis of every trajectory array corresponds to time.

use std::{ fmt, str::FromStr };
use ndarray::{ self as nd, s };
use ndarray_linalg::{ FactorizeInto, LeastSquaresResult, LeastSquaresSvd, Solve };
use num_complex::Complex64 as C64;
use serde::Deserialize;
use tracing::debug;
use crate::{
    error::{ DensityError, DensityResult },
    liouville::population_indices,
};

pub mod expm;
pub use expm::matrix_exp;

/// Integration scheme.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
pub enum Method {
    /// Exact one-step propagator `exp(M dt)`, applied repeatedly.
    #[default]
    #[serde(rename = "exp", alias = "normal", alias = "exponential")]
    Exponential,
    /// Implicit midpoint (Crank-Nicolson) update
    /// `v' = (I - M dt/2)⁻¹ (I + M dt/2) v`.
    #[serde(rename = "fast", alias = "implicit-midpoint", alias = "crank-nicolson")]
    ImplicitMidpoint,
}

impl FromStr for Method {
    type Err = DensityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exp" | "normal" | "exponential" => Ok(Self::Exponential),
            "fast" | "implicit-midpoint" | "crank-nicolson"
                => Ok(Self::ImplicitMidpoint),
            other => Err(DensityError::InvalidArgument(format!(
                "unrecognized integration method '{}'", other))),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exponential => write!(f, "exp"),
            Self::ImplicitMidpoint => write!(f, "fast"),
        }
    }
}

// upper bound on the number of steps in a time grid
const MAX_STEPS: usize = isize::MAX as usize;

/// Evenly spaced time coordinates `0, dt, 2 dt, ...` up to and including the
/// last point not exceeding the total duration.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TimeGrid {
    dt: f64,
    duration: f64,
    len: usize,
}

impl TimeGrid {
    /// Create a new grid.
    ///
    /// Fails if `dt` is not strictly positive and finite, or if `duration` is
    /// negative or not finite.
    pub fn new(dt: f64, duration: f64) -> DensityResult<Self> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(DensityError::InvalidArgument(format!(
                "time step must be positive and finite, got {}", dt)));
        }
        if !(duration.is_finite() && duration >= 0.0) {
            return Err(DensityError::InvalidArgument(format!(
                "duration must be non-negative and finite, got {}", duration)));
        }
        // relative slack so that e.g. duration = 10 * dt keeps its end point
        let steps = (duration / dt * (1.0 + 1e-9)).floor();
        if steps >= MAX_STEPS as f64 {
            return Err(DensityError::InvalidArgument(format!(
                "time grid with {:e} steps (duration {}, dt {}) is too large",
                steps, duration, dt,
            )));
        }
        Ok(Self { dt, duration, len: steps as usize + 1 })
    }

    /// Time step.
    pub fn dt(&self) -> f64 { self.dt }

    /// Requested total duration.
    pub fn duration(&self) -> f64 { self.duration }

    /// Number of time points, including `t = 0`.
    pub fn len(&self) -> usize { self.len }

    /// Always `false`; a grid contains at least `t = 0`.
    pub fn is_empty(&self) -> bool { self.len == 0 }

    /// Generate the time coordinates.
    pub fn times(&self) -> nd::Array1<f64> {
        (0..self.len).map(|k| k as f64 * self.dt).collect()
    }
}

// repeatedly apply a one-step map, storing every state as a column
fn do_propagate<F>(v0: &nd::Array1<C64>, len: usize, mut step: F)
    -> DensityResult<nd::Array2<C64>>
where F: FnMut(&nd::Array1<C64>) -> DensityResult<nd::Array1<C64>>
{
    let mut v: nd::Array2<C64> = nd::Array2::zeros((v0.len(), len));
    v.slice_mut(s![.., 0]).assign(v0);
    let mut v_old: nd::Array1<C64> = v0.clone();
    let mut v_new: nd::Array1<C64>;
    for k in 1..len {
        v_new = step(&v_old)?;
        v.slice_mut(s![.., k]).assign(&v_new);
        v_old = v_new;
    }
    Ok(v)
}

fn check_generator(M: &nd::Array2<C64>, v0: &nd::Array1<C64>, grid: &TimeGrid)
    -> DensityResult<()>
{
    if !M.is_square() || M.nrows() != v0.len() {
        return Err(DensityError::dim(
            "Liouvillian", (v0.len(), v0.len()), M.shape()));
    }
    // the whole trajectory is stored up front
    let max_elems = isize::MAX as usize / std::mem::size_of::<C64>();
    match v0.len().checked_mul(grid.len()) {
        Some(elems) if elems <= max_elems => Ok(()),
        _ => Err(DensityError::InvalidArgument(format!(
            "trajectory of {} points with {} entries each is too large to store",
            grid.len(), v0.len(),
        ))),
    }
}

/// Integrate with the exact one-step propagator `D = exp(M dt)`.
pub fn propagate_exponential(
    M: &nd::Array2<C64>,
    v0: &nd::Array1<C64>,
    grid: &TimeGrid,
) -> DensityResult<nd::Array2<C64>>
{
    check_generator(M, v0, grid)?;
    let D = matrix_exp(&M.mapv(|m| m * grid.dt()))?;
    do_propagate(v0, grid.len(), |v| Ok(D.dot(v)))
}

/// Integrate with the implicit midpoint rule
/// `(I - M dt/2) v' = (I + M dt/2) v`.
///
/// The left-hand matrix is factored once and reused for every step.
pub fn propagate_implicit_midpoint(
    M: &nd::Array2<C64>,
    v0: &nd::Array1<C64>,
    grid: &TimeGrid,
) -> DensityResult<nd::Array2<C64>>
{
    check_generator(M, v0, grid)?;
    let half_step = M.mapv(|m| m * (grid.dt() / 2.0));
    let eye: nd::Array2<C64> = nd::Array2::eye(v0.len());
    let explicit = &eye + &half_step;
    let implicit = (eye - half_step).factorize_into()?;
    do_propagate(v0, grid.len(), |v| Ok(implicit.solve_into(explicit.dot(v))?))
}

/// Integrate with the given scheme.
pub fn propagate(
    M: &nd::Array2<C64>,
    v0: &nd::Array1<C64>,
    grid: &TimeGrid,
    method: Method,
) -> DensityResult<nd::Array2<C64>>
{
    debug!(size = v0.len(), steps = grid.len(), dt = grid.dt(), %method, "propagating");
    match method {
        Method::Exponential => propagate_exponential(M, v0, grid),
        Method::ImplicitMidpoint => propagate_implicit_midpoint(M, v0, grid),
    }
}

/// Solve `M v = 0` subject to `tr(ρ) = 1` for an `n`-state Liouvillian.
///
/// `M` alone is singular (a valid Liouvillian always has a steady state), so
/// a row of ones over the population entries is appended along with a
/// right-hand side that is zero except for a one in the appended row, and the
/// resulting overdetermined system is solved in the least-squares sense.
/// Singular values below `rank_tol` times the largest one count as zero; if
/// the augmented system is still rank deficient the steady state is not
/// unique and this fails.
pub fn steady_state(M: &nd::Array2<C64>, n: usize, rank_tol: f64)
    -> DensityResult<nd::Array1<C64>>
{
    let n2 = n * n;
    if M.shape() != [n2, n2] {
        return Err(DensityError::dim("Liouvillian", (n2, n2), M.shape()));
    }
    let mut A: nd::Array2<C64> = nd::Array2::zeros((n2 + 1, n2));
    A.slice_mut(s![..n2, ..]).assign(M);
    for k in population_indices(n) {
        A[[n2, k]] = C64::from(1.0);
    }
    let mut b: nd::Array1<C64> = nd::Array1::zeros(n2 + 1);
    b[n2] = C64::from(1.0);
    let LeastSquaresResult { solution, singular_values, .. }
        = A.least_squares(&b)?;
    let s_max = singular_values.iter().copied().fold(0.0, f64::max);
    let rank
        = singular_values.iter()
        .filter(|sv| **sv > rank_tol * s_max)
        .count();
    debug!(n, rank, s_max, "steady-state solve");
    if rank < n2 {
        return Err(DensityError::Numerical(format!(
            "steady state is not unique: augmented Liouvillian has rank {} < {}",
            rank, n2,
        )));
    }
    if solution.iter().any(|z| !z.is_finite()) {
        return Err(DensityError::Numerical(
            "steady-state solution is not finite".into()));
    }
    Ok(solution)
}
