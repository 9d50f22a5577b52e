//! Solver tolerances and defaults.
//!
//! A [`SolverConfig`] can be built in code or parsed from a TOML document,
//! e.g.
//! ```toml
//! method = "fast"
//! imag_tol = 1e-8
//! rank_tol = 1e-12
//! strict_populations = true
//! ```
//! Keys that are left out take their default values.

use serde::Deserialize;
use crate::{ error::DensityResult, propagate::Method };

/// Numerical settings carried by a [`StateSpace`][crate::state::StateSpace].
#[derive(Copy, Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SolverConfig {
    /// Integration scheme used by
    /// [`StateSpace::integrate_default`][crate::state::StateSpace::integrate_default].
    pub method: Method,
    /// Largest imaginary part tolerated on an extracted population.
    pub imag_tol: f64,
    /// Singular values of the augmented steady-state system below
    /// `rank_tol * σ_max` count as zero.
    pub rank_tol: f64,
    /// Turn imaginary population residue into an error instead of a warning.
    pub strict_populations: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            method: Method::Exponential,
            imag_tol: 1e-9,
            rank_tol: 1e-10,
            strict_populations: false,
        }
    }
}

impl SolverConfig {
    /// Parse from a TOML document.
    pub fn from_toml_str(s: &str) -> DensityResult<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Set the default integration method.
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Set the imaginary-residue tolerance for population readback.
    pub fn with_imag_tol(mut self, imag_tol: f64) -> Self {
        self.imag_tol = imag_tol;
        self
    }

    /// Set the relative rank tolerance for the steady-state solve.
    pub fn with_rank_tol(mut self, rank_tol: f64) -> Self {
        self.rank_tol = rank_tol;
        self
    }

    /// Set whether imaginary population residue is an error.
    pub fn with_strict_populations(mut self, strict: bool) -> Self {
        self.strict_populations = strict;
        self
    }
}
