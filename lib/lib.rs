#![allow(dead_code, non_snake_case, non_upper_case_globals)]

//! Density-matrix propagation for a single multilevel atom under the Lindblad
//! master equation.
//!
//! A [`StateSpace`] holds the bare and coupling Hamiltonians, the decay rates,
//! and the initial populations of an `n`-level system. From these it builds
//! the `n² × n²` Liouvillian acting on column-major flattened density matrices
//! and either integrates it over a uniform time grid ([`Trajectory`]) or
//! solves for its steady state ([`SteadyState`]).

pub mod error;
pub mod config;
pub mod spin;
pub mod hilbert;
pub mod hyperfine;
pub mod liouville;
pub mod propagate;
pub mod populations;
pub mod state;

pub use error::{ DensityError, DensityResult };
pub use config::SolverConfig;
pub use propagate::{ Method, TimeGrid };
pub use populations::{ SteadyState, Trajectory };
pub use state::StateSpace;
