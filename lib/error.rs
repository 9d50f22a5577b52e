//! Error type shared by every fallible operation in the crate.

use thiserror::Error;

/// Errors arising from building or propagating a multilevel system.
///
/// None of these are recoverable for the call that produced them; no partial
/// results are returned alongside an error.
#[derive(Debug, Error)]
pub enum DensityError {
    /// A matrix or vector did not match the size of the state space.
    #[error("invalid dimension for {what}: expected {expected}, got {got}")]
    InvalidDimension {
        what: &'static str,
        expected: String,
        got: String,
    },

    /// A caller-supplied parameter was not understood or out of range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A computation produced (or would have produced) meaningless numbers.
    #[error("numerical error: {0}")]
    Numerical(String),

    /// Failure reported by the LAPACK backend.
    #[error("linear algebra error: {0}")]
    Linalg(#[from] ndarray_linalg::error::LinalgError),

    /// Malformed TOML solver configuration.
    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),
}

pub type DensityResult<T> = Result<T, DensityError>;

impl DensityError {
    pub(crate) fn dim<E, G>(what: &'static str, expected: E, got: G) -> Self
    where
        E: std::fmt::Debug,
        G: std::fmt::Debug,
    {
        Self::InvalidDimension {
            what,
            expected: format!("{:?}", expected),
            got: format!("{:?}", got),
        }
    }
}
