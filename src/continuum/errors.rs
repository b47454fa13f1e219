//! continuum::errors — error types for continuum-limit extrapolation.
//!
//! Purpose
//! -------
//! Provide [`ContinuumError`] and [`ContinuumResult`] for basis parsing,
//! point-set validation, and the SVD-based least-squares fit.
//!
//! Invariants & assumptions
//! ------------------------
//! - Duplicate parameters are rejected at construction; a fit never averages
//!   points silently.
//! - Every variant carries the values needed to locate the bad input.

#[cfg(feature = "python-bindings")]
use pyo3::{PyErr, exceptions::PyValueError};

/// Result alias for continuum extrapolation.
pub type ContinuumResult<T> = Result<T, ContinuumError>;

/// ContinuumError — failures of the continuum-limit extrapolator.
///
/// Variants
/// --------
/// - `DuplicateParam { param, params }`
///   `param` occurs more than once; `params` is the full sorted input list.
/// - `InsufficientData { points, imin, basis }`
///   After dropping `imin` points, fewer than `basis` remain (or none).
/// - `EmptyBasis`
///   No basis function given.
/// - `NoPoints`
///   No data point given.
/// - `WeightCountMismatch { points, weights }`
///   Weight vector length differs from the point count.
/// - `NonFiniteInput { param, value, variance }`
///   A point contains NaN/±∞ or a negative variance.
/// - `InvalidWeight { param, weight }`
///   The weight of the point at `param` is NaN/±∞ or negative.
/// - `NonFiniteBasis { param, term }`
///   Basis function `term` is not finite at `param` (e.g. `x^-1` at 0).
/// - `InvalidBasisTerm { term }`
///   A basis description term could not be parsed.
/// - `SvdFailed { reason }`
///   nalgebra could not form the pseudo-inverse.
#[derive(Debug, Clone, PartialEq)]
pub enum ContinuumError {
    // ---- Input set ----
    DuplicateParam { param: f64, params: Vec<f64> },
    InsufficientData { points: usize, imin: usize, basis: usize },
    NoPoints,
    WeightCountMismatch { points: usize, weights: usize },
    NonFiniteInput { param: f64, value: f64, variance: f64 },
    InvalidWeight { param: f64, weight: f64 },

    // ---- Basis ----
    EmptyBasis,
    InvalidBasisTerm { term: String },
    NonFiniteBasis { param: f64, term: String },

    // ---- Linear algebra ----
    SvdFailed { reason: String },
}

impl std::error::Error for ContinuumError {}

impl std::fmt::Display for ContinuumError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Input set ----
            ContinuumError::DuplicateParam { param, params } => write!(
                f,
                "Duplicate parameter {param} in continuum fit input {params:?}; \
                 each parameter must occur once."
            ),
            ContinuumError::InsufficientData { points, imin, basis } => write!(
                f,
                "Insufficient data: {points} points with imin = {imin} leave fewer usable \
                 points than the {basis} basis functions."
            ),
            ContinuumError::NoPoints => write!(f, "Continuum fit needs at least one point."),
            ContinuumError::WeightCountMismatch { points, weights } => {
                write!(f, "Got {weights} weights for {points} points.")
            }
            ContinuumError::NonFiniteInput { param, value, variance } => write!(
                f,
                "Invalid point (param {param}, value {value}, variance {variance}): \
                 all entries must be finite and the variance non-negative."
            ),
            ContinuumError::InvalidWeight { param, weight } => write!(
                f,
                "Invalid weight {weight} for the point at param {param}; weights must be \
                 finite and non-negative."
            ),

            // ---- Basis ----
            ContinuumError::EmptyBasis => write!(f, "Basis must contain at least one function."),
            ContinuumError::InvalidBasisTerm { term } => {
                write!(f, "Invalid basis term '{term}'; expected '1', 'x' or 'x^k'.")
            }
            ContinuumError::NonFiniteBasis { param, term } => {
                write!(f, "Basis function '{term}' is not finite at param {param}.")
            }

            // ---- Linear algebra ----
            ContinuumError::SvdFailed { reason } => {
                write!(f, "Pseudo-inverse via SVD failed: {reason}")
            }
        }
    }
}

#[cfg(feature = "python-bindings")]
impl From<ContinuumError> for PyErr {
    fn from(err: ContinuumError) -> PyErr {
        PyValueError::new_err(format!("ContinuumError: {err}"))
    }
}
