//! continuum — extrapolation of finite-step results to the continuum limit.
//!
//! Purpose
//! -------
//! Fit a linear combination of basis functions of the integration step size
//! to one `(τ, value, error)` point per step size and report the coefficient
//! of the leading basis function with its propagated error.
//!
//! Key behaviors
//! -------------
//! - [`Basis`] / [`BasisFn`] describe the fit functions (`{1, x}` by
//!   default, parsable from `"1 x x^2"`).
//! - [`ContinuumLimit`] validates the point set (unique parameters, finite
//!   entries) and [`ContinuumLimit::estimate`] performs the SVD-based
//!   weighted least-squares fit, optionally dropping the smallest steps.
//! - [`closed_form_intercept_error`] cross-checks the `{1, x}` case.
//!
//! Invariants & assumptions
//! ------------------------
//! - Fits are stateless; every call builds its matrices afresh.
//!
//! Downstream usage
//! ----------------
//! - `analysis::actions::extrapolate` builds one [`ContinuumLimit`] per
//!   (order, lattice size).

pub mod basis;
pub mod errors;
pub mod limit;

// ---- Re-exports (primary surface) -----------------------------------------

pub use self::basis::{Basis, BasisFn};
pub use self::errors::{ContinuumError, ContinuumResult};
pub use self::limit::{ContinuumFit, ContinuumLimit, ContinuumPoint, closed_form_intercept_error};

// ---- Optional convenience prelude for downstream crates ------------------

pub mod prelude {
    pub use super::basis::Basis;
    pub use super::errors::{ContinuumError, ContinuumResult};
    pub use super::limit::{ContinuumFit, ContinuumLimit, ContinuumPoint};
}
