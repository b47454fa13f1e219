//! gamma — Γ-method error estimation for replicated Monte-Carlo time series.
//!
//! Purpose
//! -------
//! Estimate the statistical error of an arbitrary scalar function of
//! several primary observables, accounting for autocorrelation within each
//! replicum (Wolff's Γ-method).
//!
//! Key behaviors
//! -------------
//! - Validate `data[α][r][i]` layouts ([`ObservableSet`]) and reject
//!   inconsistent replica or measurement counts before any numeric work.
//! - Linearise a function of the observables around their means
//!   ([`DataProject`], [`Projection`]) into one derived series.
//! - Compute the replicum-aware autocovariance ([`gamma`]), the integrated
//!   autocorrelation time with automatic windowing, and the error of the
//!   mean ([`TauIntOutcome`]).
//! - Provide seeded AR(1) generators with known `τ_int` for testing
//!   ([`synthetic`]).
//!
//! Invariants & assumptions
//! ------------------------
//! - All routines are pure and synchronous; independent (label, order)
//!   estimations may run on separate threads without coordination.
//! - Failures are reported through [`GammaError`]; nothing panics on bad
//!   input data.
//!
//! Conventions
//! -----------
//! - `N = Σ_r N_r`, `R` = number of replica, `τ_int = 1/2` for white noise.
//!
//! Downstream usage
//! ----------------
//! - `use nspt_analysis::gamma::prelude::*;` brings in the estimator
//!   surface in one line.

pub mod autocorr;
pub mod data;
pub mod errors;
pub mod project;
pub mod synthetic;
pub mod tauint;
pub mod validation;

// ---- Re-exports (primary surface) -----------------------------------------

pub use self::autocorr::{GammaFunction, gamma};
pub use self::data::{DataInfo, ObservableSet, means};
pub use self::errors::{GammaError, GammaResult};
pub use self::project::{DataProject, DerivedSeries, Projection};
pub use self::tauint::{TauIntOptions, TauIntOutcome, WindowDiagnostics};

// ---- Optional convenience prelude for downstream crates ------------------

pub mod prelude {
    pub use super::data::{ObservableSet, means};
    pub use super::errors::{GammaError, GammaResult};
    pub use super::project::{DataProject, Projection};
    pub use super::tauint::{TauIntOptions, TauIntOutcome};
}
