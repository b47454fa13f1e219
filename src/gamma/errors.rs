//! gamma::errors — error types for projection and autocorrelation estimation.
//!
//! Purpose
//! -------
//! Provide the error enum and result alias shared by the projector, the
//! autocorrelation function, and the integrated-autocorrelation-time
//! estimator. Every variant carries the offending indices or values so that
//! an operator can locate the bad input without re-running the analysis.
//!
//! Key behaviors
//! -------------
//! - Define [`GammaError`] and [`GammaResult`] as the canonical error and
//!   result types of the `gamma` subtree.
//! - Group data-shape failures (replica or measurement counts that differ
//!   between observables) behind [`GammaError::is_data_shape`].
//! - Convert into `PyErr` (`ValueError`) when the `python-bindings` feature
//!   is enabled.
//!
//! Invariants & assumptions
//! ------------------------
//! - Shape errors are raised before any numeric work is attempted.
//! - `NoWindowFound` is fatal for the current call; no default window is
//!   ever substituted.
//!
//! Conventions
//! -----------
//! - Indices are 0-based: `observable` is `α`, `replicum` is `r`, `index`
//!   is the measurement `i`.
//!
//! Testing notes
//! -------------
//! - Unit tests verify that `Display` messages embed their payloads and that
//!   the data-shape classification is correct.

#[cfg(feature = "python-bindings")]
use pyo3::{PyErr, exceptions::PyValueError};

/// Result alias for all `gamma` routines.
pub type GammaResult<T> = Result<T, GammaError>;

/// GammaError — failures of the projector and the Γ-method estimator.
///
/// Variants
/// --------
/// - `EmptyData`
///   No observables, no replica, or every replicum empty.
/// - `ReplicaCountMismatch { observable, expected, found }`
///   Observable `observable` has a different number of replica than
///   observable 0.
/// - `MeasurementCountMismatch { observable, replicum, expected, found }`
///   Replicum `replicum` of observable `observable` has a different length
///   than the same replicum of observable 0.
/// - `NonFiniteData { observable, replicum, index, value }`
///   A sample is NaN or ±∞.
/// - `ObservableOutOfRange { index, nobs }`
///   An index projection asked for an observable that does not exist.
/// - `NonFiniteDerivative { observable, value }`
///   The finite-difference gradient of the projected function is not finite.
/// - `InsufficientData { samples }`
///   Fewer than two measurements in total, or a replicum too short to form
///   a single lag.
/// - `ZeroVariance`
///   `Γ(0) = 0`; the derived series is constant and τ_int is undefined.
/// - `NoWindowFound { max_window, samples }`
///   The automatic window criterion never turned negative.
#[derive(Debug, Clone, PartialEq)]
pub enum GammaError {
    // ---- Data shape ----
    EmptyData,
    ReplicaCountMismatch { observable: usize, expected: usize, found: usize },
    MeasurementCountMismatch { observable: usize, replicum: usize, expected: usize, found: usize },

    // ---- Data content ----
    NonFiniteData { observable: usize, replicum: usize, index: usize, value: f64 },
    ObservableOutOfRange { index: usize, nobs: usize },
    NonFiniteDerivative { observable: usize, value: f64 },
    InsufficientData { samples: usize },

    // ---- Estimation ----
    ZeroVariance,
    NoWindowFound { max_window: usize, samples: usize },
}

impl GammaError {
    /// `true` for the inconsistent replicum/measurement count family.
    pub fn is_data_shape(&self) -> bool {
        matches!(
            self,
            GammaError::ReplicaCountMismatch { .. } | GammaError::MeasurementCountMismatch { .. }
        )
    }
}

impl std::error::Error for GammaError {}

impl std::fmt::Display for GammaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Data shape ----
            GammaError::EmptyData => {
                write!(f, "Input data is empty: need at least one observable with one replicum.")
            }
            GammaError::ReplicaCountMismatch { observable, expected, found } => write!(
                f,
                "Inconsistent number of replica: observable {observable} has {found}, \
                 observable 0 has {expected}."
            ),
            GammaError::MeasurementCountMismatch { observable, replicum, expected, found } => {
                write!(
                    f,
                    "Inconsistent number of measurements in replicum {replicum}: observable \
                     {observable} has {found}, observable 0 has {expected}."
                )
            }

            // ---- Data content ----
            GammaError::NonFiniteData { observable, replicum, index, value } => write!(
                f,
                "Non-finite sample {value} at observable {observable}, replicum {replicum}, \
                 measurement {index}."
            ),
            GammaError::ObservableOutOfRange { index, nobs } => {
                write!(f, "Observable index {index} out of range; data has {nobs} observables.")
            }
            GammaError::NonFiniteDerivative { observable, value } => write!(
                f,
                "Derivative with respect to observable {observable} is non-finite: {value}."
            ),
            GammaError::InsufficientData { samples } => {
                write!(f, "Insufficient data: {samples} measurements cannot form a single lag.")
            }

            // ---- Estimation ----
            GammaError::ZeroVariance => {
                write!(f, "Derived series has zero variance; Gamma(0) = 0.")
            }
            GammaError::NoWindowFound { max_window, samples } => write!(
                f,
                "No summation window found up to W = {max_window} with N = {samples}; \
                 the autocorrelation does not decay within the data."
            ),
        }
    }
}

#[cfg(feature = "python-bindings")]
impl From<GammaError> for PyErr {
    fn from(err: GammaError) -> PyErr {
        PyValueError::new_err(format!("GammaError: {err}"))
    }
}
