//! analysis::errors — error types for the analysis driver.
//!
//! Purpose
//! -------
//! Provide [`AnalysisError`] and [`AnalysisResult`] for plan parsing, data
//! loading, and the actions. Numeric failures from the core are wrapped with
//! the (label, order) or (order, lattice size) unit they occurred in so that
//! an operator can tell which input to fix.
//!
//! Key behaviors
//! -------------
//! - Plan-reader variants carry the tag name and the line number.
//! - Loader failures are built with `anyhow` context chains and folded into
//!   [`AnalysisError::Load`] through `From<anyhow::Error>`.
//! - Converts into `PyErr` (`ValueError`) with `python-bindings`.

use crate::{continuum::errors::ContinuumError, gamma::errors::GammaError};

#[cfg(feature = "python-bindings")]
use pyo3::{PyErr, exceptions::PyValueError};

/// Result alias for the analysis driver.
pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// AnalysisError — failures of the plan reader, loader and actions.
///
/// Variants
/// --------
/// - `Estimation { label, order, source }`
///   Γ-method failure for one label and order.
/// - `Extrapolation { order, lattice_size, source }`
///   Continuum fit failure for one order and lattice size.
/// - `CrossCheck { order, lattice_size, svd, closed_form }`
///   The SVD intercept error disagrees with the closed form.
/// - `UnknownTag`, `UnexpectedClosingTag`, `MisplacedTag`,
///   `MissingAttribute`, `InvalidValue`, `Syntax`, `MissingAnalysis`
///   Plan-file errors. `MissingAttribute` also covers required child
///   elements such as `<path>` inside `<directory>`.
/// - `Load(String)`
///   Data loading failure, with the full `anyhow` context chain.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisError {
    // ---- Numeric units ----
    Estimation { label: String, order: usize, source: GammaError },
    Extrapolation { order: usize, lattice_size: u32, source: ContinuumError },
    CrossCheck { order: usize, lattice_size: u32, svd: f64, closed_form: f64 },

    // ---- Plan file ----
    UnknownTag { tag: String, line: usize },
    UnexpectedClosingTag { tag: String, expected: Option<String>, line: usize },
    MisplacedTag { tag: String, parent: Option<String>, line: usize },
    MissingAttribute { tag: String, attribute: String, line: usize },
    InvalidValue { tag: String, value: String, reason: String, line: usize },
    Syntax { message: String, line: usize },
    MissingAnalysis,

    // ---- Data ----
    Load(String),
}

impl std::error::Error for AnalysisError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AnalysisError::Estimation { source, .. } => Some(source),
            AnalysisError::Extrapolation { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl std::fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Numeric units ----
            AnalysisError::Estimation { label, order, source } => {
                write!(f, "Estimation failed for label '{label}', order {order}: {source}")
            }
            AnalysisError::Extrapolation { order, lattice_size, source } => write!(
                f,
                "Extrapolation failed for order {order}, L = {lattice_size}: {source}"
            ),
            AnalysisError::CrossCheck { order, lattice_size, svd, closed_form } => write!(
                f,
                "Continuum error cross-check failed for order {order}, L = {lattice_size}: \
                 SVD gives {svd:e}, closed form gives {closed_form:e}."
            ),

            // ---- Plan file ----
            AnalysisError::UnknownTag { tag, line } => {
                write!(f, "Line {line}: encountered undefined tag <{tag}>.")
            }
            AnalysisError::UnexpectedClosingTag { tag, expected, line } => match expected {
                Some(open) => {
                    write!(f, "Line {line}: closing tag </{tag}> does not match <{open}>.")
                }
                None => write!(f, "Line {line}: closing tag </{tag}> without opening tag."),
            },
            AnalysisError::MisplacedTag { tag, parent, line } => match parent {
                Some(p) => write!(f, "Line {line}: tag <{tag}> is not allowed inside <{p}>."),
                None => write!(f, "Line {line}: tag <{tag}> is not allowed at top level."),
            },
            AnalysisError::MissingAttribute { tag, attribute, line } => {
                write!(f, "Line {line}: tag <{tag}> requires '{attribute}'.")
            }
            AnalysisError::InvalidValue { tag, value, reason, line } => {
                write!(f, "Line {line}: invalid value '{value}' in <{tag}>: {reason}.")
            }
            AnalysisError::Syntax { message, line } => write!(f, "Line {line}: {message}"),
            AnalysisError::MissingAnalysis => {
                write!(f, "Input file does not contain an <analysis> tag.")
            }

            // ---- Data ----
            AnalysisError::Load(msg) => write!(f, "Data loading failed: {msg}"),
        }
    }
}

impl From<anyhow::Error> for AnalysisError {
    fn from(err: anyhow::Error) -> Self {
        AnalysisError::Load(format!("{err:#}"))
    }
}

#[cfg(feature = "python-bindings")]
impl From<AnalysisError> for PyErr {
    fn from(err: AnalysisError) -> PyErr {
        PyValueError::new_err(format!("AnalysisError: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Context in wrapped numeric errors and the `source` chain.
    // - Folding of `anyhow` context chains into `Load`.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // A wrapped estimation error names label and order and exposes its cause.
    //
    // Given
    // -----
    // - `Estimation { label: "t.005", order: 3, source: ZeroVariance }`.
    //
    // Expect
    // ------
    // - Message contains label and order; `source()` is the `GammaError`.
    fn estimation_error_carries_unit_context() {
        // Arrange
        let err = AnalysisError::Estimation {
            label: "t.005".to_string(),
            order: 3,
            source: GammaError::ZeroVariance,
        };

        // Act
        let msg = err.to_string();

        // Assert
        assert!(msg.contains("'t.005'") && msg.contains("order 3"), "got: {msg}");
        assert!(err.source().is_some());
    }

    #[test]
    // Purpose
    // -------
    // `anyhow` contexts survive the conversion.
    //
    // Given
    // -----
    // - An `anyhow` error with one context layer.
    //
    // Expect
    // ------
    // - `Load` message with both the context and the root cause.
    fn anyhow_errors_become_load_with_context_chain() {
        // Arrange
        let base = anyhow::anyhow!("file truncated").context("reading data/run1.bin");

        // Act
        let err: AnalysisError = base.into();

        // Assert
        match err {
            AnalysisError::Load(msg) => {
                assert!(msg.contains("reading data/run1.bin") && msg.contains("file truncated"));
            }
            other => panic!("expected Load, got {other:?}"),
        }
    }
}
