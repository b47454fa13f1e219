//! gamma::validation — shape and content guards for observable sample sets.
//!
//! Purpose
//! -------
//! Centralize the checks that must pass before any projection or
//! autocorrelation work starts: every observable carries the same number of
//! replica, each replicum has the same length across observables, and all
//! samples are finite.
//!
//! Key behaviors
//! -------------
//! - [`validate_shape`] compares every observable against observable 0 and
//!   reports the first mismatch with its location.
//! - [`validate_finite`] scans all samples once and reports the first
//!   non-finite value.
//! - [`validate_observable_index`] guards the index fast path of the
//!   projector.
//!
//! Conventions
//! -----------
//! - Pure functions; no allocation beyond error construction.
//!
//! Testing notes
//! -------------
//! - Unit tests cover each error branch and the success path.

use crate::gamma::errors::{GammaError, GammaResult};
use ndarray::Array1;

/// Check that `data[α][r]` has a consistent replicum/measurement layout.
///
/// Parameters
/// ----------
/// - `data`: `&[Vec<Array1<f64>>]`
///   Samples indexed as `data[α][r][i]`.
///
/// Returns
/// -------
/// `GammaResult<()>`
///   `Ok(())` when there is at least one observable with at least one
///   replicum and all observables agree with observable 0 on the number of
///   replica and on every per-replicum length.
///
/// Errors
/// ------
/// - `GammaError::EmptyData`
///   No observables, or observable 0 has no replica.
/// - `GammaError::ReplicaCountMismatch`
///   Some observable has a different replica count.
/// - `GammaError::MeasurementCountMismatch`
///   Some replicum length differs from observable 0.
pub fn validate_shape(data: &[Vec<Array1<f64>>]) -> GammaResult<()> {
    let reference = match data.first() {
        Some(first) if !first.is_empty() => first,
        _ => return Err(GammaError::EmptyData),
    };

    for (observable, replica) in data.iter().enumerate().skip(1) {
        if replica.len() != reference.len() {
            return Err(GammaError::ReplicaCountMismatch {
                observable,
                expected: reference.len(),
                found: replica.len(),
            });
        }
        for (replicum, (series, expected)) in replica.iter().zip(reference).enumerate() {
            if series.len() != expected.len() {
                return Err(GammaError::MeasurementCountMismatch {
                    observable,
                    replicum,
                    expected: expected.len(),
                    found: series.len(),
                });
            }
        }
    }
    Ok(())
}

/// Check that every sample is finite.
///
/// Errors
/// ------
/// - `GammaError::NonFiniteData`
///   Location and value of the first NaN or ±∞ encountered.
pub fn validate_finite(data: &[Vec<Array1<f64>>]) -> GammaResult<()> {
    for (observable, replica) in data.iter().enumerate() {
        for (replicum, series) in replica.iter().enumerate() {
            if let Some((index, &value)) = series.iter().enumerate().find(|(_, v)| !v.is_finite())
            {
                return Err(GammaError::NonFiniteData { observable, replicum, index, value });
            }
        }
    }
    Ok(())
}

/// Check that `index` names an existing observable.
pub fn validate_observable_index(index: usize, nobs: usize) -> GammaResult<()> {
    if index >= nobs {
        return Err(GammaError::ObservableOutOfRange { index, nobs });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover every branch of `validate_shape`, `validate_finite`
    // and `validate_observable_index`.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Accept a well-formed two-observable, two-replica layout with ragged
    // replicum lengths that agree across observables.
    //
    // Given
    // -----
    // - Replicum lengths (3, 2) for both observables.
    //
    // Expect
    // ------
    // - `Ok(())`.
    fn validate_shape_accepts_consistent_layout() {
        // Arrange
        let data = vec![
            vec![array![1.0, 2.0, 3.0], array![4.0, 5.0]],
            vec![array![0.1, 0.2, 0.3], array![0.4, 0.5]],
        ];

        // Act / Assert
        assert!(validate_shape(&data).is_ok());
    }

    #[test]
    // Purpose
    // -------
    // Reject data with no observables or no replica.
    //
    // Given
    // -----
    // - An empty outer vector and a single observable with zero replica.
    //
    // Expect
    // ------
    // - `GammaError::EmptyData` for both.
    fn validate_shape_rejects_empty_inputs() {
        // Arrange
        let none: Vec<Vec<Array1<f64>>> = Vec::new();
        let no_replica: Vec<Vec<Array1<f64>>> = vec![Vec::new()];

        // Act / Assert
        assert_eq!(validate_shape(&none), Err(GammaError::EmptyData));
        assert_eq!(validate_shape(&no_replica), Err(GammaError::EmptyData));
    }

    #[test]
    // Purpose
    // -------
    // Report a differing replica count with the observable index.
    //
    // Given
    // -----
    // - Observable 0 with two replica, observable 1 with one.
    //
    // Expect
    // ------
    // - `ReplicaCountMismatch { observable: 1, expected: 2, found: 1 }`.
    fn validate_shape_reports_replica_count_mismatch() {
        // Arrange
        let data = vec![vec![array![1.0, 2.0], array![3.0, 4.0]], vec![array![1.0, 2.0]]];

        // Act
        let err = validate_shape(&data).unwrap_err();

        // Assert
        assert_eq!(err, GammaError::ReplicaCountMismatch { observable: 1, expected: 2, found: 1 });
    }

    #[test]
    // Purpose
    // -------
    // Report a per-replicum length mismatch with observable and replicum.
    //
    // Given
    // -----
    // - Replicum 1 has 2 samples for observable 0 and 3 for observable 1.
    //
    // Expect
    // ------
    // - `MeasurementCountMismatch { observable: 1, replicum: 1, expected: 2, found: 3 }`.
    fn validate_shape_reports_measurement_count_mismatch() {
        // Arrange
        let data = vec![
            vec![array![1.0, 2.0], array![3.0, 4.0]],
            vec![array![1.0, 2.0], array![3.0, 4.0, 5.0]],
        ];

        // Act
        let err = validate_shape(&data).unwrap_err();

        // Assert
        assert_eq!(
            err,
            GammaError::MeasurementCountMismatch {
                observable: 1,
                replicum: 1,
                expected: 2,
                found: 3
            }
        );
    }

    #[test]
    // Purpose
    // -------
    // Locate the first non-finite sample.
    //
    // Given
    // -----
    // - A NaN at observable 0, replicum 1, measurement 1.
    //
    // Expect
    // ------
    // - `NonFiniteData` with that location.
    fn validate_finite_reports_first_nan() {
        // Arrange
        let data = vec![vec![array![1.0, 2.0], array![3.0, f64::NAN]]];

        // Act
        let err = validate_finite(&data).unwrap_err();

        // Assert
        match err {
            GammaError::NonFiniteData { observable, replicum, index, value } => {
                assert_eq!((observable, replicum, index), (0, 1, 1));
                assert!(value.is_nan());
            }
            other => panic!("expected NonFiniteData, got {other:?}"),
        }
    }

    #[test]
    // Purpose
    // -------
    // Guard the index projection.
    //
    // Given
    // -----
    // - `nobs = 3` and indices 2 and 3.
    //
    // Expect
    // ------
    // - 2 is accepted, 3 yields `ObservableOutOfRange`.
    fn validate_observable_index_bounds() {
        // Act / Assert
        assert!(validate_observable_index(2, 3).is_ok());
        assert_eq!(
            validate_observable_index(3, 3),
            Err(GammaError::ObservableOutOfRange { index: 3, nobs: 3 })
        );
    }
}
