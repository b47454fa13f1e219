//! utils — conversions from Python objects for the PyO3 bindings.
//!
//! Every helper accepts what a Python caller is likely to have at hand:
//! numpy arrays, pandas objects exposing `to_numpy`, or nested sequences of
//! floats.

#[cfg(feature = "python-bindings")]
use ndarray::Array1;

#[cfg(feature = "python-bindings")]
use pyo3::{exceptions::PyValueError, prelude::*, types::PyAny};

#[cfg(feature = "python-bindings")]
use crate::{continuum::basis::Basis, gamma::data::ObservableSet};

#[cfg(feature = "python-bindings")]
use numpy::{
    IntoPyArray,    // Vec → PyArray
    PyArrayMethods, // .readonly()
    PyReadonlyArray1, PyReadonlyArray2, PyReadonlyArray3,
};

/// Contiguous 1-D `float64` view of an array-like.
#[cfg(feature = "python-bindings")]
#[inline]
pub fn extract_f64_array<'py>(
    py: Python<'py>, raw_data: &Bound<'py, PyAny>,
) -> PyResult<PyReadonlyArray1<'py, f64>> {
    if let Ok(arr_ro) = raw_data.extract::<PyReadonlyArray1<f64>>() {
        if arr_ro.as_slice().is_ok() {
            return Ok(arr_ro);
        }
    }

    if let Ok(obj) = raw_data.call_method("to_numpy", (false,), None) {
        if let Ok(series_ro) = obj.extract::<PyReadonlyArray1<f64>>() {
            if series_ro.as_slice().is_ok() {
                return Ok(series_ro);
            }
        }
    }

    let vec: Vec<f64> = raw_data.extract().map_err(|_| {
        pyo3::exceptions::PyTypeError::new_err(
            "expected a 1-D numpy.ndarray, pandas.Series, or sequence of float64",
        )
    })?;
    Ok(vec.into_pyarray(py).readonly())
}

/// Replica of one observable.
///
/// Accepts a 2-D array (one row per replicum), a single 1-D array (one
/// replicum), or a sequence of 1-D array-likes of possibly different
/// lengths.
#[cfg(feature = "python-bindings")]
pub fn extract_replica<'py>(
    py: Python<'py>, raw: &Bound<'py, PyAny>,
) -> PyResult<Vec<Array1<f64>>> {
    if let Ok(arr) = raw.extract::<PyReadonlyArray2<f64>>() {
        return Ok(arr.as_array().rows().into_iter().map(|row| row.to_owned()).collect());
    }
    if let Ok(arr) = raw.extract::<PyReadonlyArray1<f64>>() {
        return Ok(vec![arr.as_array().to_owned()]);
    }

    let mut replica = Vec::new();
    for item in raw.try_iter()? {
        let arr = extract_f64_array(py, &item?)?;
        let slice = arr.as_slice().map_err(|_| {
            PyValueError::new_err("each replicum must be a 1-D contiguous float64 array or sequence")
        })?;
        replica.push(Array1::from(slice.to_vec()));
    }
    Ok(replica)
}

/// Observable set `data[α][r][i]`.
///
/// Accepts a 3-D array or a sequence of per-observable replica as understood
/// by [`extract_replica`].
///
/// Errors
/// ------
/// - `ValueError` from the shape and finiteness checks of
///   [`ObservableSet::new`].
#[cfg(feature = "python-bindings")]
pub fn extract_observable_set<'py>(
    py: Python<'py>, raw: &Bound<'py, PyAny>,
) -> PyResult<ObservableSet> {
    if let Ok(arr) = raw.extract::<PyReadonlyArray3<f64>>() {
        let view = arr.as_array();
        let data = view
            .outer_iter()
            .map(|obs| obs.rows().into_iter().map(|row| row.to_owned()).collect())
            .collect();
        return Ok(ObservableSet::new(data)?);
    }

    let mut data = Vec::new();
    for item in raw.try_iter()? {
        data.push(extract_replica(py, &item?)?);
    }
    Ok(ObservableSet::new(data)?)
}

/// Fit basis from an optional `"1 x x^2"` description; `{1, x}` when absent.
#[cfg(feature = "python-bindings")]
pub fn extract_basis(basis: Option<&str>) -> PyResult<Basis> {
    match basis {
        Some(text) => Ok(text.parse::<Basis>()?),
        None => Ok(Basis::linear()),
    }
}
