//! nspt_analysis — autocorrelation-aware errors and continuum extrapolation
//! for numerical stochastic perturbation theory, with Python bindings.
//!
//! Purpose
//! -------
//! Serve as the crate root for Rust callers and as the PyO3 bridge that
//! exposes the Γ-method estimator and the continuum extrapolator to Python
//! via the `_nspt_analysis` extension module.
//!
//! Key behaviors
//! -------------
//! - Re-export the core modules: [`gamma`] (projection, autocorrelation,
//!   `τ_int`), [`continuum`] (SVD least-squares extrapolation) and
//!   [`analysis`] (plan file, loader, actions, plot data).
//! - With `python-bindings`, define the `TauInt`, `ContinuumLimit` and
//!   `ContinuumFit` classes and the `pretty_print` function, grouped into
//!   the `gamma` and `continuum` submodules.
//!
//! Invariants & assumptions
//! ------------------------
//! - All numerical work happens in the inner modules; this file performs
//!   only FFI glue, input conversion and error mapping.
//! - Python callables passed as projection functions run under the GIL on
//!   the calling thread; the first exception they raise is re-raised.
//!
//! Conventions
//! -----------
//! - Python classes live under `_nspt_analysis.<submodule>` and are
//!   registered in `sys.modules` as `nspt_analysis.<submodule>`.
//! - Errors from core Rust code are converted to `ValueError` at the PyO3
//!   boundary.
//!
//! Downstream usage
//! ----------------
//! - Rust code depends on the inner modules and can ignore everything gated
//!   by `python-bindings`.
//!
//! Testing notes
//! -------------
//! - Numerical behavior is covered by unit tests in the inner modules and by
//!   the integration tests under `tests/`.

pub mod analysis;
pub mod continuum;
pub mod gamma;
pub mod utils;

#[cfg(feature = "python-bindings")]
use std::cell::RefCell;

#[cfg(feature = "python-bindings")]
use pyo3::{
    exceptions::PyValueError,
    prelude::*,
    types::{PyAny, PyTuple},
};

#[cfg(feature = "python-bindings")]
use crate::{
    continuum::limit::{ContinuumFit, ContinuumLimit, ContinuumPoint},
    gamma::{
        project::{DataProject, Projection},
        tauint::{TauIntOptions, TauIntOutcome},
    },
    utils::{extract_basis, extract_f64_array, extract_observable_set},
};

/// TauInt — Python-facing Γ-method estimate.
///
/// Purpose
/// -------
/// Run [`TauIntOutcome`] on data handed over from Python and expose the
/// result as read-only properties.
///
/// Parameters
/// ----------
/// Constructed from Python via
/// `TauInt(data, observable=None, function=None, max_lag=None)`:
/// - `data`
///   3-D array `[α][r][i]`, or a sequence over observables of replica
///   (2-D arrays or sequences of 1-D array-likes).
/// - `observable`: `Option<usize>`
///   Analyse observable `observable` unchanged.
/// - `function`: `Option<callable>`
///   Analyse `function(*means)`, linearised around the means. Mutually
///   exclusive with `observable`; observable 0 is used when neither is given.
/// - `max_lag`: `Option<usize>`
///   Cap on the largest autocorrelation lag.
///
/// Notes
/// -----
/// - An exception raised inside `function` aborts the estimate and is
///   re-raised unchanged.
#[cfg(feature = "python-bindings")]
#[pyclass(module = "nspt_analysis.gamma")]
pub struct TauInt {
    inner: TauIntOutcome,
}

#[cfg(feature = "python-bindings")]
#[pymethods]
impl TauInt {
    #[new]
    #[pyo3(
        text_signature = "(data, /, observable=None, function=None, max_lag=None)",
        signature = (data, observable = None, function = None, max_lag = None)
    )]
    pub fn new<'py>(
        py: Python<'py>, data: &Bound<'py, PyAny>, observable: Option<usize>,
        function: Option<&Bound<'py, PyAny>>, max_lag: Option<usize>,
    ) -> PyResult<TauInt> {
        let set = extract_observable_set(py, data)?;
        let opts = TauIntOptions { max_lag, ..TauIntOptions::default() };

        let inner = match (observable, function) {
            (Some(_), Some(_)) => {
                return Err(PyValueError::new_err(
                    "pass either observable or function, not both",
                ));
            }
            (index, None) => {
                TauIntOutcome::tauint(&set, Projection::Index(index.unwrap_or(0)), &opts)?
            }
            (None, Some(callable)) => {
                let call_err: RefCell<Option<PyErr>> = RefCell::new(None);
                let f = |args: &[f64]| -> f64 {
                    let value = PyTuple::new(py, args)
                        .and_then(|tuple| callable.call1(tuple))
                        .and_then(|out| out.extract::<f64>());
                    match value {
                        Ok(v) => v,
                        Err(e) => {
                            let mut slot = call_err.borrow_mut();
                            if slot.is_none() {
                                *slot = Some(e);
                            }
                            f64::NAN
                        }
                    }
                };
                let projected = DataProject::new(&set)?.project(Projection::Function(&f));
                if let Some(err) = call_err.borrow_mut().take() {
                    return Err(err);
                }
                TauIntOutcome::from_series(&projected?, &opts)?
            }
        };
        Ok(TauInt { inner })
    }

    /// Sample mean of the analysed series.
    #[getter]
    pub fn mean(&self) -> f64 {
        self.inner.mean()
    }

    /// `function(*means)` for function projections, else the mean.
    #[getter]
    pub fn value(&self) -> f64 {
        self.inner.value()
    }

    #[getter]
    pub fn error(&self) -> f64 {
        self.inner.error()
    }

    #[getter]
    pub fn tau_int(&self) -> f64 {
        self.inner.tau_int()
    }

    #[getter]
    pub fn tau_int_error(&self) -> f64 {
        self.inner.tau_int_error()
    }

    /// Selected summation window `W*`.
    #[getter]
    pub fn window(&self) -> usize {
        self.inner.window()
    }

    /// Full normalised autocovariance Γ(W).
    #[getter]
    pub fn gamma(&self) -> Vec<f64> {
        self.inner.gamma().values.to_vec()
    }

    /// `(windows, tau_int, tau_int_error, gamma)` up to ≈1.3·W*.
    pub fn diagnostics(&self) -> (Vec<usize>, Vec<f64>, Vec<f64>, Vec<f64>) {
        let d = self.inner.diagnostics();
        (d.windows, d.tau_int.to_vec(), d.tau_int_error.to_vec(), d.gamma.to_vec())
    }
}

/// ContinuumLimit — Python-facing continuum extrapolator.
///
/// Parameters
/// ----------
/// Constructed from Python via
/// `ContinuumLimit(params, values, errors, basis=None, weights=None)`:
/// - `params`, `values`, `errors`
///   Equal-length 1-D array-likes: step size, value and error per point.
/// - `basis`: `Option<str>`
///   Basis description such as `"1 x x^2"`; `{1, x}` when omitted.
/// - `weights`: `Option<array-like>`
///   Per-point weights, all 1 when omitted.
#[cfg(feature = "python-bindings")]
#[pyclass(name = "ContinuumLimit", module = "nspt_analysis.continuum")]
pub struct PyContinuumLimit {
    inner: ContinuumLimit,
}

#[cfg(feature = "python-bindings")]
#[pymethods]
impl PyContinuumLimit {
    #[new]
    #[pyo3(
        text_signature = "(params, values, errors, /, basis=None, weights=None)",
        signature = (params, values, errors, basis = None, weights = None)
    )]
    pub fn new<'py>(
        py: Python<'py>, params: &Bound<'py, PyAny>, values: &Bound<'py, PyAny>,
        errors: &Bound<'py, PyAny>, basis: Option<&str>, weights: Option<&Bound<'py, PyAny>>,
    ) -> PyResult<PyContinuumLimit> {
        let params = extract_f64_array(py, params)?;
        let values = extract_f64_array(py, values)?;
        let errors = extract_f64_array(py, errors)?;
        let (params, values, errors) = (params.as_array(), values.as_array(), errors.as_array());
        if params.len() != values.len() || params.len() != errors.len() {
            return Err(PyValueError::new_err(format!(
                "params, values and errors must have equal lengths (got {}, {}, {})",
                params.len(),
                values.len(),
                errors.len()
            )));
        }
        let points = params
            .iter()
            .zip(values.iter())
            .zip(errors.iter())
            .map(|((&x, &y), &dy)| ContinuumPoint::with_error(x, y, dy))
            .collect();
        let weights = match weights {
            Some(w) => Some(extract_f64_array(py, w)?.as_array().to_vec()),
            None => None,
        };
        let inner = ContinuumLimit::new(points, extract_basis(basis)?, weights)?;
        Ok(PyContinuumLimit { inner })
    }

    /// Fit, skipping the `imin` smallest step sizes.
    #[pyo3(signature = (imin = 0))]
    pub fn estimate(&self, imin: usize) -> PyResult<PyContinuumFit> {
        Ok(PyContinuumFit { inner: self.inner.estimate(imin)? })
    }

    /// Sorted step sizes.
    #[getter]
    pub fn params(&self) -> Vec<f64> {
        self.inner.points().iter().map(|p| p.param).collect()
    }

    #[getter]
    pub fn basis(&self) -> String {
        self.inner.basis().to_string()
    }
}

/// ContinuumFit — coefficients and errors of one continuum fit.
#[cfg(feature = "python-bindings")]
#[pyclass(name = "ContinuumFit", module = "nspt_analysis.continuum")]
pub struct PyContinuumFit {
    inner: ContinuumFit,
}

#[cfg(feature = "python-bindings")]
#[pymethods]
impl PyContinuumFit {
    #[getter]
    pub fn alpha(&self) -> Vec<f64> {
        self.inner.alpha().to_vec()
    }

    #[getter]
    pub fn variance(&self) -> Vec<f64> {
        self.inner.variance().to_vec()
    }

    #[getter]
    pub fn errors(&self) -> Vec<f64> {
        self.inner.errors().to_vec()
    }

    #[getter]
    pub fn residual(&self) -> f64 {
        self.inner.residual()
    }

    /// `alpha[0]`.
    #[getter]
    pub fn value(&self) -> f64 {
        self.inner.continuum_value()
    }

    /// `sqrt(variance[0])`.
    #[getter]
    pub fn error(&self) -> f64 {
        self.inner.continuum_error()
    }

    pub fn evaluate(&self, x: f64) -> f64 {
        self.inner.evaluate(x)
    }

    /// `(x, y)` of the fit curve on `[0, x_max]`.
    #[pyo3(signature = (x_max, samples = 100))]
    pub fn sample_curve(&self, x_max: f64, samples: usize) -> (Vec<f64>, Vec<f64>) {
        let (x, y) = self.inner.sample_curve(x_max, samples);
        (x.to_vec(), y.to_vec())
    }
}

/// `value(error)` notation, e.g. `pretty_print(1.2345, 0.0123) == "1.235(12)"`.
#[cfg(feature = "python-bindings")]
#[pyfunction]
#[pyo3(signature = (value, error, extra_err_digits = 1))]
fn pretty_print(value: f64, error: f64, extra_err_digits: usize) -> String {
    analysis::format::pretty_print(value, error, extra_err_digits)
}

/// _nspt_analysis — PyO3 module initializer for the Python extension.
///
/// Key behaviors
/// -------------
/// - Create the `gamma` and `continuum` submodules and attach them.
/// - Register the submodules in `sys.modules` so they are importable via
///   dotted paths from Python.
///
/// Errors
/// ------
/// - `PyErr` if creating submodules or manipulating `sys.modules` fails.
#[cfg(feature = "python-bindings")]
#[pymodule]
fn _nspt_analysis<'py>(_py: Python<'py>, m: &Bound<'py, PyModule>) -> PyResult<()> {
    let gamma_mod = PyModule::new(_py, "gamma")?;
    let continuum_mod = PyModule::new(_py, "continuum")?;
    gamma_module(_py, m, &gamma_mod)?;
    continuum_module(_py, m, &continuum_mod)?;
    m.add_function(wrap_pyfunction!(pretty_print, m)?)?;

    // Manually add submodules into sys.modules to allow for dot notation.
    _py.import("sys")?.getattr("modules")?.set_item("nspt_analysis.gamma", gamma_mod)?;
    _py.import("sys")?.getattr("modules")?.set_item("nspt_analysis.continuum", continuum_mod)?;
    Ok(())
}

#[cfg(feature = "python-bindings")]
fn gamma_module<'py>(
    _py: Python, nspt_analysis: &Bound<'py, PyModule>, m: &Bound<'py, PyModule>,
) -> PyResult<()> {
    m.add_class::<TauInt>()?;
    nspt_analysis.add_submodule(m)?;
    Ok(())
}

#[cfg(feature = "python-bindings")]
fn continuum_module<'py>(
    _py: Python, nspt_analysis: &Bound<'py, PyModule>, m: &Bound<'py, PyModule>,
) -> PyResult<()> {
    m.add_class::<PyContinuumLimit>()?;
    m.add_class::<PyContinuumFit>()?;
    nspt_analysis.add_submodule(m)?;
    Ok(())
}
