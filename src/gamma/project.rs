//! gamma::project — linearised projection of observables onto a derived series.
//!
//! Purpose
//! -------
//! Reduce a set of primary observables `a_α^{i,r}` to a single derived
//! series for a scalar function `f(A_1, …, A_nobs)` using the first-order
//! (delta-method) expansion around the observable means:
//!
//! ```text
//! a_f^{i,r} = Σ_α f_α · a_α^{i,r},      f_α = ∂f/∂A_α |_{A = ā}
//! ```
//!
//! Key behaviors
//! -------------
//! - [`Projection::Index`] returns observable `n` unchanged (no derivative).
//! - [`Projection::Function`] evaluates the gradient by central finite
//!   differences with a per-observable step `h_α = sqrt(Γ_αα,naive / N)`,
//!   where `Γ_αα,naive = (1/N) Σ_r Σ_i (a_α^{i,r} − ā_α)²`.
//! - [`DerivedSeries`] carries the projected replica together with the value
//!   of `f` at the means.
//!
//! Invariants & assumptions
//! ------------------------
//! - The step size deliberately uses the naive (uncorrected) variance; it
//!   only sizes the derivative step and is not an error estimate.
//! - A constant observable has `h_α = 0`; differentiating with respect to it
//!   yields `GammaError::NonFiniteDerivative`.
//!
//! Conventions
//! -----------
//! - The user function receives the arguments as a slice of length `nobs`
//!   in observable order.
//!
//! Testing notes
//! -------------
//! - Unit tests cover the identity fast path, the step-size formula, exact
//!   recovery of linear functions, and the ratio derivative.

use crate::gamma::{
    data::{DataInfo, ObservableSet, means},
    errors::{GammaError, GammaResult},
    validation::validate_observable_index,
};
use ndarray::Array1;

/// Projection — selects how observables are reduced to one series.
///
/// Variants
/// --------
/// - `Index(n)`
///   Use observable `n` as is.
/// - `Function(f)`
///   Scalar function of all observables; `f` is called with a slice holding
///   one value per observable.
#[derive(Clone, Copy)]
pub enum Projection<'a> {
    Index(usize),
    Function(&'a dyn Fn(&[f64]) -> f64),
}

impl std::fmt::Debug for Projection<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Projection::Index(n) => write!(f, "Projection::Index({n})"),
            Projection::Function(_) => write!(f, "Projection::Function(..)"),
        }
    }
}

/// DerivedSeries — per-replicum projected samples `a_f[r][i]`.
///
/// Fields
/// ------
/// - `replica`: projected samples, same `(R, N_r)` shape as the input.
/// - `info`: bookkeeping with `nobs = 1`.
/// - `function_value`: `f(ā)` for function projections, `None` for the
///   index fast path.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedSeries {
    replica: Vec<Array1<f64>>,
    info: DataInfo,
    function_value: Option<f64>,
}

impl DerivedSeries {
    /// Wrap already-projected replica.
    ///
    /// Errors
    /// ------
    /// - Any `ObservableSet` validation error for the single-observable set.
    pub fn new(replica: Vec<Array1<f64>>) -> GammaResult<Self> {
        let set = ObservableSet::single(replica)?;
        let info = set.info().clone();
        let replica = set.observables()[0].clone();
        Ok(DerivedSeries { replica, info, function_value: None })
    }

    pub fn replica(&self) -> &[Array1<f64>] {
        &self.replica
    }

    pub fn info(&self) -> &DataInfo {
        &self.info
    }

    pub fn function_value(&self) -> Option<f64> {
        self.function_value
    }

    /// Grand mean over all replica and measurements.
    pub fn mean(&self) -> f64 {
        let sum: f64 = self.replica.iter().map(|rep| rep.sum()).sum();
        sum / self.info.total as f64
    }
}

/// DataProject — means and derivative step sizes for one sample set.
///
/// Purpose
/// -------
/// Precompute the quantities shared by every projection of a sample set:
/// the observable means `ā_α` and the finite-difference steps `h_α`.
///
/// Fields
/// ------
/// - `set`: borrowed sample set.
/// - `means`: `ā_α`.
/// - `step`: `h_α = sqrt(Γ_αα,naive / N)`.
#[derive(Debug, Clone)]
pub struct DataProject<'a> {
    set: &'a ObservableSet,
    means: Array1<f64>,
    step: Array1<f64>,
}

impl<'a> DataProject<'a> {
    /// Compute means and step sizes.
    ///
    /// Errors
    /// ------
    /// - `GammaError::InsufficientData` when the set holds no measurement.
    ///
    /// Examples
    /// --------
    /// ```rust
    /// # use ndarray::array;
    /// # use nspt_analysis::gamma::{data::ObservableSet, project::DataProject};
    /// let set = ObservableSet::new(vec![vec![array![1.0, 3.0]]]).unwrap();
    /// let proj = DataProject::new(&set).unwrap();
    /// // naive variance 1, N = 2  =>  h = sqrt(1/2)
    /// assert!((proj.step()[0] - 0.5_f64.sqrt()).abs() < 1e-15);
    /// ```
    pub fn new(set: &'a ObservableSet) -> GammaResult<Self> {
        let total = set.info().total;
        if total == 0 {
            return Err(GammaError::InsufficientData { samples: total });
        }
        let n = total as f64;
        let means = means(set);
        let step = set
            .observables()
            .iter()
            .zip(means.iter())
            .map(|(replica, &mean)| {
                let ssq: f64 = replica
                    .iter()
                    .map(|rep| rep.iter().map(|&x| (x - mean) * (x - mean)).sum::<f64>())
                    .sum();
                (ssq / n / n).sqrt()
            })
            .collect();
        Ok(DataProject { set, means, step })
    }

    pub fn means(&self) -> &Array1<f64> {
        &self.means
    }

    pub fn step(&self) -> &Array1<f64> {
        &self.step
    }

    /// Project the sample set onto a single derived series.
    ///
    /// Parameters
    /// ----------
    /// - `projection`: [`Projection`]
    ///   Index fast path or general scalar function.
    ///
    /// Returns
    /// -------
    /// `GammaResult<DerivedSeries>`
    ///   For `Index(n)`, exactly `data[n]`. For `Function(f)`, the
    ///   linearised series `Σ_α f_α · data[α]`.
    ///
    /// Errors
    /// ------
    /// - `GammaError::ObservableOutOfRange` for an invalid index.
    /// - `GammaError::NonFiniteDerivative` when a gradient component is NaN
    ///   or ±∞ (including constant observables, where `h_α = 0`).
    pub fn project(&self, projection: Projection<'_>) -> GammaResult<DerivedSeries> {
        let info = self.set.info();
        match projection {
            Projection::Index(n) => {
                validate_observable_index(n, info.nobs)?;
                let replica = self.set.observables()[n].clone();
                Ok(DerivedSeries { replica, info: single_info(info), function_value: None })
            }
            Projection::Function(f) => {
                let grad = self.gradient(f)?;
                let replica = (0..info.replica)
                    .map(|r| {
                        let mut acc = Array1::<f64>::zeros(info.per_replicum[r]);
                        for (replica, &f_alpha) in self.set.observables().iter().zip(grad.iter())
                        {
                            acc.scaled_add(f_alpha, &replica[r]);
                        }
                        acc
                    })
                    .collect();
                let function_value = f(&self.means.to_vec());
                Ok(DerivedSeries {
                    replica,
                    info: single_info(info),
                    function_value: Some(function_value),
                })
            }
        }
    }

    /// Central-difference gradient of `f` at the means.
    ///
    /// `f_α = (f(ā + h_α e_α) − f(ā − h_α e_α)) / (2 h_α)`.
    pub fn gradient(&self, f: &dyn Fn(&[f64]) -> f64) -> GammaResult<Array1<f64>> {
        let mut args = self.means.to_vec();
        let mut grad = Array1::<f64>::zeros(args.len());
        for (alpha, &h) in self.step.iter().enumerate() {
            let center = args[alpha];
            args[alpha] = center + h;
            let upper = f(&args);
            args[alpha] = center - h;
            let lower = f(&args);
            args[alpha] = center;

            let value = (upper - lower) / (2.0 * h);
            if !value.is_finite() {
                return Err(GammaError::NonFiniteDerivative { observable: alpha, value });
            }
            grad[alpha] = value;
        }
        Ok(grad)
    }
}

fn single_info(info: &DataInfo) -> DataInfo {
    DataInfo { nobs: 1, ..info.clone() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - The index fast path returning the observable unchanged.
    // - Step sizes from the naive variance.
    // - Exact linear projections and the ratio derivative.
    // - Failure on constant observables.
    // -------------------------------------------------------------------------

    fn two_observables() -> ObservableSet {
        ObservableSet::new(vec![
            vec![array![1.0, 2.0, 3.0, 4.0], array![2.0, 3.0]],
            vec![array![2.0, 2.5, 1.5, 2.0], array![2.5, 1.5]],
        ])
        .unwrap()
    }

    #[test]
    // Purpose
    // -------
    // The index projection returns `data[n]` bit-for-bit.
    //
    // Given
    // -----
    // - Two observables; projection `Index(1)`.
    //
    // Expect
    // ------
    // - Replica equal to observable 1, no function value.
    fn project_index_returns_observable_unchanged() {
        // Arrange
        let set = two_observables();
        let proj = DataProject::new(&set).unwrap();

        // Act
        let derived = proj.project(Projection::Index(1)).unwrap();

        // Assert
        assert_eq!(derived.replica(), set.observable(1).unwrap());
        assert_eq!(derived.function_value(), None);
        assert_eq!(derived.info().nobs, 1);
    }

    #[test]
    // Purpose
    // -------
    // Step sizes follow `h = sqrt(Σ (x − m)² / N²)`.
    //
    // Given
    // -----
    // - Observable 0 with samples 1, 2, 3, 4, 2, 3 (N = 6, mean 2.5).
    //
    // Expect
    // ------
    // - Σ (x − m)² = 5.5, h = sqrt(5.5 / 36).
    fn step_uses_naive_variance_over_n() {
        // Arrange
        let set = two_observables();

        // Act
        let proj = DataProject::new(&set).unwrap();

        // Assert
        assert_relative_eq!(proj.means()[0], 2.5, epsilon = 1e-15);
        assert_relative_eq!(proj.step()[0], (5.5_f64 / 36.0).sqrt(), epsilon = 1e-15);
    }

    #[test]
    // Purpose
    // -------
    // A linear function is projected exactly.
    //
    // Given
    // -----
    // - `f(A, B) = 2A − 3B`.
    //
    // Expect
    // ------
    // - Derived series equals `2·a_0 − 3·a_1` element-wise (central
    //   differences are exact for linear maps up to rounding).
    fn project_linear_function_matches_direct_combination() {
        // Arrange
        let set = two_observables();
        let proj = DataProject::new(&set).unwrap();
        let f = |a: &[f64]| 2.0 * a[0] - 3.0 * a[1];

        // Act
        let derived = proj.project(Projection::Function(&f)).unwrap();

        // Assert
        let obs0 = set.observable(0).unwrap();
        let obs1 = set.observable(1).unwrap();
        for r in 0..2 {
            for i in 0..obs0[r].len() {
                let expected = 2.0 * obs0[r][i] - 3.0 * obs1[r][i];
                assert_relative_eq!(derived.replica()[r][i], expected, epsilon = 1e-9);
            }
        }
        let m = proj.means();
        assert_relative_eq!(
            derived.function_value().unwrap(),
            2.0 * m[0] - 3.0 * m[1],
            epsilon = 1e-12
        );
    }

    #[test]
    // Purpose
    // -------
    // The ratio gradient matches the analytic derivative.
    //
    // Given
    // -----
    // - `f(A, B) = A / B`.
    //
    // Expect
    // ------
    // - `f_A ≈ 1/B̄`, `f_B ≈ −Ā/B̄²` to finite-difference accuracy.
    fn gradient_of_ratio_matches_analytic() {
        // Arrange
        let set = two_observables();
        let proj = DataProject::new(&set).unwrap();
        let f = |a: &[f64]| a[0] / a[1];

        // Act
        let grad = proj.gradient(&f).unwrap();

        // Assert
        let m = proj.means();
        assert_relative_eq!(grad[0], 1.0 / m[1], max_relative = 1e-3);
        assert_relative_eq!(grad[1], -m[0] / (m[1] * m[1]), max_relative = 1e-2);
    }

    #[test]
    // Purpose
    // -------
    // A constant observable has zero step; differentiating fails cleanly.
    //
    // Given
    // -----
    // - Observable 1 constant; `f(A, B) = A + B`.
    //
    // Expect
    // ------
    // - `NonFiniteDerivative { observable: 1, .. }`.
    fn gradient_rejects_constant_observable() {
        // Arrange
        let set = ObservableSet::new(vec![
            vec![array![1.0, 2.0, 3.0]],
            vec![array![5.0, 5.0, 5.0]],
        ])
        .unwrap();
        let proj = DataProject::new(&set).unwrap();
        let f = |a: &[f64]| a[0] + a[1];

        // Act
        let err = proj.project(Projection::Function(&f)).unwrap_err();

        // Assert
        assert!(matches!(err, GammaError::NonFiniteDerivative { observable: 1, .. }));
    }
}
