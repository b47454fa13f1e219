//! continuum::limit — weighted least-squares extrapolation to zero step size.
//!
//! Purpose
//! -------
//! Fit `y(x) = Σ_k α_k · basis_k(x)` to one data point per step size `x`
//! and propagate the point errors to the coefficients. `α_0` is the
//! continuum value for bases whose first function is the constant.
//!
//! Key behaviors
//! -------------
//! - Points are sorted by ascending `param`; duplicates are rejected.
//! - [`ContinuumLimit::estimate`] drops the first `imin` points and solves
//!   the weighted problem through the SVD pseudo-inverse
//!   `f⁺ = pinv(W·f)`:
//!
//! ```text
//! α     = f⁺ · W · F
//! δ²α_k = Σ_j (f⁺_kj)² · w_j² · σ_j²
//! res   = ‖f · α − F‖₂
//! ```
//!
//! - [`closed_form_intercept_error`] gives the analytic `δα_0` of the
//!   unweighted `{1, x}` fit, used as a cross-check of the SVD path.
//!
//! Invariants & assumptions
//! ------------------------
//! - Errors are propagated to first order and without correlations; the
//!   returned variance is the diagonal only.
//! - Singular values below `ε · max(m, K) · s_max` are treated as zero.
//! - Weights follow their points through sorting and the `imin` cut; they
//!   are finite and non-negative.
//! - The weighted design matrix is checked for finiteness before the SVD.
//!
//! Testing notes
//! -------------
//! - Unit tests cover exact recovery on a line, duplicate rejection, the
//!   `imin` bound, weight invariance for uniform weights, non-uniform
//!   weights against the normal equations, rejection of bad weights and of
//!   basis values that are not finite, and the closed form for two and
//!   three points.

use crate::continuum::{
    basis::Basis,
    errors::{ContinuumError, ContinuumResult},
};
use nalgebra::{DMatrix, DVector};
use ndarray::Array1;

/// One `(param, value, variance)` input point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContinuumPoint {
    pub param: f64,
    pub value: f64,
    pub variance: f64,
}

impl ContinuumPoint {
    pub fn with_variance(param: f64, value: f64, variance: f64) -> ContinuumPoint {
        ContinuumPoint { param, value, variance }
    }

    /// Point from a standard error; stores `error²`.
    pub fn with_error(param: f64, value: f64, error: f64) -> ContinuumPoint {
        ContinuumPoint { param, value, variance: error * error }
    }

    fn is_valid(&self) -> bool {
        self.param.is_finite()
            && self.value.is_finite()
            && self.variance.is_finite()
            && self.variance >= 0.0
    }
}

/// ContinuumLimit — validated point set plus basis and weights.
///
/// Fields
/// ------
/// - `points`: sorted by ascending `param`, parameters unique.
/// - `basis`: fit functions.
/// - `weights`: one per point, in the same (sorted) order.
#[derive(Debug, Clone)]
pub struct ContinuumLimit {
    points: Vec<ContinuumPoint>,
    basis: Basis,
    weights: Vec<f64>,
}

/// ContinuumFit — coefficients and propagated variances of one fit.
#[derive(Debug, Clone)]
pub struct ContinuumFit {
    alpha: Array1<f64>,
    variance: Array1<f64>,
    residual: f64,
    basis: Basis,
    imin: usize,
    used: usize,
}

impl ContinuumLimit {
    /// Validate and sort a point set.
    ///
    /// Parameters
    /// ----------
    /// - `points`: `Vec<ContinuumPoint>`
    ///   One point per step size, any order.
    /// - `basis`: [`Basis`]
    ///   Fit functions.
    /// - `weights`: `Option<Vec<f64>>`
    ///   Per-point weights in the order of `points`; `None` means all 1.
    ///
    /// Returns
    /// -------
    /// `ContinuumResult<ContinuumLimit>`
    ///
    /// Errors
    /// ------
    /// - `ContinuumError::NoPoints` for an empty set.
    /// - `ContinuumError::WeightCountMismatch` when lengths differ.
    /// - `ContinuumError::NonFiniteInput` for NaN/∞ entries or a negative
    ///   variance.
    /// - `ContinuumError::InvalidWeight` for a NaN/∞ or negative weight.
    /// - `ContinuumError::DuplicateParam` when two points share a `param`.
    ///
    /// Examples
    /// --------
    /// ```rust
    /// # use nspt_analysis::continuum::{basis::Basis, limit::{ContinuumLimit, ContinuumPoint}};
    /// let points = vec![
    ///     ContinuumPoint::with_error(0.02, 1.04, 0.01),
    ///     ContinuumPoint::with_error(0.01, 1.02, 0.01),
    /// ];
    /// let fit = ContinuumLimit::new(points, Basis::linear(), None).unwrap().estimate(0).unwrap();
    /// assert!((fit.continuum_value() - 1.0).abs() < 1e-12);
    /// ```
    pub fn new(
        points: Vec<ContinuumPoint>, basis: Basis, weights: Option<Vec<f64>>,
    ) -> ContinuumResult<Self> {
        if points.is_empty() {
            return Err(ContinuumError::NoPoints);
        }
        let weights = weights.unwrap_or_else(|| vec![1.0; points.len()]);
        if weights.len() != points.len() {
            return Err(ContinuumError::WeightCountMismatch {
                points: points.len(),
                weights: weights.len(),
            });
        }
        if let Some(bad) = points.iter().find(|p| !p.is_valid()) {
            return Err(ContinuumError::NonFiniteInput {
                param: bad.param,
                value: bad.value,
                variance: bad.variance,
            });
        }

        if let Some((p, &w)) =
            points.iter().zip(&weights).find(|(_, w)| !w.is_finite() || **w < 0.0)
        {
            return Err(ContinuumError::InvalidWeight { param: p.param, weight: w });
        }

        let mut paired: Vec<(ContinuumPoint, f64)> = points.into_iter().zip(weights).collect();
        paired.sort_by(|a, b| a.0.param.total_cmp(&b.0.param));
        if let Some(pair) = paired.windows(2).find(|w| w[0].0.param == w[1].0.param) {
            return Err(ContinuumError::DuplicateParam {
                param: pair[0].0.param,
                params: paired.iter().map(|(p, _)| p.param).collect(),
            });
        }

        let (points, weights): (Vec<ContinuumPoint>, Vec<f64>) = paired.into_iter().unzip();
        Ok(ContinuumLimit { points, basis, weights })
    }

    pub fn points(&self) -> &[ContinuumPoint] {
        &self.points
    }

    pub fn basis(&self) -> &Basis {
        &self.basis
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// `true` when every weight equals 1.
    pub fn has_unit_weights(&self) -> bool {
        self.weights.iter().all(|&w| w == 1.0)
    }

    /// Fit on the points with index `≥ imin` (ascending `param`).
    ///
    /// Errors
    /// ------
    /// - `ContinuumError::InsufficientData` when `imin ≥ points` or fewer
    ///   than `K` points remain.
    /// - `ContinuumError::NonFiniteBasis` when a basis function (times its
    ///   weight) is not finite at one of the kept points.
    /// - `ContinuumError::SvdFailed` if the pseudo-inverse cannot be built.
    pub fn estimate(&self, imin: usize) -> ContinuumResult<ContinuumFit> {
        let k = self.basis.len();
        let used = self.points.len().saturating_sub(imin);
        if used == 0 || used < k {
            return Err(ContinuumError::InsufficientData {
                points: self.points.len(),
                imin,
                basis: k,
            });
        }
        let points = &self.points[imin..];
        let weights = &self.weights[imin..];

        let design = DMatrix::<f64>::from_fn(used, k, |j, c| {
            self.basis.functions()[c].eval(points[j].param)
        });
        let values = DVector::<f64>::from_iterator(used, points.iter().map(|p| p.value));
        let variances = DVector::<f64>::from_iterator(used, points.iter().map(|p| p.variance));
        let w = DVector::<f64>::from_column_slice(weights);

        let weighted = DMatrix::<f64>::from_fn(used, k, |j, c| w[j] * design[(j, c)]);
        if let Some(idx) = weighted.iter().position(|v| !v.is_finite()) {
            // column-major storage
            let (j, c) = (idx % used, idx / used);
            return Err(ContinuumError::NonFiniteBasis {
                param: points[j].param,
                term: self.basis.functions()[c].name(),
            });
        }
        let finv = pseudo_inverse(weighted)?;

        let alpha = &finv * values.component_mul(&w);
        let finv_sq = finv.map(|v| v * v);
        let w_sq = w.map(|v| v * v);
        let variance = finv_sq * variances.component_mul(&w_sq);
        let residual = (&design * &alpha - &values).norm();

        Ok(ContinuumFit {
            alpha: Array1::from_iter(alpha.iter().copied()),
            variance: Array1::from_iter(variance.iter().copied()),
            residual,
            basis: self.basis.clone(),
            imin,
            used,
        })
    }
}

/// Moore–Penrose pseudo-inverse through nalgebra's SVD.
fn pseudo_inverse(a: DMatrix<f64>) -> ContinuumResult<DMatrix<f64>> {
    let dim = a.nrows().max(a.ncols()) as f64;
    let svd = a.svd(true, true);
    let s_max = svd.singular_values.max();
    let tol = f64::EPSILON * dim * s_max;
    svd.pseudo_inverse(tol).map_err(|reason| ContinuumError::SvdFailed { reason: reason.to_string() })
}

impl ContinuumFit {
    pub fn alpha(&self) -> &Array1<f64> {
        &self.alpha
    }

    /// Diagonal propagated variances of `alpha`.
    pub fn variance(&self) -> &Array1<f64> {
        &self.variance
    }

    /// `sqrt(variance)`.
    pub fn errors(&self) -> Array1<f64> {
        self.variance.mapv(f64::sqrt)
    }

    pub fn residual(&self) -> f64 {
        self.residual
    }

    pub fn continuum_value(&self) -> f64 {
        self.alpha[0]
    }

    pub fn continuum_error(&self) -> f64 {
        self.variance[0].sqrt()
    }

    pub fn basis(&self) -> &Basis {
        &self.basis
    }

    pub fn imin(&self) -> usize {
        self.imin
    }

    /// Number of points that entered the fit.
    pub fn points_used(&self) -> usize {
        self.used
    }

    /// Fitted curve at `x`.
    pub fn evaluate(&self, x: f64) -> f64 {
        self.basis.row(x).iter().zip(self.alpha.iter()).map(|(b, a)| b * a).sum()
    }

    /// Fit curve sampled at `samples` equidistant points on `[0, x_max]`.
    pub fn sample_curve(&self, x_max: f64, samples: usize) -> (Array1<f64>, Array1<f64>) {
        let x = Array1::linspace(0.0, x_max, samples);
        let y = x.mapv(|xi| self.evaluate(xi));
        (x, y)
    }
}

/// Analytic intercept error of the unweighted `{1, x}` fit.
///
/// `δα_0 = sqrt(Σ_j ((Sxx − Sx·x_j)/(n·Sxx − Sx²))² σ_j²)` with
/// `Sx = Σ x_j`, `Sxx = Σ x_j²`, and `n` the number of points.
pub fn closed_form_intercept_error(points: &[ContinuumPoint]) -> f64 {
    let n = points.len() as f64;
    let sx: f64 = points.iter().map(|p| p.param).sum();
    let sxx: f64 = points.iter().map(|p| p.param * p.param).sum();
    let denom = n * sxx - sx * sx;
    points
        .iter()
        .map(|p| {
            let c = (sxx - sx * p.param) / denom;
            c * c * p.variance
        })
        .sum::<f64>()
        .sqrt()
}
