//! gamma::data — validated observable sample sets.
//!
//! Purpose
//! -------
//! Hold the primary observables of a Monte-Carlo-like simulation in the
//! layout `data[α][r][i]` (observable, replicum, measurement) and record the
//! derived bookkeeping (`nobs`, `R`, `N_r`, `N = Σ_r N_r`) once, after
//! validation.
//!
//! Key behaviors
//! -------------
//! - [`ObservableSet::new`] validates shape and finiteness before storing.
//! - [`DataInfo`] exposes replicum and measurement counts used for
//!   normalisation in the Γ-method.
//! - [`means`] computes per-observable means over all replica concatenated.
//! - [`ObservableSet::trim_leading`] drops leading measurements from every
//!   replicum (thermalization scans).
//!
//! Invariants & assumptions
//! ------------------------
//! - Every observable has the same replica count `R`.
//! - Replicum `r` has the same length `N_r` for every observable.
//! - All samples are finite.
//!
//! Conventions
//! -----------
//! - Replica may differ in length from each other; only the cross-observable
//!   agreement is required.

use crate::gamma::{
    errors::GammaResult,
    validation::{validate_finite, validate_shape},
};
use ndarray::{Array1, s};

/// DataInfo — replicum and measurement bookkeeping for a sample set.
///
/// Fields
/// ------
/// - `nobs`: number of observables.
/// - `replica`: number of replica `R`.
/// - `per_replicum`: measurement count `N_r` of each replicum.
/// - `total`: `N = Σ_r N_r`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataInfo {
    pub nobs: usize,
    pub replica: usize,
    pub per_replicum: Vec<usize>,
    pub total: usize,
}

impl DataInfo {
    /// Shortest replicum length, bounding the usable autocorrelation lag.
    pub fn min_replicum_len(&self) -> usize {
        self.per_replicum.iter().copied().min().unwrap_or(0)
    }
}

/// ObservableSet — validated `data[α][r][i]` samples.
///
/// Purpose
/// -------
/// Own the primary observables for one label and guarantee the layout
/// invariants required by the projector and the autocorrelation estimator.
///
/// Fields
/// ------
/// - `data`: `Vec<Vec<Array1<f64>>>`
///   Samples; outer index observable, middle index replicum.
/// - `info`: [`DataInfo`]
///   Counts derived at construction.
///
/// Invariants
/// ----------
/// - `info` always matches `data`; the fields are private so that they cannot
///   drift apart.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservableSet {
    data: Vec<Vec<Array1<f64>>>,
    info: DataInfo,
}

impl ObservableSet {
    /// Build a validated sample set.
    ///
    /// Parameters
    /// ----------
    /// - `data`: `Vec<Vec<Array1<f64>>>`
    ///   Samples indexed as `data[α][r][i]`.
    ///
    /// Returns
    /// -------
    /// `GammaResult<ObservableSet>`
    ///
    /// Errors
    /// ------
    /// - `GammaError::EmptyData`, `ReplicaCountMismatch`,
    ///   `MeasurementCountMismatch` from [`validate_shape`].
    /// - `GammaError::NonFiniteData` from [`validate_finite`].
    ///
    /// Examples
    /// --------
    /// ```rust
    /// # use ndarray::array;
    /// # use nspt_analysis::gamma::data::ObservableSet;
    /// let set = ObservableSet::new(vec![vec![array![1.0, 2.0], array![3.0]]]).unwrap();
    /// assert_eq!(set.info().total, 3);
    /// assert_eq!(set.info().replica, 2);
    /// ```
    pub fn new(data: Vec<Vec<Array1<f64>>>) -> GammaResult<Self> {
        validate_shape(&data)?;
        validate_finite(&data)?;
        let per_replicum: Vec<usize> = data[0].iter().map(|rep| rep.len()).collect();
        let info = DataInfo {
            nobs: data.len(),
            replica: per_replicum.len(),
            total: per_replicum.iter().sum(),
            per_replicum,
        };
        Ok(ObservableSet { data, info })
    }

    /// Build a set with a single observable from its replica.
    pub fn single(replica: Vec<Array1<f64>>) -> GammaResult<Self> {
        Self::new(vec![replica])
    }

    pub fn info(&self) -> &DataInfo {
        &self.info
    }

    /// Replica of observable `alpha`.
    pub fn observable(&self, alpha: usize) -> Option<&[Array1<f64>]> {
        self.data.get(alpha).map(Vec::as_slice)
    }

    pub fn observables(&self) -> &[Vec<Array1<f64>>] {
        &self.data
    }

    /// Drop the first `cut` measurements of every replicum.
    ///
    /// Replica shorter than `cut` become empty. A cut that leaves too few
    /// measurements is reported by the estimator as
    /// `GammaError::InsufficientData`, not here.
    pub fn trim_leading(&self, cut: usize) -> GammaResult<Self> {
        let data = self
            .data
            .iter()
            .map(|replica| {
                replica
                    .iter()
                    .map(|rep| {
                        let start = cut.min(rep.len());
                        rep.slice(s![start..]).to_owned()
                    })
                    .collect()
            })
            .collect();
        Self::new(data)
    }
}

/// Per-observable arithmetic mean over all replica concatenated.
///
/// Replicum boundaries are ignored: the mean of observable `α` is
/// `(1/N) Σ_r Σ_i data[α][r][i]`.
///
/// Examples
/// --------
/// ```rust
/// # use ndarray::array;
/// # use nspt_analysis::gamma::data::{ObservableSet, means};
/// let set = ObservableSet::new(vec![vec![array![1.0, 2.0], array![6.0]]]).unwrap();
/// assert_eq!(means(&set)[0], 3.0);
/// ```
pub fn means(set: &ObservableSet) -> Array1<f64> {
    let n = set.info.total as f64;
    set.data
        .iter()
        .map(|replica| replica.iter().map(|rep| rep.sum()).sum::<f64>() / n)
        .collect()
}
