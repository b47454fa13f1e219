//! analysis::plots — plot-ready extrapolation output.
//!
//! Purpose
//! -------
//! Collect what a renderer needs to draw one continuum-limit figure: the
//! `(τ, value, error)` points per lattice size, the extrapolated point at
//! `τ = 0`, the sampled fit curve, and optional reference values. Nothing
//! here renders; the data are handed to whatever the embedding application
//! uses for figures.
//!
//! Key behaviors
//! -------------
//! - One [`PlotData`] per `<plot>` request; [`PointGroup`]s are appended in
//!   the order `(order, lattice size)` pairs are processed.
//! - [`KnownComparison`] measures how far a continuum value lies from a
//!   reference value in units of its error, with a two-sided normal
//!   p-value.

use crate::analysis::plan::PlotRequest;
use ndarray::Array1;
use statrs::function::erf::erfc;
use std::f64::consts::SQRT_2;

/// Sampled fit curve.
#[derive(Debug, Clone, PartialEq)]
pub struct FitCurve {
    pub x: Array1<f64>,
    pub y: Array1<f64>,
}

/// PointGroup — data and fit of one `(order, lattice size)` pair.
///
/// Fields
/// ------
/// - `legend`: `"$L = <L>$"`.
/// - `x`, `y`, `dy`: step sizes, means and errors of the contributing labels.
/// - `continuum`: `(value, error)` at `τ = 0`.
/// - `fit`: fit curve on `[0, max τ]`.
#[derive(Debug, Clone, PartialEq)]
pub struct PointGroup {
    pub order: usize,
    pub lattice_size: u32,
    pub legend: String,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub dy: Vec<f64>,
    pub continuum: (f64, f64),
    pub fit: FitCurve,
}

/// PlotData — everything one figure shows.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotData {
    pub pdfname: String,
    pub ylabel: String,
    pub groups: Vec<PointGroup>,
    pub known: Vec<f64>,
}

impl PlotData {
    /// Empty figure for a plot request.
    pub fn from_request(request: &PlotRequest) -> PlotData {
        PlotData {
            pdfname: request.pdfname.clone(),
            ylabel: request.ylabel.clone(),
            groups: Vec::new(),
            known: request.known.clone(),
        }
    }

    /// Largest step size over all groups, `0` for an empty figure.
    pub fn max_x(&self) -> f64 {
        self.groups.iter().flat_map(|g| g.x.iter().copied()).fold(0.0, f64::max)
    }

    /// Every continuum point compared with every reference value.
    ///
    /// Entries are ordered by group, then by reference value.
    pub fn comparisons(&self) -> Vec<(String, KnownComparison)> {
        self.groups
            .iter()
            .flat_map(|g| {
                self.known.iter().map(move |&known| {
                    let (value, error) = g.continuum;
                    (g.legend.clone(), KnownComparison::new(known, value, error))
                })
            })
            .collect()
    }
}

/// KnownComparison — continuum value against a reference value.
///
/// Fields
/// ------
/// - `pull`: `(value − known) / error`.
/// - `p_value`: `P(|Z| ≥ |pull|)` for standard normal `Z`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KnownComparison {
    pub known: f64,
    pub value: f64,
    pub error: f64,
    pub pull: f64,
    pub p_value: f64,
}

impl KnownComparison {
    /// Compare `value ± error` with `known`.
    ///
    /// Notes
    /// -----
    /// - With a zero error the pull is `±∞` (p-value 0) unless the value
    ///   equals the reference exactly, in which case it is `0` (p-value 1).
    pub fn new(known: f64, value: f64, error: f64) -> KnownComparison {
        let diff = value - known;
        let pull = if diff == 0.0 { 0.0 } else { diff / error };
        let p_value = erfc(pull.abs() / SQRT_2);
        KnownComparison { known, value, error, pull, p_value }
    }

    /// `true` if the reference lies within `sigmas` errors.
    pub fn is_compatible(&self, sigmas: f64) -> bool {
        self.pull.abs() <= sigmas
    }
}
