//! analysis::actions — the `show`, `extrapolate` and `therm` actions.
//!
//! Purpose
//! -------
//! Drive the Γ-method estimator and the continuum fit over the labels and
//! orders a plan asks for, log the results in `value(error)` notation and
//! return them as plain report values.
//!
//! Key behaviors
//! -------------
//! - [`show`]: mean, error and `τ_int` per label and order.
//! - [`extrapolate`]: per order and lattice size, one continuum fit over the
//!   labels with that size; the `{1, x}` case is cross-checked against the
//!   closed-form intercept error. Matching plot requests receive the points,
//!   the continuum point and the fit curve.
//! - [`therm`]: re-estimate after dropping `cutoff` leading measurements of
//!   every replicum, for each cutoff of the scan.
//! - [`run`] executes the actions of a plan in order; [`run_file`] reads,
//!   loads and runs a plan file.
//!
//! Invariants & assumptions
//! ------------------------
//! - Failures abort the action with the unit they occurred in:
//!   `AnalysisError::Estimation { label, order, .. }` or
//!   `AnalysisError::Extrapolation { order, lattice_size, .. }`.
//! - Labels are visited in sorted order.
//!
//! Conventions
//! -----------
//! - All tuning lives in [`AnalysisOptions`], passed explicitly; there is
//!   no global state.

use crate::{
    analysis::{
        config::read_plan,
        errors::{AnalysisError, AnalysisResult},
        format::pretty_print,
        loader::{LabelData, load_plan_data},
        plan::{Action, AnalysisPlan, ExtrapolateAction, ThermRange},
        plots::{FitCurve, PlotData, PointGroup},
    },
    continuum::limit::{ContinuumFit, ContinuumLimit, ContinuumPoint, closed_form_intercept_error},
    gamma::{
        project::Projection,
        tauint::{TauIntOptions, TauIntOutcome, WindowDiagnostics},
    },
};
use std::{collections::BTreeMap, path::Path};
use tracing::{info, warn};

/// Largest accepted relative deviation between the SVD and closed-form
/// intercept errors.
pub const CROSS_CHECK_TOLERANCE: f64 = 1e-12;

/// AnalysisOptions — knobs shared by all actions.
///
/// Fields
/// ------
/// - `diagnostics`: attach [`WindowDiagnostics`] to every estimate.
/// - `extra_err_digits`: extra error digits in logged values.
/// - `fit_samples`: number of points of each sampled fit curve.
/// - `estimator`: Γ-method options.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalysisOptions {
    pub diagnostics: bool,
    pub extra_err_digits: usize,
    pub fit_samples: usize,
    pub estimator: TauIntOptions,
}

impl AnalysisOptions {
    pub fn new(diagnostics: bool, extra_err_digits: usize, fit_samples: usize) -> AnalysisOptions {
        AnalysisOptions { diagnostics, extra_err_digits, fit_samples, estimator: TauIntOptions::default() }
    }
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        AnalysisOptions::new(false, 1, 100)
    }
}

/// Estimate — Γ-method result of one (label, order).
#[derive(Debug, Clone, PartialEq)]
pub struct Estimate {
    pub label: String,
    pub order: usize,
    pub tau: f64,
    pub lattice_size: u32,
    pub mean: f64,
    pub error: f64,
    pub tau_int: f64,
    pub tau_int_error: f64,
    pub window: usize,
    pub diagnostics: Option<WindowDiagnostics>,
}

/// One row of a thermalization scan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThermPoint {
    pub cutoff: usize,
    pub mean: f64,
    pub error: f64,
}

/// Thermalization scan of one (label, order).
#[derive(Debug, Clone, PartialEq)]
pub struct ThermScan {
    pub label: String,
    pub order: usize,
    pub rows: Vec<ThermPoint>,
}

/// ContinuumEstimate — fit of one (order, lattice size).
#[derive(Debug, Clone)]
pub struct ContinuumEstimate {
    pub order: usize,
    pub lattice_size: u32,
    pub points: Vec<Estimate>,
    pub fit: ContinuumFit,
}

impl ContinuumEstimate {
    pub fn value(&self) -> f64 {
        self.fit.continuum_value()
    }

    pub fn error(&self) -> f64 {
        self.fit.continuum_error()
    }
}

/// Output of one `extrapolate` action.
#[derive(Debug, Clone)]
pub struct ExtrapolationReport {
    pub results: Vec<ContinuumEstimate>,
    pub plots: Vec<PlotData>,
}

/// ActionReport — output of one plan action.
#[derive(Debug, Clone)]
pub enum ActionReport {
    Show(Vec<Estimate>),
    Extrapolate(ExtrapolationReport),
    Therm(Vec<ThermScan>),
}

/// Run the Γ-method on order `order` of one label.
///
/// Errors
/// ------
/// - `AnalysisError::Estimation` wrapping the estimator failure, including
///   `ObservableOutOfRange` for an order the data does not hold.
pub fn estimate_label(
    data: &LabelData, order: usize, opts: &AnalysisOptions,
) -> AnalysisResult<Estimate> {
    let out = TauIntOutcome::tauint(&data.data, Projection::Index(order), &opts.estimator)
        .map_err(|source| AnalysisError::Estimation { label: data.label.clone(), order, source })?;
    Ok(Estimate {
        label: data.label.clone(),
        order,
        tau: data.tau,
        lattice_size: data.lattice_size,
        mean: out.mean(),
        error: out.error(),
        tau_int: out.tau_int(),
        tau_int_error: out.tau_int_error(),
        window: out.window(),
        diagnostics: opts.diagnostics.then(|| out.diagnostics()),
    })
}

fn log_estimate(est: &Estimate, opts: &AnalysisOptions) {
    info!(
        label = %est.label,
        order = est.order,
        mean = %pretty_print(est.mean, est.error, opts.extra_err_digits),
        tint = %pretty_print(est.tau_int, est.tau_int_error, opts.extra_err_digits),
        "estimate"
    );
}

/// Mean, error and `τ_int` for every label and requested order.
pub fn show(
    data: &BTreeMap<String, LabelData>, orders: &[usize], opts: &AnalysisOptions,
) -> AnalysisResult<Vec<Estimate>> {
    let mut out = Vec::with_capacity(data.len() * orders.len());
    for label in data.values() {
        for &order in orders {
            let est = estimate_label(label, order, opts)?;
            log_estimate(&est, opts);
            out.push(est);
        }
    }
    Ok(out)
}

/// Scan thermalization cutoffs.
///
/// For each label, order and cutoff `nc` of `range`, drop the first `nc`
/// measurements of every replicum and re-run the estimator.
///
/// Errors
/// ------
/// - `AnalysisError::Estimation` when a cutoff leaves too little data.
pub fn therm(
    data: &BTreeMap<String, LabelData>, orders: &[usize], range: &ThermRange,
    opts: &AnalysisOptions,
) -> AnalysisResult<Vec<ThermScan>> {
    let cutoffs = range.cutoffs();
    let mut scans = Vec::new();
    for label in data.values() {
        for &order in orders {
            let wrap = |source| AnalysisError::Estimation { label: label.label.clone(), order, source };
            let mut rows = Vec::with_capacity(cutoffs.len());
            for &cutoff in &cutoffs {
                let trimmed = label.data.trim_leading(cutoff).map_err(wrap)?;
                let out = TauIntOutcome::tauint(&trimmed, Projection::Index(order), &opts.estimator)
                    .map_err(wrap)?;
                info!(
                    label = %label.label,
                    order,
                    cutoff,
                    mean = %pretty_print(out.mean(), out.error(), opts.extra_err_digits),
                    "thermalization cut"
                );
                rows.push(ThermPoint { cutoff, mean: out.mean(), error: out.error() });
            }
            scans.push(ThermScan { label: label.label.clone(), order, rows });
        }
    }
    Ok(scans)
}

/// Extrapolate every requested order to `τ → 0`, per lattice size.
///
/// Parameters
/// ----------
/// - `data`: loaded labels.
/// - `action`: orders, optional lattice sizes (default: every size present,
///   ascending), basis and plot requests.
/// - `opts`: estimator and output options.
///
/// Returns
/// -------
/// `AnalysisResult<ExtrapolationReport>` with one [`ContinuumEstimate`] per
/// (order, lattice size) that has data, and one [`PlotData`] per request.
///
/// Errors
/// ------
/// - `AnalysisError::Estimation` from any contributing label.
/// - `AnalysisError::Extrapolation` when the fit fails, e.g. two labels
///   share a step size or there are fewer labels than basis functions.
/// - `AnalysisError::CrossCheck` when the `{1, x}` intercept error differs
///   from the closed form by more than [`CROSS_CHECK_TOLERANCE`].
///
/// Notes
/// -----
/// - A requested lattice size without labels is skipped with a warning.
pub fn extrapolate(
    data: &BTreeMap<String, LabelData>, action: &ExtrapolateAction, opts: &AnalysisOptions,
) -> AnalysisResult<ExtrapolationReport> {
    let sizes = match &action.lattice_sizes {
        Some(sizes) => sizes.clone(),
        None => {
            let mut sizes: Vec<u32> = data.values().map(|d| d.lattice_size).collect();
            sizes.sort_unstable();
            sizes.dedup();
            sizes
        }
    };
    let mut plots: Vec<PlotData> = action.plots.iter().map(PlotData::from_request).collect();
    let mut results = Vec::new();

    for &order in &action.orders {
        info!(order, "extrapolating to tau -> 0");
        for &lattice_size in &sizes {
            let labels: Vec<&LabelData> =
                data.values().filter(|d| d.lattice_size == lattice_size).collect();
            if labels.is_empty() {
                warn!(order, lattice_size, "no data for requested lattice size, skipping");
                continue;
            }
            let mut points = Vec::with_capacity(labels.len());
            for label in labels {
                let est = estimate_label(label, order, opts)?;
                log_estimate(&est, opts);
                points.push(est);
            }

            let fit = fit_points(&points, action, order, lattice_size)?;
            info!(
                order,
                lattice_size,
                cl = %pretty_print(fit.continuum_value(), fit.continuum_error(), opts.extra_err_digits),
                residual = fit.residual(),
                "continuum limit"
            );

            let result = ContinuumEstimate { order, lattice_size, points, fit };
            for (plot, request) in plots.iter_mut().zip(&action.plots) {
                if request.wants(lattice_size, order) {
                    plot.groups.push(point_group(&result, opts.fit_samples));
                }
            }
            results.push(result);
        }
    }
    Ok(ExtrapolationReport { results, plots })
}

fn fit_points(
    points: &[Estimate], action: &ExtrapolateAction, order: usize, lattice_size: u32,
) -> AnalysisResult<ContinuumFit> {
    let wrap = |source| AnalysisError::Extrapolation { order, lattice_size, source };
    let input = points.iter().map(|p| ContinuumPoint::with_error(p.tau, p.mean, p.error)).collect();
    let limit = ContinuumLimit::new(input, action.basis.clone(), None).map_err(wrap)?;
    let fit = limit.estimate(0).map_err(wrap)?;

    if action.basis.is_linear() && limit.has_unit_weights() {
        let svd = fit.continuum_error();
        let closed_form = closed_form_intercept_error(&limit.points()[fit.imin()..]);
        if closed_form > 0.0 && ((svd - closed_form) / closed_form).abs() > CROSS_CHECK_TOLERANCE {
            return Err(AnalysisError::CrossCheck { order, lattice_size, svd, closed_form });
        }
    }
    Ok(fit)
}

fn point_group(result: &ContinuumEstimate, samples: usize) -> PointGroup {
    let x: Vec<f64> = result.points.iter().map(|p| p.tau).collect();
    let x_max = x.iter().copied().fold(0.0, f64::max);
    let (fx, fy) = result.fit.sample_curve(x_max, samples);
    PointGroup {
        order: result.order,
        lattice_size: result.lattice_size,
        legend: format!("$L = {}$", result.lattice_size),
        y: result.points.iter().map(|p| p.mean).collect(),
        dy: result.points.iter().map(|p| p.error).collect(),
        x,
        continuum: (result.value(), result.error()),
        fit: FitCurve { x: fx, y: fy },
    }
}

/// Execute the actions of `plan` in order on loaded data.
pub fn run(
    plan: &AnalysisPlan, data: &BTreeMap<String, LabelData>, opts: &AnalysisOptions,
) -> AnalysisResult<Vec<ActionReport>> {
    plan.actions
        .iter()
        .map(|action| match action {
            Action::Show { orders } => show(data, orders, opts).map(ActionReport::Show),
            Action::Extrapolate(ex) => extrapolate(data, ex, opts).map(ActionReport::Extrapolate),
            Action::Therm { orders, range } => {
                therm(data, orders, range, opts).map(ActionReport::Therm)
            }
        })
        .collect()
}

/// Read a plan file, load its directories and run its actions.
pub fn run_file(
    path: impl AsRef<Path>, opts: &AnalysisOptions,
) -> AnalysisResult<(AnalysisPlan, Vec<ActionReport>)> {
    let plan = read_plan(path)?;
    info!("\n{plan}");
    let data = load_plan_data(&plan)?;
    let reports = run(&plan, &data, opts)?;
    Ok((plan, reports))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::plan::PlotRequest,
        continuum::{basis::Basis, errors::ContinuumError},
        gamma::{data::ObservableSet, errors::GammaError},
    };
    use approx::assert_relative_eq;
    use ndarray::Array1;
    use std::path::PathBuf;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - `show` over labels and orders, with and without diagnostics.
    // - `extrapolate` on labels whose means lie exactly on a line, default
    //   lattice sizes, plot filling, and error wrapping.
    // - `therm` cutoff scans.
    //
    // Data are built in memory; file loading is covered in `loader` and the
    // integration tests.
    // -------------------------------------------------------------------------

    /// Deterministic zero-mean pattern with a decaying autocorrelation.
    fn pattern(len: usize) -> Array1<f64> {
        Array1::from_iter((0..len).map(|i| ((i * 37 % 17) as f64) - 8.0))
    }

    /// Label whose order `o` has mean `value(o)`.
    fn label(name: &str, tau: f64, lattice_size: u32, value: impl Fn(usize) -> f64) -> LabelData {
        let base = pattern(340);
        let shift = base.mean().unwrap_or(0.0);
        let obs = (0..2)
            .map(|o| vec![base.mapv(|v| (v - shift) * 1e-3 + value(o))])
            .collect();
        LabelData {
            label: name.to_string(),
            tau,
            lattice_size,
            files: vec![PathBuf::from(format!("{name}.bin"))],
            data: ObservableSet::new(obs).unwrap(),
        }
    }

    fn dataset() -> BTreeMap<String, LabelData> {
        // order o: mean = (o + 1) + 10·τ on L = 4; order 0 also on L = 6
        let mut data = BTreeMap::new();
        for (name, tau, l) in [("a", 0.01, 4), ("b", 0.02, 4), ("c", 0.04, 4), ("d", 0.02, 6)] {
            data.insert(name.to_string(), label(name, tau, l, |o| (o + 1) as f64 + 10.0 * tau));
        }
        data
    }

    #[test]
    // Purpose
    // -------
    // `show` estimates every (label, order) pair in label order.
    //
    // Given
    // -----
    // - Four labels, orders [1, 0], diagnostics on.
    //
    // Expect
    // ------
    // - Eight estimates, first for label "a", order 1, with diagnostics.
    fn show_estimates_every_label_and_order() {
        // Arrange
        let data = dataset();
        let opts = AnalysisOptions::new(true, 1, 100);

        // Act
        let out = show(&data, &[1, 0], &opts).unwrap();

        // Assert
        assert_eq!(out.len(), 8);
        assert_eq!((out[0].label.as_str(), out[0].order), ("a", 1));
        assert_relative_eq!(out[0].mean, 2.1, epsilon = 1e-10);
        assert!(out[0].error > 0.0);
        assert!(out.iter().all(|e| e.diagnostics.is_some()));
    }

    #[test]
    // Purpose
    // -------
    // A missing order is reported with the label it was requested for.
    //
    // Given
    // -----
    // - Labels with two orders; order 5 requested.
    //
    // Expect
    // ------
    // - `Estimation { label: "a", order: 5, source: ObservableOutOfRange }`.
    fn show_wraps_estimator_errors_with_label() {
        let err = show(&dataset(), &[5], &AnalysisOptions::default()).unwrap_err();
        match err {
            AnalysisError::Estimation { label, order, source } => {
                assert_eq!((label.as_str(), order), ("a", 5));
                assert!(matches!(source, GammaError::ObservableOutOfRange { .. }));
            }
            other => panic!("expected Estimation, got {other:?}"),
        }
    }

    #[test]
    // Purpose
    // -------
    // Means on a straight line extrapolate to the intercept, the closed-form
    // cross-check passes, and plots receive their groups.
    //
    // Given
    // -----
    // - L = 4 labels with means (o + 1) + 10·τ; L = 6 requested explicitly.
    // - A plot for (L = 4, order 1).
    //
    // Expect
    // ------
    // - Continuum value (o + 1) for L = 4; one plot group with legend
    //   "$L = 4$", three points and a fit curve ending at the largest τ.
    fn extrapolate_recovers_intercept_and_fills_plots() {
        // Arrange
        let data = dataset();
        let action = ExtrapolateAction {
            orders: vec![0, 1],
            lattice_sizes: Some(vec![4]),
            basis: Basis::linear(),
            plots: vec![PlotRequest {
                lattice_sizes: vec![4],
                orders: vec![1],
                pdfname: "o1.pdf".to_string(),
                ylabel: String::new(),
                known: vec![2.0],
            }],
        };
        let opts = AnalysisOptions::new(false, 1, 11);

        // Act
        let report = extrapolate(&data, &action, &opts).unwrap();

        // Assert
        assert_eq!(report.results.len(), 2);
        assert_relative_eq!(report.results[0].value(), 1.0, epsilon = 1e-9);
        assert_relative_eq!(report.results[1].value(), 2.0, epsilon = 1e-9);
        assert!(report.results[1].error() > 0.0);

        let plot = &report.plots[0];
        assert_eq!(plot.groups.len(), 1);
        let group = &plot.groups[0];
        assert_eq!(group.legend, "$L = 4$");
        assert_eq!(group.x, vec![0.01, 0.02, 0.04]);
        assert_eq!(group.fit.x.len(), 11);
        assert_relative_eq!(group.fit.x[10], 0.04);
        assert_relative_eq!(group.fit.y[0], 2.0, epsilon = 1e-9);
        assert!(plot.comparisons()[0].1.is_compatible(1e-3));
    }

    #[test]
    // Purpose
    // -------
    // Without explicit sizes every size present is used; a single label at
    // a size cannot support a two-parameter fit.
    //
    // Given
    // -----
    // - Sizes {4, 6}; size 6 has one label.
    //
    // Expect
    // ------
    // - `Extrapolation { order: 0, lattice_size: 6, InsufficientData }`.
    fn extrapolate_default_sizes_reports_underdetermined_fit() {
        // Arrange
        let action = ExtrapolateAction {
            orders: vec![0],
            lattice_sizes: None,
            basis: Basis::linear(),
            plots: Vec::new(),
        };

        // Act
        let err = extrapolate(&dataset(), &action, &AnalysisOptions::default()).unwrap_err();

        // Assert
        match err {
            AnalysisError::Extrapolation { order, lattice_size, source } => {
                assert_eq!((order, lattice_size), (0, 6));
                assert!(matches!(source, ContinuumError::InsufficientData { .. }));
            }
            other => panic!("expected Extrapolation, got {other:?}"),
        }
    }

    #[test]
    // Purpose
    // -------
    // Requested sizes without data are skipped.
    //
    // Given
    // -----
    // - Sizes [8, 4]; no label has L = 8.
    //
    // Expect
    // ------
    // - Only the L = 4 result.
    fn extrapolate_skips_sizes_without_data() {
        let action = ExtrapolateAction {
            orders: vec![0],
            lattice_sizes: Some(vec![8, 4]),
            basis: Basis::linear(),
            plots: Vec::new(),
        };
        let report = extrapolate(&dataset(), &action, &AnalysisOptions::default()).unwrap();
        assert_eq!(report.results.len(), 1);
        assert_eq!(report.results[0].lattice_size, 4);
    }

    #[test]
    // Purpose
    // -------
    // A basis that diverges at a label's step size fails the unit with an
    // error instead of aborting the run.
    //
    // Given
    // -----
    // - An extra L = 4 label at τ = 0 (the plan default) and basis "1 x^-1".
    //
    // Expect
    // ------
    // - `Extrapolation { order: 0, lattice_size: 4, NonFiniteBasis }` at param 0.
    fn extrapolate_reports_divergent_basis_at_zero_step() {
        // Arrange
        let mut data = dataset();
        data.insert("z".to_string(), label("z", 0.0, 4, |o| (o + 1) as f64));
        let action = ExtrapolateAction {
            orders: vec![0],
            lattice_sizes: Some(vec![4]),
            basis: "1 x^-1".parse().unwrap(),
            plots: Vec::new(),
        };

        // Act
        let err = extrapolate(&data, &action, &AnalysisOptions::default()).unwrap_err();

        // Assert
        match err {
            AnalysisError::Extrapolation { order, lattice_size, source } => {
                assert_eq!((order, lattice_size), (0, 4));
                assert_eq!(
                    source,
                    ContinuumError::NonFiniteBasis { param: 0.0, term: "x^-1".to_string() }
                );
            }
            other => panic!("expected Extrapolation, got {other:?}"),
        }
    }

    #[test]
    // Purpose
    // -------
    // The scan has one row per cutoff and a zero cutoff matches `show`.
    //
    // Given
    // -----
    // - Label "a" only, order 0, cutoffs 0, 20, 40.
    //
    // Expect
    // ------
    // - Three rows; the first equals the untrimmed estimate.
    fn therm_scans_cutoffs() {
        // Arrange
        let mut data = dataset();
        data.retain(|k, _| k == "a");
        let range = ThermRange { start: 0, end: 60, step: 20 };
        let opts = AnalysisOptions::default();

        // Act
        let scans = therm(&data, &[0], &range, &opts).unwrap();
        let full = show(&data, &[0], &opts).unwrap();

        // Assert
        assert_eq!(scans.len(), 1);
        let rows = &scans[0].rows;
        assert_eq!(rows.iter().map(|r| r.cutoff).collect::<Vec<_>>(), vec![0, 20, 40]);
        assert_eq!(rows[0].mean, full[0].mean);
        assert_eq!(rows[0].error, full[0].error);
    }
}
