//! gamma::tauint — integrated autocorrelation time and error of the mean.
//!
//! Purpose
//! -------
//! Turn the autocovariance Γ(W) of a derived series into the Γ-method error
//! estimate `(mean, error, τ_int, δτ_int)` with an automatically chosen
//! summation window `W*`.
//!
//! Key behaviors
//! -------------
//! - `τ_int(W) = (Γ(0)/2 + Σ_{w=1}^{W} Γ(w)) / Γ(0)` for every available `W`.
//! - `W*` is the first `W ≥ 1` with
//!   `g(W) = exp(−W/τ_int(W)) − τ_int(W)/sqrt(W·N) < 0`.
//! - `δτ_int(W) = 2·τ_int(W)·sqrt((W − τ_int(W) + 1/2)/N)`.
//! - `error = sqrt(2·Γ(0)·τ_int(W*)/N)`.
//! - [`TauIntOutcome::diagnostics`] exports τ_int ± δτ_int and Γ up to
//!   `≈ 1.3·W*` for plotting.
//!
//! Invariants & assumptions
//! ------------------------
//! - An overflowing exponential saturates to `f64::MAX`. That only happens
//!   when `τ_int(W) < 0`, where `g(W)` is then large and positive, so
//!   saturation can never trigger a spurious window.
//! - No window found is an error; a default window is never substituted.
//! - A negative radicand in `δτ_int` (tiny `W` with large `τ_int`) is
//!   clamped to zero.
//!
//! Conventions
//! -----------
//! - `τ_int = 1/2` for uncorrelated data.
//! - `mean` is the plain sample mean of the derived series; for a function
//!   projection [`TauIntOutcome::value`] returns `f(ā)` instead.
//!
//! Downstream usage
//! ----------------
//! - `analysis::actions` calls [`TauIntOutcome::tauint`] once per
//!   (label, order) and formats `value() ± error()`.
//!
//! Testing notes
//! -------------
//! - Unit tests cover the partial-sum formula, window selection on a
//!   hand-built Γ, zero-variance rejection, and the diagnostics range.
//! - Statistical checks on synthetic AR(1) data live in
//!   `tests/integration_gamma_pipeline.rs`.

use crate::gamma::{
    autocorr::{GammaFunction, gamma},
    data::ObservableSet,
    errors::{GammaError, GammaResult},
    project::{DataProject, DerivedSeries, Projection},
};
use ndarray::Array1;
use tracing::debug;

/// TauIntOptions — estimator configuration.
///
/// Fields
/// ------
/// - `max_lag`: `Option<usize>`
///   Cap on the largest lag computed; `None` uses `min_r N_r − 1`.
/// - `diagnostics_factor`: `f64`
///   Diagnostics extend to `ceil(diagnostics_factor · W*)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TauIntOptions {
    pub max_lag: Option<usize>,
    pub diagnostics_factor: f64,
}

impl TauIntOptions {
    pub fn new(max_lag: Option<usize>, diagnostics_factor: f64) -> TauIntOptions {
        TauIntOptions { max_lag, diagnostics_factor }
    }
}

impl Default for TauIntOptions {
    /// No lag cap; diagnostics up to `1.3·W*`.
    fn default() -> Self {
        TauIntOptions::new(None, 1.3)
    }
}

/// TauIntOutcome — result of one Γ-method estimation.
///
/// Fields
/// ------
/// - `mean`, `function_value`: sample mean of the derived series and, for
///   function projections, `f(ā)`.
/// - `error`: `sqrt(2·Γ(0)·τ_int(W*)/N)`.
/// - `tau_int`, `tau_int_error`: values at `W*`.
/// - `window`: `W*`.
/// - `gamma`: full Γ(W).
/// - `tau_series`: τ_int(W) for every `W` in `gamma`.
#[derive(Debug, Clone, PartialEq)]
pub struct TauIntOutcome {
    mean: f64,
    function_value: Option<f64>,
    error: f64,
    tau_int: f64,
    tau_int_error: f64,
    window: usize,
    gamma: GammaFunction,
    tau_series: Array1<f64>,
    diagnostics_factor: f64,
}

/// WindowDiagnostics — plot-ready window scan.
///
/// `windows[k]` pairs with `tau_int[k] ± tau_int_error[k]` and `gamma[k]`.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowDiagnostics {
    pub windows: Vec<usize>,
    pub tau_int: Array1<f64>,
    pub tau_int_error: Array1<f64>,
    pub gamma: Array1<f64>,
    pub window: usize,
}

impl TauIntOutcome {
    /// Project `data` and run the Γ-method estimator.
    ///
    /// Parameters
    /// ----------
    /// - `data`: `&ObservableSet`
    ///   Validated samples `data[α][r][i]`.
    /// - `projection`: [`Projection`]
    ///   Observable index or scalar function of the observables.
    /// - `opts`: `&TauIntOptions`
    ///
    /// Returns
    /// -------
    /// `GammaResult<TauIntOutcome>`
    ///
    /// Errors
    /// ------
    /// - Projection errors (`ObservableOutOfRange`, `NonFiniteDerivative`).
    /// - `GammaError::InsufficientData`, `ZeroVariance`, `NoWindowFound`.
    ///
    /// Examples
    /// --------
    /// ```rust
    /// # use ndarray::Array1;
    /// # use nspt_analysis::gamma::{data::ObservableSet, project::Projection,
    /// #     tauint::{TauIntOptions, TauIntOutcome}};
    /// let x = Array1::from_iter((0..64).map(|i| ((i * 37 % 17) as f64) - 8.0));
    /// let set = ObservableSet::single(vec![x]).unwrap();
    /// let out = TauIntOutcome::tauint(&set, Projection::Index(0), &TauIntOptions::default())
    ///     .unwrap();
    /// assert!(out.error() > 0.0);
    /// ```
    pub fn tauint(
        data: &ObservableSet, projection: Projection<'_>, opts: &TauIntOptions,
    ) -> GammaResult<Self> {
        let series = DataProject::new(data)?.project(projection)?;
        Self::from_series(&series, opts)
    }

    /// Run the estimator on an already-projected series.
    pub fn from_series(series: &DerivedSeries, opts: &TauIntOptions) -> GammaResult<Self> {
        let gamma = gamma(series, opts.max_lag)?;
        let g0 = gamma.values[0];
        if !(g0 > f64::EPSILON * f64::EPSILON * gamma.mean * gamma.mean) {
            return Err(GammaError::ZeroVariance);
        }

        let n = gamma.samples as f64;
        let tau_series = tau_int_series(&gamma.values);
        let window = select_window(&tau_series, n)
            .ok_or(GammaError::NoWindowFound {
                max_window: gamma.max_lag().saturating_sub(1),
                samples: gamma.samples,
            })?;

        let tau_int = tau_series[window];
        let tau_int_error = tau_int_error(tau_int, window, n);
        let error = (2.0 * g0 * tau_int / n).sqrt();
        debug!(window, tau_int, tau_int_error, samples = gamma.samples, "gamma-method window");

        Ok(TauIntOutcome {
            mean: gamma.mean,
            function_value: series.function_value(),
            error,
            tau_int,
            tau_int_error,
            window,
            gamma,
            tau_series,
            diagnostics_factor: opts.diagnostics_factor,
        })
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Central value: `f(ā)` for function projections, else the mean.
    pub fn value(&self) -> f64 {
        self.function_value.unwrap_or(self.mean)
    }

    pub fn error(&self) -> f64 {
        self.error
    }

    pub fn tau_int(&self) -> f64 {
        self.tau_int
    }

    pub fn tau_int_error(&self) -> f64 {
        self.tau_int_error
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn gamma(&self) -> &GammaFunction {
        &self.gamma
    }

    pub fn tau_series(&self) -> &Array1<f64> {
        &self.tau_series
    }

    /// τ_int ± δτ_int and Γ for `W = 0..=ceil(factor·W*)`, clipped to the
    /// available lags.
    pub fn diagnostics(&self) -> WindowDiagnostics {
        let reach = (self.diagnostics_factor * self.window as f64).ceil();
        let last = if reach.is_finite() && reach > 0.0 {
            (reach as usize).min(self.gamma.max_lag())
        } else {
            self.window
        };
        let n = self.gamma.samples as f64;
        let windows: Vec<usize> = (0..=last).collect();
        let tau_int = self.tau_series.slice(ndarray::s![..=last]).to_owned();
        let tau_int_error =
            Array1::from_iter(windows.iter().map(|&w| tau_int_error(self.tau_series[w], w, n)));
        let gamma = self.gamma.values.slice(ndarray::s![..=last]).to_owned();
        WindowDiagnostics { windows, tau_int, tau_int_error, gamma, window: self.window }
    }
}

/// Partial sums `τ_int(W)` for `W = 0..len`.
pub fn tau_int_series(gamma: &Array1<f64>) -> Array1<f64> {
    let g0 = gamma[0];
    let mut running = 0.5 * g0;
    let mut out = Array1::<f64>::zeros(gamma.len());
    out[0] = 0.5;
    for w in 1..gamma.len() {
        running += gamma[w];
        out[w] = running / g0;
    }
    out
}

/// First `W ≥ 1` (below the last lag) where the decay criterion turns negative.
fn select_window(tau: &Array1<f64>, n: f64) -> Option<usize> {
    (1..tau.len().saturating_sub(1)).find(|&w| window_criterion(w, tau[w], n) < 0.0)
}

/// `g(W) = exp(−W/τ) − τ/sqrt(W·N)` with overflow saturated to `f64::MAX`.
fn window_criterion(w: usize, tau: f64, n: f64) -> f64 {
    let w = w as f64;
    let mut decay = (-w / tau).exp();
    if decay.is_infinite() {
        decay = f64::MAX;
    }
    decay - tau / (w * n).sqrt()
}

fn tau_int_error(tau: f64, w: usize, n: f64) -> f64 {
    let radicand = ((w as f64 - tau + 0.5) / n).max(0.0);
    2.0 * tau * radicand.sqrt()
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
    // - The τ_int partial-sum convention.
    // - Window criterion saturation and window selection.
    // - Zero-variance and no-window failures.
    // - The diagnostics range.
    //
    // They intentionally DO NOT cover:
    // - Statistical accuracy on long synthetic chains (integration tests).
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Check `τ_int(W) = (Γ0/2 + Σ Γ(w))/Γ0`.
    //
    // Given
    // -----
    // - Γ = [2, 1, 0.5, 0].
    //
    // Expect
    // ------
    // - τ = [0.5, 1.0, 1.25, 1.25].
    fn tau_int_series_uses_half_gamma0() {
        // Act
        let tau = tau_int_series(&array![2.0, 1.0, 0.5, 0.0]);

        // Assert
        assert_eq!(tau, array![0.5, 1.0, 1.25, 1.25]);
    }

    #[test]
    // Purpose
    // -------
    // A negative τ_int makes the exponential overflow; the criterion must
    // saturate to a large positive value, not NaN.
    //
    // Given
    // -----
    // - W = 1000, τ = −0.5, N = 100.
    //
    // Expect
    // ------
    // - A finite positive criterion.
    fn window_criterion_saturates_on_overflow() {
        // Act
        let g = window_criterion(1000, -0.5, 100.0);

        // Assert
        assert!(g.is_finite() && g > 0.0);
    }

    #[test]
    // Purpose
    // -------
    // Alternating data decorrelates immediately; the window is small and the
    // error follows `sqrt(2·Γ0·τ/N)`.
    //
    // Given
    // -----
    // - 400 samples of a period-4 pattern plus a slow-varying component.
    //
    // Expect
    // ------
    // - `W* ≥ 1`, error consistent with the stored Γ0 and τ_int.
    fn from_series_error_matches_formula() {
        // Arrange
        let x = Array1::from_iter((0..400).map(|i| [1.0, -0.5, 0.25, -1.0][i % 4] + (i as f64 * 0.001)));
        let series = DerivedSeries::new(vec![x]).unwrap();

        // Act
        let out = TauIntOutcome::from_series(&series, &TauIntOptions::default()).unwrap();

        // Assert
        assert!(out.window() >= 1);
        let expected = (2.0 * out.gamma().values[0] * out.tau_int() / 400.0).sqrt();
        assert_relative_eq!(out.error(), expected, epsilon = 1e-15);
        assert_eq!(out.value(), out.mean());
    }

    #[test]
    // Purpose
    // -------
    // A constant series has no variance.
    //
    // Given
    // -----
    // - 50 copies of 3.0.
    //
    // Expect
    // ------
    // - `GammaError::ZeroVariance`.
    fn from_series_rejects_constant_series() {
        // Arrange
        let series = DerivedSeries::new(vec![Array1::from_elem(50, 3.0)]).unwrap();

        // Act
        let err = TauIntOutcome::from_series(&series, &TauIntOptions::default()).unwrap_err();

        // Assert
        assert_eq!(err, GammaError::ZeroVariance);
    }

    #[test]
    // Purpose
    // -------
    // A lag cap too small to hold any candidate window is surfaced as an
    // error instead of a default window.
    //
    // Given
    // -----
    // - A ramp of 20 samples, `max_lag = Some(1)`.
    //
    // Expect
    // ------
    // - `GammaError::NoWindowFound { max_window: 0, samples: 20 }`.
    fn from_series_reports_missing_window() {
        // Arrange
        let series = DerivedSeries::new(vec![Array1::from_iter((0..20).map(|i| i as f64))]).unwrap();
        let opts = TauIntOptions::new(Some(1), 1.3);

        // Act
        let err = TauIntOutcome::from_series(&series, &opts).unwrap_err();

        // Assert
        assert_eq!(err, GammaError::NoWindowFound { max_window: 0, samples: 20 });
    }

    #[test]
    // Purpose
    // -------
    // Diagnostics reach `ceil(1.3·W*)` and carry matching lengths.
    //
    // Given
    // -----
    // - The period-4 series from above.
    //
    // Expect
    // ------
    // - Last window equals `min(ceil(1.3·W*), max_lag)`.
    fn diagnostics_extend_past_window() {
        // Arrange
        let x = Array1::from_iter((0..400).map(|i| [1.0, -0.5, 0.25, -1.0][i % 4] + (i as f64 * 0.001)));
        let series = DerivedSeries::new(vec![x]).unwrap();
        let out = TauIntOutcome::from_series(&series, &TauIntOptions::default()).unwrap();

        // Act
        let diag = out.diagnostics();

        // Assert
        let reach = ((1.3 * out.window() as f64).ceil() as usize).min(out.gamma().max_lag());
        assert_eq!(*diag.windows.last().unwrap(), reach);
        assert_eq!(diag.tau_int.len(), diag.windows.len());
        assert_eq!(diag.gamma.len(), diag.windows.len());
        assert_eq!(diag.tau_int[out.window()], out.tau_int());
    }
}
