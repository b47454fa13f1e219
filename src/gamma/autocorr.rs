//! gamma::autocorr — replicum-aware autocovariance Γ(W) of a derived series.
//!
//! Purpose
//! -------
//! Estimate the lag-`W` autocovariance of a derived series measured on `R`
//! independent replica:
//!
//! ```text
//! Γ(W) = 1/(N − R·W) · Σ_r Σ_{i=0}^{N_r−W−1} (a^{i,r} − ā)(a^{i+W,r} − ā),
//! ```
//!
//! with `ā` the grand mean over all replica and `N = Σ_r N_r`.
//!
//! Key behaviors
//! -------------
//! - Each replicum is correlated with itself only; pairs never straddle a
//!   replicum boundary.
//! - The per-replicum sums are computed as a linear (non-circular)
//!   autocorrelation via zero-padded FFT (`rustfft`), keeping lags `≥ 0`.
//! - The returned [`GammaFunction`] stores `Γ(0..=max_lag)`.
//!
//! Invariants & assumptions
//! ------------------------
//! - `max_lag ≤ min_r N_r − 1`, so every replicum contributes at least one
//!   pair at every lag and `N − R·W` equals the number of pairs (> 0).
//! - The FFT length is the next power of two `≥ 2·N_r`, which rules out
//!   wrap-around contributions.
//!
//! Testing notes
//! -------------
//! - Unit tests compare the FFT path against a direct double sum on small
//!   ragged inputs and check the lag bound.

use crate::gamma::{
    errors::{GammaError, GammaResult},
    project::DerivedSeries,
};
use ndarray::Array1;
use rustfft::{FftPlanner, num_complex::Complex};

/// GammaFunction — normalised autocovariance of one derived series.
///
/// Fields
/// ------
/// - `values`: `Γ(W)` for `W = 0..=max_lag`.
/// - `mean`: grand mean `ā` used for centring.
/// - `samples`: `N`.
/// - `replica`: `R`.
#[derive(Debug, Clone, PartialEq)]
pub struct GammaFunction {
    pub values: Array1<f64>,
    pub mean: f64,
    pub samples: usize,
    pub replica: usize,
}

impl GammaFunction {
    /// Largest lag held, `values.len() − 1`.
    pub fn max_lag(&self) -> usize {
        self.values.len().saturating_sub(1)
    }

    /// Normalised autocorrelation `ρ(W) = Γ(W)/Γ(0)`.
    pub fn rho(&self) -> Array1<f64> {
        let g0 = self.values[0];
        self.values.mapv(|g| g / g0)
    }
}

/// Compute Γ(W) for a derived series.
///
/// Parameters
/// ----------
/// - `series`: `&DerivedSeries`
///   Projected samples, one array per replicum.
/// - `max_lag`: `Option<usize>`
///   Optional cap on the largest lag; always clipped to `min_r N_r − 1`.
///
/// Returns
/// -------
/// `GammaResult<GammaFunction>`
///
/// Errors
/// ------
/// - `GammaError::InsufficientData`
///   `N < 2` or the shortest replicum holds fewer than two measurements.
///
/// Notes
/// -----
/// - A single planner is shared across replica so equal lengths reuse the
///   same FFT plan.
pub fn gamma(series: &DerivedSeries, max_lag: Option<usize>) -> GammaResult<GammaFunction> {
    let info = series.info();
    let shortest = info.min_replicum_len();
    if info.total < 2 || shortest < 2 {
        return Err(GammaError::InsufficientData { samples: info.total });
    }
    let lag_bound = shortest - 1;
    let max_lag = max_lag.map_or(lag_bound, |cap| cap.min(lag_bound));

    let mean = series.mean();
    let mut planner = FftPlanner::<f64>::new();
    let mut acc = Array1::<f64>::zeros(max_lag + 1);
    for rep in series.replica() {
        let sums = lagged_sums(&mut planner, rep, mean, max_lag);
        acc += &sums;
    }

    let n = info.total as f64;
    let r = info.replica as f64;
    let values =
        Array1::from_iter(acc.iter().enumerate().map(|(w, &s)| s / (n - r * w as f64)));

    Ok(GammaFunction { values, mean, samples: info.total, replica: info.replica })
}

/// Σ_i (x_i − m)(x_{i+W} − m) for `W = 0..=max_lag` of one replicum.
fn lagged_sums(
    planner: &mut FftPlanner<f64>, rep: &Array1<f64>, mean: f64, max_lag: usize,
) -> Array1<f64> {
    let len = rep.len();
    let size = (2 * len).next_power_of_two();

    let mut buffer: Vec<Complex<f64>> = rep
        .iter()
        .map(|&x| Complex::new(x - mean, 0.0))
        .chain(std::iter::repeat(Complex::new(0.0, 0.0)))
        .take(size)
        .collect();

    planner.plan_fft_forward(size).process(&mut buffer);
    for z in buffer.iter_mut() {
        *z = Complex::new(z.norm_sqr(), 0.0);
    }
    planner.plan_fft_inverse(size).process(&mut buffer);

    let scale = 1.0 / size as f64;
    Array1::from_iter(buffer.iter().take(max_lag + 1).map(|z| z.re * scale))
}
