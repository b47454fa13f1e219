//! analysis — plan-driven analysis of NSPT measurement directories.
//!
//! Purpose
//! -------
//! Everything around the numeric core: read a declarative plan file, load
//! the binary measurement files of each directory, run the requested
//! actions and hand back numbers and plot-ready series.
//!
//! Key behaviors
//! -------------
//! - [`config`] parses the plan into an immutable [`AnalysisPlan`]
//!   ([`plan`]).
//! - [`loader`] turns each directory into an `ObservableSet` of shape
//!   `[order][replicum][measurement]` plus its `τ` and `L`.
//! - [`actions`] runs `show`, `extrapolate` and `therm` and logs results in
//!   `value(error)` notation ([`format`]).
//! - [`plots`] holds the figure data; rendering is left to the caller.
//!
//! Invariants & assumptions
//! ------------------------
//! - Errors name the unit they occurred in (label, order, lattice size or
//!   plan-file line); see [`AnalysisError`].
//!
//! Downstream usage
//! ----------------
//! ```no_run
//! use nspt_analysis::analysis::prelude::*;
//!
//! let (_plan, reports) = run_file("analysis.xml", &AnalysisOptions::default())?;
//! for report in reports {
//!     if let ActionReport::Extrapolate(ex) = report {
//!         for r in ex.results {
//!             println!("order {} L {}: {}", r.order, r.lattice_size, pretty_print(r.value(), r.error(), 1));
//!         }
//!     }
//! }
//! # Ok::<(), AnalysisError>(())
//! ```

pub mod actions;
pub mod config;
pub mod errors;
pub mod format;
pub mod loader;
pub mod plan;
pub mod plots;

// ---- Re-exports (primary surface) -----------------------------------------

pub use self::actions::{
    ActionReport, AnalysisOptions, ContinuumEstimate, Estimate, ExtrapolationReport, ThermPoint,
    ThermScan, extrapolate, run, run_file, show, therm,
};
pub use self::config::{parse_plan, read_plan};
pub use self::errors::{AnalysisError, AnalysisResult};
pub use self::format::pretty_print;
pub use self::loader::{LabelData, load_directory, load_plan_data};
pub use self::plan::{Action, AnalysisPlan, DirectorySpec, ExtrapolateAction, PlotRequest, ThermRange};
pub use self::plots::{FitCurve, KnownComparison, PlotData, PointGroup};

// ---- Optional convenience prelude for downstream crates ------------------

pub mod prelude {
    pub use super::actions::{ActionReport, AnalysisOptions, run, run_file};
    pub use super::errors::{AnalysisError, AnalysisResult};
    pub use super::format::pretty_print;
    pub use super::plan::AnalysisPlan;
}
