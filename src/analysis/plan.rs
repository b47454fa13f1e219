//! analysis::plan — immutable description of one analysis run.
//!
//! Purpose
//! -------
//! Hold what the plan file asks for: the data directories with their
//! metadata (step size `τ`, lattice size `L`, thermalization cut, number of
//! orders, file format flags) and the ordered list of actions.
//!
//! Key behaviors
//! -------------
//! - Plain value types; built once by `analysis::config` and only read
//!   afterwards.
//! - `Display` on [`AnalysisPlan`] renders the human-readable summary that
//!   the driver logs before loading any data.
//!
//! Conventions
//! -----------
//! - Orders are 0-based indices into the per-measurement block of a data
//!   file (order `o` is observable `o`).

use crate::continuum::basis::Basis;
use std::{fmt, path::PathBuf};

/// One data directory; every matching file in it is a replicum.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectorySpec {
    pub label: String,
    pub path: PathBuf,
    pub tau: f64,
    pub lattice_size: u32,
    pub ntherm: usize,
    pub max_order: usize,
    pub normalization: f64,
    pub swap_endian: bool,
    pub complex: bool,
    pub filename_contains: String,
}

/// Cutoff scan `start, start + step, …` below `end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThermRange {
    pub start: usize,
    pub end: usize,
    pub step: usize,
}

impl ThermRange {
    pub fn cutoffs(&self) -> Vec<usize> {
        (self.start..self.end).step_by(self.step.max(1)).collect()
    }
}

/// Plot request attached to an extrapolation.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotRequest {
    pub lattice_sizes: Vec<u32>,
    pub orders: Vec<usize>,
    pub pdfname: String,
    pub ylabel: String,
    pub known: Vec<f64>,
}

impl PlotRequest {
    /// `true` when this plot wants the fit of `order` at `lattice_size`.
    pub fn wants(&self, lattice_size: u32, order: usize) -> bool {
        self.lattice_sizes.contains(&lattice_size) && self.orders.contains(&order)
    }
}

/// Extrapolation settings.
#[derive(Debug, Clone)]
pub struct ExtrapolateAction {
    pub orders: Vec<usize>,
    pub lattice_sizes: Option<Vec<u32>>,
    pub basis: Basis,
    pub plots: Vec<PlotRequest>,
}

/// Action — one step of the run, executed in file order.
#[derive(Debug, Clone)]
pub enum Action {
    Show { orders: Vec<usize> },
    Extrapolate(ExtrapolateAction),
    Therm { orders: Vec<usize>, range: ThermRange },
}

/// AnalysisPlan — directories plus actions.
#[derive(Debug, Clone, Default)]
pub struct AnalysisPlan {
    pub directories: Vec<DirectorySpec>,
    pub actions: Vec<Action>,
}

fn join<T: fmt::Display>(items: &[T]) -> String {
    items.iter().map(T::to_string).collect::<Vec<_>>().join(", ")
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Show { orders } => {
                write!(f, "  --> show\n      orders = {}", join(orders))
            }
            Action::Extrapolate(ex) => {
                write!(f, "  --> extrapolate (tau -> 0)\n      orders = {}", join(&ex.orders))?;
                write!(f, "\n      basis = {}", ex.basis)?;
                if let Some(sizes) = &ex.lattice_sizes {
                    write!(f, "\n      L = {}", join(sizes))?;
                }
                Ok(())
            }
            Action::Therm { orders, range } => write!(
                f,
                "  --> check thermalization effects\n      orders = {}\n      \
                 cut-off from {} to {} in steps of {}",
                join(orders),
                range.start,
                range.end,
                range.step
            ),
        }
    }
}

impl fmt::Display for AnalysisPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(22);
        let stars = format!("   {}", "*".repeat(50));
        writeln!(f, "{rule} Analysis info {rule}")?;
        writeln!(f, "* Directories:")?;
        writeln!(f, "{stars}")?;
        for d in &self.directories {
            writeln!(f, "      Label: {}", d.label)?;
            writeln!(f, "       Path: {}", d.path.display())?;
            writeln!(f, "        Tau: {}", d.tau)?;
            writeln!(f, "          L: {}", d.lattice_size)?;
            writeln!(f, "     endian: {}", if d.swap_endian { "swap" } else { "keep" })?;
            writeln!(f, "  data type: {}", if d.complex { "complex" } else { "double" })?;
            writeln!(f, "      therm: {}", d.ntherm)?;
            writeln!(f, "      order: {}", d.max_order)?;
            writeln!(f, "{stars}")?;
        }
        writeln!(f, "* Actions:")?;
        for a in &self.actions {
            writeln!(f, "{a}")?;
        }
        write!(f, "{}", "=".repeat(59))
    }
}
