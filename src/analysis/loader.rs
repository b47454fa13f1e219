//! analysis::loader — raw binary measurement files to observable sets.
//!
//! Purpose
//! -------
//! Read every data file of a plan directory as one replicum and reshape the
//! interleaved values into `data[order][replicum][measurement]`.
//!
//! Key behaviors
//! -------------
//! - Files are raw `f64` (8 bytes) or complex `f64` pairs (16 bytes, only
//!   the real part is kept), in native byte order or swapped.
//! - The first `ntherm × max_order` values of each file are dropped, the
//!   rest multiplied by the normalization factor.
//! - Value `k` of a file belongs to order `k mod max_order` and measurement
//!   `k div max_order`.
//!
//! Invariants & assumptions
//! ------------------------
//! - Files are taken in lexicographic order of their names so replicum
//!   indices are reproducible.
//! - Replica may differ in length; every file must hold a whole number of
//!   measurements after the thermalization cut.
//!
//! Conventions
//! -----------
//! - Failures are `anyhow` errors with the file or directory as context;
//!   [`load_plan_data`] folds them into `AnalysisError::Load`.

use crate::{
    analysis::{
        errors::AnalysisResult,
        plan::{AnalysisPlan, DirectorySpec},
    },
    gamma::data::ObservableSet,
};
use anyhow::{Context, bail, ensure};
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use ndarray::Array1;
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};
use tracing::debug;

/// LabelData — loaded samples and metadata of one directory.
#[derive(Debug, Clone)]
pub struct LabelData {
    pub label: String,
    pub tau: f64,
    pub lattice_size: u32,
    pub files: Vec<PathBuf>,
    pub data: ObservableSet,
}

/// Load every directory of a plan, keyed by label.
///
/// Errors
/// ------
/// - `AnalysisError::Load` for unreadable directories or files, malformed
///   file sizes, and duplicate labels.
pub fn load_plan_data(plan: &AnalysisPlan) -> AnalysisResult<BTreeMap<String, LabelData>> {
    let mut out = BTreeMap::new();
    for spec in &plan.directories {
        let loaded = load_directory(spec)?;
        if out.contains_key(&loaded.label) {
            let msg = format!("label '{}' is used by more than one directory", loaded.label);
            return Err(anyhow::anyhow!(msg).into());
        }
        out.insert(loaded.label.clone(), loaded);
    }
    Ok(out)
}

/// Load all matching files of one directory.
pub fn load_directory(spec: &DirectorySpec) -> anyhow::Result<LabelData> {
    let files = data_files(&spec.path, &spec.filename_contains)?;
    ensure!(
        !files.is_empty(),
        "no data files in {} matching '{}'",
        spec.path.display(),
        spec.filename_contains
    );

    let skip = spec.ntherm * spec.max_order;
    let mut per_order: Vec<Vec<Array1<f64>>> = vec![Vec::with_capacity(files.len()); spec.max_order];
    for file in &files {
        let bytes =
            std::fs::read(file).with_context(|| format!("reading {}", file.display()))?;
        let values = decode_values(&bytes, spec.complex, spec.swap_endian)
            .with_context(|| format!("decoding {}", file.display()))?;
        let kept: Vec<f64> =
            values.iter().skip(skip).map(|v| v * spec.normalization).collect();
        let series = deinterleave(&kept, spec.max_order)
            .with_context(|| format!("splitting {} into orders", file.display()))?;
        debug!(
            file = %file.display(),
            values = values.len(),
            measurements = series[0].len(),
            "loaded replicum"
        );
        for (order, s) in series.into_iter().enumerate() {
            per_order[order].push(s);
        }
    }

    let data = ObservableSet::new(per_order)
        .with_context(|| format!("assembling data of '{}'", spec.label))?;
    Ok(LabelData {
        label: spec.label.clone(),
        tau: spec.tau,
        lattice_size: spec.lattice_size,
        files,
        data,
    })
}

/// Regular files in `dir` whose name contains `filter`, sorted by name.
fn data_files(dir: &Path, filter: &str) -> anyhow::Result<Vec<PathBuf>> {
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("listing directory {}", dir.display()))?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("listing directory {}", dir.display()))?;
        let path = entry.path();
        let matches = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.contains(filter));
        if matches && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Decode raw bytes into real values.
///
/// Parameters
/// ----------
/// - `bytes`: file contents.
/// - `complex`: values come in `(re, im)` pairs; keep `re`.
/// - `swap_endian`: data was written with the opposite byte order.
///
/// Errors
/// ------
/// - The byte count is not a multiple of the element size.
pub fn decode_values(bytes: &[u8], complex: bool, swap_endian: bool) -> anyhow::Result<Vec<f64>> {
    let width = if complex { 16 } else { 8 };
    if bytes.len() % width != 0 {
        bail!("{} bytes is not a whole number of {width}-byte values", bytes.len());
    }
    let mut raw = vec![0.0; bytes.len() / 8];
    let big = cfg!(target_endian = "big") != swap_endian;
    if big {
        BigEndian::read_f64_into(bytes, &mut raw);
    } else {
        LittleEndian::read_f64_into(bytes, &mut raw);
    }
    if complex {
        raw = raw.into_iter().step_by(2).collect();
    }
    Ok(raw)
}

/// Split interleaved values into one series per order.
pub fn deinterleave(values: &[f64], orders: usize) -> anyhow::Result<Vec<Array1<f64>>> {
    ensure!(orders > 0, "number of orders must be positive");
    ensure!(
        values.len() % orders == 0,
        "{} values do not split into {orders} orders",
        values.len()
    );
    Ok((0..orders)
        .map(|o| values.iter().skip(o).step_by(orders).copied().collect())
        .collect())
}
