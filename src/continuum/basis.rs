//! continuum::basis — fit basis functions of the step-size parameter.
//!
//! Purpose
//! -------
//! Describe the ordered list of functions `basis_k(x)` whose linear
//! combination is fitted to the finite-step data. The first function is the
//! one whose coefficient is the continuum value (for the usual `{1, x, …}`
//! bases, the intercept at `x = 0`).
//!
//! Key behaviors
//! -------------
//! - [`BasisFn`] is a constant, a power `x^k`, or a named closure.
//! - [`Basis::linear`] is the default `{1, x}`; [`Basis::polynomial`] gives
//!   `{1, x, …, x^d}`.
//! - Bases parse from whitespace- or comma-separated terms such as
//!   `"1 x x^2"` via `str::parse`.
//!
//! Conventions
//! -----------
//! - `x^0` is normalised to the constant; `x^1` to `x`.

use crate::continuum::errors::{ContinuumError, ContinuumResult};
use std::{fmt, str::FromStr, sync::Arc};

/// One basis function of the fit parameter.
#[derive(Clone)]
pub enum BasisFn {
    Constant,
    Power(i32),
    Custom { name: String, f: Arc<dyn Fn(f64) -> f64 + Send + Sync> },
}

impl BasisFn {
    /// Named closure.
    pub fn custom<F>(name: impl Into<String>, f: F) -> BasisFn
    where
        F: Fn(f64) -> f64 + Send + Sync + 'static,
    {
        BasisFn::Custom { name: name.into(), f: Arc::new(f) }
    }

    pub fn eval(&self, x: f64) -> f64 {
        match self {
            BasisFn::Constant => 1.0,
            BasisFn::Power(k) => x.powi(*k),
            BasisFn::Custom { f, .. } => f(x),
        }
    }

    pub fn name(&self) -> String {
        match self {
            BasisFn::Constant => "1".to_string(),
            BasisFn::Power(1) => "x".to_string(),
            BasisFn::Power(k) => format!("x^{k}"),
            BasisFn::Custom { name, .. } => name.clone(),
        }
    }
}

impl fmt::Debug for BasisFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BasisFn({})", self.name())
    }
}

impl FromStr for BasisFn {
    type Err = ContinuumError;

    fn from_str(term: &str) -> ContinuumResult<Self> {
        let invalid = || ContinuumError::InvalidBasisTerm { term: term.to_string() };
        let t = term.trim();
        match t {
            "1" => return Ok(BasisFn::Constant),
            "x" => return Ok(BasisFn::Power(1)),
            _ => {}
        }
        let exponent = t
            .strip_prefix("x^")
            .or_else(|| t.strip_prefix("x**"))
            .ok_or_else(invalid)?;
        let k: i32 = exponent.trim().parse().map_err(|_| invalid())?;
        Ok(match k {
            0 => BasisFn::Constant,
            k => BasisFn::Power(k),
        })
    }
}

/// Basis — ordered list of fit functions.
#[derive(Clone, Debug)]
pub struct Basis {
    funcs: Vec<BasisFn>,
}

impl Basis {
    /// Errors
    /// ------
    /// - `ContinuumError::EmptyBasis` when `funcs` is empty.
    pub fn new(funcs: Vec<BasisFn>) -> ContinuumResult<Self> {
        if funcs.is_empty() {
            return Err(ContinuumError::EmptyBasis);
        }
        Ok(Basis { funcs })
    }

    /// `{1, x}`.
    pub fn linear() -> Basis {
        Basis { funcs: vec![BasisFn::Constant, BasisFn::Power(1)] }
    }

    /// `{1, x, …, x^degree}`.
    pub fn polynomial(degree: u32) -> Basis {
        let mut funcs = vec![BasisFn::Constant];
        funcs.extend((1..=degree as i32).map(BasisFn::Power));
        Basis { funcs }
    }

    pub fn len(&self) -> usize {
        self.funcs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.funcs.is_empty()
    }

    pub fn functions(&self) -> &[BasisFn] {
        &self.funcs
    }

    /// Exactly `{1, x}` in that order.
    pub fn is_linear(&self) -> bool {
        matches!(self.funcs.as_slice(), [BasisFn::Constant, BasisFn::Power(1)])
    }

    /// Row `[basis_0(x), …, basis_{K−1}(x)]` of the design matrix.
    pub fn row(&self, x: f64) -> Vec<f64> {
        self.funcs.iter().map(|b| b.eval(x)).collect()
    }
}

impl Default for Basis {
    fn default() -> Self {
        Basis::linear()
    }
}

impl fmt::Display for Basis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.funcs.iter().map(BasisFn::name).collect();
        write!(f, "{}", names.join(" "))
    }
}

impl FromStr for Basis {
    type Err = ContinuumError;

    fn from_str(s: &str) -> ContinuumResult<Self> {
        let funcs = s
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|t| !t.is_empty())
            .map(str::parse)
            .collect::<ContinuumResult<Vec<BasisFn>>>()?;
        Basis::new(funcs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Parsing of basis descriptions and rejection of unknown terms.
    // - The `{1, x}` classification used by the closed-form cross-check.
    // - Evaluation of power and custom functions.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Parse mixed separators and normalise exponents.
    //
    // Given
    // -----
    // - "1, x  x^2 x**3 x^0".
    //
    // Expect
    // ------
    // - Five functions printed as "1 x x^2 x^3 1".
    fn parse_accepts_common_spellings() {
        // Act
        let basis: Basis = "1, x  x^2 x**3 x^0".parse().unwrap();

        // Assert
        assert_eq!(basis.len(), 5);
        assert_eq!(basis.to_string(), "1 x x^2 x^3 1");
    }

    #[test]
    // Purpose
    // -------
    // Unknown terms and empty descriptions are rejected.
    //
    // Given
    // -----
    // - "1 log(x)" and "  ".
    //
    // Expect
    // ------
    // - `InvalidBasisTerm { term: "log(x)" }` and `EmptyBasis`.
    fn parse_rejects_unknown_terms_and_empty_input() {
        let err = "1 log(x)".parse::<Basis>().unwrap_err();
        assert_eq!(err, ContinuumError::InvalidBasisTerm { term: "log(x)".to_string() });
        assert_eq!("  ".parse::<Basis>().unwrap_err(), ContinuumError::EmptyBasis);
    }

    #[test]
    // Purpose
    // -------
    // Only the exact `{1, x}` basis is classified as linear.
    //
    // Given
    // -----
    // - `linear()`, `polynomial(1)`, `polynomial(2)`, and "x 1".
    //
    // Expect
    // ------
    // - true, true, false, false.
    fn is_linear_requires_exact_order() {
        assert!(Basis::linear().is_linear());
        assert!(Basis::polynomial(1).is_linear());
        assert!(!Basis::polynomial(2).is_linear());
        assert!(!"x 1".parse::<Basis>().unwrap().is_linear());
    }

    #[test]
    // Purpose
    // -------
    // Design-matrix rows evaluate every function.
    //
    // Given
    // -----
    // - Basis {1, x^2, sqrt}; x = 4.
    //
    // Expect
    // ------
    // - Row [1, 16, 2].
    fn row_evaluates_power_and_custom() {
        // Arrange
        let basis = Basis::new(vec![
            BasisFn::Constant,
            BasisFn::Power(2),
            BasisFn::custom("sqrt(x)", f64::sqrt),
        ])
        .unwrap();

        // Act / Assert
        assert_eq!(basis.row(4.0), vec![1.0, 16.0, 2.0]);
        assert_eq!(basis.to_string(), "1 x^2 sqrt(x)");
    }
}
