//! analysis::format — compact `value(error)` notation.

/// Format `val ± err` as `1.2345(12)`.
///
/// The number of decimals is
/// `digits = 1 − trunc(log10(err)) + extra_err_digits`, and the error is
/// printed as `round(err · 10^digits)`. When the error rounds up to `10`
/// and `extra_err_digits ≠ 1`, one digit is dropped instead.
///
/// Notes
/// -----
/// - A zero, negative or non-finite error is printed verbatim after the
///   value, since there is no digit to align to.
/// - Errors of 100 and above keep zero decimals.
///
/// Examples
/// --------
/// ```rust
/// # use nspt_analysis::analysis::format::pretty_print;
/// assert_eq!(pretty_print(1.23456, 0.0123, 1), "1.235(12)");
/// assert_eq!(pretty_print(-0.5, 0.25, 1), "-0.50(25)");
/// ```
pub fn pretty_print(val: f64, err: f64, extra_err_digits: usize) -> String {
    if !(err.is_finite() && err > 0.0) {
        return format!("{val}({err})");
    }
    let mut digits = 1 - err.log10().trunc() as i64 + extra_err_digits as i64;
    if digits < 0 {
        digits = 0;
    }
    let mut err_digits = (err * 10f64.powi(digits as i32) + 0.5).floor() as u64;
    if err_digits == 10 && extra_err_digits != 1 && digits > 0 {
        err_digits = 1;
        digits -= 1;
    }
    format!("{val:.prec$}({err_digits})", prec = digits as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // Digit selection across error magnitudes and the round-up special case.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Two significant error digits by default.
    //
    // Given
    // -----
    // - Errors 0.0123, 0.5, 3.7 and 12.3 with one extra digit.
    //
    // Expect
    // ------
    // - "(12)", "(50)", "(370)" and "(123)"; the value has as many decimals
    //   as the error digits reach.
    fn pretty_print_default_precision() {
        assert_eq!(pretty_print(1.23456, 0.0123, 1), "1.235(12)");
        assert_eq!(pretty_print(2.0, 0.5, 1), "2.00(50)");
        assert_eq!(pretty_print(10.123, 3.7, 1), "10.12(370)");
        assert_eq!(pretty_print(100.0, 12.3, 1), "100.0(123)");
    }

    #[test]
    // Purpose
    // -------
    // With one error digit, an error that rounds up to 10 is shown as 1 at
    // one decimal less.
    //
    // Given
    // -----
    // - err = 0.096, extra_err_digits = 0.
    //
    // Expect
    // ------
    // - 9.6 rounds to 10, shown as "(1)" with one decimal.
    fn pretty_print_rounds_up_single_digit() {
        assert_eq!(pretty_print(0.5, 0.096, 0), "0.5(1)");
    }

    #[test]
    // Purpose
    // -------
    // Degenerate errors do not panic.
    //
    // Given
    // -----
    // - err = 0 and err = NaN.
    //
    // Expect
    // ------
    // - Value followed by the raw error.
    fn pretty_print_degenerate_errors() {
        assert_eq!(pretty_print(1.5, 0.0, 1), "1.5(0)");
        assert_eq!(pretty_print(1.5, f64::NAN, 1), "1.5(NaN)");
    }
}
