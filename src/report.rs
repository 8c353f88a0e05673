//! Text the coordinator writes to stdout.
//!
//! Numbers are printed the way an `iostream` with `precision(17)` prints a
//! `double`: `%.17g`, i.e. 17 significant digits, trailing zeros removed,
//! scientific notation only for very small or very large magnitudes.

use crate::estimator::Estimate;

/// Prompt echoed before reading the partition count.
pub const PROMPT: &str =
    "Please enter the number of partitions to use in the numerical integration: ";

/// Significant digits used for every reported number.
pub const REPORT_PRECISION: usize = 17;

/// `Value of pi calculated as: <value> in <elapsed>s.`
pub fn result_line(estimate: &Estimate) -> String {
    format!(
        "Value of pi calculated as: {} in {}s.",
        format_significant(estimate.value, REPORT_PRECISION),
        format_significant(estimate.elapsed, REPORT_PRECISION)
    )
}

/// Format `x` like C's `%.{precision}g`.
pub fn format_significant(x: f64, precision: usize) -> String {
    if x.is_nan() {
        return "nan".to_string();
    }
    if x.is_infinite() {
        return if x > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if x == 0.0 {
        return if x.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    let precision = precision.max(1);
    // Exponent after rounding to `precision` digits decides the style.
    let scientific = format!("{:.*e}", precision - 1, x);
    let (mantissa, exponent) = scientific
        .split_once('e')
        .unwrap_or((scientific.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if exponent < -4 || exponent >= precision as i32 {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!(
            "{}e{sign}{:02}",
            trim_fraction(mantissa),
            exponent.unsigned_abs()
        )
    } else {
        let decimals = (precision as i32 - 1 - exponent).max(0) as usize;
        trim_fraction(&format!("{x:.decimals$}")).to_string()
    }
}

fn trim_fraction(digits: &str) -> &str {
    if digits.contains('.') {
        digits.trim_end_matches('0').trim_end_matches('.')
    } else {
        digits
    }
}
