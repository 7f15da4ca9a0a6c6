//! Cell formatting for the table view.

use serde_json::Number;
use snop_core::models::CellValue;

const MAX_FRACTION_DIGITS: usize = 3;

/// Display text of one cell. Null renders as an empty string.
pub fn format_cell(cell: &CellValue) -> String {
    match cell {
        CellValue::Null => String::new(),
        CellValue::Number(n) => format_number(n),
        CellValue::Text(s) => s.clone(),
    }
}

/// Group the integer part with `,` and keep at most three fraction digits,
/// trailing zeros removed: `1234567.5` → `1,234,567.5`.
pub fn format_number(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        return with_sign(i < 0, &group_digits(&i.unsigned_abs().to_string()));
    }
    if let Some(u) = n.as_u64() {
        return group_digits(&u.to_string());
    }
    format_f64(n.as_f64().unwrap_or(0.0))
}

pub fn format_f64(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }

    let fixed = format!("{:.*}", MAX_FRACTION_DIGITS, value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let frac_part = frac_part.trim_end_matches('0');

    let mut out = group_digits(int_part);
    if !frac_part.is_empty() {
        out.push('.');
        out.push_str(frac_part);
    }
    // -0.0001 rounds to zero and loses its sign
    let negative = value < 0.0 && out != "0";
    with_sign(negative, &out)
}

fn with_sign(negative: bool, digits: &str) -> String {
    if negative {
        format!("-{}", digits)
    } else {
        digits.to_string()
    }
}

fn group_digits(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
