//! Converts raw model values into cell text
//!
//! - floats and decimals: thousands-grouped with the column precision
//!   (2 when the column leaves it at 0)
//! - date/times: the column format as a `strftime` pattern; years up to 1601
//!   are the "no date" sentinel and render empty
//! - booleans: the check glyph for `true`, empty for `false`
//! - text: as is
//! - everything else: the column's `{}` template

use chrono::format::{Item, StrftimeItems};
use chrono::{Datelike, NaiveDateTime};
use rust_decimal::Decimal;

use crate::column_manager::Column;
use crate::data::value::CellValue;

pub const CHECK_GLYPH: &str = "✔";
pub const DEFAULT_PRECISION: usize = 2;
/// Values dated at or before this year are treated as null
pub const NULL_DATE_YEAR: i32 = 1601;

const DEFAULT_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn format_cell(value: &CellValue, column: &Column, check_glyph: &str) -> String {
    match value {
        CellValue::Text(s) => s.clone(),
        CellValue::Float(f) => format_float_grouped(*f, effective_precision(column)),
        CellValue::Decimal(d) => format_decimal_grouped(*d, effective_precision(column)),
        CellValue::DateTime(dt) => format_datetime(dt, column.format()),
        CellValue::Boolean(true) => check_glyph.to_string(),
        CellValue::Boolean(false) | CellValue::Null => String::new(),
        CellValue::Integer(_) => apply_template(column.format(), &value.to_string()),
    }
}

fn effective_precision(column: &Column) -> usize {
    match column.precision() {
        0 => DEFAULT_PRECISION,
        p => p,
    }
}

/// `1234.5` with precision 2 becomes `1,234.50`
pub fn format_float_grouped(value: f64, precision: usize) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let fixed = format!("{:.*}", precision, value.abs());
    let negative = value < 0.0 && fixed.chars().any(|c| c.is_ascii_digit() && c != '0');
    group_fixed(&fixed, negative)
}

pub fn format_decimal_grouped(value: Decimal, precision: usize) -> String {
    let rounded = value.round_dp(precision as u32);
    let digits = rounded.abs().to_string();
    let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits.as_str(), ""));

    let mut fixed = int_part.to_string();
    if precision > 0 {
        fixed.push('.');
        fixed.push_str(frac_part);
        for _ in frac_part.len()..precision {
            fixed.push('0');
        }
    }
    group_fixed(&fixed, rounded.is_sign_negative() && !rounded.is_zero())
}

/// Insert thousands separators into an unsigned fixed-point string
fn group_fixed(fixed: &str, negative: bool) -> String {
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed, None),
    };

    let mut grouped = String::with_capacity(fixed.len() + int_part.len() / 3 + 1);
    if negative {
        grouped.push('-');
    }
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if let Some(frac) = frac_part {
        grouped.push('.');
        grouped.push_str(frac);
    }
    grouped
}

pub fn format_datetime(value: &NaiveDateTime, format: &str) -> String {
    if value.year() <= NULL_DATE_YEAR {
        return String::new();
    }

    let pattern = if format.contains('%') {
        format
    } else {
        DEFAULT_DATETIME_FORMAT
    };

    let items: Vec<Item<'_>> = StrftimeItems::new(pattern).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return value.format(DEFAULT_DATETIME_FORMAT).to_string();
    }
    value.format_with_items(items.into_iter()).to_string()
}

/// Substitute the value for the first `{}` in a column template
pub fn apply_template(template: &str, value: &str) -> String {
    if template.contains("{}") {
        template.replacen("{}", value, 1)
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn column() -> Column {
        Column::new("c")
    }

    #[test]
    fn test_float_grouped_with_precision() {
        let col = column().with_precision(2);
        assert_eq!(format_cell(&CellValue::Float(1234.5), &col, CHECK_GLYPH), "1,234.50");
        assert_eq!(format_float_grouped(-9876543.219, 1), "-9,876,543.2");
        assert_eq!(format_float_grouped(12.0, 0), "12");
        assert_eq!(format_float_grouped(-0.001, 2), "0.00");
    }

    #[test]
    fn test_default_precision_is_two() {
        assert_eq!(
            format_cell(&CellValue::Float(1.0), &column(), CHECK_GLYPH),
            "1.00"
        );
    }

    #[test]
    fn test_decimal_grouped() {
        let d = Decimal::from_str("1234567.5").unwrap();
        assert_eq!(format_decimal_grouped(d, 2), "1,234,567.50");
        let n = Decimal::from_str("-1000.005").unwrap();
        assert_eq!(format_decimal_grouped(n, 3), "-1,000.005");
        assert_eq!(format_decimal_grouped(Decimal::from(5), 0), "5");
    }

    #[test]
    fn test_booleans_render_glyph_or_empty() {
        assert_eq!(format_cell(&CellValue::Boolean(true), &column(), CHECK_GLYPH), "✔");
        assert_eq!(format_cell(&CellValue::Boolean(false), &column(), CHECK_GLYPH), "");
    }

    #[test]
    fn test_datetime_sentinel_is_empty() {
        let old = NaiveDate::from_ymd_opt(1601, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(format_datetime(&old, "%Y"), "");

        let dt = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(14, 5, 0)
            .unwrap();
        assert_eq!(format_datetime(&dt, "%d/%m/%Y"), "09/03/2024");
        assert_eq!(format_datetime(&dt, "{}"), "2024-03-09 14:05:00");
    }

    #[test]
    fn test_template_for_other_values() {
        let col = column().with_format("#{}");
        assert_eq!(format_cell(&CellValue::Integer(7), &col, CHECK_GLYPH), "#7");
        assert_eq!(format_cell(&CellValue::Text("x".into()), &col, CHECK_GLYPH), "x");
        assert_eq!(format_cell(&CellValue::Null, &col, CHECK_GLYPH), "");
        assert_eq!(apply_template("no placeholder", "3"), "3");
    }
}
