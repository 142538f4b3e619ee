//! Display formats and value rendering.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::value::{CellValue, DataType};

/// A display-format tag. Which tags apply depends on the cell's data type,
/// see [`Format::options_for`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[default]
    General,
    Integer,
    Decimal,
    Decimal2,
    Decimal3,
    Decimal4,
    Decimal6,
    Currency,
    Percentage,
    Scientific,
    String,
    Array,
    #[serde(rename = "DDMMYYYY")]
    DayMonthYear,
    #[serde(rename = "MMDDYYYY")]
    MonthDayYear,
    #[serde(rename = "YYYYMMDD")]
    YearMonthDay,
    #[serde(rename = "DDMM")]
    DayMonth,
    #[serde(rename = "MMDD")]
    MonthDay,
    Time,
    DateTime,
}

const NUMBER_FORMATS: &[Format] = &[
    Format::General,
    Format::Integer,
    Format::Decimal,
    Format::Decimal2,
    Format::Decimal3,
    Format::Decimal4,
    Format::Decimal6,
    Format::Currency,
    Format::Percentage,
    Format::Scientific,
];

const DATE_FORMATS: &[Format] = &[
    Format::General,
    Format::DayMonthYear,
    Format::MonthDayYear,
    Format::YearMonthDay,
    Format::DayMonth,
    Format::MonthDay,
    Format::Time,
    Format::DateTime,
];

impl Format {
    /// Formats a user may pick for a value of `data_type`.
    pub fn options_for(data_type: DataType) -> &'static [Format] {
        match data_type {
            DataType::Number => NUMBER_FORMATS,
            DataType::Date => DATE_FORMATS,
            DataType::String => &[Format::General, Format::String],
            DataType::Array => &[Format::General, Format::Array],
            DataType::Empty | DataType::Boolean => &[Format::General],
        }
    }

    pub fn allowed_for(&self, data_type: DataType) -> bool {
        Format::options_for(data_type).contains(self)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Format::General => "general",
            Format::Integer => "integer",
            Format::Decimal => "decimal",
            Format::Decimal2 => "decimal2",
            Format::Decimal3 => "decimal3",
            Format::Decimal4 => "decimal4",
            Format::Decimal6 => "decimal6",
            Format::Currency => "currency",
            Format::Percentage => "percentage",
            Format::Scientific => "scientific",
            Format::String => "string",
            Format::Array => "array",
            Format::DayMonthYear => "DDMMYYYY",
            Format::MonthDayYear => "MMDDYYYY",
            Format::YearMonthDay => "YYYYMMDD",
            Format::DayMonth => "DDMM",
            Format::MonthDay => "MMDD",
            Format::Time => "time",
            Format::DateTime => "datetime",
        }
    }

    pub fn from_name(name: &str) -> Option<Format> {
        const ALL: &[Format] = &[
            Format::General,
            Format::Integer,
            Format::Decimal,
            Format::Decimal2,
            Format::Decimal3,
            Format::Decimal4,
            Format::Decimal6,
            Format::Currency,
            Format::Percentage,
            Format::Scientific,
            Format::String,
            Format::Array,
            Format::DayMonthYear,
            Format::MonthDayYear,
            Format::YearMonthDay,
            Format::DayMonth,
            Format::MonthDay,
            Format::Time,
            Format::DateTime,
        ];
        ALL.iter().copied().find(|f| f.name().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Render a value for display under the effective data type and format.
///
/// A value that does not fit `data_type` (e.g. text in a cell pinned to
/// number) falls back to its natural rendering.
pub fn render(value: &CellValue, data_type: DataType, format: Format) -> String {
    match (value, data_type) {
        (CellValue::Empty, _) => String::new(),
        (CellValue::Number(n), DataType::Number) => format_number_as(*n, format),
        (CellValue::Timestamp(ts), DataType::Date) => format_timestamp(ts, format),
        _ => format_value(value),
    }
}

/// Natural rendering of a value with no format applied.
pub fn format_value(value: &CellValue) -> String {
    match value {
        CellValue::Empty => String::new(),
        CellValue::Number(n) => format_number(*n),
        CellValue::Text(s) => s.clone(),
        CellValue::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        CellValue::Timestamp(ts) => format_timestamp(ts, Format::General),
        CellValue::Sequence(_) | CellValue::Table(_) => value.to_json().to_string(),
    }
}

/// Format a number for display with the general format.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "#NAN!".to_string()
    } else if n.is_infinite() {
        "#INF!".to_string()
    } else {
        // f64 Display prints the shortest round-trip form ("5", "0.1").
        n.to_string()
    }
}

fn format_number_as(n: f64, format: Format) -> String {
    if !n.is_finite() {
        return format_number(n);
    }
    match format {
        // Halves round toward positive infinity: -2.5 -> -2.
        Format::Integer => format!("{:.0}", (n + 0.5).floor()),
        Format::Decimal => format!("{:.1}", n),
        Format::Decimal2 => format!("{:.2}", n),
        Format::Decimal3 => format!("{:.3}", n),
        Format::Decimal4 => format!("{:.4}", n),
        Format::Decimal6 => format!("{:.6}", n),
        Format::Currency => format_currency(n),
        Format::Percentage => format!("{:.2}%", n * 100.0),
        Format::Scientific => format_scientific(n, 2),
        _ => format_number(n),
    }
}

/// US dollar rendering with thousands separators: `-$1,234.50`.
fn format_currency(n: f64) -> String {
    let fixed = format!("{:.2}", n.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((&fixed, "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if n < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{}${}.{}", sign, grouped, frac_part)
}

/// Exponential notation with an explicit exponent sign: `1.23e+4`.
fn format_scientific(n: f64, digits: usize) -> String {
    let raw = format!("{:.*e}", digits, n);
    match raw.split_once('e') {
        Some((mantissa, exp)) if !exp.starts_with('-') => format!("{}e+{}", mantissa, exp),
        _ => raw,
    }
}

fn format_timestamp(ts: &NaiveDateTime, format: Format) -> String {
    let pattern = match format {
        Format::DayMonthYear => "%d/%m/%Y",
        Format::MonthDayYear => "%m/%d/%Y",
        Format::YearMonthDay => "%Y-%m-%d",
        Format::DayMonth => "%d/%m",
        Format::MonthDay => "%m/%d",
        Format::Time => "%H:%M:%S",
        Format::DateTime => "%d/%m/%Y %H:%M",
        _ => "%-m/%-d/%Y",
    };
    ts.format(pattern).to_string()
}
