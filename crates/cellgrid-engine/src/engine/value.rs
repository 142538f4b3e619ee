//! Typed cell values.
//!
//! [`CellValue`] is the closed set of things a cell can hold or a formula can
//! produce. [`DataType`] is the coarse type tag shown to users and used for
//! type pinning.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Date/time layouts accepted when text is coerced to a date.
const DATE_TIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub enum CellValue {
    #[default]
    Empty,
    Number(f64),
    Text(String),
    Bool(bool),
    Timestamp(NaiveDateTime),
    /// One row or one column of values.
    Sequence(Vec<CellValue>),
    /// Row-major rectangle of values.
    Table(Vec<Vec<CellValue>>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Empty,
    Number,
    String,
    Boolean,
    Date,
    Array,
}

impl DataType {
    pub fn name(&self) -> &'static str {
        match self {
            DataType::Empty => "empty",
            DataType::Number => "number",
            DataType::String => "string",
            DataType::Boolean => "boolean",
            DataType::Date => "date",
            DataType::Array => "array",
        }
    }

    pub fn from_name(name: &str) -> Option<DataType> {
        match name.trim().to_ascii_lowercase().as_str() {
            "empty" | "null" => Some(DataType::Empty),
            "number" => Some(DataType::Number),
            "string" | "text" => Some(DataType::String),
            "boolean" | "bool" => Some(DataType::Boolean),
            "date" => Some(DataType::Date),
            "array" => Some(DataType::Array),
            _ => None,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl CellValue {
    /// Parse literal user input.
    /// - Empty string or whitespace -> Empty
    /// - Quoted string -> Text (without quotes)
    /// - Valid number -> Number
    /// - TRUE / FALSE (any case) -> Bool
    /// - Otherwise -> Text
    ///
    /// Text starting with `=` is a formula and never reaches this function.
    pub fn from_input(input: &str) -> CellValue {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return CellValue::Empty;
        }

        if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2 {
            return CellValue::Text(trimmed[1..trimmed.len() - 1].to_string());
        }

        if let Some(n) = parse_number(trimmed) {
            return CellValue::Number(n);
        }

        if trimmed.eq_ignore_ascii_case("true") {
            return CellValue::Bool(true);
        }
        if trimmed.eq_ignore_ascii_case("false") {
            return CellValue::Bool(false);
        }

        CellValue::Text(trimmed.to_string())
    }

    pub fn data_type(&self) -> DataType {
        match self {
            CellValue::Empty => DataType::Empty,
            CellValue::Number(_) => DataType::Number,
            CellValue::Text(_) => DataType::String,
            CellValue::Bool(_) => DataType::Boolean,
            CellValue::Timestamp(_) => DataType::Date,
            CellValue::Sequence(_) | CellValue::Table(_) => DataType::Array,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Whether this value may be stored in a cell pinned to `expected`.
    pub fn conforms_to(&self, expected: DataType) -> bool {
        if matches!(self, CellValue::Empty) {
            return true;
        }
        match expected {
            DataType::Number => match self {
                CellValue::Number(_) => true,
                CellValue::Text(s) => parse_number(s).is_some(),
                _ => false,
            },
            DataType::String => true,
            DataType::Date => match self {
                CellValue::Timestamp(_) => true,
                CellValue::Text(s) => parse_timestamp(s).is_some(),
                _ => false,
            },
            other => self.data_type() == other,
        }
    }

    /// Convert to the pinned type when the conversion is lossless
    /// (numeric text to a number, date text to a timestamp).
    pub fn coerce_to(self, expected: DataType) -> CellValue {
        match (&self, expected) {
            (CellValue::Text(s), DataType::Number) => {
                parse_number(s).map(CellValue::Number).unwrap_or(self)
            }
            (CellValue::Text(s), DataType::Date) => {
                parse_timestamp(s).map(CellValue::Timestamp).unwrap_or(self)
            }
            _ => self,
        }
    }

    /// Numeric view used by arithmetic. Empty counts as zero, booleans as 0/1.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Empty => Some(0.0),
            CellValue::Number(n) => Some(*n),
            CellValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            CellValue::Text(s) => parse_number(s),
            _ => None,
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            CellValue::Empty => false,
            CellValue::Number(n) => *n != 0.0 && !n.is_nan(),
            CellValue::Text(s) => !s.is_empty(),
            CellValue::Bool(b) => *b,
            CellValue::Timestamp(_) | CellValue::Sequence(_) | CellValue::Table(_) => true,
        }
    }

    /// Flatten sequences and tables into their scalar members (row-major).
    pub fn flatten(&self) -> Vec<&CellValue> {
        let mut out = Vec::new();
        self.flatten_into(&mut out);
        out
    }

    fn flatten_into<'a>(&'a self, out: &mut Vec<&'a CellValue>) {
        match self {
            CellValue::Sequence(items) => items.iter().for_each(|v| v.flatten_into(out)),
            CellValue::Table(rows) => rows.iter().flatten().for_each(|v| v.flatten_into(out)),
            scalar => out.push(scalar),
        }
    }

    /// JSON view used to render arrays the way a browser would stringify them.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;
        match self {
            CellValue::Empty => Value::Null,
            CellValue::Number(n) => number_to_json(*n),
            CellValue::Text(s) => Value::String(s.clone()),
            CellValue::Bool(b) => Value::Bool(*b),
            CellValue::Timestamp(ts) => {
                Value::String(ts.format("%Y-%m-%dT%H:%M:%S%.3f").to_string())
            }
            CellValue::Sequence(items) => Value::Array(items.iter().map(|v| v.to_json()).collect()),
            CellValue::Table(rows) => Value::Array(
                rows.iter()
                    .map(|row| Value::Array(row.iter().map(|v| v.to_json()).collect()))
                    .collect(),
            ),
        }
    }
}

/// Integral values serialize without a fractional part (`5`, not `5.0`).
fn number_to_json(n: f64) -> serde_json::Value {
    const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        serde_json::Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    }
}

/// Strict numeric parse: rejects `inf`/`nan` spellings that `f64::from_str` accepts.
pub fn parse_number(text: &str) -> Option<f64> {
    let t = text.trim();
    if t.is_empty() || t.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') {
        return None;
    }
    t.parse::<f64>().ok()
}

/// Parse text using the fixed date/time format table.
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let t = text.trim();
    for fmt in DATE_TIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(t, fmt) {
            return Some(ts);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(t, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<i32> for CellValue {
    fn from(n: i32) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(ts: NaiveDateTime) -> Self {
        CellValue::Timestamp(ts)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(CellValue::Empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_input_detects_types() {
        assert_eq!(CellValue::from_input("5"), CellValue::Number(5.0));
        assert_eq!(CellValue::from_input(" -2.5 "), CellValue::Number(-2.5));
        assert_eq!(CellValue::from_input("TRUE"), CellValue::Bool(true));
        assert_eq!(CellValue::from_input("false"), CellValue::Bool(false));
        assert_eq!(CellValue::from_input("\"42\""), CellValue::Text("42".into()));
        assert_eq!(CellValue::from_input("hello"), CellValue::Text("hello".into()));
        assert_eq!(CellValue::from_input("   "), CellValue::Empty);
    }

    #[test]
    fn test_parse_number_rejects_words() {
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number("1e3"), Some(1000.0));
        assert_eq!(parse_number("abc"), None);
    }

    #[test]
    fn test_conforms_to_rules() {
        let text = CellValue::Text("12".into());
        assert!(text.conforms_to(DataType::Number));
        assert!(!CellValue::Text("abc".into()).conforms_to(DataType::Number));
        assert!(CellValue::Bool(true).conforms_to(DataType::String));
        assert!(CellValue::Text("2024-03-01".into()).conforms_to(DataType::Date));
        assert!(!CellValue::Number(3.0).conforms_to(DataType::Boolean));
        assert!(CellValue::Empty.conforms_to(DataType::Date));
    }

    #[test]
    fn test_flatten_table() {
        let table = CellValue::Table(vec![
            vec![CellValue::Number(1.0), CellValue::Number(2.0)],
            vec![CellValue::Number(3.0), CellValue::Empty],
        ]);
        assert_eq!(table.flatten().len(), 4);
    }

    #[test]
    fn test_json_integers_have_no_fraction() {
        let seq = CellValue::Sequence(vec![CellValue::Number(1.0), CellValue::Number(2.5)]);
        assert_eq!(seq.to_json().to_string(), "[1,2.5]");
    }
}
