//! Cell records stored in the document grid.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use cellgrid_engine::engine::{CellPos, CellValue, DataType, Format, render};

/// Sparse grid storage. Absent entries are empty cells.
pub type Grid = DashMap<CellPos, Cell>;

/// Presentational attributes (`"fontWeight" -> "bold"`), merge-updated.
pub type CellStyle = BTreeMap<String, String>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    /// The formula failed to parse or evaluate.
    Formula,
    /// The value does not fit the cell's pinned data type.
    TypeMismatch,
    /// The cell is part of (or fed by) a reference cycle.
    Circular,
    /// A `cell()` reference could not be resolved.
    Reference,
}

impl ErrorKind {
    /// Fixed display marker shown instead of the value.
    pub fn marker(&self) -> &'static str {
        match self {
            ErrorKind::Formula => "#ERROR!",
            ErrorKind::TypeMismatch => "#TYPE!",
            ErrorKind::Circular => "#CIRC!",
            ErrorKind::Reference => "#REF!",
        }
    }

    /// Type mismatches keep the value visible; everything else shows the marker.
    pub fn hides_value(&self) -> bool {
        !matches!(self, ErrorKind::TypeMismatch)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorKind::Formula => "formula",
            ErrorKind::TypeMismatch => "type-mismatch",
            ErrorKind::Circular => "circular",
            ErrorKind::Reference => "reference",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CellError {
    pub message: String,
    pub kind: ErrorKind,
}

impl CellError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        CellError {
            message: message.into(),
            kind,
        }
    }

    fn type_mismatch(expected: DataType, value: &CellValue) -> Self {
        CellError::new(
            ErrorKind::TypeMismatch,
            format!("Expected {}, got {}", expected, value.data_type()),
        )
    }
}

/// A cell in the spreadsheet grid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    /// Literal value, or the last successful formula result.
    pub raw_value: CellValue,
    /// Formula text including the leading `=`.
    pub formula: Option<String>,
    /// Effective type: the override if pinned, else detected from `raw_value`.
    pub data_type: DataType,
    pub data_type_override: Option<DataType>,
    pub formatting: Format,
    /// Cached rendering; see [`Cell::refresh_display`].
    pub display_value: String,
    pub computed: bool,
    pub error: Option<CellError>,
    pub style: CellStyle,
    /// Cells this formula reads through `cell(...)`.
    pub depends_on: Vec<CellPos>,
}

impl Default for Cell {
    fn default() -> Self {
        Cell::new_empty()
    }
}

impl Cell {
    pub fn new_empty() -> Cell {
        Cell {
            raw_value: CellValue::Empty,
            formula: None,
            data_type: DataType::Empty,
            data_type_override: None,
            formatting: Format::General,
            display_value: String::new(),
            computed: false,
            error: None,
            style: CellStyle::new(),
            depends_on: vec![],
        }
    }

    /// Text to put in an editor: the formula, or the literal's display.
    pub fn to_input_string(&self) -> String {
        match &self.formula {
            Some(f) => f.clone(),
            None => match &self.raw_value {
                CellValue::Empty => String::new(),
                other => cellgrid_engine::engine::format_value(other),
            },
        }
    }

    /// Store a new value, honouring the pinned type.
    ///
    /// Values that can be converted losslessly are converted; values that
    /// cannot are stored anyway with a type-mismatch error.
    pub fn store_value(&mut self, value: CellValue) {
        let value = match self.data_type_override {
            Some(t) => value.coerce_to(t),
            None => value,
        };
        self.error = match self.data_type_override {
            Some(t) if !value.conforms_to(t) => Some(CellError::type_mismatch(t, &value)),
            _ => None,
        };
        self.data_type = self.data_type_override.unwrap_or_else(|| value.data_type());
        self.raw_value = value;
        self.refresh_display();
    }

    /// Record a failure. The previous value is kept; the display shows the marker.
    pub fn store_error(&mut self, error: CellError) {
        self.error = Some(error);
        self.refresh_display();
    }

    /// Reset to the empty literal state. Style, pinned type and format survive.
    pub fn clear_value(&mut self) {
        self.raw_value = CellValue::Empty;
        self.formula = None;
        self.computed = false;
        self.error = None;
        self.depends_on.clear();
        self.data_type = self.data_type_override.unwrap_or(DataType::Empty);
        self.refresh_display();
    }

    /// Pin (or unpin) the data type and re-validate the current value.
    /// Returns true if the raw value changed through coercion.
    pub fn set_data_type_override(&mut self, data_type: Option<DataType>) -> bool {
        self.data_type_override = data_type;

        let before = self.raw_value.clone();
        let keep_error = self
            .error
            .as_ref()
            .filter(|e| e.kind != ErrorKind::TypeMismatch)
            .cloned();
        self.store_value(before.clone());
        if keep_error.is_some() {
            self.error = keep_error;
        }

        if !self.formatting.allowed_for(self.data_type) {
            self.formatting = Format::General;
        }
        self.refresh_display();
        self.raw_value != before
    }

    /// Recompute `display_value` from value, type, format and error.
    pub fn refresh_display(&mut self) {
        self.display_value = match &self.error {
            Some(e) if e.kind.hides_value() => e.kind.marker().to_string(),
            _ => render(&self.raw_value, self.data_type, self.formatting),
        };
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_value_detects_type() {
        let mut cell = Cell::new_empty();
        cell.store_value(CellValue::Number(5.0));
        assert_eq!(cell.data_type, DataType::Number);
        assert_eq!(cell.display_value, "5");
        assert!(cell.error.is_none());
    }

    #[test]
    fn test_override_coerces_numeric_text() {
        let mut cell = Cell::new_empty();
        cell.set_data_type_override(Some(DataType::Number));
        cell.store_value(CellValue::Text("12".into()));
        assert_eq!(cell.raw_value, CellValue::Number(12.0));
        assert!(cell.error.is_none());
    }

    #[test]
    fn test_override_mismatch_keeps_value_visible() {
        let mut cell = Cell::new_empty();
        cell.set_data_type_override(Some(DataType::Number));
        cell.store_value(CellValue::Text("abc".into()));
        assert_eq!(cell.raw_value, CellValue::Text("abc".into()));
        assert_eq!(cell.error.as_ref().map(|e| e.kind), Some(ErrorKind::TypeMismatch));
        assert_eq!(cell.data_type, DataType::Number);
        assert_eq!(cell.display_value, "abc");
    }

    #[test]
    fn test_store_error_keeps_last_value() {
        let mut cell = Cell::new_empty();
        cell.store_value(CellValue::Number(3.0));
        cell.store_error(CellError::new(ErrorKind::Formula, "boom"));
        assert_eq!(cell.raw_value, CellValue::Number(3.0));
        assert_eq!(cell.display_value, "#ERROR!");
    }

    #[test]
    fn test_unpinning_clears_mismatch() {
        let mut cell = Cell::new_empty();
        cell.set_data_type_override(Some(DataType::Boolean));
        cell.store_value(CellValue::Number(1.0));
        assert!(cell.has_error());
        cell.set_data_type_override(None);
        assert!(!cell.has_error());
        assert_eq!(cell.data_type, DataType::Number);
    }

    #[test]
    fn test_input_string_prefers_formula() {
        let mut cell = Cell::new_empty();
        assert_eq!(cell.to_input_string(), "");
        cell.store_value(CellValue::Bool(true));
        assert_eq!(cell.to_input_string(), "TRUE");
        cell.formula = Some("=1 + 1".into());
        assert_eq!(cell.to_input_string(), "=1 + 1");
    }

    #[test]
    fn test_changing_type_resets_disallowed_format() {
        let mut cell = Cell::new_empty();
        cell.store_value(CellValue::Number(0.5));
        cell.formatting = Format::Percentage;
        cell.set_data_type_override(Some(DataType::String));
        assert_eq!(cell.formatting, Format::General);
        assert_eq!(cell.display_value, "0.5");
    }
}
