//! Spreadsheet engine API.
//!
//! This module provides the pure computation side of the spreadsheet:
//!
//! - [`CellPos`], [`CellRange`] - Reference parsing (A1 notation <-> row/col indices)
//! - [`CellValue`], [`DataType`] - Typed cell values and type detection
//! - [`Format`], [`render`] - Display formats and value rendering
//! - [`extract_references`], [`extract_dependency_keys`] - Formula reference scanning
//! - [`parse_formula`], [`evaluate`] - Formula parsing and evaluation
//! - [`CellResolver`] - How the evaluator reads cells

mod cell_ref;
mod deps;
pub(crate) mod eval;
mod format;
mod lexer;
mod parser;
mod value;

pub use cell_ref::{CellPos, CellRange};
pub use deps::{
    MAX_DEPENDENCY_RANGE_CELLS, REFERENCE_COLORS, extract_dependency_keys,
    extract_dependency_keys_capped, extract_references, offset_formula_references,
    reference_color,
};
pub use eval::{CellResolver, EvalError, NoCells, collect_range, eval_expr, evaluate};
pub use format::{Format, format_number, format_value, render};
pub use parser::{BinaryOp, Expr, UnaryOp, parse_formula};
pub use value::{CellValue, DataType, parse_number, parse_timestamp};
