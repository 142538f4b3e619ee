//! Formula evaluation.
//!
//! Formulas are parsed into an [`Expr`] tree and interpreted against the
//! fixed built-in namespace (see [`crate::builtins`]). Cell access goes
//! through a [`CellResolver`], so the evaluator never touches cell storage
//! directly.

use std::cmp::Ordering;
use thiserror::Error;

use super::cell_ref::CellRange;
use super::format::format_value;
use super::parser::{BinaryOp, Expr, UnaryOp, parse_formula};
use super::value::CellValue;

/// Errors raised while parsing or evaluating a formula.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("Parse error at {pos}: {message}")]
    Parse { pos: usize, message: String },

    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error("Wrong number of arguments for {function}: expected {expected}, got {actual}")]
    ArgumentCount {
        function: String,
        expected: String,
        actual: usize,
    },

    #[error("Type error: {0}")]
    Type(String),

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    #[error("Range {reference} is larger than {max} cells")]
    RangeTooLarge { reference: String, max: usize },

    #[error("{0}")]
    Runtime(String),
}

impl EvalError {
    /// True for failures caused by a dangling or malformed cell reference.
    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            EvalError::InvalidReference(_) | EvalError::RangeTooLarge { .. }
        )
    }
}

/// Supplies cell contents to the evaluator.
pub trait CellResolver {
    /// Value of the cell or range named by `reference` (`"A1"`, `"A1:B5"`).
    fn resolve(&self, reference: &str) -> Result<CellValue, EvalError>;
}

/// Resolver for formulas evaluated without a grid: every cell is empty.
pub struct NoCells;

impl CellResolver for NoCells {
    fn resolve(&self, reference: &str) -> Result<CellValue, EvalError> {
        CellRange::parse(reference)
            .map(|_| CellValue::Empty)
            .ok_or_else(|| EvalError::InvalidReference(reference.to_string()))
    }
}

/// Shape a range read into a value: flat for one row or column, a table otherwise.
///
/// `lookup` is called for every position of the normalized rectangle in
/// row-major order.
pub fn collect_range(range: &CellRange, mut lookup: impl FnMut(super::CellPos) -> CellValue) -> CellValue {
    if range.is_single() {
        return lookup(range.start);
    }
    let tl = range.top_left();
    let br = range.bottom_right();
    if range.rows() == 1 || range.cols() == 1 {
        return CellValue::Sequence(range.positions().map(&mut lookup).collect());
    }
    let rows = (tl.row..=br.row)
        .map(|row| {
            (tl.col..=br.col)
                .map(|col| lookup(super::CellPos::new(row, col)))
                .collect()
        })
        .collect();
    CellValue::Table(rows)
}

/// Parse and evaluate `formula` (leading `=` optional).
pub fn evaluate(formula: &str, resolver: &dyn CellResolver) -> Result<CellValue, EvalError> {
    let expr = parse_formula(formula)?;
    eval_expr(&expr, resolver)
}

pub fn eval_expr(expr: &Expr, resolver: &dyn CellResolver) -> Result<CellValue, EvalError> {
    match expr {
        Expr::Number(n) => Ok(CellValue::Number(*n)),
        Expr::Str(s) => Ok(CellValue::Text(s.clone())),
        Expr::Bool(b) => Ok(CellValue::Bool(*b)),
        Expr::Null => Ok(CellValue::Empty),
        Expr::Array(items) => Ok(CellValue::Sequence(
            items
                .iter()
                .map(|e| eval_expr(e, resolver))
                .collect::<Result<_, _>>()?,
        )),
        Expr::Unary { op, operand } => {
            let value = eval_expr(operand, resolver)?;
            match op {
                UnaryOp::Not => Ok(CellValue::Bool(!value.is_truthy())),
                UnaryOp::Plus => Ok(CellValue::Number(to_number(&value)?)),
                UnaryOp::Negate => Ok(CellValue::Number(-to_number(&value)?)),
            }
        }
        Expr::Binary { op, left, right } => {
            let l = eval_expr(left, resolver)?;
            let r = eval_expr(right, resolver)?;
            binary(*op, &l, &r)
        }
        Expr::Logical { and, left, right } => {
            let l = eval_expr(left, resolver)?;
            // JS-style: return the deciding operand, not a coerced boolean.
            if l.is_truthy() != *and {
                Ok(l)
            } else {
                eval_expr(right, resolver)
            }
        }
        Expr::Conditional {
            cond,
            then,
            otherwise,
        } => {
            if eval_expr(cond, resolver)?.is_truthy() {
                eval_expr(then, resolver)
            } else {
                eval_expr(otherwise, resolver)
            }
        }
        Expr::Index { target, index } => {
            let target = eval_expr(target, resolver)?;
            let index = to_number(&eval_expr(index, resolver)?)?;
            index_value(target, index)
        }
        Expr::Call { name, args } => {
            let values = args
                .iter()
                .map(|a| eval_expr(a, resolver))
                .collect::<Result<Vec<_>, _>>()?;
            crate::builtins::call(name, values, resolver)
        }
    }
}

pub(crate) fn to_number(value: &CellValue) -> Result<f64, EvalError> {
    value.as_number().ok_or_else(|| {
        EvalError::Type(format!("cannot convert {} to a number", describe(value)))
    })
}

pub(crate) fn describe(value: &CellValue) -> String {
    match value {
        CellValue::Text(s) => format!("\"{}\"", s),
        other => format!("{} {}", other.data_type(), format_value(other)),
    }
}

fn index_value(target: CellValue, index: f64) -> Result<CellValue, EvalError> {
    if index < 0.0 || index.fract() != 0.0 {
        return Err(EvalError::Runtime(format!("invalid index {}", index)));
    }
    let i = index as usize;
    let item = match target {
        CellValue::Sequence(mut items) => (i < items.len()).then(|| items.swap_remove(i)),
        CellValue::Table(mut rows) => (i < rows.len()).then(|| CellValue::Sequence(rows.swap_remove(i))),
        CellValue::Text(s) => s.chars().nth(i).map(|c| CellValue::Text(c.to_string())),
        other => {
            return Err(EvalError::Type(format!("cannot index into {}", describe(&other))));
        }
    };
    // Out of range reads give an empty value, like reading past an array end.
    Ok(item.unwrap_or(CellValue::Empty))
}

fn binary(op: BinaryOp, l: &CellValue, r: &CellValue) -> Result<CellValue, EvalError> {
    match op {
        BinaryOp::Add => {
            if matches!(l, CellValue::Text(_)) || matches!(r, CellValue::Text(_)) {
                return Ok(CellValue::Text(format!("{}{}", format_value(l), format_value(r))));
            }
            Ok(CellValue::Number(to_number(l)? + to_number(r)?))
        }
        BinaryOp::Subtract => Ok(CellValue::Number(to_number(l)? - to_number(r)?)),
        BinaryOp::Multiply => Ok(CellValue::Number(to_number(l)? * to_number(r)?)),
        BinaryOp::Divide => {
            let divisor = to_number(r)?;
            if divisor == 0.0 {
                return Err(EvalError::DivisionByZero);
            }
            Ok(CellValue::Number(to_number(l)? / divisor))
        }
        BinaryOp::Remainder => {
            let divisor = to_number(r)?;
            if divisor == 0.0 {
                return Err(EvalError::DivisionByZero);
            }
            Ok(CellValue::Number(to_number(l)? % divisor))
        }
        BinaryOp::Power => Ok(CellValue::Number(to_number(l)?.powf(to_number(r)?))),
        BinaryOp::Equal => Ok(CellValue::Bool(values_equal(l, r))),
        BinaryOp::NotEqual => Ok(CellValue::Bool(!values_equal(l, r))),
        BinaryOp::Less => compare(l, r).map(|o| CellValue::Bool(o == Ordering::Less)),
        BinaryOp::LessEqual => compare(l, r).map(|o| CellValue::Bool(o != Ordering::Greater)),
        BinaryOp::Greater => compare(l, r).map(|o| CellValue::Bool(o == Ordering::Greater)),
        BinaryOp::GreaterEqual => compare(l, r).map(|o| CellValue::Bool(o != Ordering::Less)),
    }
}

fn values_equal(l: &CellValue, r: &CellValue) -> bool {
    match (l, r) {
        (CellValue::Number(a), CellValue::Number(b)) => a == b,
        (CellValue::Empty, CellValue::Text(s)) | (CellValue::Text(s), CellValue::Empty) => s.is_empty(),
        _ => l == r,
    }
}

fn compare(l: &CellValue, r: &CellValue) -> Result<Ordering, EvalError> {
    let ordering = match (l, r) {
        (CellValue::Text(a), CellValue::Text(b)) => Some(a.cmp(b)),
        (CellValue::Timestamp(a), CellValue::Timestamp(b)) => Some(a.cmp(b)),
        _ => {
            let a = to_number(l)?;
            let b = to_number(r)?;
            a.partial_cmp(&b)
        }
    };
    ordering.ok_or_else(|| EvalError::Type("cannot compare NaN".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MapResolver(HashMap<&'static str, CellValue>);

    impl CellResolver for MapResolver {
        fn resolve(&self, reference: &str) -> Result<CellValue, EvalError> {
            let range = CellRange::parse(reference)
                .ok_or_else(|| EvalError::InvalidReference(reference.to_string()))?;
            Ok(collect_range(&range, |pos| {
                self.0
                    .get(pos.to_string().as_str())
                    .cloned()
                    .unwrap_or(CellValue::Empty)
            }))
        }
    }

    fn eval(formula: &str) -> Result<CellValue, EvalError> {
        evaluate(formula, &NoCells)
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval("=1 + 2 * 3"), Ok(CellValue::Number(7.0)));
        assert_eq!(eval("=(1 + 2) * 3"), Ok(CellValue::Number(9.0)));
        assert_eq!(eval("=2 ** 10"), Ok(CellValue::Number(1024.0)));
        assert_eq!(eval("=7 % 4"), Ok(CellValue::Number(3.0)));
        assert_eq!(eval("=-3 + +2"), Ok(CellValue::Number(-1.0)));
    }

    #[test]
    fn test_division_by_zero_is_an_error() {
        assert_eq!(eval("=1/0"), Err(EvalError::DivisionByZero));
    }

    #[test]
    fn test_string_concatenation_with_plus() {
        assert_eq!(eval("=\"a\" + 1"), Ok(CellValue::Text("a1".into())));
    }

    #[test]
    fn test_comparisons_and_logic() {
        assert_eq!(eval("=1 < 2 && 3 >= 3"), Ok(CellValue::Bool(true)));
        assert_eq!(eval("=\"a\" == 'a'"), Ok(CellValue::Bool(true)));
        assert_eq!(eval("=0 || \"x\""), Ok(CellValue::Text("x".into())));
        assert_eq!(eval("=!true"), Ok(CellValue::Bool(false)));
    }

    #[test]
    fn test_ternary() {
        assert_eq!(eval("=2 > 1 ? \"yes\" : \"no\""), Ok(CellValue::Text("yes".into())));
    }

    #[test]
    fn test_text_arithmetic_fails() {
        assert!(matches!(eval("=\"abc\" * 2"), Err(EvalError::Type(_))));
    }

    #[test]
    fn test_cell_access_through_resolver() {
        let resolver = MapResolver(HashMap::from([
            ("A1", CellValue::Number(1.0)),
            ("A2", CellValue::Number(2.0)),
            ("B1", CellValue::Number(10.0)),
        ]));
        assert_eq!(
            evaluate("=cell(\"A1\") + cell(\"B1\")", &resolver),
            Ok(CellValue::Number(11.0))
        );
        assert_eq!(
            evaluate("=cell(\"A1:A2\")", &resolver),
            Ok(CellValue::Sequence(vec![CellValue::Number(1.0), CellValue::Number(2.0)]))
        );
        assert_eq!(
            evaluate("=cell(\"A1:B2\")[0][1]", &resolver),
            Ok(CellValue::Number(10.0))
        );
    }

    #[test]
    fn test_reversed_range_is_normalized() {
        let resolver = MapResolver(HashMap::from([
            ("A1", CellValue::Number(1.0)),
            ("A2", CellValue::Number(2.0)),
        ]));
        assert_eq!(
            evaluate("=cell(\"A2:A1\")", &resolver),
            Ok(CellValue::Sequence(vec![CellValue::Number(1.0), CellValue::Number(2.0)]))
        );
    }

    #[test]
    fn test_invalid_reference() {
        let err = eval("=cell(\"nope\")").unwrap_err();
        assert!(err.is_reference());
    }
}
