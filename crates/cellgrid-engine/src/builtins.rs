//! Built-in spreadsheet functions and their metadata.
//!
//! Conventions:
//! - Formula-facing names are lowercase (`sum`, `avg`); lookup is
//!   case-insensitive because the parser lowercases call names.
//! - Aggregates flatten sequence/table arguments and skip non-numeric members.
//! - If you add a built-in, list it in `BUILTINS` and dispatch it in `call`.

use chrono::{Local, NaiveTime};

use crate::engine::{CellResolver, CellValue, EvalError, format_value};
use crate::engine::eval::{describe, to_number};

/// Longest sequence `range()` may produce.
pub const MAX_RANGE_LEN: usize = 1_000_000;

pub struct Builtin {
    pub name: &'static str,
    pub signature: &'static str,
    pub description: &'static str,
}

pub const BUILTINS: &[Builtin] = &[
    Builtin {
        name: "sum",
        signature: "sum(values...)",
        description: "Sum of numeric values",
    },
    Builtin {
        name: "avg",
        signature: "avg(values...)",
        description: "Average of numeric values",
    },
    Builtin {
        name: "max",
        signature: "max(values...)",
        description: "Largest numeric value",
    },
    Builtin {
        name: "min",
        signature: "min(values...)",
        description: "Smallest numeric value",
    },
    Builtin {
        name: "count",
        signature: "count(values...)",
        description: "Count of numeric values",
    },
    Builtin {
        name: "round",
        signature: "round(x, digits = 0)",
        description: "Round half away from zero",
    },
    Builtin {
        name: "floor",
        signature: "floor(x)",
        description: "Round down",
    },
    Builtin {
        name: "ceil",
        signature: "ceil(x)",
        description: "Round up",
    },
    Builtin {
        name: "abs",
        signature: "abs(x)",
        description: "Absolute value",
    },
    Builtin {
        name: "concat",
        signature: "concat(values...)",
        description: "Join the display text of all values",
    },
    Builtin {
        name: "upper",
        signature: "upper(text)",
        description: "Uppercase text",
    },
    Builtin {
        name: "lower",
        signature: "lower(text)",
        description: "Lowercase text",
    },
    Builtin {
        name: "trim",
        signature: "trim(text)",
        description: "Strip leading and trailing whitespace",
    },
    Builtin {
        name: "range",
        signature: "range(start, end)",
        description: "Inclusive integer sequence from start to end",
    },
    Builtin {
        name: "now",
        signature: "now()",
        description: "Current local date and time",
    },
    Builtin {
        name: "today",
        signature: "today()",
        description: "Current local date at midnight",
    },
    Builtin {
        name: "cell",
        signature: "cell(\"A1\") / cell(\"A1:B5\")",
        description: "Value of a cell, or the values of a range",
    },
];

fn arity(name: &str, expected: &str, args: &[CellValue], ok: bool) -> Result<(), EvalError> {
    if ok {
        Ok(())
    } else {
        Err(EvalError::ArgumentCount {
            function: name.to_string(),
            expected: expected.to_string(),
            actual: args.len(),
        })
    }
}

/// Numeric members of all arguments, flattened.
fn numbers(args: &[CellValue]) -> Vec<f64> {
    args.iter()
        .flat_map(|a| a.flatten())
        .filter_map(|v| match v {
            CellValue::Number(n) => Some(*n),
            _ => None,
        })
        .collect()
}

fn text_arg(name: &str, args: &[CellValue]) -> Result<String, EvalError> {
    arity(name, "1", args, args.len() == 1)?;
    match &args[0] {
        CellValue::Sequence(_) | CellValue::Table(_) => Err(EvalError::Type(format!(
            "{} expects text, got {}",
            name,
            describe(&args[0])
        ))),
        other => Ok(format_value(other)),
    }
}

fn unary_number(name: &str, args: &[CellValue], f: fn(f64) -> f64) -> Result<CellValue, EvalError> {
    arity(name, "1", args, args.len() == 1)?;
    Ok(CellValue::Number(f(to_number(&args[0])?)))
}

/// Dispatch a call to the built-in `name` (already lowercased).
pub fn call(
    name: &str,
    args: Vec<CellValue>,
    resolver: &dyn CellResolver,
) -> Result<CellValue, EvalError> {
    match name {
        "sum" => Ok(CellValue::Number(numbers(&args).iter().sum())),
        "avg" => {
            let nums = numbers(&args);
            if nums.is_empty() {
                return Err(EvalError::Runtime("avg of no numeric values".into()));
            }
            Ok(CellValue::Number(nums.iter().sum::<f64>() / nums.len() as f64))
        }
        "max" => numbers(&args)
            .into_iter()
            .reduce(f64::max)
            .map(CellValue::Number)
            .ok_or_else(|| EvalError::Runtime("max of no numeric values".into())),
        "min" => numbers(&args)
            .into_iter()
            .reduce(f64::min)
            .map(CellValue::Number)
            .ok_or_else(|| EvalError::Runtime("min of no numeric values".into())),
        "count" => Ok(CellValue::Number(numbers(&args).len() as f64)),
        "round" => {
            arity(name, "1 or 2", &args, matches!(args.len(), 1 | 2))?;
            let x = to_number(&args[0])?;
            let digits = match args.get(1) {
                Some(d) => to_number(d)?,
                None => 0.0,
            };
            if !(0.0..=12.0).contains(&digits) || digits.fract() != 0.0 {
                return Err(EvalError::Runtime("digits must be an integer from 0 to 12".into()));
            }
            let factor = 10f64.powi(digits as i32);
            Ok(CellValue::Number((x * factor).round() / factor))
        }
        "floor" => unary_number(name, &args, f64::floor),
        "ceil" => unary_number(name, &args, f64::ceil),
        "abs" => unary_number(name, &args, f64::abs),
        "concat" => Ok(CellValue::Text(
            args.iter()
                .flat_map(|a| a.flatten())
                .map(format_value)
                .collect(),
        )),
        "upper" => text_arg(name, &args).map(|s| CellValue::Text(s.to_uppercase())),
        "lower" => text_arg(name, &args).map(|s| CellValue::Text(s.to_lowercase())),
        "trim" => text_arg(name, &args).map(|s| CellValue::Text(s.trim().to_string())),
        "range" => {
            arity(name, "2", &args, args.len() == 2)?;
            let start = to_number(&args[0])?.trunc();
            let end = to_number(&args[1])?.trunc();
            if end < start {
                return Ok(CellValue::Sequence(Vec::new()));
            }
            let len = end - start + 1.0;
            if len > MAX_RANGE_LEN as f64 {
                return Err(EvalError::Runtime(format!(
                    "range would produce more than {} values",
                    MAX_RANGE_LEN
                )));
            }
            Ok(CellValue::Sequence(
                (0..len as usize)
                    .map(|i| CellValue::Number(start + i as f64))
                    .collect(),
            ))
        }
        "now" => {
            arity(name, "0", &args, args.is_empty())?;
            Ok(CellValue::Timestamp(Local::now().naive_local()))
        }
        "today" => {
            arity(name, "0", &args, args.is_empty())?;
            Ok(CellValue::Timestamp(
                Local::now().date_naive().and_time(NaiveTime::MIN),
            ))
        }
        "cell" => {
            arity(name, "1", &args, args.len() == 1)?;
            match &args[0] {
                CellValue::Text(reference) => resolver.resolve(reference),
                other => Err(EvalError::InvalidReference(format_value(other))),
            }
        }
        _ => Err(EvalError::UnknownFunction(name.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{DataType, NoCells, evaluate};

    fn eval(formula: &str) -> Result<CellValue, EvalError> {
        evaluate(formula, &NoCells)
    }

    #[test]
    fn test_every_listed_builtin_dispatches() {
        for b in BUILTINS {
            let err = call(b.name, Vec::new(), &NoCells).err();
            assert!(
                !matches!(err, Some(EvalError::UnknownFunction(_))),
                "{} is listed but not dispatched",
                b.name
            );
        }
    }

    #[test]
    fn test_aggregates_flatten_and_skip_text() {
        assert_eq!(eval("=sum(1, [2, 3], \"x\")"), Ok(CellValue::Number(6.0)));
        assert_eq!(eval("=avg([2, 4])"), Ok(CellValue::Number(3.0)));
        assert_eq!(eval("=max(1, 9, 3)"), Ok(CellValue::Number(9.0)));
        assert_eq!(eval("=min(range(3, 6))"), Ok(CellValue::Number(3.0)));
        assert_eq!(eval("=count(1, \"a\", [2])"), Ok(CellValue::Number(2.0)));
        assert!(eval("=avg()").is_err());
    }

    #[test]
    fn test_rounding() {
        assert_eq!(eval("=round(2.5)"), Ok(CellValue::Number(3.0)));
        assert_eq!(eval("=round(3.14159, 2)"), Ok(CellValue::Number(3.14)));
        assert_eq!(eval("=floor(-1.5)"), Ok(CellValue::Number(-2.0)));
        assert_eq!(eval("=ceil(1.1)"), Ok(CellValue::Number(2.0)));
        assert_eq!(eval("=abs(-4)"), Ok(CellValue::Number(4.0)));
    }

    #[test]
    fn test_text_functions() {
        assert_eq!(
            eval("=concat(\"Hello, \", upper(\"world\"))"),
            Ok(CellValue::Text("Hello, WORLD".into()))
        );
        assert_eq!(eval("=lower(\"ABC\")"), Ok(CellValue::Text("abc".into())));
        assert_eq!(eval("=trim(\"  x  \")"), Ok(CellValue::Text("x".into())));
        assert_eq!(eval("=upper(12)"), Ok(CellValue::Text("12".into())));
    }

    #[test]
    fn test_range_is_inclusive() {
        assert_eq!(
            eval("=range(1, 3)"),
            Ok(CellValue::Sequence(vec![
                CellValue::Number(1.0),
                CellValue::Number(2.0),
                CellValue::Number(3.0),
            ]))
        );
        assert_eq!(eval("=range(3, 1)"), Ok(CellValue::Sequence(vec![])));
        assert!(eval("=range(0, 10000000)").is_err());
    }

    #[test]
    fn test_dates() {
        assert_eq!(eval("=now()").unwrap().data_type(), DataType::Date);
        let CellValue::Timestamp(today) = eval("=today()").unwrap() else {
            panic!("today() must produce a timestamp");
        };
        assert_eq!(today.time(), NaiveTime::MIN);
    }

    #[test]
    fn test_unknown_function_and_arity() {
        assert_eq!(eval("=nope()"), Err(EvalError::UnknownFunction("nope".into())));
        assert!(matches!(eval("=abs(1, 2)"), Err(EvalError::ArgumentCount { .. })));
        assert!(matches!(eval("=cell(1)"), Err(EvalError::InvalidReference(_))));
    }

    #[test]
    fn test_names_are_case_insensitive() {
        assert_eq!(eval("=SUM(1, 2)"), Ok(CellValue::Number(3.0)));
        assert_eq!(eval("=Upper(\"a\")"), Ok(CellValue::Text("A".into())));
    }
}
