// Formula evaluator - walks the AST against a cell lookup

use super::parser::{Expr, Op};

/// Scalar result of evaluating an expression or reading a cell.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Empty,
    Number(f64),
    Text(String),
    /// Spreadsheet-style error code, e.g. "#DIV/0!"
    Error(String),
}

impl Value {
    /// Numeric coercion: empty is 0, numeric text counts, anything else
    /// refuses.
    pub fn to_number(&self) -> Option<f64> {
        match self {
            Value::Empty => Some(0.0),
            Value::Number(n) => Some(*n),
            Value::Text(s) => s.trim().parse().ok(),
            Value::Error(_) => None,
        }
    }

    pub fn to_display(&self) -> String {
        match self {
            Value::Empty => String::new(),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            Value::Text(s) => s.clone(),
            Value::Error(e) => e.clone(),
        }
    }
}

/// The seam between the evaluator and the grid: resolves a cell reference
/// to its current value. The sheet implements this; tests can fake it.
pub trait CellLookup {
    fn get(&self, row: usize, col: usize) -> Value;
}

pub fn evaluate(expr: &Expr, lookup: &dyn CellLookup) -> Value {
    match expr {
        Expr::Number(n) => Value::Number(*n),
        Expr::CellRef { row, col } => lookup.get(*row, *col),
        // A bare range is only meaningful inside a function argument
        Expr::Range { .. } => Value::Error("#VALUE!".to_string()),
        Expr::Function { name, args } => eval_function(name, args, lookup),
        Expr::BinaryOp { op, left, right } => {
            let lhs = evaluate(left, lookup);
            if let Value::Error(_) = lhs {
                return lhs;
            }
            let rhs = evaluate(right, lookup);
            if let Value::Error(_) = rhs {
                return rhs;
            }
            let (Some(a), Some(b)) = (lhs.to_number(), rhs.to_number()) else {
                return Value::Error("#VALUE!".to_string());
            };
            match op {
                Op::Add => Value::Number(a + b),
                Op::Sub => Value::Number(a - b),
                Op::Mul => Value::Number(a * b),
                Op::Div => {
                    if b == 0.0 {
                        Value::Error("#DIV/0!".to_string())
                    } else {
                        Value::Number(a / b)
                    }
                }
                Op::Pow => Value::Number(a.powf(b)),
            }
        }
    }
}

/// Flatten an argument list into scalar values, expanding ranges cellwise.
fn collect_args(args: &[Expr], lookup: &dyn CellLookup) -> Result<Vec<Value>, Value> {
    let mut values = Vec::new();
    for arg in args {
        match arg {
            Expr::Range {
                start_row,
                start_col,
                end_row,
                end_col,
            } => {
                let (r0, r1) = (*start_row.min(end_row), *start_row.max(end_row));
                let (c0, c1) = (*start_col.min(end_col), *start_col.max(end_col));
                for row in r0..=r1 {
                    for col in c0..=c1 {
                        let v = lookup.get(row, col);
                        if let Value::Error(_) = v {
                            return Err(v);
                        }
                        values.push(v);
                    }
                }
            }
            _ => {
                let v = evaluate(arg, lookup);
                if let Value::Error(_) = v {
                    return Err(v);
                }
                values.push(v);
            }
        }
    }
    Ok(values)
}

fn eval_function(name: &str, args: &[Expr], lookup: &dyn CellLookup) -> Value {
    let values = match collect_args(args, lookup) {
        Ok(values) => values,
        Err(error) => return error,
    };
    // Text and empty cells inside a range are ignored, as spreadsheets do
    let numbers: Vec<f64> = values
        .iter()
        .filter_map(|v| match v {
            Value::Number(n) => Some(*n),
            _ => None,
        })
        .collect();

    match name {
        "SUM" => Value::Number(numbers.iter().sum()),
        "COUNT" => Value::Number(numbers.len() as f64),
        "AVERAGE" => {
            if numbers.is_empty() {
                Value::Error("#DIV/0!".to_string())
            } else {
                Value::Number(numbers.iter().sum::<f64>() / numbers.len() as f64)
            }
        }
        "MIN" => {
            if numbers.is_empty() {
                Value::Number(0.0)
            } else {
                Value::Number(numbers.iter().copied().fold(f64::INFINITY, f64::min))
            }
        }
        "MAX" => {
            if numbers.is_empty() {
                Value::Number(0.0)
            } else {
                Value::Number(numbers.iter().copied().fold(f64::NEG_INFINITY, f64::max))
            }
        }
        _ => Value::Error("#NAME?".to_string()),
    }
}
