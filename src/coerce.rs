//! Conversion between the stored (remote) and displayed forms of a cell.

use crate::config::{ColumnType, TableSchema};
use crate::store::Row;
use serde_json::{Number, Value};

const SCALE: f64 = 100.0;

/// Which way a value is travelling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Stored form to displayed form (`numero100` divided by 100).
    Read,
    /// Displayed form to stored form (`numero100` multiplied by 100).
    Write,
}

/// Coerce one value. Only `Number100` changes anything; empty and non-numeric
/// values pass through untouched.
pub fn coerce(value: &Value, col_type: ColumnType, direction: Direction) -> Value {
    match col_type {
        ColumnType::Number100 => match as_number(value) {
            Some(n) => {
                let scaled = match direction {
                    Direction::Read => n / SCALE,
                    Direction::Write => n * SCALE,
                };
                // Undo float noise from the scaling step (e.g. 0.29 * 100 = 28.999999999999996).
                number_value((scaled * 1e9).round() / 1e9)
            }
            None => value.clone(),
        },
        ColumnType::Id | ColumnType::Text | ColumnType::Date => value.clone(),
    }
}

/// Coerce every schema column present in `row`, in place.
pub fn coerce_row(row: &mut Row, schema: &TableSchema, direction: Direction) {
    for col in &schema.columns {
        if col.col_type != ColumnType::Number100 {
            continue;
        }
        if let Some(v) = row.get_mut(&col.name) {
            *v = coerce(v, col.col_type, direction);
        }
    }
}

/// Numeric reading of a cell: numbers as-is, strings when they parse.
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let t = s.trim();
            if t.is_empty() {
                None
            } else {
                t.parse::<f64>().ok().filter(|f| f.is_finite())
            }
        }
        _ => None,
    }
}

/// Integral results become integers so `100.0` and `100` compare and print alike.
pub fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Value::Number((n as i64).into())
    } else {
        Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}

/// String form used for filter matching and for flat renderings.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() => match number_value(f) {
                Value::Number(m) => m.to_string(),
                _ => n.to_string(),
            },
            _ => n.to_string(),
        },
        Value::Bool(b) => if *b { "TRUE".into() } else { "FALSE".into() },
        other => other.to_string(),
    }
}

/// True for `""`, null and whitespace-only strings.
pub fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}
