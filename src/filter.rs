//! Row filters for update and delete.

use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOp {
    Eq,
    Ne,
}

impl FilterOp {
    pub fn matches(self, cell: &str, target: &str) -> bool {
        match self {
            FilterOp::Eq => cell == target,
            FilterOp::Ne => cell != target,
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            FilterOp::Eq => "eq",
            FilterOp::Ne => "ne",
        }
    }
}

impl FromStr for FilterOp {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "eq" => Ok(FilterOp::Eq),
            "ne" => Ok(FilterOp::Ne),
            other => Err(StoreError::UnsupportedOperator(other.to_string())),
        }
    }
}

/// `(column, operator, value)` condition. Column names match the header case-insensitively.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
    pub value: String,
}

impl Filter {
    pub fn new(column: impl Into<String>, op: FilterOp, value: impl Into<String>) -> Self {
        Filter {
            column: column.into(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(column, FilterOp::Eq, value)
    }
}

/// Parses the compact `"column,op,value"` form. Parts are trimmed; the value may itself
/// contain commas.
impl FromStr for Filter {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ',');
        let (Some(column), Some(op), Some(value)) = (parts.next(), parts.next(), parts.next()) else {
            return Err(StoreError::InvalidFilter(format!(
                "expected 'column,op,value', got '{}'",
                s
            )));
        };
        let column = column.trim();
        if column.is_empty() {
            return Err(StoreError::InvalidFilter("empty column".into()));
        }
        Ok(Filter {
            column: column.to_string(),
            op: op.parse()?,
            value: value.trim().to_string(),
        })
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.column, self.op.token(), self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_compact_form() {
        let f: Filter = " ID , eq , 123 ".parse().unwrap();
        assert_eq!(f, Filter::eq("ID", "123"));
        assert_eq!(f.to_string(), "ID,eq,123");
        let f: Filter = "Name,NE,a,b".parse().unwrap();
        assert_eq!(f.op, FilterOp::Ne);
        assert_eq!(f.value, "a,b");
    }

    #[test]
    fn rejects_unknown_operator() {
        let err = "ID,gt,3".parse::<Filter>().unwrap_err();
        assert!(matches!(err, StoreError::UnsupportedOperator(op) if op == "gt"));
    }

    #[test]
    fn rejects_malformed() {
        assert!(matches!("ID,eq".parse::<Filter>(), Err(StoreError::InvalidFilter(_))));
        assert!(matches!(",eq,1".parse::<Filter>(), Err(StoreError::InvalidFilter(_))));
    }

    #[test]
    fn op_semantics() {
        assert!(FilterOp::Eq.matches("a", "a"));
        assert!(!FilterOp::Eq.matches("a", "A"));
        assert!(FilterOp::Ne.matches("a", "b"));
    }
}
