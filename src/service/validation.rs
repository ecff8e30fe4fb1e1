//! Form validation from per-page rules. Runs before anything reaches the data-access layer.

use crate::coerce::{as_number, is_blank};
use crate::config::ValidationRule;
use crate::error::AppError;
use crate::store::Row;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;

pub struct RequestValidator;

impl RequestValidator {
    /// Validate a full form. All required fields must be present and non-blank.
    pub fn validate(body: &Row, rules: &BTreeMap<String, ValidationRule>) -> Result<(), AppError> {
        for (col, rule) in rules {
            let val = body.get(col);
            if rule.required == Some(true) && is_blank(val) {
                return Err(AppError::Validation(format!("{} is required", col)));
            }
            if let Some(v) = val {
                validate_field(col, v, rule)?;
            }
        }
        Ok(())
    }

    /// Validate only the fields present (edits). Required fields may be omitted but not blanked.
    pub fn validate_partial(body: &Row, rules: &BTreeMap<String, ValidationRule>) -> Result<(), AppError> {
        for (col, v) in body {
            if let Some(rule) = rules.get(col) {
                if rule.required == Some(true) && is_blank(Some(v)) {
                    return Err(AppError::Validation(format!("{} is required", col)));
                }
                validate_field(col, v, rule)?;
            }
        }
        Ok(())
    }
}

fn validate_field(col: &str, v: &Value, rule: &ValidationRule) -> Result<(), AppError> {
    if is_blank(Some(v)) {
        return Ok(());
    }
    if let Some(format) = &rule.format {
        validate_format(col, v, format)?;
    }
    if let Some(max) = rule.max_length {
        if let Some(s) = v.as_str() {
            if s.chars().count() > max as usize {
                return Err(AppError::Validation(format!(
                    "{} must be at most {} characters",
                    col, max
                )));
            }
        }
    }
    if let Some(min) = rule.min_length {
        if let Some(s) = v.as_str() {
            if s.chars().count() < min as usize {
                return Err(AppError::Validation(format!(
                    "{} must be at least {} characters",
                    col, min
                )));
            }
        }
    }
    if let Some(ref pattern) = rule.pattern {
        let re = Regex::new(pattern).map_err(|_| AppError::Validation(format!("invalid pattern for {}", col)))?;
        if let Some(s) = v.as_str() {
            if !re.is_match(s) {
                return Err(AppError::Validation(format!("{} does not match required pattern", col)));
            }
        }
    }
    if let Some(ref allowed) = rule.allowed {
        if !allowed.iter().any(|a| value_eq(v, a)) {
            return Err(AppError::Validation(format!(
                "{} must be one of: {:?}",
                col,
                allowed.iter().take(5).collect::<Vec<_>>()
            )));
        }
    }
    if rule.minimum.is_some() || rule.maximum.is_some() {
        let n = as_number(v).ok_or_else(|| AppError::Validation(format!("{} must be a number", col)))?;
        if let Some(min) = rule.minimum {
            if n < min {
                return Err(AppError::Validation(format!("{} must be at least {}", col, min)));
            }
        }
        if let Some(max) = rule.maximum {
            if n > max {
                return Err(AppError::Validation(format!("{} must be at most {}", col, max)));
            }
        }
    }
    Ok(())
}

fn value_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::String(s), Value::String(t)) => s == t,
        (Value::Number(n), Value::Number(m)) => n.as_f64() == m.as_f64(),
        _ => a == b,
    }
}

fn validate_format(col: &str, v: &Value, format: &str) -> Result<(), AppError> {
    match format.to_lowercase().as_str() {
        "email" => {
            if let Some(s) = v.as_str() {
                let s = s.trim();
                let valid = match s.split_once('@') {
                    Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.ends_with('.'),
                    None => false,
                };
                if !valid {
                    return Err(AppError::Validation(format!("{} must be a valid email", col)));
                }
            }
        }
        "date" => {
            if let Some(s) = v.as_str() {
                if parse_date(s).is_none() {
                    return Err(AppError::Validation(format!(
                        "{} must be a date (dd/mm/yyyy, mm/dd/yyyy or yyyy-mm-dd)",
                        col
                    )));
                }
            }
        }
        _ => {}
    }
    Ok(())
}

/// Accepts `dd/mm/yyyy`, then `mm/dd/yyyy`, then `yyyy-mm-dd`.
pub fn parse_date(s: &str) -> Option<chrono::NaiveDate> {
    let s = s.trim();
    ["%d/%m/%Y", "%m/%d/%Y", "%Y-%m-%d"]
        .iter()
        .find_map(|fmt| chrono::NaiveDate::parse_from_str(s, fmt).ok())
}
