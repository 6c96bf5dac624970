//! Typed predicate evaluation for `Condition` nodes.
//!
//! Ordering operators compare numerically when both sides are numbers and
//! lexically when neither is; a mixed pair is a type error.

use std::cmp::Ordering;

use serde_json::Value;

use crate::{error::EvalError, models::ConditionOperator};

/// Strict numeric parse: trimmed, non-blank and finite.
pub fn parse_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

pub fn compare(left: &str, right: &str, operator: ConditionOperator) -> Result<bool, EvalError> {
    use ConditionOperator::*;

    let ordering = |left: &str, right: &str| -> Result<Ordering, EvalError> {
        match (parse_number(left), parse_number(right)) {
            (Some(l), Some(r)) => Ok(l.partial_cmp(&r).unwrap_or(Ordering::Equal)),
            (None, None) => Ok(left.cmp(right)),
            _ => Err(type_mismatch(left, right)),
        }
    };

    Ok(match operator {
        Eq => ordering(left, right)?.is_eq(),
        Ne => ordering(left, right)?.is_ne(),
        Gt => ordering(left, right)?.is_gt(),
        Gte => ordering(left, right)?.is_ge(),
        Lt => ordering(left, right)?.is_lt(),
        Lte => ordering(left, right)?.is_le(),
        Contains => left.contains(right),
        NotContains => !left.contains(right),
        In => is_member(left, right)?,
        NotIn => !is_member(left, right)?,
    })
}

fn type_mismatch(left: &str, right: &str) -> EvalError {
    EvalError::TypeMismatch {
        left: left.to_owned(),
        right: right.to_owned(),
    }
}

/// Items of an `IN` list: a JSON array if `raw` parses as one, otherwise
/// comma-separated values with blanks dropped.
fn list_items(raw: &str) -> Vec<String> {
    match serde_json::from_str::<Vec<Value>>(raw) {
        Ok(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => s,
                Value::Null => String::new(),
                other => other.to_string(),
            })
            .collect(),
        Err(_) => raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect(),
    }
}

fn is_member(left: &str, raw_list: &str) -> Result<bool, EvalError> {
    let items = list_items(raw_list);
    if items.is_empty() {
        return Ok(false);
    }

    let numbers: Vec<Option<f64>> = items.iter().map(|i| parse_number(i)).collect();
    let all_numeric = numbers.iter().all(Option::is_some);
    let all_text = numbers.iter().all(Option::is_none);
    if !all_numeric && !all_text {
        return Err(EvalError::InListTypeMismatch(raw_list.to_owned()));
    }

    match (parse_number(left), all_numeric) {
        (Some(value), true) => Ok(numbers.into_iter().flatten().any(|n| n == value)),
        (None, false) => Ok(items.iter().any(|i| i == left)),
        _ => Err(type_mismatch(left, raw_list)),
    }
}
