//! Value derivation helpers behind the `Extract` node modes.
//!
//! All text-based modes fall back to the node's default value instead of
//! failing: a bad pattern, a missing JSON path or an out-of-range substring
//! is a normal outcome.

use rand::Rng;
use regex::Regex;
use serde_json::Value;

use crate::error::EvalError;

const DEFAULT_CHARSET: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Capture `group` (0 = whole match) of the first match of `pattern`.
pub fn by_regex(source: &str, pattern: &str, group: usize, default_value: &str) -> String {
    if pattern.trim().is_empty() {
        return default_value.to_owned();
    }
    Regex::new(pattern)
        .ok()
        .and_then(|re| {
            re.captures(source)
                .and_then(|caps| caps.get(group).map(|m| m.as_str().to_owned()))
        })
        .unwrap_or_else(|| default_value.to_owned())
}

/// Dotted path with bracket indexes, e.g. `data.items[0].name` or `[1][0]`.
pub fn by_json_path(source: &str, path: &str, default_value: &str) -> String {
    if path.trim().is_empty() {
        return default_value.to_owned();
    }

    let trimmed = source.trim();
    let root = match serde_json::from_str::<Value>(trimmed) {
        Ok(value @ (Value::Object(_) | Value::Array(_))) => value,
        _ => return default_value.to_owned(),
    };

    let mut current = &root;
    for segment in path.split('.').map(str::trim).filter(|s| !s.is_empty()) {
        let (name, indexes) = split_segment(segment);
        let next = lookup(current, name, &indexes);
        match next {
            Some(value) => current = value,
            None => return default_value.to_owned(),
        }
    }

    match current {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// `items[2][0]` → (`items`, [2, 0]).  Unparsable indexes are ignored.
fn split_segment(segment: &str) -> (&str, Vec<i64>) {
    let (name, rest) = segment.split_once('[').unwrap_or((segment, ""));
    let indexes = rest
        .split('[')
        .filter_map(|part| part.split_once(']'))
        .filter_map(|(index, _)| index.trim().parse::<i64>().ok())
        .collect();
    (name, indexes)
}

fn lookup<'v>(value: &'v Value, name: &str, indexes: &[i64]) -> Option<&'v Value> {
    let mut current = if name.trim().is_empty() {
        value
    } else {
        value.as_object()?.get(name)?
    };
    for &index in indexes {
        let index = usize::try_from(index).ok()?;
        current = current.as_array()?.get(index)?;
    }
    Some(current)
}

/// `length` characters from `start_index`; a negative length runs to the end.
pub fn substring(source: &str, start_index: i64, length: i64, default_value: &str) -> String {
    let chars: Vec<char> = source.chars().collect();
    let Ok(start) = usize::try_from(start_index) else {
        return default_value.to_owned();
    };
    if chars.is_empty() || start > chars.len() {
        return default_value.to_owned();
    }

    let end = match usize::try_from(length) {
        Ok(length) => start.saturating_add(length).min(chars.len()),
        Err(_) => chars.len(),
    };
    chars[start..end].iter().collect()
}

/// `fixed_value` when set, otherwise a uniform draw from the inclusive range
/// spanned by `min` and `max` in either order.
pub fn random_int(fixed: Option<&str>, min: i64, max: i64) -> Result<String, EvalError> {
    if let Some(fixed) = fixed {
        return fixed
            .trim()
            .parse::<i64>()
            .map(|n| n.to_string())
            .map_err(|_| EvalError::InvalidFixedValue(fixed.to_owned()));
    }

    let (low, high) = (min.min(max), min.max(max));
    if low == high {
        return Ok(low.to_string());
    }
    Ok(rand::thread_rng().gen_range(low..=high).to_string())
}

/// `length` characters drawn with replacement from `charset`
/// (letters and digits when empty).
pub fn random_string(length: i64, charset: &str) -> String {
    let length = usize::try_from(length).unwrap_or(0);
    let pool: Vec<char> = if charset.is_empty() {
        DEFAULT_CHARSET.chars().collect()
    } else {
        charset.chars().collect()
    };

    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| pool[rng.gen_range(0..pool.len())])
        .collect()
}
