//! Lookups into nested action params by dotted path (`slack.event.channel`).

use serde_json::Value;

use crate::error::{Error, Result};

/// Value at `path`, if every segment exists.
#[must_use]
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |v, key| match v {
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => v.get(key),
    })
}

/// Non-empty string at `path`.
#[must_use]
pub fn opt_str<'a>(value: &'a Value, path: &str) -> Option<&'a str> {
    lookup(value, path)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// Non-empty string at `path`, or a validation error naming the path.
pub fn require_str<'a>(value: &'a Value, path: &str) -> Result<&'a str> {
    opt_str(value, path).ok_or_else(|| Error::validation(format!("{path} is required")))
}

/// Value at `path`, or a validation error naming the path.
pub fn require<'a>(value: &'a Value, path: &str) -> Result<&'a Value> {
    lookup(value, path)
        .filter(|v| !v.is_null())
        .ok_or_else(|| Error::validation(format!("{path} is required")))
}
