//! Built-in named rules.
//!
//! Validators use the default nullability strategy (missing and null pass)
//! unless noted. Error codes are kebab-case; extras carry the rule argument.

use regex::Regex;
use ruletree_core::{Deferred, Failure, RuleError, Transformer, Validator, Verdict};
use serde_json::{Number, Value};

fn fail(error: RuleError) -> Verdict {
    Some(Failure::One(error))
}

/// Length of a string (in chars) or a sequence.
fn length(value: &Value) -> Option<usize> {
    match value {
        Value::String(s) => Some(s.chars().count()),
        Value::Array(items) => Some(items.len()),
        _ => None,
    }
}

// ============================================================================
// Validators
// ============================================================================

/// Fails on missing and on explicit null.
pub fn required() -> Validator {
    Validator::raw(|value| {
        Deferred::Ready(match value {
            None | Some(Value::Null) => fail(RuleError::new("required")),
            Some(_) => None,
        })
    })
}

/// Fails on null; a missing key is treated as null.
pub fn not_null() -> Validator {
    Validator::nullify_missing(|value| {
        Deferred::Ready(value.is_null().then(|| Failure::One(RuleError::new("not-null"))))
    })
}

pub fn min(bound: Number) -> Validator {
    let limit = bound.as_f64().unwrap_or(f64::NAN);
    Validator::sync(move |value| match value.as_f64() {
        Some(n) if n >= limit => None,
        _ => fail(RuleError::new("min").with_extra("min", bound.clone())),
    })
}

pub fn max(bound: Number) -> Validator {
    let limit = bound.as_f64().unwrap_or(f64::NAN);
    Validator::sync(move |value| match value.as_f64() {
        Some(n) if n <= limit => None,
        _ => fail(RuleError::new("max").with_extra("max", bound.clone())),
    })
}

pub fn min_length(bound: usize) -> Validator {
    Validator::sync(move |value| match length(value) {
        Some(len) if len >= bound => None,
        _ => fail(RuleError::new("min-length").with_extra("min", bound)),
    })
}

pub fn max_length(bound: usize) -> Validator {
    Validator::sync(move |value| match length(value) {
        Some(len) if len <= bound => None,
        _ => fail(RuleError::new("max-length").with_extra("max", bound)),
    })
}

pub fn pattern(regex: Regex) -> Validator {
    Validator::sync(move |value| match value.as_str() {
        Some(s) if regex.is_match(s) => None,
        _ => fail(RuleError::new("pattern").with_extra("pattern", regex.as_str())),
    })
}

pub fn one_of(allowed: Vec<Value>) -> Validator {
    Validator::sync(move |value| {
        if allowed.contains(value) {
            None
        } else {
            fail(RuleError::new("one-of"))
        }
    })
}

pub fn starts_with(prefix: String) -> Validator {
    Validator::sync(move |value| match value.as_str() {
        Some(s) if s.starts_with(prefix.as_str()) => None,
        _ => fail(RuleError::new("starts-with").with_extra("prefix", prefix.as_str())),
    })
}

pub fn ends_with(suffix: String) -> Validator {
    Validator::sync(move |value| match value.as_str() {
        Some(s) if s.ends_with(suffix.as_str()) => None,
        _ => fail(RuleError::new("ends-with").with_extra("suffix", suffix.as_str())),
    })
}

/// Replace the error code of every failure `rule` reports.
pub fn relabel(rule: Validator, code: String) -> Validator {
    Validator::raw(move |value| {
        let code = code.clone();
        rule.check(value)
            .map(move |verdict| verdict.map(|failure| failure.relabel(&code)))
    })
}

// ============================================================================
// Transformers
// ============================================================================

fn map_string(apply: fn(&str) -> String) -> Transformer {
    Transformer::sync(move |value| match value {
        Value::String(s) => Value::String(apply(&s)),
        other => other,
    })
}

pub fn trim() -> Transformer {
    map_string(|s| s.trim().to_string())
}

pub fn lowercase() -> Transformer {
    map_string(str::to_lowercase)
}

pub fn uppercase() -> Transformer {
    map_string(str::to_uppercase)
}

/// Collapse runs of whitespace into single spaces and trim the ends.
pub fn collapse_whitespace() -> Transformer {
    map_string(|s| s.split_whitespace().collect::<Vec<_>>().join(" "))
}

/// Fill a missing or null field with `fallback`.
pub fn default_value(fallback: Value) -> Transformer {
    Transformer::raw(move |value| {
        Deferred::Ready(match value {
            None | Some(Value::Null) => Some(fallback.clone()),
            present => present,
        })
    })
}
