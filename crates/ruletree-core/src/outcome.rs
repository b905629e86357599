//! Validation outcomes and the error-tree wire shape.
//!
//! A failing leaf produces a [`Failure`]: one `(code, extras)` pair or an
//! ordered sequence of them. On the wire each pair is `[code, extras | null]`.

use serde::ser::{Serialize, SerializeTuple, Serializer};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::tree::lookup_path;

/// A single validation failure: an error code plus optional scalar extras.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleError {
    pub code: String,
    pub extras: Option<Map<String, Value>>,
}

impl RuleError {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            extras: None,
        }
    }

    /// Attach an extra (expected to be a scalar).
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extras
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }

    /// Wire form: `[code, extras | null]`.
    pub fn to_value(&self) -> Value {
        Value::Array(vec![
            Value::String(self.code.clone()),
            self.extras.clone().map(Value::Object).unwrap_or(Value::Null),
        ])
    }
}

impl Serialize for RuleError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut pair = serializer.serialize_tuple(2)?;
        pair.serialize_element(&self.code)?;
        pair.serialize_element(&self.extras)?;
        pair.end()
    }
}

/// What a failing leaf reports.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum Failure {
    One(RuleError),
    /// Several simultaneous failures at one leaf, in rule order.
    Many(Vec<RuleError>),
}

impl Failure {
    /// Shorthand for a single failure with no extras.
    pub fn code(code: impl Into<String>) -> Self {
        Self::One(RuleError::new(code))
    }

    pub fn errors(&self) -> &[RuleError] {
        match self {
            Self::One(error) => std::slice::from_ref(error),
            Self::Many(errors) => errors,
        }
    }

    pub fn into_errors(self) -> Vec<RuleError> {
        match self {
            Self::One(error) => vec![error],
            Self::Many(errors) => errors,
        }
    }

    /// Replace every error code, keeping extras.
    pub fn relabel(self, code: &str) -> Self {
        match self {
            Self::One(error) => Self::One(RuleError {
                code: code.to_string(),
                ..error
            }),
            Self::Many(errors) => Self::Many(
                errors
                    .into_iter()
                    .map(|error| RuleError {
                        code: code.to_string(),
                        ..error
                    })
                    .collect(),
            ),
        }
    }
}

impl From<RuleError> for Failure {
    fn from(error: RuleError) -> Self {
        Self::One(error)
    }
}

impl From<Failure> for Value {
    fn from(failure: Failure) -> Self {
        match failure {
            Failure::One(error) => error.to_value(),
            Failure::Many(errors) => Value::Array(errors.iter().map(RuleError::to_value).collect()),
        }
    }
}

/// Outcome of a validator: `None` means "no error".
pub type Verdict = Option<Failure>;

/// Path-indexed failures produced by a validation walk.
///
/// Keys follow the rule tree's definition order; each leaf holds the wire form
/// of a [`Failure`].
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorTree(Map<String, Value>);

impl ErrorTree {
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    /// Look up the entry at a field path.
    pub fn get(&self, path: &[&str]) -> Option<&Value> {
        lookup_path(&self.0, path)
    }

    /// Number of failing fields (leaves of the tree).
    pub fn field_count(&self) -> usize {
        fn count(map: &Map<String, Value>) -> usize {
            map.values()
                .map(|value| match value {
                    Value::Object(nested) => count(nested),
                    _ => 1,
                })
                .sum()
        }
        count(&self.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for ErrorTree {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<ErrorTree> for Value {
    fn from(tree: ErrorTree) -> Self {
        Value::Object(tree.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn single_failure_wire_shape() {
        let failure = Failure::from(RuleError::new("min").with_extra("min", 5));
        assert_eq!(Value::from(failure.clone()), json!(["min", {"min": 5}]));
        assert_eq!(serde_json::to_value(&failure).unwrap(), json!(["min", {"min": 5}]));
    }

    #[test]
    fn many_failures_wire_shape() {
        let failure = Failure::Many(vec![RuleError::new("min"), RuleError::new("max")]);
        assert_eq!(Value::from(failure), json!([["min", null], ["max", null]]));
    }

    #[test]
    fn relabel_keeps_extras() {
        let failure = Failure::from(RuleError::new("min").with_extra("min", 18)).relabel("older-than-18");
        assert_eq!(failure.errors()[0].code, "older-than-18");
        assert_eq!(Value::from(failure), json!(["older-than-18", {"min": 18}]));
    }

    #[test]
    fn error_tree_counts_leaves() {
        let tree = ErrorTree::from(
            json!({
                "name": ["required", null],
                "address": { "city": ["required", null], "zip": [["min", null], ["max", null]] }
            })
            .as_object()
            .cloned()
            .unwrap(),
        );
        assert_eq!(tree.field_count(), 3);
        assert_eq!(tree.get(&["address", "city"]), Some(&json!(["required", null])));
        assert_eq!(tree.get(&["address", "street"]), None);
    }
}
