//! Validator leaf rules and nullability strategies.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::deferred::Deferred;
use crate::outcome::Verdict;

static NULL: Value = Value::Null;

/// How a validator treats "missing" (key not supplied) and explicit null.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Nullability {
    /// Missing and null both pass without invoking the check.
    #[default]
    Skip,
    /// The check receives either sentinel unmodified.
    Raw,
    /// Missing is normalised to null before the check runs.
    NullifyMissing,
}

type CheckFn = dyn Fn(Option<&Value>) -> Deferred<Verdict> + Send + Sync;

/// A validation leaf rule: `value -> no error | failure`, ready or deferred.
///
/// The subject value is `None` when the key was not supplied and
/// `Some(Value::Null)` when it was supplied as null.
#[derive(Clone)]
pub struct Validator {
    check: Arc<CheckFn>,
    nullability: Nullability,
}

impl Validator {
    /// Validator under the default strategy: missing and null pass.
    pub fn new<F>(check: F) -> Self
    where
        F: Fn(&Value) -> Deferred<Verdict> + Send + Sync + 'static,
    {
        Self {
            check: Arc::new(move |value: Option<&Value>| match value {
                None | Some(Value::Null) => Deferred::Ready(None),
                Some(value) => check(value),
            }),
            nullability: Nullability::Skip,
        }
    }

    /// Synchronous validator under the default strategy.
    pub fn sync<F>(check: F) -> Self
    where
        F: Fn(&Value) -> Verdict + Send + Sync + 'static,
    {
        Self::new(move |value| Deferred::Ready(check(value)))
    }

    /// Validator that handles missing and null itself.
    pub fn raw<F>(check: F) -> Self
    where
        F: Fn(Option<&Value>) -> Deferred<Verdict> + Send + Sync + 'static,
    {
        Self {
            check: Arc::new(check),
            nullability: Nullability::Raw,
        }
    }

    /// Validator that sees missing values as explicit null.
    pub fn nullify_missing<F>(check: F) -> Self
    where
        F: Fn(&Value) -> Deferred<Verdict> + Send + Sync + 'static,
    {
        Self {
            check: Arc::new(move |value: Option<&Value>| check(value.unwrap_or(&NULL))),
            nullability: Nullability::NullifyMissing,
        }
    }

    pub fn nullability(&self) -> Nullability {
        self.nullability
    }

    /// Run the check against a subject value.
    pub fn check(&self, value: Option<&Value>) -> Deferred<Verdict> {
        (self.check)(value)
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator")
            .field("nullability", &self.nullability)
            .finish_non_exhaustive()
    }
}
