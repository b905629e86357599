//! Transformer leaf rules.

use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::deferred::Deferred;

type ApplyFn = dyn Fn(Option<Value>) -> Deferred<Option<Value>> + Send + Sync;

/// A transformation leaf rule: `value -> new value`, ready or deferred.
///
/// Input and output are `None` for "no value at this key". A `None` output
/// leaves the subject tree untouched at that position.
#[derive(Clone)]
pub struct Transformer {
    apply: Arc<ApplyFn>,
}

impl Transformer {
    /// Transformer over present, non-null values; missing and null pass through.
    pub fn new<F>(apply: F) -> Self
    where
        F: Fn(Value) -> Deferred<Value> + Send + Sync + 'static,
    {
        Self {
            apply: Arc::new(move |value: Option<Value>| match value {
                None => Deferred::Ready(None),
                Some(Value::Null) => Deferred::Ready(Some(Value::Null)),
                Some(value) => apply(value).map(Some),
            }),
        }
    }

    /// Synchronous transformer over present, non-null values.
    pub fn sync<F>(apply: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        Self::new(move |value| Deferred::Ready(apply(value)))
    }

    /// Transformer that handles missing and null itself.
    pub fn raw<F>(apply: F) -> Self
    where
        F: Fn(Option<Value>) -> Deferred<Option<Value>> + Send + Sync + 'static,
    {
        Self {
            apply: Arc::new(apply),
        }
    }

    pub fn apply(&self, value: Option<Value>) -> Deferred<Option<Value>> {
        (self.apply)(value)
    }
}

impl fmt::Debug for Transformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Transformer(..)")
    }
}
