//! Host boundary for field-resolution interceptors.
//!
//! A host intercepts a field resolution, hands the field's arguments (the
//! subject tree) and rule trees to [`FieldGuard::check`], and either proceeds
//! with the transformed arguments or stops with the aggregated error tree.
//!
//! ```text
//! FieldCall ──► transform (seed = args) ──► validate ──► Proceed(args')
//!                                               │
//!                                               └──► on_validation_error(tree)
//!                                                    Rejected(tree)
//! ```

use ruletree_core::{Deferred, ErrorTree, RuleTree, Transformer, Validator};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::orchestrator::{transform, validate};

/// Setup-time configuration for a guard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardConfig {
    /// Stop validation at the first failing field.
    #[serde(default)]
    pub abort_early: bool,
}

/// Identifies the field being resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    pub parent_type: String,
    pub field_name: String,
}

impl FieldInfo {
    pub fn new(parent_type: impl Into<String>, field_name: impl Into<String>) -> Self {
        Self {
            parent_type: parent_type.into(),
            field_name: field_name.into(),
        }
    }
}

/// Everything the host knows about one field resolution.
#[derive(Debug, Clone, Copy)]
pub struct FieldCall<'a> {
    pub root: &'a Value,
    /// The subject tree; `None` when the field received no arguments.
    pub args: Option<&'a Map<String, Value>>,
    pub context: &'a Value,
    pub info: &'a FieldInfo,
}

type RuleFactory<L> = dyn Fn(&FieldCall<'_>) -> RuleTree<L> + Send + Sync;

/// Where a field's rule tree comes from.
#[derive(Clone)]
pub enum RuleSource<L> {
    Static(RuleTree<L>),
    /// Built per call from `(root, args, context, info)`.
    Dynamic(Arc<RuleFactory<L>>),
}

impl<L: Clone> RuleSource<L> {
    pub fn dynamic(factory: impl Fn(&FieldCall<'_>) -> RuleTree<L> + Send + Sync + 'static) -> Self {
        Self::Dynamic(Arc::new(factory))
    }

    fn resolve(&self, call: &FieldCall<'_>) -> Cow<'_, RuleTree<L>> {
        match self {
            Self::Static(tree) => Cow::Borrowed(tree),
            Self::Dynamic(factory) => Cow::Owned(factory(call)),
        }
    }
}

impl<L> From<RuleTree<L>> for RuleSource<L> {
    fn from(tree: RuleTree<L>) -> Self {
        Self::Static(tree)
    }
}

impl<L> fmt::Debug for RuleSource<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(tree) => f.debug_tuple("Static").field(&tree.len()).finish(),
            Self::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

/// Rules attached to one field.
#[derive(Debug, Clone, Default)]
pub struct FieldRules {
    pub validation: Option<RuleSource<Validator>>,
    pub transformation: Option<RuleSource<Transformer>>,
}

impl FieldRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate_with(mut self, source: impl Into<RuleSource<Validator>>) -> Self {
        self.validation = Some(source.into());
        self
    }

    pub fn transform_with(mut self, source: impl Into<RuleSource<Transformer>>) -> Self {
        self.transformation = Some(source.into());
        self
    }
}

/// What the host should do with the field call.
#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision {
    /// Resolve the field with these (possibly transformed) arguments.
    Proceed(Option<Map<String, Value>>),
    /// Do not resolve; the error tree was already reported.
    Rejected(ErrorTree),
}

type ErrorSink = dyn Fn(&ErrorTree) + Send + Sync;

/// Runs transformation then validation for intercepted field calls.
#[derive(Clone)]
pub struct FieldGuard {
    config: GuardConfig,
    on_validation_error: Arc<ErrorSink>,
}

impl FieldGuard {
    pub fn new(config: GuardConfig, on_validation_error: impl Fn(&ErrorTree) + Send + Sync + 'static) -> Self {
        Self {
            config,
            on_validation_error: Arc::new(on_validation_error),
        }
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    /// Decide whether the call proceeds.
    ///
    /// Absent arguments proceed unchanged without running any rule. On
    /// failure `on_validation_error` is invoked exactly once with the whole
    /// error tree. Stays synchronous unless a rule was deferred.
    pub fn check(&self, rules: &FieldRules, call: &FieldCall<'_>) -> Deferred<GateDecision> {
        let Some(args) = call.args else {
            debug!(
                parent = %call.info.parent_type,
                field = %call.info.field_name,
                "no arguments, skipping rules"
            );
            return Deferred::Ready(GateDecision::Proceed(None));
        };

        let transformed = match &rules.transformation {
            Some(source) => transform(args, &source.resolve(call)),
            None => Deferred::Ready(args.clone()),
        };
        let validation = rules
            .validation
            .as_ref()
            .map(|source| source.resolve(call).into_owned());

        let abort_early = self.config.abort_early;
        let report = Arc::clone(&self.on_validation_error);
        let parent = call.info.parent_type.clone();
        let field = call.info.field_name.clone();

        transformed.and_then(move |subject| {
            let Some(rules) = validation else {
                return Deferred::Ready(GateDecision::Proceed(Some(subject)));
            };
            validate(&subject, &rules, abort_early).map(move |errors| match errors {
                Some(errors) => {
                    debug!(%parent, %field, failures = errors.field_count(), "arguments rejected");
                    report(&errors);
                    GateDecision::Rejected(errors)
                }
                None => GateDecision::Proceed(Some(subject)),
            })
        })
    }
}

impl fmt::Debug for FieldGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldGuard")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ruletree_core::Failure;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_guard(abort_early: bool) -> (FieldGuard, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let guard = FieldGuard::new(GuardConfig { abort_early }, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (guard, calls)
    }

    fn reject_all() -> Validator {
        Validator::raw(|_| Deferred::Ready(Some(Failure::code("nope"))))
    }

    #[test]
    fn absent_arguments_proceed_unchanged() {
        let (guard, calls) = counting_guard(false);
        let info = FieldInfo::new("Query", "user");
        let call = FieldCall {
            root: &Value::Null,
            args: None,
            context: &Value::Null,
            info: &info,
        };
        let rules = FieldRules::new().validate_with(RuleTree::new().leaf("id", reject_all()));
        let decision = guard.check(&rules, &call).now().ok();
        assert_eq!(decision, Some(GateDecision::Proceed(None)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn rejection_reports_once_with_whole_tree() {
        let (guard, calls) = counting_guard(false);
        let info = FieldInfo::new("Mutation", "createUser");
        let args = json!({"a": 1, "b": 2}).as_object().cloned().unwrap();
        let call = FieldCall {
            root: &Value::Null,
            args: Some(&args),
            context: &Value::Null,
            info: &info,
        };
        let rules = FieldRules::new()
            .validate_with(RuleTree::new().leaf("a", reject_all()).leaf("b", reject_all()));
        let Some(GateDecision::Rejected(tree)) = guard.check(&rules, &call).now().ok() else {
            panic!("expected rejection");
        };
        assert_eq!(tree.field_count(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dynamic_rules_see_the_call() {
        let (guard, _) = counting_guard(false);
        let info = FieldInfo::new("Query", "search");
        let args = json!({"term": "x"}).as_object().cloned().unwrap();
        let context = json!({"role": "admin"});
        let call = FieldCall {
            root: &Value::Null,
            args: Some(&args),
            context: &context,
            info: &info,
        };
        let rules = FieldRules::new().validate_with(RuleSource::dynamic(|call: &FieldCall<'_>| {
            if call.context["role"] == "admin" {
                RuleTree::new()
            } else {
                RuleTree::new().leaf("term", reject_all())
            }
        }));
        let decision = guard.check(&rules, &call).now().ok();
        assert_eq!(decision, Some(GateDecision::Proceed(Some(args.clone()))));
    }
}
