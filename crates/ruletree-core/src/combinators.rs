//! Rule combinators.
//!
//! `and`, `or` and `not` compose validators; `pipe` composes transformers.
//! All of them fold with [`reduce`](crate::reducer::reduce), so a combination
//! of synchronous rules stays synchronous and a deferred rule anywhere in the
//! sequence keeps the same ordering and early-exit behaviour.
//!
//! Combined validators pass the subject value through untouched; each
//! underlying rule applies its own nullability strategy.

use serde_json::Value;
use std::ops::ControlFlow;

use crate::deferred::Deferred;
use crate::outcome::{Failure, RuleError, Verdict};
use crate::reducer::{fold, reduce};
use crate::transformer::Transformer;
use crate::validator::Validator;

/// Sequential composition: the output of step `i` feeds step `i + 1`.
///
/// The accumulator is the current value, itself possibly deferred, so a
/// pending step delays only the steps after it.
pub fn pipe(steps: Vec<Transformer>) -> Transformer {
    Transformer::raw(move |value| {
        fold(
            steps.iter().cloned(),
            |_, step, _| Deferred::Ready(step),
            |current: Deferred<Option<Value>>, step: Transformer, _| {
                ControlFlow::Continue(current.and_then(move |value| step.apply(value)))
            },
            Deferred::Ready(value),
        )
        .and_then(|current| current)
    })
}

/// All rules must pass.
///
/// With `abort_early` the first failure (or `override_error`) is the result and
/// later rules are not consulted. Without it every failure is collected in rule
/// order, unless `override_error` is set, in which case the first failure
/// settles the outcome as `override_error`.
pub fn and(rules: Vec<Validator>, abort_early: bool, override_error: Option<Failure>) -> Validator {
    Validator::raw(move |value| {
        let override_error = override_error.clone();
        reduce(
            rules.iter(),
            |_, rule, _| rule.check(value),
            move |mut failures: Vec<RuleError>, verdict: Verdict, _| match verdict {
                None => ControlFlow::Continue(failures),
                Some(failure) if abort_early => {
                    ControlFlow::Break(Some(override_error.clone().unwrap_or(failure)))
                }
                Some(_) if override_error.is_some() => ControlFlow::Break(override_error.clone()),
                Some(failure) => {
                    failures.extend(failure.into_errors());
                    ControlFlow::Continue(failures)
                }
            },
            Vec::new(),
            |failures: Vec<RuleError>| (!failures.is_empty()).then_some(Failure::Many(failures)),
        )
    })
}

/// Any rule passing is enough.
///
/// Stops at the first passing rule. When every rule fails the result is the
/// collected failures in rule order, or `override_error` when given. An empty
/// rule list passes.
pub fn or(rules: Vec<Validator>, override_error: Option<Failure>) -> Validator {
    Validator::raw(move |value| {
        let override_error = override_error.clone();
        reduce(
            rules.iter(),
            |_, rule, _| rule.check(value),
            |mut failures: Vec<RuleError>, verdict: Verdict, _| match verdict {
                None => ControlFlow::Break(None),
                Some(failure) => {
                    failures.extend(failure.into_errors());
                    ControlFlow::Continue(failures)
                }
            },
            Vec::new(),
            move |failures: Vec<RuleError>| {
                if failures.is_empty() {
                    None
                } else {
                    Some(override_error.unwrap_or(Failure::Many(failures)))
                }
            },
        )
    })
}

/// Inverts a rule: `error` when it passes, no error when it fails.
pub fn not(rule: Validator, error: Failure) -> Validator {
    Validator::raw(move |value| {
        let error = error.clone();
        rule.check(value).map(move |verdict| match verdict {
            Some(_) => None,
            None => Some(error),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn number_rule(code: &'static str, ok: fn(f64) -> bool, delay: Option<u64>) -> Validator {
        Validator::new(move |value| {
            let verdict = match value.as_f64() {
                Some(n) if ok(n) => None,
                _ => Some(Failure::from(RuleError::new(code))),
            };
            match delay {
                Some(ms) => Deferred::pending(async move {
                    tokio::time::sleep(Duration::from_millis(ms)).await;
                    verdict
                }),
                None => Deferred::Ready(verdict),
            }
        })
    }

    fn min(bound: f64) -> Validator {
        Validator::sync(move |value| match value.as_f64() {
            Some(n) if n >= bound => None,
            _ => Some(RuleError::new("min").with_extra("min", bound).into()),
        })
    }

    fn max(bound: f64) -> Validator {
        Validator::sync(move |value| match value.as_f64() {
            Some(n) if n <= bound => None,
            _ => Some(RuleError::new("max").with_extra("max", bound).into()),
        })
    }

    async fn verdict(rule: &Validator, value: Value) -> Verdict {
        rule.check(Some(&value)).resolve().await
    }

    #[tokio::test]
    async fn and_abort_early_returns_first_failure() {
        let rules = vec![
            number_rule("f1", |n| n > 10.0, None),
            number_rule("f2", |n| n > 20.0, None),
            number_rule("f3", |_| true, None),
        ];
        let rule = and(rules.clone(), true, None);
        assert_eq!(verdict(&rule, json!(5)).await, Some(Failure::code("f1")));

        let all = and(rules, false, None);
        assert_eq!(
            verdict(&all, json!(5)).await,
            Some(Failure::Many(vec![RuleError::new("f1"), RuleError::new("f2")]))
        );
    }

    #[tokio::test]
    async fn and_order_survives_deferred_rules() {
        // f1 settles last, f2 first; output order still follows the rules.
        let rules = vec![
            number_rule("f1", |n| n > 10.0, Some(30)),
            number_rule("f2", |n| n > 20.0, Some(1)),
            number_rule("f3", |_| true, None),
        ];
        let first = and(rules.clone(), true, None);
        assert!(!first.check(Some(&json!(5))).is_ready());
        assert_eq!(verdict(&first, json!(5)).await, Some(Failure::code("f1")));

        let all = and(rules, false, None);
        assert_eq!(
            verdict(&all, json!(5)).await,
            Some(Failure::Many(vec![RuleError::new("f1"), RuleError::new("f2")]))
        );
    }

    #[test]
    fn and_abort_early_skips_later_rules() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = {
            let calls = calls.clone();
            Validator::sync(move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                None
            })
        };
        let rule = and(vec![min(10.0), counted], true, None);
        assert!(rule.check(Some(&json!(1))).now().ok().flatten().is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn and_override_replaces_collected_failures() {
        let rule = and(vec![min(10.0), max(0.0)], false, Some(Failure::code("bad-range")));
        assert_eq!(
            rule.check(Some(&json!(5))).now().ok().flatten(),
            Some(Failure::code("bad-range"))
        );
    }

    #[tokio::test]
    async fn or_passes_when_any_rule_passes() {
        let rule = or(vec![min(5.0), max(10.0)], None);
        assert_eq!(verdict(&rule, json!(7)).await, None);
        assert_eq!(verdict(&rule, json!(20)).await, None);

        let strict = or(vec![min(50.0), max(10.0)], None);
        assert_eq!(
            verdict(&strict, json!(20)).await,
            Some(Failure::Many(vec![
                RuleError::new("min").with_extra("min", 50.0),
                RuleError::new("max").with_extra("max", 10.0),
            ]))
        );
    }

    #[tokio::test]
    async fn or_uses_override_when_all_fail() {
        let rule = or(
            vec![number_rule("a", |_| false, Some(2)), number_rule("b", |_| false, None)],
            Some(Failure::code("none-matched")),
        );
        assert_eq!(verdict(&rule, json!(1)).await, Some(Failure::code("none-matched")));
    }

    #[test]
    fn or_of_nothing_passes() {
        let rule = or(Vec::new(), Some(Failure::code("unused")));
        assert_eq!(rule.check(Some(&json!(1))).now().ok().flatten(), None);
    }

    #[tokio::test]
    async fn not_inverts() {
        let rule = not(min(5.0), Failure::code("too-big"));
        assert_eq!(verdict(&rule, json!(7)).await, Some(Failure::code("too-big")));
        assert_eq!(verdict(&rule, json!(3)).await, None);
    }

    fn trim(delay: Option<u64>) -> Transformer {
        Transformer::new(move |value| {
            let trimmed = match value {
                Value::String(s) => Value::String(s.trim().to_string()),
                other => other,
            };
            match delay {
                Some(ms) => Deferred::pending(async move {
                    tokio::time::sleep(Duration::from_millis(ms)).await;
                    trimmed
                }),
                None => Deferred::Ready(trimmed),
            }
        })
    }

    fn lowercase(delay: Option<u64>) -> Transformer {
        Transformer::new(move |value| {
            let lowered = match value {
                Value::String(s) => Value::String(s.to_lowercase()),
                other => other,
            };
            match delay {
                Some(ms) => Deferred::pending(async move {
                    tokio::time::sleep(Duration::from_millis(ms)).await;
                    lowered
                }),
                None => Deferred::Ready(lowered),
            }
        })
    }

    #[tokio::test]
    async fn pipe_result_is_independent_of_deferral() {
        for (a, b) in [(None, None), (Some(5), None), (None, Some(1)), (Some(3), Some(2))] {
            let chain = pipe(vec![trim(a), lowercase(b)]);
            let output = chain.apply(Some(json!("  AhMeD  ")));
            assert_eq!(output.is_ready(), a.is_none() && b.is_none());
            assert_eq!(output.resolve().await, Some(json!("ahmed")));
        }
    }

    #[test]
    fn pipe_feeds_each_step_the_previous_output() {
        let append = |suffix: &'static str| {
            Transformer::sync(move |value| match value {
                Value::String(s) => Value::String(format!("{s}{suffix}")),
                other => other,
            })
        };
        let chain = pipe(vec![append("a"), append("b"), append("c")]);
        assert_eq!(chain.apply(Some(json!(""))).now().ok(), Some(Some(json!("abc"))));
        assert_eq!(chain.apply(None).now().ok(), Some(None));
    }
}
