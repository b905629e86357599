//! Validation and transformation over rule trees.
//!
//! Both operations are thin instantiations of [`walk`]:
//!
//! | | `validate` | `transform` |
//! |---|---|---|
//! | leaf | validator | transformer |
//! | chain | `and(chain, abort_early = true)` | `pipe(chain)` |
//! | seed | none | the subject tree |
//! | prune | subject branch absent | subject branch absent |
//! | find-first | iff `abort_early` | never |

use ruletree_core::{
    and, pipe, walk, Deferred, ErrorTree, Failure, LeafRule, RuleTree, Transformer, Validator,
    WalkOptions,
};
use serde_json::{Map, Value};

/// A subject branch is absent when the key is missing or explicitly null.
fn branch_absent(value: Option<&Value>) -> bool {
    value.map_or(true, Value::is_null)
}

/// Validate `subject` against `rules`.
///
/// Returns `None` when every rule passed. With `abort_early` the walk stops at
/// the first failure in key order and the tree holds only that field.
pub fn validate(
    subject: &Map<String, Value>,
    rules: &RuleTree<Validator>,
    abort_early: bool,
) -> Deferred<Option<ErrorTree>> {
    let mut options = WalkOptions::new()
        .related(subject)
        .prune(|_, value| branch_absent(value));
    if abort_early {
        options = options.find_first(|_: &Failure| true);
    }

    walk(
        rules,
        |rule, value| match rule {
            LeafRule::Single(validator) => validator.check(value),
            LeafRule::Chain(chain) => and(chain.to_vec(), true, None).check(value),
        },
        options,
    )
    .map(|tree| tree.map(ErrorTree::from))
}

/// Map `subject` through `rules`, returning the new subject tree.
///
/// Fields without a rule, and fields whose transformer produced no value, keep
/// their original value and position.
pub fn transform(
    subject: &Map<String, Value>,
    rules: &RuleTree<Transformer>,
) -> Deferred<Map<String, Value>> {
    let options = WalkOptions::new()
        .seed(subject.clone())
        .related(subject)
        .prune(|_, value| branch_absent(value));

    walk(
        rules,
        |rule, value| {
            let value = value.cloned();
            match rule {
                LeafRule::Single(transformer) => transformer.apply(value),
                LeafRule::Chain(chain) => pipe(chain.to_vec()).apply(value),
            }
        },
        options,
    )
    .map(Option::unwrap_or_default)
}
