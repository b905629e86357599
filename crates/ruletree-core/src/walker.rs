//! Lock-step traversal of a rule tree over a related subject tree.
//!
//! The walker visits rule entries in definition order, invokes `map_leaf` at
//! every leaf or chain with the subject value found at the same path, and
//! builds a sparse result tree holding only kept results.
//!
//! Deferred leaf results are not awaited one by one. Each is recorded with its
//! path in a slot list that mirrors traversal order; after the synchronous pass
//! all of them are awaited together and the slots are replayed in order, so
//! output order never depends on which leaves were deferred or when they
//! settled.
//!
//! Find-first mode stops the synchronous pass at the first matching result by
//! threading `ControlFlow::Break` back through every recursive frame. Leaves
//! dispatched before the match are dropped with their results.

use futures::future::{self, join_all, BoxFuture};
use futures::FutureExt;
use serde_json::{Map, Value};
use std::ops::ControlFlow;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::deferred::Deferred;
use crate::tree::{assign_path, Path, RuleNode, RuleTree};

/// The rule found at a leaf position.
#[derive(Debug)]
pub enum LeafRule<'r, L> {
    Single(&'r L),
    /// A non-empty chain; the caller combines it before invoking.
    Chain(&'r [L]),
}

type Predicate<R> = Arc<dyn Fn(&R) -> bool + Send + Sync>;
type PruneFn<'a, L> = Box<dyn Fn(&RuleTree<L>, Option<&Value>) -> bool + 'a>;

/// Options for [`walk`].
pub struct WalkOptions<'a, L, R> {
    seed: Option<Map<String, Value>>,
    related: Option<&'a Map<String, Value>>,
    keep: Option<Predicate<R>>,
    prune: Option<PruneFn<'a, L>>,
    find_first: Option<Predicate<R>>,
}

impl<L, R> Default for WalkOptions<'_, L, R> {
    fn default() -> Self {
        Self {
            seed: None,
            related: None,
            keep: None,
            prune: None,
            find_first: None,
        }
    }
}

impl<'a, L, R> WalkOptions<'a, L, R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Base mapping merged under the computed results. When set, the walk
    /// always returns a mapping, even if nothing was kept.
    pub fn seed(mut self, seed: Map<String, Value>) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Subject tree walked in lock-step with the rules.
    pub fn related(mut self, related: &'a Map<String, Value>) -> Self {
        self.related = Some(related);
        self
    }

    /// Which leaf results go into the output. Absent results are never kept.
    pub fn keep(mut self, keep: impl Fn(&R) -> bool + Send + Sync + 'static) -> Self {
        self.keep = Some(Arc::new(keep));
        self
    }

    /// Skip a subtree given its rules and the related value at the branch.
    pub fn prune(mut self, prune: impl Fn(&RuleTree<L>, Option<&Value>) -> bool + 'a) -> Self {
        self.prune = Some(Box::new(prune));
        self
    }

    /// Enable find-first mode: the first result matching `found` ends the
    /// walk, and the output holds only that path.
    pub fn find_first(mut self, found: impl Fn(&R) -> bool + Send + Sync + 'static) -> Self {
        self.find_first = Some(Arc::new(found));
        self
    }
}

enum Slot<R> {
    Kept(R),
    Pending(BoxFuture<'static, Option<R>>),
}

struct Walk<'a, L, R, F> {
    map_leaf: F,
    keep: Option<Predicate<R>>,
    prune: Option<PruneFn<'a, L>>,
    find_first: Option<Predicate<R>>,
    path: Path,
    slots: Vec<(Path, Slot<R>)>,
    leaves: usize,
}

impl<L, R, F> Walk<'_, L, R, F>
where
    F: FnMut(LeafRule<'_, L>, Option<&Value>) -> Deferred<Option<R>>,
{
    fn visit(&mut self, tree: &RuleTree<L>, related: Option<&Map<String, Value>>) -> ControlFlow<(Path, R)> {
        for (key, node) in tree.iter() {
            let value = related.and_then(|map| map.get(key));
            self.path.push(key.to_string());

            let flow = match node {
                RuleNode::Tree(subtree) => {
                    if self.prune.as_ref().is_some_and(|prune| prune(subtree, value)) {
                        trace!(path = ?self.path, "branch pruned");
                        ControlFlow::Continue(())
                    } else {
                        self.visit(subtree, value.and_then(Value::as_object))
                    }
                }
                RuleNode::Leaf(rule) => self.leaf(LeafRule::Single(rule), value),
                RuleNode::Chain(rules) => self.leaf(LeafRule::Chain(rules), value),
            };

            self.path.pop();
            if let ControlFlow::Break(hit) = flow {
                return ControlFlow::Break(hit);
            }
        }
        ControlFlow::Continue(())
    }

    fn leaf(&mut self, rule: LeafRule<'_, L>, value: Option<&Value>) -> ControlFlow<(Path, R)> {
        self.leaves += 1;
        match (self.map_leaf)(rule, value) {
            Deferred::Ready(None) => {}
            Deferred::Ready(Some(result)) => {
                if self.find_first.as_ref().is_some_and(|found| found(&result)) {
                    return ControlFlow::Break((self.path.clone(), result));
                }
                if self.keep.as_ref().map_or(true, |keep| keep(&result)) {
                    self.slots.push((self.path.clone(), Slot::Kept(result)));
                }
            }
            Deferred::Pending(fut) => self.slots.push((self.path.clone(), Slot::Pending(fut))),
        }
        ControlFlow::Continue(())
    }
}

/// Walk `rules`, mapping each leaf to a result and collecting kept results
/// into a sparse tree.
///
/// Returns `None` when nothing was kept and no seed was given. A walk whose
/// leaves are all synchronous returns `Deferred::Ready`.
pub fn walk<L, R, F>(
    rules: &RuleTree<L>,
    map_leaf: F,
    options: WalkOptions<'_, L, R>,
) -> Deferred<Option<Map<String, Value>>>
where
    F: FnMut(LeafRule<'_, L>, Option<&Value>) -> Deferred<Option<R>>,
    R: Into<Value> + Send + 'static,
{
    let WalkOptions {
        seed,
        related,
        keep,
        prune,
        find_first,
    } = options;

    let mut walk = Walk {
        map_leaf,
        keep,
        prune,
        find_first,
        path: Vec::new(),
        slots: Vec::new(),
        leaves: 0,
    };

    if let ControlFlow::Break((path, result)) = walk.visit(rules, related) {
        debug!(path = ?path, leaves = walk.leaves, "walk stopped at first match");
        return Deferred::Ready(Some(single_path(&path, result)));
    }

    let Walk {
        slots,
        keep,
        find_first,
        leaves,
        ..
    } = walk;
    let deferred = slots
        .iter()
        .filter(|(_, slot)| matches!(slot, Slot::Pending(_)))
        .count();
    debug!(leaves, kept = slots.len() - deferred, deferred, "rule tree walk dispatched");

    if deferred == 0 {
        let kept = slots.into_iter().filter_map(|(path, slot)| match slot {
            Slot::Kept(result) => Some((path, result)),
            Slot::Pending(_) => None,
        });
        return Deferred::Ready(build(seed, kept));
    }

    Deferred::pending(async move {
        let (paths, futures): (Vec<Path>, Vec<(bool, BoxFuture<'static, Option<R>>)>) = slots
            .into_iter()
            .map(|(path, slot)| match slot {
                Slot::Kept(result) => (path, (false, future::ready(Some(result)).boxed())),
                Slot::Pending(fut) => (path, (true, fut)),
            })
            .unzip();
        let (was_deferred, futures): (Vec<bool>, Vec<_>) = futures.into_iter().unzip();
        let settled = join_all(futures).await;

        let mut kept = Vec::with_capacity(settled.len());
        for ((path, deferred), result) in paths.into_iter().zip(was_deferred).zip(settled) {
            let Some(result) = result else {
                continue;
            };
            if deferred {
                if find_first.as_ref().is_some_and(|found| found(&result)) {
                    debug!(path = ?path, "deferred walk stopped at first match");
                    return Some(single_path(&path, result));
                }
                if !keep.as_ref().map_or(true, |keep| keep(&result)) {
                    continue;
                }
            }
            kept.push((path, result));
        }
        build(seed, kept)
    })
}

fn single_path<R: Into<Value>>(path: &[String], result: R) -> Map<String, Value> {
    let mut tree = Map::new();
    assign_path(&mut tree, path, result.into());
    tree
}

fn build<R: Into<Value>>(
    seed: Option<Map<String, Value>>,
    kept: impl IntoIterator<Item = (Path, R)>,
) -> Option<Map<String, Value>> {
    let seeded = seed.is_some();
    let mut tree = seed.unwrap_or_default();
    let mut any = false;
    for (path, result) in kept {
        assign_path(&mut tree, &path, result.into());
        any = true;
    }
    (seeded || any).then_some(tree)
}
