//! Output order does not depend on which leaves were deferred.

use proptest::prelude::*;
use ruletree::{walk, Deferred, LeafRule, RuleTree, WalkOptions};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Pending exactly once, then ready.
struct YieldOnce(bool);

impl Future for YieldOnce {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.0 {
            Poll::Ready(())
        } else {
            self.0 = true;
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    }
}

#[derive(Debug, Clone)]
enum Shape {
    /// Result of the leaf and whether it is deferred in the mixed run.
    Leaf(Option<u8>, bool),
    Sub(Vec<Shape>),
}

#[derive(Debug, Clone, Copy)]
struct Leaf {
    result: Option<u8>,
    mixed_deferred: bool,
}

#[derive(Debug, Clone, Copy)]
enum Mode {
    Sync,
    Mixed,
    Deferred,
}

fn shapes() -> impl Strategy<Value = Vec<Shape>> {
    let leaf = (prop::option::of(any::<u8>()), any::<bool>()).prop_map(|(r, d)| Shape::Leaf(r, d));
    let node = leaf.prop_recursive(3, 32, 4, |inner| {
        prop::collection::vec(inner, 0..4).prop_map(Shape::Sub)
    });
    prop::collection::vec(node, 1..6)
}

fn build(shapes: &[Shape]) -> RuleTree<Leaf> {
    shapes
        .iter()
        .enumerate()
        .fold(RuleTree::new(), |tree, (i, shape)| {
            let key = format!("k{i}");
            match shape {
                Shape::Leaf(result, mixed_deferred) => tree.leaf(
                    key,
                    Leaf {
                        result: *result,
                        mixed_deferred: *mixed_deferred,
                    },
                ),
                Shape::Sub(children) => tree.subtree(key, build(children)),
            }
        })
}

fn run(rules: &RuleTree<Leaf>, mode: Mode, find_first: bool) -> String {
    let map_leaf = |rule: LeafRule<'_, Leaf>, _: Option<&serde_json::Value>| {
        let LeafRule::Single(leaf) = rule else {
            unreachable!("no chains in generated trees");
        };
        let defer = match mode {
            Mode::Sync => false,
            Mode::Mixed => leaf.mixed_deferred,
            Mode::Deferred => true,
        };
        let result = leaf.result;
        if defer {
            Deferred::pending(async move {
                YieldOnce(false).await;
                result
            })
        } else {
            Deferred::Ready(result)
        }
    };

    let mut options = WalkOptions::new();
    if find_first {
        options = options.find_first(|_: &u8| true);
    }
    let tree = futures::executor::block_on(walk(rules, map_leaf, options).resolve());
    serde_json::to_string(&tree).unwrap()
}

proptest! {
    #[test]
    fn sync_mixed_and_deferred_walks_are_byte_identical(shapes in shapes()) {
        let rules = build(&shapes);
        let sync = run(&rules, Mode::Sync, false);
        prop_assert_eq!(&sync, &run(&rules, Mode::Mixed, false));
        prop_assert_eq!(&sync, &run(&rules, Mode::Deferred, false));
    }

    #[test]
    fn find_first_agrees_between_sync_and_deferred(shapes in shapes()) {
        let rules = build(&shapes);
        prop_assert_eq!(run(&rules, Mode::Sync, true), run(&rules, Mode::Deferred, true));
    }
}
