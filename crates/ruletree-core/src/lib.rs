//! ruletree-core: the traversal engine behind rule-tree validation and transformation.
//!
//! This crate contains the pure engine with NO host dependencies:
//! - `Deferred` - a value that is either ready now or pending behind a future
//! - `reduce` - an ordered left-fold whose steps may be deferred, with early exit
//! - `RuleTree` - tagged rule trees (`Leaf | Chain | Tree`) in definition order
//! - `walk` - lock-step traversal of a rule tree over a subject tree
//! - `Validator` / `Transformer` - leaf rule handles with nullability strategies
//! - `and` / `or` / `not` / `pipe` - rule combinators built on `reduce`
//!
//! # Architecture
//!
//! ```text
//! RuleTree ──► walk(map_leaf, WalkOptions) ──► sparse result tree
//!                  │
//!                  ├── Leaf(rule)    ──► map_leaf ──► Ready | Pending
//!                  ├── Chain(rules)  ──► combinator (and / pipe) ──► map_leaf
//!                  └── Tree(subtree) ──► prune? ──► recurse
//! ```
//!
//! Nothing in a walk becomes asynchronous unless a leaf actually returned a
//! pending result; a fully synchronous walk returns `Deferred::Ready`.

pub mod combinators;
pub mod deferred;
pub mod outcome;
pub mod reducer;
pub mod transformer;
pub mod tree;
pub mod validator;
pub mod walker;

pub use combinators::{and, not, or, pipe};
pub use deferred::Deferred;
pub use outcome::{ErrorTree, Failure, RuleError, Verdict};
pub use reducer::{fold, reduce};
pub use transformer::Transformer;
pub use tree::{assign_path, lookup_path, Path, RuleNode, RuleTree};
pub use validator::{Nullability, Validator};
pub use walker::{walk, LeafRule, WalkOptions};
