//! ruletree: validate and transform nested argument trees against rule trees.
//!
//! A subject tree (a JSON object of field arguments) is walked in lock-step
//! with a rule tree. Validation collects failures into a sparse error tree;
//! transformation rewrites the subject leaf by leaf. Both stay synchronous
//! unless a rule actually returns a pending result.
//!
//! ```text
//!                      ┌──────────────────────────────┐
//!  RuleDocument ──────►│ config: compile + catalogue  │
//!                      └──────────────┬───────────────┘
//!                                     ▼
//!  FieldCall ──► FieldGuard ──► transform ──► validate ──► GateDecision
//!                                  │              │
//!                                  └── walk (ruletree-core) ──┘
//! ```
//!
//! The traversal engine lives in `ruletree-core` and is re-exported here.

pub mod catalogue;
pub mod config;
pub mod guard;
pub mod orchestrator;
pub mod telemetry;

pub use ruletree_core::{
    and, assign_path, fold, lookup_path, not, or, pipe, reduce, walk, Deferred, ErrorTree,
    Failure, LeafRule, Nullability, Path, RuleError, RuleNode, RuleTree, Transformer, Validator,
    Verdict, WalkOptions,
};

pub use config::{CompiledRules, RuleConfigError, RuleDocument};
pub use guard::{FieldCall, FieldGuard, FieldInfo, FieldRules, GateDecision, GuardConfig, RuleSource};
pub use orchestrator::{transform, validate};
