//! Declarative rule documents.
//!
//! ```yaml
//! abort_early: false
//! transform:
//!   firstName: [trim, lowercase]
//! validate:
//!   firstName:
//!     - { rule: starts_with, value: "a", code: must-start-with-a }
//!   age: { rule: min, value: 18, code: older-than-18 }
//!   address:
//!     city: required
//! ```
//!
//! Loading is two-phase: [`RuleDocument`] parses the file, then
//! [`RuleDocument::compile`] resolves rule names against the built-in
//! catalogue. Field-level faults never fail the load; they are logged and
//! listed in [`CompiledRules::faults`].

mod compiler;
mod document;
mod error;

pub use document::RuleDocument;
pub use error::RuleConfigError;

use ruletree_core::{RuleTree, Transformer, Validator};

use crate::guard::{FieldRules, GuardConfig};

/// Environment variable naming the default rule document for the CLI.
pub const RULES_ENV_VAR: &str = "RULETREE_RULES";

/// A compiled rule document.
#[derive(Debug)]
pub struct CompiledRules {
    pub abort_early: Option<bool>,
    pub validation: RuleTree<Validator>,
    pub transformation: RuleTree<Transformer>,
    /// Field-level faults; the affected fields have no rule.
    pub faults: Vec<RuleConfigError>,
}

impl CompiledRules {
    /// Static field rules for a [`FieldGuard`](crate::guard::FieldGuard).
    pub fn field_rules(&self) -> FieldRules {
        FieldRules::new()
            .transform_with(self.transformation.clone())
            .validate_with(self.validation.clone())
    }

    /// `base` with the document's `abort_early` applied.
    pub fn guard_config(&self, base: GuardConfig) -> GuardConfig {
        GuardConfig {
            abort_early: self.abort_early.unwrap_or(base.abort_early),
        }
    }
}
