//! Compiles YAML rule sections into rule trees.
//!
//! Entry shapes:
//! - string: named rule without arguments (`trim`, `required`)
//! - mapping with a `rule` key: named rule with arguments
//! - sequence: chain of rules (non-empty, every element a rule)
//! - mapping without a `rule` key: nested subtree
//!
//! Any other shape is a configuration fault. Faults are logged and collected;
//! the affected field gets no rule and compilation carries on.

use regex::Regex;
use ruletree_core::{and, not, or, Failure, RuleNode, RuleTree, Transformer, Validator};
use serde_json::{Number, Value};
use serde_yaml::{Mapping, Value as YamlValue};
use tracing::warn;

use super::error::RuleConfigError;
use crate::catalogue;

/// A named rule and its arguments as written in the document.
pub struct RuleSpec<'a> {
    pub name: &'a str,
    pub args: Option<&'a Mapping>,
    /// Dotted location, for error messages.
    pub path: &'a str,
}

impl RuleSpec<'_> {
    fn arg(&self, key: &str) -> Option<&YamlValue> {
        self.args.and_then(|args| args.get(key))
    }

    fn required(&self, argument: &'static str) -> Result<&YamlValue, RuleConfigError> {
        self.arg(argument).ok_or_else(|| RuleConfigError::MissingArgument {
            path: self.path.to_string(),
            rule: self.name.to_string(),
            argument,
        })
    }

    fn invalid(&self, argument: &'static str, reason: impl Into<String>) -> RuleConfigError {
        RuleConfigError::InvalidArgument {
            path: self.path.to_string(),
            rule: self.name.to_string(),
            argument,
            reason: reason.into(),
        }
    }

    fn json(&self, argument: &'static str) -> Result<Value, RuleConfigError> {
        serde_json::to_value(self.required(argument)?).map_err(|e| self.invalid(argument, e.to_string()))
    }

    fn number(&self, argument: &'static str) -> Result<Number, RuleConfigError> {
        match self.json(argument)? {
            Value::Number(n) => Ok(n),
            _ => Err(self.invalid(argument, "expected a number")),
        }
    }

    fn count(&self, argument: &'static str) -> Result<usize, RuleConfigError> {
        self.number(argument)?
            .as_u64()
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| self.invalid(argument, "expected a non-negative integer"))
    }

    fn string(&self, argument: &'static str) -> Result<String, RuleConfigError> {
        self.required(argument)?
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| self.invalid(argument, "expected a string"))
    }

    fn list(&self, argument: &'static str) -> Result<Vec<Value>, RuleConfigError> {
        match self.json(argument)? {
            Value::Array(items) => Ok(items),
            _ => Err(self.invalid(argument, "expected a sequence")),
        }
    }

    fn code(&self) -> Result<Option<String>, RuleConfigError> {
        match self.arg("code") {
            None => Ok(None),
            Some(code) => code
                .as_str()
                .map(|code| Some(code.to_string()))
                .ok_or_else(|| self.invalid("code", "expected a string")),
        }
    }
}

/// Turns named rule specs into leaf rules of one kind.
pub trait RuleBuilder {
    type Rule;

    fn build(&self, spec: &RuleSpec<'_>) -> Result<Self::Rule, RuleConfigError>;
}

enum Shape<'a> {
    Rule {
        name: &'a str,
        args: Option<&'a Mapping>,
    },
    Chain(&'a [YamlValue]),
    Tree(&'a Mapping),
    Malformed(&'static str),
}

fn shape(value: &YamlValue) -> Shape<'_> {
    match value {
        YamlValue::String(name) => Shape::Rule { name, args: None },
        YamlValue::Mapping(mapping) => match mapping.get("rule") {
            Some(YamlValue::String(name)) => Shape::Rule {
                name,
                args: Some(mapping),
            },
            Some(_) => Shape::Malformed("rule name is not a string"),
            None => Shape::Tree(mapping),
        },
        YamlValue::Sequence(items) => Shape::Chain(items),
        YamlValue::Null => Shape::Malformed("null"),
        YamlValue::Bool(_) => Shape::Malformed("boolean"),
        YamlValue::Number(_) => Shape::Malformed("number"),
        YamlValue::Tagged(_) => Shape::Malformed("tagged value"),
    }
}

fn dotted(path: &[String]) -> String {
    if path.is_empty() {
        "<root>".to_string()
    } else {
        path.join(".")
    }
}

/// Build a single rule from an element that must be rule-shaped.
fn build_rule<B: RuleBuilder>(builder: &B, value: &YamlValue, path: &str) -> Result<B::Rule, RuleConfigError> {
    match shape(value) {
        Shape::Rule { name, args } => builder.build(&RuleSpec { name, args, path }),
        Shape::Chain(_) => Err(RuleConfigError::MalformedEntry {
            path: path.to_string(),
            found: "nested sequence",
        }),
        Shape::Tree(_) => Err(RuleConfigError::MalformedEntry {
            path: path.to_string(),
            found: "mapping without 'rule'",
        }),
        Shape::Malformed(found) => Err(RuleConfigError::MalformedEntry {
            path: path.to_string(),
            found,
        }),
    }
}

fn compile_node<B: RuleBuilder>(
    builder: &B,
    value: &YamlValue,
    path: &mut Vec<String>,
    faults: &mut Vec<RuleConfigError>,
) -> Result<Option<RuleNode<B::Rule>>, RuleConfigError> {
    let here = dotted(path);
    match shape(value) {
        Shape::Rule { name, args } => builder
            .build(&RuleSpec {
                name,
                args,
                path: &here,
            })
            .map(|rule| Some(RuleNode::Leaf(rule))),
        Shape::Chain(items) => {
            if items.is_empty() {
                return Err(RuleConfigError::EmptyChain { path: here });
            }
            let rules = items
                .iter()
                .enumerate()
                .map(|(i, item)| build_rule(builder, item, &format!("{here}[{i}]")))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Some(RuleNode::Chain(rules)))
        }
        Shape::Tree(mapping) => {
            let subtree = compile_tree(builder, mapping, path, faults);
            Ok((!subtree.is_empty()).then_some(RuleNode::Tree(subtree)))
        }
        Shape::Malformed(found) => Err(RuleConfigError::MalformedEntry { path: here, found }),
    }
}

/// Compile a mapping of field entries, pushing faults instead of failing.
pub fn compile_tree<B: RuleBuilder>(
    builder: &B,
    mapping: &Mapping,
    path: &mut Vec<String>,
    faults: &mut Vec<RuleConfigError>,
) -> RuleTree<B::Rule> {
    let mut tree = RuleTree::new();
    for (key, value) in mapping {
        let Some(key) = key.as_str() else {
            let fault = RuleConfigError::MalformedEntry {
                path: dotted(path),
                found: "non-string key",
            };
            warn!(code = fault.code(), "{}", fault);
            faults.push(fault);
            continue;
        };

        path.push(key.to_string());
        match compile_node(builder, value, path, faults) {
            Ok(Some(node)) => {
                tree.insert(key, node);
            }
            Ok(None) => {}
            Err(fault) => {
                warn!(code = fault.code(), "rule entry skipped: {}", fault);
                faults.push(fault);
            }
        }
        path.pop();
    }
    tree
}

// ============================================================================
// Builders
// ============================================================================

/// Builds validators from the built-in catalogue.
#[derive(Debug, Default, Clone, Copy)]
pub struct ValidatorBuilder;

impl ValidatorBuilder {
    /// Rules listed under `of`: one rule or a sequence of rules.
    fn nested(&self, spec: &RuleSpec<'_>) -> Result<Vec<Validator>, RuleConfigError> {
        let of = spec.required("of")?;
        match of {
            YamlValue::Sequence(items) if items.is_empty() => Err(spec.invalid("of", "expected at least one rule")),
            YamlValue::Sequence(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| build_rule(self, item, &format!("{}.of[{i}]", spec.path)))
                .collect(),
            single => Ok(vec![build_rule(self, single, &format!("{}.of", spec.path))?]),
        }
    }
}

impl RuleBuilder for ValidatorBuilder {
    type Rule = Validator;

    fn build(&self, spec: &RuleSpec<'_>) -> Result<Validator, RuleConfigError> {
        let code = spec.code()?;
        let rule = match spec.name {
            "required" => catalogue::required(),
            "not_null" => catalogue::not_null(),
            "min" => catalogue::min(spec.number("value")?),
            "max" => catalogue::max(spec.number("value")?),
            "min_length" => catalogue::min_length(spec.count("value")?),
            "max_length" => catalogue::max_length(spec.count("value")?),
            "pattern" => {
                let source = spec.string("value")?;
                let regex = Regex::new(&source).map_err(|source| RuleConfigError::InvalidPattern {
                    path: spec.path.to_string(),
                    source,
                })?;
                catalogue::pattern(regex)
            }
            "one_of" => catalogue::one_of(spec.list("values")?),
            "starts_with" => catalogue::starts_with(spec.string("value")?),
            "ends_with" => catalogue::ends_with(spec.string("value")?),
            // Combinators take `code` as their override error.
            "all_of" => return Ok(and(self.nested(spec)?, true, code.map(Failure::code))),
            "any_of" => return Ok(or(self.nested(spec)?, code.map(Failure::code))),
            "not" => {
                let Ok([inner]) = <[Validator; 1]>::try_from(self.nested(spec)?) else {
                    return Err(spec.invalid("of", "expected exactly one rule"));
                };
                return Ok(not(inner, Failure::code(code.unwrap_or_else(|| "not".to_string()))));
            }
            other => {
                return Err(RuleConfigError::UnknownRule {
                    path: spec.path.to_string(),
                    name: other.to_string(),
                })
            }
        };

        Ok(match code {
            Some(code) => catalogue::relabel(rule, code),
            None => rule,
        })
    }
}

/// Builds transformers from the built-in catalogue.
#[derive(Debug, Default, Clone, Copy)]
pub struct TransformerBuilder;

impl RuleBuilder for TransformerBuilder {
    type Rule = Transformer;

    fn build(&self, spec: &RuleSpec<'_>) -> Result<Transformer, RuleConfigError> {
        Ok(match spec.name {
            "trim" => catalogue::trim(),
            "lowercase" => catalogue::lowercase(),
            "uppercase" => catalogue::uppercase(),
            "collapse_whitespace" => catalogue::collapse_whitespace(),
            "default" => catalogue::default_value(spec.json("value")?),
            other => {
                return Err(RuleConfigError::UnknownRule {
                    path: spec.path.to_string(),
                    name: other.to_string(),
                })
            }
        })
    }
}
