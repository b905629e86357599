//! Rule documents as written on disk.

use serde::Deserialize;
use serde_yaml::Mapping;
use std::path::Path;
use tracing::{debug, info};

use super::compiler::{compile_tree, TransformerBuilder, ValidatorBuilder};
use super::error::RuleConfigError;
use super::CompiledRules;

/// A declarative rule document (YAML, or JSON as a YAML subset).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleDocument {
    /// Overrides the guard's `abort_early` when set.
    #[serde(default)]
    pub abort_early: Option<bool>,
    #[serde(default)]
    pub transform: Mapping,
    #[serde(default)]
    pub validate: Mapping,
}

impl RuleDocument {
    pub fn parse(source: &str) -> Result<Self, RuleConfigError> {
        Ok(serde_yaml::from_str(source)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, RuleConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| RuleConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let document = Self::parse(&source)?;
        debug!(path = %path.display(), "read rule document");
        Ok(document)
    }

    /// Build both rule trees. Field-level faults are collected, not returned.
    pub fn compile(&self) -> CompiledRules {
        let mut faults = Vec::new();
        let transformation = compile_tree(
            &TransformerBuilder,
            &self.transform,
            &mut vec!["transform".to_string()],
            &mut faults,
        );
        let validation = compile_tree(
            &ValidatorBuilder,
            &self.validate,
            &mut vec!["validate".to_string()],
            &mut faults,
        );

        info!(
            transform_fields = transformation.leaf_paths().len(),
            validate_fields = validation.leaf_paths().len(),
            faults = faults.len(),
            "loaded rule document"
        );

        CompiledRules {
            abort_early: self.abort_early,
            validation,
            transformation,
            faults,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sections_are_optional() {
        let document = RuleDocument::parse("abort_early: true").unwrap();
        assert_eq!(document.abort_early, Some(true));
        assert!(document.transform.is_empty());
        assert!(document.validate.is_empty());
    }

    #[test]
    fn unknown_sections_are_rejected() {
        let err = RuleDocument::parse("validations: {}").unwrap_err();
        assert_eq!(err.code(), "PARSE");
    }

    #[test]
    fn json_documents_parse() {
        let document = RuleDocument::parse(r#"{"validate": {"age": {"rule": "min", "value": 18}}}"#).unwrap();
        let compiled = document.compile();
        assert!(compiled.faults.is_empty());
        assert_eq!(compiled.validation.len(), 1);
    }

    #[test]
    fn fault_paths_name_the_section() {
        let compiled = RuleDocument::parse("transform:\n  name: [trim, shout]").unwrap().compile();
        assert!(compiled.transformation.is_empty());
        assert_eq!(compiled.faults[0].to_string(), "transform.name[1]: unknown rule 'shout'");
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = RuleDocument::from_path("/nonexistent/rules.yaml").unwrap_err();
        assert_eq!(err.code(), "IO");
        assert!(!err.is_field_fault());
    }
}
