//! Rule document errors.

use std::path::PathBuf;
use thiserror::Error;

/// Problems found while loading or compiling a rule document.
///
/// Field-level variants are configuration faults: the affected field is left
/// without a rule and compilation continues. `Parse` and `Io` reject the whole
/// document.
#[derive(Debug, Error)]
pub enum RuleConfigError {
    #[error("{path}: unknown rule '{name}'")]
    UnknownRule { path: String, name: String },

    #[error("{path}: malformed rule entry ({found})")]
    MalformedEntry { path: String, found: &'static str },

    #[error("{path}: rule chain is empty")]
    EmptyChain { path: String },

    #[error("{path}: rule '{rule}' requires argument '{argument}'")]
    MissingArgument {
        path: String,
        rule: String,
        argument: &'static str,
    },

    #[error("{path}: rule '{rule}' has invalid argument '{argument}': {reason}")]
    InvalidArgument {
        path: String,
        rule: String,
        argument: &'static str,
        reason: String,
    },

    #[error("{path}: invalid pattern: {source}")]
    InvalidPattern {
        path: String,
        #[source]
        source: regex::Error,
    },

    #[error("failed to parse rule document: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RuleConfigError {
    /// Stable code for this error type.
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownRule { .. } => "UNKNOWN_RULE",
            Self::MalformedEntry { .. } => "MALFORMED_ENTRY",
            Self::EmptyChain { .. } => "EMPTY_CHAIN",
            Self::MissingArgument { .. } => "MISSING_ARGUMENT",
            Self::InvalidArgument { .. } => "INVALID_ARGUMENT",
            Self::InvalidPattern { .. } => "INVALID_PATTERN",
            Self::Parse(_) => "PARSE",
            Self::Io { .. } => "IO",
        }
    }

    /// True for faults that only disable one field.
    pub fn is_field_fault(&self) -> bool {
        !matches!(self, Self::Parse(_) | Self::Io { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_faults_are_distinguished() {
        let fault = RuleConfigError::EmptyChain {
            path: "validate.name".into(),
        };
        assert!(fault.is_field_fault());
        assert_eq!(fault.code(), "EMPTY_CHAIN");
        assert_eq!(fault.to_string(), "validate.name: rule chain is empty");

        let parse = serde_yaml::from_str::<serde_yaml::Value>("a: [").unwrap_err();
        let err = RuleConfigError::from(parse);
        assert!(!err.is_field_fault());
        assert_eq!(err.code(), "PARSE");
    }
}
