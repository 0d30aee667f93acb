//! Tool-specific error types.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// A single schema violation found while validating tool input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    /// Location of the offending value, e.g. `sheets[0].columns[1].header`.
    /// Empty for the input root.
    pub path: String,

    /// Human-readable description of the problem.
    pub message: String,
}

impl FieldViolation {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Errors that can occur during tool operations.
///
/// `NotFound`, `Duplicate` and `Validation` are structural: they are reported
/// to the caller as protocol errors. The remaining variants describe failures
/// inside a handler and end up as error-flagged tool results.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The requested tool was not found.
    #[error("Tool not found: {0}")]
    NotFound(String),

    /// A tool with the same name is already registered.
    #[error("Tool already registered: {0}")]
    Duplicate(String),

    /// The input did not match the tool's schema.
    #[error("Invalid arguments for '{tool}': {}", format_violations(.violations))]
    Validation {
        tool: String,
        violations: Vec<FieldViolation>,
    },

    /// The tool execution failed.
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    /// The tool timed out during execution.
    #[error("Tool execution timed out")]
    Timeout,

    /// An internal error occurred.
    #[error("Internal error: {0}")]
    Internal(String),
}

fn format_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ToolError {
    /// Create a new "not found" error.
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound(name.into())
    }

    /// Create a new "duplicate" error.
    pub fn duplicate(name: impl Into<String>) -> Self {
        Self::Duplicate(name.into())
    }

    /// Create a new validation error from a list of violations.
    pub fn validation(tool: impl Into<String>, violations: Vec<FieldViolation>) -> Self {
        Self::Validation {
            tool: tool.into(),
            violations,
        }
    }

    /// Create a new "execution failed" error.
    pub fn execution_failed(msg: impl Into<String>) -> Self {
        Self::ExecutionFailed(msg.into())
    }

    /// Create a new "internal" error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this error describes a malformed call rather than a failed one.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_) | Self::Duplicate(_) | Self::Validation { .. }
        )
    }

    /// Field violations carried by a validation error.
    pub fn violations(&self) -> &[FieldViolation] {
        match self {
            Self::Validation { violations, .. } => violations,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_lists_every_field() {
        let err = ToolError::validation(
            "generate_spreadsheet",
            vec![
                FieldViolation::new("sheets", "is required"),
                FieldViolation::new("", "expected object, found string"),
            ],
        );
        let msg = err.to_string();
        assert!(msg.contains("generate_spreadsheet"));
        assert!(msg.contains("sheets: is required"));
        assert!(msg.contains("expected object, found string"));
        assert_eq!(err.violations().len(), 2);
    }

    #[test]
    fn test_structural_classification() {
        assert!(ToolError::not_found("x").is_structural());
        assert!(ToolError::duplicate("x").is_structural());
        assert!(ToolError::validation("x", vec![]).is_structural());
        assert!(!ToolError::execution_failed("disk full").is_structural());
        assert!(!ToolError::Timeout.is_structural());
    }
}
