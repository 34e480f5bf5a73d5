//! Persistence-layer validation error model.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Category of a single validation failure.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationKind {
    /// A required attribute was null/absent.
    NotNull,
    /// An attribute was present but empty.
    NotEmpty,
    /// An attribute did not match its expected format (email, url, ...).
    Format,
    /// An attribute fell outside its length bounds.
    Length,
    /// A unique constraint was violated.
    Unique,
    /// Model-level or custom validator failure.
    Custom,
}

/// A single failed validation on a model attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Attribute the failure applies to (`None` for model-level validators).
    pub path: Option<String>,

    /// Human-readable message; this is what reaches API clients.
    pub message: String,

    pub kind: ValidationKind,

    /// The offending value, when the data layer reports it.
    pub value: Option<serde_json::Value>,
}

impl ValidationIssue {
    pub fn new(kind: ValidationKind, message: impl Into<String>) -> Self {
        Self {
            path: None,
            message: message.into(),
            kind,
            value: None,
        }
    }

    pub fn at(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<serde_json::Value>) -> Self {
        self.value = Some(value.into());
        self
    }
}

/// Error raised by the data layer when one or more model validations fail.
///
/// `message` mirrors what ORMs typically report: `"Validation error"` followed
/// by each issue message, one per line.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ModelValidationError {
    pub message: String,
    pub issues: Vec<ValidationIssue>,
}

impl ModelValidationError {
    pub fn new(issues: Vec<ValidationIssue>) -> Self {
        Self {
            message: summarize(&issues),
            issues,
        }
    }

    /// Unique-constraint failure on a single attribute.
    pub fn unique_violation(path: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        let path = path.into();
        let issue = ValidationIssue::new(ValidationKind::Unique, format!("{path} must be unique"))
            .at(path)
            .with_value(value);
        Self::new(vec![issue])
    }

    pub fn with_issue(mut self, issue: ValidationIssue) -> Self {
        self.issues.push(issue);
        self.message = summarize(&self.issues);
        self
    }

    /// Flat list of the issue messages, in the order the data layer raised them.
    pub fn messages(&self) -> Vec<String> {
        self.issues.iter().map(|i| i.message.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }
}

fn summarize(issues: &[ValidationIssue]) -> String {
    if issues.is_empty() {
        return "Validation error".to_string();
    }

    let lines: Vec<&str> = issues.iter().map(|i| i.message.as_str()).collect();
    format!("Validation error: {}", lines.join(",\nValidation error: "))
}
