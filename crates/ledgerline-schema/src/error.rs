//! Validation error types.

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

/// One violation, attributed to a field path such as `lines.0.amount`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Dotted path to the offending field, or the source name (`body`,
    /// `query`) for violations of the document as a whole.
    pub field: String,
    /// Human-readable description.
    pub message: String,
}

/// Ordered list of violations. Never empty when returned as an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    /// Empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a violation.
    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Whether no violations were recorded.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of violations.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Violations in the order they were found.
    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    /// Group messages by field. Messages for the same field keep their
    /// original order; none are overwritten.
    pub fn to_map(&self) -> BTreeMap<String, Vec<String>> {
        let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for err in &self.0 {
            map.entry(err.field.clone())
                .or_default()
                .push(err.message.clone());
        }
        map
    }
}

impl Serialize for FieldErrors {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_map().serialize(serializer)
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        f.write_str(&parts.join("; "))
    }
}

impl FromIterator<FieldError> for FieldErrors {
    fn from_iter<I: IntoIterator<Item = FieldError>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Errors raised while building or applying a schema.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// The schema document itself is not valid JSON Schema.
    #[error("failed to compile schema {name}: {reason}")]
    Compile {
        /// Schema name given at construction.
        name: String,
        /// Compiler message.
        reason: String,
    },

    /// The request body is not valid JSON.
    #[error("request body is not valid JSON: {0}")]
    MalformedBody(String),
}
