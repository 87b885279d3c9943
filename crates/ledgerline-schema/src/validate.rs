//! # Shape Validation
//!
//! A [`Schema`] wraps a compiled JSON Schema validator. Validation collects
//! every violation rather than stopping at the first, attributes each to a
//! field path, and only on success hands back the value deserialized into
//! the handler's type.
//!
//! ## Field attribution
//!
//! - The JSON Pointer of the violating value becomes a dotted path
//!   (`/lines/0/amount` → `lines.0.amount`).
//! - A missing required property is attributed to the property itself, not
//!   to the object that lacks it.
//! - Violations of the document as a whole are attributed to the source
//!   name (`body` or `query`).

use std::sync::Arc;

use jsonschema::error::ValidationErrorKind;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::coerce::parse_query;
use crate::error::{FieldError, FieldErrors, SchemaError};

/// Result of validating one input: the typed value or the list of field
/// violations, never both.
pub type ValidationOutcome<T> = Result<T, FieldErrors>;

/// Where the validated data comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// JSON request body.
    Body,
    /// URL query string, coerced before validation.
    Query,
}

impl Source {
    /// Return the string representation of this source.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Body => "body",
            Self::Query => "query",
        }
    }
}

/// Parse a request body as JSON.
pub fn parse_body(bytes: &[u8]) -> Result<Value, SchemaError> {
    serde_json::from_slice(bytes).map_err(|e| SchemaError::MalformedBody(e.to_string()))
}

/// A named, compiled shape.
#[derive(Clone)]
pub struct Schema {
    name: String,
    validator: Arc<jsonschema::Validator>,
}

impl std::fmt::Debug for Schema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Schema").field("name", &self.name).finish()
    }
}

impl Schema {
    /// Compile a JSON Schema document.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Compile`] if `schema` is not a valid Draft
    /// 2020-12 schema.
    pub fn new(name: impl Into<String>, schema: &Value) -> Result<Self, SchemaError> {
        let name = name.into();
        let validator = jsonschema::options()
            .with_draft(jsonschema::Draft::Draft202012)
            .build(schema)
            .map_err(|e| SchemaError::Compile {
                name: name.clone(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            name,
            validator: Arc::new(validator),
        })
    }

    /// The name given at construction.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check `value` against the shape, collecting every violation.
    pub fn check(&self, value: &Value, source: Source) -> Result<(), FieldErrors> {
        let errors: FieldErrors = self
            .validator
            .iter_errors(value)
            .map(|err| {
                let pointer = err.instance_path.to_string();
                let field = match &err.kind {
                    ValidationErrorKind::Required { property } => {
                        let property = property
                            .as_str()
                            .map(str::to_string)
                            .unwrap_or_else(|| property.to_string());
                        join_field(&pointer_to_field(&pointer), &property)
                    }
                    _ => pointer_to_field(&pointer),
                };
                FieldError {
                    field: if field.is_empty() {
                        source.as_str().to_string()
                    } else {
                        field
                    },
                    message: err.to_string(),
                }
            })
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Check an already-parsed value and deserialize it into `T`.
    ///
    /// A value that satisfies the schema but not `T` (a schema looser than
    /// the type) is reported against the source name.
    pub fn validate<T: DeserializeOwned>(&self, value: Value, source: Source) -> ValidationOutcome<T> {
        self.check(&value, source)?;
        serde_json::from_value(value).map_err(|e| {
            let mut errors = FieldErrors::new();
            errors.push(source.as_str(), e.to_string());
            errors
        })
    }

    /// Coerce a raw query string, then validate it.
    pub fn validate_query<T: DeserializeOwned>(&self, query: &str) -> ValidationOutcome<T> {
        self.validate(parse_query(query), Source::Query)
    }
}

/// `/lines/0/amount` → `lines.0.amount`, undoing JSON Pointer escapes.
fn pointer_to_field(pointer: &str) -> String {
    pointer
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| segment.replace("~1", "/").replace("~0", "~"))
        .collect::<Vec<_>>()
        .join(".")
}

fn join_field(parent: &str, child: &str) -> String {
    if parent.is_empty() {
        child.to_string()
    } else {
        format!("{parent}.{child}")
    }
}
