//! # Error Hierarchy
//!
//! Structured error types shared across the workspace, built with `thiserror`.
//! Subsystem crates wrap these in their own enums where they need more
//! context.

use thiserror::Error;

/// Validation errors for identity values before they are signed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required identity field was empty.
    #[error("{0} must be non-empty")]
    EmptyField(&'static str),

    /// Role name is not in the role-rank table.
    #[error("unknown role: \"{0}\"")]
    UnknownRole(String),
}
