//! # ledgerline-schema: Request Validation
//!
//! Validates inbound data against a declared shape and reports every
//! violation as a `{ field, message }` pair.
//!
//! - Shapes are JSON Schema (Draft 2020-12) documents compiled once into a
//!   [`Schema`] at startup.
//! - Bodies are parsed as JSON; a body that is not JSON is a
//!   [`SchemaError::MalformedBody`], distinct from a body that is JSON but
//!   does not match the shape.
//! - Query strings carry only text, so values are coerced first (see
//!   [`coerce`]) and then validated like a body.

pub mod coerce;
pub mod error;
pub mod validate;

pub use coerce::{coerce_query_value, parse_query};
pub use error::{FieldError, FieldErrors, SchemaError};
pub use validate::{parse_body, Schema, Source, ValidationOutcome};
