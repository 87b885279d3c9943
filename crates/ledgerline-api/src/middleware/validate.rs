//! # Validation Step
//!
//! Checks the request body or query string against a compiled [`Schema`]
//! and, on success, derives a context carrying the validated value for the
//! handler to read with [`RequestContext::validated`].
//!
//! A body that is not JSON fails with [`AppError::MalformedRequestBody`];
//! JSON that does not match the shape fails with
//! [`AppError::ValidationFailed`] listing every violation. Both are 400.
//! The body bytes are handed on to the next step unchanged.
//!
//! [`RequestContext::validated`]: crate::context::RequestContext::validated

use axum::body::{to_bytes, Body};
use axum::extract::Request;
use axum::response::IntoResponse;
use ledgerline_schema::{parse_body, parse_query, FieldErrors, Schema, Source};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::AppError;
use crate::pipeline::{Handler, Step};

/// Largest body the step will buffer, unless overridden.
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

type Conforms = fn(&Schema, Value, Source) -> Result<(), FieldErrors>;

fn conforms<T: DeserializeOwned>(schema: &Schema, value: Value, source: Source) -> Result<(), FieldErrors> {
    schema.validate::<T>(value, source).map(|_| ())
}

/// Schema validation step for one source.
#[derive(Clone)]
pub struct Validate {
    schema: Schema,
    source: Source,
    body_limit: usize,
    conforms: Conforms,
}

impl std::fmt::Debug for Validate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Validate")
            .field("schema", &self.schema.name())
            .field("source", &self.source)
            .field("body_limit", &self.body_limit)
            .finish()
    }
}

impl Validate {
    /// Validate the JSON body against `schema` and require that it
    /// deserializes into `T`.
    pub fn body<T: DeserializeOwned>(schema: Schema) -> Self {
        Self::with_source::<T>(schema, Source::Body)
    }

    /// Validate the coerced query string against `schema` and require that
    /// it deserializes into `T`.
    pub fn query<T: DeserializeOwned>(schema: Schema) -> Self {
        Self::with_source::<T>(schema, Source::Query)
    }

    fn with_source<T: DeserializeOwned>(schema: Schema, source: Source) -> Self {
        Self {
            schema,
            source,
            body_limit: DEFAULT_BODY_LIMIT,
            conforms: conforms::<T>,
        }
    }

    /// Override the body size limit.
    pub fn with_body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }

    /// Extract and check the input. Returns the validated value and the
    /// request, rebuilt around the buffered body.
    async fn check(&self, req: Request) -> Result<(Value, Request), AppError> {
        let (value, req) = match self.source {
            Source::Query => {
                let value = parse_query(req.uri().query().unwrap_or(""));
                (value, req)
            }
            Source::Body => {
                let (parts, body) = req.into_parts();
                let bytes = to_bytes(body, self.body_limit).await.map_err(|e| {
                    tracing::warn!(error = %e, "failed to read request body");
                    AppError::MalformedRequestBody
                })?;
                let value = parse_body(&bytes).map_err(|_| AppError::MalformedRequestBody)?;
                (value, Request::from_parts(parts, Body::from(bytes)))
            }
        };

        (self.conforms)(&self.schema, value.clone(), self.source)
            .map_err(AppError::ValidationFailed)?;
        Ok((value, req))
    }
}

impl Step for Validate {
    fn name(&self) -> &'static str {
        "validate"
    }

    fn wrap(&self, next: Handler) -> Handler {
        let step = self.clone();
        Handler::new(move |ctx, req| {
            let step = step.clone();
            let next = next.clone();
            async move {
                match step.check(req).await {
                    Ok((value, req)) => next.call(ctx.with_validated(value), req).await,
                    Err(err) => {
                        tracing::warn!(
                            request_id = %ctx.request_id(),
                            schema = step.schema.name(),
                            source = step.source.as_str(),
                            error = %err,
                            "request failed validation"
                        );
                        err.into_response()
                    }
                }
            }
        })
    }
}
