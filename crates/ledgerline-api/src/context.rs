//! # Per-Request Context
//!
//! A [`RequestContext`] is built once when a request enters a pipeline and
//! is threaded by value through every step. Steps never mutate it: a step
//! that learns something (the caller's identity, the validated input, the
//! rate-limit standing) derives a new context with one of the `with_*`
//! methods and hands that to the next step.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request};
use axum::http::{HeaderMap, Method};
use ledgerline_core::AuthContext;
use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;

use crate::error::AppError;
use crate::rate_limit::RateDecision;

/// Client identity used when nothing better is known.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Immutable per-request state shared by pipeline steps and the handler.
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: Uuid,
    client_ip: Arc<str>,
    method: Method,
    path: Arc<str>,
    auth: Option<Arc<AuthContext>>,
    validated: Option<Arc<Value>>,
    rate_limit: Option<RateDecision>,
}

impl RequestContext {
    /// Build the initial context for `request`.
    pub fn from_request(request: &Request) -> Self {
        let connect = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Self {
            request_id: Uuid::new_v4(),
            client_ip: client_ip(request.headers(), connect).into(),
            method: request.method().clone(),
            path: request.uri().path().into(),
            auth: None,
            validated: None,
            rate_limit: None,
        }
    }

    /// Correlation id, unique per request.
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// Best-effort client address (see [`client_ip`]).
    pub fn client_ip(&self) -> &str {
        &self.client_ip
    }

    /// HTTP method of the request.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Request path without the query string.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Verified identity, if an authenticate step has run.
    pub fn auth(&self) -> Option<&AuthContext> {
        self.auth.as_deref()
    }

    /// Verified identity, or 401 when absent.
    pub fn require_auth(&self) -> Result<&AuthContext, AppError> {
        self.auth().ok_or(AppError::AuthenticationRequired)
    }

    /// Rate-limit standing recorded by the rate-limit step.
    pub fn rate_limit(&self) -> Option<&RateDecision> {
        self.rate_limit.as_ref()
    }

    /// Raw validated input, if a validate step has run.
    pub fn validated_value(&self) -> Option<&Value> {
        self.validated.as_deref()
    }

    /// Validated input deserialized into the handler's type.
    ///
    /// # Errors
    ///
    /// [`AppError::Internal`] if no validate step ran or `T` does not match
    /// the type the step validated against. Both are wiring mistakes, not
    /// client errors.
    pub fn validated<T: DeserializeOwned>(&self) -> Result<T, AppError> {
        let value = self
            .validated
            .as_deref()
            .ok_or_else(|| AppError::Internal("handler expects validated input".into()))?;
        serde_json::from_value(value.clone())
            .map_err(|e| AppError::Internal(format!("validated input has unexpected shape: {e}")))
    }

    /// Derive a context carrying the verified identity.
    pub fn with_auth(self, auth: AuthContext) -> Self {
        Self {
            auth: Some(Arc::new(auth)),
            ..self
        }
    }

    /// Derive a context carrying validated input.
    pub fn with_validated(self, value: Value) -> Self {
        Self {
            validated: Some(Arc::new(value)),
            ..self
        }
    }

    /// Derive a context carrying the rate-limit standing.
    pub fn with_rate_limit(self, decision: RateDecision) -> Self {
        Self {
            rate_limit: Some(decision),
            ..self
        }
    }
}

/// Client identity for rate limiting and audit attribution.
///
/// First entry of `X-Forwarded-For`, then `X-Real-IP`, then the socket
/// peer address, then `"unknown"`.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let header_value = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    if let Some(first) = header_value("x-forwarded-for")
        .and_then(|list| list.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return first.to_string();
    }
    if let Some(real) = header_value("x-real-ip") {
        return real.to_string();
    }
    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}
