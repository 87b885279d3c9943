//! # Audit Step
//!
//! Runs after the handler. For `POST`, `PUT`, `PATCH` and `DELETE` requests
//! that ended in a 2xx status, it buffers the response body, reads the
//! entity id out of it (`data.id`, then top-level `id`, else `"unknown"`),
//! queues an [`AuditEntry`], and returns the same bytes to the caller.
//!
//! A mutation reaching this step without an authenticated caller is refused
//! with 401 before the handler runs, so a mis-ordered pipeline cannot
//! perform unrecorded writes. Reads pass through untouched.

use axum::body::{to_bytes, Body};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use ledgerline_core::{AuditAction, AuditEntry};
use serde_json::Value;

use crate::audit::AuditRecorder;
use crate::error::AppError;
use crate::pipeline::{Handler, Step};

/// Entity id recorded when the response names none.
pub const UNKNOWN_ENTITY: &str = "unknown";

/// Pull the entity id out of a JSON response body.
pub fn extract_entity_id(body: &[u8]) -> String {
    let Ok(json) = serde_json::from_slice::<Value>(body) else {
        return UNKNOWN_ENTITY.to_string();
    };
    let id = [json.pointer("/data/id"), json.get("id")]
        .into_iter()
        .flatten()
        .find_map(|id| match id {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .unwrap_or_else(|| UNKNOWN_ENTITY.to_string());
    id
}

/// Step recording successful mutations of one entity type.
#[derive(Debug, Clone)]
pub struct Audit {
    recorder: AuditRecorder,
    entity_type: String,
}

impl Audit {
    /// Record mutations of `entity_type` into `recorder`.
    pub fn new(recorder: AuditRecorder, entity_type: impl Into<String>) -> Self {
        Self {
            recorder,
            entity_type: entity_type.into(),
        }
    }
}

impl Step for Audit {
    fn name(&self) -> &'static str {
        "audit"
    }

    fn wrap(&self, next: Handler) -> Handler {
        let step = self.clone();
        Handler::new(move |ctx, req| {
            let step = step.clone();
            let next = next.clone();
            async move {
                let Some(action) = AuditAction::from_method(ctx.method().as_str()) else {
                    return next.call(ctx, req).await;
                };
                let Some(auth) = ctx.auth().cloned() else {
                    tracing::warn!(
                        request_id = %ctx.request_id(),
                        entity_type = %step.entity_type,
                        "mutation reached audit without an authenticated caller"
                    );
                    return AppError::AuthenticationRequired.into_response();
                };

                let ctx_for_entry = ctx.clone();
                let response = next.call(ctx, req).await;
                if !response.status().is_success() {
                    return response;
                }

                let (parts, body) = response.into_parts();
                let bytes = match to_bytes(body, usize::MAX).await {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        return AppError::Internal(format!("failed to buffer response body: {e}"))
                            .into_response();
                    }
                };

                let entry = AuditEntry {
                    tenant_id: auth.tenant_id,
                    actor_id: auth.subject_id,
                    action,
                    entity_type: step.entity_type.clone(),
                    entity_id: extract_entity_id(&bytes),
                    ip_address: ctx_for_entry.client_ip().to_string(),
                    details: serde_json::json!({
                        "method": ctx_for_entry.method().as_str(),
                        "path": ctx_for_entry.path(),
                        "requestId": ctx_for_entry.request_id(),
                    }),
                    timestamp: Utc::now(),
                };
                tracing::debug!(
                    request_id = %ctx_for_entry.request_id(),
                    action = action.as_str(),
                    entity_type = %entry.entity_type,
                    entity_id = %entry.entity_id,
                    "audit entry queued"
                );
                step.recorder.record(entry);

                Response::from_parts(parts, Body::from(bytes))
            }
        })
    }
}
