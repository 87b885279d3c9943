//! # Shared Services
//!
//! Everything a pipeline step needs is constructed once at startup and held
//! in [`Services`]. Steps receive clones of the handles they use; there are
//! no globals.

use std::sync::Arc;

use ledgerline_crypto::CredentialService;

use crate::audit::{AuditRecorder, MemoryAuditSink};
use crate::config::AppConfig;
use crate::middleware::{Audit, Authenticate, RateLimit};
use crate::rate_limit::{RateLimitProfile, RateLimiter};
use crate::users::{MemoryUserDirectory, UserDirectory};

/// Startup-constructed service handles. Cloning is cheap.
#[derive(Clone)]
pub struct Services {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Token signing and verification.
    pub credentials: Arc<CredentialService>,
    /// Shared rate-limit store.
    pub limiter: RateLimiter,
    /// Audit queue producer.
    pub audit: AuditRecorder,
    /// Sign-in account lookup.
    pub users: Arc<dyn UserDirectory>,
    /// Hash verified against when sign-in names an unknown account.
    pub decoy_hash: Arc<str>,
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("config", &self.config)
            .field("credentials", &self.credentials)
            .field("rate_limit_keys", &self.limiter.len())
            .finish_non_exhaustive()
    }
}

impl Services {
    /// Assemble services around an audit recorder and user directory.
    pub fn new(config: AppConfig, audit: AuditRecorder, users: Arc<dyn UserDirectory>) -> Self {
        let credentials = CredentialService::new(&config.signing_secret);
        Self {
            config: Arc::new(config),
            credentials: Arc::new(credentials),
            limiter: RateLimiter::new(),
            audit,
            users,
            decoy_hash: crate::credentials::decoy_hash().into(),
        }
    }

    /// Development services: default configuration, in-memory audit sink,
    /// no accounts. Must be called inside a Tokio runtime.
    pub fn in_memory() -> (Self, MemoryAuditSink) {
        let sink = MemoryAuditSink::new();
        let config = AppConfig::default();
        let (audit, _worker) = AuditRecorder::spawn(Arc::new(sink.clone()), config.audit_queue_capacity);
        let services = Self::new(config, audit, Arc::new(MemoryUserDirectory::empty()));
        (services, sink)
    }

    /// Rate-limit step for `profile`.
    pub fn rate_limit(&self, profile: &RateLimitProfile) -> RateLimit {
        RateLimit::new(self.limiter.clone(), profile.clone())
    }

    /// Authentication step.
    pub fn authenticate(&self) -> Authenticate {
        Authenticate::new(self.credentials.clone())
    }

    /// Audit step for mutations of `entity_type`.
    pub fn audit(&self, entity_type: impl Into<String>) -> Audit {
        Audit::new(self.audit.clone(), entity_type)
    }

    /// Whether cookies should carry the `Secure` attribute.
    pub fn secure_cookies(&self) -> bool {
        self.config.environment.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use axum::body::Body;
    use axum::extract::Request;
    use axum::http::StatusCode;
    use ledgerline_core::{AuthContext, TokenKind};
    use serde_json::json;
    use tower::ServiceExt;

    use crate::error::ApiResponse;
    use crate::pipeline::{Handler, Pipeline};

    #[tokio::test]
    async fn in_memory_services_audit_into_sink() {
        let (services, sink) = Services::in_memory();
        assert!(!services.secure_cookies());
        assert!(services.users.find_by_email("anyone@acme.test").is_none());
        assert!(ledgerline_crypto::verify_password(
            "ledgerline-decoy-password",
            &services.decoy_hash
        ));

        let token = services
            .credentials
            .sign(
                &AuthContext {
                    subject_id: "usr_1".into(),
                    email: "a@acme.test".into(),
                    display_name: "A".into(),
                    role: "clerk".into(),
                    tenant_id: "ten_1".into(),
                    token_kind: TokenKind::Staff,
                },
                false,
            )
            .unwrap();

        let svc = Pipeline::new()
            .step(services.rate_limit(&services.config.rate_limits.api))
            .step(services.authenticate())
            .step(services.audit("vendor"))
            .handler(Handler::new(|_ctx, _req| async {
                ApiResponse::created(json!({ "id": "ven_1" }))
            }));

        let response = svc
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/vendors")
                    .header("authorization", format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(services.limiter.len(), 1);

        // The worker drains the queue asynchronously.
        for _ in 0..100 {
            if !sink.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let entries = sink.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].entity_type, "vendor");
        assert_eq!(entries[0].entity_id, "ven_1");
    }
}
