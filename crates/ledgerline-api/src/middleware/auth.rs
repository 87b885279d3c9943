//! # Authentication & Authorization Steps
//!
//! [`Authenticate`] reads the session credential, verifies it, and derives a
//! context carrying the caller's [`AuthContext`]. [`RequireRole`] compares
//! that identity against a route's minimum role.
//!
//! ## Credential sources
//!
//! ```text
//! Cookie: ll_session=<token>          (checked first)
//! Authorization: Bearer <token>       (fallback)
//! ```
//!
//! When both are present the cookie wins. Verification failures are not
//! distinguished: an expired, tampered, or foreign token all produce the
//! same 401.

use std::sync::Arc;

use axum::http::{header, HeaderMap};
use axum::response::IntoResponse;
use axum_extra::extract::cookie::CookieJar;
use ledgerline_core::{AuthContext, Role};
use ledgerline_crypto::CredentialService;

use crate::error::AppError;
use crate::pipeline::{Handler, Step};

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "ll_session";

/// Extract the raw session token: cookie first, then bearer header.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_string());
        }
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

// ── Authenticate ────────────────────────────────────────────────────────────

/// Step that verifies the session credential.
#[derive(Debug, Clone)]
pub struct Authenticate {
    credentials: Arc<CredentialService>,
}

impl Authenticate {
    /// Verify tokens with `credentials`.
    pub fn new(credentials: Arc<CredentialService>) -> Self {
        Self { credentials }
    }
}

impl Step for Authenticate {
    fn name(&self) -> &'static str {
        "authenticate"
    }

    fn wrap(&self, next: Handler) -> Handler {
        let credentials = self.credentials.clone();
        Handler::new(move |ctx, req| {
            let credentials = credentials.clone();
            let next = next.clone();
            async move {
                let Some(token) = session_token(req.headers()) else {
                    tracing::warn!(
                        request_id = %ctx.request_id(),
                        path = ctx.path(),
                        "no session credential"
                    );
                    return AppError::AuthenticationRequired.into_response();
                };

                let Some(payload) = credentials.verify(&token) else {
                    tracing::warn!(
                        request_id = %ctx.request_id(),
                        client_ip = ctx.client_ip(),
                        "session credential rejected"
                    );
                    return AppError::InvalidCredential.into_response();
                };

                let auth = AuthContext::from(payload);
                tracing::debug!(
                    request_id = %ctx.request_id(),
                    subject = %auth.subject_id,
                    tenant = %auth.tenant_id,
                    "authenticated"
                );
                next.call(ctx.with_auth(auth), req).await
            }
        })
    }
}

// ── RequireRole ─────────────────────────────────────────────────────────────

/// Step admitting only callers at or above a minimum role.
///
/// Must follow [`Authenticate`]; without an identity in the context it
/// fails closed with 401.
#[derive(Debug, Clone, Copy)]
pub struct RequireRole {
    minimum: Role,
}

impl RequireRole {
    /// Require at least `minimum`.
    pub fn new(minimum: Role) -> Self {
        Self { minimum }
    }
}

impl Step for RequireRole {
    fn name(&self) -> &'static str {
        "require_role"
    }

    fn wrap(&self, next: Handler) -> Handler {
        let minimum = self.minimum;
        Handler::new(move |ctx, req| {
            let next = next.clone();
            async move {
                let Some(auth) = ctx.auth() else {
                    tracing::warn!(
                        request_id = %ctx.request_id(),
                        "role check without authenticated caller"
                    );
                    return AppError::AuthenticationRequired.into_response();
                };
                if !auth.has_role(minimum) {
                    tracing::warn!(
                        request_id = %ctx.request_id(),
                        subject = %auth.subject_id,
                        role = %auth.role,
                        required = minimum.as_str(),
                        "insufficient role"
                    );
                    return AppError::InsufficientRole { required: minimum }.into_response();
                }
                next.call(ctx, req).await
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::extract::Request;
    use axum::http::{HeaderValue, StatusCode};
    use ledgerline_core::TokenKind;
    use ledgerline_crypto::SigningSecret;
    use tower::ServiceExt;

    use crate::pipeline::Pipeline;

    fn credentials() -> Arc<CredentialService> {
        Arc::new(CredentialService::new(
            &SigningSecret::new(vec![7u8; 32]).unwrap(),
        ))
    }

    fn identity(role: &str) -> AuthContext {
        AuthContext {
            subject_id: "usr_1".into(),
            email: "clerk@acme.test".into(),
            display_name: "Clerk".into(),
            role: role.into(),
            tenant_id: "ten_1".into(),
            token_kind: TokenKind::Staff,
        }
    }

    fn echo_subject() -> Handler {
        Handler::new(|ctx, _req| async move {
            ctx.require_auth()
                .map(|a| a.subject_id.clone())
        })
    }

    #[test]
    fn cookie_wins_over_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("ll_session=from-cookie; other=1"));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        assert_eq!(session_token(&headers).as_deref(), Some("from-cookie"));

        headers.remove(header::COOKIE);
        assert_eq!(session_token(&headers).as_deref(), Some("from-header"));
    }

    #[test]
    fn absent_or_empty_credentials() {
        let mut headers = HeaderMap::new();
        assert_eq!(session_token(&headers), None);
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(session_token(&headers), None);
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(session_token(&headers), None);
        headers.insert(header::COOKIE, HeaderValue::from_static("ll_session="));
        assert_eq!(session_token(&headers), None);
    }

    #[tokio::test]
    async fn valid_token_reaches_handler_with_identity() {
        let creds = credentials();
        let token = creds.sign(&identity("clerk"), false).unwrap();
        let svc = Pipeline::new()
            .step(Authenticate::new(creds))
            .handler(echo_subject());

        let response = svc
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header("authorization", format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn missing_and_invalid_tokens_are_401() {
        let svc = Pipeline::new()
            .step(Authenticate::new(credentials()))
            .handler(echo_subject());

        let missing = svc
            .clone()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

        let invalid = svc
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header("cookie", "ll_session=not-a-token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(invalid.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn role_gate_uses_hierarchy() {
        let creds = credentials();
        let svc = Pipeline::new()
            .step(Authenticate::new(creds.clone()))
            .step(RequireRole::new(Role::Approver))
            .handler(echo_subject());

        for (role, expected) in [
            ("admin", StatusCode::OK),
            ("approver", StatusCode::OK),
            ("clerk", StatusCode::FORBIDDEN),
            ("external_party", StatusCode::FORBIDDEN),
        ] {
            let token = creds.sign(&identity(role), false).unwrap();
            let response = svc
                .clone()
                .oneshot(
                    Request::builder()
                        .uri("/")
                        .header("authorization", format!("Bearer {token}"))
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), expected, "{role}");
        }
    }

    #[tokio::test]
    async fn role_gate_without_authentication_fails_closed() {
        let svc = Pipeline::new()
            .step(RequireRole::new(Role::Viewer))
            .handler(echo_subject());
        let response = svc
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
