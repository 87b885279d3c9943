//! # Integration Tests for ledgerline-api
//!
//! Drives the assembled router with `tower::ServiceExt::oneshot`: health
//! probes, CSRF issuance, sign-in and sign-out, and a business route
//! mounted with the full canonical pipeline to exercise authentication,
//! CSRF, role checks, validation, audit recording and rate limiting
//! together.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use axum::routing::post_service;
use axum::Router;
use http_body_util::BodyExt;
use ledgerline_api::audit::AuditRecorder;
use ledgerline_api::config::AppConfig;
use ledgerline_api::middleware::{Csrf, RequireRole, Validate};
use ledgerline_api::rate_limit::RateLimitProfile;
use ledgerline_api::users::{MemoryUserDirectory, UserRecord};
use ledgerline_api::{ApiResponse, AppError, Handler, Pipeline, Services};
use ledgerline_core::{AuditAction, AuditEntry, AuthContext, Role, TokenKind};
use ledgerline_schema::Schema;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tower::ServiceExt;

const PASSWORD: &str = "correct horse battery staple";
const CSRF: &str = "0f0e0d0c0b0a09080706050403020100ffeeddccbbaa99887766554433221100";

// -- Harness ------------------------------------------------------------------

struct TestApp {
    router: Router,
    services: Services,
    audit_rx: mpsc::Receiver<AuditEntry>,
}

fn password_hash() -> String {
    static HASH: OnceLock<String> = OnceLock::new();
    HASH.get_or_init(|| ledgerline_crypto::hash_password(PASSWORD))
        .clone()
}

fn account() -> UserRecord {
    UserRecord {
        subject_id: "usr_ana".into(),
        email: "ana@acme.test".into(),
        display_name: "Ana Ruiz".into(),
        role: Role::Approver,
        tenant_id: "ten_acme".into(),
        token_kind: TokenKind::Staff,
        password_hash: password_hash(),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateInvoice {
    customer_id: String,
    amount: f64,
}

fn invoice_schema() -> Schema {
    Schema::new(
        "create-invoice",
        &json!({
            "type": "object",
            "required": ["customerId", "amount"],
            "properties": {
                "customerId": { "type": "string", "minLength": 1 },
                "amount": { "type": "number", "exclusiveMinimum": 0 }
            },
            "additionalProperties": false
        }),
    )
    .unwrap()
}

/// `POST /v1/invoices` with every step, `GET /v1/invoices` read-only.
fn invoice_routes(services: &Services) -> Router {
    let api = &services.config.rate_limits.api;

    let create = Pipeline::new()
        .step(services.rate_limit(api))
        .step(services.authenticate())
        .step(Csrf)
        .step(RequireRole::new(Role::Clerk))
        .step(Validate::body::<CreateInvoice>(invoice_schema()))
        .step(services.audit("invoice"))
        .handler(Handler::new(|ctx, _req| async move {
            let input: CreateInvoice = ctx.validated()?;
            if input.customer_id == "cus_missing" {
                return Err(AppError::NotFound("customer".into()));
            }
            Ok::<_, AppError>(ApiResponse::created(json!({
                "id": "inv_1001",
                "customerId": input.customer_id,
                "amount": input.amount,
            })))
        }));

    let list = Pipeline::new()
        .step(services.rate_limit(api))
        .step(services.authenticate())
        .step(RequireRole::new(Role::Viewer))
        .step(services.audit("invoice"))
        .handler(Handler::new(|_ctx, _req| async {
            ApiResponse::ok(json!([{ "id": "inv_1001" }]))
        }));

    Router::new().route("/v1/invoices", post_service(create).get_service(list))
}

fn test_app_with(config: AppConfig) -> TestApp {
    let (audit, audit_rx) = AuditRecorder::channel(64);
    let users = MemoryUserDirectory::from_records(vec![account()]);
    let services = Services::new(config, audit, Arc::new(users));
    let router = ledgerline_api::app(services.clone())
        .unwrap()
        .merge(invoice_routes(&services));
    TestApp {
        router,
        services,
        audit_rx,
    }
}

fn test_app() -> TestApp {
    test_app_with(AppConfig::default())
}

fn identity(role: &str) -> AuthContext {
    AuthContext {
        subject_id: format!("usr_{role}"),
        email: format!("{role}@acme.test"),
        display_name: role.to_string(),
        role: role.to_string(),
        tenant_id: "ten_acme".into(),
        token_kind: TokenKind::Staff,
    }
}

fn bearer(app: &TestApp, role: &str) -> String {
    let token = app.services.credentials.sign(&identity(role), false).unwrap();
    format!("Bearer {token}")
}

/// Authenticated, CSRF-carrying invoice POST.
fn create_invoice(app: &TestApp, role: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/v1/invoices")
        .header(header::AUTHORIZATION, bearer(app, role))
        .header(header::COOKIE, format!("ll_csrf={CSRF}"))
        .header("x-csrf-token", CSRF)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn login_request(email: &str, password: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/v1/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "email": email, "password": password }).to_string(),
        ))
        .unwrap()
}

async fn send(app: &TestApp, request: Request<Body>) -> Response<Body> {
    app.router.clone().oneshot(request).await.unwrap()
}

async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Value of the `Set-Cookie` header for `name`, if any.
fn set_cookie(response: &Response<Body>, name: &str) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(&format!("{name}=")))
        .map(str::to_string)
}

fn cookie_value(set_cookie: &str) -> String {
    set_cookie
        .split(';')
        .next()
        .and_then(|pair| pair.split_once('='))
        .map(|(_, v)| v.to_string())
        .unwrap()
}

// -- Health Probes ------------------------------------------------------------

#[tokio::test]
async fn test_liveness_probe() {
    let app = test_app();
    let response = send(
        &app,
        Request::builder()
            .uri("/health/liveness")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_readiness_tracks_audit_worker() {
    let app = test_app();
    let ready = || {
        Request::builder()
            .uri("/health/readiness")
            .body(Body::empty())
            .unwrap()
    };
    assert_eq!(send(&app, ready()).await.status(), StatusCode::OK);

    let TestApp {
        router, audit_rx, ..
    } = app;
    drop(audit_rx);
    let response = router.oneshot(ready()).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

// -- CSRF issuance ------------------------------------------------------------

#[tokio::test]
async fn test_csrf_endpoint_sets_matching_cookie() {
    let app = test_app();
    let response = send(
        &app,
        Request::builder().uri("/v1/csrf").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-ratelimit-limit"));

    let cookie = set_cookie(&response, "ll_csrf").expect("csrf cookie");
    assert!(cookie.contains("SameSite=Strict"));
    assert!(!cookie.contains("HttpOnly"));

    let body = body_json(response).await;
    let token = body["data"]["csrfToken"].as_str().unwrap();
    assert_eq!(token.len(), 64);
    assert_eq!(cookie_value(&cookie), token);
}

// -- Sign-in / session / sign-out ---------------------------------------------

#[tokio::test]
async fn test_login_session_logout_flow() {
    let app = test_app();

    let response = send(&app, login_request("ANA@acme.test", PASSWORD)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let session_cookie = set_cookie(&response, "ll_session").expect("session cookie");
    assert!(session_cookie.contains("HttpOnly"));
    assert!(session_cookie.contains("Max-Age=28800"));
    let csrf_cookie = set_cookie(&response, "ll_csrf").expect("csrf cookie");
    let session = cookie_value(&session_cookie);
    let csrf = cookie_value(&csrf_cookie);

    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["user"]["subjectId"], "usr_ana");
    assert_eq!(body["data"]["csrfToken"], csrf.as_str());

    // Cookie session is accepted.
    let cookies = format!("ll_session={session}; ll_csrf={csrf}");
    let response = send(
        &app,
        Request::builder()
            .uri("/v1/session")
            .header(header::COOKIE, cookies.clone())
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["role"], "approver");
    assert_eq!(body["data"]["tenantId"], "ten_acme");

    // Sign-out without the CSRF header is refused.
    let response = send(
        &app,
        Request::builder()
            .method("POST")
            .uri("/v1/auth/logout")
            .header(header::COOKIE, cookies.clone())
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send(
        &app,
        Request::builder()
            .method("POST")
            .uri("/v1/auth/logout")
            .header(header::COOKIE, cookies)
            .header("x-csrf-token", csrf)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let cleared = set_cookie(&response, "ll_session").expect("removal cookie");
    assert!(cleared.contains("Max-Age=0"));
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let app = test_app();

    let wrong_password = send(&app, login_request("ana@acme.test", "nope")).await;
    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert!(set_cookie(&wrong_password, "ll_session").is_none());
    let wrong_password = body_json(wrong_password).await;

    let unknown = send(&app, login_request("nobody@acme.test", PASSWORD)).await;
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
    let unknown = body_json(unknown).await;

    assert_eq!(wrong_password, unknown);
    assert_eq!(unknown["error"], "Invalid email or password");
}

#[tokio::test]
async fn test_login_validation() {
    let app = test_app();

    let malformed = send(
        &app,
        Request::builder()
            .method("POST")
            .uri("/v1/auth/login")
            .body(Body::from("{\"email\":"))
            .unwrap(),
    )
    .await;
    assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(malformed).await["error"], "Request body is not valid JSON");

    let invalid = send(&app, login_request("not-an-email", "")).await;
    assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
    let body = body_json(invalid).await;
    assert_eq!(body["error"], "Validation failed");
    assert!(body["details"]["email"].is_array());
    assert!(body["details"]["password"].is_array());
}

#[tokio::test]
async fn test_login_is_rate_limited_by_auth_profile() {
    let mut config = AppConfig::default();
    config.rate_limits.auth = RateLimitProfile::new("auth", 2, Duration::from_secs(900));
    let app = test_app_with(config);

    for _ in 0..2 {
        let response = send(&app, login_request("nobody@acme.test", "x")).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
    let response = send(&app, login_request("ana@acme.test", PASSWORD)).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers()["x-ratelimit-limit"], "2");
    assert_eq!(response.headers()["x-ratelimit-remaining"], "0");
    assert!(response.headers().contains_key(header::RETRY_AFTER));
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert!(body["meta"]["retryAfter"].as_u64().unwrap() <= 900);
}

// -- Canonical pipeline on a business route -----------------------------------

#[tokio::test]
async fn test_session_requires_credentials() {
    let app = test_app();
    let response = send(
        &app,
        Request::builder().uri("/v1/session").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "Authentication required");

    let response = send(
        &app,
        Request::builder()
            .uri("/v1/session")
            .header(header::AUTHORIZATION, "Bearer garbage.token.value")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_successful_create_is_audited_once() {
    let mut app = test_app();
    let response = send(
        &app,
        create_invoice(&app, "clerk", json!({ "customerId": "cus_7", "amount": 120.5 })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    // The body reaches the caller intact after the audit step read it.
    let body = body_json(response).await;
    assert_eq!(body["data"]["id"], "inv_1001");
    assert_eq!(body["data"]["customerId"], "cus_7");

    let entry = app.audit_rx.try_recv().expect("one audit entry");
    assert_eq!(entry.action, AuditAction::Create);
    assert_eq!(entry.entity_type, "invoice");
    assert_eq!(entry.entity_id, "inv_1001");
    assert_eq!(entry.tenant_id, "ten_acme");
    assert_eq!(entry.actor_id, "usr_clerk");
    assert_eq!(entry.details["method"], "POST");
    assert_eq!(entry.details["path"], "/v1/invoices");
    assert!(app.audit_rx.try_recv().is_err());
}

#[tokio::test]
async fn test_failed_create_is_not_audited() {
    let mut app = test_app();
    let response = send(
        &app,
        create_invoice(&app, "clerk", json!({ "customerId": "cus_missing", "amount": 1 })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(app.audit_rx.try_recv().is_err());
}

#[tokio::test]
async fn test_reads_are_not_audited() {
    let mut app = test_app();
    let response = send(
        &app,
        Request::builder()
            .uri("/v1/invoices")
            .header(header::AUTHORIZATION, bearer(&app, "viewer"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(app.audit_rx.try_recv().is_err());
}

#[tokio::test]
async fn test_role_below_minimum_is_forbidden() {
    let mut app = test_app();
    let response = send(
        &app,
        create_invoice(&app, "viewer", json!({ "customerId": "cus_7", "amount": 10 })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        body_json(response).await["error"],
        "Insufficient permissions: requires clerk"
    );
    assert!(app.audit_rx.try_recv().is_err());

    let response = send(
        &app,
        create_invoice(&app, "admin", json!({ "customerId": "cus_7", "amount": 10 })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_csrf_is_checked_before_role_and_validation() {
    let mut app = test_app();
    let request = Request::builder()
        .method("POST")
        .uri("/v1/invoices")
        .header(header::AUTHORIZATION, bearer(&app, "viewer"))
        .header(header::COOKIE, format!("ll_csrf={CSRF}"))
        .header("x-csrf-token", "mismatch")
        .body(Body::from("not json"))
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["error"], "Invalid CSRF token");
    assert!(app.audit_rx.try_recv().is_err());
}

#[tokio::test]
async fn test_unauthenticated_request_never_reaches_validation() {
    let app = test_app();
    let request = Request::builder()
        .method("POST")
        .uri("/v1/invoices")
        .header(header::COOKIE, format!("ll_csrf={CSRF}"))
        .header("x-csrf-token", CSRF)
        .body(Body::from("not json"))
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().contains_key("x-ratelimit-remaining"));
}

#[tokio::test]
async fn test_invalid_invoice_reports_every_field() {
    let mut app = test_app();
    let response = send(
        &app,
        create_invoice(&app, "clerk", json!({ "amount": -3, "note": "x" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    let details = body["details"].as_object().unwrap();
    assert!(details.contains_key("customerId"), "{details:?}");
    assert!(details.contains_key("amount"), "{details:?}");
    assert!(app.audit_rx.try_recv().is_err());
}

#[tokio::test]
async fn test_expired_token_is_rejected() {
    let app = test_app();
    let issued = chrono::Utc::now() - chrono::Duration::hours(9);
    let token = app
        .services
        .credentials
        .sign_at(&identity("admin"), false, issued)
        .unwrap();
    let response = send(
        &app,
        Request::builder()
            .uri("/v1/session")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "Invalid or expired session");
}
