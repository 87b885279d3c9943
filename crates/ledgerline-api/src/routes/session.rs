//! Session endpoints: CSRF issuance, sign-in, sign-out, and the current
//! caller's identity.
//!
//! Sign-in sets two cookies:
//!
//! - `ll_session`: the signed token, `HttpOnly`, `SameSite=Lax`.
//! - `ll_csrf`: a fresh CSRF token, readable by scripts so the client can
//!   echo it in `X-CSRF-Token`, `SameSite=Strict`.
//!
//! Both carry `Secure` in production. Tokens are stateless, so sign-out
//! clears the cookies but cannot revoke a token copied elsewhere before it
//! expires.

use axum::extract::Request;
use axum::routing::{get_service, post_service};
use axum::Router;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Utc};
use ledgerline_core::AuthContext;
use ledgerline_crypto::generate_csrf_token;
use ledgerline_schema::{Schema, SchemaError};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::context::RequestContext;
use crate::credentials;
use crate::error::{ApiResponse, AppError};
use crate::middleware::auth::SESSION_COOKIE;
use crate::middleware::csrf::CSRF_COOKIE;
use crate::middleware::{Csrf, Validate};
use crate::pipeline::{Handler, Pipeline};
use crate::state::Services;

/// Sign-in request body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    /// Account email.
    pub email: String,
    /// Plaintext password.
    pub password: String,
    /// Issue a long-lived session.
    #[serde(default)]
    pub remember_me: bool,
}

/// Successful sign-in.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionGrant {
    /// The signed-in identity.
    pub user: AuthContext,
    /// Session token, for clients that send `Authorization: Bearer`.
    pub token: String,
    /// CSRF token matching the `ll_csrf` cookie.
    pub csrf_token: String,
    /// When the session expires.
    pub expires_at: DateTime<Utc>,
}

/// Shape of [`LoginRequest`].
pub fn login_schema() -> Result<Schema, SchemaError> {
    Schema::new(
        "login",
        &json!({
            "type": "object",
            "required": ["email", "password"],
            "properties": {
                "email": {
                    "type": "string",
                    "minLength": 3,
                    "maxLength": 254,
                    "pattern": "^[^@\\s]+@[^@\\s]+$"
                },
                "password": { "type": "string", "minLength": 1, "maxLength": 1024 },
                "rememberMe": { "type": "boolean" }
            },
            "additionalProperties": false
        }),
    )
}

/// Session routes.
pub fn router(services: &Services) -> Result<Router, SchemaError> {
    let limits = &services.config.rate_limits;

    let csrf = Pipeline::new()
        .step(services.rate_limit(&limits.api))
        .handler(Handler::new({
            let services = services.clone();
            move |_ctx, _req| issue_csrf(services.clone())
        }));

    let session = Pipeline::new()
        .step(services.rate_limit(&limits.api))
        .step(services.authenticate())
        .handler(Handler::new(|ctx, _req| current_session(ctx)));

    let login = Pipeline::new()
        .step(services.rate_limit(&limits.auth))
        .step(Validate::body::<LoginRequest>(login_schema()?))
        .handler(Handler::new({
            let services = services.clone();
            move |ctx, _req| login(services.clone(), ctx)
        }));

    let logout = Pipeline::new()
        .step(services.rate_limit(&limits.api))
        .step(services.authenticate())
        .step(Csrf)
        .handler(Handler::new({
            let services = services.clone();
            move |ctx, req: Request| {
                let jar = CookieJar::from_headers(req.headers());
                logout(services.clone(), ctx, jar)
            }
        }));

    Ok(Router::new()
        .route("/v1/csrf", get_service(csrf))
        .route("/v1/session", get_service(session))
        .route("/v1/auth/login", post_service(login))
        .route("/v1/auth/logout", post_service(logout)))
}

fn csrf_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((CSRF_COOKIE, token))
        .path("/")
        .http_only(false)
        .same_site(SameSite::Strict)
        .secure(secure)
        .build()
}

fn session_cookie(token: String, max_age_secs: i64, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(time::Duration::seconds(max_age_secs))
        .build()
}

async fn issue_csrf(services: Services) -> (CookieJar, ApiResponse<serde_json::Value>) {
    let token = generate_csrf_token();
    let jar = CookieJar::new().add(csrf_cookie(token.clone(), services.secure_cookies()));
    (jar, ApiResponse::ok(json!({ "csrfToken": token })))
}

async fn current_session(ctx: RequestContext) -> Result<ApiResponse<AuthContext>, AppError> {
    Ok(ApiResponse::ok(ctx.require_auth()?.clone()))
}

async fn login(
    services: Services,
    ctx: RequestContext,
) -> Result<(CookieJar, ApiResponse<SessionGrant>), AppError> {
    let request: LoginRequest = ctx.validated()?;

    let Some(user) = services.users.find_by_email(&request.email) else {
        credentials::verify_against_decoy(request.password, &services.decoy_hash).await?;
        tracing::warn!(
            request_id = %ctx.request_id(),
            client_ip = ctx.client_ip(),
            "sign-in for unknown account"
        );
        return Err(AppError::InvalidLogin);
    };

    if !credentials::verify_password(request.password, user.password_hash.clone()).await? {
        tracing::warn!(
            request_id = %ctx.request_id(),
            client_ip = ctx.client_ip(),
            subject = %user.subject_id,
            "sign-in with wrong password"
        );
        return Err(AppError::InvalidLogin);
    }

    let auth = user.auth_context();
    let issued_at = Utc::now();
    let token = services
        .credentials
        .sign_at(&auth, request.remember_me, issued_at)
        .map_err(|e| AppError::Internal(format!("failed to sign session token: {e}")))?;

    let lifetimes = services.credentials.lifetimes();
    let ttl = if request.remember_me {
        lifetimes.extended
    } else {
        lifetimes.session
    };

    let csrf_token = generate_csrf_token();
    let secure = services.secure_cookies();
    let jar = CookieJar::new()
        .add(session_cookie(token.clone(), ttl.num_seconds(), secure))
        .add(csrf_cookie(csrf_token.clone(), secure));

    tracing::info!(
        request_id = %ctx.request_id(),
        subject = %auth.subject_id,
        tenant = %auth.tenant_id,
        remember_me = request.remember_me,
        "signed in"
    );

    Ok((
        jar,
        ApiResponse::ok(SessionGrant {
            user: auth,
            token,
            csrf_token,
            expires_at: issued_at + ttl,
        }),
    ))
}

/// Removal cookies are only emitted for cookies present in `jar`, which is
/// built from the request.
async fn logout(
    services: Services,
    ctx: RequestContext,
    jar: CookieJar,
) -> Result<(CookieJar, ApiResponse<serde_json::Value>), AppError> {
    let auth = ctx.require_auth()?;
    let secure = services.secure_cookies();
    let jar = jar
        .remove(Cookie::build(SESSION_COOKIE).path("/").secure(secure))
        .remove(Cookie::build(CSRF_COOKIE).path("/").secure(secure));

    tracing::info!(
        request_id = %ctx.request_id(),
        subject = %auth.subject_id,
        "signed out"
    );
    Ok((jar, ApiResponse::ok(json!({ "signedOut": true }))))
}
