//! # CSRF Step (double submit)
//!
//! For mutating methods the `ll_csrf` cookie must equal the
//! `X-CSRF-Token` header, compared in constant time. A cross-site page can
//! make the browser send the cookie but cannot read it to forge the header.
//! `GET`, `HEAD` and `OPTIONS` pass untouched. Routes that must accept
//! cross-site posts (for example inbound webhooks) simply omit this step.

use axum::http::{HeaderMap, Method};
use axum::response::IntoResponse;
use axum_extra::extract::cookie::CookieJar;
use ledgerline_crypto::csrf_tokens_match;

use crate::error::AppError;
use crate::pipeline::{Handler, Step};

/// Name of the CSRF cookie.
pub const CSRF_COOKIE: &str = "ll_csrf";

/// Name of the header echoing the CSRF cookie.
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Whether `method` is exempt from CSRF checking.
pub fn is_safe_method(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// Compare the CSRF cookie with the CSRF header.
pub fn csrf_matches(headers: &HeaderMap) -> bool {
    let jar = CookieJar::from_headers(headers);
    let cookie = jar.get(CSRF_COOKIE).map(|c| c.value());
    let header = headers.get(CSRF_HEADER).and_then(|v| v.to_str().ok());
    csrf_tokens_match(cookie, header)
}

/// Double-submit CSRF step.
#[derive(Debug, Clone, Copy, Default)]
pub struct Csrf;

impl Step for Csrf {
    fn name(&self) -> &'static str {
        "csrf"
    }

    fn wrap(&self, next: Handler) -> Handler {
        Handler::new(move |ctx, req| {
            let next = next.clone();
            async move {
                if !is_safe_method(req.method()) && !csrf_matches(req.headers()) {
                    tracing::warn!(
                        request_id = %ctx.request_id(),
                        method = %ctx.method(),
                        path = ctx.path(),
                        client_ip = ctx.client_ip(),
                        "CSRF token mismatch"
                    );
                    return AppError::CsrfMismatch.into_response();
                }
                next.call(ctx, req).await
            }
        })
    }
}
