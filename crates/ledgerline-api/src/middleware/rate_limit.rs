//! # Rate-Limit Step
//!
//! Checks the sliding window for the request's key and stamps the standing
//! onto every response that passes through, accepted or not:
//!
//! | Header                  | Value                                   |
//! |-------------------------|-----------------------------------------|
//! | `X-RateLimit-Limit`     | configured limit                        |
//! | `X-RateLimit-Remaining` | requests left in the window             |
//! | `X-RateLimit-Reset`     | Unix seconds when the oldest hit expires |
//! | `Retry-After`           | seconds to wait (rejections only)       |

use axum::http::{HeaderMap, HeaderValue};
use axum::response::IntoResponse;

use crate::error::AppError;
use crate::pipeline::{Handler, Step};
use crate::rate_limit::{RateDecision, RateLimitProfile, RateLimiter};

/// `X-RateLimit-Limit`.
pub const LIMIT_HEADER: &str = "x-ratelimit-limit";
/// `X-RateLimit-Remaining`.
pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";
/// `X-RateLimit-Reset`.
pub const RESET_HEADER: &str = "x-ratelimit-reset";

/// Step enforcing one [`RateLimitProfile`].
#[derive(Debug, Clone)]
pub struct RateLimit {
    limiter: RateLimiter,
    profile: RateLimitProfile,
}

impl RateLimit {
    /// Enforce `profile` against the shared `limiter`.
    pub fn new(limiter: RateLimiter, profile: RateLimitProfile) -> Self {
        Self { limiter, profile }
    }
}

impl Step for RateLimit {
    fn name(&self) -> &'static str {
        "rate_limit"
    }

    fn wrap(&self, next: Handler) -> Handler {
        let step = self.clone();
        Handler::new(move |ctx, req| {
            let step = step.clone();
            let next = next.clone();
            async move {
                let user = ctx.auth().map(|a| a.subject_id.clone());
                let key = step.profile.key(ctx.client_ip(), user.as_deref());
                let decision = step.limiter.check(&key, &step.profile);

                if let Some(retry_after) = decision.retry_after() {
                    tracing::warn!(
                        request_id = %ctx.request_id(),
                        key = %key,
                        retry_after_secs = retry_after.as_secs(),
                        "rate limit exceeded"
                    );
                    let mut response = AppError::RateLimited { retry_after }.into_response();
                    apply_headers(response.headers_mut(), &decision);
                    return response;
                }

                let mut response = next.call(ctx.with_rate_limit(decision), req).await;
                apply_headers(response.headers_mut(), &decision);
                response
            }
        })
    }
}

/// Write the `X-RateLimit-*` headers for `decision`.
pub fn apply_headers(headers: &mut HeaderMap, decision: &RateDecision) {
    headers.insert(LIMIT_HEADER, HeaderValue::from(decision.limit));
    headers.insert(REMAINING_HEADER, HeaderValue::from(decision.remaining));
    headers.insert(RESET_HEADER, HeaderValue::from(decision.reset_epoch_secs()));
}
