//! # ledgerline-api: Request Pipeline for the Ledgerline API
//!
//! Every Ledgerline endpoint runs through a [`Pipeline`] of independent
//! steps composed around its business handler:
//!
//! ```text
//! RateLimit → Authenticate → Csrf → RequireRole → Validate → Audit → handler
//! ```
//!
//! | Module                  | Concern                                        |
//! |-------------------------|------------------------------------------------|
//! | [`pipeline`]            | `Step`, `Handler`, composition, tower adapter  |
//! | [`context`]             | Immutable per-request context                  |
//! | [`rate_limit`]          | Sliding-window store and profiles              |
//! | [`middleware`]          | The steps themselves and the trace layer       |
//! | [`audit`], [`db`]       | Audit queue, in-memory and PostgreSQL sinks    |
//! | [`error`]               | `AppError`, response envelope                  |
//! | [`config`], [`state`]   | Environment configuration, shared services     |
//! | [`routes`]              | Session endpoints shipped with the binary      |
//!
//! Health probes (`/health/*`) sit outside every pipeline.

pub mod audit;
pub mod config;
pub mod context;
pub mod credentials;
pub mod db;
pub mod error;
pub mod middleware;
pub mod pipeline;
pub mod rate_limit;
pub mod routes;
pub mod state;
pub mod users;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use ledgerline_schema::SchemaError;

pub use context::RequestContext;
pub use error::{ApiResponse, AppError, Envelope};
pub use pipeline::{Handler, Pipeline, PipelineService, Step};
pub use state::Services;

/// Assemble the router: health probes plus the session routes, traced.
///
/// Embedding applications merge their own business routes into the
/// returned router.
pub fn app(services: Services) -> Result<Router, SchemaError> {
    let health = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .with_state(services.clone());

    Ok(Router::new()
        .merge(health)
        .merge(routes::session::router(&services)?)
        .layer(middleware::tracing_layer::layer()))
}

/// Liveness probe: 200 while the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe: 503 once the audit worker has stopped.
async fn readiness(State(services): State<Services>) -> (StatusCode, &'static str) {
    if services.audit.is_closed() {
        (StatusCode::SERVICE_UNAVAILABLE, "audit unavailable")
    } else {
        (StatusCode::OK, "ready")
    }
}
