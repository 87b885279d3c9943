//! # Pipeline Composer
//!
//! A [`Step`] turns a [`Handler`] into a new handler that does some work
//! before and/or after delegating to it, or answers on its own without
//! delegating. Composition is right-to-left:
//!
//! ```text
//! Pipeline::new().step(a).step(b).step(c).handler(h)  ≡  a(b(c(h)))
//! ```
//!
//! so the first step listed sees the request first and the response last.
//! A step that rejects returns its error response and the inner chain,
//! including the business handler, never runs.
//!
//! The canonical order for a mutating endpoint is:
//!
//! ```text
//! RateLimit → Authenticate → Csrf → RequireRole → Validate → Audit → handler
//! ```
//!
//! A composed pipeline is a `tower::Service<Request>`, so it mounts directly
//! on an Axum router:
//!
//! ```rust,ignore
//! let create_invoice = Pipeline::new()
//!     .step(services.rate_limit(&services.config.rate_limits.api))
//!     .step(services.authenticate())
//!     .step(Csrf)
//!     .step(RequireRole::new(Role::Clerk))
//!     .step(Validate::body::<CreateInvoice>(schema))
//!     .step(services.audit("invoice"))
//!     .handler(Handler::new(create_invoice_handler));
//!
//! Router::new().route("/v1/invoices", post_service(create_invoice));
//! ```

use std::convert::Infallible;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::extract::Request;
use axum::response::{IntoResponse, Response};

use crate::context::RequestContext;

/// Boxed response future produced by a [`Handler`].
pub type BoxResponseFuture = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

type HandlerFn = dyn Fn(RequestContext, Request) -> BoxResponseFuture + Send + Sync;

/// A request handler that receives the per-request context alongside the
/// request. Cloning is cheap and shares the underlying function.
#[derive(Clone)]
pub struct Handler {
    inner: Arc<HandlerFn>,
}

impl Handler {
    /// Wrap an async function. Anything implementing [`IntoResponse`] may
    /// be returned, including `Result<T, AppError>`.
    pub fn new<F, Fut, R>(f: F) -> Self
    where
        F: Fn(RequestContext, Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse,
    {
        Self {
            inner: Arc::new(move |ctx: RequestContext, req: Request| -> BoxResponseFuture {
                let fut = f(ctx, req);
                Box::pin(async move { fut.await.into_response() })
            }),
        }
    }

    /// Invoke the handler.
    pub fn call(&self, ctx: RequestContext, req: Request) -> BoxResponseFuture {
        (self.inner)(ctx, req)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler").finish_non_exhaustive()
    }
}

/// One cross-cutting concern in a pipeline.
pub trait Step: Send + Sync + 'static {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Produce a handler that runs this step around `next`.
    fn wrap(&self, next: Handler) -> Handler;
}

/// Compose `steps` around `core`, first step outermost.
pub fn compose(steps: &[Arc<dyn Step>], core: Handler) -> Handler {
    steps
        .iter()
        .rev()
        .fold(core, |next, step| step.wrap(next))
}

/// Ordered list of steps, built once at startup.
#[derive(Clone, Default)]
pub struct Pipeline {
    steps: Vec<Arc<dyn Step>>,
}

impl Pipeline {
    /// Empty pipeline: the handler runs directly.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step. Steps run in the order they are added.
    pub fn step(mut self, step: impl Step) -> Self {
        self.steps.push(Arc::new(step));
        self
    }

    /// Names of the steps, outermost first.
    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Compose the steps around `core` without the service adapter.
    pub fn compose(&self, core: Handler) -> Handler {
        compose(&self.steps, core)
    }

    /// Compose the steps around `core` into a mountable service.
    pub fn handler(&self, core: Handler) -> PipelineService {
        PipelineService {
            handler: self.compose(core),
        }
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("steps", &self.step_names())
            .finish()
    }
}

/// A composed pipeline as a `tower::Service`. Builds the
/// [`RequestContext`] for every incoming request.
#[derive(Clone, Debug)]
pub struct PipelineService {
    handler: Handler,
}

impl tower::Service<Request> for PipelineService {
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Response, Infallible>> + Send + 'static>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let ctx = RequestContext::from_request(&req);
        let fut = self.handler.call(ctx, req);
        Box::pin(async move { Ok(fut.await) })
    }
}
