//! Pipeline steps and router-level layers.

pub mod audit;
pub mod auth;
pub mod csrf;
pub mod rate_limit;
pub mod tracing_layer;
pub mod validate;

pub use audit::Audit;
pub use auth::{Authenticate, RequireRole};
pub use csrf::Csrf;
pub use rate_limit::RateLimit;
pub use validate::Validate;
