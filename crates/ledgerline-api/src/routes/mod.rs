//! # Route Handlers
//!
//! | Method | Path               | Pipeline                                   |
//! |--------|--------------------|--------------------------------------------|
//! | GET    | `/v1/csrf`         | rate limit (api)                           |
//! | GET    | `/v1/session`      | rate limit (api) → authenticate            |
//! | POST   | `/v1/auth/login`   | rate limit (auth) → validate               |
//! | POST   | `/v1/auth/logout`  | rate limit (api) → authenticate → CSRF     |
//!
//! Business routes are mounted by the embedding application with their own
//! [`Pipeline`](crate::pipeline::Pipeline)s.

pub mod session;
