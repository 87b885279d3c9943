#![deny(missing_docs)]

//! # ledgerline-core: Foundational Types for Ledgerline
//!
//! Every other crate in the workspace depends on this one. It has no internal
//! crate dependencies, only `serde`, `serde_json`, `thiserror`, and `chrono`.
//!
//! ## Design Principles
//!
//! 1. **One role ordering.** [`meets_minimum`] is the only way to compare
//!    privilege. Nothing else in the workspace ranks roles.
//!
//! 2. **Identity is read-only.** [`AuthContext`] is produced once by token
//!    verification and never mutated by downstream code.
//!
//! 3. **Typed errors.** [`ValidationError`] is a `thiserror` enum; subsystem
//!    crates wrap it rather than passing strings around.

pub mod audit;
pub mod error;
pub mod identity;
pub mod role;

// Re-export primary types at crate root for ergonomic imports.
pub use audit::{AuditAction, AuditEntry};
pub use error::ValidationError;
pub use identity::{AuthContext, TokenKind, TokenPayload};
pub use role::{meets_minimum, role_rank, Role, ROLE_RANKS};
