//! # ledgerline-crypto: Credential Primitives
//!
//! Everything the request pipeline needs to establish who a caller is:
//!
//! - **Session tokens**: HS256-signed [`TokenPayload`](ledgerline_core::TokenPayload)s
//!   issued and verified by [`CredentialService`]. Verification checks
//!   signature, issuer, audience, and expiry in one pass and reports only
//!   success or failure.
//! - **Passwords**: salted PBKDF2-HMAC-SHA256, stored as `hex(salt):hex(key)`.
//! - **CSRF tokens**: 32 bytes from the OS CSPRNG, hex encoded.
//! - **Constant-time comparison** for every secret-dependent equality check.
//!
//! Nothing here performs I/O. Password derivation is the only slow call and
//! callers on an async runtime should move it to a blocking thread.

pub mod compare;
pub mod csrf;
pub mod error;
pub mod password;
pub mod secret;
pub mod token;

// Re-export primary types.
pub use compare::{constant_time_eq, constant_time_str_eq};
pub use csrf::{csrf_tokens_match, generate_csrf_token, CSRF_TOKEN_BYTES};
pub use error::CryptoError;
pub use password::{hash_password, verify_password, PBKDF2_ITERATIONS};
pub use secret::SigningSecret;
pub use token::{CredentialService, TokenLifetimes};
