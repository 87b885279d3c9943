//! # Cryptographic Error Types
//!
//! Errors for operations that can fail for reasons the caller should fix
//! (bad configuration, invalid claims). Verification failures are not
//! errors: they collapse to `None`/`false` so no failure reason leaks.

use thiserror::Error;

/// Errors from credential operations.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// The claims to be signed are not a valid identity.
    #[error("invalid claims: {0}")]
    InvalidClaims(#[from] ledgerline_core::ValidationError),

    /// The signing secret is too short to be used outside development.
    #[error("signing secret must be at least {min} bytes, got {actual}")]
    WeakSecret {
        /// Minimum accepted length.
        min: usize,
        /// Length supplied.
        actual: usize,
    },

    /// Token encoding failed.
    #[error("token encoding failed: {0}")]
    Encoding(#[from] jsonwebtoken::errors::Error),
}
