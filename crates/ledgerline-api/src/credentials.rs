//! Password operations on Tokio's blocking pool.
//!
//! PBKDF2 with 100 000 iterations takes long enough to stall an async
//! worker, so request handlers go through these wrappers instead of calling
//! [`ledgerline_crypto::hash_password`] directly. Only sign-in and
//! password changes should need them; per-request authentication verifies
//! a signed token and never derives a key.

use crate::error::AppError;

const DECOY_PASSWORD: &str = "ledgerline-decoy-password";

/// Hash `plaintext` off the async executor.
pub async fn hash_password(plaintext: String) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || ledgerline_crypto::hash_password(&plaintext))
        .await
        .map_err(|e| AppError::Internal(format!("password hashing task failed: {e}")))
}

/// Check `plaintext` against `stored` off the async executor.
pub async fn verify_password(plaintext: String, stored: String) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || ledgerline_crypto::verify_password(&plaintext, &stored))
        .await
        .map_err(|e| AppError::Internal(format!("password verification task failed: {e}")))
}

/// Throwaway hash for [`verify_against_decoy`]. Computed once at startup.
pub fn decoy_hash() -> String {
    ledgerline_crypto::hash_password(DECOY_PASSWORD)
}

/// Burn one verification's worth of work against `decoy`, so an unknown
/// account answers in about the same time as a wrong password.
pub async fn verify_against_decoy(plaintext: String, decoy: &str) -> Result<(), AppError> {
    verify_password(plaintext, decoy.to_string()).await.map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn blocking_round_trip() {
        let stored = hash_password("correct horse".into()).await.unwrap();
        assert!(verify_password("correct horse".into(), stored.clone()).await.unwrap());
        assert!(!verify_password("wrong horse".into(), stored).await.unwrap());
    }

    #[tokio::test]
    async fn decoy_verification_completes() {
        let decoy = decoy_hash();
        assert!(ledgerline_crypto::verify_password(DECOY_PASSWORD, &decoy));
        verify_against_decoy("anything".into(), &decoy).await.unwrap();
        verify_against_decoy("again".into(), &decoy).await.unwrap();
    }
}
