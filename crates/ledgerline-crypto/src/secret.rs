//! # Signing Secret
//!
//! The symmetric key for session tokens. Wiped from memory on drop and
//! redacted from `Debug` output so it never reaches logs.

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CryptoError;

/// Minimum length for a non-development secret.
pub const MIN_SECRET_LEN: usize = 32;

/// Fallback used when no secret is configured. Anyone with the source can
/// forge tokens signed with it.
const DEVELOPMENT_SECRET: &str = "ledgerline-development-secret-never-use-in-production";

/// HS256 signing secret.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SigningSecret {
    bytes: Vec<u8>,
    #[zeroize(skip)]
    insecure_default: bool,
}

impl SigningSecret {
    /// Wrap a configured secret. Rejects secrets shorter than
    /// [`MIN_SECRET_LEN`] bytes.
    pub fn new(secret: impl Into<Vec<u8>>) -> Result<Self, CryptoError> {
        let bytes = secret.into();
        if bytes.len() < MIN_SECRET_LEN {
            return Err(CryptoError::WeakSecret {
                min: MIN_SECRET_LEN,
                actual: bytes.len(),
            });
        }
        Ok(Self {
            bytes,
            insecure_default: false,
        })
    }

    /// The fixed development secret.
    pub fn development() -> Self {
        Self {
            bytes: DEVELOPMENT_SECRET.as_bytes().to_vec(),
            insecure_default: true,
        }
    }

    /// Whether this is the built-in development secret.
    pub fn is_insecure_default(&self) -> bool {
        self.insecure_default
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl std::fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningSecret")
            .field("bytes", &"[REDACTED]")
            .field("insecure_default", &self.insecure_default)
            .finish()
    }
}
