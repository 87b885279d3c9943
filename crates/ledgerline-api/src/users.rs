//! # Sign-In Directory
//!
//! The pipeline does not own user storage. Sign-in looks accounts up through
//! the [`UserDirectory`] trait; the binary ships [`MemoryUserDirectory`],
//! loaded from a JSON file named by `USERS_FILE`:
//!
//! ```json
//! [
//!   {
//!     "subjectId": "usr_01",
//!     "email": "ana@acme.test",
//!     "displayName": "Ana Ruiz",
//!     "role": "approver",
//!     "tenantId": "ten_acme",
//!     "tokenKind": "staff",
//!     "passwordHash": "<salt hex>:<key hex>"
//!   }
//! ]
//! ```
//!
//! Password hashes come from `ledgerline password hash`.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use ledgerline_core::{AuthContext, Role, TokenKind};
use serde::Deserialize;
use thiserror::Error;

/// Failure to load a directory file.
#[derive(Error, Debug)]
pub enum DirectoryError {
    /// The file could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        /// File path.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The file is not a JSON list of user records.
    #[error("invalid user file {path}: {source}")]
    Parse {
        /// File path.
        path: String,
        /// Underlying error.
        source: serde_json::Error,
    },
}

/// A sign-in account.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    /// Stable user identifier.
    pub subject_id: String,
    /// Sign-in email.
    pub email: String,
    /// Name shown in the UI.
    pub display_name: String,
    /// Role granted in the tenant.
    pub role: Role,
    /// Tenant the account belongs to.
    pub tenant_id: String,
    /// Staff or portal account.
    #[serde(default = "default_kind")]
    pub token_kind: TokenKind,
    /// `hex(salt):hex(key)` PBKDF2 hash.
    pub password_hash: String,
}

fn default_kind() -> TokenKind {
    TokenKind::Staff
}

impl UserRecord {
    /// Identity to sign into the session token.
    pub fn auth_context(&self) -> AuthContext {
        AuthContext {
            subject_id: self.subject_id.clone(),
            email: self.email.clone(),
            display_name: self.display_name.clone(),
            role: self.role.as_str().to_string(),
            tenant_id: self.tenant_id.clone(),
            token_kind: self.token_kind,
        }
    }
}

/// Lookup of sign-in accounts by email.
pub trait UserDirectory: Send + Sync + 'static {
    /// Find the account for `email`, compared case-insensitively.
    fn find_by_email(&self, email: &str) -> Option<UserRecord>;
}

/// Immutable in-memory directory.
#[derive(Debug, Clone, Default)]
pub struct MemoryUserDirectory {
    by_email: Arc<HashMap<String, UserRecord>>,
}

impl MemoryUserDirectory {
    /// Directory with no accounts; every sign-in fails.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Directory holding `records`. A later record with the same email
    /// replaces an earlier one.
    pub fn from_records(records: impl IntoIterator<Item = UserRecord>) -> Self {
        let by_email = records
            .into_iter()
            .map(|r| (r.email.to_lowercase(), r))
            .collect();
        Self {
            by_email: Arc::new(by_email),
        }
    }

    /// Load a JSON list of [`UserRecord`]s.
    pub fn load(path: &Path) -> Result<Self, DirectoryError> {
        let display = path.display().to_string();
        let raw = std::fs::read(path).map_err(|source| DirectoryError::Io {
            path: display.clone(),
            source,
        })?;
        let records: Vec<UserRecord> =
            serde_json::from_slice(&raw).map_err(|source| DirectoryError::Parse {
                path: display,
                source,
            })?;
        Ok(Self::from_records(records))
    }

    /// Number of accounts.
    pub fn len(&self) -> usize {
        self.by_email.len()
    }

    /// Whether there are no accounts.
    pub fn is_empty(&self) -> bool {
        self.by_email.is_empty()
    }
}

impl UserDirectory for MemoryUserDirectory {
    fn find_by_email(&self, email: &str) -> Option<UserRecord> {
        self.by_email.get(&email.trim().to_lowercase()).cloned()
    }
}
