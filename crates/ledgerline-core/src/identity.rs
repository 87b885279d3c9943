//! # Authenticated Identity
//!
//! [`AuthContext`] is what downstream handlers see about the caller.
//! [`TokenPayload`] is the signed form of the same identity plus the
//! envelope fields (issue time, expiry, issuer, audience) that the
//! credential service checks atomically.

use serde::{Deserialize, Serialize};

use crate::role::{meets_minimum, Role};

/// Which population a session token belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// Internal finance-team user.
    Staff,
    /// External party signed in through the portal.
    Portal,
}

impl TokenKind {
    /// Return the string representation of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Staff => "staff",
            Self::Portal => "portal",
        }
    }
}

/// Identity of the authenticated caller for the lifetime of one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthContext {
    /// User (or portal contact) identifier.
    pub subject_id: String,
    /// Sign-in email.
    pub email: String,
    /// Name shown in the UI and audit views.
    pub display_name: String,
    /// Role name. Kept as a string: tokens may carry roles this build
    /// does not know, which then rank lowest.
    pub role: String,
    /// Tenant the session is scoped to.
    pub tenant_id: String,
    /// Staff or portal session.
    pub token_kind: TokenKind,
}

impl AuthContext {
    /// Check if the caller has at least the given minimum role.
    pub fn has_role(&self, minimum: Role) -> bool {
        meets_minimum(&self.role, minimum.as_str())
    }
}

/// Signed session token body.
///
/// Field names on the wire follow the registered JWT claim names so that
/// expiry, issuer, and audience are validated by the token library in the
/// same pass as the signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPayload {
    /// Subject.
    #[serde(rename = "sub")]
    pub subject_id: String,
    /// Sign-in email.
    pub email: String,
    /// Display name.
    #[serde(rename = "name")]
    pub display_name: String,
    /// Role name.
    pub role: String,
    /// Tenant scope.
    #[serde(rename = "tid")]
    pub tenant_id: String,
    /// Staff or portal session.
    #[serde(rename = "knd")]
    pub token_kind: TokenKind,
    /// Issue time, seconds since the Unix epoch.
    #[serde(rename = "iat")]
    pub issued_at: i64,
    /// Expiry, seconds since the Unix epoch.
    #[serde(rename = "exp")]
    pub expires_at: i64,
    /// Issuer.
    #[serde(rename = "iss")]
    pub issuer: String,
    /// Audience.
    #[serde(rename = "aud")]
    pub audience: String,
}

impl TokenPayload {
    /// The identity carried by this payload, without the envelope fields.
    pub fn auth_context(&self) -> AuthContext {
        AuthContext {
            subject_id: self.subject_id.clone(),
            email: self.email.clone(),
            display_name: self.display_name.clone(),
            role: self.role.clone(),
            tenant_id: self.tenant_id.clone(),
            token_kind: self.token_kind,
        }
    }
}

impl From<TokenPayload> for AuthContext {
    fn from(payload: TokenPayload) -> Self {
        Self {
            subject_id: payload.subject_id,
            email: payload.email,
            display_name: payload.display_name,
            role: payload.role,
            tenant_id: payload.tenant_id,
            token_kind: payload.token_kind,
        }
    }
}
