//! # Audit Entries
//!
//! Write-once record of a successful mutation. The pipeline produces these;
//! the persistence layer owns them. Nothing in Ledgerline reads them back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What kind of change an audit entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    /// POST.
    Create,
    /// PUT or PATCH.
    Update,
    /// DELETE.
    Delete,
}

impl AuditAction {
    /// Map an HTTP method name to an action. Non-mutating methods map to `None`.
    pub fn from_method(method: &str) -> Option<Self> {
        match method {
            "POST" => Some(Self::Create),
            "PUT" | "PATCH" => Some(Self::Update),
            "DELETE" => Some(Self::Delete),
            _ => None,
        }
    }

    /// Return the string representation of this action.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// An append-only audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    /// Tenant the change belongs to.
    pub tenant_id: String,
    /// Subject that performed the change.
    pub actor_id: String,
    /// Create, update, or delete.
    pub action: AuditAction,
    /// Kind of entity changed (e.g. `invoice`).
    pub entity_type: String,
    /// Identifier of the changed entity, or `"unknown"`.
    pub entity_id: String,
    /// Client address the request came from.
    pub ip_address: String,
    /// Free-form context (method, path).
    pub details: serde_json::Value,
    /// When the change was recorded.
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mutating_methods_map_to_actions() {
        assert_eq!(AuditAction::from_method("POST"), Some(AuditAction::Create));
        assert_eq!(AuditAction::from_method("PUT"), Some(AuditAction::Update));
        assert_eq!(AuditAction::from_method("PATCH"), Some(AuditAction::Update));
        assert_eq!(AuditAction::from_method("DELETE"), Some(AuditAction::Delete));
    }

    #[test]
    fn safe_methods_are_not_audited() {
        for method in ["GET", "HEAD", "OPTIONS", "TRACE"] {
            assert_eq!(AuditAction::from_method(method), None);
        }
    }

    #[test]
    fn action_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&AuditAction::Update).unwrap(),
            "\"update\""
        );
    }
}
