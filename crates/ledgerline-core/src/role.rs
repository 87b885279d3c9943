//! # Role Hierarchy
//!
//! A total order over role names. Privilege strictly decreases down the
//! table:
//!
//! ```text
//! admin (5) > approver (4) > clerk (3) > viewer (2) > external_party (1)
//! ```
//!
//! Role names arrive as strings inside signed tokens, so the ranking works on
//! names. Anything not in [`ROLE_RANKS`] ranks `0` and can never satisfy a
//! requirement above the lowest role.

use serde::{Deserialize, Serialize};

/// Role-rank table. The single source of truth for authorization ordering.
pub const ROLE_RANKS: [(&str, u8); 5] = [
    ("admin", 5),
    ("approver", 4),
    ("clerk", 3),
    ("viewer", 2),
    ("external_party", 1),
];

/// Rank of a role name. Unknown names rank `0`.
pub fn role_rank(name: &str) -> u8 {
    ROLE_RANKS
        .iter()
        .find(|(role, _)| *role == name)
        .map(|(_, rank)| *rank)
        .unwrap_or(0)
}

/// Whether `actual` is at least as privileged as `required`.
pub fn meets_minimum(actual: &str, required: &str) -> bool {
    role_rank(actual) >= role_rank(required)
}

/// Roles known to Ledgerline.
///
/// Deliberately does not derive `Ord`: privilege comparisons go through
/// [`meets_minimum`] so there is exactly one ordering in the codebase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Full access, including tenant administration.
    Admin,
    /// Approves payments and postings raised by clerks.
    Approver,
    /// Raises and edits finance documents.
    Clerk,
    /// Read-only access to the tenant's books.
    Viewer,
    /// Counterparty using the portal (vendor, customer).
    ExternalParty,
}

impl Role {
    /// Every role, most privileged first.
    pub const ALL: [Role; 5] = [
        Role::Admin,
        Role::Approver,
        Role::Clerk,
        Role::Viewer,
        Role::ExternalParty,
    ];

    /// Return the string representation of this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Approver => "approver",
            Self::Clerk => "clerk",
            Self::Viewer => "viewer",
            Self::ExternalParty => "external_party",
        }
    }

    /// Parse a role name. Returns `None` for names outside the table.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.as_str() == name)
    }

    /// This role's rank in [`ROLE_RANKS`].
    pub fn rank(&self) -> u8 {
        role_rank(self.as_str())
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
