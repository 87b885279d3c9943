//! PostgreSQL audit sink. Rows are insert-only.

use ledgerline_core::AuditEntry;
use sqlx::PgPool;
use uuid::Uuid;

use crate::audit::{AppendFuture, AuditSink};

/// Appends audit entries to the `audit_log` table.
#[derive(Debug, Clone)]
pub struct PgAuditSink {
    pool: PgPool,
}

impl PgAuditSink {
    /// Write through `pool`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Insert one audit row.
pub async fn insert(pool: &PgPool, entry: &AuditEntry) -> Result<Uuid, sqlx::Error> {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO audit_log (id, tenant_id, actor_id, action, entity_type, entity_id,
         ip_address, details, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(id)
    .bind(&entry.tenant_id)
    .bind(&entry.actor_id)
    .bind(entry.action.as_str())
    .bind(&entry.entity_type)
    .bind(&entry.entity_id)
    .bind(&entry.ip_address)
    .bind(&entry.details)
    .bind(entry.timestamp)
    .execute(pool)
    .await?;
    Ok(id)
}

impl AuditSink for PgAuditSink {
    fn append<'a>(&'a self, entry: &'a AuditEntry) -> AppendFuture<'a> {
        Box::pin(async move {
            insert(&self.pool, entry).await?;
            Ok(())
        })
    }
}
