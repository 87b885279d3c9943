//! # Database Persistence Layer
//!
//! Ledgerline only writes to the database: audit entries go to the
//! `audit_log` table through [`audit::PgAuditSink`]. Nothing is read back.
//!
//! ## Configuration
//!
//! Set `DATABASE_URL` to a PostgreSQL connection string. When unset the
//! binary falls back to the in-memory audit sink and logs a warning.
//!
//! ## Migrations
//!
//! SQL migrations live in `migrations/` and are embedded and applied at
//! startup via [`sqlx::migrate!`].

pub mod audit;

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Connect to PostgreSQL and run pending migrations.
///
/// Returns `None` when `database_url` is `None`.
pub async fn init_pool(database_url: Option<&str>) -> Result<Option<PgPool>, sqlx::Error> {
    let Some(url) = database_url else {
        tracing::warn!(
            "DATABASE_URL not set, audit entries are kept in memory only \
             and will not survive restarts"
        );
        return Ok(None);
    };

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(5))
        .connect(url)
        .await?;

    tracing::info!("connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("database migrations applied");

    Ok(Some(pool))
}
