//! # ledgerline-api: Binary Entry Point
//!
//! Starts the Axum HTTP server. Configuration comes from the environment
//! (see [`ledgerline_api::config`]); `RUST_LOG` controls log filtering and
//! `LOG_FORMAT=json` switches to JSON log lines.

use std::net::SocketAddr;
use std::sync::Arc;

use ledgerline_api::audit::{AuditRecorder, AuditSink, MemoryAuditSink};
use ledgerline_api::config::AppConfig;
use ledgerline_api::db::audit::PgAuditSink;
use ledgerline_api::users::{MemoryUserDirectory, UserDirectory};
use ledgerline_api::Services;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = AppConfig::from_env().map_err(|e| {
        tracing::error!("configuration error: {e}");
        e
    })?;
    tracing::info!(?config, "configuration loaded");

    if config.signing_secret.is_insecure_default() {
        tracing::warn!("SESSION_SECRET not set, using the development secret");
    }

    // Optional database pool; without one audit entries stay in memory.
    let pool = ledgerline_api::db::init_pool(config.database_url.as_deref())
        .await
        .map_err(|e| {
            tracing::error!("database initialization failed: {e}");
            e
        })?;
    let sink: Arc<dyn AuditSink> = match pool {
        Some(pool) => Arc::new(PgAuditSink::new(pool)),
        None => Arc::new(MemoryAuditSink::new()),
    };
    let (audit, audit_worker) = AuditRecorder::spawn(sink, config.audit_queue_capacity);

    let users: Arc<dyn UserDirectory> = match &config.users_file {
        Some(path) => {
            let directory = MemoryUserDirectory::load(path).map_err(|e| {
                tracing::error!("failed to load users: {e}");
                e
            })?;
            tracing::info!(accounts = directory.len(), "user directory loaded");
            Arc::new(directory)
        }
        None => {
            tracing::warn!("USERS_FILE not set, sign-in is disabled");
            Arc::new(MemoryUserDirectory::empty())
        }
    };

    let port = config.port;
    let sweep_interval = config.sweep_interval;
    let longest_window = config.rate_limits.longest_window();
    let services = Services::new(config, audit, users);
    let sweeper = services.limiter.spawn_sweeper(sweep_interval, longest_window);

    let app = ledgerline_api::app(services)?;

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Ledgerline API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    // The router (and with it every recorder clone) is gone; let the worker
    // flush what is already queued.
    sweeper.abort();
    if let Err(e) = audit_worker.await {
        tracing::warn!("audit worker ended abnormally: {e}");
    }

    Ok(())
}
