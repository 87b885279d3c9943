//! # Audit Recording
//!
//! Successful mutations produce an [`AuditEntry`] that is handed to an
//! [`AuditRecorder`]. The recorder only enqueues; a background worker
//! ([`run_worker`]) drains the bounded queue into an [`AuditSink`].
//!
//! Audit writes never affect the response the caller receives. A full
//! queue drops the entry and a failing sink loses it; both are logged at
//! `warn`.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use ledgerline_core::AuditEntry;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Default number of entries that may wait for the sink.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Failure to persist an audit entry.
#[derive(Error, Debug)]
pub enum AuditError {
    /// The database rejected the write.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The sink is not accepting writes.
    #[error("audit sink unavailable: {0}")]
    Unavailable(String),
}

/// Boxed future returned by [`AuditSink::append`].
pub type AppendFuture<'a> = Pin<Box<dyn Future<Output = Result<(), AuditError>> + Send + 'a>>;

/// Append-only destination for audit entries.
pub trait AuditSink: Send + Sync + 'static {
    /// Persist one entry.
    fn append<'a>(&'a self, entry: &'a AuditEntry) -> AppendFuture<'a>;
}

// ── In-memory sink ──────────────────────────────────────────────────────────

/// Sink that keeps entries in memory. Used when no database is configured
/// and in tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryAuditSink {
    entries: Arc<Mutex<Vec<AuditEntry>>>,
}

impl MemoryAuditSink {
    /// Empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything appended so far.
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().clone()
    }

    /// Number of entries appended so far.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether nothing has been appended.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl AuditSink for MemoryAuditSink {
    fn append<'a>(&'a self, entry: &'a AuditEntry) -> AppendFuture<'a> {
        Box::pin(async move {
            self.entries.lock().push(entry.clone());
            Ok(())
        })
    }
}

// ── Recorder ────────────────────────────────────────────────────────────────

/// Producer handle for the audit queue. Cloning shares the queue.
#[derive(Debug, Clone)]
pub struct AuditRecorder {
    tx: mpsc::Sender<AuditEntry>,
}

impl AuditRecorder {
    /// Create a recorder and the receiving end of its queue.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<AuditEntry>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Create a recorder whose queue is drained into `sink` by a spawned
    /// worker. The worker exits once every recorder clone is dropped and the
    /// queue is empty.
    pub fn spawn(sink: Arc<dyn AuditSink>, capacity: usize) -> (Self, JoinHandle<()>) {
        let (recorder, rx) = Self::channel(capacity);
        let worker = tokio::spawn(run_worker(rx, sink));
        (recorder, worker)
    }

    /// Whether the worker has stopped accepting entries.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Enqueue `entry` without waiting. Returns whether it was accepted.
    pub fn record(&self, entry: AuditEntry) -> bool {
        match self.tx.try_send(entry) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(entry)) => {
                tracing::warn!(
                    tenant = %entry.tenant_id,
                    entity_type = %entry.entity_type,
                    entity_id = %entry.entity_id,
                    "audit queue full, entry dropped"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(entry)) => {
                tracing::warn!(
                    tenant = %entry.tenant_id,
                    entity_type = %entry.entity_type,
                    "audit worker stopped, entry dropped"
                );
                false
            }
        }
    }
}

/// Drain `rx` into `sink` until the queue closes.
pub async fn run_worker(mut rx: mpsc::Receiver<AuditEntry>, sink: Arc<dyn AuditSink>) {
    while let Some(entry) = rx.recv().await {
        if let Err(e) = sink.append(&entry).await {
            tracing::warn!(
                error = %e,
                tenant = %entry.tenant_id,
                actor = %entry.actor_id,
                action = entry.action.as_str(),
                entity_type = %entry.entity_type,
                entity_id = %entry.entity_id,
                "audit write failed"
            );
        }
    }
    tracing::debug!("audit worker stopped");
}
