//! Database sessions.
//!
//! A [`Session`] is a short-lived unit of work. It does not touch the
//! database until [`Session::conn`] is first called, at which point it
//! checks a connection out of the pool and begins a transaction. Nothing is
//! committed implicitly: a session that is closed or dropped with an open
//! transaction rolls it back.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};

/// Session open/close counters shared by an engine and its sessions.
#[derive(Debug, Default)]
pub struct SessionStats {
    opened: AtomicU64,
    closed: AtomicU64,
}

impl SessionStats {
    fn record_open(&self) -> u64 {
        self.opened.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn record_close(&self) {
        self.closed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> SessionStatsSnapshot {
        let closed = self.closed.load(Ordering::Relaxed);
        let opened = self.opened.load(Ordering::Relaxed);
        SessionStatsSnapshot { opened, closed }
    }
}

/// Point-in-time copy of [`SessionStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionStatsSnapshot {
    pub opened: u64,
    pub closed: u64,
}

impl SessionStatsSnapshot {
    /// Sessions opened but not yet closed.
    pub fn active(&self) -> u64 {
        self.opened.saturating_sub(self.closed)
    }
}

/// Unit of work bound to an [`Engine`](super::Engine).
///
/// Released exactly once: either by [`Session::close`] or, on any other
/// exit path including `?` returns and panics, by `Drop`.
pub struct Session {
    id: u64,
    pool: PgPool,
    stats: Arc<SessionStats>,
    tx: Option<Transaction<'static, Postgres>>,
    closed: bool,
}

impl Session {
    pub(crate) fn new(pool: PgPool, stats: Arc<SessionStats>) -> Self {
        let id = stats.record_open();
        tracing::debug!(session_id = id, "Session opened");
        Self {
            id,
            pool,
            stats,
            tx: None,
            closed: false,
        }
    }

    /// Sequence number of this session within its engine, starting at 1.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn in_transaction(&self) -> bool {
        self.tx.is_some()
    }

    /// Connection for the current transaction, beginning one if needed.
    ///
    /// Pool exhaustion and connection failures are returned as-is.
    pub async fn conn(&mut self) -> Result<&mut PgConnection, sqlx::Error> {
        let tx = match self.tx.take() {
            Some(tx) => tx,
            None => {
                let tx = self.pool.begin().await?;
                tracing::trace!(session_id = self.id, "Transaction begun");
                tx
            }
        };
        Ok(&mut **self.tx.insert(tx))
    }

    /// Commit the current transaction. A no-op when none is open.
    pub async fn commit(&mut self) -> Result<(), sqlx::Error> {
        if let Some(tx) = self.tx.take() {
            tx.commit().await?;
            tracing::trace!(session_id = self.id, "Transaction committed");
        }
        Ok(())
    }

    /// Roll back the current transaction. A no-op when none is open.
    pub async fn rollback(&mut self) -> Result<(), sqlx::Error> {
        if let Some(tx) = self.tx.take() {
            tx.rollback().await?;
            tracing::trace!(session_id = self.id, "Transaction rolled back");
        }
        Ok(())
    }

    /// Roll back any open transaction and release the connection.
    ///
    /// The session counts as closed even if the rollback fails; the
    /// connection is then discarded rather than returned to the pool.
    pub async fn close(mut self) -> Result<(), sqlx::Error> {
        let result = match self.tx.take() {
            Some(tx) => tx.rollback().await,
            None => Ok(()),
        };
        self.mark_closed();
        result
    }

    fn mark_closed(&mut self) {
        if !self.closed {
            self.closed = true;
            self.stats.record_close();
            tracing::debug!(session_id = self.id, "Session closed");
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if !self.closed && self.tx.is_some() {
            tracing::debug!(
                session_id = self.id,
                "Session dropped with open transaction, rolling back"
            );
        }
        // The transaction, if any, is dropped after this and sqlx queues its
        // rollback before the connection goes back to the pool.
        self.mark_closed();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("in_transaction", &self.in_transaction())
            .field("closed", &self.closed)
            .finish()
    }
}
