//! Connection lifecycle tracking.
//!
//! # Responsibilities
//! - Generate unique connection IDs for tracing
//! - Count live connections
//! - Let shutdown wait until every connection has drained

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

use crate::observability::metrics;

/// Global atomic counter for connection IDs.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

#[derive(Debug, Default)]
struct TrackerState {
    active: AtomicU64,
    drained: Notify,
}

/// Tracks active connections for graceful shutdown.
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    state: Arc<TrackerState>,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new active connection. Returns a guard that decrements on drop.
    pub fn track(&self) -> ConnectionGuard {
        let count = self.state.active.fetch_add(1, Ordering::SeqCst) + 1;
        metrics::set_active_connections(count as usize);
        ConnectionGuard {
            state: Arc::clone(&self.state),
            id: ConnectionId::new(),
        }
    }

    pub fn active_count(&self) -> u64 {
        self.state.active.load(Ordering::SeqCst)
    }

    /// Resolve once no connection is active.
    pub async fn wait_for_drain(&self) {
        loop {
            let notified = self.state.drained.notified();
            tokio::pin!(notified);
            // register before checking so a concurrent last drop is not missed
            notified.as_mut().enable();
            if self.active_count() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Guard that tracks a connection's lifetime.
#[derive(Debug)]
pub struct ConnectionGuard {
    state: Arc<TrackerState>,
    id: ConnectionId,
}

impl ConnectionGuard {
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        let remaining = self.state.active.fetch_sub(1, Ordering::SeqCst) - 1;
        metrics::set_active_connections(remaining as usize);
        if remaining == 0 {
            self.state.drained.notify_waiters();
        }
        tracing::trace!(connection_id = %self.id, "Connection closed");
    }
}
