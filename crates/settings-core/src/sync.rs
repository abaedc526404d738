//! Deferred remote sync: pending-write queue and background flush loop.

use std::collections::VecDeque;
use std::time::Duration;

use settings_schema::{SettingKey, SettingValue};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::manager::SettingsManager;

/// Maximum pending entries held for retry. Oldest entries are dropped past
/// this, so a long offline session cannot grow memory without bound.
pub(crate) const MAX_PENDING_SYNC: usize = 64;

/// Delay between flush attempts while the remote store keeps failing.
const RETRY_DELAY: Duration = Duration::from_secs(30);

/// The remote operation a queue entry is waiting to perform.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SyncOp {
    Set(SettingValue),
    Remove,
}

/// One deferred remote write.
#[derive(Debug, Clone)]
pub(crate) struct PendingSync {
    pub key: SettingKey,
    pub op: SyncOp,
    /// Unix timestamp of the last attempt (or enqueue, before any attempt).
    pub attempted_at: i64,
}

/// FIFO retry queue, bounded with a drop-oldest policy. Re-enqueueing a key
/// replaces its older entry: the remote store is last-writer-wins per key,
/// so only the newest op matters.
#[derive(Debug)]
pub(crate) struct SyncQueue {
    entries: VecDeque<PendingSync>,
    cap: usize,
}

impl SyncQueue {
    pub fn new(cap: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            cap,
        }
    }

    pub fn push(&mut self, entry: PendingSync) {
        self.entries.retain(|e| e.key != entry.key);
        if self.entries.len() >= self.cap {
            if let Some(dropped) = self.entries.pop_front() {
                tracing::warn!("Sync queue full; dropping oldest entry for {}", dropped.key);
            }
        }
        self.entries.push_back(entry);
    }

    /// Put a failed entry back at the head so FIFO order is preserved for
    /// the next attempt.
    pub fn requeue_front(&mut self, entry: PendingSync) {
        self.entries.push_front(entry);
    }

    pub fn pop_front(&mut self) -> Option<PendingSync> {
        self.entries.pop_front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn clear(&mut self) -> usize {
        let n = self.entries.len();
        self.entries.clear();
        n
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingSync> {
        self.entries.iter()
    }
}

async fn sleep_or_cancel(token: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        _ = token.cancelled() => true,
        _ = sleep(duration) => false,
    }
}

/// Background flush worker.
///
/// Sleeps until the manager reports pending work, flushes it, and backs off
/// between attempts while the remote store keeps failing. Runs until the
/// shutdown token fires.
pub async fn sync_flush_loop(manager: SettingsManager, shutdown: CancellationToken) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::info!("Settings sync loop stopped (shutdown)");
                return;
            }
            _ = manager.wait_for_sync_work() => {}
        }

        manager.flush_pending().await;

        if manager.pending_count() > 0 {
            // Remote still failing; give it a moment before retrying.
            if sleep_or_cancel(&shutdown, RETRY_DELAY).await {
                tracing::info!("Settings sync loop stopped (shutdown)");
                return;
            }
        }
    }
}
