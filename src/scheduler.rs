use std::collections::HashMap;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::debug;

use crate::app::AppEvent;

/// Delayed post-action refreshes, keyed by the action that requested them.
///
/// Scheduling a refresh cancels any refresh still waiting, so a burst of
/// actions collapses into a single listing once the last delay elapses.
pub struct RefreshScheduler {
    delay: Duration,
    tx: mpsc::UnboundedSender<AppEvent>,
    pending: HashMap<u64, JoinHandle<()>>,
}

impl RefreshScheduler {
    pub fn new(delay: Duration, tx: mpsc::UnboundedSender<AppEvent>) -> Self {
        Self {
            delay,
            tx,
            pending: HashMap::new(),
        }
    }

    pub fn schedule(&mut self, action_id: u64) {
        for (superseded, task) in self.pending.drain() {
            debug!("coalescing refresh for action {superseded} into {action_id}");
            task.abort();
        }

        let tx = self.tx.clone();
        let delay = self.delay;
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(AppEvent::RefreshDue { action_id });
        });
        self.pending.insert(action_id, task);
    }

    /// Forgets a refresh whose event has been delivered.
    pub fn fired(&mut self, action_id: u64) {
        self.pending.remove(&action_id);
    }

    pub fn cancel_all(&mut self) {
        for (_, task) in self.pending.drain() {
            task.abort();
        }
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
