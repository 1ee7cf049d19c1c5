//! Per-tick coalescing of host updates requested by the UI

use std::collections::BTreeMap;

use ambiance_core::{ContainerId, Result};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UpdateKind {
    /// Container channel count and channel track structure
    Routing,
    /// Channel track volumes only
    ChannelVolumes,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub applied: usize,
    pub failed: usize,
}

/// Updates queued since the last tick, at most one per container and kind.
///
/// A later request replaces an earlier one, so dragging a fader queues a
/// single volume write per tick.
#[derive(Debug, Clone)]
pub struct PendingUpdates<T> {
    queue: BTreeMap<(ContainerId, UpdateKind), T>,
}

impl<T> Default for PendingUpdates<T> {
    fn default() -> Self {
        Self { queue: BTreeMap::new() }
    }
}

impl<T> PendingUpdates<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an update. Returns `true` when it replaced a pending one.
    pub fn queue(&mut self, container: ContainerId, kind: UpdateKind, payload: T) -> bool {
        self.queue.insert((container, kind), payload).is_some()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn contains(&self, container: ContainerId, kind: UpdateKind) -> bool {
        self.queue.contains_key(&(container, kind))
    }

    /// Take every pending update, ordered by container then kind
    pub fn drain(&mut self) -> Vec<(ContainerId, UpdateKind, T)> {
        std::mem::take(&mut self.queue)
            .into_iter()
            .map(|((id, kind), payload)| (id, kind, payload))
            .collect()
    }

    /// Run `apply` on every pending update. Failures are logged and do not
    /// stop the remaining updates.
    pub fn flush<F>(&mut self, mut apply: F) -> FlushReport
    where
        F: FnMut(ContainerId, UpdateKind, T) -> Result<()>,
    {
        let mut report = FlushReport::default();
        for (id, kind, payload) in self.drain() {
            match apply(id, kind, payload) {
                Ok(()) => report.applied += 1,
                Err(err) => {
                    warn!(container = id.0, ?kind, %err, "Pending update failed");
                    report.failed += 1;
                }
            }
        }
        if report.applied + report.failed > 0 {
            debug!(applied = report.applied, failed = report.failed, "Pending updates flushed");
        }
        report
    }
}
