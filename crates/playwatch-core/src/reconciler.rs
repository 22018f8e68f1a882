//! Execution state reconciler.
//!
//! Folds the stream of `execution_update` snapshots into one canonical record
//! per run. Snapshots replace each other whole; nothing is merged field by
//! field. Because the realtime channel does not guarantee ordering, an update
//! is accepted only if it is self-consistent and does not move the run
//! backwards:
//!
//! 1. a snapshot whose step index exceeds its step count, or that reports a
//!    terminal status without `completed_at`, is rejected outright;
//! 2. once the stored snapshot is terminal, every later update is rejected,
//!    even one carrying a different terminal status;
//! 3. a non-terminal update with a lower step index than the stored one is
//!    rejected as stale;
//! 4. anything else replaces the stored snapshot. An equal step index is
//!    accepted since status and step results may have advanced.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::debug;

use playwatch_connection::{HandlerRegistry, Subscription};
use playwatch_protocols::{ExecutionId, ExecutionSnapshot};

#[cfg(test)]
#[path = "reconciler_tests.rs"]
mod tests;

/// Result of [`ExecutionStore::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// First snapshot seen for this run.
    Created,
    /// The stored snapshot was replaced.
    Replaced,
    /// The update was stale and ignored.
    Rejected(RejectReason),
}

impl ApplyOutcome {
    pub fn is_accepted(&self) -> bool {
        !matches!(self, ApplyOutcome::Rejected(_))
    }
}

/// Why an update was ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The run already reached a terminal status.
    TerminalSticky,
    /// The update would move the step index backwards.
    Regression,
    /// The snapshot contradicts itself.
    Inconsistent,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::TerminalSticky => write!(f, "run already terminal"),
            RejectReason::Regression => write!(f, "step index regression"),
            RejectReason::Inconsistent => write!(f, "inconsistent snapshot"),
        }
    }
}

/// Counters kept by the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilerStats {
    pub created: u64,
    pub replaced: u64,
    pub rejected_terminal: u64,
    pub rejected_regression: u64,
    pub rejected_inconsistent: u64,
}

type SnapshotHandlers = HandlerRegistry<Arc<ExecutionSnapshot>>;

/// Canonical per-run execution state.
///
/// `apply` holds the run's entry lock for the whole decide-and-store step,
/// so two updates for the same run never interleave their decisions.
/// Subscribers are notified after the lock is released; handlers of two
/// racing applies for one run may observe them in either order, and should
/// call [`ExecutionStore::get`] when they need the stored record. Different
/// runs are reconciled independently.
#[derive(Default)]
pub struct ExecutionStore {
    records: DashMap<ExecutionId, Arc<ExecutionSnapshot>>,
    watchers: DashMap<ExecutionId, SnapshotHandlers>,
    created: AtomicU64,
    replaced: AtomicU64,
    rejected_terminal: AtomicU64,
    rejected_regression: AtomicU64,
    rejected_inconsistent: AtomicU64,
}

impl ExecutionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ingest one snapshot.
    pub fn apply(&self, snapshot: ExecutionSnapshot) -> ApplyOutcome {
        let execution_id = snapshot.execution_id.clone();
        let snapshot = Arc::new(snapshot);

        let outcome = if let Some(reason) = check_consistency(&snapshot) {
            ApplyOutcome::Rejected(reason)
        } else {
            self.store(&execution_id, &snapshot)
        };

        match outcome {
            ApplyOutcome::Created => {
                self.created.fetch_add(1, Ordering::Relaxed);
            }
            ApplyOutcome::Replaced => {
                self.replaced.fetch_add(1, Ordering::Relaxed);
            }
            ApplyOutcome::Rejected(reason) => {
                match reason {
                    RejectReason::TerminalSticky => &self.rejected_terminal,
                    RejectReason::Regression => &self.rejected_regression,
                    RejectReason::Inconsistent => &self.rejected_inconsistent,
                }
                .fetch_add(1, Ordering::Relaxed);
                debug!(
                    "Ignoring update for {} (status {}, step {}/{}): {}",
                    execution_id,
                    snapshot.status,
                    snapshot.current_step_index,
                    snapshot.total_steps,
                    reason
                );
                return outcome;
            }
        }

        debug!(
            "Execution {} now {} at step {}/{}",
            execution_id, snapshot.status, snapshot.current_step_index, snapshot.total_steps
        );

        let handlers = self.watchers.get(&execution_id).map(|h| h.clone());
        if let Some(handlers) = handlers {
            handlers.notify(&snapshot);
        }

        outcome
    }

    fn store(&self, execution_id: &str, snapshot: &Arc<ExecutionSnapshot>) -> ApplyOutcome {
        match self.records.entry(execution_id.to_string()) {
            Entry::Vacant(entry) => {
                entry.insert(snapshot.clone());
                ApplyOutcome::Created
            }
            Entry::Occupied(mut entry) => match check_update(entry.get(), snapshot) {
                Some(reason) => ApplyOutcome::Rejected(reason),
                None => {
                    entry.insert(snapshot.clone());
                    ApplyOutcome::Replaced
                }
            },
        }
    }

    /// Current snapshot of a run.
    pub fn get(&self, execution_id: &str) -> Option<Arc<ExecutionSnapshot>> {
        self.records.get(execution_id).map(|r| r.clone())
    }

    /// Be notified of every accepted snapshot for a run.
    pub fn subscribe<F>(&self, execution_id: impl Into<String>, handler: F) -> Subscription
    where
        F: Fn(&Arc<ExecutionSnapshot>) + Send + Sync + 'static,
    {
        self.watchers
            .entry(execution_id.into())
            .or_default()
            .register(handler)
    }

    /// Forget a run and drop its subscribers.
    pub fn discard(&self, execution_id: &str) -> Option<Arc<ExecutionSnapshot>> {
        if let Some((_, handlers)) = self.watchers.remove(execution_id) {
            handlers.clear();
        }
        self.records.remove(execution_id).map(|(_, snapshot)| snapshot)
    }

    /// Ids of all tracked runs, sorted.
    pub fn execution_ids(&self) -> Vec<ExecutionId> {
        let mut ids: Vec<ExecutionId> = self.records.iter().map(|r| r.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn stats(&self) -> ReconcilerStats {
        ReconcilerStats {
            created: self.created.load(Ordering::Relaxed),
            replaced: self.replaced.load(Ordering::Relaxed),
            rejected_terminal: self.rejected_terminal.load(Ordering::Relaxed),
            rejected_regression: self.rejected_regression.load(Ordering::Relaxed),
            rejected_inconsistent: self.rejected_inconsistent.load(Ordering::Relaxed),
        }
    }
}

fn check_update(stored: &ExecutionSnapshot, incoming: &ExecutionSnapshot) -> Option<RejectReason> {
    if stored.is_terminal() {
        return Some(RejectReason::TerminalSticky);
    }
    if !incoming.is_terminal() && incoming.current_step_index < stored.current_step_index {
        return Some(RejectReason::Regression);
    }
    None
}

fn check_consistency(snapshot: &ExecutionSnapshot) -> Option<RejectReason> {
    if snapshot.current_step_index > snapshot.total_steps {
        return Some(RejectReason::Inconsistent);
    }
    if snapshot.is_terminal() && snapshot.completed_at.is_none() {
        return Some(RejectReason::Inconsistent);
    }
    None
}
