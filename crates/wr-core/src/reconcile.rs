//! Optimistic reconciliation of local schedule edits against server snapshots.
//!
//! Local edits are applied immediately and remembered as pending mutations,
//! one per task. A pending mutation keeps winning over incoming snapshots
//! until a snapshot arrives whose `startAt`/`endAt` match it, which is the
//! only confirmation signal. This keeps a slow background refetch that
//! predates the edit from reverting the block on screen.

use std::collections::HashMap;

use crate::task::{SchedulePatch, Task};
use crate::types::TaskId;

/// What applying a snapshot did to pending mutations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotOutcome {
    /// Pending mutations the snapshot confirmed and cleared.
    pub confirmed: Vec<TaskId>,
    /// Pending mutations still shown in place of the snapshot's values.
    pub held: Vec<TaskId>,
}

/// Local task list with at most one pending mutation per task.
#[derive(Debug, Clone, Default)]
pub struct ReconcileStore {
    /// What the grid renders: the last snapshot overlaid with pending edits.
    local: Vec<Task>,
    /// Tasks as last reported by the server, for explicit rollback.
    confirmed: HashMap<TaskId, Task>,
    /// Lives as long as the store. An entry for a task the server deleted is
    /// only removed by [`ReconcileStore::revert`].
    pending: HashMap<TaskId, Task>,
}

impl ReconcileStore {
    /// Seeds the store from the last known server list.
    pub fn new(server_tasks: Vec<Task>) -> Self {
        let mut store = Self::default();
        store.apply_server_snapshot(server_tasks);
        store
    }

    /// Tasks as they should currently be displayed.
    pub fn local_items(&self) -> &[Task] {
        &self.local
    }

    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.local.iter().find(|task| &task.id == id)
    }

    pub fn is_pending(&self, id: &TaskId) -> bool {
        self.pending.contains_key(id)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Replaces the local list with a server snapshot.
    ///
    /// For each incoming task with a pending mutation: if the snapshot's
    /// schedule matches the pending one, the mutation is cleared and the
    /// server version adopted; otherwise the pending version stays. Tasks
    /// without a pending mutation always take the server version.
    ///
    /// A pending mutation whose task is missing from the snapshot is kept
    /// (but not displayed) until the task reappears.
    pub fn apply_server_snapshot(&mut self, server_tasks: Vec<Task>) -> SnapshotOutcome {
        let mut outcome = SnapshotOutcome::default();

        self.confirmed = server_tasks
            .iter()
            .map(|task| (task.id.clone(), task.clone()))
            .collect();

        self.local = server_tasks
            .into_iter()
            .map(|incoming| {
                let Some(pending) = self.pending.get(&incoming.id) else {
                    return incoming;
                };
                if pending.schedule().matches(&incoming.schedule()) {
                    self.pending.remove(&incoming.id);
                    outcome.confirmed.push(incoming.id.clone());
                    incoming
                } else {
                    tracing::trace!(task = %incoming.id, "snapshot predates pending edit");
                    outcome.held.push(incoming.id.clone());
                    pending.clone()
                }
            })
            .collect();

        if !outcome.confirmed.is_empty() || !outcome.held.is_empty() {
            tracing::debug!(
                confirmed = outcome.confirmed.len(),
                held = outcome.held.len(),
                "applied server snapshot"
            );
        }
        outcome
    }

    /// Applies a schedule edit locally and records it as pending.
    ///
    /// The edit is merged into the locally known version of `subject.id`, or
    /// into `subject` itself when the id is not known yet (a task entering the
    /// grid from elsewhere). Any earlier pending edit for the same task is
    /// replaced. Returns the task as now displayed.
    pub fn propose_mutation(&mut self, subject: &Task, patch: SchedulePatch) -> Task {
        let updated = self.get(&subject.id).unwrap_or(subject).with_schedule(patch);

        self.pending.insert(updated.id.clone(), updated.clone());
        match self.local.iter_mut().find(|task| task.id == updated.id) {
            Some(slot) => *slot = updated.clone(),
            None => self.local.push(updated.clone()),
        }

        tracing::debug!(
            task = %updated.id,
            start = ?patch.start_at,
            end = ?patch.end_at,
            "proposed schedule mutation"
        );
        updated
    }

    /// Drops the pending mutation for `id` after its write failed.
    ///
    /// The last server-confirmed version is restored; a task the server has
    /// never reported is removed from the local list. Returns false if there
    /// was nothing pending.
    pub fn revert(&mut self, id: &TaskId) -> bool {
        if self.pending.remove(id).is_none() {
            return false;
        }

        match self.confirmed.get(id) {
            Some(server) => {
                if let Some(slot) = self.local.iter_mut().find(|task| &task.id == id) {
                    *slot = server.clone();
                }
            }
            None => self.local.retain(|task| &task.id != id),
        }
        tracing::debug!(task = %id, "reverted pending schedule mutation");
        true
    }
}
