//! Whole-project undo/redo.
//!
//! Every mutation records a deep copy of the project *before* it changes. Undoing an
//! update swaps the in-memory project for the snapshot immediately and writes it to disk
//! on a detached thread; undoing a delete moves the trashed slot back synchronously.
//! A failed step leaves both stacks exactly as they were.

use std::{collections::VecDeque, thread::JoinHandle};

use tracing::{debug, error, info, warn};

use crate::{
    foundation::error::{PortraitError, PortraitResult},
    project::{ProjectId, ProjectSet, StoredProject},
    repository::{ProjectRepository, TrashReceipt},
};

/// Undo steps kept when the configuration does not say otherwise.
pub const DEFAULT_HISTORY_DEPTH: usize = 100;

/// Which kind of step an undo or redo applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HistoryKind {
    /// A project edit.
    Update,
    /// A project deletion.
    Delete,
}

/// One reversible step.
#[derive(Clone, Debug, PartialEq)]
pub enum HistoryEntry {
    /// Project state to return to.
    Update {
        /// The project before the edit.
        snapshot: StoredProject,
    },
    /// The project as it was when deleted, plus where its directory went.
    ///
    /// On the undo stack this means "bring it back"; on the redo stack, "delete it again".
    Delete {
        /// The project as stored when it was deleted.
        snapshot: StoredProject,
        /// Where the slot directory was moved.
        receipt: TrashReceipt,
    },
}

impl HistoryEntry {
    /// Whether this is an edit or a deletion.
    pub fn kind(&self) -> HistoryKind {
        match self {
            HistoryEntry::Update { .. } => HistoryKind::Update,
            HistoryEntry::Delete { .. } => HistoryKind::Delete,
        }
    }

    /// Project the step belongs to.
    pub fn project_id(&self) -> ProjectId {
        match self {
            HistoryEntry::Update { snapshot } | HistoryEntry::Delete { snapshot, .. } => {
                snapshot.id()
            }
        }
    }
}

/// Handle to a background write started by undo/redo.
#[derive(Debug)]
pub struct PersistTicket(JoinHandle<PortraitResult<()>>);

impl PersistTicket {
    /// Whether the write has completed, successfully or not.
    pub fn is_finished(&self) -> bool {
        self.0.is_finished()
    }

    /// Block until the write is done.
    pub fn wait(self) -> PortraitResult<()> {
        self.0
            .join()
            .map_err(|_| PortraitError::Other(anyhow::anyhow!("persistence thread panicked")))?
    }
}

/// What an undo or redo did.
#[derive(Debug)]
pub struct Applied {
    /// Project the step touched.
    pub id: ProjectId,
    /// Kind of step.
    pub kind: HistoryKind,
    /// Whether the project is in the set afterwards (false after re-deleting).
    pub present: bool,
    /// Pending write for update steps.
    pub persist: Option<PersistTicket>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Direction {
    Undo,
    Redo,
}

/// Bounded undo and redo stacks of [`HistoryEntry`] values.
pub struct HistoryManager {
    undo: VecDeque<HistoryEntry>,
    redo: Vec<HistoryEntry>,
    repo: ProjectRepository,
    max_depth: usize,
}

impl HistoryManager {
    /// Manager writing through `repo`, keeping at most `max_depth` undo steps.
    pub fn new(repo: ProjectRepository, max_depth: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            repo,
            max_depth: max_depth.max(1),
        }
    }

    /// Snapshot `project` before it is mutated. Clears the redo stack.
    pub fn record_before_mutation(&mut self, project: &StoredProject) {
        self.push_undo(HistoryEntry::Update {
            snapshot: project.clone(),
        });
        self.redo.clear();
    }

    /// Remember a completed delete so it can be undone.
    pub fn record_delete(&mut self, snapshot: StoredProject, receipt: TrashReceipt) {
        self.push_undo(HistoryEntry::Delete { snapshot, receipt });
        self.redo.clear();
    }

    fn push_undo(&mut self, entry: HistoryEntry) {
        self.undo.push_back(entry);
        while self.undo.len() > self.max_depth {
            if let Some(dropped) = self.undo.pop_front() {
                debug!(id = %dropped.project_id(), "history depth reached, dropping oldest entry");
            }
        }
    }

    /// Whether [`undo`](Self::undo) has anything to do.
    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    /// Whether [`redo`](Self::redo) has anything to do.
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Number of steps that can be undone.
    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    /// Number of steps that can be redone.
    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    /// Forget both stacks.
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }

    /// Revert the latest step. `Ok(None)` when there is nothing to undo.
    ///
    /// Update steps swap the snapshot into `projects` and persist it in the background; delete
    /// steps restore the slot directory synchronously. A failed step stays on the stack.
    pub fn undo(&mut self, projects: &mut ProjectSet) -> PortraitResult<Option<Applied>> {
        let Some(entry) = self.undo.back() else {
            return Ok(None);
        };
        let (inverse, applied) = apply(&self.repo, entry, projects, Direction::Undo)?;
        self.undo.pop_back();
        self.redo.push(inverse);
        info!(id = %applied.id, kind = ?applied.kind, "undo");
        Ok(Some(applied))
    }

    /// Re-apply the latest undone step. `Ok(None)` when there is nothing to redo.
    pub fn redo(&mut self, projects: &mut ProjectSet) -> PortraitResult<Option<Applied>> {
        let Some(entry) = self.redo.last() else {
            return Ok(None);
        };
        let (inverse, applied) = apply(&self.repo, entry, projects, Direction::Redo)?;
        self.redo.pop();
        self.push_undo(inverse);
        info!(id = %applied.id, kind = ?applied.kind, "redo");
        Ok(Some(applied))
    }
}

fn current(projects: &ProjectSet, id: ProjectId) -> PortraitResult<StoredProject> {
    projects
        .get(&id)
        .cloned()
        .ok_or_else(|| PortraitError::stale_undo(format!("project {id} is not loaded")))
}

/// Apply `entry` to `projects` and return the entry that reverses it.
fn apply(
    repo: &ProjectRepository,
    entry: &HistoryEntry,
    projects: &mut ProjectSet,
    direction: Direction,
) -> PortraitResult<(HistoryEntry, Applied)> {
    match (entry, direction) {
        (HistoryEntry::Update { snapshot }, _) => {
            let id = snapshot.id();
            let before = current(projects, id)?;
            projects.insert(id, snapshot.clone());
            let persist = persist_async(repo.clone(), snapshot.clone());
            Ok((
                HistoryEntry::Update { snapshot: before },
                Applied {
                    id,
                    kind: HistoryKind::Update,
                    present: true,
                    persist,
                },
            ))
        }
        (HistoryEntry::Delete { snapshot, receipt }, Direction::Undo) => {
            let id = snapshot.id();
            repo.restore(receipt)?;
            projects.insert(id, snapshot.clone());
            Ok((
                HistoryEntry::Delete {
                    snapshot: snapshot.clone(),
                    receipt: receipt.clone(),
                },
                Applied {
                    id,
                    kind: HistoryKind::Delete,
                    present: true,
                    persist: None,
                },
            ))
        }
        (HistoryEntry::Delete { snapshot, .. }, Direction::Redo) => {
            let id = snapshot.id();
            let before = current(projects, id)?;
            let receipt = repo.delete(&before)?;
            projects.remove(&id);
            Ok((
                HistoryEntry::Delete {
                    snapshot: before,
                    receipt,
                },
                Applied {
                    id,
                    kind: HistoryKind::Delete,
                    present: false,
                    persist: None,
                },
            ))
        }
    }
}

/// Fire-and-forget save; falls back to a synchronous write if no thread can be spawned.
fn persist_async(repo: ProjectRepository, snapshot: StoredProject) -> Option<PersistTicket> {
    let slot = snapshot.slot_name();
    let spawned = std::thread::Builder::new()
        .name(format!("persist-{slot}"))
        .spawn({
            let repo = repo.clone();
            let snapshot = snapshot.clone();
            move || {
                let result = repo.save(&snapshot);
                if let Err(e) = &result {
                    error!(slot = %snapshot.slot_name(), error = %e, "history write failed");
                }
                result
            }
        });
    match spawned {
        Ok(handle) => Some(PersistTicket(handle)),
        Err(e) => {
            warn!(slot = %slot, error = %e, "could not spawn persistence thread, saving inline");
            if let Err(e) = repo.save(&snapshot) {
                error!(slot = %slot, error = %e, "history write failed");
            }
            None
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/history/history.rs"]
mod tests;
