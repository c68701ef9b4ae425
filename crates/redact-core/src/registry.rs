//! Process-wide job tables (§4.F), generalized over anything shaped like a job.
//!
//! Two instantiations exist in this workspace: `JobRegistry<Job>` for export/preview runs, owned
//! by the export orchestrator, and `JobRegistry<TrackingJob>` for tracking runs, owned by the
//! tracker's caller. Neither is a global singleton — each is constructed explicitly and passed
//! down, so tests can spin up a fresh registry per case instead of sharing process state.

use crate::types::{Job, JobStatus, TrackingJob};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

/// Minimal surface every job-like record needs to expose to the registry.
pub trait JobRecord {
    fn id(&self) -> Uuid;
    fn mark_cancelled(&mut self);
    fn is_terminal(&self) -> bool;
    fn is_cancelled(&self) -> bool;
}

impl JobRecord for Job {
    fn id(&self) -> Uuid {
        self.id
    }
    fn mark_cancelled(&mut self) {
        self.cancelled = true;
        if !self.status.is_terminal() {
            self.status = JobStatus::Cancelled;
        }
    }
    fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
    fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}

impl JobRecord for TrackingJob {
    fn id(&self) -> Uuid {
        self.id
    }
    fn mark_cancelled(&mut self) {
        self.cancelled = true;
        if !self.status.is_terminal() {
            self.status = JobStatus::Cancelled;
        }
    }
    fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
    fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}

/// A table of job records guarded by a single mutex, held only for short field updates (§5).
/// Jobs are never removed; `insertion_order` exists purely so callers can list jobs in creation
/// order without relying on `HashMap` iteration order.
pub struct JobRegistry<T: JobRecord> {
    inner: Mutex<Inner<T>>,
}

struct Inner<T> {
    jobs: HashMap<Uuid, T>,
    insertion_order: Vec<Uuid>,
}

impl<T: JobRecord + Clone> JobRegistry<T> {
    pub fn new() -> Self {
        Self { inner: Mutex::new(Inner { jobs: HashMap::new(), insertion_order: Vec::new() }) }
    }

    pub fn create(&self, job: T) -> Uuid {
        let id = job.id();
        let mut guard = self.inner.lock().expect("job registry mutex poisoned");
        guard.jobs.insert(id, job);
        guard.insertion_order.push(id);
        id
    }

    pub fn get(&self, id: Uuid) -> Option<T> {
        self.inner.lock().expect("job registry mutex poisoned").jobs.get(&id).cloned()
    }

    /// Applies `f` to the job record under the lock, held only for the duration of the closure.
    pub fn update(&self, id: Uuid, f: impl FnOnce(&mut T)) {
        let mut guard = self.inner.lock().expect("job registry mutex poisoned");
        if let Some(job) = guard.jobs.get_mut(&id) {
            f(job);
        }
    }

    pub fn mark_cancelled(&self, id: Uuid) {
        self.update(id, |job| job.mark_cancelled());
    }

    /// What a worker polls before dequeuing its next task (§4.D, §5).
    pub fn is_cancelled(&self, id: Uuid) -> bool {
        self.get(id).map(|j| j.is_cancelled()).unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("job registry mutex poisoned").insertion_order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: JobRecord + Clone> Default for JobRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}
