use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use super::JobName;

/// In-process mutual exclusion per job name.
///
/// Only guards a single server process; running several instances against one
/// database needs an external lock.
#[derive(Clone, Default)]
pub struct JobLocks {
    held: Arc<Mutex<HashSet<JobName>>>,
}

impl JobLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes the lock for `job`, or `None` if a run is already in progress.
    pub fn try_acquire(&self, job: JobName) -> Option<JobGuard> {
        let mut held = self.held.lock().unwrap_or_else(|e| e.into_inner());
        if !held.insert(job) {
            return None;
        }

        Some(JobGuard {
            locks: self.clone(),
            job,
        })
    }

    pub fn is_held(&self, job: JobName) -> bool {
        self.held
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&job)
    }
}

/// Releases the job lock when dropped, whichever way the run ends.
pub struct JobGuard {
    locks: JobLocks,
    job: JobName,
}

impl Drop for JobGuard {
    fn drop(&mut self) {
        self.locks
            .held
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.job);
    }
}
