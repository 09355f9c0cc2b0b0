//! Per-requester job concurrency guard
//!
//! Ensures at most one active job per requester identity. A second request
//! while one is in flight is rejected outright — there is no queueing.
//! Release is tied to a RAII slot so that a panic or early return anywhere
//! in the job still frees the requester.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Tracks which requesters currently have a job in flight
#[derive(Clone, Default)]
pub struct ActiveJobs {
    inner: Arc<Mutex<HashSet<String>>>,
}

/// RAII handle for an acquired job slot; dropping it releases the requester
pub struct JobSlot {
    requester: String,
    inner: Arc<Mutex<HashSet<String>>>,
}

impl ActiveJobs {
    /// Create an empty guard map
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to claim the slot for `requester`.
    ///
    /// Returns `None` if the requester already has a job in flight; the
    /// caller should reject the new request rather than defer it.
    pub fn try_acquire(&self, requester: &str) -> Option<JobSlot> {
        let mut active = self.lock();
        if !active.insert(requester.to_string()) {
            tracing::debug!(requester, "Rejected: job already in flight");
            return None;
        }
        Some(JobSlot {
            requester: requester.to_string(),
            inner: Arc::clone(&self.inner),
        })
    }

    /// True if `requester` currently holds a slot
    pub fn is_active(&self, requester: &str) -> bool {
        self.lock().contains(requester)
    }

    /// Number of requesters with jobs in flight
    pub fn active_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Drop for JobSlot {
    fn drop(&mut self) {
        let mut active = self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        active.remove(&self.requester);
    }
}
