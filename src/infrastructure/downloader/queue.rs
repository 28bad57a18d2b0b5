//! Admission queue for requests held back by the concurrency ceiling.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::domain::entities::ImageRequest;
use crate::domain::ports::RequestHandle;
use crate::infrastructure::config::Prioritization;

/// A prepared transfer waiting for an admission slot.
pub struct QueuedAttempt {
    /// The request awaiting admission.
    pub request: ImageRequest,
    /// Its suspended transfer handle.
    pub handle: Arc<dyn RequestHandle>,
}

/// Deque of held-back transfers with FIFO or LIFO discipline.
///
/// Both disciplines dequeue at the head; FIFO enqueues at the tail, LIFO at
/// the head.
pub struct AdmissionQueue {
    prioritization: Prioritization,
    entries: VecDeque<QueuedAttempt>,
}

impl AdmissionQueue {
    /// Creates an empty queue with the given discipline.
    #[must_use]
    pub fn new(prioritization: Prioritization) -> Self {
        Self {
            prioritization,
            entries: VecDeque::new(),
        }
    }

    /// Enqueues a suspended attempt.
    pub fn push(&mut self, attempt: QueuedAttempt) {
        match self.prioritization {
            Prioritization::Fifo => self.entries.push_back(attempt),
            Prioritization::Lifo => self.entries.push_front(attempt),
        }
    }

    /// Pops the next attempt that can still be started.
    ///
    /// Entries whose transfer has left the startable state (cancelled in
    /// the meantime) are discarded along the way.
    pub fn pop_startable(&mut self) -> Option<QueuedAttempt> {
        while let Some(attempt) = self.entries.pop_front() {
            if attempt.handle.state().is_startable() {
                return Some(attempt);
            }
        }
        None
    }

    /// Number of queued attempts, including not-yet-skipped dead entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
