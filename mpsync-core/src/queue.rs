//! Shared state between the watcher thread and the dispatcher task.

use crate::event::ChangeEvent;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use tokio::time::Instant;

/// Unbounded FIFO of pending change events.
///
/// One producer (intake, on the watcher's thread) appends; one consumer
/// (the dispatcher) pops. Insertion order is arrival order.
#[derive(Debug, Default)]
pub struct ActionQueue {
    inner: Mutex<VecDeque<ChangeEvent>>,
}

impl ActionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic elsewhere must not take intake down with it.
    fn lock(&self) -> MutexGuard<'_, VecDeque<ChangeEvent>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn push(&self, event: ChangeEvent) {
        self.lock().push_back(event);
    }

    pub fn pop_front(&self) -> Option<ChangeEvent> {
        self.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copy of the pending events, oldest first.
    pub fn snapshot(&self) -> Vec<ChangeEvent> {
        self.lock().iter().cloned().collect()
    }
}

/// Time of the most recent enqueue. Written by intake only.
#[derive(Debug, Default)]
pub struct ActivityClock {
    last: Mutex<Option<Instant>>,
}

impl ActivityClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn touch(&self, at: Instant) {
        *self.last.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(at);
    }

    pub fn last(&self) -> Option<Instant> {
        *self.last.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
