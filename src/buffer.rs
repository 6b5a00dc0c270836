//! In-memory batch of normalized events awaiting transmission.

use crate::event::NormalizedEvent;
use parking_lot::Mutex;

/// Ordered, append-only buffer drained as a whole on flush.
///
/// Insertion order is arrival order. [`BatchBuffer::drain`] swaps the
/// contents out under the same lock `append` takes, so a flush never sees a
/// partially drained batch and never loses an event appended concurrently.
/// There is no capacity bound.
#[derive(Debug, Default)]
pub struct BatchBuffer {
    events: Mutex<Vec<NormalizedEvent>>,
}

impl BatchBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event at the tail.
    pub fn append(&self, event: NormalizedEvent) {
        self.events.lock().push(event);
    }

    /// Take every buffered event, leaving the buffer empty.
    pub fn drain(&self) -> Vec<NormalizedEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}
