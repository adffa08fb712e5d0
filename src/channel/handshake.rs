//! Handshake replay log.
//!
//! Every `handler_registered` message the bus emits is kept for the life of
//! the process and handed out in emission order on each handshake read. A
//! client that connects after the announcements still learns every capability.

use std::sync::{Arc, PoisonError, RwLock};

use crate::observability::metrics;
use crate::protocol::Message;

/// Append-only, shareable log of capability announcements.
#[derive(Clone, Default)]
pub struct HandshakeBuffer {
    entries: Arc<RwLock<Vec<Message>>>,
}

impl HandshakeBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an announcement. No deduplication, no bound.
    pub fn append(&self, message: Message) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.push(message);
        metrics::record_handshake_entries(entries.len());
    }

    /// Everything appended so far, oldest first.
    pub fn snapshot(&self) -> Vec<Message> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
