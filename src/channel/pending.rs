//! Pending-request table.
//!
//! Maps a correlation id to the one-shot completion of the HTTP request
//! waiting on it. An entry lives for exactly one request/response cycle: it is
//! removed when the matching bus message resolves it, when its deadline
//! passes, or when the waiting HTTP handler is dropped.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

use crate::channel::error::{ChannelError, ChannelResult};
use crate::observability::metrics;
use crate::protocol::{Message, RequestId};

/// Identifies one registration of an id.
///
/// Ids may be reused once resolved, so cleanup checks the ticket before
/// removing anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

struct PendingEntry {
    ticket: Ticket,
    completion: oneshot::Sender<Message>,
}

/// A thread-safe table of pending completions.
#[derive(Clone, Default)]
pub struct PendingRequests {
    inner: Arc<DashMap<RequestId, PendingEntry>>,
    tickets: Arc<AtomicU64>,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a completion under `id`.
    ///
    /// Fails with [`ChannelError::DuplicateId`] while an earlier request with
    /// the same id is still pending; the earlier completion is left intact.
    pub fn register(&self, id: RequestId) -> ChannelResult<PendingCompletion> {
        let ticket = Ticket(self.tickets.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = oneshot::channel();

        match self.inner.entry(id.clone()) {
            Entry::Occupied(_) => return Err(ChannelError::DuplicateId(id)),
            Entry::Vacant(slot) => {
                slot.insert(PendingEntry {
                    ticket,
                    completion: tx,
                });
            }
        }
        metrics::record_pending(self.inner.len());

        Ok(PendingCompletion {
            id,
            ticket,
            receiver: rx,
            table: self.clone(),
        })
    }

    /// Complete the request pending under `id` with `message`.
    ///
    /// The entry is removed before the completion fires, so it fires at most
    /// once. Unknown ids leave the table untouched.
    pub fn resolve(&self, id: &RequestId, message: Message) -> ChannelResult<()> {
        let (id, entry) = self
            .inner
            .remove(id)
            .ok_or_else(|| ChannelError::UnknownRequest(id.clone()))?;
        metrics::record_pending(self.inner.len());

        if entry.completion.send(message).is_err() {
            // Handler was dropped between removal and send.
            tracing::debug!(request_id = %id, "Requester went away before completion");
        }
        Ok(())
    }

    /// Remove the entry for `id` if it still belongs to `ticket`.
    ///
    /// Returns `true` when an entry was removed.
    pub fn cancel(&self, id: &RequestId, ticket: Ticket) -> bool {
        let removed = self
            .inner
            .remove_if(id, |_, entry| entry.ticket == ticket)
            .is_some();
        if removed {
            metrics::record_pending(self.inner.len());
        }
        removed
    }

    /// Remove every entry, completing each with the message built by `fail`.
    ///
    /// Returns how many requests were failed.
    pub fn drain<F>(&self, fail: F) -> usize
    where
        F: Fn(&RequestId) -> Message,
    {
        let ids: Vec<RequestId> = self.inner.iter().map(|r| r.key().clone()).collect();
        let mut drained = 0;
        for id in ids {
            if let Some((id, entry)) = self.inner.remove(&id) {
                let _ = entry.completion.send(fail(&id));
                drained += 1;
            }
        }
        metrics::record_pending(self.inner.len());
        drained
    }

    pub fn contains(&self, id: &RequestId) -> bool {
        self.inner.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// Receiving half of a pending registration.
///
/// Dropping it withdraws the registration, so a disconnected or timed-out
/// HTTP request never leaves an entry behind.
pub struct PendingCompletion {
    id: RequestId,
    ticket: Ticket,
    receiver: oneshot::Receiver<Message>,
    table: PendingRequests,
}

impl PendingCompletion {
    pub fn id(&self) -> &RequestId {
        &self.id
    }

    pub fn ticket(&self) -> Ticket {
        self.ticket
    }

    /// Wait for the correlated message, for at most `deadline` when given.
    pub async fn wait(&mut self, deadline: Option<Duration>) -> ChannelResult<Message> {
        let received = match deadline {
            Some(after) => match tokio::time::timeout(after, &mut self.receiver).await {
                Ok(received) => received,
                Err(_) => {
                    self.table.cancel(&self.id, self.ticket);
                    return Err(ChannelError::Timeout {
                        id: self.id.clone(),
                        after,
                    });
                }
            },
            None => (&mut self.receiver).await,
        };

        // The sender only disappears without a message if the table was torn down.
        received.map_err(|_| ChannelError::BusUnavailable)
    }
}

impl Drop for PendingCompletion {
    fn drop(&mut self) {
        if self.table.cancel(&self.id, self.ticket) {
            tracing::debug!(request_id = %self.id, "Pending request abandoned");
        }
    }
}
