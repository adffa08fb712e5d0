//! Bus collaborator interface.
//!
//! # Data Flow
//! ```text
//! HttpServerChannel::new
//!     → Bus::connected (once)
//!
//! POST /message
//!     → Bus::message_received(request)
//!     → bus dispatches to a handler
//!     → HttpServerChannel::send(response | error)
//!
//! Handler registration on the bus
//!     → HttpServerChannel::send(handler_registered)
//! ```
//!
//! # Design Decisions
//! - The channel never calls into bus internals; it only notifies
//! - A bus usually runs as its own task, fed through a [`BusLink`]
//! - Delivery failures surface as [`BusClosed`] so the HTTP layer can answer 503

pub mod local;

use thiserror::Error;
use tokio::sync::mpsc;

use crate::protocol::Message;

/// The bus no longer accepts messages.
#[derive(Debug, Error)]
#[error("bus endpoint closed")]
pub struct BusClosed;

/// Notifications the channel delivers to the bus.
pub trait Bus: Send + Sync + 'static {
    /// The transport is ready. Called once, when the channel is built.
    fn connected(&self);

    /// A message arrived from an HTTP client.
    fn message_received(&self, message: Message) -> Result<(), BusClosed>;
}

/// Lifecycle and inbound events, as seen by a bus task.
#[derive(Debug, Clone, PartialEq)]
pub enum BusEvent {
    Connected,
    MessageReceived(Message),
}

/// [`Bus`] implementation that forwards events over an unbounded channel.
#[derive(Debug, Clone)]
pub struct BusLink {
    tx: mpsc::UnboundedSender<BusEvent>,
}

/// Create a link and the receiver the bus task reads from.
pub fn link() -> (BusLink, mpsc::UnboundedReceiver<BusEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (BusLink { tx }, rx)
}

impl Bus for BusLink {
    fn connected(&self) {
        if self.tx.send(BusEvent::Connected).is_err() {
            tracing::warn!("Bus receiver dropped before the channel connected");
        }
    }

    fn message_received(&self, message: Message) -> Result<(), BusClosed> {
        self.tx
            .send(BusEvent::MessageReceived(message))
            .map_err(|_| BusClosed)
    }
}
