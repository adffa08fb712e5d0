//! In-process bus with named handlers.
//!
//! Announces every handler on connect and answers each `request` by running
//! the handler named in its `name` field. Replies go back through
//! [`HttpServerChannel::send`]; routing failures there are logged, not fatal.

use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::bus::BusEvent;
use crate::channel::HttpServerChannel;
use crate::protocol::{Message, MessageKind};

type Handler = Arc<dyn Fn(Value) -> Result<Value, String> + Send + Sync>;

#[derive(Clone, Default)]
pub struct LocalBus {
    handlers: Vec<(String, Handler)>,
}

impl LocalBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under `name`, replacing any earlier one.
    pub fn handler<F>(mut self, name: &str, handler: F) -> Self
    where
        F: Fn(Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.handlers.retain(|(existing, _)| existing != name);
        self.handlers.push((name.to_string(), Arc::new(handler)));
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handlers.iter().map(|(name, _)| name.as_str())
    }

    /// Drive the bus from `events` until the link is dropped.
    pub fn spawn(
        self,
        channel: Arc<HttpServerChannel>,
        mut events: mpsc::UnboundedReceiver<BusEvent>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                self.handle(&channel, event);
            }
            tracing::debug!("Bus link closed, local bus stopping");
        })
    }

    /// Process one event synchronously.
    pub fn handle(&self, channel: &HttpServerChannel, event: BusEvent) {
        match event {
            BusEvent::Connected => {
                for name in self.names() {
                    deliver(channel, Message::handler_registered(name));
                }
                tracing::info!(handlers = self.handlers.len(), "Local bus handlers announced");
            }
            BusEvent::MessageReceived(message) => {
                if let Some(reply) = self.dispatch(message) {
                    deliver(channel, reply);
                }
            }
        }
    }

    fn dispatch(&self, message: Message) -> Option<Message> {
        let Some(id) = message.id.clone() else {
            tracing::warn!(kind = %message.kind, "Ignoring message without id");
            return None;
        };

        if message.kind != MessageKind::Request {
            return Some(Message::error(
                id,
                format!("unsupported message type {:?}", message.kind.as_str()),
            ));
        }

        let Some(name) = message.name() else {
            return Some(Message::error(id, "request has no handler name"));
        };

        let Some((_, handler)) = self.handlers.iter().find(|(n, _)| n == name) else {
            return Some(Message::error(id, format!("no handler registered for {name:?}")));
        };

        let payload = message.payload().cloned().unwrap_or(Value::Null);
        Some(match handler(payload) {
            Ok(result) => Message::response(id, result),
            Err(reason) => Message::error(id, reason),
        })
    }
}

fn deliver(channel: &HttpServerChannel, message: Message) {
    if let Err(e) = channel.send(message) {
        // A late or duplicate reply must not take the bus down.
        tracing::warn!(error = %e, reason = e.reason(), "Bus message dropped by channel");
    }
}
