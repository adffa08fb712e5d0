//! HTTP server channel: correlation and handshake replay.
//!
//! # Data Flow
//! ```text
//! Inbound (HTTP → bus):
//!     POST /message
//!     → accept(): pending.rs registers a one-shot completion under `id`
//!     → Bus::message_received
//!     → handler awaits the completion (bounded by pending_timeout)
//!
//! Outbound (bus → HTTP), send():
//!     handler_registered → handshake.rs (append)
//!     response | error   → pending.rs (resolve by id, fires completion)
//!     request            → UnsupportedDirection
//!     anything else      → ProtocolViolation
//!
//! GET /handshake
//!     → handshake.rs snapshot
//! ```
//!
//! # Design Decisions
//! - Responses are matched by id only; completion order is irrelevant
//! - Registration happens before forwarding, so a bus that answers
//!   synchronously still finds the entry
//! - Routing failures are returned to the caller, never panicked on

pub mod error;
pub mod handshake;
pub mod pending;

pub use error::{ChannelError, ChannelResult};
pub use handshake::HandshakeBuffer;
pub use pending::{PendingCompletion, PendingRequests};

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::bus::Bus;
use crate::config::ChannelConfig;
use crate::observability::metrics;
use crate::protocol::{Message, MessageKind};

/// One channel per listener. Owns the pending table and the handshake log.
pub struct HttpServerChannel {
    pending: PendingRequests,
    handshake: HandshakeBuffer,
    bus: Box<dyn Bus>,
    config: ChannelConfig,
    closed: AtomicBool,
}

impl HttpServerChannel {
    /// Build the channel and announce readiness to the bus.
    pub fn new(config: ChannelConfig, bus: impl Bus) -> Self {
        bus.connected();
        tracing::info!(
            pending_timeout_secs = config.pending_timeout_secs,
            "Channel connected to bus"
        );

        Self {
            pending: PendingRequests::new(),
            handshake: HandshakeBuffer::new(),
            bus: Box::new(bus),
            config,
            closed: AtomicBool::new(false),
        }
    }

    /// Route a message emitted by the bus toward HTTP clients.
    pub fn send(&self, message: Message) -> ChannelResult<()> {
        metrics::record_message(message.kind.as_str());

        let result = match message.kind {
            MessageKind::HandlerRegistered => {
                tracing::debug!(name = ?message.name(), "Capability announced");
                self.handshake.append(message);
                Ok(())
            }
            MessageKind::Response | MessageKind::Error => match message.id.clone() {
                Some(id) => {
                    tracing::debug!(request_id = %id, kind = %message.kind, "Resolving pending request");
                    self.pending.resolve(&id, message)
                }
                None => Err(ChannelError::ProtocolViolation(format!(
                    "{} message without id",
                    message.kind
                ))),
            },
            MessageKind::Request => Err(ChannelError::UnsupportedDirection),
            MessageKind::Other(kind) => Err(ChannelError::ProtocolViolation(format!(
                "unrecognized message type {kind:?}"
            ))),
            MessageKind::Malformed(raw) => Err(ChannelError::ProtocolViolation(format!(
                "message type is not a string: {raw}"
            ))),
        };

        if let Err(e) = &result {
            metrics::record_routing_error(e.reason());
        }
        result
    }

    /// Accept a message from an HTTP client and forward it to the bus.
    ///
    /// The returned completion yields the correlated `response`/`error`.
    /// Dropping it withdraws the registration. Fails with
    /// [`ChannelError::BusUnavailable`] once the channel is shut down.
    pub fn accept(&self, message: Message) -> ChannelResult<PendingCompletion> {
        let id = message.id.clone().ok_or(ChannelError::MissingId)?;
        let completion = self.pending.register(id)?;

        // Checked after registering: `shutdown` closes before it drains, so an
        // entry registered after the drain always sees the flag.
        if self.is_closed() {
            return Err(ChannelError::BusUnavailable);
        }

        // On failure `completion` drops here and withdraws itself.
        self.bus
            .message_received(message)
            .map_err(|_| ChannelError::BusUnavailable)?;

        Ok(completion)
    }

    /// Capability announcements emitted so far, in order.
    pub fn handshake(&self) -> Vec<Message> {
        self.handshake.snapshot()
    }

    /// How long an inbound request may wait for the bus. `None` waits forever.
    pub fn pending_timeout(&self) -> Option<Duration> {
        match self.config.pending_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn pending(&self) -> &PendingRequests {
        &self.pending
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Stop accepting requests and fail every pending one so parked HTTP
    /// responses can finish.
    pub fn shutdown(&self) -> usize {
        self.closed.store(true, Ordering::SeqCst);
        let drained = self
            .pending
            .drain(|id| Message::error(id.clone(), "channel shutting down"));
        if drained > 0 {
            tracing::info!(drained, "Failed pending requests on shutdown");
        }
        drained
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{self, BusEvent};
    use crate::protocol::RequestId;
    use serde_json::json;

    fn channel() -> (HttpServerChannel, tokio::sync::mpsc::UnboundedReceiver<BusEvent>) {
        let (link, events) = bus::link();
        (HttpServerChannel::new(ChannelConfig::default(), link), events)
    }

    #[tokio::test]
    async fn test_connected_announced_once() {
        let (_channel, mut events) = channel();
        assert_eq!(events.recv().await, Some(BusEvent::Connected));
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_ping_pong_correlation() {
        let (channel, mut events) = channel();
        let request: Message = serde_json::from_value(json!({
            "id": "1", "type": "request", "payload": {"op": "ping"}
        }))
        .unwrap();

        let mut completion = channel.accept(request.clone()).unwrap();
        assert_eq!(events.recv().await, Some(BusEvent::Connected));
        assert_eq!(events.recv().await, Some(BusEvent::MessageReceived(request)));

        channel.send(Message::response("1", json!("pong"))).unwrap();
        let reply = completion.wait(None).await.unwrap();

        assert_eq!(
            serde_json::to_value(&reply).unwrap(),
            json!({"id": "1", "type": "response", "payload": "pong"})
        );
        assert!(channel.pending().is_empty());
    }

    #[test]
    fn test_unknown_response_is_rejected() {
        let (channel, _events) = channel();
        let err = channel
            .send(Message::error("nope", "boom"))
            .unwrap_err();
        assert!(matches!(err, ChannelError::UnknownRequest(id) if id == RequestId::from("nope")));
        assert!(channel.pending().is_empty());
    }

    #[test]
    fn test_request_direction_unsupported() {
        let (channel, _events) = channel();
        for payload in [json!(null), json!({"a": 1}), json!([1, 2])] {
            let err = channel
                .send(Message::request("x", "ping", payload))
                .unwrap_err();
            assert!(matches!(err, ChannelError::UnsupportedDirection));
        }
    }

    #[test]
    fn test_unknown_kind_is_protocol_violation() {
        let (channel, _events) = channel();
        let err = channel
            .send(Message::new(MessageKind::Other("subscribe".into())))
            .unwrap_err();
        assert!(matches!(err, ChannelError::ProtocolViolation(reason) if reason.contains("\"subscribe\"")));

        let err = channel
            .send(Message::new(MessageKind::Malformed(json!(5))))
            .unwrap_err();
        assert!(matches!(err, ChannelError::ProtocolViolation(_)));
    }

    #[test]
    fn test_reply_without_id_is_protocol_violation() {
        let (channel, _events) = channel();
        let err = channel
            .send(Message::new(MessageKind::Response).with_field("payload", json!(1)))
            .unwrap_err();
        assert_eq!(err.to_string(), "Protocol violation: response message without id");
    }

    #[tokio::test]
    async fn test_accept_after_shutdown_is_refused() {
        let (channel, mut events) = channel();
        assert_eq!(events.recv().await, Some(BusEvent::Connected));

        let mut parked = channel.accept(Message::request("early", "ping", json!(null))).unwrap();
        assert_eq!(channel.shutdown(), 1);
        assert!(channel.is_closed());
        assert_eq!(parked.wait(None).await.unwrap().kind, MessageKind::Error);

        let err = channel
            .accept(Message::request("late", "ping", json!(null)))
            .err()
            .unwrap();
        assert!(matches!(err, ChannelError::BusUnavailable));
        assert!(channel.pending().is_empty());

        // Only the request accepted before shutdown reached the bus.
        assert!(matches!(events.recv().await, Some(BusEvent::MessageReceived(m)) if m.id == Some(RequestId::from("early"))));
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_handshake_replay_in_order() {
        let (channel, _events) = channel();
        assert!(channel.handshake().is_empty());

        channel.send(Message::handler_registered("ping")).unwrap();
        channel.send(Message::handler_registered("ping")).unwrap();

        let replay = channel.handshake();
        assert_eq!(replay.len(), 2);
        assert!(replay.iter().all(|m| m.name() == Some("ping")));
    }

    #[test]
    fn test_accept_requires_id() {
        let (channel, _events) = channel();
        let err = channel
            .accept(Message::new(MessageKind::Request))
            .err()
            .unwrap();
        assert!(matches!(err, ChannelError::MissingId));
    }

    #[test]
    fn test_accept_rolls_back_when_bus_gone() {
        let (channel, events) = channel();
        drop(events);

        let err = channel
            .accept(Message::request("1", "ping", json!(null)))
            .err()
            .unwrap();
        assert!(matches!(err, ChannelError::BusUnavailable));
        assert!(channel.pending().is_empty());
    }

    #[tokio::test]
    async fn test_out_of_order_completion() {
        let (channel, _events) = channel();
        let mut first = channel.accept(Message::request("a", "slow", json!(null))).unwrap();
        let mut second = channel.accept(Message::request("b", "fast", json!(null))).unwrap();

        channel.send(Message::response("b", json!("B"))).unwrap();
        channel.send(Message::response("a", json!("A"))).unwrap();

        assert_eq!(second.wait(None).await.unwrap().payload(), Some(&json!("B")));
        assert_eq!(first.wait(None).await.unwrap().payload(), Some(&json!("A")));
    }

    #[test]
    fn test_pending_timeout_zero_disables() {
        let (link, _events) = bus::link();
        let channel = HttpServerChannel::new(
            ChannelConfig {
                pending_timeout_secs: 0,
                ..ChannelConfig::default()
            },
            link,
        );
        assert_eq!(channel.pending_timeout(), None);
    }
}
