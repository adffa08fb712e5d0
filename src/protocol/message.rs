//! Message types exchanged between the HTTP surface and the bus.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Opaque correlation token chosen by the caller.
///
/// Unique among concurrently pending requests; carries no other meaning.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for RequestId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// The `type` discriminant of a message.
///
/// Any JSON value is accepted so that inbound messages are forwarded as
/// sent; routing decides later whether the kind is usable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum MessageKind {
    /// Peer asks the bus to run a handler.
    Request,
    /// Successful handler result, correlated by `id`.
    Response,
    /// Failed handler result, correlated by `id`.
    Error,
    /// Capability announcement, replayed on handshake.
    HandlerRegistered,
    /// Any other string. An empty string means the `type` key was absent.
    Other(String),
    /// A `type` that is not a string at all, kept verbatim.
    Malformed(Value),
}

impl MessageKind {
    pub fn as_str(&self) -> &str {
        match self {
            MessageKind::Request => "request",
            MessageKind::Response => "response",
            MessageKind::Error => "error",
            MessageKind::HandlerRegistered => "handler_registered",
            MessageKind::Other(other) => other,
            MessageKind::Malformed(_) => "malformed",
        }
    }

    fn is_unset(&self) -> bool {
        matches!(self, MessageKind::Other(s) if s.is_empty())
    }
}

impl Default for MessageKind {
    fn default() -> Self {
        MessageKind::Other(String::new())
    }
}

impl From<String> for MessageKind {
    fn from(kind: String) -> Self {
        match kind.as_str() {
            "request" => MessageKind::Request,
            "response" => MessageKind::Response,
            "error" => MessageKind::Error,
            "handler_registered" => MessageKind::HandlerRegistered,
            _ => MessageKind::Other(kind),
        }
    }
}

impl From<Value> for MessageKind {
    fn from(kind: Value) -> Self {
        match kind {
            Value::String(kind) => kind.into(),
            other => MessageKind::Malformed(other),
        }
    }
}

impl From<MessageKind> for Value {
    fn from(kind: MessageKind) -> Self {
        match kind {
            MessageKind::Other(other) => Value::String(other),
            MessageKind::Malformed(raw) => raw,
            known => Value::String(known.as_str().to_string()),
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bus message as it travels over HTTP.
///
/// Serialized as one flat JSON object. `type` and `id` are lifted into typed
/// fields; all remaining keys (`payload`, `name`, `message`, ...) stay in
/// `fields` exactly as the peer sent them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "type", default, skip_serializing_if = "MessageKind::is_unset")]
    pub kind: MessageKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,

    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Message {
    /// Create an empty message of the given kind.
    pub fn new(kind: MessageKind) -> Self {
        Self {
            kind,
            id: None,
            fields: Map::new(),
        }
    }

    /// Request for the handler `name`.
    pub fn request(id: impl Into<RequestId>, name: &str, payload: Value) -> Self {
        Self::new(MessageKind::Request)
            .with_id(id)
            .with_field("name", Value::String(name.to_string()))
            .with_field("payload", payload)
    }

    pub fn response(id: impl Into<RequestId>, payload: Value) -> Self {
        Self::new(MessageKind::Response)
            .with_id(id)
            .with_field("payload", payload)
    }

    pub fn error(id: impl Into<RequestId>, message: impl Into<String>) -> Self {
        Self::new(MessageKind::Error)
            .with_id(id)
            .with_field("message", Value::String(message.into()))
    }

    /// Capability announcement for the handler `name`.
    pub fn handler_registered(name: &str) -> Self {
        Self::new(MessageKind::HandlerRegistered).with_field("name", Value::String(name.to_string()))
    }

    pub fn with_id(mut self, id: impl Into<RequestId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_field(mut self, key: &str, value: Value) -> Self {
        self.fields.insert(key.to_string(), value);
        self
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn payload(&self) -> Option<&Value> {
        self.field("payload")
    }

    /// Handler name, for requests and announcements.
    pub fn name(&self) -> Option<&str> {
        self.field("name").and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_request_keeps_unknown_fields() {
        let msg: Message = serde_json::from_value(json!({
            "id": "1",
            "type": "request",
            "payload": {"op": "ping"},
            "slotName": "ping"
        }))
        .unwrap();

        assert_eq!(msg.kind, MessageKind::Request);
        assert_eq!(msg.id, Some(RequestId::from("1")));
        assert_eq!(msg.payload(), Some(&json!({"op": "ping"})));
        assert_eq!(msg.field("slotName"), Some(&json!("ping")));
    }

    #[test]
    fn test_response_serializes_flat() {
        let msg = Message::response("1", json!("pong"));
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value, json!({"id": "1", "type": "response", "payload": "pong"}));
    }

    #[test]
    fn test_unknown_kind_survives() {
        let msg: Message = serde_json::from_value(json!({"type": "subscribe", "id": "x"})).unwrap();
        assert_eq!(msg.kind, MessageKind::Other("subscribe".into()));

        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "subscribe");
    }

    #[test]
    fn test_non_string_kind_is_kept_verbatim() {
        let msg: Message = serde_json::from_value(json!({"id": "1", "type": 5})).unwrap();
        assert_eq!(msg.kind, MessageKind::Malformed(json!(5)));
        assert_eq!(msg.id, Some(RequestId::from("1")));
        assert_eq!(serde_json::to_value(&msg).unwrap(), json!({"id": "1", "type": 5}));

        let msg: Message = serde_json::from_value(json!({"id": "2", "type": null})).unwrap();
        assert_eq!(serde_json::to_value(&msg).unwrap(), json!({"id": "2", "type": null}));
    }

    #[test]
    fn test_missing_kind_is_not_reserialized() {
        let msg: Message = serde_json::from_value(json!({"id": "7", "payload": 1})).unwrap();
        assert_eq!(msg.kind, MessageKind::default());

        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value, json!({"id": "7", "payload": 1}));
    }

    #[test]
    fn test_handler_registered_has_no_id() {
        let value = serde_json::to_value(Message::handler_registered("ping")).unwrap();
        assert_eq!(value, json!({"type": "handler_registered", "name": "ping"}));
    }
}
