//! Channel error taxonomy.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use crate::protocol::{Message, MessageKind, RequestId};

/// Errors raised by the channel on either the inbound or the outbound path.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// A `response`/`error` arrived for an id with no pending request.
    #[error("No pending request with id {0}")]
    UnknownRequest(RequestId),

    /// The bus tried to originate a `request` through the server-side channel.
    #[error("Cannot send requests from the HTTP server channel")]
    UnsupportedDirection,

    /// The bus emitted a message the channel cannot route.
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    /// An inbound request reused an id that is still pending.
    #[error("Request id {0} is already pending")]
    DuplicateId(RequestId),

    /// An inbound message carried no `id`.
    #[error("Message has no id")]
    MissingId,

    /// The bus did not answer within the configured deadline.
    #[error("No response for request {id} after {after:?}")]
    Timeout { id: RequestId, after: Duration },

    /// The bus side of the channel has gone away.
    #[error("Bus is not accepting messages")]
    BusUnavailable,
}

/// Result type for channel operations.
pub type ChannelResult<T> = Result<T, ChannelError>;

impl ChannelError {
    /// Short label used for metrics and structured logs.
    pub fn reason(&self) -> &'static str {
        match self {
            ChannelError::UnknownRequest(_) => "unknown_request",
            ChannelError::UnsupportedDirection => "unsupported_direction",
            ChannelError::ProtocolViolation(_) => "protocol_violation",
            ChannelError::DuplicateId(_) => "duplicate_id",
            ChannelError::MissingId => "missing_id",
            ChannelError::Timeout { .. } => "timeout",
            ChannelError::BusUnavailable => "bus_unavailable",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ChannelError::MissingId => StatusCode::BAD_REQUEST,
            ChannelError::DuplicateId(_) => StatusCode::CONFLICT,
            ChannelError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            ChannelError::BusUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn request_id(&self) -> Option<&RequestId> {
        match self {
            ChannelError::UnknownRequest(id)
            | ChannelError::DuplicateId(id)
            | ChannelError::Timeout { id, .. } => Some(id),
            _ => None,
        }
    }
}

impl IntoResponse for ChannelError {
    fn into_response(self) -> Response {
        // Same shape as a bus `error` message so clients parse one format.
        let mut body = Message::new(MessageKind::Error)
            .with_field("message", Value::String(self.to_string()));
        body.id = self.request_id().cloned();

        (self.status(), Json(body)).into_response()
    }
}
