//! Route handlers for the channel endpoints.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::time::Instant;

use crate::channel::{ChannelError, ChannelResult, HttpServerChannel};
use crate::http::request::request_id;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::protocol::Message;

/// `GET /handshake`: every capability announced so far, in emission order.
pub async fn handshake(State(state): State<AppState>) -> Json<Vec<Message>> {
    Json(state.channel.handshake())
}

/// `POST /message`: forward to the bus and answer with the correlated message.
pub async fn post_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(message): Json<Message>,
) -> Response {
    let start = Instant::now();
    let request_id = request_id(&headers).to_string();

    tracing::debug!(
        request_id = %request_id,
        id = ?message.id,
        kind = %message.kind,
        "Message received"
    );

    let response = match forward(&state.channel, message).await {
        Ok(reply) => {
            tracing::debug!(request_id = %request_id, id = ?reply.id, kind = %reply.kind, "Message completed");
            (StatusCode::OK, Json(reply)).into_response()
        }
        Err(e) => {
            if matches!(e, ChannelError::Timeout { .. }) {
                metrics::record_timeout();
            }
            tracing::warn!(request_id = %request_id, error = %e, "Message failed");
            e.into_response()
        }
    };

    metrics::record_request(response.status().as_u16(), start);
    response
}

async fn forward(channel: &HttpServerChannel, message: Message) -> ChannelResult<Message> {
    let mut completion = channel.accept(message)?;
    completion.wait(channel.pending_timeout()).await
}
