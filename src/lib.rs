//! HTTP server channel for a message bus.
//!
//! Lets a bus that expects a push-capable connection run over plain
//! request/response HTTP: `POST /message` is held open until the bus emits the
//! correlated `response`/`error`, and `GET /handshake` replays every
//! `handler_registered` announcement emitted since startup.

pub mod bus;
pub mod channel;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod protocol;

pub use channel::{ChannelError, HttpServerChannel};
pub use config::schema::ServerConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use protocol::{Message, MessageKind, RequestId};
