//! Bus message protocol.
//!
//! # Data Flow
//! ```text
//! POST /message body (JSON)
//!     → message.rs (Message with `type`, `id`, opaque fields)
//!     → forwarded to the bus untouched
//!
//! Bus output (Message)
//!     → channel router (dispatch on MessageKind)
//!     → serialized back to JSON for the HTTP response or handshake log
//! ```
//!
//! # Design Decisions
//! - Only `type` and `id` are interpreted; every other key is carried verbatim
//! - Unknown discriminants survive deserialization so the router can reject them
//! - Shape validation of payloads belongs to the bus, not the transport

pub mod message;

pub use message::{Message, MessageKind, RequestId};
