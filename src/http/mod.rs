//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, static mount)
//!     → request.rs (assign / propagate x-request-id)
//!     → handlers.rs
//!         GET  /handshake → channel handshake snapshot
//!         POST /message   → channel accept → wait for correlated message
//!     → JSON response to client
//! ```

pub mod handlers;
pub mod request;
pub mod server;

pub use request::{request_id, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
