//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Build channel + bus → Bind listener → Serve
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Fail pending requests → Drain → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Pending requests are failed on shutdown; otherwise graceful drain would
//!   wait on responses the bus will never send

pub mod shutdown;
pub mod signals;

pub use shutdown::{Shutdown, ShutdownSignal};
