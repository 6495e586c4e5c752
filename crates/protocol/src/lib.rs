//! Wire protocol for the Courier message socket.
//!
//! Every frame exchanged with the message server is normalized into an
//! [`Envelope`] (`{"type": ..., "data": {...}}`) before it reaches the
//! connection manager's queue or its listeners.

pub mod constants;
pub mod envelope;

pub use constants::{WS_PATH, is_normal_closure};
pub use envelope::Envelope;
