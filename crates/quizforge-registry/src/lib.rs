//! Connection registry for Quizforge.
//!
//! Tracks every live transport connection, which session (join code) it
//! belongs to, and which player it represents, and delivers outbound
//! envelopes either to one connection or to everyone under a join code.
//!
//! # How it fits in the stack
//!
//! ```text
//! Router (above)  ← resolves callers, fans out results
//!     ↕
//! Registry (this crate)  ← connection → (join code, player), outbound channels
//!     ↕
//! Connection writer tasks (below)  ← drain each channel onto the socket
//! ```

mod connection;
mod error;
mod registry;

pub use connection::{Association, ConnectionReceiver, ConnectionSender, Outbound};
pub use error::RegistryError;
pub use registry::ConnectionRegistry;
