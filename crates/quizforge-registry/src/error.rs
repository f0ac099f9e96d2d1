//! Error types for the registry layer.

use quizforge_transport::ConnectionId;

/// Errors surfaced by [`ConnectionRegistry`](crate::ConnectionRegistry).
///
/// Only targeted operations report these. A broadcast never fails as a
/// whole; its per-recipient failures are logged and skipped.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The connection was never registered, or has already been removed.
    #[error("connection {0} is not registered")]
    UnknownConnection(ConnectionId),

    /// The connection's outbound channel is closed (its writer is gone).
    #[error("delivery to {0} failed: outbound channel closed")]
    DeliveryFailed(ConnectionId),
}
