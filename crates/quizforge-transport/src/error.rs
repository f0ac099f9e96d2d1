use std::net::SocketAddr;

use crate::ConnectionId;

/// Failures below the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("cannot listen on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// The listener itself failed; the server keeps accepting.
    #[error("accept failed: {0}")]
    Accept(#[source] std::io::Error),

    /// A peer connected but never completed the WebSocket upgrade.
    #[error("websocket upgrade from {peer} failed: {reason}")]
    Handshake { peer: SocketAddr, reason: String },

    #[error("{conn_id}: send failed: {reason}")]
    Send { conn_id: ConnectionId, reason: String },

    #[error("{conn_id}: receive failed: {reason}")]
    Receive { conn_id: ConnectionId, reason: String },

    #[error("transport shut down")]
    Shutdown,
}

impl TransportError {
    /// `true` when the failure is confined to a single peer.
    pub fn is_per_peer(&self) -> bool {
        matches!(
            self,
            Self::Handshake { .. } | Self::Send { .. } | Self::Receive { .. }
        )
    }
}
