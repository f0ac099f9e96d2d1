//! Socket plumbing for Quizforge.
//!
//! Every participant, host or player, talks to the server over one
//! long-lived bidirectional channel. This crate hides how that channel is
//! opened and framed: everything above it sees a [`ConnectionId`] and
//! opaque frames of bytes.
//!
//! The `websocket` feature (on by default) provides [`WebSocketTransport`].

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketTransport};

use std::fmt;
use std::net::SocketAddr;

/// Identifies one accepted connection for its whole lifetime.
///
/// Ids are handed out by the transport in accept order and never reused
/// within one listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Source of new participant connections.
pub trait Transport: Send + Sync + 'static {
    type Connection: Connection;
    type Error: std::error::Error + Send + Sync;

    /// Waits for the next participant to connect.
    async fn accept(&mut self) -> Result<Self::Connection, Self::Error>;

    /// Stops handing out connections. Ones already accepted are unaffected.
    async fn shutdown(&self) -> Result<(), Self::Error>;
}

/// One participant's duplex frame channel.
///
/// `send` and `recv` take `&self` and may run concurrently: a reader
/// parked in `recv` must not delay outbound frames.
pub trait Connection: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync;

    async fn send(&self, frame: &[u8]) -> Result<(), Self::Error>;

    /// Next inbound frame, or `Ok(None)` once the peer has hung up.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    async fn close(&self) -> Result<(), Self::Error>;

    fn id(&self) -> ConnectionId;

    /// Remote address, when the transport knows it.
    fn peer_addr(&self) -> Option<SocketAddr> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_display_prefixes_conn() {
        assert_eq!(ConnectionId::new(7).to_string(), "conn-7");
    }

    #[test]
    fn test_connection_id_round_trips_raw_value() {
        assert_eq!(ConnectionId::new(u64::MAX).into_inner(), u64::MAX);
    }

    #[test]
    fn test_connection_id_orders_by_accept_order() {
        let mut ids = vec![ConnectionId::new(9), ConnectionId::new(2), ConnectionId::new(5)];
        ids.sort();
        assert_eq!(
            ids,
            vec![ConnectionId::new(2), ConnectionId::new(5), ConnectionId::new(9)]
        );
    }

    #[test]
    fn test_transport_error_per_peer_classification() {
        let peer: SocketAddr = "10.0.0.7:51000".parse().unwrap();
        let handshake = TransportError::Handshake {
            peer,
            reason: "not a websocket request".into(),
        };
        assert!(handshake.is_per_peer());
        assert!(handshake.to_string().contains("10.0.0.7:51000"));

        let accept = TransportError::Accept(std::io::Error::other("too many open files"));
        assert!(!accept.is_per_peer());
        assert!(!TransportError::Shutdown.is_per_peer());
    }
}
