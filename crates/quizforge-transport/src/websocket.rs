//! WebSocket transport over `tokio-tungstenite`.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;

use crate::{Connection, ConnectionId, Transport, TransportError};

type Socket = WebSocketStream<TcpStream>;

/// Listens for participants and upgrades each TCP stream to a WebSocket.
pub struct WebSocketTransport {
    listener: TcpListener,
    next_id: AtomicU64,
    closed: AtomicBool,
}

impl WebSocketTransport {
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| TransportError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        tracing::info!(addr = ?listener.local_addr().ok(), "websocket listener bound");
        Ok(Self {
            listener,
            next_id: AtomicU64::new(1),
            closed: AtomicBool::new(false),
        })
    }

    /// The bound address; differs from the requested one when port 0 was used.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

impl Transport for WebSocketTransport {
    type Connection = WebSocketConnection;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<WebSocketConnection, TransportError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::Shutdown);
        }

        let (tcp, peer) = self.listener.accept().await.map_err(TransportError::Accept)?;
        disable_nagle(&tcp, peer);

        let socket = tokio_tungstenite::accept_async(tcp)
            .await
            .map_err(|e| TransportError::Handshake {
                peer,
                reason: e.to_string(),
            })?;

        let id = ConnectionId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(conn_id = %id, %peer, "websocket upgraded");
        Ok(WebSocketConnection::new(id, peer, socket))
    }

    async fn shutdown(&self) -> Result<(), TransportError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

/// Quiz traffic is many tiny frames; don't let Nagle batch them. Failure
/// only costs latency, so it is logged and the connection proceeds.
fn disable_nagle(tcp: &TcpStream, peer: SocketAddr) {
    if let Err(e) = tcp.set_nodelay(true) {
        tracing::debug!(%peer, error = %e, "could not disable Nagle");
    }
}

/// An upgraded participant socket.
///
/// Reader and writer halves are locked separately so the handler's read
/// loop never holds up frames pushed by the write loop.
pub struct WebSocketConnection {
    id: ConnectionId,
    peer: SocketAddr,
    writer: Mutex<SplitSink<Socket, Message>>,
    reader: Mutex<SplitStream<Socket>>,
}

impl WebSocketConnection {
    fn new(id: ConnectionId, peer: SocketAddr, socket: Socket) -> Self {
        let (writer, reader) = socket.split();
        Self {
            id,
            peer,
            writer: Mutex::new(writer),
            reader: Mutex::new(reader),
        }
    }

    fn send_error(&self, e: impl std::fmt::Display) -> TransportError {
        TransportError::Send {
            conn_id: self.id,
            reason: e.to_string(),
        }
    }
}

/// What one inbound WebSocket message means to the caller.
enum Inbound {
    Frame(Vec<u8>),
    Control,
    Hangup,
}

impl From<Message> for Inbound {
    fn from(message: Message) -> Self {
        match message {
            Message::Text(text) => Inbound::Frame(text.as_bytes().to_vec()),
            Message::Binary(bytes) => Inbound::Frame(bytes.to_vec()),
            Message::Close(_) => Inbound::Hangup,
            Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => Inbound::Control,
        }
    }
}

/// JSON goes out as text so browsers get a string in `onmessage`.
fn outbound(frame: &[u8]) -> Message {
    match std::str::from_utf8(frame) {
        Ok(text) => Message::Text(text.to_owned().into()),
        Err(_) => Message::Binary(frame.to_vec().into()),
    }
}

impl Connection for WebSocketConnection {
    type Error = TransportError;

    async fn send(&self, frame: &[u8]) -> Result<(), TransportError> {
        let mut writer = self.writer.lock().await;
        writer
            .send(outbound(frame))
            .await
            .map_err(|e| self.send_error(e))
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError> {
        let mut reader = self.reader.lock().await;
        while let Some(next) = reader.next().await {
            let message = next.map_err(|e| TransportError::Receive {
                conn_id: self.id,
                reason: e.to_string(),
            })?;
            match Inbound::from(message) {
                Inbound::Frame(frame) => return Ok(Some(frame)),
                // tungstenite answers pings itself
                Inbound::Control => {}
                Inbound::Hangup => return Ok(None),
            }
        }
        Ok(None)
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.writer
            .lock()
            .await
            .close()
            .await
            .map_err(|e| self.send_error(e))
    }

    fn id(&self) -> ConnectionId {
        self.id
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        Some(self.peer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disable_nagle_sets_nodelay_on_accepted_stream() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (_client, accepted) = tokio::join!(TcpStream::connect(addr), listener.accept());
        let (tcp, peer) = accepted.unwrap();

        disable_nagle(&tcp, peer);
        assert!(tcp.nodelay().unwrap());
    }

    #[test]
    fn test_outbound_picks_text_for_utf8() {
        assert!(outbound(b"{}").is_text());
        assert!(outbound(&[0xc3, 0x28]).is_binary());
    }
}
