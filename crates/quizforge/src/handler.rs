//! Per-connection handler: pumps frames between a socket and the router.
//!
//! Each accepted connection gets two Tokio tasks:
//!   1. a reader (this handler) that feeds every inbound frame to the router
//!   2. a writer that drains the connection's outbound channel onto the socket
//!
//! Broadcasts therefore only ever push onto channels; a slow socket holds
//! up its own writer and nothing else.

use std::sync::Arc;

use quizforge_engine::QuizStore;
use quizforge_protocol::Codec;
use quizforge_registry::ConnectionReceiver;
use quizforge_transport::{Connection, ConnectionId, WebSocketConnection};
use tokio::sync::mpsc;

use crate::router::MessageRouter;
use crate::QuizforgeError;

/// Drop guard that tells the router a connection is gone.
///
/// Runs even if the handler panics. `Drop` is synchronous, so the async
/// cleanup is spawned.
struct DisconnectGuard<Q: QuizStore, C: Codec> {
    conn_id: ConnectionId,
    router: Arc<MessageRouter<Q, C>>,
}

impl<Q: QuizStore, C: Codec> Drop for DisconnectGuard<Q, C> {
    fn drop(&mut self) {
        let conn_id = self.conn_id;
        let router = Arc::clone(&self.router);
        tokio::spawn(async move {
            router.handle_disconnect(conn_id).await;
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<Q, C>(
    conn: WebSocketConnection,
    router: Arc<MessageRouter<Q, C>>,
) -> Result<(), QuizforgeError>
where
    Q: QuizStore,
    C: Codec,
{
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    tracing::info!(%conn_id, peer = ?conn.peer_addr(), "connection opened");

    let (sender, receiver) = mpsc::unbounded_channel();
    router.connect(conn_id, sender);
    let _guard = DisconnectGuard {
        conn_id,
        router: Arc::clone(&router),
    };

    let writer = tokio::spawn(write_loop(
        Arc::clone(&conn),
        Arc::clone(&router),
        receiver,
    ));

    let result = loop {
        match conn.recv().await {
            Ok(Some(data)) => router.handle_frame(conn_id, &data).await,
            Ok(None) => {
                tracing::info!(%conn_id, "connection closed");
                break Ok(());
            }
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                break Err(QuizforgeError::Transport(e));
            }
        }
    };

    // The writer ends on its own once the registry drops our sender; this
    // just stops it writing into a socket we already know is dead.
    writer.abort();
    result
}

/// Encodes and sends every envelope queued for one connection.
async fn write_loop<Q, C>(
    conn: Arc<WebSocketConnection>,
    router: Arc<MessageRouter<Q, C>>,
    mut receiver: ConnectionReceiver,
) where
    Q: QuizStore,
    C: Codec,
{
    let conn_id = conn.id();
    while let Some(envelope) = receiver.recv().await {
        let bytes = match router.codec().encode(envelope.as_ref()) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(%conn_id, kind = %envelope.kind, error = %e, "failed to encode envelope");
                continue;
            }
        };
        if let Err(e) = conn.send(&bytes).await {
            tracing::debug!(%conn_id, error = %e, "send failed, stopping writer");
            break;
        }
    }
}
