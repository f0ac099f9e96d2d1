//! Concurrency tests for the registry: many connection tasks hitting it
//! at once, the way the server does.

use std::sync::Arc;

use quizforge_protocol::{Envelope, JoinCode, MessageKind, PlayerId};
use quizforge_registry::ConnectionRegistry;
use quizforge_transport::ConnectionId;
use tokio::sync::mpsc;

fn code(value: u32) -> JoinCode {
    JoinCode::new(value).unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_registration_lands_every_connection_in_its_group() {
    let registry = Arc::new(ConnectionRegistry::new());
    let mut receivers = Vec::new();
    let mut tasks = Vec::new();

    for id in 0..200u64 {
        let (tx, rx) = mpsc::unbounded_channel();
        receivers.push(rx);
        let registry = Arc::clone(&registry);
        tasks.push(tokio::spawn(async move {
            let conn = ConnectionId::new(id);
            registry.connect(conn, tx);
            // Alternate between two sessions.
            let join_code = if id % 2 == 0 { code(100_000) } else { code(200_000) };
            registry.register(conn, join_code).unwrap();
            registry.associate_player(conn, PlayerId(id)).unwrap();
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(registry.members(code(100_000)).len(), 100);
    assert_eq!(registry.members(code(200_000)).len(), 100);

    let delivered = registry.broadcast(code(100_000), Envelope::bare(MessageKind::Question));
    assert_eq!(delivered, 100);

    for (id, rx) in receivers.iter_mut().enumerate() {
        let got = rx.try_recv();
        if id % 2 == 0 {
            assert_eq!(got.unwrap().kind, MessageKind::Question);
        } else {
            assert!(got.is_err(), "conn {id} is in the other session");
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_broadcast_during_disconnects_never_panics() {
    let registry = Arc::new(ConnectionRegistry::new());
    let mut receivers = Vec::new();
    for id in 0..100u64 {
        let (tx, rx) = mpsc::unbounded_channel();
        receivers.push(rx);
        registry.connect(ConnectionId::new(id), tx);
        registry.register(ConnectionId::new(id), code(300_000)).unwrap();
    }

    let leaver = {
        let registry = Arc::clone(&registry);
        tokio::spawn(async move {
            for id in 0..100u64 {
                registry.unregister(ConnectionId::new(id));
                tokio::task::yield_now().await;
            }
        })
    };
    let broadcaster = {
        let registry = Arc::clone(&registry);
        tokio::spawn(async move {
            let mut total = 0;
            for _ in 0..50 {
                total += registry.broadcast(code(300_000), Envelope::bare(MessageKind::PlayerLeft));
                tokio::task::yield_now().await;
            }
            total
        })
    };

    leaver.await.unwrap();
    let total = broadcaster.await.unwrap();
    assert!(total <= 100 * 50);
    assert!(registry.members(code(300_000)).is_empty());
    assert!(registry.is_empty());
}
