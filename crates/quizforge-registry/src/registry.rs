//! The connection registry: who is connected, and to which session.
//!
//! # Concurrency note
//!
//! Every connection task calls into the registry directly, so unlike a
//! single-owner manager it must be safe to share. Both indexes are
//! `DashMap`s: a join code's member set lives inside one shard, and
//! operations on unrelated join codes don't contend.
//!
//! Lock order is always `connections` → `groups`. Broadcast copies the
//! member ids out and drops the `groups` guard before touching
//! `connections`, so it never holds both.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use quizforge_protocol::{Envelope, JoinCode, PlayerId};
use quizforge_transport::ConnectionId;

use crate::connection::{Association, ConnectionEntry, ConnectionSender};
use crate::RegistryError;

/// Tracks live connections, their session membership, and the player
/// each one represents.
///
/// ## Lifecycle
///
/// ```text
/// connect() ──→ register() ──→ associate_player() ──→ unregister()
///   [bare]      [join code]      [join code + player]    [gone]
/// ```
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    /// Every live connection, keyed by transport id.
    connections: DashMap<ConnectionId, ConnectionEntry>,

    /// Reverse index: join code → connections registered under it.
    /// Kept in sync with each entry's `association.join_code`.
    groups: DashMap<JoinCode, HashSet<ConnectionId>>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a newly accepted connection and where to send its frames.
    ///
    /// Calling it again for the same id replaces the sender and clears
    /// any association.
    pub fn connect(&self, conn: ConnectionId, sender: ConnectionSender) {
        if let Some(previous) = self.connections.insert(conn, ConnectionEntry::new(sender)) {
            if let Some(code) = previous.association.join_code {
                self.leave_group(code, conn);
            }
        }
        tracing::debug!(%conn, "connection registered");
    }

    /// Adds the connection to the set under `join_code`.
    ///
    /// Idempotent. A connection belongs to at most one join code, so
    /// registering under a new code moves it out of the old one.
    ///
    /// # Errors
    /// [`RegistryError::UnknownConnection`] if `conn` was never connected.
    pub fn register(&self, conn: ConnectionId, join_code: JoinCode) -> Result<(), RegistryError> {
        let mut entry = self
            .connections
            .get_mut(&conn)
            .ok_or(RegistryError::UnknownConnection(conn))?;

        let previous = entry.association.join_code.replace(join_code);
        if previous == Some(join_code) {
            return Ok(());
        }
        if let Some(old) = previous {
            self.leave_group(old, conn);
        }
        self.groups.entry(join_code).or_default().insert(conn);

        tracing::debug!(%conn, %join_code, "connection joined group");
        Ok(())
    }

    /// Records which player `conn` speaks for, replacing any earlier one.
    ///
    /// # Errors
    /// [`RegistryError::UnknownConnection`] if `conn` was never connected.
    pub fn associate_player(
        &self,
        conn: ConnectionId,
        player_id: PlayerId,
    ) -> Result<(), RegistryError> {
        let mut entry = self
            .connections
            .get_mut(&conn)
            .ok_or(RegistryError::UnknownConnection(conn))?;
        entry.association.player_id = Some(player_id);
        Ok(())
    }

    /// Returns what `conn` is attached to. Unknown connections read as
    /// unattached.
    pub fn association(&self, conn: ConnectionId) -> Association {
        self.connections
            .get(&conn)
            .map(|entry| entry.association)
            .unwrap_or_default()
    }

    /// Forgets `conn` entirely and returns what it was attached to.
    pub fn unregister(&self, conn: ConnectionId) -> Association {
        let Some((_, entry)) = self.connections.remove(&conn) else {
            return Association::default();
        };
        if let Some(code) = entry.association.join_code {
            self.leave_group(code, conn);
        }
        tracing::debug!(%conn, "connection unregistered");
        entry.association
    }

    /// Delivers `envelope` to every connection currently under `join_code`.
    ///
    /// Iterates a point-in-time snapshot of the member set. A member that
    /// has vanished or whose channel is closed is logged and skipped; it
    /// never stops delivery to the rest. Returns how many deliveries
    /// succeeded.
    pub fn broadcast(&self, join_code: JoinCode, envelope: Envelope) -> usize {
        let targets: Vec<ConnectionId> = match self.groups.get(&join_code) {
            Some(members) => members.iter().copied().collect(),
            None => return 0,
        };

        let outbound = Arc::new(envelope);
        let mut delivered = 0;
        for conn in targets {
            match self.send_to(conn, Arc::clone(&outbound)) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::warn!(
                        %join_code,
                        %conn,
                        kind = %outbound.kind,
                        error = %e,
                        "broadcast delivery failed"
                    );
                }
            }
        }
        delivered
    }

    /// Delivers `envelope` to exactly one connection.
    ///
    /// # Errors
    /// - [`RegistryError::UnknownConnection`] if `conn` isn't registered
    /// - [`RegistryError::DeliveryFailed`] if its channel is closed
    pub fn unicast(&self, conn: ConnectionId, envelope: Envelope) -> Result<(), RegistryError> {
        self.send_to(conn, Arc::new(envelope))
    }

    /// Returns the connections currently under `join_code`.
    pub fn members(&self, join_code: JoinCode) -> Vec<ConnectionId> {
        self.groups
            .get(&join_code)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Number of live connections.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Returns `true` if nothing is connected.
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    fn send_to(&self, conn: ConnectionId, outbound: Arc<Envelope>) -> Result<(), RegistryError> {
        // Clone the sender out so the shard guard isn't held across send.
        let sender = self
            .connections
            .get(&conn)
            .map(|entry| entry.sender.clone())
            .ok_or(RegistryError::UnknownConnection(conn))?;
        sender
            .send(outbound)
            .map_err(|_| RegistryError::DeliveryFailed(conn))
    }

    fn leave_group(&self, join_code: JoinCode, conn: ConnectionId) {
        if let Some(mut members) = self.groups.get_mut(&join_code) {
            members.remove(&conn);
        }
        self.groups.remove_if(&join_code, |_, members| members.is_empty());
    }
}
