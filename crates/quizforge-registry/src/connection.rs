//! Per-connection records kept by the registry.
//!
//! A connection is registered the moment the transport accepts it, with
//! nothing but an outbound channel. It picks up a join code and a player
//! identity once it creates or joins a session.

use std::sync::Arc;

use quizforge_protocol::{Envelope, JoinCode, PlayerId};
use tokio::sync::mpsc;

/// An envelope queued for delivery. Shared so a broadcast doesn't deep
/// clone the payload once per recipient.
pub type Outbound = Arc<Envelope>;

/// Channel feeding one connection's writer task.
pub type ConnectionSender = mpsc::UnboundedSender<Outbound>;

/// Channel the writer task drains.
pub type ConnectionReceiver = mpsc::UnboundedReceiver<Outbound>;

/// What a connection is attached to.
///
/// Both halves are optional: a freshly accepted connection has neither,
/// and a host is registered under a join code before it has anything to
/// play.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Association {
    /// Session the connection is registered under.
    pub join_code: Option<JoinCode>,
    /// Participant the connection speaks for.
    pub player_id: Option<PlayerId>,
}

/// The registry's record of one live connection.
#[derive(Debug)]
pub(crate) struct ConnectionEntry {
    pub(crate) sender: ConnectionSender,
    pub(crate) association: Association,
}

impl ConnectionEntry {
    pub(crate) fn new(sender: ConnectionSender) -> Self {
        Self {
            sender,
            association: Association::default(),
        }
    }
}
