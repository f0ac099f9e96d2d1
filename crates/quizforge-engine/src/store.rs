//! Join code → session actor index.
//!
//! Sharded so that lookups for different join codes don't contend.
//! Entries whose actor has exited are treated as absent and get
//! reclaimed either by [`SessionStore::purge_closed`] or by a later
//! creation that draws the same code.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use quizforge_protocol::JoinCode;
use rand::Rng;

use crate::GameError;
use crate::session::SessionHandle;

#[derive(Debug, Default)]
pub(crate) struct SessionStore {
    sessions: DashMap<JoinCode, SessionHandle>,
}

impl SessionStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Handle for a live session.
    pub(crate) fn get(&self, code: JoinCode) -> Option<SessionHandle> {
        self.sessions
            .get(&code)
            .map(|entry| entry.value().clone())
            .filter(|handle| !handle.is_closed())
    }

    /// Draws random join codes until one is free, then installs the handle
    /// `spawn` builds for it. The check and the insert happen under the
    /// same shard lock, so two concurrent creations never share a code.
    pub(crate) fn insert_with_fresh_code<F>(
        &self,
        max_attempts: u32,
        mut spawn: F,
    ) -> Result<SessionHandle, GameError>
    where
        F: FnMut(JoinCode) -> SessionHandle,
    {
        for _ in 0..max_attempts {
            let code = random_code();
            match self.sessions.entry(code) {
                Entry::Vacant(vacant) => {
                    let handle = spawn(code);
                    vacant.insert(handle.clone());
                    return Ok(handle);
                }
                Entry::Occupied(mut occupied) if occupied.get().is_closed() => {
                    let handle = spawn(code);
                    occupied.insert(handle.clone());
                    return Ok(handle);
                }
                Entry::Occupied(_) => {
                    tracing::debug!(%code, "join code collision, redrawing");
                }
            }
        }
        Err(GameError::JoinCodesExhausted {
            attempts: max_attempts,
        })
    }

    /// Drops entries whose actor has exited. Returns how many were removed.
    pub(crate) fn purge_closed(&self) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, handle| !handle.is_closed());
        before.saturating_sub(self.sessions.len())
    }

    /// Number of live sessions.
    pub(crate) fn live_count(&self) -> usize {
        self.sessions
            .iter()
            .filter(|entry| !entry.value().is_closed())
            .count()
    }
}

fn random_code() -> JoinCode {
    JoinCode::wrapping(rand::rng().random_range(0..JoinCode::SPAN))
}
