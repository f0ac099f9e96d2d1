//! Engine configuration and the session state machine.

use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// EngineConfig
// ---------------------------------------------------------------------------

/// Tunables for the game engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How long a session stays resident after reaching `Finished`
    /// before it is archived and evicted.
    pub finished_ttl: Duration,

    /// Capacity of each session actor's command channel. Callers wait
    /// when it is full.
    pub command_buffer: usize,

    /// Random join-code draws before creation gives up.
    pub max_code_attempts: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            finished_ttl: Duration::from_secs(600),
            command_buffer: 64,
            max_code_attempts: 64,
        }
    }
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// The lifecycle state of a session.
///
/// ```text
/// Waiting ──start──→ InProgress ──advance (per question)──┐
///                        ↑                                │
///                        └────────────────────────────────┘
///                        │
///                        └──advance past last──→ Finished
/// ```
///
/// `ShowingAnswer` and `Leaderboard` are part of the wire vocabulary but
/// reserved: no transition enters them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    Waiting,
    InProgress,
    ShowingAnswer,
    Leaderboard,
    Finished,
}

impl SessionState {
    /// Returns `true` if the session is still admitting players.
    pub fn is_joinable(&self) -> bool {
        matches!(self, Self::Waiting)
    }

    /// Returns `true` if answers are currently being scored.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::InProgress)
    }

    /// Returns `true` once the last question has been passed.
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Finished)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Waiting => write!(f, "WAITING"),
            Self::InProgress => write!(f, "IN_PROGRESS"),
            Self::ShowingAnswer => write!(f, "SHOWING_ANSWER"),
            Self::Leaderboard => write!(f, "LEADERBOARD"),
            Self::Finished => write!(f, "FINISHED"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_state_is_joinable_only_while_waiting() {
        assert!(SessionState::Waiting.is_joinable());
        assert!(!SessionState::InProgress.is_joinable());
        assert!(!SessionState::Finished.is_joinable());
    }

    #[test]
    fn test_session_state_reserved_states_are_inert() {
        for state in [SessionState::ShowingAnswer, SessionState::Leaderboard] {
            assert!(!state.is_joinable());
            assert!(!state.is_active());
            assert!(!state.is_finished());
        }
    }

    #[test]
    fn test_session_state_serializes_like_display() {
        let json = serde_json::to_string(&SessionState::InProgress).unwrap();
        assert_eq!(json, format!("\"{}\"", SessionState::InProgress));
    }

    #[test]
    fn test_engine_config_default() {
        let config = EngineConfig::default();
        assert_eq!(config.finished_ttl, Duration::from_secs(600));
        assert_eq!(config.command_buffer, 64);
        assert!(config.max_code_attempts > 0);
    }
}
