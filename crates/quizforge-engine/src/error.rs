//! Error types for the engine layer.

use quizforge_protocol::{JoinCode, QuizId};

/// Errors the game engine surfaces to its caller.
///
/// None of these are retried internally. Note there is no "player not
/// found": answering as an unknown player is indistinguishable from
/// answering wrong.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    /// No live session has this join code (never existed, or evicted).
    #[error("session {0} not found")]
    SessionNotFound(JoinCode),

    /// The session is past `Waiting` and no longer admits players.
    #[error("session {0} has already started")]
    SessionAlreadyStarted(JoinCode),

    /// The quiz store has no quiz with this id.
    #[error("quiz {0} not found")]
    QuizNotFound(QuizId),

    /// Every join code drawn was already taken.
    #[error("no free join code after {attempts} attempts")]
    JoinCodesExhausted { attempts: u32 },
}
