//! Unified error type for the Quizforge server.

use quizforge_engine::GameError;
use quizforge_protocol::{ErrorCode, JoinCode, ProtocolError};
use quizforge_registry::RegistryError;
use quizforge_transport::{ConnectionId, TransportError};

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each wrapped variant lets `?` convert
/// sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum QuizforgeError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, malformed payload).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A registry-level error (unknown connection, closed channel).
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// A game-level error (missing session or quiz, already started).
    #[error(transparent)]
    Game(#[from] GameError),

    /// A message that needs a session arrived on a connection that has
    /// not created or joined one.
    #[error("{0} has not created or joined a session")]
    NotInSession(ConnectionId),

    /// The session has no question to show (an empty quiz).
    #[error("session {0} has no active question")]
    NoActiveQuestion(JoinCode),
}

impl QuizforgeError {
    /// The code reported to clients in an `ERROR` envelope.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Game(GameError::SessionNotFound(_)) => ErrorCode::SessionNotFound,
            Self::Game(GameError::SessionAlreadyStarted(_)) => ErrorCode::SessionAlreadyStarted,
            Self::Game(GameError::QuizNotFound(_)) => ErrorCode::QuizNotFound,
            Self::Protocol(ProtocolError::Decode(_) | ProtocolError::MalformedMessage(_)) => {
                ErrorCode::MalformedMessage
            }
            Self::NotInSession(_) => ErrorCode::NotInSession,
            Self::Game(GameError::JoinCodesExhausted { .. })
            | Self::Protocol(ProtocolError::Encode(_))
            | Self::Registry(_)
            | Self::Transport(_)
            | Self::NoActiveQuestion(_) => ErrorCode::Internal,
        }
    }
}
