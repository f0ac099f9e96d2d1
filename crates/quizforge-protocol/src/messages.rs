//! Typed message variants carried inside an [`Envelope`].
//!
//! Inbound frames are decoded into [`ClientMessage`] through one
//! exhaustive `match` on [`MessageKind`]; outbound [`ServerMessage`]s are
//! turned into envelopes the same way. Nothing past this module touches
//! raw JSON payloads.

use serde::{Deserialize, Serialize};

use crate::{Envelope, JoinCode, MessageKind, PlayerId, ProtocolError, QuizId, SessionId};

// ---------------------------------------------------------------------------
// Client → Server payloads
// ---------------------------------------------------------------------------

/// `CREATE_SESSION` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSession {
    pub quiz_id: QuizId,
}

/// `JOIN_SESSION` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinSession {
    pub join_code: JoinCode,
    pub display_name: String,
}

/// `SUBMIT_ANSWER` payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAnswer {
    pub option_index: usize,
}

/// A decoded inbound message.
///
/// The host-only kinds carry no payload: the join code comes from the
/// connection registry, never from the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    CreateSession(CreateSession),
    JoinSession(JoinSession),
    StartSession,
    SubmitAnswer(SubmitAnswer),
    NextQuestion,
    EndSession,
}

impl ClientMessage {
    /// Returns the wire kind of this message.
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::CreateSession(_) => MessageKind::CreateSession,
            Self::JoinSession(_) => MessageKind::JoinSession,
            Self::StartSession => MessageKind::StartSession,
            Self::SubmitAnswer(_) => MessageKind::SubmitAnswer,
            Self::NextQuestion => MessageKind::NextQuestion,
            Self::EndSession => MessageKind::EndSession,
        }
    }

    /// Wraps this message in an envelope, as a client would send it.
    pub fn into_envelope(self) -> Result<Envelope, ProtocolError> {
        match self {
            Self::CreateSession(p) => Envelope::new(MessageKind::CreateSession, &p),
            Self::JoinSession(p) => Envelope::new(MessageKind::JoinSession, &p),
            Self::SubmitAnswer(p) => Envelope::new(MessageKind::SubmitAnswer, &p),
            other => Ok(Envelope::bare(other.kind())),
        }
    }
}

impl TryFrom<&Envelope> for ClientMessage {
    type Error = ProtocolError;

    fn try_from(envelope: &Envelope) -> Result<Self, Self::Error> {
        match envelope.kind {
            MessageKind::CreateSession => Ok(Self::CreateSession(envelope.decode_payload()?)),
            MessageKind::JoinSession => Ok(Self::JoinSession(envelope.decode_payload()?)),
            MessageKind::StartSession => Ok(Self::StartSession),
            MessageKind::SubmitAnswer => Ok(Self::SubmitAnswer(envelope.decode_payload()?)),
            MessageKind::NextQuestion => Ok(Self::NextQuestion),
            MessageKind::EndSession => Ok(Self::EndSession),
            MessageKind::SessionCreated
            | MessageKind::PlayerJoined
            | MessageKind::PlayerLeft
            | MessageKind::SessionStarted
            | MessageKind::Question
            | MessageKind::AnswerResult
            | MessageKind::GameEnded
            | MessageKind::Error => Err(ProtocolError::MalformedMessage(format!(
                "{} is not a client message",
                envelope.kind
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Server → Client payloads
// ---------------------------------------------------------------------------

/// One row of a roster or leaderboard.
///
/// The last-answer timestamp used for tie-breaks stays server-side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStanding {
    pub id: PlayerId,
    pub display_name: String,
    pub score: u64,
    pub correct_count: u32,
    pub total_answered: u32,
}

/// `SESSION_CREATED` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCreated {
    pub join_code: JoinCode,
    pub session_id: SessionId,
}

/// `PLAYER_JOINED` payload: who joined plus the full roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerJoined {
    pub player_id: PlayerId,
    pub display_name: String,
    pub players: Vec<PlayerStanding>,
}

/// `PLAYER_LEFT` payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerLeft {
    pub player_id: PlayerId,
}

/// A question as every participant may see it. There is deliberately no
/// field for the correct option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionView {
    pub question_index: usize,
    pub question_text: String,
    pub options: Vec<String>,
    pub points: u32,
    /// Advisory limit in seconds.
    pub time_limit: u64,
    pub total_questions: usize,
}

/// `ANSWER_RESULT` payload, unicast to the answering connection only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerResult {
    pub correct: bool,
    /// `None` when no question is active (game not started yet).
    pub correct_option: Option<usize>,
    pub leaderboard: Vec<PlayerStanding>,
}

/// `GAME_ENDED` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameEnded {
    pub leaderboard: Vec<PlayerStanding>,
}

/// Machine-readable reason carried by an `ERROR` envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    SessionNotFound,
    SessionAlreadyStarted,
    QuizNotFound,
    MalformedMessage,
    NotInSession,
    Internal,
}

/// `ERROR` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub code: ErrorCode,
    pub message: String,
}

/// A typed outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    SessionCreated(SessionCreated),
    PlayerJoined(PlayerJoined),
    PlayerLeft(PlayerLeft),
    SessionStarted(QuestionView),
    Question(QuestionView),
    AnswerResult(AnswerResult),
    GameEnded(GameEnded),
    Error(ErrorPayload),
}

impl ServerMessage {
    /// Shorthand for an `ERROR` message.
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Error(ErrorPayload {
            code,
            message: message.into(),
        })
    }

    /// Returns the wire kind of this message.
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::SessionCreated(_) => MessageKind::SessionCreated,
            Self::PlayerJoined(_) => MessageKind::PlayerJoined,
            Self::PlayerLeft(_) => MessageKind::PlayerLeft,
            Self::SessionStarted(_) => MessageKind::SessionStarted,
            Self::Question(_) => MessageKind::Question,
            Self::AnswerResult(_) => MessageKind::AnswerResult,
            Self::GameEnded(_) => MessageKind::GameEnded,
            Self::Error(_) => MessageKind::Error,
        }
    }

    /// Wraps this message in an envelope with no ids stamped.
    pub fn into_envelope(self) -> Result<Envelope, ProtocolError> {
        let kind = self.kind();
        match &self {
            Self::SessionCreated(p) => Envelope::new(kind, p),
            Self::PlayerJoined(p) => Envelope::new(kind, p),
            Self::PlayerLeft(p) => Envelope::new(kind, p),
            Self::SessionStarted(p) | Self::Question(p) => Envelope::new(kind, p),
            Self::AnswerResult(p) => Envelope::new(kind, p),
            Self::GameEnded(p) => Envelope::new(kind, p),
            Self::Error(p) => Envelope::new(kind, p),
        }
    }
}

impl TryFrom<&Envelope> for ServerMessage {
    type Error = ProtocolError;

    fn try_from(envelope: &Envelope) -> Result<Self, ProtocolError> {
        match envelope.kind {
            MessageKind::SessionCreated => Ok(Self::SessionCreated(envelope.decode_payload()?)),
            MessageKind::PlayerJoined => Ok(Self::PlayerJoined(envelope.decode_payload()?)),
            MessageKind::PlayerLeft => Ok(Self::PlayerLeft(envelope.decode_payload()?)),
            MessageKind::SessionStarted => Ok(Self::SessionStarted(envelope.decode_payload()?)),
            MessageKind::Question => Ok(Self::Question(envelope.decode_payload()?)),
            MessageKind::AnswerResult => Ok(Self::AnswerResult(envelope.decode_payload()?)),
            MessageKind::GameEnded => Ok(Self::GameEnded(envelope.decode_payload()?)),
            MessageKind::Error => Ok(ServerMessage::Error(envelope.decode_payload()?)),
            MessageKind::CreateSession
            | MessageKind::JoinSession
            | MessageKind::StartSession
            | MessageKind::SubmitAnswer
            | MessageKind::NextQuestion
            | MessageKind::EndSession => Err(ProtocolError::MalformedMessage(format!(
                "{} is not a server message",
                envelope.kind
            ))),
        }
    }
}
