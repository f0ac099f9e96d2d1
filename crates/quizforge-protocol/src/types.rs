//! Core protocol types for Quizforge's wire format.
//!
//! Every frame in either direction is an [`Envelope`]:
//!
//! ```text
//! { "kind": "SUBMIT_ANSWER", "payload": { "optionIndex": 2 },
//!   "sessionId": "…", "playerId": 17 }
//! ```
//!
//! `kind` selects the message, `payload` is kind-specific and may be
//! absent, and the two id fields are optional context stamped by the
//! server on outbound frames.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use uuid::Uuid;

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Identifies one participant (host or player) for the lifetime of their
/// connection.
///
/// Serialized as a plain number thanks to `#[serde(transparent)]`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// Opaque, globally unique identifier of one game session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Draws a fresh random session id.
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier of a quiz owned by the external quiz store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuizId(pub String);

impl QuizId {
    /// Wraps anything string-like as a quiz id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for QuizId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// JoinCode
// ---------------------------------------------------------------------------

/// The six-digit code players type in to find a session.
///
/// Always in `100000..=999999`, so it never has a leading zero. On the
/// wire it is a string (`"482913"`); decoding also accepts a bare number
/// because that's what numeric keypads tend to produce.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(into = "String", try_from = "JoinCodeRepr")]
pub struct JoinCode(u32);

impl JoinCode {
    /// Smallest valid code.
    pub const MIN: u32 = 100_000;
    /// Largest valid code.
    pub const MAX: u32 = 999_999;
    /// Number of distinct codes.
    pub const SPAN: u32 = Self::MAX - Self::MIN + 1;

    /// Returns `None` if `value` is outside the six-digit range.
    pub fn new(value: u32) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&value).then_some(Self(value))
    }

    /// Maps any value onto the valid band, so a uniform draw from
    /// `0..SPAN` gives a uniform code.
    pub fn wrapping(value: u32) -> Self {
        Self(Self::MIN + value % Self::SPAN)
    }

    /// Returns the numeric value.
    pub fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for JoinCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:06}", self.0)
    }
}

impl FromStr for JoinCode {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.len() != 6 || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ProtocolError::MalformedMessage(format!(
                "join code must be six digits, got {s:?}"
            )));
        }
        let value: u32 = trimmed.parse().map_err(|_| {
            ProtocolError::MalformedMessage(format!("invalid join code {s:?}"))
        })?;
        Self::new(value).ok_or_else(|| {
            ProtocolError::MalformedMessage(format!("join code {s:?} out of range"))
        })
    }
}

impl From<JoinCode> for String {
    fn from(code: JoinCode) -> Self {
        code.to_string()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum JoinCodeRepr {
    Text(String),
    Number(u32),
}

impl TryFrom<JoinCodeRepr> for JoinCode {
    type Error = ProtocolError;

    fn try_from(repr: JoinCodeRepr) -> Result<Self, Self::Error> {
        match repr {
            JoinCodeRepr::Text(s) => s.parse(),
            JoinCodeRepr::Number(n) => Self::new(n).ok_or_else(|| {
                ProtocolError::MalformedMessage(format!("join code {n} out of range"))
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// MessageKind
// ---------------------------------------------------------------------------

/// Every message kind the protocol knows, in both directions.
///
/// Decoding an envelope whose `kind` is not listed here fails outright,
/// which is how unknown messages become `MALFORMED_MESSAGE` errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageKind {
    // -- Client → Server --
    CreateSession,
    JoinSession,
    StartSession,
    SubmitAnswer,
    NextQuestion,
    EndSession,

    // -- Server → Client --
    SessionCreated,
    PlayerJoined,
    PlayerLeft,
    SessionStarted,
    Question,
    AnswerResult,
    GameEnded,
    Error,
}

impl MessageKind {
    /// Returns `true` for kinds a client is allowed to send.
    pub fn is_inbound(self) -> bool {
        matches!(
            self,
            Self::CreateSession
                | Self::JoinSession
                | Self::StartSession
                | Self::SubmitAnswer
                | Self::NextQuestion
                | Self::EndSession
        )
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CreateSession => "CREATE_SESSION",
            Self::JoinSession => "JOIN_SESSION",
            Self::StartSession => "START_SESSION",
            Self::SubmitAnswer => "SUBMIT_ANSWER",
            Self::NextQuestion => "NEXT_QUESTION",
            Self::EndSession => "END_SESSION",
            Self::SessionCreated => "SESSION_CREATED",
            Self::PlayerJoined => "PLAYER_JOINED",
            Self::PlayerLeft => "PLAYER_LEFT",
            Self::SessionStarted => "SESSION_STARTED",
            Self::Question => "QUESTION",
            Self::AnswerResult => "ANSWER_RESULT",
            Self::GameEnded => "GAME_ENDED",
            Self::Error => "ERROR",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// The top-level wire wrapper. Every frame is one `Envelope`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// Which message this is.
    pub kind: MessageKind,

    /// Kind-specific body. Missing on the wire decodes as `null`.
    #[serde(default)]
    pub payload: serde_json::Value,

    /// Session this frame concerns, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,

    /// Player this frame concerns, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_id: Option<PlayerId>,
}

impl Envelope {
    /// Builds an envelope with a serialized payload.
    pub fn new<T: Serialize>(kind: MessageKind, payload: &T) -> Result<Self, ProtocolError> {
        Ok(Self {
            kind,
            payload: serde_json::to_value(payload).map_err(ProtocolError::Encode)?,
            session_id: None,
            player_id: None,
        })
    }

    /// Builds an envelope with no payload.
    pub fn bare(kind: MessageKind) -> Self {
        Self {
            kind,
            payload: serde_json::Value::Null,
            session_id: None,
            player_id: None,
        }
    }

    /// Stamps the session id.
    pub fn with_session(mut self, session_id: SessionId) -> Self {
        self.session_id = Some(session_id);
        self
    }

    /// Stamps the player id.
    pub fn with_player(mut self, player_id: PlayerId) -> Self {
        self.player_id = Some(player_id);
        self
    }

    /// Decodes the payload as `T`.
    ///
    /// # Errors
    /// Returns `ProtocolError::MalformedMessage` naming the kind if the
    /// payload doesn't have the shape `T` expects.
    pub fn decode_payload<T: DeserializeOwned>(&self) -> Result<T, ProtocolError> {
        T::deserialize(&self.payload).map_err(|e| {
            ProtocolError::MalformedMessage(format!("{} payload: {e}", self.kind))
        })
    }
}
