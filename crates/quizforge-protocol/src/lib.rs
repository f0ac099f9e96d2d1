//! Wire protocol for Quizforge.
//!
//! This crate defines the "language" that quiz clients and the server speak:
//!
//! - **Types** ([`Envelope`], [`MessageKind`], identifiers) — the frame
//!   shape shared by both directions.
//! - **Messages** ([`ClientMessage`], [`ServerMessage`] and their payload
//!   structs) — the closed set of things that can be said.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how envelopes become bytes.
//! - **Errors** ([`ProtocolError`]) — what can go wrong decoding.
//!
//! ```text
//! Transport (bytes) → Protocol (Envelope → ClientMessage) → Router
//! ```

mod codec;
mod error;
mod messages;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use messages::{
    AnswerResult, ClientMessage, CreateSession, ErrorCode, ErrorPayload, GameEnded, JoinSession,
    PlayerJoined, PlayerLeft, PlayerStanding, QuestionView, ServerMessage, SessionCreated,
    SubmitAnswer,
};
pub use types::{Envelope, JoinCode, MessageKind, PlayerId, QuizId, SessionId};
