//! # Quizforge
//!
//! Real-time multiplayer quiz server.
//!
//! A host creates a session from a stored quiz and shares its six-digit
//! join code; players join with the code, answer timed multiple-choice
//! questions, and are scored on correctness and speed. Everything runs
//! over one WebSocket per participant carrying JSON envelopes.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use quizforge::prelude::*;
//!
//! # async fn run() -> Result<(), QuizforgeError> {
//! let quizzes = InMemoryQuizStore::new();
//! let server = QuizforgeServer::builder()
//!     .bind("0.0.0.0:8080")
//!     .build(quizzes)
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
mod router;
mod server;

pub use error::QuizforgeError;
pub use router::{player_id_for, MessageRouter};
pub use server::{QuizforgeServer, QuizforgeServerBuilder};

pub mod prelude {
    pub use crate::{MessageRouter, QuizforgeError, QuizforgeServer, QuizforgeServerBuilder};
    pub use quizforge_engine::{
        ArchiveError, EngineConfig, GameEngine, InMemoryQuizStore, NoopArchive, Question, Quiz,
        QuizStore, Session, SessionArchive, SessionState,
    };
    pub use quizforge_protocol::{
        ClientMessage, Codec, Envelope, ErrorCode, JoinCode, JsonCodec, MessageKind, PlayerId,
        QuizId, ServerMessage,
    };
    pub use quizforge_registry::ConnectionRegistry;
}
